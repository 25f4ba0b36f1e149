use anyhow::Result;
use clap::Parser;
use std::path::Path;
use vivarium_core::SimulationId;
use vivarium_lib::app::{load_config, App};
use vivarium_lib::gallery::{self, Listing};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// What to do
    #[arg(short, long, value_enum, default_value = "headless")]
    mode: Mode,

    /// Simulation id or alias (pond, blood, soil, ants, starfield)
    #[arg(short, long, default_value = "pond")]
    sim: String,

    /// Frames to run in headless mode
    #[arg(short, long, default_value_t = 600)]
    ticks: u64,

    /// RNG seed; overrides the config file
    #[arg(long)]
    seed: Option<u64>,

    /// Print the final frame as JSON instead of the census
    #[arg(long)]
    json: bool,

    /// Custom config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Catalog search for list mode
    #[arg(short, long, default_value = "")]
    query: String,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum Mode {
    Headless,
    List,
}

fn main() -> Result<()> {
    vivarium_core::metrics::init_logging();
    let args = Args::parse();

    match args.mode {
        Mode::List => match gallery::filter(&args.query) {
            Listing::Matches(cards) => {
                for card in cards {
                    println!("{} {:<18} {:<20} #{}", card.icon, card.id, card.title, card.tags.join(" #"));
                }
            }
            Listing::NoResults => println!("No simulations match '{}'", args.query.trim()),
        },
        Mode::Headless => {
            let id = args.sim.parse::<SimulationId>()?;
            let config = load_config(Path::new(&args.config))?;
            let mut app = App::new(id, config, args.seed)?;
            let census = app.run_headless(args.ticks);

            if args.json {
                println!("{}", serde_json::to_string_pretty(&app.frame())?);
            } else {
                println!("{} after {} ticks (seed {})", id, app.sim.tick(), app.seed);
                for (label, value) in &census.entries {
                    println!("  {label:<16} {value}");
                }
                if let Some(status) = &census.status {
                    println!("  {:<16} {status}", "Status");
                }
            }
        }
    }

    Ok(())
}
