pub mod app;
pub mod gallery;
pub mod ui;

#[cfg(target_arch = "wasm32")]
use crate::ui::projection::{Plane, Viewport};
#[cfg(target_arch = "wasm32")]
use vivarium_core::{config::AppConfig, Simulation, SimulationId};
#[cfg(target_arch = "wasm32")]
use vivarium_data::{Interaction, Knob, Tool};
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
fn js_err<E: std::fmt::Display>(e: E) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// One simulation page bound to a canvas.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub struct Exhibit {
    sim: Box<dyn Simulation>,
    canvas: (f32, f32),
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
impl Exhibit {
    #[wasm_bindgen(constructor)]
    pub fn new(id: &str, seed: u32) -> Result<Exhibit, JsValue> {
        console_error_panic_hook::set_once();

        let config = AppConfig::default();
        let id = id.parse::<SimulationId>().map_err(js_err)?;
        let sim = vivarium_core::create(id, &config, u64::from(seed));

        Ok(Exhibit {
            sim,
            canvas: (1.0, 1.0),
        })
    }

    /// Advances by `dt` seconds since the previous animation frame.
    pub fn tick(&mut self, dt: f64) {
        let report = self.sim.step(dt as f32);
        if report.dropped > 0 {
            web_sys::console::warn_1(&JsValue::from_str(&format!(
                "{}: {} spawns dropped at capacity",
                self.sim.id(),
                report.dropped
            )));
        }
    }

    pub fn draw(
        &mut self,
        ctx: &web_sys::CanvasRenderingContext2d,
        width: f64,
        height: f64,
    ) -> Result<(), JsValue> {
        use crate::ui::web_renderer::WebRenderer;
        self.canvas = (width as f32, height as f32);
        let renderer = WebRenderer::new(width, height);
        renderer.render(ctx, &self.sim.frame())
    }

    pub fn get_stats(&self) -> js_sys::Object {
        let obj = js_sys::Object::new();
        let census = self.sim.census();
        let _ = js_sys::Reflect::set(
            &obj,
            &JsValue::from_str("tick"),
            &JsValue::from_f64(self.sim.tick() as f64),
        );
        let _ = js_sys::Reflect::set(
            &obj,
            &JsValue::from_str("entities"),
            &JsValue::from_f64(self.sim.population() as f64),
        );
        for (label, value) in &census.entries {
            let _ = js_sys::Reflect::set(&obj, &JsValue::from_str(label), &JsValue::from_f64(*value));
        }
        if let Some(status) = &census.status {
            let _ = js_sys::Reflect::set(&obj, &JsValue::from_str("status"), &JsValue::from_str(status));
        }
        obj
    }

    /// Applies a tool at canvas pixel `(x, y)`. Clicks that miss the
    /// exhibit's interaction plane are ignored.
    pub fn use_tool(&mut self, tool: &str, x: f64, y: f64) -> Result<(), JsValue> {
        let tool = tool.parse::<Tool>().map_err(js_err)?;
        let view = Viewport::new(&self.sim.frame(), self.canvas.0, self.canvas.1);
        let Some((x, y)) = view.unproject(x as f32, y as f32, Plane::for_tool(tool)) else {
            return Ok(());
        };
        self.sim
            .apply(&Interaction::Tool { tool, x, y })
            .map_err(js_err)
    }

    pub fn set_knob(&mut self, knob: &str, value: f64) -> Result<(), JsValue> {
        let knob = knob.parse::<Knob>().map_err(js_err)?;
        self.sim
            .apply(&Interaction::Knob {
                knob,
                value: value as f32,
            })
            .map_err(js_err)
    }

    pub fn hold(&mut self, active: bool) -> Result<(), JsValue> {
        self.sim.apply(&Interaction::Hold { active }).map_err(js_err)
    }
}

/// Catalog cards matching `query`, as JSON.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn list_simulations(query: &str) -> Result<String, JsValue> {
    gallery::filter_json(query).map_err(js_err)
}
