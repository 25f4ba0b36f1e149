/// Asserts that a census label reports exactly the given count.
#[macro_export]
macro_rules! assert_census {
    ($sim:expr, $label:expr, $count:expr) => {
        let census = $sim.census();
        assert_eq!(
            census.count($label),
            $count,
            "{} count mismatch in {:?}",
            $label,
            census
        );
    };
}

/// Asserts that a census label lies within an inclusive range.
#[macro_export]
macro_rules! assert_census_within {
    ($sim:expr, $label:expr, $lo:expr, $hi:expr) => {
        let value = $sim
            .census()
            .get($label)
            .unwrap_or_else(|| panic!("census has no {}", $label));
        assert!(
            value >= $lo && value <= $hi,
            "{} = {} is outside [{}, {}]",
            $label,
            value,
            $lo,
            $hi
        );
    };
}

/// Asserts that the total live population matches the expected value.
#[macro_export]
macro_rules! assert_population {
    ($sim:expr, $count:expr) => {
        assert_eq!($sim.population(), $count, "Population count mismatch");
    };
}
