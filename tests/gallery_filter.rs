use proptest::prelude::*;
use vivarium_lib::gallery::{catalog, filter, filter_entries, filter_json, Listing};

#[test]
fn test_filter_is_case_insensitive() {
    assert_eq!(filter("NATURE"), filter("nature"));
    assert_eq!(filter("  Nature "), filter("nature"));
}

#[test]
fn test_filter_searches_title_description_and_tags() {
    let by_title = filter("galactic");
    assert_eq!(by_title.entries().len(), 1);
    assert_eq!(by_title.entries()[0].id, "space");

    let by_description = filter("marine snow");
    assert_eq!(by_description.entries()[0].id, "jellyfish");

    let by_tag = filter("day-night");
    assert_eq!(by_tag.entries()[0].id, "trees");
}

#[test]
fn test_unknown_substring_yields_no_results() {
    let listing = filter("zzz-not-a-tag");
    assert_eq!(listing, Listing::NoResults);
    assert!(listing.entries().is_empty());
    assert_eq!(filter_json("zzz-not-a-tag").unwrap(), r#"{"status":"no_results"}"#);
}

#[test]
fn test_json_lists_matching_cards() {
    let json = filter_json("ocean").unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["status"], "matches");
    let ids: Vec<&str> = value["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["jellyfish", "aquarium"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn test_filter_is_idempotent(query in "[a-zA-Z -]{0,8}") {
        let once = filter(&query);
        let twice = filter_entries(once.entries(), &query);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_filter_ignores_case(query in "[a-z]{1,6}") {
        prop_assert_eq!(filter(&query.to_uppercase()), filter(&query));
    }

    #[test]
    fn test_results_are_a_subset_of_the_catalog(query in "[a-z]{0,4}") {
        let all = catalog();
        for card in filter(&query).entries() {
            prop_assert!(all.contains(card));
        }
    }
}
