//! Unit coverage for the reconciliation engine.

use super::*;
use crate::CitySnapshot;
use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};

fn dataset(rows: &[(&str, &str, &str)]) -> StopDataset {
    let fetched_at = Utc
        .with_ymd_and_hms(2024, 5, 1, 6, 0, 0)
        .single()
        .expect("valid timestamp");
    let mut cities: Vec<CitySnapshot> = Vec::new();
    for &(locality, id, value) in rows {
        let stop = StopRecord::new(id, value, "");
        match cities.iter_mut().find(|city| city.locality == locality) {
            Some(city) => city.stops.push(stop),
            None => cities.push(CitySnapshot::new(locality, fetched_at, vec![stop])),
        }
    }
    StopDataset::from_snapshots(cities)
}

#[fixture]
fn markt_and_bahnhof() -> MapSnapshot {
    MapSnapshot::from_elements([
        MapElement::node(10, 54.30, 13.09).with_name("Markt"),
        MapElement::node(11, 54.31, 13.08).with_name("Bahnhof"),
    ])
}

#[rstest]
fn exact_name_match_produces_single_matched_group() {
    let stops = dataset(&[("Stralsund", "1", "Markt")]);
    let map = MapSnapshot::from_elements([MapElement::node(10, 54.3, 13.1).with_name("Markt")]);

    let result = reconcile(&stops, &map, OrphanPolicy::PerComparison);

    assert_eq!(result.groups.len(), 1);
    let group = &result.groups[0];
    assert_eq!(group.name, "Markt");
    assert_eq!(group.stop_id.as_deref(), Some("1"));
    assert_eq!(group.locality, "Stralsund");
    assert_eq!(group.elements, map.elements);
    assert_eq!(result.orphans().count(), 0);
}

#[rstest]
fn mismatch_produces_orphan_then_empty_candidate() {
    let stops = dataset(&[("Stralsund", "1", "Markt")]);
    let map = MapSnapshot::from_elements([MapElement::node(11, 54.3, 13.1).with_name("Bahnhof")]);

    let result = reconcile(&stops, &map, OrphanPolicy::PerComparison);

    assert_eq!(result.groups.len(), 2);
    let orphan = &result.groups[0];
    assert!(orphan.is_orphan());
    assert_eq!(orphan.name, "Bahnhof");
    assert_eq!(orphan.locality, "Stralsund");
    assert_eq!(orphan.elements.len(), 1);

    let candidate = &result.groups[1];
    assert_eq!(candidate.name, "Markt");
    assert!(candidate.elements.is_empty());
    assert!(!candidate.is_orphan());
}

#[rstest]
fn unmatched_elements_repeat_once_per_stop(markt_and_bahnhof: MapSnapshot) {
    let stops = dataset(&[
        ("Parow", "1", "Markt"),
        ("Parow", "2", "Schule"),
        ("Prohn", "3", "Kirche"),
    ]);

    let result = reconcile(&stops, &markt_and_bahnhof, OrphanPolicy::PerComparison);

    assert_eq!(result.comparisons, 6);
    let bahnhof_orphans: Vec<_> = result
        .orphans()
        .filter(|group| group.name == "Bahnhof")
        .map(|group| group.locality.as_str())
        .collect();
    assert_eq!(bahnhof_orphans, vec!["Parow", "Parow", "Prohn"]);
    // "Markt" matches stop 1 but fails against stops 2 and 3.
    assert_eq!(
        result.orphans().filter(|group| group.name == "Markt").count(),
        2
    );
    assert_eq!(result.matched().count(), 3);
}

#[rstest]
fn emission_order_follows_locality_then_stop_then_element(markt_and_bahnhof: MapSnapshot) {
    let stops = dataset(&[("Parow", "1", "Markt"), ("Prohn", "2", "Bahnhof")]);

    let result = reconcile(&stops, &markt_and_bahnhof, OrphanPolicy::PerComparison);

    let summary: Vec<_> = result
        .groups
        .iter()
        .map(|group| (group.name.as_str(), group.is_orphan(), group.locality.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Bahnhof", true, "Parow"),
            ("Markt", false, "Parow"),
            ("Markt", true, "Prohn"),
            ("Bahnhof", false, "Prohn"),
        ]
    );
}

#[rstest]
fn locality_is_not_part_of_the_comparison() {
    let stops = dataset(&[("Parow", "1", "Markt"), ("Prohn", "2", "Markt")]);
    let map = MapSnapshot::from_elements([MapElement::node(10, 54.3, 13.1).with_name("Markt")]);

    let result = reconcile(&stops, &map, OrphanPolicy::PerComparison);

    assert!(result.matched().all(|group| group.elements.len() == 1));
    assert_eq!(result.orphans().count(), 0);
}

#[rstest]
fn every_matching_element_is_associated() {
    let stops = dataset(&[("Stralsund", "1", "Markt")]);
    let map = MapSnapshot::from_elements([
        MapElement::node(10, 54.3, 13.1).with_name("Markt"),
        MapElement::node(12, 54.3, 13.1).with_name("Markt"),
    ]);

    let result = reconcile(&stops, &map, OrphanPolicy::PerComparison);

    let ids: Vec<_> = result.groups[0].elements.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![10, 12]);
}

#[rstest]
#[case(OrphanPolicy::PerComparison)]
#[case(OrphanPolicy::Deduplicated)]
fn empty_stop_dataset_yields_nothing(#[case] policy: OrphanPolicy, markt_and_bahnhof: MapSnapshot) {
    let result = reconcile(&StopDataset::default(), &markt_and_bahnhof, policy);
    assert!(result.groups.is_empty());
    assert_eq!(result.comparisons, 0);
}

#[rstest]
fn empty_map_yields_bare_candidates() {
    let stops = dataset(&[("Parow", "1", "Markt"), ("Parow", "2", "Schule")]);

    let result = reconcile(&stops, &MapSnapshot::default(), OrphanPolicy::PerComparison);

    assert_eq!(result.groups.len(), 2);
    assert!(result.groups.iter().all(|group| group.elements.is_empty()));
}

#[rstest]
fn nameless_element_matches_stop_with_empty_value() {
    let stops = dataset(&[("Parow", "1", "")]);
    let map = MapSnapshot::from_elements([MapElement::node(5, 0.0, 0.0)]);

    let result = reconcile(&stops, &map, OrphanPolicy::PerComparison);

    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].elements.len(), 1);
}

#[rstest]
fn deduplicated_policy_emits_each_orphan_once(markt_and_bahnhof: MapSnapshot) {
    let stops = dataset(&[
        ("Parow", "1", "Markt"),
        ("Parow", "2", "Schule"),
        ("Prohn", "3", "Kirche"),
    ]);

    let result = reconcile(&stops, &markt_and_bahnhof, OrphanPolicy::Deduplicated);

    assert_eq!(result.comparisons, 6);
    assert_eq!(result.matched().count(), 3);
    let orphans: Vec<_> = result.orphans().collect();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].name, "Bahnhof");
    assert_eq!(orphans[0].locality, "Parow");
    // Orphans trail the matched groups.
    assert!(result.groups.last().is_some_and(MatchedGroup::is_orphan));
}
