use std::sync::Arc;

use chrono::{TimeZone, Utc};
use potamap_engine::aggregator::ModeCountCache;
use potamap_engine::classifier::display::{NEW_PARK_COLOR, USER_ACTIVATED_COLOR};
use potamap_engine::classifier::{MarkerClass, MarkerDecision, MarkerRequest};
use potamap_engine::clock::{Clock, FixedClock};
use potamap_engine::config::FilterConfig;
use potamap_engine::mode::ModeCounts;
use potamap_engine::model::{
    ActivationEvent, activated_references, decode_contacts, decode_parks, decode_records,
    index_spots,
};
use potamap_engine::output::{ModeCountRow, append_mode_counts};
use potamap_engine::worker::{MarkerWorker, QsoWorker};
use serde_json::Value;

fn fixture(text: &str) -> Value {
    serde_json::from_str(text).expect("Failed to parse fixture")
}

fn clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()))
}

fn request(filters: FilterConfig) -> MarkerRequest {
    let parks = decode_parks(fixture(include_str!("fixtures/parks.json")));
    let spots: Vec<ActivationEvent> = decode_records(fixture(include_str!("fixtures/spots.json")));
    let records = decode_contacts(fixture(include_str!("fixtures/activations.json")));

    MarkerRequest {
        parks,
        user_activated_references: activated_references(&records),
        spot_by_ref: index_spots(spots),
        pota_filters: filters.pota_filters,
        mode_filters: filters.mode_filters,
    }
}

fn refs(decisions: &[MarkerDecision]) -> Vec<&str> {
    decisions.iter().map(|d| d.park.reference.as_str()).collect()
}

#[tokio::test]
async fn test_classify_fixture_with_default_filters() {
    let worker = MarkerWorker::spawn(clock());
    let decisions = worker.classify(request(FilterConfig::default())).await.unwrap();

    assert_eq!(refs(&decisions), vec!["US-0001", "US-0002", "US-0004", "US-0005"]);

    let acadia = &decisions[0].state;
    assert_eq!(acadia.marker_class_name, MarkerClass::Pulse);
    assert_eq!(acadia.circle_opts.radius, 7);
    assert_eq!(acadia.circle_opts.fill_color, USER_ACTIVATED_COLOR);
    assert_eq!(
        acadia.current_activation.as_ref().and_then(|a| a.mode.as_deref()),
        Some("CW")
    );
    assert_eq!(
        acadia.tooltip_text,
        "US-0001: Acadia National Park <br> K1ABC on 7032 kHz (CW) <br> QRP"
    );

    let katahdin = &decisions[1].state;
    assert_eq!(katahdin.marker_class_name, MarkerClass::Park);
    assert_eq!(katahdin.circle_opts.radius, 6);
    assert_eq!(katahdin.circle_opts.fill_color, NEW_PARK_COLOR);

    assert_eq!(decisions[2].state.circle_opts.fill_color, NEW_PARK_COLOR);
    assert_eq!(decisions[3].state.circle_opts.fill_color, USER_ACTIVATED_COLOR);
}

#[tokio::test]
async fn test_classify_fixture_with_saved_filters() {
    let filters = FilterConfig::parse(
        r#"{
            "potaFilters": {"allParks": false, "currentlyActivating": true},
            "modeFilters": {"new": true, "cw": true, "data": false}
        }"#,
    )
    .unwrap();

    let worker = MarkerWorker::spawn(clock());
    let decisions = worker.classify(request(filters)).await.unwrap();

    // US-0004 is on the air but on FT8, which is switched off
    assert_eq!(refs(&decisions), vec!["US-0001"]);
}

#[tokio::test]
async fn test_count_fixture_through_worker_and_csv() {
    let parks = decode_parks(fixture(include_str!("fixtures/parks.json")));
    let activations = decode_contacts(fixture(include_str!("fixtures/activations.json")));
    let references: Vec<String> = parks.iter().map(|p| p.reference.clone()).collect();

    let worker = QsoWorker::spawn();
    worker.init(parks, activations).await.unwrap();

    let mut cache = ModeCountCache::new();
    let computed = worker.compute_into(&mut cache, &references, 2).await.unwrap();
    assert_eq!(computed, 5);

    assert_eq!(
        cache.get("US-0001"),
        ModeCounts {
            cw: 0,
            data: 2,
            ssb: 4,
            unk: 1
        }
    );
    assert_eq!(cache.get("US-0005").cw, 10);
    assert_eq!(cache.get("US-0002").total(), 0);

    let path = std::env::temp_dir().join("potamap_engine_integration_counts.csv");
    let path = path.to_str().unwrap();
    let _ = std::fs::remove_file(path);

    let rows: Vec<ModeCountRow> = references
        .iter()
        .map(|r| ModeCountRow::new(r.as_str(), &cache.get(r)))
        .collect();
    append_mode_counts(path, &rows).unwrap();

    let content = std::fs::read_to_string(path).unwrap();
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines[0], "reference,cw,data,ssb,unk,total");
    assert_eq!(lines[1], "US-0001,0,2,4,1,7");
    assert_eq!(lines.len(), 6);

    std::fs::remove_file(path).unwrap();
}
