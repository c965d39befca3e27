//! Per-park, per-mode QSO aggregation.
//!
//! The aggregator holds a snapshot of parks and contact records, replaced
//! wholesale by `INIT`, and answers `COMPUTE` requests for a set of park
//! references against whatever snapshot it currently holds.

pub mod cache;
pub mod totals;

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::mode::ModeCounts;
use crate::model::{ContactRecord, Park, lenient};

pub use cache::ModeCountCache;
pub use totals::{ActivationSummary, sum_mode_totals};

/// Counts keyed by park reference. References without records are absent.
pub type QsoResult = BTreeMap<String, ModeCounts>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitPayload {
    #[serde(default, deserialize_with = "lenient::records")]
    pub parks: Vec<Park>,
    #[serde(default, deserialize_with = "lenient::records")]
    pub activations: Vec<ContactRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputePayload {
    #[serde(default, deserialize_with = "lenient::strings")]
    pub references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum QsoRequest {
    #[serde(rename = "INIT")]
    Init(InitPayload),
    #[serde(rename = "COMPUTE")]
    Compute(ComputePayload),
}

impl QsoRequest {
    /// Decodes a protocol message. Unknown or untyped messages yield `None`;
    /// a missing or malformed payload is treated as empty.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut message) = value else {
            return None;
        };

        let payload = message.remove("payload").unwrap_or(Value::Null);
        match message.get("type").and_then(Value::as_str) {
            Some("INIT") => Some(QsoRequest::Init(
                serde_json::from_value(payload).unwrap_or_default(),
            )),
            Some("COMPUTE") => Some(QsoRequest::Compute(
                serde_json::from_value(payload).unwrap_or_default(),
            )),
            other => {
                warn!(message_type = ?other, "Ignoring unknown QSO worker message");
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum QsoResponse {
    #[serde(rename = "INIT_OK")]
    InitOk,
    #[serde(rename = "COMPUTE_DONE")]
    ComputeDone { result: QsoResult },
}

/// The data the aggregator was last initialized with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QsoSnapshot {
    pub parks: Vec<Park>,
    pub activations: Vec<ContactRecord>,
}

impl QsoSnapshot {
    pub fn new(parks: Vec<Park>, activations: Vec<ContactRecord>) -> Self {
        Self { parks, activations }
    }

    /// Sums the counts of every record whose reference was requested.
    pub fn compute(&self, references: &[String]) -> QsoResult {
        let wanted: HashSet<&str> = references.iter().map(String::as_str).collect();
        let mut result = QsoResult::new();
        let mut unreferenced = 0usize;

        for record in &self.activations {
            let Some(reference) = record.resolved_reference() else {
                unreferenced += 1;
                continue;
            };
            if !wanted.contains(reference) {
                continue;
            }

            result
                .entry(reference.to_string())
                .or_default()
                .add(record.bucket(), record.resolved_count());
        }

        debug!(
            requested = wanted.len(),
            matched = result.len(),
            unreferenced,
            "Computed QSO mode counts"
        );

        result
    }
}

/// Applies one protocol message to the aggregator state.
pub fn handle(state: QsoSnapshot, request: QsoRequest) -> (QsoSnapshot, QsoResponse) {
    match request {
        QsoRequest::Init(payload) => {
            debug!(
                parks = payload.parks.len(),
                activations = payload.activations.len(),
                "QSO snapshot replaced"
            );
            (
                QsoSnapshot::new(payload.parks, payload.activations),
                QsoResponse::InitOk,
            )
        }
        QsoRequest::Compute(payload) => {
            let result = state.compute(&payload.references);
            (state, QsoResponse::ComputeDone { result })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn init(value: Value) -> QsoRequest {
        QsoRequest::from_value(json!({"type": "INIT", "payload": value})).unwrap()
    }

    fn compute(references: &[&str]) -> QsoRequest {
        QsoRequest::Compute(ComputePayload {
            references: references.iter().map(|r| r.to_string()).collect(),
        })
    }

    fn result_of(response: QsoResponse) -> QsoResult {
        match response {
            QsoResponse::ComputeDone { result } => result,
            other => panic!("expected COMPUTE_DONE, got {other:?}"),
        }
    }

    #[test]
    fn test_init_then_compute_buckets_by_mode() {
        let (state, response) = handle(
            QsoSnapshot::default(),
            init(json!({
                "parks": [],
                "activations": [
                    {"reference": "K-1", "mode": "CW", "qsos": 3},
                    {"reference": "K-1", "mode": "ft8", "count": 2}
                ]
            })),
        );
        assert_eq!(response, QsoResponse::InitOk);

        let (_, response) = handle(state, compute(&["K-1", "K-2"]));
        let result = result_of(response);

        assert_eq!(result.len(), 1);
        assert_eq!(
            result["K-1"],
            ModeCounts {
                cw: 3,
                data: 2,
                ssb: 0,
                unk: 0
            }
        );
        assert!(!result.contains_key("K-2"));
    }

    #[test]
    fn test_compute_before_init_is_empty() {
        let (_, response) = handle(QsoSnapshot::default(), compute(&["K-1"]));
        assert!(result_of(response).is_empty());
    }

    #[test]
    fn test_init_replaces_rather_than_merges() {
        let (state, _) = handle(
            QsoSnapshot::default(),
            init(json!({"activations": [{"reference": "K-1", "mode": "CW", "qsos": 5}]})),
        );
        let (state, _) = handle(
            state,
            init(json!({"activations": [{"reference": "K-2", "mode": "SSB", "qsos": 1}]})),
        );

        let (_, response) = handle(state, compute(&["K-1", "K-2"]));
        let result = result_of(response);
        assert!(!result.contains_key("K-1"));
        assert_eq!(result["K-2"].ssb, 1);
    }

    #[test]
    fn test_compute_does_not_change_the_snapshot() {
        let snapshot = QsoSnapshot::new(
            Vec::new(),
            vec![ContactRecord {
                reference: Some("K-1".into()),
                mode: Some("SSB".into()),
                ..Default::default()
            }],
        );
        let (after, _) = handle(snapshot.clone(), compute(&["K-1"]));
        assert_eq!(after, snapshot);
    }

    #[test]
    fn test_records_without_reference_are_skipped() {
        let snapshot = QsoSnapshot::new(
            Vec::new(),
            crate::model::decode_records(json!([
                {"mode": "CW", "qsos": 10},
                {"park": "K-7", "mode": "phone"},
                {"ref": "K-7", "mode": "rtty", "qsos": "x"}
            ])),
        );

        let result = snapshot.compute(&["K-7".to_string()]);
        assert_eq!(
            result["K-7"],
            ModeCounts {
                cw: 0,
                data: 0,
                ssb: 1,
                unk: 1
            }
        );
    }

    #[test]
    fn test_request_decoding_is_lenient() {
        assert_eq!(
            QsoRequest::from_value(json!({"type": "COMPUTE"})),
            Some(QsoRequest::Compute(ComputePayload::default()))
        );
        assert_eq!(
            QsoRequest::from_value(json!({"type": "INIT", "payload": {"parks": "bad"}})),
            Some(QsoRequest::Init(InitPayload::default()))
        );
        assert_eq!(QsoRequest::from_value(json!({"type": "RESET"})), None);
        assert_eq!(QsoRequest::from_value(json!([1, 2])), None);
    }

    #[test]
    fn test_responses_use_wire_names() {
        assert_eq!(
            serde_json::to_value(QsoResponse::InitOk).unwrap(),
            json!({"type": "INIT_OK"})
        );

        let mut result = QsoResult::new();
        result.insert("K-1".into(), ModeCounts::default());
        assert_eq!(
            serde_json::to_value(QsoResponse::ComputeDone { result }).unwrap(),
            json!({
                "type": "COMPUTE_DONE",
                "payload": {"result": {"K-1": {"cw": 0, "data": 0, "ssb": 0, "unk": 0}}}
            })
        );
    }
}
