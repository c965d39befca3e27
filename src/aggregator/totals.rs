//! Mode totals over a park's activation history.
//!
//! The history endpoint reports one summary per activation with per-mode QSO
//! columns (`qsosCW`, `qsosDATA`, `qsosPHONE`). Older exports use the short
//! names `cw`, `data`, `phone`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::mode::{ModeBucket, ModeCounts};
use crate::model::value_as_f64;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivationSummary {
    #[serde(rename = "qsosCW", default, skip_serializing_if = "Option::is_none")]
    pub qsos_cw: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cw: Option<Value>,
    #[serde(rename = "qsosDATA", default, skip_serializing_if = "Option::is_none")]
    pub qsos_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(rename = "qsosPHONE", default, skip_serializing_if = "Option::is_none")]
    pub qsos_phone: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ActivationSummary {
    fn column(primary: &Option<Value>, fallback: &Option<Value>) -> u64 {
        [primary, fallback]
            .into_iter()
            .flatten()
            .filter_map(value_as_f64)
            .find(|n| n.is_finite() && *n != 0.0)
            .filter(|n| *n > 0.0)
            .map(|n| n as u64)
            .unwrap_or(0)
    }
}

/// Sums per-activation summaries into cw / data / ssb totals. Values that are
/// not numbers contribute nothing.
pub fn sum_mode_totals(summaries: &[ActivationSummary]) -> ModeCounts {
    let mut totals = ModeCounts::default();

    for summary in summaries {
        totals.add(
            ModeBucket::Cw,
            ActivationSummary::column(&summary.qsos_cw, &summary.cw),
        );
        totals.add(
            ModeBucket::Data,
            ActivationSummary::column(&summary.qsos_data, &summary.data),
        );
        totals.add(
            ModeBucket::Ssb,
            ActivationSummary::column(&summary.qsos_phone, &summary.phone),
        );
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::decode_records;
    use serde_json::json;

    #[test]
    fn test_sums_history_columns() {
        let summaries: Vec<ActivationSummary> = decode_records(json!([
            {"activeCallsign": "K1ABC", "qsosCW": 12, "qsosDATA": 30, "qsosPHONE": 4, "totalQSOs": 46},
            {"activeCallsign": "W2XYZ", "qsosCW": 0, "qsosDATA": "8", "qsosPHONE": 10}
        ]));

        assert_eq!(
            sum_mode_totals(&summaries),
            ModeCounts {
                cw: 12,
                data: 38,
                ssb: 14,
                unk: 0
            }
        );
    }

    #[test]
    fn test_short_names_fill_in_for_zero_or_missing_columns() {
        let summaries: Vec<ActivationSummary> = decode_records(json!([
            {"qsosCW": 0, "cw": 5, "data": 2, "phone": "junk"}
        ]));

        let totals = sum_mode_totals(&summaries);
        assert_eq!(totals.cw, 5);
        assert_eq!(totals.data, 2);
        assert_eq!(totals.ssb, 0);
    }

    #[test]
    fn test_empty_history() {
        assert_eq!(sum_mode_totals(&[]), ModeCounts::default());
    }
}
