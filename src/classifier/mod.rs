//! Marker classification.
//!
//! Decides, for every geolocated park, whether it is shown and how it is
//! drawn, given the live spots, the parks the user has activated, and the
//! category and mode filters. Output keeps the input order.

pub mod display;
pub mod filters;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::clock::Clock;
use crate::mode::ModeBucket;
use crate::model::{ActivationEvent, Park, lenient};
use crate::recency::{age_days, is_new};

pub use display::{DisplayState, MarkerClass};
pub use filters::{CategoryFilters, ModeFilters, ParkFlags};

/// One classification pass worth of input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerRequest {
    #[serde(default, deserialize_with = "lenient::records")]
    pub parks: Vec<Park>,
    #[serde(default, deserialize_with = "lenient::string_set")]
    pub user_activated_references: HashSet<String>,
    #[serde(default, deserialize_with = "lenient::record_map")]
    pub spot_by_ref: HashMap<String, ActivationEvent>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub pota_filters: CategoryFilters,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub mode_filters: ModeFilters,
}

impl MarkerRequest {
    /// Decodes a request message; a payload that is not an object is an empty request.
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// A park that made it through both gates, with its display state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerDecision {
    pub park: Park,
    pub state: DisplayState,
}

pub fn classify(request: &MarkerRequest, clock: &dyn Clock) -> Vec<MarkerDecision> {
    classify_at(request, clock.now())
}

/// Runs the classification with a fixed "now"; identical input and `now`
/// give identical output.
pub fn classify_at(request: &MarkerRequest, now: DateTime<Utc>) -> Vec<MarkerDecision> {
    let mut decisions = Vec::new();
    let mut unlocated = 0usize;

    for park in &request.parks {
        if !park.is_geolocated() {
            unlocated += 1;
            continue;
        }

        let activation = request.spot_by_ref.get(&park.reference);
        let age = age_days(park.created.as_deref(), now);
        let flags = ParkFlags {
            is_user_activated: request.user_activated_references.contains(&park.reference),
            is_active: activation.is_some(),
            is_new: is_new(age),
        };

        if !request.pota_filters.admits(&flags) {
            continue;
        }

        let bucket = activation.map_or(ModeBucket::Unk, ActivationEvent::bucket);
        if !request.mode_filters.admits(&flags, bucket) {
            continue;
        }

        decisions.push(MarkerDecision {
            park: park.clone(),
            state: DisplayState::derive(park, activation, &flags, age),
        });
    }

    debug!(
        parks = request.parks.len(),
        unlocated,
        shown = decisions.len(),
        "Classified park markers"
    );

    decisions
}
