//! Marker styling and tooltip text for parks that pass the filters.

use serde::{Deserialize, Serialize};

use crate::classifier::filters::ParkFlags;
use crate::model::{ActivationEvent, Park};
use crate::recency::is_new;

pub const NEW_PARK_COLOR: &str = "#800080";
pub const USER_ACTIVATED_COLOR: &str = "#00ff00";
pub const DEFAULT_COLOR: &str = "#ff6666";
pub const STROKE_COLOR: &str = "#000";

const ACTIVE_RADIUS: u32 = 7;
const IDLE_RADIUS: u32 = 6;
const STROKE_WEIGHT: u32 = 1;
const FILL_OPACITY: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerClass {
    /// Park with an activator on the air.
    #[serde(rename = "pulse-marker")]
    Pulse,
    #[serde(rename = "park-marker")]
    Park,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleOptions {
    pub radius: u32,
    pub fill_color: String,
    pub color: String,
    pub weight: u32,
    pub fill_opacity: f64,
}

/// How a park that passed both filter gates is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayState {
    pub marker_class_name: MarkerClass,
    pub use_div_icon: bool,
    pub current_activation: Option<ActivationEvent>,
    pub tooltip_text: String,
    pub circle_opts: CircleOptions,
}

impl DisplayState {
    pub fn derive(
        park: &Park,
        activation: Option<&ActivationEvent>,
        flags: &ParkFlags,
        age_days: f64,
    ) -> Self {
        let active = activation.is_some();

        Self {
            marker_class_name: if active {
                MarkerClass::Pulse
            } else {
                MarkerClass::Park
            },
            use_div_icon: false,
            current_activation: activation.cloned(),
            tooltip_text: tooltip_text(park, activation),
            circle_opts: CircleOptions {
                radius: if active { ACTIVE_RADIUS } else { IDLE_RADIUS },
                fill_color: fill_color(age_days, flags.is_user_activated).to_string(),
                color: STROKE_COLOR.to_string(),
                weight: STROKE_WEIGHT,
                fill_opacity: FILL_OPACITY,
            },
        }
    }
}

/// New parks are purple whatever else is true of them, then parks the user
/// has activated are green, everything else salmon.
pub fn fill_color(age_days: f64, is_user_activated: bool) -> &'static str {
    if is_new(age_days) {
        NEW_PARK_COLOR
    } else if is_user_activated {
        USER_ACTIVATED_COLOR
    } else {
        DEFAULT_COLOR
    }
}

pub fn tooltip_text(park: &Park, activation: Option<&ActivationEvent>) -> String {
    let Some(activation) = activation else {
        return format!(
            "{}: {} ({} activations)",
            park.reference, park.name, park.activations
        );
    };

    let mut text = format!(
        "{}: {} <br> {} on {} kHz ({})",
        park.reference,
        park.name,
        activation.activator.as_deref().unwrap_or_default(),
        activation.frequency.as_deref().unwrap_or_default(),
        activation.mode.as_deref().unwrap_or_default(),
    );

    if let Some(comments) = activation.comments.as_deref().filter(|c| !c.is_empty()) {
        text.push_str(" <br> ");
        text.push_str(comments);
    }

    text
}
