//! The two filter gates a park passes through before it gets a marker.

use serde::{Deserialize, Serialize};

use crate::mode::ModeBucket;
use crate::model::lenient;

/// What is known about a park for filtering purposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParkFlags {
    pub is_user_activated: bool,
    pub is_active: bool,
    pub is_new: bool,
}

/// Activity-category filters.
///
/// Flags are tri-state: an unset flag behaves differently from an explicit
/// `false` when `allParks` is on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFilters {
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub all_parks: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub my_activations: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub currently_activating: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub new_parks: Option<bool>,
}

impl CategoryFilters {
    pub fn all_enabled() -> Self {
        Self {
            all_parks: Some(true),
            my_activations: Some(true),
            currently_activating: Some(true),
            new_parks: Some(true),
        }
    }

    /// With `allParks` on, everything passes except categories switched off
    /// explicitly. Otherwise the enabled categories are OR-ed together and
    /// nothing passes when none is enabled.
    pub fn admits(&self, flags: &ParkFlags) -> bool {
        if is_on(self.all_parks) {
            let excluded = (self.my_activations == Some(false) && flags.is_user_activated)
                || (self.currently_activating == Some(false) && flags.is_active)
                || (self.new_parks == Some(false) && flags.is_new);
            return !excluded;
        }

        (is_on(self.my_activations) && flags.is_user_activated)
            || (is_on(self.currently_activating) && flags.is_active)
            || (is_on(self.new_parks) && flags.is_new)
    }
}

/// Mode filters; they only restrict parks that are on the air right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeFilters {
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub cw: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub ssb: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<bool>,
    /// Gates active parks that are also new, regardless of mode.
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub new: Option<bool>,
    #[serde(
        default,
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub unk: Option<bool>,
}

impl ModeFilters {
    pub fn all_enabled() -> Self {
        Self {
            cw: Some(true),
            ssb: Some(true),
            data: Some(true),
            new: Some(true),
            unk: Some(true),
        }
    }

    pub fn enabled(&self, bucket: ModeBucket) -> bool {
        let flag = match bucket {
            ModeBucket::Cw => self.cw,
            ModeBucket::Ssb => self.ssb,
            ModeBucket::Data => self.data,
            ModeBucket::Unk => self.unk,
        };
        is_on(flag)
    }

    pub fn admits(&self, flags: &ParkFlags, bucket: ModeBucket) -> bool {
        if !flags.is_active {
            return true;
        }
        if flags.is_new && !is_on(self.new) {
            return false;
        }
        self.enabled(bucket)
    }
}

fn is_on(flag: Option<bool>) -> bool {
    flag.unwrap_or(false)
}
