//! Operating-mode buckets shared by the classifier and the QSO aggregator.

use serde::{Deserialize, Serialize};

/// One of the four buckets every free-text mode collapses into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeBucket {
    Cw,
    Ssb,
    Data,
    Unk,
}

impl ModeBucket {
    /// Normalizes a spotted or logged mode, case-insensitively.
    ///
    /// | Mode                          | Bucket |
    /// |-------------------------------|--------|
    /// | CW                            | cw     |
    /// | SSB, PHONE                    | ssb    |
    /// | FT8, FT4, DATA, DIGITAL       | data   |
    /// | anything else, or missing     | unk    |
    pub fn from_mode(mode: Option<&str>) -> Self {
        let Some(mode) = mode else {
            return ModeBucket::Unk;
        };

        match mode.to_ascii_uppercase().as_str() {
            "CW" => ModeBucket::Cw,
            "SSB" | "PHONE" => ModeBucket::Ssb,
            "FT8" | "FT4" | "DATA" | "DIGITAL" => ModeBucket::Data,
            _ => ModeBucket::Unk,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModeBucket::Cw => "cw",
            ModeBucket::Ssb => "ssb",
            ModeBucket::Data => "data",
            ModeBucket::Unk => "unk",
        }
    }
}

/// Per-mode QSO counts for one park reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeCounts {
    pub cw: u64,
    pub data: u64,
    pub ssb: u64,
    pub unk: u64,
}

impl ModeCounts {
    pub fn add(&mut self, bucket: ModeBucket, count: u64) {
        let slot = match bucket {
            ModeBucket::Cw => &mut self.cw,
            ModeBucket::Ssb => &mut self.ssb,
            ModeBucket::Data => &mut self.data,
            ModeBucket::Unk => &mut self.unk,
        };
        *slot = slot.saturating_add(count);
    }

    pub fn get(&self, bucket: ModeBucket) -> u64 {
        match bucket {
            ModeBucket::Cw => self.cw,
            ModeBucket::Ssb => self.ssb,
            ModeBucket::Data => self.data,
            ModeBucket::Unk => self.unk,
        }
    }

    pub fn total(&self) -> u64 {
        self.cw
            .saturating_add(self.data)
            .saturating_add(self.ssb)
            .saturating_add(self.unk)
    }
}
