//! Format checks for submitted names and scores.
//!
//! These are pure functions: no clock, no store access. Identity rules live
//! here too, in [`PlayerName`], so case-folding happens exactly once at the
//! API boundary and every store key is already canonical.

use std::fmt;

use serde::Serialize;

pub const NAME_MIN_LEN: usize = 3;
pub const NAME_MAX_LEN: usize = 16;

/// Highest score considered plausible by default: one point per second for
/// at most an hour of play. Override through `Limits::max_score`.
pub const MAX_PLAUSIBLE_SCORE: i64 = 3_600;

/// True iff the trimmed input matches `[A-Za-z0-9_]{3,16}` exactly.
pub fn valid_name(raw: &str) -> bool {
    let name = raw.trim();
    (NAME_MIN_LEN..=NAME_MAX_LEN).contains(&name.len())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// True iff `value` is a positive integer no greater than `max`.
pub fn valid_score(value: i64, max: i64) -> bool {
    value > 0 && value <= max
}

/// Canonical player identifier: trimmed, format-checked, folded to lowercase.
///
/// Display casing is the client's concern; everything behind the API boundary
/// compares and stores the folded form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PlayerName(String);

impl PlayerName {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        valid_name(trimmed).then(|| Self(trimmed.to_lowercase()))
    }

    /// Wrap a value read back from the store. Keys were folded on the way in.
    pub(crate) fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
