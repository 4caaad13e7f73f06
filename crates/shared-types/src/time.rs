//! Second-resolution timestamps used by blocks, expirations and vesting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimePointSec(pub u32);

impl TimePointSec {
    pub const MIN: TimePointSec = TimePointSec(0);
    pub const MAX: TimePointSec = TimePointSec(u32::MAX);

    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    pub fn secs(&self) -> u32 {
        self.0
    }

    pub fn saturating_add(self, secs: u32) -> Self {
        Self(self.0.saturating_add(secs))
    }

    pub fn saturating_sub(self, secs: u32) -> Self {
        Self(self.0.saturating_sub(secs))
    }

    /// Seconds elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn seconds_since(&self, earlier: TimePointSec) -> u32 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for TimePointSec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}
