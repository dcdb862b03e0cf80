use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// How long a dismissed prompt stays away.
///
/// `Never` is a long timed suppression rather than a permanent opt-out, so
/// users who refused once are asked again after a season's worth of races.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DismissStrategy {
    NotNow,
    MaybeLater,
    Never,
}

impl DismissStrategy {
    pub const ALL: [DismissStrategy; 3] = [
        DismissStrategy::NotNow,
        DismissStrategy::MaybeLater,
        DismissStrategy::Never,
    ];

    pub fn duration(&self) -> Duration {
        match self {
            DismissStrategy::NotNow => Duration::days(3),
            DismissStrategy::MaybeLater => Duration::days(7),
            DismissStrategy::Never => Duration::days(30),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DismissStrategy::NotNow => "not-now",
            DismissStrategy::MaybeLater => "maybe-later",
            DismissStrategy::Never => "never",
        }
    }
}

impl fmt::Display for DismissStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DismissStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown dismiss strategy '{}' (expected not-now, maybe-later or never)",
                    s
                )
            })
    }
}
