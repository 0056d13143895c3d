//! Quota categories, plans, and the server-owned usage snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Independently metered usage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaCategory {
    /// Media downloads (single items and archive batches).
    Download,
    /// Transcript extraction.
    Extract,
    /// AI summary.
    Summary,
}

impl QuotaCategory {
    /// Wire name of the category.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Extract => "extract",
            Self::Summary => "summary",
        }
    }
}

impl fmt::Display for QuotaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plan tier; limits per tier are defined and enforced server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Plan {
    #[default]
    Free,
    Pro,
    Elite,
}

/// Usage counters as last reported by the quota service.
///
/// Only ever built from a server response; the client never adjusts these
/// counters itself.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaSnapshot {
    /// Current plan tier.
    #[serde(default)]
    pub plan: Plan,
    /// Units consumed in the download category.
    #[serde(default)]
    pub download_count: u64,
    /// Units consumed in the extract category.
    #[serde(default)]
    pub extraction_count: u64,
    /// Units consumed in the summary category.
    #[serde(default)]
    pub summary_count: u64,
    /// When the current period or plan expires, as sent by the server.
    #[serde(default)]
    pub expire_time: Option<String>,
}

impl QuotaSnapshot {
    /// Consumed units for `category`.
    #[must_use]
    pub fn count(&self, category: QuotaCategory) -> u64 {
        match category {
            QuotaCategory::Download => self.download_count,
            QuotaCategory::Extract => self.extraction_count,
            QuotaCategory::Summary => self.summary_count,
        }
    }
}
