//! Staleness detection
//!
//! A PR is stale when the base commit GitHub recorded for it is no longer
//! the tip of its base branch and the tip has not already been merged into
//! it. Ancestry comes from the platform's merge-base query.

use crate::error::Result;
use crate::platform::PlatformService;
use tracing::{debug, warn};

/// Relation between a PR's recorded base commit and the live base tip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// Recorded base is the tip, or already contains it
    UpToDate,
    /// Recorded base is an ancestor of the tip
    Behind,
    /// No usable ancestry between the two (e.g. base was force-pushed)
    Diverged,
}

impl Staleness {
    /// Whether CI should be re-run
    pub const fn is_stale(self) -> bool {
        !matches!(self, Self::UpToDate)
    }
}

/// Classify from the merge base of `tip` and `recorded`
///
/// `merge_base` is ignored when `recorded == tip`.
pub fn classify(tip: &str, recorded: &str, merge_base: Option<&str>) -> Staleness {
    if recorded == tip {
        return Staleness::UpToDate;
    }
    match merge_base {
        Some(mb) if mb == tip => Staleness::UpToDate,
        Some(mb) if mb == recorded => Staleness::Behind,
        _ => Staleness::Diverged,
    }
}

/// Decides staleness using the platform's merge-base query
pub struct StalenessDetector<'a> {
    platform: &'a dyn PlatformService,
}

impl<'a> StalenessDetector<'a> {
    /// Create a detector over `platform`
    pub fn new(platform: &'a dyn PlatformService) -> Self {
        Self { platform }
    }

    /// Classify `recorded` against `tip`
    ///
    /// No API call is made when the two are equal.
    pub async fn check(&self, tip: &str, recorded: &str) -> Result<Staleness> {
        if recorded == tip {
            return Ok(Staleness::UpToDate);
        }

        let merge_base = self.platform.get_merge_base(tip, recorded).await?;
        let staleness = classify(tip, recorded, merge_base.as_deref());
        if staleness == Staleness::Diverged {
            warn!(
                tip,
                recorded,
                merge_base = ?merge_base,
                "base history diverged from recorded base; treating as stale"
            );
        } else {
            debug!(tip, recorded, ?staleness, "classified base");
        }
        Ok(staleness)
    }

    /// Whether the PR whose base was recorded at `recorded` needs a re-run
    pub async fn is_stale(&self, tip: &str, recorded: &str) -> Result<bool> {
        Ok(self.check(tip, recorded).await?.is_stale())
    }
}
