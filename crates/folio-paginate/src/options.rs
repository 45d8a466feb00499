//! Pagination configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PaginateError;

/// Elements that may be split across pages unless configured otherwise.
pub const DEFAULT_FRAGMENTABLE: &str = "ol, ul, dl, div, p, details, section";

/// Elements that may be moved past their neighbours to fill a page.
pub const DEFAULT_SHIFTABLE: &str = "figure";

/// Recognized pagination options.
///
/// Every field has a default, so a JSON config only needs to name what it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaginateOptions {
    /// Selector list of elements eligible for recursive splitting.
    pub fragmentable: String,
    /// Selector list of elements that may be shifted instead of breaking.
    pub shiftable: String,
    /// Selector list of the sections [`crate::paginate_all`] paginates.
    pub section_selector: String,
    /// Page width divided by page height.
    pub aspect_ratio: f32,
    /// Pages fitted between two commits to the tree.
    pub render_interval: usize,
    /// Pages between two confirmation prompts, if any.
    pub confirm_interval: Option<usize>,
    /// Page ceiling per section.
    pub max_pages: usize,
    /// How long to wait for one resource before measuring anyway.
    pub resource_timeout_ms: u64,
    /// Rounding slack, in layout units, allowed when testing a fit.
    pub tolerance: f32,
    /// Whether pages get a running header built from open headings.
    pub running_headers: bool,
    /// Leave visual annotations (empty-space placeholders) in the output.
    pub verbose: bool,
}

impl Default for PaginateOptions {
    fn default() -> Self {
        Self {
            fragmentable: DEFAULT_FRAGMENTABLE.to_string(),
            shiftable: DEFAULT_SHIFTABLE.to_string(),
            section_selector: ".page".to_string(),
            aspect_ratio: 8.5 / 11.0,
            render_interval: 10,
            confirm_interval: None,
            max_pages: 300,
            resource_timeout_ms: 5000,
            tolerance: 0.5,
            running_headers: true,
            verbose: false,
        }
    }
}

impl PaginateOptions {
    /// The resource wait bound as a [`Duration`].
    #[must_use]
    pub const fn resource_timeout(&self) -> Duration {
        Duration::from_millis(self.resource_timeout_ms)
    }

    /// Reject options that cannot paginate anything.
    ///
    /// # Errors
    ///
    /// Returns [`PaginateError::Options`] naming the first bad field.
    pub fn validate(&self) -> Result<(), PaginateError> {
        if !(self.aspect_ratio.is_finite() && self.aspect_ratio > 0.0) {
            return Err(PaginateError::Options(format!(
                "aspect_ratio must be positive, got {}",
                self.aspect_ratio
            )));
        }
        if self.render_interval == 0 {
            return Err(PaginateError::Options(
                "render_interval must be at least 1".to_string(),
            ));
        }
        if self.confirm_interval == Some(0) {
            return Err(PaginateError::Options(
                "confirm_interval must be at least 1".to_string(),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(PaginateError::Options(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}
