//! Error types for pagination passes.
//!
//! Recoverable outcomes (oversized content, non-convergence, slow resources)
//! are not errors; they are reported as [`crate::Diagnostic`]s. What remains
//! here are collaborator contract violations that end a pass.

use folio_dom::{DomError, NodeId};
use thiserror::Error;

/// Failure of the layout collaborator to measure something.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    /// The node is not part of the measured tree.
    #[error("cannot measure unknown node {0:?}")]
    UnknownNode(NodeId),
    /// `last` is not reachable from `first` by walking next siblings.
    #[error("span from {first:?} does not reach {last:?}")]
    BrokenSpan {
        /// First node of the span.
        first: NodeId,
        /// Node the walk never reached.
        last: NodeId,
    },
    /// A measurement came back as NaN or infinite.
    #[error("non-finite height {height} for {node:?}")]
    NonFinite {
        /// Measured node.
        node: NodeId,
        /// Offending value.
        height: f32,
    },
}

/// Errors that terminate a pagination pass.
#[derive(Debug, Error)]
pub enum PaginateError {
    /// A tree operation was handed an unsuitable node.
    #[error(transparent)]
    Dom(#[from] DomError),
    /// The layout collaborator failed.
    #[error(transparent)]
    Layout(#[from] LayoutError),
    /// A fragmentable/shiftable/section selector could not be parsed.
    #[error("invalid selector {selector:?}: {reason}")]
    Selector {
        /// The selector text.
        selector: String,
        /// What was wrong with it.
        reason: String,
    },
    /// Options that cannot produce pages.
    #[error("invalid options: {0}")]
    Options(String),
    /// The section to paginate is not an attached element.
    #[error("node {0:?} cannot be paginated: not an attached element")]
    NotASection(NodeId),
}
