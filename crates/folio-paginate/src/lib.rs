//! Pagination of continuous HTML content into fixed-aspect-ratio pages.
//!
//! # Scope
//!
//! This crate implements:
//! - **Style facts** ([CSS Fragmentation Level 3](https://www.w3.org/TR/css-break-3/))
//!   - `break-before`, `break-after`, `break-inside` and the `page-break-*` aliases
//!   - `orphans` and `widows`
//!   - Block-axis box edges, `height`, `min-height`, `line-height`, `text-wrap`
//!
//! - **Measurement** ([CSS Display Level 3](https://www.w3.org/TR/css-display-3/))
//!   - A [`LayoutEngine`] seam for node and sibling-span heights
//!   - [`BlockFlow`], a deterministic vertical flow for headless runs
//!   - Height caches keyed by node and tree generation
//!
//! - **Fitting** ([§ 4 Controlling Breaks](https://www.w3.org/TR/css-break-3/#breaking-controls))
//!   - Greedy filling of a height budget with a container's children
//!   - Word-boundary text splits and recursive element splits
//!   - Shifting figures up or down to reduce unused space
//!   - Running heading context
//!
//! - **Fragmentation** ([§ 5 Rules for Breaking](https://www.w3.org/TR/css-break-3/#breaking-rules))
//!   - Moving consumed children into fragments of their container
//!   - List numbering, `details` summaries and preformatted text across breaks
//!
//! - **Pagination** ([CSS Paged Media Level 3](https://www.w3.org/TR/css-page-3/))
//!   - A step-wise [`Paginator`] per section, with render batches and confirmation prompts
//!   - Page numbers, running headers and empty-space hooks
//!   - Whole-document passes and link target pages
//!
//! # Not Yet Implemented
//!
//! - Combinators and pseudo-classes in selectors
//! - Margin collapsing in [`BlockFlow`]
//! - Inline formatting beyond fixed-width lines

/// Page numbers, running headers and empty-space hooks.
pub mod decorate;
/// Whole-document passes.
pub mod document;
/// Error types.
pub mod error;
/// Filling a height budget with a container's children.
pub mod fit;
/// Splitting elements into fragments.
pub mod fragment;
/// The running heading context.
pub mod heading;
/// Height measurement.
pub mod layout;
/// Pagination options.
pub mod options;
/// The section paginator.
pub mod paginator;
/// Per-pass caches and collaborators.
pub mod pass;
/// Resource readiness.
pub mod ready;
/// Node roles.
pub mod role;
/// Selector lists per [Selectors Level 4](https://www.w3.org/TR/selectors-4/).
pub mod selector;
/// Ordered node sequences with cached heights.
pub mod sequence;
/// Style facts.
pub mod style;

// Re-exports for convenience
pub use decorate::{PageDecoration, decorate_page};
pub use document::{DocumentSummary, TargetSummary, compute_targets, paginate_all};
pub use error::{LayoutError, PaginateError};
pub use fit::{Breaker, FitMode, FitRequest, FitResult, StopAt};
pub use fragment::fragment_element;
pub use heading::{HeadingStack, OpenHeading};
pub use layout::{BlockFlow, LayoutEngine, Measurer, Span};
pub use options::PaginateOptions;
pub use paginator::{PageGeometry, Paginator, SectionSummary, Step};
pub use pass::{Diagnostic, DiagnosticKind, Host, Pass};
pub use ready::{Readiness, ResourceHandle, ResourceLoader, Settled, SimulatedResources, StaticResources};
pub use role::Role;
pub use selector::SelectorList;
pub use sequence::NodeSequence;
pub use style::{InlineStyles, StyleFacts, StyleSource};

use folio_dom::{DomTree, NodeId};

/// Paginate one section to completion, numbering pages from 1.
///
/// # Errors
///
/// See [`Paginator::new`] and [`Paginator::step`].
pub fn paginate(
    dom: &mut DomTree,
    section: NodeId,
    options: &PaginateOptions,
    host: Host<'_>,
) -> Result<SectionSummary, PaginateError> {
    Paginator::new(dom, section, options, host, 0)?.run(dom)
}
