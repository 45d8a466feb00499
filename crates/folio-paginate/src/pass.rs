//! State shared by everything that happens while paginating one section.

use std::collections::HashMap;
use std::fmt;

use folio_dom::{DomTree, NodeId};
use serde::Serialize;
use strum_macros::Display;

use crate::error::{LayoutError, PaginateError};
use crate::layout::{LayoutEngine, Measurer, Span};
use crate::options::PaginateOptions;
use crate::ready::{ReadyTracker, ResourceLoader, Settled};
use crate::role::{Role, classify};
use crate::selector::SelectorList;
use crate::sequence::NodeSequence;
use crate::style::{StyleCache, StyleFacts, StyleSource};

/// The collaborators a pass calls out to.
pub struct Host<'h> {
    /// Style facts.
    pub styles: &'h dyn StyleSource,
    /// Height measurement.
    pub layout: &'h dyn LayoutEngine,
    /// Resource readiness.
    pub resources: &'h mut dyn ResourceLoader,
}

impl<'h> Host<'h> {
    /// Bundle the collaborators.
    pub fn new(
        styles: &'h dyn StyleSource,
        layout: &'h dyn LayoutEngine,
        resources: &'h mut dyn ResourceLoader,
    ) -> Self {
        Self {
            styles,
            layout,
            resources,
        }
    }

    /// A shorter-lived host over the same collaborators, for one section.
    pub fn reborrow(&mut self) -> Host<'_> {
        Host {
            styles: self.styles,
            layout: self.layout,
            resources: &mut *self.resources,
        }
    }
}

impl fmt::Debug for Host<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}

/// Kind of a recovered problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DiagnosticKind {
    /// A single child was taller than the page and could not be split.
    Oversized,
    /// A page could not take any content; the section was left unfinished.
    NonConvergence,
    /// The page ceiling was reached.
    PageLimit,
    /// A resource failed to load and was measured as is.
    ResourceFailed,
    /// A resource did not settle in time and was measured as is.
    ResourceTimeout,
}

/// A problem pagination worked around.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// What happened.
    pub kind: DiagnosticKind,
    /// The node concerned, if any.
    pub node: Option<NodeId>,
    /// Human-readable detail.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some(node) => write!(f, "{} at node {}: {}", self.kind, node.0, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

/// Caches, options and collaborators for one pass over one section.
///
/// Style facts, roles, heights and readiness are memoized here and dropped
/// with the pass; fragment links and shift counters live on the tree.
pub struct Pass<'h> {
    pub(crate) host: Host<'h>,
    pub(crate) options: PaginateOptions,
    fragmentable: SelectorList,
    shiftable: SelectorList,
    styles: StyleCache,
    measurer: Measurer,
    roles: HashMap<NodeId, Role>,
    ready: ReadyTracker,
    diagnostics: Vec<Diagnostic>,
}

impl fmt::Debug for Pass<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pass")
            .field("options", &self.options)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

impl<'h> Pass<'h> {
    /// Start a pass.
    ///
    /// # Errors
    ///
    /// Fails on invalid options or selectors.
    pub fn new(host: Host<'h>, options: &PaginateOptions) -> Result<Self, PaginateError> {
        options.validate()?;
        Ok(Self {
            host,
            fragmentable: SelectorList::parse(&options.fragmentable)?,
            shiftable: SelectorList::parse(&options.shiftable)?,
            options: options.clone(),
            styles: StyleCache::new(),
            measurer: Measurer::new(),
            roles: HashMap::new(),
            ready: ReadyTracker::new(),
            diagnostics: Vec::new(),
        })
    }

    /// The options this pass runs with.
    #[must_use]
    pub const fn options(&self) -> &PaginateOptions {
        &self.options
    }

    /// Memoized style facts of `node`.
    pub fn style(&mut self, dom: &DomTree, node: NodeId) -> Option<StyleFacts> {
        self.styles.style(self.host.styles, dom, node)
    }

    /// Forget memoized style facts under `node` after its style changed.
    pub fn restyle(&mut self, dom: &DomTree, node: NodeId) {
        self.styles.forget(dom, node);
    }

    /// Whether `node` takes space in the flow.
    pub fn affects_layout(&mut self, dom: &DomTree, node: NodeId) -> bool {
        self.styles.affects_layout(self.host.styles, dom, node)
    }

    /// Memoized [`Role`] of `node`.
    pub fn role(&mut self, dom: &DomTree, node: NodeId) -> Role {
        if let Some(&role) = self.roles.get(&node) {
            return role;
        }
        let facts = self.style(dom, node);
        let role = classify(dom, node, facts.as_ref(), &self.fragmentable, &self.shiftable);
        let _ = self.roles.insert(node, role);
        role
    }

    /// Height of `node`, cached until the tree changes; `force` re-measures.
    ///
    /// # Errors
    ///
    /// Propagates layout failures.
    pub fn node_height(&mut self, dom: &DomTree, node: NodeId, force: bool) -> Result<f32, LayoutError> {
        self.measurer.node_height(self.host.layout, dom, node, force)
    }

    /// Height of the sibling span `first..=last`.
    ///
    /// # Errors
    ///
    /// Propagates layout failures.
    pub fn span_height(&self, dom: &DomTree, span: Span) -> Result<f32, LayoutError> {
        let height = self.host.layout.span_height(dom, span)?;
        if height.is_finite() {
            Ok(height)
        } else {
            Err(LayoutError::NonFinite {
                node: span.last,
                height,
            })
        }
    }

    /// Current height of `seq`, measuring only what is not cached.
    ///
    /// # Errors
    ///
    /// Propagates layout failures.
    pub fn sequence_height(&self, dom: &DomTree, seq: &mut NodeSequence) -> Result<f32, LayoutError> {
        seq.height(&mut |first: NodeId, last: NodeId| self.span_height(dom, Span::new(first, last)))
    }

    /// Height of the prefix of `seq` ending at `index`.
    ///
    /// # Errors
    ///
    /// Propagates layout failures.
    pub fn sequence_height_at(
        &self,
        dom: &DomTree,
        seq: &mut NodeSequence,
        index: usize,
    ) -> Result<f32, LayoutError> {
        seq.height_at(index, &mut |first: NodeId, last: NodeId| {
            self.span_height(dom, Span::new(first, last))
        })
    }

    /// The latest index of `seq` whose prefix height is at most `max`.
    ///
    /// # Errors
    ///
    /// Propagates layout failures.
    pub fn sequence_index_of_height(
        &self,
        dom: &DomTree,
        seq: &mut NodeSequence,
        max: f32,
    ) -> Result<Option<usize>, LayoutError> {
        seq.index_of_height(max, &mut |first: NodeId, last: NodeId| {
            self.span_height(dom, Span::new(first, last))
        })
    }

    /// Wait until `node` can be measured. Returns whether anything was
    /// waited for, in which case every cached height has been dropped.
    pub fn ensure_ready(&mut self, dom: &mut DomTree, node: NodeId, force: bool) -> bool {
        let timeout = self.options.resource_timeout();
        let report = self
            .ready
            .ensure_ready(&mut *self.host.resources, dom, node, force, timeout);
        for (resource, outcome) in report.problems {
            let (kind, what) = match outcome {
                Settled::TimedOut => (DiagnosticKind::ResourceTimeout, "did not load in time"),
                Settled::Failed | Settled::Loaded => (DiagnosticKind::ResourceFailed, "failed to load"),
            };
            let tag = dom.tag_name(resource).unwrap_or("resource").to_string();
            self.diagnose(kind, Some(resource), format!("<{tag}> {what}; measuring it as is"));
        }
        if report.waited {
            self.measurer.invalidate_all();
        }
        report.waited
    }

    /// Record and log a recovered problem.
    pub fn diagnose(&mut self, kind: DiagnosticKind, node: Option<NodeId>, message: String) {
        let diagnostic = Diagnostic { kind, node, message };
        log::warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    /// Problems recorded so far.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Take the recorded problems, leaving none.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}
