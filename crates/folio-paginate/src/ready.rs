//! Resource readiness.
//!
//! A node's height cannot be trusted while an image, frame or stylesheet
//! inside it is still loading. Before measuring, the fitter asks the
//! [`ResourceLoader`] whether anything is pending and settles each pending
//! resource with a bounded wait. A failed or timed-out resource counts as
//! ready: pagination measures whatever box it got.

use std::collections::HashSet;
use std::time::Duration;

use folio_dom::{DomTree, NodeId};

/// [§ 4.8.3 Embedded content](https://html.spec.whatwg.org/multipage/embedded-content.html)
///
/// Elements that fetch something that can change their box.
pub const LOAD_ELEMENTS: &[&str] = &[
    "embed", "iframe", "img", "input", "script", "source", "track", "video", "audio", "link",
    "style", "object",
];

/// Elements whose height commonly depends on descendants from
/// [`LOAD_ELEMENTS`].
pub const LOAD_CONTAINERS: &[&str] = &["figure", "section", "div", "article", "details"];

/// Opaque token for one pending resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle(pub u64);

/// Whether a node can be measured now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Nothing is loading.
    Ready,
    /// These resources are still loading.
    Pending(Vec<ResourceHandle>),
}

/// How a pending resource ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    /// The resource loaded.
    Loaded,
    /// The resource failed to load.
    Failed,
    /// The wait ran out before the resource settled.
    TimedOut,
}

/// The readiness collaborator.
pub trait ResourceLoader {
    /// Resources `node` itself is waiting for.
    fn readiness(&mut self, dom: &DomTree, node: NodeId) -> Readiness;

    /// Block until `handle` loads, fails, or `timeout` passes.
    ///
    /// Loading may change the tree (a loaded image gets its intrinsic size).
    fn settle(&mut self, dom: &mut DomTree, handle: ResourceHandle, timeout: Duration) -> Settled;
}

/// A document whose resources are all loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticResources;

impl ResourceLoader for StaticResources {
    fn readiness(&mut self, _dom: &DomTree, _node: NodeId) -> Readiness {
        Readiness::Ready
    }

    fn settle(&mut self, _dom: &mut DomTree, _handle: ResourceHandle, _timeout: Duration) -> Settled {
        Settled::Loaded
    }
}

/// Resources described by attributes, settled without real I/O.
///
/// - `data-loading`: the element is still loading.
/// - `data-load="error"`: loading fails.
/// - `data-load="hang"`: loading never finishes within the timeout.
///
/// Settling removes `data-loading`. A successful load also sets
/// `data-loaded`, which makes [`crate::BlockFlow`] honor
/// `data-loaded-height`.
#[derive(Debug, Clone, Default)]
pub struct SimulatedResources {
    history: Vec<(NodeId, Settled)>,
}

impl SimulatedResources {
    /// Create a loader with an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every settled resource, in order.
    #[must_use]
    pub fn history(&self) -> &[(NodeId, Settled)] {
        &self.history
    }
}

impl ResourceLoader for SimulatedResources {
    fn readiness(&mut self, dom: &DomTree, node: NodeId) -> Readiness {
        if dom.attr(node, "data-loading").is_some() {
            Readiness::Pending(vec![ResourceHandle(node.0 as u64)])
        } else {
            Readiness::Ready
        }
    }

    fn settle(&mut self, dom: &mut DomTree, handle: ResourceHandle, _timeout: Duration) -> Settled {
        let node = NodeId(handle.0 as usize);
        let outcome = match dom.attr(node, "data-load") {
            Some("error") => Settled::Failed,
            Some("hang") => Settled::TimedOut,
            _ => Settled::Loaded,
        };
        if dom.remove_attr(node, "data-loading").is_err() {
            return Settled::Failed;
        }
        if outcome == Settled::Loaded {
            let _ = dom.set_attr(node, "data-loaded", "");
        }
        self.history.push((node, outcome));
        outcome
    }
}

/// What waiting for one node involved.
#[derive(Debug, Default)]
pub struct ReadyReport {
    /// Whether anything was waited for; heights measured before are stale.
    pub waited: bool,
    /// Resources that did not load, with the element that requested them.
    pub problems: Vec<(NodeId, Settled)>,
}

/// Remembers which nodes are known to be ready during a pass.
#[derive(Debug, Default)]
pub struct ReadyTracker {
    ready: HashSet<NodeId>,
}

impl ReadyTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `node` can be measured.
    ///
    /// Only [`LOAD_ELEMENTS`] and [`LOAD_CONTAINERS`] are inspected;
    /// containers wait for the load elements among their descendants.
    /// `force` re-checks a node already known to be ready, which is needed
    /// after moving it.
    pub fn ensure_ready(
        &mut self,
        loader: &mut dyn ResourceLoader,
        dom: &mut DomTree,
        node: NodeId,
        force: bool,
        timeout: Duration,
    ) -> ReadyReport {
        let mut report = ReadyReport::default();
        if force {
            let _ = self.ready.remove(&node);
        }
        if self.ready.contains(&node) {
            return report;
        }
        let Some(tag) = dom.tag_name(node) else {
            return report;
        };
        let is_load_element = LOAD_ELEMENTS.contains(&tag);
        if !is_load_element && !LOAD_CONTAINERS.contains(&tag) {
            return report;
        }

        let targets: Vec<NodeId> = if is_load_element {
            vec![node]
        } else {
            dom.descendants(node)
                .skip(1)
                .filter(|&n| dom.tag_name(n).is_some_and(|t| LOAD_ELEMENTS.contains(&t)))
                .collect()
        };

        for target in targets {
            if let Readiness::Pending(handles) = loader.readiness(dom, target) {
                for handle in handles {
                    report.waited = true;
                    let outcome = loader.settle(dom, handle, timeout);
                    if outcome != Settled::Loaded {
                        report.problems.push((target, outcome));
                    }
                }
            }
        }

        let _ = self.ready.insert(node);
        report
    }
}
