//! Fitting content into a height budget.
//!
//! [§ 4.4 Unforced Breaks](https://www.w3.org/TR/css-break-3/#unforced-breaks)
//!
//! [`Pass::fit`] walks the children of a container in document order and
//! commits as many as fit in the budget. When a child does not fit whole,
//! it is split (text at a word boundary, fragmentable elements
//! recursively), forced onto an empty page, or, for shiftable elements,
//! moved past its neighbours to waste less space.

use folio_dom::{DomError, DomTree, NodeId};
use serde::Serialize;
use strum_macros::Display;

use crate::error::PaginateError;
use crate::fragment::fragment_element;
use crate::heading::HeadingStack;
use crate::layout::Span;
use crate::pass::{DiagnosticKind, Pass};
use crate::role::Role;
use crate::sequence::NodeSequence;
use crate::style::{Break, DEFAULT_LINE_HEIGHT_PX};

/// Why a fit stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Breaker {
    /// The budget is used up.
    Full,
    /// The next child forces a break before itself.
    BreakBeforeAlways,
    /// The last child forces a break after itself.
    BreakAfterAlways,
    /// The last child was split.
    Fragmentation,
    /// The next child does not fit and cannot be split.
    NoSpace,
    /// The only child is taller than the budget and was taken anyway.
    Oversized,
    /// A shiftable child did not fit and moving it would not help.
    NoShift,
    /// A shiftable child was moved.
    Shift,
    /// The requested stop position was reached.
    StopAt,
    /// Every child fit.
    End,
}

/// Where a fit stops early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAt {
    /// Before the child at this index.
    Index(usize),
    /// Before the next heading or shiftable child.
    Boundary,
}

/// Whether a fit may change the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FitMode {
    /// Split text and materialize fragments and shifts.
    #[default]
    Commit,
    /// Only measure: children that would need splitting end the fit.
    Measure,
}

/// Input of [`Pass::fit`].
#[derive(Debug, Clone)]
pub struct FitRequest {
    /// Height budget.
    pub target: f32,
    /// Element whose children are fitted.
    pub container: NodeId,
    /// Index of the first child to consider.
    pub start_at: usize,
    /// Optional early stop.
    pub stop_at: Option<StopAt>,
    /// Headings open before `start_at`.
    pub headings: HeadingStack,
    /// Whether the tree may change.
    pub mode: FitMode,
    /// Whether an unsplittable child may be forced in when nothing else is.
    pub allow_oversized: bool,
}

impl FitRequest {
    /// Fit the children of `container` into `target`, from the first one.
    #[must_use]
    pub const fn new(target: f32, container: NodeId) -> Self {
        Self {
            target,
            container,
            start_at: 0,
            stop_at: None,
            headings: HeadingStack::new(),
            mode: FitMode::Commit,
            allow_oversized: true,
        }
    }

    /// Start at child `index`.
    #[must_use]
    pub const fn start_at(mut self, index: usize) -> Self {
        self.start_at = index;
        self
    }

    /// Stop early.
    #[must_use]
    pub const fn stop_at(mut self, stop: StopAt) -> Self {
        self.stop_at = Some(stop);
        self
    }

    /// Headings open at the start.
    #[must_use]
    pub fn headings(mut self, headings: HeadingStack) -> Self {
        self.headings = headings;
        self
    }

    /// Measure only.
    #[must_use]
    pub const fn measure_only(mut self) -> Self {
        self.mode = FitMode::Measure;
        self
    }

    /// Whether an oversized child may be forced in.
    #[must_use]
    pub const fn allow_oversized(mut self, allow: bool) -> Self {
        self.allow_oversized = allow;
        self
    }
}

/// Output of [`Pass::fit`].
#[derive(Debug, Clone)]
pub struct FitResult {
    /// What was consumed, trailing weak nodes trimmed.
    pub nodes: NodeSequence,
    /// Height of `nodes`.
    pub height: f32,
    /// Unused budget.
    pub empty: f32,
    /// Unused budget in lines of the container.
    pub empty_lines: f32,
    /// Why the fit stopped.
    pub breaker: Breaker,
    /// Headings open after the last consumed node.
    pub headings: HeadingStack,
}

/// A container whose `style` attribute was changed for measuring.
struct StyleOverride {
    node: NodeId,
    previous: Option<String>,
}

/// Per-call scan state.
struct Scan {
    target: f32,
    limit: f32,
    container: NodeId,
    mode: FitMode,
    allow_oversized: bool,
    seq: NodeSequence,
    headings: HeadingStack,
    /// The last strong push was demoted for `break-after: avoid` and nothing
    /// has followed it yet.
    holding_avoided: bool,
    overrides: Vec<StyleOverride>,
}

impl Pass<'_> {
    /// Fill `request.target` with children of `request.container`.
    ///
    /// # Errors
    ///
    /// Only collaborator failures (measurement, tree operations on unknown
    /// nodes) are errors; everything else ends up in the breaker and the
    /// pass diagnostics.
    pub fn fit(&mut self, dom: &mut DomTree, request: FitRequest) -> Result<FitResult, PaginateError> {
        let FitRequest {
            target,
            container,
            start_at,
            stop_at,
            headings,
            mode,
            allow_oversized,
        } = request;

        let mut scan = Scan {
            target,
            limit: target + self.options.tolerance,
            container,
            mode,
            allow_oversized,
            seq: NodeSequence::new(),
            headings,
            holding_avoided: false,
            overrides: Vec::new(),
        };

        let mut breaker = Breaker::End;
        let mut index = start_at;
        while let Some(&child) = dom.children(container).get(index) {
            let role = self.role(dom, child);
            match stop_at {
                Some(StopAt::Index(stop)) if index >= stop => {
                    breaker = Breaker::StopAt;
                    break;
                }
                Some(StopAt::Boundary) if role.is_shift_boundary() => {
                    breaker = Breaker::StopAt;
                    break;
                }
                _ => {}
            }

            if role == Role::Inert {
                scan.seq.push_weak(child);
                index += 1;
                continue;
            }

            let facts = self.style(dom, child).unwrap_or_default();
            let opened = match role {
                Role::Heading(level) => Some(scan.headings.open(level, child)),
                _ => None,
            };

            if facts.break_before == Break::Always && scan.seq.length_strong() > 0 {
                breaker = Breaker::BreakBeforeAlways;
                break;
            }

            if self.ensure_ready(dom, child, false) {
                scan.seq.invalidate();
            }

            scan.seq.push_strong(child);
            let height = self.sequence_height(dom, &mut scan.seq)?;
            if height <= scan.limit {
                scan.holding_avoided = false;
                if let Some(stack) = opened {
                    scan.headings = stack;
                }
                index += 1;
                log::trace!("fit: node {} whole, height {height}", child.0);

                if facts.break_after == Break::Always {
                    breaker = Breaker::BreakAfterAlways;
                    break;
                }
                if facts.break_after == Break::Avoid {
                    let _ = scan.seq.demote_last();
                    scan.holding_avoided = true;
                }
                if height >= target && self.has_content_from(dom, container, index, stop_at) {
                    breaker = Breaker::Full;
                    break;
                }
                continue;
            }
            let _ = scan.seq.pop();

            breaker = self.overflow(dom, &mut scan, child, role, opened)?;
            break;
        }

        if breaker != Breaker::End {
            let _ = scan.seq.pop_weak();
        }
        self.restore_styles(dom, &mut scan)?;

        let height = self.sequence_height(dom, &mut scan.seq)?;
        let empty = (target - height).max(0.0);
        let line_height = self
            .style(dom, container)
            .map_or(DEFAULT_LINE_HEIGHT_PX, |s| s.line_height);
        log::debug!(
            "fit: node {} from {start_at}: {} nodes, {empty:.1} empty, {breaker}",
            container.0,
            scan.seq.len()
        );

        Ok(FitResult {
            nodes: scan.seq,
            height,
            empty,
            empty_lines: if line_height > 0.0 { empty / line_height } else { 0.0 },
            breaker,
            headings: scan.headings,
        })
    }

    /// Whether a child from `index` on, before `stop_at`, takes space.
    fn has_content_from(&mut self, dom: &DomTree, container: NodeId, index: usize, stop_at: Option<StopAt>) -> bool {
        for (position, &child) in dom.children(container).iter().enumerate().skip(index) {
            let role = self.role(dom, child);
            match stop_at {
                Some(StopAt::Index(stop)) if position >= stop => return false,
                Some(StopAt::Boundary) if role.is_shift_boundary() => return false,
                _ => {}
            }
            if role != Role::Inert {
                return true;
            }
        }
        false
    }

    /// `child` did not fit whole: split it, force it in, shift it, or give up.
    fn overflow(
        &mut self,
        dom: &mut DomTree,
        scan: &mut Scan,
        child: NodeId,
        role: Role,
        opened: Option<HeadingStack>,
    ) -> Result<Breaker, PaginateError> {
        if scan.mode == FitMode::Commit {
            match role {
                Role::Text => {
                    if self.split_text(dom, scan, child)? {
                        return Ok(Breaker::Fragmentation);
                    }
                }
                Role::Fragmentable => {
                    if self.split_element(dom, scan, child)? {
                        return Ok(Breaker::Fragmentation);
                    }
                }
                _ => {}
            }
        }

        if scan.seq.length_strong() == 0 && !scan.holding_avoided && scan.allow_oversized {
            scan.seq.push_strong(child);
            if let Some(stack) = opened {
                scan.headings = stack;
            }
            let height = self.node_height(dom, child, false)?;
            self.diagnose(
                DiagnosticKind::Oversized,
                Some(child),
                format!(
                    "<{}> is {height:.1} tall, more than the {:.1} available; it will overflow",
                    dom.tag_name(child).unwrap_or("#text"),
                    scan.target
                ),
            );
            return Ok(Breaker::Oversized);
        }

        if role == Role::Shiftable && scan.seq.length_strong() > 0 && scan.mode == FitMode::Commit {
            return self.shift(dom, scan, child);
        }

        Ok(Breaker::NoSpace)
    }

    /// Split a text child at the longest word-boundary prefix that fits.
    fn split_text(&mut self, dom: &mut DomTree, scan: &mut Scan, child: NodeId) -> Result<bool, PaginateError> {
        self.override_text_wrap(dom, scan)?;

        let chars: Vec<char> = dom.as_text(child).unwrap_or_default().chars().collect();
        let first = scan.seq.first().unwrap_or(child);

        let (mut low, mut high, mut best) = (0, chars.len(), 0);
        while low <= high {
            let mid = (low + high) / 2;
            let height = self.span_height(dom, Span::ending_in_text(first, child, mid))?;
            if height <= scan.limit {
                best = mid;
                low = mid + 1;
            } else if mid == 0 {
                break;
            } else {
                high = mid - 1;
            }
        }

        let offset = word_boundary_before(&chars, best);
        if offset == 0 || chars[..offset].iter().all(|c| c.is_whitespace()) {
            return Ok(false);
        }

        let _ = dom.split_text(child, offset)?;
        scan.seq.push_strong(child);
        log::trace!("fit: split text node {} at {offset}", child.0);
        Ok(true)
    }

    /// `text-wrap: balance | pretty` decides line breaks over the whole
    /// block, so a measured prefix would not keep its breaks once split.
    /// Measure the container with greedy wrapping until the fit ends.
    fn override_text_wrap(&mut self, dom: &mut DomTree, scan: &mut Scan) -> Result<(), DomError> {
        let container = scan.container;
        if scan.overrides.iter().any(|o| o.node == container) {
            return Ok(());
        }
        let whole_block = self
            .style(dom, container)
            .is_some_and(|s| s.text_wrap.is_whole_block());
        if !whole_block {
            return Ok(());
        }

        let previous = dom.attr(container, "style").map(str::to_string);
        let style = match &previous {
            Some(style) if !style.trim().is_empty() => {
                format!("{}; text-wrap: wrap", style.trim_end().trim_end_matches(';'))
            }
            _ => "text-wrap: wrap".to_string(),
        };
        let _ = dom.set_attr(container, "style", &style)?;
        self.restyle(dom, container);
        scan.seq.invalidate();
        scan.overrides.push(StyleOverride {
            node: container,
            previous,
        });
        Ok(())
    }

    fn restore_styles(&mut self, dom: &mut DomTree, scan: &mut Scan) -> Result<(), DomError> {
        for StyleOverride { node, previous } in scan.overrides.drain(..) {
            let _ = match previous {
                Some(style) => dom.set_attr(node, "style", &style)?,
                None => dom.remove_attr(node, "style")?,
            };
            self.restyle(dom, node);
        }
        Ok(())
    }

    /// Split a fragmentable child recursively, honoring orphans and widows.
    fn split_element(&mut self, dom: &mut DomTree, scan: &mut Scan, child: NodeId) -> Result<bool, PaginateError> {
        let facts = self.style(dom, child).unwrap_or_default();
        if facts.break_inside == Break::Avoid {
            return Ok(false);
        }

        let used = self.sequence_height(dom, &mut scan.seq)?;
        let remaining = scan.target - used;
        let own = self.node_height(dom, child, false)?;
        let line_height = facts.line_height;
        let orphans = facts.orphans as f32 * line_height;
        let widows = facts.widows as f32 * line_height;

        // [§ 4.2 Orphans and widows](https://www.w3.org/TR/css-break-3/#widows-orphans)
        if remaining < orphans || own < orphans + widows {
            log::trace!(
                "fit: node {} not split: {remaining:.1} left, {own:.1} tall, needs {orphans:.1} + {widows:.1}",
                child.0
            );
            return Ok(false);
        }

        let edges = facts.padding_block() + facts.border_block() + facts.margin_block();
        let budget = (remaining.min(own - widows) - edges).max(0.0);
        let allow_oversized =
            scan.allow_oversized && scan.seq.length_strong() == 0 && !scan.holding_avoided;
        let inner = self.fit(
            dom,
            FitRequest::new(budget, child)
                .headings(scan.headings.clone())
                .allow_oversized(allow_oversized),
        )?;

        let left_behind = dom.children(child).len() > inner.nodes.len();
        if inner.nodes.length_strong() == 0 || !left_behind {
            return Ok(false);
        }

        let fragment = fragment_element(dom, child, &inner.nodes.node_ids())?;
        scan.seq.push_strong(fragment);
        scan.headings = inner.headings;
        log::trace!(
            "fit: node {} split, {} children moved to fragment {}",
            child.0,
            inner.nodes.len(),
            fragment.0
        );
        Ok(true)
    }

    /// Move a shiftable `child` up into the committed content or down past
    /// the content after it, whichever leaves less of the page unused.
    ///
    /// Neither direction crosses a heading or another shiftable.
    fn shift(&mut self, dom: &mut DomTree, scan: &mut Scan, child: NodeId) -> Result<Breaker, PaginateError> {
        let container = scan.container;
        let Some(last) = scan.seq.last() else {
            return Ok(Breaker::NoShift);
        };
        let item = self.node_height(dom, child, false)?;
        let committed = self.sequence_height(dom, &mut scan.seq)?;
        let unshifted_empty = (scan.target - committed).max(0.0);

        let mut floor = 0;
        for i in (0..scan.seq.len()).rev() {
            if let Some(node) = scan.seq.node(i) {
                if self.role(dom, node).is_shift_boundary() {
                    floor = i + 1;
                    break;
                }
            }
        }

        // Up: keep a prefix, put the item after it, refill behind the item.
        let mut up = None;
        if item <= scan.limit {
            let keep = self
                .sequence_index_of_height(dom, &mut scan.seq, scan.limit - item)?
                .map_or(0, |i| i + 1);
            if keep >= floor && keep < scan.seq.len() {
                let prefix = if keep == 0 {
                    0.0
                } else {
                    self.sequence_height_at(dom, &mut scan.seq, keep - 1)?
                };
                let anchor = scan.seq.node(keep).unwrap_or(last);
                dom.insert_before(container, child, anchor)?;
                let start = dom.index_in_parent(child).map_or(0, |i| i + 1);
                let trial = self.fit(
                    dom,
                    FitRequest::new((scan.target - prefix - item).max(0.0), container)
                        .start_at(start)
                        .stop_at(StopAt::Boundary)
                        .headings(scan.headings.clone())
                        .measure_only()
                        .allow_oversized(false),
                );
                dom.insert_after(container, child, last)?;
                let trial = trial?;
                // An up-shift only counts if it wastes less than not shifting.
                if trial.empty < unshifted_empty {
                    up = Some((keep, trial.empty));
                }
            }
        }

        // Down: leave the item for the next page and refill its slot.
        let after = dom.index_in_parent(child).map_or(0, |i| i + 1);
        let down_trial = self.fit(
            dom,
            FitRequest::new(unshifted_empty, container)
                .start_at(after)
                .stop_at(StopAt::Boundary)
                .headings(scan.headings.clone())
                .measure_only()
                .allow_oversized(false),
        )?;
        let down = (down_trial.nodes.length_strong() > 0).then_some(down_trial.empty);

        let refill = match (up, down) {
            (Some((keep, up_empty)), down) if down.is_none_or(|down_empty| up_empty < down_empty) => {
                log::debug!("fit: shifting node {} up to position {keep}", child.0);
                let anchor = scan.seq.node(keep).unwrap_or(last);
                dom.insert_before(container, child, anchor)?;
                scan.seq.truncate(keep);
                scan.seq.push_strong(child);
                let used = self.sequence_height(dom, &mut scan.seq)?;
                let start = dom.index_in_parent(child).map_or(0, |i| i + 1);
                let refill = self.fit(
                    dom,
                    FitRequest::new((scan.target - used).max(0.0), container)
                        .start_at(start)
                        .stop_at(StopAt::Boundary)
                        .headings(scan.headings.clone())
                        .allow_oversized(false),
                )?;
                scan.seq.append(refill.nodes.clone());
                refill
            }
            (_, Some(_)) => {
                log::debug!("fit: shifting node {} down", child.0);
                let refill = self.fit(
                    dom,
                    FitRequest::new(unshifted_empty, container)
                        .start_at(after)
                        .stop_at(StopAt::Boundary)
                        .headings(scan.headings.clone())
                        .allow_oversized(false),
                )?;
                let Some(refill_last) = refill.nodes.last() else {
                    return Ok(Breaker::NoShift);
                };
                dom.insert_after(container, child, refill_last)?;
                scan.seq.append(refill.nodes.clone());
                refill
            }
            _ => return Ok(Breaker::NoShift),
        };

        scan.headings = refill.headings.clone();
        dom.pagination_mut(child)?.times_shifted += 1;
        let _ = self.ensure_ready(dom, child, true);
        scan.seq.invalidate();

        Ok(
            if refill.nodes.length_strong() == 0 || refill.breaker == Breaker::End {
                Breaker::Shift
            } else {
                refill.breaker
            },
        )
    }
}

/// The largest offset at or before `offset` that does not fall between two
/// letters or digits.
#[must_use]
pub fn word_boundary_before(chars: &[char], offset: usize) -> usize {
    let mut offset = offset.min(chars.len());
    while offset > 0
        && offset < chars.len()
        && chars[offset - 1].is_alphanumeric()
        && chars[offset].is_alphanumeric()
    {
        offset -= 1;
    }
    offset
}
