//! Driving the fitter over one section, page by page.
//!
//! [§ 3 Page Model](https://www.w3.org/TR/css-page-3/#page-model)
//!
//! Each iteration fits one page worth of the section's children. Pages are
//! first kept pending and committed to the tree in batches: a committed
//! page is a fragment of the section holding that page's children, placed
//! before the section. Whatever is left in the section when the content no
//! longer exceeds one page becomes the last page.
//!
//! The driver is an explicit state machine: [`Paginator::step`] returns
//! after every page, after every committed batch, and when the host should
//! be asked whether to continue.

use std::time::Duration;

use folio_common::timing::{Timer, format_duration};
use folio_dom::{DomTree, NodeId};

use crate::decorate::{PageDecoration, decorate_page};
use crate::error::PaginateError;
use crate::fit::{Breaker, FitRequest};
use crate::fragment::fragment_element;
use crate::heading::HeadingStack;
use crate::layout::Span;
use crate::options::PaginateOptions;
use crate::pass::{Diagnostic, DiagnosticKind, Host, Pass};
use crate::role::Role;

/// What one call to [`Paginator::step`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A page was fitted.
    Paged {
        /// Its 1-based number.
        number: usize,
        /// Why it ended.
        breaker: Breaker,
    },
    /// Pending pages were committed to the tree; the host may render.
    RenderBatch {
        /// How many pages the batch held.
        pages: usize,
    },
    /// The host should confirm before more pages are made.
    Confirm {
        /// Pages made so far.
        pages: usize,
    },
    /// The section is paginated.
    Done(SectionSummary),
}

/// Outcome of paginating one section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSummary {
    /// The section; after pagination it holds the last page.
    pub section: NodeId,
    /// Number of the first page.
    pub first_page: usize,
    /// Pages produced, the last page included.
    pub pages: usize,
    /// Problems worked around.
    pub diagnostics: Vec<Diagnostic>,
    /// Time spent.
    pub elapsed: Duration,
}

/// Page dimensions of a section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// Height of a page box.
    pub page_height: f32,
    /// Height available to content.
    pub content_height: f32,
    /// Content height below which the section is not paginated further.
    pub min_content_height: f32,
    /// Line height of the section.
    pub line_height: f32,
}

#[derive(Debug)]
struct PendingPage {
    number: usize,
    nodes: Vec<NodeId>,
    empty: f32,
    empty_lines: f32,
    headings: HeadingStack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Running,
    AwaitingConfirm,
    Stopping,
    Finished,
}

/// Paginates one section.
#[derive(Debug)]
pub struct Paginator<'h> {
    pass: Pass<'h>,
    section: NodeId,
    geometry: PageGeometry,
    first_page: usize,
    /// Pages fitted so far, pending ones included.
    fitted: usize,
    /// Index of the first section child not on a page yet.
    resume: usize,
    pending: Vec<PendingPage>,
    headings: HeadingStack,
    state: State,
    confirmed_at: usize,
    timer: Timer,
    summary: Option<SectionSummary>,
}

impl<'h> Paginator<'h> {
    /// Prepare to paginate `section`, numbering pages after `start_at`
    /// earlier pages.
    ///
    /// # Errors
    ///
    /// Fails on invalid options, when `section` is not an attached element,
    /// or when its width cannot be measured.
    pub fn new(
        dom: &DomTree,
        section: NodeId,
        options: &PaginateOptions,
        host: Host<'h>,
        start_at: usize,
    ) -> Result<Self, PaginateError> {
        if dom.as_element(section).is_none() || dom.parent(section).is_none() {
            return Err(PaginateError::NotASection(section));
        }
        let mut timer = Timer::new();
        timer.start();

        let mut pass = Pass::new(host, options)?;
        let facts = pass
            .style(dom, section)
            .ok_or(PaginateError::NotASection(section))?;
        let width = pass.host.layout.inline_size(dom, section)?;
        let page_height = width / options.aspect_ratio;
        let geometry = PageGeometry {
            page_height,
            content_height: facts.inner_height(page_height),
            min_content_height: facts.inner_height(facts.outer_height(facts.min_height)),
            line_height: facts.line_height,
        };
        log::debug!(
            "paginate: section {} width {width:.1}, page {page_height:.1}, content {:.1}",
            section.0,
            geometry.content_height
        );

        Ok(Self {
            pass,
            section,
            geometry,
            first_page: start_at + 1,
            fitted: 0,
            resume: 0,
            pending: Vec::new(),
            headings: HeadingStack::new(),
            state: State::Running,
            confirmed_at: 0,
            timer,
            summary: None,
        })
    }

    /// Page dimensions in use.
    #[must_use]
    pub const fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    /// Problems recorded so far.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.pass.diagnostics()
    }

    /// Ask the paginator to finish at the next step. Pages already made are
    /// kept.
    pub fn stop(&mut self) {
        if self.state != State::Finished {
            self.state = State::Stopping;
        }
    }

    /// Answer a [`Step::Confirm`].
    pub fn confirm(&mut self, proceed: bool) {
        if self.state == State::AwaitingConfirm {
            self.confirmed_at = self.fitted;
            self.state = if proceed { State::Running } else { State::Stopping };
        }
    }

    /// Advance by one page, batch or prompt.
    ///
    /// Calling `step` while a confirmation is outstanding counts as
    /// confirming.
    ///
    /// # Errors
    ///
    /// Propagates collaborator failures.
    pub fn step(&mut self, dom: &mut DomTree) -> Result<Step, PaginateError> {
        match self.state {
            State::Finished => {
                if let Some(summary) = &self.summary {
                    return Ok(Step::Done(summary.clone()));
                }
            }
            State::Stopping => return self.finish(dom),
            State::AwaitingConfirm => self.confirm(true),
            State::Running => {}
        }

        if self.pending.len() >= self.pass.options.render_interval {
            let pages = self.commit(dom)?;
            return Ok(Step::RenderBatch { pages });
        }

        if let Some(interval) = self.pass.options.confirm_interval {
            if self.fitted > 0 && self.fitted % interval == 0 && self.confirmed_at != self.fitted {
                self.state = State::AwaitingConfirm;
                return Ok(Step::Confirm { pages: self.fitted });
            }
        }

        let remaining = self.remaining_height(dom)?;
        let budget = self.geometry.content_height;
        if remaining <= budget + self.pass.options.tolerance
            || remaining <= self.geometry.min_content_height
        {
            return self.finish(dom);
        }

        if self.fitted >= self.pass.options.max_pages {
            let limit = self.pass.options.max_pages;
            self.pass.diagnose(
                DiagnosticKind::PageLimit,
                Some(self.section),
                format!("stopped after {limit} pages; the rest stays on the last page"),
            );
            return self.finish(dom);
        }

        let request = FitRequest::new(budget, self.section)
            .start_at(self.resume)
            .headings(self.headings.clone());
        let result = self.pass.fit(dom, request)?;

        if result.nodes.length_strong() == 0 {
            self.pass.diagnose(
                DiagnosticKind::NonConvergence,
                dom.children(self.section).get(self.resume).copied(),
                format!(
                    "cannot make progress ({}); {remaining:.1} of content left for a {budget:.1} page",
                    result.breaker
                ),
            );
            return self.finish(dom);
        }

        let number = self.first_page + self.fitted;
        log::debug!(
            "paginate: page {number}: {} nodes, {:.2} empty lines, {}",
            result.nodes.len(),
            result.empty_lines,
            result.breaker
        );
        self.resume += result.nodes.len();
        self.fitted += 1;
        self.headings = result.headings.clone();
        self.pending.push(PendingPage {
            number,
            nodes: result.nodes.node_ids(),
            empty: result.empty,
            empty_lines: result.empty_lines,
            headings: result.headings,
        });

        Ok(Step::Paged {
            number,
            breaker: result.breaker,
        })
    }

    /// Step until done, confirming every prompt.
    ///
    /// # Errors
    ///
    /// Propagates collaborator failures.
    pub fn run(self, dom: &mut DomTree) -> Result<SectionSummary, PaginateError> {
        self.run_with(dom, |_| true)
    }

    /// Step until done, answering prompts with `confirm`.
    ///
    /// # Errors
    ///
    /// Propagates collaborator failures.
    pub fn run_with(
        mut self,
        dom: &mut DomTree,
        mut confirm: impl FnMut(usize) -> bool,
    ) -> Result<SectionSummary, PaginateError> {
        loop {
            match self.step(dom)? {
                Step::Confirm { pages } => {
                    let proceed = confirm(pages);
                    self.confirm(proceed);
                }
                Step::Done(summary) => return Ok(summary),
                Step::Paged { .. } | Step::RenderBatch { .. } => {}
            }
        }
    }

    /// Height of the section children not on a page yet.
    fn remaining_height(&self, dom: &DomTree) -> Result<f32, PaginateError> {
        let children = dom.children(self.section);
        match (children.get(self.resume), children.last()) {
            (Some(&first), Some(&last)) => Ok(self.pass.span_height(dom, Span::new(first, last))?),
            _ => Ok(0.0),
        }
    }

    /// Move pending pages into page elements before the section.
    fn commit(&mut self, dom: &mut DomTree) -> Result<usize, PaginateError> {
        let pages = std::mem::take(&mut self.pending);
        let count = pages.len();
        for page in pages {
            let element = fragment_element(dom, self.section, &page.nodes)?;
            self.resume -= page.nodes.len();
            self.decorate(dom, element, page.number, page.empty, page.empty_lines, &page.headings)?;
        }
        if count > 0 {
            log::debug!("paginate: committed {count} pages");
        }
        Ok(count)
    }

    fn decorate(
        &self,
        dom: &mut DomTree,
        page: NodeId,
        number: usize,
        empty: f32,
        empty_lines: f32,
        headings: &HeadingStack,
    ) -> Result<(), PaginateError> {
        let options = &self.pass.options;
        let decoration = PageDecoration {
            number,
            empty,
            empty_lines,
            headings: options.running_headers.then_some(headings),
            placeholder: options.verbose,
        };
        Ok(decorate_page(dom, page, &decoration)?)
    }

    /// Commit everything and turn the section into the last page.
    fn finish(&mut self, dom: &mut DomTree) -> Result<Step, PaginateError> {
        let _ = self.commit(dom)?;

        let remaining = self.remaining_height(dom)?;
        let empty = (self.geometry.content_height - remaining).max(0.0);
        let empty_lines = if self.geometry.line_height > 0.0 {
            empty / self.geometry.line_height
        } else {
            0.0
        };

        let children: Vec<NodeId> = dom.children(self.section).to_vec();
        for child in children {
            if let Role::Heading(level) = self.pass.role(dom, child) {
                self.headings = self.headings.open(level, child);
            }
        }

        let number = self.first_page + self.fitted;
        let headings = self.headings.clone();
        self.decorate(dom, self.section, number, empty, empty_lines, &headings)?;

        let elapsed = self.timer.pause();
        let summary = SectionSummary {
            section: self.section,
            first_page: self.first_page,
            pages: self.fitted + 1,
            diagnostics: self.pass.take_diagnostics(),
            elapsed,
        };
        log::debug!(
            "paginate: section {} done, {} pages in {}",
            self.section.0,
            summary.pages,
            format_duration(elapsed)
        );
        self.state = State::Finished;
        self.summary = Some(summary.clone());
        Ok(Step::Done(summary))
    }
}
