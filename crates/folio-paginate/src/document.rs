//! Whole-document passes: paginating every section, then resolving the
//! pages internal links point at.

use std::time::Duration;

use folio_common::timing::{Timer, format_duration};
use folio_dom::{DomTree, NodeId};

use crate::decorate::{PAGE_NUMBER_CLASS, set_custom_property};
use crate::error::PaginateError;
use crate::options::PaginateOptions;
use crate::pass::{Diagnostic, Host};
use crate::paginator::{Paginator, SectionSummary};
use crate::selector::SelectorList;

/// Outcome of [`paginate_all`].
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSummary {
    /// One entry per section, in document order.
    pub sections: Vec<SectionSummary>,
    /// Pages across all sections.
    pub pages: usize,
    /// Time spent.
    pub elapsed: Duration,
}

impl DocumentSummary {
    /// Problems recorded in any section.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.sections.iter().flat_map(|s| s.diagnostics.iter())
    }
}

/// Outcome of [`compute_targets`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSummary {
    /// Internal links seen.
    pub links: usize,
    /// Links whose target is on a page.
    pub resolved: usize,
    /// Time spent.
    pub elapsed: Duration,
}

/// Paginate every element under `root` matching
/// [`PaginateOptions::section_selector`], numbering pages continuously.
///
/// Sections nested in another section are paginated as part of it. The
/// total is recorded on the root element (the document element when `root`
/// is the document) as `data-page-count` plus `--page-count` and `--pages`
/// custom properties.
///
/// # Errors
///
/// Fails on invalid options or selectors, and propagates collaborator
/// failures.
pub fn paginate_all(
    dom: &mut DomTree,
    root: NodeId,
    options: &PaginateOptions,
    mut host: Host<'_>,
) -> Result<DocumentSummary, PaginateError> {
    options.validate()?;
    let selector = SelectorList::parse(&options.section_selector)?;
    let mut timer = Timer::new();
    timer.start();

    let mut sections: Vec<NodeId> = Vec::new();
    for node in dom.descendants(root).skip(1) {
        if selector.matches(dom, node) && !sections.iter().any(|&s| dom.is_descendant_of(node, s)) {
            sections.push(node);
        }
    }
    log::debug!("paginate: {} sections match {:?}", sections.len(), options.section_selector);

    let mut summaries = Vec::with_capacity(sections.len());
    let mut pages = 0;
    for section in sections {
        let paginator = Paginator::new(dom, section, options, host.reborrow(), pages)?;
        let summary = paginator.run(dom)?;
        pages += summary.pages;
        summaries.push(summary);
    }

    let marked = if root == NodeId::ROOT {
        dom.document_element()
    } else {
        Some(root)
    };
    if let Some(element) = marked {
        let _ = dom.set_attr(element, "data-page-count", &pages.to_string())?;
        set_custom_property(dom, element, "--page-count", &pages.to_string())?;
        set_custom_property(dom, element, "--pages", &format!("\"{pages}\""))?;
    }

    let elapsed = timer.pause();
    let summary = DocumentSummary {
        sections: summaries,
        pages,
        elapsed,
    };
    log::info!(
        "paginated {} sections into {pages} pages in {} ({} problems)",
        summary.sections.len(),
        format_duration(elapsed),
        summary.diagnostics().count()
    );
    Ok(summary)
}

/// Record on every internal link under `root` the page its target is on,
/// as `data-target-page`.
///
/// Internal links are `a` elements whose `href` starts with `#`, page-number
/// markers excepted. Links to missing targets, or to targets not on a page,
/// are left alone.
///
/// # Errors
///
/// Propagates tree failures.
pub fn compute_targets(dom: &mut DomTree, root: NodeId) -> Result<TargetSummary, PaginateError> {
    let mut timer = Timer::new();
    timer.start();

    let links: Vec<(NodeId, String)> = dom
        .descendants(root)
        .filter(|&n| dom.tag_name(n) == Some("a") && !dom.has_class(n, PAGE_NUMBER_CLASS))
        .filter_map(|n| {
            let target = dom.attr(n, "href")?.strip_prefix('#')?;
            Some((n, target.to_string()))
        })
        .collect();

    let mut resolved = 0;
    for (link, target) in &links {
        let page = dom
            .element_by_id(target)
            .and_then(|t| dom.closest(t, |n| dom.attr(n, "data-page").is_some()))
            .and_then(|p| dom.attr(p, "data-page"))
            .map(str::to_string);
        if let Some(page) = page {
            let _ = dom.set_attr(*link, "data-target-page", &page)?;
            resolved += 1;
        } else {
            log::trace!("targets: #{target} is not on a page");
        }
    }

    let elapsed = timer.pause();
    log::info!(
        "resolved {resolved} of {} link targets in {}",
        links.len(),
        format_duration(elapsed)
    );
    Ok(TargetSummary {
        links: links.len(),
        resolved,
        elapsed,
    })
}
