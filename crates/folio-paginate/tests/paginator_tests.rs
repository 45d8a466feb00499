//! End-to-end tests for section and document pagination.

use folio_dom::{DomTree, NodeId};
use folio_paginate::decorate::{PAGE_NUMBER_CLASS, RUNNING_HEADER_CLASS, UNDERFULL_CLASS};
use folio_paginate::{
    BlockFlow, DiagnosticKind, Host, InlineStyles, PaginateError, PaginateOptions, Paginator,
    StaticResources, Step, compute_targets, paginate, paginate_all,
};

fn append_element(tree: &mut DomTree, parent: NodeId, tag: &str) -> NodeId {
    let id = tree.create_element(tag);
    tree.append_child(parent, id);
    id
}

fn block(tree: &mut DomTree, parent: NodeId, tag: &str, height: f32) -> NodeId {
    let id = append_element(tree, parent, tag);
    let _ = tree
        .set_attr(id, "style", &format!("height: {height}px"))
        .unwrap();
    id
}

/// Square 100px pages, no tolerance.
fn square() -> PaginateOptions {
    PaginateOptions {
        aspect_ratio: 1.0,
        tolerance: 0.0,
        ..PaginateOptions::default()
    }
}

/// `<main><div class="page">` with blocks of the given heights.
fn document(heights: &[f32]) -> (DomTree, NodeId, NodeId) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut tree = DomTree::new();
    let main = append_element(&mut tree, NodeId::ROOT, "main");
    let section = append_element(&mut tree, main, "div");
    let _ = tree.set_attr(section, "class", "page").unwrap();
    for &height in heights {
        let _ = block(&mut tree, section, "blockquote", height);
    }
    (tree, main, section)
}

fn page_numbers(tree: &DomTree, parent: NodeId) -> Vec<Option<String>> {
    tree.children(parent)
        .iter()
        .map(|&page| tree.attr(page, "data-page").map(str::to_string))
        .collect()
}

#[test]
fn test_paginate_single_page() {
    let (mut tree, main, section) = document(&[30.0, 30.0]);
    let styles = InlineStyles::new();
    let layout = BlockFlow::new(100.0);
    let mut resources = StaticResources;

    let summary = paginate(
        &mut tree,
        section,
        &square(),
        Host::new(&styles, &layout, &mut resources),
    )
    .unwrap();

    assert_eq!(summary.pages, 1);
    assert!(summary.diagnostics.is_empty());
    assert_eq!(tree.children(main), &[section]);
    assert_eq!(tree.attr(section, "data-page"), Some("1"));
    assert_eq!(tree.attr(section, "data-empty-lines"), Some("2"));
    assert!(tree.has_class(section, UNDERFULL_CLASS));
}

#[test]
fn test_paginate_three_pages() {
    let (mut tree, main, section) = document(&[40.0; 5]);
    let styles = InlineStyles::new();
    let layout = BlockFlow::new(100.0);
    let mut resources = StaticResources;

    let summary = paginate(
        &mut tree,
        section,
        &square(),
        Host::new(&styles, &layout, &mut resources),
    )
    .unwrap();

    assert_eq!(summary.pages, 3);
    assert_eq!(summary.first_page, 1);
    assert_eq!(
        page_numbers(&tree, main),
        vec![Some("1".to_string()), Some("2".to_string()), Some("3".to_string())]
    );

    let pages = tree.children(main).to_vec();
    assert_eq!(pages[2], section);
    for (i, &page) in pages.iter().enumerate() {
        // Two blocks (one on the last page) and the page-number marker.
        let blocks = tree
            .children(page)
            .iter()
            .filter(|&&c| tree.tag_name(c) == Some("blockquote"))
            .count();
        assert_eq!(blocks, if i < 2 { 2 } else { 1 });

        let marker = *tree.children(page).last().unwrap();
        assert!(tree.has_class(marker, PAGE_NUMBER_CLASS));
        assert_eq!(tree.attr(marker, "id"), Some(format!("page-{}", i + 1).as_str()));
        assert_eq!(tree.text_content(marker), (i + 1).to_string());
    }
    assert!(tree.has_class(pages[0], "fragment"));
    assert!(tree.has_class(section, "source"));
    assert!(!tree.has_class(pages[0], UNDERFULL_CLASS));
    assert!(tree.has_class(section, UNDERFULL_CLASS));
}

#[test]
fn test_paginator_steps_batches_and_confirmations() {
    let (mut tree, _, section) = document(&[40.0; 5]);
    let styles = InlineStyles::new();
    let layout = BlockFlow::new(100.0);
    let mut resources = StaticResources;
    let options = PaginateOptions {
        render_interval: 1,
        confirm_interval: Some(1),
        ..square()
    };

    let mut paginator = Paginator::new(
        &tree,
        section,
        &options,
        Host::new(&styles, &layout, &mut resources),
        0,
    )
    .unwrap();
    assert!((paginator.geometry().content_height - 100.0).abs() < 1e-3);

    assert!(matches!(paginator.step(&mut tree).unwrap(), Step::Paged { number: 1, .. }));
    assert_eq!(paginator.step(&mut tree).unwrap(), Step::RenderBatch { pages: 1 });
    assert_eq!(paginator.step(&mut tree).unwrap(), Step::Confirm { pages: 1 });
    paginator.confirm(true);
    assert!(matches!(paginator.step(&mut tree).unwrap(), Step::Paged { number: 2, .. }));
    assert_eq!(paginator.step(&mut tree).unwrap(), Step::RenderBatch { pages: 1 });
    assert_eq!(paginator.step(&mut tree).unwrap(), Step::Confirm { pages: 2 });
    paginator.confirm(false);

    let Step::Done(summary) = paginator.step(&mut tree).unwrap() else {
        panic!("expected the paginator to finish");
    };
    assert_eq!(summary.pages, 3);

    // Finished paginators keep reporting the same summary.
    assert_eq!(paginator.step(&mut tree).unwrap(), Step::Done(summary));
}

#[test]
fn test_paginator_stop_keeps_made_pages() {
    let (mut tree, main, section) = document(&[40.0; 8]);
    let styles = InlineStyles::new();
    let layout = BlockFlow::new(100.0);
    let mut resources = StaticResources;

    let mut paginator = Paginator::new(
        &tree,
        section,
        &square(),
        Host::new(&styles, &layout, &mut resources),
        0,
    )
    .unwrap();
    assert!(matches!(paginator.step(&mut tree).unwrap(), Step::Paged { .. }));
    paginator.stop();
    let Step::Done(summary) = paginator.step(&mut tree).unwrap() else {
        panic!("expected the paginator to finish");
    };

    assert_eq!(summary.pages, 2);
    assert_eq!(tree.children(main).len(), 2);
    // The rest stays on the last page.
    assert_eq!(tree.children(section).len(), 6 + 1);
}

#[test]
fn test_paginator_page_limit() {
    let (mut tree, _, section) = document(&[40.0; 8]);
    let styles = InlineStyles::new();
    let layout = BlockFlow::new(100.0);
    let mut resources = StaticResources;
    let options = PaginateOptions {
        max_pages: 1,
        ..square()
    };

    let summary = paginate(&mut tree, section, &options, Host::new(&styles, &layout, &mut resources))
        .unwrap();
    assert_eq!(summary.pages, 2);
    let kinds: Vec<DiagnosticKind> = summary.diagnostics.iter().map(|d| d.kind).collect();
    assert_eq!(kinds, vec![DiagnosticKind::PageLimit]);
}

#[test]
fn test_paginator_non_convergence() {
    let mut tree = DomTree::new();
    let main = append_element(&mut tree, NodeId::ROOT, "main");
    let section = append_element(&mut tree, main, "div");
    let held = block(&mut tree, section, "blockquote", 60.0);
    let _ = tree
        .set_attr(held, "style", "height: 60px; break-after: avoid")
        .unwrap();
    let _ = block(&mut tree, section, "blockquote", 60.0);
    let styles = InlineStyles::new();
    let layout = BlockFlow::new(100.0);
    let mut resources = StaticResources;

    let summary = paginate(&mut tree, section, &square(), Host::new(&styles, &layout, &mut resources))
        .unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.diagnostics.len(), 1);
    assert_eq!(summary.diagnostics[0].kind, DiagnosticKind::NonConvergence);
    assert_eq!(summary.diagnostics[0].node, Some(held));
    assert_eq!(tree.children(main), &[section]);
}

#[test]
fn test_paginator_running_header() {
    let mut tree = DomTree::new();
    let main = append_element(&mut tree, NodeId::ROOT, "main");
    let section = append_element(&mut tree, main, "div");
    let h1 = block(&mut tree, section, "h1", 20.0);
    let title = tree.create_text("Getting  started");
    tree.append_child(h1, title);
    for _ in 0..4 {
        let _ = block(&mut tree, section, "blockquote", 40.0);
    }
    let styles = InlineStyles::new();
    let layout = BlockFlow::new(100.0);
    let mut resources = StaticResources;

    let summary = paginate(&mut tree, section, &square(), Host::new(&styles, &layout, &mut resources))
        .unwrap();
    assert_eq!(summary.pages, 2);

    for &page in tree.children(main) {
        let header = tree.children(page)[0];
        assert!(tree.has_class(header, RUNNING_HEADER_CLASS));
        assert_eq!(tree.text_content(header), "Getting started");
    }
}

#[test]
fn test_paginator_verbose_placeholder() {
    let (mut tree, _, section) = document(&[40.0]);
    let styles = InlineStyles::new();
    let layout = BlockFlow::new(100.0);
    let mut resources = StaticResources;
    let options = PaginateOptions {
        verbose: true,
        ..square()
    };

    let _ = paginate(&mut tree, section, &options, Host::new(&styles, &layout, &mut resources))
        .unwrap();
    let placeholder = *tree.children(section).last().unwrap();
    assert!(tree.has_class(placeholder, "placeholder"));
    assert_eq!(tree.attr(placeholder, "style"), Some("height: 60px; --lines: 3"));
    assert_eq!(tree.attr(section, "style"), Some("--empty-lines: 3"));
}

#[test]
fn test_paginator_rejects_detached_section() {
    let mut tree = DomTree::new();
    let detached = tree.create_element("div");
    let styles = InlineStyles::new();
    let layout = BlockFlow::new(100.0);
    let mut resources = StaticResources;

    let result = Paginator::new(
        &tree,
        detached,
        &square(),
        Host::new(&styles, &layout, &mut resources),
        0,
    );
    assert!(matches!(result, Err(PaginateError::NotASection(id)) if id == detached));
}

#[test]
fn test_paginator_rejects_bad_options() {
    let (tree, _, section) = document(&[40.0]);
    let styles = InlineStyles::new();
    let layout = BlockFlow::new(100.0);
    let mut resources = StaticResources;
    let options = PaginateOptions {
        render_interval: 0,
        ..square()
    };

    let result = Paginator::new(&tree, section, &options, Host::new(&styles, &layout, &mut resources), 0);
    assert!(matches!(result, Err(PaginateError::Options(_))));
}

// ========== whole documents ==========

#[test]
fn test_paginate_all_numbers_continuously() {
    let mut tree = DomTree::new();
    let main = append_element(&mut tree, NodeId::ROOT, "main");
    for count in [5, 2] {
        let section = append_element(&mut tree, main, "section");
        let _ = tree.set_attr(section, "class", "page").unwrap();
        for _ in 0..count {
            let _ = block(&mut tree, section, "blockquote", 40.0);
        }
    }
    let styles = InlineStyles::new();
    let layout = BlockFlow::new(100.0);
    let mut resources = StaticResources;

    let summary = paginate_all(
        &mut tree,
        NodeId::ROOT,
        &square(),
        Host::new(&styles, &layout, &mut resources),
    )
    .unwrap();

    assert_eq!(summary.pages, 4);
    assert_eq!(summary.sections.len(), 2);
    assert_eq!(summary.sections[1].first_page, 4);
    assert_eq!(
        page_numbers(&tree, main),
        ["1", "2", "3", "4"].map(|n| Some(n.to_string())).to_vec()
    );
    assert_eq!(tree.attr(main, "data-page-count"), Some("4"));
    assert_eq!(tree.attr(main, "style"), Some("--page-count: 4; --pages: \"4\""));
    assert_eq!(summary.diagnostics().count(), 0);
}

#[test]
fn test_paginate_all_rejects_bad_selector() {
    let (mut tree, _, _) = document(&[40.0]);
    let styles = InlineStyles::new();
    let layout = BlockFlow::new(100.0);
    let mut resources = StaticResources;
    let options = PaginateOptions {
        section_selector: "main > .page".to_string(),
        ..square()
    };

    let result = paginate_all(&mut tree, NodeId::ROOT, &options, Host::new(&styles, &layout, &mut resources));
    assert!(matches!(result, Err(PaginateError::Selector { .. })));
}

#[test]
fn test_compute_targets() {
    let (mut tree, main, section) = document(&[40.0; 5]);
    let target = tree.children(section)[4];
    let _ = tree.set_attr(target, "id", "conclusion").unwrap();
    let first = tree.children(section)[0];
    let link = append_element(&mut tree, first, "a");
    let _ = tree.set_attr(link, "href", "#conclusion").unwrap();
    let dangling = append_element(&mut tree, first, "a");
    let _ = tree.set_attr(dangling, "href", "#nowhere").unwrap();
    let external = append_element(&mut tree, first, "a");
    let _ = tree.set_attr(external, "href", "https://example.com/#conclusion").unwrap();

    let styles = InlineStyles::new();
    let layout = BlockFlow::new(100.0);
    let mut resources = StaticResources;
    let _ = paginate_all(&mut tree, main, &square(), Host::new(&styles, &layout, &mut resources))
        .unwrap();

    let targets = compute_targets(&mut tree, main).unwrap();
    assert_eq!(targets.links, 2);
    assert_eq!(targets.resolved, 1);
    assert_eq!(tree.attr(link, "data-target-page"), Some("3"));
    assert_eq!(tree.attr(dangling, "data-target-page"), None);
    assert_eq!(tree.attr(external, "data-target-page"), None);
}
