//! Tests for fitting children into a height budget: whole consumption,
//! text and element splits, break properties and shifting.

use folio_dom::{DomTree, NodeId};
use folio_paginate::fit::word_boundary_before;
use folio_paginate::{
    BlockFlow, Breaker, DiagnosticKind, FitRequest, Host, InlineStyles, PaginateOptions, Pass,
    StaticResources, StopAt,
};
use quickcheck_macros::quickcheck;

fn append_element(tree: &mut DomTree, parent: NodeId, tag: &str) -> NodeId {
    let id = tree.create_element(tag);
    tree.append_child(parent, id);
    id
}

/// An atomic block of `height` pixels with an extra `style`.
fn block(tree: &mut DomTree, parent: NodeId, tag: &str, height: f32, style: &str) -> NodeId {
    let id = append_element(tree, parent, tag);
    let _ = tree
        .set_attr(id, "style", &format!("height: {height}px; {style}"))
        .unwrap();
    id
}

fn text(tree: &mut DomTree, parent: NodeId, data: &str) -> NodeId {
    let id = tree.create_text(data);
    tree.append_child(parent, id);
    id
}

fn exact() -> PaginateOptions {
    PaginateOptions {
        tolerance: 0.0,
        ..PaginateOptions::default()
    }
}

/// Run `fit` over `container` with the built-in collaborators.
fn fit(tree: &mut DomTree, request: FitRequest, chars_per_line: usize) -> (folio_paginate::FitResult, Vec<DiagnosticKind>) {
    let styles = InlineStyles::new();
    let layout = BlockFlow::new(100.0).with_chars_per_line(chars_per_line);
    let mut resources = StaticResources;
    let options = exact();
    let mut pass = Pass::new(Host::new(&styles, &layout, &mut resources), &options).unwrap();
    let result = pass.fit(tree, request).unwrap();
    let kinds = pass.diagnostics().iter().map(|d| d.kind).collect();
    (result, kinds)
}

// ========== whole children ==========

#[test]
fn test_fit_everything_fits() {
    let mut tree = DomTree::new();
    let section = append_element(&mut tree, NodeId::ROOT, "div");
    let a = block(&mut tree, section, "blockquote", 30.0, "");
    let b = block(&mut tree, section, "blockquote", 30.0, "");

    let (result, diagnostics) = fit(&mut tree, FitRequest::new(100.0, section), 60);

    assert_eq!(result.breaker, Breaker::End);
    assert_eq!(result.nodes.node_ids(), vec![a, b]);
    assert!((result.empty - 40.0).abs() < 1e-3);
    assert!((result.empty_lines - 2.0).abs() < 1e-3);
    assert!(diagnostics.is_empty());
    // Nothing was split or moved.
    assert_eq!(tree.children(section), &[a, b]);
    assert!(tree.pagination(a).is_some_and(|p| !p.is_fragmented() && p.times_shifted == 0));
}

#[test]
fn test_fit_forty_blocks_into_one_fifty() {
    let mut tree = DomTree::new();
    let section = append_element(&mut tree, NodeId::ROOT, "div");
    let blocks: Vec<NodeId> = (0..4)
        .map(|_| block(&mut tree, section, "blockquote", 40.0, ""))
        .collect();

    let (first, _) = fit(&mut tree, FitRequest::new(150.0, section), 60);
    assert_eq!(first.breaker, Breaker::NoSpace);
    assert_eq!(first.nodes.node_ids(), blocks[..3].to_vec());
    assert!((first.empty - 30.0).abs() < 1e-3);

    let (second, _) = fit(&mut tree, FitRequest::new(150.0, section).start_at(3), 60);
    assert_eq!(second.breaker, Breaker::End);
    assert_eq!(second.nodes.node_ids(), vec![blocks[3]]);
}

#[test]
fn test_fit_exactly_full() {
    let mut tree = DomTree::new();
    let section = append_element(&mut tree, NodeId::ROOT, "div");
    let a = block(&mut tree, section, "blockquote", 50.0, "");
    let b = block(&mut tree, section, "blockquote", 50.0, "");
    let _ = block(&mut tree, section, "blockquote", 50.0, "");

    let (result, _) = fit(&mut tree, FitRequest::new(100.0, section), 60);
    assert_eq!(result.breaker, Breaker::Full);
    assert_eq!(result.nodes.node_ids(), vec![a, b]);
    assert!(result.empty.abs() < 1e-3);
}

#[test]
fn test_fit_exactly_full_at_the_end() {
    let mut tree = DomTree::new();
    let section = append_element(&mut tree, NodeId::ROOT, "div");
    let a = block(&mut tree, section, "blockquote", 50.0, "");
    let b = block(&mut tree, section, "blockquote", 50.0, "");
    let tail = text(&mut tree, section, "\n  ");

    let (result, _) = fit(&mut tree, FitRequest::new(100.0, section), 60);
    assert_eq!(result.breaker, Breaker::End);
    assert_eq!(result.nodes.node_ids(), vec![a, b, tail]);
    assert_eq!(result.nodes.length_strong(), 2);
    assert!(result.empty.abs() < 1e-3);
}

#[test]
fn test_fit_exactly_full_at_the_stop() {
    let mut tree = DomTree::new();
    let section = append_element(&mut tree, NodeId::ROOT, "div");
    let a = block(&mut tree, section, "blockquote", 50.0, "");
    let b = block(&mut tree, section, "blockquote", 50.0, "");
    let _ = block(&mut tree, section, "blockquote", 50.0, "");

    let request = FitRequest::new(100.0, section).stop_at(StopAt::Index(2));
    let (result, _) = fit(&mut tree, request, 60);
    assert_eq!(result.breaker, Breaker::StopAt);
    assert_eq!(result.nodes.node_ids(), vec![a, b]);
}

#[test]
fn test_fit_oversized_single_child() {
    let mut tree = DomTree::new();
    let section = append_element(&mut tree, NodeId::ROOT, "div");
    let huge = block(&mut tree, section, "blockquote", 300.0, "");
    let _ = block(&mut tree, section, "blockquote", 10.0, "");

    let (result, diagnostics) = fit(&mut tree, FitRequest::new(100.0, section), 60);
    assert_eq!(result.breaker, Breaker::Oversized);
    assert_eq!(result.nodes.node_ids(), vec![huge]);
    assert_eq!(diagnostics, vec![DiagnosticKind::Oversized]);
}

#[test]
fn test_fit_inert_children_are_weak() {
    let mut tree = DomTree::new();
    let section = append_element(&mut tree, NodeId::ROOT, "div");
    let a = block(&mut tree, section, "blockquote", 60.0, "");
    let _ = text(&mut tree, section, "\n  ");
    let _ = block(&mut tree, section, "blockquote", 60.0, "");

    let (result, _) = fit(&mut tree, FitRequest::new(100.0, section), 60);
    assert_eq!(result.breaker, Breaker::NoSpace);
    // The whitespace between the blocks does not end the page.
    assert_eq!(result.nodes.node_ids(), vec![a]);
}

// ========== break properties ==========

#[test]
fn test_fit_break_before_always() {
    let mut tree = DomTree::new();
    let section = append_element(&mut tree, NodeId::ROOT, "div");
    let a = block(&mut tree, section, "blockquote", 20.0, "break-before: page");
    let b = block(&mut tree, section, "blockquote", 20.0, "");
    let _ = block(&mut tree, section, "blockquote", 20.0, "page-break-before: always");

    let (result, _) = fit(&mut tree, FitRequest::new(100.0, section), 60);
    // A forced break before the first child is ignored.
    assert_eq!(result.breaker, Breaker::BreakBeforeAlways);
    assert_eq!(result.nodes.node_ids(), vec![a, b]);
}

#[test]
fn test_fit_break_after_always() {
    let mut tree = DomTree::new();
    let section = append_element(&mut tree, NodeId::ROOT, "div");
    let a = block(&mut tree, section, "blockquote", 20.0, "break-after: page");
    let _ = block(&mut tree, section, "blockquote", 20.0, "");

    let (result, _) = fit(&mut tree, FitRequest::new(100.0, section), 60);
    assert_eq!(result.breaker, Breaker::BreakAfterAlways);
    assert_eq!(result.nodes.node_ids(), vec![a]);
}

#[test]
fn test_fit_break_after_avoid_never_ends_a_page() {
    let mut tree = DomTree::new();
    let section = append_element(&mut tree, NodeId::ROOT, "div");
    let x = block(&mut tree, section, "blockquote", 20.0, "");
    let avoided = block(&mut tree, section, "h3", 20.0, "break-after: avoid");
    let _ = block(&mut tree, section, "blockquote", 40.0, "");

    let (result, _) = fit(&mut tree, FitRequest::new(60.0, section), 60);
    assert_eq!(result.breaker, Breaker::NoSpace);
    assert_eq!(result.nodes.node_ids(), vec![x]);
    assert_ne!(result.nodes.last(), Some(avoided));
}

#[test]
fn test_fit_break_after_avoid_alone_consumes_nothing() {
    let mut tree = DomTree::new();
    let section = append_element(&mut tree, NodeId::ROOT, "div");
    let _ = block(&mut tree, section, "blockquote", 60.0, "page-break-after: avoid");
    let _ = block(&mut tree, section, "blockquote", 60.0, "");

    let (result, diagnostics) = fit(&mut tree, FitRequest::new(100.0, section), 60);
    assert_eq!(result.nodes.length_strong(), 0);
    assert!(result.nodes.is_empty());
    // Forcing the second block in would strand the first one.
    assert!(diagnostics.is_empty());
}

// ========== text splits ==========

#[test]
fn test_fit_text_splits_at_word_boundary() {
    let mut tree = DomTree::new();
    let section = append_element(&mut tree, NodeId::ROOT, "div");
    let words = text(&mut tree, section, "alpha beta gamma delta epsilon zeta eta theta");

    let (result, _) = fit(&mut tree, FitRequest::new(40.0, section), 10);
    assert_eq!(result.breaker, Breaker::Fragmentation);
    assert_eq!(result.nodes.node_ids(), vec![words]);
    assert_eq!(tree.as_text(words), Some("alpha beta gamma "));

    let rest = tree.children(section)[1];
    assert_eq!(tree.as_text(rest), Some("delta epsilon zeta eta theta"));
}

#[test]
fn test_fit_text_without_boundary_is_not_split() {
    let mut tree = DomTree::new();
    let section = append_element(&mut tree, NodeId::ROOT, "div");
    let _ = block(&mut tree, section, "blockquote", 80.0, "");
    let word = text(&mut tree, section, "Supercalifragilisticexpialidocious");

    let (result, _) = fit(&mut tree, FitRequest::new(100.0, section), 10);
    assert_eq!(result.breaker, Breaker::NoSpace);
    assert_eq!(tree.as_text(word), Some("Supercalifragilisticexpialidocious"));
    assert_eq!(tree.children(section).len(), 2);
}

#[test]
fn test_fit_balanced_text_is_measured_greedily_while_splitting() {
    let mut tree = DomTree::new();
    let section = append_element(&mut tree, NodeId::ROOT, "div");
    let _ = tree.set_attr(section, "style", "text-wrap: balance").unwrap();
    let words = text(&mut tree, section, "aaaa bbbb cccc dddd eeee ffff gggg");

    let (result, _) = fit(&mut tree, FitRequest::new(40.0, section), 10);
    assert_eq!(result.breaker, Breaker::Fragmentation);
    // Balanced lines are 9 characters long here; greedy ones take a fourth word.
    assert_eq!(tree.as_text(words), Some("aaaa bbbb cccc dddd "));
    // The temporary wrapping override is gone.
    assert_eq!(tree.attr(section, "style"), Some("text-wrap: balance"));
}

#[quickcheck]
fn prop_word_boundary_never_inside_a_word(text: String, offset: usize) -> bool {
    let chars: Vec<char> = text.chars().collect();
    let offset = if chars.is_empty() { 0 } else { offset % (chars.len() + 1) };
    let boundary = word_boundary_before(&chars, offset);
    boundary <= offset
        && (boundary == 0
            || boundary == chars.len()
            || !(chars[boundary - 1].is_alphanumeric() && chars[boundary].is_alphanumeric()))
}

// ========== element splits ==========

/// A fragmentable paragraph of four lines of `line` pixels after a `lead`
/// pixel block.
fn paragraph_after_block(tree: &mut DomTree, lead: f32, line: f32) -> (NodeId, NodeId, NodeId) {
    let section = append_element(tree, NodeId::ROOT, "div");
    let lead = block(tree, section, "blockquote", lead, "");
    let p = append_element(tree, section, "p");
    for _ in 0..4 {
        let _ = block(tree, p, "div", line, "");
    }
    (section, lead, p)
}

#[test]
fn test_fit_orphans_and_widows_eligible() {
    let mut tree = DomTree::new();
    let (section, lead, p) = paragraph_after_block(&mut tree, 60.0, 20.0);

    let (result, _) = fit(&mut tree, FitRequest::new(100.0, section), 60);
    assert_eq!(result.breaker, Breaker::Fragmentation);
    assert_eq!(result.nodes.len(), 2);
    assert_eq!(result.nodes.node(0), Some(lead));

    let fragment = result.nodes.node(1).unwrap();
    assert_eq!(tree.pagination(fragment).and_then(|s| s.fragmented_from), Some(p));
    assert_eq!(tree.children(fragment).len(), 2);
    assert_eq!(tree.children(p).len(), 2);
    assert_eq!(tree.children(section), &[lead, fragment, p]);
}

#[test]
fn test_fit_orphans_and_widows_just_short() {
    let mut tree = DomTree::new();
    // Four lines of 19.95px: 79.8px, a hair under orphans + widows.
    let (section, lead, p) = paragraph_after_block(&mut tree, 60.0, 19.95);

    let (result, _) = fit(&mut tree, FitRequest::new(100.0, section), 60);
    assert_eq!(result.breaker, Breaker::NoSpace);
    assert_eq!(result.nodes.node_ids(), vec![lead]);
    assert_eq!(tree.children(p).len(), 4);
    assert!(tree.pagination(p).is_some_and(|s| !s.is_fragmented()));
}

#[test]
fn test_fit_orphans_need_room_on_the_page() {
    let mut tree = DomTree::new();
    // 30px left is less than two 20px lines.
    let (section, lead, p) = paragraph_after_block(&mut tree, 70.0, 20.0);

    let (result, _) = fit(&mut tree, FitRequest::new(100.0, section), 60);
    assert_eq!(result.breaker, Breaker::NoSpace);
    assert_eq!(result.nodes.node_ids(), vec![lead]);
    assert_eq!(tree.children(section), &[lead, p]);
    assert_eq!(tree.children(p).len(), 4);
    assert!(tree.pagination(p).is_some_and(|s| !s.is_fragmented()));
}

#[test]
fn test_fit_break_inside_avoid_keeps_element_whole() {
    let mut tree = DomTree::new();
    let (section, lead, p) = paragraph_after_block(&mut tree, 60.0, 20.0);
    let _ = tree.set_attr(p, "style", "break-inside: avoid").unwrap();

    let (result, _) = fit(&mut tree, FitRequest::new(100.0, section), 60);
    assert_eq!(result.breaker, Breaker::NoSpace);
    assert_eq!(result.nodes.node_ids(), vec![lead]);
}

#[test]
fn test_fit_measuring_never_changes_the_tree() {
    let mut tree = DomTree::new();
    let (section, lead, p) = paragraph_after_block(&mut tree, 60.0, 20.0);
    let revision = tree.revision();

    let (result, _) = fit(&mut tree, FitRequest::new(100.0, section).measure_only(), 60);
    assert_eq!(result.breaker, Breaker::NoSpace);
    assert_eq!(result.nodes.node_ids(), vec![lead]);
    assert_eq!(tree.revision(), revision);
    assert_eq!(tree.children(p).len(), 4);
}

// ========== headings ==========

#[test]
fn test_fit_tracks_open_headings() {
    let mut tree = DomTree::new();
    let section = append_element(&mut tree, NodeId::ROOT, "div");
    let h1 = block(&mut tree, section, "h1", 20.0, "");
    let h2 = block(&mut tree, section, "h2", 20.0, "");
    let _ = block(&mut tree, section, "blockquote", 20.0, "");
    let h2b = block(&mut tree, section, "h2", 20.0, "");
    let _ = block(&mut tree, section, "blockquote", 200.0, "");

    let (result, _) = fit(&mut tree, FitRequest::new(100.0, section), 60);
    let open: Vec<(u8, NodeId)> = result.headings.iter().map(|h| (h.level, h.node)).collect();
    assert_eq!(open, vec![(1, h1), (2, h2b)]);
    assert_ne!(result.headings.innermost().map(|h| h.node), Some(h2));
}

// ========== shifting ==========

#[test]
fn test_fit_shift_down_backfills_the_slot() {
    let mut tree = DomTree::new();
    let section = append_element(&mut tree, NodeId::ROOT, "div");
    let h2 = block(&mut tree, section, "h2", 20.0, "");
    let b1 = block(&mut tree, section, "blockquote", 40.0, "");
    let figure = block(&mut tree, section, "figure", 80.0, "");
    let b2 = block(&mut tree, section, "blockquote", 20.0, "");
    let b3 = block(&mut tree, section, "blockquote", 20.0, "");

    let (result, _) = fit(&mut tree, FitRequest::new(100.0, section), 60);

    // Shifting up would leave no space either; ties go down.
    assert_eq!(result.breaker, Breaker::Shift);
    assert_eq!(result.nodes.node_ids(), vec![h2, b1, b2, b3]);
    assert_eq!(tree.children(section), &[h2, b1, b2, b3, figure]);
    assert_eq!(tree.pagination(figure).map(|p| p.times_shifted), Some(1));
}

#[test]
fn test_fit_shift_up_before_trailing_content() {
    let mut tree = DomTree::new();
    let section = append_element(&mut tree, NodeId::ROOT, "div");
    let h2 = block(&mut tree, section, "h2", 20.0, "");
    let b1 = block(&mut tree, section, "blockquote", 30.0, "");
    let b2 = block(&mut tree, section, "blockquote", 30.0, "");
    let figure = block(&mut tree, section, "figure", 40.0, "");
    let h3 = block(&mut tree, section, "h3", 20.0, "");

    let (result, _) = fit(&mut tree, FitRequest::new(100.0, section), 60);

    // Nothing can take the figure's slot before the heading, so it moves up
    // past b2 and leaves 10px unused instead of 20px.
    assert_eq!(result.breaker, Breaker::Shift);
    assert_eq!(result.nodes.node_ids(), vec![h2, b1, figure]);
    assert!((result.empty - 10.0).abs() < 1e-3);
    assert_eq!(tree.children(section), &[h2, b1, figure, b2, h3]);
    assert_eq!(tree.pagination(figure).map(|p| p.times_shifted), Some(1));
}

#[test]
fn test_fit_shift_never_crosses_a_heading() {
    let mut tree = DomTree::new();
    let section = append_element(&mut tree, NodeId::ROOT, "div");
    let b0 = block(&mut tree, section, "blockquote", 30.0, "");
    let h2 = block(&mut tree, section, "h2", 20.0, "");
    let figure = block(&mut tree, section, "figure", 70.0, "");
    let h3 = block(&mut tree, section, "h3", 20.0, "");
    let b4 = block(&mut tree, section, "blockquote", 30.0, "");

    let (result, _) = fit(&mut tree, FitRequest::new(100.0, section), 60);

    assert_eq!(result.breaker, Breaker::NoShift);
    assert_eq!(result.nodes.node_ids(), vec![b0, h2]);
    assert_eq!(tree.children(section), &[b0, h2, figure, h3, b4]);
    assert_eq!(tree.pagination(figure).map(|p| p.times_shifted), Some(0));
}
