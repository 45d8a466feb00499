//! Tests for splitting elements into fragments.

use folio_dom::{DomTree, NodeId, to_html};
use folio_paginate::fragment::{FRAGMENT_CLASS, SOURCE_CLASS, fragment_id};
use folio_paginate::fragment_element;

fn append_element(tree: &mut DomTree, parent: NodeId, tag: &str) -> NodeId {
    let id = tree.create_element(tag);
    tree.append_child(parent, id);
    id
}

fn list(tree: &mut DomTree, tag: &str, items: usize) -> (NodeId, Vec<NodeId>) {
    let ol = append_element(tree, NodeId::ROOT, tag);
    let items = (0..items).map(|_| append_element(tree, ol, "li")).collect();
    (ol, items)
}

#[test]
fn test_fragment_ids() {
    let mut tree = DomTree::new();
    let div = append_element(&mut tree, NodeId::ROOT, "div");
    let _ = tree.set_attr(div, "id", "x").unwrap();
    let children: Vec<NodeId> = (0..4).map(|_| append_element(&mut tree, div, "p")).collect();

    let first = fragment_element(&mut tree, div, &children[..1]).unwrap();
    assert_eq!(tree.attr(first, "id"), Some("x"));
    assert_eq!(tree.attr(div, "id"), Some("x-2"));

    let second = fragment_element(&mut tree, div, &children[1..2]).unwrap();
    assert_eq!(tree.attr(second, "id"), Some("x-2"));
    assert_eq!(tree.attr(div, "id"), Some("x-3"));

    assert_eq!(tree.children(NodeId::ROOT), &[first, second, div]);
    assert_eq!(tree.attr(first, "data-fragment"), Some("1"));
    assert_eq!(tree.attr(second, "data-fragment"), Some("2"));
    assert_eq!(tree.attr(div, "data-fragment"), Some("3"));
}

#[test]
fn test_fragment_id_helper() {
    assert_eq!(fragment_id("intro", 1), "intro");
    assert_eq!(fragment_id("intro", 4), "intro-4");
}

#[test]
fn test_fragment_links_and_classes() {
    let mut tree = DomTree::new();
    let div = append_element(&mut tree, NodeId::ROOT, "div");
    let _ = tree.set_attr(div, "class", "page").unwrap();
    let a = append_element(&mut tree, div, "p");
    let b = append_element(&mut tree, div, "p");

    let fragment = fragment_element(&mut tree, div, &[a]).unwrap();

    assert_eq!(tree.children(fragment), &[a]);
    assert_eq!(tree.children(div), &[b]);
    assert!(tree.has_class(fragment, "page"));
    assert!(tree.has_class(fragment, FRAGMENT_CLASS));
    assert!(!tree.has_class(fragment, SOURCE_CLASS));
    assert!(tree.has_class(div, SOURCE_CLASS));

    let state = tree.pagination(div).unwrap();
    assert_eq!(state.fragments, vec![fragment]);
    assert_eq!(state.source_id, None);
    assert_eq!(tree.pagination(fragment).unwrap().fragmented_from, Some(div));
}

#[test]
fn test_fragment_ordered_list_continues() {
    let mut tree = DomTree::new();
    let (ol, items) = list(&mut tree, "ol", 10);

    let fragment = fragment_element(&mut tree, ol, &items[..4]).unwrap();

    assert_eq!(tree.attr(fragment, "start"), None);
    assert_eq!(tree.attr(ol, "start"), Some("5"));

    let _ = fragment_element(&mut tree, ol, &items[4..7]).unwrap();
    assert_eq!(tree.attr(ol, "start"), Some("8"));
}

#[test]
fn test_fragment_ordered_list_keeps_explicit_start() {
    let mut tree = DomTree::new();
    let (ol, items) = list(&mut tree, "ol", 5);
    let _ = tree.set_attr(ol, "start", "3").unwrap();

    let fragment = fragment_element(&mut tree, ol, &items[..2]).unwrap();
    assert_eq!(tree.attr(fragment, "start"), Some("3"));
    assert_eq!(tree.attr(ol, "start"), Some("5"));
}

#[test]
fn test_fragment_reversed_list_counts_down() {
    let mut tree = DomTree::new();
    let (ol, items) = list(&mut tree, "ol", 10);
    let _ = tree.set_attr(ol, "reversed", "").unwrap();

    let fragment = fragment_element(&mut tree, ol, &items[..4]).unwrap();
    assert_eq!(tree.attr(fragment, "start"), Some("10"));
    assert_eq!(tree.attr(ol, "start"), Some("6"));
}

#[test]
fn test_fragment_unordered_list_has_no_start() {
    let mut tree = DomTree::new();
    let (ul, items) = list(&mut tree, "ul", 3);
    let fragment = fragment_element(&mut tree, ul, &items[..1]).unwrap();
    assert_eq!(tree.attr(fragment, "start"), None);
    assert_eq!(tree.attr(ul, "start"), None);
}

#[test]
fn test_fragment_details_share_summary() {
    let mut tree = DomTree::new();
    let details = append_element(&mut tree, NodeId::ROOT, "details");
    let summary = append_element(&mut tree, details, "summary");
    let _ = tree.set_attr(summary, "id", "s").unwrap();
    let label = tree.create_text("More");
    tree.append_child(summary, label);
    let p1 = append_element(&mut tree, details, "p");
    let _ = append_element(&mut tree, details, "p");

    let fragment = fragment_element(&mut tree, details, &[summary, p1]).unwrap();

    let copy = tree.children(details)[0];
    assert_eq!(tree.tag_name(copy), Some("summary"));
    assert_ne!(copy, summary);
    assert_eq!(tree.text_content(copy), "More");
    assert_eq!(tree.attr(copy, "id"), None);
    assert_eq!(tree.children(fragment)[0], summary);
}

#[test]
fn test_fragment_details_without_summary() {
    let mut tree = DomTree::new();
    let details = append_element(&mut tree, NodeId::ROOT, "details");
    let p1 = append_element(&mut tree, details, "p");
    let _ = append_element(&mut tree, details, "p");

    let fragment = fragment_element(&mut tree, details, &[p1]).unwrap();
    assert_eq!(
        to_html(&tree, fragment),
        r#"<details class="fragment" data-fragment="1"><summary></summary><p></p></details>"#
    );
    assert_eq!(tree.tag_name(tree.children(details)[0]), Some("summary"));
    assert_eq!(tree.children(details).len(), 2);
}

#[test]
fn test_fragment_pre_drops_leading_newline() {
    let mut tree = DomTree::new();
    let pre = append_element(&mut tree, NodeId::ROOT, "pre");
    let head = tree.create_text("fn main() {");
    tree.append_child(pre, head);
    let tail = tree.create_text("\n}\n");
    tree.append_child(pre, tail);

    let _ = fragment_element(&mut tree, pre, &[head]).unwrap();
    assert_eq!(tree.as_text(tail), Some("}\n"));
}

#[test]
fn test_fragment_rejects_text() {
    let mut tree = DomTree::new();
    let text = tree.create_text("x");
    tree.append_child(NodeId::ROOT, text);
    assert!(fragment_element(&mut tree, text, &[]).is_err());
}
