//! Splitting an element into fragments.
//!
//! [§ 5.1 Breaking into Fragments](https://www.w3.org/TR/css-break-3/#breaking-rules)
//!
//! "When a box breaks, its content box extends to fill any remaining
//! fragmentainer extent ... and it is sliced." Here the slice is real: the
//! consumed children move into a shallow clone of the element that is
//! inserted before it, and the original keeps what is left.

use folio_dom::{DomError, DomTree, NodeId};

/// Class added to an element the first time it is split.
pub const SOURCE_CLASS: &str = "source";

/// Class carried by every fragment.
pub const FRAGMENT_CLASS: &str = "fragment";

/// Move `nodes` (children of `original`, in order) into a new fragment of
/// `original`, placed right before it.
///
/// The fragment is a shallow clone: same tag and attributes, with these
/// adjustments:
///
/// - `data-fragment` numbers fragments from 1; the original carries the
///   number the next fragment will get.
/// - If the original had an id, the first fragment keeps it and later
///   fragments and the original use `{id}-{number}`.
/// - Ordered lists continue their numbering, `details` keep a `summary` on
///   both sides, and a preformatted remainder drops its leading newline.
///
/// # Errors
///
/// Fails when `original` is not an element or a node is not in the tree.
pub fn fragment_element(dom: &mut DomTree, original: NodeId, nodes: &[NodeId]) -> Result<NodeId, DomError> {
    if dom.as_element(original).is_none() {
        return Err(DomError::NotAnElement(original));
    }
    let fragment = dom.clone_shallow(original)?;
    for &node in nodes {
        dom.detach(node)?;
        dom.append_child(fragment, node);
    }

    if !dom.pagination(original).is_some_and(|p| p.is_fragmented()) {
        let id = dom.attr(original, "id").map(str::to_string);
        dom.pagination_mut(original)?.source_id = id;
        dom.add_class(original, SOURCE_CLASS)?;
    }
    let state = dom.pagination_mut(original)?;
    state.fragments.push(fragment);
    let number = state.fragments.len();
    let source_id = state.source_id.clone();
    dom.pagination_mut(fragment)?.fragmented_from = Some(original);

    dom.add_class(fragment, FRAGMENT_CLASS)?;
    dom.remove_class(fragment, SOURCE_CLASS)?;
    let _ = dom.set_attr(fragment, "data-fragment", &number.to_string())?;
    let _ = dom.set_attr(original, "data-fragment", &(number + 1).to_string())?;

    if let Some(id) = source_id {
        let _ = dom.set_attr(fragment, "id", &fragment_id(&id, number))?;
        let _ = dom.set_attr(original, "id", &fragment_id(&id, number + 1))?;
    }

    let tag = dom.tag_name(fragment).map(str::to_string);
    match tag.as_deref() {
        Some("ol") => continue_numbering(dom, original, fragment, nodes)?,
        Some("details") => share_summary(dom, original, fragment)?,
        Some("pre" | "code") => strip_leading_newline(dom, original)?,
        _ => {}
    }

    if let Some(parent) = dom.parent(original) {
        dom.insert_before(parent, fragment, original)?;
    }
    Ok(fragment)
}

/// The id of fragment `number` of an element whose id was `id`.
#[must_use]
pub fn fragment_id(id: &str, number: usize) -> String {
    if number == 1 {
        id.to_string()
    } else {
        format!("{id}-{number}")
    }
}

/// [§ 4.4.5 The ol element](https://html.spec.whatwg.org/multipage/grouping-content.html#the-ol-element)
///
/// "The start attribute, if present, must be a valid integer. It is used
/// to determine the starting value of the list." For `reversed` lists,
/// "if the reversed attribute is present, the starting value is the number
/// of child li elements."
fn continue_numbering(dom: &mut DomTree, original: NodeId, fragment: NodeId, moved: &[NodeId]) -> Result<(), DomError> {
    let moved_items = moved.iter().filter(|&&n| dom.tag_name(n) == Some("li")).count() as i64;
    let start = dom.attr(original, "start").and_then(|s| s.trim().parse::<i64>().ok());

    if dom.attr(original, "reversed").is_some() {
        let remaining_items = dom
            .children(original)
            .iter()
            .filter(|&&n| dom.tag_name(n) == Some("li"))
            .count() as i64;
        let start = start.unwrap_or(moved_items + remaining_items);
        let _ = dom.set_attr(fragment, "start", &start.to_string())?;
        let _ = dom.set_attr(original, "start", &(start - moved_items).to_string())?;
    } else {
        let start = start.unwrap_or(1);
        let _ = dom.set_attr(original, "start", &(start + moved_items).to_string())?;
    }
    Ok(())
}

/// [§ 4.11.1 The details element](https://html.spec.whatwg.org/multipage/interactive-elements.html#the-details-element)
///
/// Give whichever side lacks a `summary` a copy of the other's, or empty
/// ones to both if neither has one. Copies lose their ids.
fn share_summary(dom: &mut DomTree, original: NodeId, fragment: NodeId) -> Result<(), DomError> {
    let summary_of = |dom: &DomTree, details: NodeId| {
        dom.children(details)
            .iter()
            .copied()
            .find(|&c| dom.tag_name(c) == Some("summary"))
    };

    match (summary_of(dom, original), summary_of(dom, fragment)) {
        (Some(summary), None) => {
            let copy = clone_without_ids(dom, summary)?;
            dom.prepend_child(fragment, copy)?;
        }
        (None, Some(summary)) => {
            let copy = clone_without_ids(dom, summary)?;
            dom.prepend_child(original, copy)?;
        }
        (None, None) => {
            for details in [fragment, original] {
                let empty = dom.create_element("summary");
                dom.prepend_child(details, empty)?;
            }
        }
        (Some(_), Some(_)) => {}
    }
    Ok(())
}

fn clone_without_ids(dom: &mut DomTree, node: NodeId) -> Result<NodeId, DomError> {
    let copy = dom.clone_deep(node)?;
    let ids: Vec<NodeId> = dom
        .descendants(copy)
        .filter(|&n| dom.attr(n, "id").is_some())
        .collect();
    for id in ids {
        let _ = dom.remove_attr(id, "id")?;
    }
    Ok(copy)
}

/// [§ 4.4.3 The pre element](https://html.spec.whatwg.org/multipage/grouping-content.html#the-pre-element)
///
/// A newline right after the break would render as an empty first line of
/// the remainder.
fn strip_leading_newline(dom: &mut DomTree, remainder: NodeId) -> Result<(), DomError> {
    let first_text = dom
        .descendants(remainder)
        .skip(1)
        .find(|&n| dom.as_text(n).is_some_and(|t| !t.is_empty()));
    if let Some(text_node) = first_text {
        if let Some(rest) = dom.as_text(text_node).and_then(|t| t.strip_prefix('\n')) {
            let rest = rest.to_string();
            dom.set_text(text_node, &rest)?;
        }
    }
    Ok(())
}
