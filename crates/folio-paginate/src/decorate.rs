//! Page furniture: numbers, running headers, and empty-space hooks.

use folio_dom::{DomError, DomTree, NodeId};

use crate::heading::HeadingStack;

/// Class of the page-number link appended to every page.
pub const PAGE_NUMBER_CLASS: &str = "page-number";

/// Class of the running header prepended to pages.
pub const RUNNING_HEADER_CLASS: &str = "running-header";

/// Class of pages with more than one empty line.
pub const UNDERFULL_CLASS: &str = "underfull";

/// What to put on one page.
#[derive(Debug, Clone)]
pub struct PageDecoration<'a> {
    /// 1-based page number.
    pub number: usize,
    /// Unused height.
    pub empty: f32,
    /// Unused height in lines.
    pub empty_lines: f32,
    /// Headings open on the page, for the running header.
    pub headings: Option<&'a HeadingStack>,
    /// Leave a visible placeholder in the unused space.
    pub placeholder: bool,
}

/// The id of the page-number marker of page `number`.
#[must_use]
pub fn page_anchor(number: usize) -> String {
    format!("page-{number}")
}

/// Apply `decoration` to `page`.
///
/// - `data-page` and `data-empty-lines` attributes, and an `--empty-lines`
///   custom property, as styling hooks.
/// - Class [`UNDERFULL_CLASS`] when more than one line is empty.
/// - A running header made of the open headings' text.
/// - A `<a class="page-number">` marker linking to itself.
/// - In verbose mode, a `div.placeholder` sized to the unused space.
///
/// # Errors
///
/// Fails when `page` is not an element.
pub fn decorate_page(dom: &mut DomTree, page: NodeId, decoration: &PageDecoration<'_>) -> Result<(), DomError> {
    let number = decoration.number.to_string();
    let lines = round2(decoration.empty_lines);

    let _ = dom.set_attr(page, "data-page", &number)?;
    let _ = dom.set_attr(page, "data-empty-lines", &lines.to_string())?;
    set_custom_property(dom, page, "--empty-lines", &lines.to_string())?;
    if decoration.empty_lines > 1.0 {
        dom.add_class(page, UNDERFULL_CLASS)?;
    } else {
        dom.remove_class(page, UNDERFULL_CLASS)?;
    }

    if let Some(headings) = decoration.headings.filter(|h| !h.is_empty()) {
        let header = running_header(dom, headings)?;
        dom.prepend_child(page, header)?;
    }

    let marker = dom.create_element("a");
    let anchor = page_anchor(decoration.number);
    let _ = dom.set_attr(marker, "class", PAGE_NUMBER_CLASS)?;
    let _ = dom.set_attr(marker, "id", &anchor)?;
    let _ = dom.set_attr(marker, "href", &format!("#{anchor}"))?;
    let text = dom.create_text(&number);
    dom.append_child(marker, text);
    dom.append_child(page, marker);

    if decoration.placeholder && decoration.empty_lines > 1.0 {
        let placeholder = dom.create_element("div");
        let _ = dom.set_attr(placeholder, "class", "placeholder")?;
        let _ = dom.set_attr(
            placeholder,
            "style",
            &format!("height: {}px; --lines: {lines}", round2(decoration.empty)),
        )?;
        let text = dom.create_text(&format!("Empty space: {lines} lines"));
        dom.append_child(placeholder, text);
        dom.append_child(page, placeholder);
    }
    Ok(())
}

fn running_header(dom: &mut DomTree, headings: &HeadingStack) -> Result<NodeId, DomError> {
    let header = dom.create_element("header");
    let _ = dom.set_attr(header, "class", RUNNING_HEADER_CLASS)?;
    let entries: Vec<(u8, String)> = headings
        .iter()
        .map(|h| (h.level, collapse_whitespace(&dom.text_content(h.node))))
        .collect();
    for (level, text) in entries {
        let span = dom.create_element("span");
        let _ = dom.set_attr(span, "class", "running-heading")?;
        let _ = dom.set_attr(span, "data-level", &level.to_string())?;
        let text = dom.create_text(&text);
        dom.append_child(span, text);
        dom.append_child(header, span);
    }
    Ok(header)
}

/// Set `name: value` in the element's `style` attribute, replacing an
/// earlier declaration of the same property.
///
/// # Errors
///
/// Fails when `node` is not an element.
pub fn set_custom_property(dom: &mut DomTree, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
    let mut declarations: Vec<String> = dom
        .attr(node, "style")
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .filter(|d| d.split_once(':').is_none_or(|(prop, _)| prop.trim() != name))
        .map(str::to_string)
        .collect();
    declarations.push(format!("{name}: {value}"));
    let _ = dom.set_attr(node, "style", &declarations.join("; "))?;
    Ok(())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}
