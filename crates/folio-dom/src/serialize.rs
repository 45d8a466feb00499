//! [§ 13.3 Serializing HTML fragments](https://html.spec.whatwg.org/multipage/parsing.html#serialising-html-fragments)
//!
//! Attributes are written in sorted order so output is stable across runs.

use crate::{DomTree, NodeId, NodeType};

/// [§ 13.1.2 Elements](https://html.spec.whatwg.org/multipage/syntax.html#void-elements)
///
/// "Void elements only have a start tag; end tags must not be specified for void elements."
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Serialize `id` and its subtree as HTML.
#[must_use]
pub fn to_html(tree: &DomTree, id: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, id, &mut out);
    out
}

fn write_node(tree: &DomTree, id: NodeId, out: &mut String) {
    let Some(node) = tree.get(id) else { return };

    match &node.node_type {
        NodeType::Document => {
            for &child in tree.children(id) {
                write_node(tree, child, out);
            }
        }
        NodeType::Element(data) => {
            out.push('<');
            out.push_str(&data.tag_name);
            let mut attrs: Vec<_> = data.attrs.iter().collect();
            attrs.sort();
            for (name, value) in attrs {
                out.push(' ');
                out.push_str(name);
                if !value.is_empty() {
                    out.push_str("=\"");
                    escape_into(value, true, out);
                    out.push('"');
                }
            }
            out.push('>');

            if VOID_ELEMENTS.contains(&data.tag_name.as_str()) {
                return;
            }
            for &child in tree.children(id) {
                write_node(tree, child, out);
            }
            out.push_str("</");
            out.push_str(&data.tag_name);
            out.push('>');
        }
        NodeType::Text(text) => escape_into(text, false, out),
        NodeType::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
    }
}

/// [§ 13.3 Escaping a string](https://html.spec.whatwg.org/multipage/parsing.html#escapingString)
fn escape_into(text: &str, attribute_mode: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{00A0}' => out.push_str("&nbsp;"),
            '"' if attribute_mode => out.push_str("&quot;"),
            '<' if !attribute_mode => out.push_str("&lt;"),
            '>' if !attribute_mode => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}
