//! Layout facts about elements.
//!
//! [§ 4.4 Computed Values](https://www.w3.org/TR/css-cascade-4/#computed)
//!
//! Pagination only needs a handful of properties: the ones that take an
//! element out of flow, the fragmentation controls, the block-axis box
//! edges, and the line metrics used for orphans and widows. [`StyleFacts`]
//! holds exactly those, already resolved to pixels.
//!
//! [`InlineStyles`] is the built-in [`StyleSource`]: it resolves `style`
//! attributes over a small table of tag defaults. Hosts with a real cascade
//! implement [`StyleSource`] themselves.

use std::collections::HashMap;
use std::str::FromStr;

use folio_common::warning::warn_once;
use folio_dom::{DomTree, NodeId};
use serde::Serialize;
use strum_macros::EnumString;

/// Used when nothing sets `font-size`.
/// [§ 3.5 font-size](https://www.w3.org/TR/css-fonts-4/#font-size-prop)
pub const DEFAULT_FONT_SIZE_PX: f32 = 16.0;

/// [§ 4.2 'line-height'](https://www.w3.org/TR/css-inline-3/#line-height-property)
///
/// `normal` resolved against the default font size.
pub const DEFAULT_LINE_HEIGHT_PX: f32 = 20.0;

/// [§ 3.1 Breaks Between Boxes](https://www.w3.org/TR/css-break-3/#break-between)
///
/// The values of `break-before`, `break-after` and `break-inside`, reduced to
/// what a paginator can act on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Break {
    /// "Neither force nor forbid a break."
    #[default]
    Auto,
    /// `avoid`, `avoid-page` and friends.
    Avoid,
    /// Any forced break: `page`, `left`, `right`, `recto`, `verso`, `always`.
    Always,
}

impl Break {
    /// Parse a `break-*` or legacy `page-break-*` keyword.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(Self::Auto),
            "avoid" | "avoid-page" | "avoid-column" | "avoid-region" => Some(Self::Avoid),
            "always" | "page" | "left" | "right" | "recto" | "verso" | "all" | "column"
            | "region" => Some(Self::Always),
            _ => None,
        }
    }
}

/// [§ 3 Positioning schemes](https://www.w3.org/TR/css-position-3/#position-property)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Position {
    /// Initial value.
    #[default]
    Static,
    /// `relative`
    Relative,
    /// `sticky`
    Sticky,
    /// `absolute`: out of flow.
    Absolute,
    /// `fixed`: out of flow.
    Fixed,
}

/// [§ 2 'display'](https://www.w3.org/TR/css-display-3/#the-display-properties)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Display {
    /// `block`, `flow-root`
    #[default]
    #[strum(serialize = "block", serialize = "flow-root")]
    Block,
    /// `inline`
    Inline,
    /// `inline-block` and the other inline-level containers.
    #[strum(
        serialize = "inline-block",
        serialize = "inline-flex",
        serialize = "inline-grid",
        serialize = "inline-table"
    )]
    InlineBlock,
    /// `list-item`
    ListItem,
    /// `flex`, `grid`, `table` and other block-level containers.
    #[strum(serialize = "flex", serialize = "grid", serialize = "table", serialize = "contents")]
    Other,
    /// "The element and its descendants generate no boxes or text runs."
    None,
}

/// [§ 3.1 'float'](https://www.w3.org/TR/CSS2/visuren.html#float-position)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Float {
    /// Initial value.
    #[default]
    None,
    /// `left` / `inline-start`
    #[strum(serialize = "left", serialize = "inline-start")]
    Left,
    /// `right` / `inline-end`
    #[strum(serialize = "right", serialize = "inline-end")]
    Right,
}

/// [§ 4.4 'box-sizing'](https://www.w3.org/TR/css-sizing-3/#box-sizing)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum BoxSizing {
    /// Sizes apply to the content box.
    #[default]
    ContentBox,
    /// Sizes include padding and border.
    BorderBox,
}

/// [§ 5.1 'text-wrap'](https://www.w3.org/TR/css-text-4/#text-wrap)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TextWrap {
    /// Greedy line filling.
    #[default]
    #[strum(serialize = "wrap", serialize = "auto")]
    Wrap,
    /// No soft wraps; only preserved newlines break lines.
    Nowrap,
    /// Lines of a block are balanced to equal length.
    Balance,
    /// Like `wrap`, with better last lines.
    Pretty,
    /// Like `wrap`, stable while editing.
    Stable,
}

impl TextWrap {
    /// Whether line breaks depend on the whole block of text, so that
    /// measuring a prefix does not predict where the prefix would break.
    #[must_use]
    pub const fn is_whole_block(self) -> bool {
        matches!(self, Self::Balance | Self::Pretty)
    }
}

/// The per-element facts pagination decisions are based on.
///
/// Lengths are in CSS pixels. Block-axis edges are physical top/bottom:
/// vertical writing modes are not supported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StyleFacts {
    /// [§ 3 'position'](https://www.w3.org/TR/css-position-3/#position-property)
    pub position: Position,
    /// [§ 2 'display'](https://www.w3.org/TR/css-display-3/#the-display-properties)
    pub display: Display,
    /// [§ 9.5.1 'float'](https://www.w3.org/TR/CSS2/visuren.html#float-position)
    pub float: Float,
    /// [§ 3.1 'break-before'](https://www.w3.org/TR/css-break-3/#break-between)
    pub break_before: Break,
    /// [§ 3.1 'break-after'](https://www.w3.org/TR/css-break-3/#break-between)
    pub break_after: Break,
    /// [§ 3.2 'break-inside'](https://www.w3.org/TR/css-break-3/#break-within)
    pub break_inside: Break,
    /// [§ 4.4 'box-sizing'](https://www.w3.org/TR/css-sizing-3/#box-sizing)
    pub box_sizing: BoxSizing,
    /// `padding-block-start`
    pub padding_block_start: f32,
    /// `padding-block-end`
    pub padding_block_end: f32,
    /// `border-block-start-width`
    pub border_block_start: f32,
    /// `border-block-end-width`
    pub border_block_end: f32,
    /// `margin-block-start`; `auto` resolves to zero.
    pub margin_block_start: f32,
    /// `margin-block-end`; `auto` resolves to zero.
    pub margin_block_end: f32,
    /// `height`, if not `auto`.
    pub height: Option<f32>,
    /// `min-height`
    pub min_height: f32,
    /// Used line height. Inherited.
    pub line_height: f32,
    /// [§ 4.2 'orphans'](https://www.w3.org/TR/css-break-3/#widows-orphans)
    /// "The minimum number of line boxes that must be left in a fragment
    /// before a fragmentation break." Inherited.
    pub orphans: u32,
    /// [§ 4.2 'widows'](https://www.w3.org/TR/css-break-3/#widows-orphans)
    /// "The minimum number of line boxes that must be left in a fragment
    /// after a fragmentation break." Inherited.
    pub widows: u32,
    /// [§ 5.1 'text-wrap'](https://www.w3.org/TR/css-text-4/#text-wrap). Inherited.
    pub text_wrap: TextWrap,
}

impl Default for StyleFacts {
    fn default() -> Self {
        Self {
            position: Position::Static,
            display: Display::Block,
            float: Float::None,
            break_before: Break::Auto,
            break_after: Break::Auto,
            break_inside: Break::Auto,
            box_sizing: BoxSizing::ContentBox,
            padding_block_start: 0.0,
            padding_block_end: 0.0,
            border_block_start: 0.0,
            border_block_end: 0.0,
            margin_block_start: 0.0,
            margin_block_end: 0.0,
            height: None,
            min_height: 0.0,
            line_height: DEFAULT_LINE_HEIGHT_PX,
            orphans: 2,
            widows: 2,
            text_wrap: TextWrap::Wrap,
        }
    }
}

impl StyleFacts {
    /// Initial values for a child of an element with `parent` facts:
    /// inherited properties come from the parent, the rest reset.
    #[must_use]
    pub fn inherit(parent: &Self) -> Self {
        Self {
            line_height: parent.line_height,
            orphans: parent.orphans,
            widows: parent.widows,
            text_wrap: parent.text_wrap,
            ..Self::default()
        }
    }

    /// Sum of block-start and block-end padding.
    #[must_use]
    pub fn padding_block(&self) -> f32 {
        self.padding_block_start + self.padding_block_end
    }

    /// Sum of block-start and block-end border widths.
    #[must_use]
    pub fn border_block(&self) -> f32 {
        self.border_block_start + self.border_block_end
    }

    /// Sum of block-start and block-end margins.
    #[must_use]
    pub fn margin_block(&self) -> f32 {
        self.margin_block_start + self.margin_block_end
    }

    /// The content-box height available inside a box of `outer` border-box
    /// height.
    ///
    /// Only `border-box` sizing gives up space to padding and borders; a
    /// `content-box` size already describes the content.
    #[must_use]
    pub fn inner_height(&self, outer: f32) -> f32 {
        match self.box_sizing {
            BoxSizing::BorderBox => (outer - self.padding_block() - self.border_block()).max(0.0),
            BoxSizing::ContentBox => outer,
        }
    }

    /// Inverse of [`StyleFacts::inner_height`].
    #[must_use]
    pub fn outer_height(&self, inner: f32) -> f32 {
        match self.box_sizing {
            BoxSizing::BorderBox => inner,
            BoxSizing::ContentBox => inner + self.padding_block() + self.border_block(),
        }
    }

    /// Whether the box takes part in normal block flow.
    #[must_use]
    pub fn in_flow(&self) -> bool {
        self.display != Display::None
            && !matches!(self.position, Position::Absolute | Position::Fixed)
            && self.float == Float::None
    }
}

/// Source of [`StyleFacts`] for the elements of a tree.
pub trait StyleSource {
    /// Facts for `node`, or `None` if it is not an element.
    fn computed(&self, dom: &DomTree, node: NodeId) -> Option<StyleFacts>;
}

/// [§ 3.2.2 Elements that are not rendered](https://html.spec.whatwg.org/multipage/rendering.html#hidden-elements)
///
/// "The following elements are expected to have display: none."
const HIDDEN_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "datalist", "head", "link", "meta", "noembed", "noframes", "param",
    "rp", "script", "style", "template", "title",
];

const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "cite", "code", "data", "dfn", "em", "i", "kbd", "label",
    "mark", "q", "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u", "var",
];

/// Style facts from `style` attributes over user-agent defaults.
///
/// Only the properties [`StyleFacts`] carries are read; other declarations
/// are skipped. Values that cannot be resolved (percentages, `calc()`,
/// unknown keywords) are reported once through
/// [`warn_once`] and ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineStyles;

impl InlineStyles {
    /// Create the style source.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn defaults(tag: &str, parent: &StyleFacts) -> StyleFacts {
        let mut facts = StyleFacts::inherit(parent);
        if HIDDEN_ELEMENTS.contains(&tag) {
            facts.display = Display::None;
        } else if INLINE_ELEMENTS.contains(&tag) {
            facts.display = Display::Inline;
        } else if tag == "li" {
            facts.display = Display::ListItem;
        }
        // [§ 15.3.3 Flow content](https://html.spec.whatwg.org/multipage/rendering.html#flow-content-3)
        // "pre, listing, xmp, plaintext { white-space: pre; }"
        if matches!(tag, "pre" | "listing" | "xmp" | "plaintext") {
            facts.text_wrap = TextWrap::Nowrap;
        }
        facts
    }
}

impl StyleSource for InlineStyles {
    fn computed(&self, dom: &DomTree, node: NodeId) -> Option<StyleFacts> {
        let element = dom.as_element(node)?;
        let parent = dom
            .parent(node)
            .and_then(|p| self.computed(dom, p))
            .unwrap_or_default();

        let mut facts = Self::defaults(&element.tag_name, &parent);
        // [§ 6.1 The hidden attribute](https://html.spec.whatwg.org/multipage/interaction.html#the-hidden-attribute)
        if element.attrs.contains_key("hidden") {
            facts.display = Display::None;
        }
        if let Some(style) = element.attrs.get("style") {
            apply_declarations(&mut facts, style);
        }
        Some(facts)
    }
}

/// Legacy `page-break-*` values apply only where `break-*` stays `auto`.
///
/// [§ 3.4 Page Break Aliases](https://www.w3.org/TR/css-break-3/#page-break-properties)
#[derive(Default)]
struct LegacyBreaks {
    before: Option<Break>,
    after: Option<Break>,
    inside: Option<Break>,
}

fn apply_declarations(facts: &mut StyleFacts, style: &str) {
    let mut legacy = LegacyBreaks::default();

    for declaration in style.split(';') {
        let Some((property, value)) = declaration.split_once(':') else {
            continue;
        };
        let property = property.trim().to_ascii_lowercase();
        let value = value.trim();
        let value = value
            .strip_suffix("!important")
            .map_or(value, str::trim_end)
            .to_ascii_lowercase();
        if value.is_empty() {
            continue;
        }
        apply_declaration(facts, &mut legacy, &property, &value);
    }

    for (slot, alias) in [
        (&mut facts.break_before, legacy.before),
        (&mut facts.break_after, legacy.after),
        (&mut facts.break_inside, legacy.inside),
    ] {
        if *slot == Break::Auto {
            if let Some(value) = alias {
                *slot = value;
            }
        }
    }
}

fn apply_declaration(facts: &mut StyleFacts, legacy: &mut LegacyBreaks, property: &str, value: &str) {
    match property {
        "position" => set_keyword(&mut facts.position, property, value),
        "display" => set_keyword(&mut facts.display, property, value),
        "float" => set_keyword(&mut facts.float, property, value),
        "box-sizing" => set_keyword(&mut facts.box_sizing, property, value),
        "break-before" => set_break(&mut facts.break_before, property, value),
        "break-after" => set_break(&mut facts.break_after, property, value),
        "break-inside" => set_break(&mut facts.break_inside, property, value),
        "page-break-before" => legacy.before = parse_break(property, value),
        "page-break-after" => legacy.after = parse_break(property, value),
        "page-break-inside" => legacy.inside = parse_break(property, value),
        "padding-block-start" | "padding-top" => set_length(&mut facts.padding_block_start, property, value),
        "padding-block-end" | "padding-bottom" => set_length(&mut facts.padding_block_end, property, value),
        "padding" | "padding-block" => {
            if let Some((start, end)) = block_edges(property, value) {
                facts.padding_block_start = start;
                facts.padding_block_end = end;
            }
        }
        "margin-block-start" | "margin-top" => set_length(&mut facts.margin_block_start, property, value),
        "margin-block-end" | "margin-bottom" => set_length(&mut facts.margin_block_end, property, value),
        "margin" | "margin-block" => {
            if let Some((start, end)) = block_edges(property, value) {
                facts.margin_block_start = start;
                facts.margin_block_end = end;
            }
        }
        "border-block-start-width" | "border-top-width" => {
            set_length(&mut facts.border_block_start, property, value);
        }
        "border-block-end-width" | "border-bottom-width" => {
            set_length(&mut facts.border_block_end, property, value);
        }
        "border-width" | "border-block-width" => {
            if let Some((start, end)) = block_edges(property, value) {
                facts.border_block_start = start;
                facts.border_block_end = end;
            }
        }
        "border" | "border-block" | "border-top" | "border-bottom" | "border-block-start"
        | "border-block-end" => {
            // Shorthands mix width, style and color in any order.
            let width = value
                .split_whitespace()
                .find_map(parse_length)
                .unwrap_or_else(|| if value == "none" { 0.0 } else { 3.0 });
            if !matches!(property, "border-bottom" | "border-block-end") {
                facts.border_block_start = width;
            }
            if !matches!(property, "border-top" | "border-block-start") {
                facts.border_block_end = width;
            }
        }
        "height" | "block-size" => {
            if value == "auto" {
                facts.height = None;
            } else if let Some(px) = length_or_warn(property, value) {
                facts.height = Some(px);
            }
        }
        "min-height" | "min-block-size" => {
            if value == "auto" {
                facts.min_height = 0.0;
            } else {
                set_length(&mut facts.min_height, property, value);
            }
        }
        "line-height" => {
            if value == "normal" {
                facts.line_height = DEFAULT_LINE_HEIGHT_PX;
            } else if let Ok(factor) = value.parse::<f32>() {
                facts.line_height = factor * DEFAULT_FONT_SIZE_PX;
            } else {
                set_length(&mut facts.line_height, property, value);
            }
        }
        "orphans" => set_count(&mut facts.orphans, property, value),
        "widows" => set_count(&mut facts.widows, property, value),
        "text-wrap" | "text-wrap-mode" | "text-wrap-style" => {
            set_keyword(&mut facts.text_wrap, property, value);
        }
        "white-space" => match value {
            "pre" | "nowrap" | "pre-line" => facts.text_wrap = TextWrap::Nowrap,
            "normal" | "pre-wrap" | "break-spaces" => facts.text_wrap = TextWrap::Wrap,
            _ => unsupported(property, value),
        },
        _ => {}
    }
}

fn unsupported(property: &str, value: &str) {
    let _ = warn_once("Style", &format!("unsupported value '{value}' for '{property}'"));
}

fn set_keyword<T: FromStr>(slot: &mut T, property: &str, value: &str) {
    match value.parse::<T>() {
        Ok(keyword) => *slot = keyword,
        Err(_) => unsupported(property, value),
    }
}

fn parse_break(property: &str, value: &str) -> Option<Break> {
    let parsed = Break::parse(value);
    if parsed.is_none() {
        unsupported(property, value);
    }
    parsed
}

fn set_break(slot: &mut Break, property: &str, value: &str) {
    if let Some(value) = parse_break(property, value) {
        *slot = value;
    }
}

fn set_length(slot: &mut f32, property: &str, value: &str) {
    if let Some(px) = length_or_warn(property, value) {
        *slot = px;
    }
}

fn set_count(slot: &mut u32, property: &str, value: &str) {
    match value.parse::<u32>() {
        Ok(count) if count > 0 => *slot = count,
        _ => unsupported(property, value),
    }
}

fn length_or_warn(property: &str, value: &str) -> Option<f32> {
    let px = parse_length(value);
    if px.is_none() {
        unsupported(property, value);
    }
    px
}

/// Block-start and block-end values of a one-to-four value box shorthand
/// (`padding`, `margin`, `border-width`) or a two-value logical one.
fn block_edges(property: &str, value: &str) -> Option<(f32, f32)> {
    let parts: Vec<f32> = value
        .split_whitespace()
        .map(|part| if part == "auto" { Some(0.0) } else { parse_length(part) })
        .collect::<Option<_>>()
        .or_else(|| {
            unsupported(property, value);
            None
        })?;

    let logical = property.ends_with("-block");
    match (parts.as_slice(), logical) {
        ([all], _) => Some((*all, *all)),
        ([start, end], true) => Some((*start, *end)),
        ([vertical, _], false) => Some((*vertical, *vertical)),
        ([top, _, bottom] | [top, _, bottom, _], false) => Some((*top, *bottom)),
        _ => {
            unsupported(property, value);
            None
        }
    }
}

/// [§ 5 Distance Units](https://www.w3.org/TR/css-values-4/#lengths)
///
/// Resolve an absolute or font-relative length to pixels. Percentages and
/// viewport units need a containing block this crate does not model.
#[must_use]
pub fn parse_length(value: &str) -> Option<f32> {
    let value = value.trim();
    if value == "0" {
        return Some(0.0);
    }
    let split = value
        .find(|c: char| c.is_ascii_alphabetic() || c == '%')
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: f32 = number.parse().ok()?;
    let factor = match unit {
        "px" => 1.0,
        // [§ 6.1 Absolute lengths](https://www.w3.org/TR/css-values-4/#absolute-lengths)
        // "1in = 96px", "1pt = 1/72nd of 1in", "1pc = 1/6th of 1in"
        "in" => 96.0,
        "cm" => 96.0 / 2.54,
        "mm" => 96.0 / 25.4,
        "pt" => 96.0 / 72.0,
        "pc" => 16.0,
        // Font-relative units resolve against the default font size.
        "em" | "rem" => DEFAULT_FONT_SIZE_PX,
        "lh" | "rlh" => DEFAULT_LINE_HEIGHT_PX,
        _ => return None,
    };
    Some(number * factor)
}

/// [§ 4.2](https://www.w3.org/TR/css-display-3/#the-display-properties)
///
/// Whether `node` takes space in the block flow of its parent. Comments,
/// whitespace-only text, `display: none`, absolutely or fixed positioned
/// and floated elements do not.
#[must_use]
pub fn affects_layout(dom: &DomTree, node: NodeId, facts: Option<&StyleFacts>) -> bool {
    if let Some(text) = dom.as_text(node) {
        return !text.trim().is_empty();
    }
    dom.as_element(node).is_some() && facts.is_some_and(StyleFacts::in_flow)
}

/// Per-pass memo of [`StyleFacts`].
///
/// Entries are not tied to a tree revision: callers [`StyleCache::forget`]
/// an element after changing its `style` attribute.
#[derive(Debug, Default)]
pub struct StyleCache {
    facts: HashMap<NodeId, Option<StyleFacts>>,
}

impl StyleCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Facts for `node`, computed on first request.
    pub fn style(&mut self, source: &dyn StyleSource, dom: &DomTree, node: NodeId) -> Option<StyleFacts> {
        *self
            .facts
            .entry(node)
            .or_insert_with(|| source.computed(dom, node))
    }

    /// See [`affects_layout`].
    pub fn affects_layout(&mut self, source: &dyn StyleSource, dom: &DomTree, node: NodeId) -> bool {
        let facts = self.style(source, dom, node);
        affects_layout(dom, node, facts.as_ref())
    }

    /// Drop the memoized facts of `node` and its descendants.
    pub fn forget(&mut self, dom: &DomTree, node: NodeId) {
        for id in dom.descendants(node) {
            let _ = self.facts.remove(&id);
        }
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.facts.clear();
    }
}
