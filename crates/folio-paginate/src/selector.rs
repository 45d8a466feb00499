//! Simple selector lists for classifying nodes.
//!
//! [Selectors Level 4 § 3.1](https://www.w3.org/TR/selectors-4/#structure)
//!
//! Only compound selectors are supported: a type or `*`, then any number of
//! `.class`, `#id`, `[attr]` and `[attr=value]`. Pagination configuration
//! never needs combinators, so they are rejected rather than half-supported.

use folio_dom::{DomTree, ElementData, NodeId};

use crate::error::PaginateError;

/// [§ 5.1 Attribute presence and value selectors](https://www.w3.org/TR/selectors-4/#attribute-representation)
#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeTest {
    name: String,
    value: Option<String>,
}

/// [§ 3.1 Compound selector](https://www.w3.org/TR/selectors-4/#compound)
///
/// "A compound selector is a sequence of simple selectors that are not
/// separated by a combinator."
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttributeTest>,
}

impl Compound {
    fn matches(&self, element: &ElementData) -> bool {
        if self
            .tag
            .as_ref()
            .is_some_and(|tag| !element.tag_name.eq_ignore_ascii_case(tag))
        {
            return false;
        }
        self.ids.iter().all(|id| element.id() == Some(id))
            && self.classes.iter().all(|c| element.has_class(c))
            && self.attrs.iter().all(|test| {
                element
                    .attrs
                    .get(&test.name)
                    .is_some_and(|v| test.value.as_ref().is_none_or(|want| want == v))
            })
    }
}

/// [§ 3.2 Selector list](https://www.w3.org/TR/selectors-4/#selector-list)
///
/// "A selector list is a comma-separated list of selectors."
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorList {
    source: String,
    compounds: Vec<Compound>,
}

impl SelectorList {
    /// Parse a comma-separated list. An empty string matches nothing.
    ///
    /// # Errors
    ///
    /// Returns [`PaginateError::Selector`] for combinators, pseudo-classes or
    /// malformed attribute tests.
    pub fn parse(source: &str) -> Result<Self, PaginateError> {
        let fail = |reason: &str| PaginateError::Selector {
            selector: source.to_string(),
            reason: reason.to_string(),
        };

        let mut compounds = Vec::new();
        for part in source.split(',') {
            let part = part.trim();
            if part.is_empty() {
                if source.trim().is_empty() {
                    continue;
                }
                return Err(fail("empty selector in list"));
            }
            compounds.push(parse_compound(part).map_err(|reason| fail(&reason))?);
        }

        Ok(Self {
            source: source.to_string(),
            compounds,
        })
    }

    /// The text this list was parsed from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the list has no selectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compounds.is_empty()
    }

    /// Whether `node` is an element matched by any selector in the list.
    #[must_use]
    pub fn matches(&self, dom: &DomTree, node: NodeId) -> bool {
        dom.as_element(node)
            .is_some_and(|element| self.compounds.iter().any(|c| c.matches(element)))
    }
}

fn parse_compound(part: &str) -> Result<Compound, String> {
    let mut compound = Compound::default();
    let mut chars = part.chars().peekable();

    match chars.peek() {
        Some('*') => {
            let _ = chars.next();
        }
        Some(c) if is_ident_char(*c) => compound.tag = Some(read_ident(&mut chars)),
        _ => {}
    }

    while let Some(c) = chars.next() {
        match c {
            '.' => compound.classes.push(non_empty(read_ident(&mut chars), "class")?),
            '#' => compound.ids.push(non_empty(read_ident(&mut chars), "id")?),
            '[' => {
                let name = non_empty(read_ident(&mut chars), "attribute")?.to_ascii_lowercase();
                let value = match chars.next() {
                    Some(']') => None,
                    Some('=') => {
                        let value = read_attr_value(&mut chars)?;
                        if chars.next() != Some(']') {
                            return Err("unterminated attribute selector".to_string());
                        }
                        Some(value)
                    }
                    _ => return Err("unsupported attribute matcher".to_string()),
                };
                compound.attrs.push(AttributeTest { name, value });
            }
            c if c.is_whitespace() || matches!(c, '>' | '+' | '~') => {
                return Err("combinators are not supported".to_string());
            }
            ':' => return Err("pseudo-classes are not supported".to_string()),
            other => return Err(format!("unexpected character {other:?}")),
        }
    }

    Ok(compound)
}

const fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn read_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        let _ = chars.next();
    }
    ident
}

fn read_attr_value(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<String, String> {
    match chars.peek().copied() {
        Some(quote @ ('"' | '\'')) => {
            let _ = chars.next();
            let mut value = String::new();
            for c in chars.by_ref() {
                if c == quote {
                    return Ok(value);
                }
                value.push(c);
            }
            Err("unterminated string in attribute selector".to_string())
        }
        _ => Ok(read_ident(chars)),
    }
}

fn non_empty(ident: String, what: &str) -> Result<String, String> {
    if ident.is_empty() {
        Err(format!("missing {what} name"))
    } else {
        Ok(ident)
    }
}
