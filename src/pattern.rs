//! Pattern compilation and node matching
//!
//! A search pattern is compiled once into a [`Pattern`] and then applied to
//! every syntax node of every candidate file. Which of the three shapes a
//! pattern takes is decided here, at compile time, and never re-decided per
//! node:
//!
//! - **Construct**: free-text keywords (`"async function"`, `"class"`,
//!   `"try"`) classified against each grammar's construct vocabulary
//! - **Criteria**: a JSON object `{"type", "async", "name", "textMatch"}`
//!   whose populated fields must all hold
//! - **Text**: plain substring containment, the fallback for both modes

use serde::Deserialize;
use tree_sitter::Node;

use crate::models::{ConstructKind, Language, SearchMode};
use crate::parsers::classify;

/// How many leading characters of a node's text are checked for `async`
const ASYNC_PREFIX_WINDOW: usize = 10;

/// Source text of the file a node belongs to
#[derive(Debug, Clone, Copy)]
pub struct SourceFile<'a> {
    pub language: Language,
    pub text: &'a str,
}

/// Construct flags derived from keywords in free text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstructPattern {
    pub wants_async: bool,
    pub wants_definition: bool,
    pub wants_class: bool,
    pub wants_try_catch: bool,
    pub wants_import: bool,
    pub wants_export: bool,
}

impl ConstructPattern {
    /// Derive flags from keyword presence (case-insensitive)
    pub fn from_keywords(text: &str) -> Self {
        let lower = text.to_lowercase();
        Self {
            wants_async: lower.contains("async"),
            wants_definition: ["function", "def", "method"].iter().any(|k| lower.contains(k)),
            wants_class: lower.contains("class"),
            wants_try_catch: lower.contains("try") || lower.contains("catch"),
            wants_import: lower.contains("import"),
            wants_export: lower.contains("export"),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// `async` on its own stands for "async definition"
    fn async_only(&self) -> bool {
        self.wants_async
            && !(self.wants_definition
                || self.wants_class
                || self.wants_try_catch
                || self.wants_import
                || self.wants_export)
    }

    /// Every requested construct must hold for the node
    ///
    /// `async` modifies only a definition request (explicit, or implied when
    /// `async` is the sole keyword). Next to class, try, import or export it
    /// is ignored.
    pub fn matches(&self, node: &Node, source: &SourceFile) -> bool {
        let kind = node.kind();
        let lang = source.language;
        let wants_function = self.wants_definition || self.async_only();

        let required = [
            (wants_function, ConstructKind::Function),
            (self.wants_class, ConstructKind::Class),
            (self.wants_try_catch, ConstructKind::Try),
            (self.wants_import, ConstructKind::Import),
            (self.wants_export, ConstructKind::Export),
        ];

        for (wanted, construct) in required {
            if wanted && !classify(lang, kind, construct) {
                return false;
            }
        }

        !(wants_function && self.wants_async) || has_async_modifier(node, source.text)
    }
}

/// Explicit field-by-field criteria
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CriteriaPattern {
    #[serde(rename = "type", default)]
    pub node_type: Option<String>,
    #[serde(rename = "async", default)]
    pub is_async: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "textMatch", default)]
    pub text_match: Option<String>,
}

impl CriteriaPattern {
    pub fn is_empty(&self) -> bool {
        self.node_type.is_none()
            && self.is_async.is_none()
            && self.name.is_none()
            && self.text_match.is_none()
    }

    /// Every populated field must hold; with no populated field nothing matches
    pub fn matches(&self, node: &Node, source: &SourceFile) -> bool {
        if self.is_empty() {
            return false;
        }

        if let Some(ref node_type) = self.node_type {
            if node.kind() != node_type.as_str() {
                return false;
            }
        }

        if let Some(is_async) = self.is_async {
            if has_async_modifier(node, source.text) != is_async {
                return false;
            }
        }

        if let Some(ref name) = self.name {
            if node_name(node, source.text).as_deref() != Some(name.as_str()) {
                return false;
            }
        }

        if let Some(ref needle) = self.text_match {
            if !node_text(node, source.text).contains(needle.as_str()) {
                return false;
            }
        }

        true
    }
}

/// A compiled, immutable node matcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Construct(ConstructPattern),
    Criteria(CriteriaPattern),
    /// Substring containment over the node's source text
    Text(String),
}

impl Pattern {
    /// Compile pattern text for the given mode
    ///
    /// Never fails: input that yields neither construct flags nor a criteria
    /// object becomes a text pattern over the raw input.
    pub fn compile(text: &str, mode: SearchMode) -> Self {
        match mode {
            SearchMode::Text => {
                let construct = ConstructPattern::from_keywords(text);
                if construct.is_empty() {
                    log::debug!("No construct keywords in '{}', using text match", text);
                    Pattern::Text(text.to_string())
                } else {
                    Pattern::Construct(construct)
                }
            }
            SearchMode::Criteria => match parse_criteria(text) {
                Ok(criteria) => {
                    if criteria.is_empty() {
                        log::debug!("Criteria '{}' sets no fields and will match nothing", text);
                    }
                    Pattern::Criteria(criteria)
                }
                Err(e) => {
                    log::debug!("Criteria '{}' is not a criteria object ({}), using text match", text, e);
                    Pattern::Text(text.to_string())
                }
            },
        }
    }

    /// Test a single node. Pure: depends only on the node and its source.
    pub fn matches(&self, node: &Node, source: &SourceFile) -> bool {
        match self {
            Pattern::Construct(construct) => construct.matches(node, source),
            Pattern::Criteria(criteria) => criteria.matches(node, source),
            Pattern::Text(needle) => node_text(node, source.text).contains(needle.as_str()),
        }
    }

    /// Short name of the pattern shape, for diagnostics
    pub fn shape(&self) -> &'static str {
        match self {
            Pattern::Construct(_) => "construct",
            Pattern::Criteria(_) => "criteria",
            Pattern::Text(_) => "text",
        }
    }
}

fn parse_criteria(text: &str) -> Result<CriteriaPattern, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(serde::de::Error::custom("expected a JSON object"));
    }
    serde_json::from_value(value)
}

/// Source slice covered by a node
pub fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Name of a node: its `name` field, else its first identifier-typed child
pub fn node_name(node: &Node, source: &str) -> Option<String> {
    let name_node = node.child_by_field_name("name").or_else(|| {
        let mut cursor = node.walk();
        let found = node
            .named_children(&mut cursor)
            .find(|child| child.kind().contains("identifier"));
        found
    })?;

    Some(node_text(&name_node, source).to_string())
}

/// Whether a node carries an `async` modifier
///
/// Checks for a direct `async` child token, then for the literal `async`
/// within the node text's first few characters. The text check is a
/// heuristic: it also fires for a node whose text starts with an identifier
/// such as `asyncHandler`.
pub fn has_async_modifier(node: &Node, source: &str) -> bool {
    let mut cursor = node.walk();
    if node.children(&mut cursor).any(|child| child.kind() == "async") {
        return true;
    }

    let head: String = node_text(node, source)
        .chars()
        .take(ASYNC_PREFIX_WINDOW)
        .collect();
    head.contains("async")
}
