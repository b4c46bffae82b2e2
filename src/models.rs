//! Core data models for structural search
//!
//! These structures represent the normalized, deterministic output format
//! that the AST searcher hands to its callers (CLI, RPC handlers, agents).
//! Field names of [`Match`] and [`SearchResponse`] are the wire contract.

use serde::{Deserialize, Serialize};
use std::path::Path;
use strum::{Display, EnumString};

/// Grammar identifier
///
/// TypeScript and TSX are distinct grammars in tree-sitter-typescript, so they
/// are distinct languages here even though they share a construct vocabulary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    TypeScript,
    Tsx,
    JavaScript,
    Python,
}

impl Language {
    /// All supported languages, in the order they are listed to users
    pub const ALL: [Language; 4] = [
        Language::TypeScript,
        Language::Tsx,
        Language::JavaScript,
        Language::Python,
    ];

    /// Map a file extension (without the dot) to a language
    ///
    /// Matching is case-insensitive: `FOO.TS` is TypeScript.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "ts" | "mts" | "cts" => Some(Language::TypeScript),
            "tsx" => Some(Language::Tsx),
            "js" | "mjs" | "cjs" | "jsx" => Some(Language::JavaScript),
            "py" | "pyi" => Some(Language::Python),
            _ => None,
        }
    }

    /// Detect the language of a file from its extension
    pub fn for_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Extensions that map to this language
    pub fn supported_extensions(&self) -> &'static [&'static str] {
        match self {
            Language::TypeScript => &["ts", "mts", "cts"],
            Language::Tsx => &["tsx"],
            Language::JavaScript => &["js", "mjs", "cjs", "jsx"],
            Language::Python => &["py", "pyi"],
        }
    }
}

/// Language-agnostic category a grammar node type can be classified into
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConstructKind {
    Function,
    Class,
    Try,
    Import,
    Export,
}

/// How the pattern text of a search should be interpreted
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SearchMode {
    /// Keywords such as "async function" or "class"
    #[default]
    #[strum(to_string = "text", serialize = "free_text")]
    Text,
    /// A JSON criteria object: `{"type": .., "async": .., "name": .., "textMatch": ..}`
    #[strum(to_string = "criteria", serialize = "json")]
    Criteria,
}

/// One accepted syntax node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Path relative to the search root, `/`-separated
    pub file: String,
    /// Starting line number (1-indexed)
    pub line: usize,
    /// Starting column number (0-indexed)
    pub column: usize,
    /// Grammar node type, e.g. `function_declaration`
    pub node_type: String,
    /// Node source text, truncated to 500 characters
    pub text: String,
    /// Name of the nearest enclosing function-like node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_function: Option<String>,
    /// Name of the nearest enclosing class-like node (only when no function encloses the match)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_class: Option<String>,
}

/// Result of a completed search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResponse {
    /// Number of matches returned (always `matches.len()`)
    pub count: usize,
    pub matches: Vec<Match>,
    /// Pattern text as supplied by the caller
    pub pattern: String,
    pub mode: SearchMode,
    /// Search root as supplied by the caller
    pub path: String,
}
