//! TypeScript and TSX grammars
//!
//! tree-sitter-typescript ships two grammars: plain TypeScript, and TSX which
//! additionally accepts JSX. Both produce the same node types for the
//! constructs classified here, so they share one vocabulary.

use crate::models::Language;

/// Functions, function expressions, arrows, methods, generators and
/// ambient `declare function` signatures
pub const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "function_expression",
    "arrow_function",
    "method_definition",
    "generator_function_declaration",
    "generator_function",
    "function_signature",
];

pub const CLASS_KINDS: &[&str] = &[
    "class_declaration",
    "abstract_class_declaration",
    "class",
];

pub const TRY_KINDS: &[&str] = &["try_statement"];

/// Load the compiled grammar for TypeScript or TSX
pub fn grammar(language: Language) -> anyhow::Result<tree_sitter::Language> {
    let language_fn = match language {
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT,
        Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX,
        _ => anyhow::bail!("{} is not a TypeScript dialect", language),
    };

    Ok(language_fn.into())
}
