//! JavaScript grammar (including JSX)

pub const FUNCTION_KINDS: &[&str] = &[
    "function_declaration",
    "function_expression",
    "arrow_function",
    "method_definition",
    "generator_function_declaration",
    "generator_function",
];

pub const CLASS_KINDS: &[&str] = &["class_declaration", "class"];

pub const TRY_KINDS: &[&str] = &["try_statement"];

pub fn grammar() -> tree_sitter::Language {
    tree_sitter_javascript::LANGUAGE.into()
}
