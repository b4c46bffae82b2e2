//! Python grammar
//!
//! `async def` is a `function_definition` with an anonymous `async` child,
//! and methods are plain `function_definition`s nested in a class body, so
//! the function set is small. `decorated_definition` is not listed: it wraps
//! a `function_definition` or `class_definition` that is classified itself.

pub const FUNCTION_KINDS: &[&str] = &["function_definition", "lambda"];

pub const CLASS_KINDS: &[&str] = &["class_definition"];

pub const TRY_KINDS: &[&str] = &["try_statement"];

pub fn grammar() -> tree_sitter::Language {
    tree_sitter_python::LANGUAGE.into()
}
