//! reflex-ast: structural (AST) pattern search
//!
//! Parses TypeScript, TSX, JavaScript and Python files with Tree-sitter and
//! matches a pattern against every syntax node. Each search is a fresh,
//! stateless pass over the file set; nothing is indexed or cached apart from
//! the compiled grammars.
//!
//! # Architecture
//!
//! - **Grammar registry** ([`parsers`]): extension → language mapping and a
//!   lazily loaded, dedicated parser per language
//! - **Pattern compiler** ([`pattern`]): keywords or JSON criteria → node matcher
//! - **Tree searcher** ([`ast_query`]): discovery, bounded concurrent parsing,
//!   pre-order matching, enclosing-scope context, result cap and timeout
//!
//! # Example Usage
//!
//! ```no_run
//! use reflex_ast::{AstSearcher, GrammarRegistry, SearchMode, SearchRequest};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), reflex_ast::SearchError> {
//! let searcher = AstSearcher::new(Arc::new(GrammarRegistry::new()));
//! let request = SearchRequest::new(r#"{"type":"class_declaration"}"#, "src")
//!     .with_mode(SearchMode::Criteria)
//!     .with_max_results(20);
//!
//! let response = searcher.search(&request).await?;
//! println!("{} classes", response.count);
//! # Ok(())
//! # }
//! ```

pub mod ast_query;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod models;
pub mod output;
pub mod parsers;
pub mod pattern;

// Re-export commonly used types
pub use ast_query::{AstSearcher, SearchRequest};
pub use config::{load_config, AstConfig};
pub use error::SearchError;
pub use models::{ConstructKind, Language, Match, SearchMode, SearchResponse};
pub use parsers::{GrammarRegistry, LoadedGrammar};
pub use pattern::Pattern;
