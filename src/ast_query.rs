//! Structural search over syntax trees
//!
//! This module ties the pieces together: it discovers candidate files,
//! parses each with the parser for its language, walks the tree in pre-order
//! applying a compiled [`Pattern`] at every named node, and collects matches
//! with their enclosing function or class.
//!
//! ## Execution model
//!
//! 1. Discovery: concurrent directory walk, pruned and filtered up front
//! 2. Candidates are processed in batches of [`BATCH_SIZE`]; files within a
//!    batch are read and parsed concurrently (parsing runs on the blocking
//!    pool so it never stalls the runtime)
//! 3. Each batch is merged back in discovery order, and processing stops as
//!    soon as `max_results` matches have been collected
//!
//! A read or parse failure costs only that file's matches. A grammar that
//! cannot be loaded, or a search that outlives its timeout, fails the whole
//! search and no partial results are returned.
//!
//! ## Example Usage
//!
//! ```no_run
//! use reflex_ast::{AstSearcher, GrammarRegistry, SearchMode, SearchRequest};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), reflex_ast::SearchError> {
//! let searcher = AstSearcher::new(Arc::new(GrammarRegistry::new()));
//! let request = SearchRequest::new("async function", ".")
//!     .with_mode(SearchMode::Text)
//!     .with_glob("src/**/*.ts");
//!
//! let response = searcher.search(&request).await?;
//! for m in &response.matches {
//!     println!("{}:{} {}", m.file, m.line, m.node_type);
//! }
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use futures::future::join_all;
use globset::Glob;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tree_sitter::Node;

use crate::discovery::{discover_files, Candidate};
use crate::error::SearchError;
use crate::models::{ConstructKind, Match, SearchMode, SearchResponse};
use crate::parsers::{classify, GrammarRegistry, LoadedGrammar};
use crate::pattern::{node_name, node_text, Pattern, SourceFile};

/// Files parsed concurrently per batch
pub const BATCH_SIZE: usize = 10;

/// Longest match text reported, in characters
pub const MAX_MATCH_TEXT: usize = 500;

/// Appended to match text that was cut at [`MAX_MATCH_TEXT`]
pub const TRUNCATION_MARKER: &str = "...";

/// Name reported for an enclosing function or class that has none
const ANONYMOUS: &str = "<anonymous>";

/// Parameters of one structural search
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub pattern: String,
    pub mode: SearchMode,
    /// Directory (or single file) to search
    pub path: PathBuf,
    /// Glob over paths relative to `path`
    pub glob: Option<String>,
    /// Hard cap on returned matches
    pub max_results: usize,
    /// Deadline for the whole search (None = no timeout)
    pub timeout: Option<Duration>,
}

impl SearchRequest {
    pub fn new(pattern: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            pattern: pattern.into(),
            mode: SearchMode::Text,
            path: path.into(),
            glob: None,
            max_results: 100,
            timeout: Some(Duration::from_secs(30)),
        }
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_glob(mut self, glob: impl Into<String>) -> Self {
        self.glob = Some(glob.into());
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Executes structural searches against a shared grammar registry
///
/// The registry is the only state shared between searches; every search owns
/// its own candidate list, trees and match accumulator.
#[derive(Clone)]
pub struct AstSearcher {
    registry: Arc<GrammarRegistry>,
}

impl AstSearcher {
    pub fn new(registry: Arc<GrammarRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &GrammarRegistry {
        &self.registry
    }

    /// Run a search, enforcing the request's timeout
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        validate(request)?;

        log::info!(
            "AST search: pattern='{}', mode={}, path={}, glob={:?}, max_results={}",
            request.pattern,
            request.mode,
            request.path.display(),
            request.glob,
            request.max_results
        );

        let start = Instant::now();
        let outcome = match request.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.execute(request)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let elapsed_ms = start.elapsed().as_millis() as u64;
                    log::warn!("AST search timed out after {}ms", elapsed_ms);
                    return Err(SearchError::Timeout { elapsed_ms });
                }
            },
            None => self.execute(request).await,
        };

        if let Ok(ref response) = outcome {
            log::info!("AST search found {} matches in {:?}", response.count, start.elapsed());
        }
        outcome
    }

    async fn execute(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError> {
        let pattern = Arc::new(Pattern::compile(&request.pattern, request.mode));
        log::debug!("Compiled {} pattern: {:?}", pattern.shape(), pattern);

        let glob = match request.glob {
            Some(ref glob) => Some(
                Glob::new(glob)
                    .map_err(|e| SearchError::invalid_input(format!("invalid glob '{}': {}", glob, e)))?
                    .compile_matcher(),
            ),
            None => None,
        };

        let candidates = discover_files(&request.path, glob)
            .await
            .map_err(|e| SearchError::execution(format!("{:#}", e)))?;

        log::debug!("Searching {} candidate files", candidates.len());

        let mut matches = Vec::new();
        for batch in candidates.chunks(BATCH_SIZE) {
            let per_file = join_all(batch.iter().map(|candidate| self.search_file(candidate, &pattern))).await;

            for file_matches in per_file {
                matches.extend(file_matches?);
            }

            if matches.len() >= request.max_results {
                log::debug!("Reached {} matches, stopping early", request.max_results);
                break;
            }
        }
        matches.truncate(request.max_results);

        Ok(SearchResponse {
            count: matches.len(),
            matches,
            pattern: request.pattern.clone(),
            mode: request.mode,
            path: request.path.display().to_string(),
        })
    }

    /// Matches of one file
    ///
    /// Only a grammar load failure is returned as an error; read and parse
    /// failures are logged and yield no matches.
    async fn search_file(&self, candidate: &Candidate, pattern: &Arc<Pattern>) -> Result<Vec<Match>, SearchError> {
        let grammar = self.registry.parser_for(candidate.language).await?;

        let source = match tokio::fs::read_to_string(&candidate.path).await {
            Ok(s) => s,
            Err(e) => {
                log::warn!("Failed to read {}: {}", candidate.path.display(), e);
                return Ok(Vec::new());
            }
        };

        let pattern = Arc::clone(pattern);
        let relative = candidate.relative.clone();
        let scanned = tokio::task::spawn_blocking(move || scan_source(&grammar, &pattern, &relative, &source)).await?;

        match scanned {
            Ok(matches) => {
                log::trace!("{} matches in {}", matches.len(), candidate.relative);
                Ok(matches)
            }
            Err(e) => {
                log::warn!("Skipping {}: {:#}", candidate.relative, e);
                Ok(Vec::new())
            }
        }
    }
}

fn validate(request: &SearchRequest) -> Result<(), SearchError> {
    if request.pattern.trim().is_empty() {
        return Err(SearchError::invalid_input("pattern must not be empty"));
    }
    if request.path.as_os_str().is_empty() {
        return Err(SearchError::invalid_input("search path must not be empty"));
    }
    if request.max_results == 0 {
        return Err(SearchError::invalid_input("max_results must be at least 1"));
    }
    Ok(())
}

/// Parse one file's source and collect every accepted node
///
/// The tree lives only for the duration of this call.
pub fn scan_source(grammar: &LoadedGrammar, pattern: &Pattern, file: &str, source: &str) -> Result<Vec<Match>> {
    let tree = grammar.parse(source)?;
    let root = tree.root_node();
    let context = SourceFile {
        language: grammar.language(),
        text: source,
    };

    if root.has_error() {
        log::debug!("{} has syntax errors; matching the recovered tree", file);
    }

    let matches = preorder_named(root)
        .into_iter()
        .filter(|node| pattern.matches(node, &context))
        .map(|node| to_match(&node, &context, file))
        .collect::<Vec<_>>();

    Ok(matches)
}

/// All named nodes of a subtree in depth-first pre-order
///
/// Iterative, so deeply nested sources cannot overflow the stack.
pub fn preorder_named(root: Node<'_>) -> Vec<Node<'_>> {
    let mut ordered = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        ordered.push(node);
        for i in (0..node.named_child_count()).rev() {
            if let Some(child) = node.named_child(i) {
                stack.push(child);
            }
        }
    }

    ordered
}

fn to_match(node: &Node, source: &SourceFile, file: &str) -> Match {
    let position = node.start_position();
    let (parent_function, parent_class) = enclosing_scope(node, source);

    Match {
        file: file.to_string(),
        line: position.row + 1,
        column: position.column,
        node_type: node.kind().to_string(),
        text: truncate_text(node_text(node, source.text)),
        parent_function,
        parent_class,
    }
}

/// Name of the nearest function-like or class-like ancestor
///
/// The first one found walking toward the root wins, so a match inside a
/// method reports the method and no class.
fn enclosing_scope(node: &Node, source: &SourceFile) -> (Option<String>, Option<String>) {
    let mut current = node.parent();

    while let Some(ancestor) = current {
        let kind = ancestor.kind();
        if classify(source.language, kind, ConstructKind::Function) {
            return (Some(scope_name(&ancestor, source)), None);
        }
        if classify(source.language, kind, ConstructKind::Class) {
            return (None, Some(scope_name(&ancestor, source)));
        }
        current = ancestor.parent();
    }

    (None, None)
}

fn scope_name(node: &Node, source: &SourceFile) -> String {
    node_name(node, source.text).unwrap_or_else(|| ANONYMOUS.to_string())
}

/// Cut text to [`MAX_MATCH_TEXT`] characters, marking the cut
pub fn truncate_text(text: &str) -> String {
    match text.char_indices().nth(MAX_MATCH_TEXT) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
