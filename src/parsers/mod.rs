//! Grammar registry for structural search
//!
//! Maps file extensions to languages and hands out one dedicated Tree-sitter
//! parser per language. Grammars are loaded lazily on first use, and each
//! language is loaded at most once at a time: concurrent callers asking for
//! a language that is still loading wait on the same in-flight load.
//!
//! Each language owns its own `Parser`. A single parser is never switched
//! between grammars, so a parse for one language can never observe another
//! language's grammar halfway through.
//!
//! The construct vocabularies live next to each grammar (see the submodules).
//! Node type names differ between grammars, so the same construct is listed
//! once per grammar; the union across grammars is:
//!
//! | Construct | Node types |
//! |-----------|------------|
//! | function  | `function_declaration`, `function_expression`, `arrow_function`, `method_definition`, `generator_function_declaration`, `generator_function`, `function_signature` (TS/TSX), `function_definition`, `lambda` (Python) |
//! | class     | `class_declaration`, `class`, `abstract_class_declaration` (TS/TSX), `class_definition` (Python) |
//! | try       | `try_statement` |
//! | import    | any node type containing `import` |
//! | export    | any node type containing `export` |

pub mod javascript;
pub mod python;
pub mod typescript;

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tree_sitter::{Parser, Tree};

use crate::error::SearchError;
use crate::models::{ConstructKind, Language};

/// Produces the compiled grammar for a language
pub type GrammarLoader = Arc<dyn Fn(Language) -> Result<tree_sitter::Language> + Send + Sync>;

/// Load one of the grammars compiled into this crate
pub fn builtin_grammar(language: Language) -> Result<tree_sitter::Language> {
    match language {
        Language::TypeScript | Language::Tsx => typescript::grammar(language),
        Language::JavaScript => Ok(javascript::grammar()),
        Language::Python => Ok(python::grammar()),
    }
}

/// Canonical node types of `construct` in the grammar for `language`
///
/// Import and export constructs are recognized by substring instead (see
/// [`classify`]), so they have no list.
pub fn construct_kinds(language: Language, construct: ConstructKind) -> &'static [&'static str] {
    match (language, construct) {
        (Language::TypeScript | Language::Tsx, ConstructKind::Function) => typescript::FUNCTION_KINDS,
        (Language::TypeScript | Language::Tsx, ConstructKind::Class) => typescript::CLASS_KINDS,
        (Language::TypeScript | Language::Tsx, ConstructKind::Try) => typescript::TRY_KINDS,
        (Language::JavaScript, ConstructKind::Function) => javascript::FUNCTION_KINDS,
        (Language::JavaScript, ConstructKind::Class) => javascript::CLASS_KINDS,
        (Language::JavaScript, ConstructKind::Try) => javascript::TRY_KINDS,
        (Language::Python, ConstructKind::Function) => python::FUNCTION_KINDS,
        (Language::Python, ConstructKind::Class) => python::CLASS_KINDS,
        (Language::Python, ConstructKind::Try) => python::TRY_KINDS,
        (_, ConstructKind::Import | ConstructKind::Export) => &[],
    }
}

/// Check whether a node type of `language` belongs to `construct`
pub fn classify(language: Language, node_kind: &str, construct: ConstructKind) -> bool {
    match construct {
        ConstructKind::Import => node_kind.contains("import"),
        ConstructKind::Export => node_kind.contains("export"),
        _ => construct_kinds(language, construct).contains(&node_kind),
    }
}

/// A loaded grammar together with the parser bound to it
///
/// Immutable after construction apart from the parser, which sits behind a
/// lock so two files of the same language are never parsed by it at once.
pub struct LoadedGrammar {
    language: Language,
    grammar: tree_sitter::Language,
    parser: Mutex<Parser>,
}

impl LoadedGrammar {
    fn build(language: Language, grammar: tree_sitter::Language) -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&grammar)
            .with_context(|| format!("Failed to set {} language", language))?;

        let loaded = Self {
            language,
            grammar,
            parser: Mutex::new(parser),
        };
        loaded.check_vocabulary()?;
        Ok(loaded)
    }

    /// Fail if the grammar lacks a node type this language classifies
    fn check_vocabulary(&self) -> Result<()> {
        let constructs = [ConstructKind::Function, ConstructKind::Class, ConstructKind::Try];
        for construct in constructs {
            for kind in construct_kinds(self.language, construct) {
                if !self.has_node_kind(kind) {
                    anyhow::bail!("{} grammar has no '{}' node type", self.language, kind);
                }
            }
        }
        Ok(())
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Whether the grammar defines a named node of this type
    pub fn has_node_kind(&self, kind: &str) -> bool {
        self.grammar.id_for_node_kind(kind, true) != 0
    }

    /// Parse source text into a syntax tree
    ///
    /// Blocks while another file of the same language is being parsed.
    pub fn parse(&self, source: &str) -> Result<Tree> {
        let mut parser = self
            .parser
            .lock()
            .map_err(|_| anyhow::anyhow!("{} parser lock poisoned", self.language))?;

        parser
            .parse(source, None)
            .with_context(|| format!("Failed to parse {} source", self.language))
    }
}

type Slot = Arc<OnceCell<Arc<LoadedGrammar>>>;

/// Lazily populated, per-language cache of grammars and parsers
///
/// Create one per process (or per test) and share it by reference with every
/// searcher. Entries are never evicted. A failed load is not remembered: the
/// next request for that language tries again.
pub struct GrammarRegistry {
    loader: GrammarLoader,
    slots: Mutex<HashMap<Language, Slot>>,
}

impl Default for GrammarRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarRegistry {
    /// Create a registry backed by the grammars compiled into this crate
    pub fn new() -> Self {
        Self::with_loader(builtin_grammar)
    }

    /// Create a registry with a custom grammar source
    pub fn with_loader<F>(loader: F) -> Self
    where
        F: Fn(Language) -> Result<tree_sitter::Language> + Send + Sync + 'static,
    {
        Self {
            loader: Arc::new(loader),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Detect the language of a file from its extension
    pub fn language_for(&self, path: &Path) -> Option<Language> {
        Language::for_path(path)
    }

    /// Whether the grammar for `language` has been loaded successfully
    pub fn is_loaded(&self, language: Language) -> bool {
        self.slots
            .lock()
            .map(|slots| slots.get(&language).is_some_and(|slot| slot.initialized()))
            .unwrap_or(false)
    }

    /// Get the parser for a language, loading its grammar on first use
    pub async fn parser_for(&self, language: Language) -> Result<Arc<LoadedGrammar>, SearchError> {
        let slot = {
            let mut slots = self
                .slots
                .lock()
                .map_err(|_| SearchError::execution("grammar registry lock poisoned"))?;
            Arc::clone(slots.entry(language).or_default())
        };

        let loaded = slot
            .get_or_try_init(|| Self::load(Arc::clone(&self.loader), language))
            .await?;

        Ok(Arc::clone(loaded))
    }

    async fn load(loader: GrammarLoader, language: Language) -> Result<Arc<LoadedGrammar>, SearchError> {
        log::debug!("Loading {} grammar", language);

        let built = tokio::task::spawn_blocking(move || {
            let grammar = loader(language)?;
            LoadedGrammar::build(language, grammar)
        })
        .await?;

        match built {
            Ok(loaded) => {
                log::info!("Loaded {} grammar", language);
                Ok(Arc::new(loaded))
            }
            Err(e) => {
                log::warn!("Failed to load {} grammar: {:#}", language, e);
                Err(SearchError::GrammarLoad {
                    language,
                    reason: format!("{:#}", e),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_classify_per_grammar() {
        assert!(classify(Language::TypeScript, "arrow_function", ConstructKind::Function));
        assert!(classify(Language::Python, "function_definition", ConstructKind::Function));
        assert!(!classify(Language::Python, "arrow_function", ConstructKind::Function));
        assert!(classify(Language::JavaScript, "class", ConstructKind::Class));
        assert!(classify(Language::Python, "class_definition", ConstructKind::Class));
        assert!(classify(Language::Tsx, "try_statement", ConstructKind::Try));
    }

    #[test]
    fn test_classify_import_export_by_substring() {
        assert!(classify(Language::Python, "import_from_statement", ConstructKind::Import));
        assert!(classify(Language::TypeScript, "import_statement", ConstructKind::Import));
        assert!(classify(Language::TypeScript, "export_statement", ConstructKind::Export));
        assert!(!classify(Language::TypeScript, "export_statement", ConstructKind::Import));
    }

    #[test]
    fn test_language_for_path() {
        let registry = GrammarRegistry::new();
        assert_eq!(registry.language_for(Path::new("src/app.mts")), Some(Language::TypeScript));
        assert_eq!(registry.language_for(Path::new("ui/View.TSX")), Some(Language::Tsx));
        assert_eq!(registry.language_for(Path::new("lib/index.cjs")), Some(Language::JavaScript));
        assert_eq!(registry.language_for(Path::new("stubs/os.pyi")), Some(Language::Python));
        assert_eq!(registry.language_for(Path::new("Cargo.toml")), None);
        assert_eq!(registry.language_for(Path::new("Makefile")), None);
    }

    #[tokio::test]
    async fn test_mismatched_grammar_is_rejected() {
        let registry = GrammarRegistry::with_loader(|_| Ok(javascript::grammar()));

        let err = registry.parser_for(Language::Python).await.err().unwrap();
        match err {
            SearchError::GrammarLoad { language, ref reason } => {
                assert_eq!(language, Language::Python);
                assert!(reason.contains("function_definition"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!registry.is_loaded(Language::Python));

        assert!(registry.parser_for(Language::JavaScript).await.is_ok());
    }

    #[tokio::test]
    async fn test_parser_for_is_idempotent() {
        let registry = GrammarRegistry::new();
        assert!(!registry.is_loaded(Language::Python));

        let first = registry.parser_for(Language::Python).await.unwrap();
        let second = registry.parser_for(Language::Python).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.is_loaded(Language::Python));
        assert_eq!(first.language(), Language::Python);
        assert!(first.has_node_kind("function_definition"));
    }

    #[tokio::test]
    async fn test_each_language_gets_its_own_parser() {
        let registry = GrammarRegistry::new();
        let ts = registry.parser_for(Language::TypeScript).await.unwrap();
        let tsx = registry.parser_for(Language::Tsx).await.unwrap();
        let js = registry.parser_for(Language::JavaScript).await.unwrap();

        assert!(!Arc::ptr_eq(&ts, &tsx));
        assert!(!Arc::ptr_eq(&ts, &js));

        let tree = tsx.parse("const el = <div>{x}</div>;").unwrap();
        assert!(!tree.root_node().has_error());

        let tree = ts.parse("function f(a: number): number { return a; }").unwrap();
        assert_eq!(tree.root_node().kind(), "program");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_load() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let registry = Arc::new(GrammarRegistry::with_loader(move |lang| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            builtin_grammar(lang)
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move { registry.parser_for(Language::JavaScript).await })
            })
            .collect();

        let mut parsers = Vec::new();
        for handle in handles {
            parsers.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(parsers.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let registry = GrammarRegistry::with_loader(move |lang| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("grammar artifact missing");
            }
            builtin_grammar(lang)
        });

        let err = registry.parser_for(Language::Python).await.err().unwrap();
        match err {
            SearchError::GrammarLoad { language, ref reason } => {
                assert_eq!(language, Language::Python);
                assert!(reason.contains("grammar artifact missing"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!registry.is_loaded(Language::Python));

        registry.parser_for(Language::Python).await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(registry.is_loaded(Language::Python));
    }
}
