//! CLI argument parsing and command handling

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::ast_query::{AstSearcher, SearchRequest};
use crate::config::load_config;
use crate::error::SearchError;
use crate::models::{Language, SearchMode};
use crate::output;
use crate::parsers::GrammarRegistry;

/// rfx-ast: structural code search over TypeScript, JavaScript and Python
#[derive(Parser, Debug)]
#[command(
    name = "rfx-ast",
    version,
    about = "Structural (AST) pattern search",
    long_about = "Parses source files with Tree-sitter and matches a pattern against every \
                  syntax node.\n\n\
                  Text mode takes keywords:\n  \
                  rfx-ast \"async function\" src/\n  \
                  rfx-ast \"class\" --glob \"**/*.py\"\n\n\
                  Criteria mode takes a JSON object with any of type, async, name, textMatch:\n  \
                  rfx-ast --mode criteria '{\"type\":\"class_declaration\"}'\n  \
                  rfx-ast --mode criteria '{\"name\":\"load\",\"async\":true}'"
)]
pub struct Cli {
    /// Search pattern (keywords, JSON criteria, or plain text)
    #[arg(value_name = "PATTERN", required_unless_present = "languages")]
    pub pattern: Option<String>,

    /// Directory or file to search (defaults to current directory)
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// How to interpret the pattern: text or criteria
    #[arg(short, long, default_value = "text")]
    pub mode: SearchMode,

    /// Only search files whose path (relative to PATH) matches this glob
    /// Example: --glob "src/**/*.ts"
    #[arg(short = 'g', long)]
    pub glob: Option<String>,

    /// Maximum number of matches (default from .reflex/config.toml, else 100)
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Search timeout in seconds, 0 = no timeout (default from config, else 30)
    #[arg(short = 't', long)]
    pub timeout: Option<u64>,

    /// Output format as JSON
    #[arg(long)]
    pub json: bool,

    /// Pretty-print JSON output (only with --json)
    #[arg(long)]
    pub pretty: bool,

    /// Use plain text output (disable colors)
    #[arg(long)]
    pub plain: bool,

    /// List supported languages and file extensions, then exit
    #[arg(long)]
    pub languages: bool,

    /// Enable verbose logging (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let log_level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .init();

        if self.languages {
            print_languages();
            return Ok(());
        }

        let runtime = tokio::runtime::Runtime::new()
            .context("Failed to create async runtime")?;
        runtime.block_on(self.handle_search())
    }

    async fn handle_search(self) -> Result<()> {
        let config_root = if self.path.is_file() {
            self.path.parent().map(PathBuf::from).unwrap_or_default()
        } else {
            self.path.clone()
        };
        let config = load_config(&config_root)?;

        let timeout = match self.timeout {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => config.timeout(),
        };

        let mut request = SearchRequest::new(self.pattern.clone().unwrap_or_default(), self.path.clone())
            .with_mode(self.mode)
            .with_max_results(self.limit.unwrap_or(config.max_results))
            .with_timeout(timeout);
        if let Some(ref glob) = self.glob {
            request = request.with_glob(glob.clone());
        }

        let searcher = AstSearcher::new(Arc::new(GrammarRegistry::new()));

        match searcher.search(&request).await {
            Ok(response) => {
                if self.json {
                    println!("{}", self.render_json(&response)?);
                } else {
                    if response.count == 0 {
                        output::warn(&format!("No matches for '{}'", response.pattern));
                    }
                    output::print_response(&response, self.plain);
                }
                Ok(())
            }
            Err(e) => self.report_failure(e),
        }
    }

    fn render_json<T: serde::Serialize>(&self, value: &T) -> Result<String> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(rendered)
    }

    fn report_failure(&self, error: SearchError) -> Result<()> {
        if self.json {
            println!("{}", self.render_json(&error.to_json())?);
            std::process::exit(1);
        }
        Err(error.into())
    }
}

fn print_languages() {
    for lang in Language::ALL {
        let extensions: Vec<String> = lang
            .supported_extensions()
            .iter()
            .map(|ext| format!(".{}", ext))
            .collect();
        println!("{:<12} {}", lang.to_string(), extensions.join(" "));
    }
}
