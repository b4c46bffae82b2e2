//! rfx-ast CLI entrypoint

use clap::Parser;

use reflex_ast::cli::Cli;
use reflex_ast::output;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.execute() {
        output::error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }
}
