//! User-facing output for the `rfx-ast` binary
//!
//! Plain-text rendering of search results plus colored warning/error
//! messages, kept apart from internal logging (timestamps, levels, targets).

use owo_colors::OwoColorize;

use crate::models::{Match, SearchResponse};

/// Display an error message to the user in red with padding
pub fn error(message: &str) {
    eprintln!("\n{}\n", message.red());
}

/// Display a warning message to the user in yellow with padding
pub fn warn(message: &str) {
    eprintln!("\n{}\n", message.yellow());
}

/// Render one match as `file:line:col nodeType [scope]` plus its first line
pub fn format_match(m: &Match, plain: bool) -> String {
    let location = format!("{}:{}:{}", m.file, m.line, m.column);
    let scope = match (&m.parent_function, &m.parent_class) {
        (Some(function), _) => format!(" [in fn {}]", function),
        (None, Some(class)) => format!(" [in class {}]", class),
        (None, None) => String::new(),
    };
    let first_line = m.text.lines().next().unwrap_or("").trim();

    if plain {
        format!("{} {}{}\n    {}", location, m.node_type, scope, first_line)
    } else {
        format!(
            "{} {}{}\n    {}",
            location.cyan(),
            m.node_type.bold(),
            scope.dimmed(),
            first_line
        )
    }
}

/// Print a whole response to stdout
pub fn print_response(response: &SearchResponse, plain: bool) {
    for m in &response.matches {
        println!("{}", format_match(m, plain));
    }

    let summary = format!("{} matches", response.count);
    if plain {
        println!("\n{}", summary);
    } else {
        println!("\n{}", summary.green());
    }
}
