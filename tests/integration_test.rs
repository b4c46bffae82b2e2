//! Integration tests against temporary source trees
//!
//! Each test builds its own directory so file counts, sizes and failure
//! cases are fully controlled.


use reflex_ast::{AstSearcher, GrammarRegistry, Language, SearchError, SearchMode, SearchRequest};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use test_helpers::*;

fn searcher() -> AstSearcher {
    AstSearcher::new(Arc::new(GrammarRegistry::new()))
}

// ==================== Languages ====================

#[tokio::test]
async fn test_one_function_per_language() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "a.ts", "function a(x: number): number { return x; }\n");
    write_file(
        temp.path(),
        "b.tsx",
        "function b() { return <div className=\"b\">b</div>; }\n",
    );
    write_file(temp.path(), "c.js", "function c() { return 1; }\n");
    write_file(temp.path(), "d.py", "def d():\n    return 1\n");

    let response = search(&SearchRequest::new("function", temp.path())).await;

    let found: Vec<(&str, &str)> = response
        .matches
        .iter()
        .map(|m| (m.file.as_str(), m.node_type.as_str()))
        .collect();
    assert_eq!(
        found,
        vec![
            ("a.ts", "function_declaration"),
            ("b.tsx", "function_declaration"),
            ("c.js", "function_declaration"),
            ("d.py", "function_definition"),
        ]
    );
    assert!(response.matches.iter().all(|m| m.line == 1 && m.column == 0));
}

#[tokio::test]
async fn test_unsupported_files_are_ignored() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "main.rs", "fn main() {}\n");
    write_file(temp.path(), "notes.txt", "function class try import export\n");
    write_file(temp.path(), "lib.py", "class Lib:\n    pass\n");

    let response = search(&SearchRequest::new("class", temp.path())).await;
    assert_match_count(&response, 1);
    assert_eq!(response.matches[0].file, "lib.py");
}

#[tokio::test]
async fn test_nested_paths_are_relative_with_forward_slashes() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "src/app/deep/mod.ts", "export class Deep {}\n");

    let response = search(&SearchRequest::new("class", temp.path())).await;
    assert_match_count(&response, 1);
    assert_eq!(response.matches[0].file, "src/app/deep/mod.ts");
    assert_eq!(response.matches[0].column, 7);
}

#[tokio::test]
async fn test_single_file_root() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "only.js", "class Only {}\nfunction f() {}\n");
    write_file(temp.path(), "other.js", "class Other {}\n");

    let response = search(&SearchRequest::new("class", temp.path().join("only.js"))).await;
    assert_match_count(&response, 1);
    assert_eq!(response.matches[0].file, "only.js");
}

// ==================== Async ====================

#[tokio::test]
async fn test_async_versus_sync() {
    let temp = TempDir::new().unwrap();
    write_file(
        temp.path(),
        "api.ts",
        "async function fetchUser() { return 1; }\nfunction parseUser() { return 2; }\n",
    );

    let response = search(&SearchRequest::new("async function", temp.path())).await;
    assert_match_count(&response, 1);
    assert!(response.matches[0].text.starts_with("async function fetchUser"));

    let response = search(&SearchRequest::new("function", temp.path())).await;
    assert_match_count(&response, 2);
}

#[tokio::test]
async fn test_async_heuristic_accepts_async_prefixed_names() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "h.js", "const wrap = asyncHandler => asyncHandler;\n");

    // The modifier check looks at the first characters of the node text
    let response = search(&SearchRequest::new("async", temp.path())).await;
    assert_match_count(&response, 1);
    assert_eq!(response.matches[0].node_type, "arrow_function");
}

// ==================== Criteria ====================

#[tokio::test]
async fn test_criteria_type_counts_classes() {
    let temp = TempDir::new().unwrap();
    write_file(
        temp.path(),
        "shapes.ts",
        "class Circle {}\nclass Square {}\nexport class Triangle {}\ninterface Shape {}\n",
    );

    let request = SearchRequest::new(r#"{"type":"class_declaration"}"#, temp.path())
        .with_mode(SearchMode::Criteria);
    let response = search(&request).await;

    assert_match_count(&response, 3);
    let lines: Vec<usize> = response.matches.iter().map(|m| m.line).collect();
    assert_eq!(lines, vec![1, 2, 3]);
}

// ==================== Text Truncation ====================

#[tokio::test]
async fn test_long_match_text_is_truncated() {
    let temp = TempDir::new().unwrap();
    let long = "a".repeat(600);
    write_file(temp.path(), "long.js", format!("const s = \"{}\";\n", long));

    let request = SearchRequest::new(r#"{"type":"string"}"#, temp.path()).with_mode(SearchMode::Criteria);
    let response = search(&request).await;

    assert_match_count(&response, 1);
    let text = &response.matches[0].text;
    assert_eq!(text.chars().count(), 503);
    assert!(text.ends_with("..."));
    assert!(text.starts_with("\"aaa"));
}

#[tokio::test]
async fn test_text_at_limit_is_not_truncated() {
    let temp = TempDir::new().unwrap();
    // 498 characters plus the two quotes
    let exact = "b".repeat(498);
    write_file(temp.path(), "exact.js", format!("const s = \"{}\";\n", exact));

    let request = SearchRequest::new(r#"{"type":"string"}"#, temp.path()).with_mode(SearchMode::Criteria);
    let response = search(&request).await;

    assert_match_count(&response, 1);
    assert_eq!(response.matches[0].text, format!("\"{}\"", exact));
}

// ==================== Result Cap ====================

#[tokio::test]
async fn test_max_results_caps_single_file() {
    let temp = TempDir::new().unwrap();
    let source: String = (0..20).map(|i| format!("function f{}() {{}}\n", i)).collect();
    write_file(temp.path(), "many.js", source);

    let request = SearchRequest::new("function", temp.path()).with_max_results(5);
    let response = search(&request).await;

    assert_match_count(&response, 5);
    let names: Vec<&str> = response.matches.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(names[0], "function f0() {}");
    assert_eq!(names[4], "function f4() {}");
}

#[tokio::test]
async fn test_max_results_across_many_files() {
    let temp = TempDir::new().unwrap();
    for i in 0..25 {
        write_file(
            temp.path(),
            &format!("file{:02}.py", i),
            "def first():\n    pass\n\ndef second():\n    pass\n",
        );
    }

    let request = SearchRequest::new("def", temp.path()).with_max_results(12);
    let response = search(&request).await;

    assert_match_count(&response, 12);
    assert_eq!(response.matches[0].file, "file00.py");
    assert_eq!(response.matches[11].file, "file05.py");
    assert_eq!(response.matches[11].line, 4);
}

#[tokio::test]
async fn test_cap_reached_stops_before_later_batches() {
    let temp = TempDir::new().unwrap();
    for i in 0..10 {
        write_file(temp.path(), &format!("a{}.js", i), "function handler() {}\n");
    }
    write_file(temp.path(), "z.py", "def later():\n    pass\n");

    // Loading Python would fail the whole search, so it must never be needed
    let registry = GrammarRegistry::with_loader(|lang| match lang {
        Language::Python => anyhow::bail!("python grammar unavailable"),
        other => reflex_ast::parsers::builtin_grammar(other),
    });
    let searcher = AstSearcher::new(Arc::new(registry));

    let request = SearchRequest::new("function", temp.path()).with_max_results(3);
    let response = searcher.search(&request).await.unwrap();

    assert_match_count(&response, 3);
    assert!(response.matches.iter().all(|m| m.file.ends_with(".js")));
    assert!(!searcher.registry().is_loaded(Language::Python));
}

// ==================== Fault Isolation ====================

#[tokio::test]
async fn test_unreadable_file_is_skipped() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "a_good.py", "def good():\n    pass\n");
    write_file(temp.path(), "b_bad.py", [0x64u8, 0x65, 0x66, 0x20, 0xff, 0xfe, 0x0a]);
    write_file(temp.path(), "c_good.py", "def also_good():\n    pass\n");

    let response = search(&SearchRequest::new("function", temp.path())).await;

    let files: Vec<&str> = response.matches.iter().map(|m| m.file.as_str()).collect();
    assert_eq!(files, vec!["a_good.py", "c_good.py"]);
}

#[tokio::test]
async fn test_syntax_errors_still_produce_matches() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "broken.ts", "function ok() {}\nclass {{{ \n");

    let response = search(&SearchRequest::new("function", temp.path())).await;
    assert!(response.matches.iter().any(|m| m.text.starts_with("function ok()")));
}

#[tokio::test]
async fn test_oversized_files_are_skipped() {
    let temp = TempDir::new().unwrap();
    let mut big = String::from("function big() {}\n");
    big.push_str(&"// padding\n".repeat(100_000));
    write_file(temp.path(), "big.js", big);
    write_file(temp.path(), "small.js", "function small() {}\n");

    let response = search(&SearchRequest::new("function", temp.path())).await;
    assert_match_count(&response, 1);
    assert_eq!(response.matches[0].file, "small.js");
}

// ==================== Filtering ====================

#[tokio::test]
async fn test_glob_filter() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "src/a.ts", "class A {}\n");
    write_file(temp.path(), "src/b.py", "class B:\n    pass\n");
    write_file(temp.path(), "test/c.ts", "class C {}\n");

    let request = SearchRequest::new("class", temp.path()).with_glob("src/**/*.ts");
    let response = search(&request).await;

    assert_match_count(&response, 1);
    assert_eq!(response.matches[0].file, "src/a.ts");
}

#[tokio::test]
async fn test_excluded_and_hidden_directories_are_pruned() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "node_modules/pkg/index.js", "class Dep {}\n");
    write_file(temp.path(), "dist/bundle.js", "class Bundle {}\n");
    write_file(temp.path(), "venv/lib/site.py", "class Site:\n    pass\n");
    write_file(temp.path(), ".git/hooks/hook.py", "class Hook:\n    pass\n");
    write_file(temp.path(), "app.js", "class App {}\n");

    let response = search(&SearchRequest::new("class", temp.path())).await;
    assert_match_count(&response, 1);
    assert_eq!(response.matches[0].file, "app.js");
}

// ==================== Determinism ====================

#[tokio::test]
async fn test_identical_requests_identical_results() {
    let temp = TempDir::new().unwrap();
    for i in 0..15 {
        write_file(
            temp.path(),
            &format!("m{}/mod.ts", i),
            "export class Store { get() { return 1; } }\n",
        );
    }

    let searcher = searcher();
    let request = SearchRequest::new("class", temp.path()).with_max_results(1000);
    let first = searcher.search(&request).await.unwrap();
    let second = searcher.search(&request).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.count, 15);
}

// ==================== Failures ====================

#[tokio::test]
async fn test_zero_timeout_fails_large_search() {
    let temp = TempDir::new().unwrap();
    for i in 0..200 {
        write_file(temp.path(), &format!("pkg{}/f.js", i), "function f() {}\n");
    }

    let request = SearchRequest::new("function", temp.path()).with_timeout(Some(Duration::ZERO));
    let err = searcher().search(&request).await.unwrap_err();

    assert!(matches!(err, SearchError::Timeout { .. }));
    assert_eq!(err.to_json()["error"]["type"], "timeout");
}

#[tokio::test]
async fn test_missing_root_is_execution_error() {
    let temp = TempDir::new().unwrap();
    let request = SearchRequest::new("class", temp.path().join("does-not-exist"));

    let err = searcher().search(&request).await.unwrap_err();
    assert_eq!(err.kind(), "execution_error");
    assert!(err.to_string().contains("does-not-exist"));
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let temp = TempDir::new().unwrap();
    let searcher = searcher();

    let empty = SearchRequest::new("   ", temp.path());
    assert_eq!(searcher.search(&empty).await.unwrap_err().kind(), "invalid_input");

    let zero = SearchRequest::new("class", temp.path()).with_max_results(0);
    assert_eq!(searcher.search(&zero).await.unwrap_err().kind(), "invalid_input");

    let bad_glob = SearchRequest::new("class", temp.path()).with_glob("src/[a");
    assert_eq!(searcher.search(&bad_glob).await.unwrap_err().kind(), "invalid_input");
}

#[tokio::test]
async fn test_grammars_load_lazily() {
    let temp = TempDir::new().unwrap();
    write_file(temp.path(), "only.py", "def f():\n    pass\n");

    let searcher = searcher();
    searcher.search(&SearchRequest::new("function", temp.path())).await.unwrap();

    assert!(searcher.registry().is_loaded(Language::Python));
    assert!(!searcher.registry().is_loaded(Language::TypeScript));
}
