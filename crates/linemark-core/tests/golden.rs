use std::fs;
use std::path::Path;

use linemark_core::{Markdown, Options};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Case {
    name: String,
    markdown: String,
    html: String,
    #[serde(default)]
    options: Options,
}

#[test]
fn golden_fixtures() -> Result<(), Box<dyn std::error::Error>> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let cases_path = root.join("tests/fixtures/cases.json");

    let cases: Vec<Case> = serde_json::from_str(&fs::read_to_string(&cases_path)?)?;
    assert!(!cases.is_empty(), "no fixtures found in {:?}", cases_path);

    let mut failures = Vec::new();
    for case in &cases {
        let html = Markdown::with_options(case.options).convert(&case.markdown);
        if html != case.html {
            failures.push(format!(
                "{}\n  markdown: {:?}\n  expected: {:?}\n  actual:   {:?}",
                case.name, case.markdown, case.html, html
            ));
        }
    }

    if !failures.is_empty() {
        panic!(
            "{} of {} fixtures failed:\n{}",
            failures.len(),
            cases.len(),
            failures.join("\n")
        );
    }
    Ok(())
}

#[test]
fn fixtures_are_stable_across_calls() -> Result<(), Box<dyn std::error::Error>> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let cases: Vec<Case> =
        serde_json::from_str(&fs::read_to_string(root.join("tests/fixtures/cases.json"))?)?;

    let markdown = Markdown::new();
    let first: Vec<String> = cases.iter().map(|case| markdown.convert(&case.markdown)).collect();
    let second: Vec<String> = cases.iter().map(|case| markdown.convert(&case.markdown)).collect();
    assert_eq!(first, second);
    Ok(())
}
