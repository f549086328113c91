// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Load-test script validation.
//!
//! Submitted k6 scripts must import the framework, declare a default entry
//! point, avoid forbidden modules, and contain no top-level `await`. The
//! scanner is a small brace/string/comment state machine, not a JS parser —
//! the runner is the real arbiter, this catches the obvious rejects early.

/// Module prefixes a script may not import (local process/file access and
/// unreviewed extensions).
pub const FORBIDDEN_IMPORT_PREFIXES: [&str; 3] = ["k6/x/", "k6/experimental/fs", "child_process"];

/// A reason a script was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptIssue {
    MissingFrameworkImport,
    MissingDefaultEntryPoint,
    ForbiddenImport(String),
    TopLevelAwait,
}

impl std::fmt::Display for ScriptIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptIssue::MissingFrameworkImport => {
                f.write_str("script must import the k6 framework")
            }
            ScriptIssue::MissingDefaultEntryPoint => {
                f.write_str("script must declare a default entry point")
            }
            ScriptIssue::ForbiddenImport(module) => {
                write!(f, "forbidden module import: {module}")
            }
            ScriptIssue::TopLevelAwait => f.write_str("top-level await is not allowed"),
        }
    }
}

/// Validate a decoded load-test script. Returns the first issue found.
pub fn validate_load_test_script(script: &str) -> Result<(), ScriptIssue> {
    if !has_k6_import(script) {
        return Err(ScriptIssue::MissingFrameworkImport);
    }
    if let Some(module) = forbidden_import(script) {
        return Err(ScriptIssue::ForbiddenImport(module));
    }
    if !has_default_entry(script) {
        return Err(ScriptIssue::MissingDefaultEntryPoint);
    }
    if has_top_level_await(script) {
        return Err(ScriptIssue::TopLevelAwait);
    }
    Ok(())
}

fn has_k6_import(script: &str) -> bool {
    import_sources(script).iter().any(|s| s == "k6" || s.starts_with("k6/"))
}

fn forbidden_import(script: &str) -> Option<String> {
    import_sources(script)
        .into_iter()
        .find(|source| FORBIDDEN_IMPORT_PREFIXES.iter().any(|p| source.starts_with(p)))
}

fn has_default_entry(script: &str) -> bool {
    script.lines().any(|line| {
        let trimmed = line.trim_start();
        trimmed.starts_with("export default function")
            || trimmed.starts_with("export default async function")
            || trimmed.starts_with("export default (")
            || trimmed.starts_with("export default () =>")
            || trimmed.starts_with("module.exports.default")
    })
}

/// Collect `from '...'` / `from "..."` / `require('...')` sources.
fn import_sources(script: &str) -> Vec<String> {
    let mut sources = Vec::new();
    for line in script.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("//") {
            continue;
        }
        for marker in ["from \"", "from '", "require(\"", "require('"] {
            let mut rest = trimmed;
            while let Some(at) = rest.find(marker) {
                let after = &rest[at + marker.len()..];
                let quote = marker.chars().last().unwrap_or('"');
                if let Some(end) = after.find(quote) {
                    sources.push(after[..end].to_string());
                    rest = &after[end..];
                } else {
                    break;
                }
            }
        }
    }
    sources
}

/// True when `await` appears at brace depth zero, outside strings and
/// comments.
fn has_top_level_await(script: &str) -> bool {
    #[derive(PartialEq)]
    enum Mode {
        Code,
        LineComment,
        BlockComment,
        Str(char),
    }
    let mut mode = Mode::Code;
    let mut depth: i32 = 0;
    let mut prev = '\0';
    let mut word = String::new();
    let mut chars = script.chars().peekable();

    while let Some(c) = chars.next() {
        match mode {
            Mode::LineComment => {
                if c == '\n' {
                    mode = Mode::Code;
                }
            }
            Mode::BlockComment => {
                if prev == '*' && c == '/' {
                    mode = Mode::Code;
                }
            }
            Mode::Str(quote) => {
                if c == quote && prev != '\\' {
                    mode = Mode::Code;
                }
            }
            Mode::Code => match c {
                '/' if chars.peek() == Some(&'/') => mode = Mode::LineComment,
                '/' if chars.peek() == Some(&'*') => mode = Mode::BlockComment,
                '\'' | '"' | '`' => mode = Mode::Str(c),
                '{' => depth += 1,
                '}' => depth -= 1,
                c if c.is_ascii_alphanumeric() || c == '_' || c == '$' => {
                    word.push(c);
                    // Check the completed word at a boundary below.
                    prev = c;
                    continue;
                }
                _ => {}
            },
        }
        if mode == Mode::Code || c == '\n' {
            if depth == 0 && word == "await" {
                return true;
            }
            word.clear();
        }
        prev = c;
    }
    depth == 0 && word == "await"
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
