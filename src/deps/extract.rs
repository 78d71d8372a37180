//! Requirement extraction from JavaScript source text

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

/// Finds the external packages a source file depends on.
///
/// Implementations return normalized package names (`lodash/fp` → `lodash`)
/// and exclude relative paths, scoped packages and Node builtins.
pub trait RequirementExtractor: Send + Sync {
    fn extract(&self, source: &str) -> BTreeSet<String>;
}

/// Regex heuristic over comment-stripped text.
///
/// Recognizes `require('x')`, `import ... from 'x'`, `export ... from 'x'`,
/// bare `import 'x'` and dynamic `import('x')` with literal arguments.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexExtractor;

const NODE_BUILTINS: &[&str] = &[
    "assert", "async_hooks", "buffer", "child_process", "cluster", "console", "constants",
    "crypto", "dgram", "diagnostics_channel", "dns", "domain", "events", "fs", "http", "http2",
    "https", "inspector", "module", "net", "os", "path", "perf_hooks", "process", "punycode",
    "querystring", "readline", "repl", "stream", "string_decoder", "sys", "timers", "tls",
    "trace_events", "tty", "url", "util", "v8", "vm", "wasi", "worker_threads", "zlib",
];

fn require_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\brequire\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap())
}

fn import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\b(?:import|export)\s[^;'"]*?\bfrom\s*['"]([^'"]+)['"]|\bimport\s*\(?\s*['"]([^'"]+)['"]"#)
            .unwrap()
    })
}

impl RequirementExtractor for RegexExtractor {
    fn extract(&self, source: &str) -> BTreeSet<String> {
        let code = strip_comments(source);
        let specifiers = require_regex()
            .captures_iter(&code)
            .filter_map(|c| c.get(1))
            .chain(
                import_regex()
                    .captures_iter(&code)
                    .filter_map(|c| c.get(1).or_else(|| c.get(2))),
            )
            .map(|m| m.as_str());

        specifiers.filter_map(package_name).collect()
    }
}

/// Package an import specifier belongs to, or `None` if it is not an
/// external dependency.
pub fn package_name(specifier: &str) -> Option<String> {
    let spec = specifier.trim();
    if spec.is_empty() || spec.starts_with('.') || spec.starts_with('/') {
        return None;
    }
    // scoped packages are treated as internal
    if spec.starts_with('@') || spec.starts_with("node:") {
        return None;
    }
    let name = spec.split('/').next().unwrap_or(spec);
    if NODE_BUILTINS.contains(&name) {
        return None;
    }
    Some(name.to_string())
}

/// Remove `//` and `/* */` comments, leaving string and template literals intact.
///
/// Newlines inside block comments are kept so line structure survives.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match (c, chars.peek()) {
            ('/', Some('/')) => {
                while let Some(&n) = chars.peek() {
                    if n == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    if n == '\n' {
                        out.push('\n');
                    }
                    prev = n;
                }
            }
            ('\'' | '"' | '`', _) => {
                quote = Some(c);
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(src: &str) -> Vec<String> {
        RegexExtractor.extract(src).into_iter().collect()
    }

    #[test]
    fn test_require_and_import() {
        let src = r#"
const express = require('express');
const { Schema } = require("mongoose");
import joi from 'joi';
import { format } from "date-fns";
export { default } from 'lodash/fp';
import 'dotenv/config';
const lazy = await import('chalk');
"#;
        assert_eq!(
            extract(src),
            vec!["chalk", "date-fns", "dotenv", "express", "joi", "lodash", "mongoose"]
        );
    }

    #[test]
    fn test_commented_requires_ignored() {
        assert!(extract("// require('left-pad')\n").is_empty());
        assert!(extract("/* const x = require('left-pad');\n import y from 'y'; */").is_empty());
        assert_eq!(extract("require('a'); // require('b')"), vec!["a"]);
    }

    #[test]
    fn test_urls_in_strings_survive() {
        let src = "const url = 'http://example.com'; const axios = require('axios');";
        assert_eq!(extract(src), vec!["axios"]);
    }

    #[test]
    fn test_filters() {
        let src = r#"
require('./local');
require('../up');
require('/abs/path');
require('@scope/pkg');
require('fs');
require('fs/promises');
require('node:path');
require('morgan');
"#;
        assert_eq!(extract(src), vec!["morgan"]);
    }

    #[test]
    fn test_package_name() {
        assert_eq!(package_name("lodash/fp").as_deref(), Some("lodash"));
        assert_eq!(package_name("express").as_deref(), Some("express"));
        assert_eq!(package_name("@babel/core"), None);
        assert_eq!(package_name("crypto"), None);
    }
}
