//! Upstream path template compilation.
//!
//! Templates use `{placeholder}` segments (`/orders/{id}`), with a trailing
//! `/{everything}` acting as a catch-all. A template compiles to one anchored
//! regular expression which is then shared (behind an `Arc`) between the
//! route-level matcher and the downstream route definition.
use std::fmt;

use regex::Regex;

/// Placeholder name that matches the remainder of the path, query included.
const CATCH_ALL: &str = "{everything}";

/// A compiled upstream path pattern.
///
/// Holds the original template string, the compiled regex, the matching
/// priority and whether the template constrains the query string.
#[derive(Debug, Clone)]
pub struct UpstreamPathTemplate {
    original: String,
    pattern: Regex,
    priority: i32,
    contains_query_string: bool,
}

impl UpstreamPathTemplate {
    /// Compile a raw template. Infallible: literal segments are regex-escaped,
    /// so any template string yields a valid pattern.
    pub fn compile(template: &str, case_sensitive: bool, priority: i32) -> Self {
        // "/" (or empty) is the lowest-priority catch-all route
        let priority = if template.is_empty() || template == "/" {
            0
        } else {
            priority
        };

        let contains_query_string = template.contains('?');

        let mut pattern = String::from("^");
        if !case_sensitive {
            pattern.insert_str(0, "(?i)");
        }

        let body = if let Some(prefix) = template.strip_suffix(CATCH_ALL) {
            format!("{}.*", escape_literals(prefix))
        } else {
            escape_literals(template)
        };
        pattern.push_str(&body);
        pattern.push('$');

        // escape_literals only emits escaped literals and fixed character
        // classes, so the pattern is always parseable
        let pattern = Regex::new(&pattern).unwrap_or_else(|_| Regex::new("^$").unwrap());

        Self {
            original: template.to_string(),
            pattern,
            priority,
            contains_query_string,
        }
    }

    /// The raw template string as written in configuration.
    pub fn as_str(&self) -> &str {
        &self.original
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn contains_query_string(&self) -> bool {
        self.contains_query_string
    }

    /// Match a request path against the compiled pattern.
    pub fn is_match(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }
}

impl fmt::Display for UpstreamPathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

/// Escape literal chunks and replace `{name}` segments with a one-segment
/// wildcard. Unbalanced braces are treated as literals.
fn escape_literals(template: &str) -> String {
    let mut out = String::with_capacity(template.len() + 8);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        match rest[open..].find('}') {
            Some(close) => {
                out.push_str(&regex::escape(&rest[..open]));
                out.push_str("[^/?]+");
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    out.push_str(&regex::escape(rest));
    out
}
