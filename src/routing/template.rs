//! # Route Templates
//!
//! Compiles path templates such as `/blog/{year}/{id}` into anchored matchers that bind
//! placeholder names to the substrings they cover.
//!
//! Compilation happens in two steps:
//! 1. the template is tokenized into literal and placeholder segments, rejecting
//!    malformed input (unbalanced braces, empty or duplicate names, adjacent placeholders)
//! 2. the segments are lowered to a `regex::Regex` where every literal is escaped and every
//!    placeholder becomes a `(.+)` capture group, anchored with `^...$`
//!
//! Placeholders are always separated by literal text, so a greedy capture is unambiguous.

use regex::Regex;
use std::fmt;

use crate::core::error::{MockError, MockResult};
use crate::core::types::ParamMap;

/// One piece of a tokenized template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text that must appear verbatim
    Literal(String),
    /// Named placeholder, `{name}` in the template
    Param(String),
}

/// A compiled route template
#[derive(Debug, Clone)]
pub struct RouteTemplate {
    source: String,
    segments: Vec<Segment>,
    param_names: Vec<String>,
    matcher: Regex,
}

impl RouteTemplate {
    /// Compile a template string
    ///
    /// # Example
    /// ```rust
    /// use mock_backend::routing::template::RouteTemplate;
    ///
    /// let template = RouteTemplate::compile("/blog/{year}/{id}").unwrap();
    /// let params = template.match_path("/blog/2014/7").unwrap();
    /// assert_eq!(params["year"], "2014");
    /// assert_eq!(params["id"], "7");
    /// ```
    pub fn compile(template: &str) -> MockResult<Self> {
        let segments = tokenize(template)?;

        let mut pattern = String::from("^");
        let mut param_names = Vec::new();
        for segment in &segments {
            match segment {
                Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
                Segment::Param(name) => {
                    pattern.push_str("(.+)");
                    param_names.push(name.clone());
                }
            }
        }
        pattern.push('$');

        let matcher = Regex::new(&pattern)
            .map_err(|e| MockError::template(template, format!("failed to build matcher: {}", e)))?;

        Ok(Self {
            source: template.to_string(),
            segments,
            param_names,
            matcher,
        })
    }

    /// Match a concrete path, returning the placeholder bindings on success
    ///
    /// A template without placeholders only matches the identical path and yields an
    /// empty map.
    pub fn match_path(&self, path: &str) -> Option<ParamMap> {
        let captures = self.matcher.captures(path)?;

        let params = self
            .param_names
            .iter()
            .zip(captures.iter().skip(1))
            .filter_map(|(name, capture)| capture.map(|c| (name.clone(), c.as_str().to_string())))
            .collect();

        Some(params)
    }

    /// Check whether a path matches without building the parameter map
    pub fn is_match(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }

    /// The template string this matcher was compiled from
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names in template order
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Tokenized form of the template
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Split a template into literal and placeholder segments
fn tokenize(template: &str) -> MockResult<Vec<Segment>> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    match inner {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => {
                            return Err(MockError::template(template, "nested '{' inside placeholder"));
                        }
                        other => name.push(other),
                    }
                }

                if !closed {
                    return Err(MockError::template(template, "unclosed placeholder"));
                }
                if name.is_empty() {
                    return Err(MockError::template(template, "empty placeholder name"));
                }
                if !name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
                    return Err(MockError::template(
                        template,
                        format!("invalid placeholder name '{}'", name),
                    ));
                }

                if literal.is_empty() {
                    if let Some(Segment::Param(previous)) = segments.last() {
                        return Err(MockError::template(
                            template,
                            format!("placeholders '{}' and '{}' are adjacent", previous, name),
                        ));
                    }
                } else {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }

                let duplicate = segments
                    .iter()
                    .any(|segment| matches!(segment, Segment::Param(existing) if *existing == name));
                if duplicate {
                    return Err(MockError::template(
                        template,
                        format!("placeholder '{}' appears more than once", name),
                    ));
                }

                segments.push(Segment::Param(name));
            }
            '}' => return Err(MockError::template(template, "unmatched '}'")),
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}
