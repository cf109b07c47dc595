//! Route matching logic.
//!
//! # Responsibilities
//! - Test a pathname against a route pattern
//! - Extract named parameters from a matching pathname
//!
//! # Design Decisions
//! - Patterns are segment lists: `/blog/[slug]`, `/docs/[...path]`
//! - Path matching is case-sensitive
//! - A single trailing slash is ignored
//! - Parameter values are percent-decoded; the pathname itself is not
//! - No regex to guarantee O(n) matching

use percent_encoding::percent_decode_str;
use thiserror::Error;

use crate::http::request::Params;

/// Trait for matching pathnames against a route.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the pathname matches this route.
    fn test(&self, pathname: &str) -> bool;

    /// Parameters captured from a matching pathname. `None` when it does
    /// not match.
    fn exec(&self, pathname: &str) -> Option<Params>;
}

/// Invalid route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern '{0}' must start with '/'")]
    Relative(String),

    #[error("pattern '{pattern}' has a malformed segment '{segment}'")]
    Segment { pattern: String, segment: String },

    #[error("pattern '{0}' has a rest parameter before its last segment")]
    RestNotLast(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
    Rest(String),
}

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    source: String,
    segments: Vec<Segment>,
}

fn split(path: &str) -> Vec<&str> {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    trimmed.split('/').skip(1).collect()
}

fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

fn bracketed(segment: &str) -> Option<&str> {
    segment.strip_prefix('[')?.strip_suffix(']')
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl RoutePattern {
    /// Compile a pattern such as `/blog/[slug]`.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if !pattern.starts_with('/') {
            return Err(PatternError::Relative(pattern.to_string()));
        }

        let raw = split(pattern);
        let mut segments = Vec::with_capacity(raw.len());
        for (i, segment) in raw.iter().enumerate() {
            let malformed = || PatternError::Segment {
                pattern: pattern.to_string(),
                segment: segment.to_string(),
            };

            let parsed = match bracketed(segment) {
                Some(inner) => match inner.strip_prefix("...") {
                    Some(name) if valid_name(name) => {
                        if i + 1 != raw.len() {
                            return Err(PatternError::RestNotLast(pattern.to_string()));
                        }
                        Segment::Rest(name.to_string())
                    }
                    Some(_) => return Err(malformed()),
                    None if valid_name(inner) => Segment::Param(inner.to_string()),
                    None => return Err(malformed()),
                },
                None if segment.contains(['[', ']']) => return Err(malformed()),
                None if segment.is_empty() && raw.len() > 1 => return Err(malformed()),
                None => Segment::Static(segment.to_string()),
            };
            segments.push(parsed);
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn capture(&self, pathname: &str, collect: bool) -> Option<Params> {
        let parts = split(pathname);
        let mut params = Params::new();

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Static(expected) => {
                    if parts.get(i) != Some(&expected.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.get(i).filter(|v| !v.is_empty())?;
                    if collect {
                        params.insert(name.clone(), decode(value));
                    }
                }
                Segment::Rest(name) => {
                    let rest = &parts[i.min(parts.len())..];
                    if rest.is_empty() || rest.iter().all(|p| p.is_empty()) {
                        return None;
                    }
                    if collect {
                        let joined = rest.iter().map(|p| decode(p)).collect::<Vec<_>>().join("/");
                        params.insert(name.clone(), joined);
                    }
                    return Some(params);
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }
}

impl Matcher for RoutePattern {
    fn test(&self, pathname: &str) -> bool {
        self.capture(pathname, false).is_some()
    }

    fn exec(&self, pathname: &str) -> Option<Params> {
        self.capture(pathname, true)
    }
}
