// Topic patterns
//
// Subscription-style patterns: `+` stands for exactly one level, `#` for
// everything that follows. Patterns without either marker are exact names
// and are looked up by equality, never through a regex.

use regex::Regex;
use std::fmt;

/// Level separator in topic names
pub const SEPARATOR: char = '/';

/// Matches exactly one level
pub const SINGLE_LEVEL_WILDCARD: char = '+';

/// Matches the remainder of the name, separators included
pub const MULTI_LEVEL_WILDCARD: char = '#';

/// Pattern error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatternError {
    #[error("empty topic pattern")]
    Empty,

    #[error("invalid topic pattern '{pattern}': {reason}")]
    Invalid { pattern: String, reason: String },
}

/// A resolved topic pattern
#[derive(Debug, Clone)]
pub enum TopicPattern {
    /// Literal name
    Exact(String),

    /// Name with wildcards, compiled to an anchored regex
    Wildcard { pattern: String, matcher: Regex },
}

impl TopicPattern {
    /// Classify and compile a pattern
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }

        if !has_wildcard(pattern) {
            return Ok(TopicPattern::Exact(pattern.to_string()));
        }

        let matcher = Regex::new(&wildcard_to_regex(pattern)).map_err(|e| {
            PatternError::Invalid {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(TopicPattern::Wildcard {
            pattern: pattern.to_string(),
            matcher,
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            TopicPattern::Exact(name) => name,
            TopicPattern::Wildcard { pattern, .. } => pattern,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, TopicPattern::Wildcard { .. })
    }

    /// Whether a recorded name is selected by this pattern
    pub fn matches(&self, name: &str) -> bool {
        match self {
            TopicPattern::Exact(exact) => exact == name,
            TopicPattern::Wildcard { matcher, .. } => matcher.is_match(name),
        }
    }
}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn has_wildcard(pattern: &str) -> bool {
    pattern.contains([SINGLE_LEVEL_WILDCARD, MULTI_LEVEL_WILDCARD])
}

/// Translate wildcard syntax into an anchored regular expression.
///
/// `+` becomes a run of one or more non-separator characters, `#` becomes
/// any remainder, line breaks included. Every other character is matched
/// literally.
pub fn wildcard_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() * 2 + 2);
    regex.push('^');
    let mut buf = [0u8; 4];
    for c in pattern.chars() {
        match c {
            SINGLE_LEVEL_WILDCARD => regex.push_str("[^/]+"),
            MULTI_LEVEL_WILDCARD => regex.push_str("(?s:.*)"),
            other => regex.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    regex.push('$');
    regex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_is_exact() {
        let pattern = TopicPattern::parse("sensor/1").unwrap();
        assert!(!pattern.is_wildcard());
        assert!(pattern.matches("sensor/1"));
        assert!(!pattern.matches("sensor/10"));
        assert!(!pattern.matches("x/sensor/1"));
    }

    #[test]
    fn test_single_level_wildcard() {
        let pattern = TopicPattern::parse("sensor/+").unwrap();
        assert!(pattern.is_wildcard());
        assert!(pattern.matches("sensor/1"));
        assert!(pattern.matches("sensor/kitchen"));
        assert!(!pattern.matches("sensor/1/temp"));
        assert!(!pattern.matches("sensor/"));
        assert!(!pattern.matches("other/sensor/1"));
    }

    #[test]
    fn test_single_level_in_the_middle() {
        let pattern = TopicPattern::parse("home/+/temp").unwrap();
        assert!(pattern.matches("home/kitchen/temp"));
        assert!(!pattern.matches("home/kitchen/humidity"));
        assert!(!pattern.matches("home/a/b/temp"));
    }

    #[test]
    fn test_multi_level_wildcard() {
        let pattern = TopicPattern::parse("sensor/#").unwrap();
        assert!(pattern.matches("sensor/1"));
        assert!(pattern.matches("sensor/1/temp/raw"));
        assert!(!pattern.matches("sensor"));
        assert!(!pattern.matches("actuator/1"));

        let everything = TopicPattern::parse("#").unwrap();
        assert!(everything.matches("a"));
        assert!(everything.matches("a/b/c"));
    }

    #[test]
    fn test_multi_level_wildcard_spans_line_breaks() {
        let pattern = TopicPattern::parse("a/#").unwrap();
        assert!(pattern.matches("a/x\ny"));
        assert!(pattern.matches("a/\n/z"));

        // one level still stops at the separator only
        let single = TopicPattern::parse("a/+").unwrap();
        assert!(single.matches("a/x\ny"));
        assert!(!single.matches("a/x\n/y"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let pattern = TopicPattern::parse("v1.0/+").unwrap();
        assert!(pattern.matches("v1.0/x"));
        assert!(!pattern.matches("v1x0/x"));

        let pattern = TopicPattern::parse("a(b)*/#").unwrap();
        assert!(pattern.matches("a(b)*/c"));
        assert!(!pattern.matches("abbb/c"));
    }

    #[test]
    fn test_translation() {
        assert_eq!(wildcard_to_regex("a/+/#"), "^a/[^/]+/(?s:.*)$");
        assert_eq!(wildcard_to_regex("a.b/+"), r"^a\.b/[^/]+$");
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert_eq!(TopicPattern::parse("").unwrap_err(), PatternError::Empty);
    }

    #[test]
    fn test_display_keeps_pattern_text() {
        assert_eq!(TopicPattern::parse("a/+").unwrap().to_string(), "a/+");
        assert_eq!(TopicPattern::parse("a/b").unwrap().as_str(), "a/b");
    }
}
