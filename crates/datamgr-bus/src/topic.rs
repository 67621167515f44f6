#![forbid(unsafe_code)]

//! Hierarchical topic addresses and wildcard patterns.
//!
//! A [`Topic`] is an ordered list of segments. Its textual form joins the
//! segments with `.`, so `Topic::new(["dm", "tasks", "t1"])` displays as
//! `dm.tasks.t1`. Matching always works on segments, never on the joined
//! string.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Empty pattern | `""` | [`PatternError::Empty`] |
//! | Empty segment | `"dm..x"` | [`PatternError::EmptySegment`] |
//! | Inner wildcard | `"dm.*.x"` | [`PatternError::MisplacedWildcard`] |

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

type Segments = SmallVec<[String; 3]>;

/// A concrete, fully-qualified notification address.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Topic {
    segments: Segments,
}

impl Topic {
    /// Build a topic from its segments.
    #[must_use]
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a dotted path into a topic.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        Self::new(path.split('.'))
    }

    /// The topic's segments, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the topic has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment at `index`, if present.
    #[must_use]
    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    /// Whether `prefix` is a strict prefix of this topic.
    #[must_use]
    pub fn extends(&self, prefix: &[String]) -> bool {
        self.segments.len() > prefix.len() && self.segments.starts_with(prefix)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

/// Errors from parsing a [`TopicPattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The pattern was empty.
    Empty,
    /// A segment between two dots was empty.
    EmptySegment(String),
    /// `*` appeared somewhere other than the last segment.
    MisplacedWildcard(String),
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "topic pattern is empty"),
            Self::EmptySegment(p) => write!(f, "topic pattern '{p}' has an empty segment"),
            Self::MisplacedWildcard(p) => {
                write!(f, "wildcard must be the last segment of '{p}'")
            }
        }
    }
}

impl std::error::Error for PatternError {}

/// Selects the topics a subscriber receives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TopicPattern {
    /// Only this exact topic.
    Exact(Topic),
    /// Every topic strictly below these segments (`<prefix>.*`).
    Prefix(Vec<String>),
}

impl TopicPattern {
    /// Pattern matching a single topic.
    #[must_use]
    pub fn exact(topic: Topic) -> Self {
        Self::Exact(topic)
    }

    /// Pattern matching every topic below `segments`.
    #[must_use]
    pub fn prefix<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Prefix(segments.into_iter().map(Into::into).collect())
    }

    /// Whether `topic` is selected by this pattern.
    #[must_use]
    pub fn matches(&self, topic: &Topic) -> bool {
        match self {
            Self::Exact(exact) => exact == topic,
            Self::Prefix(prefix) => topic.extends(prefix),
        }
    }
}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(topic) => write!(f, "{topic}"),
            Self::Prefix(prefix) => {
                for segment in prefix {
                    write!(f, "{segment}.")?;
                }
                f.write_str("*")
            }
        }
    }
}

impl FromStr for TopicPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PatternError::Empty);
        }
        let parts: Vec<&str> = s.split('.').collect();
        let last = parts.len() - 1;
        for (i, part) in parts.iter().enumerate() {
            if part.is_empty() {
                return Err(PatternError::EmptySegment(s.to_owned()));
            }
            if *part == "*" && i != last {
                return Err(PatternError::MisplacedWildcard(s.to_owned()));
            }
        }
        if parts[last] == "*" {
            Ok(Self::prefix(parts[..last].iter().copied()))
        } else {
            Ok(Self::Exact(Topic::new(parts)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_display_joins_segments() {
        let topic = Topic::new(["dm", "tasks", "t1"]);
        assert_eq!(topic.to_string(), "dm.tasks.t1");
        assert_eq!(topic.len(), 3);
        assert_eq!(topic.segment(1), Some("tasks"));
    }

    #[test]
    fn segments_may_contain_dots() {
        let topic = Topic::new(["dm", "v1.tasks", "t1"]);
        let scope = TopicPattern::prefix(["dm", "v1.tasks"]);
        assert!(scope.matches(&topic));
        assert!(!TopicPattern::prefix(["dm", "v1"]).matches(&topic));
    }

    #[test]
    fn exact_pattern_matches_only_itself() {
        let pattern = TopicPattern::exact(Topic::parse("dm.tasks.t1"));
        assert!(pattern.matches(&Topic::parse("dm.tasks.t1")));
        assert!(!pattern.matches(&Topic::parse("dm.tasks.t2")));
        assert!(!pattern.matches(&Topic::parse("dm.tasks")));
    }

    #[test]
    fn prefix_requires_at_least_one_more_segment() {
        let pattern: TopicPattern = "dm.tasks.*".parse().unwrap();
        assert!(pattern.matches(&Topic::parse("dm.tasks.t1")));
        assert!(pattern.matches(&Topic::parse("dm.tasks.t1.sub")));
        assert!(!pattern.matches(&Topic::parse("dm.tasks")));
        assert!(!pattern.matches(&Topic::parse("dm.other.t1")));
    }

    #[test]
    fn root_wildcard_matches_everything_below_root() {
        let pattern: TopicPattern = "dm.*".parse().unwrap();
        assert!(pattern.matches(&Topic::parse("dm.a.b")));
        assert!(!pattern.matches(&Topic::parse("other.a.b")));
    }

    #[test]
    fn parse_round_trips_through_display() {
        for text in ["dm.*", "dm.tasks.*", "dm.tasks.t1", "*"] {
            let pattern: TopicPattern = text.parse().unwrap();
            assert_eq!(pattern.to_string(), text);
        }
    }

    #[test]
    fn parse_rejects_malformed_patterns() {
        assert_eq!("".parse::<TopicPattern>(), Err(PatternError::Empty));
        assert!(matches!(
            "dm..x".parse::<TopicPattern>(),
            Err(PatternError::EmptySegment(_))
        ));
        assert!(matches!(
            "dm.*.x".parse::<TopicPattern>(),
            Err(PatternError::MisplacedWildcard(_))
        ));
    }

    mod property {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prefix_matches_iff_strictly_shorter(
                segments in proptest::collection::vec("[a-z]{1,4}", 1..6),
                cut in 0usize..6,
            ) {
                let cut = cut.min(segments.len());
                let topic = Topic::new(segments.clone());
                let pattern = TopicPattern::prefix(segments[..cut].to_vec());
                prop_assert_eq!(pattern.matches(&topic), cut < segments.len());
                prop_assert!(TopicPattern::exact(topic.clone()).matches(&topic));
            }
        }
    }
}
