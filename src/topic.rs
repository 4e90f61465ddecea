//! Hierarchical topic paths.
//!
//! A topic is a slash-delimited path naming a point in the bus's
//! namespace, analogous to a Unix absolute path (e.g. `/app/module/class`).
//! Publishing to a leaf topic bubbles the notification up through every
//! ancestor topic, so `/app/module/class` also reaches subscribers of
//! `/app/module` and `/app`.

use crate::error::{BusError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated topic path.
///
/// Invariants, enforced on construction:
/// - non-empty and begins with `/`
/// - no trailing `/` and no repeated `/`
/// - every segment matches `[A-Za-z0-9_]+`
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Topic(String);

impl Topic {
    /// Parse and validate a topic path.
    pub fn parse(s: impl AsRef<str>) -> Result<Self> {
        let s = s.as_ref();
        if Self::is_valid(s) {
            Ok(Topic(s.to_string()))
        } else {
            Err(BusError::InvalidTopic(s.to_string()))
        }
    }

    /// Check a candidate topic string against the topic invariants.
    pub fn is_valid(s: &str) -> bool {
        if !s.starts_with('/') || s.ends_with('/') {
            return false;
        }
        s[1..]
            .split('/')
            .all(|seg| !seg.is_empty() && seg.chars().all(Self::is_segment_char))
    }

    fn is_segment_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_'
    }

    /// The topic as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments, leaf-most last (`/a/b` yields `a`, `b`).
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0[1..].split('/')
    }

    /// The direct parent topic, or `None` for a root-segment topic.
    ///
    /// The empty root-of-all (`""` / `/`) is never itself a topic.
    pub fn parent(&self) -> Option<Topic> {
        match self.0.rfind('/') {
            Some(0) | None => None,
            Some(i) => Some(Topic(self.0[..i].to_string())),
        }
    }

    /// The ordered ancestor chain, leaf first and root-segment last.
    ///
    /// Includes the topic itself: `/a/b/c` yields `[/a/b/c, /a/b, /a]`.
    /// This is the order the delivery engine walks when bubbling.
    pub fn ancestors(&self) -> Vec<Topic> {
        let mut chain = Vec::new();
        let mut end = self.0.len();
        loop {
            chain.push(Topic(self.0[..end].to_string()));
            match self.0[..end].rfind('/') {
                Some(0) | None => break,
                Some(i) => end = i,
            }
        }
        chain
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic({})", self.0)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Topic {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self> {
        Topic::parse(s)
    }
}

impl TryFrom<String> for Topic {
    type Error = BusError;

    fn try_from(s: String) -> Result<Self> {
        if Self::is_valid(&s) {
            Ok(Topic(s))
        } else {
            Err(BusError::InvalidTopic(s))
        }
    }
}

impl From<Topic> for String {
    fn from(t: Topic) -> String {
        t.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_valid_topics() {
        for t in ["/a", "/a/b/c", "/app/module_1/Class9", "/_"] {
            assert!(Topic::is_valid(t), "{t} should be valid");
            assert_eq!(Topic::parse(t).unwrap().as_str(), t);
        }
    }

    #[test]
    fn test_invalid_topics() {
        for t in [
            "",
            "/",
            "no/leading/slash",
            "/trailing/",
            "/double//slash",
            "/bad char",
            "/bad-char",
            "/a/",
            "//",
        ] {
            assert!(!Topic::is_valid(t), "{t:?} should be invalid");
            assert!(matches!(Topic::parse(t), Err(BusError::InvalidTopic(_))));
        }
    }

    #[test]
    fn test_ancestor_chain_leaf_first() {
        let topic = Topic::parse("/a/b/c").unwrap();
        let chain: Vec<_> = topic.ancestors().iter().map(|t| t.to_string()).collect();
        assert_eq!(chain, vec!["/a/b/c", "/a/b", "/a"]);
    }

    #[test]
    fn test_root_segment_has_no_parent() {
        let topic = Topic::parse("/a").unwrap();
        assert_eq!(topic.ancestors(), vec![topic.clone()]);
        assert!(topic.parent().is_none());
    }

    #[test]
    fn test_parent_walk() {
        let topic = Topic::parse("/x/y/z").unwrap();
        let parent = topic.parent().unwrap();
        assert_eq!(parent.as_str(), "/x/y");
        assert_eq!(parent.parent().unwrap().as_str(), "/x");
    }

    #[test]
    fn test_segments() {
        let topic = Topic::parse("/a/b/c").unwrap();
        let segs: Vec<_> = topic.segments().collect();
        assert_eq!(segs, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_serde_rejects_invalid() {
        let ok: Topic = serde_json::from_str("\"/a/b\"").unwrap();
        assert_eq!(ok.as_str(), "/a/b");
        assert!(serde_json::from_str::<Topic>("\"no/slash\"").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"/a/b\"");
    }

    proptest! {
        #[test]
        fn prop_joined_segments_are_valid(segs in prop::collection::vec("[A-Za-z0-9_]{1,12}", 1..6)) {
            let raw = format!("/{}", segs.join("/"));
            let topic = Topic::parse(&raw).unwrap();
            prop_assert_eq!(topic.ancestors().len(), segs.len());
            let ancestors = topic.ancestors();
            let expected = format!("/{}", segs[0]);
            prop_assert_eq!(
                ancestors.last().unwrap().as_str(),
                expected.as_str()
            );
        }

        #[test]
        fn prop_ancestors_are_prefixes(segs in prop::collection::vec("[a-z0-9_]{1,8}", 1..6)) {
            let raw = format!("/{}", segs.join("/"));
            let topic = Topic::parse(&raw).unwrap();
            for pair in topic.ancestors().windows(2) {
                let parent = pair[0].parent();
                prop_assert_eq!(parent.as_ref(), Some(&pair[1]));
                prop_assert!(pair[0].as_str().starts_with(pair[1].as_str()));
            }
        }
    }
}
