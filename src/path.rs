//! Materialized-path keys.
//!
//! A [`TreePath`] is an ordered list of segments. Encoded form is the
//! reserved marker character followed by the segments joined with the same
//! marker, so every key is prefix-scannable: the subtree under a node is
//! exactly the keys starting with its key plus one more marker.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{TreeError, TreeResult};

/// Reserved control character: leading sentinel and inter-segment separator.
/// Must never appear inside a caller-supplied segment.
pub const SEPARATOR: char = '\u{0001}';

/// A position in the hierarchy.
///
/// # Example
///
/// ```
/// use espalier::TreePath;
///
/// let path = TreePath::from_segments(["pages", "home"]).unwrap();
/// assert_eq!(path.depth(), 2);
/// assert_eq!(path.parent(), TreePath::from_segments(["pages"]).unwrap());
/// assert_eq!(TreePath::decode(&path.encode()), path);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TreePath {
    segments: Vec<String>,
}

impl TreePath {
    /// The root path (empty segment list).
    #[must_use]
    pub fn root() -> Self {
        Self { segments: Vec::new() }
    }

    /// Build a path from segments, validating each one.
    pub fn from_segments<I, S>(segments: I) -> TreeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut validated = Vec::new();
        for segment in segments {
            let segment = segment.into();
            validate_segment(&segment)?;
            validated.push(segment);
        }
        Ok(Self { segments: validated })
    }

    /// Parse a user-facing path such as `"/pages/home"` with a caller-chosen
    /// delimiter. Empty fragments are skipped, so leading, trailing and
    /// doubled delimiters are tolerated.
    pub fn from_delimited(path: &str, delimiter: char) -> TreeResult<Self> {
        Self::from_segments(path.split(delimiter).filter(|s| !s.is_empty()))
    }

    /// Decode an encoded key back into a path. Total: splits on the marker
    /// and drops empty fragments, so any key produced by [`encode`](Self::encode)
    /// round-trips.
    #[must_use]
    pub fn decode(key: &str) -> Self {
        Self {
            segments: key
                .split(SEPARATOR)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// The path one level deeper.
    pub fn child(&self, segment: &str) -> TreeResult<Self> {
        validate_segment(segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    /// The path one level up. Root's parent is root itself.
    #[must_use]
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// Nesting depth: the segment count. Root is 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last segment, the usual display-name candidate.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Encode to the scannable key: marker alone for root, else marker +
    /// segments joined by marker.
    #[must_use]
    pub fn encode(&self) -> String {
        let capacity = 1 + self
            .segments
            .iter()
            .map(|s| s.len() + 1)
            .sum::<usize>();
        let mut key = String::with_capacity(capacity);
        key.push(SEPARATOR);
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                key.push(SEPARATOR);
            }
            key.push_str(segment);
        }
        key
    }
}

fn validate_segment(segment: &str) -> TreeResult<()> {
    if segment.is_empty() {
        return Err(TreeError::InvalidSegment {
            segment: segment.to_string(),
            reason: "segment is empty",
        });
    }
    if segment.contains(SEPARATOR) {
        return Err(TreeError::InvalidSegment {
            segment: segment.to_string(),
            reason: "segment contains the reserved separator",
        });
    }
    Ok(())
}

impl From<String> for TreePath {
    fn from(key: String) -> Self {
        Self::decode(&key)
    }
}

impl From<TreePath> for String {
    fn from(path: TreePath) -> Self {
        path.encode()
    }
}

/// Human-readable form for logs: `/`-joined segments, root as `/`.
/// Never fed back into the index.
impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}
