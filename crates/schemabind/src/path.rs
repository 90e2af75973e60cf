//! # Path Tracker
//!
//! Locates the value currently being decoded relative to the document root.
//! Paths are diagnostics only: they never influence binding.
//!
//! A [`Path`] is never mutated once handed to a child frame. Each recursive
//! step receives a copy extended by exactly one segment via [`Path::child`]
//! or [`Path::index`], so sibling frames that fail independently can never
//! observe each other's segments.

use std::fmt;

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// An object member name.
    Property(String),
    /// A zero-based array position.
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Property(name) => f.write_str(name),
            Segment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Ordered list of segments from the document root to a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// The empty path, addressing the root value.
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a copy of this path extended by an object member name.
    pub fn child(&self, name: &str) -> Self {
        self.extended(Segment::Property(name.to_string()))
    }

    /// Returns a copy of this path extended by an array index.
    pub fn index(&self, index: usize) -> Self {
        self.extended(Segment::Index(index))
    }

    fn extended(&self, segment: Segment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        Self { segments }
    }

    /// The segments of this path, outermost first.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether this path addresses the root value.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Renders the path as an RFC 6901 JSON Pointer (`""` for the root).
    pub fn to_json_pointer(&self) -> String {
        let mut pointer = String::new();
        for segment in &self.segments {
            pointer.push('/');
            match segment {
                Segment::Property(name) => {
                    pointer.push_str(&name.replace('~', "~0").replace('/', "~1"));
                }
                Segment::Index(index) => pointer.push_str(&index.to_string()),
            }
        }
        pointer
    }
}

/// Dotted rendering: `child.foo`, `arr.1`, or `(root)`.
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("(root)");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_display() {
        assert_eq!(Path::root().to_string(), "(root)");
        assert!(Path::root().is_root());
    }

    #[test]
    fn test_dotted_display() {
        let path = Path::root().child("arr").index(1).child("name");
        assert_eq!(path.to_string(), "arr.1.name");
    }

    #[test]
    fn test_child_does_not_alias_parent() {
        let parent = Path::root().child("a");
        let left = parent.child("left");
        let right = parent.child("right");
        assert_eq!(parent.segments().len(), 1);
        assert_eq!(left.to_string(), "a.left");
        assert_eq!(right.to_string(), "a.right");
    }

    #[test]
    fn test_json_pointer_escapes() {
        let path = Path::root().child("a/b").child("c~d").index(0);
        assert_eq!(path.to_json_pointer(), "/a~1b/c~0d/0");
        assert_eq!(Path::root().to_json_pointer(), "");
    }
}
