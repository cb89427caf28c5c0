//! Field paths used to locate a value inside a document tree.

use std::fmt;

/// One step from a container to a child value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Mapping key
    Key(String),
    /// Sequence position
    Index(usize),
}

/// Location of a value inside a document, e.g. `[0].Items[2].Content`.
///
/// The empty path denotes the root and displays as `<root>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Path to the root value
    pub fn root() -> Self {
        Self::default()
    }

    /// Path to a mapping entry below this path
    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Key(key.to_string()));
        Self { segments }
    }

    /// Path to a sequence element below this path
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    /// Prefix this path with a parent segment.
    ///
    /// Errors are raised at the leaf and gain their location while they
    /// propagate back up the recursion.
    pub fn prepend(&mut self, segment: PathSegment) {
        self.segments.insert(0, segment);
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "<root>");
        }

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_display() {
        assert_eq!(FieldPath::root().to_string(), "<root>");
        assert!(FieldPath::root().is_root());
    }

    #[test]
    fn test_nested_display() {
        let path = FieldPath::root().index(0).key("Items").index(2).key("Content");
        assert_eq!(path.to_string(), "[0].Items[2].Content");
    }

    #[test]
    fn test_prepend() {
        let mut path = FieldPath::root().key("$binary");
        path.prepend(PathSegment::Key("Content".to_string()));
        path.prepend(PathSegment::Index(1));
        assert_eq!(path.to_string(), "[1].Content.$binary");
    }
}
