//! Paths for navigating nested objects
//!
//! A path names child objects from an element downwards, e.g.
//! `KnContact/KnPerson` or `KnContact[1]/KnPerson`. The bracketed index picks
//! the element of that object to descend from; it defaults to 0 and is not
//! allowed on the last segment, which names the object itself.

use crate::Error;
use crate::Result;
use std::fmt;
use std::str::FromStr;

/// One step in an [`ObjectPath`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    /// Child object tag or alias
    pub object_type: String,

    /// Element of this object to continue from
    pub index: usize,
}

/// Parsed path to a nested object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPath {
    segments: Vec<PathSegment>,
}

impl ObjectPath {
    /// Parse a slash-separated path
    ///
    /// # Errors
    ///
    /// Returns an invalid-path error for empty paths, unclosed brackets,
    /// non-numeric indexes and an index on the final segment.
    pub fn parse(path: &str) -> Result<Self> {
        let mut segments = Vec::new();

        for segment in path.split('/') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            // Handle element indexing like "KnContact[1]"
            if let Some(open_bracket) = segment.find('[') {
                let name = &segment[..open_bracket];
                let close_bracket = segment
                    .find(']')
                    .filter(|close| *close > open_bracket && *close == segment.len() - 1)
                    .ok_or_else(|| {
                        Error::invalid_path(path, format!("Unclosed bracket in: {segment}"))
                    })?;
                let index: usize = segment[open_bracket + 1..close_bracket]
                    .parse()
                    .map_err(|_| {
                        Error::invalid_path(path, format!("Invalid index in: {segment}"))
                    })?;
                if name.is_empty() {
                    return Err(Error::invalid_path(path, "Missing object name before index"));
                }
                segments.push(PathSegment {
                    object_type: name.to_string(),
                    index,
                });
            } else {
                segments.push(PathSegment {
                    object_type: segment.to_string(),
                    index: 0,
                });
            }
        }

        if segments.is_empty() {
            return Err(Error::invalid_path(path, "Path is empty"));
        }
        if path.trim_end_matches('/').ends_with(']') {
            return Err(Error::invalid_path(
                path,
                "The last segment names an object and takes no index",
            ));
        }

        Ok(Self { segments })
    }

    /// Steps from the starting element downwards
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }
}

impl FromStr for ObjectPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self.segments.len().saturating_sub(1);
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                f.write_str("/")?;
            }
            if idx < last && segment.index > 0 {
                write!(f, "{}[{}]", segment.object_type, segment.index)?;
            } else {
                f.write_str(&segment.object_type)?;
            }
        }
        Ok(())
    }
}
