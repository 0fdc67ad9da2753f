//! Actions attached to a `Fields` block

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Verb telling the remote system what to do with an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Create a new record
    Insert,
    /// Change an existing record
    Update,
    /// Remove an existing record
    Delete,
}

impl Action {
    /// Wire representation (`insert`, `update`, `delete`)
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Insert => "insert",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insert" => Ok(Action::Insert),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            _ => Err(crate::Error::InvalidAction(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Insert".parse::<Action>().unwrap(), Action::Insert);
        assert_eq!(" UPDATE ".parse::<Action>().unwrap(), Action::Update);
        assert_eq!("delete".parse::<Action>().unwrap(), Action::Delete);
    }

    #[test]
    fn test_parse_rejects_unknown_verb() {
        let err = "upsert".parse::<Action>().unwrap_err();
        assert_eq!(err, crate::Error::InvalidAction("upsert".to_string()));
        assert!(err.to_string().contains("upsert"));
    }

    #[test]
    fn test_display_matches_wire_format() {
        assert_eq!(Action::Insert.to_string(), "insert");
        assert_eq!(Action::Update.as_str(), "update");
    }
}
