//! Relation keys naming a dataset

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::{Error, Result};

/// Composite (user, program, relation) name of a dataset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationKey {
    pub user_name: String,
    pub program_name: String,
    pub relation_name: String,
}

impl RelationKey {
    pub fn new(
        user_name: impl Into<String>,
        program_name: impl Into<String>,
        relation_name: impl Into<String>,
    ) -> Result<Self> {
        let key = Self {
            user_name: user_name.into(),
            program_name: program_name.into(),
            relation_name: relation_name.into(),
        };

        for part in [&key.user_name, &key.program_name, &key.relation_name] {
            if part.is_empty() || part.contains('_') || part.starts_with('-') {
                return Err(Error::InvalidRelationKey(format!(
                    "bad component {:?} in {}",
                    part, key
                )));
            }
        }

        Ok(key)
    }

    /// Parse the `user_program_relation` form.
    ///
    /// The datastore takes the third `_`-separated field as the relation
    /// name, so keys with any other number of fields are rejected.
    pub fn parse(key: &str) -> Result<Self> {
        let parts: Vec<&str> = key.split('_').collect();
        match parts.as_slice() {
            [user, program, relation] => Self::new(*user, *program, *relation),
            _ => Err(Error::InvalidRelationKey(key.to_string())),
        }
    }

    /// Positional datastore parameters: user, program, relation
    pub fn params(&self) -> Vec<String> {
        vec![
            self.user_name.clone(),
            self.program_name.clone(),
            self.relation_name.clone(),
        ]
    }
}

impl FromStr for RelationKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.user_name, self.program_name, self.relation_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_relation_key() {
        let key = RelationKey::parse("alice_prog_rel").unwrap();
        assert_eq!(key.user_name, "alice");
        assert_eq!(key.program_name, "prog");
        assert_eq!(key.relation_name, "rel");
        assert_eq!(key.to_string(), "alice_prog_rel");
    }

    #[test]
    fn test_rejects_keys_with_extra_fields() {
        let err = "alice_prog_edge_list".parse::<RelationKey>().unwrap_err();
        assert!(matches!(err, Error::InvalidRelationKey(_)));
        assert_eq!(err.status_code(), 400);

        assert!(RelationKey::new("alice", "prog", "edge_list").is_err());
    }

    #[test]
    fn test_rejects_components_that_look_like_options() {
        assert!(RelationKey::parse("-h_prog_rel").is_err());
        assert!(RelationKey::parse("alice_prog_--help").is_err());
        assert!(RelationKey::new("alice", "-v", "rel").is_err());
        assert!(RelationKey::parse("alice_prog_rel-2").is_ok());
    }

    #[test]
    fn test_rejects_short_or_empty_keys() {
        assert!(RelationKey::parse("alice_prog").is_err());
        assert!(RelationKey::parse("alice__rel").is_err());
        assert!(RelationKey::parse("").is_err());
    }

    #[test]
    fn test_json_uses_camel_case() {
        let key = RelationKey::new("public", "adhoc", "twitter").unwrap();
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json["userName"], "public");
        assert_eq!(json["programName"], "adhoc");
        assert_eq!(json["relationName"], "twitter");
    }
}
