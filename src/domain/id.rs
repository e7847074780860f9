//! Sequential IDs for milestones, resources and edges
//!
//! ID Format:
//! - Node IDs: `n{seq}` (e.g., `n1`, `n12`)
//! - Resource IDs: `r{seq}` (e.g., `r3`)
//! - Edge IDs: `e{seq}` (e.g., `e7`)
//!
//! Sequences start at 1. IDs order by sequence, so `n2` sorts before `n10`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid {kind} ID: expected '{prefix}{{sequence}}', got '{value}'")]
    InvalidFormat {
        kind: &'static str,
        prefix: char,
        value: String,
    },

    #[error("Invalid sequence number: {0}")]
    InvalidSequence(String),
}

/// Behaviour shared by every sequential ID kind
pub trait SeqId: Copy + Ord + fmt::Display {
    /// Builds the ID with the given sequence number
    fn from_seq(seq: u32) -> Self;

    /// Returns the sequence number
    fn seq(&self) -> u32;
}

fn parse_seq(s: &str, kind: &'static str, prefix: char) -> Result<u32, IdError> {
    let s = s.trim();
    let rest = s.strip_prefix(prefix).ok_or_else(|| IdError::InvalidFormat {
        kind,
        prefix,
        value: s.to_string(),
    })?;

    if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
        return Err(IdError::InvalidFormat {
            kind,
            prefix,
            value: s.to_string(),
        });
    }

    let seq: u32 = rest
        .parse()
        .map_err(|_| IdError::InvalidSequence(rest.to_string()))?;
    if seq == 0 {
        return Err(IdError::InvalidSequence(rest.to_string()));
    }
    Ok(seq)
}

macro_rules! seq_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal, $kind:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a sequence number (must be at least 1)
            pub fn new(seq: u32) -> Self {
                Self(seq.max(1))
            }
        }

        impl SeqId for $name {
            fn from_seq(seq: u32) -> Self {
                Self::new(seq)
            }

            fn seq(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_seq(s, $kind, $prefix).map(Self)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.to_string()
            }
        }
    };
}

seq_id!(
    /// Milestone ID in the format `n{seq}`
    NodeId,
    'n',
    "node"
);

seq_id!(
    /// Resource ID in the format `r{seq}`
    ResourceId,
    'r',
    "resource"
);

seq_id!(
    /// Edge ID in the format `e{seq}`
    EdgeId,
    'e',
    "edge"
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn node_id_format_is_correct() {
        assert_eq!(NodeId::new(4).to_string(), "n4");
        assert_eq!(ResourceId::new(1).to_string(), "r1");
        assert_eq!(EdgeId::new(12).to_string(), "e12");
    }

    #[test]
    fn parses_correctly() {
        let id: NodeId = "n42".parse().unwrap();
        assert_eq!(id.seq(), 42);

        let id: EdgeId = " e3 ".parse().unwrap();
        assert_eq!(id, EdgeId::new(3));
    }

    #[test]
    fn rejects_invalid_format() {
        assert!("r1".parse::<NodeId>().is_err()); // wrong prefix
        assert!("n".parse::<NodeId>().is_err()); // no sequence
        assert!("n0".parse::<NodeId>().is_err()); // sequences start at 1
        assert!("n-1".parse::<NodeId>().is_err());
        assert!("nx".parse::<NodeId>().is_err());
        assert!("n99999999999".parse::<NodeId>().is_err()); // overflow
    }

    #[test]
    fn orders_by_sequence() {
        let mut ids: Vec<NodeId> = ["n10", "n2", "n1"].iter().map(|s| s.parse().unwrap()).collect();
        ids.sort();
        let rendered: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        assert_eq!(rendered, vec!["n1", "n2", "n10"]);
    }

    #[test]
    fn serializes_as_string_map_key() {
        let mut map = BTreeMap::new();
        map.insert(ResourceId::new(2), 1.5);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"r2":1.5}"#);

        let parsed: BTreeMap<ResourceId, f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, map);
    }
}
