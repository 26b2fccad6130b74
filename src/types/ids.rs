//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different ID types (e.g., using a
//! CategoryId where a TopicId is expected) and make the code more self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A Discourse topic ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicId(pub u64);

impl TopicId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TopicId {
    fn from(n: u64) -> Self {
        TopicId(n)
    }
}

/// A Discourse category ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub u64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CategoryId {
    fn from(n: u64) -> Self {
        CategoryId(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod topic_id {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn serde_roundtrip(n: u64) {
                let id = TopicId(n);
                let json = serde_json::to_string(&id).unwrap();
                let parsed: TopicId = serde_json::from_str(&json).unwrap();
                prop_assert_eq!(id, parsed);
            }

            #[test]
            fn display_is_bare_number(n: u64) {
                prop_assert_eq!(format!("{}", TopicId(n)), format!("{}", n));
            }

            #[test]
            fn comparison_matches_underlying(a: u64, b: u64) {
                prop_assert_eq!(TopicId(a) == TopicId(b), a == b);
            }
        }
    }

    mod category_id {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn serde_roundtrip(n: u64) {
                let id = CategoryId(n);
                let json = serde_json::to_string(&id).unwrap();
                let parsed: CategoryId = serde_json::from_str(&json).unwrap();
                prop_assert_eq!(id, parsed);
            }
        }

        #[test]
        fn deserializes_from_bare_integer() {
            let id: CategoryId = serde_json::from_str("7").unwrap();
            assert_eq!(id, CategoryId(7));
        }
    }
}
