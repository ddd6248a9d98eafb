//! Typed ID wrappers for request, approval-case, and session identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed ID wrappers prevent mixing up request ids, case ids, and session
/// ids in the broker's and the approval desk's tables. These are just
/// strings underneath — no UUID enforcement, no format requirement. The
/// protocol doesn't care what your IDs look like, only that they are unique
/// for the lifetime of the session.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to String.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(RequestId, "Unique identifier for one request on the wire.");
typed_id!(CaseId, "Unique identifier for one approval case.");
typed_id!(SessionId, "Unique identifier for a client-to-backend session.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_serde_as_plain_strings() {
        let id = RequestId::new("req-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"req-1\"");
        let back: RequestId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn distinct_id_types_do_not_compare() {
        // Compile-time property: RequestId and CaseId are different types.
        // This test documents the intent; the type system enforces it.
        let r = RequestId::new("x");
        let c = CaseId::new("x");
        assert_eq!(r.as_str(), c.as_str());
    }
}
