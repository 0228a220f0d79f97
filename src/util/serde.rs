//! Serializable identifiers shared across the scheduler.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Farm identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FarmId(String);

/// Crop cycle identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleId(String);

macro_rules! string_id {
    ($ty:ident) => {
        impl $ty {
            /// Wrap a raw identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $ty {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(FarmId);
string_id!(CycleId);

impl CycleId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Physical address of one shelf within a farm.
///
/// Ordering is by `rack_id`, then `shelf_id`; the allocator walks free
/// shelves in this order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ShelfRef {
    /// Rack identifier.
    pub rack_id: String,
    /// Shelf identifier within the rack.
    pub shelf_id: String,
}

impl ShelfRef {
    /// Build a shelf reference.
    pub fn new(rack_id: impl Into<String>, shelf_id: impl Into<String>) -> Self {
        Self {
            rack_id: rack_id.into(),
            shelf_id: shelf_id.into(),
        }
    }
}

impl fmt::Display for ShelfRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.rack_id, self.shelf_id)
    }
}
