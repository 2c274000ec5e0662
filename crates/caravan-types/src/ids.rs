//! Type-safe identifier wrappers.
//!
//! Locations and items are keyed by the stable string ids used in the world
//! graph and the item catalog (`"riverbank"`, `"bread"`). Runtime-generated
//! entities (save snapshots, event subscriptions) use UUID v7 so they sort
//! by creation time.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

/// Generates a newtype wrapper around a stable string key.
macro_rules! define_key {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Create a key from anything string-like.
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            /// Borrow the key as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(key: &str) -> Self {
                Self(key.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(key: String) -> Self {
                Self(key)
            }
        }
    };
}

define_key! {
    /// Identifier of a location (node in the world graph).
    ///
    /// Only meaningful together with the [`WorldMode`] it was recorded under.
    ///
    /// [`WorldMode`]: crate::WorldMode
    LocationId
}

define_key! {
    /// Identifier of a tradeable item in the catalog.
    ItemId
}

define_id! {
    /// Unique identifier for a save snapshot.
    SnapshotId
}

define_id! {
    /// Handle returned when subscribing to the event bus.
    SubscriptionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_compare_by_content() {
        assert_eq!(LocationId::from("riverbank"), LocationId::new("riverbank"));
        assert_ne!(LocationId::from("riverbank"), LocationId::from("harbor"));
    }

    #[test]
    fn keys_serialize_as_plain_strings() {
        let json = serde_json::to_string(&ItemId::from("bread")).ok();
        assert_eq!(json.as_deref(), Some("\"bread\""));
    }

    #[test]
    fn snapshot_ids_are_unique() {
        assert_ne!(SnapshotId::new(), SnapshotId::new());
    }
}
