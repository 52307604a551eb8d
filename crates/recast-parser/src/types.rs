//! Newtype wrappers for string identifiers carried in a layer description.
//!
//! All newtypes serialize/deserialize as plain strings.

use recast_rules::UNKNOWN_FAMILY;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Base OS family name as declared by an OS profile, or `unknown`.
    OsFamily
);

string_newtype!(
    /// Display label of one provenance layer, usually the short base image name.
    LayerLabel
);

impl OsFamily {
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_FAMILY)
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_FAMILY
    }
}

impl Default for OsFamily {
    fn default() -> Self {
        Self::unknown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_family_defaults_to_unknown() {
        let fam = OsFamily::default();
        assert!(fam.is_unknown());
        assert_eq!(fam, "unknown");
    }

    #[test]
    fn os_family_serializes_as_plain_string() {
        let fam = OsFamily::new("alpine");
        let json = serde_json::to_string(&fam).unwrap();
        assert_eq!(json, "\"alpine\"");
        let back: OsFamily = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fam);
    }

    #[test]
    fn layer_label_display_and_deref() {
        let label = LayerLabel::from("baseimage-alpine:3.21");
        assert_eq!(label.to_string(), "baseimage-alpine:3.21");
        assert!(label.starts_with("baseimage"));
        assert_eq!(label.into_inner(), "baseimage-alpine:3.21");
    }
}
