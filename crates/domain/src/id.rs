//! Typed identifier newtypes backed by strings.
//!
//! Device and tenant identifiers are assigned by the device registry, not by
//! this system, so they are opaque strings rather than generated values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is the empty string.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self::new(s))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

define_id!(
    /// Identity of a field device publishing telemetry and receiving commands.
    DeviceId
);

define_id!(
    /// Tenant the devices belong to in the command-and-control service.
    TenantId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_inner_value() {
        let id = DeviceId::new("d1");
        assert_eq!(id.to_string(), "d1");
        assert_eq!(id.as_str(), "d1");
    }

    #[test]
    fn should_compare_equal_when_values_match() {
        assert_eq!(DeviceId::from("d1"), DeviceId::new(String::from("d1")));
        assert_ne!(DeviceId::from("d1"), DeviceId::from("d2"));
    }

    #[test]
    fn should_serialize_transparently() {
        let id = TenantId::new("acme");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"acme\"");
    }

    #[test]
    fn should_parse_from_str() {
        let id: TenantId = "acme".parse().unwrap();
        assert_eq!(id, TenantId::new("acme"));
    }

    #[test]
    fn should_report_empty_identifier() {
        assert!(TenantId::new("").is_empty());
        assert!(!TenantId::new("acme").is_empty());
    }
}
