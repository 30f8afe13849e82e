//! Stable string identifiers.
//!
//! Every identifier is a cheap-to-clone `Arc<str>` newtype. The empty string
//! is the "zero" identifier: it is representable so that lookups can return a
//! sentinel, but every mutation rejects it.

use std::{borrow::Borrow, fmt, sync::Arc};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Create an identifier from any string-like value.
            pub fn new(id: impl AsRef<str>) -> Self {
                Self(Arc::from(id.as_ref()))
            }

            /// The zero (empty) identifier.
            pub fn zero() -> Self {
                Self(Arc::from(""))
            }

            /// Whether this is the zero identifier.
            pub fn is_zero(&self) -> bool {
                self.0.is_empty()
            }

            /// Borrow the identifier text.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::zero()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({:?})"), &*self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(Arc::from(id))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Identifies one module slot (e.g. `"compliance"`, `"transfer-engine"`).
    ///
    /// A key's identity is permanent: once registered it is present in every
    /// later global version.
    ModuleKey
}

define_id! {
    /// Caller-chosen name of a configuration (e.g. `"Equity"`, `"Bond"`).
    ConfigurationId
}

define_id! {
    /// Stable name of one callable capability exposed by a module.
    OperationId
}

define_id! {
    /// Identity of the principal performing a mutation.
    CallerId
}
