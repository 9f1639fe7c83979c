//! Wire-compatible enums
//!
//! Enumerations that are persisted or exchanged with callers keep a fixed
//! string spelling (`POS_SALE`, `SEMI_ANNUALLY`, ...). [`wire_enum!`] declares
//! such an enum together with its serde names, `as_str`, `Display` and
//! `FromStr`, so the storage layer and JSON bodies agree byte-for-byte.

use thiserror::Error;

/// Returned when a stored or supplied string matches no variant
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares an enum whose variants map one-to-one onto wire strings
///
/// ```
/// core_kernel::wire_enum! {
///     /// Side of a posting
///     pub enum Side {
///         Debit => "DEBIT",
///         Credit => "CREDIT",
///     }
/// }
///
/// assert_eq!(Side::Debit.as_str(), "DEBIT");
/// assert_eq!("CREDIT".parse::<Side>().unwrap(), Side::Credit);
/// ```
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The persisted spelling of this variant
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::wire::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err($crate::wire::UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}
