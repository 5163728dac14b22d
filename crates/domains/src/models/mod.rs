//! # Domain Models
//!
//! These structs represent the core entities of ProchePro.
//! We use UUID v7 for time-ordered, globally unique identification.

/// Implements `as_str` / `FromStr` / `Display` for a status-like enum stored
/// as lowercase text.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::str::FromStr for $ty {
            type Err = crate::errors::DomainError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(crate::errors::DomainError::Internal(format!(
                        "unknown {} value: {other}",
                        stringify!($ty)
                    ))),
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use text_enum;

pub mod booking;
pub mod catalog;
pub mod content;
pub mod credit;
pub mod email;
pub mod review;
pub mod support;
pub mod task;
pub mod telegram;
pub mod user;

pub use booking::*;
pub use catalog::*;
pub use content::*;
pub use credit::*;
pub use email::*;
pub use review::*;
pub use support::*;
pub use task::*;
pub use telegram::*;
pub use user::*;
