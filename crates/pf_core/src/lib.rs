//! pf_core: Core types, params, ordering helpers, and seeded sampling RNG.
//!
//! This crate is **I/O-free**. It defines stable types/APIs used across the
//! engine (`pf_algo`, `pf_pipeline`, `pf_io`, `pf_report`, `pf_cli`).
//!
//! - Registry tokens: `AreaCode`, `UnitId` (hierarchy `coarse-locality-precinct`)
//! - Entities: `UnitRecord`, `Dataset`, `Prediction`, `AggregateResult`
//! - Engine configuration: `Params` (bucket width, distance toggles)
//! - Deterministic selection helpers
//! - Seedable RNG (ChaCha20) for **sampling only**
//!
//! Serialization derives are gated behind the `serde` feature.

#![forbid(unsafe_code)]

pub mod errors {
    use core::fmt;

    /// Error set for core-domain validation & parsing.
    #[derive(Clone, Debug, Eq, PartialEq)]
    pub enum CoreError {
        InvalidToken,
        InvalidBucketWidth,
        DuplicateUnit(String),
        OptionCountMismatch { unit: String, expected: usize, got: usize },
        DomainOutOfRange(&'static str),
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::InvalidToken => write!(f, "invalid token"),
                CoreError::InvalidBucketWidth => write!(f, "size bucket width must be > 0"),
                CoreError::DuplicateUnit(id) => write!(f, "duplicate unit id: {id}"),
                CoreError::OptionCountMismatch { unit, expected, got } => {
                    write!(f, "unit {unit}: expected {expected} options, got {got}")
                }
                CoreError::DomainOutOfRange(k) => write!(f, "domain out of range: {k}"),
            }
        }
    }

    impl std::error::Error for CoreError {}
}

pub mod ids {
    //! Registry token types (`AreaCode`, `UnitId`) with strict charset.

    use crate::errors::CoreError;
    use core::fmt;
    use core::str::FromStr;

    #[cfg(feature = "serde")]
    use serde::{Deserialize, Serialize};

    fn is_token(s: &str) -> bool {
        let len = s.len();
        if !(1..=64).contains(&len) { return false; }
        s.bytes().all(|b| matches!(b,
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' |
            b'_' | b'-' | b':' | b'.'
        ))
    }

    macro_rules! def_token {
        ($(#[$meta:meta])* $name:ident) => {
            $(#[$meta])*
            #[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
            #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
            #[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
            pub struct $name(String);

            impl $name {
                pub fn as_str(&self) -> &str { &self.0 }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
            }

            impl FromStr for $name {
                type Err = CoreError;
                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    if is_token(s) { Ok(Self(s.to_string())) } else { Err(CoreError::InvalidToken) }
                }
            }

            impl TryFrom<String> for $name {
                type Error = CoreError;
                fn try_from(s: String) -> Result<Self, Self::Error> {
                    if is_token(&s) { Ok(Self(s)) } else { Err(CoreError::InvalidToken) }
                }
            }

            impl From<$name> for String {
                fn from(t: $name) -> String { t.0 }
            }
        }
    }

    def_token!(
        /// One level of the area hierarchy (coarse region or locality code).
        AreaCode
    );
    def_token!(
        /// Stable unit identifier, `coarse-locality-precinct`.
        UnitId
    );

    impl UnitId {
        /// Compose an id from the three hierarchy levels.
        pub fn from_parts(coarse: &AreaCode, locality: &AreaCode, precinct: &str) -> Result<Self, CoreError> {
            format!("{coarse}-{locality}-{precinct}").parse()
        }
    }

}

pub mod determinism;
pub mod entities;
pub mod rng;
pub mod variables;

pub use entities::{AggregateResult, Dataset, Prediction, SizeBucket, Tallied, UnitRecord};
pub use errors::CoreError;
pub use ids::{AreaCode, UnitId};
pub use variables::Params;
