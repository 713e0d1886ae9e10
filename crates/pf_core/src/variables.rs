//! variables.rs: engine configuration passed explicitly to every run.
//!
//! Nothing here is process-wide state: bucket widths and distance toggles
//! travel with `Params` so the same engine serves any election/option count.

use crate::entities::SizeBucket;
use crate::errors::CoreError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What the distance does when a unit's participation rate is undefined
/// (`total_voters == 0`) and the participation term is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum UndefinedParticipation {
    /// Abort with a division-by-zero error.
    #[default]
    Fail,
    /// Treat the participation rate as 0.
    Zero,
}

/// Engine parameters (all fields have defaults).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct Params {
    /// Width of the electorate bucket used as the size-class key.
    pub size_bucket_width: u64,
    /// Add `|attendanceA*100 - attendanceB*100|` to the share distance.
    pub participation_term: bool,
    pub undefined_participation: UndefinedParticipation,
    /// Units with zero electorate (in either period) never act as donors; observed ones stay
    /// ground truth, unobserved ones are matched on shares alone.
    pub exclude_zero_electorate_references: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            size_bucket_width: SizeBucket::DEFAULT_WIDTH,
            participation_term: true,
            undefined_participation: UndefinedParticipation::Fail,
            exclude_zero_electorate_references: true,
        }
    }
}

impl Params {
    pub fn size_bucket(&self) -> Result<SizeBucket, CoreError> {
        SizeBucket::new(self.size_bucket_width)
    }
}

/// Domain checks that serde defaults cannot express.
pub fn validate_domains(p: &Params) -> Result<(), CoreError> {
    if p.size_bucket_width == 0 {
        return Err(CoreError::DomainOutOfRange("size_bucket_width"));
    }
    Ok(())
}
