use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What to do with a context that never occurs in the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum UnseenContextPolicy {
    /// Every successor of the context is equally likely.
    #[default]
    Uniform,
    /// Building the profile fails.
    Reject,
}

/// Parameters of a genome profile.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileConfig {
    /// Word length.
    pub k: usize,
    /// Weight of the GC deviation, both when generating and when scoring.
    pub gc_weight: f64,
    /// Favour frequent words instead of rare ones.
    pub similar: bool,
    /// Target GC fraction replacing the one of the input.
    pub fixed_gc: Option<f64>,
    pub unseen_context_policy: UnseenContextPolicy,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            k: 8,
            gc_weight: 1.0,
            similar: false,
            fixed_gc: None,
            unseen_context_policy: UnseenContextPolicy::default(),
        }
    }
}

impl ProfileConfig {
    pub fn validate(&self) -> Result<()> {
        if self.k < 2 {
            return Err(Error::WordLengthTooShort(self.k));
        }

        if !self.gc_weight.is_finite() || self.gc_weight < 0.0 {
            return Err(Error::GcWeightInvalid(self.gc_weight));
        }

        if let Some(fixed_gc) = self.fixed_gc {
            if fixed_gc.is_nan() {
                return Err(Error::FixedGcIsNaN);
            }
            if !(0.0..=1.0).contains(&fixed_gc) {
                return Err(Error::FixedGcOutOfRange(fixed_gc));
            }
        }

        Ok(())
    }
}
