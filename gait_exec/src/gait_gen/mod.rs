//! Gait generation module
//!
//! Computes the four joint angle demands of the leg pair from the elapsed time. Both the knees and
//! the ankles follow the same cosine wave, each knee limited to its own window, and each joint
//! takes either the wave or its complement (`180 - x`) plus a fixed trim.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during GaitGen operation.
#[derive(Debug, thiserror::Error)]
pub enum GaitGenError {
    #[error("Invalid gait parameters: {0}")]
    InvalidParams(String),

    #[error("Elapsed time must be finite and non-negative, found {0} s")]
    InvalidElapsedTime(f64),
}
