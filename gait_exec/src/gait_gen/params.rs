//! Parameters structure for GaitGen

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::GaitGenError;
use crate::joint::JointMap;
use crate::servo_ctrl::{MIN_ANGLE_DEG, MAX_ANGLE_DEG};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for gait generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {

    // ---- WAVEFORM ----

    /// Amplitude of the ankle wave.
    ///
    /// Units: degrees
    pub ankle_amplitude_deg: f64,

    /// Amplitude of the knee wave.
    ///
    /// Units: degrees
    pub knee_amplitude_deg: f64,

    /// Centre of both waves.
    ///
    /// Units: degrees
    pub centre_deg: f64,

    /// Frequency of the gait motion.
    ///
    /// Units: hertz
    pub motion_freq_hz: f64,

    /// Phase added to the wave argument, `cos(2*pi*f*t + phase)`.
    ///
    /// Units: radians
    pub phase_offset_rad: f64,

    // ---- LIMITS ----

    /// Window the first knee wave is clamped to, `[min, max]`.
    ///
    /// Units: degrees
    pub knee_a_window_deg: [f64; 2],

    /// Window the second knee wave is clamped to, `[min, max]`.
    ///
    /// Units: degrees
    pub knee_b_window_deg: [f64; 2],

    /// Window the ankle wave is clamped to, `[min, max]`.
    ///
    /// Units: degrees
    pub ankle_window_deg: [f64; 2],

    // ---- WIRING ----

    /// Which wave drives each joint, and the joint's trim.
    pub joints: JointMap<JointParams>,
}

/// How a joint is driven.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointParams {
    /// The wave the joint follows, set by the mounting orientation of the servo horn.
    pub waveform: Waveform,

    /// Offset added to the wave before it is sent to the servo.
    ///
    /// Units: degrees
    #[serde(default)]
    pub trim_deg: f64,
}

/// The waves a joint can follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    /// Knee wave clamped to the A window
    KneeA,

    /// `180 - KneeA`
    KneeAComp,

    /// Knee wave clamped to the B window
    KneeB,

    /// `180 - KneeB`
    KneeBComp,

    /// Ankle wave
    Ankle,

    /// `180 - Ankle`
    AnkleComp,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    /// The calibration of the reference leg pair.
    fn default() -> Self {
        Self {
            ankle_amplitude_deg: 90.0,
            knee_amplitude_deg: 60.0,
            centre_deg: 90.0,
            motion_freq_hz: 555.5,
            phase_offset_rad: 0.0,
            knee_a_window_deg: [90.0, 120.0],
            knee_b_window_deg: [45.0, 90.0],
            ankle_window_deg: [0.0, 180.0],
            joints: JointMap {
                ankle1: JointParams { waveform: Waveform::Ankle, trim_deg: 0.0 },
                knee1: JointParams { waveform: Waveform::KneeAComp, trim_deg: 0.0 },
                knee2: JointParams { waveform: Waveform::KneeBComp, trim_deg: 0.0 },
                ankle2: JointParams { waveform: Waveform::Ankle, trim_deg: -5.0 },
            },
        }
    }
}

impl Params {

    /// Determines if the parameters are valid.
    pub fn are_valid(&self) -> Result<(), GaitGenError> {
        let finite = [
            ("ankle_amplitude_deg", self.ankle_amplitude_deg),
            ("knee_amplitude_deg", self.knee_amplitude_deg),
            ("centre_deg", self.centre_deg),
            ("motion_freq_hz", self.motion_freq_hz),
            ("phase_offset_rad", self.phase_offset_rad),
        ];

        for (name, value) in finite.iter() {
            if !value.is_finite() {
                return Err(GaitGenError::InvalidParams(format!(
                    "{} must be finite, found {}", name, value
                )))
            }
        }

        if self.motion_freq_hz < 0.0 {
            return Err(GaitGenError::InvalidParams(format!(
                "motion_freq_hz must not be negative, found {}", self.motion_freq_hz
            )))
        }

        let windows = [
            ("knee_a_window_deg", self.knee_a_window_deg),
            ("knee_b_window_deg", self.knee_b_window_deg),
            ("ankle_window_deg", self.ankle_window_deg),
        ];

        for (name, [min, max]) in windows.iter() {
            if !(min <= max) || *min < MIN_ANGLE_DEG || *max > MAX_ANGLE_DEG {
                return Err(GaitGenError::InvalidParams(format!(
                    "{} must satisfy {} <= min <= max <= {}, found [{}, {}]",
                    name, MIN_ANGLE_DEG, MAX_ANGLE_DEG, min, max
                )))
            }
        }

        for (joint, jp) in self.joints.iter() {
            if !jp.trim_deg.is_finite() {
                return Err(GaitGenError::InvalidParams(format!(
                    "trim of {} must be finite, found {}", joint, jp.trim_deg
                )))
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::joint::Joint;

    #[test]
    fn test_default_params_valid() {
        assert!(Params::default().are_valid().is_ok());
    }

    #[test]
    fn test_shipped_params_match_default() {
        let params: Params = util::params::parse(
            include_str!("../../../params/gait_gen.toml")
        ).unwrap();

        assert_eq!(params, Params::default());
    }

    #[test]
    fn test_invalid_params() {
        let mut params = Params::default();
        params.knee_a_window_deg = [120.0, 90.0];
        assert!(params.are_valid().is_err());

        let mut params = Params::default();
        params.ankle_window_deg = [-10.0, 180.0];
        assert!(params.are_valid().is_err());

        let mut params = Params::default();
        params.knee_b_window_deg = [std::f64::NAN, 90.0];
        assert!(params.are_valid().is_err());

        let mut params = Params::default();
        params.motion_freq_hz = -1.0;
        assert!(params.are_valid().is_err());

        let mut params = Params::default();
        params.ankle_amplitude_deg = std::f64::INFINITY;
        assert!(params.are_valid().is_err());

        let mut params = Params::default();
        params.joints[Joint::Knee1].trim_deg = std::f64::NAN;
        assert!(params.are_valid().is_err());
    }
}
