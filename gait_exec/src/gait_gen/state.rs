//! Implementations for the GaitGen state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;
use std::f64::consts::TAU;

// Internal
use super::{GaitGenError, Params, Waveform};
use crate::joint::{Joint, JointMap};
use crate::servo_ctrl::MAX_ANGLE_DEG;
use util::{maths::clamp, module::State};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gait generation module state
#[derive(Default)]
pub struct GaitGen {

    pub(crate) params: Params,

    pub(crate) report: StatusReport,

    pub(crate) output: Option<JointDemands>,
}

/// Input data to Gait Generation.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputData {
    /// Time since the gait was started.
    ///
    /// Units: seconds
    pub elapsed_s: f64
}

/// Angle demand for each joint, trimmed but not yet limited to the servo range.
#[derive(Clone, Copy, Serialize, Debug, Default, PartialEq)]
pub struct JointDemands {
    /// Units: degrees
    pub angle_deg: JointMap<f64>
}

/// Status report for GaitGen processing.
///
/// Holds every intermediate value of the cycle's waves.
#[derive(Clone, Copy, Default, Serialize, Debug, PartialEq)]
pub struct StatusReport {
    /// Knee wave before any clamping
    pub knee_raw_deg: f64,

    pub knee_a_deg: f64,
    pub knee_a_comp_deg: f64,
    pub knee_b_deg: f64,
    pub knee_b_comp_deg: f64,

    /// Ankle wave after clamping
    pub ankle_deg: f64,
    pub ankle_comp_deg: f64,

    pub knee_a_limited: bool,
    pub knee_b_limited: bool,
    pub ankle_limited: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for GaitGen {
    type InitData = Params;
    type InitError = GaitGenError;

    type InputData = InputData;
    type OutputData = JointDemands;
    type StatusReport = StatusReport;
    type ProcError = GaitGenError;

    /// Initialise the GaitGen module.
    ///
    /// Expected init data is the module parameters, which are validated.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        init_data.are_valid()?;

        self.params = init_data;
        self.report = StatusReport::default();
        self.output = None;

        Ok(())
    }

    /// Compute the joint demands for the given elapsed time.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let t = input_data.elapsed_s;

        if !t.is_finite() || t < 0.0 {
            return Err(GaitGenError::InvalidElapsedTime(t))
        }

        // Both waves share the same phase
        let wave = (TAU * self.params.motion_freq_hz * t + self.params.phase_offset_rad).cos();

        // ---- KNEES ----

        let knee_raw = self.params.knee_amplitude_deg * wave + self.params.centre_deg;

        let [a_min, a_max] = self.params.knee_a_window_deg;
        let [b_min, b_max] = self.params.knee_b_window_deg;
        let knee_a = clamp(knee_raw, a_min, a_max);
        let knee_b = clamp(knee_raw, b_min, b_max);

        // ---- ANKLES ----

        let ankle_raw = self.params.ankle_amplitude_deg * wave + self.params.centre_deg;

        let [ank_min, ank_max] = self.params.ankle_window_deg;
        let ankle = clamp(ankle_raw, ank_min, ank_max);

        self.report = StatusReport {
            knee_raw_deg: knee_raw,
            knee_a_deg: knee_a,
            knee_a_comp_deg: complement(knee_a),
            knee_b_deg: knee_b,
            knee_b_comp_deg: complement(knee_b),
            ankle_deg: ankle,
            ankle_comp_deg: complement(ankle),
            knee_a_limited: knee_a != knee_raw,
            knee_b_limited: knee_b != knee_raw,
            ankle_limited: ankle != ankle_raw,
        };

        // ---- JOINT ASSIGNMENT ----

        let report = self.report;
        let output = JointDemands {
            angle_deg: JointMap::from_fn(|joint| {
                let jp = self.params.joints[joint];
                report.waveform_deg(jp.waveform) + jp.trim_deg
            })
        };

        trace!(
            "GaitGen t = {:.6} s, knee_raw = {:.3}, ankle = {:.3}",
            t, knee_raw, ankle
        );

        self.output = Some(output);

        Ok((output, self.report))
    }
}

impl GaitGen {
    /// The parameters the module was initialised with.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The output of the last successful cycle, if any.
    pub fn output(&self) -> Option<JointDemands> {
        self.output
    }
}

impl StatusReport {
    /// Get the value of one of the waves in this report.
    pub fn waveform_deg(&self, waveform: Waveform) -> f64 {
        match waveform {
            Waveform::KneeA => self.knee_a_deg,
            Waveform::KneeAComp => self.knee_a_comp_deg,
            Waveform::KneeB => self.knee_b_deg,
            Waveform::KneeBComp => self.knee_b_comp_deg,
            Waveform::Ankle => self.ankle_deg,
            Waveform::AnkleComp => self.ankle_comp_deg,
        }
    }
}

impl JointDemands {
    /// Demand for one joint.
    pub fn get(&self, joint: Joint) -> f64 {
        self.angle_deg[joint]
    }
}

/// The angle of the counter-rotating servo.
fn complement(angle_deg: f64) -> f64 {
    MAX_ANGLE_DEG - angle_deg
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
