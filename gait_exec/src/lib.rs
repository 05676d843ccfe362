//! # Gait library.
//!
//! Drives the four servos of a walking robot's leg pair with an open loop oscillating gait. This
//! library holds everything except the executable's startup code, so that it can be tested and
//! benchmarked away from the robot.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Clocks and fixed rate cycle timing
pub mod cycle;

/// Gait generation - computes joint angle demands from the elapsed time
pub mod gait_gen;

/// Joint identification and per-joint data
pub mod joint;

/// Leg controller - owns the servos and time base and runs the init/run/shutdown sequence
pub mod leg_ctrl;

/// Parameters for the gait executable
pub mod params;

/// Servo control - converts angles to pulse widths and drives the PWM hardware
pub mod servo_ctrl;
