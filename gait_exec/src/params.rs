//! # Gait Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use util::logger::LevelFilter;

use crate::{joint::JointMap, leg_ctrl, servo_ctrl::PulseMap};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct GaitExecParams {

    /// Most verbose level which will be logged. Per-cycle angles are logged at `debug`.
    pub log_level: LevelFilter,

    /// Hardware used to generate the servo PWM signals
    pub driver: DriverKind,

    /// Driver channel each joint's servo is connected to
    pub channels: JointMap<u8>,

    /// Angle to pulse width mapping shared by all servos
    pub pulse_map: PulseMap,

    /// Settings for the PCA9685 board, only used with `driver = "pca9685"`
    #[serde(default)]
    pub pca9685: Pca9685Params,

    /// Leg controller timing
    pub leg_ctrl: leg_ctrl::Params,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Pca9685Params {
    /// I2C bus the board is on
    pub i2c_bus: u8,

    /// 7-bit I2C address of the board
    pub address: u8,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Available servo drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// Simulated output, only logged
    Sim,

    /// Software PWM on Raspberry Pi GPIO pins, channels are BCM pin numbers
    Gpio,

    /// PCA9685 16 channel board over I2C, channels are board channels
    Pca9685,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for GaitExecParams {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::Debug,
            driver: DriverKind::Sim,
            channels: JointMap {
                ankle1: 26,
                knee1: 13,
                knee2: 25,
                ankle2: 12,
            },
            pulse_map: PulseMap::default(),
            pca9685: Pca9685Params::default(),
            leg_ctrl: leg_ctrl::Params::default(),
        }
    }
}

impl Default for Pca9685Params {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            address: 0x40,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shipped_params() {
        let params: GaitExecParams = util::params::parse(
            include_str!("../../params/gait_exec.toml")
        ).unwrap();
        let default = GaitExecParams::default();

        assert_eq!(params.log_level, default.log_level);
        assert_eq!(params.driver, default.driver);
        assert_eq!(params.channels, default.channels);
        assert_eq!(params.pulse_map, default.pulse_map);
        assert_eq!(params.pca9685, default.pca9685);
        assert_eq!(params.leg_ctrl, default.leg_ctrl);
    }

    #[test]
    fn test_driver_kind() {
        #[derive(Deserialize)]
        struct Wrapper {
            driver: DriverKind,
        }

        let w: Wrapper = util::params::parse("driver = \"pca9685\"").unwrap();
        assert_eq!(w.driver, DriverKind::Pca9685);

        let w: Wrapper = util::params::parse("driver = \"gpio\"").unwrap();
        assert_eq!(w.driver, DriverKind::Gpio);

        assert!(util::params::parse::<Wrapper>("driver = \"servokit\"").is_err());
    }
}
