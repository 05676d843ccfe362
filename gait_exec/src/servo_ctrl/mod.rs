//! # Servo Controller Module
//!
//! This module provides a unified servo control interface which can abstract over different types
//! of PWM hardware. A [`ServoCtrl`] owns one [`ServoDriver`] and the four joint [`Servo`]s bound
//! to its channels, and converts angle demands into pulse widths using a shared [`PulseMap`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// [`ServoDriver`] implementation for the Adafruit PCA9685 16 channel servo driver board.
pub mod pca9685;

/// [`ServoDriver`] implementation using the Raspberry Pi's GPIO pins directly.
#[cfg(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64")))]
pub mod gpio;

/// Simulated [`ServoDriver`] which records the output of each channel.
pub mod sim;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, trace};
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::joint::{Joint, JointMap, NUM_JOINTS};
use util::maths::{clamp, lin_map};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Carrier frequency of the servo PWM signal.
///
/// Units: hertz
pub const PWM_FREQUENCY_HZ: f64 = 50.0;

/// Minimum commandable servo angle.
///
/// Units: degrees
pub const MIN_ANGLE_DEG: f64 = 0.0;

/// Maximum commandable servo angle.
///
/// Units: degrees
pub const MAX_ANGLE_DEG: f64 = 180.0;

/// The home (safe) angle, commanded at startup and shutdown.
///
/// Units: degrees
pub const HOME_ANGLE_DEG: f64 = 90.0;

/// Number of nanoseconds in a microsecond
const NANOS_PER_MICRO: f64 = 1000.0;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Trait to provide a unified API for accessing PWM hardware.
///
/// Channels are identified by a number, the meaning of which depends on the driver (a GPIO pin
/// number or a board channel for example).
pub trait ServoDriver {

    /// Claim a channel and configure it to output PWM at the given carrier frequency.
    ///
    /// The output must stay low until the first pulse width is written.
    fn claim(&mut self, channel: u8, frequency_hz: f64) -> Result<(), ServoError>;

    /// Set the high time of the PWM signal on a claimed channel.
    ///
    /// ## Arguments
    /// - `channel` - The channel to set the pulse width for
    /// - `pulse_width_ns` - The high time of each period, in nanoseconds
    fn set_pulse_width(&mut self, channel: u8, pulse_width_ns: u64) -> Result<(), ServoError>;

    /// Stop the PWM output on a channel. Releasing an already released channel is not an error.
    fn release(&mut self, channel: u8) -> Result<(), ServoError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Linear mapping between servo angle and PWM pulse width, shared by all servos.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseMap {
    /// Pulse width corresponding to 0 degrees.
    ///
    /// Units: microseconds
    pub min_pulse_us: f64,

    /// Pulse width corresponding to 180 degrees.
    ///
    /// Units: microseconds
    pub max_pulse_us: f64,
}

/// A single positional servo bound to a driver channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Servo {
    /// The joint this servo actuates
    pub joint: Joint,

    /// Driver channel the servo is connected to
    pub channel: u8,

    /// PWM carrier frequency of the channel
    ///
    /// Units: hertz
    pub frequency_hz: f64,

    /// Last commanded angle, after clamping, or `None` if no angle has been commanded yet.
    ///
    /// Units: degrees
    pub angle_deg: Option<f64>,

    /// Last pulse width written to the channel.
    ///
    /// Units: nanoseconds
    pub pulse_width_ns: Option<u64>,

    /// Current output state
    pub state: ServoState,
}

/// Controller which owns the driver and all joint servos.
pub struct ServoCtrl<D>
where
    D: ServoDriver
{
    driver: D,

    pulse_map: PulseMap,

    servos: JointMap<Servo>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Output state of a servo channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoState {
    /// The channel is claimed and outputting PWM.
    Active,

    /// The channel output has been disabled.
    Released,
}

#[derive(Error, Debug)]
pub enum ServoError {
    #[error("Cannot claim channel {channel}: {reason}")]
    ChannelClaim {
        channel: u8,
        reason: String,
    },

    #[error("Channel {0} is used by more than one joint")]
    DuplicateChannel(u8),

    #[error("Channel {0} has not been claimed")]
    ChannelNotClaimed(u8),

    #[error("Cannot command the {0} servo as it has been released")]
    Released(Joint),

    #[error("Failed to write to channel {channel}: {reason}")]
    Write {
        channel: u8,
        reason: String,
    },

    #[error("Failed to release channel {channel}: {reason}")]
    Release {
        channel: u8,
        reason: String,
    },

    #[error("An I2C error occured")]
    I2c,

    #[error("Invalid pulse map: {0}")]
    InvalidPulseMap(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for PulseMap {
    fn default() -> Self {
        Self {
            min_pulse_us: 500.0,
            max_pulse_us: 2500.0,
        }
    }
}

impl PulseMap {

    /// Check that the map produces pulses that fit inside a PWM period.
    pub fn are_valid(&self) -> Result<(), ServoError> {
        let period_us = 1e6 / PWM_FREQUENCY_HZ;

        if !self.min_pulse_us.is_finite() || !self.max_pulse_us.is_finite() {
            return Err(ServoError::InvalidPulseMap(String::from("pulse widths must be finite")))
        }
        if self.min_pulse_us <= 0.0 {
            return Err(ServoError::InvalidPulseMap(format!(
                "minimum pulse must be positive, found {} us", self.min_pulse_us
            )))
        }
        if self.min_pulse_us >= self.max_pulse_us {
            return Err(ServoError::InvalidPulseMap(format!(
                "minimum pulse ({} us) must be less than maximum pulse ({} us)",
                self.min_pulse_us, self.max_pulse_us
            )))
        }
        if self.max_pulse_us >= period_us {
            return Err(ServoError::InvalidPulseMap(format!(
                "maximum pulse ({} us) must be shorter than the PWM period ({} us)",
                self.max_pulse_us, period_us
            )))
        }

        Ok(())
    }

    /// Limit an angle to the commandable range.
    ///
    /// Out of range angles are never an error. A `NaN` angle clamps to [`MAX_ANGLE_DEG`].
    pub fn clamp_angle(angle_deg: f64) -> f64 {
        clamp(angle_deg, MIN_ANGLE_DEG, MAX_ANGLE_DEG)
    }

    /// Get the pulse width for an angle, after clamping.
    ///
    /// Units: microseconds
    pub fn pulse_width_us(&self, angle_deg: f64) -> f64 {
        lin_map(
            (MIN_ANGLE_DEG, MAX_ANGLE_DEG),
            (self.min_pulse_us, self.max_pulse_us),
            Self::clamp_angle(angle_deg)
        )
    }

    /// Get the pulse width for an angle in nanoseconds, truncated towards zero.
    pub fn pulse_width_ns(&self, angle_deg: f64) -> u64 {
        (self.pulse_width_us(angle_deg) * NANOS_PER_MICRO).floor() as u64
    }
}

impl Servo {
    /// The name of the servo, the same as its joint's.
    pub fn name(&self) -> &'static str {
        self.joint.name()
    }
}

impl<D> ServoCtrl<D>
where
    D: ServoDriver
{
    /// Create a new servo controller.
    ///
    /// Every joint's channel is claimed on the driver at [`PWM_FREQUENCY_HZ`]. Any failure to
    /// claim a channel is returned immediately, no output is produced in that case.
    ///
    /// ## Arguments
    /// - `driver` - An initialised [`ServoDriver`]
    /// - `pulse_map` - Angle to pulse width mapping shared by all servos
    /// - `channels` - The driver channel of each joint
    pub fn new(
        mut driver: D,
        pulse_map: PulseMap,
        channels: &JointMap<u8>
    ) -> Result<Self, ServoError> {

        pulse_map.are_valid()?;

        // Each joint must be on its own channel
        for (joint, channel) in channels.iter() {
            if channels.iter().any(|(j, c)| j != joint && c == channel) {
                return Err(ServoError::DuplicateChannel(*channel))
            }
        }

        for (joint, &channel) in channels.iter() {
            driver.claim(channel, PWM_FREQUENCY_HZ)?;
            debug!("Claimed channel {} for the {} servo", channel, joint);
        }

        let servos = JointMap::from_fn(|joint| Servo {
            joint,
            channel: channels[joint],
            frequency_hz: PWM_FREQUENCY_HZ,
            angle_deg: None,
            pulse_width_ns: None,
            state: ServoState::Active,
        });

        Ok(Self {
            driver,
            pulse_map,
            servos,
        })
    }

    /// Command a servo to an angle.
    ///
    /// The angle is clamped to [`MIN_ANGLE_DEG`, `MAX_ANGLE_DEG`] before being converted to a
    /// pulse width, out of range demands are never rejected. Write failures are returned to the
    /// caller without retrying.
    pub fn set_angle(&mut self, joint: Joint, angle_deg: f64) -> Result<(), ServoError> {
        let servo = &mut self.servos[joint];

        if servo.state == ServoState::Released {
            return Err(ServoError::Released(joint))
        }

        let clamped_deg = PulseMap::clamp_angle(angle_deg);
        let pulse_width_ns = self.pulse_map.pulse_width_ns(clamped_deg);

        self.driver.set_pulse_width(servo.channel, pulse_width_ns)?;

        trace!(
            "{}: {:.3} deg (demand {:.3} deg) -> {} ns",
            joint, clamped_deg, angle_deg, pulse_width_ns
        );

        servo.angle_deg = Some(clamped_deg);
        servo.pulse_width_ns = Some(pulse_width_ns);

        Ok(())
    }

    /// Command every servo to the same angle, in [`Joint::WRITE_ORDER`].
    pub fn set_all(&mut self, angle_deg: f64) -> Result<(), ServoError> {
        for &joint in Joint::WRITE_ORDER.iter() {
            self.set_angle(joint, angle_deg)?;
        }

        Ok(())
    }

    /// Disable the output of a servo. Does nothing if the servo is already released.
    pub fn release(&mut self, joint: Joint) -> Result<(), ServoError> {
        let servo = &mut self.servos[joint];

        if servo.state == ServoState::Released {
            return Ok(())
        }

        self.driver.release(servo.channel)?;
        servo.state = ServoState::Released;

        debug!("Released the {} servo (channel {})", joint, servo.channel);

        Ok(())
    }

    /// Release every servo.
    ///
    /// All servos are attempted even if one fails, the first error is returned.
    pub fn release_all(&mut self) -> Result<(), ServoError> {
        let mut first_err = None;

        for &joint in Joint::ALL.iter() {
            if let Err(e) = self.release(joint) {
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(())
        }
    }

    /// Get the servo for a joint.
    pub fn servo(&self, joint: Joint) -> &Servo {
        &self.servos[joint]
    }

    /// Get the last commanded angle of every servo, `NaN` where no angle has been commanded.
    pub fn angles_deg(&self) -> [f64; NUM_JOINTS] {
        let mut angles = [std::f64::NAN; NUM_JOINTS];

        for (i, &joint) in Joint::ALL.iter().enumerate() {
            if let Some(a) = self.servos[joint].angle_deg {
                angles[i] = a;
            }
        }

        angles
    }

    /// The pulse map used by this controller.
    pub fn pulse_map(&self) -> &PulseMap {
        &self.pulse_map
    }

    /// Access the underlying driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
