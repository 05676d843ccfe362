//! [`ServoDriver`] implementation for the PCA9685 driver
//!
//! The board has a single prescaler shared by all 16 channels, so every claimed channel must use
//! [`PWM_FREQUENCY_HZ`]. Writing the prescaler puts the whole board to sleep, so it is only
//! written on the first claim. Pulse widths are converted to 12 bit counts of the PWM period.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use pwm_pca9685::{Channel, Pca9685};
use embedded_hal::blocking::i2c::{Write, WriteRead};

use super::{ServoDriver, ServoError, PWM_FREQUENCY_HZ};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of counts in one PWM period.
const MAX_PWM: u64 = 4096;

/// Frequency of the board's internal oscillator.
///
/// Units: hertz
const OSC_CLOCK_HZ: f64 = 25_000_000.0;

/// Number of channels on one board.
pub const NUM_CHANNELS: u8 = 16;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Servo driver for one PCA9685 board.
pub struct Pca9685Driver<I2C> {
    board: Pca9685<I2C>,

    /// Whether the prescaler has been set and the oscillator enabled
    configured: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<I2C> Pca9685Driver<I2C> {
    /// Wrap a board which has not been configured yet.
    pub fn new(board: Pca9685<I2C>) -> Self {
        Self {
            board,
            configured: false,
        }
    }
}

impl<I2C, E> ServoDriver for Pca9685Driver<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>
{
    fn claim(&mut self, channel: u8, frequency_hz: f64) -> Result<(), ServoError> {
        let board_channel = match to_board_channel(channel) {
            Some(c) => c,
            None => return Err(ServoError::ChannelClaim {
                channel,
                reason: format!("the board only has {} channels", NUM_CHANNELS),
            })
        };

        if (frequency_hz - PWM_FREQUENCY_HZ).abs() > std::f64::EPSILON {
            return Err(ServoError::ChannelClaim {
                channel,
                reason: format!(
                    "the board runs at {} Hz, cannot use {} Hz", PWM_FREQUENCY_HZ, frequency_hz
                ),
            })
        }

        let claim_err = |_| ServoError::ChannelClaim {
            channel,
            reason: String::from("I2C communication with the board failed"),
        };

        // Keep the output low until the first pulse is written
        if self.configured {
            return self.board.set_channel_full_off(board_channel).map_err(claim_err)
        }

        self.board.set_prescale(prescale(frequency_hz)).map_err(claim_err)?;
        self.board.set_channel_full_off(board_channel).map_err(claim_err)?;
        self.board.enable().map_err(claim_err)?;
        self.configured = true;

        Ok(())
    }

    fn set_pulse_width(&mut self, channel: u8, pulse_width_ns: u64) -> Result<(), ServoError> {
        let board_channel = to_board_channel(channel)
            .ok_or(ServoError::ChannelNotClaimed(channel))?;

        let off_count = match pulse_to_counts(pulse_width_ns, PWM_FREQUENCY_HZ) {
            Some(c) => c,
            None => return Err(ServoError::Write {
                channel,
                reason: format!("a {} ns pulse does not fit in the PWM period", pulse_width_ns),
            })
        };

        match self.board.set_channel_on_off(board_channel, 0, off_count) {
            Ok(_) => Ok(()),
            Err(pwm_pca9685::Error::I2C(_)) => Err(ServoError::I2c),
            Err(pwm_pca9685::Error::InvalidInputData) => Err(ServoError::Write {
                channel,
                reason: String::from("the board rejected the pulse width"),
            })
        }
    }

    fn release(&mut self, channel: u8) -> Result<(), ServoError> {
        let board_channel = to_board_channel(channel)
            .ok_or(ServoError::ChannelNotClaimed(channel))?;

        self.board.set_channel_full_off(board_channel).map_err(|_| ServoError::Release {
            channel,
            reason: String::from("I2C communication with the board failed"),
        })
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Get the prescale value which gives the closest PWM frequency to `frequency_hz`.
///
/// The board does not accept values below 3.
pub fn prescale(frequency_hz: f64) -> u8 {
    let value = (OSC_CLOCK_HZ / (MAX_PWM as f64 * frequency_hz)).round() - 1.0;

    util::maths::clamp(value, 3.0, 255.0) as u8
}

/// Convert a pulse width into the number of counts the output is high for, truncated.
///
/// Returns `None` if the pulse is not shorter than the period.
pub fn pulse_to_counts(pulse_width_ns: u64, frequency_hz: f64) -> Option<u16> {
    let period_ns = (1e9 / frequency_hz) as u64;

    if pulse_width_ns >= period_ns {
        return None
    }

    Some((pulse_width_ns * MAX_PWM / period_ns) as u16)
}

/// Map a channel number onto the board's channel type.
fn to_board_channel(channel: u8) -> Option<Channel> {
    let c = match channel {
        0 => Channel::C0,
        1 => Channel::C1,
        2 => Channel::C2,
        3 => Channel::C3,
        4 => Channel::C4,
        5 => Channel::C5,
        6 => Channel::C6,
        7 => Channel::C7,
        8 => Channel::C8,
        9 => Channel::C9,
        10 => Channel::C10,
        11 => Channel::C11,
        12 => Channel::C12,
        13 => Channel::C13,
        14 => Channel::C14,
        15 => Channel::C15,
        _ => return None
    };

    Some(c)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
