//! [`ServoDriver`] implementation using the Raspberry Pi's GPIO pins
//!
//! Each servo signal is wired to its own GPIO pin, driven with `rppal`'s software PWM. Channel
//! numbers are BCM pin numbers.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{collections::HashMap, time::Duration};
use rppal::gpio::{Gpio, OutputPin};

use super::{ServoDriver, ServoError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Software PWM on GPIO pins.
pub struct GpioDriver {
    gpio: Gpio,

    /// Claimed pins and the PWM period of each
    pins: HashMap<u8, (OutputPin, Duration)>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GpioDriver {
    /// Open the GPIO peripheral.
    pub fn new() -> Result<Self, rppal::gpio::Error> {
        Ok(Self {
            gpio: Gpio::new()?,
            pins: HashMap::new(),
        })
    }
}

impl ServoDriver for GpioDriver {
    fn claim(&mut self, channel: u8, frequency_hz: f64) -> Result<(), ServoError> {
        if self.pins.contains_key(&channel) {
            return Err(ServoError::ChannelClaim {
                channel,
                reason: String::from("pin is already claimed"),
            })
        }

        let period = match util::time::seconds_to_duration(1.0 / frequency_hz) {
            Some(p) => p,
            None => return Err(ServoError::ChannelClaim {
                channel,
                reason: format!("invalid PWM frequency {} Hz", frequency_hz),
            })
        };

        let mut pin = self.gpio
            .get(channel)
            .map_err(|e| ServoError::ChannelClaim {
                channel,
                reason: e.to_string(),
            })?
            .into_output_low();

        // Return the pin to its original state if we exit without releasing it
        pin.set_reset_on_drop(true);

        self.pins.insert(channel, (pin, period));

        Ok(())
    }

    fn set_pulse_width(&mut self, channel: u8, pulse_width_ns: u64) -> Result<(), ServoError> {
        let (pin, period) = self.pins
            .get_mut(&channel)
            .ok_or(ServoError::ChannelNotClaimed(channel))?;

        pin.set_pwm(*period, Duration::from_nanos(pulse_width_ns))
            .map_err(|e| ServoError::Write {
                channel,
                reason: e.to_string(),
            })
    }

    fn release(&mut self, channel: u8) -> Result<(), ServoError> {
        let (pin, _) = self.pins
            .get_mut(&channel)
            .ok_or(ServoError::ChannelNotClaimed(channel))?;

        pin.clear_pwm().map_err(|e| ServoError::Release {
            channel,
            reason: e.to_string(),
        })?;
        pin.set_low();

        Ok(())
    }
}
