//! Simulated [`ServoDriver`]
//!
//! Used when running away from the robot and in tests. Each claimed channel records its carrier
//! frequency, last pulse width and whether it is enabled. Faults can be injected to exercise the
//! claim and write failure paths.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::{HashMap, HashSet};
use log::trace;

use super::{ServoDriver, ServoError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// In-memory PWM output.
#[derive(Debug, Default)]
pub struct SimDriver {
    channels: HashMap<u8, SimChannel>,

    /// Channels which will refuse to be claimed
    unavailable: HashSet<u8>,

    /// Number of the write (starting at 1) which will fail, if any
    fail_write_num: Option<u64>,

    num_writes: u64,
}

/// State of a simulated channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimChannel {
    /// Units: hertz
    pub frequency_hz: f64,

    /// Units: nanoseconds
    pub pulse_width_ns: Option<u64>,

    pub enabled: bool,

    pub num_writes: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the given channels fail to be claimed.
    pub fn with_unavailable_channels(mut self, channels: &[u8]) -> Self {
        self.unavailable.extend(channels.iter().copied());
        self
    }

    /// Make the `n`th pulse width write (counting from 1, across all channels) fail. Only that
    /// write fails, later writes succeed.
    pub fn fail_write(mut self, n: u64) -> Self {
        self.fail_write_num = Some(n);
        self
    }

    /// Get the state of a claimed channel.
    pub fn channel(&self, channel: u8) -> Option<&SimChannel> {
        self.channels.get(&channel)
    }

    /// Total number of pulse width writes attempted.
    pub fn num_writes(&self) -> u64 {
        self.num_writes
    }
}

impl ServoDriver for SimDriver {
    fn claim(&mut self, channel: u8, frequency_hz: f64) -> Result<(), ServoError> {
        if self.unavailable.contains(&channel) {
            return Err(ServoError::ChannelClaim {
                channel,
                reason: String::from("channel is unavailable"),
            })
        }
        if self.channels.contains_key(&channel) {
            return Err(ServoError::ChannelClaim {
                channel,
                reason: String::from("channel is already claimed"),
            })
        }

        self.channels.insert(channel, SimChannel {
            frequency_hz,
            pulse_width_ns: None,
            enabled: true,
            num_writes: 0,
        });

        Ok(())
    }

    fn set_pulse_width(&mut self, channel: u8, pulse_width_ns: u64) -> Result<(), ServoError> {
        self.num_writes += 1;

        if self.fail_write_num == Some(self.num_writes) {
            return Err(ServoError::Write {
                channel,
                reason: String::from("injected fault"),
            })
        }

        let chan = self.channels
            .get_mut(&channel)
            .ok_or(ServoError::ChannelNotClaimed(channel))?;

        chan.pulse_width_ns = Some(pulse_width_ns);
        chan.enabled = true;
        chan.num_writes += 1;

        trace!("Sim channel {}: {} ns", channel, pulse_width_ns);

        Ok(())
    }

    fn release(&mut self, channel: u8) -> Result<(), ServoError> {
        let chan = self.channels
            .get_mut(&channel)
            .ok_or(ServoError::ChannelNotClaimed(channel))?;

        chan.enabled = false;

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_double_claim_fails() {
        let mut driver = SimDriver::new();

        driver.claim(3, 50.0).unwrap();

        match driver.claim(3, 50.0) {
            Err(ServoError::ChannelClaim { channel: 3, .. }) => (),
            r => panic!("Expected claim error, got {:?}", r)
        }
    }

    #[test]
    fn test_unclaimed_channel() {
        let mut driver = SimDriver::new();

        match driver.set_pulse_width(7, 1_500_000) {
            Err(ServoError::ChannelNotClaimed(7)) => (),
            r => panic!("Expected not claimed error, got {:?}", r)
        }
        assert!(driver.release(7).is_err());
    }

    #[test]
    fn test_write_and_release() {
        let mut driver = SimDriver::new();

        driver.claim(1, 50.0).unwrap();
        driver.set_pulse_width(1, 1_000_000).unwrap();
        driver.set_pulse_width(1, 2_000_000).unwrap();

        let chan = driver.channel(1).unwrap();
        assert_eq!(chan.pulse_width_ns, Some(2_000_000));
        assert_eq!(chan.num_writes, 2);
        assert!(chan.enabled);

        driver.release(1).unwrap();
        driver.release(1).unwrap();
        assert!(!driver.channel(1).unwrap().enabled);
        assert_eq!(driver.num_writes(), 2);
    }
}
