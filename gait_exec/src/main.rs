//! # Gait Executable
//!
//! This executable drives the four servos of the leg pair with a continuous oscillating gait:
//!
//! - Initialise the session, logging and parameters
//! - Claim the servo channels on the configured driver
//! - Home the servos, then run the gait until Ctrl-C is pressed
//! - Home and release the servos

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{Result, eyre::{WrapErr, eyre}};
use log::{info, warn};
use std::sync::{Arc, atomic::AtomicBool};

// Internal
use gait_lib::{
    cycle::SystemClock,
    gait_gen::{self, GaitGen},
    leg_ctrl::{self, LegCtrl},
    params::{DriverKind, GaitExecParams},
    servo_ctrl::{ServoCtrl, ServoDriver, sim::SimDriver},
};
use util::{
    host,
    logger::logger_init,
    module::State,
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Executable parameter file, relative to the params directory.
const EXEC_PARAMS_FILE: &str = "gait_exec.toml";

/// Gait generation parameter file, relative to the params directory.
const GAIT_GEN_PARAMS_FILE: &str = "gait_gen.toml";

/// Exit code used when a repeated Ctrl-C forces the process to stop.
const ABORT_EXIT_CODE: i32 = 130;

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "gait_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // The log level comes from the parameters, so they're loaded before logging starts
    let params: GaitExecParams = util::params::load(EXEC_PARAMS_FILE)
        .wrap_err("Could not load exec params")?;

    // Initialise logger
    logger_init(params.log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Leg Pair Gait Executable\n");
    info!(
        "Running on: {:#?}",
        host::get_uname().wrap_err("Failed to get host information")?
    );
    info!("Session directory: {:?}\n", session.session_root);

    info!("Initialising...");

    // ---- LOAD PARAMETERS ----

    let gait_gen_params: gait_gen::Params = util::params::load(GAIT_GEN_PARAMS_FILE)
        .wrap_err("Could not load gait generation params")?;

    info!("Parameters loaded from {:?}", util::params::path(EXEC_PARAMS_FILE)?.parent());

    // ---- MODULE INITIALISATION ----

    let mut gait_gen = GaitGen::default();
    gait_gen.init(gait_gen_params)
        .wrap_err("Failed to initialise GaitGen")?;
    info!("GaitGen init complete");

    // ---- ABORT SIGNAL ----

    // The first Ctrl-C stops the gait and homes the servos. A second one exits immediately, in
    // case a servo write has hung.
    let abort = Arc::new(AtomicBool::new(false));
    {
        let abort = abort.clone();
        ctrlc::set_handler(move || {
            if leg_ctrl::request_abort(&abort) {
                warn!("Second Ctrl-C received, exiting without homing the servos");
                std::process::exit(ABORT_EXIT_CODE);
            }
            info!("Ctrl-C received, stopping");
        }).wrap_err("Failed to install the Ctrl-C handler")?;
    }

    // ---- DRIVER INITIALISATION ----

    info!("Using the {:?} servo driver", params.driver);

    match params.driver {
        DriverKind::Sim => run(SimDriver::new(), gait_gen, &params, abort),
        DriverKind::Gpio => run(gpio_driver()?, gait_gen, &params, abort),
        DriverKind::Pca9685 => run(pca9685_driver(&params)?, gait_gen, &params, abort),
    }?;

    // ---- SHUTDOWN ----

    info!("End of execution");

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Claim the servos on the given driver and run the leg controller until aborted.
fn run<D: ServoDriver>(
    driver: D,
    gait_gen: GaitGen,
    params: &GaitExecParams,
    abort: Arc<AtomicBool>
) -> Result<()> {

    // No motion is attempted if any channel can't be claimed
    let servo_ctrl = ServoCtrl::new(driver, params.pulse_map, &params.channels)
        .wrap_err("Failed to claim the servo channels")?;
    info!("Servo channels claimed");

    let mut leg_ctrl = LegCtrl::new(
        servo_ctrl,
        gait_gen,
        SystemClock::new(),
        &params.leg_ctrl,
        abort
    ).wrap_err("Failed to initialise the leg controller")?;

    info!("Initialisation complete, press Ctrl-C to stop\n");

    leg_ctrl.run().wrap_err("Leg controller stopped on a fault")
}

#[cfg(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64")))]
fn gpio_driver() -> Result<gait_lib::servo_ctrl::gpio::GpioDriver> {
    gait_lib::servo_ctrl::gpio::GpioDriver::new()
        .wrap_err("Failed to open the GPIO peripheral")
}

#[cfg(not(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64"))))]
fn gpio_driver() -> Result<SimDriver> {
    Err(eyre!("The gpio driver is only available on Raspberry Pi targets"))
}

#[cfg(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64")))]
fn pca9685_driver(
    params: &GaitExecParams
) -> Result<gait_lib::servo_ctrl::pca9685::Pca9685Driver<rppal::i2c::I2c>> {
    let i2c = rppal::i2c::I2c::with_bus(params.pca9685.i2c_bus)
        .wrap_err("Failed to open the I2C bus")?;

    let board = pwm_pca9685::Pca9685::new(i2c, pwm_pca9685::Address::from(params.pca9685.address))
        .map_err(|e| eyre!("Failed to initialise the PCA9685 board: {:?}", e))?;

    Ok(gait_lib::servo_ctrl::pca9685::Pca9685Driver::new(board))
}

#[cfg(not(all(target_os = "linux", any(target_arch = "arm", target_arch = "aarch64"))))]
fn pca9685_driver(_params: &GaitExecParams) -> Result<SimDriver> {
    Err(eyre!("The pca9685 driver is only available on Raspberry Pi targets"))
}
