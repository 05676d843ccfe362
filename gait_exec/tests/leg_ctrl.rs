//! Leg controller behaviour, driven by the simulated servo driver and a manual clock.

use std::{sync::{Arc, atomic::{AtomicBool, Ordering}}, time::Duration};

use gait_lib::{
    cycle::{Clock, ManualClock},
    gait_gen::{self, GaitGen},
    joint::{Joint, JointMap, NUM_JOINTS},
    leg_ctrl::{self, LegCtrl, LegCtrlError, Phase, Step},
    servo_ctrl::{PulseMap, ServoCtrl, ServoError, ServoState, sim::SimDriver, HOME_ANGLE_DEG},
};
use util::module::State;

// ------------------------------------------------------------------------------------------------
// HELPERS
// ------------------------------------------------------------------------------------------------

const HOME_PULSE_NS: u64 = 1_500_000;

fn channels() -> JointMap<u8> {
    JointMap {
        ankle1: 26,
        knee1: 13,
        knee2: 25,
        ankle2: 12,
    }
}

fn build(driver: SimDriver) -> (LegCtrl<SimDriver, ManualClock>, Arc<AtomicBool>) {
    let servo_ctrl = ServoCtrl::new(driver, PulseMap::default(), &channels()).unwrap();

    let mut gait_gen = GaitGen::default();
    gait_gen.init(gait_gen::Params::default()).unwrap();

    let abort = Arc::new(AtomicBool::new(false));

    let ctrl = LegCtrl::new(
        servo_ctrl,
        gait_gen,
        ManualClock::new(),
        &leg_ctrl::Params::default(),
        abort.clone()
    ).unwrap();

    (ctrl, abort)
}

fn assert_all_home(ctrl: &LegCtrl<SimDriver, ManualClock>) {
    for &joint in Joint::ALL.iter() {
        let servo = ctrl.servo_ctrl().servo(joint);
        assert_eq!(servo.angle_deg, Some(HOME_ANGLE_DEG), "{} not home", joint);
        assert_eq!(servo.pulse_width_ns, Some(HOME_PULSE_NS), "{} not home", joint);

        let chan = ctrl.servo_ctrl().driver().channel(servo.channel).unwrap();
        assert_eq!(chan.pulse_width_ns, Some(HOME_PULSE_NS));
    }
}

fn assert_all_released(ctrl: &LegCtrl<SimDriver, ManualClock>) {
    for &joint in Joint::ALL.iter() {
        let servo = ctrl.servo_ctrl().servo(joint);
        assert_eq!(servo.state, ServoState::Released, "{} not released", joint);
        assert!(!ctrl.servo_ctrl().driver().channel(servo.channel).unwrap().enabled);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[test]
fn test_init_homes_servos() {
    let (mut ctrl, _) = build(SimDriver::new());

    assert_eq!(ctrl.phase(), Phase::Init);

    ctrl.init().unwrap();

    assert_eq!(ctrl.phase(), Phase::Running);
    assert_all_home(&ctrl);
    assert_eq!(ctrl.servo_ctrl().angles_deg(), [HOME_ANGLE_DEG; NUM_JOINTS]);

    // Time base starts after the servos have settled
    assert_eq!(ctrl.start_time(), Some(Duration::from_secs(1)));
    assert_eq!(ctrl.clock().now(), Duration::from_secs(1));

    // Can't initialise twice
    match ctrl.init() {
        Err(LegCtrlError::WrongPhase { phase: Phase::Running, .. }) => (),
        r => panic!("Expected wrong phase error, got {:?}", r)
    }
}

#[test]
fn test_step_before_init() {
    let (mut ctrl, _) = build(SimDriver::new());

    match ctrl.step() {
        Err(LegCtrlError::WrongPhase { phase: Phase::Init, .. }) => (),
        r => panic!("Expected wrong phase error, got {:?}", r)
    }
}

#[test]
fn test_first_cycle() {
    let (mut ctrl, _) = build(SimDriver::new());
    ctrl.init().unwrap();

    // The first cycle is at t = 0
    match ctrl.step().unwrap() {
        Step::Continue(demands) => {
            assert_eq!(demands.get(Joint::Ankle2), 175.0);
        },
        Step::Abort => panic!("Unexpected abort")
    }

    let servos = ctrl.servo_ctrl();
    assert_eq!(servos.servo(Joint::Knee1).angle_deg, Some(60.0));
    assert_eq!(servos.servo(Joint::Knee2).angle_deg, Some(90.0));
    assert_eq!(servos.servo(Joint::Ankle1).angle_deg, Some(180.0));
    assert_eq!(servos.servo(Joint::Ankle2).angle_deg, Some(175.0));

    assert_eq!(servos.servo(Joint::Ankle1).pulse_width_ns, Some(2_500_000));

    // The cycle waits out its period
    assert_eq!(ctrl.clock().now(), Duration::from_secs(1) + Duration::from_millis(1));
    assert_eq!(ctrl.cycle_stats().num_cycles, 1);
}

#[test]
fn test_running_respects_limits() {
    let (mut ctrl, _) = build(SimDriver::new());
    ctrl.init().unwrap();

    let map = *ctrl.servo_ctrl().pulse_map();

    for _ in 0..2000 {
        assert!(matches!(ctrl.step().unwrap(), Step::Continue(_)));

        for &joint in Joint::ALL.iter() {
            let servo = ctrl.servo_ctrl().servo(joint);
            let angle = servo.angle_deg.unwrap();
            let pulse = servo.pulse_width_ns.unwrap();

            assert!(angle >= 0.0 && angle <= 180.0);
            assert!(pulse >= (map.min_pulse_us * 1000.0) as u64);
            assert!(pulse <= (map.max_pulse_us * 1000.0) as u64);
        }

        let knee1 = ctrl.servo_ctrl().servo(Joint::Knee1).angle_deg.unwrap();
        let knee2 = ctrl.servo_ctrl().servo(Joint::Knee2).angle_deg.unwrap();
        assert!(knee1 >= 60.0 && knee1 <= 90.0);
        assert!(knee2 >= 90.0 && knee2 <= 135.0);
    }

    assert_eq!(ctrl.cycle_stats().num_overruns, 0);
}

#[test]
fn test_abort_shuts_down_within_one_cycle() {
    let (mut ctrl, abort) = build(SimDriver::new());
    ctrl.init().unwrap();

    for _ in 0..10 {
        ctrl.step().unwrap();
    }

    let writes_before = ctrl.servo_ctrl().driver().num_writes();

    abort.store(true, Ordering::SeqCst);

    // No gait demands are written once the abort is seen
    assert_eq!(ctrl.step().unwrap(), Step::Abort);
    assert_eq!(ctrl.servo_ctrl().driver().num_writes(), writes_before);

    ctrl.shutdown().unwrap();

    assert_eq!(ctrl.phase(), Phase::Shutdown);
    assert_all_home(&ctrl);
    assert_all_released(&ctrl);

    // Homing, then settling, then release
    assert_eq!(ctrl.servo_ctrl().driver().num_writes(), writes_before + NUM_JOINTS as u64);
}

#[test]
fn test_repeated_abort_request() {
    let (mut ctrl, abort) = build(SimDriver::new());
    ctrl.init().unwrap();

    // Only a repeated request is reported as such
    assert!(!leg_ctrl::request_abort(&abort));
    assert!(abort.load(Ordering::SeqCst));
    assert!(leg_ctrl::request_abort(&abort));

    assert_eq!(ctrl.step().unwrap(), Step::Abort);
}

#[test]
fn test_run_until_abort() {
    let (mut ctrl, abort) = build(SimDriver::new());

    // Abort requested before the first cycle, e.g. during the settle time
    abort.store(true, Ordering::SeqCst);

    ctrl.run().unwrap();

    assert_eq!(ctrl.phase(), Phase::Shutdown);
    assert_all_home(&ctrl);
    assert_all_released(&ctrl);
    assert_eq!(ctrl.cycle_stats().num_cycles, 0);

    // Settle after init and again at shutdown
    assert_eq!(ctrl.clock().now(), Duration::from_secs(2));
}

#[test]
fn test_write_fault_while_running() {
    // Writes 1-4 home the servos, 5 onwards are the gait, fail part way through the third cycle
    let (mut ctrl, _) = build(SimDriver::new().fail_write(4 + 2 * 4 + 2));

    match ctrl.run() {
        Err(LegCtrlError::ServoError(ServoError::Write { .. })) => (),
        r => panic!("Expected a write fault, got {:?}", r)
    }

    // The fault is one-shot so best-effort homing succeeds
    assert_eq!(ctrl.phase(), Phase::Shutdown);
    assert_all_home(&ctrl);
    assert_all_released(&ctrl);
    assert_eq!(ctrl.cycle_stats().num_cycles, 2);
}

#[test]
fn test_write_fault_during_init() {
    let (mut ctrl, _) = build(SimDriver::new().fail_write(1));

    assert!(ctrl.run().is_err());

    // Knee1 is written first and fails, the emergency stop still homes every servo
    assert_eq!(ctrl.phase(), Phase::Shutdown);
    assert_eq!(ctrl.start_time(), None);
    assert_all_home(&ctrl);
    assert_all_released(&ctrl);
}

#[test]
fn test_invalid_params() {
    let make = |params: leg_ctrl::Params| {
        let servo_ctrl = ServoCtrl::new(SimDriver::new(), PulseMap::default(), &channels())
            .unwrap();
        let mut gait_gen = GaitGen::default();
        gait_gen.init(gait_gen::Params::default()).unwrap();

        LegCtrl::new(
            servo_ctrl,
            gait_gen,
            ManualClock::new(),
            &params,
            Arc::new(AtomicBool::new(false))
        )
    };

    let defaults = leg_ctrl::Params::default();

    for params in [
        leg_ctrl::Params { cycle_period_s: 0.0, ..defaults },
        leg_ctrl::Params { cycle_period_s: -0.001, ..defaults },
        leg_ctrl::Params { settle_time_s: std::f64::NAN, ..defaults },
    ].iter() {
        match make(*params) {
            Err(LegCtrlError::InvalidParams(_)) => (),
            Err(e) => panic!("Unexpected error {}", e),
            Ok(_) => panic!("Expected {:?} to be rejected", params)
        }
    }
}
