mod common;

use common::MockClock;
use sampler_core::power::{
    AuxRail, NoAuxRail, PowerConfig, PowerLine, PowerSequencer, RAIL_ENABLE_ATTEMPTS, RailStatus,
};
use sampler_core::retry::{RetryOutcome, RetryPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOp {
    Drive(bool),
    Release,
}

#[derive(Default)]
struct MockLine {
    ops: Vec<LineOp>,
}

impl PowerLine for MockLine {
    fn drive(&mut self, high: bool) {
        self.ops.push(LineOp::Drive(high));
    }

    fn release(&mut self) {
        self.ops.push(LineOp::Release);
    }
}

/// Rail that reports enabled once `enabled_after` enable requests were made.
#[derive(Default)]
struct MockRail {
    enabled_after: Option<u8>,
    enable_calls: u8,
    disable_calls: u8,
}

impl MockRail {
    fn acknowledging_after(calls: u8) -> Self {
        Self {
            enabled_after: Some(calls),
            ..Self::default()
        }
    }

    fn never_acknowledging() -> Self {
        Self::default()
    }
}

impl AuxRail for MockRail {
    fn is_enabled(&self) -> bool {
        self.enabled_after
            .is_some_and(|after| self.enable_calls >= after)
    }

    fn enable(&mut self) {
        self.enable_calls += 1;
    }

    fn disable(&mut self) {
        self.disable_calls += 1;
    }
}

#[test]
fn already_enabled_rail_is_requested_once() {
    let clock = MockClock::starting_at(500);
    let mut sequencer = PowerSequencer::new(
        MockLine::default(),
        MockRail::acknowledging_after(0),
        clock.clone(),
        clock.clone(),
    );

    let transition = sequencer.set_power(true);

    assert_eq!(sequencer.rail().enable_calls, 1);
    assert_eq!(
        transition.rail,
        RailStatus::Enabled(RetryOutcome::Satisfied { attempts: 1 })
    );
    assert_eq!(transition.timestamp_ms, 500);
    assert!(clock.delays().is_empty());
    assert_eq!(sequencer.line().ops, vec![LineOp::Drive(true)]);
    assert_eq!(sequencer.state().rail_attempts, 1);
}

#[test]
fn silent_rail_gets_five_attempts_ten_ms_apart() {
    let clock = MockClock::starting_at(2_000);
    let mut sequencer = PowerSequencer::new(
        MockLine::default(),
        MockRail::never_acknowledging(),
        clock.clone(),
        clock.clone(),
    );

    let transition = sequencer.set_power(true);

    assert_eq!(sequencer.rail().enable_calls, RAIL_ENABLE_ATTEMPTS);
    assert_eq!(clock.delays(), vec![10, 10, 10, 10]);
    assert_eq!(
        transition.rail,
        RailStatus::Enabled(RetryOutcome::Exhausted { attempts: 5 })
    );
    assert!(!transition.rail_acknowledged());
    assert_eq!(transition.timestamp_ms, 2_000, "stamped at the first attempt");
    assert!(sequencer.state().on);
    assert_eq!(sequencer.state().last_transition_ms, Some(2_000));
}

#[test]
fn slow_rail_stops_retrying_once_enabled() {
    let clock = MockClock::starting_at(0);
    let mut sequencer = PowerSequencer::new(
        MockLine::default(),
        MockRail::acknowledging_after(3),
        clock.clone(),
        clock.clone(),
    );

    let transition = sequencer.set_power(true);

    assert_eq!(sequencer.rail().enable_calls, 3);
    assert_eq!(clock.delays(), vec![10, 10]);
    assert!(transition.rail_acknowledged());
    assert_eq!(clock.current(), 20);
}

#[test]
fn power_off_releases_line_and_disables_rail() {
    let clock = MockClock::starting_at(100);
    let mut sequencer = PowerSequencer::new(
        MockLine::default(),
        MockRail::acknowledging_after(1),
        clock.clone(),
        clock.clone(),
    );

    sequencer.set_power(true);
    clock.advance(900);
    let transition = sequencer.set_power(false);

    assert_eq!(
        sequencer.line().ops,
        vec![LineOp::Drive(true), LineOp::Drive(false), LineOp::Release]
    );
    assert_eq!(sequencer.rail().disable_calls, 1);
    assert_eq!(transition.rail, RailStatus::Disabled);
    assert_eq!(transition.timestamp_ms, 1_000);
    assert!(!sequencer.state().on);
}

#[test]
fn custom_retry_policy_is_honoured() {
    let clock = MockClock::starting_at(0);
    let mut sequencer = PowerSequencer::with_config(
        MockLine::default(),
        MockRail::never_acknowledging(),
        clock.clone(),
        clock.clone(),
        PowerConfig::new(RetryPolicy::new(2, 25)),
    );

    let transition = sequencer.set_power(true);

    assert_eq!(
        transition.rail,
        RailStatus::Enabled(RetryOutcome::Exhausted { attempts: 2 })
    );
    assert_eq!(clock.delays(), vec![25]);
}

#[test]
fn primary_line_only_build_never_touches_a_rail() {
    let clock = MockClock::starting_at(42);
    let mut sequencer =
        PowerSequencer::new(MockLine::default(), NoAuxRail::new(), clock.clone(), clock.clone());

    let on = sequencer.set_power(true);
    let off = sequencer.set_power(false);

    assert_eq!(on.rail, RailStatus::Absent);
    assert_eq!(off.rail, RailStatus::Absent);
    assert!(clock.delays().is_empty());
    let (line, _, _, _) = sequencer.into_parts();
    assert_eq!(
        line.ops,
        vec![LineOp::Drive(true), LineOp::Drive(false), LineOp::Release]
    );
}
