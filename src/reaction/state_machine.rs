use std::time::Duration;

use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use super::{
    session::{Attempt, CompletedSession, Session},
    timer::ArmToken,
    variant::{GameVariant, PrematurePolicy},
};

/// Phases a reaction game goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionPhase {
    /// Waiting for the player to start.
    Idle,
    /// A random delay is running; the stimulus is not shown yet.
    Armed,
    /// The player responded before the stimulus and must acknowledge it.
    Premature,
    /// The stimulus is shown and the clock is running.
    Triggered,
    /// An attempt was just recorded; the next response re-arms.
    Measured,
    /// Every attempt of the session has been recorded.
    Completed,
}

impl ReactionPhase {
    /// Translation key describing the phase to the player.
    pub fn label_key(self) -> &'static str {
        match self {
            ReactionPhase::Idle => "phase.idle",
            ReactionPhase::Armed => "phase.armed",
            ReactionPhase::Premature => "phase.premature",
            ReactionPhase::Triggered => "phase.triggered",
            ReactionPhase::Measured => "phase.measured",
            ReactionPhase::Completed => "phase.completed",
        }
    }
}

/// Inputs accepted by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionEvent {
    /// Explicit start from idle.
    Begin,
    /// The player's single input action, stamped when the input arrived.
    Respond {
        /// Instant the input was received.
        at: Instant,
    },
    /// Dismiss the premature-response notice.
    Acknowledge,
    /// The pre-stimulus timer elapsed.
    StimulusFired {
        /// Arm the timer was scheduled for.
        token: ArmToken,
        /// Instant the stimulus was presented.
        at: Instant,
    },
    /// Tear the game down.
    Cancel,
}

/// Side effects requested by a transition; the driver performs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start the single-shot pre-stimulus timer.
    Schedule {
        /// Token the fire must carry back.
        token: ArmToken,
        /// Delay before the stimulus.
        delay: Duration,
    },
    /// Abort the pending timer.
    CancelTimer {
        /// Token of the timer to abort.
        token: ArmToken,
    },
    /// Send the finished session to the result service.
    Submit(CompletedSession),
}

/// Result of applying an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Phase after the transition.
    pub phase: ReactionPhase,
    /// Effects to perform, in order.
    pub effects: Vec<Effect>,
}

/// Error returned when an event cannot be applied from the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// Phase the machine was in.
    pub from: ReactionPhase,
    /// Rejected event.
    pub event: ReactionEvent,
}

/// Trial currently waiting for, or showing, its stimulus.
#[derive(Debug, Clone, Copy)]
struct Trial {
    token: ArmToken,
    delay: Duration,
    stimulus_at: Option<Instant>,
}

/// Parametrized stimulus/response state machine shared by all game variants.
///
/// The machine never touches a clock or a timer itself: timestamps arrive with
/// events and timers are requested through [`Effect`]s, which keeps every
/// transition deterministic.
#[derive(Debug)]
pub struct ReactionMachine<R = StdRng> {
    variant: GameVariant,
    phase: ReactionPhase,
    session: Option<Session>,
    trial: Option<Trial>,
    last_latency_ms: Option<u32>,
    arm_seq: u32,
    rng: R,
}

impl ReactionMachine<StdRng> {
    /// Create an idle machine seeded from the operating system.
    pub fn new(variant: GameVariant) -> Self {
        Self::with_rng(variant, StdRng::from_os_rng())
    }

    /// Create an idle machine with reproducible delays.
    pub fn seeded(variant: GameVariant, seed: u64) -> Self {
        Self::with_rng(variant, StdRng::seed_from_u64(seed))
    }
}

impl<R: rand::Rng> ReactionMachine<R> {
    /// Create an idle machine drawing delays from `rng`.
    pub fn with_rng(variant: GameVariant, rng: R) -> Self {
        Self {
            variant,
            phase: ReactionPhase::Idle,
            session: None,
            trial: None,
            last_latency_ms: None,
            arm_seq: 0,
            rng,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> ReactionPhase {
        self.phase
    }

    /// Parameters the machine was built with.
    pub fn variant(&self) -> &GameVariant {
        &self.variant
    }

    /// Session in progress, if a trial has started since the last reset.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Latencies recorded in the current session.
    pub fn attempts(&self) -> Vec<u32> {
        self.session
            .as_ref()
            .map(Session::latencies)
            .unwrap_or_default()
    }

    /// Latency of the most recent attempt of the current session.
    pub fn last_latency_ms(&self) -> Option<u32> {
        self.last_latency_ms
    }

    /// Session average, available in the completed phase.
    pub fn average_ms(&self) -> Option<u32> {
        self.session.as_ref().and_then(Session::average_ms)
    }

    /// Token of the timer the machine is waiting on.
    pub fn pending_timer(&self) -> Option<ArmToken> {
        match (self.phase, &self.trial) {
            (ReactionPhase::Armed, Some(trial)) => Some(trial.token),
            _ => None,
        }
    }

    /// Delay drawn for the current trial.
    pub fn scheduled_delay(&self) -> Option<Duration> {
        self.trial.map(|trial| trial.delay)
    }

    /// Start a session from idle.
    pub fn begin(&mut self) -> Result<Outcome, InvalidTransition> {
        self.handle(ReactionEvent::Begin)
    }

    /// Apply the player's input received at `at`.
    pub fn respond(&mut self, at: Instant) -> Outcome {
        // every phase accepts a response
        self.handle(ReactionEvent::Respond { at })
            .unwrap_or_else(|_| self.unchanged())
    }

    /// Dismiss the premature-response notice.
    pub fn acknowledge(&mut self) -> Result<Outcome, InvalidTransition> {
        self.handle(ReactionEvent::Acknowledge)
    }

    /// Deliver a timer fire.
    pub fn stimulus_fired(&mut self, token: ArmToken, at: Instant) -> Outcome {
        self.handle(ReactionEvent::StimulusFired { token, at })
            .unwrap_or_else(|_| self.unchanged())
    }

    /// Tear down: cancel any pending timer and drop the session.
    pub fn cancel(&mut self) -> Outcome {
        self.handle(ReactionEvent::Cancel)
            .unwrap_or_else(|_| self.unchanged())
    }

    /// Apply an event, returning the next phase and the effects to perform.
    pub fn handle(&mut self, event: ReactionEvent) -> Result<Outcome, InvalidTransition> {
        use ReactionPhase::*;

        let outcome = match (self.phase, event) {
            (Idle, ReactionEvent::Begin | ReactionEvent::Respond { .. })
            | (Measured, ReactionEvent::Respond { .. }) => self.arm(),
            (Armed, ReactionEvent::Respond { .. }) => self.premature(),
            (Premature, ReactionEvent::Respond { .. } | ReactionEvent::Acknowledge) => {
                self.phase = Idle;
                self.unchanged()
            }
            (Triggered, ReactionEvent::Respond { at }) => self.measure(at),
            (Completed, ReactionEvent::Respond { .. }) => {
                self.reset();
                self.unchanged()
            }
            (Armed, ReactionEvent::StimulusFired { token, at })
                if self.pending_timer() == Some(token) =>
            {
                self.trigger(at)
            }
            (phase, ReactionEvent::StimulusFired { token, .. }) => {
                debug!(?phase, ?token, "ignoring stale stimulus timer");
                self.unchanged()
            }
            (_, ReactionEvent::Cancel) => {
                let effects = self
                    .pending_timer()
                    .map(|token| Effect::CancelTimer { token })
                    .into_iter()
                    .collect();
                self.reset();
                Outcome {
                    phase: self.phase,
                    effects,
                }
            }
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(outcome)
    }

    fn arm(&mut self) -> Outcome {
        let target = self.variant.attempts;
        let session = self.session.get_or_insert_with(|| Session::new(target));
        self.arm_seq = self.arm_seq.wrapping_add(1);
        let token = ArmToken {
            session: session.id(),
            seq: self.arm_seq,
        };
        let delay = self.variant.delay.sample(&mut self.rng);

        self.trial = Some(Trial {
            token,
            delay,
            stimulus_at: None,
        });
        self.phase = ReactionPhase::Armed;

        Outcome {
            phase: self.phase,
            effects: vec![Effect::Schedule { token, delay }],
        }
    }

    fn premature(&mut self) -> Outcome {
        let effects = self
            .trial
            .take()
            .map(|trial| Effect::CancelTimer { token: trial.token })
            .into_iter()
            .collect();

        if self.variant.premature == PrematurePolicy::ResetSession {
            self.session = None;
            self.last_latency_ms = None;
        }
        self.phase = ReactionPhase::Premature;

        Outcome {
            phase: self.phase,
            effects,
        }
    }

    fn trigger(&mut self, at: Instant) -> Outcome {
        if let Some(trial) = self.trial.as_mut() {
            trial.stimulus_at = Some(at);
        }
        self.phase = ReactionPhase::Triggered;
        self.unchanged()
    }

    fn measure(&mut self, at: Instant) -> Outcome {
        let Some(Trial {
            delay,
            stimulus_at: Some(stimulus_at),
            ..
        }) = self.trial.take()
        else {
            // no stimulus was stamped; nothing to measure
            self.phase = ReactionPhase::Idle;
            return self.unchanged();
        };

        let elapsed = at.saturating_duration_since(stimulus_at).as_millis();
        let latency_ms = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.last_latency_ms = Some(latency_ms);

        let target = self.variant.attempts;
        let session = self.session.get_or_insert_with(|| Session::new(target));
        session.record(Attempt {
            scheduled_delay: delay,
            latency_ms,
        });

        match session.completed(&self.variant.test_type) {
            Some(done) => {
                self.phase = ReactionPhase::Completed;
                Outcome {
                    phase: self.phase,
                    effects: vec![Effect::Submit(done)],
                }
            }
            None => {
                self.phase = ReactionPhase::Measured;
                self.unchanged()
            }
        }
    }

    fn reset(&mut self) {
        self.session = None;
        self.trial = None;
        self.last_latency_ms = None;
        self.phase = ReactionPhase::Idle;
    }

    fn unchanged(&self) -> Outcome {
        Outcome {
            phase: self.phase,
            effects: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reaction::timer::DelayRange;

    fn machine(attempts: usize) -> ReactionMachine {
        ReactionMachine::seeded(GameVariant::reaction_time().with_attempts(attempts), 7)
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    /// Arm (from idle or measured), fire the timer at `stimulus`, respond
    /// `latency` later.
    fn play(sm: &mut ReactionMachine, stimulus: Instant, latency: u64) -> Outcome {
        let arm = sm.respond(stimulus);
        let Some(Effect::Schedule { token, .. }) = arm.effects.first().cloned() else {
            panic!("expected a scheduled timer, got {arm:?}");
        };
        assert_eq!(sm.stimulus_fired(token, stimulus).phase, ReactionPhase::Triggered);
        sm.respond(stimulus + ms(latency))
    }

    #[test]
    fn initial_state_is_idle() {
        let sm = machine(5);
        assert_eq!(sm.phase(), ReactionPhase::Idle);
        assert!(sm.session().is_none());
    }

    #[test]
    fn begin_arms_with_delay_in_range() {
        let mut sm = machine(5);
        let outcome = sm.begin().unwrap();
        assert_eq!(outcome.phase, ReactionPhase::Armed);
        match outcome.effects.as_slice() {
            [Effect::Schedule { delay, .. }] => {
                assert!(DelayRange::default().contains(*delay));
                assert_eq!(sm.scheduled_delay(), Some(*delay));
            }
            other => panic!("unexpected effects: {other:?}"),
        }
    }

    #[test]
    fn begin_outside_idle_is_rejected() {
        let mut sm = machine(5);
        sm.begin().unwrap();
        let err = sm.begin().unwrap_err();
        assert_eq!(err.from, ReactionPhase::Armed);
        assert_eq!(err.event, ReactionEvent::Begin);
    }

    #[test]
    fn acknowledge_is_only_valid_after_premature() {
        let mut sm = machine(5);
        assert!(sm.acknowledge().is_err());
    }

    #[test]
    fn quick_response_after_stimulus_is_measured() {
        let mut sm = machine(5);
        let t0 = Instant::now();
        let outcome = play(&mut sm, t0, 4);
        assert_eq!(outcome.phase, ReactionPhase::Measured);
        let latency = sm.last_latency_ms().unwrap();
        assert!(latency <= 5);
        assert_eq!(sm.attempts(), vec![latency]);
    }

    #[test]
    fn response_before_stimulus_is_premature() {
        let mut sm = machine(5);
        let t0 = Instant::now();
        let arm = sm.begin().unwrap();
        let Effect::Schedule { token, delay } = arm.effects[0].clone() else {
            panic!("expected schedule");
        };
        assert!(delay >= ms(1_000));

        let outcome = sm.respond(t0 + ms(10));
        assert_eq!(outcome.phase, ReactionPhase::Premature);
        assert_eq!(outcome.effects, vec![Effect::CancelTimer { token }]);
        assert!(sm.attempts().is_empty());

        assert_eq!(sm.acknowledge().unwrap().phase, ReactionPhase::Idle);
    }

    #[test]
    fn premature_responses_never_record_attempts() {
        let mut sm = machine(5);
        let t0 = Instant::now();
        for step in 0..60 {
            let outcome = sm.respond(t0 + ms(step));
            assert!(sm.attempts().is_empty());
            assert_ne!(outcome.phase, ReactionPhase::Triggered);
            assert_ne!(outcome.phase, ReactionPhase::Measured);
        }

        // the only way out of armed is premature, and premature leads to idle
        let mut sm = machine(5);
        sm.begin().unwrap();
        assert_eq!(sm.respond(t0).phase, ReactionPhase::Premature);
        assert_eq!(sm.respond(t0).phase, ReactionPhase::Idle);
    }

    #[test]
    fn stale_timer_fire_is_ignored() {
        let mut sm = machine(5);
        let t0 = Instant::now();
        let first = sm.begin().unwrap();
        let Effect::Schedule { token: stale, .. } = first.effects[0].clone() else {
            panic!("expected schedule");
        };
        sm.respond(t0);
        sm.acknowledge().unwrap();
        sm.begin().unwrap();

        let outcome = sm.stimulus_fired(stale, t0 + ms(2_000));
        assert_eq!(outcome.phase, ReactionPhase::Armed);
        assert!(outcome.effects.is_empty());
    }

    #[test]
    fn every_arm_draws_a_fresh_token_and_delay() {
        let mut sm = machine(5);
        let t0 = Instant::now();
        let mut tokens = Vec::new();
        let mut delays = Vec::new();
        for _ in 0..5 {
            let arm = sm.respond(t0);
            let Effect::Schedule { token, delay } = arm.effects[0].clone() else {
                panic!("expected schedule");
            };
            tokens.push(token);
            delays.push(delay);
            sm.stimulus_fired(token, t0);
            sm.respond(t0 + ms(200));
        }
        tokens.dedup();
        assert_eq!(tokens.len(), 5);
        delays.sort();
        delays.dedup();
        assert!(delays.len() > 1);
    }

    #[test]
    fn completes_after_target_attempts_with_average() {
        let mut sm = machine(5);
        let t0 = Instant::now();
        let latencies = [200, 250, 300, 220, 280];

        let mut last = None;
        for (index, latency) in latencies.into_iter().enumerate() {
            let stimulus = t0 + ms(10_000 * index as u64);
            last = Some(play(&mut sm, stimulus, latency));
        }

        let outcome = last.unwrap();
        assert_eq!(outcome.phase, ReactionPhase::Completed);
        assert_eq!(sm.average_ms(), Some(250));
        match outcome.effects.as_slice() {
            [Effect::Submit(done)] => {
                assert_eq!(done.attempts, vec![200, 250, 300, 220, 280]);
                assert_eq!(done.average_ms, 250);
                assert_eq!(done.test_type, "reaction-time");
            }
            other => panic!("unexpected effects: {other:?}"),
        }

        assert_eq!(sm.respond(t0).phase, ReactionPhase::Idle);
        assert!(sm.session().is_none());
    }

    #[test]
    fn latency_never_goes_negative() {
        let mut sm = machine(5);
        let t0 = Instant::now() + ms(500);
        let arm = sm.begin().unwrap();
        let Effect::Schedule { token, .. } = arm.effects[0].clone() else {
            panic!("expected schedule");
        };
        sm.stimulus_fired(token, t0);
        sm.respond(t0 - ms(3));
        assert_eq!(sm.last_latency_ms(), Some(0));
    }

    #[test]
    fn retry_policy_keeps_attempts_on_premature() {
        let mut sm = machine(5);
        let t0 = Instant::now();
        play(&mut sm, t0, 210);
        sm.respond(t0);
        assert_eq!(sm.respond(t0).phase, ReactionPhase::Premature);
        assert_eq!(sm.attempts(), vec![210]);
    }

    #[test]
    fn reset_policy_discards_attempts_on_premature() {
        let variant = GameVariant::reaction_time()
            .with_attempts(3)
            .with_premature_policy(PrematurePolicy::ResetSession);
        let mut sm = ReactionMachine::seeded(variant, 3);
        let t0 = Instant::now();
        play(&mut sm, t0, 210);
        sm.respond(t0);
        sm.respond(t0);
        assert!(sm.attempts().is_empty());
        assert!(sm.session().is_none());
    }

    #[test]
    fn cancel_clears_pending_timer_and_session() {
        let mut sm = machine(5);
        let arm = sm.begin().unwrap();
        let Effect::Schedule { token, .. } = arm.effects[0].clone() else {
            panic!("expected schedule");
        };
        let outcome = sm.cancel();
        assert_eq!(outcome.phase, ReactionPhase::Idle);
        assert_eq!(outcome.effects, vec![Effect::CancelTimer { token }]);
        assert!(sm.session().is_none());
        assert!(sm.pending_timer().is_none());
    }
}
