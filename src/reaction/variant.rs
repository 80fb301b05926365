//! Per-game parameters of the shared reaction machine.

use super::timer::DelayRange;

/// What a premature response costs the player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrematurePolicy {
    /// Keep attempts recorded so far; only the current trial is lost.
    #[default]
    Retry,
    /// Discard the whole session and start over.
    ResetSession,
}

/// Parameters distinguishing one reaction game from another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameVariant {
    /// Human readable name.
    pub name: String,
    /// Leaderboard key results are submitted under.
    pub test_type: String,
    /// Number of valid attempts in a session.
    pub attempts: usize,
    /// Bounds of the random pre-stimulus delay.
    pub delay: DelayRange,
    /// Behaviour on a premature response.
    pub premature: PrematurePolicy,
}

impl GameVariant {
    /// Build a variant with default parameters (5 attempts, 1–5 s delay).
    pub fn new(name: impl Into<String>, test_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            test_type: test_type.into(),
            attempts: 5,
            delay: DelayRange::default(),
            premature: PrematurePolicy::default(),
        }
    }

    /// Classic visual reaction test.
    pub fn reaction_time() -> Self {
        Self::new("Reaction Time", "reaction-time")
    }

    /// Respond to a sound cue instead of a color change.
    pub fn audio_reaction() -> Self {
        Self::new("Audio Reaction", "audio-reaction")
            .with_delay(DelayRange::from_millis(1_500, 4_500))
    }

    /// Shorter, stricter color-change test.
    pub fn color_change() -> Self {
        Self::new("Color Change", "color-change")
            .with_attempts(3)
            .with_delay(DelayRange::from_millis(2_000, 6_000))
            .with_premature_policy(PrematurePolicy::ResetSession)
    }

    /// Look up a built-in variant by its test type.
    pub fn preset(test_type: &str) -> Option<Self> {
        match test_type {
            "reaction-time" => Some(Self::reaction_time()),
            "audio-reaction" => Some(Self::audio_reaction()),
            "color-change" => Some(Self::color_change()),
            _ => None,
        }
    }

    /// Override the number of attempts (at least one).
    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Override the delay bounds.
    pub fn with_delay(mut self, delay: DelayRange) -> Self {
        self.delay = delay;
        self
    }

    /// Override the premature-response policy.
    pub fn with_premature_policy(mut self, policy: PrematurePolicy) -> Self {
        self.premature = policy;
        self
    }
}

impl Default for GameVariant {
    fn default() -> Self {
        Self::reaction_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_resolve_by_test_type() {
        for name in ["reaction-time", "audio-reaction", "color-change"] {
            assert_eq!(GameVariant::preset(name).unwrap().test_type, name);
        }
        assert!(GameVariant::preset("typing").is_none());
    }

    #[test]
    fn attempts_never_drop_to_zero() {
        assert_eq!(GameVariant::reaction_time().with_attempts(0).attempts, 1);
    }
}
