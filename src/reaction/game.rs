//! Async driver running one [`ReactionMachine`] on its own event queue.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::{
    sync::{
        mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender},
        oneshot, watch,
    },
    task::{JoinHandle, JoinSet},
    time::{Instant, timeout},
};
use tracing::{debug, info, warn};

use super::{
    labels::{EnglishLabels, Translator},
    prefs::{self, MemoryPreferences, PreferenceStore, SOUND_ENABLED, TUTORIAL_SEEN},
    session::CompletedSession,
    state_machine::{Effect, ReactionEvent, ReactionMachine, ReactionPhase},
    submit::{DiscardSubmitter, ResultSubmitter},
    timer::{ArmToken, TimerSlot},
    variant::GameVariant,
};

/// Everything a game needs besides its own state.
#[derive(Clone)]
pub struct GameOptions {
    /// Parameters of the game being played.
    pub variant: GameVariant,
    /// Where completed sessions are sent.
    pub submitter: Arc<dyn ResultSubmitter>,
    /// Client preferences (sound, tutorial).
    pub preferences: Arc<dyn PreferenceStore>,
    /// Label lookup for the view.
    pub translator: Arc<dyn Translator>,
    /// Fixed seed for the delay generator.
    pub seed: Option<u64>,
}

impl GameOptions {
    /// Options with in-memory preferences, English labels and no submission.
    pub fn new(variant: GameVariant) -> Self {
        Self {
            variant,
            submitter: Arc::new(DiscardSubmitter),
            preferences: Arc::new(MemoryPreferences::new()),
            translator: Arc::new(EnglishLabels),
            seed: None,
        }
    }

    /// Send completed sessions to `submitter`.
    pub fn with_submitter(mut self, submitter: Arc<dyn ResultSubmitter>) -> Self {
        self.submitter = submitter;
        self
    }

    /// Use `preferences` for sound/tutorial flags.
    pub fn with_preferences(mut self, preferences: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = preferences;
        self
    }

    /// Use `translator` for view labels.
    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    /// Make delays reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// What the presentation layer needs to draw the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameView {
    /// Current phase.
    pub phase: ReactionPhase,
    /// Translated phase description.
    pub label: String,
    /// Latencies recorded in the session so far.
    pub attempts: Vec<u32>,
    /// Attempts needed to finish.
    pub target_attempts: usize,
    /// Translated "attempt n of N" line.
    pub progress: String,
    /// Most recent latency.
    pub last_latency_ms: Option<u32>,
    /// Session average, once complete. Always computed locally.
    pub average_ms: Option<u32>,
    /// Whether sound effects should play.
    pub sound_enabled: bool,
    /// Whether to show the instructions overlay.
    pub show_tutorial: bool,
}

#[derive(Debug)]
enum Command {
    Begin,
    Respond(Instant),
    Acknowledge,
    Fired(ArmToken, Instant),
    Close(oneshot::Sender<()>),
}

/// Handle to a running game. Dropping it tears the game down and cancels any
/// pending timer.
pub struct ReactionGame {
    commands: UnboundedSender<Command>,
    view: watch::Receiver<GameView>,
    task: JoinHandle<()>,
}

impl ReactionGame {
    /// Start a game loop on the current tokio runtime.
    pub fn spawn(options: GameOptions) -> Self {
        let machine = match options.seed {
            Some(seed) => ReactionMachine::seeded(options.variant.clone(), seed),
            None => ReactionMachine::new(options.variant.clone()),
        };
        let (commands, receiver) = mpsc::unbounded_channel();
        let driver = Driver {
            machine,
            timer: TimerSlot::new(),
            submissions: JoinSet::new(),
            fire_sender: commands.downgrade(),
            options,
        };
        let (view_tx, view) = watch::channel(driver.view());
        let task = tokio::spawn(driver.run(receiver, view_tx));

        Self {
            commands,
            view,
            task,
        }
    }

    /// Register the player's input. The timestamp is taken here, before the
    /// event is queued, so queueing and handling never add to the latency.
    pub fn respond(&self) {
        self.respond_at(Instant::now());
    }

    /// Register an input that happened at `at`.
    pub fn respond_at(&self, at: Instant) {
        self.send(Command::Respond(at));
    }

    /// Start from idle.
    pub fn begin(&self) {
        self.send(Command::Begin);
    }

    /// Dismiss the premature-response notice.
    pub fn acknowledge(&self) {
        self.send(Command::Acknowledge);
    }

    /// Latest view.
    pub fn view(&self) -> GameView {
        self.view.borrow().clone()
    }

    /// Stop the game and wait up to `grace` for in-flight submissions.
    pub async fn close(self, grace: Duration) {
        let (done, finished) = oneshot::channel();
        self.send(Command::Close(done));
        if timeout(grace, finished).await.is_err() {
            warn!(
                grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                "submissions still pending at shutdown"
            );
        }
    }

    /// Receiver notified on every view change.
    pub fn subscribe(&self) -> watch::Receiver<GameView> {
        self.view.clone()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("game loop already stopped");
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        // submissions outlive an aborted game loop
        self.submissions.detach_all();
    }
}

impl Drop for ReactionGame {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Driver {
    machine: ReactionMachine,
    timer: TimerSlot,
    submissions: JoinSet<()>,
    fire_sender: WeakUnboundedSender<Command>,
    options: GameOptions,
}

impl Driver {
    async fn run(
        mut self,
        mut commands: UnboundedReceiver<Command>,
        view: watch::Sender<GameView>,
    ) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Close(done) => {
                    let outcome = self.machine.cancel();
                    self.perform(outcome.effects);
                    self.drain_submissions().await;
                    let _ = done.send(());
                    return;
                }
                command => self.handle(command),
            }
            view.send_replace(self.view());
        }

        let outcome = self.machine.cancel();
        self.perform(outcome.effects);
    }

    async fn drain_submissions(&mut self) {
        while let Some(joined) = self.submissions.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "submission task ended abnormally");
            }
        }
    }

    fn handle(&mut self, command: Command) {
        let event = match command {
            Command::Begin => ReactionEvent::Begin,
            Command::Respond(at) => ReactionEvent::Respond { at },
            Command::Acknowledge => ReactionEvent::Acknowledge,
            Command::Fired(token, at) => {
                self.timer.settle(token);
                ReactionEvent::StimulusFired { token, at }
            }
            Command::Close(_) => return,
        };

        match self.machine.handle(event) {
            Ok(outcome) => self.perform(outcome.effects),
            Err(err) => debug!(error = %err, "ignoring game input"),
        }
    }

    fn perform(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Schedule { token, delay } => {
                    self.mark_tutorial_seen();
                    let sender = self.fire_sender.clone();
                    self.timer.schedule(token, delay, move |token, at| {
                        if let Some(sender) = sender.upgrade() {
                            let _ = sender.send(Command::Fired(token, at));
                        }
                    });
                }
                Effect::CancelTimer { token } => {
                    if self.timer.pending() == Some(token) {
                        self.timer.cancel();
                    }
                }
                Effect::Submit(session) => self.submit(session),
            }
        }
    }

    /// Fire-and-forget: the view already carries the local average, so a
    /// failed submission is only logged.
    fn submit(&mut self, session: CompletedSession) {
        while self.submissions.try_join_next().is_some() {}

        let submitter = self.options.submitter.clone();
        self.submissions.spawn(async move {
            let session_id = session.session_id;
            let average_ms = session.average_ms;
            match submitter.submit(session).await {
                Ok(()) => info!(session = %session_id, average_ms, "session submitted"),
                Err(err) => {
                    warn!(session = %session_id, error = %err, "failed to submit session")
                }
            }
        });
    }

    fn mark_tutorial_seen(&self) {
        let key = prefs::scoped_key(&self.options.variant.test_type, TUTORIAL_SEEN);
        if !prefs::flag(self.options.preferences.as_ref(), &key, false) {
            prefs::set_flag(self.options.preferences.as_ref(), &key, true);
        }
    }

    fn view(&self) -> GameView {
        let machine = &self.machine;
        let phase = machine.phase();
        let attempts = machine.attempts();
        let last_latency_ms = machine.last_latency_ms();
        let average_ms = machine.average_ms();

        let mut params = Vec::new();
        if let Some(latency) = last_latency_ms {
            params.push(("latency", latency.to_string()));
        }
        if let Some(average) = average_ms {
            params.push(("average", average.to_string()));
        }

        let preferences = self.options.preferences.as_ref();
        let test_type = &self.options.variant.test_type;
        let target_attempts = machine.variant().attempts;
        let current = (attempts.len() + 1).min(target_attempts);
        let progress = self.options.translator.translate(
            "attempts.progress",
            &[
                ("current", current.to_string()),
                ("total", target_attempts.to_string()),
            ],
        );
        let sound_key = prefs::scoped_key(test_type, SOUND_ENABLED);
        let tutorial_key = prefs::scoped_key(test_type, TUTORIAL_SEEN);

        GameView {
            phase,
            label: self.options.translator.translate(phase.label_key(), &params),
            attempts,
            target_attempts,
            progress,
            last_latency_ms,
            average_ms,
            sound_enabled: prefs::flag(preferences, &sound_key, true),
            show_tutorial: !prefs::flag(preferences, &tutorial_key, false),
        }
    }
}
