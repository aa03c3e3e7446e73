use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Weak,
};

use shared::{
    domain::{Phase, RatingField, RunId},
    error::ExperimentError,
    protocol::{ExperimentEvent, ExperimentReport, ExperimentSnapshot},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

pub mod config;
pub mod random;
pub mod scheduler;
pub mod scoring;
pub mod state;

pub use config::ExperimentConfig;
pub use random::{RandomSource, SeededRandom};
pub use scheduler::TaskScheduler;
pub use state::{AgentReply, ExperimentState, PhaseChange, ScoringOutcome};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Owns one experiment run and the timers that move it forward.
///
/// Views call the input methods and render from [`ExperimentController::snapshot`]
/// or the event stream. Dropping the controller (or calling
/// [`ExperimentController::shutdown`]) aborts any pending agent reply or phase
/// transition.
pub struct ExperimentController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    run_id: RunId,
    config: ExperimentConfig,
    state: Mutex<ExperimentState>,
    rng: Mutex<Box<dyn RandomSource>>,
    events: broadcast::Sender<ExperimentEvent>,
    scheduler: TaskScheduler,
    shut_down: AtomicBool,
}

impl ExperimentController {
    pub fn new(
        config: ExperimentConfig,
        rng: Box<dyn RandomSource>,
    ) -> Result<Self, ExperimentError> {
        config.validate()?;
        let state = ExperimentState::new(config.probe_probability);
        let run_id = state.run_id();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        info!(%run_id, "experiment run started");

        Ok(Self {
            inner: Arc::new(ControllerInner {
                run_id,
                config,
                state: Mutex::new(state),
                rng: Mutex::new(rng),
                events,
                scheduler: TaskScheduler::new(),
                shut_down: AtomicBool::new(false),
            }),
        })
    }

    /// Seeded controller; the same seed replays the same agent behaviour and predictions.
    pub fn with_seed(config: ExperimentConfig, seed: u64) -> Result<Self, ExperimentError> {
        Self::new(config, Box::new(SeededRandom::from_seed(seed)))
    }

    pub fn run_id(&self) -> RunId {
        self.inner.run_id
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ExperimentEvent> {
        self.inner.events.subscribe()
    }

    pub async fn snapshot(&self) -> ExperimentSnapshot {
        self.inner.state.lock().await.snapshot()
    }

    pub async fn phase(&self) -> Phase {
        self.inner.state.lock().await.phase()
    }

    pub async fn report(&self) -> Option<ExperimentReport> {
        self.inner.state.lock().await.report()
    }

    /// Number of delayed replies or transitions still waiting to fire.
    pub fn pending_tasks(&self) -> usize {
        self.inner.scheduler.pending()
    }

    pub async fn update_draft(&self, text: &str) -> Result<(), ExperimentError> {
        self.inner.ensure_running()?;
        self.inner.state.lock().await.update_draft(text)
    }

    pub async fn submit_participant_text(&self, text: &str) -> Result<(), ExperimentError> {
        self.inner.ensure_running()?;
        let entry = self
            .inner
            .state
            .lock()
            .await
            .submit_participant_text(text)
            .inspect_err(|err| warn!(run_id = %self.inner.run_id, %err, "participant text rejected"))?;
        self.inner.publish(ExperimentEvent::TurnAppended { entry });

        let weak = Arc::downgrade(&self.inner);
        self.inner
            .scheduler
            .schedule("agent_reply", self.inner.config.reply_delay, async move {
                ControllerInner::deliver_agent_reply(weak).await;
            });
        Ok(())
    }

    pub async fn record_rating(
        &self,
        item_id: &str,
        field: RatingField,
        value: i32,
    ) -> Result<(), ExperimentError> {
        self.inner.ensure_running()?;
        let response = self
            .inner
            .state
            .lock()
            .await
            .record_rating(item_id, field, value)
            .cloned()
            .inspect_err(|err| warn!(run_id = %self.inner.run_id, %err, "rating rejected"))?;
        self.inner.publish(ExperimentEvent::ResponseRecorded {
            item_id: item_id.to_string(),
            response,
        });
        Ok(())
    }

    pub async fn record_challenge_reason(
        &self,
        item_id: &str,
        reason: &str,
    ) -> Result<(), ExperimentError> {
        self.inner.ensure_running()?;
        let response = self
            .inner
            .state
            .lock()
            .await
            .record_challenge_reason(item_id, reason)
            .cloned()
            .inspect_err(|err| warn!(run_id = %self.inner.run_id, %err, "challenge reason rejected"))?;
        self.inner.publish(ExperimentEvent::ResponseRecorded {
            item_id: item_id.to_string(),
            response,
        });
        Ok(())
    }

    /// Moves to scoring, runs the simulated predictions right away and
    /// schedules the switch to results.
    pub async fn submit_survey(&self) -> Result<ScoringOutcome, ExperimentError> {
        self.inner.ensure_running()?;
        let (change, outcome) = {
            let mut state = self.inner.state.lock().await;
            let mut rng = self.inner.rng.lock().await;
            state
                .submit_survey(&mut **rng)
                .inspect_err(|err| warn!(run_id = %self.inner.run_id, %err, "survey submission rejected"))?
        };
        self.inner.publish_phase_change(change);
        self.inner.publish(ExperimentEvent::ScoringCompleted {
            accuracy: outcome.accuracy,
            tally: outcome.tally,
        });

        let weak = Arc::downgrade(&self.inner);
        self.inner
            .scheduler
            .schedule("show_results", self.inner.config.scoring_delay, async move {
                ControllerInner::finish_scoring(weak).await;
            });
        Ok(outcome)
    }

    /// Cancels pending timers. Later input is rejected.
    pub fn shutdown(&self) {
        if !self.inner.shut_down.swap(true, Ordering::AcqRel) {
            info!(run_id = %self.inner.run_id, "experiment controller shutting down");
        }
        self.inner.scheduler.cancel_all();
    }
}

impl Drop for ExperimentController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl ControllerInner {
    fn ensure_running(&self) -> Result<(), ExperimentError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(ExperimentError::ShutDown);
        }
        Ok(())
    }

    fn publish(&self, event: ExperimentEvent) {
        let _ = self.events.send(event);
    }

    fn publish_phase_change(&self, change: PhaseChange) {
        self.publish(ExperimentEvent::PhaseChanged {
            from: change.from,
            to: change.to,
        });
    }

    async fn deliver_agent_reply(weak: Weak<Self>) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        if inner.ensure_running().is_err() {
            return;
        }

        let reply = {
            let mut state = inner.state.lock().await;
            let mut rng = inner.rng.lock().await;
            state.agent_reply(&mut **rng)
        };
        let Some((reply, entry)) = reply else {
            return;
        };
        inner.publish(ExperimentEvent::TurnAppended { entry });

        if reply == AgentReply::Closing {
            let weak = Arc::downgrade(&inner);
            inner
                .scheduler
                .schedule("begin_survey", inner.config.closing_delay, async move {
                    ControllerInner::begin_survey(weak).await;
                });
        }
    }

    async fn begin_survey(weak: Weak<Self>) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        if inner.ensure_running().is_err() {
            return;
        }
        let change = inner.state.lock().await.begin_survey();
        match change {
            Ok(change) => inner.publish_phase_change(change),
            Err(err) => warn!(run_id = %inner.run_id, %err, "could not open survey"),
        }
    }

    async fn finish_scoring(weak: Weak<Self>) {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        if inner.ensure_running().is_err() {
            return;
        }
        let change = inner.state.lock().await.finish_scoring();
        match change {
            Ok(change) => inner.publish_phase_change(change),
            Err(err) => warn!(run_id = %inner.run_id, %err, "could not show results"),
        }
    }
}

#[cfg(test)]
#[path = "tests/scripted_random.rs"]
pub(crate) mod testing;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
