//! Runtime bridge between the UI command queue and the experiment controller.

use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use experiment_core::ExperimentController;
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};

use crate::{
    backend_bridge::commands::BackendCommand,
    config::Settings,
    controller::events::{UiError, UiErrorContext, UiEvent},
};

/// Starts the controller on its own runtime thread. The thread exits after a
/// [`BackendCommand::Shutdown`] or once the command queue is dropped.
pub fn launch(
    settings: Settings,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                tracing::error!("failed to build experiment runtime: {err}");
                send_ui(
                    &ui_tx,
                    UiEvent::Error(UiError::from_message(
                        UiErrorContext::BackendStartup,
                        format!("failed to build runtime: {err}"),
                    )),
                );
                return;
            }
        };

        runtime.block_on(async move {
            let controller = match ExperimentController::new(
                settings.experiment_config(),
                settings.random_source(),
            ) {
                Ok(controller) => controller,
                Err(err) => {
                    tracing::error!("failed to start experiment: {err}");
                    send_ui(
                        &ui_tx,
                        UiEvent::Error(UiError::from_message(
                            UiErrorContext::BackendStartup,
                            err.to_string(),
                        )),
                    );
                    return;
                }
            };

            let forwarder = spawn_event_forwarder(&controller, ui_tx.clone());
            send_ui(&ui_tx, UiEvent::Ready(controller.snapshot().await));
            tracing::info!(run_id = %controller.run_id(), "experiment worker ready");

            while let Ok(cmd) = cmd_rx.recv() {
                if cmd == BackendCommand::Shutdown {
                    break;
                }
                handle_command(&controller, cmd, &ui_tx).await;
            }

            controller.shutdown();
            forwarder.abort();
            send_ui(&ui_tx, UiEvent::Stopped);
        });
    })
}

fn spawn_event_forwarder(controller: &ExperimentController, ui_tx: Sender<UiEvent>) -> JoinHandle<()> {
    let mut events = controller.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if !send_ui(&ui_tx, UiEvent::Experiment(event)) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "ui fell behind experiment events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn handle_command(
    controller: &ExperimentController,
    cmd: BackendCommand,
    ui_tx: &Sender<UiEvent>,
) {
    let context = UiErrorContext::for_command(&cmd);
    let result = match cmd {
        BackendCommand::UpdateDraft { text } => controller.update_draft(&text).await,
        BackendCommand::SubmitText { text } => controller.submit_participant_text(&text).await,
        BackendCommand::RecordRating {
            item_id,
            field,
            value,
        } => controller.record_rating(&item_id, field, value).await,
        BackendCommand::RecordChallengeReason { item_id, reason } => {
            controller.record_challenge_reason(&item_id, &reason).await
        }
        BackendCommand::SubmitSurvey => controller.submit_survey().await.map(|_| ()),
        BackendCommand::RequestReport => {
            match controller.report().await {
                Some(report) => send_ui(ui_tx, UiEvent::Report(report)),
                None => send_ui(
                    ui_tx,
                    UiEvent::Info("The report is available once scoring has run.".to_string()),
                ),
            };
            Ok(())
        }
        BackendCommand::Shutdown => Ok(()),
    };

    if let Err(err) = result {
        send_ui(ui_tx, UiEvent::Error(UiError::from_experiment(context, &err)));
    }
}

/// Returns `false` once the UI side has gone away.
fn send_ui(ui_tx: &Sender<UiEvent>, event: UiEvent) -> bool {
    match ui_tx.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!("ui event queue full; dropping event");
            true
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crossbeam_channel::bounded;
    use shared::{domain::Speaker, protocol::ExperimentEvent};

    use super::*;

    fn next_event(ui_rx: &Receiver<UiEvent>) -> UiEvent {
        loop {
            match ui_rx.recv_timeout(Duration::from_secs(5)).expect("ui event") {
                UiEvent::Info(_) => continue,
                event => return event,
            }
        }
    }

    #[test]
    fn worker_relays_turns_and_errors() {
        let settings = Settings::default().with_cli_overrides(Some(5), true);
        let (cmd_tx, cmd_rx) = bounded(16);
        let (ui_tx, ui_rx) = bounded(256);
        let worker = launch(settings, cmd_rx, ui_tx);

        match next_event(&ui_rx) {
            UiEvent::Ready(snapshot) => assert_eq!(snapshot.transcript.len(), 1),
            other => panic!("expected ready, got {other:?}"),
        }

        cmd_tx
            .send(BackendCommand::SubmitText {
                text: "   ".to_string(),
            })
            .expect("send");
        match next_event(&ui_rx) {
            UiEvent::Error(err) => assert_eq!(err.context(), UiErrorContext::Conversation),
            other => panic!("expected error, got {other:?}"),
        }

        cmd_tx
            .send(BackendCommand::SubmitText {
                text: "I grew up by the sea".to_string(),
            })
            .expect("send");
        let speakers: Vec<Speaker> = (0..2)
            .map(|_| match next_event(&ui_rx) {
                UiEvent::Experiment(ExperimentEvent::TurnAppended { entry }) => entry.speaker,
                other => panic!("expected turn, got {other:?}"),
            })
            .collect();
        assert_eq!(speakers, vec![Speaker::Participant, Speaker::Agent]);

        cmd_tx.send(BackendCommand::Shutdown).expect("send");
        assert!(matches!(next_event(&ui_rx), UiEvent::Stopped));
        worker.join().expect("worker thread");
    }
}
