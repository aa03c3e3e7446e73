use std::time::Duration;

use super::*;
use crate::testing::ScriptedRandom;
use shared::{catalog, domain::{AccuracyScore, Speaker}};
use tokio::sync::broadcast::error::TryRecvError;

fn scripted(rng: ScriptedRandom) -> ExperimentController {
    ExperimentController::new(ExperimentConfig::default(), Box::new(rng)).expect("controller")
}

async fn settle(duration: Duration) {
    tokio::time::sleep(duration).await;
    tokio::task::yield_now().await;
}

fn drain(rx: &mut broadcast::Receiver<ExperimentEvent>) -> Vec<ExperimentEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    events
}

fn phase_changes(events: &[ExperimentEvent]) -> Vec<(Phase, Phase)> {
    events
        .iter()
        .filter_map(|event| match event {
            ExperimentEvent::PhaseChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect()
}

async fn run_conversation(controller: &ExperimentController) {
    for turn in 0..catalog::SCRIPTED_QUESTIONS.len() {
        controller
            .submit_participant_text(&format!("answer {turn}"))
            .await
            .expect("submit");
        settle(Duration::from_millis(1_001)).await;
    }
}

#[test]
fn rejects_invalid_probe_probability() {
    let config = ExperimentConfig {
        probe_probability: -0.1,
        ..ExperimentConfig::default()
    };
    assert!(matches!(
        ExperimentController::with_seed(config, 1),
        Err(ExperimentError::InvalidConfig(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn agent_reply_waits_for_reply_delay() {
    let controller = scripted(ScriptedRandom::default());
    controller
        .submit_participant_text("My parents moved a lot")
        .await
        .expect("submit");

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.transcript.len(), 2);
    assert_eq!(snapshot.draft, "");
    assert_eq!(controller.pending_tasks(), 1);

    settle(Duration::from_millis(900)).await;
    assert_eq!(controller.snapshot().await.transcript.len(), 2);

    settle(Duration::from_millis(200)).await;
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.transcript.len(), 3);
    assert_eq!(snapshot.transcript[2].speaker, Speaker::Agent);
    assert_eq!(snapshot.transcript[2].text, catalog::SCRIPTED_QUESTIONS[1]);
    assert_eq!(snapshot.question_cursor, 1);
}

#[tokio::test(start_paused = true)]
async fn blank_submission_schedules_nothing() {
    let controller = scripted(ScriptedRandom::default());
    let mut events = controller.subscribe_events();

    let err = controller
        .submit_participant_text("  ")
        .await
        .expect_err("blank");
    assert_eq!(err, ExperimentError::EmptyText);
    assert_eq!(controller.pending_tasks(), 0);

    settle(Duration::from_secs(3)).await;
    assert!(drain(&mut events).is_empty());
    assert_eq!(controller.snapshot().await.transcript.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn five_forced_advances_lead_to_survey() {
    let controller = scripted(ScriptedRandom::default());
    let mut events = controller.subscribe_events();

    run_conversation(&controller).await;
    assert_eq!(controller.phase().await, Phase::Conversation);

    settle(Duration::from_millis(2_001)).await;
    assert_eq!(controller.phase().await, Phase::Survey);

    let snapshot = controller.snapshot().await;
    let agent_turns: Vec<_> = snapshot
        .transcript
        .iter()
        .filter(|entry| entry.speaker == Speaker::Agent)
        .collect();
    assert_eq!(agent_turns.len(), catalog::SCRIPTED_QUESTIONS.len() + 1);
    assert_eq!(
        agent_turns.last().map(|entry| entry.text.as_str()),
        Some(catalog::CLOSING_REMARK)
    );
    assert_eq!(
        phase_changes(&drain(&mut events)),
        vec![(Phase::Conversation, Phase::Survey)]
    );
}

#[tokio::test(start_paused = true)]
async fn probes_repeat_without_moving_the_script() {
    let controller = scripted(ScriptedRandom::with_chances([true, true]));
    for _ in 0..2 {
        controller
            .submit_participant_text("tell you later")
            .await
            .expect("submit");
        settle(Duration::from_millis(1_001)).await;
    }

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.question_cursor, 0);
    assert_eq!(snapshot.transcript.len(), 5);
    assert_eq!(snapshot.transcript[4].text, catalog::PROBE_LINE);
}

#[tokio::test(start_paused = true)]
async fn full_run_moves_forward_through_every_phase() {
    let controller = scripted(ScriptedRandom::with_rolls([4]));
    let mut events = controller.subscribe_events();

    run_conversation(&controller).await;
    settle(Duration::from_millis(2_001)).await;

    controller
        .record_rating("q1", RatingField::Agreement, 5)
        .await
        .expect("rating");
    let outcome = controller.submit_survey().await.expect("submit");
    assert_eq!(outcome.accuracy, AccuracyScore::Measured { percent: 100 });
    assert_eq!(controller.phase().await, Phase::Scoring);

    settle(Duration::from_millis(1_500)).await;
    assert_eq!(controller.phase().await, Phase::Scoring);
    settle(Duration::from_millis(600)).await;
    assert_eq!(controller.phase().await, Phase::Results);

    let events = drain(&mut events);
    assert_eq!(
        phase_changes(&events),
        vec![
            (Phase::Conversation, Phase::Survey),
            (Phase::Survey, Phase::Scoring),
            (Phase::Scoring, Phase::Results),
        ]
    );
    assert!(events.iter().any(|event| matches!(
        event,
        ExperimentEvent::ScoringCompleted {
            accuracy: AccuracyScore::Measured { percent: 100 },
            ..
        }
    )));

    let report = controller.report().await.expect("report");
    assert_eq!(report.tally.total, 1);
    assert_eq!(report.predictions.len(), catalog::item_count());
    assert_eq!(report.run_id, controller.run_id());
}

#[tokio::test(start_paused = true)]
async fn ratings_publish_the_merged_response() {
    let controller = scripted(ScriptedRandom::default());
    run_conversation(&controller).await;
    settle(Duration::from_millis(2_001)).await;

    let mut events = controller.subscribe_events();
    controller
        .record_rating("d2", RatingField::Difficulty, 1)
        .await
        .expect("rating");
    controller
        .record_challenge_reason("d2", "no cinema nearby")
        .await
        .expect("reason");
    assert!(controller
        .record_rating("d2", RatingField::Difficulty, 9)
        .await
        .is_err());

    let events = drain(&mut events);
    assert_eq!(events.len(), 2);
    match &events[1] {
        ExperimentEvent::ResponseRecorded { item_id, response } => {
            assert_eq!(item_id, "d2");
            assert_eq!(response.difficulty, Some(1));
            assert_eq!(response.challenge_reason.as_deref(), Some("no cinema nearby"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn empty_survey_reports_zero_without_panicking() {
    let controller = scripted(ScriptedRandom::default());
    run_conversation(&controller).await;
    settle(Duration::from_millis(2_001)).await;

    let outcome = controller.submit_survey().await.expect("submit");
    assert_eq!(outcome.accuracy, AccuracyScore::NoScoredFields);
    assert_eq!(outcome.accuracy.percent(), 0);
}

#[tokio::test(start_paused = true)]
async fn input_after_results_is_ignored() {
    let controller = ExperimentController::with_seed(ExperimentConfig::immediate(), 9)
        .expect("controller");
    for _ in 0..40 {
        if controller.phase().await != Phase::Conversation {
            break;
        }
        let _ = controller.submit_participant_text("sure").await;
        settle(Duration::from_millis(1)).await;
    }
    settle(Duration::from_millis(1)).await;
    assert_eq!(controller.phase().await, Phase::Survey);

    controller.submit_survey().await.expect("submit");
    settle(Duration::from_millis(1)).await;
    assert_eq!(controller.phase().await, Phase::Results);

    let before = controller.snapshot().await;
    let err = controller
        .record_rating("q2", RatingField::Agreement, 3)
        .await
        .expect_err("terminal");
    assert!(err.is_ignorable());
    assert!(controller.submit_survey().await.is_err());
    assert_eq!(controller.snapshot().await, before);
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_pending_reply() {
    let controller = scripted(ScriptedRandom::default());
    controller
        .submit_participant_text("hello")
        .await
        .expect("submit");
    controller.shutdown();

    settle(Duration::from_secs(5)).await;
    assert_eq!(controller.snapshot().await.transcript.len(), 2);
    assert_eq!(controller.pending_tasks(), 0);
    assert_eq!(
        controller.submit_participant_text("still there?").await,
        Err(ExperimentError::ShutDown)
    );
}

#[tokio::test(start_paused = true)]
async fn dropping_the_controller_stops_its_timers() {
    let controller = scripted(ScriptedRandom::default());
    let mut events = controller.subscribe_events();
    run_conversation(&controller).await;
    drop(controller);

    settle(Duration::from_secs(5)).await;
    let events = drain(&mut events);
    assert!(phase_changes(&events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn same_seed_replays_the_same_conversation() {
    async fn transcript_for(seed: u64) -> Vec<String> {
        let controller = ExperimentController::with_seed(ExperimentConfig::default(), seed)
            .expect("controller");
        for _ in 0..4 {
            let _ = controller.submit_participant_text("hm").await;
            settle(Duration::from_millis(1_001)).await;
        }
        controller
            .snapshot()
            .await
            .transcript
            .into_iter()
            .map(|entry| entry.text)
            .collect()
    }

    assert_eq!(transcript_for(11).await, transcript_for(11).await);
}
