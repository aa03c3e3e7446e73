//! Line-oriented terminal front end driving the experiment worker.

use std::{
    io::{self, BufRead, Write},
    thread,
};

use anyhow::Result;
use crossbeam_channel::{bounded, never, select, Receiver, Sender};
use shared::{
    domain::{AccuracyScore, Phase, Speaker},
    protocol::{ExperimentEvent, ExperimentReport, ExperimentSnapshot},
};

use crate::{
    backend_bridge::commands::BackendCommand,
    controller::{
        events::{UiError, UiEvent},
        orchestration::dispatch_backend_command,
    },
    ui::{
        render,
        survey::{PromptStep, SurveyAction, SurveyPrompter},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct TerminalApp<W: Write> {
    cmd_tx: Sender<BackendCommand>,
    out: W,
    report_json: bool,
    phase: Phase,
    accuracy: AccuracyScore,
    prompter: Option<SurveyPrompter>,
    draft: String,
    status: String,
    shutdown_sent: bool,
}

impl<W: Write> TerminalApp<W> {
    pub fn new(cmd_tx: Sender<BackendCommand>, out: W, report_json: bool) -> Self {
        Self {
            cmd_tx,
            out,
            report_json,
            phase: Phase::default(),
            accuracy: AccuracyScore::default(),
            prompter: None,
            draft: String::new(),
            status: String::new(),
            shutdown_sent: false,
        }
    }

    /// Runs until the worker reports it has stopped.
    pub fn run(&mut self, ui_rx: Receiver<UiEvent>) -> Result<()> {
        let mut input_rx = spawn_stdin_reader();

        loop {
            select! {
                recv(ui_rx) -> event => {
                    let Ok(event) = event else {
                        tracing::warn!("experiment worker went away without stopping");
                        break;
                    };
                    if self.handle_event(event)? == Flow::Exit {
                        break;
                    }
                }
                recv(input_rx) -> line => match line {
                    Ok(line) => self.handle_line(&line)?,
                    Err(_) => {
                        tracing::debug!("stdin closed");
                        input_rx = never();
                        self.request_shutdown();
                    }
                },
            }
        }
        Ok(())
    }

    pub fn handle_event(&mut self, event: UiEvent) -> io::Result<Flow> {
        match event {
            UiEvent::Ready(snapshot) => self.show_snapshot(&snapshot)?,
            UiEvent::Info(message) => writeln!(self.out, "{message}")?,
            UiEvent::Experiment(event) => self.apply_experiment_event(event)?,
            UiEvent::Report(report) => {
                self.print_report(&report)?;
                self.request_shutdown();
            }
            UiEvent::Error(err) => return self.show_error(err),
            UiEvent::Stopped => return Ok(Flow::Exit),
        }
        self.out.flush()?;
        Ok(Flow::Continue)
    }

    pub fn handle_line(&mut self, line: &str) -> io::Result<()> {
        match self.phase {
            Phase::Conversation => match line.strip_suffix('\\') {
                Some(partial) => {
                    self.draft.push_str(partial);
                    self.draft.push('\n');
                    let text = self.draft.clone();
                    self.dispatch(BackendCommand::UpdateDraft { text })?;
                }
                None => {
                    let mut text = std::mem::take(&mut self.draft);
                    text.push_str(line);
                    self.dispatch(BackendCommand::SubmitText { text })?;
                }
            },
            Phase::Survey => {
                let Some(prompter) = self.prompter.as_mut() else {
                    return Ok(());
                };
                match prompter.handle_line(line) {
                    SurveyAction::Dispatch(cmd) => {
                        let awaiting = prompter.is_awaiting_confirmation();
                        let queued = self.dispatch(cmd)?;
                        if awaiting && !queued {
                            if let Some(prompter) = self.prompter.as_mut() {
                                prompter.rating_rejected();
                            }
                        }
                        if !awaiting || !queued {
                            self.show_prompt()?;
                        }
                    }
                    SurveyAction::Skipped => self.show_prompt()?,
                    SurveyAction::Invalid(message) => {
                        writeln!(self.out, "  {message}")?;
                        self.show_prompt()?;
                    }
                    SurveyAction::Waiting => {}
                }
            }
            Phase::Scoring | Phase::Results => {
                tracing::debug!(phase = %self.phase, "ignoring input");
            }
        }
        self.out.flush()
    }

    fn apply_experiment_event(&mut self, event: ExperimentEvent) -> io::Result<()> {
        match event {
            ExperimentEvent::TurnAppended { entry } => {
                if entry.speaker == Speaker::Agent {
                    writeln!(self.out, "{}", render::entry_line(&entry))?;
                }
            }
            ExperimentEvent::PhaseChanged { to, .. } => {
                self.phase = to;
                self.enter_phase(to)?;
            }
            ExperimentEvent::ResponseRecorded { item_id, response } => {
                if let Some(prompter) = self.prompter.as_mut() {
                    let was_awaiting = prompter.is_awaiting_confirmation();
                    prompter.rating_accepted(&item_id, &response);
                    if was_awaiting && !prompter.is_awaiting_confirmation() {
                        self.show_prompt()?;
                    }
                }
            }
            ExperimentEvent::ScoringCompleted { accuracy, tally } => {
                tracing::debug!(correct = tally.correct, total = tally.total, "scoring completed");
                self.accuracy = accuracy;
            }
        }
        Ok(())
    }

    fn enter_phase(&mut self, phase: Phase) -> io::Result<()> {
        match phase {
            Phase::Conversation => {}
            Phase::Survey => {
                writeln!(self.out, "\n{}", phase.status_line())?;
                self.prompter = Some(SurveyPrompter::new());
                self.show_prompt()?;
            }
            Phase::Scoring => {
                self.prompter = None;
                writeln!(self.out, "\n{}", phase.status_line())?;
            }
            Phase::Results => {
                writeln!(self.out, "{}", render::results(self.accuracy))?;
                if self.report_json {
                    self.dispatch(BackendCommand::RequestReport)?;
                } else {
                    self.request_shutdown();
                }
            }
        }
        Ok(())
    }

    fn show_snapshot(&mut self, snapshot: &ExperimentSnapshot) -> io::Result<()> {
        self.phase = snapshot.phase;
        self.accuracy = snapshot.accuracy;
        writeln!(self.out, "{}", snapshot.status_line())?;
        for entry in &snapshot.transcript {
            writeln!(self.out, "{}", render::entry_line(entry))?;
        }
        Ok(())
    }

    fn show_prompt(&mut self) -> io::Result<()> {
        let Some(prompter) = self.prompter.as_ref() else {
            return Ok(());
        };
        if let Some(category) = prompter.entering_category() {
            writeln!(self.out, "{}", render::category_header(category))?;
        }
        match (prompter.step(), prompter.current_item()) {
            (PromptStep::Rating { .. }, Some(item)) => {
                write!(self.out, "{}", render::item_prompt(item))?
            }
            (PromptStep::Reason { .. }, Some(item)) => {
                write!(self.out, "{}", render::reason_prompt(item))?
            }
            (PromptStep::Confirm, _) => write!(self.out, "{}", render::SUBMIT_PROMPT)?,
            _ => {}
        }
        self.out.flush()
    }

    fn show_error(&mut self, err: UiError) -> io::Result<Flow> {
        if err.is_ignorable() {
            tracing::debug!(category = ?err.category(), message = err.message(), "late input ignored");
            return Ok(Flow::Continue);
        }
        writeln!(self.out, "{}", err.user_message())?;
        if err.is_fatal() {
            self.out.flush()?;
            return Ok(Flow::Exit);
        }
        if let Some(prompter) = self.prompter.as_mut() {
            if prompter.is_awaiting_confirmation() {
                prompter.rating_rejected();
                self.show_prompt()?;
            }
        }
        self.out.flush()?;
        Ok(Flow::Continue)
    }

    fn print_report(&mut self, report: &ExperimentReport) -> io::Result<()> {
        let json = serde_json::to_string_pretty(report).map_err(io::Error::other)?;
        writeln!(self.out, "{json}")
    }

    /// Returns whether the worker queue accepted `cmd`.
    fn dispatch(&mut self, cmd: BackendCommand) -> io::Result<bool> {
        let queued = dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status);
        if !queued {
            writeln!(self.out, "{}", self.status)?;
        }
        Ok(queued)
    }

    fn request_shutdown(&mut self) {
        if self.shutdown_sent {
            return;
        }
        self.shutdown_sent = dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::Shutdown,
            &mut self.status,
        );
    }
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = bounded(64);
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}
