use std::{fs, path::Path, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use experiment_core::{config as defaults, ExperimentConfig, RandomSource, SeededRandom};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "experiment.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub reply_delay_ms: u64,
    pub closing_delay_ms: u64,
    pub scoring_delay_ms: u64,
    pub probe_probability: f64,
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reply_delay_ms: defaults::DEFAULT_REPLY_DELAY.as_millis() as u64,
            closing_delay_ms: defaults::DEFAULT_CLOSING_DELAY.as_millis() as u64,
            scoring_delay_ms: defaults::DEFAULT_SCORING_DELAY.as_millis() as u64,
            probe_probability: defaults::DEFAULT_PROBE_PROBABILITY,
            seed: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    reply_delay_ms: Option<u64>,
    closing_delay_ms: Option<u64>,
    scoring_delay_ms: Option<u64>,
    probe_probability: Option<f64>,
    seed: Option<u64>,
}

impl Settings {
    pub fn with_cli_overrides(mut self, seed: Option<u64>, fast: bool) -> Self {
        if let Some(seed) = seed {
            self.seed = Some(seed);
        }
        if fast {
            self.reply_delay_ms = 0;
            self.closing_delay_ms = 0;
            self.scoring_delay_ms = 0;
        }
        self
    }

    pub fn experiment_config(&self) -> ExperimentConfig {
        ExperimentConfig {
            reply_delay: Duration::from_millis(self.reply_delay_ms),
            closing_delay: Duration::from_millis(self.closing_delay_ms),
            scoring_delay: Duration::from_millis(self.scoring_delay_ms),
            probe_probability: self.probe_probability,
        }
    }

    pub fn random_source(&self) -> Box<dyn RandomSource> {
        match self.seed {
            Some(seed) => Box::new(SeededRandom::from_seed(seed)),
            None => Box::new(SeededRandom::from_entropy()),
        }
    }
}

/// Defaults, then the TOML file, then `APP__*` environment variables.
///
/// An explicitly requested file must exist; the default `experiment.toml` is optional.
pub fn load_settings(explicit_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();

    match explicit_path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?;
            apply_file(&mut settings, &raw)
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
        }
        None => {
            if let Ok(raw) = fs::read_to_string(DEFAULT_CONFIG_FILE) {
                apply_file(&mut settings, &raw)
                    .with_context(|| format!("invalid config file '{DEFAULT_CONFIG_FILE}'"))?;
            }
        }
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> Result<()> {
    let file: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file.reply_delay_ms {
        settings.reply_delay_ms = v;
    }
    if let Some(v) = file.closing_delay_ms {
        settings.closing_delay_ms = v;
    }
    if let Some(v) = file.scoring_delay_ms {
        settings.scoring_delay_ms = v;
    }
    if let Some(v) = file.probe_probability {
        settings.probe_probability = v;
    }
    if let Some(v) = file.seed {
        settings.seed = Some(v);
    }
    Ok(())
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = parse_override(&lookup, "APP__REPLY_DELAY_MS") {
        settings.reply_delay_ms = v;
    }
    if let Some(v) = parse_override(&lookup, "APP__CLOSING_DELAY_MS") {
        settings.closing_delay_ms = v;
    }
    if let Some(v) = parse_override(&lookup, "APP__SCORING_DELAY_MS") {
        settings.scoring_delay_ms = v;
    }
    if let Some(v) = parse_override(&lookup, "APP__PROBE_PROBABILITY") {
        settings.probe_probability = v;
    }
    if let Some(v) = parse_override(&lookup, "APP__SEED") {
        settings.seed = Some(v);
    }
}

fn parse_override<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable override");
            None
        }
    }
}
