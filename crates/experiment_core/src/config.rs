use std::time::Duration;

use shared::error::ExperimentError;

pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_CLOSING_DELAY: Duration = Duration::from_millis(2000);
pub const DEFAULT_SCORING_DELAY: Duration = Duration::from_millis(2000);
pub const DEFAULT_PROBE_PROBABILITY: f64 = 0.3;

/// Timing and randomisation knobs of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentConfig {
    /// Pause between a participant turn and the agent's reply.
    pub reply_delay: Duration,
    /// Pause between the closing remark and the survey.
    pub closing_delay: Duration,
    /// How long the scoring screen stays up before results are shown.
    pub scoring_delay: Duration,
    /// Chance the agent follows up instead of moving to the next question.
    pub probe_probability: f64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            reply_delay: DEFAULT_REPLY_DELAY,
            closing_delay: DEFAULT_CLOSING_DELAY,
            scoring_delay: DEFAULT_SCORING_DELAY,
            probe_probability: DEFAULT_PROBE_PROBABILITY,
        }
    }
}

impl ExperimentConfig {
    /// Same behaviour with every delay removed.
    pub fn immediate() -> Self {
        Self {
            reply_delay: Duration::ZERO,
            closing_delay: Duration::ZERO,
            scoring_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ExperimentError> {
        if !(0.0..=1.0).contains(&self.probe_probability) {
            return Err(ExperimentError::InvalidConfig(format!(
                "probe probability {} must be within 0.0..=1.0",
                self.probe_probability
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_scripted_pacing() {
        let config = ExperimentConfig::default();
        assert_eq!(config.reply_delay, Duration::from_secs(1));
        assert_eq!(config.closing_delay, Duration::from_secs(2));
        assert_eq!(config.scoring_delay, Duration::from_secs(2));
        assert_eq!(config.probe_probability, 0.3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_probability_outside_unit_interval() {
        let config = ExperimentConfig {
            probe_probability: 1.5,
            ..ExperimentConfig::immediate()
        };
        assert!(matches!(
            config.validate(),
            Err(ExperimentError::InvalidConfig(_))
        ));

        let config = ExperimentConfig {
            probe_probability: f64::NAN,
            ..ExperimentConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
