use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionConfig {
    /// Wall-clock deadline for the session. `None` or zero means no limit.
    pub time_limit: Option<Duration>,
}

impl SessionConfig {
    pub fn with_time_limit(secs: u64) -> Self {
        Self {
            time_limit: Some(Duration::from_secs(secs)),
        }
    }

    /// The deadline to arm, if any.
    pub fn deadline(&self) -> Option<Duration> {
        self.time_limit.filter(|d| !d.is_zero())
    }
}

/// Which event ended a session.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EndReason {
    FinishKey,
    LengthReached,
    Deadline,
    Aborted,
}

/// Result of one finished session. Built once by the scoring step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub typing_speed: f64,
    pub accuracy: f64,
    pub total_words: usize,
    pub matched_words: usize,
    pub error_count: usize,
    pub duration: Duration,
    pub completed_at: DateTime<Local>,
    pub end_reason: EndReason,
}

/// Receives live progress from the dispatch loop.
///
/// Runs on the session's only coordinating thread, so implementations must
/// return quickly.
pub trait ProgressObserver {
    fn on_progress(&mut self, target: &str, typed: &str, error_count: usize);
}

impl<F> ProgressObserver for F
where
    F: FnMut(&str, &str, usize),
{
    fn on_progress(&mut self, target: &str, typed: &str, error_count: usize) {
        self(target, typed, error_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_time_limit_arms_no_deadline() {
        assert_eq!(SessionConfig::with_time_limit(0).deadline(), None);
        assert_eq!(SessionConfig::default().deadline(), None);
        assert_eq!(
            SessionConfig::with_time_limit(30).deadline(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn end_reason_names_round_trip() {
        for reason in [
            EndReason::FinishKey,
            EndReason::LengthReached,
            EndReason::Deadline,
            EndReason::Aborted,
        ] {
            assert_eq!(reason.to_string().parse::<EndReason>(), Ok(reason));
        }
        assert!("bogus".parse::<EndReason>().is_err());
    }

    #[test]
    fn closures_are_observers() {
        let mut seen = Vec::new();
        let mut observer = |_: &str, typed: &str, errors: usize| {
            seen.push((typed.to_string(), errors));
        };
        observer.on_progress("ab", "a", 0);
        assert_eq!(seen, vec![("a".to_string(), 0)]);
    }
}
