//! Line-oriented screens printed outside the alternate screen.

use std::io::{self, Write};
use std::path::Path;

use crossterm::style::Stylize;

use crate::config::Config;
use crate::history::{recent, sessions_since, HistorySummary};
use crate::session::{EndReason, SessionSummary};

const RULE: &str = "═══════════════════════════════════════";

/// Sessions listed under "Recent Tests".
pub const RECENT_SESSIONS: usize = 5;

/// Window for the "this week" count on the stats screen.
pub const RECENT_DAYS: i64 = 7;

fn banner<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out, "{}", RULE.cyan())?;
    writeln!(out, "{}", format!("{:^39}", title).cyan())?;
    writeln!(out, "{}", RULE.cyan())
}

fn time_limit_label(cfg: &Config) -> String {
    match cfg.time_limit_secs {
        0 => "No limit".to_string(),
        secs => format!("{} seconds", secs),
    }
}

pub fn write_welcome<W: Write>(out: &mut W, cfg: &Config) -> io::Result<()> {
    banner(out, concat!("typerace v", env!("CARGO_PKG_VERSION")))?;
    writeln!(out, "Configuration:")?;
    writeln!(out, "  Words: {}", cfg.number_of_words)?;
    writeln!(out, "  Difficulty: {}", cfg.difficulty)?;
    writeln!(out, "  Time Limit: {}", time_limit_label(cfg))?;
    writeln!(out)?;

    writeln!(out, "{}", "Instructions:".yellow())?;
    writeln!(out, "• Type the words as they appear")?;
    writeln!(out, "• Press Enter to finish early, Ctrl-C to abort")?;
    writeln!(out, "• Backspace is not supported (realistic typing)")?;
    writeln!(out, "• Focus on accuracy over speed")
}

/// Feedback line for a typing speed.
pub fn speed_feedback(wpm: f64) -> &'static str {
    if wpm >= 60.0 {
        "Excellent! You're a fast typist!"
    } else if wpm >= 40.0 {
        "Good job! Keep practicing!"
    } else {
        "Keep practicing to improve your speed!"
    }
}

/// Feedback line for an accuracy percentage.
pub fn accuracy_feedback(accuracy: f64) -> &'static str {
    if accuracy >= 95.0 {
        "Outstanding accuracy!"
    } else if accuracy >= 90.0 {
        "Good accuracy!"
    } else {
        "Focus on accuracy for better results!"
    }
}

pub fn write_results<W: Write>(out: &mut W, summary: &SessionSummary) -> io::Result<()> {
    writeln!(out)?;
    banner(out, "RESULTS")?;

    if summary.end_reason == EndReason::Aborted {
        writeln!(out, "{}", "Session aborted, results not saved.".yellow())?;
    }

    writeln!(out, "{}", format!("WPM: {:.1}", summary.typing_speed).green())?;
    writeln!(out, "{}", format!("Accuracy: {:.1}%", summary.accuracy).blue())?;
    writeln!(
        out,
        "Correct Words: {}/{}",
        summary.matched_words, summary.total_words
    )?;
    writeln!(out, "Errors: {}", summary.error_count)?;
    writeln!(out, "Duration: {:.1} seconds", summary.duration.as_secs_f64())?;

    writeln!(out)?;
    writeln!(out, "{}", "Performance:".yellow())?;
    writeln!(out, "{}", speed_feedback(summary.typing_speed))?;
    writeln!(out, "{}", accuracy_feedback(summary.accuracy))
}

pub fn write_stats<W: Write>(out: &mut W, sessions: &[SessionSummary]) -> io::Result<()> {
    let Some(stats) = HistorySummary::from_sessions(sessions) else {
        return writeln!(
            out,
            "{}",
            "No typing tests completed yet. Run a test first!".yellow()
        );
    };

    banner(out, "STATISTICS")?;
    writeln!(out, "Total Tests: {}", stats.total_sessions)?;
    writeln!(out, "Average WPM: {:.1}", stats.average_speed)?;
    writeln!(out, "Best WPM: {:.1}", stats.best_speed)?;
    writeln!(out, "WPM Std Dev: {:.2}", stats.speed_std_dev)?;
    writeln!(out, "Average Accuracy: {:.1}%", stats.average_accuracy)?;
    writeln!(out, "Best Accuracy: {:.1}%", stats.best_accuracy)?;
    writeln!(
        out,
        "Tests in the last {} days: {}",
        RECENT_DAYS,
        sessions_since(sessions, RECENT_DAYS).len()
    )?;

    writeln!(out)?;
    writeln!(out, "Recent Tests:")?;
    for (i, session) in recent(sessions, RECENT_SESSIONS).iter().enumerate() {
        writeln!(
            out,
            "{}. {:.1} WPM, {:.1}% accuracy ({})",
            i + 1,
            session.typing_speed,
            session.accuracy,
            session.completed_at.format("%Y-%m-%d %H:%M")
        )?;
    }
    Ok(())
}

pub fn write_config<W: Write>(out: &mut W, cfg: &Config, path: &Path) -> io::Result<()> {
    banner(out, "CONFIGURATION")?;
    writeln!(out, "Word Count: {}", cfg.number_of_words)?;
    writeln!(out, "Difficulty: {}", cfg.difficulty)?;
    writeln!(out, "Time Limit: {}", time_limit_label(cfg))?;
    writeln!(out, "Show WPM: {}", cfg.show_wpm)?;
    writeln!(out, "Show Errors: {}", cfg.show_errors)?;
    writeln!(out, "Config File: {}", path.display())
}
