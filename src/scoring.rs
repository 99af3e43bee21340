//! Turns the counters captured by a session into a [`SessionSummary`].

use std::time::Duration;

use chrono::Local;

use crate::session::{EndReason, SessionSummary};

/// Characters per word in the speed convention.
pub const CHARS_PER_WORD: f64 = 5.0;

/// Words per minute over the correctly typed characters.
///
/// A zero duration yields 0.0 instead of an infinite speed.
pub fn typing_speed(correct_count: usize, duration: Duration) -> f64 {
    let minutes = duration.as_secs_f64() / 60.0;
    if minutes <= 0.0 {
        return 0.0;
    }
    correct_count as f64 / CHARS_PER_WORD / minutes
}

/// Percentage of typed characters that were correct; 0 when nothing was typed.
pub fn accuracy(correct_count: usize, typed: &str) -> f64 {
    let total = typed.chars().count();
    if total == 0 {
        return 0.0;
    }
    correct_count as f64 / total as f64 * 100.0
}

/// Counts typed words equal to the target word at the same position.
///
/// A correct word typed at the wrong position does not count.
pub fn matched_words(target_words: &[String], typed: &str) -> usize {
    typed
        .split_whitespace()
        .zip(target_words)
        .filter(|(typed, target)| *typed == target.as_str())
        .count()
}

pub fn score(
    target_words: &[String],
    typed: &str,
    error_count: usize,
    correct_count: usize,
    duration: Duration,
    end_reason: EndReason,
) -> SessionSummary {
    SessionSummary {
        typing_speed: typing_speed(correct_count, duration),
        accuracy: accuracy(correct_count, typed),
        total_words: target_words.len(),
        matched_words: matched_words(target_words, typed),
        error_count,
        duration,
        completed_at: Local::now(),
        end_reason,
    }
}
