pub mod report;

use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    cursor, execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen},
};
use itertools::{EitherOrBoth, Itertools};
use log::warn;
use ratatui::{
    backend::Backend,
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
    Terminal,
};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::scoring;
use crate::session::ProgressObserver;

const HORIZONTAL_MARGIN: u16 = 5;

/// Which optional figures the progress header shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOptions {
    pub show_wpm: bool,
    pub show_errors: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_wpm: true,
            show_errors: true,
        }
    }
}

impl From<&Config> for DisplayOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            show_wpm: cfg.show_wpm,
            show_errors: cfg.show_errors,
        }
    }
}

/// One frame of an in-progress session.
#[derive(Debug, Clone)]
pub struct ProgressView<'a> {
    pub target: &'a str,
    pub typed: &'a str,
    pub error_count: usize,
    pub elapsed: Duration,
    pub time_limit: Option<Duration>,
    pub options: DisplayOptions,
}

impl ProgressView<'_> {
    fn correct_so_far(&self) -> usize {
        self.target
            .chars()
            .zip(self.typed.chars())
            .filter(|(t, c)| t == c)
            .count()
    }

    pub fn header(&self) -> String {
        let mut header = format!(
            "Progress: {}/{} characters",
            self.typed.chars().count(),
            self.target.chars().count()
        );
        if self.options.show_errors {
            header.push_str(&format!(" | Errors: {}", self.error_count));
        }
        if self.options.show_wpm {
            let wpm = scoring::typing_speed(self.correct_so_far(), self.elapsed);
            header.push_str(&format!(" | WPM: {:.0}", wpm));
        }
        // static: frames are only drawn on keystrokes
        if let Some(limit) = self.time_limit {
            header.push_str(&format!(" | Limit: {}s", limit.as_secs()));
        }
        header
    }
}

impl Widget for &ProgressView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
        let red_bold_style = Style::default().patch(bold_style).fg(Color::Red);
        let dim_bold_style = Style::default()
            .patch(bold_style)
            .add_modifier(Modifier::DIM);
        let underlined_dim_bold_style = Style::default()
            .patch(dim_bold_style)
            .add_modifier(Modifier::UNDERLINED);

        let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
        let prompt_occupied_lines = if self.target.width() <= max_chars_per_line as usize {
            1
        } else {
            ((self.target.width() as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16
        };
        let padding = area.height.saturating_sub(prompt_occupied_lines + 2) / 2;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(padding),
                Constraint::Length(2), // header
                Constraint::Length(prompt_occupied_lines),
                Constraint::Min(0),
            ])
            .split(area);

        Paragraph::new(Span::styled(self.header(), bold_style))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);

        let cursor = self.typed.chars().count();
        let spans = self
            .target
            .chars()
            .zip_longest(self.typed.chars())
            .enumerate()
            .filter_map(|(idx, pair)| match pair {
                EitherOrBoth::Both(expected, typed) if expected == typed => {
                    Some(Span::styled(expected.to_string(), green_bold_style))
                }
                EitherOrBoth::Both(_, typed) => Some(Span::styled(
                    match typed {
                        ' ' => "·".to_owned(),
                        c => c.to_string(),
                    },
                    red_bold_style,
                )),
                EitherOrBoth::Left(expected) if idx == cursor => {
                    Some(Span::styled(expected.to_string(), underlined_dim_bold_style))
                }
                EitherOrBoth::Left(expected) => {
                    Some(Span::styled(expected.to_string(), dim_bold_style))
                }
                EitherOrBoth::Right(_) => None,
            })
            .collect::<Vec<Span>>();

        Paragraph::new(Line::from(spans))
            .alignment(if prompt_occupied_lines == 1 {
                Alignment::Center
            } else {
                Alignment::Left
            })
            .wrap(Wrap { trim: true })
            .render(chunks[2], buf);
    }
}

/// Draws every progress notification onto a ratatui terminal.
pub struct TerminalObserver<B: Backend> {
    terminal: Terminal<B>,
    started: Instant,
    time_limit: Option<Duration>,
    options: DisplayOptions,
}

impl<B: Backend> TerminalObserver<B> {
    pub fn new(terminal: Terminal<B>, time_limit: Option<Duration>, options: DisplayOptions) -> Self {
        Self {
            terminal,
            started: Instant::now(),
            time_limit,
            options,
        }
    }

    /// Resets the clock and shows the untouched target.
    pub fn begin(&mut self, target: &str) {
        self.started = Instant::now();
        self.draw(target, "", 0);
    }

    fn draw(&mut self, target: &str, typed: &str, error_count: usize) {
        let view = ProgressView {
            target,
            typed,
            error_count,
            elapsed: self.started.elapsed(),
            time_limit: self.time_limit,
            options: self.options,
        };
        if let Err(e) = self.terminal.draw(|f| f.render_widget(&view, f.area())) {
            warn!("failed to draw progress: {}", e);
        }
    }

    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }
}

impl<B: Backend> ProgressObserver for TerminalObserver<B> {
    fn on_progress(&mut self, target: &str, typed: &str, error_count: usize) {
        self.draw(target, typed, error_count);
    }
}

/// Alternate screen for the duration of a session; the main screen is restored on drop.
pub struct AlternateScreen;

impl AlternateScreen {
    pub fn enter() -> io::Result<Self> {
        execute!(io::stdout(), EnterAlternateScreen, cursor::Hide)?;
        Ok(Self)
    }
}

impl Drop for AlternateScreen {
    fn drop(&mut self) {
        if let Err(e) = execute!(io::stdout(), cursor::Show, LeaveAlternateScreen) {
            warn!("failed to leave alternate screen: {}", e);
        }
    }
}
