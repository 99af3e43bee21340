//! Keystroke capture.
//!
//! An [`InputSource`] runs on its own thread and forwards characters one at a
//! time into the engine's character channel until the cancel signal fires,
//! the user aborts with Ctrl-C, or the engine hangs up.

use std::io;
use std::time::Duration;

use crossbeam_channel::{select, Sender};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal,
};
use log::{trace, warn};

use crate::error::CaptureError;
use crate::runtime::CancelSignal;

/// End-of-text, what Ctrl-C produces on a raw terminal.
pub const ETX: char = '\u{3}';

/// Upper bound on how long a read may block before the cancel signal is rechecked.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Why a capture loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureExit {
    Cancelled,
    /// In-band abort (Ctrl-C) from the user.
    Aborted,
    /// The receiving side of the channel went away.
    Disconnected,
}

/// Source of typed characters for a session.
pub trait InputSource: Send + 'static {
    /// Stream characters into `out` until cancelled or aborted.
    fn capture(self, cancel: CancelSignal, out: Sender<char>) -> Result<CaptureExit, CaptureError>;
}

/// Keeps the terminal in raw mode for as long as it lives.
///
/// The mode that was active before [`RawModeGuard::acquire`] is restored on
/// drop, including during unwinding.
#[derive(Debug)]
pub struct RawModeGuard {
    restore: bool,
}

impl RawModeGuard {
    pub fn acquire() -> Result<Self, CaptureError> {
        let already_raw = terminal::is_raw_mode_enabled().map_err(CaptureError::RawMode)?;
        if !already_raw {
            terminal::enable_raw_mode().map_err(CaptureError::RawMode)?;
        }
        Ok(Self {
            restore: !already_raw,
        })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.restore {
            if let Err(e) = terminal::disable_raw_mode() {
                warn!("failed to restore terminal mode: {}", e);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Abort,
}

/// Maps a terminal key event onto the session's character stream.
pub fn key_to_input(key: &KeyEvent) -> Option<KeyInput> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(KeyInput::Abort)
        }
        KeyCode::Char(ETX) => Some(KeyInput::Abort),
        KeyCode::Char(c)
            if !key.modifiers.contains(KeyModifiers::CONTROL)
                && !key.modifiers.contains(KeyModifiers::ALT) =>
        {
            Some(KeyInput::Char(c))
        }
        KeyCode::Enter => Some(KeyInput::Char('\r')),
        KeyCode::Tab => Some(KeyInput::Char('\t')),
        _ => None,
    }
}

/// Hands `c` to the engine unless the scope is cancelled first.
fn forward(c: char, cancel: &CancelSignal, out: &Sender<char>) -> Option<CaptureExit> {
    if cancel.is_cancelled() {
        return Some(CaptureExit::Cancelled);
    }
    select! {
        send(out, c) -> res => res.err().map(|_| CaptureExit::Disconnected),
        recv(cancel.receiver()) -> _ => Some(CaptureExit::Cancelled),
    }
}

/// Where [`TerminalInput`] gets its key events from.
pub trait KeyEventSource: Send + 'static {
    /// Terminal state held for the whole capture, if the source needs any.
    fn acquire(&mut self) -> Result<Option<RawModeGuard>, CaptureError> {
        Ok(None)
    }

    /// Wait up to `timeout` for an event to become readable.
    fn poll(&mut self, timeout: Duration) -> io::Result<bool>;

    fn read(&mut self) -> io::Result<Event>;
}

/// Key events from the controlling terminal, read in raw mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrosstermEvents;

impl KeyEventSource for CrosstermEvents {
    fn acquire(&mut self) -> Result<Option<RawModeGuard>, CaptureError> {
        RawModeGuard::acquire().map(Some)
    }

    fn poll(&mut self, timeout: Duration) -> io::Result<bool> {
        event::poll(timeout)
    }

    fn read(&mut self) -> io::Result<Event> {
        event::read()
    }
}

/// Production source: polls key events so the cancel signal is rechecked at
/// least every [`POLL_INTERVAL`].
#[derive(Debug, Clone)]
pub struct TerminalInput<S: KeyEventSource = CrosstermEvents> {
    events: S,
    poll_interval: Duration,
}

impl TerminalInput<CrosstermEvents> {
    pub fn new() -> Self {
        Self::with_source(CrosstermEvents)
    }
}

impl Default for TerminalInput<CrosstermEvents> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: KeyEventSource> TerminalInput<S> {
    pub fn with_source(events: S) -> Self {
        Self {
            events,
            poll_interval: POLL_INTERVAL,
        }
    }
}

impl<S: KeyEventSource> InputSource for TerminalInput<S> {
    fn capture(mut self, cancel: CancelSignal, out: Sender<char>) -> Result<CaptureExit, CaptureError> {
        let _raw = self.events.acquire()?;

        loop {
            if cancel.is_cancelled() {
                return Ok(CaptureExit::Cancelled);
            }

            match self.events.poll(self.poll_interval) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    trace!("poll failed, retrying: {}", e);
                    if cancel.wait_timeout(self.poll_interval) {
                        return Ok(CaptureExit::Cancelled);
                    }
                    continue;
                }
            }

            let key = match self.events.read() {
                Ok(Event::Key(key)) => key,
                Ok(_) => continue,
                Err(e) => {
                    trace!("read failed, retrying: {}", e);
                    continue;
                }
            };

            match key_to_input(&key) {
                Some(KeyInput::Abort) => return Ok(CaptureExit::Aborted),
                Some(KeyInput::Char(c)) => {
                    if let Some(exit) = forward(c, &cancel, &out) {
                        return Ok(exit);
                    }
                }
                None => {}
            }
        }
    }
}

/// Replays a fixed key sequence, then stays quiet until cancelled.
///
/// Used for headless sessions and tests. [`ETX`] in the script aborts like
/// Ctrl-C on a terminal.
#[derive(Debug, Clone)]
pub struct ScriptedInput {
    keys: Vec<char>,
    delay: Duration,
}

impl ScriptedInput {
    pub fn new<I: IntoIterator<Item = char>>(keys: I) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            delay: Duration::ZERO,
        }
    }

    /// Pause before every key.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl From<&str> for ScriptedInput {
    fn from(s: &str) -> Self {
        Self::new(s.chars())
    }
}

impl InputSource for ScriptedInput {
    fn capture(self, cancel: CancelSignal, out: Sender<char>) -> Result<CaptureExit, CaptureError> {
        for c in self.keys {
            let cancelled = if self.delay.is_zero() {
                cancel.is_cancelled()
            } else {
                cancel.wait_timeout(self.delay)
            };
            if cancelled {
                return Ok(CaptureExit::Cancelled);
            }
            if c == ETX {
                return Ok(CaptureExit::Aborted);
            }
            if let Some(exit) = forward(c, &cancel, &out) {
                return Ok(exit);
            }
        }

        // nothing is ever sent on the cancel channel, so this only returns once cancelled
        let _ = cancel.receiver().recv();
        Ok(CaptureExit::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::CancelScope;
    use assert_matches::assert_matches;
    use crossbeam_channel::bounded;
    use crossterm::event::KeyEventState;
    use std::collections::VecDeque;
    use std::thread;
    use std::time::Instant;

    enum Queued {
        PollError,
        ReadError,
        Ready(Event),
    }

    /// Canned terminal events; idles like a quiet terminal once drained.
    struct QueuedEvents(VecDeque<Queued>);

    impl QueuedEvents {
        fn new<I: IntoIterator<Item = Queued>>(events: I) -> Self {
            Self(events.into_iter().collect())
        }
    }

    impl KeyEventSource for QueuedEvents {
        fn poll(&mut self, timeout: Duration) -> io::Result<bool> {
            match self.0.front() {
                Some(Queued::PollError) => {
                    self.0.pop_front();
                    Err(io::Error::new(io::ErrorKind::Interrupted, "poll"))
                }
                Some(_) => Ok(true),
                None => {
                    thread::sleep(timeout);
                    Ok(false)
                }
            }
        }

        fn read(&mut self) -> io::Result<Event> {
            match self.0.pop_front() {
                Some(Queued::Ready(event)) => Ok(event),
                _ => Err(io::Error::new(io::ErrorKind::Interrupted, "read")),
            }
        }
    }

    fn key(c: char) -> Queued {
        Queued::Ready(Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)))
    }

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn plain_chars_are_forwarded() {
        assert_eq!(
            key_to_input(&press(KeyCode::Char('a'), KeyModifiers::NONE)),
            Some(KeyInput::Char('a'))
        );
        assert_eq!(
            key_to_input(&press(KeyCode::Char('A'), KeyModifiers::SHIFT)),
            Some(KeyInput::Char('A'))
        );
        assert_eq!(
            key_to_input(&press(KeyCode::Char(' '), KeyModifiers::NONE)),
            Some(KeyInput::Char(' '))
        );
        assert_eq!(
            key_to_input(&press(KeyCode::Tab, KeyModifiers::NONE)),
            Some(KeyInput::Char('\t'))
        );
    }

    #[test]
    fn enter_maps_to_carriage_return() {
        assert_eq!(
            key_to_input(&press(KeyCode::Enter, KeyModifiers::NONE)),
            Some(KeyInput::Char('\r'))
        );
    }

    #[test]
    fn ctrl_c_aborts() {
        assert_eq!(
            key_to_input(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(KeyInput::Abort)
        );
        assert_eq!(
            key_to_input(&press(KeyCode::Char(ETX), KeyModifiers::NONE)),
            Some(KeyInput::Abort)
        );
    }

    #[test]
    fn other_keys_are_ignored() {
        assert_eq!(key_to_input(&press(KeyCode::Backspace, KeyModifiers::NONE)), None);
        assert_eq!(key_to_input(&press(KeyCode::Esc, KeyModifiers::NONE)), None);
        assert_eq!(
            key_to_input(&press(KeyCode::Char('x'), KeyModifiers::ALT)),
            None
        );
        assert_eq!(
            key_to_input(&press(KeyCode::Char('w'), KeyModifiers::CONTROL)),
            None
        );
    }

    #[test]
    fn releases_are_ignored() {
        let release = KeyEvent {
            code: KeyCode::Char('a'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(key_to_input(&release), None);
    }

    #[test]
    fn scripted_input_replays_then_waits_for_cancel() {
        let (mut scope, signal) = CancelScope::new();
        let (tx, rx) = bounded(100);

        let handle = thread::spawn(move || ScriptedInput::from("hey").capture(signal, tx));

        let got: Vec<char> = (0..3).map(|_| rx.recv().unwrap()).collect();
        assert_eq!(got, vec!['h', 'e', 'y']);

        scope.cancel();
        assert_matches!(handle.join().unwrap(), Ok(CaptureExit::Cancelled));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn scripted_input_stops_at_abort() {
        let (_scope, signal) = CancelScope::new();
        let (tx, rx) = bounded(100);

        let exit = ScriptedInput::new(['a', ETX, 'b']).capture(signal, tx);

        assert_matches!(exit, Ok(CaptureExit::Aborted));
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec!['a']);
    }

    #[test]
    fn scripted_input_reports_disconnect() {
        let (_scope, signal) = CancelScope::new();
        let (tx, rx) = bounded(1);
        drop(rx);

        let exit = ScriptedInput::from("abc").capture(signal, tx);
        assert_matches!(exit, Ok(CaptureExit::Disconnected));
    }

    #[test]
    fn blocked_send_observes_cancel() {
        let (mut scope, signal) = CancelScope::new();
        // no room and nobody reading
        let (tx, _rx) = bounded(0);

        let handle = thread::spawn(move || ScriptedInput::from("abc").capture(signal, tx));
        thread::sleep(Duration::from_millis(10));
        scope.cancel();

        assert_matches!(handle.join().unwrap(), Ok(CaptureExit::Cancelled));
    }

    #[test]
    fn terminal_input_retries_failed_reads() {
        let (mut scope, signal) = CancelScope::new();
        let (tx, rx) = bounded(100);
        let events = QueuedEvents::new([
            Queued::PollError,
            Queued::ReadError,
            key('o'),
            Queued::Ready(Event::FocusGained),
            key('k'),
        ]);

        let handle = thread::spawn(move || TerminalInput::with_source(events).capture(signal, tx));

        let got: Vec<char> = (0..2)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap())
            .collect();
        assert_eq!(got, vec!['o', 'k']);

        scope.cancel();
        assert_matches!(handle.join().unwrap(), Ok(CaptureExit::Cancelled));
    }

    #[test]
    fn terminal_input_notices_cancel_while_idle() {
        let (mut scope, signal) = CancelScope::new();
        let (tx, _rx) = bounded(100);

        let handle = thread::spawn(move || {
            TerminalInput::with_source(QueuedEvents::new(Vec::new())).capture(signal, tx)
        });
        thread::sleep(Duration::from_millis(20));

        let cancelled_at = Instant::now();
        scope.cancel();
        let exit = handle.join().unwrap();

        assert_matches!(exit, Ok(CaptureExit::Cancelled));
        // at most one in-flight poll has to run out
        assert!(cancelled_at.elapsed() < POLL_INTERVAL * 2);
    }

    #[test]
    fn terminal_input_ctrl_c_pushes_nothing_further() {
        let (_scope, signal) = CancelScope::new();
        let (tx, rx) = bounded(100);
        let events = QueuedEvents::new([
            Queued::Ready(Event::Key(KeyEvent::new(
                KeyCode::Char('c'),
                KeyModifiers::CONTROL,
            ))),
            key('a'),
        ]);

        let exit = TerminalInput::with_source(events).capture(signal, tx);

        assert_matches!(exit, Ok(CaptureExit::Aborted));
        assert!(rx.try_recv().is_err());
    }
}
