//! Session orchestration.
//!
//! [`Engine::start`] runs one session: the input capture source and the
//! optional deadline timer run on their own threads and only ever send on
//! channels, while the dispatch loop on the calling thread owns the typed
//! buffer and the counters and decides when the session is over.

use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{bounded, never, select, Receiver, Sender};
use log::{debug, trace, warn};

use crate::error::EngineError;
use crate::input::{CaptureExit, InputSource};
use crate::runtime::{fire_after, CancelScope, CancelSignal};
use crate::scoring;
use crate::session::{EndReason, ProgressObserver, SessionConfig, SessionSummary};

/// Buffered keystrokes between the capture thread and the dispatch loop.
pub const CHAR_CHANNEL_CAPACITY: usize = 100;

/// Keys that end the session early.
pub const FINISH_KEYS: [char; 2] = ['\n', '\r'];

#[derive(Debug, Clone)]
pub struct Engine {
    words: Vec<String>,
    target: String,
    target_chars: Vec<char>,
    config: SessionConfig,
}

/// State owned by the dispatch loop.
#[derive(Debug, Default)]
struct Tally {
    typed: String,
    typed_len: usize,
    correct: usize,
    errors: usize,
}

impl Engine {
    pub fn new(words: Vec<String>, config: SessionConfig) -> Result<Self, EngineError> {
        let target = words.join(" ");
        if words.is_empty() || target.trim().is_empty() {
            return Err(EngineError::EmptyTarget);
        }

        Ok(Self {
            target_chars: target.chars().collect(),
            target,
            words,
            config,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Runs one session to completion and scores it.
    ///
    /// Blocks until the finish key, the end of the target text, the deadline
    /// or an abort from `input`. Both background threads have exited by the
    /// time this returns, so `input` must honour its cancel signal.
    pub fn start<O, I>(&self, observer: &mut O, input: I) -> SessionSummary
    where
        O: ProgressObserver + ?Sized,
        I: InputSource,
    {
        let (mut scope, cancel) = CancelScope::new();
        let (char_tx, char_rx) = bounded::<char>(CHAR_CHANNEL_CAPACITY);
        let (done_tx, done_rx) = bounded::<EndReason>(1);

        let capture = spawn_capture(input, cancel.clone(), char_tx, done_tx.clone());
        let timer = self.config.deadline().map(|limit| {
            let cancel = cancel.clone();
            let done = done_tx.clone();
            thread::spawn(move || fire_after(limit, cancel, done))
        });
        drop(cancel);

        debug!(
            "session started: {} chars, time limit {:?}",
            self.target_chars.len(),
            self.config.deadline()
        );

        let started = Instant::now();
        let mut tally = Tally::default();
        let end_reason = self.dispatch_loop(observer, &char_rx, &done_tx, &done_rx, &mut tally);
        let elapsed = started.elapsed();
        scope.cancel();

        debug!("session ended by {} after {:?}", end_reason, elapsed);

        drop(char_rx);
        if capture.join().is_err() {
            warn!("input capture thread panicked");
        }
        if let Some(timer) = timer {
            if timer.join().is_err() {
                warn!("deadline timer thread panicked");
            }
        }

        scoring::score(
            &self.words,
            &tally.typed,
            tally.errors,
            tally.correct,
            elapsed,
            end_reason,
        )
    }

    fn dispatch_loop<O>(
        &self,
        observer: &mut O,
        char_rx: &Receiver<char>,
        done_tx: &Sender<EndReason>,
        done_rx: &Receiver<EndReason>,
        tally: &mut Tally,
    ) -> EndReason
    where
        O: ProgressObserver + ?Sized,
    {
        let closed = never::<char>();
        let mut input_open = true;

        loop {
            // a pending completion always wins over queued keystrokes
            if let Ok(reason) = done_rx.try_recv() {
                return reason;
            }

            let chars = if input_open { char_rx } else { &closed };

            select! {
                recv(done_rx) -> reason => {
                    if let Ok(reason) = reason {
                        return reason;
                    }
                }
                recv(chars) -> c => match c {
                    Ok(c) => self.accept(c, observer, done_tx, tally),
                    Err(_) => {
                        debug!("input channel closed");
                        input_open = false;
                    }
                },
            }
        }
    }

    fn accept<O>(&self, c: char, observer: &mut O, done_tx: &Sender<EndReason>, tally: &mut Tally)
    where
        O: ProgressObserver + ?Sized,
    {
        if FINISH_KEYS.contains(&c) {
            signal(done_tx, EndReason::FinishKey);
            return;
        }

        let target_len = self.target_chars.len();
        if tally.typed_len >= target_len {
            signal(done_tx, EndReason::LengthReached);
            return;
        }

        tally.typed.push(c);
        tally.typed_len += 1;
        observer.on_progress(&self.target, &tally.typed, tally.errors);

        let expected = self.target_chars[tally.typed_len - 1];
        if c == expected {
            tally.correct += 1;
        } else {
            tally.errors += 1;
        }
        trace!("key {:?} expected {:?}", c, expected);

        if tally.typed_len == target_len {
            signal(done_tx, EndReason::LengthReached);
        }
    }
}

/// Single-slot push; a full slot means a completion is already on its way.
fn signal(done_tx: &Sender<EndReason>, reason: EndReason) {
    if done_tx.try_send(reason).is_err() {
        trace!("completion already pending, dropping {}", reason);
    }
}

fn spawn_capture<I: InputSource>(
    input: I,
    cancel: CancelSignal,
    out: Sender<char>,
    done: Sender<EndReason>,
) -> JoinHandle<()> {
    thread::spawn(move || match input.capture(cancel, out) {
        Ok(CaptureExit::Aborted) => {
            debug!("input aborted by user");
            signal(&done, EndReason::Aborted);
        }
        Ok(exit) => debug!("input capture finished: {:?}", exit),
        Err(e) => warn!("input capture unavailable, session relies on its deadline: {}", e),
    })
}
