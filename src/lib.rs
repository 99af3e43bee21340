// Library surface shared by the binary and the integration tests.
pub mod app_dirs;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod input;
pub mod lang;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod ui;
pub mod util;
pub mod word_generator;

pub use engine::Engine;
pub use session::{EndReason, ProgressObserver, SessionConfig, SessionSummary};
