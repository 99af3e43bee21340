use anyhow::{Context, Result};
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::tty::IsTty;
use log::info;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    io::{self, stdin, Write},
    path::PathBuf,
};

use typerace::{
    config::{Config, ConfigStore, FileConfigStore},
    engine::Engine,
    history::{HistoryDb, HistoryStore},
    input::TerminalInput,
    lang::Difficulty,
    session::{EndReason, SessionSummary},
    ui::{report, AlternateScreen, DisplayOptions, TerminalObserver},
    word_generator::{WordGenConfig, WordGenerator},
};

/// timed terminal typing test
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A timed typing test for the terminal. Type the generated words as they appear; the session ends when you finish the text, press Enter, or run out of time."
)]
pub struct Cli {
    /// number of words to type
    #[clap(short = 'w', long = "words")]
    number_of_words: Option<usize>,

    /// difficulty of the generated words
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// time limit in seconds (0 for no limit)
    #[clap(short = 't', long = "time")]
    time_limit_secs: Option<u64>,

    /// custom prompt to type instead of generated words
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// config file (default: platform config dir)
    #[clap(long = "config")]
    config_path: Option<PathBuf>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// run a typing test (default)
    Run,
    /// view typing statistics
    Stats,
    /// view the effective configuration
    Config {
        /// persist the effective configuration, including flags given on this invocation
        #[clap(long)]
        save: bool,
    },
}

impl Cli {
    fn config_store(&self) -> FileConfigStore {
        match self.config_path {
            Some(ref path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }

    /// Flags given on the command line win over stored settings.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(n) = self.number_of_words {
            config.number_of_words = n;
        }
        if let Some(d) = self.difficulty {
            config.difficulty = d;
        }
        if let Some(t) = self.time_limit_secs {
            config.time_limit_secs = t;
        }
        config
    }

    fn to_word_gen_config(&self, config: &Config) -> WordGenConfig {
        WordGenConfig {
            number_of_words: config.number_of_words,
            difficulty: config.difficulty,
            custom_prompt: self.prompt.clone(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let store = cli.config_store();
    let config = cli.apply(store.load());

    match cli.command.clone().unwrap_or(Command::Run) {
        Command::Run => run_session(&cli, &config),
        Command::Stats => show_stats(),
        Command::Config { save } => show_config(&store, &config, save),
    }
}

fn run_session(cli: &Cli, config: &Config) -> Result<()> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let words = WordGenerator::new(cli.to_word_gen_config(config))
        .generate_words()
        .context("generating target words")?;
    let engine = Engine::new(words, config.session_config())?;

    let mut stdout = io::stdout();
    report::write_welcome(&mut stdout, config)?;
    writeln!(stdout, "\nPress Enter to start...")?;
    stdout.flush()?;
    stdin().read_line(&mut String::new())?;

    let summary = {
        let _screen = AlternateScreen::enter().context("entering alternate screen")?;
        let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        let mut observer = TerminalObserver::new(
            terminal,
            engine.config().deadline(),
            DisplayOptions::from(config),
        );
        observer.begin(engine.target());
        engine.start(&mut observer, TerminalInput::new())
    };

    report::write_results(&mut stdout, &summary)?;

    let mut history = HistoryDb::open_default().context("opening session history")?;
    record_session(&mut history, &summary)
}

/// Appends a finished session; aborted ones are skipped.
fn record_session<H: HistoryStore>(history: &mut H, summary: &SessionSummary) -> Result<()> {
    if summary.end_reason == EndReason::Aborted {
        info!("aborted session not recorded");
        return Ok(());
    }
    history
        .append(summary)
        .context("saving session history")
}

fn show_stats() -> Result<()> {
    let history = HistoryDb::open_default().context("opening session history")?;
    let sessions = history.load().context("loading session history")?;
    report::write_stats(&mut io::stdout(), &sessions)?;
    Ok(())
}

fn show_config(store: &FileConfigStore, config: &Config, save: bool) -> Result<()> {
    if save {
        store
            .save(config)
            .with_context(|| format!("writing {}", store.path().display()))?;
    }
    report::write_config(&mut io::stdout(), config, store.path())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["typerace"]);

        assert_eq!(cli.number_of_words, None);
        assert_eq!(cli.difficulty, None);
        assert_eq!(cli.time_limit_secs, None);
        assert_eq!(cli.prompt, None);
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_cli_short_and_long_flags() {
        let cli = Cli::parse_from(["typerace", "-w", "25", "-d", "hard", "-t", "30"]);
        assert_eq!(cli.number_of_words, Some(25));
        assert_eq!(cli.difficulty, Some(Difficulty::Hard));
        assert_eq!(cli.time_limit_secs, Some(30));

        let cli = Cli::parse_from(["typerace", "--words", "5", "--difficulty", "easy", "--time", "0"]);
        assert_eq!(cli.number_of_words, Some(5));
        assert_eq!(cli.difficulty, Some(Difficulty::Easy));
        assert_eq!(cli.time_limit_secs, Some(0));
    }

    #[test]
    fn test_cli_rejects_unknown_difficulty() {
        assert!(Cli::try_parse_from(["typerace", "-d", "insane"]).is_err());
    }

    #[test]
    fn test_cli_subcommands() {
        assert_eq!(Cli::parse_from(["typerace", "stats"]).command, Some(Command::Stats));
        assert_eq!(Cli::parse_from(["typerace", "run"]).command, Some(Command::Run));
        assert_eq!(
            Cli::parse_from(["typerace", "config", "--save"]).command,
            Some(Command::Config { save: true })
        );
    }

    #[test]
    fn test_flags_override_stored_config() {
        let stored = Config {
            number_of_words: 40,
            difficulty: Difficulty::Easy,
            time_limit_secs: 90,
            show_wpm: false,
            show_errors: true,
        };

        let cli = Cli::parse_from(["typerace", "-t", "15"]);
        let config = cli.apply(stored.clone());

        assert_eq!(config.time_limit_secs, 15);
        assert_eq!(config.number_of_words, 40);
        assert_eq!(config.difficulty, Difficulty::Easy);
        assert!(!config.show_wpm);

        let untouched = Cli::parse_from(["typerace"]).apply(stored.clone());
        assert_eq!(untouched, stored);
    }

    #[test]
    fn test_custom_prompt_reaches_word_generation() {
        let cli = Cli::parse_from(["typerace", "-p", "hello world"]);
        let gen_config = cli.to_word_gen_config(&Config::default());

        assert_eq!(gen_config.custom_prompt, Some("hello world".to_string()));
        assert_eq!(gen_config.number_of_words, 20);
    }

    #[test]
    fn test_explicit_config_path() {
        let cli = Cli::parse_from(["typerace", "--config", "/tmp/custom.json"]);
        assert_eq!(cli.config_store().path(), std::path::Path::new("/tmp/custom.json"));
    }

    fn finished(end_reason: EndReason) -> SessionSummary {
        SessionSummary {
            typing_speed: 42.0,
            accuracy: 97.5,
            total_words: 10,
            matched_words: 9,
            error_count: 1,
            duration: std::time::Duration::from_secs(15),
            completed_at: chrono::Local::now(),
            end_reason,
        }
    }

    struct BrokenHistory;

    impl HistoryStore for BrokenHistory {
        fn append(&mut self, _: &SessionSummary) -> Result<(), typerace::error::HistoryError> {
            Err(rusqlite::Error::InvalidQuery.into())
        }

        fn load(&self) -> Result<Vec<SessionSummary>, typerace::error::HistoryError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_record_session_skips_aborted() {
        let mut history = HistoryDb::open_in_memory().unwrap();

        record_session(&mut history, &finished(EndReason::Aborted)).unwrap();
        assert!(history.load().unwrap().is_empty());

        record_session(&mut history, &finished(EndReason::Deadline)).unwrap();
        assert_eq!(history.load().unwrap().len(), 1);
    }

    #[test]
    fn test_record_session_surfaces_store_error_once() {
        let err = record_session(&mut BrokenHistory, &finished(EndReason::FinishKey)).unwrap_err();

        assert_eq!(err.to_string(), "saving session history");
        assert_eq!(err.chain().count(), 3);
    }
}
