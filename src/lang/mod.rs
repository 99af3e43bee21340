use clap::ValueEnum;
use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::from_str;

use crate::error::LanguageError;

static LANG_DIR: Dir = include_dir!("src/lang");

/// Word list difficulty.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    ValueEnum,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Lenient parse; anything unrecognised is medium.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Medium,
        }
    }

    pub fn as_lang(&self) -> Result<Language, LanguageError> {
        Language::new(&self.to_string())
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct Language {
    pub name: String,
    pub size: u32,
    pub words: Vec<String>,
}

impl Language {
    pub fn new(name: &str) -> Result<Self, LanguageError> {
        read_language_from_file(&format!("{}.json", name))
    }

    /// `num` words drawn with replacement.
    pub fn get_random(&self, num: usize) -> Vec<String> {
        let mut rng = rand::thread_rng();

        (0..num)
            .filter_map(|_| self.words.choose(&mut rng).cloned())
            .collect()
    }
}

fn read_language_from_file(file_name: &str) -> Result<Language, LanguageError> {
    let file = LANG_DIR
        .get_file(file_name)
        .ok_or_else(|| LanguageError::Missing(file_name.to_string()))?;

    let file_as_str = file
        .contents_utf8()
        .ok_or_else(|| LanguageError::Missing(file_name.to_string()))?;

    Ok(from_str(file_as_str)?)
}
