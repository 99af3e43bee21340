use crate::{error::LanguageError, lang::Difficulty};

/// Word count used when zero words are requested.
pub const FALLBACK_WORD_COUNT: usize = 10;

/// Configuration for word generation
#[derive(Debug, Clone)]
pub struct WordGenConfig {
    pub number_of_words: usize,
    pub difficulty: Difficulty,
    pub custom_prompt: Option<String>,
}

impl Default for WordGenConfig {
    fn default() -> Self {
        Self {
            number_of_words: 20,
            difficulty: Difficulty::default(),
            custom_prompt: None,
        }
    }
}

/// Produces the target words for a session
pub struct WordGenerator {
    config: WordGenConfig,
}

impl WordGenerator {
    pub fn new(config: WordGenConfig) -> Self {
        Self { config }
    }

    /// Target words for one session. A custom prompt is used verbatim, split on whitespace.
    pub fn generate_words(&self) -> Result<Vec<String>, LanguageError> {
        if let Some(ref custom_prompt) = self.config.custom_prompt {
            return Ok(custom_prompt.split_whitespace().map(String::from).collect());
        }

        let count = match self.config.number_of_words {
            0 => FALLBACK_WORD_COUNT,
            n => n,
        };

        let language = self.config.difficulty.as_lang()?;
        Ok(language.get_random(count))
    }
}
