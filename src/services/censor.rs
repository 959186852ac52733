//! Bad-word censoring
//!
//! A word is one leading Latin or Cyrillic letter followed by lowercase
//! letters. If its lowercased form is on the block-list, every letter after
//! the first becomes `*`. Words with uppercase letters after the first are
//! left alone, so "Редиска" is censored but "РеДиска" is not.

use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::config::CensorConfig;

const WORD_PATTERN: &str = r"\b([A-Za-zА-Яа-яЁё])([a-zа-яё]+)\b";

/// Error returned when the filter is given something other than text
#[derive(Debug, thiserror::Error)]
pub enum CensorError {
    #[error("censor: expected a string, got {0}")]
    NotText(&'static str),

    #[error("censor: invalid word pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Block-list filter for displayed text
#[derive(Debug, Clone)]
pub struct Censor {
    word_re: Regex,
    bad_words: HashSet<String>,
}

impl Censor {
    pub fn new<I, S>(bad_words: I) -> Result<Self, CensorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            word_re: Regex::new(WORD_PATTERN)?,
            bad_words: bad_words
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
        })
    }

    pub fn from_config(config: &CensorConfig) -> Result<Self, CensorError> {
        Self::new(&config.bad_words)
    }

    /// Censor every blocked word in `text`
    pub fn apply(&self, text: &str) -> String {
        self.word_re
            .replace_all(text, |caps: &Captures| {
                let first = &caps[1];
                let rest = &caps[2];
                let word = &caps[0];
                if rest == rest.to_lowercase() && self.bad_words.contains(&word.to_lowercase()) {
                    format!("{}{}", first, "*".repeat(rest.chars().count()))
                } else {
                    word.to_string()
                }
            })
            .into_owned()
    }

    /// Censor a JSON value, which must be a string
    pub fn apply_value(&self, value: &Value) -> Result<String, CensorError> {
        match value {
            Value::String(s) => Ok(self.apply(s)),
            other => Err(CensorError::NotText(value_kind(other))),
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Usable in templates as `{{ post.title | censor }}`
impl tera::Filter for Censor {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        self.apply_value(value)
            .map(Value::String)
            .map_err(|e| tera::Error::msg(e.to_string()))
    }
}
