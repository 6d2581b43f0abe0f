//! Assistant persona loaded from a markdown file

use crate::error::Result;
use std::path::Path;

const GREETING_PREFIX: &str = "Greeting:";

/// Persona text and optional conversation greeting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Persona {
    pub text: String,
    pub greeting: Option<String>,
}

impl Persona {
    /// Load persona from a file. A missing file yields an empty persona.
    pub fn load(path: &Path) -> Result<Self> {
        if path.as_os_str().is_empty() || !path.exists() {
            tracing::debug!("No persona file at {}", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_text(text))
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let greeting = text
            .lines()
            .map(str::trim)
            .find_map(|line| line.strip_prefix(GREETING_PREFIX))
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty());
        Self { text, greeting }
    }

    /// Persona text cut to at most `max_chars` characters
    pub fn truncated(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.text[..idx],
            None => &self.text,
        }
    }
}
