//! Reply language detection

use super::{ChatMessage, Language, Role};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"[\p{L}\p{N}]+").unwrap();
}

/// Letters that only occur in Vietnamese text
const VIETNAMESE_LETTERS: &str = "ăâđêôơưàáảãạằắẳẵặầấẩẫậèéẻẽẹềếểễệìíỉĩịòóỏõọồốổỗộờớởỡợùúủũụừứửữựỳýỷỹỵ";

/// Common unaccented Vietnamese words (typed without diacritics)
const VIETNAMESE_WORDS: &[&str] = &[
    "anh", "chi", "em", "ban", "minh", "toi", "khong", "co", "gia", "bao", "nhieu", "mua",
    "may", "tinh", "hang", "cho", "voi", "duoc", "nao", "gi", "a", "nhe", "oi", "xin", "chao",
    "cam", "on", "lap", "rap", "hanh",
];

const ENGLISH_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "what", "how", "much", "price", "buy", "need", "want",
    "help", "hello", "hi", "please", "can", "could", "you", "i", "my", "for", "with", "warranty",
    "build", "order", "thanks", "thank", "does", "do", "where", "when",
];

/// Guess the language of one message. Ambiguous input yields Vietnamese.
pub fn detect_language(text: &str) -> Language {
    let lower = text.to_lowercase();
    if lower.chars().any(|c| VIETNAMESE_LETTERS.contains(c)) {
        return Language::Vi;
    }

    let mut vi = 0usize;
    let mut en = 0usize;
    for word in WORD_RE.find_iter(&lower).map(|m| m.as_str()) {
        if VIETNAMESE_WORDS.contains(&word) {
            vi += 1;
        }
        if ENGLISH_WORDS.contains(&word) {
            en += 1;
        }
    }

    if en > vi {
        Language::En
    } else {
        Language::Vi
    }
}

/// Language of a conversation, fixed by its first user message
pub fn conversation_language(history: &[ChatMessage]) -> Language {
    history
        .iter()
        .find(|m| m.role == Role::User)
        .map(|m| detect_language(&m.content))
        .unwrap_or_default()
}
