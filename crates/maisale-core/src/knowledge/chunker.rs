//! Word-window chunking for knowledge documents

/// A window of whitespace-separated words
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    /// Chunk number within its document
    pub position: usize,
    pub word_count: usize,
}

/// Split `content` into windows of `chunk_size` words, consecutive windows
/// sharing `overlap` words. Words are re-joined with single spaces.
pub fn chunk_words(content: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let words: Vec<&str> = content.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let size = chunk_size.max(1);
    let step = size - overlap.min(size - 1);

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(words.len());
        chunks.push(Chunk {
            text: words[start..end].join(" "),
            position: chunks.len(),
            word_count: end - start,
        });
        if end == words.len() {
            break;
        }
        start += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_content_single_chunk() {
        let chunks = chunk_words("Card  đồ họa\nRTX 4060", 400, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Card đồ họa RTX 4060");
        assert_eq!(chunks[0].word_count, 5);
    }

    #[test]
    fn test_windows_overlap() {
        let chunks = chunk_words("a b c d e f g", 3, 1);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["a b c", "c d e", "e f g"]);
        assert_eq!(chunks[2].position, 2);
    }

    #[test]
    fn test_no_overlap() {
        let chunks = chunk_words("a b c d e", 2, 0);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["a b", "c d", "e"]);
    }

    #[test]
    fn test_degenerate_settings_still_progress() {
        assert_eq!(chunk_words("a b c", 0, 5).len(), 3);
        assert_eq!(chunk_words("a b c", 2, 9).len(), 2);
        assert!(chunk_words("   \n", 10, 2).is_empty());
    }
}
