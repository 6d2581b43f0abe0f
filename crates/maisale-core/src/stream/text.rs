//! Joining raw fragments into readable text

/// Characters that attach to the preceding word
const CLOSING_PUNCTUATION: &[char] = &[',', '.', ':', ';', '!', '?', ')', ']', '}'];

/// Append `fragment` to `existing`, deciding whether a space belongs between.
///
/// - an empty fragment changes nothing
/// - a fragment of only newlines becomes one paragraph break
/// - a fragment starting with whitespace or closing punctuation is appended as is
/// - nothing is inserted after empty text or trailing whitespace
/// - alphanumeric meets alphanumeric: sub-word pieces, concatenated
/// - anything else gets exactly one space
pub fn smart_append(existing: &str, fragment: &str) -> String {
    let Some(first) = fragment.chars().next() else {
        return existing.to_string();
    };

    if fragment.chars().all(|c| c == '\n') {
        if existing.ends_with("\n\n") {
            return existing.to_string();
        }
        return format!("{}\n\n", existing);
    }

    let direct = || format!("{}{}", existing, fragment);

    if first.is_whitespace() || CLOSING_PUNCTUATION.contains(&first) {
        return direct();
    }

    let Some(last) = existing.chars().last() else {
        return direct();
    };
    if last.is_whitespace() {
        return direct();
    }
    if last.is_alphanumeric() && first.is_alphanumeric() {
        return direct();
    }

    format!("{} {}", existing, fragment)
}

/// Fold fragments left to right with [`smart_append`]
pub fn reassemble_text<I, S>(fragments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fragments
        .into_iter()
        .fold(String::new(), |acc, f| smart_append(&acc, f.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rules() {
        assert_eq!(smart_append("Hello", ""), "Hello");
        assert_eq!(smart_append("Hello", " world"), "Hello world");
        assert_eq!(smart_append("Hello", ","), "Hello,");
        assert_eq!(smart_append("Hello", "."), "Hello.");
        assert_eq!(smart_append("", "Hello"), "Hello");
        assert_eq!(smart_append("Hello ", "world"), "Hello world");
        assert_eq!(smart_append("Thi", "ết"), "Thiết");
        assert_eq!(smart_append("giá", "123"), "giá123");
        assert_eq!(smart_append("Hello,", "world"), "Hello, world");
        assert_eq!(smart_append("(", "x"), "( x");
        assert_eq!(smart_append("done", "\n\n\n"), "done\n\n");
        assert_eq!(smart_append("done\n\n", "\n"), "done\n\n");
    }

    #[test]
    fn test_reassemble_text() {
        let fragments = ["Xin", " chào", "!", "Em", " là", " Mai", "."];
        assert_eq!(reassemble_text(fragments), "Xin chào! Em là Mai.");
        assert_eq!(reassemble_text(Vec::<String>::new()), "");
    }

    proptest! {
        #[test]
        fn prop_empty_fragment_is_identity(s in ".*") {
            prop_assert_eq!(smart_append(&s, ""), s);
        }

        #[test]
        fn prop_period_never_gets_a_space(s in ".*", tail in "[a-z ]*") {
            let fragment = format!(".{}", tail);
            let out = smart_append(&s, &fragment);
            prop_assert_eq!(out, format!("{}{}", s, fragment));
        }

        #[test]
        fn prop_existing_text_is_a_prefix(s in ".*", f in ".*") {
            let out = smart_append(&s, &f);
            prop_assert!(out.starts_with(s.as_str()));
        }
    }
}
