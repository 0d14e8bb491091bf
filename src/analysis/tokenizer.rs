use std::collections::HashSet;

use crate::core::error::Result;

/// Classification of a rune relative to token boundaries.
///
/// ```text
///      ,----> Body
///     ////
///   Hello  my  friend
///   |     \___\________> Sep (spaces)
///   `-> Start
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuneType {
    /// Token breaker; ends any pending token and is discarded.
    Sep,
    /// Ends any pending token and begins a new one with the current rune.
    Start,
    /// Extends the pending token, or begins one if none is pending.
    Body,
}

/// Splits a rune stream into tokens using a caller-supplied classifier.
///
/// `classify` receives the previous and the current rune (`'\0'` before the
/// first one). A pending token at end of input is emitted. If `output`
/// returns an error, tokenizing stops and the error is returned unchanged.
pub fn tokenize<I, C, F>(mut classify: C, chars: I, mut output: F) -> Result<()>
where
    I: IntoIterator<Item = char>,
    C: FnMut(char, char) -> RuneType,
    F: FnMut(&str) -> Result<()>,
{
    let mut last = '\0';
    let mut pending = String::new();
    for current in chars {
        let rune_type = classify(last, current);
        if rune_type == RuneType::Start || rune_type == RuneType::Sep {
            if !pending.is_empty() {
                output(&pending)?;
                pending.clear();
            }
        }
        if rune_type == RuneType::Start || rune_type == RuneType::Body {
            pending.push(current);
        }
        last = current;
    }
    if !pending.is_empty() {
        return output(&pending);
    }
    Ok(())
}

/// Tokenizes `chars` treating every rune of `seps` as a separator.
pub fn tokenize_by_separators<I, F>(seps: &str, chars: I, output: F) -> Result<()>
where
    I: IntoIterator<Item = char>,
    F: FnMut(&str) -> Result<()>,
{
    let separators: HashSet<char> = seps.chars().collect();
    tokenize(
        move |_, current| {
            if separators.contains(&current) {
                RuneType::Sep
            } else {
                RuneType::Body
            }
        },
        chars,
        output,
    )
}

/// Adapts a separator predicate into a classifier usable with [`tokenize`]
/// and [`mark_text`](crate::analysis::marktext::mark_text).
pub fn separator_classifier<P>(is_separator: P) -> impl FnMut(char, char) -> RuneType
where
    P: Fn(char) -> bool,
{
    move |_, current| {
        if is_separator(current) {
            RuneType::Sep
        } else {
            RuneType::Body
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_tokens<C>(classify: C, text: &str) -> Vec<String>
    where
        C: FnMut(char, char) -> RuneType,
    {
        let mut tokens = Vec::new();
        tokenize(classify, text.chars(), |token| {
            tokens.push(token.to_string());
            Ok(())
        })
        .unwrap();
        tokens
    }

    #[test]
    fn classifier_driven_tokenize() {
        // An apostrophe both ends the pending token and forms its own.
        let tokens = collect_tokens(
            |last, current| {
                if current.is_whitespace() {
                    RuneType::Sep
                } else if current == '\'' || last == '\'' {
                    RuneType::Start
                } else {
                    RuneType::Body
                }
            },
            "abc de'f  ghi\tjk",
        );
        assert_eq!(tokens, vec!["abc", "de", "'", "f", "ghi", "jk"]);
    }

    #[test]
    fn tokenize_by_separator_set() {
        let mut tokens = Vec::new();
        tokenize_by_separators(" ,", "GO go go, my dog".chars(), |token| {
            tokens.push(token.to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(tokens, vec!["GO", "go", "go", "my", "dog"]);
    }

    #[test]
    fn pending_token_flushed_at_end_of_input() {
        let tokens = collect_tokens(separator_classifier(char::is_whitespace), "tail");
        assert_eq!(tokens, vec!["tail"]);
    }

    #[test]
    fn separator_classifier_types() {
        let mut classify = separator_classifier(char::is_whitespace);
        assert_eq!(classify('a', ' '), RuneType::Sep);
        assert_eq!(classify('a', 'a'), RuneType::Body);
    }

    #[test]
    fn output_error_stops_tokenizing() {
        use crate::core::error::{Error, ErrorKind};

        let mut seen = 0;
        let err = tokenize_by_separators(" ", "one two three".chars(), |_| {
            seen += 1;
            if seen == 2 {
                Err(Error::new(ErrorKind::Canceled, "enough".to_string()))
            } else {
                Ok(())
            }
        })
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Canceled);
        assert_eq!(seen, 2);
    }
}
