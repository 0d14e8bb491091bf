use crate::analysis::tokenizer::RuneType;
use crate::core::error::Result;

/// Streams `text` as alternating separator runs and tokens.
///
/// Separator runs always go to `output`. A token goes to `mark` when
/// `need_mark` says so, otherwise to `output`. Every input byte is emitted
/// exactly once across the two sinks, and a `Start` rune begins a new token
/// mid-run. A sink error aborts the traversal and is returned unchanged.
pub fn mark_text<C, M, F, G>(
    text: &str,
    mut classify: C,
    mut need_mark: M,
    mut output: F,
    mut mark: G,
) -> Result<()>
where
    C: FnMut(char, char) -> RuneType,
    M: FnMut(&str) -> bool,
    F: FnMut(&str) -> Result<()>,
    G: FnMut(&str) -> Result<()>,
{
    let mut rest = text;
    let mut current = match rest.chars().next() {
        Some(first) => first,
        None => return Ok(()),
    };
    let mut size = current.len_utf8();
    let mut rune_type = classify('\0', current);
    loop {
        // rest is non-empty; current/size/rune_type describe rest[..size]
        let mut p = 0;

        // separator run, if any
        while rune_type == RuneType::Sep {
            p += size;
            match rest[p..].chars().next() {
                Some(next) => {
                    let last = current;
                    current = next;
                    size = next.len_utf8();
                    rune_type = classify(last, current);
                }
                None => break,
            }
        }
        if p > 0 {
            output(&rest[..p])?;
            if p == rest.len() {
                // text ends with a separator run
                break;
            }
            rest = &rest[p..];
            p = 0;
        }
        // rest starts with a non-separator rune here

        // token run: the first rune unconditionally, then Body runes
        loop {
            p += size;
            match rest[p..].chars().next() {
                Some(next) => {
                    let last = current;
                    current = next;
                    size = next.len_utf8();
                    rune_type = classify(last, current);
                }
                None => break,
            }
            if rune_type != RuneType::Body {
                break;
            }
        }

        let token = &rest[..p];
        if need_mark(token) {
            mark(token)?;
        } else {
            output(token)?;
        }

        if p == rest.len() {
            // text ends with a token
            break;
        }
        rest = &rest[p..];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{Error, ErrorKind};
    use std::cell::RefCell;

    fn camel_classifier(_last: char, current: char) -> RuneType {
        if current.is_whitespace() {
            RuneType::Sep
        } else if current.is_ascii_uppercase() {
            RuneType::Start
        } else {
            RuneType::Body
        }
    }

    #[test]
    fn marks_tokens_with_uppercase_starts() {
        let out = RefCell::new(String::new());
        mark_text(
            "Hello myFriend",
            camel_classifier,
            |_| true,
            |text| {
                out.borrow_mut().push_str(text);
                Ok(())
            },
            |token| {
                out.borrow_mut().push('<');
                out.borrow_mut().push_str(token);
                out.borrow_mut().push('>');
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(out.into_inner(), "<Hello> <my><Friend>");
    }

    #[test]
    fn every_byte_reaches_exactly_one_sink() {
        let text = " lead middle  trail ";
        let rebuilt = RefCell::new(String::new());
        mark_text(
            text,
            separator(),
            |token| token == "middle",
            |part| {
                rebuilt.borrow_mut().push_str(part);
                Ok(())
            },
            |token| {
                rebuilt.borrow_mut().push_str(token);
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(rebuilt.into_inner(), text);
    }

    #[test]
    fn empty_text_is_a_no_op() {
        mark_text(
            "",
            separator(),
            |_| true,
            |_| panic!("no output expected"),
            |_| panic!("no mark expected"),
        )
        .unwrap();
    }

    #[test]
    fn mark_error_aborts() {
        let err = mark_text(
            "a b",
            separator(),
            |_| true,
            |_| Ok(()),
            |_| Err(Error::new(ErrorKind::Canceled, "stop".to_string())),
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Canceled);
    }

    fn separator() -> impl FnMut(char, char) -> RuneType {
        crate::analysis::tokenizer::separator_classifier(char::is_whitespace)
    }
}
