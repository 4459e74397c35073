//! Comment stripping for procedure bodies.
//!
//! Every body analyzer works on the stripped text so commented-out code and
//! prose never trigger a detector or produce a reference.

/// Strip SQL comments from body text.
///
/// Removes line comments (`-- ...`) and block comments (`/* ... */`, nested
/// as SQL Server allows). Comment markers inside string literals, quoted
/// identifiers and `[bracketed]` identifiers are left alone. A block comment
/// is replaced by a single space plus any newlines it spanned; a line comment
/// keeps its terminating newline. An unterminated block comment swallows the
/// rest of the text.
pub fn strip_comments(body: &str) -> String {
    let mut result = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    // Closing delimiter of the literal/identifier we are inside, if any
    let mut closing: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(close) = closing {
            result.push(c);
            if c == close {
                // '' and ]] are escapes that stay inside the literal
                if chars.peek() == Some(&close) {
                    result.push(close);
                    chars.next();
                } else {
                    closing = None;
                }
            }
            continue;
        }

        match c {
            '\'' | '"' => {
                closing = Some(c);
                result.push(c);
            }
            '[' => {
                closing = Some(']');
                result.push(c);
            }
            '-' if chars.peek() == Some(&'-') => {
                // Skip until end of line, keeping the newline
                for ch in chars.by_ref() {
                    if ch == '\n' {
                        result.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut depth = 1usize;
                result.push(' ');
                while let Some(ch) = chars.next() {
                    match ch {
                        '/' if chars.peek() == Some(&'*') => {
                            chars.next();
                            depth += 1;
                        }
                        '*' if chars.peek() == Some(&'/') => {
                            chars.next();
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        '\n' => result.push('\n'),
                        _ => {}
                    }
                }
            }
            _ => result.push(c),
        }
    }

    result
}
