//! Text utilities shared by the pattern-based engines.
//!
//! Sanitizing replaces comment (and optionally string) characters with spaces of the same
//! UTF-8 width, so byte offsets and line numbers stay valid across the raw text and every
//! sanitized view of it.

/// Which literal kinds a language has.
#[derive(Debug, Clone, Copy)]
pub struct Dialect {
    /// Backtick template literals (JavaScript/TypeScript).
    pub template_literals: bool,
}

pub const JAVA: Dialect = Dialect {
    template_literals: false,
};

pub const SCRIPT: Dialect = Dialect {
    template_literals: true,
};

#[derive(Clone, Copy, PartialEq)]
enum State {
    Code,
    LineComment,
    BlockComment,
    Literal(char),
}

/// Blank comments. With `blank_strings`, also blank the contents of string literals
/// (delimiters are kept).
pub fn sanitize(source: &str, dialect: Dialect, blank_strings: bool) -> String {
    let mut out = String::with_capacity(source.len());
    let mut state = State::Code;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    out.push_str("  ");
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push_str("  ");
                    state = State::BlockComment;
                }
                '"' | '\'' => {
                    out.push(c);
                    state = State::Literal(c);
                }
                '`' if dialect.template_literals => {
                    out.push(c);
                    state = State::Literal(c);
                }
                _ => out.push(c),
            },
            State::LineComment => {
                if c == '\n' {
                    out.push('\n');
                    state = State::Code;
                } else {
                    blank(&mut out, c);
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push_str("  ");
                    state = State::Code;
                } else {
                    blank(&mut out, c);
                }
            }
            State::Literal(quote) => {
                if c == '\\' {
                    keep_or_blank(&mut out, c, blank_strings);
                    if let Some(escaped) = chars.next() {
                        keep_or_blank(&mut out, escaped, blank_strings);
                    }
                } else if c == quote {
                    out.push(c);
                    state = State::Code;
                } else if c == '\n' && quote != '`' {
                    // Unterminated literal; resynchronise at the line end.
                    out.push('\n');
                    state = State::Code;
                } else {
                    keep_or_blank(&mut out, c, blank_strings);
                }
            }
        }
    }

    out
}

fn blank(out: &mut String, c: char) {
    if c == '\n' {
        out.push('\n');
    } else {
        out.extend(std::iter::repeat(' ').take(c.len_utf8()));
    }
}

fn keep_or_blank(out: &mut String, c: char, blank_it: bool) {
    if blank_it {
        blank(out, c);
    } else {
        out.push(c);
    }
}

/// 1-based line number of a byte offset.
pub fn line_at(text: &str, offset: usize) -> u32 {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() as u32 + 1
}

/// Offset of the bracket closing the one at `open_at`. Expects sanitized text.
pub fn matching_close(text: &str, open_at: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let open = *bytes.get(open_at)?;
    let close = match open {
        b'(' => b')',
        b'{' => b'}',
        b'[' => b']',
        b'<' => b'>',
        _ => return None,
    };

    let mut depth = 0usize;
    for (i, b) in bytes.iter().enumerate().skip(open_at) {
        if *b == open {
            depth += 1;
        } else if *b == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Split on `sep` outside of any bracket pair.
pub fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut previous = ' ';

    for (i, c) in text.char_indices() {
        let after = previous;
        previous = c;
        match c {
            '(' | '[' | '{' | '<' => depth += 1,
            // `=>` is an arrow, not a closing bracket
            '>' if after == '=' => {}
            ')' | ']' | '}' | '>' => depth -= 1,
            _ if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);

    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}

/// Offset just after the last `;`, `{` or `}` before `offset`.
///
/// Used to find the annotation/decorator prefix that belongs to a declaration.
pub fn declaration_window_start(text: &str, offset: usize) -> usize {
    text[..offset.min(text.len())]
        .rfind(&[';', '{', '}'][..])
        .map(|i| i + 1)
        .unwrap_or(0)
}

/// Join a controller-level route prefix and a method-level path.
pub fn join_route(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim().trim_end_matches('/');
    let path = path.trim().trim_start_matches('/');

    let mut joined = String::new();
    if !prefix.is_empty() {
        if !prefix.starts_with('/') {
            joined.push('/');
        }
        joined.push_str(prefix);
    }
    if !path.is_empty() {
        joined.push('/');
        joined.push_str(path);
    }
    if joined.is_empty() {
        joined.push('/');
    }
    joined
}
