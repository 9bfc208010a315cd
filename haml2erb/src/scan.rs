//! Balanced-delimiter scanning shared by the static-literal parser and the
//! attribute builder's by-key fallback scanner.
//!
//! Every function here operates on a `&[char]` slice rather than `&str` so
//! indices line up with character boundaries regardless of UTF-8 width.

use crate::error::Error;

pub fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

pub fn is_open(c: char) -> bool {
    matches!(c, '{' | '[' | '(')
}

fn matching_close(c: char) -> char {
    match c {
        '{' => '}',
        '[' => ']',
        '(' => ')',
        _ => unreachable!("matching_close called on non-opener"),
    }
}

/// Scans a string literal starting at `quote_idx` (which must point at the
/// opening quote) and returns the index just past its closing quote.
/// Backslash escapes the next character; a double-quoted string may itself
/// contain a nested `#{...}` interpolation, inside which braces are tracked
/// independently and do not need to balance against the outer scan.
pub fn string_end(chars: &[char], quote_idx: usize) -> Result<usize, Error> {
    let quote = chars[quote_idx];
    let mut i = quote_idx + 1;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            i += 2;
            continue;
        }
        if c == quote {
            return Ok(i + 1);
        }
        if quote == '"' && c == '#' && i + 1 < chars.len() && chars[i + 1] == '{' {
            i = skip_nested_interpolation(chars, i + 2)?;
            continue;
        }
        i += 1;
    }
    Err(Error::interpolation("unterminated string literal"))
}

fn skip_nested_interpolation(chars: &[char], start: usize) -> Result<usize, Error> {
    let mut depth = 1i32;
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            i += 2;
            continue;
        }
        if c == '"' || c == '\'' {
            i = string_end(chars, i)?;
            continue;
        }
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(Error::interpolation("unclosed interpolation"))
}

/// Scans a bracketed group starting at `open_idx` (pointing at `{`, `[` or
/// `(`) and returns the index just past its matching close. String literals
/// encountered along the way are skipped wholesale so quoted delimiters
/// don't confuse the count; brackets of a different kind than `open_idx`'s
/// are treated as opaque content.
pub fn bracket_end(chars: &[char], open_idx: usize) -> Result<usize, Error> {
    let open = chars[open_idx];
    let close = matching_close(open);
    let mut depth = 1i32;
    let mut i = open_idx + 1;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' || c == '\'' {
            i = string_end(chars, i)?;
            continue;
        }
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Ok(i + 1);
            }
        }
        i += 1;
    }
    Err(Error::UserError {
        message: format!("unterminated '{open}'"),
    })
}

/// Splits `s` on top-level occurrences of `sep` — ones that aren't inside a
/// string literal or a `{}`/`[]`/`()` group. Always returns at least one
/// element (the whole string, if `sep` never occurs at top level).
pub fn split_top_level(s: &str, sep: char) -> Result<Vec<String>, Error> {
    let cs = chars(s);
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < cs.len() {
        let c = cs[i];
        if c == '"' || c == '\'' {
            i = string_end(&cs, i)?;
            continue;
        }
        if is_open(c) {
            i = bracket_end(&cs, i)?;
            continue;
        }
        if c == sep {
            parts.push(cs[start..i].iter().collect());
            i += 1;
            start = i;
            continue;
        }
        i += 1;
    }
    parts.push(cs[start..].iter().collect());
    Ok(parts)
}

/// Unescapes only `\"` and `\\`; every other backslash sequence (`\n`,
/// `\t`, `\u{...}`, ...) passes through unchanged. This mirrors the one
/// escape subset the tag-content and script string-literal paths are
/// specified to understand — everything else is a documented limitation,
/// not a bug.
pub fn unescape_minimal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut it = s.chars().peekable();
    while let Some(c) = it.next() {
        if c == '\\' {
            match it.peek() {
                Some('"') => {
                    out.push('"');
                    it.next();
                }
                Some('\\') => {
                    out.push('\\');
                    it.next();
                }
                _ => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
