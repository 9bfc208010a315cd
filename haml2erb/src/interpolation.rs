//! Rewrites `#{expr}` interpolations into `<%= expr %>` output tags.
//!
//! A linear left-to-right scan. The only subtlety is telling an
//! interpolation opener apart from an escaped one (`\#{`), and not letting
//! braces inside a nested string literal (or a *further* nested
//! interpolation inside a double-quoted string) confuse the brace counter.

use crate::error::Error;
use crate::scan;

/// Rewrites every unescaped `#{...}` in `text` into `<%= ... %>`.
///
/// `\#{...}` (an odd run of backslashes immediately before `#{`) survives as
/// the literal two characters `#{` with one backslash consumed, and its
/// body is left untouched — it is not scanned as an interpolation at all.
pub fn convert(text: &str) -> Result<String, Error> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '#' && i + 1 < chars.len() && chars[i + 1] == '{' {
            let backslashes = {
                let mut j = i;
                let mut n = 0;
                while j > 0 && chars[j - 1] == '\\' {
                    n += 1;
                    j -= 1;
                }
                n
            };
            if backslashes % 2 == 1 {
                out.pop();
                out.push('#');
                out.push('{');
                i += 2;
                continue;
            }

            let body_start = i + 2;
            let body_end = scan_interpolation_body(&chars, body_start)?;
            let body: String = chars[body_start..body_end].iter().collect();
            out.push_str("<%= ");
            out.push_str(&body);
            out.push_str(" %>");
            i = body_end + 1; // skip the closing '}'
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    Ok(out)
}

/// Scans from just after the opening `#{` to the index of its matching `}`.
/// A brace counter starts at 1; string literals (single- and
/// double-quoted) are tracked so braces inside them don't affect the
/// counter, except that a nested `#{...}` inside a double-quoted string
/// bumps a local counter of its own.
fn scan_interpolation_body(chars: &[char], start: usize) -> Result<usize, Error> {
    let mut depth = 1i32;
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' || c == '\'' {
            i = scan::string_end(chars, i)?;
            continue;
        }
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(Error::interpolation(
        "unclosed interpolation: missing closing '}' for '#{'",
    ))
}
