//! A best-effort structural validator for ERB output: balanced embedded-code
//! tags and balanced/nested non-void HTML tags. This stands in for a real
//! ERB/ActionView parser, which this crate has no way to depend on — it
//! checks structure, not whether the embedded Ruby itself is valid.

use std::sync::OnceLock;

use regex::Regex;

use crate::ast::{is_void, BLOCK_KEYWORDS, MID_BLOCK_KEYWORDS};

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub success: bool,
    pub errors: Vec<ValidationError>,
}

pub fn validate(erb: &str) -> ValidationResult {
    let mut errors = check_embedded_code_balance(erb);
    errors.extend(check_html_tag_balance(erb));
    ValidationResult {
        success: errors.is_empty(),
        errors,
    }
}

fn error(message: impl Into<String>, line: usize) -> ValidationError {
    ValidationError {
        message: message.into(),
        line: Some(line),
        column: None,
    }
}

struct OpenBlock {
    keyword: String,
    line: usize,
}

fn check_embedded_code_balance(erb: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut stack: Vec<OpenBlock> = Vec::new();
    let chars: Vec<char> = erb.chars().collect();
    let mut line = 1usize;
    let mut i = 0usize;

    while i < chars.len() {
        if chars[i] == '\n' {
            line += 1;
            i += 1;
            continue;
        }
        if chars[i] == '<' && chars.get(i + 1) == Some(&'%') {
            let open_line = line;
            let body_start = i + 2;
            let mut j = body_start;
            let mut closed = false;
            while j < chars.len() {
                if chars[j] == '\n' {
                    line += 1;
                }
                if chars[j] == '%' && chars.get(j + 1) == Some(&'>') {
                    closed = true;
                    break;
                }
                j += 1;
            }
            if !closed {
                errors.push(error("unterminated embedded-code tag", open_line));
                break;
            }
            let inner: String = chars[body_start..j].iter().collect();
            classify_embedded_code(inner.trim().trim_start_matches('=').trim(), open_line, &mut stack, &mut errors);
            i = j + 2;
            continue;
        }
        i += 1;
    }

    for open in stack {
        errors.push(error(format!("unterminated '{}' block", open.keyword), open.line));
    }
    errors
}

fn classify_embedded_code(inner: &str, line: usize, stack: &mut Vec<OpenBlock>, errors: &mut Vec<ValidationError>) {
    if inner == "end" {
        if stack.pop().is_none() {
            errors.push(error("unmatched 'end'", line));
        }
        return;
    }

    let first_word = inner.split_whitespace().next().unwrap_or("");
    if MID_BLOCK_KEYWORDS.contains(&first_word) {
        if stack.is_empty() {
            errors.push(error(format!("'{first_word}' outside of any block"), line));
        }
        return;
    }

    if BLOCK_KEYWORDS.contains(&first_word) || ends_with_do_block(inner) {
        stack.push(OpenBlock {
            keyword: first_word.to_string(),
            line,
        });
    }
}

fn ends_with_do_block(text: &str) -> bool {
    let trimmed = text.trim_end();
    if trimmed.ends_with('|') {
        let without_trailing_pipe = &trimmed[..trimmed.len() - 1];
        if let Some(pipe_start) = without_trailing_pipe.rfind('|') {
            return ends_with_word(without_trailing_pipe[..pipe_start].trim_end(), "do");
        }
        return false;
    }
    ends_with_word(trimmed, "do")
}

fn ends_with_word(s: &str, word: &str) -> bool {
    if !s.ends_with(word) {
        return false;
    }
    match s[..s.len() - word.len()].chars().last() {
        None => true,
        Some(c) => !(c.is_alphanumeric() || c == '_'),
    }
}

fn mask_embedded_code(erb: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?s)<%.*?%>").unwrap());
    re.replace_all(erb, |caps: &regex::Captures| {
        caps[0]
            .chars()
            .map(|c| if c == '\n' { '\n' } else { ' ' })
            .collect::<String>()
    })
    .into_owned()
}

fn line_of(text: &str, byte_idx: usize) -> usize {
    text[..byte_idx].matches('\n').count() + 1
}

fn check_html_tag_balance(erb: &str) -> Vec<ValidationError> {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    let tag_re = TAG_RE.get_or_init(|| Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9]*)[^<>]*?(/?)>").unwrap());

    let masked = mask_embedded_code(erb);
    let mut errors = Vec::new();
    let mut stack: Vec<(String, usize)> = Vec::new();

    for cap in tag_re.captures_iter(&masked) {
        let whole = cap.get(0).unwrap();
        let line = line_of(&masked, whole.start());
        let is_close = &cap[1] == "/";
        let name = cap[2].to_ascii_lowercase();
        let self_close = &cap[3] == "/";

        if is_close {
            match stack.pop() {
                Some((open_name, _)) if open_name == name => {}
                Some((open_name, open_line)) => errors.push(error(
                    format!(
                        "mismatched closing tag: expected '</{open_name}>' (opened line {open_line}), found '</{name}>'"
                    ),
                    line,
                )),
                None => errors.push(error(format!("unmatched closing tag '</{name}>'"), line)),
            }
            continue;
        }

        if self_close || is_void(&name) {
            continue;
        }
        stack.push((name, line));
    }

    for (name, line) in stack {
        errors.push(error(format!("unclosed tag '<{name}>'"), line));
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_html_and_embedded_code_passes() {
        let erb = "<div>\n  <% if a %>\n    <p>hi</p>\n  <% end %>\n</div>\n";
        let result = validate(erb);
        assert!(result.success, "{:?}", result.errors);
    }

    #[test]
    fn unclosed_html_tag_is_reported() {
        let result = validate("<div>\n  <p>hi</p>\n");
        assert!(!result.success);
        assert!(result.errors.iter().any(|e| e.message.contains("unclosed tag '<div>'")));
    }

    #[test]
    fn mismatched_closing_tag_is_reported() {
        let result = validate("<div>\n  <span>x</div>\n</span>\n");
        assert!(!result.success);
        assert!(result.errors.iter().any(|e| e.message.contains("mismatched closing tag")));
    }

    #[test]
    fn void_elements_need_no_close() {
        let result = validate("<div>\n  <br>\n  <img src=\"x\">\n</div>\n");
        assert!(result.success, "{:?}", result.errors);
    }

    #[test]
    fn self_closing_tag_is_not_tracked() {
        let result = validate("<custom-el/>\n");
        assert!(result.success, "{:?}", result.errors);
    }

    #[test]
    fn unterminated_if_block_is_reported() {
        let result = validate("<% if a %>\n<p>x</p>\n");
        assert!(!result.success);
        assert!(result.errors.iter().any(|e| e.message.contains("unterminated 'if' block")));
    }

    #[test]
    fn stray_end_is_reported() {
        let result = validate("<% end %>\n");
        assert!(!result.success);
        assert!(result.errors.iter().any(|e| e.message.contains("unmatched 'end'")));
    }

    #[test]
    fn else_outside_block_is_reported() {
        let result = validate("<% else %>\n");
        assert!(!result.success);
        assert!(result.errors.iter().any(|e| e.message.contains("outside of any block")));
    }

    #[test]
    fn if_else_end_is_balanced() {
        let result = validate("<% if a %>\n<p>A</p>\n<% else %>\n<p>B</p>\n<% end %>\n");
        assert!(result.success, "{:?}", result.errors);
    }

    #[test]
    fn do_block_with_params_is_balanced() {
        let result = validate("<% items.each do |item| %>\n  <%= item %>\n<% end %>\n");
        assert!(result.success, "{:?}", result.errors);
    }

    #[test]
    fn embedded_code_inside_attribute_does_not_confuse_tag_scan() {
        let result = validate(r#"<div title="<%= a < b %>">x</div>"#);
        assert!(result.success, "{:?}", result.errors);
    }

    #[test]
    fn line_numbers_point_at_the_offending_line() {
        let result = validate("<div>\n<div>\n</div>\n");
        let err = result.errors.iter().find(|e| e.message.contains("unclosed")).unwrap();
        assert_eq!(err.line, Some(1));
    }
}
