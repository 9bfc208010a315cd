//! The static-literal parser: recognizes the literal subset of
//! mapping/sequence/scalar expression text so the attribute builder can
//! inline it as plain HTML instead of wrapping it in embedded code.
//!
//! This is option (b) from the design notes: a small hand-written
//! recognizer for string/symbol/number/bool/nested-mapping/nested-sequence
//! literals, falling through to "dynamic" (`None`) on anything else —
//! including any `nil` leaf anywhere in the tree, method calls, variable
//! references, interpolated strings, ternaries, and hash-splats.

use crate::scan;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Symbol(String),
    Str(String),
}

impl Key {
    /// Symbol keys have underscores rewritten to hyphens; string keys pass
    /// through verbatim.
    pub fn attribute_name(&self) -> String {
        match self {
            Key::Symbol(s) => s.replace('_', "-"),
            Key::Str(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Symbol(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Nil,
    Seq(Vec<Literal>),
    Map(Vec<(Key, Literal)>),
}

impl Literal {
    /// A minimal JSON rendering used for the "array, non-class key" rule in
    /// the attribute semantics table. Only needs to cover the literal
    /// subset this parser itself can produce.
    pub fn to_json(&self) -> String {
        match self {
            Literal::Str(s) => json_string(s),
            Literal::Symbol(s) => json_string(s),
            Literal::Int(i) => i.to_string(),
            Literal::Float(f) => f.to_string(),
            Literal::Bool(b) => b.to_string(),
            Literal::Nil => "null".to_string(),
            Literal::Seq(items) => {
                let inner: Vec<String> = items.iter().map(Literal::to_json).collect();
                format!("[{}]", inner.join(","))
            }
            Literal::Map(entries) => {
                let inner: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}:{}", json_string(&k.attribute_name()), v.to_json()))
                    .collect();
                format!("{{{}}}", inner.join(","))
            }
        }
    }

    fn has_nil(&self) -> bool {
        match self {
            Literal::Nil => true,
            Literal::Seq(items) => items.iter().any(Literal::has_nil),
            Literal::Map(entries) => entries.iter().any(|(_, v)| v.has_nil()),
            _ => false,
        }
    }
}

fn json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Attempts a whole-fragment static parse of `src`. `src` may be a mapping
/// body (with or without surrounding `{}`), a sequence (with surrounding
/// `[]`), or a bare scalar. Returns `None` ("dynamic") if any part of the
/// fragment isn't a literal, if a `nil` leaf appears anywhere, or if the
/// fragment doesn't fully consume (trailing garbage).
pub fn parse_static(src: &str) -> Option<Literal> {
    let trimmed = src.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value = parse_fragment(trimmed)?;
    if value.has_nil() {
        return None;
    }
    Some(value)
}

fn parse_fragment(s: &str) -> Option<Literal> {
    let cs = scan::chars(s);
    if cs.first() == Some(&'[') && cs.last() == Some(&']') {
        let inner: String = cs[1..cs.len() - 1].iter().collect();
        return parse_sequence_body(&inner);
    }
    if cs.first() == Some(&'{') && cs.last() == Some(&'}') {
        let inner: String = cs[1..cs.len() - 1].iter().collect();
        return parse_mapping_body(&inner);
    }
    // A bare mapping body (no surrounding braces) — this is how a tag's
    // dynamic-attributes text is handed to us.
    if let Some(map) = parse_mapping_body(s) {
        return Some(map);
    }
    parse_scalar(s)
}

fn parse_sequence_body(body: &str) -> Option<Literal> {
    if body.trim().is_empty() {
        return Some(Literal::Seq(Vec::new()));
    }
    let parts = scan::split_top_level(body, ',').ok()?;
    let mut items = Vec::with_capacity(parts.len());
    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            return None;
        }
        items.push(parse_fragment(part)?);
    }
    Some(Literal::Seq(items))
}

fn parse_mapping_body(body: &str) -> Option<Literal> {
    if body.trim().is_empty() {
        return Some(Literal::Map(Vec::new()));
    }
    let parts = scan::split_top_level(body, ',').ok()?;
    let mut entries = Vec::with_capacity(parts.len());
    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            return None;
        }
        entries.push(parse_entry(part)?);
    }
    Some(Literal::Map(entries))
}

fn parse_entry(segment: &str) -> Option<(Key, Literal)> {
    let (key, value_text) = split_key_value(segment)?;
    let value = parse_fragment(value_text.trim())?;
    Some((key, value))
}

/// Splits a single `key: value` / `:key => value` / `"key": value` segment
/// into its key and the (unparsed, untrimmed-of-surrounding-meaning) value
/// text that follows. Shared with the attribute builder's by-key fallback,
/// which needs the raw value text even when it can't be parsed as a
/// literal.
pub(crate) fn split_key_value(segment: &str) -> Option<(Key, String)> {
    let cs = scan::chars(segment);
    let mut i = 0;
    skip_ws(&cs, &mut i);

    // `:symbol => value`
    if cs.get(i) == Some(&':') && cs.get(i + 1).is_some_and(|c| is_ident_start(*c)) {
        let ident_start = i + 1;
        let mut j = ident_start;
        while j < cs.len() && is_ident_continue(cs[j]) {
            j += 1;
        }
        let name: String = cs[ident_start..j].iter().collect();
        let mut k = j;
        skip_ws(&cs, &mut k);
        if !consume_hashrocket(&cs, &mut k) {
            return None;
        }
        let value_text: String = cs[k..].iter().collect();
        return Some((Key::Symbol(name), value_text));
    }

    // `"string" => value` or `"string": value`
    if cs.get(i) == Some(&'"') || cs.get(i) == Some(&'\'') {
        let end = scan::string_end(&cs, i).ok()?;
        let raw: String = cs[i + 1..end - 1].iter().collect();
        let key_text = scan::unescape_minimal(&raw);
        let mut k = end;
        skip_ws(&cs, &mut k);
        if cs.get(k) == Some(&':') {
            k += 1;
        } else if !consume_hashrocket(&cs, &mut k) {
            return None;
        }
        let value_text: String = cs[k..].iter().collect();
        return Some((Key::Str(key_text), value_text));
    }

    // bare `identifier: value` (Ruby 1.9+ shorthand symbol key)
    if is_ident_start(cs.get(i).copied()?) {
        let ident_start = i;
        let mut j = i;
        while j < cs.len() && is_ident_continue(cs[j]) {
            j += 1;
        }
        let name: String = cs[ident_start..j].iter().collect();
        if cs.get(j) != Some(&':') {
            return None;
        }
        let mut k = j + 1;
        skip_ws(&cs, &mut k);
        let value_text: String = cs[k..].iter().collect();
        return Some((Key::Symbol(name), value_text));
    }

    None
}

fn consume_hashrocket(cs: &[char], i: &mut usize) -> bool {
    if cs.get(*i) == Some(&'=') && cs.get(*i + 1) == Some(&'>') {
        *i += 2;
        skip_ws(cs, i);
        true
    } else {
        false
    }
}

fn skip_ws(cs: &[char], i: &mut usize) {
    while cs.get(*i).is_some_and(|c| c.is_whitespace()) {
        *i += 1;
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn parse_scalar(s: &str) -> Option<Literal> {
    let s = s.trim();
    match s {
        "true" => return Some(Literal::Bool(true)),
        "false" => return Some(Literal::Bool(false)),
        "nil" => return Some(Literal::Nil),
        _ => {}
    }
    if let Some(rest) = s.strip_prefix(':') {
        if !rest.is_empty() && rest.chars().all(is_ident_continue) && is_ident_start(rest.chars().next().unwrap()) {
            return Some(Literal::Symbol(rest.to_string()));
        }
        return None;
    }
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        let cs = scan::chars(s);
        let end = scan::string_end(&cs, 0).ok()?;
        if end != cs.len() {
            return None; // trailing garbage, e.g. concatenation
        }
        let inner: String = cs[1..end - 1].iter().collect();
        if s.starts_with('"') && inner.contains("#{") {
            return None; // interpolated strings are never static
        }
        let unescaped = if s.starts_with('"') {
            scan::unescape_minimal(&inner)
        } else {
            inner.replace(r"\'", "'").replace(r"\\", "\\")
        };
        return Some(Literal::Str(unescaped));
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Literal::Int(i));
    }
    if looks_like_float(s) {
        if let Ok(f) = s.parse::<f64>() {
            return Some(Literal::Float(f));
        }
    }
    None
}

fn looks_like_float(s: &str) -> bool {
    let mut seen_dot = false;
    let mut seen_digit = false;
    for (idx, c) in s.chars().enumerate() {
        match c {
            '-' if idx == 0 => {}
            '.' if !seen_dot => seen_dot = true,
            '0'..='9' => seen_digit = true,
            _ => return false,
        }
    }
    seen_dot && seen_digit
}
