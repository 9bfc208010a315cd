//! The attribute builder: turns a tag's four attribute sources (shorthand
//! class/ID already folded into `attributes` by the reader, the `old`/`new`
//! hash-literal text in `dynamic_attributes`, and an object-reference
//! bracket) into the single attribute string the tree emitter splices after
//! a tag name.
//!
//! Class and id are special: every source that contributes one contributes
//! a *fragment*, and all fragments from all sources are joined with spaces
//! into one `class="..."` / `id="..."` attribute, in source order
//! (shorthand, then dynamic hash, then object reference). Every other
//! attribute name is emitted once per contribution, in the order its source
//! was visited.

use html_escape::encode_double_quoted_attribute;

use crate::ast::DynamicAttributes;
use crate::error::Error;
use crate::interpolation;
use crate::literal::{self, Key, Literal};
use crate::scan;

/// Boolean attributes: a `true` value renders as the bare attribute name, a
/// `false` value omits it entirely. Taken from the HTML5 boolean-attribute
/// list as Rails' `tag` helper recognizes it.
const BOOLEAN_ATTRS: &[&str] = &[
    "allowfullscreen",
    "async",
    "autofocus",
    "autoplay",
    "checked",
    "controls",
    "default",
    "defer",
    "disabled",
    "formnovalidate",
    "hidden",
    "inert",
    "ismap",
    "itemscope",
    "loop",
    "multiple",
    "muted",
    "nomodule",
    "novalidate",
    "open",
    "playsinline",
    "readonly",
    "required",
    "reversed",
    "scoped",
    "seamless",
    "selected",
];

fn is_boolean_attr(name: &str) -> bool {
    BOOLEAN_ATTRS.contains(&name)
}

enum Contribution {
    /// Raw (unescaped) class fragment text. Escaped at the final join
    /// unless it contains `<%`, in which case it's embedded code and is
    /// kept verbatim.
    Class(String),
    Id(String),
    /// A fully rendered ` key="value"` (or bare `key`) clause, ready to
    /// append as-is.
    Attr(String),
}

/// Builds the complete attribute string for a tag, starting with a leading
/// space when non-empty and empty otherwise.
pub fn build(
    static_attrs: &[(String, String)],
    dynamic_attrs: &DynamicAttributes,
    object_ref: Option<&str>,
) -> Result<String, Error> {
    let mut class_frags: Vec<String> = Vec::new();
    let mut id_frags: Vec<String> = Vec::new();
    let mut other: Vec<String> = Vec::new();

    for (k, v) in static_attrs {
        match k.as_str() {
            "class" => class_frags.push(v.clone()),
            "id" => id_frags.push(v.clone()),
            _ => other.push(format!("{k}=\"{}\"", escape_attr(v))),
        }
    }

    for raw in [dynamic_attrs.old.as_deref(), dynamic_attrs.new.as_deref()]
        .into_iter()
        .flatten()
    {
        for c in process_dynamic_fragment(raw)? {
            match c {
                Contribution::Class(s) => class_frags.push(s),
                Contribution::Id(s) => id_frags.push(s),
                Contribution::Attr(s) => other.push(s),
            }
        }
    }

    if let Some(raw) = object_ref {
        let (class_code, id_code) = object_ref_fragments(raw);
        class_frags.push(class_code);
        id_frags.push(id_code);
    }

    let mut out = String::new();
    if !class_frags.is_empty() {
        out.push_str(" class=\"");
        out.push_str(&join_fragments(&class_frags));
        out.push('"');
    }
    if !id_frags.is_empty() {
        out.push_str(" id=\"");
        out.push_str(&join_fragments(&id_frags));
        out.push('"');
    }
    for clause in other {
        out.push(' ');
        out.push_str(&clause);
    }
    Ok(out)
}

fn join_fragments(frags: &[String]) -> String {
    frags
        .iter()
        .map(|f| if f.contains("<%") { f.clone() } else { escape_attr(f) })
        .collect::<Vec<_>>()
        .join(" ")
}

/// HTML-escapes `&` and `"` only; `<` and `>` are left alone since HAML
/// authors routinely write arrows and comparisons in attribute text (see
/// the `data-action="change->form#submit"` case) and the target is an ERB
/// template, not a browser-facing escape of markup.
fn escape_attr(s: &str) -> String {
    encode_double_quoted_attribute(s).into_owned()
}

/// Escapes everything in `s` with `escape_fn` except substrings already
/// wrapped in `<%= ... %>` (our own embedded-code output), which pass
/// through untouched.
fn escape_outside_tags(s: &str, escape_fn: impl Fn(&str) -> String) -> String {
    let mut out = String::new();
    let mut rest = s;
    while let Some(start) = rest.find("<%=") {
        out.push_str(&escape_fn(&rest[..start]));
        if let Some(end_rel) = rest[start..].find("%>") {
            let end = start + end_rel + 2;
            out.push_str(&rest[start..end]);
            rest = &rest[end..];
        } else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        }
    }
    out.push_str(&escape_fn(rest));
    out
}

fn attr_name(key: &Key, prefix: Option<&str>) -> String {
    let base = key.attribute_name();
    match prefix {
        Some(p) => format!("{p}-{base}"),
        None => base,
    }
}

fn scalar_contribution(name: &str, text: &str) -> Vec<Contribution> {
    match name {
        "class" => vec![Contribution::Class(text.to_string())],
        "id" => vec![Contribution::Id(text.to_string())],
        _ => vec![Contribution::Attr(format!("{name}=\"{}\"", escape_attr(text)))],
    }
}

fn display_scalar(lit: &Literal) -> String {
    match lit {
        Literal::Str(s) | Literal::Symbol(s) => s.clone(),
        Literal::Int(i) => i.to_string(),
        Literal::Float(f) => f.to_string(),
        Literal::Bool(b) => b.to_string(),
        Literal::Nil | Literal::Seq(_) | Literal::Map(_) => String::new(),
    }
}

fn finish_literal_value(name: &str, lit: &Literal) -> Vec<Contribution> {
    match lit {
        Literal::Nil => vec![],
        Literal::Bool(b) => {
            if is_boolean_attr(name) {
                if *b {
                    vec![Contribution::Attr(name.to_string())]
                } else {
                    vec![]
                }
            } else {
                vec![Contribution::Attr(format!("{name}=\"{b}\""))]
            }
        }
        Literal::Str(s) | Literal::Symbol(s) => scalar_contribution(name, s),
        Literal::Int(i) => scalar_contribution(name, &i.to_string()),
        Literal::Float(f) => scalar_contribution(name, &f.to_string()),
        Literal::Seq(_) | Literal::Map(_) => unreachable!("handled in classify_literal"),
    }
}

/// Applies the attribute-semantics table to one already-static `(key,
/// value)` entry, recursing into nested maps (one level of `-` flattening
/// per level of nesting) and arrays (space-joined only for `class`, JSON
/// otherwise).
fn classify_literal(key: &Key, value: &Literal, prefix: Option<&str>) -> Vec<Contribution> {
    let name = attr_name(key, prefix);
    match value {
        Literal::Map(entries) => entries
            .iter()
            .flat_map(|(k, v)| classify_literal(k, v, Some(&name)))
            .collect(),
        Literal::Seq(items) => {
            if name == "class" {
                let joined = items.iter().map(display_scalar).collect::<Vec<_>>().join(" ");
                vec![Contribution::Class(joined)]
            } else {
                vec![Contribution::Attr(format!(
                    "{name}=\"{}\"",
                    escape_attr(&value.to_json())
                ))]
            }
        }
        other => finish_literal_value(&name, other),
    }
}

fn format_interpolated_attr(name: &str, raw_inner_text: &str) -> Result<String, Error> {
    let scanned = interpolation::convert(raw_inner_text)?;
    let escaped = escape_outside_tags(&scanned, escape_attr);
    Ok(format!("{name}=\"{escaped}\""))
}

fn object_ref_fragments(raw: &str) -> (String, String) {
    let parts = scan::split_top_level(raw, ',').unwrap_or_else(|_| vec![raw.to_string()]);
    let obj = parts.first().map(|p| p.trim()).unwrap_or("").to_string();
    let prefix = parts
        .get(1)
        .map(|p| p.trim().trim_start_matches(':').to_string())
        .filter(|p| !p.is_empty());

    match prefix {
        Some(p) => (
            format!("<%= \"{p}_\" + {obj}.class.name.underscore %>"),
            format!("<%= \"{p}_\" + {obj}.class.name.underscore + '_' + {obj}.to_key.first.to_s %>"),
        ),
        None => (
            format!("<%= {obj}.class.name.underscore %>"),
            format!("<%= {obj}.class.name.underscore + '_' + {obj}.to_key.first.to_s %>"),
        ),
    }
}

/// Entry point for one `dynamic_attributes.old`/`.new` fragment: first tries
/// a whole-fragment static parse (§ the static-literal parser), falling
/// back to the by-key scanner when any part of the hash is dynamic.
fn process_dynamic_fragment(raw: &str) -> Result<Vec<Contribution>, Error> {
    match literal::parse_static(raw) {
        Some(Literal::Map(entries)) => Ok(entries
            .iter()
            .flat_map(|(k, v)| classify_literal(k, v, None))
            .collect()),
        _ => by_key_scan(raw, None),
    }
}

/// Splits `body` on top-level commas and classifies each `key: value`
/// segment independently, tolerating the hash as a whole being dynamic even
/// when individual entries are static. `prefix` is the dash-joined name of
/// the enclosing key, when this call is scanning a nested sub-mapping.
fn by_key_scan(body: &str, prefix: Option<&str>) -> Result<Vec<Contribution>, Error> {
    let mut out = Vec::new();
    let mut warned_splat = false;
    for segment in scan::split_top_level(body, ',')? {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        if segment.starts_with("**") {
            if !warned_splat {
                tracing::warn!(
                    fragment = %segment,
                    "Double splat in attribute literal is not supported; skipping"
                );
                warned_splat = true;
            }
            continue;
        }
        let Some((key, value_text)) = literal::split_key_value(segment) else {
            continue;
        };
        out.extend(classify_dynamic_entry(&key, value_text.trim(), prefix)?);
    }
    Ok(out)
}

/// Classifies one `key: value` pair whose value text failed (or wasn't
/// attempted for) a whole-hash static parse, per the by-key value
/// classification rules.
fn classify_dynamic_entry(key: &Key, value_text: &str, prefix: Option<&str>) -> Result<Vec<Contribution>, Error> {
    let name = attr_name(key, prefix);
    let trimmed = value_text.trim();
    let cs = scan::chars(trimmed);

    // A nested `{ ... }` sub-mapping: recurse, either by flattening it
    // statically or by scanning its body by key in turn.
    if cs.first() == Some(&'{') {
        if let Ok(end) = scan::bracket_end(&cs, 0) {
            if end == cs.len() {
                if let Some(lit @ Literal::Map(_)) = literal::parse_static(trimmed) {
                    return Ok(classify_literal(key, &lit, prefix));
                }
                let inner: String = cs[1..end - 1].iter().collect();
                return by_key_scan(&inner, Some(&name));
            }
        }
    }

    // An array literal (static -> class-join-or-JSON; dynamic -> raw expr).
    if cs.first() == Some(&'[') {
        if let Some(lit @ Literal::Seq(_)) = literal::parse_static(trimmed) {
            return Ok(classify_literal(key, &lit, prefix));
        }
        return Ok(vec![Contribution::Attr(format!("{name}=\"<%= {trimmed} %>\""))]);
    }

    // A whole string literal, possibly carrying `#{}` interpolation.
    if cs.first() == Some(&'"') || cs.first() == Some(&'\'') {
        if let Ok(end) = scan::string_end(&cs, 0) {
            if end == cs.len() {
                let quote = cs[0];
                let inner: String = cs[1..end - 1].iter().collect();
                if quote == '"' && inner.contains("#{") {
                    return Ok(vec![Contribution::Attr(format_interpolated_attr(&name, &inner)?)]);
                }
                let text = if quote == '"' {
                    scan::unescape_minimal(&inner)
                } else {
                    inner.replace(r"\'", "'").replace(r"\\", "\\")
                };
                return Ok(scalar_contribution(&name, &text));
            }
        }
    }

    // A literal `true` / `false` / `nil` / `:symbol` / number.
    if let Some(lit) = literal::parse_static(trimmed) {
        return Ok(classify_literal(key, &lit, prefix));
    }

    // Anything else is a dynamic expression.
    if is_boolean_attr(&name) {
        Ok(vec![Contribution::Attr(format!("<%= '{name}' if ({trimmed}) %>"))])
    } else {
        Ok(vec![Contribution::Attr(format!("{name}=\"<%= {trimmed} %>\""))])
    }
}
