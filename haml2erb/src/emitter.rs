//! The tree emitter: walks the HAML AST and produces ERB text.
//!
//! `emit` dispatches exhaustively on [`Node`]; the one case that isn't a
//! variant of the enum — an unrecognized node kind in the source format —
//! doesn't exist here by construction, so the "unknown kind" warning from
//! the design notes has no corresponding arm to write. It would only ever
//! fire in the reader, before a `Node` exists at all.

use crate::ast::{DoctypeNode, FilterNode, Node, ScriptNode, SilentScriptNode, TagNode, MID_BLOCK_KEYWORDS, is_void};
use crate::attrs;
use crate::error::Error;
use crate::interpolation;
use crate::scan;

pub fn emit(node: &Node, depth: usize) -> Result<String, Error> {
    match node {
        Node::Root(children) => emit_children(children, depth),
        Node::Tag(t) => emit_tag(t, depth),
        Node::Script(s) => emit_script(s, depth),
        Node::SilentScript(s) => emit_silent_script(s, depth),
        Node::Filter(f) => emit_filter(f, depth),
        Node::Doctype(d) => Ok(emit_doctype(d, depth)),
        Node::Comment(text) => Ok(format!("{}<!-- {text} -->\n", indent(depth))),
        Node::Plain(text) => Ok(format!("{}{}\n", indent(depth), interpolation::convert(text)?)),
        Node::HamlComment => Ok(String::new()),
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

fn emit_children(children: &[Node], depth: usize) -> Result<String, Error> {
    let mut out = String::new();
    for child in children {
        out.push_str(&emit(child, depth)?);
    }
    Ok(out)
}

fn emit_tag(t: &TagNode, depth: usize) -> Result<String, Error> {
    let ind = indent(depth);
    let attrs = attrs::build(&t.attributes, &t.dynamic_attributes, t.object_ref.as_deref())?;
    let void = is_void(&t.name);
    let has_value = t.value.as_deref().is_some_and(|v| !v.is_empty());

    let mut out = format!("{ind}<{}{attrs}>", t.name);

    if t.self_closing || (void && !has_value && t.children.is_empty()) {
        out.push('\n');
        return Ok(out);
    }

    if has_value {
        let value = t.value.as_deref().unwrap_or_default();
        if void {
            tracing::warn!(tag = %t.name, line = t.line, "void element with inline content");
            out.push('\n');
            out.push_str(&ind);
            out.push_str(&formatted_content(value, t.parse)?);
            out.push('\n');
        } else {
            out.push_str(&formatted_content(value, t.parse)?);
            out.push_str(&format!("</{}>\n", t.name));
        }
        return Ok(out);
    }

    if !t.children.is_empty() {
        if void {
            tracing::warn!(tag = %t.name, line = t.line, "void element with children");
            out.push('\n');
            out.push_str(&emit_children(&t.children, depth + 1)?);
        } else {
            out.push('\n');
            out.push_str(&emit_children(&t.children, depth + 1)?);
            out.push_str(&format!("{ind}</{}>\n", t.name));
        }
        return Ok(out);
    }

    out.push_str(&format!("</{}>\n", t.name));
    Ok(out)
}

/// Strips the surrounding quotes from `value` and returns the unescaped
/// inner text, but only when `value` is, in its entirety, a double-quoted
/// string literal that contains a `#{...}` interpolation. Used by both the
/// tag-value and script-text formatting rules, which share this exact
/// carve-out.
fn strip_interpolated_string_literal(value: &str) -> Option<String> {
    let cs = scan::chars(value);
    if cs.first() != Some(&'"') {
        return None;
    }
    let end = scan::string_end(&cs, 0).ok()?;
    if end != cs.len() {
        return None;
    }
    let inner: String = cs[1..end - 1].iter().collect();
    if !inner.contains("#{") {
        return None;
    }
    Some(scan::unescape_minimal(&inner))
}

fn formatted_content(value: &str, parse: bool) -> Result<String, Error> {
    if parse {
        if let Some(inner) = strip_interpolated_string_literal(value) {
            interpolation::convert(&inner)
        } else {
            Ok(format!("<%= {value} %>"))
        }
    } else {
        interpolation::convert(value)
    }
}

fn emit_script(s: &ScriptNode, depth: usize) -> Result<String, Error> {
    let ind = indent(depth);
    if !s.children.is_empty() {
        let mut out = format!("{ind}<%= {} %>\n", s.text);
        out.push_str(&emit_children(&s.children, depth + 1)?);
        out.push_str(&format!("{ind}<% end %>\n"));
        return Ok(out);
    }
    if let Some(inner) = strip_interpolated_string_literal(&s.text) {
        return Ok(format!("{ind}{}\n", interpolation::convert(&inner)?));
    }
    Ok(format!("{ind}<%= {} %>\n", s.text))
}

fn is_mid_block_continuation(node: &Node) -> bool {
    match node {
        Node::SilentScript(s) => s
            .text
            .split_whitespace()
            .next()
            .is_some_and(|first| MID_BLOCK_KEYWORDS.contains(&first)),
        _ => false,
    }
}

fn ends_with_do_block(text: &str) -> bool {
    let t = text.trim_end();
    if let Some(rest) = t.strip_suffix("do") {
        if rest.is_empty() || rest.ends_with(char::is_whitespace) {
            return true;
        }
    }
    if let Some(pipe_end) = t.rfind('|') {
        if let Some(pipe_start) = t[..pipe_end].rfind('|') {
            let before = t[..pipe_start].trim_end();
            if let Some(rest) = before.strip_suffix("do") {
                if rest.is_empty() || rest.ends_with(char::is_whitespace) {
                    return true;
                }
            }
        }
    }
    false
}

fn needs_close(s: &SilentScriptNode) -> bool {
    if matches!(s.keyword.as_deref(), Some("if") | Some("unless") | Some("case") | Some("begin")) {
        return true;
    }
    if ends_with_do_block(&s.text) {
        return true;
    }
    s.text
        .trim_start()
        .split_whitespace()
        .next()
        .is_some_and(|first| matches!(first, "while" | "until" | "for"))
}

fn emit_silent_script(s: &SilentScriptNode, depth: usize) -> Result<String, Error> {
    let ind = indent(depth);
    let mut out = format!("{ind}<% {} %>\n", s.text);
    for child in &s.children {
        let child_depth = if is_mid_block_continuation(child) { depth } else { depth + 1 };
        out.push_str(&emit(child, child_depth)?);
    }
    if !s.children.is_empty() && needs_close(s) {
        out.push_str(&format!("{ind}<% end %>\n"));
    }
    Ok(out)
}

fn emit_filter(f: &FilterNode, depth: usize) -> Result<String, Error> {
    let ind = indent(depth);
    let inner = indent(depth + 1);
    match f.name.as_str() {
        "javascript" => {
            let mut out = format!("{ind}<script>\n");
            for line in f.text.lines() {
                out.push_str(&inner);
                out.push_str(&interpolation::convert(line)?);
                out.push('\n');
            }
            out.push_str(&format!("{ind}</script>\n"));
            Ok(out)
        }
        "css" => {
            let mut out = format!("{ind}<style>\n");
            for line in f.text.lines() {
                out.push_str(&inner);
                out.push_str(&interpolation::convert(line)?);
                out.push('\n');
            }
            out.push_str(&format!("{ind}</style>\n"));
            Ok(out)
        }
        "plain" | "erb" => {
            let mut out = String::new();
            for line in f.text.lines() {
                out.push_str(&inner);
                out.push_str(line);
                out.push('\n');
            }
            Ok(out)
        }
        "ruby" => {
            let mut out = String::new();
            for line in f.text.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                out.push_str(&format!("{inner}<% {line} %>\n"));
            }
            Ok(out)
        }
        other => {
            tracing::warn!(filter = other, "unknown filter");
            let mut out = format!("{ind}<!-- Unknown filter: {other} -->\n");
            out.push_str(f.text.trim_end_matches('\n'));
            out.push('\n');
            Ok(out)
        }
    }
}

fn emit_doctype(d: &DoctypeNode, depth: usize) -> String {
    let ind = indent(depth);
    if d.kind == "xml" {
        let encoding = d.encoding.as_deref().unwrap_or("UTF-8");
        format!("{ind}<?xml version=\"1.0\" encoding=\"{encoding}\"?>\n")
    } else {
        format!("{ind}<!DOCTYPE html>\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::DynamicAttributes;
    use similar_asserts::assert_eq;

    fn tag(name: &str) -> TagNode {
        TagNode {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_div() {
        let n = Node::Tag(tag("div"));
        assert_eq!(emit(&n, 0).unwrap(), "<div></div>\n");
    }

    #[test]
    fn self_closing_void_element() {
        let mut t = tag("br");
        t.self_closing = true;
        assert_eq!(emit(&Node::Tag(t), 0).unwrap(), "<br>\n");
    }

    #[test]
    fn shorthand_class_and_id() {
        let mut t = tag("div");
        t.attributes = vec![("class".into(), "foo".into()), ("id".into(), "bar".into())];
        assert_eq!(emit(&Node::Tag(t), 0).unwrap(), "<div class=\"foo\" id=\"bar\"></div>\n");
    }

    #[test]
    fn merged_static_and_dynamic_class() {
        let mut t = tag("nav");
        t.attributes = vec![("class".into(), "page-nav".into())];
        t.dynamic_attributes = DynamicAttributes {
            old: None,
            new: Some(r#"class: "navbar""#.into()),
        };
        let out = emit(&Node::Tag(t), 0).unwrap();
        assert!(out.contains(r#"class="page-nav navbar""#));
    }

    #[test]
    fn boolean_attribute_scenarios() {
        let mut disabled_true = tag("input");
        disabled_true.self_closing = true;
        disabled_true.dynamic_attributes = DynamicAttributes {
            old: None,
            new: Some("disabled: true".into()),
        };
        assert_eq!(emit(&Node::Tag(disabled_true), 0).unwrap(), "<input disabled>\n");

        let mut disabled_false = tag("input");
        disabled_false.self_closing = true;
        disabled_false.dynamic_attributes = DynamicAttributes {
            old: None,
            new: Some("disabled: false".into()),
        };
        assert_eq!(emit(&Node::Tag(disabled_false), 0).unwrap(), "<input>\n");

        let mut aria = tag("button");
        aria.dynamic_attributes = DynamicAttributes {
            old: None,
            new: Some(r#""aria-expanded": false"#.into()),
        };
        assert!(emit(&Node::Tag(aria), 0).unwrap().contains(r#"aria-expanded="false""#));
    }

    #[test]
    fn dynamic_boolean_expression() {
        let mut t = tag("input");
        t.self_closing = true;
        t.dynamic_attributes = DynamicAttributes {
            old: None,
            new: Some("checked: is_checked".into()),
        };
        assert!(emit(&Node::Tag(t), 0).unwrap().contains("<%= 'checked' if (is_checked) %>"));
    }

    #[test]
    fn nested_static_hash_preserves_arrow_unescaped() {
        let mut t = tag("div");
        t.dynamic_attributes = DynamicAttributes {
            old: None,
            new: Some(r#"data: { action: "change->form#submit" }"#.into()),
        };
        assert!(emit(&Node::Tag(t), 0)
            .unwrap()
            .contains(r#"data-action="change->form#submit""#));
    }

    #[test]
    fn object_reference() {
        let mut t = tag("tr");
        t.object_ref = Some("@item, :row".into());
        assert_eq!(
            emit(&Node::Tag(t), 0).unwrap(),
            "<tr class=\"<%= \"row_\" + @item.class.name.underscore %>\" id=\"<%= \"row_\" + @item.class.name.underscore + '_' + @item.to_key.first.to_s %>\"></tr>\n"
        );
    }

    #[test]
    fn hash_splat_warns_and_still_emits_remaining_attrs() {
        let mut t = tag("div");
        t.dynamic_attributes = DynamicAttributes {
            old: None,
            new: Some(r#"**extra, alt: "x""#.into()),
        };
        assert!(emit(&Node::Tag(t), 0).unwrap().contains(r#"alt="x""#));
    }

    #[test]
    fn inline_value_with_interpolation() {
        let mut t = tag("p");
        t.value = Some("Hello #{name}".into());
        t.parse = false;
        assert_eq!(emit(&Node::Tag(t), 0).unwrap(), "<p>Hello <%= name %></p>\n");
    }

    #[test]
    fn inline_value_is_an_expression() {
        let mut t = tag("p");
        t.value = Some("greeting".into());
        t.parse = true;
        assert_eq!(emit(&Node::Tag(t), 0).unwrap(), "<p><%= greeting %></p>\n");
    }

    #[test]
    fn void_element_with_inline_content_warns_and_moves_to_next_line() {
        let mut t = tag("img");
        t.value = Some("oops".into());
        let out = emit(&Node::Tag(t), 0).unwrap();
        assert_eq!(out, "<img>\noops\n");
    }

    #[test]
    fn tag_with_children_nests_and_closes() {
        let mut child = tag("span");
        child.value = Some("hi".into());
        let mut parent = tag("div");
        parent.children = vec![Node::Tag(child)];
        assert_eq!(emit(&Node::Tag(parent), 0).unwrap(), "<div>\n  <span>hi</span>\n</div>\n");
    }

    #[test]
    fn script_without_children() {
        let n = Node::Script(ScriptNode {
            text: "greeting".into(),
            children: vec![],
        });
        assert_eq!(emit(&n, 0).unwrap(), "<%= greeting %>\n");
    }

    #[test]
    fn script_with_children_opens_and_closes_a_block() {
        let n = Node::Script(ScriptNode {
            text: "capture do".into(),
            children: vec![Node::Tag(tag("div"))],
        });
        assert_eq!(emit(&n, 0).unwrap(), "<%= capture do %>\n  <div></div>\n<% end %>\n");
    }

    #[test]
    fn if_else_mid_block_continuation_stays_at_opener_depth() {
        let mut p_a = tag("p");
        p_a.value = Some("A".into());
        let mut p_b = tag("p");
        p_b.value = Some("B".into());
        let n = Node::SilentScript(SilentScriptNode {
            text: "if a".into(),
            keyword: Some("if".into()),
            children: vec![
                Node::Tag(p_a),
                Node::SilentScript(SilentScriptNode {
                    text: "else".into(),
                    keyword: None,
                    children: vec![Node::Tag(p_b)],
                }),
            ],
        });
        let out = emit(&n, 0).unwrap();
        assert_eq!(
            out,
            "<% if a %>\n  <p>A</p>\n<% else %>\n  <p>B</p>\n<% end %>\n"
        );
    }

    #[test]
    fn block_opener_with_no_children_emits_no_end() {
        let n = Node::SilentScript(SilentScriptNode {
            text: "if a".into(),
            keyword: Some("if".into()),
            children: vec![],
        });
        assert_eq!(emit(&n, 0).unwrap(), "<% if a %>\n");
    }

    #[test]
    fn while_loop_closes_even_without_explicit_keyword_field() {
        let n = Node::SilentScript(SilentScriptNode {
            text: "while x.next?".into(),
            keyword: None,
            children: vec![Node::Tag(tag("div"))],
        });
        assert_eq!(emit(&n, 0).unwrap(), "<% while x.next? %>\n  <div></div>\n<% end %>\n");
    }

    #[test]
    fn each_do_pipe_block_closes() {
        let n = Node::SilentScript(SilentScriptNode {
            text: "items.each do |item|".into(),
            keyword: None,
            children: vec![Node::Tag(tag("div"))],
        });
        assert_eq!(
            emit(&n, 0).unwrap(),
            "<% items.each do |item| %>\n  <div></div>\n<% end %>\n"
        );
    }

    #[test]
    fn javascript_filter_reindents_and_scans_interpolation() {
        let n = Node::Filter(FilterNode {
            name: "javascript".into(),
            text: "alert(\"#{msg}\");".into(),
        });
        assert_eq!(
            emit(&n, 0).unwrap(),
            "<script>\n  alert(\"<%= msg %>\");\n</script>\n"
        );
    }

    #[test]
    fn ruby_filter_emits_silent_code_lines() {
        let n = Node::Filter(FilterNode {
            name: "ruby".into(),
            text: "x = 1\n\ny = 2".into(),
        });
        assert_eq!(emit(&n, 0).unwrap(), "  <% x = 1 %>\n  <% y = 2 %>\n");
    }

    #[test]
    fn unknown_filter_falls_back_to_comment_plus_raw_body() {
        let n = Node::Filter(FilterNode {
            name: "coffee".into(),
            text: "x = -> 1".into(),
        });
        assert_eq!(emit(&n, 0).unwrap(), "<!-- Unknown filter: coffee -->\nx = -> 1\n");
    }

    #[test]
    fn doctype_xml_and_html5() {
        let xml = Node::Doctype(DoctypeNode {
            kind: "xml".into(),
            encoding: None,
        });
        assert_eq!(emit(&xml, 0).unwrap(), "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

        let strict = Node::Doctype(DoctypeNode {
            kind: "Strict".into(),
            encoding: None,
        });
        assert_eq!(emit(&strict, 0).unwrap(), "<!DOCTYPE html>\n");
    }

    #[test]
    fn comment_and_plain_and_haml_comment() {
        assert_eq!(emit(&Node::Comment("hi".into()), 0).unwrap(), "<!-- hi -->\n");
        assert_eq!(emit(&Node::Plain("hi #{x}".into()), 0).unwrap(), "hi <%= x %>\n");
        assert_eq!(emit(&Node::HamlComment, 0).unwrap(), "");
    }
}
