//! The HAML reader: turns source text into the [`Node`] tree the emitter
//! consumes.
//!
//! Deliberately minimal — see the crate's top-level documentation for what
//! this module does and doesn't cover. It exists only so the rest of the
//! pipeline (the three components this crate is actually about) has
//! something real to run end to end; a production setup would swap it for
//! a proper upstream HAML parser.

use crate::ast::{
    DoctypeNode, DynamicAttributes, FilterNode, Node, ScriptNode, SilentScriptNode, TagNode,
    BLOCK_KEYWORDS, MID_BLOCK_KEYWORDS,
};
use crate::error::Error;
use crate::scan;

pub fn parse(source: &str) -> Result<Node, Error> {
    let mut p = Parser::new(source);
    let nodes = p.parse_siblings(0)?;
    Ok(Node::Root(nodes))
}

struct Parser<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Parser {
            lines: source.lines().collect(),
            pos: 0,
        }
    }

    fn line_no(&self, idx: usize) -> usize {
        idx + 1
    }

    fn content(&self, idx: usize) -> &'a str {
        self.lines[idx].trim()
    }

    fn skip_blanks(&mut self) {
        while self.pos < self.lines.len() && self.lines[self.pos].trim().is_empty() {
            self.pos += 1;
        }
    }

    /// The structural depth of the next non-blank line, without consuming
    /// it. `None` at end of input.
    fn peek_depth(&mut self) -> Result<Option<usize>, Error> {
        self.skip_blanks();
        if self.pos >= self.lines.len() {
            return Ok(None);
        }
        Ok(Some(self.structural_depth(self.pos)?))
    }

    /// Validates and returns a structural line's indent depth. Only called
    /// on lines being treated as node headers — filter/comment body lines
    /// go through [`Self::consume_raw_body`] instead and are exempt from
    /// this rule, since they carry literal content (JS, CSS, ...) whose own
    /// indentation isn't HAML's to police.
    fn structural_depth(&self, idx: usize) -> Result<usize, Error> {
        let line = self.lines[idx];
        let ws_len = line.chars().take_while(|c| c.is_whitespace()).count();
        if line[..ws_len].contains('\t') {
            return Err(Error::syntax(
                "tabs are not allowed in indentation",
                Some(self.line_no(idx)),
            ));
        }
        if ws_len % 2 != 0 {
            return Err(Error::syntax(
                "inconsistent indentation: must be a multiple of two spaces",
                Some(self.line_no(idx)),
            ));
        }
        Ok(ws_len / 2)
    }

    /// Parses a run of sibling nodes, all at exactly `depth`. Returns once
    /// a line dedents below `depth` or input ends; errors if a line is
    /// indented deeper than `depth` (a level can't be skipped).
    ///
    /// `else`/`elsif`/`when`/`rescue`/`ensure` lines sit at the same depth
    /// as the block they continue, not nested under it — but the emitter
    /// expects them as children of that block's node (see
    /// `is_mid_block_continuation` there), so a continuation line is folded
    /// into the preceding sibling's children instead of becoming a sibling
    /// of its own.
    fn parse_siblings(&mut self, depth: usize) -> Result<Vec<Node>, Error> {
        let mut nodes: Vec<Node> = Vec::new();
        loop {
            let Some(d) = self.peek_depth()? else { break };
            if d < depth {
                break;
            }
            if d > depth {
                let line_no = self.line_no(self.pos);
                return Err(Error::syntax("unexpected indentation", Some(line_no)));
            }

            if self.next_line_is_mid_block_continuation() {
                let line_no = self.line_no(self.pos);
                match nodes.last_mut() {
                    Some(Node::SilentScript(parent)) => {
                        let cont = self.parse_node(depth)?;
                        parent.children.push(cont);
                        continue;
                    }
                    _ => {
                        return Err(Error::syntax(
                            "mid-block continuation without an opening block",
                            Some(line_no),
                        ));
                    }
                }
            }

            nodes.push(self.parse_node(depth)?);
        }
        Ok(nodes)
    }

    fn next_line_is_mid_block_continuation(&self) -> bool {
        self.lines[self.pos]
            .trim()
            .strip_prefix('-')
            .and_then(|rest| rest.trim_start().split_whitespace().next())
            .is_some_and(|w| MID_BLOCK_KEYWORDS.contains(&w))
    }

    /// Parses the children of a node that legitimately supports them (tag,
    /// script, silent_script) at `depth + 1`. Returns an empty vec, with no
    /// error, when the next line is a sibling or an ancestor's sibling.
    fn parse_children(&mut self, depth: usize) -> Result<Vec<Node>, Error> {
        match self.peek_depth()? {
            Some(d) if d > depth => self.parse_siblings(depth + 1),
            _ => Ok(Vec::new()),
        }
    }

    /// Errors if the next line is indented deeper than `depth` — used
    /// after nodes that, unlike tag/script/silent_script, have no `Vec<Node>`
    /// slot to put children in (plain text, doctype).
    fn reject_children(&mut self, depth: usize) -> Result<(), Error> {
        if let Some(d) = self.peek_depth()? {
            if d > depth {
                let line_no = self.line_no(self.pos);
                return Err(Error::syntax(
                    "this line cannot take nested content",
                    Some(line_no),
                ));
            }
        }
        Ok(())
    }

    /// Consumes every following line indented strictly deeper than `depth`
    /// (by raw leading-whitespace count, not structural-depth units), plus
    /// any blank lines among them, stripping `(depth + 1) * 2` leading
    /// whitespace characters from each and joining with `\n`. Used for
    /// filter bodies and the folded-in children of `/` comments.
    fn consume_raw_body(&mut self, depth: usize) -> String {
        let threshold = (depth + 1) * 2;
        let mut lines = Vec::new();
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if line.trim().is_empty() {
                lines.push(String::new());
                self.pos += 1;
                continue;
            }
            if leading_ws_count(line) < threshold {
                break;
            }
            lines.push(strip_n_leading(line, threshold).to_string());
            self.pos += 1;
        }
        while lines.last().is_some_and(|l: &String| l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }

    /// Swallows the (opaque) children of a HAML comment: everything more
    /// deeply indented than `depth`, discarded rather than parsed.
    fn consume_opaque_children(&mut self, depth: usize) {
        let threshold = depth * 2;
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if line.trim().is_empty() {
                self.pos += 1;
                continue;
            }
            if leading_ws_count(line) <= threshold {
                break;
            }
            self.pos += 1;
        }
    }

    fn parse_node(&mut self, depth: usize) -> Result<Node, Error> {
        let idx = self.pos;
        let line_no = self.line_no(idx);
        let content = self.content(idx);
        self.pos += 1;

        if content.starts_with("!!!") {
            self.reject_children(depth)?;
            return Ok(Node::Doctype(parse_doctype(content)));
        }

        if content.starts_with("-#") {
            self.consume_opaque_children(depth);
            return Ok(Node::HamlComment);
        }

        if let Some(rest) = content.strip_prefix('/') {
            let header = rest.trim().to_string();
            let body = self.consume_raw_body(depth);
            return Ok(Node::Comment(join_header_and_body(header, body)));
        }

        if let Some(rest) = content.strip_prefix(':') {
            let (name, inline_rest) = split_filter_name(rest);
            let body = self.consume_raw_body(depth);
            let text = join_header_and_body(inline_rest.trim().to_string(), body);
            return Ok(Node::Filter(FilterNode { name, text }));
        }

        if let Some(rest) = content.strip_prefix('=') {
            let text = rest.trim().to_string();
            let children = self.parse_children(depth)?;
            return Ok(Node::Script(ScriptNode { text, children }));
        }

        if let Some(rest) = content.strip_prefix('-') {
            let text = rest.trim().to_string();
            let keyword = text
                .split_whitespace()
                .next()
                .filter(|w| BLOCK_KEYWORDS.contains(w))
                .map(str::to_string);
            let children = self.parse_children(depth)?;
            return Ok(Node::SilentScript(SilentScriptNode { text, keyword, children }));
        }

        if content.starts_with('%') || content.starts_with('.') || content.starts_with('#') {
            let mut tag = parse_tag_header(content, line_no)?;
            tag.children = self.parse_children(depth)?;
            return Ok(Node::Tag(tag));
        }

        self.reject_children(depth)?;
        Ok(Node::Plain(content.to_string()))
    }
}

fn leading_ws_count(s: &str) -> usize {
    s.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

fn strip_n_leading(s: &str, n: usize) -> &str {
    let mut byte_idx = 0;
    let mut taken = 0;
    for c in s.chars() {
        if taken == n {
            break;
        }
        if c == ' ' || c == '\t' {
            byte_idx += c.len_utf8();
            taken += 1;
        } else {
            break;
        }
    }
    &s[byte_idx..]
}

fn join_header_and_body(header: String, body: String) -> String {
    match (header.is_empty(), body.is_empty()) {
        (true, true) => String::new(),
        (true, false) => body,
        (false, true) => header,
        (false, false) => format!("{header}\n{body}"),
    }
}

fn split_filter_name(rest: &str) -> (String, &str) {
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    (rest[..end].to_string(), &rest[end..])
}

fn parse_doctype(content: &str) -> DoctypeNode {
    let rest = content[3..].trim();
    if let Some(enc_part) = rest.strip_prefix("XML") {
        let enc = enc_part.trim();
        return DoctypeNode {
            kind: "xml".to_string(),
            encoding: if enc.is_empty() { None } else { Some(enc.to_string()) },
        };
    }
    DoctypeNode {
        kind: rest.to_string(),
        encoding: None,
    }
}

fn is_shorthand_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Whichever of `dynamic_attributes.old`/`.new` this hash text lands in is
/// decided by a surface heuristic (does its first entry use `=>`?) — the
/// attribute builder treats both fields identically, so this only affects
/// which field a caller inspecting the raw AST would find the text under.
fn store_attr_hash(inner: &str, dynamic: &mut DynamicAttributes) {
    let is_hashrocket_form = scan::split_top_level(inner, ',')
        .ok()
        .and_then(|parts| parts.into_iter().next())
        .is_some_and(|first| first.contains("=>"));
    if is_hashrocket_form {
        dynamic.old = Some(inner.to_string());
    } else {
        dynamic.new = Some(inner.to_string());
    }
}

fn parse_tag_header(content: &str, line_no: usize) -> Result<TagNode, Error> {
    let cs: Vec<char> = content.chars().collect();
    let mut i = 0;
    let mut name = "div".to_string();

    if cs.first() == Some(&'%') {
        i += 1;
        let start = i;
        while i < cs.len() && (cs[i].is_ascii_alphanumeric() || cs[i] == '_' || cs[i] == '-' || cs[i] == ':') {
            i += 1;
        }
        if i == start {
            return Err(Error::syntax("expected a tag name after '%'", Some(line_no)));
        }
        name = cs[start..i].iter().collect();
    }

    let mut attributes = Vec::new();
    loop {
        match cs.get(i) {
            Some('.') => {
                i += 1;
                let start = i;
                while i < cs.len() && is_shorthand_char(cs[i]) {
                    i += 1;
                }
                if i == start {
                    return Err(Error::syntax("expected a class name after '.'", Some(line_no)));
                }
                attributes.push(("class".to_string(), cs[start..i].iter().collect()));
            }
            Some('#') => {
                i += 1;
                let start = i;
                while i < cs.len() && is_shorthand_char(cs[i]) {
                    i += 1;
                }
                if i == start {
                    return Err(Error::syntax("expected an id after '#'", Some(line_no)));
                }
                attributes.push(("id".to_string(), cs[start..i].iter().collect()));
            }
            _ => break,
        }
    }

    let mut dynamic_attributes = DynamicAttributes::default();
    if cs.get(i) == Some(&'{') {
        let end = scan::bracket_end(&cs, i)?;
        let inner: String = cs[i + 1..end - 1].iter().collect();
        store_attr_hash(&inner, &mut dynamic_attributes);
        i = end;
    }

    let mut object_ref = None;
    if cs.get(i) == Some(&'[') {
        let end = scan::bracket_end(&cs, i)?;
        object_ref = Some(cs[i + 1..end - 1].iter().collect());
        i = end;
    }

    let mut self_closing = false;
    if cs.get(i) == Some(&'/') {
        self_closing = true;
        i += 1;
    }

    if cs.get(i) == Some(&' ') {
        i += 1;
    }
    let rest: String = cs[i..].iter().collect();

    let (value, parse) = if let Some(expr) = rest.strip_prefix('=') {
        (Some(expr.trim().to_string()), true)
    } else if rest.trim().is_empty() {
        (None, false)
    } else {
        (Some(rest.trim().to_string()), false)
    };

    Ok(TagNode {
        name,
        attributes,
        dynamic_attributes,
        object_ref,
        value,
        parse,
        self_closing,
        line: line_no,
        children: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_children(source: &str) -> Vec<Node> {
        match parse(source).unwrap() {
            Node::Root(children) => children,
            other => panic!("expected root, got {other:?}"),
        }
    }

    #[test]
    fn plain_tag_no_attrs() {
        let children = root_children("%div");
        assert_eq!(children.len(), 1);
        let Node::Tag(t) = &children[0] else { panic!() };
        assert_eq!(t.name, "div");
        assert!(t.attributes.is_empty());
    }

    #[test]
    fn implicit_div_with_shorthand_class_and_id() {
        let children = root_children(".foo#bar");
        let Node::Tag(t) = &children[0] else { panic!() };
        assert_eq!(t.name, "div");
        assert_eq!(
            t.attributes,
            vec![("class".to_string(), "foo".to_string()), ("id".to_string(), "bar".to_string())]
        );
    }

    #[test]
    fn tag_with_dynamic_attribute_hash() {
        let children = root_children(r#"%nav.page-nav{ class: "navbar" }"#);
        let Node::Tag(t) = &children[0] else { panic!() };
        assert_eq!(t.name, "nav");
        assert_eq!(t.attributes, vec![("class".to_string(), "page-nav".to_string())]);
        assert_eq!(t.dynamic_attributes.new.as_deref(), Some(r#"class: "navbar""#));
    }

    #[test]
    fn object_reference_and_self_closing() {
        let children = root_children("%br/");
        let Node::Tag(t) = &children[0] else { panic!() };
        assert!(t.self_closing);

        let children = root_children("%tr[@item, :row]");
        let Node::Tag(t) = &children[0] else { panic!() };
        assert_eq!(t.object_ref.as_deref(), Some("@item, :row"));
    }

    #[test]
    fn inline_expression_value() {
        let children = root_children("%p= greeting");
        let Node::Tag(t) = &children[0] else { panic!() };
        assert_eq!(t.value.as_deref(), Some("greeting"));
        assert!(t.parse);
    }

    #[test]
    fn inline_plain_value() {
        let children = root_children("%p Hello #{name}");
        let Node::Tag(t) = &children[0] else { panic!() };
        assert_eq!(t.value.as_deref(), Some("Hello #{name}"));
        assert!(!t.parse);
    }

    #[test]
    fn nested_tag_children() {
        let children = root_children("%div\n  %span Hi");
        let Node::Tag(div) = &children[0] else { panic!() };
        assert_eq!(div.children.len(), 1);
        let Node::Tag(span) = &div.children[0] else { panic!() };
        assert_eq!(span.name, "span");
        assert_eq!(span.value.as_deref(), Some("Hi"));
    }

    #[test]
    fn if_silent_script_block() {
        let source = "- if a\n  %p A\n";
        let children = root_children(source);
        assert_eq!(children.len(), 1);
        let Node::SilentScript(if_node) = &children[0] else { panic!() };
        assert_eq!(if_node.keyword.as_deref(), Some("if"));
        assert_eq!(if_node.children.len(), 1);
    }

    #[test]
    fn else_folds_into_if_nodes_children_not_a_new_sibling() {
        let source = "- if a\n  %p A\n- else\n  %p B\n%p after\n";
        let children = root_children(source);
        assert_eq!(children.len(), 2);
        let Node::SilentScript(if_node) = &children[0] else { panic!() };
        assert_eq!(if_node.children.len(), 2);
        let Node::SilentScript(else_node) = &if_node.children[1] else { panic!() };
        assert_eq!(else_node.text, "else");
        assert_eq!(else_node.children.len(), 1);
        let Node::Tag(after) = &children[1] else { panic!() };
        assert_eq!(after.name, "p");
    }

    #[test]
    fn script_block_form() {
        let source = "= capture do\n  %div\n";
        let children = root_children(source);
        let Node::Script(s) = &children[0] else { panic!() };
        assert_eq!(s.text, "capture do");
        assert_eq!(s.children.len(), 1);
    }

    #[test]
    fn javascript_filter_body() {
        let source = ":javascript\n  alert(1);\n  alert(2);\n";
        let children = root_children(source);
        let Node::Filter(f) = &children[0] else { panic!() };
        assert_eq!(f.name, "javascript");
        assert_eq!(f.text, "alert(1);\nalert(2);");
    }

    #[test]
    fn filter_body_preserves_internal_indentation() {
        let source = ":javascript\n  if (x) {\n    y();\n  }\n";
        let children = root_children(source);
        let Node::Filter(f) = &children[0] else { panic!() };
        assert_eq!(f.text, "if (x) {\n  y();\n}");
    }

    #[test]
    fn haml_comment_swallows_children() {
        let source = "-# not rendered\n  %div nope\n%p after\n";
        let children = root_children(source);
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], Node::HamlComment);
        let Node::Tag(t) = &children[1] else { panic!() };
        assert_eq!(t.name, "p");
    }

    #[test]
    fn html_comment_folds_in_children_as_text() {
        let source = "/ header\n  %p ignored as markup\n";
        let children = root_children(source);
        let Node::Comment(text) = &children[0] else { panic!() };
        assert_eq!(text, "header\n%p ignored as markup");
    }

    #[test]
    fn doctype_xml_and_strict() {
        let children = root_children("!!! XML");
        assert_eq!(children[0], Node::Doctype(DoctypeNode { kind: "xml".into(), encoding: None }));

        let children = root_children("!!! Strict");
        assert_eq!(children[0], Node::Doctype(DoctypeNode { kind: "Strict".into(), encoding: None }));
    }

    #[test]
    fn inconsistent_indentation_is_a_syntax_error() {
        let err = parse("%div\n %p x\n").unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
    }

    #[test]
    fn tab_indentation_is_a_syntax_error() {
        let err = parse("%div\n\t%p x\n").unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
    }

    #[test]
    fn plain_text_cannot_take_children() {
        let err = parse("hello\n  %p nested\n").unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
    }
}
