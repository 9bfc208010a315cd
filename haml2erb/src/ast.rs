//! The typed HAML AST consumed by the emitter.
//!
//! This mirrors the node kinds and payload fields a HAML parser is assumed
//! to yield (see the crate's top-level docs): a closed set of variants
//! instead of the open, symbol-keyed mappings a dynamically typed parser
//! would hand back.

/// A single HAML AST node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// The document root. Only ever appears once, at depth 0.
    Root(Vec<Node>),
    /// `%tag.class#id{ attrs }[obj] value`
    Tag(TagNode),
    /// `= expr` (and its block form, `= expr do ... end`).
    Script(ScriptNode),
    /// `- expr` (control flow, assignment, anything silent).
    SilentScript(SilentScriptNode),
    /// `:name` followed by an indented body.
    Filter(FilterNode),
    /// `!!!` / `!!! XML` / `!!! Strict` etc.
    Doctype(DoctypeNode),
    /// `/ html comment`
    Comment(String),
    /// A bare line of text, possibly containing `#{}` interpolation.
    Plain(String),
    /// `-# ...` — a HAML comment. Produces nothing.
    HamlComment,
}

impl Node {
    /// The source line this node started on, when known.
    ///
    /// Only [`Node::Tag`] tracks a line number explicitly (the emitter only
    /// ever needs one for the void-element warnings); other variants return
    /// `None`.
    pub fn line(&self) -> Option<usize> {
        match self {
            Node::Tag(t) => Some(t.line),
            _ => None,
        }
    }
}

/// Two raw expression-text sources for a tag's dynamic attribute hash:
/// the legacy `:key => value` form ("old") and the `key: value` form
/// ("new"). A HAML author normally only ever writes one, but both fields
/// exist because the upstream grammar keeps them distinct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicAttributes {
    pub old: Option<String>,
    pub new: Option<String>,
}

impl DynamicAttributes {
    pub fn is_empty(&self) -> bool {
        self.old.is_none() && self.new.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagNode {
    pub name: String,
    /// Already-resolved static attributes, in source order (including any
    /// shorthand class/ID the reader folded in).
    pub attributes: Vec<(String, String)>,
    pub dynamic_attributes: DynamicAttributes,
    /// Raw bracketed expression text, e.g. `@item, :row`.
    pub object_ref: Option<String>,
    pub value: Option<String>,
    /// When true, `value` is a source-language expression; otherwise plain text.
    pub parse: bool,
    pub self_closing: bool,
    pub line: usize,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptNode {
    pub text: String,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SilentScriptNode {
    pub text: String,
    /// The control-flow keyword that opened this node, if any
    /// (`if`, `unless`, `case`, `begin`, `while`, `until`, `for`).
    pub keyword: Option<String>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterNode {
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctypeNode {
    /// `"xml"` or the doctype keyword after `!!!` (`"Strict"`, `"5"`, ...).
    pub kind: String,
    pub encoding: Option<String>,
}

/// Mid-block continuation keywords: these never open or close a block of
/// their own, they resume the enclosing one at its depth.
pub const MID_BLOCK_KEYWORDS: &[&str] = &["else", "elsif", "when", "rescue", "ensure"];

/// Control-flow keywords whose [`SilentScriptNode`] always needs a matching
/// `<% end %>` once it has at least one child.
pub const BLOCK_KEYWORDS: &[&str] = &["if", "unless", "case", "begin", "while", "until", "for"];

/// HTML elements that are never closed and never take children.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

pub fn is_void(tag_name: &str) -> bool {
    VOID_ELEMENTS.contains(&tag_name)
}
