//! Mustache template parser.
//!
//! Turns template source into a tree of nodes. Delimiter changes and
//! partials are rejected.

use ltr_core::RenderError;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const TRIPLE_CLOSE: &str = "}}}";

/// Section helper rendering its argument as JSON.
const TO_JSON: &str = "toJson";

/// Section helper joining an array argument.
const JOIN: &str = "join";

const DEFAULT_JOIN_DELIMITER: &str = ",";

/// A parsed template node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    /// Literal text.
    Text(String),

    /// Variable reference.
    Variable { name: String, escape: bool },

    /// Section (`{{#name}}`) or inverted section (`{{^name}}`).
    Section {
        name: String,
        inverted: bool,
        children: Vec<Node>,
    },

    /// `{{#toJson}}name{{/toJson}}`
    ToJson { name: String },

    /// `{{#join}}name{{/join}}`
    Join { name: String, delimiter: String },
}

enum Tag<'a> {
    Comment,
    Variable { name: &'a str, escape: bool },
    Open { tag: &'a str, inverted: bool },
    Close(&'a str),
}

/// An open section awaiting its closing tag.
struct Frame<'a> {
    tag: &'a str,
    inverted: bool,
    children: Vec<Node>,
}

impl Frame<'_> {
    /// The name a closing tag must repeat.
    fn key(&self) -> &str {
        self.tag.split_whitespace().next().unwrap_or_default()
    }
}

/// Parse template source into nodes.
pub(crate) fn parse(source: &str) -> Result<Vec<Node>, RenderError> {
    let mut root: Vec<Node> = Vec::new();
    let mut frames: Vec<Frame<'_>> = Vec::new();
    let mut pos = 0;

    while pos < source.len() {
        let start = match source[pos..].find(OPEN) {
            Some(offset) => pos + offset,
            None => {
                push_node(&mut root, &mut frames, Node::Text(source[pos..].to_string()));
                break;
            }
        };

        if start > pos {
            push_node(&mut root, &mut frames, Node::Text(source[pos..start].to_string()));
        }

        let (tag, next) = read_tag(source, start)?;
        pos = next;

        match tag {
            Tag::Comment => {}
            Tag::Variable { name, escape } => {
                let node = Node::Variable {
                    name: name.to_string(),
                    escape,
                };
                push_node(&mut root, &mut frames, node);
            }
            Tag::Open { tag, inverted } => frames.push(Frame {
                tag,
                inverted,
                children: Vec::new(),
            }),
            Tag::Close(name) => {
                let frame = frames.pop().ok_or_else(|| {
                    RenderError::other(format!("closing tag [{}] has no matching section", name))
                })?;
                if frame.key() != name {
                    return Err(RenderError::other(format!(
                        "closing tag [{}] does not match open section [{}]",
                        name,
                        frame.key()
                    )));
                }
                let node = close_section(frame)?;
                push_node(&mut root, &mut frames, node);
            }
        }
    }

    if let Some(frame) = frames.last() {
        return Err(RenderError::other(format!(
            "section [{}] is never closed",
            frame.key()
        )));
    }

    Ok(root)
}

fn push_node(root: &mut Vec<Node>, frames: &mut [Frame<'_>], node: Node) {
    match frames.last_mut() {
        Some(frame) => frame.children.push(node),
        None => root.push(node),
    }
}

/// Read the tag starting at `start`, returning it and the position after it.
fn read_tag(source: &str, start: usize) -> Result<(Tag<'_>, usize), RenderError> {
    let inner_start = start + OPEN.len();

    if source[inner_start..].starts_with('{') {
        let end = find_close(source, inner_start + 1, TRIPLE_CLOSE)?;
        let name = non_empty(source[inner_start + 1..end].trim(), start)?;
        return Ok((Tag::Variable { name, escape: false }, end + TRIPLE_CLOSE.len()));
    }

    let end = find_close(source, inner_start, CLOSE)?;
    let next = end + CLOSE.len();
    let content = source[inner_start..end].trim();

    let mut chars = content.chars();
    let tag = match chars.next() {
        Some('!') => Tag::Comment,
        Some('#') => Tag::Open {
            tag: non_empty(chars.as_str().trim(), start)?,
            inverted: false,
        },
        Some('^') => Tag::Open {
            tag: non_empty(chars.as_str().trim(), start)?,
            inverted: true,
        },
        Some('/') => Tag::Close(non_empty(chars.as_str().trim(), start)?),
        Some('&') => Tag::Variable {
            name: non_empty(chars.as_str().trim(), start)?,
            escape: false,
        },
        Some('>') => {
            return Err(RenderError::other(format!(
                "partials are not supported (at byte {})",
                start
            )))
        }
        Some('=') => {
            return Err(RenderError::other(format!(
                "delimiter changes are not supported (at byte {})",
                start
            )))
        }
        Some(_) => Tag::Variable {
            name: content,
            escape: true,
        },
        None => return Err(RenderError::other(format!("empty tag at byte {}", start))),
    };

    Ok((tag, next))
}

fn find_close(source: &str, from: usize, close: &str) -> Result<usize, RenderError> {
    source[from..]
        .find(close)
        .map(|offset| from + offset)
        .ok_or_else(|| RenderError::other(format!("unclosed tag at byte {}", from - OPEN.len())))
}

fn non_empty(name: &str, at: usize) -> Result<&str, RenderError> {
    if name.is_empty() {
        Err(RenderError::other(format!("empty tag at byte {}", at)))
    } else {
        Ok(name)
    }
}

/// Build the node for a closed section, expanding helpers.
fn close_section(frame: Frame<'_>) -> Result<Node, RenderError> {
    let key = frame.key().to_string();

    if !frame.inverted && (key == TO_JSON || key == JOIN) {
        let name = match frame.children.as_slice() {
            [Node::Text(text)] if !text.trim().is_empty() => text.trim().to_string(),
            _ => {
                return Err(RenderError::other(format!(
                    "[{}] expects a single parameter name",
                    key
                )))
            }
        };

        if key == TO_JSON {
            return Ok(Node::ToJson { name });
        }

        let delimiter = join_delimiter(frame.tag[JOIN.len()..].trim())?;
        return Ok(Node::Join { name, delimiter });
    }

    Ok(Node::Section {
        name: key,
        inverted: frame.inverted,
        children: frame.children,
    })
}

/// Parse the `delimiter='..'` argument of a join section.
///
/// Double quotes may appear JSON-escaped (`delimiter=\"..\"`) when the
/// template sits inside a JSON string.
fn join_delimiter(args: &str) -> Result<String, RenderError> {
    if args.is_empty() {
        return Ok(DEFAULT_JOIN_DELIMITER.to_string());
    }

    let value = args
        .strip_prefix("delimiter")
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix('='))
        .map(str::trim)
        .ok_or_else(|| RenderError::other(format!("invalid join arguments [{}]", args)))?;

    let unquoted = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| value.strip_prefix("\\\"").and_then(|v| v.strip_suffix("\\\"")))
        .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
        .ok_or_else(|| RenderError::other(format!("join delimiter must be quoted: [{}]", value)))?;

    Ok(unquoted.to_string())
}
