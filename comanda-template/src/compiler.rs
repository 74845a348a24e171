//! Template compiler
//!
//! Parses template text into an immutable node tree, once per template.
//! Block balance and QR placement are validated here so that a broken
//! template fails at load time, not per order.

use thiserror::Error;

/// A compiled template node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Verbatim text run
    Literal(String),
    /// Scalar placeholder, resolved against the binding context
    Scalar(String),
    /// QR directive carrying the name of the field holding the payload
    Qr(String),
    /// Repeating block over a named collection
    Each { collection: String, body: Vec<Node> },
    /// Conditional block on a named field's truthiness
    If { key: String, body: Vec<Node> },
}

/// Template compilation errors
///
/// All of these are fatal at agent startup: a template that fails to
/// compile must never be used for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("unclosed block `{marker}` opened at byte {offset}")]
    UnclosedBlock { marker: String, offset: usize },

    #[error("close marker `{marker}` at byte {offset} has no matching open block")]
    UnexpectedClose { marker: String, offset: usize },

    #[error("close marker `{found}` at byte {offset} does not match open block `{opened}`")]
    MismatchedClose {
        opened: String,
        found: String,
        offset: usize,
    },

    #[error("QR marker at byte {offset} must be alone on its line")]
    QrNotStandalone { offset: usize },

    #[error("malformed QR marker at byte {offset}, expected `[QR:{{{{field}}}}]`")]
    MalformedQr { offset: usize },
}

/// A compiled, immutable template
///
/// Compilation is deterministic: the same text always yields a
/// structurally equal tree. Safe to share across concurrent renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    nodes: Vec<Node>,
}

impl CompiledTemplate {
    /// Compile template text into a node tree
    pub fn compile(text: &str) -> Result<Self, CompileError> {
        let nodes = Parser::new(text).run()?;
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Each,
    If,
}

struct Frame {
    kind: BlockKind,
    name: String,
    offset: usize,
    nodes: Vec<Node>,
}

impl Frame {
    fn marker(&self) -> String {
        match self.kind {
            BlockKind::Each => format!("#each {}", self.name),
            BlockKind::If => format!("#if {}", self.name),
        }
    }
}

struct Parser<'t> {
    text: &'t str,
    pos: usize,
    root: Vec<Node>,
    stack: Vec<Frame>,
    lit: String,
    /// The current output line already carries rendered content
    /// (non-whitespace literal text or a scalar placeholder).
    inline_content: bool,
}

impl<'t> Parser<'t> {
    fn new(text: &'t str) -> Self {
        Self {
            text,
            pos: 0,
            root: Vec::new(),
            stack: Vec::new(),
            lit: String::new(),
            inline_content: false,
        }
    }

    fn run(mut self) -> Result<Vec<Node>, CompileError> {
        while self.pos < self.text.len() {
            let rest = &self.text[self.pos..];
            let brace = rest.find("{{");
            let qr = rest.find("[QR:");

            let (off, is_qr) = match (brace, qr) {
                (None, None) => {
                    self.append_literal(rest.len());
                    break;
                }
                (Some(b), None) => (b, false),
                (None, Some(q)) => (q, true),
                (Some(b), Some(q)) => {
                    if q < b {
                        (q, true)
                    } else {
                        (b, false)
                    }
                }
            };

            self.append_literal(off);
            if is_qr {
                self.parse_qr()?;
            } else {
                self.parse_brace()?;
            }
        }

        self.flush_literal();

        if let Some(frame) = self.stack.last() {
            return Err(CompileError::UnclosedBlock {
                marker: frame.marker(),
                offset: frame.offset,
            });
        }

        Ok(self.root)
    }

    // === literal handling ===

    fn append_literal(&mut self, len: usize) {
        if len == 0 {
            return;
        }
        let chunk = &self.text[self.pos..self.pos + len];
        if let Some(nl) = chunk.rfind('\n') {
            self.inline_content = !chunk[nl + 1..].trim().is_empty();
        } else if !chunk.trim().is_empty() {
            self.inline_content = true;
        }
        self.lit.push_str(chunk);
        self.pos += len;
    }

    fn push_raw(&mut self, s: &str) {
        self.lit.push_str(s);
        self.inline_content = true;
    }

    fn flush_literal(&mut self) {
        if !self.lit.is_empty() {
            let lit = std::mem::take(&mut self.lit);
            self.nodes_mut().push(Node::Literal(lit));
        }
    }

    fn nodes_mut(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(frame) => &mut frame.nodes,
            None => &mut self.root,
        }
    }

    // === line bookkeeping ===

    /// Whether everything on the current line before `pos` is blank
    fn line_blank_before(&self) -> bool {
        let prefix = match self.lit.rfind('\n') {
            Some(nl) => &self.lit[nl + 1..],
            None => &self.lit[..],
        };
        prefix.trim().is_empty() && !self.inline_content
    }

    /// If the rest of the line after `end` is blank, returns how many
    /// bytes (trailing spaces plus the newline) to consume.
    fn blank_line_after(&self, end: usize) -> Option<usize> {
        let rest = &self.text[end..];
        let ws = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        let tail = &rest[ws..];
        if tail.is_empty() {
            Some(ws)
        } else if tail.starts_with("\r\n") {
            Some(ws + 2)
        } else if tail.starts_with('\n') {
            Some(ws + 1)
        } else {
            None
        }
    }

    /// Drop the indent of the current (blank) line from the literal so a
    /// standalone marker does not leave stray whitespace behind.
    fn drop_line_indent(&mut self) {
        match self.lit.rfind('\n') {
            Some(nl) => self.lit.truncate(nl + 1),
            None => self.lit.clear(),
        }
    }

    // === token parsing ===

    fn parse_qr(&mut self) -> Result<(), CompileError> {
        let at = self.pos;
        let rest = &self.text[at..];

        // [QR:{{name}}]
        let inner = &rest[4..];
        let Some(body) = inner.strip_prefix("{{") else {
            return Err(CompileError::MalformedQr { offset: at });
        };
        let Some(close) = body.find("}}") else {
            return Err(CompileError::MalformedQr { offset: at });
        };
        let name = body[..close].trim();
        if !is_ident(name) {
            return Err(CompileError::MalformedQr { offset: at });
        }
        let after_braces = &body[close + 2..];
        if !after_braces.starts_with(']') {
            return Err(CompileError::MalformedQr { offset: at });
        }
        let token_len = 4 + 2 + close + 2 + 1;

        // Standalone on its own line, statically enforced
        if !self.line_blank_before() {
            return Err(CompileError::QrNotStandalone { offset: at });
        }
        let Some(consume) = self.blank_line_after(at + token_len) else {
            return Err(CompileError::QrNotStandalone { offset: at });
        };

        self.drop_line_indent();
        self.flush_literal();
        let name = name.to_string();
        self.nodes_mut().push(Node::Qr(name));

        self.pos = at + token_len + consume;
        self.inline_content = false;
        Ok(())
    }

    fn parse_brace(&mut self) -> Result<(), CompileError> {
        let at = self.pos;
        let rest = &self.text[at..];

        let Some(close) = rest[2..].find("}}") else {
            // No closing braces anywhere: keep the `{{` as literal text
            self.push_raw("{{");
            self.pos = at + 2;
            return Ok(());
        };
        let inner = &rest[2..2 + close];
        let token_len = close + 4;

        if let Some(rest) = inner.strip_prefix("#each") {
            let name = rest.trim();
            if rest.starts_with([' ', '\t']) && is_ident(name) {
                self.open_block(BlockKind::Each, name, at, token_len);
                return Ok(());
            }
        } else if let Some(rest) = inner.strip_prefix("#if") {
            let name = rest.trim();
            if rest.starts_with([' ', '\t']) && is_ident(name) {
                self.open_block(BlockKind::If, name, at, token_len);
                return Ok(());
            }
        } else if inner.trim() == "/each" {
            return self.close_block(BlockKind::Each, "/each", at, token_len);
        } else if inner.trim() == "/if" {
            return self.close_block(BlockKind::If, "/if", at, token_len);
        } else {
            let name = inner.trim();
            if is_ident(name) {
                self.flush_literal();
                let name = name.to_string();
                self.nodes_mut().push(Node::Scalar(name));
                self.inline_content = true;
                self.pos = at + token_len;
                return Ok(());
            }
        }

        // Not a recognized token: keep it as literal text
        let raw = self.text[at..at + token_len].to_string();
        self.push_raw(&raw);
        self.pos = at + token_len;
        Ok(())
    }

    /// Consume a standalone marker's line, or leave the position right
    /// after the token for an inline marker.
    fn consume_marker(&mut self, at: usize, token_len: usize) {
        if self.line_blank_before()
            && let Some(consume) = self.blank_line_after(at + token_len)
        {
            self.drop_line_indent();
            self.pos = at + token_len + consume;
            self.inline_content = false;
        } else {
            self.pos = at + token_len;
        }
    }

    fn open_block(&mut self, kind: BlockKind, name: &str, at: usize, token_len: usize) {
        self.consume_marker(at, token_len);
        self.flush_literal();
        self.stack.push(Frame {
            kind,
            name: name.to_string(),
            offset: at,
            nodes: Vec::new(),
        });
    }

    fn close_block(
        &mut self,
        kind: BlockKind,
        marker: &str,
        at: usize,
        token_len: usize,
    ) -> Result<(), CompileError> {
        self.consume_marker(at, token_len);
        self.flush_literal();

        let Some(frame) = self.stack.pop() else {
            return Err(CompileError::UnexpectedClose {
                marker: marker.to_string(),
                offset: at,
            });
        };
        if frame.kind != kind {
            return Err(CompileError::MismatchedClose {
                opened: frame.marker(),
                found: marker.to_string(),
                offset: at,
            });
        }

        let node = match frame.kind {
            BlockKind::Each => Node::Each {
                collection: frame.name,
                body: frame.nodes,
            },
            BlockKind::If => Node::If {
                key: frame.name,
                body: frame.nodes,
            },
        };
        self.nodes_mut().push(node);
        Ok(())
    }
}

fn is_ident(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
