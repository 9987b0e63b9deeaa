//! Core trait and leaf node for the CST.
//!
//! Rendering is exact: every node writes its pieces in source order, and
//! every lexical atom carries the trivia that precedes it, so rendering a
//! freshly parsed tree reproduces the input byte-for-byte.

use std::fmt;

// ============================================================================
// Codegen
// ============================================================================

/// Accumulates rendered source text.
#[derive(Debug, Default)]
pub struct CodegenState {
    out: String,
}

impl CodegenState {
    /// Append a piece of source text.
    pub fn add(&mut self, text: &str) {
        self.out.push_str(text);
    }
}

impl fmt::Display for CodegenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.out)
    }
}

/// Convert a CST node back to source text.
pub trait Codegen {
    fn codegen(&self, state: &mut CodegenState);
}

impl<T: Codegen> Codegen for Option<T> {
    fn codegen(&self, state: &mut CodegenState) {
        if let Some(node) = self {
            node.codegen(state);
        }
    }
}

impl<T: Codegen> Codegen for Vec<T> {
    fn codegen(&self, state: &mut CodegenState) {
        for node in self {
            node.codegen(state);
        }
    }
}

impl<T: Codegen> Codegen for Box<T> {
    fn codegen(&self, state: &mut CodegenState) {
        (**self).codegen(state);
    }
}

/// Render a node to a fresh string.
pub fn render<T: Codegen>(node: &T) -> String {
    let mut state = CodegenState::default();
    node.codegen(&mut state);
    state.to_string()
}

// ============================================================================
// Leaf node
// ============================================================================

/// A lexical atom: the trivia preceding it plus its text.
///
/// Raw spans (attribute arguments, property accessor bodies, object
/// initializers) are also stored this way, with the interior trivia baked
/// into `text`; the rewriter never edits inside them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenNode {
    pub leading: String,
    pub text: String,
}

impl TokenNode {
    pub fn new(leading: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            leading: leading.into(),
            text: text.into(),
        }
    }

    /// A token with no leading trivia.
    pub fn bare(text: impl Into<String>) -> Self {
        Self::new("", text)
    }

    /// Same leading trivia, different text.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            leading: self.leading.clone(),
            text: text.into(),
        }
    }

    /// The indentation of the line this token starts: the portion of the
    /// leading trivia after its last newline.
    pub fn indentation(&self) -> &str {
        match self.leading.rfind('\n') {
            Some(idx) => &self.leading[idx + 1..],
            None => &self.leading,
        }
    }
}

impl Codegen for TokenNode {
    fn codegen(&self, state: &mut CodegenState) {
        state.add(&self.leading);
        state.add(&self.text);
    }
}

// ============================================================================
// Tests
// ============================================================================
