//! Expression nodes for the supported C# fragment.

use super::traits::{Codegen, CodegenState, TokenNode};

// ============================================================================
// Type names
// ============================================================================

/// A type reference as written in source: qualified name, generic argument
/// list, array ranks, and nullable suffix, stored textually. The semantic
/// model interprets the text; the CST only preserves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    pub leading: String,
    pub text: String,
}

impl TypeName {
    pub fn new(leading: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            leading: leading.into(),
            text: text.into(),
        }
    }

    /// Returns true for the inferred-type marker.
    pub fn is_var(&self) -> bool {
        self.text == "var"
    }

    /// Same leading trivia, different type text.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            leading: self.leading.clone(),
            text: text.into(),
        }
    }

    /// The type text with interior whitespace removed, for semantic lookup.
    pub fn canonical_text(&self) -> String {
        self.text.chars().filter(|c| !c.is_whitespace()).collect()
    }
}

impl Codegen for TypeName {
    fn codegen(&self, state: &mut CodegenState) {
        state.add(&self.leading);
        state.add(&self.text);
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Identifier(TokenNode),
    Literal(Literal),
    Member(Box<MemberAccess>),
    Invocation(Box<Invocation>),
    ElementAccess(Box<ElementAccess>),
    ObjectCreation(Box<ObjectCreation>),
    Conditional(Box<Conditional>),
    Binary(Box<Binary>),
    PrefixUnary(Box<PrefixUnary>),
    PostfixUnary(Box<PostfixUnary>),
    Lambda(Box<Lambda>),
    Parenthesized(Box<Parenthesized>),
}

impl Codegen for Expression {
    fn codegen(&self, state: &mut CodegenState) {
        match self {
            Self::Identifier(t) => t.codegen(state),
            Self::Literal(n) => n.codegen(state),
            Self::Member(n) => n.codegen(state),
            Self::Invocation(n) => n.codegen(state),
            Self::ElementAccess(n) => n.codegen(state),
            Self::ObjectCreation(n) => n.codegen(state),
            Self::Conditional(n) => n.codegen(state),
            Self::Binary(n) => n.codegen(state),
            Self::PrefixUnary(n) => n.codegen(state),
            Self::PostfixUnary(n) => n.codegen(state),
            Self::Lambda(n) => n.codegen(state),
            Self::Parenthesized(n) => n.codegen(state),
        }
    }
}

/// Literal category, decided at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Int,
    Real,
    Str,
    Char,
    Bool,
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub kind: LiteralKind,
    pub token: TokenNode,
}

impl Codegen for Literal {
    fn codegen(&self, state: &mut CodegenState) {
        self.token.codegen(state);
    }
}

/// `target.name` or `target?.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAccess {
    pub target: Expression,
    pub dot: TokenNode,
    pub name: TokenNode,
}

impl Codegen for MemberAccess {
    fn codegen(&self, state: &mut CodegenState) {
        self.target.codegen(state);
        self.dot.codegen(state);
        self.name.codegen(state);
    }
}

/// One element of a comma-separated argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub value: Expression,
    pub comma: Option<TokenNode>,
}

impl Codegen for Argument {
    fn codegen(&self, state: &mut CodegenState) {
        self.value.codegen(state);
        self.comma.codegen(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub callee: Expression,
    pub open: TokenNode,
    pub arguments: Vec<Argument>,
    pub close: TokenNode,
}

impl Invocation {
    /// The callee identifier when the call target is a bare name.
    pub fn bare_callee(&self) -> Option<&TokenNode> {
        match &self.callee {
            Expression::Identifier(name) => Some(name),
            _ => None,
        }
    }
}

impl Codegen for Invocation {
    fn codegen(&self, state: &mut CodegenState) {
        self.callee.codegen(state);
        self.open.codegen(state);
        self.arguments.codegen(state);
        self.close.codegen(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementAccess {
    pub target: Expression,
    pub open: TokenNode,
    pub index: Expression,
    pub close: TokenNode,
}

impl Codegen for ElementAccess {
    fn codegen(&self, state: &mut CodegenState) {
        self.target.codegen(state);
        self.open.codegen(state);
        self.index.codegen(state);
        self.close.codegen(state);
    }
}

/// `new T(args) { ... }`, target-typed `new(args)`, or `new[] { ... }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectCreation {
    pub new_token: TokenNode,
    pub ty: Option<TypeName>,
    pub open: Option<TokenNode>,
    pub arguments: Vec<Argument>,
    pub close: Option<TokenNode>,
    /// Raw balanced initializer (`{ ... }` or `[] { ... }`), unparsed.
    pub initializer: Option<TokenNode>,
}

impl Codegen for ObjectCreation {
    fn codegen(&self, state: &mut CodegenState) {
        self.new_token.codegen(state);
        self.ty.codegen(state);
        self.open.codegen(state);
        self.arguments.codegen(state);
        self.close.codegen(state);
        self.initializer.codegen(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conditional {
    pub condition: Expression,
    pub question: TokenNode,
    pub when_true: Expression,
    pub colon: TokenNode,
    pub when_false: Expression,
}

impl Codegen for Conditional {
    fn codegen(&self, state: &mut CodegenState) {
        self.condition.codegen(state);
        self.question.codegen(state);
        self.when_true.codegen(state);
        self.colon.codegen(state);
        self.when_false.codegen(state);
    }
}

/// Binary operation, including assignment operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binary {
    pub left: Expression,
    pub operator: TokenNode,
    pub right: Expression,
}

impl Codegen for Binary {
    fn codegen(&self, state: &mut CodegenState) {
        self.left.codegen(state);
        self.operator.codegen(state);
        self.right.codegen(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixUnary {
    pub operator: TokenNode,
    pub operand: Expression,
}

impl Codegen for PrefixUnary {
    fn codegen(&self, state: &mut CodegenState) {
        self.operator.codegen(state);
        self.operand.codegen(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostfixUnary {
    pub operand: Expression,
    pub operator: TokenNode,
}

impl Codegen for PostfixUnary {
    fn codegen(&self, state: &mut CodegenState) {
        self.operand.codegen(state);
        self.operator.codegen(state);
    }
}

/// `x => body` or `(a, b) => body`; the parameter list is kept raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lambda {
    pub parameters: TokenNode,
    pub arrow: TokenNode,
    pub body: Expression,
}

impl Codegen for Lambda {
    fn codegen(&self, state: &mut CodegenState) {
        self.parameters.codegen(state);
        self.arrow.codegen(state);
        self.body.codegen(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parenthesized {
    pub open: TokenNode,
    pub expression: Expression,
    pub close: TokenNode,
}

impl Codegen for Parenthesized {
    fn codegen(&self, state: &mut CodegenState) {
        self.open.codegen(state);
        self.expression.codegen(state);
        self.close.codegen(state);
    }
}
