//! Recursive-descent parser for the supported C# fragment.
//!
//! The parser covers what the rewrite passes need to see plus the
//! surrounding file shape: using directives, namespaces (block and
//! file-scoped), classes and interfaces, fields, properties (raw accessor
//! blocks), constructors, methods (block, expression-bodied, or abstract),
//! attribute lists (raw argument text), and the statement and expression
//! forms found in controller code. Casts, generic type declarations, and
//! generic method arguments are outside the fragment.
//!
//! Statement-start ambiguity between a declaration and an expression is
//! resolved by bounded lookahead with backtracking: a statement is a
//! declaration only when a type followed by an identifier followed by
//! `=`, `;`, or `,` parses at the start.

use thiserror::Error;

use crate::cst::{
    Argument, AttributeArguments, AttributeItem, AttributeList, BaseList, BaseType, Binary, Block,
    CompilationUnit, Conditional, ConstructorDeclaration, ElementAccess, ElseClause, Expression,
    ExpressionStatement, FieldDeclaration, ForEachStatement, ForInitializer, ForStatement,
    IfStatement, Initializer, Invocation, Lambda, Literal, LiteralKind,
    LocalDeclarationStatement, Member, MemberAccess, MethodBody, MethodDeclaration,
    NamespaceBody, NamespaceDeclaration, ObjectCreation, Parameter, Parenthesized, PostfixUnary,
    PrefixUnary, PropertyDeclaration, ReturnStatement, SeparatedExpression, Statement,
    ThrowStatement, TokenNode, TypeDeclaration, TypeMember, TypeName, UsingAlias, UsingDirective,
    VariableDeclaration, VariableDeclarator, WhileStatement,
};
use crate::tokenizer::{tokenize, Token, TokenKind, TokenizeError};

// ============================================================================
// Errors
// ============================================================================

/// Parse failure with source location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {line}:{col}")]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub col: u32,
}

impl From<TokenizeError> for ParseError {
    fn from(err: TokenizeError) -> Self {
        let message = match err {
            TokenizeError::UnterminatedString { .. } => "unterminated string literal",
            TokenizeError::UnterminatedChar { .. } => "unterminated character literal",
            TokenizeError::UnterminatedComment { .. } => "unterminated block comment",
            TokenizeError::UnexpectedChar { .. } => "unexpected character",
        };
        Self {
            message: message.to_string(),
            line: err.line(),
            col: err.col(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Parse one source file into a [`CompilationUnit`].
pub fn parse_unit(text: &str) -> Result<CompilationUnit> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_compilation_unit()
}

// ============================================================================
// Keyword tables
// ============================================================================

/// Keywords that can never begin a type reference.
const NON_TYPE_KEYWORDS: &[&str] = &[
    "new", "return", "if", "else", "while", "for", "foreach", "in", "is", "as", "class",
    "interface", "namespace", "using", "throw", "true", "false", "null", "this", "base", "await",
    "public", "private", "protected", "internal", "static", "readonly", "sealed", "abstract",
    "virtual", "override", "async", "partial", "const",
];

const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "readonly", "sealed", "abstract",
    "virtual", "override", "async", "partial", "const",
];

const PARAMETER_MODIFIERS: &[&str] = &["ref", "out", "params", "this", "in"];

const ASSIGNMENT_OPERATORS: &[&str] =
    &["=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "??="];

fn is_non_type_keyword(text: &str) -> bool {
    NON_TYPE_KEYWORDS.contains(&text)
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    // ---- token access -----------------------------------------------------

    fn token_at(&self, pos: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[pos.min(last)]
    }

    fn peek(&self) -> &Token {
        self.token_at(self.pos)
    }

    fn peek_text(&self) -> &str {
        &self.peek().text
    }

    fn at(&self, text: &str) -> bool {
        self.peek().is(text)
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn bump(&mut self) -> TokenNode {
        let token = self.token_at(self.pos).clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        TokenNode::new(token.leading, token.text)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let token = self.peek();
        ParseError {
            message: message.into(),
            line: token.line,
            col: token.col,
        }
    }

    fn expect(&mut self, text: &str) -> Result<TokenNode> {
        if self.at(text) {
            Ok(self.bump())
        } else {
            Err(self.error(format!("expected '{}', found '{}'", text, self.peek_text())))
        }
    }

    fn expect_identifier(&mut self) -> Result<TokenNode> {
        if self.peek().is_identifier() {
            Ok(self.bump())
        } else {
            Err(self.error(format!("expected identifier, found '{}'", self.peek_text())))
        }
    }

    /// `ident (. ident)*` collected into a single raw token node.
    fn qualified_name_raw(&mut self) -> Result<TokenNode> {
        let first = self.expect_identifier()?;
        let mut text = first.text;
        while self.at(".") && self.token_at(self.pos + 1).is_identifier() {
            let dot = self.bump();
            text.push_str(&dot.leading);
            text.push_str(&dot.text);
            let segment = self.bump();
            text.push_str(&segment.leading);
            text.push_str(&segment.text);
        }
        Ok(TokenNode::new(first.leading, text))
    }

    // ---- raw spans --------------------------------------------------------

    /// Consume one balanced `{...}`, `[...]`, or `(...)` group as a raw span.
    fn raw_balanced(&mut self) -> Result<TokenNode> {
        let open = self.bump();
        let mut text = open.text.clone();
        let mut depth = 1u32;
        while depth > 0 {
            if self.at_eof() {
                return Err(self.error("unterminated delimited span"));
            }
            let token = self.bump();
            match token.text.as_str() {
                "{" | "[" | "(" => depth += 1,
                "}" | "]" | ")" => depth -= 1,
                _ => {}
            }
            text.push_str(&token.leading);
            text.push_str(&token.text);
        }
        Ok(TokenNode::new(open.leading, text))
    }

    /// Consume raw text up to (not including) the `)` that closes the
    /// already-consumed `(`.
    fn raw_until_close_paren(&mut self) -> Result<TokenNode> {
        let mut leading: Option<String> = None;
        let mut text = String::new();
        let mut depth = 1u32;
        loop {
            if self.at_eof() {
                return Err(self.error("unterminated argument list"));
            }
            match self.peek_text() {
                ")" if depth == 1 => break,
                "{" | "[" | "(" => depth += 1,
                "}" | "]" | ")" => depth -= 1,
                _ => {}
            }
            let token = self.bump();
            match &mut leading {
                None => {
                    leading = Some(token.leading);
                    text = token.text;
                }
                Some(_) => {
                    text.push_str(&token.leading);
                    text.push_str(&token.text);
                }
            }
        }
        Ok(TokenNode::new(leading.unwrap_or_default(), text))
    }

    // ---- types ------------------------------------------------------------

    /// Scan a type reference, returning `(leading, text)`. Restores the
    /// position and returns `None` when no type starts here.
    fn scan_type(&mut self) -> Option<(String, String)> {
        if !self.peek().is_identifier() || is_non_type_keyword(self.peek_text()) {
            return None;
        }
        let first = self.bump();
        let leading = first.leading;
        let mut text = first.text;

        while self.at(".") && self.token_at(self.pos + 1).is_identifier() {
            let dot = self.bump();
            text.push_str(&dot.leading);
            text.push_str(&dot.text);
            let segment = self.bump();
            text.push_str(&segment.leading);
            text.push_str(&segment.text);
        }

        if self.at("<") {
            // Tentative: `a < b` in an expression reaches here too. When the
            // bracket does not close as an argument list the type stands
            // without it, and the caller's follow-token check decides.
            let save = self.pos;
            let mut generics = String::new();
            let open = self.bump();
            generics.push_str(&open.leading);
            generics.push_str(&open.text);
            let closed = loop {
                match self.scan_type() {
                    Some((l, t)) => {
                        generics.push_str(&l);
                        generics.push_str(&t);
                    }
                    None => break false,
                }
                if self.at(",") {
                    let comma = self.bump();
                    generics.push_str(&comma.leading);
                    generics.push_str(&comma.text);
                    continue;
                }
                if self.at(">") {
                    let close = self.bump();
                    generics.push_str(&close.leading);
                    generics.push_str(&close.text);
                    break true;
                }
                break false;
            };
            if closed {
                text.push_str(&generics);
            } else {
                self.pos = save;
            }
        }

        // Array ranks: `[]`, `[,]`, ...
        loop {
            if !self.at("[") {
                break;
            }
            let mut probe = self.pos + 1;
            while self.token_at(probe).is(",") {
                probe += 1;
            }
            if !self.token_at(probe).is("]") {
                break;
            }
            while self.pos <= probe {
                let token = self.bump();
                text.push_str(&token.leading);
                text.push_str(&token.text);
            }
        }

        // Nullable suffix, only when an identifier follows (`int? x`), so a
        // conditional expression never loses its `?`.
        if self.at("?") && self.token_at(self.pos + 1).is_identifier() {
            let question = self.bump();
            text.push_str(&question.leading);
            text.push_str(&question.text);
        }

        Some((leading, text))
    }

    fn require_type(&mut self, context: &str) -> Result<TypeName> {
        match self.scan_type() {
            Some((leading, text)) => Ok(TypeName::new(leading, text)),
            None => Err(self.error(format!("expected type in {context}"))),
        }
    }

    // ---- compilation unit -------------------------------------------------

    fn parse_compilation_unit(&mut self) -> Result<CompilationUnit> {
        let usings = self.parse_usings()?;
        let mut members = Vec::new();
        while !self.at_eof() {
            members.push(self.parse_member()?);
        }
        let eof = self.bump();
        Ok(CompilationUnit {
            usings,
            members,
            eof,
        })
    }

    fn parse_usings(&mut self) -> Result<Vec<UsingDirective>> {
        let mut usings = Vec::new();
        while self.at("using") {
            usings.push(self.parse_using_directive()?);
        }
        Ok(usings)
    }

    fn parse_using_directive(&mut self) -> Result<UsingDirective> {
        let using_token = self.bump();
        let static_token = if self.at("static") {
            Some(self.bump())
        } else {
            None
        };
        let alias = if self.peek().is_identifier() && self.token_at(self.pos + 1).is("=") {
            let name = self.bump();
            let equals = self.bump();
            Some(UsingAlias { name, equals })
        } else {
            None
        };
        let name = self.qualified_name_raw()?;
        let semicolon = self.expect(";")?;
        Ok(UsingDirective {
            using_token,
            static_token,
            alias,
            name,
            semicolon,
        })
    }

    fn parse_member(&mut self) -> Result<Member> {
        if self.at("namespace") {
            return Ok(Member::Namespace(Box::new(self.parse_namespace()?)));
        }
        let attribute_lists = self.parse_attribute_lists()?;
        let modifiers = self.parse_modifiers();
        if self.at("class") || self.at("interface") {
            let decl = self.parse_type_declaration(attribute_lists, modifiers)?;
            Ok(Member::Type(Box::new(decl)))
        } else {
            Err(self.error(format!(
                "expected type declaration, found '{}'",
                self.peek_text()
            )))
        }
    }

    fn parse_namespace(&mut self) -> Result<NamespaceDeclaration> {
        let namespace_token = self.bump();
        let name = self.qualified_name_raw()?;
        let body = if self.at(";") {
            let semicolon = self.bump();
            let usings = self.parse_usings()?;
            let mut members = Vec::new();
            while !self.at_eof() {
                members.push(self.parse_member()?);
            }
            NamespaceBody::FileScoped {
                semicolon,
                usings,
                members,
            }
        } else {
            let open = self.expect("{")?;
            let usings = self.parse_usings()?;
            let mut members = Vec::new();
            while !self.at("}") {
                if self.at_eof() {
                    return Err(self.error("unterminated namespace body"));
                }
                members.push(self.parse_member()?);
            }
            let close = self.bump();
            NamespaceBody::Block {
                open,
                usings,
                members,
                close,
            }
        };
        Ok(NamespaceDeclaration {
            namespace_token,
            name,
            body,
        })
    }

    // ---- attributes and modifiers -----------------------------------------

    fn parse_attribute_lists(&mut self) -> Result<Vec<AttributeList>> {
        let mut lists = Vec::new();
        while self.at("[") {
            let open = self.bump();
            let mut attributes = Vec::new();
            loop {
                let name = self.qualified_name_raw()?;
                let arguments = if self.at("(") {
                    let args_open = self.bump();
                    let text = self.raw_until_close_paren()?;
                    let args_close = self.expect(")")?;
                    Some(AttributeArguments {
                        open: args_open,
                        text,
                        close: args_close,
                    })
                } else {
                    None
                };
                if self.at(",") {
                    let comma = self.bump();
                    attributes.push(AttributeItem {
                        name,
                        arguments,
                        comma: Some(comma),
                    });
                } else {
                    attributes.push(AttributeItem {
                        name,
                        arguments,
                        comma: None,
                    });
                    break;
                }
            }
            let close = self.expect("]")?;
            lists.push(AttributeList {
                open,
                attributes,
                close,
            });
        }
        Ok(lists)
    }

    fn parse_modifiers(&mut self) -> Vec<TokenNode> {
        let mut modifiers = Vec::new();
        while MODIFIERS.contains(&self.peek_text()) {
            modifiers.push(self.bump());
        }
        modifiers
    }

    // ---- type declarations ------------------------------------------------

    fn parse_type_declaration(
        &mut self,
        attribute_lists: Vec<AttributeList>,
        modifiers: Vec<TokenNode>,
    ) -> Result<TypeDeclaration> {
        let keyword = self.bump();
        let name = self.expect_identifier()?;
        let base_list = if self.at(":") {
            let colon = self.bump();
            let mut types = Vec::new();
            loop {
                let ty = self.require_type("base list")?;
                if self.at(",") {
                    let comma = self.bump();
                    types.push(BaseType {
                        ty,
                        comma: Some(comma),
                    });
                } else {
                    types.push(BaseType { ty, comma: None });
                    break;
                }
            }
            Some(BaseList { colon, types })
        } else {
            None
        };
        let open = self.expect("{")?;
        let mut members = Vec::new();
        while !self.at("}") {
            if self.at_eof() {
                return Err(self.error("unterminated type body"));
            }
            members.push(self.parse_type_member()?);
        }
        let close = self.bump();
        Ok(TypeDeclaration {
            attribute_lists,
            modifiers,
            keyword,
            name,
            base_list,
            open,
            members,
            close,
        })
    }

    fn parse_type_member(&mut self) -> Result<TypeMember> {
        let attribute_lists = self.parse_attribute_lists()?;
        let modifiers = self.parse_modifiers();

        if self.at("class") || self.at("interface") {
            let decl = self.parse_type_declaration(attribute_lists, modifiers)?;
            return Ok(TypeMember::Nested(Box::new(decl)));
        }

        let ty = self.require_type("member declaration")?;

        // Constructor: the scanned "type" was the member name.
        if self.at("(") {
            let name = TokenNode::new(ty.leading, ty.text);
            let open = self.bump();
            let parameters = self.parse_parameters()?;
            let close = self.expect(")")?;
            let body = self.parse_block()?;
            return Ok(TypeMember::Constructor(Box::new(ConstructorDeclaration {
                attribute_lists,
                modifiers,
                name,
                open,
                parameters,
                close,
                body,
            })));
        }

        let name = self.expect_identifier()?;

        if self.at("(") {
            let open = self.bump();
            let parameters = self.parse_parameters()?;
            let close = self.expect(")")?;
            let body = if self.at("{") {
                MethodBody::Block(self.parse_block()?)
            } else if self.at("=>") {
                let arrow = self.bump();
                let expression = self.parse_expression()?;
                let semicolon = self.expect(";")?;
                MethodBody::Expression {
                    arrow,
                    expression,
                    semicolon,
                }
            } else if self.at(";") {
                MethodBody::None {
                    semicolon: self.bump(),
                }
            } else {
                return Err(self.error("expected method body"));
            };
            return Ok(TypeMember::Method(Box::new(MethodDeclaration {
                attribute_lists,
                modifiers,
                return_type: ty,
                name,
                open,
                parameters,
                close,
                body,
            })));
        }

        if self.at("{") {
            let accessors = self.raw_balanced()?;
            let initializer = if self.at("=") {
                let equals = self.bump();
                let value = self.parse_expression()?;
                Some(Initializer { equals, value })
            } else {
                None
            };
            let semicolon = if self.at(";") { Some(self.bump()) } else { None };
            return Ok(TypeMember::Property(Box::new(PropertyDeclaration {
                attribute_lists,
                modifiers,
                ty,
                name,
                accessors,
                initializer,
                semicolon,
            })));
        }

        // Field: continue the declarator list from the parsed name.
        let mut declarators = Vec::new();
        let mut current_name = name;
        loop {
            let initializer = if self.at("=") {
                let equals = self.bump();
                let value = self.parse_expression()?;
                Some(Initializer { equals, value })
            } else {
                None
            };
            if self.at(",") {
                let comma = self.bump();
                declarators.push(VariableDeclarator {
                    name: current_name,
                    initializer,
                    comma: Some(comma),
                });
                current_name = self.expect_identifier()?;
            } else {
                declarators.push(VariableDeclarator {
                    name: current_name,
                    initializer,
                    comma: None,
                });
                break;
            }
        }
        let semicolon = self.expect(";")?;
        Ok(TypeMember::Field(Box::new(FieldDeclaration {
            attribute_lists,
            modifiers,
            declaration: VariableDeclaration { ty, declarators },
            semicolon,
        })))
    }

    fn parse_parameters(&mut self) -> Result<Vec<Parameter>> {
        let mut parameters = Vec::new();
        if self.at(")") {
            return Ok(parameters);
        }
        loop {
            let attribute_lists = self.parse_attribute_lists()?;
            let mut modifiers = Vec::new();
            while PARAMETER_MODIFIERS.contains(&self.peek_text()) {
                modifiers.push(self.bump());
            }
            let ty = self.require_type("parameter")?;
            let name = self.expect_identifier()?;
            let default = if self.at("=") {
                let equals = self.bump();
                let value = self.parse_expression()?;
                Some(Initializer { equals, value })
            } else {
                None
            };
            if self.at(",") {
                let comma = self.bump();
                parameters.push(Parameter {
                    attribute_lists,
                    modifiers,
                    ty,
                    name,
                    default,
                    comma: Some(comma),
                });
            } else {
                parameters.push(Parameter {
                    attribute_lists,
                    modifiers,
                    ty,
                    name,
                    default,
                    comma: None,
                });
                break;
            }
        }
        Ok(parameters)
    }

    // ---- statements -------------------------------------------------------

    fn parse_block(&mut self) -> Result<Block> {
        let open = self.expect("{")?;
        let mut statements = Vec::new();
        while !self.at("}") {
            if self.at_eof() {
                return Err(self.error("unterminated block"));
            }
            statements.push(self.parse_statement()?);
        }
        let close = self.bump();
        Ok(Block {
            open,
            statements,
            close,
        })
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek_text() {
            "{" => Ok(Statement::Block(self.parse_block()?)),
            "return" => {
                let return_token = self.bump();
                let expression = if self.at(";") {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                let semicolon = self.expect(";")?;
                Ok(Statement::Return(ReturnStatement {
                    return_token,
                    expression,
                    semicolon,
                }))
            }
            "throw" => {
                let throw_token = self.bump();
                let expression = if self.at(";") {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                let semicolon = self.expect(";")?;
                Ok(Statement::Throw(ThrowStatement {
                    throw_token,
                    expression,
                    semicolon,
                }))
            }
            "if" => {
                let if_token = self.bump();
                let open = self.expect("(")?;
                let condition = self.parse_expression()?;
                let close = self.expect(")")?;
                let then_branch = self.parse_statement()?;
                let else_clause = if self.at("else") {
                    let else_token = self.bump();
                    let body = self.parse_statement()?;
                    Some(ElseClause { else_token, body })
                } else {
                    None
                };
                Ok(Statement::If(Box::new(IfStatement {
                    if_token,
                    open,
                    condition,
                    close,
                    then_branch,
                    else_clause,
                })))
            }
            "while" => {
                let while_token = self.bump();
                let open = self.expect("(")?;
                let condition = self.parse_expression()?;
                let close = self.expect(")")?;
                let body = self.parse_statement()?;
                Ok(Statement::While(Box::new(WhileStatement {
                    while_token,
                    open,
                    condition,
                    close,
                    body,
                })))
            }
            "for" => self.parse_for(),
            "foreach" => self.parse_foreach(),
            _ => {
                if let Some(declaration) = self.try_parse_variable_declaration()? {
                    let semicolon = self.expect(";")?;
                    return Ok(Statement::LocalDeclaration(LocalDeclarationStatement {
                        declaration,
                        semicolon,
                    }));
                }
                let expression = self.parse_expression()?;
                let semicolon = self.expect(";")?;
                Ok(Statement::Expression(ExpressionStatement {
                    expression,
                    semicolon,
                }))
            }
        }
    }

    fn parse_for(&mut self) -> Result<Statement> {
        let for_token = self.bump();
        let open = self.expect("(")?;
        let initializer = if self.at(";") {
            None
        } else if let Some(declaration) = self.try_parse_variable_declaration()? {
            Some(ForInitializer::Declaration(declaration))
        } else {
            Some(ForInitializer::Expressions(
                self.parse_expression_list(";")?,
            ))
        };
        let first_semicolon = self.expect(";")?;
        let condition = if self.at(";") {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let second_semicolon = self.expect(";")?;
        let incrementors = if self.at(")") {
            Vec::new()
        } else {
            self.parse_expression_list(")")?
        };
        let close = self.expect(")")?;
        let body = self.parse_statement()?;
        Ok(Statement::For(Box::new(ForStatement {
            for_token,
            open,
            initializer,
            first_semicolon,
            condition,
            second_semicolon,
            incrementors,
            close,
            body,
        })))
    }

    fn parse_foreach(&mut self) -> Result<Statement> {
        let foreach_token = self.bump();
        let open = self.expect("(")?;
        let ty = self.require_type("foreach declaration")?;
        let identifier = self.expect_identifier()?;
        let in_token = self.expect("in")?;
        let expression = self.parse_expression()?;
        let close = self.expect(")")?;
        let body = self.parse_statement()?;
        Ok(Statement::ForEach(Box::new(ForEachStatement {
            foreach_token,
            open,
            ty,
            identifier,
            in_token,
            expression,
            close,
            body,
        })))
    }

    fn parse_expression_list(&mut self, terminator: &str) -> Result<Vec<SeparatedExpression>> {
        let mut list = Vec::new();
        loop {
            let expression = self.parse_expression()?;
            if self.at(",") {
                let comma = self.bump();
                list.push(SeparatedExpression {
                    expression,
                    comma: Some(comma),
                });
            } else {
                list.push(SeparatedExpression {
                    expression,
                    comma: None,
                });
                break;
            }
        }
        if !self.at(terminator) {
            return Err(self.error(format!("expected '{terminator}'")));
        }
        Ok(list)
    }

    fn try_parse_variable_declaration(&mut self) -> Result<Option<VariableDeclaration>> {
        let mark = self.pos;
        let Some((leading, text)) = self.scan_type() else {
            return Ok(None);
        };
        let name_ok = self.peek().is_identifier() && !is_non_type_keyword(self.peek_text());
        let follower = self.token_at(self.pos + 1);
        if !name_ok || !(follower.is("=") || follower.is(";") || follower.is(",")) {
            self.pos = mark;
            return Ok(None);
        }
        let ty = TypeName::new(leading, text);
        let declarators = self.parse_declarators()?;
        Ok(Some(VariableDeclaration { ty, declarators }))
    }

    fn parse_declarators(&mut self) -> Result<Vec<VariableDeclarator>> {
        let mut declarators = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let initializer = if self.at("=") {
                let equals = self.bump();
                let value = self.parse_expression()?;
                Some(Initializer { equals, value })
            } else {
                None
            };
            if self.at(",") {
                let comma = self.bump();
                declarators.push(VariableDeclarator {
                    name,
                    initializer,
                    comma: Some(comma),
                });
            } else {
                declarators.push(VariableDeclarator {
                    name,
                    initializer,
                    comma: None,
                });
                break;
            }
        }
        Ok(declarators)
    }

    // ---- expressions ------------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expression> {
        if let Some(lambda) = self.try_parse_lambda()? {
            return Ok(lambda);
        }
        let left = self.parse_conditional()?;
        if ASSIGNMENT_OPERATORS.contains(&self.peek_text()) {
            let operator = self.bump();
            let right = self.parse_expression()?;
            return Ok(Expression::Binary(Box::new(Binary {
                left,
                operator,
                right,
            })));
        }
        Ok(left)
    }

    fn try_parse_lambda(&mut self) -> Result<Option<Expression>> {
        if self.peek().is_identifier() && self.token_at(self.pos + 1).is("=>") {
            let parameters = self.bump();
            let arrow = self.bump();
            let body = self.parse_expression()?;
            return Ok(Some(Expression::Lambda(Box::new(Lambda {
                parameters,
                arrow,
                body,
            }))));
        }
        if self.at("(") {
            // `(a, b) =>` with plain identifier parameters only.
            let mut probe = self.pos + 1;
            while self.token_at(probe).is_identifier() || self.token_at(probe).is(",") {
                probe += 1;
            }
            if self.token_at(probe).is(")") && self.token_at(probe + 1).is("=>") {
                let open = self.bump();
                let mut text = open.text.clone();
                while self.pos <= probe {
                    let token = self.bump();
                    text.push_str(&token.leading);
                    text.push_str(&token.text);
                }
                let parameters = TokenNode::new(open.leading, text);
                let arrow = self.bump();
                let body = self.parse_expression()?;
                return Ok(Some(Expression::Lambda(Box::new(Lambda {
                    parameters,
                    arrow,
                    body,
                }))));
            }
        }
        Ok(None)
    }

    fn parse_conditional(&mut self) -> Result<Expression> {
        let condition = self.parse_coalesce()?;
        if self.at("?") {
            let question = self.bump();
            let when_true = self.parse_expression()?;
            let colon = self.expect(":")?;
            let when_false = self.parse_expression()?;
            return Ok(Expression::Conditional(Box::new(Conditional {
                condition,
                question,
                when_true,
                colon,
                when_false,
            })));
        }
        Ok(condition)
    }

    fn parse_coalesce(&mut self) -> Result<Expression> {
        let left = self.parse_binary(0)?;
        if self.at("??") {
            let operator = self.bump();
            let right = self.parse_coalesce()?;
            return Ok(Expression::Binary(Box::new(Binary {
                left,
                operator,
                right,
            })));
        }
        Ok(left)
    }

    fn parse_binary(&mut self, level: usize) -> Result<Expression> {
        const LEVELS: &[&[&str]] = &[
            &["||"],
            &["&&"],
            &["|"],
            &["^"],
            &["&"],
            &["==", "!="],
            &["<", ">", "<=", ">=", "is", "as"],
            &["<<"],
            &["+", "-"],
            &["*", "/", "%"],
        ];
        if level >= LEVELS.len() {
            return self.parse_unary();
        }
        let mut left = self.parse_binary(level + 1)?;
        while LEVELS[level].contains(&self.peek_text()) {
            let operator = self.bump();
            let right = self.parse_binary(level + 1)?;
            left = Expression::Binary(Box::new(Binary {
                left,
                operator,
                right,
            }));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        if ["!", "-", "+", "~", "++", "--", "await"].contains(&self.peek_text()) {
            let operator = self.bump();
            let operand = self.parse_unary()?;
            return Ok(Expression::PrefixUnary(Box::new(PrefixUnary {
                operator,
                operand,
            })));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expression> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.at(".") || self.at("?.") {
                let dot = self.bump();
                let name = self.expect_identifier()?;
                expr = Expression::Member(Box::new(MemberAccess {
                    target: expr,
                    dot,
                    name,
                }));
            } else if self.at("(") {
                let open = self.bump();
                let arguments = self.parse_arguments()?;
                let close = self.expect(")")?;
                expr = Expression::Invocation(Box::new(Invocation {
                    callee: expr,
                    open,
                    arguments,
                    close,
                }));
            } else if self.at("[") {
                let open = self.bump();
                let index = self.parse_expression()?;
                let close = self.expect("]")?;
                expr = Expression::ElementAccess(Box::new(ElementAccess {
                    target: expr,
                    open,
                    index,
                    close,
                }));
            } else if self.at("++") || self.at("--") {
                let operator = self.bump();
                expr = Expression::PostfixUnary(Box::new(PostfixUnary {
                    operand: expr,
                    operator,
                }));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_arguments(&mut self) -> Result<Vec<Argument>> {
        let mut arguments = Vec::new();
        if self.at(")") {
            return Ok(arguments);
        }
        loop {
            let value = self.parse_expression()?;
            if self.at(",") {
                let comma = self.bump();
                arguments.push(Argument {
                    value,
                    comma: Some(comma),
                });
            } else {
                arguments.push(Argument { value, comma: None });
                break;
            }
        }
        Ok(arguments)
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let token = self.peek();
        let literal_kind = match token.kind {
            TokenKind::IntLiteral => Some(LiteralKind::Int),
            TokenKind::RealLiteral => Some(LiteralKind::Real),
            TokenKind::StringLiteral => Some(LiteralKind::Str),
            TokenKind::CharLiteral => Some(LiteralKind::Char),
            TokenKind::Identifier => match token.text.as_str() {
                "true" | "false" => Some(LiteralKind::Bool),
                "null" => Some(LiteralKind::Null),
                _ => None,
            },
            _ => None,
        };
        if let Some(kind) = literal_kind {
            return Ok(Expression::Literal(Literal {
                kind,
                token: self.bump(),
            }));
        }
        if self.at("new") {
            return self.parse_object_creation();
        }
        if self.at("(") {
            let open = self.bump();
            let expression = self.parse_expression()?;
            let close = self.expect(")")?;
            return Ok(Expression::Parenthesized(Box::new(Parenthesized {
                open,
                expression,
                close,
            })));
        }
        if self.peek().is_identifier() && !is_non_type_keyword(self.peek_text()) {
            return Ok(Expression::Identifier(self.bump()));
        }
        if self.at("this") || self.at("base") {
            return Ok(Expression::Identifier(self.bump()));
        }
        Err(self.error(format!("expected expression, found '{}'", self.peek_text())))
    }

    fn parse_object_creation(&mut self) -> Result<Expression> {
        let new_token = self.bump();
        let ty = if self.at("(") || self.at("[") || self.at("{") {
            None
        } else {
            let (leading, text) = self
                .scan_type()
                .ok_or_else(|| self.error("expected type after 'new'"))?;
            Some(TypeName::new(leading, text))
        };
        let (open, arguments, close) = if self.at("(") {
            let open = self.bump();
            let arguments = self.parse_arguments()?;
            let close = self.expect(")")?;
            (Some(open), arguments, Some(close))
        } else {
            (None, Vec::new(), None)
        };
        let initializer = if self.at("{") || self.at("[") {
            let mut node = self.raw_balanced()?;
            while self.at("{") || self.at("[") {
                let next = self.raw_balanced()?;
                node.text.push_str(&next.leading);
                node.text.push_str(&next.text);
            }
            Some(node)
        } else {
            None
        };
        Ok(Expression::ObjectCreation(Box::new(ObjectCreation {
            new_token,
            ty,
            open,
            arguments,
            close,
            initializer,
        })))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cst::render;

    fn roundtrip(src: &str) {
        let unit = parse_unit(src).unwrap_or_else(|e| panic!("'{src}' failed to parse: {e}"));
        assert_eq!(render(&unit), src, "round-trip mismatch for: {src}");
    }

    #[test]
    fn empty_unit_roundtrips() {
        roundtrip("");
        roundtrip("\n\n// nothing here\n");
    }

    #[test]
    fn usings_and_namespace_roundtrip() {
        roundtrip("using System;\nusing Io = System.IO;\nnamespace App\n{\n}\n");
        roundtrip("using static System.Math;\n\nnamespace App.Web;\n");
    }

    #[test]
    fn class_with_members_roundtrips() {
        roundtrip(
            "namespace App\n{\n    public class Widget\n    {\n        private readonly int _count = 0;\n        public string Name { get; set; }\n\n        public Widget(int count)\n        {\n            _count = count;\n        }\n\n        public int Count()\n        {\n            return _count;\n        }\n    }\n}\n",
        );
    }

    #[test]
    fn statements_roundtrip() {
        roundtrip(
            "class C\n{\n    void M()\n    {\n        var x = 5;\n        int y = x + 2, z = 0;\n        for (var i = 0; i < y; i++)\n        {\n            z += i;\n        }\n        foreach (var item in this.Items)\n        {\n            Handle(item);\n        }\n        if (z > 3) { Reset(); } else { z--; }\n        while (z > 0) z--;\n    }\n}\n",
        );
    }

    #[test]
    fn expressions_roundtrip() {
        roundtrip(
            "class C\n{\n    object M(bool flag)\n    {\n        var a = flag ? \"yes\" : null;\n        var b = a ?? \"no\";\n        var c = new Widget(1) { Size = 2 };\n        var d = items.Where(i => i.Ok).ToList();\n        var e = table[0];\n        return (a, b, c, d, e) => 0;\n    }\n}\n",
        );
    }

    #[test]
    fn attributes_roundtrip() {
        roundtrip(
            "[Route(\"api/[controller]\")]\n[ApiController]\nclass WidgetController : ControllerBase\n{\n    [HttpGet(\"{id}\")]\n    public IActionResult Get(int id)\n    {\n        return Ok(id);\n    }\n}\n",
        );
    }

    #[test]
    fn expression_bodied_and_abstract_members_roundtrip() {
        roundtrip(
            "interface IRepo\n{\n    int Count();\n}\n\nclass Repo : IRepo\n{\n    public int Count() => 42;\n}\n",
        );
    }

    #[test]
    fn declaration_vs_expression_disambiguation() {
        let unit = parse_unit("class C { void M() { a < b; List<int> xs = F(); x = 1; } }")
            .expect("parse error");
        let Member::Type(decl) = &unit.members[0] else {
            panic!("expected type declaration");
        };
        let TypeMember::Method(method) = &decl.members[0] else {
            panic!("expected method");
        };
        let MethodBody::Block(block) = &method.body else {
            panic!("expected block body");
        };
        assert!(matches!(&block.statements[0], Statement::Expression(_)));
        assert!(matches!(
            &block.statements[1],
            Statement::LocalDeclaration(_)
        ));
        assert!(matches!(&block.statements[2], Statement::Expression(_)));
    }

    #[test]
    fn multi_variable_declaration_keeps_both_declarators() {
        let unit = parse_unit("class C { void M() { var x = 5, y = 6; } }").expect("parse error");
        let Member::Type(decl) = &unit.members[0] else {
            panic!("expected type declaration");
        };
        let TypeMember::Method(method) = &decl.members[0] else {
            panic!("expected method");
        };
        let MethodBody::Block(block) = &method.body else {
            panic!("expected block body");
        };
        let Statement::LocalDeclaration(local) = &block.statements[0] else {
            panic!("expected declaration");
        };
        assert_eq!(local.declaration.declarators.len(), 2);
        assert!(local.declaration.single_declarator().is_none());
    }

    #[test]
    fn nested_generics_parse_as_one_type() {
        let unit =
            parse_unit("class C { void M() { Dictionary<string, List<int>> map = F(); } }")
                .expect("parse error");
        let Member::Type(decl) = &unit.members[0] else {
            panic!("expected type declaration");
        };
        let TypeMember::Method(method) = &decl.members[0] else {
            panic!("expected method");
        };
        let MethodBody::Block(block) = &method.body else {
            panic!("expected block body");
        };
        let Statement::LocalDeclaration(local) = &block.statements[0] else {
            panic!("expected declaration");
        };
        assert_eq!(
            local.declaration.ty.canonical_text(),
            "Dictionary<string,List<int>>"
        );
    }

    #[test]
    fn parse_error_reports_location() {
        let err = parse_unit("class C {\n    void M( {\n}\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("expected"));
    }

    #[test]
    fn file_scoped_namespace_collects_members() {
        let unit = parse_unit("namespace App;\n\nclass A { }\nclass B { }\n").expect("parse error");
        assert_eq!(unit.members.len(), 1);
        let Member::Namespace(ns) = &unit.members[0] else {
            panic!("expected namespace");
        };
        let NamespaceBody::FileScoped { members, .. } = &ns.body else {
            panic!("expected file-scoped namespace");
        };
        assert_eq!(members.len(), 2);
    }
}
