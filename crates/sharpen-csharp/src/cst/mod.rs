//! Concrete syntax tree for the supported C# fragment.
//!
//! Nodes are owned plain data; rebuilding a spine shares the untouched
//! substructure by move. Rendering through [`Codegen`] is exact, so a tree
//! with no applicable transformation round-trips byte-for-byte.

mod expression;
mod member;
mod statement;
mod traits;

pub use expression::{
    Argument, Binary, Conditional, ElementAccess, Expression, Invocation, Lambda, Literal,
    LiteralKind, MemberAccess, ObjectCreation, Parenthesized, PostfixUnary, PrefixUnary, TypeName,
};
pub use member::{
    AttributeArguments, AttributeItem, AttributeList, BaseList, BaseType, CompilationUnit,
    ConstructorDeclaration, FieldDeclaration, Member, MethodBody, MethodDeclaration,
    NamespaceBody, NamespaceDeclaration, Parameter, PropertyDeclaration, TypeDeclaration,
    TypeMember, UsingAlias, UsingDirective,
};
pub use statement::{
    Block, ElseClause, ExpressionStatement, ForEachStatement, ForInitializer, ForStatement,
    IfStatement, Initializer, LocalDeclarationStatement, ReturnStatement, SeparatedExpression,
    Statement, ThrowStatement, VariableDeclaration, VariableDeclarator, WhileStatement,
};
pub use traits::{render, Codegen, CodegenState, TokenNode};
