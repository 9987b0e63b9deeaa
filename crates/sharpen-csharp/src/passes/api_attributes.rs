//! Attribute-synthesis pass: baseline controller attributes plus
//! per-method `ProducesResponseType` attributes inferred from the shapes
//! of return statements.
//!
//! Result kinds are collected into an accumulator passed explicitly down
//! the return-statement walk and drained at the method, deduplicated by
//! registry identity. Three return shapes contribute: object creation
//! (the constructed type's textual name), conditionals (both branches
//! classified independently), and invocation of a bare identifier
//! (`Ok(x)` becomes `Ok` + `Object` + `Result`).

use sharpen_core::rewrite::{Rewrite, RewritePass};

use crate::catalog::{
    self, ResultKind, API_CONTROLLER_ATTRIBUTE, AUTHORIZE_ATTRIBUTE, DEFAULT_ROUTE_TEMPLATE,
    PRODUCES_RESPONSE_TYPE_ATTRIBUTE, ROUTE_ATTRIBUTE,
};
use crate::cst::{
    AttributeList, Block, CompilationUnit, Expression, Member, MethodBody, MethodDeclaration,
    NamespaceBody, NamespaceDeclaration, Statement, TokenNode, TypeDeclaration, TypeMember,
};
use crate::semantic::{SemanticModel, UnitContext};

use super::child_namespace;

/// Adds controller annotations inferred from class bases and return
/// statements.
pub struct ApiAttributePass<'m> {
    model: &'m SemanticModel,
}

impl<'m> ApiAttributePass<'m> {
    pub fn new(model: &'m SemanticModel) -> Self {
        Self { model }
    }
}

impl RewritePass<CompilationUnit> for ApiAttributePass<'_> {
    fn name(&self) -> &'static str {
        "api-attributes"
    }

    fn run(&mut self, unit: CompilationUnit) -> Rewrite<CompilationUnit> {
        let ctx = UnitContext::of(&unit);
        let mut changed = false;
        let CompilationUnit {
            usings,
            members,
            eof,
        } = unit;
        let members = members
            .into_iter()
            .map(|member| self.rewrite_member(member, &ctx, "", &mut changed))
            .collect();
        Rewrite::flagged(
            CompilationUnit {
                usings,
                members,
                eof,
            },
            changed,
        )
    }
}

impl ApiAttributePass<'_> {
    fn rewrite_member(
        &self,
        member: Member,
        ctx: &UnitContext,
        namespace: &str,
        changed: &mut bool,
    ) -> Member {
        match member {
            Member::Namespace(ns) => {
                let nested = child_namespace(namespace, &ns);
                let NamespaceDeclaration {
                    namespace_token,
                    name,
                    body,
                } = *ns;
                let body = match body {
                    NamespaceBody::Block {
                        open,
                        usings,
                        members,
                        close,
                    } => NamespaceBody::Block {
                        open,
                        usings,
                        members: members
                            .into_iter()
                            .map(|m| self.rewrite_member(m, ctx, &nested, changed))
                            .collect(),
                        close,
                    },
                    NamespaceBody::FileScoped {
                        semicolon,
                        usings,
                        members,
                    } => NamespaceBody::FileScoped {
                        semicolon,
                        usings,
                        members: members
                            .into_iter()
                            .map(|m| self.rewrite_member(m, ctx, &nested, changed))
                            .collect(),
                    },
                };
                Member::Namespace(Box::new(NamespaceDeclaration {
                    namespace_token,
                    name,
                    body,
                }))
            }
            Member::Type(decl) => {
                Member::Type(Box::new(self.rewrite_type(*decl, ctx, namespace, changed)))
            }
        }
    }

    fn rewrite_type(
        &self,
        mut decl: TypeDeclaration,
        ctx: &UnitContext,
        namespace: &str,
        changed: &mut bool,
    ) -> TypeDeclaration {
        let is_controller = decl.is_class()
            && decl.base_list.as_ref().is_some_and(|base_list| {
                base_list
                    .types
                    .iter()
                    .any(|base| self.model.is_controller_base(&base.ty, ctx, namespace))
            });

        if is_controller {
            self.append_baseline_attributes(&mut decl, changed);
        }

        decl.members = decl
            .members
            .into_iter()
            .map(|member| match member {
                TypeMember::Method(method) => {
                    TypeMember::Method(Box::new(self.rewrite_method(*method, changed)))
                }
                TypeMember::Nested(nested) => TypeMember::Nested(Box::new(self.rewrite_type(
                    *nested, ctx, namespace, changed,
                ))),
                other => other,
            })
            .collect();
        decl
    }

    /// Append the baseline attributes a controller carries: authorization,
    /// the api-controller marker, and the default route template. The set
    /// is computed against the attribute lists as they were before any of
    /// it is appended.
    fn append_baseline_attributes(&self, decl: &mut TypeDeclaration, changed: &mut bool) {
        let baseline = [
            (AUTHORIZE_ATTRIBUTE, None),
            (API_CONTROLLER_ATTRIBUTE, None),
            (ROUTE_ATTRIBUTE, Some(DEFAULT_ROUTE_TEMPLATE)),
        ];
        let existing: Vec<String> = decl
            .attribute_lists
            .iter()
            .map(AttributeList::render_trimmed)
            .collect();
        for (marker, arguments) in baseline {
            let candidate = catalog::build_attribute_list(marker, arguments);
            let rendered = candidate.render_trimmed();
            // NOTE: the presence test passes only when *every* existing
            // list renders identically to the candidate (vacuously true on
            // an unannotated class). A class annotated with just one of the
            // baseline attributes therefore gains a duplicate of it and not
            // the missing ones. Kept as-is; see DESIGN.md.
            if existing.iter().all(|text| *text == rendered) {
                append_attribute(
                    &mut decl.attribute_lists,
                    AttributeFollower {
                        modifiers: &mut decl.modifiers,
                        fallback: &mut decl.keyword.leading,
                    },
                    candidate,
                );
                *changed = true;
            }
        }
    }

    fn rewrite_method(&self, mut method: MethodDeclaration, changed: &mut bool) -> MethodDeclaration {
        let mut kinds: Vec<&'static ResultKind> = Vec::new();
        if let MethodBody::Block(block) = &method.body {
            collect_block(block, &mut kinds);
        }
        for kind in kinds {
            let arguments = kind.produces_arguments();
            let candidate =
                catalog::build_attribute_list(PRODUCES_RESPONSE_TYPE_ATTRIBUTE, Some(&arguments));
            let rendered = candidate.render_trimmed();
            if method
                .attribute_lists
                .iter()
                .all(|list| list.render_trimmed() != rendered)
            {
                append_attribute(
                    &mut method.attribute_lists,
                    AttributeFollower {
                        modifiers: &mut method.modifiers,
                        fallback: &mut method.return_type.leading,
                    },
                    candidate,
                );
                *changed = true;
            }
        }
        method
    }
}

// ============================================================================
// Attribute appending
// ============================================================================

/// The declaration tokens that follow the attribute lists, used to steal
/// and restore leading trivia when the first list is inserted: the first
/// modifier when one exists, otherwise the declaration's next token (the
/// `class` keyword or the method return type).
struct AttributeFollower<'a> {
    modifiers: &'a mut Vec<TokenNode>,
    fallback: &'a mut String,
}

impl AttributeFollower<'_> {
    fn leading_mut(&mut self) -> &mut String {
        match self.modifiers.first_mut() {
            Some(modifier) => &mut modifier.leading,
            None => self.fallback,
        }
    }
}

fn line_indentation(leading: &str) -> &str {
    match leading.rfind('\n') {
        Some(idx) => &leading[idx + 1..],
        None => leading,
    }
}

/// Append an attribute list after any existing ones, preserving the
/// declaration's indentation. The first appended list takes over the
/// declaration's original leading trivia; the declaration continues on the
/// next line at the same indentation.
fn append_attribute(
    lists: &mut Vec<AttributeList>,
    mut follower: AttributeFollower<'_>,
    mut attr: AttributeList,
) {
    let indent = match lists.first() {
        Some(first) => first.open.indentation().to_string(),
        None => line_indentation(follower.leading_mut()).to_string(),
    };
    if lists.is_empty() {
        let leading = follower.leading_mut();
        attr.open.leading = std::mem::take(leading);
        *leading = format!("\n{indent}");
    } else {
        attr.open.leading = format!("\n{indent}");
    }
    lists.push(attr);
}

// ============================================================================
// Return classification
// ============================================================================

fn collect_block(block: &Block, kinds: &mut Vec<&'static ResultKind>) {
    for statement in &block.statements {
        collect_statement(statement, kinds);
    }
}

fn collect_statement(statement: &Statement, kinds: &mut Vec<&'static ResultKind>) {
    match statement {
        Statement::Return(ret) => {
            if let Some(expression) = &ret.expression {
                classify_result_expression(expression, kinds);
            }
        }
        Statement::Block(block) => collect_block(block, kinds),
        Statement::If(ifs) => {
            collect_statement(&ifs.then_branch, kinds);
            if let Some(clause) = &ifs.else_clause {
                collect_statement(&clause.body, kinds);
            }
        }
        Statement::While(w) => collect_statement(&w.body, kinds),
        Statement::For(f) => collect_statement(&f.body, kinds),
        Statement::ForEach(fe) => collect_statement(&fe.body, kinds),
        Statement::LocalDeclaration(_) | Statement::Expression(_) | Statement::Throw(_) => {}
    }
}

/// Classify a return expression into zero or more result kinds.
fn classify_result_expression(expression: &Expression, kinds: &mut Vec<&'static ResultKind>) {
    match expression {
        Expression::ObjectCreation(creation) => {
            if let Some(ty) = &creation.ty {
                push_kind(kinds, catalog::resolve_result_kind(&ty.canonical_text()));
            }
        }
        Expression::Conditional(conditional) => {
            classify_result_expression(&conditional.when_true, kinds);
            classify_result_expression(&conditional.when_false, kinds);
        }
        Expression::Invocation(invocation) => {
            if let Some(callee) = invocation.bare_callee() {
                let suffix = if invocation.arguments.is_empty() {
                    ""
                } else {
                    "Object"
                };
                let name = format!("{}{}Result", callee.text, suffix);
                push_kind(kinds, catalog::resolve_result_kind(name.trim()));
            }
        }
        _ => {}
    }
}

/// Deduplicate by registry identity, not by name.
fn push_kind(kinds: &mut Vec<&'static ResultKind>, kind: Option<&'static ResultKind>) {
    if let Some(kind) = kind {
        if !kinds.iter().any(|known| std::ptr::eq(*known, kind)) {
            kinds.push(kind);
        }
    }
}
