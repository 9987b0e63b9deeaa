//! Type-substitution pass: rewrite `var` declarations to explicit types.
//!
//! Three declaration sites are handled, each with its own display-name and
//! type-comparison policy:
//!
//! - simple local declarations substitute the resolver's *minimal* display
//!   name, comparing the declared symbol's type against the initializer's
//!   direct type with a converted-type fallback;
//! - `for` initializers substitute the *fully-qualified* display name and
//!   compare against the initializer's direct type only — no converted
//!   fallback;
//! - `foreach` loops over a member access substitute the element type's
//!   *simple* name, taken from the member type's first generic argument.
//!
//! A declaration with more than one declarator is never substituted, and
//! each declaration is substituted at most once. Non-member-access
//! `foreach` sources are left untouched.

use sharpen_core::rewrite::{Rewrite, RewritePass};

use crate::cst::{
    CompilationUnit, Expression, ForEachStatement, ForInitializer, ForStatement,
    LocalDeclarationStatement, Member, MethodBody, NamespaceBody, NamespaceDeclaration, Statement,
    TypeDeclaration, TypeMember, VariableDeclaration,
};
use crate::semantic::{qualify, LocalScope, SemanticModel, UnitContext};

use super::child_namespace;

/// Rewrites inferred-type declarations into explicit types.
pub struct ExplicitTypePass<'m> {
    model: &'m SemanticModel,
}

impl<'m> ExplicitTypePass<'m> {
    pub fn new(model: &'m SemanticModel) -> Self {
        Self { model }
    }
}

impl RewritePass<CompilationUnit> for ExplicitTypePass<'_> {
    fn name(&self) -> &'static str {
        "explicit-types"
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

impl ExplicitTypePass<'_> {
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
        let class = qualify(namespace, &decl.name.text);
        decl.members = decl
            .members
            .into_iter()
            .map(|member| match member {
                TypeMember::Method(method) => {
                    let mut method = *method;
                    method.body = match method.body {
                        MethodBody::Block(block) => {
                            let mut scope =
                                LocalScope::new(self.model, ctx, namespace, Some(class.clone()));
                            for parameter in &method.parameters {
                                let ty = self.model.resolve_type_text(
                                    &parameter.ty.canonical_text(),
                                    ctx,
                                    namespace,
                                );
                                scope.declare(&parameter.name.text, ty);
                            }
                            let rewritten = self.rewrite_statement(
                                Statement::Block(block),
                                &mut scope,
                                changed,
                            );
                            let Statement::Block(block) = rewritten else {
                                unreachable!("block statements rewrite to blocks");
                            };
                            MethodBody::Block(block)
                        }
                        other => other,
                    };
                    TypeMember::Method(Box::new(method))
                }
                TypeMember::Constructor(ctor) => {
                    let mut ctor = *ctor;
                    let mut scope =
                        LocalScope::new(self.model, ctx, namespace, Some(class.clone()));
                    for parameter in &ctor.parameters {
                        let ty = self.model.resolve_type_text(
                            &parameter.ty.canonical_text(),
                            ctx,
                            namespace,
                        );
                        scope.declare(&parameter.name.text, ty);
                    }
                    let rewritten =
                        self.rewrite_statement(Statement::Block(ctor.body), &mut scope, changed);
                    let Statement::Block(block) = rewritten else {
                        unreachable!("block statements rewrite to blocks");
                    };
                    ctor.body = block;
                    TypeMember::Constructor(Box::new(ctor))
                }
                TypeMember::Nested(nested) => TypeMember::Nested(Box::new(self.rewrite_type(
                    *nested, ctx, namespace, changed,
                ))),
                other => other,
            })
            .collect();
        decl
    }

    fn rewrite_statement(
        &self,
        statement: Statement,
        scope: &mut LocalScope<'_>,
        changed: &mut bool,
    ) -> Statement {
        match statement {
            Statement::LocalDeclaration(local) => {
                Statement::LocalDeclaration(self.rewrite_local(local, scope, changed))
            }
            Statement::Block(mut block) => {
                scope.push();
                block.statements = block
                    .statements
                    .into_iter()
                    .map(|s| self.rewrite_statement(s, scope, changed))
                    .collect();
                scope.pop();
                Statement::Block(block)
            }
            Statement::If(mut ifs) => {
                ifs.then_branch = self.rewrite_statement(ifs.then_branch, scope, changed);
                ifs.else_clause = ifs.else_clause.map(|mut clause| {
                    clause.body = self.rewrite_statement(clause.body, scope, changed);
                    clause
                });
                Statement::If(ifs)
            }
            Statement::While(mut w) => {
                w.body = self.rewrite_statement(w.body, scope, changed);
                Statement::While(w)
            }
            Statement::For(f) => Statement::For(Box::new(self.rewrite_for(*f, scope, changed))),
            Statement::ForEach(fe) => {
                Statement::ForEach(Box::new(self.rewrite_foreach(*fe, scope, changed)))
            }
            other @ (Statement::Expression(_) | Statement::Return(_) | Statement::Throw(_)) => {
                other
            }
        }
    }

    /// Simple local declaration: minimal display name, converted-type
    /// fallback on the initializer side.
    fn rewrite_local(
        &self,
        local: LocalDeclarationStatement,
        scope: &mut LocalScope<'_>,
        changed: &mut bool,
    ) -> LocalDeclarationStatement {
        let LocalDeclarationStatement {
            declaration,
            semicolon,
        } = local;
        let declaration = self.substitute_declaration(declaration, scope, changed, false);
        LocalDeclarationStatement {
            declaration,
            semicolon,
        }
    }

    /// Shared substitution for local declarations and `for` initializers.
    /// `direct_only` selects the `for` policy: no converted-type fallback
    /// and a fully-qualified replacement.
    fn substitute_declaration(
        &self,
        declaration: VariableDeclaration,
        scope: &mut LocalScope<'_>,
        changed: &mut bool,
        direct_only: bool,
    ) -> VariableDeclaration {
        if declaration.declarators.len() != 1 {
            self.declare_explicit(&declaration, scope);
            return declaration;
        }
        let declarator = &declaration.declarators[0];
        let Some(initializer) = &declarator.initializer else {
            self.declare_explicit(&declaration, scope);
            return declaration;
        };
        if !declaration.ty.is_var() {
            self.declare_explicit(&declaration, scope);
            return declaration;
        }

        let symbol_ty = self
            .model
            .converted_type_of_expression(&initializer.value, scope);
        let expr_ty = if direct_only {
            self.model.type_of_expression(&initializer.value, scope)
        } else {
            self.model
                .type_of_expression(&initializer.value, scope)
                .or_else(|| {
                    self.model
                        .converted_type_of_expression(&initializer.value, scope)
                })
        };
        match (symbol_ty, expr_ty) {
            (Some(symbol), Some(expr)) if symbol == expr => {
                let text = if direct_only {
                    symbol.display_full()
                } else {
                    symbol.display_minimal(scope.ctx, &scope.namespace)
                };
                let name = declarator.name.text.clone();
                scope.declare(&name, symbol);
                *changed = true;
                VariableDeclaration {
                    ty: declaration.ty.with_text(text),
                    declarators: declaration.declarators,
                }
            }
            _ => declaration,
        }
    }

    /// Record the declared type of an explicitly typed declaration so later
    /// member accesses through the variable resolve.
    fn declare_explicit(&self, declaration: &VariableDeclaration, scope: &mut LocalScope<'_>) {
        if declaration.ty.is_var() {
            return;
        }
        let ty =
            self.model
                .resolve_type_text(&declaration.ty.canonical_text(), scope.ctx, &scope.namespace);
        for declarator in &declaration.declarators {
            scope.declare(&declarator.name.text, ty.clone());
        }
    }

    /// `for` initializer: fully-qualified display name, direct-type
    /// comparison only. The asymmetry against simple locals is a kept
    /// policy, not an accident; see DESIGN.md.
    fn rewrite_for(
        &self,
        f: ForStatement,
        scope: &mut LocalScope<'_>,
        changed: &mut bool,
    ) -> ForStatement {
        let ForStatement {
            for_token,
            open,
            initializer,
            first_semicolon,
            condition,
            second_semicolon,
            incrementors,
            close,
            body,
        } = f;
        scope.push();
        let initializer = initializer.map(|init| match init {
            ForInitializer::Declaration(declaration) => ForInitializer::Declaration(
                self.substitute_declaration(declaration, scope, changed, true),
            ),
            expressions @ ForInitializer::Expressions(_) => expressions,
        });
        let body = self.rewrite_statement(body, scope, changed);
        scope.pop();
        ForStatement {
            for_token,
            open,
            initializer,
            first_semicolon,
            condition,
            second_semicolon,
            incrementors,
            close,
            body,
        }
    }

    /// `foreach` over a member access: the loop variable takes the simple
    /// name of the member type's first generic argument. Other iteration
    /// sources are a known limitation and stay untouched.
    fn rewrite_foreach(
        &self,
        fe: ForEachStatement,
        scope: &mut LocalScope<'_>,
        changed: &mut bool,
    ) -> ForEachStatement {
        let ForEachStatement {
            foreach_token,
            open,
            mut ty,
            identifier,
            in_token,
            expression,
            close,
            body,
        } = fe;

        scope.push();
        let mut element = None;
        if ty.is_var() {
            if let Expression::Member(member) = &expression {
                element = self
                    .model
                    .member_access_type(member, scope)
                    .and_then(|member_ty| member_ty.args.first().cloned());
            }
        }
        match &element {
            Some(element_ty) => {
                ty = ty.with_text(element_ty.display_simple());
                scope.declare(&identifier.text, element_ty.clone());
                *changed = true;
            }
            None if !ty.is_var() => {
                let declared =
                    self.model
                        .resolve_type_text(&ty.canonical_text(), scope.ctx, &scope.namespace);
                scope.declare(&identifier.text, declared);
            }
            None => {}
        }
        let body = self.rewrite_statement(body, scope, changed);
        scope.pop();

        ForEachStatement {
            foreach_token,
            open,
            ty,
            identifier,
            in_token,
            expression,
            close,
            body,
        }
    }
}
