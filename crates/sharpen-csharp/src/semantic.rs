//! Semantic model for the supported C# fragment.
//!
//! The model is built once across all parsed units before any rewriting
//! starts. It records every declared class with its namespace, base types,
//! and member types, carries a well-known type table for the BCL and
//! ASP.NET Core namespaces the rewriter cares about, and answers the
//! questions the passes ask: the type of an expression (direct and
//! converted), the resolved type behind a member access, and minimal or
//! fully-qualified display names relative to a unit's using directives.

use std::collections::HashMap;

use tracing::debug;

use crate::catalog;
use crate::cst::{
    CompilationUnit, Expression, LiteralKind, Member, MemberAccess, NamespaceBody,
    TypeDeclaration, TypeMember, TypeName, UsingDirective,
};

/// Fully-qualified name of the controller base marker.
pub const CONTROLLER_BASE: &str = "Microsoft.AspNetCore.Mvc.ControllerBase";

// ============================================================================
// Type references
// ============================================================================

/// A resolved (or structurally parsed) type: namespace, simple name, and
/// generic arguments. Array ranks and nullable suffixes stay part of the
/// simple name; the rewriter never needs to see through them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub namespace: String,
    pub name: String,
    pub args: Vec<TypeRef>,
}

impl TypeRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// A type with no namespace binding.
    pub fn unbound(name: impl Into<String>) -> Self {
        Self::new("", name)
    }

    pub fn with_args(mut self, args: Vec<TypeRef>) -> Self {
        self.args = args;
        self
    }

    /// Namespace-qualified name without generic arguments, the key used
    /// for class lookup.
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// The C# keyword for special types (`System.Int32` is written `int`).
    pub fn keyword(&self) -> Option<&'static str> {
        if self.namespace != "System" || !self.args.is_empty() {
            return None;
        }
        KEYWORD_TYPES
            .iter()
            .find(|(_, name)| *name == self.name)
            .map(|(kw, _)| *kw)
    }

    fn render(&self, base: String, args: Vec<String>) -> String {
        if args.is_empty() {
            base
        } else {
            format!("{}<{}>", base, args.join(", "))
        }
    }

    /// Shortest spelling that is valid given the unit's usings and the
    /// enclosing namespace: a keyword for special types, the simple name
    /// when the namespace is in scope, the qualified name otherwise.
    pub fn display_minimal(&self, ctx: &UnitContext, namespace: &str) -> String {
        if let Some(kw) = self.keyword() {
            return kw.to_string();
        }
        let in_scope = self.namespace.is_empty()
            || self.namespace == namespace
            || ctx.usings.iter().any(|u| u == &self.namespace);
        let base = if in_scope {
            self.name.clone()
        } else {
            self.full_name()
        };
        let args = self
            .args
            .iter()
            .map(|a| a.display_minimal(ctx, namespace))
            .collect();
        self.render(base, args)
    }

    /// Namespace-qualified spelling; special types keep their keyword so
    /// the substituted source stays compilable.
    pub fn display_full(&self) -> String {
        if let Some(kw) = self.keyword() {
            return kw.to_string();
        }
        let args = self.args.iter().map(|a| a.display_full()).collect();
        self.render(self.full_name(), args)
    }

    /// Simple-name spelling, used for `foreach` element substitution.
    pub fn display_simple(&self) -> String {
        if let Some(kw) = self.keyword() {
            return kw.to_string();
        }
        let args = self.args.iter().map(|a| a.display_simple()).collect();
        self.render(self.name.clone(), args)
    }
}

// ============================================================================
// Well-known types
// ============================================================================

const KEYWORD_TYPES: &[(&str, &str)] = &[
    ("bool", "Boolean"),
    ("byte", "Byte"),
    ("char", "Char"),
    ("decimal", "Decimal"),
    ("double", "Double"),
    ("float", "Single"),
    ("int", "Int32"),
    ("long", "Int64"),
    ("object", "Object"),
    ("sbyte", "SByte"),
    ("short", "Int16"),
    ("string", "String"),
    ("uint", "UInt32"),
    ("ulong", "UInt64"),
    ("ushort", "UInt16"),
    ("void", "Void"),
];

const SYSTEM_TYPES: &[&str] = &[
    "ArgumentException", "ArgumentNullException", "DateTime", "Exception", "Guid",
    "InvalidOperationException", "Uri",
];

const COLLECTION_TYPES: &[&str] = &[
    "Dictionary", "HashSet", "ICollection", "IDictionary", "IEnumerable", "IList",
    "IReadOnlyCollection", "IReadOnlyList", "List", "Queue", "Stack",
];

const TASK_TYPES: &[&str] = &["Task", "ValueTask"];

const MVC_TYPES: &[&str] = &[
    "ActionResult", "ApiControllerAttribute", "ContentResult", "Controller", "ControllerBase",
    "FromBodyAttribute", "FromQueryAttribute", "FromRouteAttribute", "HttpDeleteAttribute",
    "HttpGetAttribute", "HttpPostAttribute", "HttpPutAttribute", "IActionResult", "JsonResult",
    "ObjectResult", "ProducesResponseTypeAttribute", "RouteAttribute", "StatusCodeResult",
];

const AUTHORIZATION_TYPES: &[&str] = &["AllowAnonymousAttribute", "AuthorizeAttribute"];

/// Namespace of a well-known simple name, if any. Action-result kinds come
/// from the catalog so the two stay in step.
fn well_known_namespace(name: &str) -> Option<&'static str> {
    if KEYWORD_TYPES.iter().any(|(_, n)| *n == name) || SYSTEM_TYPES.contains(&name) {
        return Some("System");
    }
    if COLLECTION_TYPES.contains(&name) {
        return Some("System.Collections.Generic");
    }
    if TASK_TYPES.contains(&name) {
        return Some("System.Threading.Tasks");
    }
    if MVC_TYPES.contains(&name) || catalog::resolve_result_kind(name).is_some() {
        return Some("Microsoft.AspNetCore.Mvc");
    }
    if AUTHORIZATION_TYPES.contains(&name) {
        return Some("Microsoft.AspNetCore.Authorization");
    }
    None
}

fn keyword_to_ref(keyword: &str) -> Option<TypeRef> {
    KEYWORD_TYPES
        .iter()
        .find(|(kw, _)| *kw == keyword)
        .map(|(_, name)| TypeRef::new("System", *name))
}

// ============================================================================
// Unit context
// ============================================================================

/// The using directives and aliases in scope for one unit.
#[derive(Debug, Clone, Default)]
pub struct UnitContext {
    pub usings: Vec<String>,
    pub aliases: HashMap<String, String>,
}

impl UnitContext {
    /// Collect every using directive in the unit, including those nested
    /// inside namespace bodies.
    pub fn of(unit: &CompilationUnit) -> Self {
        let mut ctx = Self::default();
        ctx.add_usings(&unit.usings);
        for member in &unit.members {
            ctx.add_member(member);
        }
        ctx
    }

    fn add_usings(&mut self, usings: &[UsingDirective]) {
        for using in usings {
            match &using.alias {
                Some(alias) => {
                    self.aliases.insert(alias.name.text.clone(), using.path());
                }
                None => self.usings.push(using.path()),
            }
        }
    }

    fn add_member(&mut self, member: &Member) {
        if let Member::Namespace(ns) = member {
            let (usings, members) = match &ns.body {
                NamespaceBody::Block {
                    usings, members, ..
                } => (usings, members),
                NamespaceBody::FileScoped {
                    usings, members, ..
                } => (usings, members),
            };
            self.add_usings(usings);
            for nested in members {
                self.add_member(nested);
            }
        }
    }
}

// ============================================================================
// Class catalog
// ============================================================================

/// One declared class or interface.
#[derive(Debug, Clone, Default)]
pub struct ClassInfo {
    pub namespace: String,
    pub name: String,
    /// Resolved full names of base-list entries.
    pub bases: Vec<String>,
    /// Field and property types by member name.
    pub members: HashMap<String, TypeRef>,
    /// Method return types by method name.
    pub methods: HashMap<String, TypeRef>,
}

/// Read-only semantic facts for a set of parsed units.
#[derive(Debug, Default)]
pub struct SemanticModel {
    classes: HashMap<String, ClassInfo>,
}

impl SemanticModel {
    /// Build the model from every unit in the compilation, in input order.
    pub fn build(units: &[CompilationUnit]) -> Self {
        // Pass 1: register declared type names so member resolution can
        // bind user types regardless of declaration order.
        let mut model = Self::default();
        let mut found: Vec<(UnitContext, String, &TypeDeclaration)> = Vec::new();
        for unit in units {
            let ctx = UnitContext::of(unit);
            for (ns, decl) in collect_type_declarations(unit) {
                model.classes.insert(
                    qualify(&ns, &decl.name.text),
                    ClassInfo {
                        namespace: ns.clone(),
                        name: decl.name.text.clone(),
                        ..ClassInfo::default()
                    },
                );
                found.push((ctx.clone(), ns, decl));
            }
        }

        // Pass 2: resolve base lists and member types against the full
        // class catalog, then fold the resolved entries back in.
        let mut resolved = Vec::with_capacity(found.len());
        for (ctx, ns, decl) in &found {
            let mut info = model.classes[&qualify(ns, &decl.name.text)].clone();
            if let Some(base_list) = &decl.base_list {
                for base in &base_list.types {
                    let base_ty = model.resolve_type_text(&base.ty.canonical_text(), ctx, ns);
                    info.bases.push(base_ty.full_name());
                }
            }
            for member in &decl.members {
                match member {
                    TypeMember::Field(field) => {
                        let ty = model.resolve_type_text(
                            &field.declaration.ty.canonical_text(),
                            ctx,
                            ns,
                        );
                        for declarator in &field.declaration.declarators {
                            info.members.insert(declarator.name.text.clone(), ty.clone());
                        }
                    }
                    TypeMember::Property(property) => {
                        let ty =
                            model.resolve_type_text(&property.ty.canonical_text(), ctx, ns);
                        info.members.insert(property.name.text.clone(), ty);
                    }
                    TypeMember::Method(method) => {
                        let ty = model.resolve_type_text(
                            &method.return_type.canonical_text(),
                            ctx,
                            ns,
                        );
                        info.methods.insert(method.name.text.clone(), ty);
                    }
                    TypeMember::Constructor(_) | TypeMember::Nested(_) => {}
                }
            }
            resolved.push((qualify(ns, &decl.name.text), info));
        }
        for (key, info) in resolved {
            model.classes.insert(key, info);
        }
        model
    }

    /// Look up a declared class by full name.
    pub fn class(&self, full_name: &str) -> Option<&ClassInfo> {
        self.classes.get(full_name)
    }

    /// Resolve written type text to a [`TypeRef`]. Total: unknown names
    /// stay structurally parsed with an empty namespace.
    pub fn resolve_type_text(&self, text: &str, ctx: &UnitContext, namespace: &str) -> TypeRef {
        let (base, args, suffix) = split_type_text(text);
        let args: Vec<TypeRef> = args
            .iter()
            .map(|a| self.resolve_type_text(a, ctx, namespace))
            .collect();

        let mut resolved = self.resolve_base_name(&base, ctx, namespace);
        resolved.name.push_str(&suffix);
        resolved.with_args(args)
    }

    fn resolve_base_name(&self, base: &str, ctx: &UnitContext, namespace: &str) -> TypeRef {
        if let Some(full) = ctx.aliases.get(base) {
            return self.resolve_base_name(full, ctx, namespace);
        }
        if let Some(keyword) = keyword_to_ref(base) {
            return keyword;
        }
        if let Some(idx) = base.rfind('.') {
            return TypeRef::new(&base[..idx], &base[idx + 1..]);
        }
        // Declared classes: enclosing namespace first, then usings, then
        // the global namespace.
        if self.classes.contains_key(&qualify(namespace, base)) {
            return TypeRef::new(namespace, base);
        }
        for using in &ctx.usings {
            if self.classes.contains_key(&qualify(using, base)) {
                return TypeRef::new(using.as_str(), base);
            }
        }
        if self.classes.contains_key(base) {
            return TypeRef::unbound(base);
        }
        // Well-known types require their namespace to be imported.
        if let Some(ns) = well_known_namespace(base) {
            if ctx.usings.iter().any(|u| u == ns) {
                return TypeRef::new(ns, base);
            }
        }
        debug!(name = base, "type name did not resolve");
        TypeRef::unbound(base)
    }

    /// Returns true when a base-list entry resolves to the controller base
    /// marker. The match is by resolved display name only; inheritance
    /// chains are not walked.
    pub fn is_controller_base(&self, base: &TypeName, ctx: &UnitContext, namespace: &str) -> bool {
        self.resolve_type_text(&base.canonical_text(), ctx, namespace)
            .full_name()
            == CONTROLLER_BASE
    }

    // ---- expression typing ------------------------------------------------

    /// The direct type of an expression, when the model can see it.
    pub fn type_of_expression(&self, expr: &Expression, scope: &LocalScope) -> Option<TypeRef> {
        match expr {
            Expression::Literal(lit) => literal_type(lit.kind, &lit.token.text),
            Expression::Identifier(id) => scope.lookup(&id.text),
            Expression::Member(member) => self.member_access_type(member, scope),
            Expression::Invocation(inv) => match &inv.callee {
                Expression::Identifier(id) => {
                    let class = self.class(scope.class.as_deref()?)?;
                    class.methods.get(&id.text).cloned()
                }
                Expression::Member(member) => {
                    let target = self.expression_target_type(&member.target, scope)?;
                    let class = self.class(&target.full_name())?;
                    class.methods.get(&member.name.text).cloned()
                }
                _ => None,
            },
            Expression::ObjectCreation(creation) => {
                let ty = creation.ty.as_ref()?;
                Some(self.resolve_type_text(&ty.canonical_text(), scope.ctx, &scope.namespace))
            }
            Expression::Parenthesized(paren) => {
                self.type_of_expression(&paren.expression, scope)
            }
            Expression::Conditional(cond) => {
                let when_true = self.type_of_expression(&cond.when_true, scope)?;
                let when_false = self.type_of_expression(&cond.when_false, scope)?;
                (when_true == when_false).then_some(when_true)
            }
            Expression::Binary(binary) => self.binary_type(binary, scope),
            Expression::PrefixUnary(unary) => match unary.operator.text.as_str() {
                "!" => Some(TypeRef::new("System", "Boolean")),
                "await" => {
                    let inner = self.type_of_expression(&unary.operand, scope)?;
                    if matches!(inner.name.as_str(), "Task" | "ValueTask") {
                        inner.args.first().cloned()
                    } else {
                        Some(inner)
                    }
                }
                _ => self.type_of_expression(&unary.operand, scope),
            },
            Expression::PostfixUnary(unary) => self.type_of_expression(&unary.operand, scope),
            Expression::ElementAccess(access) => {
                let target = self.type_of_expression(&access.target, scope)?;
                if target.args.len() == 1 {
                    target.args.first().cloned()
                } else {
                    None
                }
            }
            Expression::Lambda(_) => None,
        }
    }

    /// The converted type: the direct type, or the target of the one
    /// implicit conversion the model understands (a conditional with a
    /// `null` branch converts to the other branch's type).
    pub fn converted_type_of_expression(
        &self,
        expr: &Expression,
        scope: &LocalScope,
    ) -> Option<TypeRef> {
        if let Some(direct) = self.type_of_expression(expr, scope) {
            return Some(direct);
        }
        if let Expression::Conditional(cond) = expr {
            let true_ty = self.type_of_expression(&cond.when_true, scope);
            let false_ty = self.type_of_expression(&cond.when_false, scope);
            return match (true_ty, is_null(&cond.when_true), false_ty, is_null(&cond.when_false))
            {
                (Some(ty), _, None, true) | (None, true, Some(ty), _) => Some(ty),
                _ => None,
            };
        }
        None
    }

    /// The type of the member named by a member access (field or property
    /// lookup on the target's class).
    pub fn member_access_type(
        &self,
        member: &MemberAccess,
        scope: &LocalScope,
    ) -> Option<TypeRef> {
        let target = self.expression_target_type(&member.target, scope)?;
        let class = self.class(&target.full_name())?;
        class.members.get(&member.name.text).cloned()
    }

    /// Type of a member-access target: an expression, or a bare identifier
    /// naming a class (static access).
    fn expression_target_type(
        &self,
        target: &Expression,
        scope: &LocalScope,
    ) -> Option<TypeRef> {
        if let Some(ty) = self.type_of_expression(target, scope) {
            return Some(ty);
        }
        if let Expression::Identifier(id) = target {
            let resolved = self.resolve_type_text(&id.text, scope.ctx, &scope.namespace);
            if self.classes.contains_key(&resolved.full_name()) {
                return Some(resolved);
            }
        }
        None
    }

    fn binary_type(&self, binary: &crate::cst::Binary, scope: &LocalScope) -> Option<TypeRef> {
        match binary.operator.text.as_str() {
            "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" | "is" => {
                Some(TypeRef::new("System", "Boolean"))
            }
            "??" => self
                .type_of_expression(&binary.left, scope)
                .or_else(|| self.type_of_expression(&binary.right, scope)),
            "+" | "-" | "*" | "/" | "%" | "&" | "|" | "^" | "<<" => self
                .type_of_expression(&binary.left, scope)
                .or_else(|| self.type_of_expression(&binary.right, scope)),
            "=" | "+=" | "-=" | "*=" | "/=" | "%=" | "&=" | "|=" | "^=" | "??=" => {
                self.type_of_expression(&binary.left, scope)
            }
            _ => None,
        }
    }
}

pub(crate) fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

fn is_null(expr: &Expression) -> bool {
    matches!(
        expr,
        Expression::Literal(lit) if lit.kind == LiteralKind::Null
    )
}

fn literal_type(kind: LiteralKind, text: &str) -> Option<TypeRef> {
    let name = match kind {
        LiteralKind::Int => {
            if text.ends_with('l') || text.ends_with('L') {
                "Int64"
            } else if text.ends_with('u') || text.ends_with('U') {
                "UInt32"
            } else {
                "Int32"
            }
        }
        LiteralKind::Real => match text.chars().last() {
            Some('f' | 'F') => "Single",
            Some('m' | 'M') => "Decimal",
            _ => "Double",
        },
        LiteralKind::Str => "String",
        LiteralKind::Char => "Char",
        LiteralKind::Bool => "Boolean",
        LiteralKind::Null => return None,
    };
    Some(TypeRef::new("System", name))
}

/// Split canonical type text into base name, top-level generic arguments,
/// and an array/nullable suffix.
fn split_type_text(text: &str) -> (String, Vec<String>, String) {
    let Some(open) = text.find('<') else {
        // Suffix still possible: `Foo[]`, `int?`.
        let base_end = text
            .find(['[', '?'])
            .unwrap_or(text.len());
        return (
            text[..base_end].to_string(),
            Vec::new(),
            text[base_end..].to_string(),
        );
    };
    let base = text[..open].to_string();
    let close = text.rfind('>').unwrap_or(text.len() - 1);
    let inner = &text[open + 1..close];
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in inner.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => {
                args.push(inner[start..i].to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(inner[start..].to_string());
    (base, args, text[close + 1..].to_string())
}

// ============================================================================
// Local scopes
// ============================================================================

/// Declared local, parameter, and loop-variable types threaded through a
/// method walk, with class members as the outermost frame.
#[derive(Debug)]
pub struct LocalScope<'m> {
    model: &'m SemanticModel,
    pub ctx: &'m UnitContext,
    pub namespace: String,
    /// Full name of the enclosing class.
    pub class: Option<String>,
    frames: Vec<HashMap<String, TypeRef>>,
}

impl<'m> LocalScope<'m> {
    pub fn new(
        model: &'m SemanticModel,
        ctx: &'m UnitContext,
        namespace: impl Into<String>,
        class: Option<String>,
    ) -> Self {
        Self {
            model,
            ctx,
            namespace: namespace.into(),
            class,
            frames: vec![HashMap::new()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn declare(&mut self, name: &str, ty: TypeRef) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), ty);
        }
    }

    /// Innermost frame first, then the enclosing class's fields and
    /// properties.
    pub fn lookup(&self, name: &str) -> Option<TypeRef> {
        for frame in self.frames.iter().rev() {
            if let Some(ty) = frame.get(name) {
                return Some(ty.clone());
            }
        }
        let class = self.model.class(self.class.as_deref()?)?;
        class.members.get(name).cloned()
    }
}

// ============================================================================
// Declaration walking
// ============================================================================

/// Every type declaration in a unit, paired with its enclosing namespace.
pub fn collect_type_declarations(unit: &CompilationUnit) -> Vec<(String, &TypeDeclaration)> {
    let mut found = Vec::new();
    for member in &unit.members {
        collect_member("", member, &mut found);
    }
    found
}

fn collect_member<'u>(
    namespace: &str,
    member: &'u Member,
    found: &mut Vec<(String, &'u TypeDeclaration)>,
) {
    match member {
        Member::Namespace(ns) => {
            let nested = if namespace.is_empty() {
                ns.path()
            } else {
                format!("{}.{}", namespace, ns.path())
            };
            let members = match &ns.body {
                NamespaceBody::Block { members, .. } => members,
                NamespaceBody::FileScoped { members, .. } => members,
            };
            for inner in members {
                collect_member(&nested, inner, found);
            }
        }
        Member::Type(decl) => {
            collect_declaration(namespace, decl, found);
        }
    }
}

fn collect_declaration<'u>(
    namespace: &str,
    decl: &'u TypeDeclaration,
    found: &mut Vec<(String, &'u TypeDeclaration)>,
) {
    found.push((namespace.to_string(), decl));
    for member in &decl.members {
        if let TypeMember::Nested(nested) = member {
            collect_declaration(namespace, nested, found);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
