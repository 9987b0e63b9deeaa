//! Rewrite passes over parsed compilation units.
//!
//! Both passes implement `sharpen_core::rewrite::RewritePass` and are
//! applied in a fixed order: type substitution first, attribute synthesis
//! second.

mod api_attributes;
mod explicit_types;

pub use api_attributes::ApiAttributePass;
pub use explicit_types::ExplicitTypePass;

use crate::cst::NamespaceDeclaration;

/// Namespace path of a nested namespace declaration.
pub(crate) fn child_namespace(parent: &str, ns: &NamespaceDeclaration) -> String {
    if parent.is_empty() {
        ns.path()
    } else {
        format!("{}.{}", parent, ns.path())
    }
}
