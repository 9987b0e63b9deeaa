//! Rewrite pass contract and pipeline.
//!
//! Every transformation implements [`RewritePass`]: visit a tree and return
//! either the same tree (no change) or a new one, wrapped in [`Rewrite`] so
//! the caller can tell the two apart. [`Pipeline`] applies an ordered list
//! of passes to a tree and reports whether any pass changed it, which is
//! what decides whether the rendered tree is written back to disk.

use tracing::debug;

// ============================================================================
// Rewrite result
// ============================================================================

/// Result of running a pass over a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite<T> {
    /// The pass made no change; the input tree is handed back as-is.
    Unchanged(T),
    /// The pass produced a rewritten tree.
    Changed(T),
}

impl<T> Rewrite<T> {
    /// Wrap `tree`, marking it changed only when `changed` is true.
    pub fn flagged(tree: T, changed: bool) -> Self {
        if changed {
            Self::Changed(tree)
        } else {
            Self::Unchanged(tree)
        }
    }

    /// Returns true if this is a `Changed` result.
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed(_))
    }

    /// Borrow the tree regardless of change state.
    pub fn tree(&self) -> &T {
        match self {
            Self::Unchanged(t) | Self::Changed(t) => t,
        }
    }

    /// Unwrap the tree regardless of change state.
    pub fn into_tree(self) -> T {
        match self {
            Self::Unchanged(t) | Self::Changed(t) => t,
        }
    }

    /// Map the inner tree, preserving the change state.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Rewrite<U> {
        match self {
            Self::Unchanged(t) => Rewrite::Unchanged(f(t)),
            Self::Changed(t) => Rewrite::Changed(f(t)),
        }
    }
}

// ============================================================================
// Pass contract
// ============================================================================

/// A single tree-to-tree transformation.
///
/// Passes consume the tree and either hand it back untouched or rebuild the
/// affected spine, sharing everything else. All passes implement this
/// contract uniformly so [`Pipeline`] can apply them generically.
pub trait RewritePass<T> {
    /// Short stable name used in logs.
    fn name(&self) -> &'static str;

    /// Visit `tree`, returning the same tree or a rewritten one.
    fn run(&mut self, tree: T) -> Rewrite<T>;
}

// ============================================================================
// Pipeline
// ============================================================================

/// An ordered list of passes applied to each tree in turn.
///
/// The pipeline threads the tree through every pass in registration order
/// and ORs the change flags together. Trees are processed one at a time;
/// per-tree output is independent of cross-tree processing order.
pub struct Pipeline<'p, T> {
    passes: Vec<Box<dyn RewritePass<T> + 'p>>,
}

impl<'p, T> Pipeline<'p, T> {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Append a pass, builder-style.
    pub fn with_pass(mut self, pass: impl RewritePass<T> + 'p) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Append a pass.
    pub fn push(&mut self, pass: impl RewritePass<T> + 'p) {
        self.passes.push(Box::new(pass));
    }

    /// Number of registered passes.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Returns true if no passes are registered.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Apply every pass in order and report whether the tree changed.
    pub fn run(&mut self, tree: T) -> Rewrite<T> {
        let mut current = tree;
        let mut changed = false;
        for pass in &mut self.passes {
            let result = pass.run(current);
            if result.is_changed() {
                debug!(pass = pass.name(), "pass rewrote tree");
                changed = true;
            }
            current = result.into_tree();
        }
        Rewrite::flagged(current, changed)
    }
}

impl<T> Default for Pipeline<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl RewritePass<String> for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }

        fn run(&mut self, tree: String) -> Rewrite<String> {
            let upper = tree.to_uppercase();
            Rewrite::flagged(upper.clone(), upper != tree)
        }
    }

    struct Suffix(&'static str);

    impl RewritePass<String> for Suffix {
        fn name(&self) -> &'static str {
            "suffix"
        }

        fn run(&mut self, tree: String) -> Rewrite<String> {
            if tree.ends_with(self.0) {
                Rewrite::Unchanged(tree)
            } else {
                Rewrite::Changed(tree + self.0)
            }
        }
    }

    #[test]
    fn unchanged_tree_is_not_flagged() {
        let mut pipeline = Pipeline::new().with_pass(Upper);
        let result = pipeline.run("ALREADY".to_string());
        assert!(!result.is_changed());
        assert_eq!(result.into_tree(), "ALREADY");
    }

    #[test]
    fn any_changed_pass_flags_the_pipeline() {
        let mut pipeline = Pipeline::new().with_pass(Upper).with_pass(Suffix("!"));
        let result = pipeline.run("DONE".to_string());
        // Upper is a no-op here, Suffix still changes the tree.
        assert!(result.is_changed());
        assert_eq!(result.into_tree(), "DONE!");
    }

    #[test]
    fn passes_run_in_registration_order() {
        let mut pipeline = Pipeline::new().with_pass(Upper).with_pass(Suffix("!"));
        let result = pipeline.run("mixed".to_string());
        assert_eq!(result.into_tree(), "MIXED!");
    }

    #[test]
    fn idempotence_over_two_runs() {
        let mut pipeline = Pipeline::new().with_pass(Upper).with_pass(Suffix("!"));
        let once = pipeline.run("abc".to_string()).into_tree();
        let twice = pipeline.run(once.clone());
        assert!(!twice.is_changed());
        assert_eq!(twice.into_tree(), once);
    }

    #[test]
    fn rewrite_combinators() {
        let rewrite = Rewrite::flagged("ab".to_string(), true);
        assert_eq!(rewrite.tree(), "ab");
        let mapped = rewrite.map(|t| t.len());
        assert_eq!(mapped, Rewrite::Changed(2));

        let mut pipeline: Pipeline<String> = Pipeline::default();
        assert!(pipeline.is_empty());
        pipeline.push(Upper);
        assert_eq!(pipeline.len(), 1);
    }
}
