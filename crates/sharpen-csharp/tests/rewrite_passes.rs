//! Behavior tests for the two rewrite passes, run through the pipeline the
//! CLI uses: type substitution first, attribute synthesis second.

use sharpen_core::rewrite::Pipeline;
use sharpen_csharp::cst::{render, CompilationUnit};
use sharpen_csharp::{parse_unit, ApiAttributePass, ExplicitTypePass, SemanticModel};

/// Run both passes over `sources`; returns the rendered outputs plus the
/// pipeline change flags, in input order.
fn rewrite_all(sources: &[&str]) -> Vec<(String, bool)> {
    let units: Vec<CompilationUnit> = sources
        .iter()
        .map(|s| parse_unit(s).expect("parse error"))
        .collect();
    let model = SemanticModel::build(&units);
    let mut pipeline = Pipeline::new()
        .with_pass(ExplicitTypePass::new(&model))
        .with_pass(ApiAttributePass::new(&model));
    units
        .into_iter()
        .map(|unit| {
            let result = pipeline.run(unit);
            let changed = result.is_changed();
            (render(&result.into_tree()), changed)
        })
        .collect()
}

fn rewrite_one(source: &str) -> (String, bool) {
    rewrite_all(&[source]).remove(0)
}

// ============================================================================
// Type substitution
// ============================================================================

#[test]
fn var_with_int_initializer_becomes_int() {
    let (out, changed) = rewrite_one("class C { void M() { var x = 5; } }");
    assert!(changed);
    assert_eq!(out, "class C { void M() { int x = 5; } }");
}

#[test]
fn formatting_around_substituted_type_is_preserved() {
    let (out, changed) =
        rewrite_one("class C\n{\n    void M()\n    {\n        var  x = 5; // keep\n    }\n}\n");
    assert!(changed);
    assert_eq!(
        out,
        "class C\n{\n    void M()\n    {\n        int  x = 5; // keep\n    }\n}\n"
    );
}

#[test]
fn literal_types_substitute_by_keyword() {
    let (out, _) = rewrite_one(
        "class C { void M() { var a = \"hi\"; var b = true; var c = 2.5; var d = 'x'; } }",
    );
    assert_eq!(
        out,
        "class C { void M() { string a = \"hi\"; bool b = true; double c = 2.5; char d = 'x'; } }"
    );
}

#[test]
fn multi_declarator_var_is_left_unchanged() {
    let source = "class C { void M() { var x = 5, y = 6; } }";
    let (out, changed) = rewrite_one(source);
    assert!(!changed);
    assert_eq!(out, source);
}

#[test]
fn var_without_initializer_is_left_unchanged() {
    let source = "class C { void M() { var x; } }";
    let (out, changed) = rewrite_one(source);
    assert!(!changed);
    assert_eq!(out, source);
}

#[test]
fn unresolvable_initializer_is_left_unchanged() {
    let source = "class C { void M() { var x = mystery(); } }";
    let (out, changed) = rewrite_one(source);
    assert!(!changed);
    assert_eq!(out, source);
}

#[test]
fn object_creation_substitutes_declared_class() {
    let source = "namespace App\n{\n    class Widget { }\n    class C\n    {\n        void M()\n        {\n            var w = new Widget();\n        }\n    }\n}\n";
    let (out, changed) = rewrite_one(source);
    assert!(changed);
    assert!(out.contains("Widget w = new Widget();"), "got:\n{out}");
}

#[test]
fn minimal_display_qualifies_when_namespace_not_imported() {
    let sources = [
        "namespace App.Models { public class Todo { } }",
        "namespace App.Web\n{\n    class C\n    {\n        void M()\n        {\n            var t = new App.Models.Todo();\n        }\n    }\n}\n",
    ];
    let results = rewrite_all(&sources);
    assert!(results[1].0.contains("App.Models.Todo t = new App.Models.Todo();"));

    let sources = [
        "namespace App.Models { public class Todo { } }",
        "using App.Models;\nnamespace App.Web\n{\n    class C\n    {\n        void M()\n        {\n            var t = new App.Models.Todo();\n        }\n    }\n}\n",
    ];
    let results = rewrite_all(&sources);
    assert!(results[1].0.contains("Todo t = new App.Models.Todo();"));
}

#[test]
fn for_initializer_substitutes_fully_qualified() {
    let (out, changed) =
        rewrite_one("class C { void M(int n) { for (var i = 0; i < n; i++) { } } }");
    assert!(changed);
    assert_eq!(out, "class C { void M(int n) { for (int i = 0; i < n; i++) { } } }");
}

#[test]
fn converted_type_fallback_applies_to_locals_but_not_for_initializers() {
    // A conditional with a null branch has no direct type; its converted
    // type is the other branch's. Locals take the fallback, `for`
    // initializers intentionally do not.
    let (out, changed) =
        rewrite_one("class C { void M(bool flag) { var a = flag ? \"y\" : null; } }");
    assert!(changed);
    assert_eq!(
        out,
        "class C { void M(bool flag) { string a = flag ? \"y\" : null; } }"
    );

    let source =
        "class C { void M(bool flag) { for (var a = flag ? \"y\" : null; flag; flag = false) { } } }";
    let (out, changed) = rewrite_one(source);
    assert!(!changed);
    assert_eq!(out, source);
}

#[test]
fn foreach_over_member_access_takes_element_simple_name() {
    let source = "using System.Collections.Generic;\nnamespace App\n{\n    public class Repo\n    {\n        public List<Todo> Items { get; set; }\n    }\n    public class Todo { }\n    public class Service\n    {\n        private readonly Repo _repo = new Repo();\n        public void Run()\n        {\n            foreach (var item in _repo.Items)\n            {\n                var copy = item;\n            }\n        }\n    }\n}\n";
    let (out, changed) = rewrite_one(source);
    assert!(changed);
    assert!(out.contains("foreach (Todo item in _repo.Items)"), "got:\n{out}");
    // Block statements get the local-declaration substitution too.
    assert!(out.contains("Todo copy = item;"), "got:\n{out}");
}

#[test]
fn foreach_over_non_member_access_is_left_unchanged() {
    let source = "using System.Collections.Generic;\nclass C\n{\n    void M(List<int> xs)\n    {\n        foreach (var x in xs)\n        {\n        }\n    }\n}\n";
    let (out, changed) = rewrite_one(source);
    assert!(!changed);
    assert_eq!(out, source);
}

#[test]
fn substitution_is_idempotent() {
    let source = "class C { void M() { var x = 5; for (var i = 0; i < x; i++) { } } }";
    let first = rewrite_one(source);
    assert!(first.1);
    let second = rewrite_one(&first.0);
    assert!(!second.1, "second run changed: {}", second.0);
    assert_eq!(second.0, first.0);
}

#[test]
fn untouched_file_renders_byte_identical() {
    let source = "class C\n{\n    void M()\n    {\n        int x = 5; // already explicit\n    }\n}\n";
    let (out, changed) = rewrite_one(source);
    assert!(!changed);
    assert_eq!(out, source);
}

// ============================================================================
// Attribute synthesis
// ============================================================================

const CONTROLLER: &str = "using Microsoft.AspNetCore.Mvc;\n\nnamespace App.Web\n{\n    public class TodoController : ControllerBase\n    {\n        public IActionResult Get()\n        {\n            return Ok();\n        }\n    }\n}\n";

#[test]
fn bare_controller_gains_the_three_baseline_attributes() {
    let (out, changed) = rewrite_one(CONTROLLER);
    assert!(changed);
    let expected = "using Microsoft.AspNetCore.Mvc;\n\nnamespace App.Web\n{\n    [Authorize]\n    [ApiController]\n    [Route(\"api/[controller]\")]\n    public class TodoController : ControllerBase\n    {\n        [ProducesResponseType(typeof(OkResult), 200)]\n        public IActionResult Get()\n        {\n            return Ok();\n        }\n    }\n}\n";
    assert_eq!(out, expected);
}

#[test]
fn controller_match_requires_resolved_base() {
    // Without the using directive, `ControllerBase` does not resolve to
    // the marker and the class is left alone.
    let source = "class TodoController : ControllerBase\n{\n}\n";
    let (out, changed) = rewrite_one(source);
    assert!(!changed);
    assert_eq!(out, source);
}

#[test]
fn non_class_bases_do_not_trigger_baselines() {
    let source =
        "using Microsoft.AspNetCore.Mvc;\nclass Plain : SomethingElse\n{\n}\n";
    let (out, changed) = rewrite_one(source);
    assert!(!changed);
    assert_eq!(out, source);
}

#[test]
fn partially_annotated_controller_duplicates_the_matching_attribute() {
    // The presence test appends a candidate only when every existing list
    // renders identically to it, so a lone [Authorize] is duplicated and
    // the other two baselines are skipped.
    let source = "using Microsoft.AspNetCore.Mvc;\n\n[Authorize]\npublic class PartController : ControllerBase\n{\n}\n";
    let (out, changed) = rewrite_one(source);
    assert!(changed);
    let expected = "using Microsoft.AspNetCore.Mvc;\n\n[Authorize]\n[Authorize]\npublic class PartController : ControllerBase\n{\n}\n";
    assert_eq!(out, expected);
}

#[test]
fn fully_annotated_controller_gains_nothing_on_a_second_pass() {
    let (once, changed) = rewrite_one(CONTROLLER);
    assert!(changed);
    let (twice, changed_again) = rewrite_one(&once);
    assert!(!changed_again, "second pass changed: {twice}");
    assert_eq!(twice, once);
}

#[test]
fn ok_with_argument_maps_to_ok_object_result() {
    let source = "using Microsoft.AspNetCore.Mvc;\nclass C\n{\n    public IActionResult Get(int data)\n    {\n        return Ok(data);\n    }\n}\n";
    let (out, _) = rewrite_one(source);
    assert!(
        out.contains("[ProducesResponseType(typeof(OkObjectResult), 200)]"),
        "got:\n{out}"
    );
    assert!(!out.contains("typeof(OkResult)"), "got:\n{out}");
}

#[test]
fn conditional_return_yields_both_branch_attributes() {
    let source = "using Microsoft.AspNetCore.Mvc;\nclass C\n{\n    public IActionResult Find(int id)\n    {\n        return id > 0 ? Ok(id) : NotFound();\n    }\n}\n";
    let (out, _) = rewrite_one(source);
    let ok = out
        .find("[ProducesResponseType(typeof(OkObjectResult), 200)]")
        .expect("OkObjectResult attribute present");
    let not_found = out
        .find("[ProducesResponseType(typeof(NotFoundResult), 404)]")
        .expect("NotFoundResult attribute present");
    // Branches are classified left to right.
    assert!(ok < not_found);
}

#[test]
fn repeated_result_kinds_are_deduplicated() {
    let source = "using Microsoft.AspNetCore.Mvc;\nclass C\n{\n    public IActionResult Get(bool flag)\n    {\n        if (flag)\n        {\n            return Ok();\n        }\n        return Ok();\n    }\n}\n";
    let (out, _) = rewrite_one(source);
    assert_eq!(out.matches("[ProducesResponseType(typeof(OkResult), 200)]").count(), 1);
}

#[test]
fn object_creation_returns_classify_by_type_name() {
    let source = "using Microsoft.AspNetCore.Mvc;\nclass C\n{\n    public IActionResult Gone()\n    {\n        return new NotFoundResult();\n    }\n}\n";
    let (out, _) = rewrite_one(source);
    assert!(
        out.contains("[ProducesResponseType(typeof(NotFoundResult), 404)]"),
        "got:\n{out}"
    );
}

#[test]
fn unknown_result_names_are_ignored() {
    let source = "using Microsoft.AspNetCore.Mvc;\nclass C\n{\n    public IActionResult Get()\n    {\n        return Custom();\n    }\n}\n";
    let (out, changed) = rewrite_one(source);
    assert!(!changed);
    assert_eq!(out, source);
}

#[test]
fn existing_produces_attribute_is_not_duplicated() {
    let source = "using Microsoft.AspNetCore.Mvc;\nclass C\n{\n    [ProducesResponseType(typeof(OkResult), 200)]\n    public IActionResult Get()\n    {\n        return Ok();\n    }\n}\n";
    let (out, changed) = rewrite_one(source);
    assert!(!changed);
    assert_eq!(out, source);
}

#[test]
fn qualified_invocations_do_not_classify() {
    // Only bare-identifier calls participate in name synthesis.
    let source = "using Microsoft.AspNetCore.Mvc;\nclass C\n{\n    public IActionResult Get()\n    {\n        return results.Ok();\n    }\n}\n";
    let (out, changed) = rewrite_one(source);
    assert!(!changed);
    assert_eq!(out, source);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn output_is_identical_across_runs() {
    let sources = [CONTROLLER, "class C { void M() { var x = 5; } }"];
    let first = rewrite_all(&sources);
    let second = rewrite_all(&sources);
    assert_eq!(first, second);
}
