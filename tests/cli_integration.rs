//! End-to-end tests for the rewrite run: discovery, parsing, write-back.

use std::fs;

use sharpen::cli::run_rewrite;
use sharpen::error::{OutputErrorCode, SharpenError};

const CONTROLLER: &str = "using Microsoft.AspNetCore.Mvc;\n\nnamespace App.Web\n{\n    public class TodoController : ControllerBase\n    {\n        public IActionResult Get()\n        {\n            return Ok();\n        }\n    }\n}\n";

const PLAIN: &str = "class Plain\n{\n    void M()\n    {\n        int x = 5;\n    }\n}\n";

#[test]
fn rewrites_controller_file_in_place() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("TodoController.cs");
    fs::write(&file, CONTROLLER).unwrap();

    let report = run_rewrite(dir.path()).expect("run succeeds");
    assert_eq!(report.files_scanned, 1);
    assert_eq!(report.files_changed, 1);

    let written = fs::read_to_string(&file).unwrap();
    assert!(written.contains("[Authorize]\n    [ApiController]\n    [Route(\"api/[controller]\")]"));
    assert!(written.contains("[ProducesResponseType(typeof(OkResult), 200)]"));
}

#[test]
fn unchanged_files_are_left_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("Plain.cs");
    fs::write(&file, PLAIN).unwrap();

    let report = run_rewrite(dir.path()).expect("run succeeds");
    assert_eq!(report.files_scanned, 1);
    assert_eq!(report.files_changed, 0);
    assert!(report.changed_files.is_empty());
    assert_eq!(fs::read_to_string(&file).unwrap(), PLAIN);
}

#[test]
fn single_file_path_is_accepted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("C.cs");
    fs::write(&file, "class C { void M() { var x = 5; } }").unwrap();

    let report = run_rewrite(&file).expect("run succeeds");
    assert_eq!(report.files_scanned, 1);
    assert_eq!(report.files_changed, 1);
    assert_eq!(
        fs::read_to_string(&file).unwrap(),
        "class C { void M() { int x = 5; } }"
    );
}

#[test]
fn missing_path_fails_before_any_processing() {
    let err = run_rewrite(std::path::Path::new("/no/such/path")).unwrap_err();
    assert!(matches!(err, SharpenError::PathNotFound { .. }));
    assert_eq!(err.error_code(), OutputErrorCode::InvalidArguments);
}

#[test]
fn parse_failure_aborts_the_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("Bad.cs"), "class {{{").unwrap();
    fs::write(dir.path().join("Good.cs"), PLAIN).unwrap();

    let err = run_rewrite(dir.path()).unwrap_err();
    let SharpenError::ParseError { file, .. } = &err else {
        panic!("expected parse error, got {err}");
    };
    assert!(file.ends_with("Bad.cs"));
    assert_eq!(err.error_code(), OutputErrorCode::ParseError);
}

#[test]
fn cross_file_types_resolve_within_one_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("Repo.cs"),
        "using System.Collections.Generic;\nnamespace App\n{\n    public class Repo\n    {\n        public List<Todo> Items { get; set; }\n    }\n    public class Todo { }\n}\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("Service.cs"),
        "namespace App\n{\n    public class Service\n    {\n        private readonly Repo _repo = new Repo();\n\n        public void Run()\n        {\n            foreach (var item in _repo.Items)\n            {\n            }\n        }\n    }\n}\n",
    )
    .unwrap();

    let report = run_rewrite(dir.path()).expect("run succeeds");
    assert_eq!(report.files_scanned, 2);
    assert_eq!(report.files_changed, 1);

    let service = fs::read_to_string(dir.path().join("Service.cs")).unwrap();
    assert!(service.contains("foreach (Todo item in _repo.Items)"), "got:\n{service}");
}

#[test]
fn second_run_over_rewritten_output_is_stable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("TodoController.cs");
    fs::write(&file, CONTROLLER).unwrap();

    run_rewrite(dir.path()).expect("first run");
    let after_first = fs::read_to_string(&file).unwrap();

    let report = run_rewrite(dir.path()).expect("second run");
    assert_eq!(report.files_changed, 0);
    assert_eq!(fs::read_to_string(&file).unwrap(), after_first);
}
