//! CLI orchestration: discovery, parsing, rewriting, write-back.
//!
//! A run is read-once/write-once per file: every discovered source is
//! parsed up front, the semantic model is built across all of them, and
//! the pass pipeline is applied to each tree in turn. Only trees the
//! pipeline reports as changed are written back; everything else is left
//! untouched on disk.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use sharpen_core::error::SharpenError;
use sharpen_core::rewrite::Pipeline;
use sharpen_csharp::{ApiAttributePass, ExplicitTypePass, SemanticModel, SourceFile};

use crate::output::RewriteReport;

/// File extension of discoverable sources.
const SOURCE_EXTENSION: &str = "cs";

/// Rewrite the file or directory at `path` and report what changed.
pub fn run_rewrite(path: &Path) -> Result<RewriteReport, SharpenError> {
    if !path.exists() {
        return Err(SharpenError::PathNotFound {
            path: path.display().to_string(),
        });
    }

    let files = discover_sources(path);
    info!(count = files.len(), "discovered source files");

    let mut sources = Vec::with_capacity(files.len());
    for file in &files {
        let text = fs::read_to_string(file).map_err(|source| SharpenError::Io {
            path: file.display().to_string(),
            source,
        })?;
        let parsed =
            SourceFile::parse(file.clone(), &text).map_err(|e| SharpenError::ParseError {
                file: file.display().to_string(),
                line: e.line,
                col: e.col,
                message: e.message,
            })?;
        sources.push(parsed);
    }

    let units: Vec<_> = sources.iter().map(|s| s.unit.clone()).collect();
    let model = SemanticModel::build(&units);

    let mut pipeline = Pipeline::new()
        .with_pass(ExplicitTypePass::new(&model))
        .with_pass(ApiAttributePass::new(&model));

    let mut changed_files = Vec::new();
    for source in sources {
        let SourceFile { path: file, unit } = source;
        let result = pipeline.run(unit);
        if result.is_changed() {
            let rewritten = SourceFile {
                path: file.clone(),
                unit: result.into_tree(),
            };
            fs::write(&file, rewritten.render()).map_err(|source| SharpenError::Io {
                path: file.display().to_string(),
                source,
            })?;
            info!(file = %file.display(), "rewrote file");
            changed_files.push(file.display().to_string());
        } else {
            debug!(file = %file.display(), "no applicable transformation");
        }
    }

    Ok(RewriteReport::new(
        path.display().to_string(),
        files.len(),
        changed_files,
    ))
}

/// All sources under `path`: the file itself, or every `*.cs` below a
/// directory, sorted for deterministic processing order.
fn discover_sources(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(SOURCE_EXTENSION))
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_is_an_argument_error() {
        let err = run_rewrite(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, SharpenError::PathNotFound { .. }));
    }

    #[test]
    fn discovery_filters_by_extension_and_sorts() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("b.cs"), "class B { }").unwrap();
        fs::write(dir.path().join("a.cs"), "class A { }").unwrap();
        fs::write(dir.path().join("notes.txt"), "not source").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.cs"), "class C { }").unwrap();

        let found = discover_sources(dir.path());
        let names: Vec<String> = found
            .iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .unwrap()
                    .display()
                    .to_string()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(names, vec!["a.cs", "b.cs", "sub/c.cs"]);
    }
}
