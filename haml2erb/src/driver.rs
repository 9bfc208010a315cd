//! File and directory conversion: the driver layer a one-shot migration CLI
//! needs on top of the pure [`crate::convert`] function.
//!
//! Conversion runs sequentially, file by file. The core has no shared
//! mutable state, so a caller could parallelize trivially, but a one-shot
//! migration run is I/O-bound over a finite, typically modest, file count,
//! and sequential execution keeps per-file error reporting simple.

use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::validate::{self, ValidationError};

#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertFileOptions {
    pub delete_original: bool,
    pub validate: bool,
    pub dry_run: bool,
}

#[derive(Debug)]
pub struct FileResult {
    pub path: PathBuf,
    pub errors: Vec<Error>,
    pub validation_errors: Vec<ValidationError>,
    pub skipped: bool,
    pub dry_run: bool,
    pub content: Option<String>,
}

impl FileResult {
    pub fn success(&self) -> bool {
        self.errors.is_empty() && self.validation_errors.is_empty()
    }

    fn skipped_io(path: &Path, err: std::io::Error) -> Self {
        FileResult {
            path: path.to_path_buf(),
            errors: vec![Error::from(err)],
            validation_errors: Vec::new(),
            skipped: true,
            dry_run: false,
            content: None,
        }
    }
}

/// Converts a single `.haml` file to its `.erb` sibling.
///
/// I/O errors (file missing, permission denied on read or write) are
/// captured on the result with `skipped: true` rather than propagated —
/// this driver never retries and never partially commits: a file that
/// fails mid-conversion has no `.erb` written.
pub fn convert_file(path: &Path, opts: ConvertFileOptions) -> FileResult {
    let haml = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => return FileResult::skipped_io(path, e),
    };

    let erb = match crate::convert(&haml) {
        Ok(erb) => erb,
        Err(e) => {
            return FileResult {
                path: path.to_path_buf(),
                errors: vec![e],
                validation_errors: Vec::new(),
                skipped: false,
                dry_run: opts.dry_run,
                content: None,
            }
        }
    };

    let validation_errors = if opts.validate {
        validate::validate(&erb).errors
    } else {
        Vec::new()
    };

    let out_path = output_path(path);

    if opts.dry_run {
        return FileResult {
            path: out_path,
            errors: Vec::new(),
            validation_errors,
            skipped: false,
            dry_run: true,
            content: Some(erb),
        };
    }

    if let Err(e) = std::fs::write(&out_path, &erb) {
        return FileResult::skipped_io(path, e);
    }

    if opts.delete_original {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %e, "converted file written but failed to delete original");
        }
    }

    FileResult {
        path: out_path,
        errors: Vec::new(),
        validation_errors,
        skipped: false,
        dry_run: false,
        content: None,
    }
}

/// The input path with its trailing `.haml` suffix replaced by `.erb`.
fn output_path(path: &Path) -> PathBuf {
    match path.to_str().and_then(|s| s.strip_suffix(".haml")) {
        Some(stem) => PathBuf::from(format!("{stem}.erb")),
        None => path.with_extension("erb"),
    }
}

/// Recursively finds every `*.haml` file under `root` and converts each.
/// Returns one [`FileResult`] per file found, in directory-walk order.
pub fn convert_directory(root: &Path, opts: ConvertFileOptions) -> Vec<FileResult> {
    let mut results = Vec::new();
    walk(root, opts, &mut results);
    results
}

fn walk(dir: &Path, opts: ConvertFileOptions, results: &mut Vec<FileResult>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            results.push(FileResult::skipped_io(dir, e));
            return;
        }
    };

    let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
    paths.sort();

    for path in paths {
        if path.is_dir() {
            walk(&path, opts, results);
        } else if path.extension().is_some_and(|ext| ext == "haml") {
            results.push(convert_file(&path, opts));
        }
    }
}
