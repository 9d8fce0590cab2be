use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::ScanRules;
use crate::error::ScanError;
use crate::model::{Finding, Severity};

/// How many leading bytes are inspected for NUL when sniffing binaries.
const SNIFF_LEN: usize = 8000;

#[derive(Debug, Clone)]
pub struct PackageFile {
    /// Path relative to the package root.
    pub relative: PathBuf,
    pub size: u64,
}

impl PackageFile {
    pub fn file_name(&self) -> String {
        self.relative
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub relative: PathBuf,
    pub content: String,
}

impl SourceFile {
    /// Lines paired with their 1-based numbers.
    pub fn numbered_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.content.lines().enumerate().map(|(i, l)| (i + 1, l))
    }
}

/// Snapshot of an extracted package: every file, plus the text content of
/// the files the content checks look at.
#[derive(Debug, Clone)]
pub struct PackageTree {
    pub root: PathBuf,
    pub files: Vec<PackageFile>,
    pub sources: Vec<SourceFile>,
    /// Layout problems found while walking, reported as structure errors.
    pub errors: Vec<Finding>,
    /// Files that were found but could not be scanned.
    pub warnings: Vec<Finding>,
}

impl PackageTree {
    /// Walks `root` without following symlinks. Ignored paths are left out
    /// entirely; binary, oversized and unreadable files are listed but have no
    /// content. Executable files are always read, even when they carry NUL
    /// bytes.
    pub fn load(root: &Path, rules: &ScanRules) -> Result<Self, ScanError> {
        if !root.exists() {
            return Err(ScanError::PackageNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let mut tree = PackageTree {
            root: root.to_path_buf(),
            files: Vec::new(),
            sources: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        };

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let relative = relative_str(root, entry.path());
                if relative.is_empty() {
                    return true;
                }
                if entry.file_type().is_dir() {
                    !rules.is_ignored(&format!("{}/", relative))
                } else {
                    !rules.is_ignored(&relative)
                }
            });

        for entry in walker {
            let entry = entry?;
            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();

            if file_type.is_symlink() {
                tree.warnings.push(
                    Finding::new("symlink", Severity::Medium, "Symbolic link not followed")
                        .in_file(&relative),
                );
                continue;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            tree.files.push(PackageFile {
                relative: relative.clone(),
                size,
            });

            let extension = relative
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default();
            let is_executable = rules.is_executable_extension(&extension);
            if !is_executable && rules.is_binary_extension(&extension) {
                continue;
            }

            if size > rules.max_file_size {
                tree.warnings.push(
                    Finding::new(
                        "oversized-file",
                        Severity::Low,
                        format!("File skipped: {} bytes exceeds scan limit", size),
                    )
                    .in_file(&relative),
                );
                continue;
            }

            match fs::read(entry.path()) {
                Ok(bytes) => {
                    if bytes.iter().take(SNIFF_LEN).any(|b| *b == 0) {
                        if !is_executable {
                            continue;
                        }
                        tree.errors.push(
                            Finding::new(
                                "binary-executable",
                                Severity::High,
                                "Binary content in executable file",
                            )
                            .in_file(&relative),
                        );
                    }
                    tree.sources.push(SourceFile {
                        relative,
                        content: String::from_utf8_lossy(&bytes).into_owned(),
                    });
                }
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "unreadable package file");
                    tree.warnings.push(
                        Finding::new(
                            "unreadable-file",
                            Severity::Medium,
                            format!("File could not be read: {}", e),
                        )
                        .in_file(&relative),
                    );
                }
            }
        }

        Ok(tree)
    }

    pub fn contains(&self, relative: &str) -> bool {
        self.files
            .iter()
            .any(|f| relative_string(&f.relative) == relative)
    }
}

fn relative_str(root: &Path, path: &Path) -> String {
    relative_string(path.strip_prefix(root).unwrap_or(path))
}

/// Forward-slash rendering so glob patterns behave the same on every OS.
fn relative_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
