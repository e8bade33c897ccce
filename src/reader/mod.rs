//! Config file discovery and logical line reading
//!
//! Responsible for:
//! - Walking the root file's `cfg_file`/`cfg_dir` (and `include_file`/
//!   `include_dir`) directives into a flat list of object files
//! - Recursing directory includes, picking up `.cfg` files in subdirectories
//! - Turning file text into logical lines: backslash continuations joined,
//!   comments stripped (`\;` escapes a literal semicolon), whitespace trimmed

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::constants::CFG_FILE_SUFFIX;
use crate::errors::LoadError;

/// One logical line of an object config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// Physical line number where this logical line started.
    pub line: u32,
    pub text: String,
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse the root config file and return every contributing object file, in
/// include order (directory includes sorted for determinism).
pub fn discover_object_files(root: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let contents = read_file(root)?;
    let base = root.parent().unwrap_or_else(|| Path::new("."));
    let mut files = Vec::new();

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        match key {
            "cfg_file" | "include_file" => files.push(resolve(base, value)),
            "cfg_dir" | "include_dir" => {
                let dir = resolve(base, value.trim_end_matches('/'));
                collect_dir(&dir, &mut files)?;
            }
            // The root file also carries daemon settings that are none of
            // our business here.
            _ => {}
        }
    }

    Ok(files)
}

fn resolve(base: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Recursively collect `.cfg` files under `dir`, sorted per directory.
fn collect_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), LoadError> {
    let entries = fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        paths.push(entry.path());
    }
    paths.sort();

    for path in paths {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.starts_with('.') {
            continue;
        }
        if path.is_dir() {
            collect_dir(&path, files)?;
        } else if name.ends_with(CFG_FILE_SUFFIX) {
            files.push(path);
        } else {
            debug!("skipping non-config file {}", path.display());
        }
    }

    Ok(())
}

/// Read an object file into logical lines.
pub fn read_logical_lines(path: &Path) -> Result<Vec<LogicalLine>, LoadError> {
    Ok(logical_lines(&read_file(path)?))
}

/// Split text into trimmed, comment-stripped logical lines. A trailing
/// backslash joins the next physical line; the reported line number is where
/// the logical line started.
pub fn logical_lines(contents: &str) -> Vec<LogicalLine> {
    let mut out = Vec::new();
    let mut pending = String::new();
    let mut start_line = 0u32;

    for (idx, raw) in contents.lines().enumerate() {
        let lineno = idx as u32 + 1;
        if pending.is_empty() {
            start_line = lineno;
        }

        if let Some(stripped) = raw.strip_suffix('\\') {
            pending.push_str(stripped);
            continue;
        }
        pending.push_str(raw);

        let text = strip_comment(&pending);
        pending.clear();
        if !text.is_empty() {
            out.push(LogicalLine {
                line: start_line,
                text,
            });
        }
    }

    // A dangling continuation still yields its partial content.
    if !pending.is_empty() {
        let text = strip_comment(&pending);
        if !text.is_empty() {
            out.push(LogicalLine {
                line: start_line,
                text,
            });
        }
    }

    out
}

/// Drop full-line and trailing comments, honoring the `\;` escape, and trim.
fn strip_comment(line: &str) -> String {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') || trimmed.starts_with(';') {
        return String::new();
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut chars = trimmed.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&';') {
            out.push(';');
            chars.next();
        } else if c == ';' {
            break;
        } else {
            out.push(c);
        }
    }

    out.trim().to_string()
}
