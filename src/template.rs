//! Variable-substitution template engine
//!
//! Replaces `{{name}}` placeholders against a host's merged variable mapping.
//! The engine is a single left-to-right scan: `{{` opens a placeholder, the
//! first `}}` closes it, and the text between is used verbatim as the lookup
//! key (no nesting, no escaping). A lone `{` passes through unchanged.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::warn;

use crate::error::{PushError, Result};

/// Render a string against a variable mapping.
///
/// A placeholder whose key is absent from the mapping is an error naming
/// the missing key. An unterminated `{{` drops the remainder of the input.
pub fn render(input: &str, vars: &HashMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            // Unterminated placeholder: the tail is discarded.
            return Ok(out);
        };
        let key = &after[..close];
        match vars.get(key) {
            Some(value) => out.push_str(value),
            None => {
                return Err(PushError::MissingVariable {
                    key: key.to_string(),
                })
            }
        }
        rest = &after[close + 2..];
    }

    out.push_str(rest);
    Ok(out)
}

/// A template-rewritten file materialized on disk.
///
/// The file is deleted when the guard is dropped, whether the consumer
/// succeeded or not.
#[derive(Debug)]
pub struct TempRender {
    path: PathBuf,
}

impl TempRender {
    /// Path of the rewritten file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempRender {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), "failed to remove temporary file: {e}");
        }
    }
}

/// Rewrite a local file through the template engine into a uniquely-named
/// temporary file.
///
/// The temporary name is derived from the current time so that two runs
/// never reuse a stale file.
pub fn render_file(source: &Path, vars: &HashMap<String, String>) -> Result<TempRender> {
    let data = std::fs::read_to_string(source)?;
    let rendered = render(&data, vars)?;

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let path = std::env::temp_dir().join(format!("hostpush-{}-{}.tmp", nanos, process::id()));

    std::fs::write(&path, rendered)?;
    Ok(TempRender { path })
}
