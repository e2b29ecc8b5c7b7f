//! The hosting pipeline's environment and reporting surface, modeled as an
//! explicit context object so setup routines can be tested without touching
//! the real process environment.

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Snapshot of the process environment plus everything this run wants to
/// publish back to the pipeline: exported variables (`GITHUB_ENV`), PATH
/// additions (`GITHUB_PATH`), and step outputs (`GITHUB_OUTPUT`).
#[derive(Debug, Default)]
pub struct Env {
    vars: HashMap<String, String>,
    exports: Vec<(String, String)>,
    paths: Vec<PathBuf>,
    outputs: Vec<(String, String)>,
}

impl Env {
    pub fn from_process() -> Self {
        Env {
            vars: std::env::vars().collect(),
            ..Env::default()
        }
    }

    pub fn with_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Env {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Env::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Context-local assignment, not published to later steps.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Assigns in-context and records the variable for later pipeline steps.
    pub fn export(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        tracing::debug!("export {key}={value}");
        self.vars.insert(key.clone(), value.clone());
        self.exports.push((key, value));
    }

    /// Prepends a directory to the in-context PATH and records it for the
    /// pipeline's persistent PATH file.
    pub fn add_path(&mut self, dir: &Path) {
        let current = self.vars.get("PATH").cloned().unwrap_or_default();
        let sep = if cfg!(windows) { ';' } else { ':' };
        let joined = if current.is_empty() {
            dir.display().to_string()
        } else {
            format!("{}{}{}", dir.display(), sep, current)
        };
        self.vars.insert("PATH".to_string(), joined);
        self.paths.push(dir.to_path_buf());
    }

    /// Publishes a step output.
    pub fn report(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        tracing::info!("output {key} recorded");
        self.outputs.push((key, value));
    }

    /// Substitutes `${VAR}` occurrences with environment values. Each
    /// distinct variable name is substituted once (first occurrence only);
    /// unknown names are left unchanged.
    pub fn interpolate(&self, template: &str) -> String {
        let mut result = template.to_string();
        let mut seen: HashSet<String> = HashSet::new();
        let mut search = 0;
        while let Some(rel) = result[search..].find("${") {
            let start = search + rel;
            let Some(end_rel) = result[start..].find('}') else {
                break;
            };
            let end = start + end_rel;
            let name = result[start + 2..end].to_string();
            if seen.insert(name.clone()) {
                if let Some(value) = self.vars.get(&name) {
                    let value = value.clone();
                    result.replace_range(start..=end, &value);
                    search = start + value.len();
                    continue;
                }
            }
            search = end + 1;
        }
        result
    }

    /// Writes the recorded exports, PATH additions, and outputs to the files
    /// the pipeline designates. Skipped silently when a file variable is
    /// unset (e.g. running outside the pipeline).
    pub fn flush(&self) -> std::io::Result<()> {
        if let Some(path) = self.get("GITHUB_ENV") {
            let mut file = append(path)?;
            for (key, value) in &self.exports {
                write_kv(&mut file, key, value)?;
            }
        }
        if let Some(path) = self.get("GITHUB_PATH") {
            let mut file = append(path)?;
            for dir in &self.paths {
                writeln!(file, "{}", dir.display())?;
            }
        }
        if let Some(path) = self.get("GITHUB_OUTPUT") {
            let mut file = append(path)?;
            for (key, value) in &self.outputs {
                write_kv(&mut file, key, value)?;
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn exports(&self) -> &[(String, String)] {
        &self.exports
    }

    #[cfg(test)]
    pub fn outputs(&self) -> &[(String, String)] {
        &self.outputs
    }
}

fn append(path: &str) -> std::io::Result<std::fs::File> {
    std::fs::OpenOptions::new().create(true).append(true).open(path)
}

/// Multi-line values use the pipeline's heredoc form.
fn write_kv(file: &mut std::fs::File, key: &str, value: &str) -> std::io::Result<()> {
    if value.contains('\n') {
        writeln!(file, "{key}<<__CODESIGN_EOF__")?;
        writeln!(file, "{value}")?;
        writeln!(file, "__CODESIGN_EOF__")
    } else {
        writeln!(file, "{key}={value}")
    }
}
