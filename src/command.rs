//! Translation of declarative inputs into the CodeSignTool command line.
//!
//! Every operation accepts a fixed subset of parameters; anything outside
//! that subset is dropped silently rather than rejected, so a workflow can
//! share one input block across operations.

use std::path::{Path, PathBuf};

use clap::ValueEnum;

use crate::cli::Inputs;
use crate::error::SignError;
use crate::pipeline::Env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Operation {
    #[value(name = "sign")]
    Sign,
    #[value(name = "batch_sign")]
    BatchSign,
    #[value(name = "scan_code")]
    ScanCode,
}

impl Operation {
    pub fn token(self) -> &'static str {
        match self {
            Operation::Sign => "sign",
            Operation::BatchSign => "batch_sign",
            Operation::ScanCode => "scan_code",
        }
    }

    /// The parameters this operation accepts, single source of truth for
    /// the builder's gating.
    pub fn allowed_params(self) -> &'static [ParamKey] {
        match self {
            Operation::Sign => &[
                ParamKey::Username,
                ParamKey::Password,
                ParamKey::CredentialId,
                ParamKey::TotpSecret,
                ParamKey::ProgramName,
                ParamKey::FilePath,
                ParamKey::OutputPath,
                ParamKey::Override,
                ParamKey::MalwareBlock,
            ],
            Operation::BatchSign => &[
                ParamKey::Username,
                ParamKey::Password,
                ParamKey::CredentialId,
                ParamKey::TotpSecret,
                ParamKey::ProgramName,
                ParamKey::DirPath,
                ParamKey::OutputPath,
            ],
            Operation::ScanCode => &[
                ParamKey::Username,
                ParamKey::Password,
                ParamKey::CredentialId,
                ParamKey::ProgramName,
                ParamKey::FilePath,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKey {
    Username,
    Password,
    CredentialId,
    TotpSecret,
    ProgramName,
    FilePath,
    DirPath,
    OutputPath,
    Override,
    MalwareBlock,
}

impl ParamKey {
    /// Emission order. It matches the external tool's argument expectations
    /// and keeps emitted commands predictable in logs.
    pub const ORDER: [ParamKey; 10] = [
        ParamKey::Username,
        ParamKey::Password,
        ParamKey::CredentialId,
        ParamKey::TotpSecret,
        ParamKey::ProgramName,
        ParamKey::FilePath,
        ParamKey::DirPath,
        ParamKey::OutputPath,
        ParamKey::Override,
        ParamKey::MalwareBlock,
    ];

    pub fn flag(self) -> &'static str {
        match self {
            ParamKey::Username => "username",
            ParamKey::Password => "password",
            ParamKey::CredentialId => "credential_id",
            ParamKey::TotpSecret => "totp_secret",
            ParamKey::ProgramName => "program_name",
            ParamKey::FilePath => "input_file_path",
            ParamKey::DirPath => "input_dir_path",
            ParamKey::OutputPath => "output_dir_path",
            ParamKey::Override => "override",
            ParamKey::MalwareBlock => "malware_block",
        }
    }

    fn is_bool(self) -> bool {
        matches!(self, ParamKey::Override | ParamKey::MalwareBlock)
    }

    fn is_path(self) -> bool {
        matches!(
            self,
            ParamKey::FilePath | ParamKey::DirPath | ParamKey::OutputPath
        )
    }
}

/// Builds the full parameter command for the selected operation, starting
/// from the operation token itself.
pub fn build_command(op: Operation, inputs: &Inputs, env: &Env) -> Result<String, SignError> {
    build_with_file(op, inputs, env, None)
}

/// Scan command for a single file of a batch: `scan_code` semantics with the
/// batch's credentials but `file_path` forced to the given file.
pub fn build_scan_command(
    inputs: &Inputs,
    env: &Env,
    file: &Path,
) -> Result<String, SignError> {
    build_with_file(Operation::ScanCode, inputs, env, Some(file))
}

fn build_with_file(
    op: Operation,
    inputs: &Inputs,
    env: &Env,
    file_override: Option<&Path>,
) -> Result<String, SignError> {
    let mut command = op.token().to_string();

    for key in ParamKey::ORDER {
        let raw = match (key, file_override) {
            (ParamKey::FilePath, Some(file)) => file.display().to_string(),
            _ => inputs.param_value(key),
        };
        let value = env.interpolate(&raw);
        if value.trim().is_empty() {
            continue;
        }
        if !op.allowed_params().contains(&key) {
            tracing::debug!("dropping -{} (not accepted by {})", key.flag(), op.token());
            continue;
        }

        if key.is_bool() {
            command.push_str(&format!(" -{}={}", key.flag(), value));
        } else if key.is_path() {
            let normalized = normalize_path(&value, key == ParamKey::OutputPath)?;
            command.push_str(&format!(" -{}=\"{}\"", key.flag(), normalized));
        } else {
            command.push_str(&format!(" -{}=\"{}\"", key.flag(), value));
        }
    }

    Ok(command)
}

/// Canonicalizes a path input. The output directory is the one parameter
/// with a filesystem side effect: it is created (with intermediates) before
/// the flag is emitted.
fn normalize_path(raw: &str, create: bool) -> Result<String, SignError> {
    let path = PathBuf::from(raw);
    if create && !path.exists() {
        std::fs::create_dir_all(&path)?;
    }
    let canonical = std::fs::canonicalize(&path).unwrap_or(path);
    Ok(canonical.display().to_string())
}
