use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignError {
    #[error("invalid Java version specifier '{spec}': {reason}")]
    BadVersionSpec { spec: String, reason: String },

    #[error("early-access Java versions are not supported: {0}")]
    EarlyAccessUnsupported(String),

    #[error("could not find satisfied version for semver '{requested}'. Available versions: {available:?}")]
    NoCompatibleRelease {
        requested: String,
        available: Vec<String>,
    },

    #[error("download failed: {0}")]
    Download(String),

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("unknown archive format: {0}")]
    UnknownArchiveFormat(String),

    #[error("CodeSignTool installation failed: {0}")]
    ToolInstall(String),

    #[error("code signing entitlement denied for {repository}: {reason}")]
    EntitlementDenied { repository: String, reason: String },

    #[error("failed to execute command: {0}")]
    Exec(String),

    #[error("CodeSignTool reported an error:\n{0}")]
    ToolFailed(String),

    #[error("malware scan flagged {}:\n{output}", file.display())]
    MalwareDetected { file: PathBuf, output: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}
