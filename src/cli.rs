use clap::{ArgAction, Parser, ValueEnum};

use crate::command::{Operation, ParamKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnvironmentName {
    #[value(name = "PROD", alias = "prod")]
    Prod,
    #[value(name = "TEST", alias = "test")]
    Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SigningMethod {
    #[value(name = "v1")]
    V1,
    #[value(name = "v2")]
    V2,
}

/// Declarative inputs of the action. Each flag falls back to the `INPUT_*`
/// environment variable the hosting pipeline injects.
#[derive(Debug, Parser)]
#[command(name = "codesign-action", version, about = "Sign code with the eSigner CodeSignTool")]
pub struct Inputs {
    /// CodeSignTool operation to run.
    #[arg(long, env = "INPUT_COMMAND", value_enum)]
    pub command: Operation,

    #[arg(long, env = "INPUT_USERNAME", default_value = "", hide_env_values = true)]
    pub username: String,

    #[arg(long, env = "INPUT_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,

    #[arg(long, env = "INPUT_CREDENTIAL_ID", default_value = "", hide_env_values = true)]
    pub credential_id: String,

    #[arg(long, env = "INPUT_TOTP_SECRET", default_value = "", hide_env_values = true)]
    pub totp_secret: String,

    #[arg(long, env = "INPUT_PROGRAM_NAME", default_value = "")]
    pub program_name: String,

    /// File to sign or scan.
    #[arg(long, env = "INPUT_FILE_PATH", default_value = "")]
    pub file_path: String,

    /// Directory of files for batch signing.
    #[arg(long, env = "INPUT_DIR_PATH", default_value = "")]
    pub dir_path: String,

    /// Destination directory for signed artifacts; created if absent.
    #[arg(long, env = "INPUT_OUTPUT_PATH", default_value = "")]
    pub output_path: String,

    /// Run a malware pre-scan over the batch before signing.
    #[arg(long, env = "INPUT_MALWARE_BLOCK", action = ArgAction::Set, default_value_t = false)]
    pub malware_block: bool,

    /// Overwrite already-signed files in place.
    #[arg(long = "override", env = "INPUT_OVERRIDE", action = ArgAction::Set, default_value_t = false)]
    pub override_existing: bool,

    #[arg(long, env = "INPUT_ENVIRONMENT_NAME", value_enum, default_value = "PROD")]
    pub environment_name: EnvironmentName,

    /// Delete the tool's log directory after the run.
    #[arg(long, env = "INPUT_CLEAN_LOGS", action = ArgAction::Set, default_value_t = true)]
    pub clean_logs: bool,

    /// JVM heap ceiling passed to the tool, e.g. "2048M".
    #[arg(long, env = "INPUT_JVM_MAX_MEMORY", default_value = "2048M")]
    pub jvm_max_memory: String,

    #[arg(long, env = "INPUT_SIGNING_METHOD", value_enum, default_value = "v1")]
    pub signing_method: SigningMethod,
}

impl Inputs {
    /// Raw value for a command parameter. Booleans map to `"true"` when set
    /// and to the empty string (no flag emitted) otherwise.
    pub fn param_value(&self, key: ParamKey) -> String {
        match key {
            ParamKey::Username => self.username.clone(),
            ParamKey::Password => self.password.clone(),
            ParamKey::CredentialId => self.credential_id.clone(),
            ParamKey::TotpSecret => self.totp_secret.clone(),
            ParamKey::ProgramName => self.program_name.clone(),
            ParamKey::FilePath => self.file_path.clone(),
            ParamKey::DirPath => self.dir_path.clone(),
            ParamKey::OutputPath => self.output_path.clone(),
            ParamKey::Override => bool_value(self.override_existing),
            ParamKey::MalwareBlock => bool_value(self.malware_block),
        }
    }
}

fn bool_value(set: bool) -> String {
    if set {
        "true".to_string()
    } else {
        String::new()
    }
}

#[cfg(test)]
impl Inputs {
    /// Minimal inputs for builder tests; fields default to empty/off.
    pub fn test_default(command: Operation) -> Self {
        Inputs {
            command,
            username: String::new(),
            password: String::new(),
            credential_id: String::new(),
            totp_secret: String::new(),
            program_name: String::new(),
            file_path: String::new(),
            dir_path: String::new(),
            output_path: String::new(),
            malware_block: false,
            override_existing: false,
            environment_name: EnvironmentName::Prod,
            clean_logs: true,
            jvm_max_memory: "2048M".to_string(),
            signing_method: SigningMethod::V1,
        }
    }
}
