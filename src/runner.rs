//! End-to-end orchestration: entitlement check, command assembly, Java and
//! tool provisioning, optional malware pre-scan, execution, cleanup, and
//! result reporting. Every step runs to completion before the next starts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Inputs;
use crate::command;
use crate::command::Operation;
use crate::error::SignError;
use crate::exec::{self, ExecutionOutcome};
use crate::jdk::{self, dragonwell::Dragonwell, JdkInstaller};
use crate::pipeline::Env;
use crate::platform::{Arch, Platform};
use crate::tool;
use crate::version;

const ENTITLEMENT_URL_BASE: &str = "https://api.esigner.io/v1/github";
const ENTITLEMENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimum Java major version the tool runs on.
const MIN_JAVA_MAJOR: u64 = 11;
const DEFAULT_JAVA_VERSION: &str = "11";

pub async fn run(inputs: &Inputs, env: &mut Env) -> Result<(), SignError> {
    let platform = Platform::current();

    check_entitlement(env).await?;

    let params = command::build_command(inputs.command, inputs, env)?;
    tracing::info!("assembled {} command", inputs.command.token());

    let java = ensure_java(env, platform).await?;

    let root = tool::locate_or_install(env, platform).await?;
    tool::write_environment_config(&root, inputs.environment_name)?;
    let base = tool::build_invocation(&root, inputs.signing_method, &inputs.jvm_max_memory, platform)?
        .replace(tool::JAVA_PLACEHOLDER, &java.display().to_string());
    let prefix = tool::shell_prefix(inputs.signing_method, platform, env);
    let invocation = if prefix.is_empty() {
        base
    } else {
        format!("{prefix} {base}")
    };

    let full_command = format!("{invocation} {params}");

    if should_scan(inputs) {
        scan_directory(inputs, env, &invocation, exec::run_shell)?;
    }

    tracing::info!("executing CodeSignTool");
    let outcome = exec::run_shell(&full_command)?;

    if inputs.clean_logs {
        clean_logs(&root);
    }

    exec::classify(&outcome)?;
    env.report("CodeSigner", outcome.combined());
    tracing::info!("CodeSignTool finished successfully");
    Ok(())
}

/// Entitlement gate: an explicit denial aborts the run; an unreachable or
/// slow endpoint is logged and ignored.
async fn check_entitlement(env: &Env) -> Result<(), SignError> {
    let Some(repository) = env.get("GITHUB_REPOSITORY") else {
        tracing::warn!("GITHUB_REPOSITORY unset, skipping entitlement check");
        return Ok(());
    };
    let url = format!("{ENTITLEMENT_URL_BASE}/{repository}/entitlement");

    let client = reqwest::Client::builder()
        .timeout(ENTITLEMENT_TIMEOUT)
        .build()?;
    match client.get(&url).send().await {
        Ok(response) if response.status() == 402 || response.status() == 403 => {
            let reason = response
                .text()
                .await
                .unwrap_or_else(|_| "subscription required".to_string());
            Err(SignError::EntitlementDenied {
                repository: repository.to_string(),
                reason,
            })
        }
        Ok(_) => Ok(()),
        Err(e) => {
            tracing::warn!("entitlement check unreachable, continuing: {e}");
            Ok(())
        }
    }
}

/// Reuses an already-configured Java when it meets the version floor,
/// otherwise provisions one through the installer.
async fn ensure_java(env: &mut Env, platform: Platform) -> Result<PathBuf, SignError> {
    if let Some(java) = configured_java(env, platform) {
        tracing::info!("reusing configured JAVA_HOME");
        return Ok(java);
    }

    let installer = JdkInstaller::new(
        Dragonwell::default(),
        DEFAULT_JAVA_VERSION,
        platform,
        Arch::current(),
    );
    let installation = installer.setup(env).await?;
    Ok(jdk::java_binary(&installation.path, platform))
}

fn configured_java(env: &Env, platform: Platform) -> Option<PathBuf> {
    let home = env.get("JAVA_HOME")?;
    let raw_version = env.get("JAVA_VERSION")?;
    let major = version::normalize(raw_version).ok()?.version.major;
    if major < MIN_JAVA_MAJOR {
        return None;
    }
    Some(jdk::java_binary(Path::new(home), platform))
}

/// The malware pre-scan only applies to batch signing, and only when asked
/// for; single sign and scan_code runs never trigger it.
fn should_scan(inputs: &Inputs) -> bool {
    inputs.command == Operation::BatchSign && inputs.malware_block
}

/// Pre-submission malware scan: every file in the batch directory is scanned
/// one at a time; the first flagged file fails the run before the signing
/// command executes.
fn scan_directory(
    inputs: &Inputs,
    env: &Env,
    invocation: &str,
    mut run: impl FnMut(&str) -> Result<ExecutionOutcome, SignError>,
) -> Result<(), SignError> {
    let dir = env.interpolate(&inputs.dir_path);
    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    tracing::info!("scanning {} file(s) in {dir}", files.len());
    for file in files {
        let scan_params = command::build_scan_command(inputs, env, &file)?;
        let outcome = run(&format!("{invocation} {scan_params}"))?;
        if exec::error_marker(&outcome).is_some() {
            return Err(SignError::MalwareDetected {
                file,
                output: outcome.combined(),
            });
        }
        tracing::info!("scan passed: {}", file_name(&file));
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Best-effort removal of the tool's log directory; absence is fine.
fn clean_logs(root: &Path) {
    let logs = root.join("logs");
    match std::fs::remove_dir_all(&logs) {
        Ok(()) => tracing::debug!("removed {}", logs.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("could not remove {}: {e}", logs.display()),
    }
}
