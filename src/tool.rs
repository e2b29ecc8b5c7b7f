//! CodeSignTool acquisition and configuration: locating or downloading the
//! tool, writing its per-environment properties file, and assembling the
//! invocation that the controller executes.

use std::path::{Path, PathBuf};

use crate::cli::{EnvironmentName, SigningMethod};
use crate::error::SignError;
use crate::fetch;
use crate::pipeline::Env;
use crate::platform::Platform;

const WINDOWS_DOWNLOAD_URL: &str = "https://www.ssl.com/download/codesigntool-for-windows/";
const UNIX_DOWNLOAD_URL: &str =
    "https://www.ssl.com/download/codesigntool-for-linux-and-macos/";

/// The download URLs end in a slug, not a file name; the payload is always
/// a zip, so the archive is stored under a fixed name.
const TOOL_ARCHIVE_NAME: &str = "CodeSignTool.zip";

pub const CONFIG_RELATIVE_PATH: &str = "conf/code_sign_tool.properties";

const PROD_PROPERTIES: &str = "\
CLIENT_ID=kaXTRACNijSWsFdRKg_KAfD3fqrBlzMbWs6TwWHwAn8
OAUTH2_ENDPOINT=https://login.ssl.com/oauth2/token
CSC_API_ENDPOINT=https://cs.ssl.com
TSA_URL=http://ts.ssl.com
TSA_LEGACY_URL=http://ts.ssl.com/legacy
";

const TEST_PROPERTIES: &str = "\
CLIENT_ID=qOUeZCCzSqgA93acB3LYq6lBNjgZdiOxQc-KayC3UMw
OAUTH2_ENDPOINT=https://oauth-sandbox.ssl.com/oauth2/token
CSC_API_ENDPOINT=https://cs-try.ssl.com
TSA_URL=http://ts.ssl.com
TSA_LEGACY_URL=http://ts.ssl.com/legacy
";

/// Placeholder in direct-invocation templates, replaced with the resolved
/// java launcher once the runtime is set up.
pub const JAVA_PLACEHOLDER: &str = "${JAVACMD}";

/// Resolves the tool root: an externally supplied `CODESIGNTOOL_PATH` that
/// exists on disk wins; otherwise a per-run default location, downloading
/// and extracting the tool there when absent. The resolved path is exported
/// for later pipeline steps.
pub async fn locate_or_install(env: &mut Env, platform: Platform) -> Result<PathBuf, SignError> {
    if let Some(existing) = env.get("CODESIGNTOOL_PATH") {
        let path = PathBuf::from(existing);
        if path.is_dir() {
            tracing::info!("using CodeSignTool at {}", path.display());
            export_tool_path(env, &path);
            return Ok(path);
        }
    }

    let base = env
        .get("RUNNER_TEMP")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    let install_dir = base.join("codesign-tool");

    if !install_dir.is_dir() {
        let url = match platform {
            Platform::Windows => WINDOWS_DOWNLOAD_URL,
            _ => UNIX_DOWNLOAD_URL,
        };
        let archive = fetch::download_named(url, None, &base, TOOL_ARCHIVE_NAME).await?;
        fetch::extract_into(&archive, &install_dir)?;
    }

    // The zip wraps everything in one versioned directory.
    let root = fetch::first_top_level_entry(&install_dir)?;
    if !root.is_dir() {
        return Err(SignError::ToolInstall(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    tracing::info!("CodeSignTool installed at {}", root.display());
    export_tool_path(env, &root);
    Ok(root)
}

fn export_tool_path(env: &mut Env, root: &Path) {
    let value = root.display().to_string();
    env.export("CODE_SIGN_TOOL_PATH", &value);
    env.export("CODESIGNTOOL_PATH", value);
}

/// Overwrites the tool's properties file with the blob for the selected
/// environment.
pub fn write_environment_config(
    root: &Path,
    environment: EnvironmentName,
) -> Result<(), SignError> {
    let blob = match environment {
        EnvironmentName::Prod => PROD_PROPERTIES,
        EnvironmentName::Test => TEST_PROPERTIES,
    };
    let config_path = root.join(CONFIG_RELATIVE_PATH);
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&config_path, blob)?;
    tracing::debug!("wrote {} configuration", config_path.display());
    Ok(())
}

/// Builds the executable part of the invocation. v1 patches and returns the
/// shipped launcher script; v2 renders a direct java command with a
/// placeholder for the launcher path.
pub fn build_invocation(
    root: &Path,
    method: SigningMethod,
    jvm_max_memory: &str,
    platform: Platform,
) -> Result<String, SignError> {
    match method {
        SigningMethod::V1 => patch_launcher(root, platform, jvm_max_memory),
        SigningMethod::V2 => Ok(direct_invocation(root, platform, jvm_max_memory)),
    }
}

fn launcher_name(platform: Platform) -> &'static str {
    if platform == Platform::Windows {
        "CodeSignTool.bat"
    } else {
        "CodeSignTool.sh"
    }
}

fn patch_launcher(
    root: &Path,
    platform: Platform,
    jvm_max_memory: &str,
) -> Result<String, SignError> {
    let script = root.join(launcher_name(platform));
    let text = std::fs::read_to_string(&script).map_err(|e| {
        SignError::ToolInstall(format!("launcher {} unreadable: {e}", script.display()))
    })?;

    let patched: Vec<String> = text
        .lines()
        .map(|line| patch_java_line(line, jvm_max_memory))
        .collect();
    std::fs::write(&script, patched.join("\n") + "\n")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))?;
    }

    Ok(format!("\"{}\"", script.display()))
}

/// Rewrites the launcher's java line: inject the heap ceiling and quote the
/// forwarded-arguments token so file paths with spaces survive.
fn patch_java_line(line: &str, jvm_max_memory: &str) -> String {
    if !(line.contains("java") && line.contains("-jar")) {
        return line.to_string();
    }
    let mut patched = line.to_string();
    if !patched.contains("-Xmx") {
        patched = patched.replacen("java ", &format!("java -Xmx{jvm_max_memory} "), 1);
    }
    if patched.contains("$@") && !patched.contains("\"$@\"") {
        patched = patched.replace("$@", "\"$@\"");
    }
    patched
}

fn direct_invocation(root: &Path, platform: Platform, jvm_max_memory: &str) -> String {
    match platform {
        Platform::Windows => format!(
            "\"{JAVA_PLACEHOLDER}\" -Xmx{jvm_max_memory} -jar \"{}\\jar\\code_sign_tool.jar\"",
            root.display()
        ),
        _ => format!(
            "\"{JAVA_PLACEHOLDER}\" -Xmx{jvm_max_memory} -jar \"{}/jar/code_sign_tool.jar\"",
            root.display()
        ),
    }
}

/// Shell prefix prepended to the launcher invocation. Empty on Windows and
/// under direct invocation; elsewhere the user's login shell, with `/bin/zsh`
/// (macOS) or `/bin/sh` fallbacks and a `SHELL` override on top.
pub fn shell_prefix(method: SigningMethod, platform: Platform, env: &Env) -> String {
    if platform == Platform::Windows || method == SigningMethod::V2 {
        return String::new();
    }

    let fallback = if platform == Platform::MacOs {
        "/bin/zsh"
    } else {
        "/bin/sh"
    };
    let shell = env
        .get("USER")
        .and_then(|user| login_shell_from(Path::new("/etc/passwd"), user))
        .unwrap_or_else(|| fallback.to_string());

    env.get("SHELL").map(str::to_string).unwrap_or(shell)
}

/// Login shell of `user` from a passwd-format file.
fn login_shell_from(passwd: &Path, user: &str) -> Option<String> {
    let text = std::fs::read_to_string(passwd).ok()?;
    for line in text.lines() {
        let mut fields = line.split(':');
        if fields.next() == Some(user) {
            let shell = fields.nth(5)?.trim();
            if !shell.is_empty() {
                return Some(shell.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_tool_zip(path: &Path) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default();
        zip.start_file("CodeSignTool-v1.3.0/jar/code_sign_tool.jar", options)
            .unwrap();
        zip.write_all(b"jar").unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn tool_archive_name_is_extractable() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join(TOOL_ARCHIVE_NAME);
        write_tool_zip(&archive);

        let out = dir.path().join("out");
        fetch::extract_into(&archive, &out).unwrap();
        assert!(out
            .join("CodeSignTool-v1.3.0")
            .join("jar")
            .join("code_sign_tool.jar")
            .exists());
    }

    #[test]
    fn url_slug_is_not_a_usable_archive_name() {
        // The download URLs end in an extension-less slug; storing the zip
        // under that name would defeat the extractor's dispatch.
        let dir = tempdir().unwrap();
        let archive = dir.path().join("codesigntool-for-linux-and-macos");
        write_tool_zip(&archive);

        let err = fetch::extract_into(&archive, &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, SignError::UnknownArchiveFormat(_)));
        assert!(TOOL_ARCHIVE_NAME.ends_with(".zip"));
    }

    #[tokio::test]
    async fn locate_resolves_previous_install_without_downloading() {
        let base = tempdir().unwrap();
        let install_dir = base.path().join("codesign-tool");
        std::fs::create_dir_all(install_dir.join("CodeSignTool-v1.3.0").join("jar")).unwrap();

        let mut env = Env::with_vars([("RUNNER_TEMP", base.path().to_str().unwrap())]);
        let root = locate_or_install(&mut env, Platform::Linux).await.unwrap();

        assert!(root.ends_with("CodeSignTool-v1.3.0"));
        assert_eq!(
            env.get("CODE_SIGN_TOOL_PATH"),
            Some(root.to_str().unwrap())
        );
        assert_eq!(env.get("CODESIGNTOOL_PATH"), Some(root.to_str().unwrap()));
    }

    #[tokio::test]
    async fn explicit_tool_path_wins_over_default() {
        let dir = tempdir().unwrap();
        let mut env = Env::with_vars([("CODESIGNTOOL_PATH", dir.path().to_str().unwrap())]);

        let root = locate_or_install(&mut env, Platform::Linux).await.unwrap();
        assert_eq!(root, dir.path());
    }

    #[test]
    fn config_blobs_differ_per_environment() {
        let dir = tempdir().unwrap();
        write_environment_config(dir.path(), EnvironmentName::Prod).unwrap();
        let prod = std::fs::read_to_string(dir.path().join(CONFIG_RELATIVE_PATH)).unwrap();
        assert!(prod.contains("https://cs.ssl.com"));
        assert!(prod.contains("https://login.ssl.com/oauth2/token"));

        write_environment_config(dir.path(), EnvironmentName::Test).unwrap();
        let test = std::fs::read_to_string(dir.path().join(CONFIG_RELATIVE_PATH)).unwrap();
        assert!(test.contains("https://cs-try.ssl.com"));
        assert_ne!(prod, test);
    }

    #[test]
    fn config_file_is_overwritten_not_appended() {
        let dir = tempdir().unwrap();
        write_environment_config(dir.path(), EnvironmentName::Prod).unwrap();
        write_environment_config(dir.path(), EnvironmentName::Prod).unwrap();
        let text = std::fs::read_to_string(dir.path().join(CONFIG_RELATIVE_PATH)).unwrap();
        assert_eq!(text.matches("CLIENT_ID").count(), 1);
    }

    #[test]
    fn patch_java_line_injects_heap_and_quotes_args() {
        let line = "java -jar \"$CODE_SIGN_TOOL_PATH/jar/code_sign_tool.jar\" $@";
        let patched = patch_java_line(line, "2048M");
        assert!(patched.contains("java -Xmx2048M -jar"));
        assert!(patched.contains("\"$@\""));
    }

    #[test]
    fn patch_java_line_is_idempotent() {
        let line = "java -Xmx2048M -jar tool.jar \"$@\"";
        assert_eq!(patch_java_line(line, "2048M"), line);
    }

    #[test]
    fn patch_java_line_leaves_other_lines_alone() {
        assert_eq!(patch_java_line("#!/bin/sh", "2048M"), "#!/bin/sh");
        assert_eq!(patch_java_line("set -e", "2048M"), "set -e");
    }

    #[test]
    fn wrapper_strategy_patches_script_in_place() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("CodeSignTool.sh");
        std::fs::write(&script, "#!/bin/sh\njava -jar tool.jar $@\n").unwrap();

        let invocation =
            build_invocation(dir.path(), SigningMethod::V1, "1024M", Platform::Linux).unwrap();

        assert_eq!(invocation, format!("\"{}\"", script.display()));
        let text = std::fs::read_to_string(&script).unwrap();
        assert!(text.contains("-Xmx1024M"));
        assert!(text.contains("\"$@\""));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&script).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn direct_strategy_renders_template_without_touching_files() {
        let dir = tempdir().unwrap();
        let invocation =
            build_invocation(dir.path(), SigningMethod::V2, "2048M", Platform::Linux).unwrap();

        assert!(invocation.contains(JAVA_PLACEHOLDER));
        assert!(invocation.contains("-Xmx2048M"));
        assert!(invocation.contains("jar/code_sign_tool.jar"));
        assert!(!dir.path().join("CodeSignTool.sh").exists());
    }

    #[test]
    fn direct_strategy_uses_windows_path_separators_on_windows() {
        let dir = tempdir().unwrap();
        let invocation =
            build_invocation(dir.path(), SigningMethod::V2, "2048M", Platform::Windows).unwrap();
        assert!(invocation.contains("\\jar\\code_sign_tool.jar"));
    }

    #[test]
    fn shell_prefix_empty_on_windows_and_v2() {
        let env = Env::with_vars([("SHELL", "/bin/bash")]);
        assert_eq!(shell_prefix(SigningMethod::V1, Platform::Windows, &env), "");
        assert_eq!(shell_prefix(SigningMethod::V2, Platform::Linux, &env), "");
    }

    #[test]
    fn shell_env_overrides_fallback() {
        let env = Env::with_vars([("SHELL", "/bin/bash")]);
        assert_eq!(
            shell_prefix(SigningMethod::V1, Platform::Linux, &env),
            "/bin/bash"
        );
    }

    #[test]
    fn platform_fallback_applies_without_shell_var() {
        let env = Env::with_vars::<_, String, String>([]);
        assert_eq!(
            shell_prefix(SigningMethod::V1, Platform::MacOs, &env),
            "/bin/zsh"
        );
        assert_eq!(
            shell_prefix(SigningMethod::V1, Platform::Linux, &env),
            "/bin/sh"
        );
    }

    #[test]
    fn login_shell_is_parsed_from_passwd() {
        let dir = tempdir().unwrap();
        let passwd = dir.path().join("passwd");
        std::fs::write(
            &passwd,
            "root:x:0:0:root:/root:/bin/bash\nrunner:x:1001:1001::/home/runner:/usr/bin/fish\n",
        )
        .unwrap();

        assert_eq!(
            login_shell_from(&passwd, "runner").as_deref(),
            Some("/usr/bin/fish")
        );
        assert_eq!(login_shell_from(&passwd, "nobody"), None);
    }
}
