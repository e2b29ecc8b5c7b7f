//! Java runtime provisioning: cache lookup, release resolution, download,
//! and activation. The release index lookup is pluggable per distribution
//! through [`ReleaseResolver`]; the lifecycle here is distribution-agnostic.

pub mod dragonwell;

use std::path::{Path, PathBuf};

use crate::error::SignError;
use crate::fetch;
use crate::pipeline::Env;
use crate::platform::{Arch, Platform};
use crate::version;

/// A located, ready-to-use runtime directory with its version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub version: String,
    pub path: PathBuf,
}

/// Bridges "resolve" and "fetch": a remote artifact for one version.
#[derive(Debug, Clone)]
pub struct ReleaseInfo {
    pub version: String,
    pub url: String,
    pub checksum: Option<String>,
}

#[allow(async_fn_in_trait)]
pub trait ReleaseResolver {
    fn distribution(&self) -> &'static str;

    /// Latest remote release satisfying the version specifier.
    async fn resolve_release(
        &self,
        version_spec: &str,
        platform: Platform,
        arch: Arch,
    ) -> Result<ReleaseInfo, SignError>;
}

pub struct JdkInstaller<R> {
    resolver: R,
    version_spec: String,
    platform: Platform,
    arch: Arch,
    /// When set, the remote index is consulted even on a cache hit.
    pub check_latest: bool,
}

impl<R: ReleaseResolver> JdkInstaller<R> {
    pub fn new(resolver: R, version_spec: impl Into<String>, platform: Platform, arch: Arch) -> Self {
        JdkInstaller {
            resolver,
            version_spec: version_spec.into(),
            platform,
            arch,
            check_latest: false,
        }
    }

    /// Produces an activated installation or fails the run.
    pub async fn setup(&self, env: &mut Env) -> Result<Installation, SignError> {
        // Reject a bad specifier before any network access.
        version::validate_spec(&self.version_spec)?;

        let tool_dir =
            cache_root(env).join(format!("Java_{}_jdk", self.resolver.distribution()));
        let cached = find_cached(&tool_dir, &self.version_spec, self.arch)?;

        let installation = match cached {
            Some(found) if !self.check_latest => {
                tracing::info!("resolved Java {} from the tool cache", found.version);
                found
            }
            cached => {
                let release = self
                    .resolver
                    .resolve_release(&self.version_spec, self.platform, self.arch)
                    .await?;
                match cached {
                    Some(found) if found.version == release.version => {
                        tracing::info!("cached Java {} is already the latest", found.version);
                        found
                    }
                    _ => self.install_release(&tool_dir, &release).await?,
                }
            }
        };

        let installation = adjust_root(installation, self.platform);
        self.activate(env, &installation);
        Ok(installation)
    }

    async fn install_release(
        &self,
        tool_dir: &Path,
        release: &ReleaseInfo,
    ) -> Result<Installation, SignError> {
        let dest = tool_dir.join(&release.version).join(self.arch.index_key());
        if dest.exists() {
            // stale partial install
            std::fs::remove_dir_all(&dest)?;
        }

        let work = tempfile::tempdir()?;
        let archive = fetch::download(&release.url, release.checksum.as_deref(), work.path()).await?;
        fetch::extract_into(&archive, &dest)?;
        fetch::flatten_single_subdir(&dest)?;

        tracing::info!("installed Java {} at {}", release.version, dest.display());
        Ok(Installation {
            version: release.version.clone(),
            path: dest,
        })
    }

    fn activate(&self, env: &mut Env, installation: &Installation) {
        let home = installation.path.display().to_string();
        let major = version::normalize(&installation.version)
            .map(|v| v.version.major)
            .unwrap_or_default();

        env.export("JAVA_HOME", &home);
        env.export("JAVA_VERSION", &installation.version);
        env.export(
            format!("JAVA_HOME_{}_{}", major, self.arch.index_key().to_uppercase()),
            &home,
        );
        env.add_path(&installation.path.join("bin"));

        env.report("distribution", self.resolver.distribution());
        env.report("path", home);
        env.report("version", &installation.version);
    }
}

/// Tool-cache base: the runner's shared cache when hosted, a home-relative
/// cache otherwise.
fn cache_root(env: &Env) -> PathBuf {
    env.get("RUNNER_TOOL_CACHE")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache").join("codesign-action")))
        .unwrap_or_else(std::env::temp_dir)
}

/// Scans `<tool_dir>/<version>/<arch>` for installations compatible with the
/// specifier. Prefers versions whose stability matches the request, then the
/// highest by build-aware ordering.
pub fn find_cached(
    tool_dir: &Path,
    version_spec: &str,
    arch: Arch,
) -> Result<Option<Installation>, SignError> {
    let Ok(entries) = std::fs::read_dir(tool_dir) else {
        return Ok(None);
    };

    let want_stable = version::spec_is_stable(version_spec);
    let mut candidates = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Ok(parsed) = version::normalize(&name) else {
            continue;
        };
        if !version::compatible(version_spec, &name).unwrap_or(false) {
            continue;
        }
        let path = entry.path().join(arch.index_key());
        if !path.is_dir() {
            continue;
        }
        candidates.push((parsed, Installation { version: name, path }));
    }

    let preferred = candidates
        .iter()
        .filter(|(v, _)| v.stable == want_stable)
        .max_by(|(a, _), (b, _)| a.version.cmp(&b.version))
        .or_else(|| candidates.iter().max_by(|(a, _), (b, _)| a.version.cmp(&b.version)));

    Ok(preferred.map(|(_, inst)| inst.clone()))
}

/// On macOS the archive nests the real home under `Contents/Home`.
fn adjust_root(installation: Installation, platform: Platform) -> Installation {
    if platform == Platform::MacOs {
        let nested = installation.path.join("Contents").join("Home");
        if nested.is_dir() {
            return Installation {
                version: installation.version,
                path: nested,
            };
        }
    }
    installation
}

/// Path of the `java` launcher under an installation root.
pub fn java_binary(home: &Path, platform: Platform) -> PathBuf {
    let name = if platform == Platform::Windows {
        "java.exe"
    } else {
        "java"
    };
    home.join("bin").join(name)
}
