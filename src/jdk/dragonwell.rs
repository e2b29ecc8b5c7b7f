//! Alibaba Dragonwell release resolution. The distribution publishes a
//! single JSON index keyed by OS, architecture, package type, top-level
//! version, and archive kind.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::SignError;
use crate::platform::{Arch, Platform};
use crate::version;

use super::{ReleaseInfo, ReleaseResolver};

const INDEX_URL: &str = "https://dragonwell-jdk.io/map_with_checksum.json";

#[derive(Debug, Deserialize)]
struct IndexEntry {
    sha256: String,
    download_url: String,
}

pub struct Dragonwell {
    index_url: String,
}

impl Default for Dragonwell {
    fn default() -> Self {
        Dragonwell {
            index_url: INDEX_URL.to_string(),
        }
    }
}

impl ReleaseResolver for Dragonwell {
    fn distribution(&self) -> &'static str {
        "Dragonwell"
    }

    async fn resolve_release(
        &self,
        version_spec: &str,
        platform: Platform,
        arch: Arch,
    ) -> Result<ReleaseInfo, SignError> {
        // Only stable major versions are published in the index.
        if !version::spec_is_stable(version_spec) {
            return Err(SignError::EarlyAccessUnsupported(version_spec.to_string()));
        }

        tracing::debug!("fetching Dragonwell version index: {}", self.index_url);
        let index: serde_json::Value = reqwest::get(&self.index_url).await?.json().await?;
        select_release(&index, version_spec, platform, arch)
    }
}

fn select_release(
    index: &serde_json::Value,
    version_spec: &str,
    platform: Platform,
    arch: Arch,
) -> Result<ReleaseInfo, SignError> {
    let no_match = |available: Vec<String>| SignError::NoCompatibleRelease {
        requested: version_spec.to_string(),
        available,
    };

    let versions = index
        .get(platform.index_os())
        .and_then(|v| v.get(arch.index_key()))
        .and_then(|v| v.get("jdk"))
        .and_then(serde_json::Value::as_object)
        .ok_or_else(|| no_match(Vec::new()))?;

    let available: Vec<String> = versions.keys().cloned().collect();

    let kind = platform.archive_kind().index_key();
    let entry = versions
        .get(version_spec)
        .and_then(|files| files.get(kind))
        .cloned()
        .ok_or_else(|| no_match(available))?;
    let entry: IndexEntry =
        serde_json::from_value(entry).map_err(|e| SignError::Download(e.to_string()))?;

    let sub_version =
        parse_sub_version(&entry.download_url).unwrap_or_else(|| version_spec.to_string());

    Ok(ReleaseInfo {
        version: sub_version,
        url: entry.download_url,
        checksum: Some(entry.sha256),
    })
}

/// The vendor embeds a finer-grained version in the resource path: the
/// digit-led tail of the directory segment preceding the file name.
fn parse_sub_version(url: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| Regex::new(r"(\d[^/]*)/[^/]*$").unwrap());
    re.captures(url).map(|c| c[1].to_string())
}
