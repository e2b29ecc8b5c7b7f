use semver::{BuildMetadata, Version, VersionReq};

use crate::error::SignError;

/// A Java version in canonical comparable form. Early-access markers
/// (`-ea`, `-ea.N`) are stripped during normalization and remembered
/// as `stable = false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaVersion {
    pub version: Version,
    pub stable: bool,
}

/// Normalizes a raw vendor version string (`"11"`, `"11.0.2+9"`,
/// `"15-ea.2"`, `"11.0.20.17.8"`) into a comparable form. Components
/// beyond major.minor.patch are dropped; build metadata is preserved.
pub fn normalize(raw: &str) -> Result<JavaVersion, SignError> {
    let raw = raw.trim();
    let (core, stable) = match raw.find("-ea") {
        Some(idx) => (&raw[..idx], false),
        None => (raw, true),
    };

    let (numbers, build) = match core.split_once('+') {
        Some((n, b)) => (n, Some(b)),
        None => (core, None),
    };

    let mut parts = numbers.split('.');
    let major = parse_component(parts.next().unwrap_or(""), raw)?;
    let minor = match parts.next() {
        Some(p) => parse_component(p, raw)?,
        None => 0,
    };
    let patch = match parts.next() {
        Some(p) => parse_component(p, raw)?,
        None => 0,
    };

    let mut version = Version::new(major, minor, patch);
    if let Some(build) = build {
        version.build = BuildMetadata::new(build).map_err(|e| SignError::BadVersionSpec {
            spec: raw.to_string(),
            reason: e.to_string(),
        })?;
    }

    Ok(JavaVersion { version, stable })
}

fn parse_component(part: &str, raw: &str) -> Result<u64, SignError> {
    part.parse::<u64>().map_err(|_| SignError::BadVersionSpec {
        spec: raw.to_string(),
        reason: format!("'{part}' is not a number"),
    })
}

/// Tests `candidate` against `range`. A range carrying build metadata
/// demands an exact build-aware match; anything else is treated as a
/// semver range (`"11"` accepts any `11.x.y`).
pub fn compatible(range: &str, candidate: &str) -> Result<bool, SignError> {
    let candidate = normalize(candidate)?;
    if range.contains('+') {
        let exact = normalize(range)?;
        return Ok(exact.version == candidate.version);
    }

    let req = VersionReq::parse(range.trim()).map_err(|e| SignError::BadVersionSpec {
        spec: range.to_string(),
        reason: e.to_string(),
    })?;
    Ok(req.matches(&candidate.version))
}

/// Validates a version specifier up front, before any network access.
pub fn validate_spec(spec: &str) -> Result<(), SignError> {
    if spec.contains('+') {
        normalize(spec).map(|_| ())
    } else {
        VersionReq::parse(spec.trim())
            .map(|_| ())
            .map_err(|e| SignError::BadVersionSpec {
                spec: spec.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Whether a specifier asks for a stable release (no early-access marker).
pub fn spec_is_stable(spec: &str) -> bool {
    !spec.contains("-ea")
}
