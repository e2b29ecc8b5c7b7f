//! Artifact download and archive extraction, shared by the JDK installer
//! and the CodeSignTool installer.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::SignError;

/// Downloads `url` into `dest_dir`, naming the file after the URL's last
/// path segment. Use [`download_named`] when the URL ends in a slug rather
/// than an archive file name.
pub async fn download(
    url: &str,
    expected_sha256: Option<&str>,
    dest_dir: &Path,
) -> Result<PathBuf, SignError> {
    let file_name = file_name_from_url(url).to_string();
    download_named(url, expected_sha256, dest_dir, &file_name).await
}

/// Downloads `url` into `dest_dir/file_name`, reusing an existing file when
/// its checksum still matches. With no expected checksum an existing file is
/// always re-downloaded.
pub async fn download_named(
    url: &str,
    expected_sha256: Option<&str>,
    dest_dir: &Path,
    file_name: &str,
) -> Result<PathBuf, SignError> {
    std::fs::create_dir_all(dest_dir)?;
    let dest = dest_dir.join(file_name);

    if dest.exists() {
        if let Some(expected) = expected_sha256 {
            if sha256_hex(&dest)? == expected {
                tracing::info!("archive already downloaded and verified");
                return Ok(dest);
            }
        }
        std::fs::remove_file(&dest)?;
    }

    tracing::info!("downloading {url}");

    let response = reqwest::get(url)
        .await
        .map_err(|e| SignError::Download(format!("request failed: {e}")))?;
    if !response.status().is_success() {
        return Err(SignError::Download(format!(
            "{url} returned HTTP {}",
            response.status()
        )));
    }

    let total_size = response.content_length().unwrap_or(0);
    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap()
            .progress_chars("=> "),
    );
    pb.set_message("Downloading");

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SignError::Download(format!("download stream failed: {e}")))?;
    pb.inc(bytes.len() as u64);

    let mut file = tokio::fs::File::create(&dest).await?;
    file.write_all(&bytes).await?;
    file.flush().await?;
    drop(file);

    pb.finish_with_message("Download complete");

    if let Some(expected) = expected_sha256 {
        let actual = sha256_hex(&dest)?;
        if actual != expected {
            std::fs::remove_file(&dest)?;
            return Err(SignError::ChecksumMismatch {
                expected: expected.to_string(),
                actual,
            });
        }
    }

    Ok(dest)
}

fn file_name_from_url(url: &str) -> &str {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .unwrap_or("download.bin")
}

/// Extracts an archive into `dest`, dispatching on the file extension.
pub fn extract_into(archive: &Path, dest: &Path) -> Result<(), SignError> {
    std::fs::create_dir_all(dest)?;

    let file_name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SignError::Download("invalid archive path".into()))?;

    if file_name.ends_with(".tar.gz") || file_name.ends_with(".tgz") {
        extract_tar_gz(archive, dest)
    } else if file_name.ends_with(".zip") {
        extract_zip(archive, dest)
    } else {
        Err(SignError::UnknownArchiveFormat(file_name.to_string()))
    }
}

fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<(), SignError> {
    let file = std::fs::File::open(archive)?;
    let decoder = flate2::read::GzDecoder::new(file);
    let mut tar = tar::Archive::new(decoder);
    tar.unpack(dest)?;
    Ok(())
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<(), SignError> {
    let file = std::fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;
    zip.extract(dest)?;
    Ok(())
}

/// Vendor archives wrap their content in one top-level directory; move that
/// content up so `dir` is the artifact root.
pub fn flatten_single_subdir(dir: &Path) -> Result<(), SignError> {
    let entries: Vec<_> = std::fs::read_dir(dir)?.filter_map(|e| e.ok()).collect();

    if entries.len() == 1 && entries[0].path().is_dir() {
        let subdir = entries[0].path();
        let temp = dir.join("__flatten_temp__");
        std::fs::rename(&subdir, &temp)?;

        for entry in std::fs::read_dir(&temp)? {
            let entry = entry?;
            std::fs::rename(entry.path(), dir.join(entry.file_name()))?;
        }
        std::fs::remove_dir(&temp)?;
    }

    Ok(())
}

/// First top-level entry of an extraction directory, used when the archive
/// root itself is the artifact (CodeSignTool zips).
pub fn first_top_level_entry(dir: &Path) -> Result<PathBuf, SignError> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();
    entries
        .into_iter()
        .next()
        .ok_or_else(|| SignError::ToolInstall(format!("{} is empty", dir.display())))
}

pub fn sha256_hex(path: &Path) -> Result<String, SignError> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sha256_hex_is_deterministic() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("test.bin");
        std::fs::write(&file, b"hello world").unwrap();

        let h1 = sha256_hex(&file).unwrap();
        let h2 = sha256_hex(&file).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn file_name_from_url_takes_last_segment() {
        assert_eq!(
            file_name_from_url("https://example.com/11.0.2/jdk.tar.gz"),
            "jdk.tar.gz"
        );
        // Slug-style URLs yield no usable archive name; callers must use
        // download_named for those.
        assert_eq!(
            file_name_from_url("https://www.ssl.com/download/codesigntool-for-linux-and-macos/"),
            "codesigntool-for-linux-and-macos"
        );
    }

    #[test]
    fn extract_rejects_unknown_format() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("tool.rar");
        std::fs::write(&archive, b"not really").unwrap();

        let err = extract_into(&archive, &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, SignError::UnknownArchiveFormat(_)));
    }

    #[test]
    fn extract_tar_gz_round_trip() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("payload");
        std::fs::create_dir_all(root.join("bin")).unwrap();
        std::fs::write(root.join("bin").join("java"), b"fake").unwrap();

        let archive = dir.path().join("payload.tar.gz");
        let file = std::fs::File::create(&archive).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut tar = tar::Builder::new(encoder);
        tar.append_dir_all("payload", &root).unwrap();
        tar.into_inner().unwrap().finish().unwrap();

        let out = dir.path().join("out");
        extract_into(&archive, &out).unwrap();
        assert!(out.join("payload").join("bin").join("java").exists());
    }

    #[test]
    fn flatten_single_subdir_flattens() {
        let dir = tempdir().unwrap();
        let subdir = dir.path().join("jdk-11.0.2");
        std::fs::create_dir_all(subdir.join("bin")).unwrap();
        std::fs::write(subdir.join("bin").join("java"), b"java").unwrap();
        std::fs::write(subdir.join("release"), b"release").unwrap();

        flatten_single_subdir(dir.path()).unwrap();

        assert!(dir.path().join("bin").join("java").exists());
        assert!(dir.path().join("release").exists());
        assert!(!dir.path().join("jdk-11.0.2").exists());
    }

    #[test]
    fn flatten_single_subdir_noop_for_multiple_entries() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();

        flatten_single_subdir(dir.path()).unwrap();

        assert!(dir.path().join("a").exists());
        assert!(dir.path().join("b").exists());
    }

    #[test]
    fn first_top_level_entry_picks_first_sorted() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("CodeSignTool-v1.3.0")).unwrap();

        let entry = first_top_level_entry(dir.path()).unwrap();
        assert!(entry.ends_with("CodeSignTool-v1.3.0"));
    }

    #[test]
    fn first_top_level_entry_errors_on_empty_dir() {
        let dir = tempdir().unwrap();
        assert!(first_top_level_entry(dir.path()).is_err());
    }
}
