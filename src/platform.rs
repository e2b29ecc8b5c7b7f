#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X64,
    Aarch64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }

    /// Key used for this OS in the JDK version index document.
    pub fn index_os(self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::MacOs => "macos",
            Platform::Windows => "windows",
        }
    }

    /// Archives ship as zip on Windows and tar.gz everywhere else.
    pub fn archive_kind(self) -> ArchiveKind {
        match self {
            Platform::Windows => ArchiveKind::Zip,
            _ => ArchiveKind::TarGz,
        }
    }
}

impl Arch {
    pub fn current() -> Self {
        if cfg!(target_arch = "aarch64") {
            Arch::Aarch64
        } else {
            Arch::X64
        }
    }

    pub fn index_key(self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::Aarch64 => "aarch64",
        }
    }
}

impl ArchiveKind {
    pub fn index_key(self) -> &'static str {
        match self {
            ArchiveKind::Zip => "zip",
            ArchiveKind::TarGz => "tar.gz",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_uses_zip_archives() {
        assert_eq!(Platform::Windows.archive_kind(), ArchiveKind::Zip);
    }

    #[test]
    fn unix_platforms_use_tar_gz() {
        assert_eq!(Platform::Linux.archive_kind(), ArchiveKind::TarGz);
        assert_eq!(Platform::MacOs.archive_kind(), ArchiveKind::TarGz);
    }

    #[test]
    fn index_keys_are_lowercase_tokens() {
        assert_eq!(Platform::MacOs.index_os(), "macos");
        assert_eq!(Arch::X64.index_key(), "x64");
        assert_eq!(ArchiveKind::TarGz.index_key(), "tar.gz");
    }
}
