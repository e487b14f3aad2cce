// src/component/platform.rs

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    Linux,
    Windows,
    MacOs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    X64,
    Arm64,
}

/// OS + CPU architecture pair, rendered as `linux-x64`, `win-arm64`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: OsFamily,
    pub arch: Architecture,
}

impl Platform {
    pub fn new(os: OsFamily, arch: Architecture) -> Self {
        Self { os, arch }
    }

    /// The platform this process is running on.
    pub fn current() -> Self {
        let os = if cfg!(target_os = "windows") {
            OsFamily::Windows
        } else if cfg!(target_os = "macos") {
            OsFamily::MacOs
        } else {
            OsFamily::Linux
        };
        let arch = if cfg!(target_arch = "aarch64") {
            Architecture::Arm64
        } else {
            Architecture::X64
        };
        Self { os, arch }
    }

    /// True when `list` (comma separated platform names) names this platform.
    pub fn is_listed_in(&self, list: &str) -> bool {
        let me = self.to_string();
        list.split(',')
            .map(str::trim)
            .any(|entry| entry.eq_ignore_ascii_case(&me))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let os = match self.os {
            OsFamily::Linux => "linux",
            OsFamily::Windows => "win",
            OsFamily::MacOs => "osx",
        };
        let arch = match self.arch {
            Architecture::X64 => "x64",
            Architecture::Arm64 => "arm64",
        };
        write!(f, "{os}-{arch}")
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (os, arch) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("invalid platform '{s}'; expected <os>-<arch>"))?;
        let os = match os.to_ascii_lowercase().as_str() {
            "linux" => OsFamily::Linux,
            "win" => OsFamily::Windows,
            "osx" => OsFamily::MacOs,
            other => return Err(format!("unknown OS '{other}'")),
        };
        let arch = match arch.to_ascii_lowercase().as_str() {
            "x64" => Architecture::X64,
            "arm64" => Architecture::Arm64,
            other => return Err(format!("unknown architecture '{other}'")),
        };
        Ok(Self { os, arch })
    }
}
