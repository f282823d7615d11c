//! Host platform detection
//!
//! Maps OS and CPU architecture strings onto the small closed set of
//! platforms a native binary is built for, and derives the resource name of
//! that binary.

use std::fmt;

use crate::config::LoaderConfig;
use crate::error::LoadError;

/// Base name shared by every per-platform binary
pub const LIBRARY_BASE_NAME: &str = "snappynative";

/// Library name handed to the system linker when system lookup is enabled
pub const SYSTEM_LIBRARY_NAME: &str = "snappy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    Linux,
    Mac,
    Windows,
    FreeBsd,
    Aix,
    SunOs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchFamily {
    X86,
    X86_64,
    Arm,
    Aarch64,
    Ppc64,
    Ppc64le,
    S390x,
    Riscv64,
    Loongarch64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bitness {
    Bits32,
    Bits64,
}

impl OsFamily {
    /// Normalize an OS name as reported by the environment.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        if name.starts_with("windows") || name == "win32" {
            Some(OsFamily::Windows)
        } else if name.starts_with("mac") || name == "darwin" || name == "osx" {
            Some(OsFamily::Mac)
        } else if name.starts_with("linux") {
            Some(OsFamily::Linux)
        } else if name == "freebsd" {
            Some(OsFamily::FreeBsd)
        } else if name == "aix" {
            Some(OsFamily::Aix)
        } else if name == "sunos" || name == "solaris" || name == "illumos" {
            Some(OsFamily::SunOs)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OsFamily::Linux => "linux",
            OsFamily::Mac => "mac",
            OsFamily::Windows => "windows",
            OsFamily::FreeBsd => "freebsd",
            OsFamily::Aix => "aix",
            OsFamily::SunOs => "sunos",
        }
    }

    /// File name prefix for shared libraries (`lib` everywhere but Windows)
    pub fn library_prefix(self) -> &'static str {
        match self {
            OsFamily::Windows => "",
            _ => "lib",
        }
    }

    /// Platform-native shared library extension, without the dot
    pub fn library_extension(self) -> &'static str {
        match self {
            OsFamily::Windows => "dll",
            OsFamily::Mac => "dylib",
            OsFamily::Aix => "a",
            _ => "so",
        }
    }
}

impl ArchFamily {
    /// Normalize a CPU architecture name as reported by the environment.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        let arch = match name.as_str() {
            "x86_64" | "amd64" | "em64t" | "x64" | "universal" => ArchFamily::X86_64,
            "x86" | "i386" | "i486" | "i586" | "i686" | "pentium" => ArchFamily::X86,
            "aarch64" | "arm64" => ArchFamily::Aarch64,
            "ppc64le" | "powerpc64le" => ArchFamily::Ppc64le,
            "ppc64" | "powerpc64" => ArchFamily::Ppc64,
            "s390x" => ArchFamily::S390x,
            "riscv64" | "riscv64gc" => ArchFamily::Riscv64,
            "loongarch64" => ArchFamily::Loongarch64,
            other if other == "arm" || other.starts_with("armv7") || other.starts_with("armhf") => {
                ArchFamily::Arm
            }
            _ => return None,
        };
        Some(arch)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArchFamily::X86 => "x86",
            ArchFamily::X86_64 => "x86_64",
            ArchFamily::Arm => "arm",
            ArchFamily::Aarch64 => "aarch64",
            ArchFamily::Ppc64 => "ppc64",
            ArchFamily::Ppc64le => "ppc64le",
            ArchFamily::S390x => "s390x",
            ArchFamily::Riscv64 => "riscv64",
            ArchFamily::Loongarch64 => "loongarch64",
        }
    }

    pub fn bitness(self) -> Bitness {
        match self {
            ArchFamily::X86 | ArchFamily::Arm => Bitness::Bits32,
            _ => Bitness::Bits64,
        }
    }
}

impl Bitness {
    pub fn as_str(self) -> &'static str {
        match self {
            Bitness::Bits32 => "32",
            Bitness::Bits64 => "64",
        }
    }
}

/// Canonical identifier of the running platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformId {
    pub os: OsFamily,
    pub arch: ArchFamily,
    pub bitness: Bitness,
}

impl PlatformId {
    /// Detect the running platform, honoring configured overrides.
    pub fn resolve(config: &LoaderConfig) -> Result<Self, LoadError> {
        let os = config
            .os_override
            .as_deref()
            .unwrap_or(std::env::consts::OS);
        let arch = config
            .arch_override
            .as_deref()
            .unwrap_or(std::env::consts::ARCH);
        Self::from_strings(os, arch)
    }

    /// Map raw OS/arch strings onto a platform.
    pub fn from_strings(os: &str, arch: &str) -> Result<Self, LoadError> {
        let unsupported = || LoadError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        };
        let os_family = OsFamily::parse(os).ok_or_else(unsupported)?;
        let arch_family = ArchFamily::parse(arch).ok_or_else(unsupported)?;

        Ok(PlatformId {
            os: os_family,
            arch: arch_family,
            bitness: arch_family.bitness(),
        })
    }

    /// File name of the bundled binary for this platform, e.g.
    /// `libsnappynative-linux-x86_64-64.so`.
    pub fn resource_name(&self) -> String {
        format!(
            "{}{}-{}-{}-{}.{}",
            self.os.library_prefix(),
            LIBRARY_BASE_NAME,
            self.os.as_str(),
            self.arch.as_str(),
            self.bitness.as_str(),
            self.os.library_extension()
        )
    }

    /// Platform file name of the system-installed library, e.g. `libsnappy.so`.
    pub fn system_library_name(&self) -> String {
        format!(
            "{}{}.{}",
            self.os.library_prefix(),
            SYSTEM_LIBRARY_NAME,
            self.os.library_extension()
        )
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{} ({}-bit)",
            self.os.as_str(),
            self.arch.as_str(),
            self.bitness.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_spellings() {
        assert_eq!(OsFamily::parse("Mac OS X"), Some(OsFamily::Mac));
        assert_eq!(OsFamily::parse("Darwin"), Some(OsFamily::Mac));
        assert_eq!(OsFamily::parse("macos"), Some(OsFamily::Mac));
        assert_eq!(OsFamily::parse("Windows 10"), Some(OsFamily::Windows));
        assert_eq!(OsFamily::parse("windows"), Some(OsFamily::Windows));
        assert_eq!(OsFamily::parse("Linux"), Some(OsFamily::Linux));
        assert_eq!(OsFamily::parse("SunOS"), Some(OsFamily::SunOs));
        assert_eq!(OsFamily::parse("plan9"), None);
    }

    #[test]
    fn test_arch_spellings() {
        assert_eq!(ArchFamily::parse("amd64"), Some(ArchFamily::X86_64));
        assert_eq!(ArchFamily::parse("i686"), Some(ArchFamily::X86));
        assert_eq!(ArchFamily::parse("arm64"), Some(ArchFamily::Aarch64));
        assert_eq!(ArchFamily::parse("armv7l"), Some(ArchFamily::Arm));
        assert_eq!(ArchFamily::parse("ppc64le"), Some(ArchFamily::Ppc64le));
        assert_eq!(ArchFamily::parse("sparc"), None);
    }

    #[test]
    fn test_bitness_follows_arch() {
        let p = PlatformId::from_strings("linux", "i386").unwrap();
        assert_eq!(p.bitness, Bitness::Bits32);
        let p = PlatformId::from_strings("linux", "aarch64").unwrap();
        assert_eq!(p.bitness, Bitness::Bits64);
    }

    #[test]
    fn test_resource_names() {
        let linux = PlatformId::from_strings("Linux", "amd64").unwrap();
        assert_eq!(linux.resource_name(), "libsnappynative-linux-x86_64-64.so");
        assert_eq!(linux.system_library_name(), "libsnappy.so");

        let mac = PlatformId::from_strings("Darwin", "arm64").unwrap();
        assert_eq!(mac.resource_name(), "libsnappynative-mac-aarch64-64.dylib");

        let win = PlatformId::from_strings("Windows 11", "x86").unwrap();
        assert_eq!(win.resource_name(), "snappynative-windows-x86-32.dll");
        assert_eq!(win.system_library_name(), "snappy.dll");
    }

    #[test]
    fn test_unsupported_platform() {
        match PlatformId::from_strings("haiku", "x86_64") {
            Err(LoadError::UnsupportedPlatform { os, arch }) => {
                assert_eq!(os, "haiku");
                assert_eq!(arch, "x86_64");
            }
            other => panic!("Expected UnsupportedPlatform, got {:?}", other),
        }
        assert!(PlatformId::from_strings("linux", "mips").is_err());
    }

    #[test]
    fn test_resolve_uses_overrides() {
        let config = LoaderConfig::default().with_platform("Mac OS X", "x86_64");
        let p = PlatformId::resolve(&config).unwrap();
        assert_eq!(p.os, OsFamily::Mac);
        assert_eq!(p.arch, ArchFamily::X86_64);
    }
}
