//! Loader configuration
//!
//! Every setting is optional. `LoaderConfig::from_env()` reads the
//! `SNAPLOAD_*` environment variables; embedders can build a config
//! directly with the `with_*` methods instead.

use std::path::PathBuf;

/// Explicit native library file (plain path or `file:` URL)
pub const ENV_LIB_PATH: &str = "SNAPLOAD_LIB_PATH";
/// Directory searched for the platform resource name
pub const ENV_LIB_DIR: &str = "SNAPLOAD_LIB_DIR";
/// File name replacing the derived resource name
pub const ENV_LIB_NAME: &str = "SNAPLOAD_LIB_NAME";
/// Directory that bundled binaries are extracted into
pub const ENV_TMPDIR: &str = "SNAPLOAD_TMPDIR";
/// Resolve the library through the system linker search path
pub const ENV_USE_SYSTEM_LIB: &str = "SNAPLOAD_USE_SYSTEM_LIB";
/// Never extract bundled binaries
pub const ENV_DISABLE_BUNDLED: &str = "SNAPLOAD_DISABLE_BUNDLED";
/// Leave extracted binaries on disk at exit
pub const ENV_KEEP_EXTRACTED: &str = "SNAPLOAD_KEEP_EXTRACTED";
/// Override the detected operating system name
pub const ENV_OS: &str = "SNAPLOAD_OS";
/// Override the detected CPU architecture name
pub const ENV_ARCH: &str = "SNAPLOAD_ARCH";
/// Override the expected native version token
pub const ENV_EXPECTED_VERSION: &str = "SNAPLOAD_EXPECTED_VERSION";

/// All environment keys, in display order.
pub const ENV_KEYS: &[&str] = &[
    ENV_LIB_PATH,
    ENV_LIB_DIR,
    ENV_LIB_NAME,
    ENV_TMPDIR,
    ENV_USE_SYSTEM_LIB,
    ENV_DISABLE_BUNDLED,
    ENV_KEEP_EXTRACTED,
    ENV_OS,
    ENV_ARCH,
    ENV_EXPECTED_VERSION,
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderConfig {
    pub lib_path: Option<String>,
    pub lib_dir: Option<PathBuf>,
    pub lib_name: Option<String>,
    pub tmp_dir: Option<PathBuf>,
    pub use_system_lib: bool,
    pub disable_bundled: bool,
    pub keep_extracted: bool,
    pub os_override: Option<String>,
    pub arch_override: Option<String>,
    pub expected_version: Option<String>,
}

impl LoaderConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let flag = |key: &str| get(key).map(|v| parse_bool(&v)).unwrap_or(false);

        Self {
            lib_path: get(ENV_LIB_PATH),
            lib_dir: get(ENV_LIB_DIR).map(PathBuf::from),
            lib_name: get(ENV_LIB_NAME),
            tmp_dir: get(ENV_TMPDIR).map(PathBuf::from),
            use_system_lib: flag(ENV_USE_SYSTEM_LIB),
            disable_bundled: flag(ENV_DISABLE_BUNDLED),
            keep_extracted: flag(ENV_KEEP_EXTRACTED),
            os_override: get(ENV_OS),
            arch_override: get(ENV_ARCH),
            expected_version: get(ENV_EXPECTED_VERSION),
        }
    }

    pub fn with_lib_path(mut self, path: impl Into<String>) -> Self {
        self.lib_path = Some(path.into());
        self
    }

    pub fn with_lib_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lib_dir = Some(dir.into());
        self
    }

    pub fn with_lib_name(mut self, name: impl Into<String>) -> Self {
        self.lib_name = Some(name.into());
        self
    }

    pub fn with_tmp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = Some(dir.into());
        self
    }

    pub fn with_system_lib(mut self, enabled: bool) -> Self {
        self.use_system_lib = enabled;
        self
    }

    pub fn with_bundled_disabled(mut self, disabled: bool) -> Self {
        self.disable_bundled = disabled;
        self
    }

    pub fn with_keep_extracted(mut self, keep: bool) -> Self {
        self.keep_extracted = keep;
        self
    }

    pub fn with_platform(mut self, os: impl Into<String>, arch: impl Into<String>) -> Self {
        self.os_override = Some(os.into());
        self.arch_override = Some(arch.into());
        self
    }

    pub fn with_expected_version(mut self, version: impl Into<String>) -> Self {
        self.expected_version = Some(version.into());
        self
    }

    /// Directory that bundled binaries are extracted into.
    pub fn extraction_dir(&self) -> PathBuf {
        self.tmp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Version token the native library is expected to report.
    pub fn expected_version(&self) -> &str {
        self.expected_version
            .as_deref()
            .unwrap_or(crate::version::EXPECTED_NATIVE_VERSION)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_is_default() {
        let config = LoaderConfig::from_lookup(|_| None);
        assert_eq!(config, LoaderConfig::default());
        assert_eq!(config.extraction_dir(), std::env::temp_dir());
    }

    #[test]
    fn test_reads_all_keys() {
        let config = LoaderConfig::from_lookup(lookup(&[
            (ENV_LIB_PATH, "/opt/snappy/libsnappy.so"),
            (ENV_LIB_DIR, "/opt/snappy"),
            (ENV_LIB_NAME, "libcustom.so"),
            (ENV_TMPDIR, "/var/tmp/snap"),
            (ENV_USE_SYSTEM_LIB, "TRUE"),
            (ENV_DISABLE_BUNDLED, "yes"),
            (ENV_KEEP_EXTRACTED, "0"),
            (ENV_OS, "Darwin"),
            (ENV_ARCH, "arm64"),
            (ENV_EXPECTED_VERSION, "1.2.0"),
        ]));

        assert_eq!(config.lib_path.as_deref(), Some("/opt/snappy/libsnappy.so"));
        assert_eq!(config.lib_dir, Some(PathBuf::from("/opt/snappy")));
        assert_eq!(config.lib_name.as_deref(), Some("libcustom.so"));
        assert_eq!(config.extraction_dir(), PathBuf::from("/var/tmp/snap"));
        assert!(config.use_system_lib);
        assert!(config.disable_bundled);
        assert!(!config.keep_extracted);
        assert_eq!(config.os_override.as_deref(), Some("Darwin"));
        assert_eq!(config.arch_override.as_deref(), Some("arm64"));
        assert_eq!(config.expected_version(), "1.2.0");
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = LoaderConfig::from_lookup(lookup(&[(ENV_LIB_PATH, "   "), (ENV_OS, "")]));
        assert!(config.lib_path.is_none());
        assert!(config.os_override.is_none());
    }
}
