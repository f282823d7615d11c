//! Native binary location and extraction
//!
//! Resolution order, first configured source wins:
//! 1. explicit library file (`SNAPLOAD_LIB_PATH`, plain path or `file:` URL)
//! 2. explicit directory (`SNAPLOAD_LIB_DIR`) joined with the resource name
//! 3. the system linker search path (`SNAPLOAD_USE_SYSTEM_LIB`)
//! 4. a bundled binary, extracted to `{tmpdir}/{stem}-{fingerprint}.{ext}`
//!
//! A configured source that does not exist is an error; there is no
//! fallback to the next source.

use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

use crate::bundle::ResourceBundle;
use crate::cleanup;
use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::platform::PlatformId;

/// Number of digest bytes embedded in extracted file names
const FINGERPRINT_BYTES: usize = 8;

/// Distinguishes concurrent extractions within one process
static EXTRACT_SEQ: AtomicUsize = AtomicUsize::new(0);

/// Where a native binary comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// Bundled with the crate; must be extracted before linking
    Embedded,
    /// Explicit file path from configuration
    FilePath(PathBuf),
    /// Explicit `file:` URL from configuration
    Url(String),
    /// Explicit directory from configuration
    Directory(PathBuf),
    /// Library name resolved by the system linker
    System(String),
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Embedded => write!(f, "bundled"),
            SourceLocation::FilePath(p) => write!(f, "path {}", p.display()),
            SourceLocation::Url(u) => write!(f, "url {}", u),
            SourceLocation::Directory(d) => write!(f, "directory {}", d.display()),
            SourceLocation::System(n) => write!(f, "system library {}", n),
        }
    }
}

/// A resolved, not yet materialized, native binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeBinaryResource {
    pub resource_name: String,
    pub source: SourceLocation,
    /// Filesystem path (or bare library name) handed to the linker.
    /// `None` for bundled binaries until they are extracted.
    pub path: Option<PathBuf>,
}

/// A native binary ready to be linked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLibraryFile {
    pub path: PathBuf,
    pub source: SourceLocation,
    /// Size on disk, when known
    pub size: Option<u64>,
    /// Content was checked against the bundled bytes
    pub verified: bool,
    /// File was written by the extractor and is scheduled for cleanup
    pub temporary: bool,
}

pub struct Locator<'a> {
    config: &'a LoaderConfig,
    bundle: &'a dyn ResourceBundle,
}

impl<'a> Locator<'a> {
    pub fn new(config: &'a LoaderConfig, bundle: &'a dyn ResourceBundle) -> Self {
        Self { config, bundle }
    }

    /// File name expected for `platform`, honoring a configured override.
    pub fn resource_name(&self, platform: &PlatformId) -> String {
        self.config
            .lib_name
            .clone()
            .unwrap_or_else(|| platform.resource_name())
    }

    /// Pick the source of the native binary without touching the disk
    /// beyond existence checks.
    pub fn resolve(&self, platform: &PlatformId) -> Result<NativeBinaryResource, LoadError> {
        let resource_name = self.resource_name(platform);
        let not_found = |searched: String| LoadError::ResourceNotFound {
            resource: resource_name.clone(),
            searched: vec![searched],
        };

        if let Some(raw) = self.config.lib_path.as_deref() {
            let (path, source) = if raw.starts_with("file:") {
                let path = Url::parse(raw)
                    .ok()
                    .and_then(|u| u.to_file_path().ok())
                    .ok_or_else(|| not_found(raw.to_string()))?;
                (path, SourceLocation::Url(raw.to_string()))
            } else {
                let path = PathBuf::from(raw);
                (path.clone(), SourceLocation::FilePath(path))
            };
            if !path.is_file() {
                return Err(not_found(path.display().to_string()));
            }
            return Ok(NativeBinaryResource {
                resource_name,
                source,
                path: Some(path),
            });
        }

        if let Some(dir) = self.config.lib_dir.as_ref() {
            let path = dir.join(&resource_name);
            if !path.is_file() {
                return Err(not_found(path.display().to_string()));
            }
            return Ok(NativeBinaryResource {
                resource_name,
                source: SourceLocation::Directory(dir.clone()),
                path: Some(path),
            });
        }

        if self.config.use_system_lib {
            let name = self
                .config
                .lib_name
                .clone()
                .unwrap_or_else(|| platform.system_library_name());
            return Ok(NativeBinaryResource {
                resource_name,
                source: SourceLocation::System(name.clone()),
                path: Some(PathBuf::from(name)),
            });
        }

        if self.config.disable_bundled {
            return Err(not_found("bundled resources (disabled)".to_string()));
        }

        if self.bundle.find(&resource_name).is_none() {
            return Err(not_found("bundled resources".to_string()));
        }

        Ok(NativeBinaryResource {
            resource_name,
            source: SourceLocation::Embedded,
            path: None,
        })
    }

    /// Resolve the binary for `platform` and make it available on disk.
    pub fn locate(&self, platform: &PlatformId) -> Result<ExtractedLibraryFile, LoadError> {
        let resource = self.resolve(platform)?;
        tracing::debug!(
            resource = %resource.resource_name,
            source = %resource.source,
            "resolved native library"
        );

        match resource.path {
            Some(path) => {
                let size = fs::metadata(&path).ok().map(|m| m.len());
                Ok(ExtractedLibraryFile {
                    path,
                    source: resource.source,
                    size,
                    verified: false,
                    temporary: false,
                })
            }
            None => {
                let bytes = self.bundle.find(&resource.resource_name).ok_or_else(|| {
                    LoadError::ResourceNotFound {
                        resource: resource.resource_name.clone(),
                        searched: vec!["bundled resources".to_string()],
                    }
                })?;
                self.extract(&resource.resource_name, &bytes)
            }
        }
    }

    /// Copy bundled bytes into the extraction directory.
    ///
    /// The file name embeds a content fingerprint, so an identical earlier
    /// extraction is reused and differing content never overwrites it.
    pub fn extract(&self, resource_name: &str, bytes: &[u8]) -> Result<ExtractedLibraryFile, LoadError> {
        let dir = self.config.extraction_dir();
        let digest = Sha256::digest(bytes);
        let target = dir.join(fingerprinted_name(resource_name, &digest));

        fs::create_dir_all(&dir).map_err(|e| LoadError::extraction(&dir, e))?;

        if matches_content(&target, bytes.len() as u64, &digest) {
            tracing::debug!(path = %target.display(), "reusing extracted native library");
        } else {
            write_atomically(&dir, &target, bytes).map_err(|e| LoadError::extraction(&target, e))?;
            if !matches_content(&target, bytes.len() as u64, &digest) {
                return Err(LoadError::extraction(
                    &target,
                    io::Error::new(io::ErrorKind::InvalidData, "extracted content does not match bundled resource"),
                ));
            }
            tracing::debug!(path = %target.display(), size = bytes.len(), "extracted native library");
        }

        if !self.config.keep_extracted {
            cleanup::register(&target);
        }

        Ok(ExtractedLibraryFile {
            path: target,
            source: SourceLocation::Embedded,
            size: Some(bytes.len() as u64),
            verified: true,
            temporary: true,
        })
    }
}

/// `libsnappynative-linux-x86_64-64.so` → `libsnappynative-linux-x86_64-64-<hex>.so`
fn fingerprinted_name(resource_name: &str, digest: &[u8]) -> String {
    let fingerprint = hex::encode(&digest[..FINGERPRINT_BYTES]);
    match resource_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, fingerprint, ext),
        _ => format!("{}-{}", resource_name, fingerprint),
    }
}

fn matches_content(path: &Path, len: u64, digest: &[u8]) -> bool {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() == len => {}
        _ => return false,
    }
    match fs::read(path) {
        Ok(existing) => Sha256::digest(&existing).as_slice() == digest,
        Err(_) => false,
    }
}

fn write_atomically(dir: &Path, target: &Path, bytes: &[u8]) -> io::Result<()> {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = dir.join(format!(
        ".{}.{}-{}.tmp",
        file_name,
        std::process::id(),
        EXTRACT_SEQ.fetch_add(1, Ordering::Relaxed)
    ));

    let result = (|| -> io::Result<()> {
        let mut tmp_file = fs::File::create(&tmp_path)?;
        tmp_file.write_all(bytes)?;
        tmp_file.sync_all()?;
        drop(tmp_file);
        make_executable(&tmp_path)?;
        fs::rename(&tmp_path, target)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
