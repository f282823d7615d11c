//! Native entry-point contract and the link primitive
//!
//! The rest of the system depends on a fixed set of exported C symbols.
//! `NativeApi` holds them once resolved; a `Linker` turns a library path
//! into a `LinkedLibrary` carrying that table.

use std::ffi::CStr;
use std::fmt;
use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};

use libloading::Library;

use crate::error::LinkError;

/// Status code returned by the native entry points
pub type NativeStatus = c_int;

pub const STATUS_OK: NativeStatus = 0;
pub const STATUS_INVALID_INPUT: NativeStatus = 1;
pub const STATUS_BUFFER_TOO_SMALL: NativeStatus = 2;

pub const SYM_COMPRESS: &str = "snappy_compress";
pub const SYM_UNCOMPRESS: &str = "snappy_uncompress";
pub const SYM_MAX_COMPRESSED_LENGTH: &str = "snappy_max_compressed_length";
pub const SYM_UNCOMPRESSED_LENGTH: &str = "snappy_uncompressed_length";
pub const SYM_VALIDATE_COMPRESSED_BUFFER: &str = "snappy_validate_compressed_buffer";
pub const SYM_LIBRARY_VERSION: &str = "snappy_native_library_version";

pub type CompressFn =
    unsafe extern "C" fn(*const c_char, usize, *mut c_char, *mut usize) -> NativeStatus;
pub type UncompressFn =
    unsafe extern "C" fn(*const c_char, usize, *mut c_char, *mut usize) -> NativeStatus;
pub type MaxCompressedLengthFn = unsafe extern "C" fn(usize) -> usize;
pub type UncompressedLengthFn =
    unsafe extern "C" fn(*const c_char, usize, *mut usize) -> NativeStatus;
pub type ValidateCompressedBufferFn = unsafe extern "C" fn(*const c_char, usize) -> NativeStatus;
pub type LibraryVersionFn = unsafe extern "C" fn() -> *const c_char;

/// Resolved native entry points
#[derive(Clone, Copy)]
pub struct NativeApi {
    pub compress: CompressFn,
    pub uncompress: UncompressFn,
    pub max_compressed_length: MaxCompressedLengthFn,
    pub uncompressed_length: UncompressedLengthFn,
    pub validate_compressed_buffer: ValidateCompressedBufferFn,
    pub library_version: LibraryVersionFn,
}

impl NativeApi {
    /// Every symbol the library must export.
    pub const SYMBOLS: &'static [&'static str] = &[
        SYM_COMPRESS,
        SYM_UNCOMPRESS,
        SYM_MAX_COMPRESSED_LENGTH,
        SYM_UNCOMPRESSED_LENGTH,
        SYM_VALIDATE_COMPRESSED_BUFFER,
        SYM_LIBRARY_VERSION,
    ];

    /// Resolve the full symbol table from a linked library.
    ///
    /// `path` only labels errors.
    pub fn resolve(library: &Library, path: &Path) -> Result<Self, LinkError> {
        // SAFETY: each symbol is looked up with the signature declared in
        // the native header, and `LinkedLibrary` keeps `library` alive for
        // as long as the table is reachable.
        unsafe {
            Ok(NativeApi {
                compress: entry_point(library, path, SYM_COMPRESS)?,
                uncompress: entry_point(library, path, SYM_UNCOMPRESS)?,
                max_compressed_length: entry_point(library, path, SYM_MAX_COMPRESSED_LENGTH)?,
                uncompressed_length: entry_point(library, path, SYM_UNCOMPRESSED_LENGTH)?,
                validate_compressed_buffer: entry_point(
                    library,
                    path,
                    SYM_VALIDATE_COMPRESSED_BUFFER,
                )?,
                library_version: entry_point(library, path, SYM_LIBRARY_VERSION)?,
            })
        }
    }

    /// Version string reported by the library, if any.
    pub fn version_string(&self) -> Option<String> {
        let ptr = unsafe { (self.library_version)() };
        if ptr.is_null() {
            return None;
        }
        let version = unsafe { CStr::from_ptr(ptr) };
        Some(version.to_string_lossy().into_owned())
    }

    /// Upper bound on the compressed size of `source_length` input bytes.
    pub fn max_compressed_length(&self, source_length: usize) -> usize {
        unsafe { (self.max_compressed_length)(source_length) }
    }

    /// Decoded length recorded in a compressed buffer's header.
    pub fn uncompressed_length(&self, compressed: &[u8]) -> Option<usize> {
        let mut result = 0usize;
        let status = unsafe {
            (self.uncompressed_length)(
                compressed.as_ptr() as *const c_char,
                compressed.len(),
                &mut result,
            )
        };
        (status == STATUS_OK).then_some(result)
    }

    /// Whether `compressed` is a well-formed compressed buffer.
    pub fn is_valid_compressed(&self, compressed: &[u8]) -> bool {
        let status = unsafe {
            (self.validate_compressed_buffer)(
                compressed.as_ptr() as *const c_char,
                compressed.len(),
            )
        };
        status == STATUS_OK
    }
}

impl fmt::Debug for NativeApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeApi")
            .field("symbols", &Self::SYMBOLS)
            .finish()
    }
}

/// A library that has been linked into the process
#[derive(Debug)]
pub struct LinkedLibrary {
    path: PathBuf,
    api: NativeApi,
    // Held for the process lifetime; dropping it would unmap `api`.
    _library: Option<Library>,
}

impl LinkedLibrary {
    /// Wrap entry points that are already present in the process, such as a
    /// statically linked copy of the library.
    pub fn from_api(path: impl Into<PathBuf>, api: NativeApi) -> Self {
        Self {
            path: path.into(),
            api,
            _library: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn api(&self) -> &NativeApi {
        &self.api
    }
}

/// The physical link primitive
///
/// Implementations perform the OS-level act of mapping a binary into the
/// process and resolving its entry points. The bridge guarantees `link` is
/// invoked at most once per process.
pub trait Linker: Send + Sync {
    fn link(&self, path: &Path) -> Result<LinkedLibrary, LinkError>;
}

/// Copy one exported function pointer out of `library`.
unsafe fn entry_point<T: Copy>(library: &Library, path: &Path, symbol: &str) -> Result<T, LinkError> {
    library
        .get::<T>(symbol.as_bytes())
        .map(|sym| *sym)
        .map_err(|e| LinkError::SymbolNotFound {
            symbol: symbol.to_string(),
            library: format!("{}: {}", path.display(), e),
        })
}

/// Map `path` into the process.
///
/// On unix the library is opened `RTLD_NOW | RTLD_LOCAL`, so a binary with
/// unresolved references fails here rather than on first call, and its
/// symbols never leak into other libraries. A bare file name goes through
/// the platform search path.
fn open_library(path: &Path) -> Result<Library, LinkError> {
    #[cfg(unix)]
    let opened = unsafe {
        use libloading::os::unix;
        unix::Library::open(Some(path), unix::RTLD_NOW | unix::RTLD_LOCAL).map(Library::from)
    };
    #[cfg(not(unix))]
    let opened = unsafe { Library::new(path) };

    opened.map_err(|e| match e {
        libloading::Error::CreateCString { .. } => {
            LinkError::InvalidPath(path.display().to_string())
        }
        other => LinkError::NotFound {
            path: path.display().to_string(),
            reason: other.to_string(),
        },
    })
}

/// Links through the platform dynamic linker
#[derive(Debug, Default, Clone, Copy)]
pub struct DynamicLinker;

impl Linker for DynamicLinker {
    fn link(&self, path: &Path) -> Result<LinkedLibrary, LinkError> {
        let library = open_library(path)?;
        let api = NativeApi::resolve(&library, path)?;
        Ok(LinkedLibrary {
            path: path.to_path_buf(),
            api,
            _library: Some(library),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe extern "C" fn fake_codec(
        _input: *const c_char,
        _len: usize,
        _out: *mut c_char,
        _out_len: *mut usize,
    ) -> NativeStatus {
        STATUS_INVALID_INPUT
    }

    unsafe extern "C" fn fake_max_len(n: usize) -> usize {
        32 + n + n / 6
    }

    unsafe extern "C" fn fake_uncompressed_len(
        input: *const c_char,
        len: usize,
        result: *mut usize,
    ) -> NativeStatus {
        if len == 0 {
            return STATUS_INVALID_INPUT;
        }
        *result = *input as u8 as usize;
        STATUS_OK
    }

    unsafe extern "C" fn fake_validate(_input: *const c_char, len: usize) -> NativeStatus {
        if len > 0 {
            STATUS_OK
        } else {
            STATUS_INVALID_INPUT
        }
    }

    unsafe extern "C" fn fake_version() -> *const c_char {
        c"1.1.10".as_ptr()
    }

    unsafe extern "C" fn null_version() -> *const c_char {
        std::ptr::null()
    }

    fn fake_api() -> NativeApi {
        NativeApi {
            compress: fake_codec,
            uncompress: fake_codec,
            max_compressed_length: fake_max_len,
            uncompressed_length: fake_uncompressed_len,
            validate_compressed_buffer: fake_validate,
            library_version: fake_version,
        }
    }

    #[test]
    fn test_safe_wrappers() {
        let api = fake_api();
        assert_eq!(api.version_string().as_deref(), Some("1.1.10"));
        assert_eq!(api.max_compressed_length(60), 102);
        assert_eq!(api.uncompressed_length(&[7, 0]), Some(7));
        assert_eq!(api.uncompressed_length(&[]), None);
        assert!(api.is_valid_compressed(&[1]));
        assert!(!api.is_valid_compressed(&[]));
    }

    #[test]
    fn test_null_version() {
        let api = NativeApi {
            library_version: null_version,
            ..fake_api()
        };
        assert_eq!(api.version_string(), None);
    }

    #[test]
    fn test_dynamic_linker_missing_file() {
        match DynamicLinker.link(Path::new("/nonexistent/libsnappynative.so")) {
            Err(LinkError::NotFound { path, .. }) => {
                assert_eq!(path, "/nonexistent/libsnappynative.so");
            }
            other => panic!("Expected NotFound error, got {:?}", other.map(|l| l.path().to_path_buf())),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_dynamic_linker_rejects_interior_nul() {
        assert!(matches!(
            DynamicLinker.link(Path::new("bad\0name.so")),
            Err(LinkError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_dynamic_linker_rejects_non_library() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libsnappynative-linux-x86_64-64.so");
        std::fs::write(&path, b"not an object file").unwrap();
        assert!(matches!(
            DynamicLinker.link(&path),
            Err(LinkError::NotFound { .. })
        ));
    }
}
