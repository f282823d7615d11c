//! Build script for embedding per-platform native binaries
//!
//! Every file in `native/` whose name starts with the library base name is
//! embedded with `include_bytes!`, and an index of them is generated for
//! `src/bundle.rs`.

use std::env;
use std::fs;
use std::path::Path;

/// Prefixes of embeddable binaries (unix and Windows spellings)
const PREFIXES: &[&str] = &["libsnappynative-", "snappynative-"];

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();

    let native_dir = Path::new(&manifest_dir).join("native");
    println!("cargo:rerun-if-changed={}", native_dir.display());

    let mut binaries = Vec::new();
    if let Ok(entries) = fs::read_dir(&native_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if PREFIXES.iter().any(|p| name.starts_with(p)) {
                println!("cargo:rerun-if-changed={}", path.display());
                binaries.push((name.to_string(), path.clone()));
            }
        }
    }
    binaries.sort();

    let index_path = Path::new(&out_dir).join("native_index.rs");
    fs::write(&index_path, generate_index(&binaries)).expect("Failed to write index");
}

fn generate_index(binaries: &[(String, std::path::PathBuf)]) -> String {
    let mut code = String::new();
    code.push_str("/// Binaries embedded from native/\n");
    code.push_str("pub static BUNDLED: &[BundledBinary] = &[\n");

    for (name, path) in binaries {
        code.push_str(&format!(
            "    BundledBinary {{ name: {:?}, bytes: include_bytes!({:?}) }},\n",
            name,
            path.display().to_string()
        ));
    }

    code.push_str("];\n");
    code
}
