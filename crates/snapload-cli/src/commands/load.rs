//! `snapload load` — Bootstrap the native library and report the outcome.

pub fn execute() -> anyhow::Result<()> {
    let guard = snapload::default_guard();
    tracing::debug!(context = %guard.context().path(), "bootstrapping native library");
    let loaded = guard.loaded()?;

    println!("Platform:     {}", loaded.platform);
    println!("Library:      {}", loaded.library.path().display());
    match &loaded.file {
        Some(file) => {
            println!("Source:       {}", file.source);
            if let Some(size) = file.size {
                println!("Size:         {} bytes", size);
            }
            if file.temporary {
                println!("Extracted:    yes (verified: {})", file.verified);
            }
        }
        None => println!("Source:       already linked in this process"),
    }

    let version = &loaded.version;
    match &version.found {
        Some(found) if version.is_match() => println!("Version:      {}", found),
        Some(found) => println!("Version:      {} (expected {})", found, version.expected),
        None => println!("Version:      unknown (expected {})", version.expected),
    }
    println!("Entry points: {}", snapload::NativeApi::SYMBOLS.join(", "));

    Ok(())
}
