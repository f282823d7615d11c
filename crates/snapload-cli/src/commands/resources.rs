//! `snapload resources` — List bundled binaries.

use snapload::{EmbeddedBundle, LoaderConfig, PlatformId, ResourceBundle};

pub fn execute() -> anyhow::Result<()> {
    let names = EmbeddedBundle.names();
    if names.is_empty() {
        println!("No bundled binaries.");
        return Ok(());
    }

    let current = PlatformId::resolve(&LoaderConfig::from_env())
        .ok()
        .map(|p| p.resource_name());
    for name in names {
        let size = EmbeddedBundle.find(&name).map(|b| b.len()).unwrap_or(0);
        let marker = if current.as_deref() == Some(name.as_str()) { "*" } else { " " };
        println!("{} {} ({} bytes)", marker, name, size);
    }
    Ok(())
}
