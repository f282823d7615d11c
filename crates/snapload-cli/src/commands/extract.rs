//! `snapload extract` — Write the bundled binary to disk without linking it.

use std::path::PathBuf;

use snapload::{EmbeddedBundle, LoaderConfig, Locator, PlatformId};

pub fn execute(out: Option<PathBuf>) -> anyhow::Result<()> {
    let mut config = LoaderConfig::from_env()
        .with_keep_extracted(true)
        .with_bundled_disabled(false);
    // Only the bundled source is relevant here.
    config.lib_path = None;
    config.lib_dir = None;
    config.use_system_lib = false;
    if let Some(dir) = out {
        config = config.with_tmp_dir(dir);
    }

    let platform = PlatformId::resolve(&config)?;
    let file = Locator::new(&config, &EmbeddedBundle).locate(&platform)?;

    println!("{}", file.path.display());
    Ok(())
}
