//! `snapload info` — Display platform and configuration.

use snapload::config::ENV_KEYS;
use snapload::{LoaderConfig, PlatformId, EXPECTED_NATIVE_VERSION};

pub fn execute() -> anyhow::Result<()> {
    let config = LoaderConfig::from_env();

    println!("Snapload v{}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("Host:         {} ({})", std::env::consts::OS, std::env::consts::ARCH);
    match PlatformId::resolve(&config) {
        Ok(platform) => {
            println!("Platform:     {}", platform);
            println!("Resource:     {}", platform.resource_name());
            println!("System lib:   {}", platform.system_library_name());
        }
        Err(e) => println!("Platform:     {}", e),
    }
    println!("Expected:     {} (built against {})", config.expected_version(), EXPECTED_NATIVE_VERSION);
    println!("Extract to:   {}", config.extraction_dir().display());

    println!();
    println!("Environment:");
    for key in ENV_KEYS {
        match std::env::var(key) {
            Ok(val) => println!("  {} = {}", key, val),
            Err(_) => println!("  {} = (default)", key),
        }
    }

    Ok(())
}
