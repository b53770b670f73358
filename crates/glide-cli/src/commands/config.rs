use anyhow::Result;

use glide_core::GlideConfig;

pub fn run(config: &GlideConfig, save: bool) -> Result<()> {
    print!("{}", config.to_toml()?);

    if save {
        config.save()?;
        println!("\nSaved to {}", GlideConfig::config_path().display());
    }

    Ok(())
}
