mod types;

pub use types::*;

use anyhow::{Context, Result};
use mp4forge_media::{builders::pack_language, FourCc};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./mp4forge.toml", "~/.config/mp4forge/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    parse_brand(&config.file.major_brand).context("Invalid major_brand")?;
    for brand in &config.file.compatible_brands {
        parse_brand(brand).context("Invalid compatible_brands entry")?;
    }
    if config.file.compatible_brands.is_empty() {
        tracing::warn!("No compatible brands configured");
    }

    if config.movie.timescale == 0 {
        anyhow::bail!("Movie timescale cannot be 0");
    }

    let video = &config.video;
    if video.track_id == 0 {
        anyhow::bail!("Video track_id cannot be 0");
    }
    pack_language(&video.language).context("Invalid video language")?;
    if let Some([h, v]) = video.pixel_aspect {
        if h == 0 || v == 0 {
            anyhow::bail!("Pixel aspect spacing cannot be 0 (got {}:{})", h, v);
        }
    }
    if !video.track_in_movie && video.track_enabled {
        tracing::warn!("Video track is enabled but not part of the presentation");
    }

    Ok(())
}

fn parse_brand(brand: &str) -> Result<FourCc> {
    FourCc::parse(brand).with_context(|| format!("Brand {:?} is not a 4-character code", brand))
}

impl FileConfig {
    /// Major and compatible brands as type codes.
    pub fn brands(&self) -> Result<(FourCc, Vec<FourCc>)> {
        let major = parse_brand(&self.major_brand)?;
        let compatible = self
            .compatible_brands
            .iter()
            .map(|b| parse_brand(b))
            .collect::<Result<Vec<_>>>()?;
        Ok((major, compatible))
    }
}
