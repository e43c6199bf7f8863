mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    normalize_extensions(&mut config.extract.extensions);

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./motionphoto.toml",
        "~/.config/motionphoto/config.toml",
        "/etc/motionphoto/config.toml",
    ];

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

/// Extensions are compared without a leading dot
fn normalize_extensions(extensions: &mut [String]) {
    for ext in extensions.iter_mut() {
        *ext = ext.trim_start_matches('.').to_lowercase();
    }
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.extract.extensions.is_empty() {
        anyhow::bail!("extract.extensions cannot be empty");
    }

    if config.extract.extensions.iter().any(|e| e.is_empty()) {
        anyhow::bail!("extract.extensions cannot contain an empty extension");
    }

    if config.extract.output_suffix.is_empty() {
        anyhow::bail!("extract.output_suffix cannot be empty");
    }

    if config.scan.max_vendor_box_size < 8 {
        anyhow::bail!(
            "scan.max_vendor_box_size must be at least 8 bytes, got {}",
            config.scan.max_vendor_box_size
        );
    }

    let brand = &config.extract.required_major_brand;
    if !brand.is_empty() && brand.len() != 4 {
        anyhow::bail!(
            "extract.required_major_brand must be a four-character code, got {:?}",
            brand
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.extract.accepts_extension("HEIC"));
        assert!(config.extract.accepts_extension("jpeg"));
        assert!(!config.extract.accepts_extension("png"));
        assert_eq!(config.extract.required_major_brand, "mp42");
        assert_eq!(config.extract.output_suffix, "-motion.mp4");
        assert_eq!(config.scan.max_vendor_box_size, 256 * 1024 * 1024);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("motionphoto.toml");
        fs::write(
            &path,
            r#"
[extract]
extensions = [".HEIC"]
overwrite = true

[scan]
max_vendor_box_size = 1048576
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.extract.extensions, vec!["heic"]);
        assert!(config.extract.overwrite);
        assert!(!config.extract.payload_only);
        assert_eq!(config.extract.required_major_brand, "mp42");
        assert_eq!(config.scan.max_vendor_box_size, 1_048_576);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");

        fs::write(&path, "[scan]\nmax_vendor_box_size = 4\n").unwrap();
        assert!(load_config(&path).is_err());

        fs::write(&path, "[extract]\nextensions = []\n").unwrap();
        assert!(load_config(&path).is_err());

        fs::write(&path, "[extract]\nextensions = [\"jpg\", \".\"]\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("empty extension"));

        fs::write(&path, "[extract]\nrequired_major_brand = \"mp4\"\n").unwrap();
        assert!(load_config(&path).is_err());

        fs::write(&path, "[extract\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(load_config_or_default(Some(&missing)).is_err());
    }
}
