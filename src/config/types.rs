use motionphoto_media::heif::DEFAULT_MAX_VENDOR_BOX_SIZE;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub extract: ExtractConfig,

    #[serde(default)]
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractConfig {
    /// File extensions treated as motion photo candidates (case-insensitive)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Major brand the embedded ftyp must declare; empty disables the check
    #[serde(default = "default_major_brand")]
    pub required_major_brand: String,

    /// Appended to the input stem when no output path is given
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,

    /// Replace existing output files
    #[serde(default)]
    pub overwrite: bool,

    /// Write only the mdat payload instead of the whole embedded MP4
    #[serde(default)]
    pub payload_only: bool,
}

fn default_extensions() -> Vec<String> {
    vec!["jpg".to_string(), "jpeg".to_string(), "heic".to_string()]
}

fn default_major_brand() -> String {
    "mp42".to_string()
}

fn default_output_suffix() -> String {
    "-motion.mp4".to_string()
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            required_major_brand: default_major_brand(),
            output_suffix: default_output_suffix(),
            overwrite: false,
            payload_only: false,
        }
    }
}

impl ExtractConfig {
    /// Whether `ext` is one of the configured extensions.
    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Largest sefd box buffered in memory, in bytes
    #[serde(default = "default_max_vendor_box_size")]
    pub max_vendor_box_size: u64,
}

fn default_max_vendor_box_size() -> u64 {
    DEFAULT_MAX_VENDOR_BOX_SIZE
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_vendor_box_size: default_max_vendor_box_size(),
        }
    }
}

impl From<&ScanConfig> for motionphoto_media::ScanOptions {
    fn from(sc: &ScanConfig) -> Self {
        Self {
            max_vendor_box_size: sc.max_vendor_box_size,
        }
    }
}
