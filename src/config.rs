//! Configuration management.
//!
//! Loads configuration from a TOML file and provides runtime defaults. Every
//! field has a default, so a partial file (or none at all) is valid.

use crate::error::ConfigError;
use crate::models::EngineKind;
use crate::transform::{TransformKind, TransformParams, resample};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Logging and process-wide settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Transform sequence, rescaling and tiling
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Engine selection and neural localizer
    #[serde(default)]
    pub engines: EngineConfig,

    /// Background window polling
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Interactive region scans
    #[serde(default)]
    pub scan: ScanConfig,

    /// Global hotkey bindings
    #[serde(default)]
    pub hotkeys: HotkeyConfig,
}

/// General settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when RUST_LOG is unset (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Detection pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Transforms retried after the raw frame, in order
    #[serde(default = "default_transforms")]
    pub transforms: Vec<TransformKind>,

    /// Adaptive threshold neighbourhood (odd, >= 3)
    #[serde(default = "default_adaptive_block_size")]
    pub adaptive_block_size: usize,

    /// Adaptive threshold offset
    #[serde(default = "default_adaptive_c")]
    pub adaptive_c: i32,

    /// CLAHE clip limit
    #[serde(default = "default_clahe_clip_limit")]
    pub clahe_clip_limit: f32,

    /// CLAHE tiles per side
    #[serde(default = "default_clahe_grid")]
    pub clahe_grid: usize,

    /// Rescale factors tried on the raw frame after the transforms
    #[serde(default = "default_scales")]
    pub scales: Vec<f32>,

    /// Upscales are skipped when the long side would exceed this
    #[serde(default = "default_max_upscaled_side")]
    pub max_upscaled_side: usize,

    /// Downscales are skipped when the short side would drop below this
    #[serde(default = "default_min_downscaled_side")]
    pub min_downscaled_side: usize,

    /// Frames with a side longer than this get the tiled scan
    #[serde(default = "default_tiling_threshold")]
    pub tiling_threshold: usize,

    /// Square tile side in pixels
    #[serde(default = "default_tile_size")]
    pub tile_size: usize,

    /// Distance between tile origins
    #[serde(default = "default_tile_stride")]
    pub tile_stride: usize,

    /// Upper bound on tiles scanned per frame; unlimited when unset
    #[serde(default)]
    pub max_tiles: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            transforms: default_transforms(),
            adaptive_block_size: default_adaptive_block_size(),
            adaptive_c: default_adaptive_c(),
            clahe_clip_limit: default_clahe_clip_limit(),
            clahe_grid: default_clahe_grid(),
            scales: default_scales(),
            max_upscaled_side: default_max_upscaled_side(),
            min_downscaled_side: default_min_downscaled_side(),
            tiling_threshold: default_tiling_threshold(),
            tile_size: default_tile_size(),
            tile_stride: default_tile_stride(),
            max_tiles: None,
        }
    }
}

impl PipelineConfig {
    /// Reject settings that would make a transform or rescale fail on every frame
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_size == 0 || self.tile_stride == 0 {
            return Err(ConfigError::Invalid(
                "pipeline.tile_size and tile_stride must be non-zero".into(),
            ));
        }
        if self.tile_size < self.tile_stride {
            return Err(ConfigError::Invalid(format!(
                "pipeline.tile_size ({}) is smaller than tile_stride ({})",
                self.tile_size, self.tile_stride
            )));
        }
        if self.adaptive_block_size < 3 || self.adaptive_block_size % 2 == 0 {
            return Err(ConfigError::Invalid(format!(
                "pipeline.adaptive_block_size must be odd and >= 3, got {}",
                self.adaptive_block_size
            )));
        }
        if let Some(bad) = self.scales.iter().find(|s| !s.is_finite() || **s <= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "pipeline.scales must be positive, got {}",
                bad
            )));
        }
        if self.max_upscaled_side > resample::MAX_SIDE {
            return Err(ConfigError::Invalid(format!(
                "pipeline.max_upscaled_side ({}) exceeds the resampler limit {}",
                self.max_upscaled_side,
                resample::MAX_SIDE
            )));
        }
        if self.clahe_grid == 0 || self.clahe_clip_limit.is_nan() || self.clahe_clip_limit <= 0.0 {
            return Err(ConfigError::Invalid(
                "pipeline CLAHE grid and clip limit must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Parameters for the parameterised transforms
    pub fn transform_params(&self) -> TransformParams {
        TransformParams {
            adaptive_block_size: self.adaptive_block_size,
            adaptive_c: self.adaptive_c,
            clahe_clip_limit: self.clahe_clip_limit,
            clahe_grid: self.clahe_grid,
        }
    }
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engines allowed to run; the rest are reported as disabled
    #[serde(default = "default_enabled_engines")]
    pub enabled: Vec<EngineKind>,

    /// Localizer model settings
    #[serde(default)]
    pub neural: NeuralConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_engines(),
            neural: NeuralConfig::default(),
        }
    }
}

/// Neural localizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralConfig {
    /// TorchScript localizer model
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// Square model input side
    #[serde(default = "default_input_size")]
    pub input_size: u32,

    /// Minimum box confidence
    #[serde(default = "default_confidence")]
    pub confidence: f32,

    /// Crop padding as a fraction of the box's longer side
    #[serde(default = "default_crop_padding")]
    pub padding: f32,

    /// Crops are upscaled until their short side reaches this
    #[serde(default = "default_crop_min_side")]
    pub min_side: usize,
}

impl Default for NeuralConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            input_size: default_input_size(),
            confidence: default_confidence(),
            padding: default_crop_padding(),
            min_side: default_crop_min_side(),
        }
    }
}

/// Window monitor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Pause between polling ticks
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Window title substring to watch
    #[serde(default = "default_target")]
    pub target: String,

    /// Per-tick detect budget; a late detect counts as "not found"
    #[serde(default)]
    pub detect_timeout_ms: Option<u64>,

    /// Whether results should raise a desktop notification
    #[serde(default = "default_true")]
    pub notifications: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            target: default_target(),
            detect_timeout_ms: None,
            notifications: true,
        }
    }
}

impl MonitorConfig {
    /// Poll interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Detect timeout as a duration
    pub fn detect_timeout(&self) -> Option<Duration> {
        self.detect_timeout_ms.map(Duration::from_millis)
    }

    /// How long to wait for `ticks` polling rounds, with a minute of slack
    pub fn ticks_budget(&self, ticks: u64) -> Duration {
        let rounds = u32::try_from(ticks.saturating_add(1)).unwrap_or(u32::MAX);
        self.poll_interval()
            .saturating_mul(rounds)
            .saturating_add(Duration::from_secs(60))
    }
}

/// Region scan settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Pixels added around a user-selected region
    #[serde(default = "default_region_padding")]
    pub region_padding: u32,

    /// Extra pixels added for the single widening retry
    #[serde(default = "default_widen_by")]
    pub widen_by: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            region_padding: default_region_padding(),
            widen_by: default_widen_by(),
        }
    }
}

/// Hotkey settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotkeyConfig {
    /// Chord that triggers a manual capture
    #[serde(default = "default_capture_hotkey")]
    pub capture: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            capture: default_capture_hotkey(),
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_transforms() -> Vec<TransformKind> {
    TransformKind::DEFAULT_SEQUENCE.to_vec()
}

fn default_adaptive_block_size() -> usize {
    11
}

fn default_adaptive_c() -> i32 {
    2
}

fn default_clahe_clip_limit() -> f32 {
    2.0
}

fn default_clahe_grid() -> usize {
    8
}

fn default_scales() -> Vec<f32> {
    vec![2.0, 0.5]
}

fn default_max_upscaled_side() -> usize {
    1600
}

fn default_min_downscaled_side() -> usize {
    200
}

fn default_tiling_threshold() -> usize {
    400
}

fn default_tile_size() -> usize {
    400
}

fn default_tile_stride() -> usize {
    200
}

fn default_enabled_engines() -> Vec<EngineKind> {
    EngineKind::ALL.to_vec()
}

fn default_input_size() -> u32 {
    640
}

fn default_confidence() -> f32 {
    0.5
}

fn default_crop_padding() -> f32 {
    0.15
}

fn default_crop_min_side() -> usize {
    256
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_target() -> String {
    "WhatsApp".to_string()
}

fn default_region_padding() -> u32 {
    50
}

fn default_widen_by() -> u32 {
    50
}

fn default_capture_hotkey() -> String {
    "win+z".to_string()
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    pub fn load() -> Self {
        let path = Self::default_config_path();
        match Self::load_from_path(&path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", path);
                config
            }
            Err(ConfigError::Io { .. }) => {
                info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
            Err(e) => {
                warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Read, parse and validate a config file
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("screen_qr")
            .join("config.toml")
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(path, self.to_toml()?).map_err(io_error)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Serialise as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values the pipeline and monitor cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()?;
        if self.monitor.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("monitor.poll_interval_ms must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pipeline.tile_size, 400);
        assert_eq!(config.pipeline.tile_stride, 200);
        assert_eq!(config.pipeline.transforms, TransformKind::DEFAULT_SEQUENCE.to_vec());
        assert_eq!(config.monitor.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.monitor.target, "WhatsApp");
        assert_eq!(config.hotkeys.capture, "win+z");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[general]
log_level = "debug"

[pipeline]
transforms = ["otsu", "invert"]
max_tiles = 12

[engines]
enabled = ["geometric", "linear"]

[monitor]
poll_interval_ms = 500
detect_timeout_ms = 1500
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(
            config.pipeline.transforms,
            vec![TransformKind::Otsu, TransformKind::Invert]
        );
        assert_eq!(config.pipeline.max_tiles, Some(12));
        assert_eq!(config.pipeline.tile_size, 400);
        assert_eq!(config.engines.enabled, vec![EngineKind::Geometric, EngineKind::Linear]);
        assert_eq!(config.monitor.detect_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.monitor.target, "WhatsApp");
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.pipeline.tile_stride = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.pipeline.tile_size = 100;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.adaptive_block_size = 10;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.scales = vec![2.0, -0.5];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.max_upscaled_side = 100_000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.tile_size = 0;
        config.pipeline.tile_stride = 0;
        assert!(config.pipeline.validate().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join(format!("screen_qr_config_{}", std::process::id()));
        let path = dir.join("config.toml");
        let mut config = Config::default();
        config.monitor.target = "Signal".into();
        config.pipeline.max_tiles = Some(4);

        config.save_to_path(&path).unwrap();
        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_strict_load_errors() {
        let path = Path::new("/nonexistent/screen_qr/config.toml");
        assert!(matches!(
            Config::load_from_path(path),
            Err(ConfigError::Io { .. })
        ));

        let dir = std::env::temp_dir().join(format!("screen_qr_bad_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let bad = dir.join("config.toml");
        std::fs::write(&bad, "[pipeline]\ntile_stride = \"wide\"\n").unwrap();
        assert!(matches!(Config::load_from_path(&bad), Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_ticks_budget_saturates() {
        let monitor = MonitorConfig::default();
        assert_eq!(monitor.ticks_budget(2), Duration::from_secs(66));
        // 2^32 ticks must not truncate to a single round
        assert!(monitor.ticks_budget(1 << 32) > Duration::from_secs(u32::MAX as u64));
        assert_eq!(monitor.ticks_budget(u64::MAX), monitor.ticks_budget(u64::MAX - 1));
    }
}
