use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Language codes following ISO 639-1 with regional variants, or `auto`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the source language should be detected by the backend.
    pub fn is_auto(&self) -> bool {
        self.0.is_empty() || self.0.eq_ignore_ascii_case("auto")
    }
}

fn default_source_lang() -> Lang {
    Lang::new(DEFAULT_SOURCE_LANG)
}

fn default_target_lang() -> Lang {
    Lang::new(DEFAULT_TARGET_LANG)
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Lang {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Lang {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Text color for translation overlay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl TextColor {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub const fn dark_red() -> Self {
        Self::new(0.8, 0.0, 0.0)
    }

    pub const fn blue() -> Self {
        Self::new(0.0, 0.0, 0.8)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "black" => Some(Self::black()),
            "darkred" | "dark_red" | "dark-red" => Some(Self::dark_red()),
            "blue" => Some(Self::blue()),
            _ => None,
        }
    }
}

impl Default for TextColor {
    fn default() -> Self {
        Self::black()
    }
}

/// Which translation service to call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Google's public translate endpoint
    #[default]
    Google,
    /// Any OpenAI-compatible chat completions API
    OpenAi,
}

impl Backend {
    pub const fn default_api_base(self) -> &'static str {
        match self {
            Self::Google => "https://translate.googleapis.com",
            Self::OpenAi => "http://localhost:8080/v1",
        }
    }
}

/// Translator backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default)]
    pub backend: Backend,
    /// Base URL; the backend's default is used when unset
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Upper bound for a single HTTP request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Attempts per block (1 = single attempt, no retry)
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl TranslatorConfig {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    /// Base URL for requests, falling back to the backend default.
    pub fn api_base(&self) -> &str {
        self.api_base
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.backend.default_api_base())
    }
}

fn default_model() -> String {
    "default_model".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_retry_count() -> u32 {
    1
}

const fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            api_base: None,
            api_key: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// How translated text is fitted into a block's box
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Shrink the font until the wrapped text fits the box
    #[default]
    Fit,
    /// Keep the configured font size; overflow is clipped by the box
    Fixed,
}

/// Overlay rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Starting font size in points
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    /// Smallest size `Fit` mode may shrink to
    #[serde(default = "default_min_font_size")]
    pub min_font_size: f32,
    /// Line height as a multiple of font size
    #[serde(default = "default_line_height")]
    pub line_height: f32,
    #[serde(default)]
    pub layout: LayoutMode,
    /// Put the overlay in a toggleable optional content layer
    #[serde(default = "default_true")]
    pub layer: bool,
}

const fn default_font_size() -> f32 {
    9.5
}

const fn default_min_font_size() -> f32 {
    4.0
}

const fn default_line_height() -> f32 {
    1.25
}

const fn default_true() -> bool {
    true
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            min_font_size: default_min_font_size(),
            line_height: default_line_height(),
            layout: LayoutMode::default(),
            layer: true,
        }
    }
}

/// In-memory translation memo configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub memory_enabled: bool,

    #[serde(default = "default_memory_max_entries")]
    pub memory_max_entries: u64,

    /// Entry TTL in seconds (0 = no expiry)
    #[serde(default)]
    pub memory_ttl_seconds: u64,
}

const fn default_memory_max_entries() -> u64 {
    10_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_enabled: true,
            memory_max_entries: default_memory_max_entries(),
            memory_ttl_seconds: 0,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_source_lang")]
    pub source_lang: Lang,

    #[serde(default = "default_target_lang")]
    pub target_lang: Lang,

    #[serde(default)]
    pub text_color: TextColor,

    /// Join words hyphenated across line breaks during extraction
    #[serde(default = "default_true")]
    pub dehyphenate: bool,

    #[serde(default)]
    pub translator: TranslatorConfig,

    #[serde(default)]
    pub overlay: OverlayConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_lang: default_source_lang(),
            target_lang: default_target_lang(),
            text_color: TextColor::default(),
            dehyphenate: true,
            translator: TranslatorConfig::default(),
            overlay: OverlayConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations (~/.config/blocktrans/config.toml, ./config.toml)
    pub fn load() -> Self {
        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("blocktrans").join("config.toml");
            if user_config.exists() {
                match Self::from_file(&user_config) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {}", user_config.display());
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        let local_config = std::path::PathBuf::from("config.toml");
        if local_config.exists() {
            match Self::from_file(&local_config) {
                Ok(config) => {
                    tracing::debug!("Loaded config from ./config.toml");
                    return config;
                }
                Err(e) => {
                    tracing::warn!("Failed to load ./config.toml: {}", e);
                }
            }
        }

        tracing::debug!("No config file found, using defaults");
        Self::default()
    }

    /// Check values that serde cannot constrain.
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, reason: &str| Error::ConfigInvalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        let overlay = &self.overlay;
        if !(overlay.font_size.is_finite() && overlay.font_size > 0.0) {
            return Err(invalid("overlay.font_size", "must be a positive number"));
        }
        if !(overlay.min_font_size.is_finite() && overlay.min_font_size > 0.0) {
            return Err(invalid("overlay.min_font_size", "must be a positive number"));
        }
        if overlay.min_font_size > overlay.font_size {
            return Err(invalid("overlay.min_font_size", "must not exceed overlay.font_size"));
        }
        if !(overlay.line_height.is_finite() && overlay.line_height >= 1.0) {
            return Err(invalid("overlay.line_height", "must be at least 1.0"));
        }
        if self.translator.timeout_secs == 0 {
            return Err(invalid("translator.timeout_secs", "must be greater than zero"));
        }
        if self.translator.retry_count == 0 {
            return Err(invalid("translator.retry_count", "must be at least 1"));
        }
        check_target_lang(&self.target_lang)
    }
}

/// Check that `lang` is an explicit target whose script the overlay font can draw.
pub fn check_target_lang(lang: &Lang) -> Result<()> {
    let reason = if lang.is_auto() {
        "target language cannot be auto-detected".to_string()
    } else if target_languages().iter().any(|option| option.code == lang.as_str()) {
        return Ok(());
    } else {
        format!("'{lang}' is not a supported target language")
    };

    Err(Error::ConfigInvalid {
        field: "target_lang".to_string(),
        reason,
    })
}

/// A language option for UI dropdowns
#[derive(Debug, Clone)]
pub struct LanguageOption {
    /// ISO language code (e.g., "id", "en")
    pub code: &'static str,
    /// Display name (e.g., "Indonesian")
    pub name: &'static str,
}

/// Languages offered as translation source.
pub fn source_languages() -> Vec<LanguageOption> {
    vec![
        LanguageOption { code: "en", name: "English" },
        LanguageOption { code: "auto", name: "Auto-detect" },
        LanguageOption { code: "id", name: "Indonesian" },
        LanguageOption { code: "ms", name: "Malay" },
        LanguageOption { code: "nl", name: "Dutch" },
        LanguageOption { code: "fr", name: "French" },
        LanguageOption { code: "de", name: "German" },
        LanguageOption { code: "es", name: "Spanish" },
    ]
}

/// Languages offered as translation target.
/// Limited to scripts the overlay's WinAnsi encoding can show.
pub fn target_languages() -> Vec<LanguageOption> {
    vec![
        LanguageOption { code: "id", name: "Indonesian" },
        LanguageOption { code: "en", name: "English" },
        LanguageOption { code: "ms", name: "Malay" },
        LanguageOption { code: "jw", name: "Javanese" },
        LanguageOption { code: "su", name: "Sundanese" },
        LanguageOption { code: "nl", name: "Dutch" },
        LanguageOption { code: "fr", name: "French" },
        LanguageOption { code: "de", name: "German" },
        LanguageOption { code: "es", name: "Spanish" },
        LanguageOption { code: "pt", name: "Portuguese" },
        LanguageOption { code: "it", name: "Italian" },
    ]
}

/// Default source language code
pub const DEFAULT_SOURCE_LANG: &str = "en";
/// Default target language code (Indonesian)
pub const DEFAULT_TARGET_LANG: &str = "id";
