//! Generator configuration.
//!
//! Every field has a default, so an empty or partial TOML file is valid.
//! Lookup order: explicit path, then `<config dir>/cardcode/config.toml`,
//! then built-in defaults.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::ConfigError;

pub const APP_DIR: &str = "cardcode";
pub const FILENAME: &str = "config.toml";

/// Top-level settings shared by the record model, codec and generators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL that card tokens are appended to in card mode.
    pub card_base_url: String,
    /// Query parameter carrying the card token.
    pub card_param: String,
    /// Ceiling on the flattened input text, in characters.
    pub max_input_chars: usize,
    /// Longest card token handed to the matrix generator.
    pub max_token_chars: usize,
    pub size: SizeBounds,
    pub matrix: MatrixStyle,
    pub linear: LinearStyle,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            card_base_url: "https://cardcode.app/".to_string(),
            card_param: "card".to_string(),
            max_input_chars: 4000,
            max_token_chars: 2200,
            size: SizeBounds::default(),
            matrix: MatrixStyle::default(),
            linear: LinearStyle::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeBounds {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

impl Default for SizeBounds {
    fn default() -> Self {
        Self { min: 140, max: 800, default: 260 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixStyle {
    /// Quiet zone around the symbol, in modules.
    pub quiet_margin: u32,
    pub foreground: HexColor,
    pub background: HexColor,
}

impl Default for MatrixStyle {
    fn default() -> Self {
        Self {
            quiet_margin: 1,
            foreground: HexColor([0x1d, 0x1b, 0x1a, 0xff]),
            background: HexColor::WHITE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearStyle {
    /// Quiet zone on every side, in pixels.
    pub quiet_margin: u32,
    pub foreground: HexColor,
    pub background: HexColor,
    /// TrueType font for the human-readable label. Falls back to common
    /// system fonts when unset.
    pub label_font: Option<PathBuf>,
    pub label_font_size: f32,
    /// Gap between the bars and the label, in pixels.
    pub label_margin: u32,
}

impl Default for LinearStyle {
    fn default() -> Self {
        Self {
            quiet_margin: 8,
            foreground: HexColor([0, 0, 0, 0xff]),
            background: HexColor::WHITE,
            label_font: None,
            label_font_size: 16.0,
            label_margin: 6,
        }
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path.push(FILENAME);
        path
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&contents)?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Loads the explicit path if given (errors are fatal), otherwise the
    /// default location if it exists (errors are logged), otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        match Self::load_from(&path) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable config, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let SizeBounds { min, max, default } = self.size;
        if min == 0 || min > max {
            return Err(ConfigError::Invalid(format!("size range {min}..={max} is empty")));
        }
        if !(min..=max).contains(&default) {
            return Err(ConfigError::Invalid(format!(
                "default size {default} is outside {min}..={max}"
            )));
        }
        if self.max_input_chars == 0 {
            return Err(ConfigError::Invalid("max_input_chars must be positive".into()));
        }
        if self.card_param.is_empty()
            || !self.card_param.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::Invalid(format!(
                "card_param {:?} is not a plain query key",
                self.card_param
            )));
        }
        Ok(())
    }
}

/// An RGBA color written as `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(pub [u8; 4]);

impl HexColor {
    pub const WHITE: HexColor = HexColor([0xff, 0xff, 0xff, 0xff]);

    pub fn rgba(self) -> image::Rgba<u8> {
        image::Rgba(self.0)
    }
}

impl FromStr for HexColor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        let invalid = || ConfigError::Invalid(format!("bad color {s:?}"));
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(invalid());
        }
        let mut out = [0xffu8; 4];
        for (i, slot) in out.iter_mut().enumerate().take(hex.len() / 2) {
            *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(HexColor(out))
    }
}

impl TryFrom<String> for HexColor {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        if a == 0xff {
            write!(f, "#{r:02x}{g:02x}{b:02x}")
        } else {
            write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_input_chars, 4000);
        assert_eq!(config.size, SizeBounds { min: 140, max: 800, default: 260 });
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let config = Config::from_toml(
            r##"
            card_base_url = "https://example.com/c"
            [matrix]
            foreground = "#000000"
            "##,
        )
        .unwrap();
        assert_eq!(config.card_base_url, "https://example.com/c");
        assert_eq!(config.matrix.foreground, HexColor([0, 0, 0, 0xff]));
        assert_eq!(config.matrix.quiet_margin, 1);
        assert_eq!(config.card_param, "card");
    }

    #[test]
    fn rejects_inverted_size_range() {
        let err = Config::from_toml("[size]\nmin = 900\nmax = 800\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_param_needing_escapes() {
        let err = Config::from_toml("card_param = \"a=b\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn hex_color_parsing() {
        assert_eq!("#1d1b1a".parse::<HexColor>().unwrap(), HexColor([0x1d, 0x1b, 0x1a, 0xff]));
        assert_eq!("ffffff80".parse::<HexColor>().unwrap(), HexColor([0xff, 0xff, 0xff, 0x80]));
        assert!("#12345".parse::<HexColor>().is_err());
        assert!("#gg0000".parse::<HexColor>().is_err());
        assert_eq!(HexColor([0x1d, 0x1b, 0x1a, 0xff]).to_string(), "#1d1b1a");
    }

    #[test]
    fn load_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILENAME);
        fs::write(&path, "max_token_chars = 100\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.max_token_chars, 100);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
