//! Decides what string each generator receives and with which options.

use std::path::PathBuf;

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::qrcode::QrCodeEcc;
use crate::records::Record;
use crate::token;

/// Longest custom label accepted under a barcode, in characters.
pub const MAX_LABEL_CHARS: usize = 12;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// 2D matrix (QR) code.
    #[default]
    Matrix,
    /// 1D CODE128 barcode.
    Linear,
}

impl Mode {
    /// Default download file name for an image of this mode.
    pub fn file_name(self) -> &'static str {
        match self {
            Mode::Matrix => "qrcode.png",
            Mode::Linear => "barcode.png",
        }
    }
}

/// Human-readable label under a barcode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LabelOptions {
    show: bool,
    text: Option<String>,
}

impl LabelOptions {
    /// Custom text is cut to [`MAX_LABEL_CHARS`]; blank text counts as no
    /// override.
    pub fn new(show: bool, text: Option<&str>) -> Self {
        let text = text
            .filter(|t| !t.trim().is_empty())
            .map(|t| t.chars().take(MAX_LABEL_CHARS).collect());
        Self { show, text }
    }

    pub fn hidden() -> Self {
        Self::default()
    }

    pub fn show(&self) -> bool {
        self.show
    }

    pub fn custom_text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The label actually drawn for `payload`, if any.
    pub fn resolve(&self, payload: &str) -> Option<String> {
        if !self.show {
            return None;
        }
        Some(self.text.clone().unwrap_or_else(|| payload.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixOptions {
    /// Output edge length in pixels; the symbol is scaled to fill it.
    pub pixel_size: u32,
    /// Quiet zone in modules.
    pub quiet_margin: u32,
    pub ecc: QrCodeEcc,
    pub foreground: Rgba<u8>,
    pub background: Rgba<u8>,
}

/// Options for the CODE128 generator.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearOptions {
    /// Width of the narrowest bar in pixels.
    pub bar_width: f32,
    pub bar_height: u32,
    pub quiet_margin: u32,
    pub label: Option<String>,
    pub label_font: Option<PathBuf>,
    pub label_font_size: f32,
    pub label_margin: u32,
    pub foreground: Rgba<u8>,
    pub background: Rgba<u8>,
}

/// What to generate for one set of inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Matrix {
        payload: String,
        options: MatrixOptions,
        /// The embedded card token when card mode is on.
        token: Option<String>,
    },
    Linear {
        payload: String,
        options: LinearOptions,
    },
}

impl Resolution {
    pub fn mode(&self) -> Mode {
        match self {
            Resolution::Matrix { .. } => Mode::Matrix,
            Resolution::Linear { .. } => Mode::Linear,
        }
    }

    pub fn payload(&self) -> &str {
        match self {
            Resolution::Matrix { payload, .. } | Resolution::Linear { payload, .. } => payload,
        }
    }

    /// Error correction level of a matrix request.
    pub fn ecc(&self) -> Option<QrCodeEcc> {
        match self {
            Resolution::Matrix { options, .. } => Some(options.ecc),
            Resolution::Linear { .. } => None,
        }
    }
}

/// Picks the effective payload and options.
///
/// * linear: flattened text, card mode ignored;
/// * matrix without card mode: flattened text at high error correction;
/// * matrix with card mode: card URL at medium error correction, since the
///   URL is denser than plain text and lower redundancy keeps the symbol
///   readable at the same pixel size.
///
/// In card mode with no non-empty records the payload is empty, so the
/// controller goes idle rather than encoding a bare URL.
pub fn resolve(
    config: &Config,
    mode: Mode,
    card_mode: bool,
    text: &str,
    filtered: &[Record],
    size: u32,
    label: &LabelOptions,
) -> Resolution {
    match mode {
        Mode::Linear => {
            let style = &config.linear;
            Resolution::Linear {
                payload: text.to_string(),
                options: LinearOptions {
                    bar_width: (size as f32 / 120.0).max(1.2),
                    bar_height: ((size as f32 * 0.6).round() as u32).max(70),
                    quiet_margin: style.quiet_margin,
                    label: label.resolve(text),
                    label_font: style.label_font.clone(),
                    label_font_size: style.label_font_size,
                    label_margin: style.label_margin,
                    foreground: style.foreground.rgba(),
                    background: style.background.rgba(),
                },
            }
        }
        Mode::Matrix => {
            let style = &config.matrix;
            let (payload, ecc, token) = if card_mode {
                if filtered.is_empty() {
                    (String::new(), QrCodeEcc::Medium, None)
                } else {
                    let token = token::encode(filtered);
                    let url = token::card_url(&config.card_base_url, &config.card_param, &token);
                    (url, QrCodeEcc::Medium, Some(token))
                }
            } else {
                (text.to_string(), QrCodeEcc::High, None)
            };
            Resolution::Matrix {
                payload,
                options: MatrixOptions {
                    pixel_size: size,
                    quiet_margin: style.quiet_margin,
                    ecc,
                    foreground: style.foreground.rgba(),
                    background: style.background.rgba(),
                },
                token,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::{filter_non_empty, flatten, MAX_INPUT_CHARS};

    fn records() -> Vec<Record> {
        vec![Record::new("Ism", "Ali"), Record::new("Telefon", "+998901234567")]
    }

    fn run(mode: Mode, card: bool, label: LabelOptions) -> Resolution {
        let recs = records();
        let text = flatten(&recs, MAX_INPUT_CHARS);
        resolve(&Config::default(), mode, card, &text, &filter_non_empty(&recs), 260, &label)
    }

    #[test]
    fn matrix_plain_text_uses_high_ecc() {
        let Resolution::Matrix { payload, options, token } = run(Mode::Matrix, false, LabelOptions::hidden()) else {
            panic!("expected matrix");
        };
        assert_eq!(payload, "Ism: Ali\nTelefon: +998901234567");
        assert_eq!(options.ecc, QrCodeEcc::High);
        assert_eq!(options.quiet_margin, 1);
        assert_eq!(token, None);
    }

    #[test]
    fn matrix_card_mode_embeds_token_at_medium_ecc() {
        let Resolution::Matrix { payload, options, token } = run(Mode::Matrix, true, LabelOptions::hidden()) else {
            panic!("expected matrix");
        };
        let token = token.unwrap();
        assert_eq!(payload, format!("https://cardcode.app/?card={token}"));
        assert_eq!(options.ecc, QrCodeEcc::Medium);
        assert_eq!(crate::token::decode_url(&payload, "card"), Some(records()));
    }

    #[test]
    fn linear_ignores_card_mode() {
        let res = run(Mode::Linear, true, LabelOptions::hidden());
        assert_eq!(res.mode(), Mode::Linear);
        assert_eq!(res.payload(), "Ism: Ali\nTelefon: +998901234567");
    }

    #[test]
    fn linear_geometry_follows_size() {
        let Resolution::Linear { options, .. } = run(Mode::Linear, false, LabelOptions::hidden()) else {
            panic!("expected linear");
        };
        assert!((options.bar_width - 260.0 / 120.0).abs() < f32::EPSILON);
        assert_eq!(options.bar_height, 156);
        assert_eq!(options.quiet_margin, 8);
        assert_eq!(options.label, None);

        let small = resolve(&Config::default(), Mode::Linear, false, "x", &[], 140, &LabelOptions::hidden());
        let Resolution::Linear { options, .. } = small else { panic!("expected linear") };
        assert!((options.bar_width - 1.2).abs() < f32::EPSILON);
        assert_eq!(options.bar_height, 84);
    }

    #[test]
    fn label_defaults_to_payload() {
        let Resolution::Linear { payload, options } = run(Mode::Linear, false, LabelOptions::new(true, None)) else {
            panic!("expected linear");
        };
        assert_eq!(options.label.as_deref(), Some(payload.as_str()));
    }

    #[test]
    fn custom_label_overrides_payload() {
        let Resolution::Linear { options, .. } = run(Mode::Linear, false, LabelOptions::new(true, Some("VIP-01"))) else {
            panic!("expected linear");
        };
        assert_eq!(options.label.as_deref(), Some("VIP-01"));
    }

    #[test]
    fn custom_label_is_capped() {
        let label = LabelOptions::new(true, Some("ABCDEFGHIJKLMNOP"));
        assert_eq!(label.custom_text(), Some("ABCDEFGHIJKL"));
        assert_eq!(LabelOptions::new(true, Some("   ")).custom_text(), None);
        assert_eq!(LabelOptions::new(false, Some("VIP-01")).resolve("abc"), None);
    }

    #[test]
    fn card_mode_without_records_is_empty() {
        let res = resolve(&Config::default(), Mode::Matrix, true, "", &[], 260, &LabelOptions::hidden());
        assert_eq!(res.payload(), "");
    }
}
