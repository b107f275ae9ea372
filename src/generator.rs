//! Generator contracts and the built-in QR / CODE128 implementations.
//!
//! The controller only talks to the two traits, so tests (and embedders) can
//! substitute their own generators.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use image::RgbaImage;
use tracing::debug;

use crate::code128;
use crate::error::GenerateError;
use crate::font::FontRenderer;
use crate::qrcode::QrCode;
use crate::render;
use crate::resolver::{LinearOptions, MatrixOptions};

/// Produces a 2D code image. May complete after further input changes.
pub trait MatrixGenerator: Send + Sync + 'static {
    fn generate(&self, text: String, options: MatrixOptions) -> BoxFuture<'static, Result<RgbaImage, GenerateError>>;
}

/// Produces a 1D barcode image synchronously.
pub trait LinearGenerator: Send + Sync {
    fn generate(&self, text: &str, options: &LinearOptions) -> Result<RgbaImage, GenerateError>;
}

/// QR encoder run on tokio's blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrGenerator;

impl QrGenerator {
    pub fn generate_blocking(text: &str, options: &MatrixOptions) -> Result<RgbaImage, GenerateError> {
        let qr = QrCode::encode_text(text, options.ecc)?;
        debug!(version = qr.version().value(), ecl = ?qr.error_correction_level(), "encoded qr");
        Ok(render::render_matrix(&qr, options))
    }
}

impl MatrixGenerator for QrGenerator {
    fn generate(&self, text: String, options: MatrixOptions) -> BoxFuture<'static, Result<RgbaImage, GenerateError>> {
        Box::pin(async move {
            tokio::task::spawn_blocking(move || Self::generate_blocking(&text, &options)).await?
        })
    }
}

type FontKey = (Option<PathBuf>, u32);

/// CODE128 encoder. Label fonts are loaded on first use and cached.
#[derive(Default)]
pub struct Code128Generator {
    font: Mutex<Option<(FontKey, Option<Arc<FontRenderer>>)>>,
}

impl Code128Generator {
    pub fn new() -> Self {
        Self::default()
    }

    fn font_for(&self, options: &LinearOptions) -> Option<Arc<FontRenderer>> {
        let key: FontKey = (options.label_font.clone(), options.label_font_size.to_bits());
        let mut cache = match self.font.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some((cached_key, font)) = cache.as_ref() {
            if *cached_key == key {
                return font.clone();
            }
        }
        let font = FontRenderer::locate(options.label_font.as_deref(), options.label_font_size).map(Arc::new);
        *cache = Some((key, font.clone()));
        font
    }
}

impl LinearGenerator for Code128Generator {
    fn generate(&self, text: &str, options: &LinearOptions) -> Result<RgbaImage, GenerateError> {
        let widths = code128::encode_widths(text)?;
        let font = match options.label {
            Some(_) => self.font_for(options),
            None => None,
        };
        Ok(render::render_linear(&widths, options, font.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qrcode::QrCodeEcc;
    use image::Rgba;

    fn matrix_options() -> MatrixOptions {
        MatrixOptions {
            pixel_size: 140,
            quiet_margin: 1,
            ecc: QrCodeEcc::Medium,
            foreground: Rgba([0, 0, 0, 0xff]),
            background: Rgba([0xff, 0xff, 0xff, 0xff]),
        }
    }

    #[tokio::test]
    async fn qr_generator_runs_off_thread() {
        let img = QrGenerator.generate("hello".into(), matrix_options()).await.unwrap();
        assert_eq!(img.dimensions(), (140, 140));
    }

    #[tokio::test]
    async fn qr_generator_reports_capacity() {
        let text = "x".repeat(4000);
        let err = QrGenerator.generate(text, matrix_options()).await.unwrap_err();
        assert!(matches!(err, GenerateError::DataOverCapacity(_, _)));
    }

    #[test]
    fn code128_generator_rejects_non_ascii() {
        let options = LinearOptions {
            bar_width: 1.2,
            bar_height: 70,
            quiet_margin: 8,
            label: None,
            label_font: None,
            label_font_size: 16.0,
            label_margin: 6,
            foreground: Rgba([0, 0, 0, 0xff]),
            background: Rgba([0xff, 0xff, 0xff, 0xff]),
        };
        let err = Code128Generator::new().generate("Ўзбек", &options).unwrap_err();
        assert!(matches!(err, GenerateError::UnsupportedCharacter { .. }));
        assert!(Code128Generator::new().generate("ABC-123", &options).is_ok());
    }
}
