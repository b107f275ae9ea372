//! Label text rasterization using fontdue.

use std::fs;
use std::path::{Path, PathBuf};

use fontdue::{Font, FontSettings};
use tracing::debug;

use crate::error::GenerateError;

/// Coverage bitmap of a rendered string, one byte per pixel (0 = empty).
pub struct RenderedText {
    pub width: usize,
    pub height: usize,
    pub coverage: Vec<u8>,
}

#[derive(Debug)]
pub struct FontRenderer {
    font: Font,
    size: f32,
}

impl FontRenderer {
    pub fn from_path(path: &Path, size: f32) -> Result<Self, GenerateError> {
        let data = fs::read(path)?;
        Self::from_bytes(data, size)
    }

    pub fn from_bytes(data: Vec<u8>, size: f32) -> Result<Self, GenerateError> {
        let font = Font::from_bytes(data, FontSettings::default())
            .map_err(|e| GenerateError::Font(e.to_string()))?;
        Ok(Self { font, size })
    }

    /// Loads `preferred` if given, otherwise the first common sans font found
    /// on the system. `None` when nothing loads.
    pub fn locate(preferred: Option<&Path>, size: f32) -> Option<Self> {
        let fallbacks = [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
            "/System/Library/Fonts/Supplemental/Arial.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ];
        let candidates = preferred
            .map(Path::to_path_buf)
            .into_iter()
            .chain(fallbacks.iter().map(PathBuf::from));
        for path in candidates {
            match Self::from_path(&path, size) {
                Ok(renderer) => return Some(renderer),
                Err(e) => debug!(path = %path.display(), error = %e, "font not usable"),
            }
        }
        None
    }

    /// Lays out `text` on one line. Empty text gives a 0x0 bitmap.
    pub fn render_text(&self, text: &str) -> RenderedText {
        let mut glyphs = Vec::new();
        let mut x = 0.0f32;
        let mut max_ascent = 0i32;
        let mut max_descent = 0i32;

        for ch in text.chars().filter(|c| !c.is_control()) {
            let (metrics, bitmap) = self.font.rasterize(ch, self.size);
            max_ascent = max_ascent.max(metrics.height as i32 + metrics.ymin);
            max_descent = max_descent.max(-metrics.ymin);
            glyphs.push((x.round() as i32 + metrics.xmin, metrics, bitmap));
            x += metrics.advance_width;
        }

        let width = x.ceil().max(0.0) as usize;
        let height = (max_ascent + max_descent).max(0) as usize;
        if width == 0 || height == 0 {
            return RenderedText { width: 0, height: 0, coverage: Vec::new() };
        }
        let mut coverage = vec![0u8; width * height];

        for (x_offset, metrics, bitmap) in glyphs {
            let top = max_ascent - (metrics.height as i32 + metrics.ymin);
            for gy in 0..metrics.height {
                for gx in 0..metrics.width {
                    let px = x_offset + gx as i32;
                    let py = top + gy as i32;
                    if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                        continue;
                    }
                    let cell = &mut coverage[py as usize * width + px as usize];
                    *cell = (*cell).max(bitmap[gy * metrics.width + gx]);
                }
            }
        }
        RenderedText { width, height, coverage }
    }
}
