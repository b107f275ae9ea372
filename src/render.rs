use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{ImageBuffer, ImageFormat, Rgba, RgbaImage};
use tracing::warn;

use crate::error::GenerateError;
use crate::font::FontRenderer;
use crate::qrcode::QrCode;
use crate::resolver::{LinearOptions, MatrixOptions};

/*---- Matrix ----*/

/// Rasterizes a QR symbol to exactly `pixel_size × pixel_size` pixels,
/// quiet zone included. Modules are mapped by nearest neighbour, so edges
/// stay sharp at any size.
pub fn render_matrix(qr: &QrCode, options: &MatrixOptions) -> RgbaImage {
    let margin = options.quiet_margin as i64;
    let total = i64::from(qr.size()) + 2 * margin;
    let px = i64::from(options.pixel_size.max(1));
    ImageBuffer::from_fn(px as u32, px as u32, |x, y| {
        let mx = i64::from(x) * total / px - margin;
        let my = i64::from(y) * total / px - margin;
        if qr.get_module(mx as i32, my as i32) {
            options.foreground
        } else {
            options.background
        }
    })
}

/// SVG document for a QR symbol, drawn in module units with
/// `quiet_margin` modules of border and scaled to `pixel_size`.
/// Lines end with `\n` on every platform.
pub fn matrix_svg(qr: &QrCode, options: &MatrixOptions) -> String {
    let border = options.quiet_margin as i32;
    let dimension = qr.size() + border * 2;
    let mut result = String::new();
    result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
    result += &format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" width=\"{1}\" height=\"{1}\" viewBox=\"0 0 {0} {0}\" stroke=\"none\">\n",
        dimension, options.pixel_size
    );
    result += &format!("\t<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>\n", css_color(options.background));
    result += "\t<path d=\"";
    let mut first = true;
    for y in 0..qr.size() {
        for x in 0..qr.size() {
            if qr.get_module(x, y) {
                if !first {
                    result += " ";
                }
                first = false;
                result += &format!("M{},{}h1v1h-1z", x + border, y + border);
            }
        }
    }
    result += &format!("\" fill=\"{}\"/>\n", css_color(options.foreground));
    result += "</svg>\n";
    result
}

/// Terminal rendering, two modules per character cell vertically.
pub fn matrix_text(qr: &QrCode, border: i32) -> String {
    let mut out = String::new();
    let mut y = -border;
    while y < qr.size() + border {
        for x in -border..qr.size() + border {
            let top = qr.get_module(x, y);
            let bottom = qr.get_module(x, y + 1);
            // Dark modules print as blank on a light terminal cell.
            out.push(match (top, bottom) {
                (true, true) => ' ',
                (true, false) => '▄',
                (false, true) => '▀',
                (false, false) => '█',
            });
        }
        out.push('\n');
        y += 2;
    }
    out
}

fn css_color(c: Rgba<u8>) -> String {
    let [r, g, b, a] = c.0;
    if a == 0xff {
        format!("#{r:02x}{g:02x}{b:02x}")
    } else {
        format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

/*---- Linear ----*/

/// Draws CODE128 element widths onto a fresh surface, with the label below
/// the bars when one is set and a font is available.
pub fn render_linear(widths: &[u8], options: &LinearOptions, font: Option<&FontRenderer>) -> RgbaImage {
    let margin = options.quiet_margin;
    let total_modules: u32 = widths.iter().map(|&w| u32::from(w)).sum();
    let bars_width = (total_modules as f32 * options.bar_width).round() as u32;

    let label = match (&options.label, font) {
        (Some(text), Some(font)) => Some(font.render_text(text)),
        (Some(_), None) => {
            warn!("no font available, barcode label not drawn");
            None
        }
        _ => None,
    }
    .filter(|t| t.width > 0);

    let label_band = label.as_ref().map_or(0, |t| options.label_margin + t.height as u32);
    let width = (bars_width + 2 * margin).max(label.as_ref().map_or(0, |t| t.width as u32 + 2 * margin));
    let height = options.bar_height + label_band + 2 * margin;
    let mut img = ImageBuffer::from_pixel(width, height, options.background);

    // Center the bars when the label is wider than the symbol.
    let x0 = (width - bars_width) / 2;
    let mut module = 0u32;
    for (i, &w) in widths.iter().enumerate() {
        let start = x0 + (module as f32 * options.bar_width).round() as u32;
        module += u32::from(w);
        let end = x0 + (module as f32 * options.bar_width).round() as u32;
        if i % 2 == 0 {
            for x in start..end.min(width) {
                for y in margin..margin + options.bar_height {
                    img.put_pixel(x, y, options.foreground);
                }
            }
        }
    }

    if let Some(text) = label {
        let left = (width - text.width as u32) / 2;
        let top = margin + options.bar_height + options.label_margin;
        for ty in 0..text.height {
            for tx in 0..text.width {
                let alpha = text.coverage[ty * text.width + tx];
                if alpha == 0 {
                    continue;
                }
                let (x, y) = (left + tx as u32, top + ty as u32);
                let blended = blend(*img.get_pixel(x, y), options.foreground, alpha);
                img.put_pixel(x, y, blended);
            }
        }
    }
    img
}

fn blend(bg: Rgba<u8>, fg: Rgba<u8>, alpha: u8) -> Rgba<u8> {
    let a = u16::from(alpha);
    let mix = |b: u8, f: u8| ((u16::from(f) * a + u16::from(b) * (255 - a)) / 255) as u8;
    Rgba([
        mix(bg.0[0], fg.0[0]),
        mix(bg.0[1], fg.0[1]),
        mix(bg.0[2], fg.0[2]),
        bg.0[3].max(alpha),
    ])
}

/*---- Export ----*/

/// PNG bytes of an image, for downloads and sharing.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, GenerateError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// Writes an image as PNG, creating the parent directory if needed.
pub fn save_png(img: &RgbaImage, path: &Path) -> Result<(), GenerateError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    img.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code128;
    use crate::qrcode::QrCodeEcc;

    fn matrix_options(pixel_size: u32) -> MatrixOptions {
        MatrixOptions {
            pixel_size,
            quiet_margin: 1,
            ecc: QrCodeEcc::High,
            foreground: Rgba([0x1d, 0x1b, 0x1a, 0xff]),
            background: Rgba([0xff, 0xff, 0xff, 0xff]),
        }
    }

    fn linear_options(label: Option<&str>) -> LinearOptions {
        LinearOptions {
            bar_width: 2.0,
            bar_height: 70,
            quiet_margin: 8,
            label: label.map(str::to_string),
            label_font: None,
            label_font_size: 16.0,
            label_margin: 6,
            foreground: Rgba([0, 0, 0, 0xff]),
            background: Rgba([0xff, 0xff, 0xff, 0xff]),
        }
    }

    #[test]
    fn matrix_image_has_requested_size() {
        let qr = QrCode::encode_text("Hello, world!", QrCodeEcc::High).unwrap();
        let opts = matrix_options(260);
        let img = render_matrix(&qr, &opts);
        assert_eq!(img.dimensions(), (260, 260));
        // quiet zone corner is light, finder corner is dark
        assert_eq!(*img.get_pixel(0, 0), opts.background);
        let module_px = 260 / (qr.size() as u32 + 2);
        assert_eq!(*img.get_pixel(module_px + 1, module_px + 1), opts.foreground);
    }

    #[test]
    fn svg_output() {
        let qr = QrCode::encode_text("HELLO WORLD", QrCodeEcc::Low).unwrap();
        let svg = matrix_svg(&qr, &matrix_options(200));
        assert!(svg.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(svg.contains("fill=\"#1d1b1a\""));
        assert!(svg.contains("viewBox=\"0 0 23 23\""));
    }

    #[test]
    fn text_output_has_one_line_per_two_rows() {
        let qr = QrCode::encode_text("HI", QrCodeEcc::Low).unwrap();
        let text = matrix_text(&qr, 1);
        assert_eq!(text.lines().count(), 12); // 23 rows, rounded up
    }

    #[test]
    fn linear_image_geometry() {
        let widths = code128::encode_widths("VIP-01").unwrap();
        let modules: u32 = widths.iter().map(|&w| u32::from(w)).sum();
        let img = render_linear(&widths, &linear_options(None), None);
        assert_eq!(img.dimensions(), (modules * 2 + 16, 70 + 16));
        // first bar starts right after the quiet zone
        assert_eq!(img.get_pixel(7, 40).0, [0xff, 0xff, 0xff, 0xff]);
        assert_eq!(img.get_pixel(8, 40).0, [0, 0, 0, 0xff]);
    }

    #[test]
    fn label_without_font_is_skipped() {
        let widths = code128::encode_widths("VIP-01").unwrap();
        let img = render_linear(&widths, &linear_options(Some("VIP-01")), None);
        assert_eq!(img.height(), 70 + 16);
    }

    #[test]
    fn png_encoding() {
        let qr = QrCode::encode_text("x", QrCodeEcc::Low).unwrap();
        let png = encode_png(&render_matrix(&qr, &matrix_options(140))).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn save_png_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("qrcode.png");
        let qr = QrCode::encode_text("x", QrCodeEcc::Low).unwrap();
        save_png(&render_matrix(&qr, &matrix_options(140)), &path).unwrap();
        assert!(path.exists());
    }
}
