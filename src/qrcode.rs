//! QR Code Model 2 encoder used by the matrix generator.
//!
//! Supports versions 1 to 40, all four error correction levels, and numeric,
//! alphanumeric and byte segments. The smallest version that fits is chosen
//! automatically, as is the mask with the lowest penalty score.
//!
//! ```rust
//! use cardcode::qrcode::{QrCode, QrCodeEcc};
//!
//! let qr = QrCode::encode_text("https://example.com", QrCodeEcc::High).unwrap();
//! assert_eq!(qr.size(), qr.version().value() as i32 * 4 + 17);
//! ```

use crate::error::GenerateError;

/// A finished QR symbol: a square grid of dark and light modules.
/// Immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct QrCode {
    version: Version,
    size: i32,
    ecl: QrCodeEcc,
    mask: Mask,
    // Row-major, true = dark.
    modules: Vec<bool>,
    // Marks finder, timing, alignment, format and version areas while drawing.
    is_function: Vec<bool>,
}

impl QrCode {
    /// Encodes text with the most compact single segment mode that fits,
    /// using the smallest version able to hold it at `ecl`.
    ///
    /// The level is used as given; it is never boosted, so the caller's
    /// choice of redundancy is what ends up in the symbol.
    pub fn encode_text(text: &str, ecl: QrCodeEcc) -> Result<Self, GenerateError> {
        let segs = QrSegment::make_segments(text);
        Self::encode_segments(&segs, ecl, None)
    }

    /// Encodes the given segments in the smallest version that holds them.
    /// `mask` of `None` picks the lowest-penalty mask.
    pub fn encode_segments(segs: &[QrSegment], ecl: QrCodeEcc, mask: Option<Mask>) -> Result<Self, GenerateError> {
        let mut version = Version::MIN;
        let data_used_bits: usize = loop {
            let capacity_bits = Self::num_data_codewords(version, ecl) * 8;
            let used = QrSegment::total_bits(segs, version);
            match used {
                Some(n) if n <= capacity_bits => break n,
                _ if version >= Version::MAX => {
                    return Err(match used {
                        None => GenerateError::SegmentTooLong,
                        Some(n) => GenerateError::DataOverCapacity(n, capacity_bits),
                    });
                }
                _ => version = Version::new(version.value() + 1),
            }
        };

        let mut bb = BitBuffer(Vec::with_capacity(data_used_bits + 16));
        for seg in segs {
            bb.append_bits(seg.mode.mode_bits(), 4);
            bb.append_bits(seg.num_chars as u32, seg.mode.num_char_count_bits(version));
            bb.0.extend_from_slice(&seg.data);
        }
        debug_assert_eq!(bb.0.len(), data_used_bits);

        // Terminator, then pad to a byte boundary.
        let capacity_bits = Self::num_data_codewords(version, ecl) * 8;
        let terminator = (capacity_bits - bb.0.len()).min(4);
        bb.append_bits(0, terminator as u8);
        let pad = bb.0.len().wrapping_neg() & 7;
        bb.append_bits(0, pad as u8);

        for &pad_byte in [0xEC, 0x11].iter().cycle() {
            if bb.0.len() >= capacity_bits {
                break;
            }
            bb.append_bits(pad_byte, 8);
        }

        let mut codewords = vec![0u8; bb.0.len() / 8];
        for (i, &bit) in bb.0.iter().enumerate() {
            codewords[i >> 3] |= u8::from(bit) << (7 - (i & 7));
        }
        Ok(Self::encode_codewords(version, ecl, &codewords, mask))
    }

    /// Low-level entry point: builds a symbol from finished data codewords.
    pub fn encode_codewords(version: Version, ecl: QrCodeEcc, data: &[u8], mask: Option<Mask>) -> Self {
        let size = i32::from(version.value()) * 4 + 17;
        let area = (size * size) as usize;
        let mut qr = Self {
            version,
            size,
            ecl,
            mask: Mask::new(0),
            modules: vec![false; area],
            is_function: vec![false; area],
        };

        qr.draw_function_patterns();
        let all_codewords = qr.add_ecc_and_interleave(data);
        qr.draw_codewords(&all_codewords);

        let mask = mask.unwrap_or_else(|| {
            let mut best = Mask::new(0);
            let mut min_penalty = i32::MAX;
            for i in 0u8..8 {
                let candidate = Mask::new(i);
                qr.apply_mask(candidate);
                qr.draw_format_bits(candidate);
                let penalty = qr.penalty_score();
                if penalty < min_penalty {
                    best = candidate;
                    min_penalty = penalty;
                }
                qr.apply_mask(candidate); // XOR undoes it
            }
            best
        });
        qr.mask = mask;
        qr.apply_mask(mask);
        qr.draw_format_bits(mask);
        qr.is_function = Vec::new();
        qr
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Edge length in modules, between 21 and 177.
    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn error_correction_level(&self) -> QrCodeEcc {
        self.ecl
    }

    pub fn mask(&self) -> Mask {
        self.mask
    }

    /// `true` for a dark module. Coordinates outside the symbol are light.
    pub fn get_module(&self, x: i32, y: i32) -> bool {
        (0..self.size).contains(&x) && (0..self.size).contains(&y) && self.module(x, y)
    }

    fn module(&self, x: i32, y: i32) -> bool {
        self.modules[(y * self.size + x) as usize]
    }

    fn set_function_module(&mut self, x: i32, y: i32, dark: bool) {
        let index = (y * self.size + x) as usize;
        self.modules[index] = dark;
        self.is_function[index] = true;
    }

    /*---- Function patterns ----*/

    fn draw_function_patterns(&mut self) {
        let size = self.size;
        for i in 0..size {
            self.set_function_module(6, i, i % 2 == 0);
            self.set_function_module(i, 6, i % 2 == 0);
        }

        self.draw_finder_pattern(3, 3);
        self.draw_finder_pattern(size - 4, 3);
        self.draw_finder_pattern(3, size - 4);

        let positions = self.alignment_pattern_positions();
        let n = positions.len();
        for i in 0..n {
            for j in 0..n {
                // The three corners overlap finder patterns.
                let corner = (i == 0 && j == 0) || (i == 0 && j == n - 1) || (i == n - 1 && j == 0);
                if !corner {
                    self.draw_alignment_pattern(positions[i], positions[j]);
                }
            }
        }

        // Reserve the format area; real bits are drawn after masking.
        self.draw_format_bits(Mask::new(0));
        self.draw_version();
    }

    fn draw_finder_pattern(&mut self, x: i32, y: i32) {
        for dy in -4..=4 {
            for dx in -4..=4 {
                let xx = x + dx;
                let yy = y + dy;
                if (0..self.size).contains(&xx) && (0..self.size).contains(&yy) {
                    let dist = dx.abs().max(dy.abs());
                    self.set_function_module(xx, yy, dist != 2 && dist != 4);
                }
            }
        }
    }

    fn draw_alignment_pattern(&mut self, x: i32, y: i32) {
        for dy in -2..=2 {
            for dx in -2..=2 {
                self.set_function_module(x + dx, y + dy, dx.abs().max(dy.abs()) != 1);
            }
        }
    }

    fn draw_format_bits(&mut self, mask: Mask) {
        let bits: u32 = {
            let data = u32::from(self.ecl.format_bits() << 3 | mask.value());
            let mut rem = data;
            for _ in 0..10 {
                rem = (rem << 1) ^ ((rem >> 9) * 0x537);
            }
            (data << 10 | rem) ^ 0x5412
        };
        debug_assert_eq!(bits >> 15, 0);

        // First copy, around the top-left finder.
        for i in 0..6 {
            self.set_function_module(8, i, get_bit(bits, i));
        }
        self.set_function_module(8, 7, get_bit(bits, 6));
        self.set_function_module(8, 8, get_bit(bits, 7));
        self.set_function_module(7, 8, get_bit(bits, 8));
        for i in 9..15 {
            self.set_function_module(14 - i, 8, get_bit(bits, i));
        }

        // Second copy, split between the other two finders.
        let size = self.size;
        for i in 0..8 {
            self.set_function_module(size - 1 - i, 8, get_bit(bits, i));
        }
        for i in 8..15 {
            self.set_function_module(8, size - 15 + i, get_bit(bits, i));
        }
        self.set_function_module(8, size - 8, true);
    }

    fn draw_version(&mut self) {
        let ver = u32::from(self.version.value());
        if ver < 7 {
            return;
        }
        let bits: u32 = {
            let mut rem = ver;
            for _ in 0..12 {
                rem = (rem << 1) ^ ((rem >> 11) * 0x1F25);
            }
            ver << 12 | rem
        };
        debug_assert_eq!(bits >> 18, 0);

        for i in 0..18 {
            let bit = get_bit(bits, i);
            let a = self.size - 11 + i % 3;
            let b = i / 3;
            self.set_function_module(a, b, bit);
            self.set_function_module(b, a, bit);
        }
    }

    /// Center coordinates of the alignment patterns, ascending.
    fn alignment_pattern_positions(&self) -> Vec<i32> {
        let ver = i32::from(self.version.value());
        if ver == 1 {
            return Vec::new();
        }
        let num_align = ver / 7 + 2;
        let step = if ver == 32 {
            26
        } else {
            (ver * 4 + num_align * 2 + 1) / (num_align * 2 - 2) * 2
        };
        let mut result: Vec<i32> = (0..num_align - 1).map(|i| self.size - 7 - i * step).collect();
        result.push(6);
        result.reverse();
        result
    }

    /*---- Codewords ----*/

    /// Splits data into blocks, appends Reed-Solomon ECC to each and
    /// interleaves the result.
    fn add_ecc_and_interleave(&self, data: &[u8]) -> Vec<u8> {
        let ver = self.version;
        let ecl = self.ecl;
        assert_eq!(data.len(), Self::num_data_codewords(ver, ecl), "Illegal argument");

        let num_blocks = table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, ecl);
        let block_ecc_len = table_get(&ECC_CODEWORDS_PER_BLOCK, ver, ecl);
        let raw_codewords = Self::num_raw_data_modules(ver) / 8;
        let num_short_blocks = num_blocks - raw_codewords % num_blocks;
        let short_block_len = raw_codewords / num_blocks;

        let divisor = reed_solomon_divisor(block_ecc_len);
        let mut blocks: Vec<Vec<u8>> = Vec::with_capacity(num_blocks);
        let mut k = 0;
        for i in 0..num_blocks {
            let data_len = short_block_len - block_ecc_len + usize::from(i >= num_short_blocks);
            let mut block = data[k..k + data_len].to_vec();
            k += data_len;
            let ecc = reed_solomon_remainder(&block, &divisor);
            if i < num_short_blocks {
                // Placeholder so every block has the same length.
                block.push(0);
            }
            block.extend_from_slice(&ecc);
            blocks.push(block);
        }

        let mut result = Vec::with_capacity(raw_codewords);
        for i in 0..=short_block_len {
            for (j, block) in blocks.iter().enumerate() {
                // Skip the placeholder of short blocks.
                if i != short_block_len - block_ecc_len || j >= num_short_blocks {
                    result.push(block[i]);
                }
            }
        }
        result
    }

    /// Places codeword bits in the zigzag order, skipping function modules.
    fn draw_codewords(&mut self, data: &[u8]) {
        assert_eq!(data.len(), Self::num_raw_data_modules(self.version) / 8, "Illegal argument");

        let size = self.size;
        let mut i: usize = 0;
        let mut right = size - 1;
        while right >= 1 {
            if right == 6 {
                right = 5;
            }
            for vert in 0..size {
                for j in 0..2 {
                    let x = right - j;
                    let upward = (right + 1) & 2 == 0;
                    let y = if upward { size - 1 - vert } else { vert };
                    let index = (y * size + x) as usize;
                    if !self.is_function[index] && i < data.len() * 8 {
                        self.modules[index] = get_bit(u32::from(data[i >> 3]), 7 - (i & 7) as i32);
                        i += 1;
                    }
                    // Remainder bits stay light.
                }
            }
            right -= 2;
        }
        debug_assert_eq!(i, data.len() * 8);
    }

    /// XORs the mask pattern onto all non-function modules; applying the same
    /// mask twice restores the original.
    fn apply_mask(&mut self, mask: Mask) {
        for y in 0..self.size {
            for x in 0..self.size {
                let invert = match mask.value() {
                    0 => (x + y) % 2 == 0,
                    1 => y % 2 == 0,
                    2 => x % 3 == 0,
                    3 => (x + y) % 3 == 0,
                    4 => (x / 3 + y / 2) % 2 == 0,
                    5 => x * y % 2 + x * y % 3 == 0,
                    6 => (x * y % 2 + x * y % 3) % 2 == 0,
                    7 => ((x + y) % 2 + x * y % 3) % 2 == 0,
                    _ => unreachable!(),
                };
                let index = (y * self.size + x) as usize;
                self.modules[index] ^= invert & !self.is_function[index];
            }
        }
    }

    fn penalty_score(&self) -> i32 {
        let mut result: i32 = 0;
        let size = self.size;

        // Runs and finder-like patterns, rows then columns.
        for horizontal in [true, false] {
            for a in 0..size {
                let mut run_color = false;
                let mut run_len: i32 = 0;
                let mut history = FinderPenalty::new(size);
                for b in 0..size {
                    let (x, y) = if horizontal { (b, a) } else { (a, b) };
                    let color = self.module(x, y);
                    if color == run_color {
                        run_len += 1;
                        if run_len == 5 {
                            result += PENALTY_N1;
                        } else if run_len > 5 {
                            result += 1;
                        }
                    } else {
                        history.add_history(run_len);
                        if !run_color {
                            result += history.count_patterns() * PENALTY_N3;
                        }
                        run_color = color;
                        run_len = 1;
                    }
                }
                result += history.terminate_and_count(run_color, run_len) * PENALTY_N3;
            }
        }

        // 2x2 blocks of one color.
        for y in 0..size - 1 {
            for x in 0..size - 1 {
                let color = self.module(x, y);
                if color == self.module(x + 1, y)
                    && color == self.module(x, y + 1)
                    && color == self.module(x + 1, y + 1)
                {
                    result += PENALTY_N2;
                }
            }
        }

        // Dark/light balance.
        let dark = self.modules.iter().filter(|&&m| m).count() as i32;
        let total = size * size;
        let k = ((dark * 20 - total * 10).abs() + total - 1) / total - 1;
        result += k * PENALTY_N4;
        result
    }

    /*---- Capacity tables ----*/

    /// Data bits available in a version after function patterns, before ECC.
    fn num_raw_data_modules(ver: Version) -> usize {
        let ver = usize::from(ver.value());
        let mut result = (16 * ver + 128) * ver + 64;
        if ver >= 2 {
            let num_align = ver / 7 + 2;
            result -= (25 * num_align - 10) * num_align - 55;
            if ver >= 7 {
                result -= 36;
            }
        }
        result
    }

    fn num_data_codewords(ver: Version, ecl: QrCodeEcc) -> usize {
        Self::num_raw_data_modules(ver) / 8
            - table_get(&ECC_CODEWORDS_PER_BLOCK, ver, ecl) * table_get(&NUM_ERROR_CORRECTION_BLOCKS, ver, ecl)
    }

    /// Largest byte-mode payload that fits in version 40 at `ecl`.
    pub fn max_byte_capacity(ecl: QrCodeEcc) -> usize {
        let bits = Self::num_data_codewords(Version::MAX, ecl) * 8;
        let overhead = 4 + usize::from(QrSegmentMode::Byte.num_char_count_bits(Version::MAX));
        (bits - overhead) / 8
    }
}

impl std::fmt::Debug for QrCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QrCode")
            .field("version", &self.version.value())
            .field("ecl", &self.ecl)
            .field("mask", &self.mask.value())
            .finish()
    }
}

fn table_get(table: &'static [[i8; 41]; 4], ver: Version, ecl: QrCodeEcc) -> usize {
    table[ecl.ordinal()][usize::from(ver.value())] as usize
}

/*---- Reed-Solomon ----*/

/// Generator polynomial coefficients for `degree` ECC codewords, highest
/// power first, leading 1 omitted.
fn reed_solomon_divisor(degree: usize) -> Vec<u8> {
    assert!((1..=255).contains(&degree), "Degree out of range");
    let mut result = vec![0u8; degree - 1];
    result.push(1);
    let mut root: u8 = 1;
    for _ in 0..degree {
        for j in 0..degree {
            result[j] = gf_multiply(result[j], root);
            if j + 1 < result.len() {
                result[j] ^= result[j + 1];
            }
        }
        root = gf_multiply(root, 0x02);
    }
    result
}

fn reed_solomon_remainder(data: &[u8], divisor: &[u8]) -> Vec<u8> {
    let mut result = vec![0u8; divisor.len()];
    for b in data {
        let factor = b ^ result.remove(0);
        result.push(0);
        for (x, &y) in result.iter_mut().zip(divisor.iter()) {
            *x ^= gf_multiply(y, factor);
        }
    }
    result
}

/// Product in GF(2^8) modulo x^8 + x^4 + x^3 + x^2 + 1.
fn gf_multiply(x: u8, y: u8) -> u8 {
    let mut z: u8 = 0;
    for i in (0..8).rev() {
        z = (z << 1) ^ ((z >> 7) * 0x1D);
        z ^= ((y >> i) & 1) * x;
    }
    z
}

/*---- Penalty helper ----*/

struct FinderPenalty {
    qr_size: i32,
    run_history: [i32; 7],
}

impl FinderPenalty {
    fn new(size: i32) -> Self {
        Self {
            qr_size: size,
            run_history: [0; 7],
        }
    }

    fn add_history(&mut self, mut run_len: i32) {
        if self.run_history[0] == 0 {
            run_len += self.qr_size; // light border before the first run
        }
        self.run_history.copy_within(0..6, 1);
        self.run_history[0] = run_len;
    }

    /// 1 if the history ends in a 1:1:3:1:1 pattern with light borders.
    fn count_patterns(&self) -> i32 {
        let rh = &self.run_history;
        let n = rh[1];
        let core = n > 0 && rh[2] == n && rh[3] == n * 3 && rh[4] == n && rh[5] == n;
        i32::from(core && rh[0] >= n * 4 && rh[6] >= n)
            + i32::from(core && rh[6] >= n * 4 && rh[0] >= n)
    }

    fn terminate_and_count(mut self, run_color: bool, mut run_len: i32) -> i32 {
        if run_color {
            self.add_history(run_len);
            run_len = 0;
        }
        run_len += self.qr_size;
        self.add_history(run_len);
        self.count_patterns()
    }
}

const PENALTY_N1: i32 = 3;
const PENALTY_N2: i32 = 3;
const PENALTY_N3: i32 = 40;
const PENALTY_N4: i32 = 10;

static ECC_CODEWORDS_PER_BLOCK: [[i8; 41]; 4] = [
    [
        -1, 7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28, 30,
        30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Low
    [
        -1, 10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ], // Medium
    [
        -1, 13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30, 30,
        30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Quartile
    [
        -1, 17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24, 30,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // High
];

static NUM_ERROR_CORRECTION_BLOCKS: [[i8; 41]; 4] = [
    [
        -1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12,
        13, 14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ], // Low
    [
        -1, 1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21,
        23, 25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ], // Medium
    [
        -1, 1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27, 29,
        34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ], // Quartile
    [
        -1, 1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32, 35,
        37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ], // High
];

/// Error correction level for a QR code.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum QrCodeEcc {
    /// Tolerates ~7% erroneous codewords.
    Low,
    /// Tolerates ~15% erroneous codewords.
    Medium,
    /// Tolerates ~25% erroneous codewords.
    Quartile,
    /// Tolerates ~30% erroneous codewords.
    High,
}

impl QrCodeEcc {
    fn ordinal(self) -> usize {
        match self {
            QrCodeEcc::Low => 0,
            QrCodeEcc::Medium => 1,
            QrCodeEcc::Quartile => 2,
            QrCodeEcc::High => 3,
        }
    }

    // 2-bit value stored in the format information.
    fn format_bits(self) -> u8 {
        match self {
            QrCodeEcc::Low => 1,
            QrCodeEcc::Medium => 0,
            QrCodeEcc::Quartile => 3,
            QrCodeEcc::High => 2,
        }
    }
}

/// A run of data in one encoding mode.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct QrSegment {
    mode: QrSegmentMode,
    num_chars: usize,
    data: Vec<bool>,
}

impl QrSegment {
    /// A single segment in the most compact mode that covers all of `text`.
    /// Empty text yields no segments.
    pub fn make_segments(text: &str) -> Vec<Self> {
        if text.is_empty() {
            Vec::new()
        } else if Self::is_numeric(text) {
            vec![Self::make_numeric(text)]
        } else if Self::is_alphanumeric(text) {
            vec![Self::make_alphanumeric(text)]
        } else {
            vec![Self::make_bytes(text.as_bytes())]
        }
    }

    pub fn make_bytes(data: &[u8]) -> Self {
        let mut bb = BitBuffer(Vec::with_capacity(data.len() * 8));
        for &b in data {
            bb.append_bits(u32::from(b), 8);
        }
        Self::new(QrSegmentMode::Byte, data.len(), bb.0)
    }

    /// # Panics
    ///
    /// Panics if `text` contains anything other than ASCII digits.
    pub fn make_numeric(text: &str) -> Self {
        let mut bb = BitBuffer(Vec::with_capacity(text.len() * 3 + (text.len() + 2) / 3));
        let mut accum: u32 = 0;
        let mut count: u8 = 0;
        for b in text.bytes() {
            assert!(b.is_ascii_digit(), "String contains non-numeric characters");
            accum = accum * 10 + u32::from(b - b'0');
            count += 1;
            if count == 3 {
                bb.append_bits(accum, 10);
                accum = 0;
                count = 0;
            }
        }
        if count > 0 {
            bb.append_bits(accum, count * 3 + 1);
        }
        Self::new(QrSegmentMode::Numeric, text.len(), bb.0)
    }

    /// Allowed characters: 0–9, A–Z (uppercase), space, `$`, `%`, `*`, `+`,
    /// `-`, `.`, `/`, `:`.
    ///
    /// # Panics
    ///
    /// Panics if `text` contains any other character.
    pub fn make_alphanumeric(text: &str) -> Self {
        let mut bb = BitBuffer(Vec::with_capacity(text.len() * 5 + (text.len() + 1) / 2));
        let mut accum: u32 = 0;
        let mut count: u32 = 0;
        for c in text.chars() {
            let i = ALPHANUMERIC_CHARSET
                .find(c)
                .expect("String contains unencodable characters in alphanumeric mode");
            accum = accum * 45 + i as u32;
            count += 1;
            if count == 2 {
                bb.append_bits(accum, 11);
                accum = 0;
                count = 0;
            }
        }
        if count > 0 {
            bb.append_bits(accum, 6);
        }
        Self::new(QrSegmentMode::Alphanumeric, text.len(), bb.0)
    }

    fn new(mode: QrSegmentMode, num_chars: usize, data: Vec<bool>) -> Self {
        Self { mode, num_chars, data }
    }

    pub fn mode(&self) -> QrSegmentMode {
        self.mode
    }

    pub fn num_chars(&self) -> usize {
        self.num_chars
    }

    /// Bits needed for `segs` at `version`, or `None` if a character count
    /// does not fit its field.
    fn total_bits(segs: &[Self], version: Version) -> Option<usize> {
        let mut result: usize = 0;
        for seg in segs {
            let cc_bits = seg.mode.num_char_count_bits(version);
            if seg.num_chars >= 1usize << cc_bits {
                return None;
            }
            result = result.checked_add(4 + usize::from(cc_bits) + seg.data.len())?;
        }
        Some(result)
    }

    pub fn is_numeric(text: &str) -> bool {
        text.chars().all(|c| c.is_ascii_digit())
    }

    pub fn is_alphanumeric(text: &str) -> bool {
        text.chars().all(|c| ALPHANUMERIC_CHARSET.contains(c))
    }
}

static ALPHANUMERIC_CHARSET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum QrSegmentMode {
    Numeric,
    Alphanumeric,
    Byte,
}

impl QrSegmentMode {
    fn mode_bits(self) -> u32 {
        match self {
            QrSegmentMode::Numeric => 0x1,
            QrSegmentMode::Alphanumeric => 0x2,
            QrSegmentMode::Byte => 0x4,
        }
    }

    fn num_char_count_bits(self, ver: Version) -> u8 {
        let widths = match self {
            QrSegmentMode::Numeric => [10, 12, 14],
            QrSegmentMode::Alphanumeric => [9, 11, 13],
            QrSegmentMode::Byte => [8, 16, 16],
        };
        widths[usize::from((ver.value() + 7) / 17)]
    }
}

/// Growable bit sequence, most significant bit first.
struct BitBuffer(Vec<bool>);

impl BitBuffer {
    fn append_bits(&mut self, val: u32, len: u8) {
        assert!(len <= 31 && val >> len == 0, "Value out of range");
        self.0.extend((0..len).rev().map(|i| get_bit(val, i32::from(i))));
    }
}

/// A QR code version (1–40).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Version(u8);

impl Version {
    pub const MIN: Version = Version(1);
    pub const MAX: Version = Version(40);

    /// # Panics
    ///
    /// Panics if the number is outside the range [1, 40].
    pub const fn new(ver: u8) -> Self {
        assert!(
            Version::MIN.value() <= ver && ver <= Version::MAX.value(),
            "Version number out of range"
        );
        Self(ver)
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

/// A mask pattern (0–7).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Mask(u8);

impl Mask {
    /// # Panics
    ///
    /// Panics if the number is outside the range [0, 7].
    pub const fn new(mask: u8) -> Self {
        assert!(mask <= 7, "Mask value out of range");
        Self(mask)
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

fn get_bit(x: u32, i: i32) -> bool {
    (x >> i) & 1 != 0
}
