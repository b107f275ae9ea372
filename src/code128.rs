//! CODE128 encoder for the linear generator.
//!
//! Covers the full ASCII range using code sets A (control characters), B
//! (printable and lowercase) and C (digit pairs), switching between them as
//! the text requires. Output is a list of element widths in modules,
//! alternating bar/space and starting with a bar.

use crate::error::GenerateError;

/// Element widths for symbol values 0..=105; every pattern spans 11 modules.
const PATTERNS: [&str; 106] = [
    "212222", "222122", "222221", "121223", "121322", "131222", "122213", "122312", "132212",
    "221213", "221312", "231212", "112232", "122132", "122231", "113222", "123122", "123221",
    "223211", "221132", "221231", "213212", "223112", "312131", "311222", "321122", "321221",
    "312212", "322112", "322211", "212123", "212321", "232121", "111323", "131123", "131321",
    "112313", "132113", "132311", "211313", "231113", "231311", "112133", "112331", "132131",
    "113123", "113321", "133121", "313121", "211331", "231131", "213113", "213311", "213131",
    "311123", "311321", "331121", "312113", "312311", "332111", "314111", "221411", "431111",
    "111224", "111422", "121124", "121421", "141122", "141221", "112214", "112412", "122114",
    "122411", "142112", "142211", "241211", "221114", "413111", "241112", "134111", "111242",
    "121142", "121241", "114212", "124112", "124211", "411212", "421112", "421211", "212141",
    "214121", "412121", "111143", "111341", "131141", "114113", "114311", "411113", "411311",
    "113141", "114131", "311141", "411131", "211412", "211214", "211232",
];

/// Stop symbol plus the final bar, 13 modules.
const STOP: [u8; 7] = [2, 3, 3, 1, 1, 1, 2];

const CODE_C: u8 = 99;
const CODE_B: u8 = 100;
const CODE_A: u8 = 101;
const START_A: u8 = 103;
const START_B: u8 = 104;
const START_C: u8 = 105;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
    C,
}

impl CodeSet {
    fn value_of(self, b: u8) -> Option<u8> {
        match self {
            CodeSet::A => match b {
                0..=31 => Some(b + 64),
                32..=95 => Some(b - 32),
                _ => None,
            },
            CodeSet::B => match b {
                32..=127 => Some(b - 32),
                _ => None,
            },
            CodeSet::C => None,
        }
    }

    fn switch_code(self) -> u8 {
        match self {
            CodeSet::A => CODE_A,
            CodeSet::B => CODE_B,
            CodeSet::C => CODE_C,
        }
    }
}

/// Symbol values for `text`: start code, data, check value. The stop symbol
/// is not included.
pub fn encode_values(text: &str) -> Result<Vec<u8>, GenerateError> {
    if text.is_empty() {
        return Err(GenerateError::EmptyPayload);
    }
    if let Some((position, ch)) = text.chars().enumerate().find(|(_, c)| !c.is_ascii()) {
        return Err(GenerateError::UnsupportedCharacter { ch, position });
    }
    let bytes = text.as_bytes();

    let mut set = if use_code_c(bytes, 0, true) {
        CodeSet::C
    } else {
        text_set_for(bytes, 0)
    };
    let mut values = vec![match set {
        CodeSet::A => START_A,
        CodeSet::B => START_B,
        CodeSet::C => START_C,
    }];

    let mut i = 0;
    while i < bytes.len() {
        if set == CodeSet::C {
            if i + 1 < bytes.len() && bytes[i].is_ascii_digit() && bytes[i + 1].is_ascii_digit() {
                values.push((bytes[i] - b'0') * 10 + (bytes[i + 1] - b'0'));
                i += 2;
                continue;
            }
            set = text_set_for(bytes, i);
            values.push(set.switch_code());
            continue;
        }

        let run = digit_run(bytes, i);
        if use_code_c(bytes, i, false) {
            if run % 2 == 1 {
                // odd run: first digit stays in the current set
                values.push(bytes[i] - 32);
                i += 1;
            }
            set = CodeSet::C;
            values.push(CODE_C);
            continue;
        }

        match set.value_of(bytes[i]) {
            Some(v) => {
                values.push(v);
                i += 1;
            }
            None => {
                set = text_set_for(bytes, i);
                values.push(set.switch_code());
            }
        }
    }

    values.push(checksum(&values));
    Ok(values)
}

/// Element widths for the whole symbol, stop included, quiet zones excluded.
pub fn encode_widths(text: &str) -> Result<Vec<u8>, GenerateError> {
    let values = encode_values(text)?;
    let mut widths = Vec::with_capacity(values.len() * 6 + STOP.len());
    for v in values {
        widths.extend(PATTERNS[usize::from(v)].bytes().map(|b| b - b'0'));
    }
    widths.extend_from_slice(&STOP);
    Ok(widths)
}

/// Mod-103 check value over the start code and weighted data values.
fn checksum(values: &[u8]) -> u8 {
    let sum = values
        .iter()
        .enumerate()
        .map(|(i, &v)| u32::from(v) * (i as u32).max(1))
        .sum::<u32>();
    (sum % 103) as u8
}

fn digit_run(bytes: &[u8], from: usize) -> usize {
    bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count()
}

/// Set C pays off for at least 4 digits at the start or end of the data, or
/// 6 in the middle; an all-digit text of even length always uses it.
fn use_code_c(bytes: &[u8], from: usize, at_start: bool) -> bool {
    let run = digit_run(bytes, from);
    let reaches_end = from + run == bytes.len();
    if at_start && reaches_end {
        return run >= 2 && run % 2 == 0;
    }
    if at_start || reaches_end {
        run >= 4
    } else {
        run >= 6
    }
}

/// A or B, whichever covers the next character that only one of them has.
fn text_set_for(bytes: &[u8], from: usize) -> CodeSet {
    for &b in &bytes[from..] {
        if b < 32 {
            return CodeSet::A;
        }
        if b >= 96 {
            return CodeSet::B;
        }
    }
    CodeSet::B
}
