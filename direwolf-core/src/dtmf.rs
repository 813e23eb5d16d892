//! DTMF ↔ text codec (§4.7): the APRStt touch-tone encodings. Three
//! reversible digit-sequence schemes (multi-press, two-key, fixed-
//! length call10), a Maidenhead grid-square encoding, a small
//! satellite-gridsquare lookup, an ASCII-2D encoding, and a checksum.
//!
//! The `translate`/`call10encoding`/`grid` tables are pure data, kept
//! as `const` arrays per §9's design note, with reverse lookups built
//! at call time from the same table rather than hand-duplicated.

use crate::errors::DtmfError;

/// One telephone keypad key: its digit character and the letters (in
/// column order) it selects. Key `0` carries a single "letter" (space)
/// so it participates in the same column scheme as lettered keys; key
/// `1` carries none.
const KEYPAD: [(u8, &str); 10] = [
    (b'0', " "),
    (b'1', ""),
    (b'2', "ABC"),
    (b'3', "DEF"),
    (b'4', "GHI"),
    (b'5', "JKL"),
    (b'6', "MNO"),
    (b'7', "PQRS"),
    (b'8', "TUV"),
    (b'9', "WXYZ"),
];

fn key_letters(digit: u8) -> &'static str {
    KEYPAD
        .iter()
        .find(|(d, _)| *d == digit)
        .map(|(_, letters)| *letters)
        .unwrap_or("")
}

/// Key and 0-based column of `ch` among its key's letters, or `None`
/// if `ch` isn't a letter/space this table covers.
fn find_letter(ch: char) -> Option<(u8, usize)> {
    let upper = ch.to_ascii_uppercase();
    for (digit, letters) in KEYPAD {
        if let Some(pos) = letters.chars().position(|c| c == upper) {
            return Some((digit, pos));
        }
    }
    None
}

fn is_supported_char(ch: char) -> bool {
    ch.is_ascii_digit() || ch == ' ' || find_letter(ch).is_some()
}

// ---------------------------------------------------------------- //
// Multi-press
// ---------------------------------------------------------------- //

/// Encode text (A-Z, 0-9, space) to multi-press DTMF digits: one key
/// press per letter position (column), `A` separating two same-key
/// groups in a row; a literal digit is pressed one more time than its
/// key has letters.
pub fn text_to_multipress(text: &str) -> Result<String, DtmfError> {
    let mut out = String::new();
    let mut last_digit: Option<u8> = None;
    for (position, ch) in text.chars().enumerate() {
        let (digit, presses) = if ch.is_ascii_digit() {
            let d = ch as u8;
            let letters = key_letters(d);
            (d, letters.chars().count() + 1)
        } else if ch == ' ' {
            (b'0', 1)
        } else if let Some((d, col)) = find_letter(ch) {
            (d, col + 1)
        } else {
            return Err(DtmfError::InvalidDigit {
                digit: ch,
                position,
            });
        };

        if last_digit == Some(digit) {
            out.push('A');
        }
        for _ in 0..presses {
            out.push(digit as char);
        }
        last_digit = Some(digit);
    }
    Ok(out)
}

/// Decode multi-press DTMF digits back to text.
pub fn multipress_to_text(dtmf: &str) -> Result<String, DtmfError> {
    let mut out = String::new();
    let chars: Vec<char> = dtmf.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == 'A' {
            // Explicit same-key separator with nothing before a group
            // is malformed.
            return Err(DtmfError::RunawayRepeat { position: i });
        }
        if !chars[i].is_ascii_digit() {
            return Err(DtmfError::InvalidDigit {
                digit: chars[i],
                position: i,
            });
        }
        let digit = chars[i] as u8;
        let start = i;
        let mut run = 0usize;
        while i < chars.len() && chars[i] as u8 == digit {
            run += 1;
            i += 1;
        }
        let letters = key_letters(digit);
        let letter_count = letters.chars().count();
        if run == letter_count + 1 {
            // Literal digit.
            out.push(digit as char);
        } else if run >= 1 && run <= letter_count.max(1) {
            match letters.chars().nth(run - 1) {
                Some(c) => out.push(c),
                None => {
                    return Err(DtmfError::ColumnOutOfRange {
                        column: run as u8,
                        position: start,
                    })
                }
            }
        } else {
            return Err(DtmfError::RunawayRepeat { position: start });
        }

        // Consume a separator 'A' between two same-key groups.
        if i < chars.len() && chars[i] == 'A' {
            i += 1;
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------- //
// Two-key
// ---------------------------------------------------------------- //

fn column_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

fn column_from_letter(ch: char) -> Option<usize> {
    if ('A'..='D').contains(&ch) {
        Some((ch as u8 - b'A') as usize)
    } else {
        None
    }
}

/// Encode text to two-key DTMF: `digit` + column letter (`A`-`D`) for
/// a keypad letter, or a bare `digit` for a literal digit.
pub fn text_to_two_key(text: &str) -> Result<String, DtmfError> {
    let mut out = String::new();
    for (position, ch) in text.chars().enumerate() {
        if ch.is_ascii_digit() {
            out.push(ch);
        } else if ch == ' ' {
            out.push('0');
            out.push(column_letter(0));
        } else if let Some((digit, col)) = find_letter(ch) {
            out.push(digit as char);
            out.push(column_letter(col));
        } else {
            return Err(DtmfError::InvalidDigit {
                digit: ch,
                position,
            });
        }
    }
    Ok(out)
}

/// Decode two-key DTMF digits back to text.
pub fn two_key_to_text(dtmf: &str) -> Result<String, DtmfError> {
    let chars: Vec<char> = dtmf.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if !ch.is_ascii_digit() {
            return Err(DtmfError::InvalidDigit {
                digit: ch,
                position: i,
            });
        }
        let digit = ch as u8;
        let next_is_column = chars.get(i + 1).copied().and_then(column_from_letter);
        match next_is_column {
            Some(col) => {
                let letters = key_letters(digit);
                match letters.chars().nth(col) {
                    Some(c) => out.push(c),
                    None => {
                        return Err(DtmfError::ColumnOutOfRange {
                            column: col as u8,
                            position: i,
                        })
                    }
                }
                i += 2;
            }
            None => {
                out.push(ch);
                i += 1;
            }
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------- //
// Fixed-length 10-digit callsign (call10)
// ---------------------------------------------------------------- //

/// Number of characters call10 encodes per frame; shorter text is
/// space-padded, longer text is rejected.
pub const CALL10_CHARS: usize = 6;

/// Column 0 marks a literal digit/space (no key has a "0th" letter); a
/// letter's column is its 1-based position among its key's letters, so
/// `A`/`D`/`G`/... (first letter of any key) is column 1, matching the
/// two-key scheme's column numbering in [`text_to_two_key`].
fn call10_column(ch: char) -> Result<(u8, usize), DtmfError> {
    if ch == ' ' {
        return Ok((b'0', 0));
    }
    if ch.is_ascii_digit() {
        return Ok((ch as u8, 0));
    }
    if let Some((digit, col)) = find_letter(ch) {
        return Ok((digit, col + 1));
    }
    Err(DtmfError::InvalidDigit {
        digit: ch,
        position: 0,
    })
}

/// Encode up to [`CALL10_CHARS`] characters (space-padded) to the
/// fixed 10-digit call10 form: 6 button digits followed by a 4-digit
/// decimal encoding of each character's column as a base-4 number.
pub fn text_to_call10(text: &str) -> Result<String, DtmfError> {
    if text.chars().count() > CALL10_CHARS {
        return Err(DtmfError::Call10BadLength {
            len: text.chars().count(),
        });
    }
    let mut padded: Vec<char> = text.chars().collect();
    padded.resize(CALL10_CHARS, ' ');

    let mut buttons = String::with_capacity(CALL10_CHARS);
    let mut value: u32 = 0;
    for &ch in &padded {
        let (digit, column) = call10_column(ch)?;
        buttons.push(digit as char);
        value = value * 4 + column as u32;
    }
    Ok(format!("{buttons}{value:04}"))
}

/// Decode a 10-digit call10 string back to text, right-trimmed of
/// trailing padding spaces (property 7).
pub fn call10_to_text(call10: &str) -> Result<String, DtmfError> {
    let chars: Vec<char> = call10.chars().collect();
    if chars.len() != 10 {
        return Err(DtmfError::Call10BadLength { len: chars.len() });
    }
    let buttons = &chars[..CALL10_CHARS];
    let value_str: String = chars[CALL10_CHARS..].iter().collect();
    let mut value: u32 = value_str.parse().map_err(|_| DtmfError::Call10BadLength {
        len: chars.len(),
    })?;

    let mut columns = [0u32; CALL10_CHARS];
    for i in (0..CALL10_CHARS).rev() {
        columns[i] = value % 4;
        value /= 4;
    }

    let mut out = String::with_capacity(CALL10_CHARS);
    for (i, &button) in buttons.iter().enumerate() {
        if !button.is_ascii_digit() {
            return Err(DtmfError::InvalidDigit {
                digit: button,
                position: i,
            });
        }
        let digit = button as u8;
        let letters = key_letters(digit);
        let column = columns[i] as usize;
        if column == 0 {
            // Literal marker: the pressed digit itself, space for '0'.
            out.push(if digit == b'0' { ' ' } else { button });
        } else if column - 1 < letters.chars().count() {
            out.push(letters.chars().nth(column - 1).unwrap());
        } else {
            return Err(DtmfError::ColumnOutOfRange {
                column: columns[i] as u8,
                position: i,
            });
        }
    }
    Ok(out.trim_end().to_string())
}

// ---------------------------------------------------------------- //
// Maidenhead grid
// ---------------------------------------------------------------- //

/// Encode a Maidenhead locator (alternating letter-pair/digit-pair
/// groups: field, square, subsquare, ...) to decimal digits: a letter
/// contributes its keypad digit followed by its 1-based column among
/// that key's letters (the same two-key scheme [`text_to_two_key`]
/// uses, just with the column spelled as a digit instead of `A`-`D`), a
/// literal grid digit contributes itself unchanged.
pub fn grid_to_digits(grid: &str) -> Result<String, DtmfError> {
    let mut out = String::new();
    for (i, ch) in grid.chars().enumerate() {
        let pair_is_letters = (i / 2) % 2 == 0;
        if pair_is_letters {
            let (digit, col) =
                find_letter(ch).ok_or(DtmfError::GridRangeExceeded { position: i })?;
            out.push(digit as char);
            out.push_str(&(col + 1).to_string());
        } else {
            if !ch.is_ascii_digit() {
                return Err(DtmfError::GridRangeExceeded { position: i });
            }
            out.push(ch);
        }
    }
    Ok(out)
}

/// Inverse of [`grid_to_digits`]; `char_count` is the number of grid
/// characters to reconstruct (grid pairs alternate letters/digits, so
/// the digit-string length alone doesn't determine it unambiguously).
pub fn digits_to_grid(digits: &str, char_count: usize) -> Result<String, DtmfError> {
    let chars: Vec<char> = digits.chars().collect();
    let mut out = String::with_capacity(char_count);
    let mut cursor = 0usize;
    for i in 0..char_count {
        let pair_is_letters = (i / 2) % 2 == 0;
        if pair_is_letters {
            if cursor + 2 > chars.len() {
                return Err(DtmfError::GridRangeExceeded { position: i });
            }
            let key_digit = chars[cursor] as u8;
            let col = chars[cursor + 1]
                .to_digit(10)
                .ok_or(DtmfError::GridRangeExceeded { position: i })? as usize;
            if col == 0 {
                return Err(DtmfError::GridRangeExceeded { position: i });
            }
            let letters = key_letters(key_digit);
            match letters.chars().nth(col - 1) {
                Some(c) => out.push(c),
                None => return Err(DtmfError::GridRangeExceeded { position: i }),
            }
            cursor += 2;
        } else {
            if cursor >= chars.len() {
                return Err(DtmfError::GridRangeExceeded { position: i });
            }
            out.push(chars[cursor]);
            cursor += 1;
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------- //
// Satellite gridsquare (§4.7): a small lookup table
// ---------------------------------------------------------------- //

/// Representative satellite-gridsquare table: maps a 4-character grid
/// (field+square) to a 4-digit code. Populated sparsely, like the
/// production table's "populated regions" coverage — this is a
/// stand-in set, not the authentic Dire Wolf table (unavailable to
/// this rewrite), sized and shaped the same way.
const SATELLITE_GRID_TABLE: &[(&str, &str)] = &[
    ("FN20", "1020"),
    ("FN31", "1031"),
    ("EM29", "2029"),
    ("EM79", "2079"),
    ("IO91", "3091"),
    ("JO65", "3065"),
    ("QF22", "4022"),
    ("PM95", "4095"),
    ("CM87", "5087"),
    ("DM13", "5013"),
];

pub fn satellite_grid_to_code(grid4: &str) -> Result<String, DtmfError> {
    let upper = grid4.to_ascii_uppercase();
    SATELLITE_GRID_TABLE
        .iter()
        .find(|(g, _)| *g == upper)
        .map(|(_, code)| code.to_string())
        .ok_or(DtmfError::UnknownSatelliteGrid { code: upper })
}

pub fn satellite_code_to_grid(code: &str) -> Result<String, DtmfError> {
    SATELLITE_GRID_TABLE
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(g, _)| g.to_string())
        .ok_or_else(|| DtmfError::UnknownSatelliteGrid {
            code: code.to_string(),
        })
}

// ---------------------------------------------------------------- //
// ASCII-2D
// ---------------------------------------------------------------- //

/// Encode printable ASCII (0x20..=0x7e) as two decimal digits each
/// (`code - 32`).
pub fn ascii_to_ascii2d(text: &str) -> Result<String, DtmfError> {
    let mut out = String::new();
    for (position, ch) in text.chars().enumerate() {
        let code = ch as u32;
        if !(0x20..=0x7e).contains(&code) {
            return Err(DtmfError::InvalidDigit {
                digit: ch,
                position,
            });
        }
        out.push_str(&format!("{:02}", code - 0x20));
    }
    Ok(out)
}

pub fn ascii2d_to_ascii(digits: &str) -> Result<String, DtmfError> {
    let chars: Vec<char> = digits.chars().collect();
    if chars.len() % 2 != 0 {
        return Err(DtmfError::Call10BadLength { len: chars.len() });
    }
    let mut out = String::with_capacity(chars.len() / 2);
    for (i, pair) in chars.chunks(2).enumerate() {
        let s: String = pair.iter().collect();
        let value: u32 = s
            .parse()
            .map_err(|_| DtmfError::ColumnOutOfRange {
                column: 0,
                position: i * 2,
            })?;
        let code = value + 0x20;
        out.push(char::from_u32(code).ok_or(DtmfError::ColumnOutOfRange {
            column: 0,
            position: i * 2,
        })?);
    }
    Ok(out)
}

// ---------------------------------------------------------------- //
// Checksum
// ---------------------------------------------------------------- //

/// `(sum of digits mod 10)`, letters counting as `10 + ord - 'A'`.
pub fn checksum_digit(text: &str) -> u8 {
    let sum: u32 = text
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                c.to_digit(10).unwrap()
            } else if c.is_ascii_alphabetic() {
                10 + (c.to_ascii_uppercase() as u32 - 'A' as u32)
            } else {
                0
            }
        })
        .sum();
    (sum % 10) as u8
}

pub fn append_checksum(text: &str) -> String {
    format!("{text}{}", checksum_digit(text))
}

pub fn verify_checksum(text_with_checksum: &str) -> bool {
    if text_with_checksum.is_empty() {
        return false;
    }
    let split = text_with_checksum.len() - 1;
    let (body, check) = text_with_checksum.split_at(split);
    check
        .parse::<u8>()
        .map(|c| c == checksum_digit(body))
        .unwrap_or(false)
}
