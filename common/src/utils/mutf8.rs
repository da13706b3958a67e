//! Modified UTF-8 as used by `CONSTANT_Utf8` entries: NUL is encoded on two
//! bytes and supplementary characters as surrogate pairs of three bytes each.

use crate::error::CursorError;

pub fn decode(bytes: &[u8]) -> Result<String, CursorError> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i] as u16;
        let invalid = CursorError::InvalidModifiedUtf8 { position: i };
        if b0 & 0x80 == 0 {
            if b0 == 0 {
                return Err(invalid);
            }
            units.push(b0);
            i += 1;
        } else if b0 & 0xE0 == 0xC0 {
            let b1 = continuation(bytes, i + 1).ok_or(invalid)?;
            units.push(((b0 & 0x1F) << 6) | b1);
            i += 2;
        } else if b0 & 0xF0 == 0xE0 {
            let b1 = continuation(bytes, i + 1).ok_or(invalid.clone())?;
            let b2 = continuation(bytes, i + 2).ok_or(invalid)?;
            units.push(((b0 & 0x0F) << 12) | (b1 << 6) | b2);
            i += 3;
        } else {
            return Err(invalid);
        }
    }
    String::from_utf16(&units).map_err(|_| CursorError::InvalidModifiedUtf8 { position: 0 })
}

fn continuation(bytes: &[u8], at: usize) -> Option<u16> {
    let b = *bytes.get(at)?;
    (b & 0xC0 == 0x80).then_some((b & 0x3F) as u16)
}

pub fn encode(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}
