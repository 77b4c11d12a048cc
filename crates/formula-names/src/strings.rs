//! Byte-string decoding for NAME, EXTERNSHEET and SUPBOOK payloads and formula literals.

use std::collections::BTreeSet;
use std::sync::{Mutex, OnceLock};

use encoding_rs::{
    Encoding, BIG5, EUC_KR, GBK, IBM866, MACINTOSH, SHIFT_JIS, UTF_8, WINDOWS_1250, WINDOWS_1251,
    WINDOWS_1252, WINDOWS_1253, WINDOWS_1254, WINDOWS_1255, WINDOWS_1256, WINDOWS_1257,
    WINDOWS_1258, WINDOWS_874, X_MAC_CYRILLIC,
};
use formula_rpn::VersionFamily;

// BIFF8 string option flags used by ShortXLUnicodeString and XLUnicodeString.
const STR_FLAG_HIGH_BYTE: u8 = 0x01;
const STR_FLAG_EXT: u8 = 0x04;
const STR_FLAG_RICH_TEXT: u8 = 0x08;

/// CODEPAGE value written by BIFF8 files: strings are UTF-16LE, and "compressed" 8-bit strings
/// hold the low byte of each code unit.
pub const CODEPAGE_UTF16: u16 = 1200;

pub fn encoding_for_codepage(codepage: u16) -> Option<&'static Encoding> {
    Some(match codepage as u32 {
        866 => IBM866,
        874 => WINDOWS_874,
        932 => SHIFT_JIS,
        936 => GBK,
        949 => EUC_KR,
        950 => BIG5,
        1250 => WINDOWS_1250,
        1251 => WINDOWS_1251,
        1252 | 32769 => WINDOWS_1252,
        1253 => WINDOWS_1253,
        1254 => WINDOWS_1254,
        1255 => WINDOWS_1255,
        1256 => WINDOWS_1256,
        1257 => WINDOWS_1257,
        1258 => WINDOWS_1258,
        10000 | 32768 => MACINTOSH,
        10007 => X_MAC_CYRILLIC,
        65001 => UTF_8,
        _ => return None,
    })
}

pub fn decode_ansi(codepage: u16, bytes: &[u8]) -> String {
    if let Some(encoding) = encoding_for_codepage(codepage) {
        let (cow, _, _) = encoding.decode(bytes);
        return cow.into_owned();
    }

    if codepage != CODEPAGE_UTF16 {
        warn_unsupported_codepage(codepage);
    }

    // Lossless byte-to-Unicode mapping (ISO-8859-1): exact for compressed BIFF8 strings, and keeps
    // ASCII intact for codepages `encoding_rs` does not know.
    bytes.iter().copied().map(char::from).collect()
}

fn warn_unsupported_codepage(codepage: u16) {
    static WARNED: OnceLock<Mutex<BTreeSet<u16>>> = OnceLock::new();

    let warned = WARNED.get_or_init(|| Mutex::new(BTreeSet::new()));
    let mut warned = match warned.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    if warned.insert(codepage) {
        log::warn!(
            "unsupported BIFF CODEPAGE {codepage}; decoding 8-bit strings using lossless byte-to-Unicode mapping"
        );
    }
}

/// The string form used by `tStr`: a `ShortXLUnicodeString` in BIFF8, an 8-bit length-prefixed
/// codepage string before that. Returns the string and the number of bytes consumed.
pub fn parse_short_string(
    input: &[u8],
    family: VersionFamily,
    codepage: u16,
) -> Result<(String, usize), String> {
    if family.has_unicode_strings() {
        parse_biff8_short_string(input, codepage)
    } else {
        parse_biff5_short_string(input, codepage)
    }
}

/// BIFF2-BIFF7 "short string": 8-bit length prefix followed by ANSI bytes.
pub fn parse_biff5_short_string(input: &[u8], codepage: u16) -> Result<(String, usize), String> {
    let Some((&len, rest)) = input.split_first() else {
        return Err("unexpected end of string".to_string());
    };
    let len = len as usize;
    let bytes = rest
        .get(0..len)
        .ok_or_else(|| "unexpected end of string".to_string())?;
    Ok((decode_ansi(codepage, bytes), 1 + len))
}

/// BIFF8 `ShortXLUnicodeString` (8-bit length).
pub fn parse_biff8_short_string(input: &[u8], codepage: u16) -> Result<(String, usize), String> {
    if input.len() < 2 {
        return Err("unexpected end of string".to_string());
    }
    let cch = input[0] as usize;
    let flags = input[1];
    parse_biff8_string_payload(input, cch, flags, 2, codepage)
}

/// BIFF8 `XLUnicodeString` (16-bit length).
pub fn parse_biff8_unicode_string(input: &[u8], codepage: u16) -> Result<(String, usize), String> {
    if input.len() < 3 {
        return Err("unexpected end of string".to_string());
    }

    let cch = u16::from_le_bytes([input[0], input[1]]) as usize;
    let flags = input[2];
    parse_biff8_string_payload(input, cch, flags, 3, codepage)
}

/// BIFF8 `XLUnicodeStringNoCch`: the character count lives elsewhere in the record (NAME).
pub fn parse_biff8_unicode_string_no_cch(
    input: &[u8],
    cch: usize,
    codepage: u16,
) -> Result<(String, usize), String> {
    let Some(&flags) = input.first() else {
        return Err("unexpected end of string".to_string());
    };
    parse_biff8_string_payload(input, cch, flags, 1, codepage)
}

fn parse_biff8_string_payload(
    input: &[u8],
    cch: usize,
    flags: u8,
    mut offset: usize,
    codepage: u16,
) -> Result<(String, usize), String> {
    let richtext_runs = if flags & STR_FLAG_RICH_TEXT != 0 {
        let end = offset
            .checked_add(2)
            .ok_or_else(|| "string offset overflow".to_string())?;
        let bytes = input
            .get(offset..end)
            .ok_or_else(|| "unexpected end of string".to_string())?;
        let runs = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
        offset = end;
        runs
    } else {
        0
    };

    let ext_size = if flags & STR_FLAG_EXT != 0 {
        let end = offset
            .checked_add(4)
            .ok_or_else(|| "string offset overflow".to_string())?;
        let bytes = input
            .get(offset..end)
            .ok_or_else(|| "unexpected end of string".to_string())?;
        let size = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        offset = end;
        size
    } else {
        0
    };

    let is_unicode = (flags & STR_FLAG_HIGH_BYTE) != 0;
    let char_bytes = if is_unicode {
        cch.checked_mul(2)
            .ok_or_else(|| "string length overflow".to_string())?
    } else {
        cch
    };

    let end = offset
        .checked_add(char_bytes)
        .ok_or_else(|| "string length overflow".to_string())?;
    let chars = input
        .get(offset..end)
        .ok_or_else(|| "unexpected end of string".to_string())?;
    offset = end;

    let value = if is_unicode {
        let u16s: Vec<u16> = chars
            .chunks_exact(2)
            .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
            .collect();
        String::from_utf16_lossy(&u16s)
    } else {
        decode_ansi(codepage, chars)
    };

    let richtext_bytes = richtext_runs
        .checked_mul(4)
        .ok_or_else(|| "rich text run count overflow".to_string())?;
    let end = offset
        .checked_add(richtext_bytes)
        .and_then(|o| o.checked_add(ext_size))
        .ok_or_else(|| "string length overflow".to_string())?;
    if input.len() < end {
        return Err("unexpected end of string".to_string());
    }

    Ok((value, end))
}
