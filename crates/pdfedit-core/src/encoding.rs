//! Text encodings for string operands of text-showing operators
//!
//! Supports simple fonts (WinAnsi/Standard/MacRoman/PDFDoc with optional
//! `/Differences`), `/ToUnicode` CMaps with one- or two-byte codes, and
//! UTF-16BE strings with a byte order mark. Anything else is reported as
//! [`EngineError::UnsupportedEncoding`] so the caller can skip the run.

use crate::error::{EngineError, Result};
use std::collections::HashMap;

/// WinAnsiEncoding 0x80-0x9F; `None` marks undefined codes
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'),
    Some('\u{201E}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None, Some('\u{017D}'), None,
    None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'),
    Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
    Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
];

/// MacRomanEncoding 0x80-0xFF
const MAC_ROMAN_HIGH: [Option<char>; 128] = [
    Some('\u{00C4}'), Some('\u{00C5}'), Some('\u{00C7}'), Some('\u{00C9}'),
    Some('\u{00D1}'), Some('\u{00D6}'), Some('\u{00DC}'), Some('\u{00E1}'),
    Some('\u{00E0}'), Some('\u{00E2}'), Some('\u{00E4}'), Some('\u{00E3}'),
    Some('\u{00E5}'), Some('\u{00E7}'), Some('\u{00E9}'), Some('\u{00E8}'),
    Some('\u{00EA}'), Some('\u{00EB}'), Some('\u{00ED}'), Some('\u{00EC}'),
    Some('\u{00EE}'), Some('\u{00EF}'), Some('\u{00F1}'), Some('\u{00F3}'),
    Some('\u{00F2}'), Some('\u{00F4}'), Some('\u{00F6}'), Some('\u{00F5}'),
    Some('\u{00FA}'), Some('\u{00F9}'), Some('\u{00FB}'), Some('\u{00FC}'),
    Some('\u{2020}'), Some('\u{00B0}'), Some('\u{00A2}'), Some('\u{00A3}'),
    Some('\u{00A7}'), Some('\u{2022}'), Some('\u{00B6}'), Some('\u{00DF}'),
    Some('\u{00AE}'), Some('\u{00A9}'), Some('\u{2122}'), Some('\u{00B4}'),
    Some('\u{00A8}'), Some('\u{2260}'), Some('\u{00C6}'), Some('\u{00D8}'),
    Some('\u{221E}'), Some('\u{00B1}'), Some('\u{2264}'), Some('\u{2265}'),
    Some('\u{00A5}'), Some('\u{00B5}'), Some('\u{2202}'), Some('\u{2211}'),
    Some('\u{220F}'), Some('\u{03C0}'), Some('\u{222B}'), Some('\u{00AA}'),
    Some('\u{00BA}'), Some('\u{03A9}'), Some('\u{00E6}'), Some('\u{00F8}'),
    Some('\u{00BF}'), Some('\u{00A1}'), Some('\u{00AC}'), Some('\u{221A}'),
    Some('\u{0192}'), Some('\u{2248}'), Some('\u{2206}'), Some('\u{00AB}'),
    Some('\u{00BB}'), Some('\u{2026}'), Some('\u{00A0}'), Some('\u{00C0}'),
    Some('\u{00C3}'), Some('\u{00D5}'), Some('\u{0152}'), Some('\u{0153}'),
    Some('\u{2013}'), Some('\u{2014}'), Some('\u{201C}'), Some('\u{201D}'),
    Some('\u{2018}'), Some('\u{2019}'), Some('\u{00F7}'), Some('\u{25CA}'),
    Some('\u{00FF}'), Some('\u{0178}'), Some('\u{2044}'), Some('\u{00A4}'),
    Some('\u{2039}'), Some('\u{203A}'), Some('\u{FB01}'), Some('\u{FB02}'),
    Some('\u{2021}'), Some('\u{00B7}'), Some('\u{201A}'), Some('\u{201E}'),
    Some('\u{2030}'), Some('\u{00C2}'), Some('\u{00CA}'), Some('\u{00C1}'),
    Some('\u{00CB}'), Some('\u{00C8}'), Some('\u{00CD}'), Some('\u{00CE}'),
    Some('\u{00CF}'), Some('\u{00CC}'), Some('\u{00D3}'), Some('\u{00D4}'),
    None, Some('\u{00D2}'), Some('\u{00DA}'), Some('\u{00DB}'),
    Some('\u{00D9}'), Some('\u{0131}'), Some('\u{02C6}'), Some('\u{02DC}'),
    Some('\u{00AF}'), Some('\u{02D8}'), Some('\u{02D9}'), Some('\u{02DA}'),
    Some('\u{00B8}'), Some('\u{02DD}'), Some('\u{02DB}'), Some('\u{02C7}'),
];

/// StandardEncoding codes above 0x7F, sorted by code; all others are undefined
const STANDARD_HIGH: [(u8, char); 54] = [
    (0xA1, '\u{00A1}'), (0xA2, '\u{00A2}'), (0xA3, '\u{00A3}'), (0xA4, '\u{2044}'),
    (0xA5, '\u{00A5}'), (0xA6, '\u{0192}'), (0xA7, '\u{00A7}'), (0xA8, '\u{00A4}'),
    (0xA9, '\''), (0xAA, '\u{201C}'), (0xAB, '\u{00AB}'), (0xAC, '\u{2039}'),
    (0xAD, '\u{203A}'), (0xAE, '\u{FB01}'), (0xAF, '\u{FB02}'), (0xB1, '\u{2013}'),
    (0xB2, '\u{2020}'), (0xB3, '\u{2021}'), (0xB4, '\u{00B7}'), (0xB6, '\u{00B6}'),
    (0xB7, '\u{2022}'), (0xB8, '\u{201A}'), (0xB9, '\u{201E}'), (0xBA, '\u{201D}'),
    (0xBB, '\u{00BB}'), (0xBC, '\u{2026}'), (0xBD, '\u{2030}'), (0xBF, '\u{00BF}'),
    (0xC1, '`'), (0xC2, '\u{00B4}'), (0xC3, '\u{02C6}'), (0xC4, '\u{02DC}'),
    (0xC5, '\u{00AF}'), (0xC6, '\u{02D8}'), (0xC7, '\u{02D9}'), (0xC8, '\u{00A8}'),
    (0xCA, '\u{02DA}'), (0xCB, '\u{00B8}'), (0xCD, '\u{02DD}'), (0xCE, '\u{02DB}'),
    (0xCF, '\u{02C7}'), (0xD0, '\u{2014}'), (0xE1, '\u{00C6}'), (0xE3, '\u{00AA}'),
    (0xE8, '\u{0141}'), (0xE9, '\u{00D8}'), (0xEA, '\u{0152}'), (0xEB, '\u{00BA}'),
    (0xF1, '\u{00E6}'), (0xF5, '\u{0131}'), (0xF8, '\u{0142}'), (0xF9, '\u{00F8}'),
    (0xFA, '\u{0153}'), (0xFB, '\u{00DF}'),
];

/// PDFDocEncoding 0x18-0x1F (spacing accents)
const PDF_DOC_ACCENTS: [char; 8] = [
    '\u{02D8}', '\u{02C7}', '\u{02C6}', '\u{02D9}', '\u{02DD}', '\u{02DB}', '\u{02DA}', '\u{02DC}',
];

/// PDFDocEncoding 0x80-0x9F
const PDF_DOC_HIGH: [Option<char>; 32] = [
    Some('\u{2022}'), Some('\u{2020}'), Some('\u{2021}'), Some('\u{2026}'),
    Some('\u{2014}'), Some('\u{2013}'), Some('\u{0192}'), Some('\u{2044}'),
    Some('\u{2039}'), Some('\u{203A}'), Some('\u{2212}'), Some('\u{2030}'),
    Some('\u{201E}'), Some('\u{201C}'), Some('\u{201D}'), Some('\u{2018}'),
    Some('\u{2019}'), Some('\u{201A}'), Some('\u{2122}'), Some('\u{FB01}'),
    Some('\u{FB02}'), Some('\u{0141}'), Some('\u{0152}'), Some('\u{0160}'),
    Some('\u{0178}'), Some('\u{017D}'), Some('\u{0131}'), Some('\u{0142}'),
    Some('\u{0153}'), Some('\u{0161}'), Some('\u{017E}'), None,
];

/// Named single-byte encoding a simple font starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BaseEncoding {
    #[default]
    WinAnsi,
    MacRoman,
    Standard,
    PdfDoc,
}

impl BaseEncoding {
    /// Resolve an `/Encoding` or `/BaseEncoding` name.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"WinAnsiEncoding" => Some(BaseEncoding::WinAnsi),
            b"MacRomanEncoding" => Some(BaseEncoding::MacRoman),
            b"StandardEncoding" => Some(BaseEncoding::Standard),
            b"PDFDocEncoding" => Some(BaseEncoding::PdfDoc),
            _ => None,
        }
    }

    /// Character for a code, `None` when the code is undefined.
    pub fn decode(self, byte: u8) -> Option<char> {
        match (self, byte) {
            (BaseEncoding::WinAnsi, 0x80..=0x9F) => WIN_ANSI_HIGH[(byte - 0x80) as usize],
            (BaseEncoding::WinAnsi, _) => Some(byte as char),
            (BaseEncoding::MacRoman, 0x80..=0xFF) => MAC_ROMAN_HIGH[(byte - 0x80) as usize],
            (BaseEncoding::Standard, 0x27) => Some('\u{2019}'),
            (BaseEncoding::Standard, 0x60) => Some('\u{2018}'),
            (BaseEncoding::Standard, 0x80..=0xFF) => STANDARD_HIGH
                .iter()
                .find(|(code, _)| *code == byte)
                .map(|(_, c)| *c),
            (BaseEncoding::PdfDoc, 0x18..=0x1F) => Some(PDF_DOC_ACCENTS[(byte - 0x18) as usize]),
            (BaseEncoding::PdfDoc, 0x80..=0x9F) => PDF_DOC_HIGH[(byte - 0x80) as usize],
            (BaseEncoding::PdfDoc, 0xA0) => Some('\u{20AC}'),
            (BaseEncoding::PdfDoc, 0xAD) => None,
            (_, 0x7F) => None,
            _ => Some(byte as char),
        }
    }
}

/// How the bytes of a string operand map to Unicode
#[derive(Debug, Clone, PartialEq)]
pub enum FontEncoding {
    /// Single-byte encoding with optional `/Differences` overrides
    SingleByte {
        base: BaseEncoding,
        overrides: HashMap<u8, char>,
    },
    /// `/ToUnicode` CMap
    ToUnicode(ToUnicodeMap),
    /// Known but not decodable; the string is the reason
    Unsupported(String),
}

impl FontEncoding {
    pub fn win_ansi() -> Self {
        FontEncoding::SingleByte {
            base: BaseEncoding::WinAnsi,
            overrides: HashMap::new(),
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        if let Some(text) = decode_utf16_bom(bytes) {
            return Ok(text);
        }
        match self {
            FontEncoding::SingleByte { base, overrides } => Ok(bytes
                .iter()
                .map(|b| {
                    overrides
                        .get(b)
                        .copied()
                        .or_else(|| base.decode(*b))
                        .unwrap_or('\u{FFFD}')
                })
                .collect()),
            FontEncoding::ToUnicode(map) => map.decode(bytes),
            FontEncoding::Unsupported(reason) => {
                Err(EngineError::UnsupportedEncoding(reason.clone()))
            }
        }
    }
}

/// Encode text for a standard Latin font with WinAnsiEncoding.
/// Returns `None` if any character has no WinAnsi code.
pub fn encode_win_ansi(text: &str) -> Option<Vec<u8>> {
    text.chars()
        .map(|c| {
            let code = c as u32;
            match code {
                0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
                _ => WIN_ANSI_HIGH
                    .iter()
                    .position(|mapped| *mapped == Some(c))
                    .map(|i| 0x80 + i as u8),
            }
        })
        .collect()
}

fn decode_utf16_bom(bytes: &[u8]) -> Option<String> {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&utf16));
    }
    None
}

/// Map a glyph name from a `/Differences` array to a character.
pub fn glyph_name_to_char(name: &str) -> Option<char> {
    if let Some(hex) = name.strip_prefix("uni") {
        if hex.len() == 4 {
            return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
        }
    }
    if name.len() == 1 {
        let c = name.chars().next()?;
        if c.is_ascii_alphabetic() {
            return Some(c);
        }
    }
    let c = match name {
        "space" => ' ',
        "exclam" => '!',
        "quotedbl" => '"',
        "numbersign" => '#',
        "dollar" => '$',
        "percent" => '%',
        "ampersand" => '&',
        "quotesingle" => '\'',
        "parenleft" => '(',
        "parenright" => ')',
        "asterisk" => '*',
        "plus" => '+',
        "comma" => ',',
        "hyphen" | "minus" => '-',
        "period" => '.',
        "slash" => '/',
        "zero" => '0',
        "one" => '1',
        "two" => '2',
        "three" => '3',
        "four" => '4',
        "five" => '5',
        "six" => '6',
        "seven" => '7',
        "eight" => '8',
        "nine" => '9',
        "colon" => ':',
        "semicolon" => ';',
        "less" => '<',
        "equal" => '=',
        "greater" => '>',
        "question" => '?',
        "at" => '@',
        "bracketleft" => '[',
        "backslash" => '\\',
        "bracketright" => ']',
        "underscore" => '_',
        "quoteleft" => '\u{2018}',
        "quoteright" => '\u{2019}',
        "quotedblleft" => '\u{201C}',
        "quotedblright" => '\u{201D}',
        "bullet" => '\u{2022}',
        "endash" => '\u{2013}',
        "emdash" => '\u{2014}',
        "ellipsis" => '\u{2026}',
        "fi" => '\u{FB01}',
        "fl" => '\u{FB02}',
        "Euro" => '\u{20AC}',
        "eacute" => 'é',
        "egrave" => 'è',
        "aacute" => 'á',
        "agrave" => 'à',
        "udieresis" => 'ü',
        "odieresis" => 'ö',
        "adieresis" => 'ä',
        "germandbls" => 'ß',
        "ccedilla" => 'ç',
        "ntilde" => 'ñ',
        _ => return None,
    };
    Some(c)
}

/// Parsed `/ToUnicode` CMap
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToUnicodeMap {
    code_bytes: usize,
    mappings: HashMap<u32, String>,
}

impl ToUnicodeMap {
    /// Parse the `bfchar`/`bfrange` sections of a CMap program.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let tokens = tokenize_cmap(data);
        let mut map = ToUnicodeMap {
            code_bytes: 0,
            mappings: HashMap::new(),
        };

        let mut i = 0;
        while i < tokens.len() {
            match &tokens[i] {
                CMapToken::Keyword(k) if k == "begincodespacerange" => {
                    if let Some(CMapToken::Hex(lo)) = tokens.get(i + 1) {
                        map.code_bytes = map.code_bytes.max(lo.len());
                    }
                    i += 1;
                }
                CMapToken::Keyword(k) if k == "beginbfchar" => {
                    i += 1;
                    while let (Some(CMapToken::Hex(src)), Some(CMapToken::Hex(dst))) =
                        (tokens.get(i), tokens.get(i + 1))
                    {
                        map.note_width(src.len());
                        map.mappings.insert(code_value(src), utf16_be_string(dst));
                        i += 2;
                    }
                }
                CMapToken::Keyword(k) if k == "beginbfrange" => {
                    i += 1;
                    while let (Some(CMapToken::Hex(lo)), Some(CMapToken::Hex(hi))) =
                        (tokens.get(i), tokens.get(i + 1))
                    {
                        map.note_width(lo.len());
                        let (lo_code, hi_code) = (code_value(lo), code_value(hi));
                        if hi_code < lo_code || hi_code - lo_code > 0xFFFF {
                            return Err(EngineError::UnsupportedEncoding(
                                "ToUnicode bfrange is out of bounds".into(),
                            ));
                        }
                        match tokens.get(i + 2) {
                            Some(CMapToken::Hex(dst)) => {
                                let base = utf16_units(dst);
                                for (offset, code) in (lo_code..=hi_code).enumerate() {
                                    let mut units = base.clone();
                                    if let Some(last) = units.last_mut() {
                                        *last = last.wrapping_add(offset as u16);
                                    }
                                    map.mappings
                                        .insert(code, String::from_utf16_lossy(&units));
                                }
                                i += 3;
                            }
                            Some(CMapToken::Array(dsts)) => {
                                for (code, dst) in (lo_code..=hi_code).zip(dsts.iter()) {
                                    map.mappings.insert(code, utf16_be_string(dst));
                                }
                                i += 3;
                            }
                            _ => break,
                        }
                    }
                }
                _ => i += 1,
            }
        }

        if map.mappings.is_empty() {
            return Err(EngineError::UnsupportedEncoding(
                "ToUnicode CMap has no mappings".into(),
            ));
        }
        if map.code_bytes == 0 {
            map.code_bytes = 1;
        }
        Ok(map)
    }

    fn note_width(&mut self, width: usize) {
        if self.code_bytes == 0 {
            self.code_bytes = width.clamp(1, 4);
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        let width = self.code_bytes.max(1);
        if bytes.len() % width != 0 {
            return Err(EngineError::UnsupportedEncoding(format!(
                "string length {} is not a multiple of the {}-byte code width",
                bytes.len(),
                width
            )));
        }
        let mut text = String::new();
        for chunk in bytes.chunks(width) {
            let code = code_value(chunk);
            match self.mappings.get(&code) {
                Some(s) => text.push_str(s),
                None => {
                    return Err(EngineError::UnsupportedEncoding(format!(
                        "code {:#X} has no ToUnicode mapping",
                        code
                    )))
                }
            }
        }
        Ok(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum CMapToken {
    Hex(Vec<u8>),
    Array(Vec<Vec<u8>>),
    Keyword(String),
}

fn tokenize_cmap(data: &[u8]) -> Vec<CMapToken> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b'<' if data.get(i + 1) != Some(&b'<') => {
                let (hex, next) = read_hex(data, i + 1);
                tokens.push(CMapToken::Hex(hex));
                i = next;
            }
            b'<' | b'>' => i += 2,
            b'[' => {
                let mut items = Vec::new();
                i += 1;
                while i < data.len() && data[i] != b']' {
                    if data[i] == b'<' {
                        let (hex, next) = read_hex(data, i + 1);
                        items.push(hex);
                        i = next;
                    } else {
                        i += 1;
                    }
                }
                tokens.push(CMapToken::Array(items));
                i += 1;
            }
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b if b.is_ascii_alphabetic() => {
                let start = i;
                while i < data.len() && data[i].is_ascii_alphanumeric() {
                    i += 1;
                }
                tokens.push(CMapToken::Keyword(
                    String::from_utf8_lossy(&data[start..i]).into_owned(),
                ));
            }
            _ => i += 1,
        }
    }
    tokens
}

/// Read hex digits up to the closing '>', returning the bytes and the index after it.
fn read_hex(data: &[u8], start: usize) -> (Vec<u8>, usize) {
    let mut digits = Vec::new();
    let mut i = start;
    while i < data.len() && data[i] != b'>' {
        if data[i].is_ascii_hexdigit() {
            digits.push(data[i]);
        }
        i += 1;
    }
    if digits.len() % 2 == 1 {
        digits.push(b'0');
    }
    let bytes = digits
        .chunks(2)
        .filter_map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
        })
        .collect();
    (bytes, i + 1)
}

fn code_value(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0u32, |acc, b| (acc << 8) | *b as u32)
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|c| match c {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [single] => *single as u16,
            _ => 0,
        })
        .collect()
}

fn utf16_be_string(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CMAP: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0003> <0020>
<0011> <0048>
endbfchar
1 beginbfrange
<0012> <0014> <0065>
endbfrange
1 beginbfrange
<0020> <0021> [<006F> <0021>]
endbfrange
endcmap";

    #[test]
    fn test_win_ansi_decode() {
        let enc = FontEncoding::win_ansi();
        assert_eq!(enc.decode(b"Hello").unwrap(), "Hello");
        assert_eq!(enc.decode(&[0x93, b'x', 0x94]).unwrap(), "\u{201C}x\u{201D}");
        assert_eq!(enc.decode(&[0xE9]).unwrap(), "é");
    }

    fn single_byte(base: BaseEncoding) -> FontEncoding {
        FontEncoding::SingleByte {
            base,
            overrides: HashMap::new(),
        }
    }

    #[test]
    fn test_mac_roman_decode() {
        let enc = single_byte(BaseEncoding::MacRoman);
        assert_eq!(enc.decode(&[0x43, 0x61, 0x66, 0x8E]).unwrap(), "Caf\u{E9}");
        assert_eq!(enc.decode(&[0xD2, 0x41, 0xD3]).unwrap(), "\u{201C}A\u{201D}");
        assert_eq!(enc.decode(&[0xA5]).unwrap(), "\u{2022}");
    }

    #[test]
    fn test_standard_encoding_decode() {
        let enc = single_byte(BaseEncoding::Standard);
        assert_eq!(enc.decode(b"it's").unwrap(), "it\u{2019}s");
        assert_eq!(enc.decode(&[0xAE, 0xE8, 0xFB]).unwrap(), "\u{FB01}\u{141}\u{DF}");
        assert_eq!(enc.decode(&[0xE9]).unwrap(), "\u{D8}");
        assert_eq!(enc.decode(&[0xC0]).unwrap(), "\u{FFFD}");
    }

    #[test]
    fn test_pdf_doc_encoding_decode() {
        let enc = single_byte(BaseEncoding::PdfDoc);
        assert_eq!(enc.decode(&[0x84, 0xA0, 0xE9]).unwrap(), "\u{2014}\u{20AC}\u{E9}");
        assert_eq!(enc.decode(&[0x18]).unwrap(), "\u{2D8}");
        assert_eq!(enc.decode(&[0x9F]).unwrap(), "\u{FFFD}");
    }

    #[test]
    fn test_base_encoding_names() {
        assert_eq!(BaseEncoding::from_name(b"MacRomanEncoding"), Some(BaseEncoding::MacRoman));
        assert_eq!(BaseEncoding::from_name(b"PDFDocEncoding"), Some(BaseEncoding::PdfDoc));
        assert_eq!(BaseEncoding::from_name(b"MacExpertEncoding"), None);
    }

    #[test]
    fn test_differences_apply_over_base() {
        let mut overrides = HashMap::new();
        overrides.insert(0x8E, 'x');
        let enc = FontEncoding::SingleByte {
            base: BaseEncoding::MacRoman,
            overrides,
        };
        assert_eq!(enc.decode(&[0x8E, 0x8F]).unwrap(), "x\u{E8}");
    }

    #[test]
    fn test_utf16_bom_wins_over_font_encoding() {
        let enc = FontEncoding::Unsupported("Identity-H".into());
        assert_eq!(enc.decode(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]).unwrap(), "Hi");
    }

    #[test]
    fn test_unsupported_encoding_errors() {
        let enc = FontEncoding::Unsupported("Identity-H without ToUnicode".into());
        assert!(matches!(
            enc.decode(&[0x00, 0x11]),
            Err(EngineError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_differences_override() {
        let mut overrides = HashMap::new();
        overrides.insert(0x01, glyph_name_to_char("H").unwrap());
        overrides.insert(0x02, glyph_name_to_char("uni00E9").unwrap());
        let enc = FontEncoding::SingleByte {
            base: BaseEncoding::WinAnsi,
            overrides,
        };
        assert_eq!(enc.decode(&[0x01, 0x02]).unwrap(), "Hé");
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Hi!").unwrap(), b"Hi!".to_vec());
        assert_eq!(encode_win_ansi("\u{20AC}5").unwrap(), vec![0x80, b'5']);
        assert_eq!(encode_win_ansi("caf\u{E9}").unwrap(), vec![b'c', b'a', b'f', 0xE9]);
        assert!(encode_win_ansi("\u{4E2D}").is_none());
    }

    #[test]
    fn test_parse_to_unicode_cmap() {
        let map = ToUnicodeMap::parse(SAMPLE_CMAP).unwrap();
        // H e f g (range) space o !
        let bytes = [0x00, 0x11, 0x00, 0x12, 0x00, 0x13, 0x00, 0x03, 0x00, 0x20, 0x00, 0x21];
        assert_eq!(map.decode(&bytes).unwrap(), "Hef o!");
    }

    #[test]
    fn test_cmap_rejects_unmapped_code() {
        let map = ToUnicodeMap::parse(SAMPLE_CMAP).unwrap();
        assert!(map.decode(&[0x00, 0x99]).is_err());
        assert!(map.decode(&[0x00]).is_err());
    }

    #[test]
    fn test_cmap_without_mappings_is_unsupported() {
        assert!(ToUnicodeMap::parse(b"begincmap endcmap").is_err());
    }
}
