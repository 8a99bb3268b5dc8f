//! BCEL class-name encoding
//!
//! The BCEL class loader treats any class name starting with `$$BCEL$$` as
//! an inline class definition: the rest of the name is gzip-compressed
//! class bytes, escaped so every character is a legal Java identifier part.

use flate2::Compression;
use flate2::GzBuilder;
use flate2::read::GzDecoder;
use std::io::{Read, Write};

use crate::error::{Error, Result};

/// Prefix marking an inline class definition
pub const BCEL_PREFIX: &str = "$$BCEL$$";

const ESCAPE: char = '$';

/// Characters used for the short escape of bytes below 48
const CHAR_MAP: [u8; 48] = *b"ABCDEFGHIJKLMNOPQRSTUVWXYZghijklmnopqrstuvwxyz$_";

/// Encode class bytes as a loadable BCEL class name
pub fn encode_class(class_bytes: &[u8]) -> Result<String> {
    let mut gz = GzBuilder::new()
        .operating_system(0)
        .write(Vec::new(), Compression::default());
    gz.write_all(class_bytes)?;
    let compressed = gz.finish()?;
    Ok(format!("{BCEL_PREFIX}{}", escape(&compressed)))
}

/// Decode a BCEL class name back to class bytes
pub fn decode_class(name: &str) -> Result<Vec<u8>> {
    let body = name
        .strip_prefix(BCEL_PREFIX)
        .ok_or_else(|| Error::Serialize(format!("not a BCEL class name: {name}")))?;
    let compressed = unescape(body)?;
    let mut out = Vec::new();
    GzDecoder::new(compressed.as_slice()).read_to_end(&mut out)?;
    Ok(out)
}

/// Escape raw bytes into identifier characters
pub fn escape(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        if is_identifier_part(b) && b != ESCAPE as u8 {
            out.push(char::from(b));
            continue;
        }
        out.push(ESCAPE);
        if (b as usize) < CHAR_MAP.len() {
            out.push(char::from(CHAR_MAP[b as usize]));
        } else {
            out.push_str(&format!("{b:02x}"));
        }
    }
    out
}

/// Inverse of [`escape`]
pub fn unescape(text: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != ESCAPE {
            let b = u8::try_from(u32::from(c))
                .map_err(|_| Error::Serialize(format!("character {c:?} outside latin-1")))?;
            out.push(b);
            continue;
        }
        let first = chars
            .next()
            .ok_or_else(|| Error::Serialize("dangling escape".to_string()))?;
        if first.is_ascii_digit() || ('a'..='f').contains(&first) {
            let second = chars
                .next()
                .ok_or_else(|| Error::Serialize("truncated hex escape".to_string()))?;
            let hex: String = [first, second].iter().collect();
            let b = u8::from_str_radix(&hex, 16)
                .map_err(|_| Error::Serialize(format!("bad hex escape ${hex}")))?;
            out.push(b);
        } else {
            let idx = CHAR_MAP
                .iter()
                .position(|m| char::from(*m) == first)
                .ok_or_else(|| Error::Serialize(format!("bad escape ${first}")))?;
            out.push(idx as u8);
        }
    }
    Ok(out)
}

/// `Character.isJavaIdentifierPart` restricted to latin-1
fn is_identifier_part(b: u8) -> bool {
    matches!(b,
        b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'$'
        // identifier-ignorable controls
        | 0x00..=0x08 | 0x0e..=0x1b | 0x7f..=0x9f
        // currency symbols, soft hyphen
        | 0xa2..=0xa5 | 0xad
        // latin-1 letters
        | 0xaa | 0xb5 | 0xba | 0xc0..=0xd6 | 0xd8..=0xf6 | 0xf8..=0xff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_identifier_chars_pass_through() {
        assert_eq!(escape(b"Abc_09"), "Abc_09");
    }

    #[test]
    fn test_escape_short_codes() {
        // '$' (36) and '.' (46) use the short escape table
        assert_eq!(escape(b"$"), "$q");
        assert_eq!(escape(b"."), "$$");
        assert_eq!(escape(b"/"), "$_");
        assert_eq!(escape(&[0x0a]), "$K");
    }

    #[test]
    fn test_escape_hex_codes() {
        assert_eq!(escape(b":"), "$3a");
        assert_eq!(escape(&[0xfe]), "\u{fe}");
        assert_eq!(escape(&[0xa0]), "$a0");
    }

    #[test]
    fn test_ignorable_controls_pass_through() {
        assert_eq!(escape(&[0x01]), "\u{1}");
        assert_eq!(escape(&[0x85]), "\u{85}");
    }

    #[test]
    fn test_unescape_inverts_escape() {
        let bytes: Vec<u8> = (0..=255).collect();
        assert_eq!(unescape(&escape(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn test_encode_class_has_prefix_and_gzip_header() {
        let class = [0xca, 0xfe, 0xba, 0xbe, 0x00, 0x00, 0x00, 0x34];
        let name = encode_class(&class).unwrap();
        assert!(name.starts_with(BCEL_PREFIX));

        let compressed = unescape(&name[BCEL_PREFIX.len()..]).unwrap();
        assert_eq!(&compressed[..4], &[0x1f, 0x8b, 0x08, 0x00]);
        assert_eq!(compressed[9], 0, "OS byte matches java.util.zip");

        assert_eq!(decode_class(&name).unwrap(), class);
    }

    #[test]
    fn test_decode_rejects_plain_names() {
        assert!(decode_class("com.example.Foo").is_err());
    }
}
