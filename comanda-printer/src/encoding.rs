//! Windows-1252 encoding utilities for Latin-script thermal printers
//!
//! The receipts this agent prints are Latin-script (Portuguese labels,
//! accented customer names), so printer text goes out as Windows-1252.
//! This module provides:
//! - Width calculation, truncation and padding (1252 is single-byte)
//! - Converting UTF-8 to the code page while preserving raw command bytes

/// Byte width of a string in Windows-1252
///
/// Every character encodes to exactly one byte (unmappable characters
/// degrade to `?`), so the width equals the character count.
pub fn codepage_width(s: &str) -> usize {
    s.chars().count()
}

/// Truncate a string to fit within a code-page byte width
pub fn truncate_codepage(s: &str, max_width: usize) -> String {
    s.chars().take(max_width).collect()
}

/// Pad a string to a specific code-page byte width
///
/// If the string is longer than the width, it will be truncated.
pub fn pad_codepage(s: &str, width: usize, align_right: bool) -> String {
    let current = codepage_width(s);
    if current >= width {
        return truncate_codepage(s, width);
    }
    let spaces = width - current;
    if align_right {
        format!("{}{}", " ".repeat(spaces), s)
    } else {
        format!("{}{}", s, " ".repeat(spaces))
    }
}

/// Convert mixed UTF-8 content (with printer commands) to Windows-1252
///
/// ASCII bytes (0x00-0x7F) pass through exactly as-is, which protects
/// command sequences from being corrupted. Only bytes >= 0x80 are
/// treated as UTF-8 sequences and re-encoded; characters outside the
/// code page degrade to `?`.
pub fn convert_to_codepage(bytes: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(bytes.len());
    let mut buffer = Vec::new();

    for &b in bytes {
        if b < 128 {
            flush_buffer(&mut buffer, &mut result);
            result.push(b);
        } else {
            buffer.push(b);
        }
    }

    flush_buffer(&mut buffer, &mut result);
    result
}

/// Flush the non-ASCII buffer, converting UTF-8 to Windows-1252
fn flush_buffer(buffer: &mut Vec<u8>, result: &mut Vec<u8>) {
    if buffer.is_empty() {
        return;
    }

    let s = String::from_utf8_lossy(buffer);
    for c in s.chars() {
        result.push(encode_char(c));
    }
    buffer.clear();
}

fn encode_char(c: char) -> u8 {
    let mut tmp = [0u8; 4];
    let (encoded, _, had_errors) = encoding_rs::WINDOWS_1252.encode(c.encode_utf8(&mut tmp));
    if had_errors || encoded.len() != 1 {
        b'?'
    } else {
        encoded[0]
    }
}
