//! Byte rendering for stream logs
//!
//! Printable ASCII passes through literally except backslash and double
//! quote, which are escaped; everything else renders as a two-digit
//! lowercase hex escape.

use std::fmt::Write;

pub fn render_byte(out: &mut String, byte: u8) {
    match byte {
        0x5C => out.push_str("\\\\"),
        0x22 => out.push_str("\\\""),
        0x20..=0x7E => out.push(byte as char),
        other => {
            write!(out, "\\x{:02x}", other).expect("writing to a String cannot fail");
        }
    }
}

pub fn render_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len());
    for &byte in data {
        render_byte(&mut out, byte);
    }
    out
}
