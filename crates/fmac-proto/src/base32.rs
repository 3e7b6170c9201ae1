//! RFC 4648 base32 as used for transcribed TOTP secrets.
//!
//! Decoding is deliberately lenient: characters outside the alphabet
//! (spaces, dashes, `=` padding, typos) are skipped rather than rejected.
//! A malformed secret therefore yields a different key instead of an error.

/// Base32 alphabet (RFC 4648).
pub const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

fn symbol_value(c: u8) -> Option<u8> {
    match c.to_ascii_uppercase() {
        upper @ b'A'..=b'Z' => Some(upper - b'A'),
        digit @ b'2'..=b'7' => Some(digit - b'2' + 26),
        _ => None,
    }
}

/// Decode `input`, skipping every character that is not a base32 symbol.
///
/// Trailing bits that do not fill a whole byte are discarded.
pub fn decode_lenient(input: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for value in input.bytes().filter_map(symbol_value) {
        buffer = (buffer << 5) | u32::from(value);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }

    out
}

/// Encode `data` without padding.
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() + 4) / 5 * 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
        buffer &= (1 << bits) - 1;
    }

    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }

    out
}
