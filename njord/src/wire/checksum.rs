//! XOR checksums shared by both sentence formats.
//!
//! TAIP covers every byte from `>` through `*` inclusive; NMEA covers the
//! bytes strictly between `$` and `*`. Both render as two uppercase hex digits.

/// XOR of all bytes.
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Check a complete TAIP sentence (`>...;*CS<`).
pub fn verify_taip(sentence: &str) -> bool {
    let Some(star) = sentence.rfind('*') else {
        return false;
    };
    if !sentence.starts_with('>') || !sentence.ends_with('<') {
        return false;
    }
    let expected = &sentence[star + 1..sentence.len() - 1];
    matches_hex(xor_checksum(sentence[..=star].as_bytes()), expected)
}

/// Check a complete NMEA sentence (`$...*CS`, trailing CRLF optional).
pub fn verify_nmea(sentence: &str) -> bool {
    let sentence = sentence.trim_end_matches(['\r', '\n']);
    let Some(body) = sentence.strip_prefix('$') else {
        return false;
    };
    let Some((payload, expected)) = body.rsplit_once('*') else {
        return false;
    };
    matches_hex(xor_checksum(payload.as_bytes()), expected)
}

fn matches_hex(actual: u8, expected: &str) -> bool {
    expected.len() == 2 && format!("{:02X}", actual) == expected
}
