//! Byte classification for identifier scanning.
//!
//! Bytes above 0x7F are allowed in identifiers so UTF-8 names survive
//! lexing; `@` starts Objective-C/C# keywords and `$` appears in
//! ECMA/Java identifiers.

pub fn is_kw1(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_' || ch == b'@' || ch == b'$' || ch >= 0x80
}

pub fn is_kw2(ch: u8) -> bool {
    is_kw1(ch) || ch.is_ascii_digit()
}

pub fn is_dec(ch: u8) -> bool {
    ch.is_ascii_digit()
}

pub fn is_dec_(ch: u8) -> bool {
    is_dec(ch) || ch == b'_'
}

pub fn is_hex(ch: u8) -> bool {
    ch.is_ascii_hexdigit()
}

pub fn is_hex_(ch: u8) -> bool {
    is_hex(ch) || ch == b'_'
}

pub fn is_oct(ch: u8) -> bool {
    (b'0'..=b'7').contains(&ch)
}

pub fn is_oct_(ch: u8) -> bool {
    is_oct(ch) || ch == b'_'
}

pub fn is_bin(ch: u8) -> bool {
    ch == b'0' || ch == b'1'
}

pub fn is_bin_(ch: u8) -> bool {
    is_bin(ch) || ch == b'_'
}

/// Visible-space test used when trimming chunk tails.
pub fn is_blank(ch: u8) -> bool {
    ch == b' ' || ch == b'\t'
}
