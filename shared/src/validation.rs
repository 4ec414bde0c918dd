//! Name, chat text and login token checks.

use md5::{Digest, Md5};

pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 16;

/// Length of a verification token once left-padded.
pub const TOKEN_LENGTH: usize = 32;

/// Names are 2 to 16 characters drawn from `0-9`, `.`, `A-Z`, `_` and `a-z`.
pub fn is_valid_name(name: &str) -> bool {
    (MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&name.len())
        && name
            .bytes()
            .all(|b| matches!(b, b'.' | b'0'..=b'9' | b'A'..=b'Z' | b'_' | b'a'..=b'z'))
}

/// Control characters, the `&` colour marker, and anything past `~` are not
/// allowed in client chat.
pub fn contains_invalid_chars(message: &str) -> bool {
    message.chars().any(|ch| ch < ' ' || ch == '&' || ch > '~')
}

/// Lowercase hex MD5 of `salt + name`.
pub fn verification_token(salt: &str, name: &str) -> String {
    let digest = Md5::digest(format!("{}{}", salt, name).as_bytes());
    format!("{:x}", digest)
}

/// Checks a client's token against the expected one. The token is
/// left-padded with `'0'` to 32 characters and compared case-insensitively.
pub fn is_verified(salt: &str, name: &str, token: &str) -> bool {
    let padded = format!("{:0>width$}", token, width = TOKEN_LENGTH);
    padded.eq_ignore_ascii_case(&verification_token(salt, name))
}
