//! Splits outgoing chat text into lines a client can display.

use crate::codec::STRING_LENGTH;

const CONTINUATION_PREFIX: &str = "> ";
const COLOUR_MARKER: char = '&';

/// Breaks `message` into lines of at most 64 characters.
///
/// Lines break at the last space that fits, or mid-word when there is none.
/// Continuation lines start with `"> "` followed by the last colour code
/// seen, so wrapped text keeps its colour. A colour code is never split
/// across two lines.
pub fn wrap(message: &str) -> Vec<String> {
    let chars: Vec<char> = message.chars().collect();
    let mut lines = Vec::new();
    let mut colour: Option<char> = None;
    let mut start = 0;

    loop {
        let mut prefix = String::new();
        if !lines.is_empty() {
            prefix.push_str(CONTINUATION_PREFIX);
            if let Some(code) = colour {
                prefix.push(COLOUR_MARKER);
                prefix.push(code);
            }
        }

        let room = STRING_LENGTH - prefix.len();
        let rest = &chars[start..];
        if rest.len() <= room {
            lines.push(prefix + &rest.iter().collect::<String>());
            break;
        }

        let mut cut = rest[..=room]
            .iter()
            .rposition(|&ch| ch == ' ')
            .filter(|&pos| pos > 0)
            .unwrap_or(room);
        if rest[cut - 1] == COLOUR_MARKER && cut > 1 {
            cut -= 1;
        }

        let segment = &rest[..cut];
        if let Some(code) = last_colour_code(segment) {
            colour = Some(code);
        }
        lines.push(prefix + &segment.iter().collect::<String>());

        start += cut;
        if chars.get(start) == Some(&' ') {
            start += 1;
        }
        if start >= chars.len() {
            break;
        }
    }

    lines
}

fn last_colour_code(segment: &[char]) -> Option<char> {
    segment
        .windows(2)
        .rev()
        .find(|pair| pair[0] == COLOUR_MARKER && pair[1].is_ascii_hexdigit())
        .map(|pair| pair[1])
}
