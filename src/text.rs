//! Fixed-capacity text helpers.

use heapless::String;

/// Append as much of `s` as fits, cutting on a char boundary.
///
/// Returns `false` if anything was cut.
pub fn push_truncated<const N: usize>(out: &mut String<N>, s: &str) -> bool {
    if out.push_str(s).is_ok() {
        return true;
    }
    for ch in s.chars() {
        if out.push(ch).is_err() {
            return false;
        }
    }
    true
}

/// Decode bytes as UTF-8, replacing invalid sequences with U+FFFD and
/// truncating to `N` bytes.
pub fn decode_lossy<const N: usize>(bytes: &[u8]) -> String<N> {
    let mut out = String::new();
    for chunk in bytes.utf8_chunks() {
        if !push_truncated(&mut out, chunk.valid()) {
            break;
        }
        if !chunk.invalid().is_empty() && out.push(char::REPLACEMENT_CHARACTER).is_err() {
            break;
        }
    }
    out
}

/// Display cells taken by `ch`: 2 for East Asian wide glyphs, 1 otherwise.
pub fn cell_width(ch: char) -> usize {
    match ch as u32 {
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA000..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6 => 2,
        _ => 1,
    }
}

/// Split `text` into display lines of at most `cols` cells (see [`cell_width`]).
///
/// Breaks on `\n` and otherwise hard-wraps; no word splitting heuristics.
/// A line always takes at least one char, even one wider than `cols`.
pub fn wrap(text: &str, cols: usize) -> Wrap<'_> {
    Wrap {
        rest: Some(text),
        cols: cols.max(1),
    }
}

pub struct Wrap<'a> {
    rest: Option<&'a str>,
    cols: usize,
}

impl Wrap<'_> {
    fn cut(&self, line: &str) -> Option<usize> {
        let mut used = 0;
        for (at, ch) in line.char_indices() {
            used += cell_width(ch);
            if used > self.cols && at > 0 {
                return Some(at);
            }
        }
        None
    }
}

impl<'a> Iterator for Wrap<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = self.rest?;
        let (line, tail) = match rest.split_once('\n') {
            Some((line, tail)) => (line, Some(tail)),
            None => (rest, None),
        };
        match self.cut(line) {
            Some(cut) => {
                // Resume right after the cut, keeping any pending newline.
                self.rest = Some(&rest[cut..]);
                Some(&line[..cut])
            }
            None => {
                self.rest = tail;
                Some(line)
            }
        }
    }
}
