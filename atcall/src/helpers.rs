use core::fmt;

/// Whitespace stripped from both ends of every received line.
pub(crate) const LINE_WHITESPACE: &[u8] = &[b'\t', b' ', b'\r', b'\n', 0];

pub(crate) trait SliceExt {
    fn trim(&self, whitespaces: &[u8]) -> &Self;
}

impl SliceExt for [u8] {
    fn trim(&self, whitespaces: &[u8]) -> &[u8] {
        let is_not_whitespace = |c| !whitespaces.contains(c);

        match (
            self.iter().position(is_not_whitespace),
            self.iter().rposition(is_not_whitespace),
        ) {
            (Some(first), Some(last)) => &self[first..=last],
            _ => &[],
        }
    }
}

/// Debug formatting of raw serial data, shown as a string when it is valid
/// UTF-8 and as a byte slice otherwise.
pub struct LossyStr<'a>(pub &'a [u8]);

impl fmt::Debug for LossyStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match core::str::from_utf8(self.0) {
            Ok(s) => write!(f, "{:?}", s),
            Err(_) => write!(f, "{:?}", self.0),
        }
    }
}
