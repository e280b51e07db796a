//! Line-oriented text input
//!
//! All database and input files share one convention: `#` starts a comment,
//! surrounding whitespace is ignored and blank lines are skipped.

use crate::error::{DbError, Result};
use std::path::Path;

/// Non-empty content lines as (1-based line number, trimmed text)
pub fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines().enumerate().filter_map(|(index, line)| {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() {
            None
        } else {
            Some((index + 1, line))
        }
    })
}

/// Read a whole file, naming it in the error
pub fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| DbError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse the leading hexadecimal digits of `s`, with an optional `0x` prefix
pub fn parse_hex_prefix(s: &str) -> Option<u32> {
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let end = s
        .find(|c: char| !c.is_ascii_hexdigit())
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    u32::from_str_radix(&s[..end], 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_lines() {
        let text = "# header\n\n  0x100  # trailing\n\t\n0x200\n";
        let lines: Vec<_> = content_lines(text).collect();
        assert_eq!(lines, vec![(3, "0x100"), (5, "0x200")]);
    }

    #[test]
    fn test_parse_hex_prefix() {
        assert_eq!(parse_hex_prefix("0x0004001f"), Some(0x0004_001F));
        assert_eq!(parse_hex_prefix("ABC"), Some(0xABC));
        assert_eq!(parse_hex_prefix("12zz"), Some(0x12));
        assert_eq!(parse_hex_prefix("zz"), None);
        assert_eq!(parse_hex_prefix("0x"), None);
        assert_eq!(parse_hex_prefix("123456789"), None);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_file(Path::new("/nonexistent/frames.txt")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/frames.txt"));
    }
}
