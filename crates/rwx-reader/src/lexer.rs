//! Line scanner for RWX text.
//!
//! Turns a byte stream into a lazy sequence of [`LineRecord`]s:
//! - `#` starts a comment, either for the whole line or trailing
//! - blank and comment-only lines produce no record but still count
//! - the first word is lowercased for keyword matching
//! - lines whose first word is in the skip list are dropped

use std::io::BufRead;
use std::str::FromStr;

use crate::error::{ReadError, Result};
use crate::settings::ReaderSettings;

/// One non-empty source line, split into words.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRecord {
    /// First word, lowercased.
    pub keyword: String,
    /// All words of the line with comments removed, as written.
    pub words: Vec<String>,
    /// The trimmed source line, comment included.
    pub raw: String,
    /// 0-based line number.
    pub number: usize,
}

/// Lazy scanner over a buffered byte stream.
pub struct Scanner<'s, R> {
    input: R,
    settings: &'s ReaderSettings,
    line: usize,
    buf: Vec<u8>,
    done: bool,
}

impl<'s, R: BufRead> Scanner<'s, R> {
    /// Create a scanner over `input`.
    pub fn new(input: R, settings: &'s ReaderSettings) -> Self {
        Self {
            input,
            settings,
            line: 0,
            buf: Vec::new(),
            done: false,
        }
    }

    /// Read the next record, or `None` at end of input.
    pub fn next_record(&mut self) -> Result<Option<LineRecord>> {
        while !self.done {
            self.buf.clear();
            if self.input.read_until(b'\n', &mut self.buf)? == 0 {
                self.done = true;
                break;
            }
            let number = self.line;
            self.line += 1;

            let text = std::str::from_utf8(&self.buf)
                .map_err(|e| ReadError::lex(number, format!("invalid UTF-8: {e}")))?;
            if let Some(record) = self.split_line(text, number) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn split_line(&self, text: &str, number: usize) -> Option<LineRecord> {
        let raw = text.trim();
        if raw.is_empty() || raw.starts_with('#') {
            return None;
        }
        let content = match raw.find('#') {
            Some(idx) => &raw[..idx],
            None => raw,
        };
        let words: Vec<String> = content.split_whitespace().map(str::to_string).collect();
        let keyword = words.first()?.to_ascii_lowercase();
        if self.settings.is_skipped(&keyword) {
            log::trace!("skipping line {number}: {raw}");
            return None;
        }
        Some(LineRecord {
            keyword,
            words,
            raw: raw.to_string(),
            number,
        })
    }
}

impl<R: BufRead> Iterator for Scanner<'_, R> {
    type Item = Result<LineRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Parse a number, tolerating a single bare trailing `.` (e.g. `1.`).
///
/// The textual non-finite forms `nan`, `inf` and `infinity` are rejected.
pub fn parse_number<T: FromStr>(word: &str) -> Option<T> {
    if names_non_finite(word) {
        return None;
    }
    if let Ok(value) = word.parse() {
        return Some(value);
    }
    let stripped = word.strip_suffix('.')?;
    if stripped.is_empty() || stripped.ends_with('.') || names_non_finite(stripped) {
        return None;
    }
    stripped.parse().ok()
}

fn names_non_finite(word: &str) -> bool {
    let unsigned = word.trim_start_matches(['+', '-']);
    ["nan", "inf", "infinity"]
        .iter()
        .any(|name| unsigned.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(input: &str) -> Vec<LineRecord> {
        let settings = ReaderSettings::default();
        Scanner::new(input.as_bytes(), &settings)
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_keyword_lowercased() {
        let records = scan("ClumpBegin\nVertex 1 2 3\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].keyword, "clumpbegin");
        assert_eq!(records[1].keyword, "vertex");
        assert_eq!(records[1].words, vec!["Vertex", "1", "2", "3"]);
    }

    #[test]
    fn test_comments() {
        let records = scan("# header\nvertex 1 2 3 # trailing\n  # indented\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].words, vec!["vertex", "1", "2", "3"]);
        assert_eq!(records[0].raw, "vertex 1 2 3 # trailing");
    }

    #[test]
    fn test_line_numbers_count_skipped_lines() {
        let records = scan("modelbegin\n\n# comment\nclumpbegin\r\n");
        assert_eq!(records[0].number, 0);
        assert_eq!(records[1].number, 3);
        assert_eq!(records[1].raw, "clumpbegin");
    }

    #[test]
    fn test_skip_keywords() {
        let records = scan("LightSampling Vertex\nGeometrySampling Solid\ncolor 1 0 0\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].keyword, "color");
    }

    #[test]
    fn test_invalid_utf8() {
        let settings = ReaderSettings::default();
        let input: &[u8] = b"modelbegin\nvertex \xff 0 0\n";
        let result: Result<Vec<_>> = Scanner::new(input, &settings).collect();
        match result {
            Err(ReadError::Lex { line, .. }) => assert_eq!(line, 1),
            other => panic!("expected lex error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number::<f64>("1.5"), Some(1.5));
        assert_eq!(parse_number::<f64>("-2."), Some(-2.0));
        assert_eq!(parse_number::<u32>("3."), Some(3));
        assert_eq!(parse_number::<i64>("-4"), Some(-4));
        assert_eq!(parse_number::<f64>("1e-3"), Some(0.001));
        assert_eq!(parse_number::<f64>("."), None);
        assert_eq!(parse_number::<u32>("3.."), None);
        assert_eq!(parse_number::<f64>("vertex"), None);
        assert_eq!(parse_number::<u32>("1.5"), None);
    }

    #[test]
    fn test_parse_number_rejects_non_finite_names() {
        for word in ["nan", "NaN", "-inf", "+Infinity", "inf."] {
            assert_eq!(parse_number::<f64>(word), None, "{word}");
        }
        assert_eq!(parse_number::<f64>("-0"), Some(-0.0));
    }
}
