//! Proto table and the word stream it splices into.
//!
//! `protobegin name … protoend` records a word sequence. `protoinstance name`
//! pushes a replay cursor for that sequence on top of the live stream; once
//! the cursor is exhausted, reading falls back to whatever is underneath.
//! Replays are spliced, not copied, so a proto body can define and
//! instantiate further protos as it is replayed.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::io::BufRead;
use std::rc::Rc;

use crate::error::{LimitKind, ReadError, Result};
use crate::lexer::{parse_number, LineRecord, Scanner};
use crate::settings::ReaderSettings;

/// One word of input together with the line it came from.
#[derive(Debug, Clone)]
pub struct Token {
    line: Rc<LineRecord>,
    index: usize,
}

impl Token {
    /// The word as written.
    pub fn word(&self) -> &str {
        &self.line.words[self.index]
    }

    /// Whether the word equals `keyword`, ignoring case.
    pub fn is(&self, keyword: &str) -> bool {
        self.word().eq_ignore_ascii_case(keyword)
    }

    /// The line this word belongs to.
    pub fn line(&self) -> &LineRecord {
        &self.line
    }

    /// 0-based line number.
    pub fn line_number(&self) -> usize {
        self.line.number
    }

    fn same_line(&self, other: &Token) -> bool {
        Rc::ptr_eq(&self.line, &other.line)
    }

    /// Build an [`ReadError::UnexpectedToken`] pointing at this word.
    pub fn unexpected(&self) -> ReadError {
        ReadError::UnexpectedToken {
            line: self.line.number,
            word: self.word().to_string(),
            text: self.line.raw.clone(),
        }
    }
}

/// Named, write-once word sequences.
#[derive(Debug, Default)]
pub struct ProtoTable {
    protos: HashMap<String, Rc<[Token]>>,
}

impl ProtoTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `body` under `name`.
    ///
    /// Returns `false` and keeps the existing body if `name` is taken.
    pub fn define(&mut self, name: &str, body: Vec<Token>) -> bool {
        let key = name.to_ascii_lowercase();
        if self.protos.contains_key(&key) {
            return false;
        }
        self.protos.insert(key, body.into());
        true
    }

    /// Look up a proto body by name.
    pub fn get(&self, name: &str) -> Option<Rc<[Token]>> {
        self.protos.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Number of defined protos.
    pub fn len(&self) -> usize {
        self.protos.len()
    }

    /// Whether no proto has been defined.
    pub fn is_empty(&self) -> bool {
        self.protos.is_empty()
    }
}

fn numeric_error(token: &Token) -> ReadError {
    ReadError::NumericFormat {
        line: token.line_number(),
        word: token.word().to_string(),
    }
}

struct Replay {
    tokens: Rc<[Token]>,
    pos: usize,
}

impl Replay {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }
}

/// The live word stream of one parse session.
///
/// Owns the session's [`ProtoTable`], so independent parses never share
/// protos.
pub struct TokenStream<'s, R> {
    scanner: Scanner<'s, R>,
    pending: VecDeque<Token>,
    replays: Vec<Replay>,
    protos: ProtoTable,
    max_depth: usize,
}

impl<'s, R: BufRead> TokenStream<'s, R> {
    /// Create a stream reading from `input`.
    pub fn new(input: R, settings: &'s ReaderSettings) -> Self {
        Self {
            scanner: Scanner::new(input, settings),
            pending: VecDeque::new(),
            replays: Vec::new(),
            protos: ProtoTable::new(),
            max_depth: settings.max_proto_depth,
        }
    }

    /// The protos defined so far.
    pub fn protos(&self) -> &ProtoTable {
        &self.protos
    }

    /// Look at the next word without consuming it.
    pub fn peek(&mut self) -> Result<Option<&Token>> {
        while let Some(top) = self.replays.last() {
            if top.peek().is_some() {
                break;
            }
            self.replays.pop();
        }
        if self.replays.is_empty() && self.pending.is_empty() {
            self.fill()?;
        }
        Ok(match self.replays.last() {
            Some(top) => top.peek(),
            None => self.pending.front(),
        })
    }

    /// Consume the next word.
    pub fn next(&mut self) -> Result<Option<Token>> {
        if self.peek()?.is_none() {
            return Ok(None);
        }
        let token = match self.replays.last_mut() {
            Some(top) => {
                let token = top.tokens[top.pos].clone();
                top.pos += 1;
                Some(token)
            }
            None => self.pending.pop_front(),
        };
        Ok(token)
    }

    /// Consume the next word, failing at end of input.
    pub fn expect(&mut self, expected: &str) -> Result<Token> {
        self.next()?.ok_or_else(|| ReadError::end_of_input(expected))
    }

    /// Consume the next word if it sits on the same line as `anchor`.
    pub fn next_on_line(&mut self, anchor: &Token) -> Result<Option<Token>> {
        self.next_on_line_if(anchor, |_| true)
    }

    /// Consume the next word if it sits on the same line as `anchor` and
    /// satisfies `accept`.
    pub fn next_on_line_if(
        &mut self,
        anchor: &Token,
        accept: impl Fn(&Token) -> bool,
    ) -> Result<Option<Token>> {
        let take = matches!(self.peek()?, Some(token) if token.same_line(anchor) && accept(token));
        if take {
            self.next()
        } else {
            Ok(None)
        }
    }

    /// Consume the next word and convert it to a number.
    pub fn number<T: std::str::FromStr>(&mut self, expected: &str) -> Result<T> {
        let token = self.expect(expected)?;
        parse_number(token.word()).ok_or_else(|| numeric_error(&token))
    }

    /// Consume the next word as a finite float.
    ///
    /// Literals that overflow to infinity are rejected like any other
    /// malformed number.
    pub fn float(&mut self, expected: &str) -> Result<f64> {
        let token = self.expect(expected)?;
        parse_number::<f64>(token.word())
            .filter(|value| value.is_finite())
            .ok_or_else(|| numeric_error(&token))
    }

    /// Record the body following `protobegin`.
    ///
    /// Reads the proto name, then every word up to the matching `protoend`
    /// (exclusive). Nested definitions inside the body are kept intact.
    pub fn define_proto(&mut self) -> Result<()> {
        let name = self.expect("proto name")?;
        let mut body = Vec::new();
        let mut nesting = 0usize;
        loop {
            let token = self.expect("protoend")?;
            if token.is("protoend") {
                if nesting == 0 {
                    break;
                }
                nesting -= 1;
            } else if token.is("protobegin") {
                nesting += 1;
            }
            body.push(token);
        }
        log::debug!(
            "proto '{}' defined at line {} ({} words)",
            name.word(),
            name.line_number(),
            body.len()
        );
        if !self.protos.define(name.word(), body) {
            log::warn!(
                "proto '{}' redefined at line {}; keeping the first definition",
                name.word(),
                name.line_number()
            );
        }
        Ok(())
    }

    /// Splice the body of proto `name` in front of the live stream.
    pub fn instantiate(&mut self, name: &Token) -> Result<()> {
        let tokens = self
            .protos
            .get(name.word())
            .ok_or_else(|| ReadError::UnknownProto {
                line: name.line_number(),
                name: name.word().to_string(),
            })?;
        if self.replays.len() >= self.max_depth {
            return Err(ReadError::RecursionLimitExceeded {
                line: name.line_number(),
                kind: LimitKind::Proto,
                limit: self.max_depth,
            });
        }
        log::debug!(
            "instantiating proto '{}' at line {} (depth {})",
            name.word(),
            name.line_number(),
            self.replays.len() + 1
        );
        self.replays.push(Replay { tokens, pos: 0 });
        Ok(())
    }

    fn fill(&mut self) -> Result<()> {
        if let Some(record) = self.scanner.next_record()? {
            let line = Rc::new(record);
            self.pending.extend((0..line.words.len()).map(|index| Token {
                line: Rc::clone(&line),
                index,
            }));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words<R: BufRead>(stream: &mut TokenStream<'_, R>) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(token) = stream.next().unwrap() {
            out.push(token.word().to_string());
        }
        out
    }

    #[test]
    fn test_stream_crosses_lines() {
        let settings = ReaderSettings::default();
        let mut stream = TokenStream::new("a b\n# c\nd\n".as_bytes(), &settings);
        assert_eq!(words(&mut stream), vec!["a", "b", "d"]);
    }

    #[test]
    fn test_next_on_line() {
        let settings = ReaderSettings::default();
        let mut stream = TokenStream::new("a b\nc\n".as_bytes(), &settings);
        let a = stream.next().unwrap().unwrap();
        assert_eq!(stream.next_on_line(&a).unwrap().unwrap().word(), "b");
        assert!(stream.next_on_line(&a).unwrap().is_none());
        assert_eq!(stream.next().unwrap().unwrap().word(), "c");
    }

    #[test]
    fn test_next_on_line_if_leaves_rejected_word() {
        let settings = ReaderSettings::default();
        let mut stream = TokenStream::new("triangle tag other\n".as_bytes(), &settings);
        let anchor = stream.next().unwrap().unwrap();
        let tag = stream.next_on_line_if(&anchor, |t| t.is("TAG")).unwrap();
        assert_eq!(tag.unwrap().word(), "tag");
        assert!(stream
            .next_on_line_if(&anchor, |t| t.is("tag"))
            .unwrap()
            .is_none());
        assert_eq!(stream.next().unwrap().unwrap().word(), "other");
    }

    #[test]
    fn test_instantiate_splices() {
        let settings = ReaderSettings::default();
        let input = "protobegin p\nx y\nprotoend\nprotoinstance p\nz\n";
        let mut stream = TokenStream::new(input.as_bytes(), &settings);
        assert!(stream.next().unwrap().unwrap().is("protobegin"));
        stream.define_proto().unwrap();
        assert_eq!(stream.protos().len(), 1);
        assert!(stream.next().unwrap().unwrap().is("protoinstance"));
        let name = stream.next().unwrap().unwrap();
        stream.instantiate(&name).unwrap();
        assert_eq!(words(&mut stream), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_proto_names_case_insensitive() {
        let mut table = ProtoTable::new();
        assert!(table.define("Door", Vec::new()));
        assert!(table.get("DOOR").is_some());
        assert!(!table.define("door", Vec::new()));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_nested_definition_kept_whole() {
        let settings = ReaderSettings::default();
        let input = "outer\nprotobegin inner\nq\nprotoend\nr\nprotoend\ns\n";
        let mut stream = TokenStream::new(input.as_bytes(), &settings);
        stream.define_proto().unwrap();
        let body = stream.protos().get("outer").unwrap();
        let body: Vec<&str> = body.iter().map(Token::word).collect();
        assert_eq!(body, vec!["protobegin", "inner", "q", "protoend", "r"]);
        assert_eq!(words(&mut stream), vec!["s"]);
    }

    #[test]
    fn test_unknown_proto() {
        let settings = ReaderSettings::default();
        let mut stream = TokenStream::new("missing\n".as_bytes(), &settings);
        let name = stream.next().unwrap().unwrap();
        match stream.instantiate(&name) {
            Err(ReadError::UnknownProto { line, name }) => {
                assert_eq!(line, 0);
                assert_eq!(name, "missing");
            }
            other => panic!("expected UnknownProto, got {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_proto() {
        let settings = ReaderSettings::default();
        let mut stream = TokenStream::new("p\nvertex 1 2 3\n".as_bytes(), &settings);
        assert!(matches!(
            stream.define_proto(),
            Err(ReadError::UnexpectedEndOfInput { .. })
        ));
    }

    #[test]
    fn test_number() {
        let settings = ReaderSettings::default();
        let mut stream = TokenStream::new("1.5 7. x\n".as_bytes(), &settings);
        assert_eq!(stream.number::<f64>("x").unwrap(), 1.5);
        assert_eq!(stream.number::<u32>("index").unwrap(), 7);
        assert!(matches!(
            stream.number::<f64>("y"),
            Err(ReadError::NumericFormat { line: 0, .. })
        ));
        assert!(matches!(
            stream.number::<f64>("z"),
            Err(ReadError::UnexpectedEndOfInput { .. })
        ));
    }
}
