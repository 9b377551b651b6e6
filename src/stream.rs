//! The stream parser: splits a raw UTF-8 Gerber byte stream into delimited command groups while
//! tracking line numbers. Grounded directly on `SyntaxParser.{h,cpp}` in the upstream source —
//! the same leading-whitespace-skip, `%`-delimited extended block, `*`-delimited word command
//! structure, reimplemented over a `&str` cursor instead of an `istream`.

use crate::error::IoError;

const EXTENDED_DELIMITER: char = '%';
const WORD_DELIMITER: char = '*';

/// Splits a Gerber text stream into command groups. A command group is one word command
/// (a single token) or one extended command (one token per `*`-delimited body word).
pub struct StreamParser<'a> {
    remaining: &'a str,
    line: u32,
}

impl<'a> StreamParser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            remaining: source,
            line: 1,
        }
    }

    pub fn current_line(&self) -> u32 {
        self.line
    }

    fn advance(&mut self, count: usize) -> &'a str {
        let (consumed, rest) = self.remaining.split_at(count);
        self.line += consumed.matches('\n').count() as u32;
        self.remaining = rest;
        consumed
    }

    fn skip_leading_whitespace(&mut self) {
        let trim_len = self
            .remaining
            .len()
            .saturating_sub(self.remaining.trim_start().len());
        if trim_len > 0 {
            self.advance(trim_len);
        }
    }

    /// Returns the next command group as an ordered sequence of token strings, with surrounding
    /// whitespace (including the newlines that separate physical lines) stripped from each
    /// token. Returns an empty vector on clean EOF. Fails with `UnterminatedCommand` if the
    /// opening delimiter of a command is never matched by its closing delimiter.
    pub fn next_command(&mut self) -> Result<Vec<String>, IoError> {
        self.skip_leading_whitespace();

        if self.remaining.is_empty() {
            return Ok(Vec::new());
        }

        let start_line = self.line;

        if self.remaining.starts_with(EXTENDED_DELIMITER) {
            self.advance(EXTENDED_DELIMITER.len_utf8());
            let end = self
                .remaining
                .find(EXTENDED_DELIMITER)
                .ok_or(IoError::UnterminatedCommand { line: start_line })?;
            let body = self.advance(end);
            self.advance(EXTENDED_DELIMITER.len_utf8());

            let tokens: Vec<String> = body
                .split(WORD_DELIMITER)
                .map(strip_newlines)
                .filter(|token| !token.is_empty())
                .collect();
            Ok(tokens)
        } else {
            let end = self
                .remaining
                .find(WORD_DELIMITER)
                .ok_or(IoError::UnterminatedCommand { line: start_line })?;
            let word = self.advance(end);
            self.advance(WORD_DELIMITER.len_utf8());
            Ok(vec![strip_newlines(word)])
        }
    }
}

fn strip_newlines(word: &str) -> String {
    word.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_command_is_a_single_token() {
        let mut parser = StreamParser::new("G04 a comment*");
        let command = parser.next_command().unwrap();
        assert_eq!(command, vec!["G04 a comment".to_string()]);
    }

    #[test]
    fn extended_command_splits_on_word_delimiter() {
        let mut parser = StreamParser::new("%FSLAX26Y26*MOMM*%");
        let command = parser.next_command().unwrap();
        assert_eq!(command, vec!["FSLAX26Y26".to_string(), "MOMM".to_string()]);
    }

    #[test]
    fn trailing_empty_tokens_are_discarded() {
        let mut parser = StreamParser::new("%AMDONUT*1,1,$1,$2,$3*%");
        let command = parser.next_command().unwrap();
        assert_eq!(command.len(), 2);
    }

    #[test]
    fn eof_returns_empty_vector() {
        let mut parser = StreamParser::new("   \n  ");
        assert!(parser.next_command().unwrap().is_empty());
    }

    #[test]
    fn unterminated_word_command_is_an_io_error() {
        let mut parser = StreamParser::new("G04 unterminated");
        assert!(parser.next_command().is_err());
    }

    #[test]
    fn unterminated_extended_command_is_an_io_error() {
        let mut parser = StreamParser::new("%MOMM*");
        assert!(parser.next_command().is_err());
    }

    #[test]
    fn newlines_inside_a_word_advance_the_line_counter() {
        let mut parser = StreamParser::new("G04 line one\ncontinues*\nX0Y0D02*");
        parser.next_command().unwrap();
        assert_eq!(parser.current_line(), 2);
        parser.next_command().unwrap();
        assert_eq!(parser.current_line(), 3);
    }

    #[test]
    fn concatenating_commands_round_trips_up_to_whitespace() {
        let source = "G04 hi*\n%FSLAX26Y26*MOMM*%\nX0Y0D02*";
        let mut parser = StreamParser::new(source);
        let mut all_tokens = Vec::new();
        loop {
            let command = parser.next_command().unwrap();
            if command.is_empty() {
                break;
            }
            all_tokens.extend(command);
        }
        assert_eq!(
            all_tokens,
            vec![
                "G04 hi".to_string(),
                "FSLAX26Y26".to_string(),
                "MOMM".to_string(),
                "X0Y0D02".to_string(),
            ]
        );
    }
}
