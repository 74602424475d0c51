use super::{ast::Statement, lex, parse, token::Token, Error, LineNumber};

/// A lexed line of BASIC. The source text is retained so a listing can
/// be written out and lexed again when a session resumes.
#[derive(Debug, PartialEq, Clone)]
pub struct Line {
    number: LineNumber,
    source: String,
    tokens: Vec<Token>,
}

impl Line {
    pub fn new(s: &str) -> Line {
        let (number, tokens) = lex(s);
        Line {
            number,
            source: s.trim_end_matches(|c: char| c == '\r' || c == '\n').to_string(),
            tokens,
        }
    }

    pub fn number(&self) -> LineNumber {
        self.number
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_direct(&self) -> bool {
        self.number.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn ast(&self) -> Result<Vec<Statement>, Error> {
        parse(self.number, &self.tokens)
    }
}

impl std::fmt::Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s: String = self.tokens.iter().map(|s| s.to_string()).collect();
        match self.number {
            Some(number) => write!(f, "{} {}", number, s),
            None => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_crunches_keywords() {
        let line = Line::new("100 print a");
        assert_eq!(line.number(), Some(100));
        assert_eq!(line.to_string(), "100 PRINT A");
        assert_eq!(line.source(), "100 print a");
    }

    #[test]
    fn test_empty_line() {
        let line = Line::new("20");
        assert!(line.is_empty());
        assert!(!line.is_direct());
    }
}
