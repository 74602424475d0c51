use super::ast::Ident;
use super::{token::*, LineNumber, MaxValue};

pub fn lex(s: &str) -> (LineNumber, Vec<Token>) {
    BasicLexer::lex(s)
}

/// Lex text that never carries a line number, such as an expression.
pub fn lex_direct(s: &str) -> Vec<Token> {
    BasicLexer::tokens(s)
}

fn is_basic_whitespace(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn is_basic_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_basic_alphabetic(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn is_sigil(c: char) -> bool {
    c == '$' || c == '!' || c == '#' || c == '%'
}

trait Tokenizers<'a> {
    fn chars(&mut self) -> &mut std::iter::Peekable<std::str::Chars<'a>>;

    fn whitespace(&mut self) -> Option<Token> {
        let mut len = 0;
        while let Some(pk) = self.chars().peek() {
            if !is_basic_whitespace(*pk) {
                break;
            }
            self.chars().next();
            len += 1;
        }
        Some(Token::Whitespace(len))
    }

    fn number(&mut self) -> Option<Token> {
        let mut s = String::new();
        let mut digits = 0;
        let mut decimal = false;
        let mut exp = false;
        loop {
            let ch = match self.chars().next()? {
                'e' => 'E',
                'd' => 'D',
                c => c,
            };
            s.push(ch);
            if !exp && is_basic_digit(ch) {
                digits += 1;
            }
            match ch {
                '.' => decimal = true,
                'D' => digits += 8,
                '!' => return Some(Token::Literal(Literal::Single(s))),
                '#' => return Some(Token::Literal(Literal::Double(s))),
                '%' => return Some(Token::Literal(Literal::Integer(s))),
                _ => {}
            }
            if let Some(pk) = self.chars().peek() {
                if ch == 'E' || ch == 'D' {
                    exp = true;
                    if *pk == '+' || *pk == '-' {
                        continue;
                    }
                }
                if is_basic_digit(*pk) {
                    continue;
                }
                if !decimal && !exp && *pk == '.' {
                    continue;
                }
                if !exp && (*pk == 'E' || *pk == 'e' || *pk == 'D' || *pk == 'd') {
                    continue;
                }
                if *pk == '!' || *pk == '#' || *pk == '%' {
                    continue;
                }
            }
            break;
        }
        if digits > 7 {
            return Some(Token::Literal(Literal::Double(s)));
        }
        if !exp && !decimal && s.parse::<i16>().is_ok() {
            return Some(Token::Literal(Literal::Integer(s)));
        }
        Some(Token::Literal(Literal::Single(s)))
    }

    fn string(&mut self) -> Option<Token> {
        let mut s = String::new();
        self.chars().next();
        while let Some(ch) = self.chars().next() {
            if ch == '"' {
                break;
            }
            s.push(ch);
        }
        Some(Token::Literal(Literal::String(s)))
    }

    fn alphabetic(&mut self) -> Option<Token> {
        let mut s = String::new();
        let mut digit = false;
        loop {
            let ch = self.chars().next()?.to_ascii_uppercase();
            s.push(ch);
            if is_basic_digit(ch) {
                digit = true;
            }
            if let Some(token) = Token::from_string(&s) {
                let longer = match self.chars().peek() {
                    Some(pk) => {
                        let mut more = s.clone();
                        more.push(pk.to_ascii_uppercase());
                        Token::is_reserved_prefix(&more)
                    }
                    None => false,
                };
                if !longer {
                    return Some(token);
                }
            }
            if is_sigil(ch) {
                return Some(Token::Ident(Ident::from_name(&s)));
            }
            if let Some(pk) = self.chars().peek() {
                if is_basic_alphabetic(*pk) {
                    if digit {
                        break;
                    }
                    continue;
                }
                if is_basic_digit(*pk) || *pk == '.' || is_sigil(*pk) {
                    continue;
                }
            }
            break;
        }
        Some(Token::Ident(Ident::Plain(s.into())))
    }

    /// Extension names start with an underscore and never contain
    /// reserved words.
    fn extension(&mut self) -> Option<Token> {
        let mut s = String::new();
        s.push(self.chars().next()?);
        while let Some(pk) = self.chars().peek() {
            let pk = *pk;
            if pk.is_ascii_alphanumeric() || pk == '_' || pk == '.' {
                s.push(pk.to_ascii_uppercase());
                self.chars().next();
                continue;
            }
            if is_sigil(pk) {
                s.push(pk);
                self.chars().next();
            }
            break;
        }
        Some(Token::Ident(Ident::from_name(&s)))
    }

    fn minutia(&mut self) -> Option<Token> {
        let s = self.chars().next()?.to_string();
        match Token::from_string(&s) {
            Some(t) => Some(t),
            None => Some(Token::Unknown(s)),
        }
    }
}

struct BasicLexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    remark: bool,
}

impl<'a> Tokenizers<'a> for BasicLexer<'a> {
    fn chars(&mut self) -> &mut std::iter::Peekable<std::str::Chars<'a>> {
        &mut self.chars
    }
}

impl<'a> Iterator for BasicLexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let pk = *self.chars.peek()?;
        if self.remark {
            return Some(Token::Unknown(self.chars.by_ref().collect::<String>()));
        }
        if is_basic_whitespace(pk) {
            return self.whitespace();
        }
        if is_basic_digit(pk) || pk == '.' {
            return self.number();
        }
        if is_basic_alphabetic(pk) {
            let r = self.alphabetic();
            if let Some(Token::Word(Word::Rem1)) = r {
                self.remark = true;
            }
            return r;
        }
        if pk == '_' {
            return self.extension();
        }
        if pk == '"' {
            return self.string();
        }
        let minutia = self.minutia();
        if let Some(Token::Word(Word::Rem2)) = minutia {
            self.remark = true;
        }
        minutia
    }
}

impl<'a> BasicLexer<'a> {
    fn lex(s: &str) -> (LineNumber, Vec<Token>) {
        let s = s.trim_end_matches(|c: char| c == '\r' || c == '\n');
        let mut line_number = None;
        let mut s = s;
        let mut ln: usize = 0;
        let mut seen_digit = false;
        while let Some(ch) = s[ln..].chars().next() {
            if seen_digit && !is_basic_digit(ch) {
                break;
            }
            if is_basic_digit(ch) {
                seen_digit = true;
            } else if !is_basic_whitespace(ch) {
                break;
            }
            ln += ch.len_utf8();
        }
        if let Ok(n) = s[0..ln].trim_start().parse::<u16>() {
            if n <= LineNumber::max_value() {
                line_number = Some(n);
                if let Some(' ') = s[ln..].chars().next() {
                    ln += 1;
                }
                s = &s[ln..];
            }
        }
        (line_number, BasicLexer::tokens(s))
    }

    fn tokens(s: &str) -> Vec<Token> {
        let mut tokens = BasicLexer {
            chars: s.chars().peekable(),
            remark: false,
        }
        .collect();
        BasicLexer::trim_end(&mut tokens);
        BasicLexer::collapse_lt_gt_equal(&mut tokens);
        tokens
    }

    fn collapse_lt_gt_equal(tokens: &mut Vec<Token>) {
        let mut locs: Vec<(usize, Token)> = vec![];
        let mut tokens_iter = tokens.windows(2).enumerate();
        while let Some((index, tt)) = tokens_iter.next() {
            let combined = match (&tt[0], &tt[1]) {
                (Token::Operator(Operator::Less), Token::Operator(Operator::Equal))
                | (Token::Operator(Operator::Equal), Token::Operator(Operator::Less)) => {
                    Some(Operator::LessEqual)
                }
                (Token::Operator(Operator::Greater), Token::Operator(Operator::Equal))
                | (Token::Operator(Operator::Equal), Token::Operator(Operator::Greater)) => {
                    Some(Operator::GreaterEqual)
                }
                (Token::Operator(Operator::Less), Token::Operator(Operator::Greater)) => {
                    Some(Operator::NotEqual)
                }
                _ => None,
            };
            if let Some(op) = combined {
                locs.push((index, Token::Operator(op)));
                tokens_iter.next();
            }
        }
        while let Some((index, token)) = locs.pop() {
            tokens.splice(index..index + 2, Some(token));
        }
    }

    fn trim_end(tokens: &mut Vec<Token>) {
        if let Some(Token::Whitespace(_)) = tokens.last() {
            tokens.pop();
        }
        if let Some(Token::Unknown(_)) = tokens.last() {
            if let Some(Token::Unknown(s)) = tokens.pop() {
                tokens.push(Token::Unknown(s.trim_end().to_string()));
            }
        }
    }
}
