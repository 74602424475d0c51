use super::ast::Ident;
use super::{Error, LineNumber, MaxValue};
use std::collections::HashMap;
use std::convert::TryFrom;

/// Names of built-in functions. The lexer treats them as reserved so
/// `ASC(` is not split into `AS C(`.
pub const FUNCTIONS: &[&str] = &[
    "ABS", "ASC", "CHR$", "COS", "CSRLIN", "DATE$", "EOF", "FRE", "INT", "LEFT$", "LEN", "MID$",
    "POS", "RIGHT$", "RND", "SIN", "SQR", "STR$", "STRING$", "TIME$", "VAL",
];

thread_local!(
    static STRING_TO_TOKEN: HashMap<String, Token> = Word::all()
        .into_iter()
        .map(Token::Word)
        .chain(Operator::all().into_iter().map(Token::Operator))
        .chain(FUNCTIONS.iter().map(|f| Token::Ident(Ident::from_name(f))))
        .chain(vec![
            Token::LParen,
            Token::RParen,
            Token::Comma,
            Token::Colon,
            Token::Semicolon,
            Token::Hash,
        ])
        .map(|t| (t.to_string(), t))
        .collect();
);

#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    Unknown(String),
    Whitespace(usize),
    Literal(Literal),
    Word(Word),
    Operator(Operator),
    Ident(Ident),
    LParen,
    RParen,
    Comma,
    Colon,
    Semicolon,
    Hash,
}

impl Token {
    pub fn from_string(s: &str) -> Option<Token> {
        STRING_TO_TOKEN.with(|stt| stt.get(s).cloned())
    }

    /// True when some reserved word starts with `s`.
    pub fn is_reserved_prefix(s: &str) -> bool {
        STRING_TO_TOKEN.with(|stt| stt.keys().any(|k| k.starts_with(s)))
    }

    pub fn is_word(&self) -> bool {
        matches!(self, Token::Word(_))
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Token::*;
        match self {
            Unknown(s) => write!(f, "{}", s),
            Whitespace(u) => write!(f, "{s:>w$}", s = "", w = u),
            Literal(s) => write!(f, "{}", s),
            Word(s) => write!(f, "{}", s),
            Operator(s) => write!(f, "{}", s),
            Ident(s) => write!(f, "{}", s),
            LParen => write!(f, "("),
            RParen => write!(f, ")"),
            Comma => write!(f, ","),
            Colon => write!(f, ":"),
            Semicolon => write!(f, ";"),
            Hash => write!(f, "#"),
        }
    }
}

impl TryFrom<&Token> for LineNumber {
    type Error = Error;
    fn try_from(token: &Token) -> Result<Self, Self::Error> {
        let msg = "INVALID LINE NUMBER";
        if let Token::Literal(lit) = token {
            let s = match lit {
                Literal::Integer(s) | Literal::Single(s) | Literal::Double(s) => s,
                Literal::String(_) => return Err(error!(SyntaxError; msg)),
            };
            if s.chars().all(|c| c.is_ascii_digit()) {
                if let Ok(line) = s.parse::<u16>() {
                    if line <= LineNumber::max_value() {
                        return Ok(Some(line));
                    }
                }
                return Err(error!(Overflow; msg));
            }
        }
        Err(error!(SyntaxError; msg))
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    Single(String),
    Double(String),
    Integer(String),
    String(String),
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Literal::*;
        match self {
            Single(s) | Double(s) | Integer(s) => write!(f, "{}", s),
            String(s) => write!(f, "\"{}\"", s),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Word {
    Append,
    As,
    Clear,
    Close,
    Cont,
    Dim,
    Else,
    End,
    For,
    Gosub,
    Goto,
    If,
    Input,
    Let,
    Next,
    Open,
    Output,
    Print1,
    Print2,
    Rem1,
    Rem2,
    Return,
    Run,
    Step,
    Stop,
    System,
    Then,
    To,
}

impl Word {
    fn all() -> Vec<Word> {
        use Word::*;
        vec![
            Append, As, Clear, Close, Cont, Dim, Else, End, For, Gosub, Goto, If, Input, Let, Next,
            Open, Output, Print1, Print2, Rem1, Rem2, Return, Run, Step, Stop, System, Then, To,
        ]
    }
}

impl std::fmt::Display for Word {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Word::*;
        let s = match self {
            Append => "APPEND",
            As => "AS",
            Clear => "CLEAR",
            Close => "CLOSE",
            Cont => "CONT",
            Dim => "DIM",
            Else => "ELSE",
            End => "END",
            For => "FOR",
            Gosub => "GOSUB",
            Goto => "GOTO",
            If => "IF",
            Input => "INPUT",
            Let => "LET",
            Next => "NEXT",
            Open => "OPEN",
            Output => "OUTPUT",
            Print1 => "PRINT",
            Print2 => "?",
            Rem1 => "REM",
            Rem2 => "'",
            Return => "RETURN",
            Run => "RUN",
            Step => "STEP",
            Stop => "STOP",
            System => "SYSTEM",
            Then => "THEN",
            To => "TO",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Operator {
    Caret,
    Multiply,
    Divide,
    DivideInt,
    Modulus,
    Plus,
    Minus,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Not,
    And,
    Or,
    Xor,
    Imp,
    Eqv,
}

impl Operator {
    fn all() -> Vec<Operator> {
        use Operator::*;
        vec![
            Caret,
            Multiply,
            Divide,
            DivideInt,
            Modulus,
            Plus,
            Minus,
            Equal,
            NotEqual,
            Less,
            LessEqual,
            Greater,
            GreaterEqual,
            Not,
            And,
            Or,
            Xor,
            Imp,
            Eqv,
        ]
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Operator::*;
        let s = match self {
            Caret => "^",
            Multiply => "*",
            Divide => "/",
            DivideInt => "\\",
            Modulus => "MOD",
            Plus => "+",
            Minus => "-",
            Equal => "=",
            NotEqual => "<>",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            Not => "NOT",
            And => "AND",
            Or => "OR",
            Xor => "XOR",
            Imp => "IMP",
            Eqv => "EQV",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_string() {
        let t = Token::from_string("REM");
        assert_eq!(t, Some(Token::Word(Word::Rem1)));
        let t = Token::from_string("PICKLES");
        assert_eq!(t, None);
        let t = Token::from_string("CHR$");
        assert_eq!(t, Some(Token::Ident(Ident::String("CHR$".into()))));
    }

    #[test]
    fn test_reserved_prefix() {
        assert!(Token::is_reserved_prefix("AS"));
        assert!(Token::is_reserved_prefix("ASC"));
        assert!(!Token::is_reserved_prefix("ASX"));
    }
}
