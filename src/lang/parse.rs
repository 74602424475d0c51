use super::{ast::*, token::*, Column, Error, LineNumber};
use crate::codepage;
use std::convert::TryFrom;

type Result<T> = std::result::Result<T, Error>;

pub fn parse(line_number: LineNumber, tokens: &[Token]) -> Result<Vec<Statement>> {
    match Parser::parse(tokens) {
        Err(e) => Err(e.in_line_number(line_number)),
        Ok(r) => Ok(r),
    }
}

/// Parse a lone expression, as handed over by a host evaluating text.
pub fn parse_expression(tokens: &[Token]) -> Result<Expression> {
    let mut parse = Parser::new(tokens);
    let expr = match parse.expression() {
        Ok(expr) => expr,
        Err(e) => return Err(e.in_column(&parse.col)),
    };
    match parse.next() {
        None => Ok(expr),
        Some(_) => Err(error!(SyntaxError, ..&parse.col; "UNEXPECTED TOKEN")),
    }
}

struct Parser<'a> {
    token_stream: std::slice::Iter<'a, Token>,
    peeked: Option<&'a Token>,
    col: Column,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Parser<'a> {
        Parser {
            token_stream: tokens.iter(),
            peeked: None,
            col: 0..0,
        }
    }

    fn parse(tokens: &'a [Token]) -> Result<Vec<Statement>> {
        let mut parse = Parser::new(tokens);
        let mut r: Vec<Statement> = vec![];
        loop {
            match parse.peek() {
                None | Some(Token::Word(Word::Rem1)) | Some(Token::Word(Word::Rem2)) => {
                    return Ok(r)
                }
                Some(Token::Colon) => {
                    parse.next();
                    continue;
                }
                Some(_) => {}
            }
            match parse.statement() {
                Ok(s) => r.push(s),
                Err(e) => return Err(e.in_column(&parse.col)),
            }
        }
    }

    fn column(&self) -> Column {
        self.col.clone()
    }

    fn next(&mut self) -> Option<&'a Token> {
        if self.peeked.is_some() {
            return self.peeked.take();
        }
        loop {
            self.col.start = self.col.end;
            let t = self.token_stream.next()?;
            self.col.end += t.to_string().chars().count();
            match t {
                Token::Whitespace(_) => continue,
                _ => return Some(t),
            }
        }
    }

    fn peek(&mut self) -> Option<&'a Token> {
        if self.peeked.is_none() {
            self.peeked = self.next();
        }
        self.peeked
    }

    fn at_end_of_statement(&mut self) -> bool {
        matches!(
            self.peek(),
            None | Some(Token::Colon)
                | Some(Token::Word(Word::Else))
                | Some(Token::Word(Word::Rem1))
                | Some(Token::Word(Word::Rem2))
        )
    }

    fn statement(&mut self) -> Result<Statement> {
        match self.peek() {
            Some(Token::Ident(ident)) if ident.is_extension() => {
                let column = self.column();
                self.next();
                Statement::r#call(self, column, ident.clone())
            }
            Some(Token::Ident(_)) => Statement::for_word(self, Word::Let),
            Some(Token::Word(word)) => {
                self.next();
                Statement::for_word(self, *word)
            }
            _ => Err(error!(SyntaxError; "EXPECTED STATEMENT")),
        }
    }

    fn statements(&mut self) -> Result<Vec<Statement>> {
        let mut v: Vec<Statement> = vec![];
        loop {
            match self.peek() {
                None
                | Some(Token::Word(Word::Else))
                | Some(Token::Word(Word::Rem1))
                | Some(Token::Word(Word::Rem2)) => return Ok(v),
                Some(Token::Colon) => {
                    self.next();
                }
                Some(_) => v.push(self.statement()?),
            }
        }
    }

    fn expression(&mut self) -> Result<Expression> {
        fn parse(this: &mut Parser, precedence: usize) -> Result<Expression> {
            let mut lhs = match this.next() {
                Some(Token::LParen) => {
                    let expr = this.expression()?;
                    this.expect(Token::RParen)?;
                    expr
                }
                Some(Token::Ident(i)) => {
                    let column = this.column();
                    match this.peek() {
                        Some(Token::LParen) => {
                            Expression::Function(column, i.clone(), this.expression_list()?)
                        }
                        _ if i.is_extension() || FUNCTIONS.contains(&&**i.name()) => {
                            Expression::Function(column, i.clone(), vec![])
                        }
                        _ => Expression::Var(column, i.clone()),
                    }
                }
                Some(Token::Literal(l)) => Expression::for_literal(this.column(), l)?,
                Some(Token::Operator(Operator::Minus)) => {
                    let column = this.column();
                    let expr = parse(this, 12)?;
                    Expression::Negation(column, Box::new(expr))
                }
                Some(Token::Operator(Operator::Plus)) => parse(this, 12)?,
                Some(Token::Operator(Operator::Not)) => {
                    let column = this.column();
                    let expr = parse(this, 6)?;
                    Expression::Not(column, Box::new(expr))
                }
                _ => return Err(error!(SyntaxError; "EXPECTED EXPRESSION")),
            };
            while let Some(Token::Operator(op)) = this.peek() {
                let op_precedence = match Expression::op_precedence(op) {
                    Some(p) if p >= precedence => p,
                    _ => break,
                };
                this.next();
                let column = this.column();
                let rhs = parse(this, op_precedence + 1)?;
                lhs = Expression::for_binary_op(column, op, lhs, rhs);
            }
            Ok(lhs)
        }
        parse(self, 0)
    }

    fn expression_list(&mut self) -> Result<Vec<Expression>> {
        self.expect(Token::LParen)?;
        let mut v: Vec<Expression> = vec![];
        loop {
            v.push(self.expression()?);
            match self.next() {
                Some(Token::RParen) => return Ok(v),
                Some(Token::Comma) => continue,
                _ => return Err(error!(SyntaxError; "EXPECTED END OR SEPARATOR")),
            }
        }
    }

    fn printer_list(&mut self) -> Result<Vec<Expression>> {
        let mut v: Vec<Expression> = vec![];
        let mut linefeed = true;
        loop {
            if self.at_end_of_statement() {
                if linefeed {
                    let mut column = self.column();
                    column.end = column.start;
                    v.push(Expression::Char(column, '\n'));
                }
                return Ok(v);
            }
            match self.peek() {
                Some(Token::Semicolon) => {
                    linefeed = false;
                    self.next();
                }
                Some(Token::Comma) => {
                    linefeed = false;
                    self.next();
                    v.push(Expression::Char(self.column(), '\t'));
                }
                _ => {
                    linefeed = true;
                    v.push(self.expression()?);
                }
            };
        }
    }

    fn ident(&mut self) -> Result<(Column, Ident)> {
        let ident = match self.next() {
            Some(Token::Ident(i)) if !i.is_extension() => i.clone(),
            _ => return Err(error!(SyntaxError; "EXPECTED IDENTIFIER")),
        };
        Ok((self.column(), ident))
    }

    fn variable(&mut self) -> Result<Variable> {
        let (column, ident) = self.ident()?;
        match self.peek() {
            Some(Token::LParen) => Ok(Variable::Array(column, ident, self.expression_list()?)),
            _ => Ok(Variable::Unary(column, ident)),
        }
    }

    fn variable_list(&mut self) -> Result<Vec<Variable>> {
        let mut v = vec![self.variable()?];
        while let Some(Token::Comma) = self.peek() {
            self.next();
            v.push(self.variable()?);
        }
        Ok(v)
    }

    fn line_number(&mut self) -> Result<u16> {
        match self.next() {
            Some(t) => match LineNumber::try_from(t)? {
                Some(n) => Ok(n),
                None => Err(error!(SyntaxError; "INVALID LINE NUMBER")),
            },
            None => Err(error!(SyntaxError; "EXPECTED LINE NUMBER")),
        }
    }

    fn maybe_hash(&mut self) {
        if let Some(Token::Hash) = self.peek() {
            self.next();
        }
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        if let Some(t) = self.next() {
            if *t == token {
                return Ok(());
            }
        }
        use Token::*;
        Err(error!(SyntaxError;
            match token {
                Unknown(_) | Whitespace(_) => {"UNEXPECTED TOKEN"}
                Literal(_) => {"EXPECTED LITERAL"}
                Word(_) => {"EXPECTED RESERVED WORD"}
                Operator(_) => {"EXPECTED OPERATOR"}
                Ident(_) => {"EXPECTED IDENTIFIER"}
                LParen => {"EXPECTED LEFT PARENTHESIS"}
                RParen => {"EXPECTED RIGHT PARENTHESIS"}
                Comma => {"EXPECTED COMMA"}
                Colon => {"EXPECTED COLON"}
                Semicolon => {"EXPECTED SEMICOLON"}
                Hash => {"EXPECTED FILE NUMBER"}
            }
        ))
    }
}

impl Expression {
    fn for_binary_op(col: Column, op: &Operator, lhs: Expression, rhs: Expression) -> Expression {
        use Operator::*;
        let (lhs, rhs) = (Box::new(lhs), Box::new(rhs));
        match op {
            Caret => Expression::Power(col, lhs, rhs),
            Multiply => Expression::Multiply(col, lhs, rhs),
            Divide => Expression::Divide(col, lhs, rhs),
            DivideInt => Expression::DivideInt(col, lhs, rhs),
            Modulus => Expression::Modulus(col, lhs, rhs),
            Plus => Expression::Add(col, lhs, rhs),
            Minus => Expression::Subtract(col, lhs, rhs),
            Equal => Expression::Equal(col, lhs, rhs),
            NotEqual => Expression::NotEqual(col, lhs, rhs),
            Less => Expression::Less(col, lhs, rhs),
            LessEqual => Expression::LessEqual(col, lhs, rhs),
            Greater => Expression::Greater(col, lhs, rhs),
            GreaterEqual => Expression::GreaterEqual(col, lhs, rhs),
            And => Expression::And(col, lhs, rhs),
            Or => Expression::Or(col, lhs, rhs),
            Xor => Expression::Xor(col, lhs, rhs),
            Imp => Expression::Imp(col, lhs, rhs),
            Eqv => Expression::Eqv(col, lhs, rhs),
            Not => Expression::Not(col, rhs),
        }
    }

    fn op_precedence(op: &Operator) -> Option<usize> {
        use Operator::*;
        Some(match op {
            Imp => 1,
            Eqv => 2,
            Xor => 3,
            Or => 4,
            And => 5,
            Not => return None,
            Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual => 7,
            Plus | Minus => 8,
            Modulus => 9,
            DivideInt => 10,
            Multiply | Divide => 11,
            Caret => 13,
        })
    }

    fn for_literal(col: Column, lit: &Literal) -> Result<Expression> {
        fn clean(s: &str) -> String {
            let mut s = s.replace("D", "E");
            match s.chars().last() {
                Some('!') | Some('#') | Some('%') => {
                    s.pop();
                }
                _ => {}
            };
            s
        }
        let bad = || error!(SyntaxError, ..&col; "INVALID NUMBER");
        Ok(match lit {
            Literal::Single(s) => {
                Expression::Single(col.clone(), clean(s).parse().map_err(|_| bad())?)
            }
            Literal::Double(s) => {
                Expression::Double(col.clone(), clean(s).parse().map_err(|_| bad())?)
            }
            Literal::Integer(s) => match clean(s).parse() {
                Ok(n) => Expression::Integer(col.clone(), n),
                Err(_) => return Err(error!(Overflow, ..&col)),
            },
            Literal::String(s) => Expression::String(col.clone(), codepage::encode_lossy(s).into()),
        })
    }
}

impl Statement {
    fn for_word(parse: &mut Parser, word: Word) -> Result<Statement> {
        let column = parse.column();
        use Word::*;
        match word {
            Clear => Ok(Statement::Clear(column)),
            Close => Self::r#close(parse, column),
            Cont => Ok(Statement::Cont(column)),
            Dim => Self::r#dim(parse, column),
            End => Ok(Statement::End(column)),
            For => Self::r#for(parse, column),
            Gosub => Ok(Statement::Gosub(column, parse.line_number()?)),
            Goto => Ok(Statement::Goto(column, parse.line_number()?)),
            If => Self::r#if(parse, column),
            Input => Self::r#input(parse, column),
            Let => Self::r#let(parse, column),
            Next => Self::r#next(parse, column),
            Open => Self::r#open(parse, column),
            Print1 | Print2 => Self::r#print(parse, column),
            Return => Ok(Statement::Return(column)),
            Run => Self::r#run(parse, column),
            Stop => Ok(Statement::Stop(column)),
            System => Ok(Statement::System(column)),
            Append | As | Else | Output | Rem1 | Rem2 | Step | Then | To => {
                Err(error!(SyntaxError; "EXPECTED STATEMENT"))
            }
        }
    }

    fn r#call(parse: &mut Parser, column: Column, ident: Ident) -> Result<Statement> {
        let mut args: Vec<Expression> = vec![];
        if let Some(Token::LParen) = parse.peek() {
            args = parse.expression_list()?;
        } else {
            while !parse.at_end_of_statement() {
                args.push(parse.expression()?);
                if parse.at_end_of_statement() {
                    break;
                }
                parse.expect(Token::Comma)?;
            }
        }
        Ok(Statement::Call(column, ident, args))
    }

    fn r#close(parse: &mut Parser, column: Column) -> Result<Statement> {
        let mut files: Vec<Expression> = vec![];
        while !parse.at_end_of_statement() {
            parse.maybe_hash();
            files.push(parse.expression()?);
            if parse.at_end_of_statement() {
                break;
            }
            parse.expect(Token::Comma)?;
        }
        Ok(Statement::Close(column, files))
    }

    fn r#dim(parse: &mut Parser, column: Column) -> Result<Statement> {
        let vars = parse.variable_list()?;
        for var in &vars {
            if let Variable::Unary(col, _) = var {
                return Err(error!(SyntaxError, ..col; "EXPECTED ARRAY BOUNDS"));
            }
        }
        Ok(Statement::Dim(column, vars))
    }

    fn r#for(parse: &mut Parser, column: Column) -> Result<Statement> {
        let (_, ident) = parse.ident()?;
        parse.expect(Token::Operator(Operator::Equal))?;
        let from = parse.expression()?;
        parse.expect(Token::Word(Word::To))?;
        let to = parse.expression()?;
        let step = match parse.peek() {
            Some(Token::Word(Word::Step)) => {
                parse.next();
                Some(parse.expression()?)
            }
            _ => None,
        };
        Ok(Statement::For(column, ident, from, to, step))
    }

    fn r#if(parse: &mut Parser, column: Column) -> Result<Statement> {
        fn branch(parse: &mut Parser) -> Result<Vec<Statement>> {
            if let Some(Token::Literal(_)) = parse.peek() {
                let column = parse.column();
                return Ok(vec![Statement::Goto(column, parse.line_number()?)]);
            }
            parse.statements()
        }
        let predicate = parse.expression()?;
        let then = match parse.next() {
            Some(Token::Word(Word::Then)) => branch(parse)?,
            Some(Token::Word(Word::Goto)) => {
                let column = parse.column();
                vec![Statement::Goto(column, parse.line_number()?)]
            }
            _ => return Err(error!(SyntaxError; "EXPECTED THEN")),
        };
        let otherwise = match parse.peek() {
            Some(Token::Word(Word::Else)) => {
                parse.next();
                branch(parse)?
            }
            _ => vec![],
        };
        Ok(Statement::If(column, predicate, then, otherwise))
    }

    fn r#input(parse: &mut Parser, column: Column) -> Result<Statement> {
        parse.expect(Token::Hash)?;
        let file = parse.expression()?;
        parse.expect(Token::Comma)?;
        Ok(Statement::Input(column, file, parse.variable_list()?))
    }

    fn r#let(parse: &mut Parser, column: Column) -> Result<Statement> {
        let var = parse.variable()?;
        parse.expect(Token::Operator(Operator::Equal))?;
        let expr = parse.expression()?;
        Ok(Statement::Let(column, var, expr))
    }

    fn r#next(parse: &mut Parser, column: Column) -> Result<Statement> {
        let mut idents: Vec<Ident> = vec![];
        while !parse.at_end_of_statement() {
            idents.push(parse.ident()?.1);
            if parse.at_end_of_statement() {
                break;
            }
            parse.expect(Token::Comma)?;
        }
        Ok(Statement::Next(column, idents))
    }

    fn r#open(parse: &mut Parser, column: Column) -> Result<Statement> {
        let name = parse.expression()?;
        parse.expect(Token::Word(Word::For))?;
        let mode = match parse.next() {
            Some(Token::Word(Word::Input)) => FileMode::Input,
            Some(Token::Word(Word::Output)) => FileMode::Output,
            Some(Token::Word(Word::Append)) => FileMode::Append,
            _ => return Err(error!(SyntaxError; "EXPECTED FILE MODE")),
        };
        parse.expect(Token::Word(Word::As))?;
        parse.maybe_hash();
        let number = parse.expression()?;
        Ok(Statement::Open(column, name, mode, number))
    }

    fn r#print(parse: &mut Parser, column: Column) -> Result<Statement> {
        let mut channel = None;
        if let Some(Token::Hash) = parse.peek() {
            parse.next();
            channel = Some(parse.expression()?);
            if !parse.at_end_of_statement() {
                parse.expect(Token::Comma)?;
            }
        }
        Ok(Statement::Print(column, channel, parse.printer_list()?))
    }

    fn r#run(parse: &mut Parser, column: Column) -> Result<Statement> {
        if parse.at_end_of_statement() {
            return Ok(Statement::Run(column, None));
        }
        Ok(Statement::Run(column, Some(parse.line_number()?)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::lex::*;
    use super::*;

    fn parse_str(s: &str) -> Statement {
        let (lin, tokens) = lex(s);
        match parse(lin, &tokens) {
            Ok(mut v) => {
                assert_eq!(v.len(), 1);
                v.pop().unwrap()
            }
            Err(e) => panic!("{} : {:?}", e, e),
        }
    }

    fn parse_expr(s: &str) -> Expression {
        let tokens = lex_direct(s);
        parse_expression(&tokens).unwrap()
    }

    #[test]
    fn test_let_foo_eq_bar() {
        let answer = Statement::Let(
            0..3,
            Variable::Unary(3..6, Ident::Plain("TER".into())),
            Expression::Var(7..10, Ident::Plain("BAR".into())),
        );
        assert_eq!(parse_str("letter=bar:"), answer);
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse_expr("12"), Expression::Integer(0..2, 12));
        assert_eq!(parse_expr("12!"), Expression::Single(0..3, 12.0));
        assert_eq!(parse_expr("12d4"), Expression::Double(0..4, 12e4));
        assert_eq!(
            parse_expr("\"food\""),
            Expression::String(0..6, b"food".to_vec().into())
        );
    }

    #[test]
    fn test_left_associative() {
        let answer = Expression::Subtract(
            3..4,
            Box::new(Expression::Subtract(
                1..2,
                Box::new(Expression::Integer(0..1, 2)),
                Box::new(Expression::Integer(2..3, 3)),
            )),
            Box::new(Expression::Integer(4..5, 4)),
        );
        assert_eq!(parse_expr("2-3-4"), answer);
    }

    #[test]
    fn test_negation_binds_below_power() {
        let answer = Expression::Negation(
            0..1,
            Box::new(Expression::Power(
                2..3,
                Box::new(Expression::Integer(1..2, 2)),
                Box::new(Expression::Integer(3..4, 2)),
            )),
        );
        assert_eq!(parse_expr("-2^2"), answer);
    }

    #[test]
    fn test_trailing_garbage() {
        let tokens = lex_direct("1 2");
        assert!(parse_expression(&tokens).is_err());
    }

    #[test]
    fn test_printer_list() {
        let (lin, tokens) = lex("? 1 2,3;:?");
        assert_eq!(
            parse(lin, &tokens).unwrap(),
            vec!(
                Statement::Print(
                    0..1,
                    None,
                    vec!(
                        Expression::Integer(2..3, 1),
                        Expression::Integer(4..5, 2),
                        Expression::Char(5..6, '\t'),
                        Expression::Integer(6..7, 3),
                    )
                ),
                Statement::Print(9..10, None, vec!(Expression::Char(10..10, '\n'),)),
            )
        );
    }

    #[test]
    fn test_print_to_file() {
        match parse_str("?#1,a") {
            Statement::Print(_, Some(Expression::Integer(_, 1)), list) => assert_eq!(list.len(), 2),
            s => panic!("{:?}", s),
        }
    }

    #[test]
    fn test_open() {
        match parse_str("open\"z:output.txt\" for output as 1") {
            Statement::Open(_, Expression::String(_, name), FileMode::Output, _) => {
                assert_eq!(&*name, b"z:output.txt")
            }
            s => panic!("{:?}", s),
        }
    }

    #[test]
    fn test_if_then_line_number() {
        match parse_str("if a then 100 else b=1:c=2") {
            Statement::If(_, _, then, otherwise) => {
                assert_eq!(then, vec![Statement::Goto(10..13, 100)]);
                assert_eq!(otherwise.len(), 2);
            }
            s => panic!("{:?}", s),
        }
    }

    #[test]
    fn test_extension_call() {
        match parse_str("_greet 1, \"two\"") {
            Statement::Call(_, ident, args) => {
                assert_eq!(&**ident.name(), "_GREET");
                assert_eq!(args.len(), 2);
            }
            s => panic!("{:?}", s),
        }
        match parse_str("_noop") {
            Statement::Call(_, _, args) => assert!(args.is_empty()),
            s => panic!("{:?}", s),
        }
    }

    #[test]
    fn test_remark_ends_line() {
        let (lin, tokens) = lex("a=1 ' note: b=2");
        assert_eq!(parse(lin, &tokens).unwrap().len(), 1);
    }

    #[test]
    fn test_error_has_line_number() {
        let (lin, tokens) = lex("10 a=");
        let e = parse(lin, &tokens).unwrap_err();
        assert_eq!(e.line_number(), Some(10));
    }
}
