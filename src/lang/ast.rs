use super::Column;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

#[derive(Debug, PartialEq)]
pub enum Statement {
    Call(Column, Ident, Vec<Expression>),
    Clear(Column),
    Close(Column, Vec<Expression>),
    Cont(Column),
    Dim(Column, Vec<Variable>),
    End(Column),
    For(Column, Ident, Expression, Expression, Option<Expression>),
    Gosub(Column, u16),
    Goto(Column, u16),
    If(Column, Expression, Vec<Statement>, Vec<Statement>),
    Input(Column, Expression, Vec<Variable>),
    Let(Column, Variable, Expression),
    Next(Column, Vec<Ident>),
    Open(Column, Expression, FileMode, Expression),
    Print(Column, Option<Expression>, Vec<Expression>),
    Return(Column),
    Run(Column, Option<u16>),
    Stop(Column),
    System(Column),
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum FileMode {
    Input,
    Output,
    Append,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Ident {
    Plain(Rc<str>),
    String(Rc<str>),
    Single(Rc<str>),
    Double(Rc<str>),
    Integer(Rc<str>),
}

impl Ident {
    /// Classify an upper case name by its trailing sigil.
    pub fn from_name(s: &str) -> Ident {
        let name: Rc<str> = s.into();
        match s.chars().last() {
            Some('$') => Ident::String(name),
            Some('!') => Ident::Single(name),
            Some('#') => Ident::Double(name),
            Some('%') => Ident::Integer(name),
            _ => Ident::Plain(name),
        }
    }

    pub fn name(&self) -> &Rc<str> {
        use Ident::*;
        match self {
            Plain(s) | String(s) | Single(s) | Double(s) | Integer(s) => s,
        }
    }

    /// Variable name with its sigil. A plain `A` is the single `A!`.
    pub fn canonical(&self) -> Rc<str> {
        match self {
            Ident::Plain(s) => format!("{}!", s).into(),
            _ => self.name().clone(),
        }
    }

    pub fn is_extension(&self) -> bool {
        self.name().starts_with('_')
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, PartialEq)]
pub enum Variable {
    Unary(Column, Ident),
    Array(Column, Ident, Vec<Expression>),
}

impl Variable {
    pub fn column(&self) -> Column {
        match self {
            Variable::Unary(col, _) | Variable::Array(col, ..) => col.clone(),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Expression {
    Single(Column, f32),
    Double(Column, f64),
    Integer(Column, i16),
    String(Column, Rc<[u8]>),
    Char(Column, char),
    Var(Column, Ident),
    Function(Column, Ident, Vec<Expression>),
    Negation(Column, Box<Expression>),
    Not(Column, Box<Expression>),
    Power(Column, Box<Expression>, Box<Expression>),
    Multiply(Column, Box<Expression>, Box<Expression>),
    Divide(Column, Box<Expression>, Box<Expression>),
    DivideInt(Column, Box<Expression>, Box<Expression>),
    Modulus(Column, Box<Expression>, Box<Expression>),
    Add(Column, Box<Expression>, Box<Expression>),
    Subtract(Column, Box<Expression>, Box<Expression>),
    Equal(Column, Box<Expression>, Box<Expression>),
    NotEqual(Column, Box<Expression>, Box<Expression>),
    Less(Column, Box<Expression>, Box<Expression>),
    LessEqual(Column, Box<Expression>, Box<Expression>),
    Greater(Column, Box<Expression>, Box<Expression>),
    GreaterEqual(Column, Box<Expression>, Box<Expression>),
    And(Column, Box<Expression>, Box<Expression>),
    Or(Column, Box<Expression>, Box<Expression>),
    Xor(Column, Box<Expression>, Box<Expression>),
    Imp(Column, Box<Expression>, Box<Expression>),
    Eqv(Column, Box<Expression>, Box<Expression>),
}

impl Expression {
    pub fn column(&self) -> Column {
        use Expression::*;
        match self {
            Single(col, ..)
            | Double(col, ..)
            | Integer(col, ..)
            | String(col, ..)
            | Char(col, ..)
            | Var(col, ..)
            | Function(col, ..)
            | Negation(col, ..)
            | Not(col, ..)
            | Power(col, ..)
            | Multiply(col, ..)
            | Divide(col, ..)
            | DivideInt(col, ..)
            | Modulus(col, ..)
            | Add(col, ..)
            | Subtract(col, ..)
            | Equal(col, ..)
            | NotEqual(col, ..)
            | Less(col, ..)
            | LessEqual(col, ..)
            | Greater(col, ..)
            | GreaterEqual(col, ..)
            | And(col, ..)
            | Or(col, ..)
            | Xor(col, ..)
            | Imp(col, ..)
            | Eqv(col, ..) => col.clone(),
        }
    }
}
