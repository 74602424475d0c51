use super::{Address, Val};
use crate::lang::ast::FileMode;
use std::rc::Rc;

/// ## Virtual machine instruction set
///
/// The BASIC virtual machine has no registers.
/// Every operation is performed on the stack.
///
/// For example: `LET A=3*B` compiles to `[Literal(3), Push(B!), Mul, Pop(A!)]`
///
/// See <https://en.wikipedia.org/wiki/Reverse_Polish_notation>

#[derive(Debug, Clone, PartialEq)]
pub enum Opcode {
    // *** Stack manipulation
    /// Push literal value on to the stack.
    Literal(Val),
    /// Push stack value of named variable. Infallible.
    Push(Rc<str>),
    /// Pop stack value to named variable. This is the `LET` statement
    /// and may generate errors.
    Pop(Rc<str>),
    /// Pop subscripts and push the array element.
    PushArr(Rc<str>, usize),
    /// Pop a value then its subscripts and store the array element.
    PopArr(Rc<str>, usize),
    /// Pop bounds and dimension the array.
    DimArr(Rc<str>, usize),
    /// Discard the top of the stack.
    Drop,

    // *** Branch control
    /// Pop step and limit, then open a loop over the named variable
    /// whose body starts at the next instruction.
    For(Rc<str>),
    /// Step the named (or innermost) loop and branch back if unfinished.
    Next(Option<Rc<str>>),
    /// Pop stack and branch to Address if zero.
    IfNot(Address),
    /// Unconditional branch to Address.
    Jump(Address),
    /// Remember the following instruction and branch to Address.
    Gosub(Address),
    /// Branch to the address saved by the last `Gosub`.
    Return,

    // *** Statements
    Clear,
    Cont,
    End,
    Ready,
    Run(Option<Address>),
    Stop,
    System,
    Yield,

    // *** Files and printing
    /// Pop a file number and direct printing and input to it.
    Channel,
    /// Direct printing back to the console.
    Console,
    Print,
    PrintComma,
    PrintLine,
    /// Read one field from the current channel and push it.
    Input(bool),
    /// Pop file number and name and open the file.
    Open(FileMode),
    /// Pop this many file numbers and close them; zero closes all.
    Close(usize),

    // *** Expression operations
    Neg,
    Exp,
    Mul,
    Div,
    DivInt,
    Mod,
    Add,
    Sub,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Not,
    And,
    Or,
    Xor,
    Imp,
    Eqv,

    // *** Built-in functions
    Abs,
    Asc,
    Chr,
    Cos,
    Csrlin,
    Date,
    Eof,
    Fre(usize),
    Int,
    Left,
    Len,
    Mid(usize),
    Pos(usize),
    Right,
    Rnd(usize),
    Sin,
    Sqr,
    Str,
    Strings,
    Time,
    Value,

    /// Pop arguments and call a host extension.
    Extension(Rc<str>, usize),
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Opcode::*;
        match self {
            Literal(v) => write!(f, "{}", format!("{:?}", v).to_ascii_uppercase()),
            Push(s) => write!(f, "PUSH({})", s),
            Pop(s) => write!(f, "POP({})", s),
            PushArr(s, n) => write!(f, "PUSHARR({},{})", s, n),
            PopArr(s, n) => write!(f, "POPARR({},{})", s, n),
            DimArr(s, n) => write!(f, "DIMARR({},{})", s, n),
            Drop => write!(f, "DROP"),

            For(s) => write!(f, "FOR({})", s),
            Next(Some(s)) => write!(f, "NEXT({})", s),
            Next(None) => write!(f, "NEXT"),
            IfNot(a) => write!(f, "IFNOT({})", a),
            Jump(a) => write!(f, "JUMP({})", a),
            Gosub(a) => write!(f, "GOSUB({})", a),
            Return => write!(f, "RETURN"),

            Clear => write!(f, "CLEAR"),
            Cont => write!(f, "CONT"),
            End => write!(f, "END"),
            Ready => write!(f, "READY"),
            Run(Some(a)) => write!(f, "RUN({})", a),
            Run(None) => write!(f, "RUN"),
            Stop => write!(f, "STOP"),
            System => write!(f, "SYSTEM"),
            Yield => write!(f, "YIELD"),

            Channel => write!(f, "CHANNEL"),
            Console => write!(f, "CONSOLE"),
            Print => write!(f, "PRINT"),
            PrintComma => write!(f, "PRINTCOMMA"),
            PrintLine => write!(f, "PRINTLINE"),
            Input(true) => write!(f, "INPUT$"),
            Input(false) => write!(f, "INPUT"),
            Open(mode) => write!(f, "OPEN({:?})", mode),
            Close(n) => write!(f, "CLOSE({})", n),

            Neg => write!(f, "NEG"),
            Exp => write!(f, "EXP"),
            Mul => write!(f, "MUL"),
            Div => write!(f, "DIV"),
            DivInt => write!(f, "DIVINT"),
            Mod => write!(f, "MOD"),
            Add => write!(f, "ADD"),
            Sub => write!(f, "SUB"),
            Eq => write!(f, "EQ"),
            NotEq => write!(f, "NOTEQ"),
            Lt => write!(f, "LT"),
            LtEq => write!(f, "LTEQ"),
            Gt => write!(f, "GT"),
            GtEq => write!(f, "GTEQ"),
            Not => write!(f, "NOT"),
            And => write!(f, "AND"),
            Or => write!(f, "OR"),
            Xor => write!(f, "XOR"),
            Imp => write!(f, "IMP"),
            Eqv => write!(f, "EQV"),

            Abs => write!(f, "ABS"),
            Asc => write!(f, "ASC"),
            Chr => write!(f, "CHR$"),
            Cos => write!(f, "COS"),
            Csrlin => write!(f, "CSRLIN"),
            Date => write!(f, "DATE$"),
            Eof => write!(f, "EOF"),
            Fre(_) => write!(f, "FRE"),
            Int => write!(f, "INT"),
            Left => write!(f, "LEFT$"),
            Len => write!(f, "LEN"),
            Mid(_) => write!(f, "MID$"),
            Pos(_) => write!(f, "POS"),
            Right => write!(f, "RIGHT$"),
            Rnd(_) => write!(f, "RND"),
            Sin => write!(f, "SIN"),
            Sqr => write!(f, "SQR"),
            Str => write!(f, "STR$"),
            Strings => write!(f, "STRING$"),
            Time => write!(f, "TIME$"),
            Value => write!(f, "VAL"),

            Extension(s, n) => write!(f, "EXTENSION({},{})", s, n),
        }
    }
}
