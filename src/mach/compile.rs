use super::{Function, Kind, Opcode, Program, Val};
use crate::error;
use crate::lang::ast::{Expression, FileMode, Ident, Statement, Variable};
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

pub fn compile(program: &mut Program, ast: &[Statement]) -> Result<()> {
    let mut compiler = Compiler { prog: program };
    for statement in ast {
        compiler.statement(statement)?;
    }
    Ok(())
}

pub fn compile_expression(program: &mut Program, expr: &Expression) -> Result<()> {
    Compiler { prog: program }.expression(expr)
}

struct Compiler<'a> {
    prog: &'a mut Program,
}

impl<'a> Compiler<'a> {
    fn push(&mut self, op: Opcode) -> Result<()> {
        self.prog.push(op)
    }

    fn expression(&mut self, expr: &Expression) -> Result<()> {
        use Expression::*;
        match expr {
            Single(_, val) => self.push(Opcode::Literal(Val::Single(*val))),
            Double(_, val) => self.push(Opcode::Literal(Val::Double(*val))),
            Integer(_, val) => self.push(Opcode::Literal(Val::Integer(*val))),
            String(_, val) => self.push(Opcode::Literal(Val::String(val.clone()))),
            Char(col, _) => Err(error!(SyntaxError, ..col)),
            Var(_, ident) => self.push(Opcode::Push(ident.canonical())),
            Function(col, ident, args) => self
                .function(ident, args)
                .map_err(|e| e.in_column(col)),
            Negation(_, expr) => {
                self.expression(expr)?;
                self.push(Opcode::Neg)
            }
            Not(_, expr) => {
                self.expression(expr)?;
                self.push(Opcode::Not)
            }
            Power(_, l, r) => self.binary(l, r, Opcode::Exp),
            Multiply(_, l, r) => self.binary(l, r, Opcode::Mul),
            Divide(_, l, r) => self.binary(l, r, Opcode::Div),
            DivideInt(_, l, r) => self.binary(l, r, Opcode::DivInt),
            Modulus(_, l, r) => self.binary(l, r, Opcode::Mod),
            Add(_, l, r) => self.binary(l, r, Opcode::Add),
            Subtract(_, l, r) => self.binary(l, r, Opcode::Sub),
            Equal(_, l, r) => self.binary(l, r, Opcode::Eq),
            NotEqual(_, l, r) => self.binary(l, r, Opcode::NotEq),
            Less(_, l, r) => self.binary(l, r, Opcode::Lt),
            LessEqual(_, l, r) => self.binary(l, r, Opcode::LtEq),
            Greater(_, l, r) => self.binary(l, r, Opcode::Gt),
            GreaterEqual(_, l, r) => self.binary(l, r, Opcode::GtEq),
            And(_, l, r) => self.binary(l, r, Opcode::And),
            Or(_, l, r) => self.binary(l, r, Opcode::Or),
            Xor(_, l, r) => self.binary(l, r, Opcode::Xor),
            Imp(_, l, r) => self.binary(l, r, Opcode::Imp),
            Eqv(_, l, r) => self.binary(l, r, Opcode::Eqv),
        }
    }

    fn binary(&mut self, lhs: &Expression, rhs: &Expression, op: Opcode) -> Result<()> {
        self.expression(lhs)?;
        self.expression(rhs)?;
        self.push(op)
    }

    fn expressions(&mut self, exprs: &[Expression]) -> Result<()> {
        for expr in exprs {
            self.expression(expr)?;
        }
        Ok(())
    }

    fn function(&mut self, ident: &Ident, args: &[Expression]) -> Result<()> {
        if ident.is_extension() {
            self.expressions(args)?;
            return self.push(Opcode::Extension(ident.name().clone(), args.len()));
        }
        if let Some((opcode, arity)) = Function::opcode_and_arity(ident.name(), args.len()) {
            if !arity.contains(&args.len()) {
                return Err(error!(SyntaxError; "WRONG NUMBER OF ARGUMENTS"));
            }
            self.expressions(args)?;
            return self.push(opcode);
        }
        self.expressions(args)?;
        self.push(Opcode::PushArr(ident.canonical(), args.len()))
    }

    fn statement(&mut self, statement: &Statement) -> Result<()> {
        use Statement::*;
        let (col, result) = match statement {
            Call(col, ident, args) => (col, self.r#call(ident, args)),
            Clear(col) => (col, self.push(Opcode::Clear)),
            Close(col, files) => (col, self.r#close(files)),
            Cont(col) => (col, self.push(Opcode::Cont)),
            Dim(col, vars) => (col, self.r#dim(vars)),
            End(col) => (col, self.push(Opcode::End)),
            For(col, ident, from, to, step) => (col, self.r#for(ident, from, to, step.as_ref())),
            Gosub(col, line_number) => (col, self.prog.push_gosub(col, *line_number)),
            Goto(col, line_number) => (col, self.prog.push_goto(col, *line_number)),
            If(col, predicate, then, otherwise) => (col, self.r#if(predicate, then, otherwise)),
            Input(col, file, vars) => (col, self.r#input(file, vars)),
            Let(col, var, expr) => (col, self.r#let(var, expr)),
            Next(col, idents) => (col, self.r#next(idents)),
            Open(col, name, mode, number) => (col, self.r#open(name, *mode, number)),
            Print(col, channel, items) => (col, self.r#print(channel.as_ref(), items)),
            Return(col) => (col, self.push(Opcode::Return)),
            Run(col, line_number) => (col, self.prog.push_run(col, *line_number)),
            Stop(col) => (col, self.push(Opcode::Stop)),
            System(col) => (col, self.push(Opcode::System)),
        };
        result.map_err(|e| e.in_column(col))
    }

    fn r#call(&mut self, ident: &Ident, args: &[Expression]) -> Result<()> {
        self.expressions(args)?;
        self.push(Opcode::Extension(ident.name().clone(), args.len()))?;
        self.push(Opcode::Drop)
    }

    fn r#close(&mut self, files: &[Expression]) -> Result<()> {
        self.expressions(files)?;
        self.push(Opcode::Close(files.len()))
    }

    fn r#dim(&mut self, vars: &[Variable]) -> Result<()> {
        for var in vars {
            match var {
                Variable::Array(_, ident, bounds) => {
                    self.expressions(bounds)?;
                    self.push(Opcode::DimArr(ident.canonical(), bounds.len()))?;
                }
                Variable::Unary(col, _) => return Err(error!(SyntaxError, ..col)),
            }
        }
        Ok(())
    }

    fn r#for(
        &mut self,
        ident: &Ident,
        from: &Expression,
        to: &Expression,
        step: Option<&Expression>,
    ) -> Result<()> {
        let var_name = ident.canonical();
        if Kind::of(&var_name) == Kind::String {
            return Err(error!(TypeMismatch));
        }
        self.expression(from)?;
        self.push(Opcode::Pop(var_name.clone()))?;
        self.expression(to)?;
        match step {
            Some(step) => self.expression(step)?,
            None => self.push(Opcode::Literal(Val::Integer(1)))?,
        }
        self.push(Opcode::For(var_name))
    }

    fn r#if(
        &mut self,
        predicate: &Expression,
        then: &[Statement],
        otherwise: &[Statement],
    ) -> Result<()> {
        self.expression(predicate)?;
        let if_not = self.prog.len();
        self.push(Opcode::IfNot(0))?;
        for statement in then {
            self.statement(statement)?;
        }
        if otherwise.is_empty() {
            let after = self.prog.len();
            self.prog.set(if_not, Opcode::IfNot(after));
            return Ok(());
        }
        let jump = self.prog.len();
        self.push(Opcode::Jump(0))?;
        let else_addr = self.prog.len();
        self.prog.set(if_not, Opcode::IfNot(else_addr));
        for statement in otherwise {
            self.statement(statement)?;
        }
        let after = self.prog.len();
        self.prog.set(jump, Opcode::Jump(after));
        Ok(())
    }

    fn store(&mut self, var: &Variable, value: impl FnOnce(&mut Compiler) -> Result<()>) -> Result<()> {
        match var {
            Variable::Unary(_, ident) => {
                value(self)?;
                self.push(Opcode::Pop(ident.canonical()))
            }
            Variable::Array(_, ident, indices) => {
                self.expressions(indices)?;
                value(self)?;
                self.push(Opcode::PopArr(ident.canonical(), indices.len()))
            }
        }
    }

    fn r#input(&mut self, file: &Expression, vars: &[Variable]) -> Result<()> {
        self.expression(file)?;
        self.push(Opcode::Channel)?;
        for var in vars {
            let is_string = match var {
                Variable::Unary(_, ident) | Variable::Array(_, ident, _) => {
                    Kind::of(&ident.canonical()) == Kind::String
                }
            };
            self.store(var, |this| this.push(Opcode::Input(is_string)))
                .map_err(|e| e.in_column(&var.column()))?;
        }
        self.push(Opcode::Console)
    }

    fn r#let(&mut self, var: &Variable, expr: &Expression) -> Result<()> {
        self.store(var, |this| this.expression(expr))
    }

    fn r#next(&mut self, idents: &[Ident]) -> Result<()> {
        if idents.is_empty() {
            return self.push(Opcode::Next(None));
        }
        for ident in idents {
            self.push(Opcode::Next(Some(ident.canonical())))?;
        }
        Ok(())
    }

    fn r#open(
        &mut self,
        name: &Expression,
        mode: FileMode,
        number: &Expression,
    ) -> Result<()> {
        self.expression(name)?;
        self.expression(number)?;
        self.push(Opcode::Open(mode))
    }

    fn r#print(&mut self, channel: Option<&Expression>, items: &[Expression]) -> Result<()> {
        if let Some(channel) = channel {
            self.expression(channel)?;
            self.push(Opcode::Channel)?;
        }
        for item in items {
            match item {
                Expression::Char(_, '\t') => self.push(Opcode::PrintComma)?,
                Expression::Char(_, '\n') => self.push(Opcode::PrintLine)?,
                Expression::Char(col, _) => return Err(error!(SyntaxError, ..col)),
                expr => {
                    self.expression(expr)?;
                    self.push(Opcode::Print)?;
                }
            }
        }
        if channel.is_some() {
            self.push(Opcode::Console)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Line;

    fn ops(s: &str) -> Vec<String> {
        let mut prog = Program::default();
        compile(&mut prog, &Line::new(s).ast().unwrap()).unwrap();
        (0..prog.len())
            .filter_map(|a| prog.op(a))
            .map(|op| op.to_string())
            .collect()
    }

    #[test]
    fn test_let() {
        assert_eq!(ops("a=3*b"), vec!["INTEGER(3)", "PUSH(B!)", "MUL", "POP(A!)"]);
    }

    #[test]
    fn test_array_let() {
        assert_eq!(
            ops("a%(1,2)=5"),
            vec!["INTEGER(1)", "INTEGER(2)", "INTEGER(5)", "POPARR(A%,2)"]
        );
    }

    #[test]
    fn test_if_else() {
        assert_eq!(
            ops("if a then b=1 else b=2"),
            vec![
                "PUSH(A!)",
                "IFNOT(5)",
                "INTEGER(1)",
                "POP(B!)",
                "JUMP(7)",
                "INTEGER(2)",
                "POP(B!)"
            ]
        );
    }

    #[test]
    fn test_print_to_channel() {
        assert_eq!(
            ops("?#1,a"),
            vec!["INTEGER(1)", "CHANNEL", "PUSH(A!)", "PRINT", "PRINTLINE", "CONSOLE"]
        );
    }

    #[test]
    fn test_extension_statement() {
        assert_eq!(ops("_seed 42"), vec!["INTEGER(42)", "EXTENSION(_SEED,1)", "DROP"]);
    }

    #[test]
    fn test_wrong_arity() {
        let mut prog = Program::default();
        let e = compile(&mut prog, &Line::new("a=left$(b$)").ast().unwrap()).unwrap_err();
        assert_eq!(e.code(), crate::lang::ErrorCode::SyntaxError as u16);
    }
}
