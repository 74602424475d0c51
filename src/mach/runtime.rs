use super::console::Console;
use super::device::{BoundFile, Devices, Origin};
use super::file::{Files, TextFile};
use super::random::Random;
use super::state::State;
use super::{Address, Function, Listing, Opcode, Operation, Program, Stack, Val, Var};
use crate::config::Config;
use crate::error;
use crate::lang::ast::FileMode;
use crate::lang::{lex_direct, parse_expression, Error, Line};
use crate::mach::listing::MAX_LINE_LEN;
use log::debug;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::rc::Rc;
use std::sync::Arc;

type Result<T> = std::result::Result<T, Error>;

/// Host functions called as `_NAME` from BASIC.
pub trait Extend {
    fn call(&mut self, name: &str, var: &mut Var, args: Vec<Val>) -> Result<Val>;
}

/// Why `execute` returned.
#[derive(Debug, Clone)]
pub enum Event {
    Stopped,
    Running,
    System,
    Errors(Arc<Vec<Error>>),
}

/// An open `FOR` loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForFrame {
    pub var: Rc<str>,
    pub to: Val,
    pub step: Val,
    pub body: Address,
}

/// ## Virtual machine

pub struct Runtime {
    config: Config,
    listing: Listing,
    dirty: bool,
    program: Program,
    pc: Address,
    running: bool,
    cont: Option<Address>,
    pending: Option<Arc<Vec<Error>>>,
    stack: Stack<Val>,
    gosub: Stack<Address>,
    loops: Stack<ForFrame>,
    var: Var,
    console: Console,
    files: Files,
    devices: Devices,
    channel: Option<u16>,
    random: Random,
    extension: Option<Box<dyn Extend>>,
}

impl Default for Runtime {
    fn default() -> Runtime {
        Runtime::new(Config::default())
    }
}

impl Runtime {
    pub fn new(config: Config) -> Runtime {
        Runtime {
            listing: Listing::default(),
            dirty: false,
            program: Program::default(),
            pc: 0,
            running: false,
            cont: None,
            pending: None,
            stack: Stack::new("EXPRESSION TOO COMPLEX"),
            gosub: Stack::new("TOO MANY GOSUBS"),
            loops: Stack::new("TOO MANY FOR LOOPS"),
            var: Var::new(config.memory),
            console: Console::default(),
            files: Files::new(config.max_files),
            devices: Devices::new(config.mount.clone(), config.current_drive),
            channel: None,
            random: Random::new(config.seed),
            extension: None,
            config,
        }
    }

    pub fn set_extension(&mut self, extension: Option<Box<dyn Extend>>) {
        self.extension = extension;
    }

    pub fn var(&self) -> &Var {
        &self.var
    }

    pub fn var_mut(&mut self) -> &mut Var {
        &mut self.var
    }

    pub fn csrlin(&self) -> u16 {
        self.console.row()
    }

    pub fn pos(&self) -> u16 {
        self.console.col()
    }

    pub fn take_output(&mut self) -> String {
        self.console.take_output()
    }

    pub fn can_continue(&self) -> bool {
        self.cont.is_some()
    }

    pub fn bind(&mut self, file: BoundFile) -> String {
        self.devices.bind(file)
    }

    pub fn devices(&self) -> &Devices {
        &self.devices
    }

    /// Enter a line of BASIC. Numbered lines edit the listing; anything
    /// else is compiled and made ready to run.
    pub fn enter(&mut self, s: &str) {
        if s.len() > MAX_LINE_LEN {
            self.pending = Some(Arc::new(vec![error!(LineBufferOverflow)]));
            return;
        }
        let line = Line::new(s);
        if !line.is_direct() {
            if line.is_empty() {
                self.listing.remove(line.number());
            } else {
                self.listing.insert(line);
            }
            self.dirty = true;
            self.cont = None;
            return;
        }
        if line.is_empty() {
            return;
        }
        self.compile_if_dirty();
        let direct_address = self.program.direct_address();
        self.loops.retain(|frame| frame.body < direct_address);
        self.gosub.retain(|addr| *addr < direct_address);
        match self.program.compile_direct(&line) {
            Ok(addr) => {
                self.stack.clear();
                self.pc = addr;
                self.running = true;
            }
            Err(e) => self.pending = Some(Arc::new(vec![e])),
        }
    }

    fn compile_if_dirty(&mut self) {
        if self.dirty {
            self.program.compile_listing(&self.listing);
            self.loops.clear();
            self.gosub.clear();
            self.dirty = false;
        }
    }

    /// Run for at most `cycles` instructions.
    pub fn execute(&mut self, cycles: usize) -> Event {
        if let Some(errors) = self.pending.take() {
            return Event::Errors(errors);
        }
        if !self.running {
            return Event::Stopped;
        }
        match self.execute_loop(cycles) {
            Ok(event) => event,
            Err(error) => {
                debug!("{}", error);
                self.running = false;
                self.channel = None;
                self.cont = None;
                self.stack.clear();
                Event::Errors(Arc::new(vec![error]))
            }
        }
    }

    /// Evaluate an expression against the live variables. A pending
    /// `CONT` is not disturbed.
    pub fn evaluate(&mut self, s: &str) -> Result<Val> {
        if s.len() > MAX_LINE_LEN {
            return Err(error!(LineBufferOverflow));
        }
        let expr = parse_expression(&lex_direct(s))?;
        self.compile_if_dirty();
        let saved = (self.pc, self.running, self.channel);
        self.stack.clear();
        let result = self
            .program
            .compile_expression(&expr)
            .and_then(|addr| self.run_to_yield(addr));
        let (pc, running, channel) = saved;
        self.pc = pc;
        self.running = running;
        self.channel = channel;
        result
    }

    fn run_to_yield(&mut self, addr: Address) -> Result<Val> {
        self.pc = addr;
        self.running = true;
        loop {
            match self.execute_loop(usize::max_value())? {
                Event::Running => continue,
                Event::Stopped => return self.stack.pop(),
                _ => return Err(error!(InternalError; "EXPRESSION DID NOT YIELD")),
            }
        }
    }

    fn execute_loop(&mut self, cycles: usize) -> Result<Event> {
        let has_indirect_errors = !self.program.indirect_errors().is_empty();
        for _ in 0..cycles {
            if has_indirect_errors && self.program.is_indirect(self.pc) {
                self.running = false;
                return Ok(Event::Errors(self.program.indirect_errors()));
            }
            let addr = self.pc;
            let op = match self.program.op(addr) {
                Some(op) => op.clone(),
                None => return Err(error!(InternalError; "INVALID ADDRESS")),
            };
            self.pc += 1;
            match self.execute_op(op) {
                Ok(Some(event)) => return Ok(event),
                Ok(None) => {}
                Err(e) => return Err(e.in_line_number(self.program.line_number_for(addr))),
            }
        }
        Ok(Event::Running)
    }

    fn stop(&mut self) -> Option<Event> {
        self.running = false;
        Some(Event::Stopped)
    }

    fn mark_cont(&mut self) {
        if self.program.is_indirect(self.pc) {
            self.cont = Some(self.pc);
        }
    }

    fn clear(&mut self) {
        self.var.clear();
        self.stack.clear();
        self.gosub.clear();
        self.loops.clear();
    }

    fn execute_op(&mut self, op: Opcode) -> Result<Option<Event>> {
        match op {
            Opcode::Literal(val) => self.stack.push(val)?,
            Opcode::Push(name) => self.stack.push(self.var.fetch(&name))?,
            Opcode::Pop(name) => {
                let val = self.stack.pop()?;
                self.var.store(&name, val)?;
            }
            Opcode::PushArr(name, n) => {
                let indices = self.stack.pop_n(n)?;
                let val = self.var.fetch_array(&name, indices)?;
                self.stack.push(val)?;
            }
            Opcode::PopArr(name, n) => {
                let val = self.stack.pop()?;
                let indices = self.stack.pop_n(n)?;
                self.var.store_array(&name, indices, val)?;
            }
            Opcode::DimArr(name, n) => {
                let bounds = self.stack.pop_n(n)?;
                self.var.dimension_array(&name, bounds)?;
            }
            Opcode::Drop => {
                self.stack.pop()?;
            }

            Opcode::For(name) => self.r#for(name)?,
            Opcode::Next(name) => self.r#next(name)?,
            Opcode::IfNot(addr) => {
                if !self.stack.pop()?.is_true()? {
                    self.pc = addr;
                }
            }
            Opcode::Jump(addr) => self.pc = addr,
            Opcode::Gosub(addr) => {
                self.gosub.push(self.pc)?;
                self.pc = addr;
            }
            Opcode::Return => match self.gosub.pop() {
                Ok(addr) => self.pc = addr,
                Err(_) => return Err(error!(ReturnWithoutGosub)),
            },

            Opcode::Clear => self.clear(),
            Opcode::Cont => match self.cont.take() {
                Some(addr) => self.pc = addr,
                None => return Err(error!(CantContinue)),
            },
            Opcode::End => {
                self.files.close_all()?;
                self.mark_cont();
                return Ok(self.stop());
            }
            Opcode::Ready => return Ok(self.stop()),
            Opcode::Run(addr) => {
                self.files.close_all()?;
                self.clear();
                self.cont = None;
                self.pc = addr.unwrap_or(0);
                debug!("run from {}", self.pc);
            }
            Opcode::Stop => {
                self.mark_cont();
                return Ok(self.stop());
            }
            Opcode::System => {
                self.mark_cont();
                self.running = false;
                return Ok(Some(Event::System));
            }
            Opcode::Yield => return Ok(self.stop()),

            Opcode::Channel => {
                let number = self.files.number(self.stack.pop()?)?;
                if !self.files.is_open(number) {
                    return Err(error!(BadFileNumber));
                }
                self.channel = Some(number);
            }
            Opcode::Console => self.channel = None,
            Opcode::Print => {
                let val = self.stack.pop()?;
                match self.channel {
                    Some(n) => self.files.get(n)?.write(&val.to_print())?,
                    None => self.console.write(&val.to_print()),
                }
            }
            Opcode::PrintComma => match self.channel {
                Some(n) => self.files.get(n)?.comma()?,
                None => self.console.comma(),
            },
            Opcode::PrintLine => match self.channel {
                Some(n) => self.files.get(n)?.newline()?,
                None => self.console.newline(),
            },
            Opcode::Input(is_string) => {
                let n = match self.channel {
                    Some(n) => n,
                    None => return Err(error!(BadFileNumber)),
                };
                let val = self.files.get(n)?.read_field(is_string)?;
                self.stack.push(val)?;
            }
            Opcode::Open(mode) => self.r#open(mode)?,
            Opcode::Close(0) => self.files.close_all()?,
            Opcode::Close(n) => {
                for val in self.stack.pop_n(n)? {
                    let number = self.files.number(val)?;
                    self.files.close(number)?;
                }
            }

            Opcode::Neg => self.unary(Operation::negate)?,
            Opcode::Exp => self.binary(Operation::power)?,
            Opcode::Mul => self.binary(Operation::multiply)?,
            Opcode::Div => self.binary(Operation::divide)?,
            Opcode::DivInt => self.binary(Operation::divide_int)?,
            Opcode::Mod => self.binary(Operation::modulus)?,
            Opcode::Add => self.binary(Operation::sum)?,
            Opcode::Sub => self.binary(Operation::subtract)?,
            Opcode::Eq => self.binary(Operation::equal)?,
            Opcode::NotEq => self.binary(Operation::not_equal)?,
            Opcode::Lt => self.binary(Operation::less)?,
            Opcode::LtEq => self.binary(Operation::less_equal)?,
            Opcode::Gt => self.binary(Operation::greater)?,
            Opcode::GtEq => self.binary(Operation::greater_equal)?,
            Opcode::Not => self.unary(Operation::not)?,
            Opcode::And => self.binary(Operation::and)?,
            Opcode::Or => self.binary(Operation::or)?,
            Opcode::Xor => self.binary(Operation::xor)?,
            Opcode::Imp => self.binary(Operation::imp)?,
            Opcode::Eqv => self.binary(Operation::eqv)?,

            Opcode::Abs => self.unary(Function::abs)?,
            Opcode::Asc => self.unary(Function::asc)?,
            Opcode::Chr => self.unary(Function::chr)?,
            Opcode::Cos => self.unary(Function::cos)?,
            Opcode::Csrlin => self.stack.push(Val::Integer(self.console.row() as i16))?,
            Opcode::Date => {
                let date = chrono::Local::now().format("%m-%d-%Y").to_string();
                self.stack.push(Val::from_bytes(date.as_bytes()))?;
            }
            Opcode::Eof => {
                let number = self.files.number(self.stack.pop()?)?;
                let eof = self.files.get(number)?.eof()?;
                self.stack.push(Val::from_bool(eof))?;
            }
            Opcode::Fre(n) => {
                self.stack.pop_n(n)?;
                self.stack.push(Val::Single(self.var.free() as f32))?;
            }
            Opcode::Int => self.unary(Function::int)?,
            Opcode::Left => self.binary(Function::left)?,
            Opcode::Len => self.unary(Function::len)?,
            Opcode::Mid(n) => {
                let len = if n == 3 { Some(self.stack.pop()?) } else { None };
                let (string, start) = self.stack.pop_2()?;
                self.stack.push(Function::mid(string, start, len)?)?;
            }
            Opcode::Pos(n) => {
                self.stack.pop_n(n)?;
                self.stack.push(Val::Integer(self.console.col() as i16))?;
            }
            Opcode::Right => self.binary(Function::right)?,
            Opcode::Rnd(n) => self.r#rnd(n)?,
            Opcode::Sin => self.unary(Function::sin)?,
            Opcode::Sqr => self.unary(Function::sqr)?,
            Opcode::Str => self.unary(Function::str)?,
            Opcode::Strings => self.binary(Function::string_of)?,
            Opcode::Time => {
                let time = chrono::Local::now().format("%H:%M:%S").to_string();
                self.stack.push(Val::from_bytes(time.as_bytes()))?;
            }
            Opcode::Value => self.unary(Function::val)?,

            Opcode::Extension(name, n) => {
                let args = self.stack.pop_n(n)?;
                let val = match self.extension.as_mut() {
                    Some(extension) => extension.call(&name, &mut self.var, args)?,
                    None => return Err(error!(UndefinedUserFunction)),
                };
                self.stack.push(val)?;
            }
        }
        Ok(None)
    }

    fn unary(&mut self, f: fn(Val) -> Result<Val>) -> Result<()> {
        let val = self.stack.pop()?;
        self.stack.push(f(val)?)
    }

    fn binary(&mut self, f: fn(Val, Val) -> Result<Val>) -> Result<()> {
        let (lhs, rhs) = self.stack.pop_2()?;
        self.stack.push(f(lhs, rhs)?)
    }

    fn r#for(&mut self, var: Rc<str>) -> Result<()> {
        let (to, step) = self.stack.pop_2()?;
        if let Some(pos) = self.loops.iter().position(|frame| frame.var == var) {
            self.loops.truncate(pos);
        }
        let start = self.var.fetch(&var);
        let past_limit = if Operation::less(step.clone(), Val::Integer(0))?.is_true()? {
            Operation::less(start, to.clone())?
        } else {
            Operation::greater(start, to.clone())?
        };
        if past_limit.is_true()? {
            self.pc = self.matching_next(&var)? + 1;
            return Ok(());
        }
        self.loops.push(ForFrame {
            var,
            to,
            step,
            body: self.pc,
        })
    }

    /// Address of the `NEXT` that closes the loop on `var` starting at
    /// the current pc. Nested loops are skipped over.
    fn matching_next(&self, var: &Rc<str>) -> Result<Address> {
        let end = if self.program.is_indirect(self.pc) {
            self.program.direct_address()
        } else {
            self.program.len()
        };
        let mut depth = 0usize;
        for addr in self.pc..end {
            match self.program.op(addr) {
                Some(Opcode::For(_)) => depth += 1,
                Some(Opcode::Next(next_var)) => {
                    if depth > 0 {
                        depth -= 1;
                    } else if next_var.as_ref().map_or(true, |v| v == var) {
                        return Ok(addr);
                    }
                }
                _ => {}
            }
        }
        Err(error!(ForWithoutNext))
    }

    fn r#next(&mut self, var: Option<Rc<str>>) -> Result<()> {
        let pos = match &var {
            None => self.loops.len().checked_sub(1),
            Some(var) => self.loops.iter().rposition(|frame| &frame.var == var),
        };
        let pos = match pos {
            Some(pos) => pos,
            None => return Err(error!(NextWithoutFor)),
        };
        self.loops.truncate(pos + 1);
        let frame = match self.loops.last() {
            Some(frame) => frame.clone(),
            None => return Err(error!(NextWithoutFor)),
        };
        let val = Operation::sum(self.var.fetch(&frame.var), frame.step.clone())?;
        self.var.store(&frame.var, val)?;
        let val = self.var.fetch(&frame.var);
        let counting_down = Operation::less(frame.step, Val::Integer(0))?.is_true()?;
        let done = if counting_down {
            Operation::less(val, frame.to)?
        } else {
            Operation::greater(val, frame.to)?
        };
        if done.is_true()? {
            self.loops.pop()?;
        } else {
            self.pc = frame.body;
        }
        Ok(())
    }

    fn r#open(&mut self, mode: FileMode) -> Result<()> {
        let (name, number) = self.stack.pop_2()?;
        let number = self.files.number(number)?;
        if self.files.is_open(number) {
            return Err(error!(FileAlreadyOpen));
        }
        let name = match name {
            Val::String(s) => s,
            _ => return Err(error!(TypeMismatch)),
        };
        let (target, origin) = self.devices.resolve(&name, mode)?;
        let file = TextFile::open(target, origin, mode)?;
        self.files.insert(number, file)
    }

    fn r#rnd(&mut self, n: usize) -> Result<()> {
        let x = if n == 1 {
            f64::try_from(self.stack.pop()?)?
        } else {
            1.0
        };
        let val = if x < 0.0 {
            self.random.reseed(x.to_bits());
            self.random.next()
        } else if x == 0.0 {
            self.random.last()
        } else {
            self.random.next()
        };
        self.stack.push(Val::Single(val))
    }

    /// Copy out the state of a stopped machine. Files bound to host
    /// handles can't be carried to another process.
    pub fn capture(&self) -> Result<State> {
        for origin in self.files.origins() {
            if let Origin::Bound(name) = origin {
                if self.devices.is_handle(name) {
                    return Err(error!(DiskIoError; "FILE BOUND TO A HOST HANDLE IS OPEN"));
                }
            }
        }
        let direct_address = if self.dirty {
            0
        } else {
            self.program.direct_address()
        };
        Ok(State {
            config: self.config.clone(),
            listing: self.listing.sources(),
            cont: self.cont.filter(|addr| *addr < direct_address),
            gosub: self
                .gosub
                .iter()
                .copied()
                .filter(|addr| *addr < direct_address)
                .collect(),
            loops: self
                .loops
                .iter()
                .filter(|frame| frame.body < direct_address)
                .cloned()
                .collect(),
            var: self.var.clone(),
            console: self.console.clone(),
            random: self.random.clone(),
            devices: self.devices.state(),
            files: self.files.states(),
        })
    }

    /// Build a machine from captured state, reopening its files.
    pub fn restore(state: State) -> Result<Runtime> {
        let mut runtime = Runtime::new(state.config);
        for line in &state.listing {
            runtime.listing.load_str(line)?;
        }
        runtime.program.compile_listing(&runtime.listing);
        let direct_address = runtime.program.direct_address();
        runtime.cont = state.cont.filter(|addr| *addr < direct_address);
        for addr in state.gosub {
            runtime.gosub.push(addr)?;
        }
        for frame in state.loops {
            runtime.loops.push(frame)?;
        }
        runtime.var = state.var;
        runtime.console = state.console;
        runtime.random = state.random;
        runtime.devices.restore(state.devices);
        for file_state in &state.files {
            let target = runtime.devices.reopen(&file_state.origin)?;
            let file = TextFile::reopen(target, file_state)?;
            runtime.files.insert(file_state.number, file)?;
        }
        debug!(
            "restored {} lines and {} open files",
            state.listing.len(),
            state.files.len()
        );
        Ok(runtime)
    }

    /// Close every file and release bound handles.
    pub fn close(&mut self) -> Result<()> {
        let result = self.files.close_all();
        self.devices.unbind_all();
        result
    }

    /// Let go of files without touching them, after a snapshot took them over.
    pub fn detach(&mut self) {
        self.files.detach();
        self.devices.unbind_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(r: &mut Runtime, s: &str) -> Event {
        r.enter(s);
        loop {
            match r.execute(1000) {
                Event::Running => continue,
                event => return event,
            }
        }
    }

    #[test]
    fn test_cont_after_stop() {
        let mut r = Runtime::default();
        r.enter("10 a=1:stop");
        r.enter("20 a=a+1:print a");
        assert!(matches!(run(&mut r, "run"), Event::Stopped));
        assert!(r.can_continue());
        assert!(matches!(run(&mut r, "cont"), Event::Stopped));
        assert_eq!(r.take_output(), " 2 \n");
        assert!(!r.can_continue());
    }

    #[test]
    fn test_evaluate_keeps_cont() {
        let mut r = Runtime::default();
        r.enter("10 a=5:system");
        r.enter("20 print a");
        assert!(matches!(run(&mut r, "run"), Event::System));
        assert_eq!(r.evaluate("a*2"), Ok(Val::Single(10.0)));
        assert!(r.can_continue());
    }

    #[test]
    fn test_error_line_number() {
        let mut r = Runtime::default();
        r.enter("10 a=1/0");
        match run(&mut r, "run") {
            Event::Errors(errors) => assert_eq!(errors[0].to_string(), "DIVISION BY ZERO IN 10"),
            _ => panic!(),
        }
    }

    #[test]
    fn test_indirect_errors_reported_on_run() {
        let mut r = Runtime::default();
        r.enter("10 goto 100");
        match run(&mut r, "run") {
            Event::Errors(errors) => assert_eq!(errors[0].line_number(), Some(10)),
            _ => panic!(),
        }
    }

    #[test]
    fn test_extension_missing() {
        let mut r = Runtime::default();
        match run(&mut r, "a=_foo(1)") {
            Event::Errors(errors) => assert_eq!(errors[0].to_string(), "UNDEFINED USER FUNCTION"),
            _ => panic!(),
        }
    }
}
