use super::function::{Function, LINE_RELATIVE_FLAG};
use super::program::{Program, UNPATCHED};
use super::symbol::{is_string_slot, slot_to_index, Counts};
use super::{Address, Opcode, Slot, Stack, Val};
use crate::host::{Console, Graphics, PALETTE};
use crate::lang::Error;
use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::rc::Rc;
use std::time::Instant;

type Result<T> = std::result::Result<T, Error>;

/// Number of columns in one `PRINT` zone.
const PRINT_ZONE: usize = 14;

/// A rectangular 2D array, row-major.
#[derive(Debug, Clone)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    fn new(rows: usize, cols: usize) -> Grid<T> {
        Grid {
            rows,
            cols,
            cells: vec![T::default(); rows * cols],
        }
    }

    fn at(&self, row: usize, col: usize) -> Result<&T> {
        if row < self.rows && col < self.cols {
            Ok(&self.cells[row * self.cols + col])
        } else {
            Err(error!(SubscriptOutOfRange))
        }
    }

    fn at_mut(&mut self, row: usize, col: usize) -> Result<&mut T> {
        if row < self.rows && col < self.cols {
            Ok(&mut self.cells[row * self.cols + col])
        } else {
            Err(error!(SubscriptOutOfRange))
        }
    }
}

/// The VM's variable stores. Exportable between runs so immediate-mode
/// statements observe prior values; every list grows on demand when a new
/// compilation introduces more slots.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    numbers: Vec<f64>,
    strings: Vec<Rc<str>>,
    number_1d: Vec<Option<Vec<f64>>>,
    number_2d: Vec<Option<Grid<f64>>>,
    string_1d: Vec<Option<Vec<Rc<str>>>>,
    string_2d: Vec<Option<Grid<Rc<str>>>>,
}

fn grow<T: Clone + Default>(list: &mut Vec<T>, index: usize) {
    if index >= list.len() {
        list.resize(index + 1, T::default());
    }
}

impl Memory {
    fn reserve(&mut self, counts: Counts) {
        if counts.numeric_scalars > 0 {
            grow(&mut self.numbers, counts.numeric_scalars - 1);
        }
        if counts.string_scalars > 0 {
            grow(&mut self.strings, counts.string_scalars - 1);
        }
        if counts.numeric_arrays > 0 {
            grow(&mut self.number_1d, counts.numeric_arrays - 1);
            grow(&mut self.number_2d, counts.numeric_arrays - 1);
        }
        if counts.string_arrays > 0 {
            grow(&mut self.string_1d, counts.string_arrays - 1);
            grow(&mut self.string_2d, counts.string_arrays - 1);
        }
    }

    fn number(&mut self, index: usize) -> f64 {
        grow(&mut self.numbers, index);
        self.numbers[index]
    }

    fn set_number(&mut self, index: usize, value: f64) {
        grow(&mut self.numbers, index);
        self.numbers[index] = value;
    }

    fn string(&mut self, index: usize) -> Rc<str> {
        grow(&mut self.strings, index);
        self.strings[index].clone()
    }

    fn set_string(&mut self, index: usize, value: Rc<str>) {
        grow(&mut self.strings, index);
        self.strings[index] = value;
    }
}

/// A `FOR` loop frame. `check_pc` addresses the loop's `FORCHECK`;
/// `body_pc` is learned from its operand on first execution.
#[derive(Debug, Clone)]
struct Frame {
    slot: Slot,
    limit: f64,
    step: f64,
    check_pc: Address,
    body_pc: Address,
}

impl Frame {
    fn continues(&self, var: f64) -> bool {
        if self.step >= 0.0 {
            var <= self.limit
        } else {
            var >= self.limit
        }
    }
}

/// ## The virtual machine
///
/// A fetch-decode-dispatch loop over the compiled opcode array. The machine
/// owns its stores and delegates console and graphics side effects to the
/// host traits.
pub struct Vm<'a> {
    memory: Memory,
    stack: Stack<Val>,
    ret: Stack<Address>,
    frames: Stack<Frame>,
    print_col: usize,
    rng: ChaCha20Rng,
    epoch: Instant,
    console: &'a mut dyn Console,
    graphics: &'a mut dyn Graphics,
}

impl<'a> Vm<'a> {
    pub fn new(console: &'a mut dyn Console, graphics: &'a mut dyn Graphics) -> Vm<'a> {
        Vm::with_memory(Memory::default(), console, graphics)
    }

    pub fn with_memory(
        memory: Memory,
        console: &'a mut dyn Console,
        graphics: &'a mut dyn Graphics,
    ) -> Vm<'a> {
        Vm {
            memory,
            stack: Stack::new("STACK OVERFLOW"),
            ret: Stack::new("GOSUB OVERFLOW"),
            frames: Stack::new("FOR OVERFLOW"),
            print_col: 0,
            rng: ChaCha20Rng::from_entropy(),
            epoch: Instant::now(),
            console,
            graphics,
        }
    }

    /// Surrender the stores for the next run.
    pub fn into_memory(self) -> Memory {
        self.memory
    }

    pub fn run(&mut self, program: &Program) -> Result<()> {
        self.memory.reserve(program.counts());
        debug!("running {} opcodes", program.len());
        let mut pc: Address = 0;
        loop {
            if pc >= program.len() {
                return Err(error!(InternalError; "INVALID PC ADDRESS"));
            }
            let at = pc;
            pc += 1;
            match self.step(program, at, &mut pc) {
                Ok(false) => {}
                Ok(true) => return Ok(()),
                Err(e) => return Err(e.in_line_number(program.line_at(at))),
            }
        }
    }

    /// Execute the opcode at `at`; `pc` already addresses the next one.
    /// Returns true on `HALT`.
    fn step(&mut self, program: &Program, at: Address, pc: &mut Address) -> Result<bool> {
        match &program.code()[at] {
            Opcode::Literal(val) => self.stack.push(val.clone())?,
            Opcode::Load(slot) => {
                let val = self.load_scalar(*slot);
                self.stack.push(val)?;
            }
            Opcode::Store(slot) => {
                let val = self.stack.pop()?;
                self.store_scalar(*slot, val)?;
            }
            Opcode::DimArr(slot, dims) => self.dim_array(*slot, *dims)?,
            Opcode::LoadArr(slot, dims) => self.load_array(*slot, *dims)?,
            Opcode::StoreArr(slot, dims) => self.store_array(*slot, *dims)?,

            Opcode::Neg => {
                let n = self.stack.pop()?.as_number()?;
                self.stack.push(Val::Number(-n))?;
            }
            Opcode::Add => self.r#add()?,
            Opcode::Sub => self.arith(|l, r| Ok(l - r))?,
            Opcode::Mul => self.arith(|l, r| Ok(l * r))?,
            Opcode::Div => self.arith(|l, r| {
                if r == 0.0 {
                    Err(error!(DivisionByZero))
                } else {
                    Ok(l / r)
                }
            })?,
            Opcode::Mod => self.arith(|l, r| {
                if r == 0.0 {
                    Err(error!(DivisionByZero))
                } else {
                    Ok(l % r)
                }
            })?,
            Opcode::Pow => self.arith(|l, r| {
                let n = l.powf(r);
                if n.is_finite() {
                    Ok(n)
                } else {
                    Err(error!(DomainError))
                }
            })?,

            Opcode::Eq => self.compare(|o| o == std::cmp::Ordering::Equal)?,
            Opcode::NotEq => self.compare(|o| o != std::cmp::Ordering::Equal)?,
            Opcode::Lt => self.compare(|o| o == std::cmp::Ordering::Less)?,
            Opcode::LtEq => self.compare(|o| o != std::cmp::Ordering::Greater)?,
            Opcode::Gt => self.compare(|o| o == std::cmp::Ordering::Greater)?,
            Opcode::GtEq => self.compare(|o| o != std::cmp::Ordering::Less)?,

            Opcode::Not => {
                let b = self.stack.pop()?.as_bool()?;
                self.stack.push(Val::truth(!b))?;
            }
            Opcode::And => {
                let (rhs, lhs) = self.stack.pop_2()?;
                let b = lhs.as_bool()? & rhs.as_bool()?;
                self.stack.push(Val::truth(b))?;
            }
            Opcode::Or => {
                let (rhs, lhs) = self.stack.pop_2()?;
                let b = lhs.as_bool()? | rhs.as_bool()?;
                self.stack.push(Val::truth(b))?;
            }

            Opcode::Jump(a) => *pc = *a,
            Opcode::JumpZero(a) => {
                if !self.stack.pop()?.as_bool()? {
                    *pc = *a;
                }
            }
            Opcode::Gosub(a) => {
                self.ret.push(*pc)?;
                *pc = *a;
            }
            Opcode::Return => match self.ret.pop() {
                Ok(a) => *pc = a,
                Err(_) => return Err(error!(ReturnWithoutGosub)),
            },
            Opcode::OnGoto(table) | Opcode::OnGosub(table) => {
                let selector = self.stack.pop()?.as_number()? as i64;
                let targets = program
                    .jump_table(*table)
                    .ok_or_else(|| error!(InternalError; "MISSING JUMP TABLE"))?;
                if selector >= 1 && (selector as usize) <= targets.len() {
                    if matches!(program.code()[at], Opcode::OnGosub(_)) {
                        self.ret.push(*pc)?;
                    }
                    *pc = targets[selector as usize - 1];
                }
            }

            Opcode::ForInit(slot) => {
                let step = self.stack.pop()?.as_number()?;
                let limit = self.stack.pop()?.as_number()?;
                self.frames.push(Frame {
                    slot: *slot,
                    limit,
                    step,
                    check_pc: *pc,
                    body_pc: UNPATCHED,
                })?;
            }
            Opcode::ForCheck(slot, body) => {
                let var = self.memory.number(slot_to_index(*slot));
                let frame = match self.frames.last_mut() {
                    Some(frame) => frame,
                    None => return Err(error!(NextWithoutFor)),
                };
                if frame.body_pc == UNPATCHED {
                    frame.body_pc = *body;
                }
                if frame.continues(var) {
                    *pc = frame.body_pc;
                } else {
                    self.frames.pop()?;
                }
            }
            Opcode::ForNext(target) => {
                if let Some(slot) = target {
                    while matches!(self.frames.last(), Some(frame) if frame.slot != *slot) {
                        self.frames.pop()?;
                    }
                }
                let frame = match self.frames.last() {
                    Some(frame) => frame.clone(),
                    None => return Err(error!(NextWithoutFor)),
                };
                let index = slot_to_index(frame.slot);
                let var = self.memory.number(index) + frame.step;
                self.memory.set_number(index, var);
                if frame.continues(var) {
                    *pc = frame.check_pc;
                } else {
                    self.frames.pop()?;
                }
            }

            Opcode::CallFn(function, count) => self.call_function(*function, *count)?,
            Opcode::Input(slot) => {
                let line = self.console.read_line().unwrap_or_default();
                if is_string_slot(*slot) {
                    self.memory.set_string(slot_to_index(*slot), line.into());
                } else {
                    let n = line.trim().parse::<f64>().unwrap_or(0.0);
                    let n = if n.is_finite() { n } else { 0.0 };
                    self.memory.set_number(slot_to_index(*slot), n);
                }
            }

            Opcode::Print => {
                let s = self.stack.pop()?.canonical();
                self.write(&s);
            }
            Opcode::PrintZone => {
                let pad = PRINT_ZONE - self.print_col % PRINT_ZONE;
                self.write(&" ".repeat(pad));
            }
            Opcode::PrintNewline => self.write("\n"),
            Opcode::Halt => return Ok(true),
        }
        Ok(false)
    }

    fn write(&mut self, s: &str) {
        self.console.print(s);
        match s.rfind('\n') {
            Some(pos) => self.print_col = s[pos + 1..].chars().count(),
            None => self.print_col += s.chars().count(),
        }
    }

    fn load_scalar(&mut self, slot: Slot) -> Val {
        let index = slot_to_index(slot);
        if is_string_slot(slot) {
            Val::Str(self.memory.string(index))
        } else {
            Val::Number(self.memory.number(index))
        }
    }

    fn store_scalar(&mut self, slot: Slot, val: Val) -> Result<()> {
        let index = slot_to_index(slot);
        if is_string_slot(slot) {
            self.memory.set_string(index, val.canonical());
        } else {
            self.memory.set_number(index, val.as_number()?);
        }
        Ok(())
    }

    fn arith(&mut self, op: impl Fn(f64, f64) -> Result<f64>) -> Result<()> {
        let (rhs, lhs) = self.stack.pop_2()?;
        let n = op(lhs.as_number()?, rhs.as_number()?)?;
        self.stack.push(Val::Number(n))
    }

    fn r#add(&mut self) -> Result<()> {
        let (rhs, lhs) = self.stack.pop_2()?;
        let val = match (&lhs, &rhs) {
            (Val::Number(l), Val::Number(r)) => Val::Number(l + r),
            _ => Val::Str(format!("{}{}", lhs.canonical(), rhs.canonical()).into()),
        };
        self.stack.push(val)
    }

    /// Numeric comparison when both sides are numbers, canonical string
    /// comparison otherwise. Pushes -1 for true, 0 for false.
    fn compare(&mut self, test: impl Fn(std::cmp::Ordering) -> bool) -> Result<()> {
        let (rhs, lhs) = self.stack.pop_2()?;
        let ordering = match (&lhs, &rhs) {
            (Val::Number(l), Val::Number(r)) => {
                l.partial_cmp(r).unwrap_or(std::cmp::Ordering::Equal)
            }
            _ => lhs.canonical().cmp(&rhs.canonical()),
        };
        self.stack.push(Val::truth(test(ordering)))
    }

    // *** Arrays

    /// Pop one inclusive bound per dimension, rejecting negatives.
    fn pop_bounds(&mut self, dims: u8) -> Result<Vec<usize>> {
        let vals = self.stack.pop_n(dims as usize)?;
        let mut bounds = vec![];
        for val in vals {
            let n = val.as_number()?;
            if n < 0.0 {
                return Err(error!(BadDim));
            }
            bounds.push(n as usize);
        }
        Ok(bounds)
    }

    fn pop_indices(&mut self, dims: u8) -> Result<Vec<usize>> {
        let vals = self.stack.pop_n(dims as usize)?;
        let mut indices = vec![];
        for val in vals {
            let n = val.as_number()?;
            if n < 0.0 {
                return Err(error!(SubscriptOutOfRange));
            }
            indices.push(n as usize);
        }
        Ok(indices)
    }

    fn dim_array(&mut self, slot: Slot, dims: u8) -> Result<()> {
        let bounds = self.pop_bounds(dims)?;
        let index = slot_to_index(slot);
        match (dims, is_string_slot(slot)) {
            (1, false) => {
                grow(&mut self.memory.number_1d, index);
                self.memory.number_1d[index] = Some(vec![0.0; bounds[0] + 1]);
            }
            (1, true) => {
                grow(&mut self.memory.string_1d, index);
                self.memory.string_1d[index] = Some(vec![Rc::default(); bounds[0] + 1]);
            }
            (2, false) => {
                grow(&mut self.memory.number_2d, index);
                self.memory.number_2d[index] = Some(Grid::new(bounds[0] + 1, bounds[1] + 1));
            }
            (2, true) => {
                grow(&mut self.memory.string_2d, index);
                self.memory.string_2d[index] = Some(Grid::new(bounds[0] + 1, bounds[1] + 1));
            }
            _ => return Err(error!(BadSubscript)),
        }
        Ok(())
    }

    fn load_array(&mut self, slot: Slot, dims: u8) -> Result<()> {
        let indices = self.pop_indices(dims)?;
        let index = slot_to_index(slot);
        let val = match (dims, is_string_slot(slot)) {
            (1, false) => {
                let arr = flat(self.memory.number_1d.get(index))?;
                Val::Number(*element(arr, indices[0])?)
            }
            (1, true) => {
                let arr = flat(self.memory.string_1d.get(index))?;
                Val::Str(element(arr, indices[0])?.clone())
            }
            (2, false) => {
                let grid = flat(self.memory.number_2d.get(index))?;
                Val::Number(*grid.at(indices[0], indices[1])?)
            }
            (2, true) => {
                let grid = flat(self.memory.string_2d.get(index))?;
                Val::Str(grid.at(indices[0], indices[1])?.clone())
            }
            _ => return Err(error!(BadSubscript)),
        };
        self.stack.push(val)
    }

    fn store_array(&mut self, slot: Slot, dims: u8) -> Result<()> {
        let val = self.stack.pop()?;
        let indices = self.pop_indices(dims)?;
        let index = slot_to_index(slot);
        match (dims, is_string_slot(slot)) {
            (1, false) => {
                let n = val.as_number()?;
                let arr = flat_mut(self.memory.number_1d.get_mut(index))?;
                *element_mut(arr, indices[0])? = n;
            }
            (1, true) => {
                let arr = flat_mut(self.memory.string_1d.get_mut(index))?;
                *element_mut(arr, indices[0])? = val.canonical();
            }
            (2, false) => {
                let n = val.as_number()?;
                let grid = flat_mut(self.memory.number_2d.get_mut(index))?;
                *grid.at_mut(indices[0], indices[1])? = n;
            }
            (2, true) => {
                let grid = flat_mut(self.memory.string_2d.get_mut(index))?;
                *grid.at_mut(indices[0], indices[1])? = val.canonical();
            }
            _ => return Err(error!(BadSubscript)),
        }
        Ok(())
    }

    // *** Built-in dispatch

    fn call_function(&mut self, function: Function, count: usize) -> Result<()> {
        let relative = count & LINE_RELATIVE_FLAG != 0;
        let argc = count & !LINE_RELATIVE_FLAG;
        let args = self.stack.pop_n(argc)?;
        use Function as F;
        let result = match function {
            F::Abs => Val::Number(num(&args, 0)?.abs()),
            F::Int => Val::Number(num(&args, 0)?.floor()),
            F::Sgn => {
                let n = num(&args, 0)?;
                Val::Number(if n == 0.0 { 0.0 } else { n.signum() })
            }
            F::Sqr => {
                let n = num(&args, 0)?;
                if n < 0.0 {
                    return Err(error!(DomainError));
                }
                Val::Number(n.sqrt())
            }
            F::Sin => Val::Number(num(&args, 0)?.sin()),
            F::Cos => Val::Number(num(&args, 0)?.cos()),
            F::Tan => Val::Number(num(&args, 0)?.tan()),
            F::Atn => Val::Number(num(&args, 0)?.atan()),
            F::Log => {
                let n = num(&args, 0)?;
                if n <= 0.0 {
                    return Err(error!(DomainError));
                }
                Val::Number(n.ln())
            }
            F::Exp => {
                let n = num(&args, 0)?.exp();
                if !n.is_finite() {
                    return Err(error!(DomainError));
                }
                Val::Number(n)
            }
            F::Pi => Val::Number(std::f64::consts::PI),
            F::Rad => Val::Number(num(&args, 0)?.to_radians()),
            F::Deg => Val::Number(num(&args, 0)?.to_degrees()),
            F::Min => Val::Number(num(&args, 0)?.min(num(&args, 1)?)),
            F::Max => Val::Number(num(&args, 0)?.max(num(&args, 1)?)),
            F::Clamp => {
                let (x, lo, hi) = (num(&args, 0)?, num(&args, 1)?, num(&args, 2)?);
                Val::Number(x.max(lo).min(hi))
            }
            F::Mod => {
                let (l, r) = (num(&args, 0)?, num(&args, 1)?);
                if r == 0.0 {
                    return Err(error!(DivisionByZero));
                }
                Val::Number(l % r)
            }

            F::Rnd => Val::Number(self.rng.gen::<f64>()),
            F::Rndi => {
                let n = num(&args, 0)?.floor();
                if n < 0.0 {
                    return Err(error!(IllegalFunctionCall));
                }
                Val::Number(self.rng.gen_range(0..=n as i64) as f64)
            }
            F::Randomize => {
                match args.first() {
                    Some(seed) => {
                        self.rng = ChaCha20Rng::seed_from_u64(seed.as_number()? as i64 as u64);
                    }
                    None => self.rng = ChaCha20Rng::from_entropy(),
                }
                return Ok(());
            }
            F::Timer => Val::Number(self.epoch.elapsed().as_secs_f64()),

            F::Str => {
                num(&args, 0)?;
                Val::Str(args[0].canonical())
            }
            F::Val => {
                let n = string(&args, 0)?.trim().parse::<f64>().unwrap_or(0.0);
                Val::Number(if n.is_finite() { n } else { 0.0 })
            }
            F::Len => Val::Number(string(&args, 0)?.chars().count() as f64),
            F::Chr => {
                let n = args[0].as_index()?;
                match u32::try_from(n).ok().and_then(char::from_u32) {
                    Some(c) => Val::Str(c.to_string().into()),
                    None => return Err(error!(IllegalFunctionCall)),
                }
            }
            F::Asc => match string(&args, 0)?.chars().next() {
                Some(c) => Val::Number(u32::from(c) as f64),
                None => return Err(error!(IllegalFunctionCall)),
            },
            F::Left => {
                let s = string(&args, 0)?;
                let k = args[1].as_index()?;
                Val::Str(s.chars().take(k).collect::<String>().into())
            }
            F::Right => {
                let s = string(&args, 0)?;
                let k = args[1].as_index()?;
                let skip = s.chars().count().saturating_sub(k);
                Val::Str(s.chars().skip(skip).collect::<String>().into())
            }
            F::Mid => {
                let s = string(&args, 0)?;
                let pos = args[1].as_index()?;
                if pos == 0 {
                    return Err(error!(IllegalFunctionCall));
                }
                let rest = s.chars().skip(pos - 1);
                let taken: String = match args.get(2) {
                    Some(len) => rest.take(len.as_index()?).collect(),
                    None => rest.collect(),
                };
                Val::Str(taken.into())
            }
            F::Spc => Val::Str(" ".repeat(args[0].as_index()?).into()),
            F::Tab => {
                let column = args[0].as_index()?;
                let pad = column.saturating_sub(1).saturating_sub(self.print_col);
                Val::Str(" ".repeat(pad).into())
            }
            F::Instr => {
                let offset = if args.len() == 3 {
                    args[0].as_index()?.max(1) - 1
                } else {
                    0
                };
                let hay = string(&args, args.len() - 2)?;
                let needle = string(&args, args.len() - 1)?;
                Val::Number(instr(&hay, &needle, offset) as f64)
            }
            F::StringOf => {
                let n = args[0].as_index()?;
                let c = match &args[1] {
                    Val::Str(s) => match s.chars().next() {
                        Some(c) => c,
                        None => return Err(error!(IllegalFunctionCall)),
                    },
                    Val::Number(v) => {
                        match u32::try_from(*v as i64).ok().and_then(char::from_u32) {
                            Some(c) => c,
                            None => return Err(error!(IllegalFunctionCall)),
                        }
                    }
                };
                Val::Str(c.to_string().repeat(n).into())
            }

            F::Input => return Err(error!(InternalError; "INPUT IS A DEDICATED OPCODE")),
            F::Locate => {
                let (col, row) = (num(&args, 0)?, num(&args, 1)?);
                self.console.locate(col as u32, row as u32);
                return Ok(());
            }

            F::Screen => {
                let (w, h) = (num(&args, 0)?, num(&args, 1)?);
                self.graphics.ensure_screen(w as u32, h as u32);
                return Ok(());
            }
            F::Cls => {
                self.graphics.cls();
                return Ok(());
            }
            F::Color => {
                match args.len() {
                    1 => {
                        let index = palette_index(num(&args, 0)?);
                        self.graphics.color_palette(index);
                    }
                    3 => {
                        let (r, g, b) = (num(&args, 0)?, num(&args, 1)?, num(&args, 2)?);
                        self.graphics
                            .color_rgb(channel(r), channel(g), channel(b));
                    }
                    _ => return Err(error!(IllegalFunctionCall)),
                }
                return Ok(());
            }
            F::ColorHsv => {
                let (h, s, v) = (num(&args, 0)?, num(&args, 1)?, num(&args, 2)?);
                self.graphics.color_hsv(h, s, v);
                return Ok(());
            }
            F::Pset => {
                if args.len() == 3 {
                    self.apply_color(&args[2])?;
                }
                self.graphics.pset(num(&args, 0)?, num(&args, 1)?);
                return Ok(());
            }
            F::Line => {
                if relative {
                    if args.len() == 3 {
                        self.apply_color(&args[2])?;
                    }
                    self.graphics.line_to(num(&args, 0)?, num(&args, 1)?);
                } else {
                    if args.len() == 5 {
                        self.apply_color(&args[4])?;
                    }
                    self.graphics.line(
                        num(&args, 0)?,
                        num(&args, 1)?,
                        num(&args, 2)?,
                        num(&args, 3)?,
                    );
                }
                return Ok(());
            }
            F::Circle => {
                if args.len() == 4 {
                    self.apply_color(&args[3])?;
                }
                self.graphics
                    .circle(num(&args, 0)?, num(&args, 1)?, num(&args, 2)?);
                return Ok(());
            }
            F::Box => {
                if args.len() == 6 {
                    self.apply_color(&args[5])?;
                }
                let fill = match args.get(4) {
                    Some(flag) => flag.as_number()? != 0.0,
                    None => false,
                };
                self.graphics.rect(
                    num(&args, 0)?,
                    num(&args, 1)?,
                    num(&args, 2)?,
                    num(&args, 3)?,
                    fill,
                );
                return Ok(());
            }
            F::Paint => {
                if args.len() == 3 {
                    self.apply_color(&args[2])?;
                }
                self.graphics.paint(num(&args, 0)?, num(&args, 1)?);
                return Ok(());
            }
            F::Flush => {
                self.graphics.flush();
                return Ok(());
            }
            F::SaveImage => {
                let path = string(&args, 0)?;
                self.graphics.save(&path);
                return Ok(());
            }
            F::Sleep => {
                let ms = num(&args, 0)?.max(0.0);
                self.graphics.sleep_ms(ms as u64);
                return Ok(());
            }
            F::Point => {
                let hit = self.graphics.point_non_black(num(&args, 0)?, num(&args, 1)?);
                Val::truth(hit)
            }
            F::GLocate => {
                self.graphics.text_locate(num(&args, 0)?, num(&args, 1)?);
                return Ok(());
            }
            F::GPrint => {
                let s = args[0].canonical();
                self.graphics.text_print(&s);
                return Ok(());
            }
        };
        self.stack.push(result)
    }

    fn apply_color(&mut self, color: &Val) -> Result<()> {
        let index = palette_index(color.as_number()?);
        self.graphics.color_palette(index);
        Ok(())
    }
}

fn num(args: &[Val], index: usize) -> Result<f64> {
    args.get(index)
        .ok_or_else(|| error!(IllegalFunctionCall))?
        .as_number()
}

fn string(args: &[Val], index: usize) -> Result<Rc<str>> {
    args.get(index)
        .ok_or_else(|| error!(IllegalFunctionCall))?
        .as_str()
}

/// Clamp an integer color argument into the palette.
fn palette_index(n: f64) -> usize {
    (n as i64).clamp(0, PALETTE.len() as i64 - 1) as usize
}

fn channel(n: f64) -> u8 {
    (n as i64).clamp(0, 255) as u8
}

/// 1-based character position of `needle` in `hay` from a 0-based char
/// offset, 0 when absent.
fn instr(hay: &str, needle: &str, offset: usize) -> usize {
    let start = match hay.char_indices().nth(offset) {
        Some((byte, _)) => byte,
        None => return 0,
    };
    match hay[start..].find(needle) {
        Some(found) => hay[..start + found].chars().count() + 1,
        None => 0,
    }
}

fn flat<T>(entry: Option<&Option<T>>) -> Result<&T> {
    match entry {
        Some(Some(array)) => Ok(array),
        _ => Err(error!(UndefdArray)),
    }
}

fn flat_mut<T>(entry: Option<&mut Option<T>>) -> Result<&mut T> {
    match entry {
        Some(Some(array)) => Ok(array),
        _ => Err(error!(UndefdArray)),
    }
}

fn element<T>(array: &[T], index: usize) -> Result<&T> {
    array.get(index).ok_or_else(|| error!(SubscriptOutOfRange))
}

fn element_mut<T>(array: &mut [T], index: usize) -> Result<&mut T> {
    array
        .get_mut(index)
        .ok_or_else(|| error!(SubscriptOutOfRange))
}
