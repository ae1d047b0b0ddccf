use super::function::Function;
use super::{Address, Slot, Val};

/// ## Virtual machine instruction set
///
/// The machine has no registers; every operation works on the value stack.
/// `LET A=3*B` compiles to `[LITERAL(3), LOAD(B), MUL, STORE(A)]`.
///
/// Jump operands are line numbers until the finalization pass rewrites them
/// to opcode addresses; structured statements patch addresses directly
/// during emission.

#[derive(Debug, Clone, PartialEq)]
pub enum Opcode {
    // *** Stack and memory
    /// Push a literal value.
    Literal(Val),
    /// Push the current value of a scalar slot. Infallible: unassigned
    /// slots read as 0 or the empty string.
    Load(Slot),
    /// Pop into a scalar slot. Numbers coerce to their canonical string on
    /// a string slot; a string popped into a numeric slot is a type error.
    Store(Slot),
    /// Pop one size per dimension and allocate; bounds are inclusive.
    DimArr(Slot, u8),
    /// Pop indices and push the element.
    LoadArr(Slot, u8),
    /// Pop indices, then the value, and store the element.
    StoreArr(Slot, u8),

    // *** Expression operations
    Neg,
    Pow,
    Mul,
    Div,
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

    // *** Branch control
    Jump(Address),
    /// Pop; branch when the value is numeric zero.
    JumpZero(Address),
    /// Push the return address and branch.
    Gosub(Address),
    /// Pop the return stack or error: RETURN WITHOUT GOSUB.
    Return,
    /// Pop a 1-based selector into the indexed jump table; out of range
    /// falls through.
    OnGoto(usize),
    OnGosub(usize),

    // *** FOR loop frames
    /// Pop step then limit; push a loop frame for the slot.
    ForInit(Slot),
    /// Test the top frame; continue into the body or pop the frame and
    /// branch past the loop. The operand is the body address.
    ForCheck(Slot, Address),
    /// The NEXT statement; `None` targets the innermost frame.
    ForNext(Option<Slot>),

    // *** Statements
    /// Dispatch a built-in; the count field carries the popped argument
    /// count (plus the relative-form flag bit for LINE).
    CallFn(Function, usize),
    /// Read one console line into a scalar slot.
    Input(Slot),
    /// Pop and write one value, advancing the print column.
    Print,
    /// Pad to the next 14-column print zone.
    PrintZone,
    /// Write a newline and reset the print column.
    PrintNewline,
    Halt,
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use Opcode::*;
        match self {
            Literal(v) => write!(f, "{}", format!("{:?}", v).to_ascii_uppercase()),
            Load(s) => write!(f, "LOAD({})", s),
            Store(s) => write!(f, "STORE({})", s),
            DimArr(s, d) => write!(f, "DIMARR({},{})", s, d),
            LoadArr(s, d) => write!(f, "LOADARR({},{})", s, d),
            StoreArr(s, d) => write!(f, "STOREARR({},{})", s, d),
            Neg => write!(f, "NEG"),
            Pow => write!(f, "POW"),
            Mul => write!(f, "MUL"),
            Div => write!(f, "DIV"),
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
            Jump(a) => write!(f, "JUMP({})", a),
            JumpZero(a) => write!(f, "JUMPZERO({})", a),
            Gosub(a) => write!(f, "GOSUB({})", a),
            Return => write!(f, "RETURN"),
            OnGoto(t) => write!(f, "ONGOTO({})", t),
            OnGosub(t) => write!(f, "ONGOSUB({})", t),
            ForInit(s) => write!(f, "FORINIT({})", s),
            ForCheck(s, a) => write!(f, "FORCHECK({},{})", s, a),
            ForNext(Some(s)) => write!(f, "FORNEXT({})", s),
            ForNext(None) => write!(f, "FORNEXT"),
            CallFn(func, n) => write!(f, "CALLFN({:?},{})", func, n),
            Input(s) => write!(f, "INPUT({})", s),
            Print => write!(f, "PRINT"),
            PrintZone => write!(f, "PRINTZONE"),
            PrintNewline => write!(f, "PRINTNEWLINE"),
            Halt => write!(f, "HALT"),
        }
    }
}
