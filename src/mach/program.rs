use super::symbol::Counts;
use super::{Address, Opcode};
use crate::lang::{Error, LineNumber, MAX_LINE_NUMBER};
use log::debug;
use std::collections::BTreeMap;

type Result<T> = std::result::Result<T, Error>;

/// Placeholder address for a forward patch that has not been resolved yet.
/// Finalization rejects any that survive.
pub const UNPATCHED: Address = Address::MAX;

/// ## Compiled program
///
/// A flat opcode array plus the maps the VM and the error reporter need:
/// per-opcode source lines, per-line entry addresses, the resolved `ON`
/// jump tables, and the symbol counts that size the VM's stores.
#[derive(Debug, Default)]
pub struct Program {
    code: Vec<Opcode>,
    pc_to_line: Vec<Option<LineNumber>>,
    line_to_pc: BTreeMap<LineNumber, Address>,
    jump_tables: Vec<Vec<Address>>,
    counts: Counts,
    current_line: Option<LineNumber>,
}

impl Program {
    pub fn new() -> Program {
        Program::default()
    }

    pub fn code(&self) -> &[Opcode] {
        &self.code
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn counts(&self) -> Counts {
        self.counts
    }

    pub fn jump_table(&self, index: usize) -> Option<&[Address]> {
        self.jump_tables.get(index).map(|t| t.as_slice())
    }

    /// Source line of the opcode at `pc`, for error reports. Immediate
    /// statements have none.
    pub fn line_at(&self, pc: Address) -> Option<LineNumber> {
        self.pc_to_line.get(pc).copied().flatten()
    }

    pub fn pc_for_line(&self, line: LineNumber) -> Option<Address> {
        self.line_to_pc.get(&line).copied()
    }

    /// Mark the start of a source line; subsequent opcodes report as it.
    pub fn begin_line(&mut self, number: LineNumber) {
        self.current_line = Some(number);
        self.line_to_pc.entry(number).or_insert(self.code.len());
    }

    pub fn emit(&mut self, op: Opcode) -> Address {
        self.code.push(op);
        self.pc_to_line.push(self.current_line);
        self.code.len() - 1
    }

    /// Rewrite the branch operand of an already-emitted opcode.
    pub fn patch(&mut self, at: Address, target: Address) {
        match &mut self.code[at] {
            Opcode::Jump(a)
            | Opcode::JumpZero(a)
            | Opcode::Gosub(a)
            | Opcode::ForCheck(_, a) => *a = target,
            op => debug_assert!(false, "patch of non-branch {}", op),
        }
    }

    /// Register an `ON ... GOTO/GOSUB` target list (line numbers until
    /// finalization). Returns the table index for the opcode operand.
    pub fn add_jump_table(&mut self, lines: Vec<LineNumber>) -> usize {
        self.jump_tables
            .push(lines.into_iter().map(|ln| ln as Address).collect());
        self.jump_tables.len() - 1
    }

    /// The two-phase patch. Branch operands emitted as line numbers become
    /// opcode addresses; operands patched during emission are already
    /// addresses and must be in range. The rule distinguishing them: an
    /// operand that is a key of `line_to_pc` is a line number.
    pub fn finalize(&mut self, counts: Counts) -> Result<()> {
        self.counts = counts;
        for index in 0..self.code.len() {
            let operand = match self.code[index] {
                Opcode::Jump(a)
                | Opcode::JumpZero(a)
                | Opcode::ForCheck(_, a)
                | Opcode::Gosub(a) => a,
                _ => continue,
            };
            let target = self
                .resolve(operand)
                .map_err(|e| e.in_line_number(self.line_at(index)))?;
            self.patch(index, target);
        }
        for table in 0..self.jump_tables.len() {
            for entry in 0..self.jump_tables[table].len() {
                let line = self.jump_tables[table][entry];
                if line > MAX_LINE_NUMBER as Address {
                    return Err(error!(UndefdStatement; "NO SUCH LINE"));
                }
                match self.line_to_pc.get(&(line as LineNumber)) {
                    Some(pc) => self.jump_tables[table][entry] = *pc,
                    None => return Err(error!(UndefdStatement; "NO SUCH LINE")),
                }
            }
        }
        debug!(
            "finalized program: {} opcodes, {} lines, {} jump tables",
            self.code.len(),
            self.line_to_pc.len(),
            self.jump_tables.len()
        );
        Ok(())
    }

    fn resolve(&self, operand: Address) -> Result<Address> {
        if operand <= MAX_LINE_NUMBER as Address {
            if let Some(pc) = self.line_to_pc.get(&(operand as LineNumber)) {
                return Ok(*pc);
            }
        }
        if operand < self.code.len() {
            Ok(operand)
        } else if operand == UNPATCHED {
            Err(error!(BadJumpTarget; "UNRESOLVED BRANCH"))
        } else {
            Err(error!(UndefdStatement; "NO SUCH LINE"))
        }
    }
}
