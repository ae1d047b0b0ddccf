/*!
## Terminal module

The interactive shell: reads lines, routes between stored-program and
immediate modes, and owns the `RUN`/`LIST`/`NEW`/`SAVE`/`LOAD`/`EXIT`
commands. Holds the symbol table and exported memory across runs so
immediate statements observe prior variable values.

*/

use crate::host::{Console, NullGraphics, StdConsole};
use crate::lang::{Error, Source};
use crate::mach::{compile_immediate, compile_with, Memory, SymbolTable, Vm};
use ansi_term::Style;
use linefeed::{DefaultTerminal, Interface, ReadResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub fn main() {
    if std::env::args().count() > 2 {
        println!("Usage: retrobasic [FILENAME]");
        return;
    }
    let filename = std::env::args().nth(1);
    let interrupted = Arc::new(AtomicBool::new(false));
    let int_moved = interrupted.clone();
    if let Err(error) = ctrlc::set_handler(move || {
        int_moved.store(true, Ordering::SeqCst);
    }) {
        eprintln!("{}", error);
        return;
    }
    if let Err(error) = shell(interrupted, filename) {
        eprintln!("{}", error);
    }
}

struct Shell {
    source: Source,
    symbols: SymbolTable,
    memory: Memory,
}

impl Shell {
    fn new() -> Shell {
        Shell {
            source: Source::new(),
            symbols: SymbolTable::new(),
            memory: Memory::default(),
        }
    }

    /// Compile the stored program and run it on a clean VM. The stores are
    /// kept afterwards so immediate statements can inspect them.
    fn run(&mut self, console: &mut dyn Console) -> Result<(), Error> {
        let program = compile_with(&self.source, &mut self.symbols)?;
        let mut graphics = NullGraphics::default();
        let mut vm = Vm::new(console, &mut graphics);
        let result = vm.run(&program);
        self.memory = vm.into_memory();
        result
    }

    /// Run one unnumbered statement against the carried stores.
    fn immediate(&mut self, text: &str, console: &mut dyn Console) -> Result<(), Error> {
        let program = compile_immediate(text, &mut self.symbols)?;
        let mut graphics = NullGraphics::default();
        let mut vm = Vm::with_memory(std::mem::take(&mut self.memory), console, &mut graphics);
        let result = vm.run(&program);
        self.memory = vm.into_memory();
        result
    }

    fn new_program(&mut self) {
        self.source.clear();
        self.symbols.clear();
        self.memory = Memory::default();
    }
}

struct TermConsole {
    interface: Arc<Interface<DefaultTerminal>>,
}

impl Console for TermConsole {
    fn print(&mut self, text: &str) {
        let _ = self.interface.write_fmt(format_args!("{}", text));
    }

    fn read_line(&mut self) -> Option<String> {
        let _ = self.interface.set_prompt("");
        match self.interface.read_line() {
            Ok(ReadResult::Input(line)) => Some(line),
            _ => None,
        }
    }

    fn locate(&mut self, column: u32, row: u32) {
        let _ = self
            .interface
            .write_fmt(format_args!("\x1B[{};{}H", row, column));
    }
}

fn report(interface: &Interface<DefaultTerminal>, error: &Error) {
    let _ = interface.write_fmt(format_args!(
        "{}\n",
        Style::new().bold().paint(format!("?{}", error))
    ));
}

fn shell(interrupted: Arc<AtomicBool>, filename: Option<String>) -> std::io::Result<()> {
    let interface = Arc::new(Interface::new("retrobasic")?);
    let mut shell = Shell::new();

    if let Some(filename) = filename {
        // Batch mode: plain stdio, no line editor in the way.
        let mut batch = StdConsole;
        match Source::load(&filename) {
            Ok(source) => {
                shell.source = source;
                if let Err(error) = shell.run(&mut batch) {
                    report(&interface, &error);
                }
            }
            Err(error) => report(&interface, &error),
        }
        return Ok(());
    }

    let mut console = TermConsole {
        interface: interface.clone(),
    };
    interface.write_fmt(format_args!("RETRO BASIC\nREADY.\n"))?;
    loop {
        if interrupted.swap(false, Ordering::SeqCst) {
            interface.write_fmt(format_args!("BREAK\n"))?;
        }
        interface.set_prompt("")?;
        let line = match interface.read_line()? {
            ReadResult::Input(line) => line,
            ReadResult::Signal(_) => continue,
            ReadResult::Eof => break,
        };
        if line.trim().is_empty() {
            continue;
        }
        interface.add_history_unique(line.clone());
        if shell.source.enter(&line) {
            continue;
        }
        let command = line.trim().to_ascii_uppercase();
        let keyword: String = command
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        match command.as_str() {
            "EXIT" => break,
            "RUN" => {
                shell.memory = Memory::default();
                if let Err(error) = shell.run(&mut console) {
                    report(&interface, &error);
                }
                interface.write_fmt(format_args!("READY.\n"))?;
            }
            "LIST" => {
                interface.write_fmt(format_args!("{}", shell.source))?;
            }
            "NEW" => shell.new_program(),
            _ if keyword == "SAVE" || keyword == "LOAD" => {
                match quoted_path(&line) {
                    Some(path) if keyword == "SAVE" => {
                        if let Err(error) = shell.source.save(&path) {
                            report(&interface, &error);
                        }
                    }
                    Some(path) => match Source::load(&path) {
                        Ok(source) => shell.source = source,
                        Err(error) => report(&interface, &error),
                    },
                    None => report(&interface, &error!(SyntaxError; "EXPECTED \"FILENAME\"")),
                }
            }
            _ => {
                if let Err(error) = shell.immediate(&line, &mut console) {
                    report(&interface, &error);
                }
            }
        }
    }
    Ok(())
}

/// The `"path"` operand of SAVE and LOAD.
fn quoted_path(line: &str) -> Option<String> {
    let open = line.find('"')?;
    let close = line.rfind('"')?;
    if close > open {
        Some(line[open + 1..close].to_string())
    } else {
        None
    }
}
