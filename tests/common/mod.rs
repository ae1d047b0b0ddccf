use retrobasic::host::{RecordingGraphics, ScriptedConsole};
use retrobasic::lang::{Error, Source};
use retrobasic::mach::{compile, Vm};

/// Compile and run a stored program, returning everything a test might
/// assert on: captured output, the run result, and the graphics calls.
pub fn exec(lines: &[&str], input: &[&str]) -> (String, Result<(), Error>, Vec<String>) {
    let mut source = Source::new();
    for line in lines {
        assert!(source.enter(line), "line without a number: {}", line);
    }
    let mut console = ScriptedConsole::new();
    for line in input {
        console.feed(line);
    }
    let mut graphics = RecordingGraphics::new();
    let program = match compile(&source) {
        Ok(program) => program,
        Err(error) => return (String::new(), Err(error), vec![]),
    };
    let result = {
        let mut vm = Vm::new(&mut console, &mut graphics);
        vm.run(&program)
    };
    let calls = graphics.calls.borrow().clone();
    (console.output().to_string(), result, calls)
}

/// Run and return stdout; panics on any error.
#[allow(dead_code)]
pub fn run(lines: &[&str]) -> String {
    let (output, result, _) = exec(lines, &[]);
    result.unwrap_or_else(|e| panic!("unexpected error: {} (output {:?})", e, output));
    output
}

/// Run with scripted console input; panics on any error.
#[allow(dead_code)]
pub fn run_with_input(lines: &[&str], input: &[&str]) -> String {
    let (output, result, _) = exec(lines, input);
    result.unwrap_or_else(|e| panic!("unexpected error: {} (output {:?})", e, output));
    output
}

/// Run and return the compile or runtime error; panics if it succeeds.
#[allow(dead_code)]
pub fn run_error(lines: &[&str]) -> Error {
    let (output, result, _) = exec(lines, &[]);
    match result {
        Err(error) => error,
        Ok(()) => panic!("expected an error, got output {:?}", output),
    }
}

/// Run and return the recorded graphics host calls.
#[allow(dead_code)]
pub fn run_graphics(lines: &[&str]) -> Vec<String> {
    let (output, result, calls) = exec(lines, &[]);
    result.unwrap_or_else(|e| panic!("unexpected error: {} (output {:?})", e, output));
    calls
}
