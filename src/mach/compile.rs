use super::function::{Function, LINE_RELATIVE_FLAG};
use super::program::{Program, UNPATCHED};
use super::symbol::SymbolTable;
use super::{Address, Opcode, Slot, Val};
use crate::lang::{lex, Column, Error, LineNumber, MAX_LINE_NUMBER};
use crate::lang::{Operator, Source, SourceToken, Token, Word};
use std::collections::HashMap;
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

/// Compile a stored program to a finalized `Program`.
pub fn compile(source: &Source) -> Result<Program> {
    let mut symbols = SymbolTable::new();
    compile_with(source, &mut symbols)
}

/// Compile against a caller-owned symbol table, so successive compilations
/// keep identical name-to-slot bindings (immediate mode relies on this).
pub fn compile_with(source: &Source, symbols: &mut SymbolTable) -> Result<Program> {
    let mut this = Compiler::new(symbols);
    for (number, text) in source.iter() {
        this.program.begin_line(*number);
        let tokens = lex(text).map_err(|e| e.in_line_number(Some(*number)))?;
        this.tokens = tokens;
        this.pos = 0;
        this.compile_line()
            .map_err(|e| e.in_line_number(Some(*number)))?;
    }
    this.end_program()
}

/// Compile one immediate (unnumbered) statement line.
pub fn compile_immediate(text: &str, symbols: &mut SymbolTable) -> Result<Program> {
    let mut this = Compiler::new(symbols);
    this.tokens = lex(text)?;
    this.pos = 0;
    this.compile_line()?;
    this.end_program()
}

#[derive(Clone)]
struct UserFn {
    params: Vec<String>,
    hidden: Vec<String>,
    body: Rc<[SourceToken]>,
}

struct OpenFor {
    slot: Slot,
    exit_jump: Address,
}

struct OpenWhile {
    start: Address,
    jump_zero: Address,
}

struct Compiler<'a> {
    program: Program,
    symbols: &'a mut SymbolTable,
    tokens: Vec<SourceToken>,
    pos: usize,
    fns: HashMap<String, UserFn>,
    for_stack: Vec<OpenFor>,
    while_stack: Vec<OpenWhile>,
    do_stack: Vec<Address>,
    expanding: Vec<String>,
    subst: Vec<HashMap<String, String>>,
}

impl<'a> Compiler<'a> {
    fn new(symbols: &'a mut SymbolTable) -> Compiler<'a> {
        Compiler {
            program: Program::new(),
            symbols,
            tokens: vec![],
            pos: 0,
            fns: HashMap::new(),
            for_stack: vec![],
            while_stack: vec![],
            do_stack: vec![],
            expanding: vec![],
            subst: vec![],
        }
    }

    /// Append the final `HALT`, settle dangling `FOR` exits on it, and run
    /// the address patch.
    fn end_program(mut self) -> Result<Program> {
        if let Some(open) = self.while_stack.pop() {
            return Err(error!(SyntaxError; "WHILE WITHOUT WEND")
                .in_line_number(self.program.line_at(open.jump_zero)));
        }
        if !self.do_stack.is_empty() {
            return Err(error!(SyntaxError; "DO WITHOUT LOOP"));
        }
        let halt = self.program.emit(Opcode::Halt);
        for open in std::mem::take(&mut self.for_stack) {
            self.program.patch(open.exit_jump, halt);
        }
        self.program.finalize(self.symbols.counts())?;
        Ok(self.program)
    }

    // *** Token cursor

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].token
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        &self.tokens[(self.pos + ahead).min(self.tokens.len() - 1)].token
    }

    fn column(&self) -> Column {
        self.tokens[self.pos.min(self.tokens.len() - 1)].column.clone()
    }

    fn advance(&mut self) -> SourceToken {
        let token = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn accept(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        if self.peek() == &token {
            self.advance();
            Ok(())
        } else {
            Err(error!(SyntaxError, ..&self.column(); &format!("EXPECTED {}", token)))
        }
    }

    fn expect_word(&mut self, word: Word) -> Result<()> {
        self.expect(Token::Word(word))
    }

    fn expect_ident(&mut self) -> Result<(Column, String)> {
        let column = self.column();
        match self.advance().token {
            Token::Ident(name) => Ok((column, name)),
            _ => Err(error!(SyntaxError, ..&column; "EXPECTED VARIABLE")),
        }
    }

    fn expect_line_number(&mut self) -> Result<LineNumber> {
        let column = self.column();
        match self.advance().token {
            Token::Number(n) if n.fract() == 0.0 && n >= 0.0 && n <= MAX_LINE_NUMBER as f64 => {
                Ok(n as LineNumber)
            }
            _ => Err(error!(SyntaxError, ..&column; "INVALID LINE NUMBER")),
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek(),
            Token::Colon | Token::Eol | Token::Eof | Token::Word(Word::Else)
        )
    }

    /// True when the parenthesis at the cursor encloses a top-level comma,
    /// which marks an argument or coordinate list rather than grouping.
    fn paren_holds_list(&self) -> bool {
        debug_assert_eq!(self.peek(), &Token::LParen);
        let mut depth = 0usize;
        let mut ahead = 0usize;
        loop {
            match self.peek_at(ahead) {
                Token::LParen => depth += 1,
                Token::RParen => {
                    if depth == 1 {
                        return false;
                    }
                    depth -= 1;
                }
                Token::Comma if depth == 1 => return true,
                Token::Eol | Token::Eof => return false,
                _ => {}
            }
            ahead += 1;
        }
    }

    // *** Statements

    fn compile_line(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Token::Eol | Token::Eof => break,
                Token::Colon => {
                    self.advance();
                }
                _ => self.statement()?,
            }
        }
        Ok(())
    }

    fn statement(&mut self) -> Result<()> {
        let column = self.column();
        match self.peek().clone() {
            Token::Word(word) => {
                self.advance();
                match word {
                    Word::Let => self.r#let(),
                    Word::Print => self.r#print(),
                    Word::Input => self.r#input(),
                    Word::If => self.r#if(),
                    Word::Goto => self.r#goto(),
                    Word::Gosub => self.r#gosub(),
                    Word::Return => self.r#return(),
                    Word::On => self.r#on(),
                    Word::For => self.r#for(),
                    Word::Next => self.r#next(),
                    Word::While => self.r#while(),
                    Word::Wend => self.r#wend(&column),
                    Word::Do => self.r#do(),
                    Word::Loop => self.r#loop(&column),
                    Word::Dim => self.r#dim(),
                    Word::Def => self.r#def(),
                    Word::End | Word::Stop => {
                        self.program.emit(Opcode::Halt);
                        Ok(())
                    }
                    // Shell commands compile to nothing inside a program.
                    Word::Run | Word::List | Word::New => {
                        while !self.at_statement_end() {
                            self.advance();
                        }
                        Ok(())
                    }
                    _ => Err(error!(SyntaxError, ..&column; "UNEXPECTED WORD")),
                }
            }
            Token::Ident(name) => {
                if let Some((function, arity)) = Function::lookup(&name) {
                    if function.is_statement() {
                        self.advance();
                        return self.builtin_statement(&column, function, arity);
                    }
                }
                self.assignment()
            }
            _ => Err(error!(SyntaxError, ..&column; "EXPECTED STATEMENT")),
        }
    }

    fn r#let(&mut self) -> Result<()> {
        self.assignment()
    }

    /// `v = e`, `v(i) = e`, `v(i,j) = e`; the LET is already consumed or
    /// was never written.
    fn assignment(&mut self) -> Result<()> {
        let (_, name) = self.expect_ident()?;
        if self.accept(&Token::LParen) {
            let slot = self.symbols.array_slot(&name);
            let dims = self.subscript_list()?;
            self.expect(Token::Operator(Operator::Equal))?;
            self.expression()?;
            self.program.emit(Opcode::StoreArr(slot, dims));
        } else {
            let slot = self.resolve_scalar(&name);
            self.expect(Token::Operator(Operator::Equal))?;
            self.expression()?;
            self.program.emit(Opcode::Store(slot));
        }
        Ok(())
    }

    /// One or two comma-separated subscripts, closing parenthesis consumed.
    fn subscript_list(&mut self) -> Result<u8> {
        self.expression()?;
        let dims = if self.accept(&Token::Comma) {
            self.expression()?;
            2
        } else {
            1
        };
        self.expect(Token::RParen)?;
        Ok(dims)
    }

    fn r#print(&mut self) -> Result<()> {
        let mut newline = true;
        while !self.at_statement_end() {
            match self.peek() {
                Token::Semicolon => {
                    self.advance();
                    newline = false;
                }
                Token::Comma => {
                    self.advance();
                    self.program.emit(Opcode::PrintZone);
                    newline = false;
                }
                _ => {
                    self.expression()?;
                    self.program.emit(Opcode::Print);
                    newline = true;
                }
            }
        }
        if newline {
            self.program.emit(Opcode::PrintNewline);
        }
        Ok(())
    }

    fn r#input(&mut self) -> Result<()> {
        if let Token::Str(_) = self.peek() {
            let prompt = self.advance().token;
            if let Token::Str(s) = prompt {
                self.program.emit(Opcode::Literal(Val::Str(s.into())));
                self.program.emit(Opcode::Print);
            }
            self.expect(Token::Semicolon)?;
        }
        let (_, name) = self.expect_ident()?;
        let slot = self.resolve_scalar(&name);
        self.program.emit(Opcode::Input(slot));
        Ok(())
    }

    fn r#if(&mut self) -> Result<()> {
        self.expression()?;
        self.expect_word(Word::Then)?;
        let jump_zero = self.program.emit(Opcode::JumpZero(UNPATCHED));
        self.branch_body()?;
        if self.accept(&Token::Word(Word::Else)) {
            let jump_over = self.program.emit(Opcode::Jump(UNPATCHED));
            self.program.patch(jump_zero, self.program.len());
            self.branch_body()?;
            self.program.patch(jump_over, self.program.len());
        } else {
            self.program.patch(jump_zero, self.program.len());
        }
        Ok(())
    }

    /// A THEN or ELSE branch: either a bare line number or a statement
    /// list running to ELSE or end of line.
    fn branch_body(&mut self) -> Result<()> {
        if let Token::Number(_) = self.peek() {
            let line = self.expect_line_number()?;
            self.program.emit(Opcode::Jump(line as Address));
            return Ok(());
        }
        loop {
            match self.peek() {
                Token::Eol | Token::Eof | Token::Word(Word::Else) => break,
                Token::Colon => {
                    self.advance();
                }
                _ => self.statement()?,
            }
        }
        Ok(())
    }

    fn r#goto(&mut self) -> Result<()> {
        let line = self.expect_line_number()?;
        self.program.emit(Opcode::Jump(line as Address));
        Ok(())
    }

    fn r#gosub(&mut self) -> Result<()> {
        let line = self.expect_line_number()?;
        self.program.emit(Opcode::Gosub(line as Address));
        Ok(())
    }

    fn r#return(&mut self) -> Result<()> {
        self.program.emit(Opcode::Return);
        Ok(())
    }

    fn r#on(&mut self) -> Result<()> {
        self.expression()?;
        let gosub = match self.advance().token {
            Token::Word(Word::Goto) => false,
            Token::Word(Word::Gosub) => true,
            _ => return Err(error!(SyntaxError; "EXPECTED GOTO OR GOSUB")),
        };
        let mut lines = vec![self.expect_line_number()?];
        while self.accept(&Token::Comma) {
            lines.push(self.expect_line_number()?);
        }
        let table = self.program.add_jump_table(lines);
        self.program.emit(if gosub {
            Opcode::OnGosub(table)
        } else {
            Opcode::OnGoto(table)
        });
        Ok(())
    }

    fn r#for(&mut self) -> Result<()> {
        let (var_column, name) = self.expect_ident()?;
        if name.ends_with('$') {
            return Err(error!(TypeMismatch, ..&var_column; "LOOP VARIABLE MUST BE NUMERIC"));
        }
        let slot = self.resolve_scalar(&name);
        self.expect(Token::Operator(Operator::Equal))?;
        self.expression()?;
        self.program.emit(Opcode::Store(slot));
        self.expect_word(Word::To)?;
        self.expression()?;
        if self.accept(&Token::Word(Word::Step)) {
            self.expression()?;
        } else {
            self.program.emit(Opcode::Literal(Val::Number(1.0)));
        }
        self.program.emit(Opcode::ForInit(slot));
        let check = self.program.emit(Opcode::ForCheck(slot, UNPATCHED));
        let exit_jump = self.program.emit(Opcode::Jump(UNPATCHED));
        self.program.patch(check, self.program.len());
        self.for_stack.push(OpenFor { slot, exit_jump });
        Ok(())
    }

    fn r#next(&mut self) -> Result<()> {
        let target = if let Token::Ident(_) = self.peek() {
            let (_, name) = self.expect_ident()?;
            Some(self.resolve_scalar(&name))
        } else {
            None
        };
        self.program.emit(Opcode::ForNext(target));
        let exit = self.program.len();
        match target {
            None => {
                if let Some(open) = self.for_stack.pop() {
                    self.program.patch(open.exit_jump, exit);
                }
            }
            Some(slot) => {
                // Abandoned inner loops exit here too, mirroring the
                // runtime frame unwinding.
                while let Some(open) = self.for_stack.pop() {
                    self.program.patch(open.exit_jump, exit);
                    if open.slot == slot {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn r#while(&mut self) -> Result<()> {
        let start = self.program.len();
        self.expression()?;
        let jump_zero = self.program.emit(Opcode::JumpZero(UNPATCHED));
        self.while_stack.push(OpenWhile { start, jump_zero });
        Ok(())
    }

    fn r#wend(&mut self, column: &Column) -> Result<()> {
        let open = match self.while_stack.pop() {
            Some(open) => open,
            None => return Err(error!(SyntaxError, ..column; "WEND WITHOUT WHILE")),
        };
        self.program.emit(Opcode::Jump(open.start));
        self.program.patch(open.jump_zero, self.program.len());
        Ok(())
    }

    fn r#do(&mut self) -> Result<()> {
        self.do_stack.push(self.program.len());
        Ok(())
    }

    fn r#loop(&mut self, column: &Column) -> Result<()> {
        let start = match self.do_stack.pop() {
            Some(start) => start,
            None => return Err(error!(SyntaxError, ..column; "LOOP WITHOUT DO")),
        };
        if self.accept(&Token::Word(Word::Until)) {
            self.expression()?;
            let jump_zero = self.program.emit(Opcode::JumpZero(UNPATCHED));
            self.program.emit(Opcode::Jump(start));
            self.program.patch(jump_zero, self.program.len());
        } else {
            self.program.emit(Opcode::Jump(start));
        }
        Ok(())
    }

    fn r#dim(&mut self) -> Result<()> {
        loop {
            let (_, name) = self.expect_ident()?;
            let slot = self.symbols.array_slot(&name);
            self.expect(Token::LParen)?;
            let dims = self.subscript_list()?;
            self.program.emit(Opcode::DimArr(slot, dims));
            if !self.accept(&Token::Comma) {
                return Ok(());
            }
        }
    }

    fn r#def(&mut self) -> Result<()> {
        let (column, mut name) = self.expect_ident()?;
        if name == "FN" {
            let (_, real) = self.expect_ident()?;
            name = real;
        }
        if Function::lookup(&name).is_some() {
            return Err(error!(SyntaxError, ..&column; "RESERVED FOR BUILT-IN"));
        }
        self.expect(Token::LParen)?;
        let mut params = vec![];
        if self.peek() != &Token::RParen {
            loop {
                let (_, param) = self.expect_ident()?;
                params.push(param);
                if !self.accept(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;
        self.expect(Token::Operator(Operator::Equal))?;
        let hidden = params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let suffix = if p.ends_with('$') { "$" } else { "" };
                format!("FN{}{}{}", name.trim_end_matches('$'), i, suffix)
            })
            .collect();
        let mut body = vec![];
        while !self.at_statement_end() {
            body.push(self.advance());
        }
        let end = self.column();
        body.push(SourceToken {
            column: end.clone(),
            token: Token::Eol,
        });
        body.push(SourceToken {
            column: end,
            token: Token::Eof,
        });
        self.fns.insert(
            name,
            UserFn {
                params,
                hidden,
                body: body.into(),
            },
        );
        Ok(())
    }

    /// A built-in in statement position: a comma-separated argument list,
    /// optionally parenthesized. `LINE` has its own sub-forms.
    fn builtin_statement(
        &mut self,
        column: &Column,
        function: Function,
        arity: std::ops::RangeInclusive<usize>,
    ) -> Result<()> {
        if function == Function::Line {
            return self.line_statement(column);
        }
        let mut argc = 0;
        if !self.at_statement_end() {
            if self.peek() == &Token::LParen && self.paren_holds_list() {
                self.advance();
                argc += self.argument_list(&Token::RParen)?;
                self.expect(Token::RParen)?;
                if self.accept(&Token::Comma) {
                    argc += self.argument_list(&Token::Eol)?;
                }
            } else {
                argc += self.argument_list(&Token::Eol)?;
            }
        }
        if !arity.contains(&argc) {
            return Err(error!(IllegalFunctionCall, ..column; "WRONG NUMBER OF ARGUMENTS"));
        }
        self.program.emit(Opcode::CallFn(function, argc));
        Ok(())
    }

    /// Comma-separated expressions until the statement ends (or `until`
    /// is seen). Returns how many were compiled.
    fn argument_list(&mut self, until: &Token) -> Result<usize> {
        let mut argc = 0;
        loop {
            if self.at_statement_end() || self.peek() == until {
                return Ok(argc);
            }
            self.expression()?;
            argc += 1;
            if !self.accept(&Token::Comma) {
                return Ok(argc);
            }
        }
    }

    /// The three LINE forms: `(x1,y1)-(x2,y2)`, the `-(x2,y2)` pen-relative
    /// shorthand, and the flat `x1,y1,x2,y2`; each takes an optional
    /// trailing color.
    fn line_statement(&mut self, column: &Column) -> Result<()> {
        let mut argc;
        let mut flag = 0;
        if self.accept(&Token::Operator(Operator::Minus)) {
            self.coordinate_pair()?;
            argc = 2;
            flag = LINE_RELATIVE_FLAG;
        } else if self.peek() == &Token::LParen && self.paren_holds_list() {
            self.coordinate_pair()?;
            self.expect(Token::Operator(Operator::Minus))?;
            self.coordinate_pair()?;
            argc = 4;
        } else {
            self.expression()?;
            self.expect(Token::Comma)?;
            self.expression()?;
            self.expect(Token::Comma)?;
            self.expression()?;
            self.expect(Token::Comma)?;
            self.expression()?;
            argc = 4;
        }
        if argc == 4 && self.accept(&Token::Comma) {
            self.expression()?;
            argc = 5;
        } else if flag != 0 && self.accept(&Token::Comma) {
            self.expression()?;
            argc = 3;
        }
        if !self.at_statement_end() {
            return Err(error!(SyntaxError, ..column; "MALFORMED LINE STATEMENT"));
        }
        self.program.emit(Opcode::CallFn(Function::Line, argc | flag));
        Ok(())
    }

    fn coordinate_pair(&mut self) -> Result<()> {
        self.expect(Token::LParen)?;
        self.expression()?;
        self.expect(Token::Comma)?;
        self.expression()?;
        self.expect(Token::RParen)
    }

    // *** Expressions
    //
    // Pratt-style precedence climb, lowest first:
    // OR < AND < comparison < + - < * / MOD < ^ < unary < primary.
    // Comparisons do not chain.

    fn expression(&mut self) -> Result<()> {
        self.or_expression()
    }

    fn or_expression(&mut self) -> Result<()> {
        self.and_expression()?;
        while self.accept(&Token::Operator(Operator::Or)) {
            self.and_expression()?;
            self.program.emit(Opcode::Or);
        }
        Ok(())
    }

    fn and_expression(&mut self) -> Result<()> {
        self.comparison()?;
        while self.accept(&Token::Operator(Operator::And)) {
            self.comparison()?;
            self.program.emit(Opcode::And);
        }
        Ok(())
    }

    fn comparison(&mut self) -> Result<()> {
        self.additive()?;
        let op = match self.peek() {
            Token::Operator(Operator::Equal) => Opcode::Eq,
            Token::Operator(Operator::NotEqual) => Opcode::NotEq,
            Token::Operator(Operator::Less) => Opcode::Lt,
            Token::Operator(Operator::LessEqual) => Opcode::LtEq,
            Token::Operator(Operator::Greater) => Opcode::Gt,
            Token::Operator(Operator::GreaterEqual) => Opcode::GtEq,
            _ => return Ok(()),
        };
        self.advance();
        self.additive()?;
        self.program.emit(op);
        Ok(())
    }

    fn additive(&mut self) -> Result<()> {
        self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Operator(Operator::Plus) => Opcode::Add,
                Token::Operator(Operator::Minus) => Opcode::Sub,
                _ => return Ok(()),
            };
            self.advance();
            self.multiplicative()?;
            self.program.emit(op);
        }
    }

    fn multiplicative(&mut self) -> Result<()> {
        self.power()?;
        loop {
            let op = match self.peek() {
                Token::Operator(Operator::Multiply) => Opcode::Mul,
                Token::Operator(Operator::Divide) => Opcode::Div,
                Token::Operator(Operator::Modulo) => Opcode::Mod,
                _ => return Ok(()),
            };
            self.advance();
            self.power()?;
            self.program.emit(op);
        }
    }

    fn power(&mut self) -> Result<()> {
        self.unary()?;
        while self.accept(&Token::Operator(Operator::Caret)) {
            self.unary()?;
            self.program.emit(Opcode::Pow);
        }
        Ok(())
    }

    fn unary(&mut self) -> Result<()> {
        match self.peek() {
            Token::Operator(Operator::Minus) => {
                self.advance();
                self.unary()?;
                self.program.emit(Opcode::Neg);
                Ok(())
            }
            Token::Operator(Operator::Plus) => {
                self.advance();
                self.unary()
            }
            Token::Operator(Operator::Not) => {
                self.advance();
                self.unary()?;
                self.program.emit(Opcode::Not);
                Ok(())
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<()> {
        let column = self.column();
        match self.advance().token {
            Token::Number(n) => {
                self.program.emit(Opcode::Literal(Val::Number(n)));
                Ok(())
            }
            Token::Str(s) => {
                self.program.emit(Opcode::Literal(Val::Str(s.into())));
                Ok(())
            }
            Token::LParen => {
                self.expression()?;
                self.expect(Token::RParen)
            }
            Token::Ident(mut name) => {
                // A lone FN prefix attaches to the identifier after it.
                if name == "FN" {
                    if let Token::Ident(real) = self.peek().clone() {
                        self.advance();
                        name = real;
                    }
                }
                self.ident_primary(&column, name)
            }
            // MOD lexes as an operator but doubles as the two-argument
            // remainder function when it opens an expression.
            Token::Operator(Operator::Modulo) if self.peek() == &Token::LParen => {
                self.advance();
                self.expression()?;
                self.expect(Token::Comma)?;
                self.expression()?;
                self.expect(Token::RParen)?;
                self.program.emit(Opcode::CallFn(Function::Mod, 2));
                Ok(())
            }
            _ => Err(error!(SyntaxError, ..&column; "EXPECTED EXPRESSION")),
        }
    }

    fn ident_primary(&mut self, column: &Column, name: String) -> Result<()> {
        if self.fns.contains_key(&name) && self.peek() == &Token::LParen {
            return self.expand_user_fn(column, &name);
        }
        if let Some((function, arity)) = Function::lookup(&name) {
            if self.peek() == &Token::LParen {
                if !function.returns_value() {
                    return Err(error!(SyntaxError, ..column; "NOT A FUNCTION"));
                }
                self.advance();
                let argc = self.argument_list(&Token::RParen)?;
                self.expect(Token::RParen)?;
                if !arity.contains(&argc) {
                    return Err(
                        error!(IllegalFunctionCall, ..column; "WRONG NUMBER OF ARGUMENTS"),
                    );
                }
                self.program.emit(Opcode::CallFn(function, argc));
                return Ok(());
            }
            if function.is_bare() {
                self.program.emit(Opcode::CallFn(function, 0));
                return Ok(());
            }
            return Err(error!(SyntaxError, ..column; "RESERVED FOR BUILT-IN"));
        }
        if self.accept(&Token::LParen) {
            let slot = self.symbols.array_slot(&name);
            let dims = self.subscript_list()?;
            self.program.emit(Opcode::LoadArr(slot, dims));
            return Ok(());
        }
        let slot = self.resolve_scalar(&name);
        self.program.emit(Opcode::Load(slot));
        Ok(())
    }

    /// Expand a `DEF FN` call in place: arguments land in the hidden
    /// parameter slots and the stored body compiles against them.
    fn expand_user_fn(&mut self, column: &Column, name: &str) -> Result<()> {
        if self.expanding.iter().any(|n| n.as_str() == name) {
            return Err(error!(SyntaxError, ..column; "RECURSIVE FUNCTION"));
        }
        let function = self.fns[name].clone();
        self.expect(Token::LParen)?;
        let argc = self.argument_list(&Token::RParen)?;
        self.expect(Token::RParen)?;
        if argc != function.params.len() {
            return Err(error!(ArgumentCountMismatch, ..column));
        }
        for hidden in function.hidden.iter().rev() {
            let slot = self.symbols.scalar_slot(hidden);
            self.program.emit(Opcode::Store(slot));
        }
        let map = function
            .params
            .iter()
            .cloned()
            .zip(function.hidden.iter().cloned())
            .collect();
        self.subst.push(map);
        self.expanding.push(name.to_string());
        let saved_tokens = std::mem::replace(&mut self.tokens, function.body.to_vec());
        let saved_pos = std::mem::replace(&mut self.pos, 0);
        let result = self.expression().and_then(|_| self.expect(Token::Eol));
        self.tokens = saved_tokens;
        self.pos = saved_pos;
        self.expanding.pop();
        self.subst.pop();
        result.map_err(|e| e.in_column(column))
    }

    /// Scalar slot for a name, honoring the innermost `DEF FN` parameter
    /// substitution frame.
    fn resolve_scalar(&mut self, name: &str) -> Slot {
        match self.subst.last().and_then(|m| m.get(name)) {
            Some(hidden) => {
                let hidden = hidden.clone();
                self.symbols.scalar_slot(&hidden)
            }
            None => self.symbols.scalar_slot(name),
        }
    }
}
