//! Parser for `OpenQASM` 2.0.
//!
//! The parser lowers directly to an [`alsvid_ir::Circuit`] without an
//! intermediate syntax tree. Registers are flattened into a single qubit
//! (and classical bit) index space in declaration order.

use alsvid_ir::{Circuit, ClbitId, Instruction, QubitId, StandardGate};
use rustc_hash::FxHashMap;

use crate::error::{ParseError, ParseResult};
use crate::lexer::{SpannedToken, Token, tokenize};

/// Parse a QASM 2.0 source string into a Circuit.
pub fn parse(source: &str) -> ParseResult<Circuit> {
    let mut parser = Parser::new(source)?;
    parser.parse_program()
}

/// A declared register, flattened into the global index space.
#[derive(Debug, Clone, Copy)]
struct Register {
    offset: u32,
    size: u32,
}

/// One operand of a gate or measure statement.
#[derive(Debug, Clone)]
enum Operand {
    /// A single indexed element, already resolved to a global index.
    Single(u32),
    /// A whole register.
    Whole { name: String, reg: Register },
}

/// Parser state.
struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    qregs: FxHashMap<String, Register>,
    cregs: FxHashMap<String, Register>,
    num_qubits: u32,
    num_clbits: u32,
    ops: Vec<Instruction>,
}

#[allow(clippy::cast_possible_truncation)]
impl Parser {
    /// Create a new parser from source.
    fn new(source: &str) -> ParseResult<Self> {
        let token_results = tokenize(source);
        let mut tokens = Vec::new();

        for result in token_results {
            match result {
                Ok(t) => tokens.push(t),
                Err((span, msg)) => {
                    return Err(ParseError::LexerError {
                        position: span.start,
                        message: msg,
                    });
                }
            }
        }

        Ok(Self {
            tokens,
            pos: 0,
            qregs: FxHashMap::default(),
            cregs: FxHashMap::default(),
            num_qubits: 0,
            num_clbits: 0,
            ops: Vec::new(),
        })
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<Token> {
        if self.is_eof() {
            return None;
        }
        let token = self.tokens[self.pos].token.clone();
        self.pos += 1;
        Some(token)
    }

    /// Expect a specific token.
    #[allow(clippy::needless_pass_by_value)]
    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        let found = self
            .advance()
            .ok_or_else(|| ParseError::UnexpectedEof(format!("expected {expected}")))?;

        if std::mem::discriminant(&found) != std::mem::discriminant(&expected) {
            return Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Parse the entire program.
    fn parse_program(&mut self) -> ParseResult<Circuit> {
        self.expect(Token::OpenQasm)?;
        match self.advance() {
            Some(Token::FloatLiteral(v)) if (v - 2.0).abs() < f64::EPSILON => {}
            Some(other) => return Err(ParseError::UnsupportedVersion(other.to_string())),
            None => return Err(ParseError::UnexpectedEof("version number".into())),
        }
        self.expect(Token::Semicolon)?;

        while !self.is_eof() {
            self.parse_statement()?;
        }

        let mut circuit = Circuit::with_size("qasm", self.num_qubits, self.num_clbits);
        for op in self.ops.drain(..) {
            circuit.append(op)?;
        }
        Ok(circuit)
    }

    /// Parse a single statement.
    fn parse_statement(&mut self) -> ParseResult<()> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| ParseError::UnexpectedEof("statement".into()))?;

        match token {
            Token::Include => self.parse_include(),
            Token::Qreg => self.parse_qreg_decl(),
            Token::Creg => self.parse_creg_decl(),
            Token::Measure => self.parse_measure(),
            Token::Barrier => self.parse_barrier(),
            Token::Identifier(name) => {
                self.advance();
                self.parse_gate_call(&name)
            }
            _ => Err(ParseError::UnexpectedToken {
                expected: "statement".into(),
                found: token.to_string(),
            }),
        }
    }

    /// Parse and discard an include statement.
    fn parse_include(&mut self) -> ParseResult<()> {
        self.expect(Token::Include)?;
        match self.advance() {
            Some(Token::StringLiteral(_)) => {}
            Some(other) => {
                return Err(ParseError::UnexpectedToken {
                    expected: "string literal".into(),
                    found: other.to_string(),
                });
            }
            None => return Err(ParseError::UnexpectedEof("include path".into())),
        }
        self.expect(Token::Semicolon)
    }

    fn parse_qreg_decl(&mut self) -> ParseResult<()> {
        self.expect(Token::Qreg)?;
        let name = self.parse_identifier()?;
        self.expect(Token::LBracket)?;
        let size = self.parse_int_literal()? as u32;
        self.expect(Token::RBracket)?;
        self.expect(Token::Semicolon)?;

        if self.qregs.contains_key(&name) {
            return Err(ParseError::DuplicateRegister(name));
        }
        let reg = Register {
            offset: self.num_qubits,
            size,
        };
        self.num_qubits += size;
        self.qregs.insert(name, reg);
        Ok(())
    }

    fn parse_creg_decl(&mut self) -> ParseResult<()> {
        self.expect(Token::Creg)?;
        let name = self.parse_identifier()?;
        self.expect(Token::LBracket)?;
        let size = self.parse_int_literal()? as u32;
        self.expect(Token::RBracket)?;
        self.expect(Token::Semicolon)?;

        if self.cregs.contains_key(&name) {
            return Err(ParseError::DuplicateRegister(name));
        }
        let reg = Register {
            offset: self.num_clbits,
            size,
        };
        self.num_clbits += size;
        self.cregs.insert(name, reg);
        Ok(())
    }

    /// Parse a measure statement.
    ///
    /// `measure q -> c;` broadcasts the whole register under the creg name
    /// as measurement key. `measure q[i] -> c[j];` uses `name[j]` so that
    /// separate measurements into one creg stay uniquely keyed.
    fn parse_measure(&mut self) -> ParseResult<()> {
        self.expect(Token::Measure)?;
        let qubit = self.parse_operand(true)?;
        self.expect(Token::Arrow)?;
        let (cname, clbit) = {
            let name = self.parse_identifier()?;
            let op = self.resolve_operand(&name, false)?;
            (name, op)
        };
        self.expect(Token::Semicolon)?;

        match (qubit, clbit) {
            (Operand::Single(q), Operand::Single(c)) => {
                let creg = &self.cregs[&cname];
                let key = format!("{cname}[{}]", c - creg.offset);
                self.ops
                    .push(Instruction::measure(key, QubitId(q), ClbitId(c)));
            }
            (Operand::Whole { name, reg }, Operand::Whole { reg: creg, .. }) => {
                if reg.size != creg.size {
                    return Err(ParseError::BroadcastMismatch {
                        register: name,
                        size: reg.size,
                        expected: creg.size,
                    });
                }
                let qubits: Vec<_> = (0..reg.size).map(|i| QubitId(reg.offset + i)).collect();
                let clbits: Vec<_> = (0..creg.size).map(|i| ClbitId(creg.offset + i)).collect();
                self.ops
                    .push(Instruction::measure_many(cname, qubits, clbits)?);
            }
            (q, c) => {
                let found = match (&q, &c) {
                    (Operand::Single(_), _) => "register target for indexed source",
                    _ => "indexed target for register source",
                };
                return Err(ParseError::UnexpectedToken {
                    expected: "matching measure operands".into(),
                    found: found.into(),
                });
            }
        }
        Ok(())
    }

    fn parse_barrier(&mut self) -> ParseResult<()> {
        self.expect(Token::Barrier)?;
        let mut qubits = Vec::new();
        if !self.check(&Token::Semicolon) {
            loop {
                match self.parse_operand(true)? {
                    Operand::Single(q) => qubits.push(QubitId(q)),
                    Operand::Whole { reg, .. } => {
                        qubits.extend((0..reg.size).map(|i| QubitId(reg.offset + i)));
                    }
                }
                if !self.consume(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(Token::Semicolon)?;
        self.ops.push(Instruction::barrier(qubits));
        Ok(())
    }

    /// Parse a gate application, broadcasting over whole-register operands.
    fn parse_gate_call(&mut self, name: &str) -> ParseResult<()> {
        let (param_count, qubit_count) = gate_signature(name)?;

        let params = if self.consume(&Token::LParen) {
            let mut params = vec![self.parse_expression()?];
            while self.consume(&Token::Comma) {
                params.push(self.parse_expression()?);
            }
            self.expect(Token::RParen)?;
            params
        } else {
            vec![]
        };

        if params.len() != param_count {
            return Err(ParseError::WrongParameterCount {
                gate: name.to_string(),
                expected: param_count,
                got: params.len(),
            });
        }

        let mut operands = vec![self.parse_operand(true)?];
        while self.consume(&Token::Comma) {
            operands.push(self.parse_operand(true)?);
        }
        self.expect(Token::Semicolon)?;

        if operands.len() != qubit_count {
            return Err(ParseError::WrongQubitCount {
                gate: name.to_string(),
                expected: qubit_count,
                got: operands.len(),
            });
        }

        // Broadcast width: all whole-register operands must agree.
        let mut width: Option<u32> = None;
        for op in &operands {
            if let Operand::Whole { name, reg } = op {
                match width {
                    None => width = Some(reg.size),
                    Some(w) if w != reg.size => {
                        return Err(ParseError::BroadcastMismatch {
                            register: name.clone(),
                            size: reg.size,
                            expected: w,
                        });
                    }
                    Some(_) => {}
                }
            }
        }
        let width = width.unwrap_or(1);

        for i in 0..width {
            let gate = build_gate(name, &params)?;
            let qubits: Vec<_> = operands
                .iter()
                .map(|op| match op {
                    Operand::Single(q) => QubitId(*q),
                    Operand::Whole { reg, .. } => QubitId(reg.offset + i),
                })
                .collect();
            self.ops.push(Instruction::gate(gate, qubits));
        }
        Ok(())
    }

    /// Parse a register reference, indexed or whole.
    fn parse_operand(&mut self, quantum: bool) -> ParseResult<Operand> {
        let name = self.parse_identifier()?;
        self.resolve_operand(&name, quantum)
    }

    fn resolve_operand(&mut self, name: &str, quantum: bool) -> ParseResult<Operand> {
        let regs = if quantum { &self.qregs } else { &self.cregs };
        let reg = *regs
            .get(name)
            .ok_or_else(|| ParseError::UndefinedRegister(name.to_string()))?;

        if self.consume(&Token::LBracket) {
            let index = self.parse_int_literal()? as u32;
            self.expect(Token::RBracket)?;
            if index >= reg.size {
                return Err(ParseError::IndexOutOfBounds {
                    register: name.to_string(),
                    index,
                    size: reg.size,
                });
            }
            Ok(Operand::Single(reg.offset + index))
        } else {
            Ok(Operand::Whole {
                name: name.to_string(),
                reg,
            })
        }
    }

    fn parse_identifier(&mut self) -> ParseResult<String> {
        match self.advance() {
            Some(Token::Identifier(s)) => Ok(s),
            Some(other) => Err(ParseError::UnexpectedToken {
                expected: "identifier".into(),
                found: other.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof("identifier".into())),
        }
    }

    fn parse_int_literal(&mut self) -> ParseResult<u64> {
        match self.advance() {
            Some(Token::IntLiteral(v)) => Ok(v),
            Some(other) => Err(ParseError::UnexpectedToken {
                expected: "integer literal".into(),
                found: other.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof("integer literal".into())),
        }
    }

    // =========================================================================
    // Parameter expressions
    // =========================================================================

    /// Parse an additive expression: term (('+' | '-') term)*.
    fn parse_expression(&mut self) -> ParseResult<f64> {
        let mut value = self.parse_term()?;
        loop {
            if self.consume(&Token::Plus) {
                value += self.parse_term()?;
            } else if self.consume(&Token::Minus) {
                value -= self.parse_term()?;
            } else {
                return Ok(value);
            }
        }
    }

    /// Parse a multiplicative expression: factor (('*' | '/') factor)*.
    fn parse_term(&mut self) -> ParseResult<f64> {
        let mut value = self.parse_factor()?;
        loop {
            if self.consume(&Token::Star) {
                value *= self.parse_factor()?;
            } else if self.consume(&Token::Slash) {
                value /= self.parse_factor()?;
            } else {
                return Ok(value);
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn parse_factor(&mut self) -> ParseResult<f64> {
        match self.advance() {
            Some(Token::FloatLiteral(v)) => Ok(v),
            Some(Token::IntLiteral(v)) => Ok(v as f64),
            Some(Token::Pi) => Ok(std::f64::consts::PI),
            Some(Token::Minus) => Ok(-self.parse_factor()?),
            Some(Token::LParen) => {
                let value = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Some(other) => Err(ParseError::UnexpectedToken {
                expected: "parameter expression".into(),
                found: other.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof("parameter expression".into())),
        }
    }
}

/// Signature (parameter count, qubit count) of a supported gate.
fn gate_signature(name: &str) -> ParseResult<(usize, usize)> {
    match name {
        "id" | "x" | "y" | "z" | "h" | "s" | "sdg" | "t" | "tdg" => Ok((0, 1)),
        "rx" | "ry" | "rz" => Ok((1, 1)),
        "cx" | "cz" | "swap" => Ok((0, 2)),
        _ => Err(ParseError::UnknownGate(name.to_string())),
    }
}

/// Build a gate from its name and evaluated parameters.
fn build_gate(name: &str, params: &[f64]) -> ParseResult<StandardGate> {
    let gate = match name {
        "id" => StandardGate::I,
        "x" => StandardGate::X,
        "y" => StandardGate::Y,
        "z" => StandardGate::Z,
        "h" => StandardGate::H,
        "s" => StandardGate::S,
        "sdg" => StandardGate::Sdg,
        "t" => StandardGate::T,
        "tdg" => StandardGate::Tdg,
        "rx" => StandardGate::Rx(params[0]),
        "ry" => StandardGate::Ry(params[0]),
        "rz" => StandardGate::Rz(params[0]),
        "cx" => StandardGate::CX,
        "cz" => StandardGate::CZ,
        "swap" => StandardGate::Swap,
        _ => return Err(ParseError::UnknownGate(name.to_string())),
    };
    Ok(gate)
}
