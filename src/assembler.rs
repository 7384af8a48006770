//! Turns Hopper assembly into machine code, one byte per source line.
//!
//! ```text
//! LDI 5     ; A = 5
//! STR 10
//! ADD 10
//! OUT
//! HLT
//! 200       ; raw data byte
//! ```
//!
//! Parse problems never stop assembling. The failed number counts as zero and a
//! diagnostic is recorded in [`Assembly::diagnostics`].

use std::borrow::Cow;
use std::error;
use std::fmt;

use crate::alu;
use crate::memory::Byte;
use crate::processor::{Instruction, Operand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssembleErrorKind {
    InvalidOperand,
    InvalidLiteral,
    OperandTruncated { value: Byte },
    MissingOperand,
}

impl AssembleErrorKind {
    /// Whether a number on the line could not be parsed at all
    pub fn is_parse_failure(&self) -> bool {
        matches!(
            self,
            AssembleErrorKind::InvalidOperand | AssembleErrorKind::InvalidLiteral
        )
    }
}

impl fmt::Display for AssembleErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssembleErrorKind::InvalidOperand => f.write_str("invalid operand"),
            AssembleErrorKind::InvalidLiteral => f.write_str("invalid literal"),
            AssembleErrorKind::OperandTruncated { value } => {
                write!(
                    f,
                    "operand `{}` does not fit into 4 bits, using `{}`",
                    value,
                    alu::low_nibble(*value)
                )
            }
            AssembleErrorKind::MissingOperand => f.write_str("missing operand"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleError {
    kind: AssembleErrorKind,
    context: Option<Cow<'static, str>>,
    line_nr: usize,
}

impl AssembleError {
    fn new<C, S>(kind: AssembleErrorKind, context: C, line_nr: usize) -> Self
    where
        C: Into<Option<S>>,
        S: Into<Cow<'static, str>>,
    {
        Self {
            kind,
            context: context.into().map(|inner| inner.into()),
            line_nr,
        }
    }

    pub fn kind(&self) -> AssembleErrorKind {
        self.kind
    }

    /// 1-based line number in the source
    pub fn line_nr(&self) -> usize {
        self.line_nr
    }
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(
                f,
                "error [ln: {}]: {} - {}",
                self.line_nr, self.kind, context
            )
        } else {
            write!(f, "error [ln: {}]: {}", self.line_nr, self.kind)
        }
    }
}

impl error::Error for AssembleError {}

/// Output of [`assemble`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    /// Machine code, index aligned with the source lines
    pub bytes: Vec<Byte>,
    /// Everything that did not assemble cleanly
    pub diagnostics: Vec<AssembleError>,
}

impl Assembly {
    /// Number of lines where a number could not be parsed
    pub fn failed_lines(&self) -> usize {
        let mut lines: Vec<usize> = self
            .diagnostics
            .iter()
            .filter(|err| err.kind.is_parse_failure())
            .map(|err| err.line_nr)
            .collect();
        lines.dedup();
        lines.len()
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Assembles `source`, one byte per line
pub fn assemble(source: &str) -> Assembly {
    assemble_lines(source.lines())
}

/// Assembles each line into exactly one byte
pub fn assemble_lines<'a, I>(lines: I) -> Assembly
where
    I: IntoIterator<Item = &'a str>,
{
    let mut assembler = Assembler::default();
    let bytes = lines
        .into_iter()
        .enumerate()
        .map(|(idx, line)| assembler.assemble_line(line, idx + 1))
        .collect();

    Assembly {
        bytes,
        diagnostics: assembler.diagnostics,
    }
}

#[derive(Debug, Default)]
struct Assembler {
    diagnostics: Vec<AssembleError>,
}

impl Assembler {
    fn report(&mut self, err: AssembleError) {
        log::warn!("{}", err);
        self.diagnostics.push(err);
    }

    /// Assembles a single line. Comments run from `;` to the end of the line.
    ///
    /// # Examples
    ///
    /// - `LDA 14 ; load`
    /// - `OUT`
    /// - `42`
    fn assemble_line(&mut self, line: &str, line_nr: usize) -> Byte {
        let line = match line.find(';') {
            Some(pos) => &line[..pos],
            None => line,
        }
        .trim();

        if line.is_empty() {
            return 0;
        }

        let (code, operand) = match line.find(' ') {
            Some(pos) => (&line[..pos], line[pos + 1..].trim()),
            None => (line, ""),
        };

        let byte = match Instruction::from_mnemonic(code) {
            Some(instruction) => self.assemble_instruction(instruction, operand, line_nr),
            None => self.assemble_literal(line, line_nr),
        };

        log::debug!("[{}] `{}` => 0x{:02X}", line_nr, line, byte);
        byte
    }

    fn assemble_instruction(
        &mut self,
        instruction: Instruction,
        operand: &str,
        line_nr: usize,
    ) -> Byte {
        if operand.is_empty() {
            if instruction.operand() != Operand::None {
                self.report(AssembleError::new(
                    AssembleErrorKind::MissingOperand,
                    format!("`{}` expects an operand, using `0`", instruction),
                    line_nr,
                ));
            }
            return instruction.encode(0);
        }

        let value = match parse_decimal(operand) {
            Some(value) => value,
            None => {
                self.report(AssembleError::new(
                    AssembleErrorKind::InvalidOperand,
                    format!("`{}` is not a number between 0 and 255", operand),
                    line_nr,
                ));
                0
            }
        };

        if value > 0x0F {
            self.report(AssembleError::new(
                AssembleErrorKind::OperandTruncated { value },
                format!("`{}` is above 15", value),
                line_nr,
            ));
        }

        instruction.encode(value)
    }

    fn assemble_literal(&mut self, line: &str, line_nr: usize) -> Byte {
        parse_decimal(line).unwrap_or_else(|| {
            self.report(AssembleError::new(
                AssembleErrorKind::InvalidLiteral,
                format!("`{}` is neither an instruction nor a number between 0 and 255", line),
                line_nr,
            ));
            0
        })
    }
}

/// Parses an unsigned base-10 byte. Signs are rejected.
fn parse_decimal(token: &str) -> Option<Byte> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}
