use std::convert::TryFrom;
use std::error;
use std::fmt;

use crate::alu;
use crate::memory::{Byte, Memory};
use color_eyre::eyre::{Result, WrapErr};
use log::*;
use num_enum::IntoPrimitive;
use num_enum::TryFromPrimitive;

/// Emulates the Hopper CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Processor {
    /// Accumulator
    pub a: Byte,
    /// Output register, written by `OUT`
    pub out: Byte,
    /// Set when the last arithmetic result was zero
    pub zero: bool,
    /// Set when the last arithmetic operation overflowed or borrowed
    pub carry: bool,
    /// Program counter
    pub pc: Byte,
    /// Termination flag. Set by `HLT`; no instruction runs afterwards
    pub halted: bool,
    /// Number of executed instructions
    pub steps: usize,
}

/// What the executed instruction asks of the fetch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepOutcome {
    /// Stop after this step
    pub halt: bool,
    /// Move the program counter to the next address
    pub advance_pc: bool,
}

impl StepOutcome {
    const NEXT: Self = Self {
        halt: false,
        advance_pc: true,
    };
    const JUMPED: Self = Self {
        halt: false,
        advance_pc: false,
    };
    const HALT: Self = Self {
        halt: true,
        advance_pc: true,
    };
}

/// The fetched byte has an opcode with no instruction assigned (9 to 13)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UndefinedOpcode {
    /// Address the byte was fetched from
    pub address: Byte,
    /// The raw instruction byte
    pub instruction: Byte,
}

impl fmt::Display for UndefinedOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "undefined opcode {} in instruction 0x{:02X} at address 0x{:X}",
            alu::high_nibble(self.instruction),
            self.instruction,
            self.address
        )
    }
}

impl error::Error for UndefinedOpcode {}

impl Processor {
    /// Initializes a new CPU
    /// @param entrypoint The start of the program
    pub fn new(entrypoint: Byte) -> Self {
        Self {
            pc: entrypoint,
            ..Self::default()
        }
    }

    /// Executes a single decoded instruction. The caller advances the program counter.
    pub fn execute_instruction<const S: usize>(
        &mut self,
        instruction: Instruction,
        operand: Byte,
        memory: &mut Memory<S>,
    ) -> StepOutcome {
        match instruction {
            Instruction::NOP => {
                debug!("NOP");
                StepOutcome::NEXT
            }
            Instruction::LDA => {
                self.a = memory.read_byte(operand);

                debug!("LDA {}: {}", operand, self.a);
                StepOutcome::NEXT
            }
            Instruction::ADD => {
                let value = memory.read_byte(operand);
                let (result, carry) = alu::byte_adder(self.a, value);
                self.set_result(result, carry);

                debug!("ADD {}: {} carry={}", operand, result, carry);
                StepOutcome::NEXT
            }
            Instruction::SUB => {
                let value = memory.read_byte(operand);
                let (result, carry) = alu::byte_subtractor(self.a, value);
                self.set_result(result, carry);

                debug!("SUB {}: {} carry={}", operand, result, carry);
                StepOutcome::NEXT
            }
            Instruction::STR => {
                memory.write_byte(operand, self.a);

                debug!("STR {}: {}", operand, self.a);
                StepOutcome::NEXT
            }
            Instruction::LDI => {
                self.a = operand;

                debug!("LDI {}", operand);
                StepOutcome::NEXT
            }
            Instruction::JMP => {
                self.pc = operand;

                debug!("JMP {}", operand);
                StepOutcome::JUMPED
            }
            Instruction::JC => self.jump_if(self.carry, "JC", operand),
            Instruction::JZ => self.jump_if(self.zero, "JZ", operand),
            Instruction::OUT => {
                self.out = self.a;

                debug!("OUT {}", self.out);
                StepOutcome::NEXT
            }
            Instruction::HLT => {
                debug!("HLT");
                StepOutcome::HALT
            }
        }
    }

    fn set_result(&mut self, result: Byte, carry: bool) {
        self.a = result;
        self.carry = carry;
        self.zero = result == 0;
    }

    fn jump_if(&mut self, condition: bool, name: &str, operand: Byte) -> StepOutcome {
        debug!("{} {}: {}", name, operand, condition);

        if condition {
            self.pc = operand;
            StepOutcome::JUMPED
        } else {
            StepOutcome::NEXT
        }
    }

    /// Runs one fetch, decode and execute step. Does nothing once halted.
    ///
    /// # Errors
    ///
    /// Fails without touching any state if the fetched byte carries a reserved opcode.
    pub fn execute<const S: usize>(
        &mut self,
        memory: &mut Memory<S>,
    ) -> Result<StepOutcome, UndefinedOpcode> {
        if self.halted {
            return Ok(StepOutcome::HALT);
        }

        let address = self.pc;
        let byte = memory.read_byte(address); // Read instruction where PC is
        let (instruction, operand) = decode(byte);
        let instruction = instruction.map_err(|_| UndefinedOpcode {
            address,
            instruction: byte,
        })?;

        let outcome = self.execute_instruction(instruction, operand, memory);
        self.steps += 1;

        if outcome.advance_pc {
            self.pc = ((self.pc as usize + 1) % S) as Byte;
        }
        if outcome.halt {
            self.halted = true;
        }

        Ok(outcome)
    }

    /// Runs at most `max_steps` steps, stopping early on halt. Returns the number of steps run.
    pub fn execute_for<const S: usize>(
        &mut self,
        memory: &mut Memory<S>,
        max_steps: usize,
    ) -> Result<usize> {
        let start = self.steps;
        while !self.halted && self.steps - start < max_steps {
            self.execute(memory)
                .wrap_err_with(|| format!("Execution stopped after {} steps", self.steps))?;
        }

        Ok(self.steps - start)
    }

    /// Run program until it halts. Returns the number of steps run.
    pub fn execute_until_hlt<const S: usize>(&mut self, memory: &mut Memory<S>) -> Result<usize> {
        let steps = self.execute_for(memory, usize::MAX)?;
        info!(
            "Program halted after {} steps. Output: 0x{:02X} / {}",
            steps, self.out, self.out
        );

        Ok(steps)
    }
}

/// Splits an instruction byte into its instruction and operand nibble
pub fn decode(byte: Byte) -> (Result<Instruction, Byte>, Byte) {
    let opcode = alu::high_nibble(byte);
    let instruction = Instruction::try_from(opcode).map_err(|_| opcode);
    (instruction, alu::low_nibble(byte))
}

/// Readable form of an instruction byte
pub fn disassemble(byte: Byte) -> String {
    match decode(byte) {
        (Ok(instruction), operand) => match instruction.operand() {
            Operand::None => instruction.to_string(),
            _ => format!("{} {}", instruction, operand),
        },
        (Err(_), _) => format!("??? (0x{:02X})", byte),
    }
}

/// How an instruction uses its low nibble
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// The nibble is ignored
    None,
    /// The nibble is a memory address
    Address,
    /// The nibble is the value itself
    Literal,
}

macro_rules! instructions {
    ( $( $( #[doc = $doc:expr] )+ $name:ident = $repr:literal => $operand:ident , )+ ) => {
        /// Defines the instructions. The value is the opcode nibble.
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[derive(TryFromPrimitive, IntoPrimitive)]
        pub enum Instruction {
            $(
                $( #[doc = $doc] )+
                $name = $repr,
            )+
        }

        impl Instruction {
            pub const ALL: &'static [Self] = &[
                $( Self::$name , )+
            ];

            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$name => stringify!($name) , )+
                }
            }

            pub fn operand(&self) -> Operand {
                match self {
                    $( Self::$name => Operand::$operand , )+
                }
            }

            /// Looks up an instruction by its mnemonic
            pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
                match mnemonic {
                    $( stringify!($name) => Some(Self::$name) , )+
                    _ => None,
                }
            }
        }

        impl ::std::fmt::Display for Instruction {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $( Self::$name => f.write_str(stringify!($name)) , )+
                }
            }
        }
    }
}

impl Instruction {
    /// The opcode nibble
    pub fn opcode(self) -> Byte {
        self.into()
    }

    /// Packs the opcode and the low nibble of `operand` into an instruction byte
    pub fn encode(self, operand: Byte) -> Byte {
        self.opcode() << 4 | alu::low_nibble(operand)
    }
}

instructions! {
    /// No operation
    NOP = 0x0 => None,
    /// Load the value at an address into A
    LDA = 0x1 => Address,
    /// Add the value at an address to A, setting carry and zero
    ADD = 0x2 => Address,
    /// Subtract the value at an address from A, setting carry (borrow) and zero
    SUB = 0x3 => Address,
    /// Store A at an address
    STR = 0x4 => Address,
    /// Load the operand itself into A
    LDI = 0x5 => Literal,
    /// Jump to an address
    JMP = 0x6 => Address,
    /// Jump to an address if the carry flag is set
    JC = 0x7 => Address,
    /// Jump to an address if the zero flag is set
    JZ = 0x8 => Address,
    /// Copy A into the output register
    OUT = 0xE => None,
    /// Stop the execution of the program
    HLT = 0xF => None,
}

#[cfg(test)]
mod tests {
    use crate::memory::StdMem;
    use crate::write_instructions;

    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_no_operation() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::default();

        mem.data[0x0] = Instruction::NOP.encode(0);
        cpu.execute(&mut mem)?;

        assert_eq!(mem, StdMem::default());
        let mut cpu2 = Processor::default();
        cpu2.pc += 1;
        cpu2.steps += 1;
        assert_eq!(cpu, cpu2);

        Ok(())
    }

    #[test]
    fn test_halt() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::default();

        write_instructions!(mem : 0 => HLT, LDI 7, OUT);
        let outcome = cpu.execute(&mut mem)?;
        assert!(outcome.halt);
        assert!(cpu.halted);

        let (before_cpu, before_mem) = (cpu, mem);
        cpu.execute(&mut mem)?;
        cpu.execute_for(&mut mem, 10)?;
        assert_eq!(cpu, before_cpu);
        assert_eq!(mem, before_mem);

        Ok(())
    }

    #[test]
    fn test_load_and_store() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::default();

        write_instructions!(mem : 0 => LDA 15, STR 14);
        mem.data[15] = 42;
        cpu.execute(&mut mem)?;
        assert_eq!(cpu.a, 42);
        cpu.execute(&mut mem)?;
        assert_eq!(mem.data[14], 42);

        Ok(())
    }

    #[test]
    fn test_load_immediate() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::default();

        write_instructions!(mem : 0 => LDI 9);
        cpu.execute(&mut mem)?;
        assert_eq!(cpu.a, 9);

        Ok(())
    }

    #[test]
    fn test_add_overflow() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::default();

        write_instructions!(mem : 0 => ADD 15);
        mem.data[15] = 1;
        cpu.a = 255;
        cpu.execute(&mut mem)?;

        assert_eq!(cpu.a, 0);
        assert!(cpu.carry);
        assert!(cpu.zero);

        Ok(())
    }

    #[test]
    fn test_sub_borrow() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::default();

        write_instructions!(mem : 0 => SUB 15);
        mem.data[15] = 5;
        cpu.a = 3;
        cpu.execute(&mut mem)?;

        assert_eq!(cpu.a, 254);
        assert!(cpu.carry);
        assert!(!cpu.zero);

        Ok(())
    }

    #[test]
    fn test_flags_only_change_on_arithmetic() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::default();

        write_instructions!(mem : 0 => LDI 0, STR 15, LDA 15, NOP, OUT);
        cpu.carry = true;
        cpu.zero = false;
        cpu.execute_for(&mut mem, 5)?;

        assert!(cpu.carry);
        assert!(!cpu.zero);

        Ok(())
    }

    #[test]
    fn test_jump() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::default();

        write_instructions!(mem : 0 => JMP 9);
        let outcome = cpu.execute(&mut mem)?;
        assert!(!outcome.advance_pc);
        assert_eq!(cpu.pc, 9);

        Ok(())
    }

    #[test]
    fn test_conditional_jumps() -> Result<()> {
        let mut mem = StdMem::default();
        write_instructions!(mem : 0 => JC 7, JZ 9);

        let mut cpu = Processor::default();
        cpu.execute(&mut mem)?;
        assert_eq!(cpu.pc, 1);
        cpu.execute(&mut mem)?;
        assert_eq!(cpu.pc, 2);

        let mut cpu = Processor::default();
        cpu.carry = true;
        cpu.execute(&mut mem)?;
        assert_eq!(cpu.pc, 7);

        let mut cpu = Processor::new(1);
        cpu.zero = true;
        cpu.execute(&mut mem)?;
        assert_eq!(cpu.pc, 9);

        Ok(())
    }

    #[test]
    fn test_pc_wraps() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new(15);

        cpu.execute(&mut mem)?;
        assert_eq!(cpu.pc, 0);

        Ok(())
    }

    #[test]
    fn test_undefined_opcode() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::new(3);
        mem.data[3] = 0x9F;

        let err = cpu.execute(&mut mem).unwrap_err();
        assert_eq!(
            err,
            UndefinedOpcode {
                address: 3,
                instruction: 0x9F
            }
        );
        assert_eq!(cpu, Processor::new(3));

        let report = cpu.execute_until_hlt(&mut mem).unwrap_err();
        assert!(report.downcast_ref::<UndefinedOpcode>().is_some());

        Ok(())
    }

    #[test]
    fn test_count_down() -> Result<()> {
        let mut mem = StdMem::default();
        let mut cpu = Processor::default();

        // A = 3; loop { A -= 1; OUT; if A == 0 break }
        write_instructions!(mem : 0 => LDI 3, SUB 15, OUT, JZ 5, JMP 1, HLT);
        mem.data[15] = 1;
        let steps = cpu.execute_until_hlt(&mut mem)?;

        assert_eq!(cpu.out, 0);
        assert!(cpu.halted);
        assert_eq!(steps, 1 + 4 + 4 + 3 + 1);

        Ok(())
    }

    #[test]
    fn test_decode_every_instruction() -> Result<()> {
        for &instruction in Instruction::ALL {
            for operand in 0..=15 {
                let (decoded, nibble) = decode(instruction.encode(operand));
                assert_eq!(decoded, Ok(instruction));
                assert_eq!(nibble, operand);
            }
            assert_eq!(Instruction::from_mnemonic(instruction.name()), Some(instruction));
        }
        for opcode in 9..=13 {
            assert_eq!(decode(opcode << 4).0, Err(opcode));
        }

        Ok(())
    }

    #[test]
    fn test_disassemble() -> Result<()> {
        assert_eq!(disassemble(0x1A), "LDA 10");
        assert_eq!(disassemble(0x55), "LDI 5");
        assert_eq!(disassemble(0xE3), "OUT");
        assert_eq!(disassemble(0x9F), "??? (0x9F)");

        Ok(())
    }
}
