use std::fs;
use std::io;
use std::path::Path;

pub type Byte = u8; // 1 byte

/// Number of addressable bytes. Operands are a single nibble, so 16 is all a program can reach.
pub const MEMORY_SIZE: usize = 16;

/// Default memory
pub type StdMem = Memory<MEMORY_SIZE>;

/// Emulates memory for use with the CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Memory<const S: usize> {
    /// The actual data of the memory
    pub data: [Byte; S],
}

impl<const S: usize> Default for Memory<S> {
    /// Initializes the memory
    fn default() -> Self {
        Memory { data: [0; S] }
    }
}

impl<const S: usize> Memory<S> {
    /// Creates memory holding `program` from address 0, see [`Memory::load`]
    pub fn from_program(program: &[Byte]) -> Self {
        let mut mem = Self::default();
        mem.load(program);
        mem
    }

    /// Reads an assembled binary and loads it from address 0
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let program = fs::read(path)?;
        if program.len() > S {
            log::warn!(
                "program is {} bytes, only the first {} fit into memory",
                program.len(),
                S
            );
        }
        Ok(Self::from_program(&program))
    }

    /// Reads a byte from the memory. Addresses wrap around the memory size.
    pub fn read_byte(&self, position: Byte) -> Byte {
        self.data[position as usize % S]
    }

    /// Writes a byte to the memory. Addresses wrap around the memory size.
    pub fn write_byte(&mut self, position: Byte, value: Byte) {
        self.data[position as usize % S] = value;
    }

    /// Writes an array of bytes to the memory, dropping whatever does not fit
    pub fn write_array(&mut self, position: Byte, data: &[Byte]) {
        let start = position as usize % S;
        let len = data.len().min(S - start);
        self.data[start..start + len].copy_from_slice(&data[..len]);
    }

    /// Replaces the whole memory with `program`, truncated or zero padded to the memory size
    pub fn load(&mut self, program: &[Byte]) {
        self.data = [0; S];
        self.write_array(0, program);
    }
}

/// Writes a block of instructions directly into the memory
///
/// ```
/// use hopper::memory::StdMem;
/// use hopper::write_instructions;
///
/// let mut mem = StdMem::default();
/// write_instructions!(mem : 0 => LDI 5, OUT, HLT);
/// assert_eq!(mem.data[..3], [0x55, 0xE0, 0xF0]);
/// ```
#[macro_export]
macro_rules! write_instructions {
    ( $mem:ident : $pos:expr => $( $name:ident $( $operand:literal )? ),+ ) => {
        $mem.write_array($pos, &[
            $(
                $crate::processor::Instruction::$name.encode(0 $( + $operand )?),
            )+
        ]);
    };
}
