//! Hopper: an 8-bit accumulator computer, its assembler and an emulator.

pub mod alu;
pub mod assembler;
pub mod display;
pub mod memory;
pub mod pacing;
pub mod processor;

pub use assembler::{assemble, Assembly};
pub use memory::StdMem;
pub use processor::{Instruction, Processor};
