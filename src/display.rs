use std::fmt::Write;

use crate::alu::{byte_to_string, nibble_to_string};
use crate::memory::{Byte, Memory};
use crate::processor::{disassemble, Processor};

/// Renders registers, flags and memory of a machine as a text snapshot
pub fn render<const S: usize>(cpu: &Processor, memory: &Memory<S>) -> String {
    let mut out = String::new();

    // Writing into a String never fails
    let _ = writeln!(out, "Register A:    {} ({})", byte_to_string(cpu.a), cpu.a);
    let _ = writeln!(out, "Register Out:  {} ({})", byte_to_string(cpu.out), cpu.out);
    let _ = writeln!(out, "Flag Zero:     {}", cpu.zero);
    let _ = writeln!(out, "Flag Carry:    {}", cpu.carry);
    let _ = writeln!(out, "PC:            {} ({})", nibble_to_string(cpu.pc), cpu.pc);
    let _ = writeln!(
        out,
        "Next:          {}",
        if cpu.halted {
            "halted".to_string()
        } else {
            disassemble(memory.read_byte(cpu.pc))
        }
    );
    let _ = writeln!(out, "Steps:         {}", cpu.steps);
    let _ = writeln!(out, "RAM:");
    for (addr, &val) in memory.data.iter().enumerate() {
        let pc_indicator = if addr == cpu.pc as usize {
            " <---"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "{:02}: {}: {}{}",
            addr,
            nibble_to_string(addr as Byte),
            byte_to_string(val),
            pc_indicator
        );
    }

    out
}
