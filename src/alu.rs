use crate::memory::Byte;

/// Mask selecting the opcode half of an instruction
const MSB_MASK: Byte = 0xF0;

/// Returns the opcode nibble of an instruction (bits 7..4)
pub fn high_nibble(instruction: Byte) -> Byte {
    instruction >> 4
}

/// Clears the opcode nibble, leaving the operand (bits 3..0)
pub fn low_nibble(instruction: Byte) -> Byte {
    instruction & !MSB_MASK
}

/// Adds two bytes. The flag is set on unsigned overflow.
pub fn byte_adder(a: Byte, b: Byte) -> (Byte, bool) {
    a.overflowing_add(b)
}

/// Subtracts `b` from `a`. The flag is set when `b > a` (borrow).
pub fn byte_subtractor(a: Byte, b: Byte) -> (Byte, bool) {
    a.overflowing_sub(b)
}

/// Binary representation of a full byte, e.g. `00001010`
pub fn byte_to_string(value: Byte) -> String {
    format!("{:08b}", value)
}

/// Binary representation of the low nibble, e.g. `1010`
pub fn nibble_to_string(value: Byte) -> String {
    format!("{:04b}", low_nibble(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_nibbles() -> Result<()> {
        assert_eq!(high_nibble(0x9F), 0x9);
        assert_eq!(low_nibble(0x9F), 0xF);
        assert_eq!(low_nibble(0xF0), 0);

        Ok(())
    }

    #[test]
    fn test_adder_carry() -> Result<()> {
        assert_eq!(byte_adder(255, 1), (0, true));
        assert_eq!(byte_adder(200, 100), (44, true));
        assert_eq!(byte_adder(5, 5), (10, false));
        assert_eq!(byte_adder(0, 0), (0, false));

        Ok(())
    }

    #[test]
    fn test_subtractor_borrow() -> Result<()> {
        assert_eq!(byte_subtractor(3, 5), (254, true));
        assert_eq!(byte_subtractor(5, 5), (0, false));
        assert_eq!(byte_subtractor(5, 0), (5, false));
        assert_eq!(byte_subtractor(0, 1), (255, true));

        Ok(())
    }

    #[test]
    fn test_binary_strings() -> Result<()> {
        assert_eq!(byte_to_string(10), "00001010");
        assert_eq!(nibble_to_string(0xFA), "1010");

        Ok(())
    }
}
