//! Program map - translates pad/knob ordinals into hardware codes
//!
//! The LPD8 exposes four program slots, each with its own note layout for the
//! eight pads. Ordinals are human-facing and 1-based; an out-of-range ordinal
//! resolves to `None` rather than failing.

/// One hardware program slot: eight pad note codes and eight knob CC codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Program {
    pads: [u8; 8],
    knobs: [u8; 8],
}

/// Factory program 1 (channel 0 layout)
pub const PROG_1: Program = Program::new([36, 37, 38, 39, 40, 41, 42, 43], KNOB_CCS);
/// Factory program 2 (channel 1 layout)
pub const PROG_2: Program = Program::new([35, 36, 42, 39, 37, 38, 46, 44], KNOB_CCS);
/// Factory program 3 (channel 2 layout)
pub const PROG_3: Program = Program::new([60, 62, 64, 65, 67, 69, 71, 72], KNOB_CCS);
/// Factory program 4 (channel 0 layout, the host default)
pub const PROG_4: Program = Program::new([44, 45, 46, 47, 48, 49, 50, 51], KNOB_CCS);

// Knob CC codes are the same across factory programs
const KNOB_CCS: [u8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];

impl Program {
    pub const fn new(pads: [u8; 8], knobs: [u8; 8]) -> Self {
        Self { pads, knobs }
    }

    /// Look up a factory program by slot number (1-4)
    pub fn slot(slot: u8) -> Option<Program> {
        match slot {
            1 => Some(PROG_1),
            2 => Some(PROG_2),
            3 => Some(PROG_3),
            4 => Some(PROG_4),
            _ => None,
        }
    }

    /// Hardware note code for a 1-based pad ordinal
    pub fn pad_code(&self, ordinal: u8) -> Option<u8> {
        if (1..=8).contains(&ordinal) {
            Some(self.pads[(ordinal - 1) as usize])
        } else {
            None
        }
    }

    /// Hardware CC code for a 1-based knob ordinal
    pub fn knob_code(&self, ordinal: u8) -> Option<u8> {
        if (1..=8).contains(&ordinal) {
            Some(self.knobs[(ordinal - 1) as usize])
        } else {
            None
        }
    }
}

impl Default for Program {
    fn default() -> Self {
        PROG_4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_map_to_list_index() {
        for ordinal in 1..=8u8 {
            assert_eq!(PROG_4.pad_code(ordinal), Some(44 + ordinal - 1));
            assert_eq!(PROG_4.knob_code(ordinal), Some(ordinal));
        }
    }

    #[test]
    fn test_out_of_range_ordinals() {
        assert_eq!(PROG_4.pad_code(0), None);
        assert_eq!(PROG_4.pad_code(9), None);
        assert_eq!(PROG_4.knob_code(0), None);
        assert_eq!(PROG_4.knob_code(9), None);
    }

    #[test]
    fn test_factory_slots() {
        assert_eq!(Program::slot(1), Some(PROG_1));
        assert_eq!(Program::slot(4), Some(PROG_4));
        assert_eq!(Program::slot(0), None);
        assert_eq!(Program::slot(5), None);
    }
}
