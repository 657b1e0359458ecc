//! Static disassembly of CHIP-8 program images.

use std::{collections::BTreeSet, fmt};

use crate::{Instruction, Operation, ROM_START_ADDRESS};

/// One 2-byte word of a disassembled program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub address: u16,
    pub text: String,
    /// `None` if the word is not a valid instruction.
    pub instruction: Option<Instruction>,
}

impl Entry {
    pub fn is_data(&self) -> bool {
        self.instruction.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Disassembly {
    pub entries: Vec<Entry>,
    /// Targets of jumps, calls and index loads.
    pub labels: BTreeSet<u16>,
}

/// Disassembles `rom` as if loaded at the program origin. A trailing odd
/// byte is ignored.
pub fn disassemble(rom: &[u8]) -> Disassembly {
    let mut disassembly = Disassembly::default();

    for (index, word) in rom.chunks_exact(2).enumerate() {
        let address = (ROM_START_ADDRESS + index * 2) as u16;
        let instruction = Instruction::decode(u16::from_be_bytes([word[0], word[1]]));

        let text = match &instruction {
            Some(inst) => {
                if let Some(target) = inst.label_target() {
                    disassembly.labels.insert(target);
                }
                inst.to_string()
            }
            None => format!(".byte {:02X} {:02X}", word[0], word[1]),
        };

        disassembly.entries.push(Entry {
            address,
            text,
            instruction,
        });
    }

    disassembly
}

impl fmt::Display for Disassembly {
    /// Labelled addresses open an indented block that runs until the next RET.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut in_label = false;

        for entry in &self.entries {
            if self.labels.contains(&entry.address) {
                writeln!(f, "off_{:04X}:", entry.address)?;
                in_label = true;
            }

            if in_label {
                f.write_str("\t")?;
            }
            writeln!(f, "{}", entry.text)?;

            if entry
                .instruction
                .is_some_and(|inst| inst.operation() == Operation::Return)
            {
                in_label = false;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_undecodable_words_as_data() {
        let d = disassemble(&[0x50, 0x01, 0x00, 0xE0, 0x7F]);
        assert_eq!(d.entries.len(), 2);
        assert!(d.entries[0].is_data());
        assert_eq!(d.entries[0].text, ".byte 50 01");
        assert_eq!(d.entries[1].address, 0x202);
        assert_eq!(d.entries[1].text, "CLS");
    }

    #[test]
    fn collects_labels() {
        let d = disassemble(&[0x22, 0x06, 0xA2, 0x08, 0x12, 0x04, 0x00, 0xEE]);
        assert_eq!(d.labels.iter().copied().collect::<Vec<_>>(), vec![0x204, 0x206, 0x208]);
    }

    #[test]
    fn listing_indents_labelled_blocks() {
        // 0x200: CALL 0x204; 0x202: CLS; 0x204: LDI V1 0x02; 0x206: RET; 0x208: CLS
        let d = disassemble(&[0x22, 0x04, 0x00, 0xE0, 0x61, 0x02, 0x00, 0xEE, 0x00, 0xE0]);
        let expected = "\
CALL off_0204
CLS
off_0204:
\tLDI V1 0x02
\tRET
CLS
";
        assert_eq!(d.to_string(), expected);
    }
}
