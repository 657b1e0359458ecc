use std::fmt;

use crate::u4;

/// Width of an immediate operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
    /// `nnn`: low 12 bits of the opcode, usually an address.
    Addr12,
    /// `nn`: low byte of the opcode.
    Byte8,
    /// `n`: low nibble of the opcode.
    Nibble4,
}

impl Width {
    const fn mask(self) -> u16 {
        match self {
            Width::Addr12 => 0x0FFF,
            Width::Byte8 => 0x00FF,
            Width::Nibble4 => 0x000F,
        }
    }
}

/// One of the three low nibble positions of an instruction pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    /// The opcode nibble must equal this value.
    Fixed(u8),
    /// The nibble selects the `x` register.
    RegX,
    /// The nibble selects the `y` register.
    RegY,
    /// The nibble is part of an immediate of the given width.
    Imm(Width),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AluOp {
    Set,
    Or,
    And,
    Xor,
    Add,
    Sub,
    ShiftRight,
    SubReverse,
    ShiftLeft,
}

/// CHIP-8 operations, one per entry of [`INSTRUCTION_TABLE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    ClearDisplay,
    Return,
    MachineCall,
    Jump,
    Call,

    SkipRegEqualImm,
    SkipRegNotEqualImm,
    SkipRegEqualReg,
    SkipRegNotEqualReg,

    SetRegImm,
    AddRegImm,
    Alu(AluOp),

    SetIndexImm,
    JumpWithOffset,
    Random,
    Draw,

    SkipIfPressed,
    SkipIfNotPressed,
    WaitForKey,

    ReadDelayTimer,
    SetDelayTimer,
    SetSoundTimer,

    AddIndexReg,
    FontChar,
    BCD,
    StoreRegs,
    LoadRegs,
}

/// A pattern in the instruction table.
#[derive(Debug, PartialEq, Eq)]
pub struct InstructionDef {
    pub mnemonic: &'static str,
    /// Required value of the top nibble.
    pub family: u8,
    /// Nibbles B, C and D.
    pub fields: [Field; 3],
    pub operation: Operation,
}

const X: Field = Field::RegX;
const Y: Field = Field::RegY;
const NNN: Field = Field::Imm(Width::Addr12);
const NN: Field = Field::Imm(Width::Byte8);
const N: Field = Field::Imm(Width::Nibble4);

const fn f(value: u8) -> Field {
    Field::Fixed(value)
}

const fn def(
    mnemonic: &'static str,
    family: u8,
    fields: [Field; 3],
    operation: Operation,
) -> InstructionDef {
    InstructionDef {
        mnemonic,
        family,
        fields,
        operation,
    }
}

/// Instruction patterns in match order. SYS overlaps CLS and RET, which are
/// listed before it and therefore take precedence.
pub static INSTRUCTION_TABLE: [InstructionDef; 35] = [
    def("CLS", 0x0, [f(0x0), f(0xE), f(0x0)], Operation::ClearDisplay),
    def("RET", 0x0, [f(0x0), f(0xE), f(0xE)], Operation::Return),
    def("SYS", 0x0, [NNN, NNN, NNN], Operation::MachineCall),
    def("JMP", 0x1, [NNN, NNN, NNN], Operation::Jump),
    def("CALL", 0x2, [NNN, NNN, NNN], Operation::Call),
    def("SEI", 0x3, [X, NN, NN], Operation::SkipRegEqualImm),
    def("SNEI", 0x4, [X, NN, NN], Operation::SkipRegNotEqualImm),
    def("SER", 0x5, [X, Y, f(0x0)], Operation::SkipRegEqualReg),
    def("LDI", 0x6, [X, NN, NN], Operation::SetRegImm),
    def("ADDI", 0x7, [X, NN, NN], Operation::AddRegImm),
    def("LD", 0x8, [X, Y, f(0x0)], Operation::Alu(AluOp::Set)),
    def("OR", 0x8, [X, Y, f(0x1)], Operation::Alu(AluOp::Or)),
    def("AND", 0x8, [X, Y, f(0x2)], Operation::Alu(AluOp::And)),
    def("XOR", 0x8, [X, Y, f(0x3)], Operation::Alu(AluOp::Xor)),
    def("ADD", 0x8, [X, Y, f(0x4)], Operation::Alu(AluOp::Add)),
    def("SUB", 0x8, [X, Y, f(0x5)], Operation::Alu(AluOp::Sub)),
    def("SHR", 0x8, [X, Y, f(0x6)], Operation::Alu(AluOp::ShiftRight)),
    def("SUBN", 0x8, [X, Y, f(0x7)], Operation::Alu(AluOp::SubReverse)),
    def("SHL", 0x8, [X, Y, f(0xE)], Operation::Alu(AluOp::ShiftLeft)),
    def("SNER", 0x9, [X, Y, f(0x0)], Operation::SkipRegNotEqualReg),
    def("LII", 0xA, [NNN, NNN, NNN], Operation::SetIndexImm),
    def("JMP0", 0xB, [NNN, NNN, NNN], Operation::JumpWithOffset),
    def("RND", 0xC, [X, NN, NN], Operation::Random),
    def("DRW", 0xD, [X, Y, N], Operation::Draw),
    def("SKP", 0xE, [X, f(0x9), f(0xE)], Operation::SkipIfPressed),
    def("SKNP", 0xE, [X, f(0xA), f(0x1)], Operation::SkipIfNotPressed),
    def("SDT", 0xF, [X, f(0x0), f(0x7)], Operation::ReadDelayTimer),
    def("IN", 0xF, [X, f(0x0), f(0xA)], Operation::WaitForKey),
    def("LDT", 0xF, [X, f(0x1), f(0x5)], Operation::SetDelayTimer),
    def("LST", 0xF, [X, f(0x1), f(0x8)], Operation::SetSoundTimer),
    def("ADDII", 0xF, [X, f(0x1), f(0xE)], Operation::AddIndexReg),
    def("LIFNT", 0xF, [X, f(0x2), f(0x9)], Operation::FontChar),
    def("STBCD", 0xF, [X, f(0x3), f(0x3)], Operation::BCD),
    def("STREG", 0xF, [X, f(0x5), f(0x5)], Operation::StoreRegs),
    def("LDREG", 0xF, [X, f(0x6), f(0x5)], Operation::LoadRegs),
];

fn nibbles(opcode: u16) -> [u8; 4] {
    [
        ((opcode & 0xF000) >> 12) as u8,
        ((opcode & 0x0F00) >> 8) as u8,
        ((opcode & 0x00F0) >> 4) as u8,
        (opcode & 0x000F) as u8,
    ]
}

impl InstructionDef {
    fn matches(&self, nibble: &[u8; 4]) -> bool {
        self.family == nibble[0]
            && self
                .fields
                .iter()
                .zip(&nibble[1..])
                .all(|(field, &value)| match *field {
                    Field::Fixed(required) => required == value,
                    _ => true,
                })
    }

    fn resolve(&'static self, opcode: u16, nibble: &[u8; 4]) -> Instruction {
        let mut instruction = Instruction {
            def: self,
            x: u4::default(),
            y: u4::default(),
            imm: 0,
        };

        for (field, &value) in self.fields.iter().zip(&nibble[1..]) {
            match *field {
                Field::Fixed(_) => {}
                Field::RegX => instruction.x = u4::new(value),
                Field::RegY => instruction.y = u4::new(value),
                Field::Imm(width) => instruction.imm = opcode & width.mask(),
            }
        }

        instruction
    }
}

/// A decoded instruction: the matched table entry plus its resolved operands.
///
/// Operands not named by the pattern are left at zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub def: &'static InstructionDef,
    pub x: u4,
    pub y: u4,
    /// The single immediate operand, already masked to the pattern's width.
    pub imm: u16,
}

impl Instruction {
    /// Decode a 16-bit raw opcode against [`INSTRUCTION_TABLE`].
    ///
    /// Returns `None` if no entry matches.
    pub fn decode(opcode: u16) -> Option<Self> {
        let nibble = nibbles(opcode);

        INSTRUCTION_TABLE
            .iter()
            .find(|def| def.matches(&nibble))
            .map(|def| def.resolve(opcode, &nibble))
    }

    pub fn operation(&self) -> Operation {
        self.def.operation
    }

    pub fn mnemonic(&self) -> &'static str {
        self.def.mnemonic
    }

    pub fn nnn(&self) -> u16 {
        self.imm & 0x0FFF
    }

    pub fn nn(&self) -> u8 {
        self.imm as u8
    }

    pub fn n(&self) -> u8 {
        (self.imm & 0x000F) as u8
    }

    /// Address this instruction refers to, for instructions that get a label
    /// in a disassembly listing.
    pub fn label_target(&self) -> Option<u16> {
        match self.operation() {
            Operation::Jump
            | Operation::Call
            | Operation::JumpWithOffset
            | Operation::SetIndexImm => Some(self.nnn()),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())?;

        let mut imm_written = false;
        for field in self.def.fields {
            match field {
                Field::Fixed(_) => {}
                Field::RegX => write!(f, " V{:X}", self.x)?,
                Field::RegY => write!(f, " V{:X}", self.y)?,
                Field::Imm(_) if imm_written => {}
                Field::Imm(width) => {
                    imm_written = true;
                    match (width, self.label_target()) {
                        (Width::Addr12, Some(target)) => write!(f, " off_{target:04X}")?,
                        (Width::Addr12, None) => write!(f, " 0x{:04X}", self.imm)?,
                        (Width::Byte8 | Width::Nibble4, _) => write!(f, " 0x{:02X}", self.imm)?,
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(opcode: u16) -> Instruction {
        Instruction::decode(opcode).unwrap_or_else(|| panic!("{opcode:#06X} should decode"))
    }

    #[test]
    fn every_operation_decodes() {
        let cases: [(u16, Operation); 35] = [
            (0x00E0, Operation::ClearDisplay),
            (0x00EE, Operation::Return),
            (0x0123, Operation::MachineCall),
            (0x1ABC, Operation::Jump),
            (0x2ABC, Operation::Call),
            (0x3A12, Operation::SkipRegEqualImm),
            (0x4A12, Operation::SkipRegNotEqualImm),
            (0x5AB0, Operation::SkipRegEqualReg),
            (0x6A12, Operation::SetRegImm),
            (0x7A12, Operation::AddRegImm),
            (0x8AB0, Operation::Alu(AluOp::Set)),
            (0x8AB1, Operation::Alu(AluOp::Or)),
            (0x8AB2, Operation::Alu(AluOp::And)),
            (0x8AB3, Operation::Alu(AluOp::Xor)),
            (0x8AB4, Operation::Alu(AluOp::Add)),
            (0x8AB5, Operation::Alu(AluOp::Sub)),
            (0x8AB6, Operation::Alu(AluOp::ShiftRight)),
            (0x8AB7, Operation::Alu(AluOp::SubReverse)),
            (0x8ABE, Operation::Alu(AluOp::ShiftLeft)),
            (0x9AB0, Operation::SkipRegNotEqualReg),
            (0xA123, Operation::SetIndexImm),
            (0xB123, Operation::JumpWithOffset),
            (0xCA0F, Operation::Random),
            (0xDAB5, Operation::Draw),
            (0xEA9E, Operation::SkipIfPressed),
            (0xEAA1, Operation::SkipIfNotPressed),
            (0xFA07, Operation::ReadDelayTimer),
            (0xFA0A, Operation::WaitForKey),
            (0xFA15, Operation::SetDelayTimer),
            (0xFA18, Operation::SetSoundTimer),
            (0xFA1E, Operation::AddIndexReg),
            (0xFA29, Operation::FontChar),
            (0xFA33, Operation::BCD),
            (0xFA55, Operation::StoreRegs),
            (0xFA65, Operation::LoadRegs),
        ];

        for (opcode, operation) in cases {
            assert_eq!(decode(opcode).operation(), operation, "{opcode:#06X}");
        }
    }

    #[test]
    fn resolves_register_operands() {
        let inst = decode(0x8123);
        assert_eq!(inst.operation(), Operation::Alu(AluOp::Xor));
        assert_eq!(inst.x, u4::new(1));
        assert_eq!(inst.y, u4::new(2));

        let inst = decode(0x8121);
        assert_eq!(inst.operation(), Operation::Alu(AluOp::Or));
        assert_eq!((inst.x.get(), inst.y.get()), (1, 2));
    }

    #[test]
    fn resolves_immediates_by_width() {
        assert_eq!(decode(0x1ABC).imm, 0xABC);
        assert_eq!(decode(0x6A42).imm, 0x42);
        assert_eq!(decode(0x6A42).x, u4::new(0xA));
        let draw = decode(0xD12F);
        assert_eq!((draw.x.get(), draw.y.get(), draw.imm), (1, 2, 0xF));
    }

    #[test]
    fn unused_operands_stay_zero() {
        let inst = decode(0xF733);
        assert_eq!(inst.x, u4::new(7));
        assert_eq!(inst.y, u4::default());
        assert_eq!(inst.imm, 0);
    }

    #[test]
    fn rejects_unmatched_patterns() {
        for opcode in [0x5001, 0x9AB1, 0x8AB8, 0x8ABF, 0xE000, 0xEA9F, 0xF0FF, 0xFA66] {
            assert!(Instruction::decode(opcode).is_none(), "{opcode:#06X}");
        }
    }

    #[test]
    fn earlier_entries_shadow_sys() {
        assert_eq!(decode(0x00E0).mnemonic(), "CLS");
        assert_eq!(decode(0x00EE).mnemonic(), "RET");
        assert_eq!(decode(0x00E1).mnemonic(), "SYS");
    }

    #[test]
    fn only_sys_overlaps_other_entries() {
        for opcode in 0..=u16::MAX {
            let nibble = nibbles(opcode);
            let matching: Vec<&str> = INSTRUCTION_TABLE
                .iter()
                .filter(|def| def.matches(&nibble))
                .map(|def| def.mnemonic)
                .filter(|&mnemonic| mnemonic != "SYS")
                .collect();
            assert!(matching.len() <= 1, "{opcode:#06X} matches {matching:?}");
        }
    }

    #[test]
    fn placeholders_sit_in_their_positions() {
        for def in &INSTRUCTION_TABLE {
            let [b, c, d] = def.fields;
            assert!(
                matches!(b, Field::Fixed(_) | Field::RegX | Field::Imm(Width::Addr12)),
                "{}",
                def.mnemonic
            );
            assert!(
                matches!(
                    c,
                    Field::Fixed(_) | Field::RegY | Field::Imm(Width::Addr12 | Width::Byte8)
                ),
                "{}",
                def.mnemonic
            );
            assert!(!matches!(d, Field::RegX | Field::RegY), "{}", def.mnemonic);
            for field in def.fields {
                if let Field::Fixed(value) = field {
                    assert!(value < 0x10, "{}", def.mnemonic);
                }
            }
        }
    }

    #[test]
    fn formats_like_a_listing() {
        assert_eq!(decode(0x00E0).to_string(), "CLS");
        assert_eq!(decode(0x1204).to_string(), "JMP off_0204");
        assert_eq!(decode(0x0123).to_string(), "SYS 0x0123");
        assert_eq!(decode(0x35EE).to_string(), "SEI V5 0xEE");
        assert_eq!(decode(0x8750).to_string(), "LD V7 V5");
        assert_eq!(decode(0xD015).to_string(), "DRW V0 V1 0x05");
        assert_eq!(decode(0xF307).to_string(), "SDT V3");
        assert_eq!(decode(0xA999).to_string(), "LII off_0999");
    }
}
