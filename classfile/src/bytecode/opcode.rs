use num_enum::{IntoPrimitive, TryFromPrimitive};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum Opcode {
    Nop = 0x00,
    AconstNull = 0x01,
    IconstM1 = 0x02,
    Iconst0 = 0x03,
    Iconst1 = 0x04,
    Iconst2 = 0x05,
    Iconst3 = 0x06,
    Iconst4 = 0x07,
    Iconst5 = 0x08,
    Lconst0 = 0x09,
    Lconst1 = 0x0a,
    Fconst0 = 0x0b,
    Fconst1 = 0x0c,
    Fconst2 = 0x0d,
    Dconst0 = 0x0e,
    Dconst1 = 0x0f,
    Bipush = 0x10,
    Sipush = 0x11,
    Ldc = 0x12,
    LdcW = 0x13,
    Ldc2W = 0x14,
    Iload = 0x15,
    Lload = 0x16,
    Fload = 0x17,
    Dload = 0x18,
    Aload = 0x19,
    Iload0 = 0x1a,
    Iload1 = 0x1b,
    Iload2 = 0x1c,
    Iload3 = 0x1d,
    Lload0 = 0x1e,
    Lload1 = 0x1f,
    Lload2 = 0x20,
    Lload3 = 0x21,
    Fload0 = 0x22,
    Fload1 = 0x23,
    Fload2 = 0x24,
    Fload3 = 0x25,
    Dload0 = 0x26,
    Dload1 = 0x27,
    Dload2 = 0x28,
    Dload3 = 0x29,
    Aload0 = 0x2a,
    Aload1 = 0x2b,
    Aload2 = 0x2c,
    Aload3 = 0x2d,
    Iaload = 0x2e,
    Laload = 0x2f,
    Faload = 0x30,
    Daload = 0x31,
    Aaload = 0x32,
    Baload = 0x33,
    Caload = 0x34,
    Saload = 0x35,
    Istore = 0x36,
    Lstore = 0x37,
    Fstore = 0x38,
    Dstore = 0x39,
    Astore = 0x3a,
    Istore0 = 0x3b,
    Istore1 = 0x3c,
    Istore2 = 0x3d,
    Istore3 = 0x3e,
    Lstore0 = 0x3f,
    Lstore1 = 0x40,
    Lstore2 = 0x41,
    Lstore3 = 0x42,
    Fstore0 = 0x43,
    Fstore1 = 0x44,
    Fstore2 = 0x45,
    Fstore3 = 0x46,
    Dstore0 = 0x47,
    Dstore1 = 0x48,
    Dstore2 = 0x49,
    Dstore3 = 0x4a,
    Astore0 = 0x4b,
    Astore1 = 0x4c,
    Astore2 = 0x4d,
    Astore3 = 0x4e,
    Iastore = 0x4f,
    Lastore = 0x50,
    Fastore = 0x51,
    Dastore = 0x52,
    Aastore = 0x53,
    Bastore = 0x54,
    Castore = 0x55,
    Sastore = 0x56,
    Pop = 0x57,
    Pop2 = 0x58,
    Dup = 0x59,
    DupX1 = 0x5a,
    DupX2 = 0x5b,
    Dup2 = 0x5c,
    Dup2X1 = 0x5d,
    Dup2X2 = 0x5e,
    Swap = 0x5f,
    Iadd = 0x60,
    Ladd = 0x61,
    Fadd = 0x62,
    Dadd = 0x63,
    Isub = 0x64,
    Lsub = 0x65,
    Fsub = 0x66,
    Dsub = 0x67,
    Imul = 0x68,
    Lmul = 0x69,
    Fmul = 0x6a,
    Dmul = 0x6b,
    Idiv = 0x6c,
    Ldiv = 0x6d,
    Fdiv = 0x6e,
    Ddiv = 0x6f,
    Irem = 0x70,
    Lrem = 0x71,
    Frem = 0x72,
    Drem = 0x73,
    Ineg = 0x74,
    Lneg = 0x75,
    Fneg = 0x76,
    Dneg = 0x77,
    Ishl = 0x78,
    Lshl = 0x79,
    Ishr = 0x7a,
    Lshr = 0x7b,
    Iushr = 0x7c,
    Lushr = 0x7d,
    Iand = 0x7e,
    Land = 0x7f,
    Ior = 0x80,
    Lor = 0x81,
    Ixor = 0x82,
    Lxor = 0x83,
    Iinc = 0x84,
    I2l = 0x85,
    I2f = 0x86,
    I2d = 0x87,
    L2i = 0x88,
    L2f = 0x89,
    L2d = 0x8a,
    F2i = 0x8b,
    F2l = 0x8c,
    F2d = 0x8d,
    D2i = 0x8e,
    D2l = 0x8f,
    D2f = 0x90,
    I2b = 0x91,
    I2c = 0x92,
    I2s = 0x93,
    Lcmp = 0x94,
    Fcmpl = 0x95,
    Fcmpg = 0x96,
    Dcmpl = 0x97,
    Dcmpg = 0x98,
    IfEq = 0x99,
    IfNe = 0x9a,
    IfLt = 0x9b,
    IfGe = 0x9c,
    IfGt = 0x9d,
    IfLe = 0x9e,
    IfIcmpeq = 0x9f,
    IfIcmpne = 0xa0,
    IfIcmplt = 0xa1,
    IfIcmpge = 0xa2,
    IfIcmpgt = 0xa3,
    IfIcmple = 0xa4,
    IfAcmpEq = 0xa5,
    IfAcmpNe = 0xa6,
    Goto = 0xa7,
    Jsr = 0xa8,
    Ret = 0xa9,
    Tableswitch = 0xaa,
    Lookupswitch = 0xab,
    Ireturn = 0xac,
    Lreturn = 0xad,
    Freturn = 0xae,
    Dreturn = 0xaf,
    Areturn = 0xb0,
    Return = 0xb1,
    Getstatic = 0xb2,
    Putstatic = 0xb3,
    Getfield = 0xb4,
    Putfield = 0xb5,
    InvokeVirtual = 0xb6,
    InvokeSpecial = 0xb7,
    InvokeStatic = 0xb8,
    InvokeInterface = 0xb9,
    InvokeDynamic = 0xba,
    New = 0xbb,
    Newarray = 0xbc,
    Anewarray = 0xbd,
    ArrayLength = 0xbe,
    Athrow = 0xbf,
    Checkcast = 0xc0,
    Instanceof = 0xc1,
    Monitorenter = 0xc2,
    Monitorexit = 0xc3,
    Wide = 0xc4,
    Multianewarray = 0xc5,
    Ifnull = 0xc6,
    Ifnonnull = 0xc7,
    GotoW = 0xc8,
    JsrW = 0xc9,
    Breakpoint = 0xca,
    Impdep1 = 0xfe,
    Impdep2 = 0xff,
}

impl Opcode {
    /// Fixed encoded size including the opcode byte; `None` for the switches and `wide`.
    pub const fn fixed_size(self) -> Option<usize> {
        use Opcode::*;
        match self {
            Tableswitch | Lookupswitch | Wide => None,
            Bipush | Ldc | Iload | Lload | Fload | Dload | Aload | Istore | Lstore | Fstore
            | Dstore | Astore | Ret | Newarray => Some(2),
            Sipush | LdcW | Ldc2W | Iinc | IfEq | IfNe | IfLt | IfGe | IfGt | IfLe | IfIcmpeq
            | IfIcmpne | IfIcmplt | IfIcmpge | IfIcmpgt | IfIcmple | IfAcmpEq | IfAcmpNe
            | Goto | Jsr | Getstatic | Putstatic | Getfield | Putfield | InvokeVirtual
            | InvokeSpecial | InvokeStatic | New | Anewarray | Checkcast | Instanceof | Ifnull
            | Ifnonnull => Some(3),
            Multianewarray => Some(4),
            InvokeInterface | InvokeDynamic | GotoW | JsrW => Some(5),
            _ => Some(1),
        }
    }

    /// Branches carrying a signed 16-bit offset relative to the opcode.
    pub const fn is_short_branch(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            IfEq | IfNe
                | IfLt
                | IfGe
                | IfGt
                | IfLe
                | IfIcmpeq
                | IfIcmpne
                | IfIcmplt
                | IfIcmpge
                | IfIcmpgt
                | IfIcmple
                | IfAcmpEq
                | IfAcmpNe
                | Goto
                | Jsr
                | Ifnull
                | Ifnonnull
        )
    }

    pub const fn is_wide_branch(self) -> bool {
        matches!(self, Opcode::GotoW | Opcode::JsrW)
    }

    pub const fn is_switch(self) -> bool {
        matches!(self, Opcode::Tableswitch | Opcode::Lookupswitch)
    }

    /// Execution never falls through to the next instruction.
    pub const fn ends_flow(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            Goto | GotoW
                | Ret
                | Tableswitch
                | Lookupswitch
                | Ireturn
                | Lreturn
                | Freturn
                | Dreturn
                | Areturn
                | Return
                | Athrow
        )
    }

    pub const fn is_invoke(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            InvokeVirtual | InvokeSpecial | InvokeStatic | InvokeInterface | InvokeDynamic
        )
    }

    pub fn mnemonic(self) -> String {
        format!("{:?}", self).to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_from_byte() {
        assert_eq!(Opcode::try_from(0x2a).unwrap(), Opcode::Aload0);
        assert_eq!(Opcode::try_from(0xc7).unwrap(), Opcode::Ifnonnull);
        assert!(Opcode::try_from(0xcb).is_err());
        assert_eq!(u8::from(Opcode::DupX1), 0x5a);
    }

    #[test]
    fn sizes_and_branch_classes() {
        assert_eq!(Opcode::Ifnonnull.fixed_size(), Some(3));
        assert_eq!(Opcode::InvokeInterface.fixed_size(), Some(5));
        assert_eq!(Opcode::Lookupswitch.fixed_size(), None);
        assert!(Opcode::Ifnonnull.is_short_branch());
        assert!(Opcode::GotoW.is_wide_branch());
        assert!(Opcode::Athrow.ends_flow());
        assert!(!Opcode::Jsr.ends_flow());
        assert_eq!(Opcode::DupX1.mnemonic(), "dupx1");
    }
}
