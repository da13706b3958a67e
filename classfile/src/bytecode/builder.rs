use crate::bytecode::opcode::Opcode;
use crate::constant::pool::ConstantPool;
use crate::error::ConstructionErr;
use hotfield_common::jtype::PrimitiveType;

/// Appends instructions to a code fragment. Constant pool entries are interned into
/// the pool passed to each call, which must be the pool of the class the fragment
/// ends up in.
#[derive(Debug, Default, Clone)]
pub struct Bytecode {
    code: Vec<u8>,
}

impl Bytecode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.code
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.code
    }

    pub fn op(&mut self, opcode: Opcode) -> &mut Self {
        self.code.push(opcode.into());
        self
    }

    fn op_u16(&mut self, opcode: Opcode, operand: u16) -> &mut Self {
        self.code.push(opcode.into());
        self.code.extend_from_slice(&operand.to_be_bytes());
        self
    }

    pub fn aload(&mut self, index: u16) -> &mut Self {
        match index {
            0 => self.op(Opcode::Aload0),
            1 => self.op(Opcode::Aload1),
            2 => self.op(Opcode::Aload2),
            3 => self.op(Opcode::Aload3),
            4..=255 => {
                self.code.extend_from_slice(&[Opcode::Aload.into(), index as u8]);
                self
            }
            _ => {
                self.code
                    .extend_from_slice(&[Opcode::Wide.into(), Opcode::Aload.into()]);
                self.code.extend_from_slice(&index.to_be_bytes());
                self
            }
        }
    }

    /// Pushes `value` with the shortest encoding available.
    pub fn push_int(&mut self, cp: &mut ConstantPool, value: i32) -> Result<&mut Self, ConstructionErr> {
        let this = match value {
            -1 => self.op(Opcode::IconstM1),
            0 => self.op(Opcode::Iconst0),
            1 => self.op(Opcode::Iconst1),
            2 => self.op(Opcode::Iconst2),
            3 => self.op(Opcode::Iconst3),
            4 => self.op(Opcode::Iconst4),
            5 => self.op(Opcode::Iconst5),
            v if i8::try_from(v).is_ok() => {
                self.code.extend_from_slice(&[Opcode::Bipush.into(), v as i8 as u8]);
                self
            }
            v if i16::try_from(v).is_ok() => self.op_u16(Opcode::Sipush, v as i16 as u16),
            v => {
                let index = cp.add_integer(v)?;
                match u8::try_from(index) {
                    Ok(short) => {
                        self.code.extend_from_slice(&[Opcode::Ldc.into(), short]);
                        self
                    }
                    Err(_) => self.op_u16(Opcode::LdcW, index),
                }
            }
        };
        Ok(this)
    }

    /// Pushes the zero value of `primitive`; one slot for narrow types, two for wide ones.
    pub fn push_zero(&mut self, primitive: PrimitiveType) -> &mut Self {
        match primitive {
            PrimitiveType::Long => self.op(Opcode::Lconst0),
            PrimitiveType::Float => self.op(Opcode::Fconst0),
            PrimitiveType::Double => self.op(Opcode::Dconst0),
            _ => self.op(Opcode::Iconst0),
        }
    }

    pub fn getfield(
        &mut self,
        cp: &mut ConstantPool,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<&mut Self, ConstructionErr> {
        let index = cp.add_fieldref(owner, name, descriptor)?;
        Ok(self.op_u16(Opcode::Getfield, index))
    }

    pub fn putfield(
        &mut self,
        cp: &mut ConstantPool,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<&mut Self, ConstructionErr> {
        let index = cp.add_fieldref(owner, name, descriptor)?;
        Ok(self.op_u16(Opcode::Putfield, index))
    }

    pub fn getstatic(
        &mut self,
        cp: &mut ConstantPool,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<&mut Self, ConstructionErr> {
        let index = cp.add_fieldref(owner, name, descriptor)?;
        Ok(self.op_u16(Opcode::Getstatic, index))
    }

    pub fn putstatic(
        &mut self,
        cp: &mut ConstantPool,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<&mut Self, ConstructionErr> {
        let index = cp.add_fieldref(owner, name, descriptor)?;
        Ok(self.op_u16(Opcode::Putstatic, index))
    }

    pub fn invokestatic(
        &mut self,
        cp: &mut ConstantPool,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<&mut Self, ConstructionErr> {
        let index = cp.add_methodref(owner, name, descriptor)?;
        Ok(self.op_u16(Opcode::InvokeStatic, index))
    }

    pub fn invokespecial(
        &mut self,
        cp: &mut ConstantPool,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<&mut Self, ConstructionErr> {
        let index = cp.add_methodref(owner, name, descriptor)?;
        Ok(self.op_u16(Opcode::InvokeSpecial, index))
    }

    pub fn anewarray(&mut self, cp: &mut ConstantPool, element_class: &str) -> Result<&mut Self, ConstructionErr> {
        let index = cp.add_class(element_class)?;
        Ok(self.op_u16(Opcode::Anewarray, index))
    }

    /// Emits `opcode` with a zero offset and returns the instruction's position for
    /// [`Bytecode::patch_branch`].
    pub fn branch(&mut self, opcode: Opcode) -> usize {
        let at = self.code.len();
        self.op_u16(opcode, 0);
        at
    }

    pub fn patch_branch(&mut self, at: usize, target: usize) -> Result<(), ConstructionErr> {
        let relative = target as i64 - at as i64;
        let offset = i16::try_from(relative).map_err(|_| ConstructionErr::BranchOffsetOverflow {
            offset: at,
            target: target as i64,
        })?;
        let [hi, lo] = offset.to_be_bytes();
        match self.code.get_mut(at + 1..at + 3) {
            Some(operand) => {
                operand[0] = hi;
                operand[1] = lo;
                Ok(())
            }
            None => Err(ConstructionErr::InvalidInsertionPoint(at)),
        }
    }

    /// Pads with `nop` until the length is a multiple of `alignment`.
    pub fn pad_to(&mut self, alignment: usize) -> &mut Self {
        while self.code.len() % alignment != 0 {
            self.op(Opcode::Nop);
        }
        self
    }
}
