use crate::attribute::code::CodeAttribute;
use crate::bytecode::opcode::Opcode;
use crate::bytecode::{Instruction, decode_at, jump_targets, u8_at, u16_at};
use crate::constant::ConstantInfo;
use crate::constant::pool::ConstantPool;
use crate::error::ClassFormatErr;
use hotfield_common::descriptor::MethodDescriptor;
use hotfield_common::jtype::is_wide_descriptor;

fn field_slots(descriptor: &str) -> i32 {
    if is_wide_descriptor(descriptor) { 2 } else { 1 }
}

fn invoke_delta(descriptor: &str, has_receiver: bool) -> Result<i32, ClassFormatErr> {
    let parsed = MethodDescriptor::try_from(descriptor)?;
    Ok(parsed.ret.slot_width() as i32 - parsed.param_slots() as i32 - has_receiver as i32)
}

/// Net operand stack change of one instruction. Jump targets of `jsr` see one extra
/// slot for the return address; that is handled by the caller.
fn stack_delta(code: &[u8], insn: &Instruction, cp: &ConstantPool) -> Result<i32, ClassFormatErr> {
    use Opcode::*;
    let at = insn.offset;
    Ok(match insn.opcode {
        Nop | Iinc | Goto | GotoW | Ret | Return | Swap | Ineg | Fneg | Lneg | Dneg | I2f
        | L2d | F2i | D2l | I2b | I2c | I2s | Newarray | Anewarray | ArrayLength | Checkcast
        | Instanceof | Laload | Daload | Jsr | JsrW | Breakpoint | Impdep1 | Impdep2 => 0,
        AconstNull | IconstM1 | Iconst0 | Iconst1 | Iconst2 | Iconst3 | Iconst4 | Iconst5
        | Fconst0 | Fconst1 | Fconst2 | Bipush | Sipush | Iload | Fload | Aload | Iload0
        | Iload1 | Iload2 | Iload3 | Fload0 | Fload1 | Fload2 | Fload3 | Aload0 | Aload1
        | Aload2 | Aload3 | Dup | DupX1 | DupX2 | I2l | I2d | F2l | F2d | New => 1,
        Lconst0 | Lconst1 | Dconst0 | Dconst1 | Ldc2W | Lload | Dload | Lload0 | Lload1
        | Lload2 | Lload3 | Dload0 | Dload1 | Dload2 | Dload3 | Dup2 | Dup2X1 | Dup2X2 => 2,
        Ldc => ldc_slots(cp, u8_at(code, at + 1)? as u16)?,
        LdcW => ldc_slots(cp, u16_at(code, at + 1)?)?,
        Iaload | Faload | Aaload | Baload | Caload | Saload | Istore | Fstore | Astore
        | Istore0 | Istore1 | Istore2 | Istore3 | Fstore0 | Fstore1 | Fstore2 | Fstore3
        | Astore0 | Astore1 | Astore2 | Astore3 | Pop | Iadd | Fadd | Isub | Fsub | Imul
        | Fmul | Idiv | Fdiv | Irem | Frem | Ishl | Ishr | Iushr | Lshl | Lshr | Lushr | Iand
        | Ior | Ixor | L2i | L2f | D2i | D2f | Fcmpl | Fcmpg | IfEq | IfNe | IfLt | IfGe
        | IfGt | IfLe | Ifnull | Ifnonnull | Tableswitch | Lookupswitch | Ireturn | Freturn
        | Areturn | Athrow | Monitorenter | Monitorexit => -1,
        Lstore | Dstore | Lstore0 | Lstore1 | Lstore2 | Lstore3 | Dstore0 | Dstore1
        | Dstore2 | Dstore3 | Pop2 | Ladd | Dadd | Lsub | Dsub | Lmul | Dmul | Ldiv | Ddiv
        | Lrem | Drem | Land | Lor | Lxor | IfIcmpeq | IfIcmpne | IfIcmplt | IfIcmpge
        | IfIcmpgt | IfIcmple | IfAcmpEq | IfAcmpNe | Lreturn | Dreturn => -2,
        Iastore | Fastore | Aastore | Bastore | Castore | Sastore | Lcmp | Dcmpl | Dcmpg => -3,
        Lastore | Dastore => -4,
        Getstatic => field_slots(cp.get_member_ref(u16_at(code, at + 1)?)?.descriptor),
        Putstatic => -field_slots(cp.get_member_ref(u16_at(code, at + 1)?)?.descriptor),
        Getfield => field_slots(cp.get_member_ref(u16_at(code, at + 1)?)?.descriptor) - 1,
        Putfield => -field_slots(cp.get_member_ref(u16_at(code, at + 1)?)?.descriptor) - 1,
        InvokeVirtual | InvokeSpecial | InvokeInterface => {
            invoke_delta(cp.get_member_ref(u16_at(code, at + 1)?)?.descriptor, true)?
        }
        InvokeStatic => invoke_delta(cp.get_member_ref(u16_at(code, at + 1)?)?.descriptor, false)?,
        InvokeDynamic => invoke_delta(cp.get_dynamic_descriptor(u16_at(code, at + 1)?)?, false)?,
        Multianewarray => 1 - u8_at(code, at + 3)? as i32,
        Wide => match Opcode::try_from(u8_at(code, at + 1)?) {
            Ok(Iload | Fload | Aload) => 1,
            Ok(Lload | Dload) => 2,
            Ok(Istore | Fstore | Astore) => -1,
            Ok(Lstore | Dstore) => -2,
            Ok(_) => 0,
            Err(_) => {
                return Err(ClassFormatErr::InvalidOpcode {
                    offset: at + 1,
                    opcode: code[at + 1],
                });
            }
        },
    })
}

fn ldc_slots(cp: &ConstantPool, index: u16) -> Result<i32, ClassFormatErr> {
    Ok(match cp.get(index)? {
        ConstantInfo::Long(_) | ConstantInfo::Double(_) => 2,
        ConstantInfo::Dynamic(d) => {
            let (_, descriptor) = cp.get_name_and_type(d.name_and_type_index)?;
            field_slots(descriptor)
        }
        _ => 1,
    })
}

/// Deepest operand stack reached on any path through `code`, following branches,
/// switch tables and exception handlers.
pub fn compute_max_stack(code: &CodeAttribute, cp: &ConstantPool) -> Result<u16, ClassFormatErr> {
    let bytes = code.code.as_slice();
    let mut depth_at: Vec<Option<i32>> = vec![None; bytes.len()];
    let mut worklist: Vec<(usize, i32)> = Vec::new();
    let mut max = 0i32;

    if !bytes.is_empty() {
        worklist.push((0, 0));
    }
    for handler in &code.exception_table {
        worklist.push((handler.handler_pc as usize, 1));
    }

    while let Some((offset, depth)) = worklist.pop() {
        match depth_at.get(offset) {
            None => return Err(ClassFormatErr::TruncatedInstruction { offset }),
            Some(Some(seen)) if *seen == depth => continue,
            Some(Some(_)) => return Err(ClassFormatErr::InconsistentStackDepth { offset }),
            Some(None) => depth_at[offset] = Some(depth),
        }
        max = max.max(depth);

        let insn = decode_at(bytes, offset)?;
        let after = depth + stack_delta(bytes, &insn, cp)?;
        if after < 0 {
            return Err(ClassFormatErr::NegativeStackDepth { offset });
        }
        max = max.max(after);

        let jumps_with = if matches!(insn.opcode, Opcode::Jsr | Opcode::JsrW) {
            after + 1
        } else {
            after
        };
        max = max.max(jumps_with);
        for target in jump_targets(bytes, &insn)? {
            worklist.push((target, jumps_with));
        }
        if !insn.opcode.ends_flow() && insn.next_offset() < bytes.len() {
            worklist.push((insn.next_offset(), after));
        }
    }
    Ok(max as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::code::ExceptionTableEntry;
    use rstest::rstest;

    fn max_of(code: Vec<u8>, cp: &ConstantPool) -> Result<u16, ClassFormatErr> {
        compute_max_stack(&CodeAttribute::new(0, 4, code), cp)
    }

    #[rstest]
    #[case(vec![0xb1], 0)]
    #[case(vec![0x09, 0x0a, 0x61, 0x58, 0xb1], 4)] // lconst_0 lconst_1 ladd pop2 return
    #[case(vec![0x2a, 0x59, 0x5a, 0x57, 0x57, 0x57, 0xb1], 3)] // aload_0 dup dup_x1 pop*3
    fn straight_line_depths(#[case] code: Vec<u8>, #[case] expected: u16) {
        assert_eq!(max_of(code, &ConstantPool::new()).unwrap(), expected);
    }

    #[test]
    fn invocation_uses_descriptor() {
        let mut cp = ConstantPool::new();
        let method = cp.add_methodref("java/lang/Math", "max", "(JJ)J").unwrap();
        let [hi, lo] = method.to_be_bytes();
        // lconst_0 lconst_1 invokestatic max (JJ)J  pop2 return
        let code = vec![0x09, 0x0a, 0xb8, hi, lo, 0x58, 0xb1];
        assert_eq!(max_of(code, &cp).unwrap(), 4);
    }

    #[test]
    fn branches_merge_with_equal_depths() {
        // iconst_0 ifeq +5 iconst_1 pop return
        let code = vec![0x03, 0x99, 0x00, 0x05, 0x04, 0x57, 0xb1];
        assert_eq!(max_of(code, &ConstantPool::new()).unwrap(), 1);
    }

    #[test]
    fn mismatched_merge_is_reported() {
        // iconst_0 iconst_0 ifeq +4 iconst_0 return: return is reached with one or two items
        let code = vec![0x03, 0x03, 0x99, 0x00, 0x04, 0x03, 0xb1];
        assert_eq!(
            max_of(code, &ConstantPool::new()),
            Err(ClassFormatErr::InconsistentStackDepth { offset: 6 })
        );
    }

    #[test]
    fn handlers_start_with_the_exception() {
        let mut code = CodeAttribute::new(0, 1, vec![0x00, 0xb1, 0x59, 0x57, 0xbf]);
        code.exception_table.push(ExceptionTableEntry {
            start_pc: 0,
            end_pc: 1,
            handler_pc: 2,
            catch_type: 0,
        });
        assert_eq!(compute_max_stack(&code, &ConstantPool::new()).unwrap(), 2);
    }

    #[test]
    fn underflow_is_reported() {
        assert_eq!(
            max_of(vec![0x57, 0xb1], &ConstantPool::new()),
            Err(ClassFormatErr::NegativeStackDepth { offset: 0 })
        );
    }
}
