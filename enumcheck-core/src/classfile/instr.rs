//! Bytecode decoding into offset-addressed instructions.
//!
//! The decoder resolves every operand the analysis needs up front: call
//! targets, field names, local slot indices (including `wide` forms), branch
//! targets and pushed-constant types. Everything else becomes [`InstrKind::Plain`]
//! and is interpreted, if at all, by the stack simulation's per-opcode table.

use super::opcode as op;
use super::reader::ByteReader;
use super::{ClassFormatError, ConstantPool};

/// Call dispatch kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    Virtual,
    Special,
    Static,
    Interface,
    Dynamic,
}

/// Field access kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    GetField,
    PutField,
    GetStatic,
    PutStatic,
}

/// Decoded operand category; a closed set matching what the analysis
/// dispatches on.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrKind {
    /// `invokevirtual`/`invokespecial`/`invokestatic`/`invokeinterface`/`invokedynamic`
    Invoke {
        kind: InvokeKind,
        owner: String,
        name: String,
        descriptor: String,
    },
    /// `getfield`/`putfield`/`getstatic`/`putstatic`
    Field {
        op: FieldOp,
        owner: String,
        name: String,
        descriptor: String,
    },
    /// Any local load, slot resolved (shorthand and `wide` forms included)
    LocalLoad { slot: u16 },
    /// Any local store, slot resolved
    LocalStore { slot: u16 },
    /// `ldc`/`ldc_w`/`ldc2_w`; the signature of the pushed constant
    Ldc { signature: String },
    /// `new`
    New { class: String },
    /// `checkcast`
    CheckCast { class: String },
    /// Conditional or unconditional branch
    Branch {
        target: u32,
        pops: u8,
        unconditional: bool,
    },
    /// `tableswitch`/`lookupswitch` (pops the key)
    Switch,
    /// `newarray`/`anewarray`; the array signature pushed
    NewArray { signature: String },
    /// `multianewarray`
    MultiNewArray { dims: u8, signature: String },
    /// `iinc` (no stack effect)
    Iinc,
    /// Anything else; stack effect keyed on the opcode byte
    Plain,
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub offset: u32,
    pub opcode: u8,
    pub kind: InstrKind,
}

fn invoke(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool,
    kind: InvokeKind,
    offset: usize,
) -> Result<InstrKind, ClassFormatError> {
    let index = r.u16()?;
    if matches!(kind, InvokeKind::Interface | InvokeKind::Dynamic) {
        // count+0 / two reserved zero bytes
        r.skip(2)?;
    }
    let member = pool
        .member_ref(index)
        .ok_or_else(|| ClassFormatError::at(offset, format!("bad call ref #{}", index)))?;
    Ok(InstrKind::Invoke {
        kind,
        owner: member.owner.to_string(),
        name: member.name.to_string(),
        descriptor: member.descriptor.to_string(),
    })
}

fn field_access(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool,
    fop: FieldOp,
    offset: usize,
) -> Result<InstrKind, ClassFormatError> {
    let index = r.u16()?;
    let member = pool
        .member_ref(index)
        .ok_or_else(|| ClassFormatError::at(offset, format!("bad field ref #{}", index)))?;
    Ok(InstrKind::Field {
        op: fop,
        owner: member.owner.to_string(),
        name: member.name.to_string(),
        descriptor: member.descriptor.to_string(),
    })
}

fn ldc_signature(pool: &ConstantPool, index: u16) -> String {
    use super::Constant;
    match pool.get(index) {
        Some(Constant::Integer(_)) => "I".to_string(),
        Some(Constant::Float(_)) => "F".to_string(),
        Some(Constant::Long(_)) => "J".to_string(),
        Some(Constant::Double(_)) => "D".to_string(),
        Some(Constant::String(_)) => "Ljava/lang/String;".to_string(),
        Some(Constant::Class(_)) => "Ljava/lang/Class;".to_string(),
        Some(Constant::MethodType(_)) => "Ljava/lang/invoke/MethodType;".to_string(),
        Some(Constant::MethodHandle(_, _)) => "Ljava/lang/invoke/MethodHandle;".to_string(),
        Some(Constant::Dynamic(_, _)) => pool
            .member_ref(index)
            .map(|m| m.descriptor.to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn newarray_signature(atype: u8) -> &'static str {
    match atype {
        4 => "[Z",
        5 => "[C",
        6 => "[F",
        7 => "[D",
        8 => "[B",
        9 => "[S",
        10 => "[I",
        11 => "[J",
        _ => "[",
    }
}

fn branch_target(offset: usize, delta: i64) -> u32 {
    (offset as i64 + delta) as u32
}

/// Decode one method's code bytes.
///
/// Offsets are relative to the start of the code array, as in the class-file
/// format. An unknown opcode or a truncated operand is an error; the caller
/// skips the method and keeps going.
pub fn decode(code: &[u8], pool: &ConstantPool) -> Result<Vec<Instruction>, ClassFormatError> {
    let mut r = ByteReader::new(code);
    let mut instructions = Vec::new();

    while r.remaining() > 0 {
        let offset = r.position();
        let opcode = r.u8()?;

        let kind = match opcode {
            op::BIPUSH => {
                r.skip(1)?;
                InstrKind::Plain
            }
            op::SIPUSH | op::INSTANCEOF => {
                r.skip(2)?;
                InstrKind::Plain
            }
            op::LDC => {
                let index = r.u8()? as u16;
                InstrKind::Ldc {
                    signature: ldc_signature(pool, index),
                }
            }
            op::LDC_W | op::LDC2_W => {
                let index = r.u16()?;
                InstrKind::Ldc {
                    signature: ldc_signature(pool, index),
                }
            }
            op::ILOAD..=op::ALOAD => {
                let slot = r.u8()? as u16;
                InstrKind::LocalLoad { slot }
            }
            0x1a..=0x2d => InstrKind::LocalLoad {
                slot: u16::from((opcode - op::ILOAD_0) % 4),
            },
            op::ISTORE..=op::ASTORE => {
                let slot = r.u8()? as u16;
                InstrKind::LocalStore { slot }
            }
            0x3b..=0x4e => InstrKind::LocalStore {
                slot: u16::from((opcode - op::ISTORE_0) % 4),
            },
            op::IINC => {
                r.skip(2)?;
                InstrKind::Iinc
            }
            op::IFEQ..=op::IFLE | op::IFNULL | op::IFNONNULL => {
                let delta = r.i16()? as i64;
                InstrKind::Branch {
                    target: branch_target(offset, delta),
                    pops: 1,
                    unconditional: false,
                }
            }
            op::IF_ICMPEQ..=op::IF_ACMPNE => {
                let delta = r.i16()? as i64;
                InstrKind::Branch {
                    target: branch_target(offset, delta),
                    pops: 2,
                    unconditional: false,
                }
            }
            op::GOTO => {
                let delta = r.i16()? as i64;
                InstrKind::Branch {
                    target: branch_target(offset, delta),
                    pops: 0,
                    unconditional: true,
                }
            }
            op::GOTO_W => {
                let delta = r.i32()? as i64;
                InstrKind::Branch {
                    target: branch_target(offset, delta),
                    pops: 0,
                    unconditional: true,
                }
            }
            op::JSR => {
                r.skip(2)?;
                InstrKind::Plain
            }
            op::JSR_W => {
                r.skip(4)?;
                InstrKind::Plain
            }
            op::RET => {
                r.skip(1)?;
                InstrKind::Plain
            }
            op::TABLESWITCH => {
                let pad = (4 - r.position() % 4) % 4;
                r.skip(pad)?;
                r.skip(4)?; // default
                let low = r.i32()?;
                let high = r.i32()?;
                if high < low {
                    return Err(ClassFormatError::at(offset, "tableswitch high < low"));
                }
                let count = (high as i64 - low as i64 + 1) as usize;
                r.skip(count * 4)?;
                InstrKind::Switch
            }
            op::LOOKUPSWITCH => {
                let pad = (4 - r.position() % 4) % 4;
                r.skip(pad)?;
                r.skip(4)?; // default
                let npairs = r.i32()?;
                if npairs < 0 {
                    return Err(ClassFormatError::at(offset, "lookupswitch negative npairs"));
                }
                r.skip(npairs as usize * 8)?;
                InstrKind::Switch
            }
            op::GETSTATIC => field_access(&mut r, pool, FieldOp::GetStatic, offset)?,
            op::PUTSTATIC => field_access(&mut r, pool, FieldOp::PutStatic, offset)?,
            op::GETFIELD => field_access(&mut r, pool, FieldOp::GetField, offset)?,
            op::PUTFIELD => field_access(&mut r, pool, FieldOp::PutField, offset)?,
            op::INVOKEVIRTUAL => invoke(&mut r, pool, InvokeKind::Virtual, offset)?,
            op::INVOKESPECIAL => invoke(&mut r, pool, InvokeKind::Special, offset)?,
            op::INVOKESTATIC => invoke(&mut r, pool, InvokeKind::Static, offset)?,
            op::INVOKEINTERFACE => invoke(&mut r, pool, InvokeKind::Interface, offset)?,
            op::INVOKEDYNAMIC => invoke(&mut r, pool, InvokeKind::Dynamic, offset)?,
            op::NEW => {
                let index = r.u16()?;
                let class = pool
                    .class_name(index)
                    .ok_or_else(|| ClassFormatError::at(offset, format!("bad class ref #{}", index)))?;
                InstrKind::New {
                    class: class.to_string(),
                }
            }
            op::NEWARRAY => {
                let atype = r.u8()?;
                InstrKind::NewArray {
                    signature: newarray_signature(atype).to_string(),
                }
            }
            op::ANEWARRAY => {
                let index = r.u16()?;
                let class = pool
                    .class_name(index)
                    .ok_or_else(|| ClassFormatError::at(offset, format!("bad class ref #{}", index)))?;
                InstrKind::NewArray {
                    signature: format!("[L{};", class),
                }
            }
            op::CHECKCAST => {
                let index = r.u16()?;
                let class = pool
                    .class_name(index)
                    .ok_or_else(|| ClassFormatError::at(offset, format!("bad class ref #{}", index)))?;
                InstrKind::CheckCast {
                    class: class.to_string(),
                }
            }
            op::MULTIANEWARRAY => {
                let index = r.u16()?;
                let dims = r.u8()?;
                let class = pool
                    .class_name(index)
                    .ok_or_else(|| ClassFormatError::at(offset, format!("bad class ref #{}", index)))?;
                InstrKind::MultiNewArray {
                    dims,
                    signature: class.to_string(),
                }
            }
            op::WIDE => {
                let wide_op = r.u8()?;
                match wide_op {
                    op::ILOAD..=op::ALOAD => InstrKind::LocalLoad { slot: r.u16()? },
                    op::ISTORE..=op::ASTORE => InstrKind::LocalStore { slot: r.u16()? },
                    op::IINC => {
                        r.skip(4)?;
                        InstrKind::Iinc
                    }
                    op::RET => {
                        r.skip(2)?;
                        InstrKind::Plain
                    }
                    other => {
                        return Err(ClassFormatError::at(
                            offset,
                            format!("invalid wide target opcode {:#04x}", other),
                        ))
                    }
                }
            }
            // Single-byte instructions: constants, array ops, stack ops,
            // arithmetic, conversions, comparisons, returns, athrow, monitors
            0x00..=0x0f
            | op::IALOAD..=op::SALOAD
            | op::IASTORE..=op::SASTORE
            | op::POP..=op::SWAP
            | op::IADD..=op::LXOR
            | op::I2L..=op::DCMPG
            | op::IRETURN..=op::RETURN
            | op::ARRAYLENGTH
            | op::ATHROW
            | op::MONITORENTER
            | op::MONITOREXIT => InstrKind::Plain,
            other => {
                return Err(ClassFormatError::at(
                    offset,
                    format!("unknown opcode {:#04x}", other),
                ))
            }
        };

        instructions.push(Instruction {
            offset: offset as u32,
            opcode,
            kind,
        });
    }

    Ok(instructions)
}
