//! Class-file parsing: just enough of the JVM class format to drive the
//! detector.
//!
//! The module exposes:
//! - [`ClassFile`]: parsed class structure with constant pool, fields and
//!   methods (including `Code` attributes and line-number tables)
//! - [`ConstantPool`]: tagged constant-pool entries with typed getters
//! - [`decode`]: the bytecode decoder producing offset-addressed
//!   [`Instruction`]s with a closed operand category ([`InstrKind`])
//! - [`MethodDescriptor`]: parameter/return parsing for stack-effect math
//!
//! Everything not needed by the analysis (generic signatures, annotations,
//! stack map tables, ...) is skipped by attribute length.

mod constpool;
mod descriptor;
mod instr;
pub mod opcode;
mod parse;
mod reader;

use thiserror::Error;

pub use constpool::{Constant, ConstantPool, MemberRef};
pub use descriptor::{parse_method_descriptor, MethodDescriptor};
pub use instr::{decode, FieldOp, InstrKind, Instruction, InvokeKind};
pub use parse::{ClassFile, CodeAttribute, FieldInfo, LineNumber, MethodInfo};
pub use reader::ByteReader;

/// Class-file access flag: declared as an enum type.
pub const ACC_ENUM: u16 = 0x4000;
/// Class-file access flag: interface.
pub const ACC_INTERFACE: u16 = 0x0200;
/// Method/field access flag: static.
pub const ACC_STATIC: u16 = 0x0008;

/// Error raised while decoding a class file or a method's code stream.
///
/// Carries the byte offset where decoding stopped so a malformed file can be
/// located in a hex dump.
#[derive(Debug, Error)]
#[error("{message} (at byte offset {offset})")]
pub struct ClassFormatError {
    pub offset: usize,
    pub message: String,
}

impl ClassFormatError {
    /// Create an error at the given byte offset.
    pub fn at(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}
