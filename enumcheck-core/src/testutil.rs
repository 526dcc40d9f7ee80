//! Test support: assemble small in-memory classes with real code bytes.
//!
//! Tests drive the detector with the same decoded-instruction path as
//! production by emitting genuine bytecode against a shared constant pool.

use crate::classfile::{
    opcode as op, parse_method_descriptor, ClassFile, CodeAttribute, Constant, ConstantPool,
    FieldInfo, LineNumber, MethodInfo,
};
use crate::metadata::{ClassIndex, ClassMeta};

/// Fluent builder for one test class.
pub(crate) struct ClassBuilder {
    name: String,
    major_version: u16,
    access_flags: u16,
    pool: ConstantPool,
    fields: Vec<FieldInfo>,
    methods: Vec<MethodInfo>,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            major_version: 52,
            access_flags: 0x0001, // public
            pool: ConstantPool::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn major(mut self, version: u16) -> Self {
        self.major_version = version;
        self
    }

    pub fn field(mut self, name: &str, descriptor: &str) -> Self {
        self.fields.push(FieldInfo {
            access_flags: 0x0002, // private
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        });
        self
    }

    /// Add an instance method whose body is emitted by `build`.
    pub fn method(mut self, name: &str, descriptor: &str, build: impl FnOnce(&mut MethodAsm)) -> Self {
        let mut asm = MethodAsm::new(&mut self.pool);
        build(&mut asm);
        let code = asm.finish();
        self.methods.push(MethodInfo {
            access_flags: 0x0001,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            code: Some(code),
        });
        self
    }

    pub fn finish(self) -> ClassFile {
        ClassFile {
            minor_version: 0,
            major_version: self.major_version,
            access_flags: self.access_flags,
            name: self.name,
            super_name: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: self.fields,
            methods: self.methods,
            pool: self.pool,
        }
    }
}

/// Emits bytecode for one method body.
pub(crate) struct MethodAsm<'p> {
    pool: &'p mut ConstantPool,
    code: Vec<u8>,
    line_numbers: Vec<LineNumber>,
}

impl<'p> MethodAsm<'p> {
    fn new(pool: &'p mut ConstantPool) -> Self {
        Self {
            pool,
            code: Vec::new(),
            line_numbers: Vec::new(),
        }
    }

    /// Current bytecode offset.
    pub fn offset(&self) -> u16 {
        self.code.len() as u16
    }

    /// Record a line-number entry starting at the current offset.
    pub fn line(&mut self, line: u16) {
        self.line_numbers.push(LineNumber {
            start_pc: self.offset(),
            line,
        });
    }

    fn u16_operand(&mut self, value: u16) {
        self.code.extend_from_slice(&value.to_be_bytes());
    }

    pub fn op(&mut self, opcode: u8) {
        self.code.push(opcode);
    }

    pub fn aload(&mut self, slot: u8) {
        if slot <= 3 {
            self.op(op::ALOAD_0 + slot);
        } else {
            self.op(op::ALOAD);
            self.code.push(slot);
        }
    }

    pub fn astore(&mut self, slot: u8) {
        if slot <= 3 {
            self.op(op::ASTORE_0 + slot);
        } else {
            self.op(op::ASTORE);
            self.code.push(slot);
        }
    }

    pub fn aconst_null(&mut self) {
        self.op(op::ACONST_NULL);
    }

    pub fn iconst_0(&mut self) {
        self.op(op::ICONST_0);
    }

    pub fn dup(&mut self) {
        self.op(op::DUP);
    }

    pub fn pop(&mut self) {
        self.op(op::POP);
    }

    pub fn vreturn(&mut self) {
        self.op(op::RETURN);
    }

    pub fn new_(&mut self, class: &str) {
        let index = self.pool.class_index(class);
        self.op(op::NEW);
        self.u16_operand(index);
    }

    pub fn ldc_class(&mut self, class: &str) {
        let index = self.pool.class_index(class);
        self.op(op::LDC_W);
        self.u16_operand(index);
    }

    pub fn ldc_string(&mut self, value: &str) {
        let utf8 = self.pool.utf8_index(value);
        let index = self.pool.push(Constant::String(utf8));
        self.op(op::LDC_W);
        self.u16_operand(index);
    }

    pub fn invokespecial(&mut self, owner: &str, name: &str, descriptor: &str) {
        let index = self.pool.method_ref_index(owner, name, descriptor);
        self.op(op::INVOKESPECIAL);
        self.u16_operand(index);
    }

    pub fn invokestatic(&mut self, owner: &str, name: &str, descriptor: &str) {
        let index = self.pool.method_ref_index(owner, name, descriptor);
        self.op(op::INVOKESTATIC);
        self.u16_operand(index);
    }

    pub fn invokeinterface(&mut self, owner: &str, name: &str, descriptor: &str) {
        let index = self.pool.interface_method_ref_index(owner, name, descriptor);
        let slots = parse_method_descriptor(descriptor)
            .map(|d| d.param_slots())
            .unwrap_or(0);
        self.op(op::INVOKEINTERFACE);
        self.u16_operand(index);
        self.code.push(slots as u8 + 1);
        self.code.push(0);
    }

    pub fn getfield(&mut self, owner: &str, name: &str, descriptor: &str) {
        let index = self.pool.field_ref_index(owner, name, descriptor);
        self.op(op::GETFIELD);
        self.u16_operand(index);
    }

    pub fn putfield(&mut self, owner: &str, name: &str, descriptor: &str) {
        let index = self.pool.field_ref_index(owner, name, descriptor);
        self.op(op::PUTFIELD);
        self.u16_operand(index);
    }

    pub fn ifeq(&mut self, delta: i16) {
        self.op(op::IFEQ);
        self.u16_operand(delta as u16);
    }

    pub fn goto(&mut self, delta: i16) {
        self.op(op::GOTO);
        self.u16_operand(delta as u16);
    }

    fn finish(self) -> CodeAttribute {
        CodeAttribute {
            max_stack: 8,
            max_locals: 8,
            bytes: self.code,
            line_numbers: self.line_numbers,
        }
    }
}

/// A metadata index with the enum shapes the scenarios need:
/// - `com/example/Color`: enum, no interfaces
/// - `com/example/Labeled`: enum implementing one interface
/// - `com/example/Plain`: an ordinary class
pub(crate) fn test_index() -> ClassIndex {
    let mut index = ClassIndex::new();
    index.insert_meta(
        "com/example/Color",
        ClassMeta {
            is_enum: true,
            interface_count: 0,
        },
    );
    index.insert_meta(
        "com/example/Labeled",
        ClassMeta {
            is_enum: true,
            interface_count: 1,
        },
    );
    index.insert_meta(
        "com/example/Plain",
        ClassMeta {
            is_enum: false,
            interface_count: 0,
        },
    );
    index
}
