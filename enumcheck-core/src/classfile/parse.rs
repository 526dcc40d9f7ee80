//! Class structure parsing: versions, access flags, fields, methods and the
//! `Code` attribute with its line-number table.

use super::constpool::ConstantPool;
use super::reader::ByteReader;
use super::{ClassFormatError, ACC_ENUM, ACC_INTERFACE, ACC_STATIC};

const MAGIC: u32 = 0xCAFE_BABE;

/// A field declaration (name and descriptor; the detector only needs names).
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
}

/// One entry of a `LineNumberTable` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumber {
    pub start_pc: u16,
    pub line: u16,
}

/// The `Code` attribute of a method.
#[derive(Debug, Clone)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub bytes: Vec<u8>,
    pub line_numbers: Vec<LineNumber>,
}

impl CodeAttribute {
    /// Source line for a bytecode offset: the last table entry at or before
    /// the offset, `None` when the class was compiled without line info.
    pub fn line_for(&self, offset: u32) -> Option<u32> {
        self.line_numbers
            .iter()
            .filter(|ln| u32::from(ln.start_pc) <= offset)
            .max_by_key(|ln| ln.start_pc)
            .map(|ln| u32::from(ln.line))
    }
}

/// A method declaration with its code, when present (abstract and native
/// methods have none).
#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub code: Option<CodeAttribute>,
}

impl MethodInfo {
    pub fn is_static(&self) -> bool {
        self.access_flags & ACC_STATIC != 0
    }
}

/// A parsed class file.
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: u16,
    /// Binary name, e.g. `com/example/Holder`
    pub name: String,
    pub super_name: Option<String>,
    /// Binary names of directly implemented interfaces
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub pool: ConstantPool,
}

impl ClassFile {
    pub fn is_enum(&self) -> bool {
        self.access_flags & ACC_ENUM != 0
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags & ACC_INTERFACE != 0
    }

    /// Parse a complete class file from raw bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, ClassFormatError> {
        let mut r = ByteReader::new(bytes);

        let magic = r.u32()?;
        if magic != MAGIC {
            return Err(ClassFormatError::at(0, "bad magic number"));
        }
        let minor_version = r.u16()?;
        let major_version = r.u16()?;

        let pool = ConstantPool::parse(&mut r)?;

        let access_flags = r.u16()?;
        let this_class = r.u16()?;
        let name = pool
            .class_name(this_class)
            .ok_or_else(|| ClassFormatError::at(r.position(), "bad this_class reference"))?
            .to_string();
        let super_class = r.u16()?;
        let super_name = if super_class == 0 {
            None
        } else {
            Some(
                pool.class_name(super_class)
                    .ok_or_else(|| ClassFormatError::at(r.position(), "bad super_class reference"))?
                    .to_string(),
            )
        };

        let interface_count = r.u16()? as usize;
        let mut interfaces = Vec::with_capacity(interface_count);
        for _ in 0..interface_count {
            let index = r.u16()?;
            let iface = pool
                .class_name(index)
                .ok_or_else(|| ClassFormatError::at(r.position(), "bad interface reference"))?;
            interfaces.push(iface.to_string());
        }

        let field_count = r.u16()? as usize;
        let mut fields = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            fields.push(parse_field(&mut r, &pool)?);
        }

        let method_count = r.u16()? as usize;
        let mut methods = Vec::with_capacity(method_count);
        for _ in 0..method_count {
            methods.push(parse_method(&mut r, &pool)?);
        }

        // Trailing class attributes are irrelevant here
        skip_attributes(&mut r)?;

        Ok(Self {
            minor_version,
            major_version,
            access_flags,
            name,
            super_name,
            interfaces,
            fields,
            methods,
            pool,
        })
    }
}

fn member_header(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<(u16, String, String), ClassFormatError> {
    let access_flags = r.u16()?;
    let name_index = r.u16()?;
    let desc_index = r.u16()?;
    let name = pool
        .utf8(name_index)
        .ok_or_else(|| ClassFormatError::at(r.position(), "bad member name reference"))?
        .to_string();
    let descriptor = pool
        .utf8(desc_index)
        .ok_or_else(|| ClassFormatError::at(r.position(), "bad member descriptor reference"))?
        .to_string();
    Ok((access_flags, name, descriptor))
}

fn parse_field(r: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<FieldInfo, ClassFormatError> {
    let (access_flags, name, descriptor) = member_header(r, pool)?;
    skip_attributes(r)?;
    Ok(FieldInfo {
        access_flags,
        name,
        descriptor,
    })
}

fn parse_method(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<MethodInfo, ClassFormatError> {
    let (access_flags, name, descriptor) = member_header(r, pool)?;

    let mut code = None;
    let attribute_count = r.u16()? as usize;
    for _ in 0..attribute_count {
        let name_index = r.u16()?;
        let length = r.u32()? as usize;
        if pool.utf8(name_index) == Some("Code") {
            code = Some(parse_code(r, pool)?);
        } else {
            r.skip(length)?;
        }
    }

    Ok(MethodInfo {
        access_flags,
        name,
        descriptor,
        code,
    })
}

fn parse_code(
    r: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<CodeAttribute, ClassFormatError> {
    let max_stack = r.u16()?;
    let max_locals = r.u16()?;
    let code_length = r.u32()? as usize;
    let bytes = r.take(code_length)?.to_vec();

    // Exception table
    let exception_count = r.u16()? as usize;
    r.skip(exception_count * 8)?;

    let mut line_numbers = Vec::new();
    let attribute_count = r.u16()? as usize;
    for _ in 0..attribute_count {
        let name_index = r.u16()?;
        let length = r.u32()? as usize;
        if pool.utf8(name_index) == Some("LineNumberTable") {
            let entry_count = r.u16()? as usize;
            for _ in 0..entry_count {
                line_numbers.push(LineNumber {
                    start_pc: r.u16()?,
                    line: r.u16()?,
                });
            }
        } else {
            r.skip(length)?;
        }
    }

    Ok(CodeAttribute {
        max_stack,
        max_locals,
        bytes,
        line_numbers,
    })
}

fn skip_attributes(r: &mut ByteReader<'_>) -> Result<(), ClassFormatError> {
    let count = r.u16()? as usize;
    for _ in 0..count {
        r.skip(2)?; // name index
        let length = r.u32()? as usize;
        r.skip(length)?;
    }
    Ok(())
}
