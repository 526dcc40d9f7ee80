//! Constant pool entries and typed lookups for Java class files.

use super::reader::ByteReader;
use super::ClassFormatError;

/// A single constant-pool entry (JVMS 4.4).
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
    MethodHandle(u8, u16),
    MethodType(u16),
    Dynamic(u16, u16),
    InvokeDynamic(u16, u16),
    Module(u16),
    Package(u16),
}

mod constant_tags {
    pub const CONSTANT_UTF8: u8 = 1;
    pub const CONSTANT_INTEGER: u8 = 3;
    pub const CONSTANT_FLOAT: u8 = 4;
    pub const CONSTANT_LONG: u8 = 5;
    pub const CONSTANT_DOUBLE: u8 = 6;
    pub const CONSTANT_CLASS: u8 = 7;
    pub const CONSTANT_STRING: u8 = 8;
    pub const CONSTANT_FIELDREF: u8 = 9;
    pub const CONSTANT_METHODREF: u8 = 10;
    pub const CONSTANT_INTERFACEMETHODREF: u8 = 11;
    pub const CONSTANT_NAMEANDTYPE: u8 = 12;
    pub const CONSTANT_METHODHANDLE: u8 = 15;
    pub const CONSTANT_METHODTYPE: u8 = 16;
    pub const CONSTANT_DYNAMIC: u8 = 17;
    pub const CONSTANT_INVOKEDYNAMIC: u8 = 18;
    pub const CONSTANT_MODULE: u8 = 19;
    pub const CONSTANT_PACKAGE: u8 = 20;
}

/// A resolved member reference: owner class, member name, descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRef<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

/// The constant pool of one class.
///
/// Entries are 1-indexed as in the class-file format; `Long`/`Double`
/// occupy two indices, the second being a placeholder.
#[derive(Debug, Default, Clone)]
pub struct ConstantPool {
    entries: Vec<Option<Constant>>,
}

impl ConstantPool {
    /// An empty pool (entry 0 is always unusable).
    pub fn new() -> Self {
        Self {
            entries: vec![None],
        }
    }

    /// Parse a pool from the reader positioned at `constant_pool_count`.
    pub fn parse(r: &mut ByteReader<'_>) -> Result<Self, ClassFormatError> {
        use constant_tags::*;

        let count = r.u16()? as usize;
        let mut entries: Vec<Option<Constant>> = Vec::with_capacity(count);
        entries.push(None); // index 0 is reserved

        while entries.len() < count {
            let tag_offset = r.position();
            let tag = r.u8()?;
            let constant = match tag {
                CONSTANT_UTF8 => {
                    let len = r.u16()? as usize;
                    let bytes = r.take(len)?;
                    // Modified UTF-8 in practice; real compilers emit ASCII
                    // for the names and descriptors this tool inspects.
                    let s = String::from_utf8_lossy(bytes).into_owned();
                    Constant::Utf8(s)
                }
                CONSTANT_INTEGER => Constant::Integer(r.i32()?),
                CONSTANT_FLOAT => Constant::Float(f32::from_bits(r.u32()?)),
                CONSTANT_LONG => {
                    let hi = r.u32()? as u64;
                    let lo = r.u32()? as u64;
                    Constant::Long(((hi << 32) | lo) as i64)
                }
                CONSTANT_DOUBLE => {
                    let hi = r.u32()? as u64;
                    let lo = r.u32()? as u64;
                    Constant::Double(f64::from_bits((hi << 32) | lo))
                }
                CONSTANT_CLASS => Constant::Class(r.u16()?),
                CONSTANT_STRING => Constant::String(r.u16()?),
                CONSTANT_FIELDREF => Constant::FieldRef(r.u16()?, r.u16()?),
                CONSTANT_METHODREF => Constant::MethodRef(r.u16()?, r.u16()?),
                CONSTANT_INTERFACEMETHODREF => Constant::InterfaceMethodRef(r.u16()?, r.u16()?),
                CONSTANT_NAMEANDTYPE => Constant::NameAndType(r.u16()?, r.u16()?),
                CONSTANT_METHODHANDLE => Constant::MethodHandle(r.u8()?, r.u16()?),
                CONSTANT_METHODTYPE => Constant::MethodType(r.u16()?),
                CONSTANT_DYNAMIC => Constant::Dynamic(r.u16()?, r.u16()?),
                CONSTANT_INVOKEDYNAMIC => Constant::InvokeDynamic(r.u16()?, r.u16()?),
                CONSTANT_MODULE => Constant::Module(r.u16()?),
                CONSTANT_PACKAGE => Constant::Package(r.u16()?),
                other => {
                    return Err(ClassFormatError::at(
                        tag_offset,
                        format!("unknown constant pool tag {}", other),
                    ))
                }
            };

            let two_slots = matches!(constant, Constant::Long(_) | Constant::Double(_));
            entries.push(Some(constant));
            if two_slots {
                entries.push(None);
            }
        }

        Ok(Self { entries })
    }

    /// Raw entry access; `None` for index 0, wide placeholders and
    /// out-of-range indices.
    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.entries.get(index as usize).and_then(|e| e.as_ref())
    }

    /// Number of pool slots including index 0 and wide placeholders.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Utf8 entry at `index`.
    pub fn utf8(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            Constant::Utf8(s) => Some(s),
            _ => None,
        }
    }

    /// Binary class name behind a `Class` entry (e.g. `java/util/HashMap`).
    pub fn class_name(&self, index: u16) -> Option<&str> {
        match self.get(index)? {
            Constant::Class(name_index) => self.utf8(*name_index),
            _ => None,
        }
    }

    /// Name/descriptor pair behind a `NameAndType` entry.
    pub fn name_and_type(&self, index: u16) -> Option<(&str, &str)> {
        match self.get(index)? {
            Constant::NameAndType(name_index, desc_index) => {
                Some((self.utf8(*name_index)?, self.utf8(*desc_index)?))
            }
            _ => None,
        }
    }

    /// Resolve a Field/Method/InterfaceMethod reference to owner, name and
    /// descriptor. For `Dynamic`/`InvokeDynamic` the owner is empty (the
    /// "owner" is a bootstrap method, which the detector never inspects).
    pub fn member_ref(&self, index: u16) -> Option<MemberRef<'_>> {
        match self.get(index)? {
            Constant::FieldRef(class_index, nat_index)
            | Constant::MethodRef(class_index, nat_index)
            | Constant::InterfaceMethodRef(class_index, nat_index) => {
                let owner = self.class_name(*class_index)?;
                let (name, descriptor) = self.name_and_type(*nat_index)?;
                Some(MemberRef {
                    owner,
                    name,
                    descriptor,
                })
            }
            Constant::Dynamic(_, nat_index) | Constant::InvokeDynamic(_, nat_index) => {
                let (name, descriptor) = self.name_and_type(*nat_index)?;
                Some(MemberRef {
                    owner: "",
                    name,
                    descriptor,
                })
            }
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Builders (used when constructing pools programmatically, e.g. tests)
    // ------------------------------------------------------------------

    /// Append an entry, returning its index. `Long`/`Double` reserve the
    /// following placeholder slot as the format requires.
    pub fn push(&mut self, constant: Constant) -> u16 {
        if self.entries.is_empty() {
            self.entries.push(None);
        }
        let index = self.entries.len() as u16;
        let two_slots = matches!(constant, Constant::Long(_) | Constant::Double(_));
        self.entries.push(Some(constant));
        if two_slots {
            self.entries.push(None);
        }
        index
    }

    /// Index of a Utf8 entry with the given content, adding it if absent.
    pub fn utf8_index(&mut self, s: &str) -> u16 {
        for (i, e) in self.entries.iter().enumerate() {
            if let Some(Constant::Utf8(existing)) = e {
                if existing == s {
                    return i as u16;
                }
            }
        }
        self.push(Constant::Utf8(s.to_string()))
    }

    /// Index of a `Class` entry for the given binary name, adding if absent.
    pub fn class_index(&mut self, binary_name: &str) -> u16 {
        let name_index = self.utf8_index(binary_name);
        for (i, e) in self.entries.iter().enumerate() {
            if let Some(Constant::Class(ni)) = e {
                if *ni == name_index {
                    return i as u16;
                }
            }
        }
        self.push(Constant::Class(name_index))
    }

    /// Index of a `NameAndType` entry, adding if absent.
    pub fn name_and_type_index(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8_index(name);
        let desc_index = self.utf8_index(descriptor);
        for (i, e) in self.entries.iter().enumerate() {
            if let Some(Constant::NameAndType(ni, di)) = e {
                if *ni == name_index && *di == desc_index {
                    return i as u16;
                }
            }
        }
        self.push(Constant::NameAndType(name_index, desc_index))
    }

    /// Index of a `MethodRef` entry, adding if absent.
    pub fn method_ref_index(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class_index(owner);
        let nat_index = self.name_and_type_index(name, descriptor);
        self.push(Constant::MethodRef(class_index, nat_index))
    }

    /// Index of an `InterfaceMethodRef` entry, adding if absent.
    pub fn interface_method_ref_index(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class_index(owner);
        let nat_index = self.name_and_type_index(name, descriptor);
        self.push(Constant::InterfaceMethodRef(class_index, nat_index))
    }

    /// Index of a `FieldRef` entry, adding if absent.
    pub fn field_ref_index(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class_index(owner);
        let nat_index = self.name_and_type_index(name, descriptor);
        self.push(Constant::FieldRef(class_index, nat_index))
    }
}
