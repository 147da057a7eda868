//! Minimal structural model of a compiled JVM class file.
//!
//! Parses the container format only: constant pool, member tables and raw
//! attributes. Attribute payloads are kept as bytes; the extraction pass in
//! `extract` interprets the ones that can carry type references. Method code
//! is never decoded instruction by instruction: every type an instruction can
//! reference reaches the file through a `Class`, `NameAndType` or
//! `MethodType` pool entry, so the pool is the authoritative surface.

use anyhow::{Result, bail};

const MAGIC: u32 = 0xCAFE_BABE;

#[derive(Debug)]
pub struct ClassFile {
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<Member>,
    pub methods: Vec<Member>,
    pub attributes: Vec<Attribute>,
}

/// A field or method declaration.
#[derive(Debug)]
pub struct Member {
    pub access_flags: u16,
    pub name: u16,
    pub descriptor: u16,
    pub attributes: Vec<Attribute>,
}

/// A named attribute with its undecoded payload.
#[derive(Debug)]
pub struct Attribute {
    pub name: String,
    pub info: Vec<u8>,
}

#[derive(Debug)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name: u16 },
    String { value: u16 },
    FieldRef { class: u16, name_and_type: u16 },
    MethodRef { class: u16, name_and_type: u16 },
    InterfaceMethodRef { class: u16, name_and_type: u16 },
    NameAndType { name: u16, descriptor: u16 },
    MethodHandle { kind: u8, reference: u16 },
    MethodType { descriptor: u16 },
    Dynamic { bootstrap_method: u16, name_and_type: u16 },
    InvokeDynamic { bootstrap_method: u16, name_and_type: u16 },
    Module { name: u16 },
    Package { name: u16 },
    /// Index 0 and the phantom slot after a Long/Double entry.
    Unusable,
}

#[derive(Debug)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    pub fn entries(&self) -> &[Constant] {
        &self.entries
    }

    pub fn get(&self, index: u16) -> Result<&Constant> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => {
                bail!("Invalid constant pool index: {index}")
            }
            Some(constant) => Ok(constant),
        }
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value),
            other => bail!("Constant pool entry {index} is not Utf8: {other:?}"),
        }
    }

    /// Resolves a `Class` entry to its binary name.
    pub fn class_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Class { name } => self.utf8(*name),
            other => bail!("Constant pool entry {index} is not Class: {other:?}"),
        }
    }
}

pub fn parse(bytes: &[u8]) -> Result<ClassFile> {
    let mut reader = ByteReader::new(bytes);

    let magic = reader.u32()?;
    if magic != MAGIC {
        bail!("Not a class file (bad magic: {magic:#010x})");
    }
    let _minor = reader.u16()?;
    let _major = reader.u16()?;

    let constant_pool = read_constant_pool(&mut reader)?;

    let access_flags = reader.u16()?;
    let this_class = reader.u16()?;
    let super_class = reader.u16()?;

    let interface_count = reader.u16()?;
    let mut interfaces = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        interfaces.push(reader.u16()?);
    }

    let fields = read_members(&mut reader, &constant_pool)?;
    let methods = read_members(&mut reader, &constant_pool)?;
    let attributes = read_attributes(&mut reader, &constant_pool)?;

    Ok(ClassFile {
        constant_pool,
        access_flags,
        this_class,
        super_class,
        interfaces,
        fields,
        methods,
        attributes,
    })
}

fn read_constant_pool(reader: &mut ByteReader<'_>) -> Result<ConstantPool> {
    let count = reader.u16()?;
    let mut entries = Vec::with_capacity(count as usize);
    entries.push(Constant::Unusable);

    while entries.len() < count as usize {
        let tag = reader.u8()?;
        let constant = match tag {
            1 => {
                let length = reader.u16()? as usize;
                let raw = reader.take(length)?;
                Constant::Utf8(String::from_utf8_lossy(raw).into_owned())
            }
            3 => Constant::Integer(reader.u32()? as i32),
            4 => Constant::Float(f32::from_bits(reader.u32()?)),
            5 => {
                let raw = ((reader.u32()? as u64) << 32) | reader.u32()? as u64;
                Constant::Long(raw as i64)
            }
            6 => {
                let raw = ((reader.u32()? as u64) << 32) | reader.u32()? as u64;
                Constant::Double(f64::from_bits(raw))
            }
            7 => Constant::Class { name: reader.u16()? },
            8 => Constant::String {
                value: reader.u16()?,
            },
            9 => Constant::FieldRef {
                class: reader.u16()?,
                name_and_type: reader.u16()?,
            },
            10 => Constant::MethodRef {
                class: reader.u16()?,
                name_and_type: reader.u16()?,
            },
            11 => Constant::InterfaceMethodRef {
                class: reader.u16()?,
                name_and_type: reader.u16()?,
            },
            12 => Constant::NameAndType {
                name: reader.u16()?,
                descriptor: reader.u16()?,
            },
            15 => Constant::MethodHandle {
                kind: reader.u8()?,
                reference: reader.u16()?,
            },
            16 => Constant::MethodType {
                descriptor: reader.u16()?,
            },
            17 => Constant::Dynamic {
                bootstrap_method: reader.u16()?,
                name_and_type: reader.u16()?,
            },
            18 => Constant::InvokeDynamic {
                bootstrap_method: reader.u16()?,
                name_and_type: reader.u16()?,
            },
            19 => Constant::Module { name: reader.u16()? },
            20 => Constant::Package { name: reader.u16()? },
            other => bail!("Unknown constant pool tag: {other}"),
        };

        let takes_two_slots = matches!(constant, Constant::Long(_) | Constant::Double(_));
        entries.push(constant);
        if takes_two_slots {
            entries.push(Constant::Unusable);
        }
    }

    Ok(ConstantPool { entries })
}

fn read_members(reader: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<Vec<Member>> {
    let count = reader.u16()?;
    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let access_flags = reader.u16()?;
        let name = reader.u16()?;
        let descriptor = reader.u16()?;
        let attributes = read_attributes(reader, pool)?;
        members.push(Member {
            access_flags,
            name,
            descriptor,
            attributes,
        });
    }
    Ok(members)
}

pub(crate) fn read_attributes(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<Vec<Attribute>> {
    let count = reader.u16()?;
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name_index = reader.u16()?;
        let length = reader.u32()? as usize;
        let info = reader.take(length)?.to_vec();
        attributes.push(Attribute {
            name: pool.utf8(name_index)?.to_string(),
            info,
        });
    }
    Ok(attributes)
}

pub(crate) struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        let b = self.take(1)?;
        Ok(b[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|end| *end <= self.bytes.len());
        let Some(end) = end else {
            bail!("Truncated class file");
        };
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }
}
