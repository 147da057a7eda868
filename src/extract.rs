//! Extraction of every external type a compiled class refers to.
//!
//! One pass over the parsed class-file model feeds a single sink with type
//! names from each structural site: superclass and interfaces, constant-pool
//! class entries (instruction owners, `new`/`checkcast`/array creation,
//! try/catch and thrown types, `ldc` type literals), member descriptors and
//! every descriptor reachable from `NameAndType`/`MethodType` entries
//! (field-access, invocation and dynamic call-site descriptors), generic
//! signatures, and annotation payloads down to nested element values. A
//! dependency counts as used if it shows up on any of these surfaces, so
//! skipping a site would manufacture false "unused" findings.
//!
//! Array types are unwrapped to their component type; primitives are never
//! lookup candidates. Names that the artifact index does not know (JDK types,
//! the unit's own classes) are silently ignored.

use anyhow::{Result, bail};
use std::collections::{BTreeSet, HashMap};

use crate::classfile::{self, Attribute, ByteReader, Constant, ConstantPool};
use crate::model::LibraryId;

/// All binary class names referenced by one class file.
pub fn referenced_class_names(bytes: &[u8]) -> Result<BTreeSet<String>> {
    let class_file = classfile::parse(bytes)?;
    let pool = &class_file.constant_pool;
    let mut sink = BTreeSet::new();

    for constant in pool.entries() {
        match constant {
            Constant::Class { name } => add_class_name(pool.utf8(*name)?, &mut sink),
            Constant::NameAndType { descriptor, .. } | Constant::MethodType { descriptor } => {
                add_descriptor_types(pool.utf8(*descriptor)?, &mut sink);
            }
            _ => {}
        }
    }

    for member in class_file.fields.iter().chain(class_file.methods.iter()) {
        add_descriptor_types(pool.utf8(member.descriptor)?, &mut sink);
        walk_attributes(&member.attributes, pool, &mut sink)?;
    }
    walk_attributes(&class_file.attributes, pool, &mut sink)?;

    Ok(sink)
}

/// The library ids referenced by one class file, resolved through the
/// inverted artifact class index.
pub fn referenced_libraries(
    bytes: &[u8],
    classes_to_artifacts: &HashMap<String, BTreeSet<LibraryId>>,
) -> Result<BTreeSet<LibraryId>> {
    let mut libraries = BTreeSet::new();
    for name in referenced_class_names(bytes)? {
        if let Some(ids) = classes_to_artifacts.get(&name) {
            libraries.extend(ids.iter().cloned());
        }
    }
    Ok(libraries)
}

fn add_class_name(name: &str, sink: &mut BTreeSet<String>) {
    // Array classes appear in descriptor form; unwrap to the component type.
    if name.starts_with('[') {
        add_descriptor_types(name, sink);
    } else {
        sink.insert(name.to_string());
    }
}

/// Collects the object types of a field or method descriptor. Descriptors
/// carry no generics, so every `L...;` run is a class name.
fn add_descriptor_types(descriptor: &str, sink: &mut BTreeSet<String>) {
    let bytes = descriptor.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'L' {
            let start = i + 1;
            let end = match bytes[start..].iter().position(|b| *b == b';') {
                Some(offset) => start + offset,
                None => break,
            };
            if let Ok(name) = std::str::from_utf8(&bytes[start..end]) {
                sink.insert(name.to_string());
            }
            i = end + 1;
        } else {
            i += 1;
        }
    }
}

fn walk_attributes(
    attributes: &[Attribute],
    pool: &ConstantPool,
    sink: &mut BTreeSet<String>,
) -> Result<()> {
    for attribute in attributes {
        let mut reader = ByteReader::new(&attribute.info);
        match attribute.name.as_str() {
            "Signature" => {
                let signature = pool.utf8(reader.u16()?)?;
                scan_signature(signature, sink)?;
            }
            "RuntimeVisibleAnnotations" | "RuntimeInvisibleAnnotations" => {
                let count = reader.u16()?;
                for _ in 0..count {
                    read_annotation(&mut reader, pool, sink)?;
                }
            }
            "RuntimeVisibleParameterAnnotations" | "RuntimeInvisibleParameterAnnotations" => {
                let parameters = reader.u8()?;
                for _ in 0..parameters {
                    let count = reader.u16()?;
                    for _ in 0..count {
                        read_annotation(&mut reader, pool, sink)?;
                    }
                }
            }
            "RuntimeVisibleTypeAnnotations" | "RuntimeInvisibleTypeAnnotations" => {
                let count = reader.u16()?;
                for _ in 0..count {
                    read_type_annotation(&mut reader, pool, sink)?;
                }
            }
            "AnnotationDefault" => {
                read_element_value(&mut reader, pool, sink)?;
            }
            "Exceptions" => {
                let count = reader.u16()?;
                for _ in 0..count {
                    add_class_name(pool.class_name(reader.u16()?)?, sink);
                }
            }
            "Code" => {
                reader.skip(4)?; // max_stack, max_locals
                let code_length = reader.u32()? as usize;
                reader.skip(code_length)?;
                let handlers = reader.u16()?;
                for _ in 0..handlers {
                    reader.skip(6)?; // start_pc, end_pc, handler_pc
                    let catch_type = reader.u16()?;
                    if catch_type != 0 {
                        add_class_name(pool.class_name(catch_type)?, sink);
                    }
                }
                let nested = classfile::read_attributes(&mut reader, pool)?;
                walk_attributes(&nested, pool, sink)?;
            }
            "LocalVariableTable" => {
                let count = reader.u16()?;
                for _ in 0..count {
                    reader.skip(6)?; // start_pc, length, name
                    add_descriptor_types(pool.utf8(reader.u16()?)?, sink);
                    reader.skip(2)?; // slot index
                }
            }
            "LocalVariableTypeTable" => {
                let count = reader.u16()?;
                for _ in 0..count {
                    reader.skip(6)?;
                    scan_signature(pool.utf8(reader.u16()?)?, sink)?;
                    reader.skip(2)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn read_annotation(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
    sink: &mut BTreeSet<String>,
) -> Result<()> {
    add_descriptor_types(pool.utf8(reader.u16()?)?, sink);
    let pairs = reader.u16()?;
    for _ in 0..pairs {
        reader.skip(2)?; // element name
        read_element_value(reader, pool, sink)?;
    }
    Ok(())
}

fn read_element_value(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
    sink: &mut BTreeSet<String>,
) -> Result<()> {
    let tag = reader.u8()?;
    match tag {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => reader.skip(2)?,
        b'e' => {
            add_descriptor_types(pool.utf8(reader.u16()?)?, sink);
            reader.skip(2)?; // constant name
        }
        b'c' => {
            // Class literal; the payload is a return descriptor and may be
            // void or primitive.
            add_descriptor_types(pool.utf8(reader.u16()?)?, sink);
        }
        b'@' => read_annotation(reader, pool, sink)?,
        b'[' => {
            let count = reader.u16()?;
            for _ in 0..count {
                read_element_value(reader, pool, sink)?;
            }
        }
        other => bail!("Unknown annotation element tag: {other:#04x}"),
    }
    Ok(())
}

fn read_type_annotation(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
    sink: &mut BTreeSet<String>,
) -> Result<()> {
    let target_type = reader.u8()?;
    match target_type {
        0x00 | 0x01 | 0x16 => reader.skip(1)?,
        0x10 | 0x17 | 0x42..=0x46 => reader.skip(2)?,
        0x11 | 0x12 => reader.skip(2)?,
        0x13..=0x15 => {}
        0x40 | 0x41 => {
            let entries = reader.u16()?;
            reader.skip(entries as usize * 6)?;
        }
        0x47..=0x4B => reader.skip(3)?,
        other => bail!("Unknown type annotation target: {other:#04x}"),
    }
    let path_length = reader.u8()?;
    reader.skip(path_length as usize * 2)?;
    read_annotation(reader, pool, sink)
}

/// Collects class-type references from a generic signature (class, field,
/// method or local-variable form). Inner-class segments are not lookup
/// candidates on their own; their type arguments still are.
fn scan_signature(signature: &str, sink: &mut BTreeSet<String>) -> Result<()> {
    let mut scanner = SignatureScanner {
        bytes: signature.as_bytes(),
        pos: 0,
    };
    scanner.scan(sink)
}

struct SignatureScanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl SignatureScanner<'_> {
    fn scan(&mut self, sink: &mut BTreeSet<String>) -> Result<()> {
        if self.peek() == Some(b'<') {
            self.formal_type_parameters(sink)?;
        }
        if self.peek() == Some(b'(') {
            self.bump()?;
            while self.peek() != Some(b')') {
                self.type_signature(sink)?;
            }
            self.bump()?;
            if self.peek() == Some(b'V') {
                self.bump()?;
            } else {
                self.type_signature(sink)?;
            }
            while self.peek() == Some(b'^') {
                self.bump()?;
                self.type_signature(sink)?;
            }
        } else {
            // Class signature (superclass + interfaces) or a single field /
            // local-variable type.
            while self.peek().is_some() {
                self.type_signature(sink)?;
            }
        }
        if self.peek().is_some() {
            bail!("Trailing characters in signature");
        }
        Ok(())
    }

    fn formal_type_parameters(&mut self, sink: &mut BTreeSet<String>) -> Result<()> {
        self.expect(b'<')?;
        while self.peek() != Some(b'>') {
            while self.bump()? != b':' {}
            if matches!(self.peek(), Some(b'L' | b'[' | b'T')) {
                self.type_signature(sink)?;
            }
            while self.peek() == Some(b':') {
                self.bump()?;
                self.type_signature(sink)?;
            }
        }
        self.bump()?;
        Ok(())
    }

    fn type_signature(&mut self, sink: &mut BTreeSet<String>) -> Result<()> {
        match self.bump()? {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => Ok(()),
            b'[' => self.type_signature(sink),
            b'T' => {
                while self.bump()? != b';' {}
                Ok(())
            }
            b'L' => self.class_type_rest(sink),
            other => bail!("Unexpected character in signature: {:?}", other as char),
        }
    }

    fn class_type_rest(&mut self, sink: &mut BTreeSet<String>) -> Result<()> {
        let name = self.identifier_until_terminator()?;
        sink.insert(name);
        loop {
            match self.bump()? {
                b';' => return Ok(()),
                b'<' => {
                    while self.peek() != Some(b'>') {
                        self.type_argument(sink)?;
                    }
                    self.bump()?;
                }
                b'.' => {
                    self.identifier_until_terminator()?;
                }
                other => bail!("Malformed class type in signature: {:?}", other as char),
            }
        }
    }

    fn type_argument(&mut self, sink: &mut BTreeSet<String>) -> Result<()> {
        match self.peek() {
            Some(b'*') => {
                self.bump()?;
                Ok(())
            }
            Some(b'+' | b'-') => {
                self.bump()?;
                self.type_signature(sink)
            }
            _ => self.type_signature(sink),
        }
    }

    fn identifier_until_terminator(&mut self) -> Result<String> {
        let start = self.pos;
        while !matches!(self.peek(), Some(b';' | b'<' | b'.') | None) {
            self.pos += 1;
        }
        if self.peek().is_none() {
            bail!("Unterminated class type in signature");
        }
        Ok(std::str::from_utf8(&self.bytes[start..self.pos])?.to_string())
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Result<u8> {
        let Some(b) = self.peek() else {
            bail!("Unexpected end of signature");
        };
        self.pos += 1;
        Ok(b)
    }

    fn expect(&mut self, expected: u8) -> Result<()> {
        let actual = self.bump()?;
        if actual != expected {
            bail!(
                "Expected {:?} in signature, found {:?}",
                expected as char,
                actual as char
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Byte-level class assembler for extraction tests. Indices are 1-based
    /// pool positions, attributes are pre-encoded blobs.
    struct TestClass {
        pool: Vec<Vec<u8>>,
        this_class: u16,
        super_class: u16,
        interfaces: Vec<u16>,
        fields: Vec<Vec<u8>>,
        methods: Vec<Vec<u8>>,
        attributes: Vec<Vec<u8>>,
    }

    impl TestClass {
        fn new(this_name: &str, super_name: &str) -> Self {
            let mut t = Self {
                pool: Vec::new(),
                this_class: 0,
                super_class: 0,
                interfaces: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                attributes: Vec::new(),
            };
            t.this_class = t.class(this_name);
            t.super_class = t.class(super_name);
            t
        }

        fn utf8(&mut self, value: &str) -> u16 {
            let mut entry = vec![1u8];
            entry.extend_from_slice(&(value.len() as u16).to_be_bytes());
            entry.extend_from_slice(value.as_bytes());
            self.push(entry)
        }

        fn class(&mut self, name: &str) -> u16 {
            let name_index = self.utf8(name);
            let mut entry = vec![7u8];
            entry.extend_from_slice(&name_index.to_be_bytes());
            self.push(entry)
        }

        fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
            let name_index = self.utf8(name);
            let descriptor_index = self.utf8(descriptor);
            let mut entry = vec![12u8];
            entry.extend_from_slice(&name_index.to_be_bytes());
            entry.extend_from_slice(&descriptor_index.to_be_bytes());
            self.push(entry)
        }

        fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
            let class_index = self.class(owner);
            let nat_index = self.name_and_type(name, descriptor);
            let mut entry = vec![10u8];
            entry.extend_from_slice(&class_index.to_be_bytes());
            entry.extend_from_slice(&nat_index.to_be_bytes());
            self.push(entry)
        }

        fn method_type(&mut self, descriptor: &str) -> u16 {
            let descriptor_index = self.utf8(descriptor);
            let mut entry = vec![16u8];
            entry.extend_from_slice(&descriptor_index.to_be_bytes());
            self.push(entry)
        }

        fn push(&mut self, entry: Vec<u8>) -> u16 {
            self.pool.push(entry);
            self.pool.len() as u16
        }

        fn attribute(&mut self, name: &str, info: Vec<u8>) -> Vec<u8> {
            let name_index = self.utf8(name);
            let mut out = Vec::new();
            out.extend_from_slice(&name_index.to_be_bytes());
            out.extend_from_slice(&(info.len() as u32).to_be_bytes());
            out.extend_from_slice(&info);
            out
        }

        fn signature_attribute(&mut self, signature: &str) -> Vec<u8> {
            let signature_index = self.utf8(signature);
            self.attribute("Signature", signature_index.to_be_bytes().to_vec())
        }

        /// One marker annotation (no element pairs) under the given
        /// attribute name.
        fn annotation_attribute(&mut self, attribute_name: &str, type_descriptor: &str) -> Vec<u8> {
            let type_index = self.utf8(type_descriptor);
            let mut info = 1u16.to_be_bytes().to_vec();
            info.extend_from_slice(&type_index.to_be_bytes());
            info.extend_from_slice(&0u16.to_be_bytes());
            self.attribute(attribute_name, info)
        }

        fn member(&mut self, name: &str, descriptor: &str, attributes: Vec<Vec<u8>>) -> Vec<u8> {
            let name_index = self.utf8(name);
            let descriptor_index = self.utf8(descriptor);
            let mut out = 0u16.to_be_bytes().to_vec();
            out.extend_from_slice(&name_index.to_be_bytes());
            out.extend_from_slice(&descriptor_index.to_be_bytes());
            out.extend_from_slice(&(attributes.len() as u16).to_be_bytes());
            for attribute in attributes {
                out.extend_from_slice(&attribute);
            }
            out
        }

        fn add_field(&mut self, name: &str, descriptor: &str, attributes: Vec<Vec<u8>>) {
            let encoded = self.member(name, descriptor, attributes);
            self.fields.push(encoded);
        }

        fn add_method(&mut self, name: &str, descriptor: &str, attributes: Vec<Vec<u8>>) {
            let encoded = self.member(name, descriptor, attributes);
            self.methods.push(encoded);
        }

        fn add_class_attribute(&mut self, attribute: Vec<u8>) {
            self.attributes.push(attribute);
        }

        fn finish(self) -> Vec<u8> {
            let mut out = Vec::new();
            out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
            out.extend_from_slice(&0u16.to_be_bytes());
            out.extend_from_slice(&52u16.to_be_bytes());
            out.extend_from_slice(&(self.pool.len() as u16 + 1).to_be_bytes());
            for entry in &self.pool {
                out.extend_from_slice(entry);
            }
            out.extend_from_slice(&0x0021u16.to_be_bytes());
            out.extend_from_slice(&self.this_class.to_be_bytes());
            out.extend_from_slice(&self.super_class.to_be_bytes());
            out.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
            for interface in &self.interfaces {
                out.extend_from_slice(&interface.to_be_bytes());
            }
            out.extend_from_slice(&(self.fields.len() as u16).to_be_bytes());
            for field in &self.fields {
                out.extend_from_slice(field);
            }
            out.extend_from_slice(&(self.methods.len() as u16).to_be_bytes());
            for method in &self.methods {
                out.extend_from_slice(method);
            }
            out.extend_from_slice(&(self.attributes.len() as u16).to_be_bytes());
            for attribute in &self.attributes {
                out.extend_from_slice(attribute);
            }
            out
        }
    }

    #[test]
    fn super_and_interfaces_are_referenced() -> Result<()> {
        let mut t = TestClass::new("com/example/App", "net/minidev/json/JSONObject");
        let iface = t.class("org/example/Greeter");
        t.interfaces.push(iface);

        let names = referenced_class_names(&t.finish())?;
        assert!(names.contains("net/minidev/json/JSONObject"));
        assert!(names.contains("org/example/Greeter"));
        Ok(())
    }

    #[test]
    fn member_descriptors_unwrap_arrays_and_skip_primitives() -> Result<()> {
        let mut t = TestClass::new("com/example/App", "java/lang/Object");
        t.add_field("data", "[Lorg/apache/commons/io/IOUtils;", vec![]);
        t.add_method("run", "(IJLnet/minidev/json/JSONValue;)Lnet/minidev/json/JSONObject;", vec![]);

        let names = referenced_class_names(&t.finish())?;
        assert!(names.contains("org/apache/commons/io/IOUtils"));
        assert!(names.contains("net/minidev/json/JSONValue"));
        assert!(names.contains("net/minidev/json/JSONObject"));
        assert!(!names.iter().any(|n| n == "I" || n == "J"));
        Ok(())
    }

    #[test]
    fn invocation_owner_and_descriptor_types_are_referenced() -> Result<()> {
        let mut t = TestClass::new("com/example/App", "java/lang/Object");
        t.method_ref(
            "net/minidev/json/JSONValue",
            "parse",
            "(Ljava/lang/String;)Lnet/minidev/json/JSONObject;",
        );

        let names = referenced_class_names(&t.finish())?;
        assert!(names.contains("net/minidev/json/JSONValue"));
        assert!(names.contains("net/minidev/json/JSONObject"));
        assert!(names.contains("java/lang/String"));
        Ok(())
    }

    #[test]
    fn dynamic_call_site_descriptors_are_referenced() -> Result<()> {
        let mut t = TestClass::new("com/example/App", "java/lang/Object");
        t.method_type("(Lnet/minidev/json/JSONArray;)V");

        let names = referenced_class_names(&t.finish())?;
        assert!(names.contains("net/minidev/json/JSONArray"));
        Ok(())
    }

    #[test]
    fn generic_signatures_are_scanned() -> Result<()> {
        let mut t = TestClass::new("com/example/App", "java/lang/Object");
        let class_signature =
            t.signature_attribute("Ljava/lang/Object;Ljava/util/List<Lnet/minidev/json/JSONObject;>;");
        t.add_class_attribute(class_signature);
        let method_signature =
            t.signature_attribute("<T:Ljava/lang/Object;>(TT;[La/D;)V^La/E;");
        t.add_method("run", "()V", vec![method_signature]);

        let names = referenced_class_names(&t.finish())?;
        assert!(names.contains("java/util/List"));
        assert!(names.contains("net/minidev/json/JSONObject"));
        assert!(names.contains("a/D"));
        assert!(names.contains("a/E"));
        Ok(())
    }

    #[test]
    fn annotation_types_are_referenced_at_every_level() -> Result<()> {
        let mut t = TestClass::new("com/example/App", "java/lang/Object");
        let class_annotation =
            t.annotation_attribute("RuntimeVisibleAnnotations", "Lorg/example/Marker;");
        t.add_class_attribute(class_annotation);
        let field_annotation =
            t.annotation_attribute("RuntimeInvisibleAnnotations", "Lorg/example/FieldMarker;");
        t.add_field("data", "I", vec![field_annotation]);
        let method_annotation =
            t.annotation_attribute("RuntimeVisibleAnnotations", "Lorg/example/MethodMarker;");
        t.add_method("run", "()V", vec![method_annotation]);

        let names = referenced_class_names(&t.finish())?;
        assert!(names.contains("org/example/Marker"));
        assert!(names.contains("org/example/FieldMarker"));
        assert!(names.contains("org/example/MethodMarker"));
        Ok(())
    }

    #[test]
    fn annotation_element_values_are_walked() -> Result<()> {
        let mut t = TestClass::new("com/example/App", "java/lang/Object");

        let type_index = t.utf8("Lorg/example/Config;");
        let name_index = t.utf8("value");
        let enum_type_index = t.utf8("Lorg/example/Mode;");
        let enum_name_index = t.utf8("FAST");
        let class_value_index = t.utf8("Lorg/example/Payload;");

        // Annotation with two pairs: an enum value and an array holding a
        // class literal.
        let mut info = 1u16.to_be_bytes().to_vec();
        info.extend_from_slice(&type_index.to_be_bytes());
        info.extend_from_slice(&2u16.to_be_bytes());
        info.extend_from_slice(&name_index.to_be_bytes());
        info.push(b'e');
        info.extend_from_slice(&enum_type_index.to_be_bytes());
        info.extend_from_slice(&enum_name_index.to_be_bytes());
        info.extend_from_slice(&name_index.to_be_bytes());
        info.push(b'[');
        info.extend_from_slice(&1u16.to_be_bytes());
        info.push(b'c');
        info.extend_from_slice(&class_value_index.to_be_bytes());

        let attribute = t.attribute("RuntimeVisibleAnnotations", info);
        t.add_class_attribute(attribute);

        let names = referenced_class_names(&t.finish())?;
        assert!(names.contains("org/example/Config"));
        assert!(names.contains("org/example/Mode"));
        assert!(names.contains("org/example/Payload"));
        Ok(())
    }

    #[test]
    fn code_attribute_catch_types_and_local_variables_are_walked() -> Result<()> {
        let mut t = TestClass::new("com/example/App", "java/lang/Object");
        let catch_type = t.class("org/example/AppException");
        let lvt_name = t.utf8("local");
        let lvt_descriptor = t.utf8("Lorg/example/Helper;");
        let lvtt_signature = t.utf8("Ljava/util/List<Lorg/example/Item;>;");

        let mut lvt_info = 1u16.to_be_bytes().to_vec();
        lvt_info.extend_from_slice(&[0, 0, 0, 1]); // start_pc, length
        lvt_info.extend_from_slice(&lvt_name.to_be_bytes());
        lvt_info.extend_from_slice(&lvt_descriptor.to_be_bytes());
        lvt_info.extend_from_slice(&0u16.to_be_bytes());
        let lvt = t.attribute("LocalVariableTable", lvt_info);

        let mut lvtt_info = 1u16.to_be_bytes().to_vec();
        lvtt_info.extend_from_slice(&[0, 0, 0, 1]);
        lvtt_info.extend_from_slice(&lvt_name.to_be_bytes());
        lvtt_info.extend_from_slice(&lvtt_signature.to_be_bytes());
        lvtt_info.extend_from_slice(&0u16.to_be_bytes());
        let lvtt = t.attribute("LocalVariableTypeTable", lvtt_info);

        let mut code_info = Vec::new();
        code_info.extend_from_slice(&1u16.to_be_bytes()); // max_stack
        code_info.extend_from_slice(&1u16.to_be_bytes()); // max_locals
        code_info.extend_from_slice(&1u32.to_be_bytes());
        code_info.push(0xb1); // return
        code_info.extend_from_slice(&1u16.to_be_bytes()); // one handler
        code_info.extend_from_slice(&[0, 0, 0, 1, 0, 1]);
        code_info.extend_from_slice(&catch_type.to_be_bytes());
        code_info.extend_from_slice(&2u16.to_be_bytes()); // nested attrs
        code_info.extend_from_slice(&lvt);
        code_info.extend_from_slice(&lvtt);
        let code = t.attribute("Code", code_info);

        t.add_method("run", "()V", vec![code]);

        let names = referenced_class_names(&t.finish())?;
        assert!(names.contains("org/example/AppException"));
        assert!(names.contains("org/example/Helper"));
        assert!(names.contains("java/util/List"));
        assert!(names.contains("org/example/Item"));
        Ok(())
    }

    #[test]
    fn unknown_names_resolve_to_no_libraries() -> Result<()> {
        let mut t = TestClass::new("com/example/App", "java/lang/Object");
        t.add_field("data", "Lnet/minidev/json/JSONObject;", vec![]);

        let id = LibraryId::new("net.minidev", "json-smart");
        let mut map = HashMap::new();
        map.insert(
            "net/minidev/json/JSONObject".to_string(),
            [id.clone()].into_iter().collect::<BTreeSet<_>>(),
        );

        let libraries = referenced_libraries(&t.finish(), &map)?;
        // java/lang/Object and com/example/App are not index entries and
        // contribute nothing.
        assert_eq!(libraries, [id].into_iter().collect());
        Ok(())
    }

    #[test]
    fn signature_scanner_skips_inner_segments_and_type_variables() -> Result<()> {
        let mut sink = BTreeSet::new();
        scan_signature("Ljava/util/Map<La/B;>.Entry<La/C;>;", &mut sink)?;
        assert_eq!(
            sink,
            ["java/util/Map", "a/B", "a/C"]
                .into_iter()
                .map(String::from)
                .collect()
        );

        let mut sink = BTreeSet::new();
        scan_signature("TListHolder;", &mut sink)?;
        assert!(sink.is_empty());
        Ok(())
    }

    #[test]
    fn malformed_class_file_is_an_error() {
        assert!(referenced_class_names(b"\xCA\xFE\xBA\xBE\x00").is_err());
        assert!(referenced_class_names(b"not a class file").is_err());
    }
}
