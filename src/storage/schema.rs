//! Table schema and the fixed-size header block stored at offset 0 of every
//! table file.
//!
//! Header layout (little endian, zero padded to [`HEADER_SIZE`]):
//!
//! ```text
//! +--------+---------+-------------+-------------+--------------+------------+
//! | magic  | version | field count | record size | next id hint | table name |
//! | 4B     | u16     | u16         | u32         | u32          | 64B        |
//! +--------+---------+-------------+-------------+--------------+------------+
//! | field slot * MAX_FIELDS: name (32B) | type tag (u8) | byte size (u32)     |
//! +----------------------------------------------------------------------------+
//! ```

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use super::DataType;
use crate::error::{DbError, Result};
use crate::var_char::VarChar;

pub const MAGIC: &[u8; 4] = b"TBLR";
pub const FORMAT_VERSION: u16 = 1;

/// Every table file starts with a header of exactly this size.
pub const HEADER_SIZE: usize = 1024;

pub const MAX_FIELDS: usize = 20;
pub const MAX_RECORD_SIZE: usize = 4096;

const TABLE_NAME_SLOT: usize = 64;
const FIELD_NAME_SLOT: usize = 32;
const FIELD_SLOT: usize = FIELD_NAME_SLOT + 1 + 4;

pub const MAX_TABLE_NAME_LEN: usize = TABLE_NAME_SLOT - 1;
pub const MAX_FIELD_NAME_LEN: usize = FIELD_NAME_SLOT - 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    pub fn byte_size(&self) -> usize {
        self.data_type.byte_size()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub fields: Vec<Field>,
    pub record_size: usize,
    pub next_id_hint: u32,
}

impl TableSchema {
    /// Builds and validates a complete schema. Nothing touches the disk until
    /// this succeeds.
    pub fn new(name: &str, fields: Vec<Field>) -> Result<Self> {
        if name.is_empty() || name.len() > MAX_TABLE_NAME_LEN {
            return Err(DbError::Limit(format!(
                "table name must have between 1 and {MAX_TABLE_NAME_LEN} bytes"
            )));
        }
        if fields.is_empty() {
            return Err(DbError::Limit("a table needs at least one field".into()));
        }
        if fields.len() > MAX_FIELDS {
            return Err(DbError::Limit(format!(
                "a table can have at most {MAX_FIELDS} fields"
            )));
        }

        for (i, field) in fields.iter().enumerate() {
            if field.name.is_empty() || field.name.len() > MAX_FIELD_NAME_LEN {
                return Err(DbError::Limit(format!(
                    "field name '{}' must have between 1 and {MAX_FIELD_NAME_LEN} bytes",
                    field.name
                )));
            }
            if fields[..i].iter().any(|other| other.name == field.name) {
                return Err(DbError::DuplicateField(field.name.clone()));
            }
            if field.byte_size() == 0 {
                return Err(DbError::Limit(format!(
                    "field '{}' must have a capacity of at least 1",
                    field.name
                )));
            }
        }

        let record_size: usize = fields.iter().map(Field::byte_size).sum();
        if record_size > MAX_RECORD_SIZE {
            return Err(DbError::Limit(format!(
                "record size {record_size} exceeds {MAX_RECORD_SIZE} bytes"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            fields,
            record_size,
            next_id_hint: 1,
        })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    /// Byte offset of field `index` inside a record.
    pub fn offset_of(&self, index: usize) -> usize {
        self.fields[..index].iter().map(Field::byte_size).sum()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE);

        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf.extend_from_slice(&(self.fields.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(self.record_size as u32).to_le_bytes());
        buf.extend_from_slice(&self.next_id_hint.to_le_bytes());
        write_name(&mut buf, &self.name, TABLE_NAME_SLOT);

        for field in &self.fields {
            write_name(&mut buf, &field.name, FIELD_NAME_SLOT);
            buf.push(field.data_type.tag());
            buf.extend_from_slice(&(field.byte_size() as u32).to_le_bytes());
        }

        buf.resize(HEADER_SIZE, 0);
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(DbError::Corrupt("header block is truncated".into()));
        }

        let mut cursor = Cursor::new(&bytes[..HEADER_SIZE]);

        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(DbError::Corrupt("bad magic bytes".into()));
        }

        let version = cursor.read_u16::<LittleEndian>()?;
        if version != FORMAT_VERSION {
            return Err(DbError::Corrupt(format!(
                "unsupported format version {version}"
            )));
        }

        let field_count = cursor.read_u16::<LittleEndian>()? as usize;
        if field_count == 0 || field_count > MAX_FIELDS {
            return Err(DbError::Corrupt(format!("invalid field count {field_count}")));
        }

        let record_size = cursor.read_u32::<LittleEndian>()? as usize;
        let next_id_hint = cursor.read_u32::<LittleEndian>()?;
        let name = read_name(&mut cursor, TABLE_NAME_SLOT)?;

        let mut fields = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            let field_name = read_name(&mut cursor, FIELD_NAME_SLOT)?;
            let tag = cursor.read_u8()?;
            let size = cursor.read_u32::<LittleEndian>()?;
            let data_type = DataType::from_tag(tag, size).ok_or_else(|| {
                DbError::Corrupt(format!("field '{field_name}' has invalid type tag {tag}"))
            })?;
            fields.push(Field::new(field_name, data_type));
        }

        let expected: usize = fields.iter().map(Field::byte_size).sum();
        if expected != record_size {
            return Err(DbError::Corrupt(format!(
                "record size {record_size} does not match field sizes ({expected})"
            )));
        }

        Ok(Self {
            name,
            fields,
            record_size,
            next_id_hint,
        })
    }
}

fn write_name(buf: &mut Vec<u8>, name: &str, slot: usize) {
    let start = buf.len();
    buf.resize(start + slot, 0);
    VarChar::clipped(name, slot - 1).write_to(&mut buf[start..]);
}

fn read_name(cursor: &mut Cursor<&[u8]>, slot: usize) -> Result<String> {
    let mut raw = vec![0u8; slot];
    cursor.read_exact(&mut raw)?;
    Ok(VarChar::read_from(&raw).into_string())
}

// The header must fit the largest schema.
const _: () = assert!(4 + 2 + 2 + 4 + 4 + TABLE_NAME_SLOT + MAX_FIELDS * FIELD_SLOT <= HEADER_SIZE);
