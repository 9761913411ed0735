//! Fixed-width record codec.
//!
//! Fields are packed in declaration order with no padding: `int` as a little
//! endian `i32`, `bool` as one byte and `text(N)` as N bytes, left-justified
//! and zero filled. Text longer than N is clipped.

use byteorder::{ByteOrder, LittleEndian};

use super::{DataType, DataValue, TableSchema};
use crate::error::{DbError, Result};
use crate::var_char::VarChar;

pub fn encode(schema: &TableSchema, values: &[DataValue]) -> Result<Vec<u8>> {
    if values.len() != schema.len() {
        return Err(DbError::ValueCount {
            expected: schema.len(),
            found: values.len(),
        });
    }

    let mut buf = vec![0u8; schema.record_size];
    let mut offset = 0;

    for (field, value) in schema.fields.iter().zip(values) {
        let size = field.byte_size();
        let slot = &mut buf[offset..offset + size];

        match (field.data_type, value) {
            (DataType::Int, DataValue::Int(num)) => LittleEndian::write_i32(slot, *num),
            (DataType::Bool, DataValue::Bool(flag)) => slot[0] = u8::from(*flag),
            (DataType::Text(capacity), DataValue::Text(text)) => {
                VarChar::clipped(text, capacity as usize).write_to(slot)
            }
            _ => {
                return Err(DbError::TypeMismatch {
                    field: field.name.clone(),
                    data_type: field.data_type.to_string(),
                    value: value.to_string(),
                });
            }
        }

        offset += size;
    }

    Ok(buf)
}

pub fn decode(schema: &TableSchema, buf: &[u8]) -> Result<Vec<DataValue>> {
    if buf.len() != schema.record_size {
        return Err(DbError::Corrupt(format!(
            "record of {} bytes, expected {}",
            buf.len(),
            schema.record_size
        )));
    }

    let mut values = Vec::with_capacity(schema.len());
    let mut offset = 0;

    for field in &schema.fields {
        let size = field.byte_size();
        let slot = &buf[offset..offset + size];

        values.push(match field.data_type {
            DataType::Int => DataValue::Int(LittleEndian::read_i32(slot)),
            DataType::Bool => DataValue::Bool(slot[0] != 0),
            DataType::Text(_) => DataValue::Text(VarChar::read_from(slot).into_string()),
        });

        offset += size;
    }

    Ok(values)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::storage::Field;

    fn schema() -> TableSchema {
        TableSchema::new(
            "t",
            vec![
                Field::new("id", DataType::Int),
                Field::new("name", DataType::Text(5)),
                Field::new("active", DataType::Bool),
            ],
        )
        .unwrap()
    }

    fn row(id: i32, name: &str, active: bool) -> Vec<DataValue> {
        vec![
            DataValue::Int(id),
            DataValue::Text(name.into()),
            DataValue::Bool(active),
        ]
    }

    #[test]
    fn test_layout() {
        let buf = encode(&schema(), &row(258, "Al", true)).unwrap();
        assert_eq!(buf, [2, 1, 0, 0, b'A', b'l', 0, 0, 0, 1]);
    }

    #[test]
    fn test_round_trip() {
        let schema = schema();
        for values in [row(1, "Alice", true), row(-42, "", false), row(i32::MAX, "x y", true)] {
            let buf = encode(&schema, &values).unwrap();
            assert_eq!(buf.len(), schema.record_size);
            assert_eq!(decode(&schema, &buf).unwrap(), values);
        }
    }

    #[test]
    fn test_text_is_truncated() {
        let schema = schema();
        let buf = encode(&schema, &row(1, "Alexandra", false)).unwrap();
        assert_eq!(decode(&schema, &buf).unwrap(), row(1, "Alexa", false));
    }

    #[test]
    fn test_type_mismatch() {
        let values = vec![
            DataValue::Text("1".into()),
            DataValue::Text("a".into()),
            DataValue::Bool(true),
        ];
        assert!(matches!(
            encode(&schema(), &values),
            Err(DbError::TypeMismatch { field, .. }) if field == "id"
        ));
    }

    #[test]
    fn test_value_count() {
        assert!(matches!(
            encode(&schema(), &[DataValue::Int(1)]),
            Err(DbError::ValueCount { expected: 3, found: 1 })
        ));
    }

    #[test]
    fn test_decode_wrong_length() {
        assert!(decode(&schema(), &[0; 4]).is_err());
    }
}
