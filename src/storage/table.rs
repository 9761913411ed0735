//! Table store: one file per table, a fixed header followed by fixed-size
//! records appended back to back.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::schema::HEADER_SIZE;
use super::{DataType, DataValue, TableSchema, codec};
use crate::config::table_path;
use crate::error::{DbError, Result};
use crate::index::AvlIndex;

/// An open table: schema, data file and one index per field.
#[derive(Debug)]
pub struct Table {
    schema: TableSchema,
    path: PathBuf,
    file: File,
    indexes: Vec<AvlIndex>,
    records: u64,
}

impl Table {
    /// Writes the header of a new, empty table. Fails if a file for `name`
    /// already exists.
    pub fn create(dir: &Path, schema: &TableSchema) -> Result<PathBuf> {
        let path = table_path(dir, &schema.name);
        let header = schema.to_bytes();

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(DbError::TableExists(schema.name.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = file.write_all(&header).and_then(|_| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(e.into());
        }

        info!("created table '{}' at {}", schema.name, path.display());
        Ok(path)
    }

    /// Opens `name`, reads its header back and rebuilds every field index
    /// with a full scan.
    pub fn open(dir: &Path, name: &str) -> Result<Self> {
        let path = table_path(dir, name);
        let mut file = match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(DbError::TableNotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut header = vec![0u8; HEADER_SIZE];
        file.read_exact(&mut header).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => DbError::Corrupt("header block is truncated".into()),
            _ => e.into(),
        })?;
        let schema = TableSchema::from_bytes(&header)?;

        let mut table = Self {
            indexes: schema.fields.iter().map(|_| AvlIndex::new()).collect(),
            schema,
            path,
            file,
            records: 0,
        };
        table.rebuild_indexes()?;

        debug!(
            "opened table '{}' with {} records",
            table.schema.name, table.records
        );
        Ok(table)
    }

    fn rebuild_indexes(&mut self) -> Result<()> {
        let Self {
            schema,
            file,
            indexes,
            records,
            ..
        } = self;

        for row in Scan::new(file, schema)? {
            let (position, values) = row?;
            index_values(indexes, position, &values);
            *records += 1;
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Complete records stored in the file.
    pub fn len(&self) -> u64 {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    pub fn index(&self, field: &str) -> Option<&AvlIndex> {
        self.schema.index_of(field).map(|i| &self.indexes[i])
    }

    /// Encodes `values` and appends them. See [`Table::append_record`].
    pub fn insert(&mut self, values: &[DataValue]) -> Result<u64> {
        let record = codec::encode(&self.schema, values)?;
        self.append_record(&record)
    }

    /// Appends an encoded record right after the last complete one, syncs it
    /// to disk and only then updates the indexes. Returns the record position.
    pub fn append_record(&mut self, record: &[u8]) -> Result<u64> {
        let values = codec::decode(&self.schema, record)?;

        let record_size = self.schema.record_size as u64;
        let len = self.file.metadata()?.len();
        let complete = len.saturating_sub(HEADER_SIZE as u64) / record_size;
        let position = HEADER_SIZE as u64 + complete * record_size;

        if position != len {
            warn!(
                "discarding {} trailing bytes of '{}'",
                len - position,
                self.path.display()
            );
            self.file.set_len(position)?;
        }

        self.file.seek(SeekFrom::Start(position))?;
        self.file.write_all(record)?;
        self.file.sync_data()?;

        index_values(&mut self.indexes, position, &values);
        self.records = complete + 1;

        debug!("appended record to '{}' at {position}", self.schema.name);
        Ok(position)
    }

    /// Sequential scan from the first record. Every call starts over.
    pub fn scan(&self) -> Result<Scan<'_>> {
        Scan::new(&self.file, &self.schema)
    }

    /// Reads the record stored at `position`.
    pub fn read_at(&self, position: u64) -> Result<Vec<DataValue>> {
        let mut reader = &self.file;
        let mut buf = vec![0; self.schema.record_size];
        reader.seek(SeekFrom::Start(position))?;
        reader.read_exact(&mut buf)?;
        codec::decode(&self.schema, &buf)
    }

    /// Point lookup through the index of `field`: first record whose
    /// rendered value equals `key`.
    pub fn lookup(&self, field: &str, key: &str) -> Result<Option<Vec<DataValue>>> {
        let index = self
            .index(field)
            .ok_or_else(|| DbError::FieldNotFound(field.to_string()))?;

        match index.search(key) {
            Some(position) => self.read_at(position).map(Some),
            None => Ok(None),
        }
    }

    /// Indexed substring search over every text field. Returns distinct
    /// positions in file order.
    pub fn search_text(&self, needle: &str) -> Vec<u64> {
        let mut positions: Vec<u64> = self
            .schema
            .fields
            .iter()
            .zip(&self.indexes)
            .filter(|(field, _)| matches!(field.data_type, DataType::Text(_)))
            .flat_map(|(_, index)| index.collect_matching_substring(needle))
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions
    }
}

fn index_values(indexes: &mut [AvlIndex], position: u64, values: &[DataValue]) {
    for (index, value) in indexes.iter_mut().zip(values) {
        index.insert(&value.render(), position);
    }
}

/// Lazy sequence of `(position, values)` pairs. A trailing partial record
/// ends the scan silently.
pub struct Scan<'t> {
    reader: BufReader<&'t File>,
    schema: &'t TableSchema,
    position: u64,
    buf: Vec<u8>,
    done: bool,
}

impl<'t> Scan<'t> {
    fn new(file: &'t File, schema: &'t TableSchema) -> Result<Self> {
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        Ok(Self {
            reader,
            schema,
            position: HEADER_SIZE as u64,
            buf: vec![0; schema.record_size],
            done: false,
        })
    }

    fn fill(&mut self) -> io::Result<usize> {
        let mut filled = 0;
        while filled < self.buf.len() {
            match self.reader.read(&mut self.buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl Iterator for Scan<'_> {
    type Item = Result<(u64, Vec<DataValue>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let filled = match self.fill() {
            Ok(filled) => filled,
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        };

        if filled < self.buf.len() {
            if filled > 0 {
                warn!(
                    "ignoring partial record of {filled} bytes at {} in table '{}'",
                    self.position, self.schema.name
                );
            }
            self.done = true;
            return None;
        }

        let position = self.position;
        self.position += self.buf.len() as u64;
        Some(codec::decode(self.schema, &self.buf).map(|values| (position, values)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::storage::Field;
    use tempfile::tempdir;

    fn people() -> TableSchema {
        TableSchema::new(
            "people",
            vec![
                Field::new("id", DataType::Int),
                Field::new("name", DataType::Text(10)),
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

    fn rows(table: &Table) -> Vec<(u64, Vec<DataValue>)> {
        table.scan().unwrap().map(|row| row.unwrap()).collect()
    }

    #[test]
    fn test_create_writes_header_only() {
        let dir = tempdir().unwrap();
        let path = Table::create(dir.path(), &people()).unwrap();
        assert_eq!(fs::metadata(path).unwrap().len(), HEADER_SIZE as u64);

        let table = Table::open(dir.path(), "people").unwrap();
        assert_eq!(table.schema(), &people());
        assert!(table.is_empty());
        assert!(rows(&table).is_empty());
    }

    #[test]
    fn test_create_existing_table_fails() {
        let dir = tempdir().unwrap();
        Table::create(dir.path(), &people()).unwrap();
        assert!(matches!(
            Table::create(dir.path(), &people()),
            Err(DbError::TableExists(name)) if name == "people"
        ));
    }

    #[test]
    fn test_open_missing_table() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Table::open(dir.path(), "ghost"),
            Err(DbError::TableNotFound(name)) if name == "ghost"
        ));
    }

    #[test]
    fn test_positions_follow_header() {
        let dir = tempdir().unwrap();
        Table::create(dir.path(), &people()).unwrap();
        let mut table = Table::open(dir.path(), "people").unwrap();

        let record_size = table.schema().record_size as u64;
        let first = table.insert(&row(1, "Alice", true)).unwrap();
        let second = table.insert(&row(2, "Bob", false)).unwrap();

        assert_eq!(first, HEADER_SIZE as u64);
        assert_eq!(second, HEADER_SIZE as u64 + record_size);
        assert_eq!(table.len(), 2);
        assert_eq!(
            rows(&table),
            vec![(first, row(1, "Alice", true)), (second, row(2, "Bob", false))]
        );
    }

    #[test]
    fn test_scan_is_restartable() {
        let dir = tempdir().unwrap();
        Table::create(dir.path(), &people()).unwrap();
        let mut table = Table::open(dir.path(), "people").unwrap();
        table.insert(&row(1, "Alice", true)).unwrap();

        let mut scan = table.scan().unwrap();
        assert!(scan.next().is_some());
        assert!(scan.next().is_none());
        assert_eq!(rows(&table).len(), 1);
    }

    #[test]
    fn test_indexes_rebuilt_on_open() {
        let dir = tempdir().unwrap();
        Table::create(dir.path(), &people()).unwrap();
        {
            let mut table = Table::open(dir.path(), "people").unwrap();
            table.insert(&row(1, "Alice", true)).unwrap();
            table.insert(&row(2, "Bob", true)).unwrap();
        }

        let table = Table::open(dir.path(), "people").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.index("id").unwrap().len(), 2);
        // Both records render "true"; only the first one is indexed.
        let active = table.index("active").unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active.search("true"), Some(HEADER_SIZE as u64));

        assert_eq!(table.lookup("name", "Bob").unwrap(), Some(row(2, "Bob", true)));
        assert_eq!(table.lookup("name", "Carol").unwrap(), None);
        assert!(matches!(
            table.lookup("age", "1"),
            Err(DbError::FieldNotFound(_))
        ));
    }

    #[test]
    fn test_insert_updates_indexes() {
        let dir = tempdir().unwrap();
        Table::create(dir.path(), &people()).unwrap();
        let mut table = Table::open(dir.path(), "people").unwrap();
        let position = table.insert(&row(7, "Zed", false)).unwrap();
        assert_eq!(table.index("id").unwrap().search("7"), Some(position));
        assert_eq!(table.index("name").unwrap().search("Zed"), Some(position));
    }

    #[test]
    fn test_search_text() {
        let dir = tempdir().unwrap();
        Table::create(dir.path(), &people()).unwrap();
        let mut table = Table::open(dir.path(), "people").unwrap();
        let alice = table.insert(&row(1, "Alice", true)).unwrap();
        table.insert(&row(2, "Bob", false)).unwrap();
        let malice = table.insert(&row(3, "Malice", true)).unwrap();

        assert_eq!(table.search_text("lic"), vec![alice, malice]);
        assert!(table.search_text("xyz").is_empty());
    }

    #[test]
    fn test_partial_record_is_ignored() {
        let dir = tempdir().unwrap();
        Table::create(dir.path(), &people()).unwrap();
        let path = {
            let mut table = Table::open(dir.path(), "people").unwrap();
            table.insert(&row(1, "Alice", true)).unwrap();
            table.path().to_path_buf()
        };

        // Half of a second record.
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[9, 0, 0, 0, b'P', b'a']).unwrap();
        drop(file);

        let mut table = Table::open(dir.path(), "people").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.index("id").unwrap().search("9"), None);
        assert_eq!(rows(&table).len(), 1);

        // The next append overwrites the partial bytes.
        let record_size = table.schema().record_size as u64;
        let position = table.insert(&row(2, "Bob", false)).unwrap();
        assert_eq!(position, HEADER_SIZE as u64 + record_size);
        assert_eq!(
            fs::metadata(&path).unwrap().len(),
            HEADER_SIZE as u64 + 2 * record_size
        );
        assert_eq!(rows(&table).len(), 2);
    }

    #[test]
    fn test_corrupt_header() {
        let dir = tempdir().unwrap();
        fs::write(table_path(dir.path(), "junk"), b"not a table").unwrap();
        assert!(matches!(
            Table::open(dir.path(), "junk"),
            Err(DbError::Corrupt(_))
        ));
    }

    #[test]
    fn test_append_wrong_size() {
        let dir = tempdir().unwrap();
        Table::create(dir.path(), &people()).unwrap();
        let mut table = Table::open(dir.path(), "people").unwrap();
        assert!(table.append_record(&[0; 3]).is_err());
        assert!(table.is_empty());
    }
}
