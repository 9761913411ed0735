use std::fmt::Display;

/// Text stored in a fixed number of bytes.
///
/// Values longer than the capacity are clipped silently, never rejected. The
/// cut happens at the last UTF-8 character boundary that fits, so a clipped
/// value is always valid text. Unused bytes are zero on disk and a zero byte
/// ends the value when reading it back.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VarChar {
    data: String,
}

impl VarChar {
    pub fn clipped(value: &str, capacity: usize) -> Self {
        let mut end = value.len().min(capacity);
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        Self {
            data: value[..end].to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.data
    }

    pub fn into_string(self) -> String {
        self.data
    }

    /// Writes the text left-justified into `dest`, zero filling the rest.
    pub fn write_to(&self, dest: &mut [u8]) {
        let bytes = self.data.as_bytes();
        let len = bytes.len().min(dest.len());
        dest[..len].copy_from_slice(&bytes[..len]);
        dest[len..].fill(0);
    }

    pub fn read_from(src: &[u8]) -> Self {
        let end = src.iter().position(|b| *b == 0).unwrap_or(src.len());
        Self {
            data: String::from_utf8_lossy(&src[..end]).into_owned(),
        }
    }
}

impl Display for VarChar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.data)
    }
}
