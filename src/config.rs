use std::path::{Path, PathBuf};

pub const TABLE_FILE_EXTENSION: &str = "tbl";
pub const DEFAULT_HISTORY_SIZE: usize = 30;
pub const PROMPT: &str = "tabula> ";

/// Runtime settings assembled from the command line.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory where every table file lives.
    pub data_dir: PathBuf,
    /// Scripts fed to the executor before the shell starts.
    pub scripts: Vec<PathBuf>,
    /// Statements executed after the scripts, in order.
    pub commands: Vec<String>,
    /// Skip the interactive shell.
    pub batch: bool,
    /// Number of lines kept in the shell's recall buffer.
    pub history_size: usize,
}

/// File backing the table `name` inside `dir`. Identity on disk is derived
/// from the name only.
pub fn table_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{TABLE_FILE_EXTENSION}"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_table_path() {
        let path = table_path(Path::new("/data"), "users");
        assert_eq!(path, PathBuf::from("/data/users.tbl"));
    }
}
