//! Feeds statements to the executor one line at a time and prints results.
//! Shared by the shell, `--command` arguments and `LOAD` scripts.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use log::{info, warn};

use crate::executor::{Executor, QueryResult};

/// Scripts may LOAD other scripts up to this depth.
pub const MAX_LOAD_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Runs one statement and writes its result to `out`. A `LOAD` result is
/// expanded in place.
pub fn dispatch<W: Write>(exec: &mut Executor, line: &str, out: &mut W, depth: usize) -> io::Result<Flow> {
    match exec.run(line) {
        QueryResult::Load(path) => load_file(exec, &path, out, depth + 1),
        result => {
            writeln!(out, "{result}")?;
            Ok(match result {
                QueryResult::Exit => Flow::Exit,
                _ => Flow::Continue,
            })
        }
    }
}

/// Runs every line of `reader`. Blank lines and `#` comments are skipped,
/// every executed line is echoed as `[Line n] ...`. A line that cannot be
/// read ends the script with a message; only failures writing to `out` are
/// returned.
pub fn feed<R: BufRead, W: Write>(
    exec: &mut Executor,
    reader: R,
    out: &mut W,
    depth: usize,
) -> io::Result<Flow> {
    for (number, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("script read failed at line {}: {e}", number + 1);
                writeln!(out, "Error reading script at line {}: {e}", number + 1)?;
                return Ok(Flow::Continue);
            }
        };
        let command = line.trim();
        if command.is_empty() || command.starts_with('#') {
            continue;
        }

        writeln!(out, "[Line {}] {command}", number + 1)?;
        if dispatch(exec, command, out, depth)? == Flow::Exit {
            return Ok(Flow::Exit);
        }
    }
    Ok(Flow::Continue)
}

pub fn load_file<W: Write>(exec: &mut Executor, path: &Path, out: &mut W, depth: usize) -> io::Result<Flow> {
    if depth > MAX_LOAD_DEPTH {
        warn!("LOAD nesting too deep at '{}'", path.display());
        writeln!(out, "LOAD nested too deeply, skipping '{}'", path.display())?;
        return Ok(Flow::Continue);
    }

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            warn!("cannot open script '{}': {e}", path.display());
            writeln!(out, "Cannot open file: {}", path.display())?;
            return Ok(Flow::Continue);
        }
    };

    info!("loading script '{}'", path.display());
    writeln!(out, "{}", QueryResult::Load(path.to_path_buf()))?;
    feed(exec, BufReader::new(file), out, depth)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn output(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_feed_skips_comments_and_echoes() {
        let dir = tempdir().unwrap();
        let mut exec = Executor::new(dir.path());
        let script = "\
# setup
CREATE TABLE t (id int)

USE t
INSERT INTO t VALUES (7)
SELECT * FROM t
";
        let mut out = Vec::new();
        let flow = feed(&mut exec, script.as_bytes(), &mut out, 0).unwrap();

        assert_eq!(flow, Flow::Continue);
        assert_eq!(
            output(out),
            "\
[Line 2] CREATE TABLE t (id int)
Table 't' created
[Line 4] USE t
Table 't' loaded with indexes (0 records)
[Line 5] INSERT INTO t VALUES (7)
1 row inserted
[Line 6] SELECT * FROM t
id: 7
1 rows returned
"
        );
    }

    #[test]
    fn test_errors_do_not_stop_the_script() {
        let dir = tempdir().unwrap();
        let mut exec = Executor::new(dir.path());
        let mut out = Vec::new();
        feed(&mut exec, "SELECT * FROM t\nHELP\n".as_bytes(), &mut out, 0).unwrap();

        let out = output(out);
        assert!(out.contains("Error: No table selected\n[Line 2] HELP\n"));
    }

    #[test]
    fn test_exit_stops_the_script() {
        let dir = tempdir().unwrap();
        let mut exec = Executor::new(dir.path());
        let mut out = Vec::new();
        let flow = feed(
            &mut exec,
            "CREATE TABLE a (x int)\nEXIT\nCREATE TABLE b (x int)\n".as_bytes(),
            &mut out,
            0,
        )
        .unwrap();

        assert_eq!(flow, Flow::Exit);
        assert!(dir.path().join("a.tbl").exists());
        assert!(!dir.path().join("b.tbl").exists());
    }

    #[test]
    fn test_nested_load() {
        let dir = tempdir().unwrap();
        let inner = dir.path().join("inner.sql");
        let outer = dir.path().join("outer.sql");
        fs::write(&inner, "USE t\nINSERT INTO t VALUES (1)\n").unwrap();
        fs::write(
            &outer,
            format!("CREATE TABLE t (id int)\nLOAD {}\nSELECT COUNT(*) FROM t\n", inner.display()),
        )
        .unwrap();

        let mut exec = Executor::new(dir.path());
        let mut out = Vec::new();
        load_file(&mut exec, &outer, &mut out, 0).unwrap();

        assert!(output(out).ends_with("[Line 3] SELECT COUNT(*) FROM t\nCOUNT: 1\n"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let mut exec = Executor::new(dir.path());
        let mut out = Vec::new();
        let missing = dir.path().join("missing.sql");

        let flow = dispatch(&mut exec, &format!("LOAD {}", missing.display()), &mut out, 0).unwrap();

        assert_eq!(flow, Flow::Continue);
        assert_eq!(output(out), format!("Cannot open file: {}\n", missing.display()));
    }

    #[test]
    fn test_unreadable_script_keeps_running() {
        let dir = tempdir().unwrap();
        let binary = dir.path().join("binary.sql");
        fs::write(&binary, [0xff, 0xfe, b'\n']).unwrap();
        let scripts = dir.path().join("scripts");
        fs::create_dir(&scripts).unwrap();

        let mut exec = Executor::new(dir.path());
        let mut out = Vec::new();
        for path in [&binary, &scripts] {
            let flow = dispatch(&mut exec, &format!("LOAD {}", path.display()), &mut out, 0).unwrap();
            assert_eq!(flow, Flow::Continue);
        }
        let flow = dispatch(&mut exec, "CREATE TABLE t (id int)", &mut out, 0).unwrap();
        assert_eq!(flow, Flow::Continue);

        let out = output(out);
        assert_eq!(out.matches("Error reading script at line 1").count(), 2);
        assert!(out.ends_with("Table 't' created\n"));
    }

    #[test]
    fn test_unreadable_nested_script_does_not_abort_outer() {
        let dir = tempdir().unwrap();
        let binary = dir.path().join("binary.sql");
        fs::write(&binary, [0xc3, 0x28]).unwrap();
        let outer = dir.path().join("outer.sql");
        fs::write(
            &outer,
            format!("LOAD {}\nCREATE TABLE t (id int)\n", binary.display()),
        )
        .unwrap();

        let mut exec = Executor::new(dir.path());
        let mut out = Vec::new();
        let flow = load_file(&mut exec, &outer, &mut out, 0).unwrap();

        assert_eq!(flow, Flow::Continue);
        assert!(dir.path().join("t.tbl").exists());
    }

    #[test]
    fn test_exit_and_load_are_echoed() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("empty.sql");
        fs::write(&script, "# nothing\n").unwrap();

        let mut exec = Executor::new(dir.path());
        let mut out = Vec::new();
        dispatch(&mut exec, &format!("LOAD {}", script.display()), &mut out, 0).unwrap();
        let flow = dispatch(&mut exec, "EXIT", &mut out, 0).unwrap();

        assert_eq!(flow, Flow::Exit);
        assert_eq!(
            output(out),
            format!("Loading script: {}\nBye\n", script.display())
        );
    }

    #[test]
    fn test_recursive_load_is_bounded() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("loop.sql");
        fs::write(&script, format!("LOAD {}\n", script.display())).unwrap();

        let mut exec = Executor::new(dir.path());
        let mut out = Vec::new();
        let flow = load_file(&mut exec, &script, &mut out, 0).unwrap();

        assert_eq!(flow, Flow::Continue);
        assert!(output(out).contains("LOAD nested too deeply"));
    }
}
