pub mod config;
pub mod error;
pub mod executor;
pub mod index;
pub mod query;
pub mod script;
pub mod storage;
pub mod var_char;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use config::{Config, DEFAULT_HISTORY_SIZE, PROMPT};
use executor::Executor;
use script::Flow;

/// Single-user table store with a small SQL-like shell
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding the table files
    #[arg(short, long, env = "TABULA_DIR", default_value = ".")]
    dir: PathBuf,

    /// Script to run before the shell starts (repeatable)
    #[arg(short, long, value_name = "FILE")]
    load: Vec<PathBuf>,

    /// Exit after scripts and commands instead of starting the shell
    #[arg(short, long)]
    batch: bool,

    /// Lines kept in the shell history
    #[arg(long, default_value_t = DEFAULT_HISTORY_SIZE)]
    history: usize,

    /// Statements to run after the scripts
    #[arg(value_name = "COMMANDS")]
    commands: Vec<String>,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            data_dir: args.dir,
            scripts: args.load,
            commands: args.commands,
            batch: args.batch,
            history_size: args.history,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let config = Config::from(Args::parse());

    // 데이터 디렉터리 유무 체크
    if !config.data_dir.is_dir() {
        eprintln!("Data directory not found: '{}'", config.data_dir.display());
        return ExitCode::FAILURE;
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut exec = Executor::new(&config.data_dir);
    let mut out = io::stdout().lock();
    info!("data directory '{}'", config.data_dir.display());

    for path in &config.scripts {
        if script::load_file(&mut exec, path, &mut out, 0)? == Flow::Exit {
            return Ok(());
        }
    }
    for command in &config.commands {
        if script::dispatch(&mut exec, command, &mut out, 0)? == Flow::Exit {
            return Ok(());
        }
    }
    if config.batch {
        return Ok(());
    }
    drop(out);

    shell(&mut exec, config.history_size)
}

fn shell(exec: &mut Executor, history_size: usize) -> Result<(), Box<dyn std::error::Error>> {
    let editor_config = rustyline::Config::builder()
        .max_history_size(history_size)?
        .auto_add_history(false)
        .build();
    let mut editor = DefaultEditor::with_config(editor_config)?;

    println!("Tabula shell (type HELP for statements, EXIT to quit)");
    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;

                let mut out = io::stdout().lock();
                let flow = script::dispatch(exec, line, &mut out, 0)?;
                out.flush()?;
                if flow == Flow::Exit {
                    break;
                }
            }
            // Ctrl-C clears the line
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => {
                println!("Bye");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
