use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use hotwatch::notify::Event;
use hotwatch::{
    blocking::{Flow, Hotwatch},
    EventKind,
};
use miette::{bail, IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use fpc::{Engine, Line, SCAN_INTERVAL};

/// fpc is a freely programmable control unit - a software PLC driven by a
/// plain-text mnemonic instruction set.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a program file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Load a program file and run the scan cycle, rendering live state
    Run {
        /// Program file to run
        name: PathBuf,
        /// Stop after this many seconds instead of running until interrupted
        #[arg(short, long)]
        duration: Option<u64>,
    },
    /// Check a program file for syntax errors without running it
    Check {
        /// File to check
        name: PathBuf,
    },
    /// Place a watch on a program file to re-check it on every change
    Watch {
        /// Program file to watch
        name: PathBuf,
    },
}

fn main() -> Result<()> {
    use MsgColor::*;
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Some(command) = args.command {
        match command {
            Command::Run { name, duration } => run(&name, duration),
            Command::Check { name } => {
                file_message(Green, "Checking", &name);
                check(&name)?;
                message(Green, "Success", "no errors found!");
                Ok(())
            }
            Command::Watch { name } => {
                if !name.exists() {
                    bail!("File does not exist. Exiting...")
                }
                // Vim breaks if watching a single file
                let folder_path = match name.parent() {
                    Some(pth) if pth.is_dir() => pth.to_path_buf(),
                    _ => Path::new(".").to_path_buf(),
                };

                // Clear screen and move cursor to top left
                print!("\x1B[2J\x1B[2;1H");
                file_message(Green, "Watching", &name);
                message(Cyan, "Help", "press CTRL+C to exit");

                let mut watcher = Hotwatch::new_with_custom_delay(Duration::from_millis(500))
                    .into_diagnostic()?;

                watcher
                    .watch(folder_path, move |event: Event| match event.kind {
                        // Watch remove for vim changes
                        EventKind::Modify(_) | EventKind::Remove(_) => {
                            print!("\x1B[2J\x1B[2;1H");
                            file_message(Green, "Watching", &name);
                            message(Green, "Re-checking", "file change detected");
                            message(Cyan, "Help", "press CTRL+C to exit");

                            match check(&name) {
                                Ok(_) => message(Green, "Success", "no errors found!"),
                                Err(e) => println!("\n{:?}", e),
                            }
                            Flow::Continue
                        }
                        _ => Flow::Continue,
                    })
                    .into_diagnostic()?;
                watcher.run();
                Ok(())
            }
        }
    } else if let Some(path) = args.path {
        run(&path, None)
    } else {
        println!("\n~ fpc v{VERSION} ~");
        println!("{SHORT_INFO}");
        Ok(())
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &PathBuf) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message<S>(color: MsgColor, left: S, right: S)
where
    S: Colorize + std::fmt::Display,
{
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

/// Parse a program file and print one diagnostic per erroneous line.
fn check(name: &PathBuf) -> Result<Vec<Line>> {
    let contents = fs::read_to_string(name).into_diagnostic()?;
    let lines = fpc::parse(contents.lines());
    let mut errors = 0;

    for line in &lines {
        if let Some(msg) = line.error_message() {
            println!(
                "{:>12} line {}: {} `{}`",
                "Error".red(),
                line.number,
                msg,
                line.source.trim()
            );
            errors += 1;
        }
    }
    if errors > 0 {
        bail!("program contains {errors} syntax error(s)");
    }
    Ok(lines)
}

fn run(name: &PathBuf, duration: Option<u64>) -> Result<()> {
    use MsgColor::*;
    file_message(Green, "Loading", name);
    check(name)?;

    let contents = fs::read_to_string(name).into_diagnostic()?;
    let engine = Engine::default();
    engine.load(contents.lines()).into_diagnostic()?;

    engine.start();
    if !engine.is_running() {
        bail!("program did not start: it may contain no executable line");
    }
    message(Green, "Running", "press CTRL+C to stop");

    let mut elapsed = 0u64;
    while engine.is_running() {
        sleep(SCAN_INTERVAL * 10);
        elapsed += 1;
        render(&engine);
        if duration.is_some_and(|limit| elapsed >= limit) {
            break;
        }
    }
    engine.stop();

    if let Some(msg) = engine.execution_error_message() {
        bail!("execution fault: {msg}");
    }
    file_message(Green, "Stopped", name);
    Ok(())
}

/// One compact live-state row: the first sixteen inputs and outputs plus any
/// nonzero counters.
fn render(engine: &Engine) {
    let bits = |get: &dyn Fn(usize) -> bool, len: usize| -> String {
        (0..len.min(16))
            .map(|i| if get(i) { '1' } else { '0' })
            .collect()
    };
    let inputs = bits(
        &|i| engine.input_value(i).unwrap_or(false),
        engine.input_len(),
    );
    let outputs = bits(
        &|i| engine.output_value(i).unwrap_or(false),
        engine.output_len(),
    );
    let counters: Vec<String> = (0..engine.counter_len())
        .filter_map(|i| match engine.counter_value(i) {
            Ok(value) if value != 0 => Some(format!("C{i}={value}")),
            _ => None,
        })
        .collect();

    println!(
        "{:>12} I {} O {} {}",
        "State".cyan(),
        inputs,
        outputs,
        counters.join(" ")
    );
}

const SHORT_INFO: &str = r"
Welcome to fpc, a freely programmable control unit: a software PLC that
executes plain-text mnemonic programs on a continuous scan cycle.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
