//! cellflow CLI - run cell scripts through the recalculation engine

use anyhow::{bail, Context, Result};
use cellflow::prelude::*;
use cellflow::{parse_formula, ReferenceExpr};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cellflow")]
#[command(author, version, about = "Spreadsheet computation engine")]
struct Cli {
    /// Log recalculation details (-v debug, -vv trace); overrides RUST_LOG
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a cell script and print the resulting values
    ///
    /// Each line is `ADDRESS CONTENT`, e.g. `A3 =A1+A2` or `Data!B2 42`.
    /// `@sheet NAME` adds a sheet; lines starting with `#` are comments.
    Run {
        /// Script file (default: stdin)
        file: Option<PathBuf>,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Parse a formula and print its canonical form and references
    Parse {
        /// Formula text, including the leading `=`
        formula: String,
    },
}

#[derive(Args)]
struct RunOptions {
    /// Print the cells changed by every edit
    #[arg(long)]
    trace_changes: bool,

    /// Print formulas next to their values
    #[arg(long)]
    show_formulas: bool,

    /// Maximum expression depth during evaluation
    #[arg(long)]
    max_depth: Option<usize>,

    /// Maximum number of cells a single range may read
    #[arg(long)]
    max_range_cells: Option<u64>,

    /// Let panics in function implementations abort the run
    #[arg(long)]
    no_catch_panics: bool,
}

impl RunOptions {
    fn engine_options(&self) -> EngineOptions {
        let defaults = EngineOptions::default();
        EngineOptions {
            max_depth: self.max_depth.unwrap_or(defaults.max_depth),
            max_range_cells: self.max_range_cells.unwrap_or(defaults.max_range_cells),
            catch_panics: !self.no_catch_panics,
            ..defaults
        }
    }
}

/// One meaningful line of a cell script
#[derive(Debug, PartialEq, Eq)]
enum ScriptLine<'a> {
    AddSheet(&'a str),
    Set { address: &'a str, content: &'a str },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { file, options } => run(file.as_deref(), &options),
        Commands::Parse { formula } => show_parse(&formula),
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("warn,cellflow=debug,cellflow_formula=debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(file: Option<&Path>, options: &RunOptions) -> Result<()> {
    let script = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?,
        None => {
            let mut script = String::new();
            io::stdin()
                .read_to_string(&mut script)
                .context("Failed to read stdin")?;
            script
        }
    };

    let mut engine =
        Engine::with_options(options.engine_options()).context("Invalid engine options")?;

    for (index, line) in script.lines().enumerate() {
        let line_no = index + 1;
        let parsed = parse_line(line).with_context(|| format!("line {}", line_no))?;
        match parsed {
            None => {}
            Some(ScriptLine::AddSheet(name)) => {
                engine
                    .add_sheet(name)
                    .with_context(|| format!("line {}: cannot add sheet '{}'", line_no, name))?;
            }
            Some(ScriptLine::Set { address, content }) => {
                let changes = engine
                    .set(address, content)
                    .with_context(|| format!("line {}: cannot set '{}'", line_no, address))?;
                if options.trace_changes {
                    let cells: Vec<String> = changes
                        .iter()
                        .map(|(key, value)| format!("{}={}", engine.display_address(key), value))
                        .collect();
                    println!("# {}: {}", line_no, cells.join(" "));
                }
            }
        }
    }

    for (key, value) in engine.snapshot().iter() {
        let address = engine.display_address(key);
        let formula = engine.cell(key).and_then(|cell| cell.formula());
        match formula {
            Some(formula) if options.show_formulas => {
                println!("{}\t{}\t={}", address, value, formula)
            }
            _ => println!("{}\t{}", address, value),
        }
    }

    let stats = engine.last_pass();
    tracing::info!(
        evaluated = stats.evaluated,
        circular = stats.circular,
        faults = stats.faults,
        "script finished"
    );
    Ok(())
}

fn show_parse(formula: &str) -> Result<()> {
    match parse_formula(formula) {
        Ok(ast) => {
            println!("={}", ast);
            for reference in ast.references() {
                match reference {
                    ReferenceExpr::Cell(r) => println!("  cell  {}", r),
                    ReferenceExpr::Range(r) => println!("  range {}", r),
                }
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", formula);
            eprintln!("{}^", " ".repeat(e.position));
            bail!("{} ({})", e, e.cell_error())
        }
    }
}

/// Split a script line into its parts; blank lines and comments are `None`
fn parse_line(line: &str) -> Result<Option<ScriptLine<'_>>> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    if let Some(rest) = trimmed.strip_prefix("@sheet") {
        let name = rest.trim();
        if name.is_empty() || !rest.starts_with(char::is_whitespace) {
            bail!("expected '@sheet NAME'");
        }
        return Ok(Some(ScriptLine::AddSheet(name)));
    }

    let end = address_end(trimmed)?;
    let address = &trimmed[..end];
    // One separator; the rest of the line is the content as typed
    let mut rest = trimmed[end..].chars();
    rest.next();
    Ok(Some(ScriptLine::Set {
        address,
        content: rest.as_str(),
    }))
}

/// Byte offset where the address ends; quoted sheet names may hold spaces
fn address_end(line: &str) -> Result<usize> {
    let bytes = line.as_bytes();
    let mut i = 0;
    if bytes.first() == Some(&b'\'') {
        i = 1;
        loop {
            match bytes.get(i) {
                None => bail!("unterminated sheet name"),
                Some(b'\'') if bytes.get(i + 1) == Some(&b'\'') => i += 2,
                Some(b'\'') => {
                    i += 1;
                    break;
                }
                Some(_) => i += 1,
            }
        }
    }
    while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    Ok(i)
}
