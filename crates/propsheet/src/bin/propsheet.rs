use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use propsheet::{tokenize, ParseOptionsBuilder, PropertySheet, PropertySheetError, Target};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Inspect property sheets
#[derive(Parser)]
#[clap(version)]
struct Opts {
    /// Log more (`-v` debug, `-vv` trace); overrides RUST_LOG
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Do not follow `@import` directives
    #[clap(long, global = true)]
    no_imports: bool,

    #[clap(subcommand)]
    subcmd: SubCommand,
}

#[derive(Subcommand)]
enum SubCommand {
    Dump(Dump),
    Get(Get),
    Condition(Condition),
    Tokens(Tokens),
}

impl SubCommand {
    fn file(&self) -> &Path {
        match self {
            SubCommand::Dump(d) => &d.file,
            SubCommand::Get(g) => &g.file,
            SubCommand::Condition(c) => &c.file,
            SubCommand::Tokens(t) => &t.file,
        }
    }
}

/// Print every declaration of a sheet with macros expanded
#[derive(Parser)]
struct Dump {
    file: PathBuf,
}

/// Print the values of one property, one per line
#[derive(Parser)]
struct Get {
    file: PathBuf,
    selector: String,
}

/// Compile a pivot expression against the sheet's configurations
#[derive(Parser)]
struct Condition {
    file: PathBuf,
    expression: String,
    /// Package name used for pivots without a built-in MSBuild property
    #[clap(long)]
    package: String,
    /// msbuild, label or path
    #[clap(long, default_value = "msbuild")]
    target: Target,
}

/// Print the token stream of a sheet
#[derive(Parser)]
struct Tokens {
    file: PathBuf,
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(file: &Path, no_imports: bool) -> anyhow::Result<PropertySheet> {
    let options = ParseOptionsBuilder::default()
        .follow_imports(!no_imports)
        .build()?;
    Ok(PropertySheet::load(file, &options)?)
}

fn run(opts: &Opts) -> anyhow::Result<()> {
    match &opts.subcmd {
        SubCommand::Dump(dump) => {
            let sheet = load(&dump.file, opts.no_imports)?;
            for line in sheet.dump()? {
                println!("{line}");
            }
        }
        SubCommand::Get(get) => {
            let sheet = load(&get.file, opts.no_imports)?;
            let Some(value) = sheet.get(&get.selector)? else {
                bail!("nothing is declared at `{}`", get.selector);
            };
            for v in value.values() {
                println!("{v}");
            }
        }
        SubCommand::Condition(condition) => {
            let sheet = load(&condition.file, opts.no_imports)?;
            let compiled = sheet.condition(
                &condition.expression,
                &condition.package,
                condition.target,
            )?;
            println!("{compiled}");
        }
        SubCommand::Tokens(tokens) => {
            let text = std::fs::read_to_string(&tokens.file)
                .with_context(|| format!("failed to read {}", tokens.file.display()))?;
            for token in tokenize(&text) {
                if token.is_whitespace() {
                    continue;
                }
                println!("{}:{} {} {:?}", token.row, token.col, token.kind.describe(), token.data);
            }
        }
    }
    Ok(())
}

/// `file:row:col: message` for parse errors (which know their position), `file: message`
/// for everything else.
fn diagnostic(file: &Path, err: &anyhow::Error) -> String {
    match err.downcast_ref::<PropertySheetError>() {
        Some(e) if e.is_located() => e.to_string(),
        Some(e) => format!("{}: {e}", file.display()),
        None => format!("{}: {err:#}", file.display()),
    }
}

fn main() -> ExitCode {
    let opts = Opts::parse();
    init_logging(opts.verbose);

    match run(&opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", diagnostic(opts.subcmd.file(), &err));
            ExitCode::FAILURE
        }
    }
}
