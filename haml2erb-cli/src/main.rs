use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use haml2erb::{convert_directory, convert_file, ConvertFileOptions, FileResult};
use lexopt::Parser;
use miette::Diagnostic;

#[derive(Debug)]
struct CliError {
    cause: lexopt::Error,
    exename: OsString,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse cli args.")
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

impl Diagnostic for CliError {
    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(help(&self.exename)))
    }
}

struct Args {
    path: PathBuf,
    check: bool,
    dry_run: bool,
    delete: bool,
    force: bool,
    debug: bool,
}

impl Args {
    fn parse(args: Vec<OsString>) -> Result<Args, lexopt::Error> {
        use lexopt::prelude::*;

        let mut parser = Parser::from_args(args);
        let mut path = None;
        let mut check = false;
        let mut dry_run = false;
        let mut delete = false;
        let mut force = false;
        let mut debug = false;
        while let Some(arg) = parser.next()? {
            match arg {
                Long("check") => check = true,
                Long("dry-run") => dry_run = true,
                Long("delete") => delete = true,
                Long("force") => force = true,
                Long("debug") => debug = true,
                Value(value) if path.is_none() => path = Some(PathBuf::from(value)),
                _ => return Err(arg.unexpected()),
            }
        }

        Ok(Args {
            path: path.ok_or("Missing input path")?,
            check,
            dry_run,
            delete,
            force,
            debug,
        })
    }
}

fn help(exename: &OsString) -> String {
    format!(
        "Usage: {} [OPTIONS] <PATH>\n\n\
Converts HAML templates to ERB. PATH may be a single .haml file or a\n\
directory, searched recursively for *.haml files.\n\n\
Options:\n\
      --check      validate the converted ERB's structural balance\n\
      --dry-run    print what would change without writing any files\n\
      --delete     remove each original .haml file after a successful conversion\n\
      --force      skip the confirmation prompt for --delete\n\
      --debug      enable verbose logging and full error backtraces\n\
  -V, --version    print the version and exit\n\
  -h, --help       print this help and exit\n",
        Path::new(exename).file_name().unwrap_or_default().to_string_lossy()
    )
}

fn init_logging(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .init();
}

fn confirm_delete(path: &Path) -> bool {
    eprint!("Delete original .haml file(s) under {}? [y/N] ", path.display());
    let _ = std::io::stderr().flush();
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Prints one file's outcome and returns whether it succeeded.
fn report(result: &FileResult) -> bool {
    let mut ok = true;

    for err in &result.errors {
        ok = false;
        eprintln!("error: {}: {err}", result.path.display());
    }
    for verr in &result.validation_errors {
        ok = false;
        match verr.line {
            Some(line) => eprintln!("error: {}:{line}: {}", result.path.display(), verr.message),
            None => eprintln!("error: {}: {}", result.path.display(), verr.message),
        }
    }

    if ok {
        if result.dry_run {
            println!("would write {}", result.path.display());
        } else if !result.skipped {
            println!("converted {}", result.path.display());
        }
    }
    ok
}

fn main() -> miette::Result<()> {
    let mut argv: Vec<_> = std::env::args_os().collect();
    let exename = argv.remove(0);

    if argv.iter().any(|a| a == "-h" || a == "--help") {
        println!("{}", help(&exename));
        return Ok(());
    }
    if argv.iter().any(|a| a == "-V" || a == "--version") {
        println!("haml2erb {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let args = Args::parse(argv).map_err(|cause| CliError { exename, cause })?;
    init_logging(args.debug);

    if args.delete && !args.force && !args.dry_run && !confirm_delete(&args.path) {
        eprintln!("Aborted: pass --force to skip this prompt.");
        std::process::exit(1);
    }

    let opts = ConvertFileOptions {
        delete_original: args.delete,
        validate: args.check,
        dry_run: args.dry_run,
    };

    let results = if args.path.is_dir() {
        convert_directory(&args.path, opts)
    } else {
        vec![convert_file(&args.path, opts)]
    };

    let all_ok = results.iter().fold(true, |acc, result| report(result) && acc);

    if !all_ok {
        std::process::exit(1);
    }
    Ok(())
}
