// Command-line front end for the DHp2 unpacker.
//
// Subcommands detect and unpack containers, print their headers, and check
// a container against a known-good unpacked file. A file that fails does not
// stop the rest of a batch; the exit status reports whether any did.

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use log::trace;

use crate::format::code_table::{MAX_COPY_LENGTH, PACK_MODES};
use crate::format::decoder::DEFAULT_MAX_FULL_LENGTH;
use crate::format::{DecodeError, HEADER_SIZE, Header, NoTrace, Token, TokenSink};
use crate::io::{self, Destination, FileOutcome, UnpackStats};

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// DHp2 container unpacker.
#[derive(Parser, Debug)]
#[command(
    name = "dhp2",
    version,
    about = "DHp2 container unpacker",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Overwrite existing files in the output directory.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use twice to trace every token).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Unpack DHp2 containers (in place unless --output-dir is given).
    Unpack(UnpackArgs),
    /// Print the header of each container.
    Info(InfoArgs),
    /// Unpack a container and compare it byte by byte with a reference.
    Verify(VerifyArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct UnpackArgs {
    /// Files to unpack. Files that are not DHp2 containers are skipped.
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    files: Vec<PathBuf>,

    /// Write unpacked files here instead of overwriting the inputs.
    #[arg(long = "output-dir", short = 'o', value_hint = ValueHint::DirPath)]
    output_dir: Option<PathBuf>,

    /// Decode only (do not write output).
    #[arg(long = "check-only")]
    check_only: bool,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Files to inspect.
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Packed container.
    #[arg(value_hint = ValueHint::FilePath)]
    packed: PathBuf,

    /// Known-good unpacked file.
    #[arg(value_hint = ValueHint::FilePath)]
    expected: PathBuf,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Unpack,
    Info,
    Verify,
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    files: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
    expected_file: Option<PathBuf>,
    check_only: bool,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
}

fn resolve_options(cli: Cli) -> Options {
    let mut opts = Options {
        command: Command::Config,
        files: Vec::new(),
        output_dir: None,
        expected_file: None,
        check_only: false,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
    };

    match cli.command {
        Cmd::Unpack(args) => {
            opts.command = Command::Unpack;
            opts.files = args.files;
            opts.output_dir = args.output_dir;
            opts.check_only = args.check_only;
        }
        Cmd::Info(args) => {
            opts.command = Command::Info;
            opts.files = args.files;
        }
        Cmd::Verify(args) => {
            opts.command = Command::Verify;
            opts.files = vec![args.packed];
            opts.expected_file = Some(args.expected);
        }
        Cmd::Config => {}
    }
    opts
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("dhp2".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

fn log_filter(opts: &Options) -> &'static str {
    if opts.quiet {
        return "error";
    }
    match opts.verbose {
        0 => "warn",
        1 => "info",
        _ => "trace",
    }
}

// ---------------------------------------------------------------------------
// Token tracing
// ---------------------------------------------------------------------------

/// Logs each decoded token at trace level.
struct LogTrace;

impl TokenSink for LogTrace {
    fn token(&mut self, token: &Token) {
        match *token {
            Token::Literal { position, count } => {
                trace!("{position:#010x}: literal x{count}");
            }
            Token::BackReference {
                position,
                length,
                offset,
            } => {
                trace!("{position:#010x}: copy {length} from +{offset}");
            }
        }
    }
}

fn hex_digest(digest: &[u8; 32]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn stats_json(path: &Path, stats: &UnpackStats) -> serde_json::Value {
    serde_json::json!({
        "file": path.display().to_string(),
        "status": "unpacked",
        "packed_size": stats.packed_size,
        "unpacked_size": stats.unpacked_size,
        "pack_mode": stats.pack_mode,
        "literal_runs": stats.tokens.literal_runs,
        "literal_bytes": stats.tokens.literal_bytes,
        "back_references": stats.tokens.back_references,
        "copied_bytes": stats.tokens.copied_bytes,
        "sha256": stats.output_sha256.as_ref().map(hex_digest),
    })
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("dhp2 version {version} (Rust)");

    let file_io = cfg!(feature = "file-io") as u8;
    let parallel = cfg!(feature = "parallel") as u8;
    let ptr_size = std::mem::size_of::<*const ()>();

    eprintln!("FILE_IO={file_io}");
    eprintln!("PARALLEL={parallel}");
    eprintln!("HEADER_SIZE={HEADER_SIZE}");
    eprintln!("PACK_MODES={PACK_MODES}");
    eprintln!("MAX_COPY_LENGTH={MAX_COPY_LENGTH}");
    eprintln!("MAX_FULL_LENGTH={DEFAULT_MAX_FULL_LENGTH}");
    eprintln!("sizeof(usize)={ptr_size}");

    0
}

// ---------------------------------------------------------------------------
// Unpack command
// ---------------------------------------------------------------------------

fn destination_for<'a>(
    opts: &Options,
    input: &Path,
    target: &'a mut Option<PathBuf>,
) -> Result<Destination<'a>, String> {
    if opts.check_only {
        return Ok(Destination::Discard);
    }
    let Some(dir) = &opts.output_dir else {
        return Ok(Destination::InPlace);
    };
    let Some(name) = input.file_name() else {
        return Err(format!("{} has no file name", input.display()));
    };
    let path = dir.join(name);
    if path.exists() && !opts.force {
        return Err(format!(
            "output file exists, use -f to overwrite: {}",
            path.display()
        ));
    }
    Ok(Destination::Path(target.insert(path)))
}

fn cmd_unpack(opts: &Options) -> i32 {
    if let Some(dir) = &opts.output_dir
        && !opts.check_only
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("dhp2: output directory: {}: {e}", dir.display());
        return 1;
    }

    let mut failed = false;
    let mut report = Vec::new();

    for input in &opts.files {
        let mut target = None;
        let dest = match destination_for(opts, input, &mut target) {
            Ok(dest) => dest,
            Err(msg) => {
                eprintln!("dhp2: {msg}");
                failed = true;
                continue;
            }
        };

        let result = if opts.verbose >= 2 {
            io::unpack_file_traced(input, dest, &mut LogTrace)
        } else {
            io::unpack_file_traced(input, dest, &mut NoTrace)
        };

        match result {
            Ok(FileOutcome::NotPacked { size }) => {
                if !opts.quiet {
                    eprintln!("{}: not packed ({size} bytes)", input.display());
                }
                report.push(serde_json::json!({
                    "file": input.display().to_string(),
                    "status": "not_packed",
                    "size": size,
                }));
            }
            Ok(FileOutcome::Unpacked(stats)) => {
                if !opts.quiet {
                    let verb = if opts.check_only { "ok" } else { "unpacked" };
                    eprintln!(
                        "{}: {verb} {} -> {} bytes",
                        input.display(),
                        stats.packed_size,
                        stats.unpacked_size
                    );
                }
                if opts.verbose > 0 && !opts.quiet {
                    eprintln!(
                        "dhp2: pack mode {}, {} literal runs, {} back-references, ratio {:.2}",
                        stats.pack_mode,
                        stats.tokens.literal_runs,
                        stats.tokens.back_references,
                        stats.ratio()
                    );
                }
                report.push(stats_json(input, &stats));
            }
            Err(e) => {
                eprintln!("dhp2: {}: {e}", input.display());
                failed = true;
                report.push(serde_json::json!({
                    "file": input.display().to_string(),
                    "status": "error",
                    "error": e.to_string(),
                }));
            }
        }
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": "unpack",
            "files": report,
        });
        eprintln!("{json:#}");
    }

    i32::from(failed)
}

// ---------------------------------------------------------------------------
// Info command
// ---------------------------------------------------------------------------

fn print_header(path: &Path, header: &Header, container_len: usize) -> Result<(), DecodeError> {
    println!("{}:", path.display());
    println!("  container size:    {container_len}");
    println!("  full length:       {}", header.full_length);
    println!("  packed length:     {}", header.packed_length);
    println!("  unpacked prefix:   {}", header.unpacked_prefix);
    println!("  pack mode:         {}", header.pack_mode);
    println!("  shift seed:        {:#04x}", header.shift_seed);
    header.validate(container_len, DEFAULT_MAX_FULL_LENGTH)
}

fn cmd_info(opts: &Options) -> i32 {
    let mut failed = false;
    let mut report = Vec::new();

    for path in &opts.files {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                eprintln!("dhp2: {}: {e}", path.display());
                failed = true;
                continue;
            }
        };
        let header = match Header::parse(&data) {
            Ok(h) => h,
            Err(_) => {
                println!("{}: not packed", path.display());
                report.push(serde_json::json!({
                    "file": path.display().to_string(),
                    "packed": false,
                }));
                continue;
            }
        };

        let valid = print_header(path, &header, data.len());
        if let Err(e) = &valid {
            eprintln!("dhp2: {}: {e}", path.display());
            failed = true;
        }
        report.push(serde_json::json!({
            "file": path.display().to_string(),
            "packed": true,
            "full_length": header.full_length,
            "packed_length": header.packed_length,
            "unpacked_prefix": header.unpacked_prefix,
            "pack_mode": header.pack_mode,
            "shift_seed": header.shift_seed,
            "valid": valid.is_ok(),
        }));
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": "info",
            "files": report,
        });
        eprintln!("{json:#}");
    }

    i32::from(failed)
}

// ---------------------------------------------------------------------------
// Verify command
// ---------------------------------------------------------------------------

fn cmd_verify(opts: &Options) -> i32 {
    let (Some(packed), Some(expected)) = (opts.files.first(), opts.expected_file.as_ref()) else {
        eprintln!("dhp2: verify requires a packed file and an expected file");
        return 1;
    };

    match io::verify_files(packed, expected) {
        Ok(stats) => {
            if !opts.quiet {
                eprintln!(
                    "{}: verified {} bytes against {}",
                    packed.display(),
                    stats.unpacked_size,
                    expected.display()
                );
            }
            if opts.json_output {
                let mut json = stats_json(packed, &stats);
                json["command"] = "verify".into();
                json["status"] = "verified".into();
                eprintln!("{json:#}");
            }
            0
        }
        Err(e) => {
            eprintln!("dhp2: {}: {e}", packed.display());
            1
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(&opts)))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match opts.command {
        Command::Unpack => cmd_unpack(&opts),
        Command::Info => cmd_info(&opts),
        Command::Verify => cmd_verify(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
