use clap::{Parser, ValueEnum};
use globset::{Glob, GlobSet, GlobSetBuilder};
use jsexpand::{
    AssetResolver, DirectiveKind, ExpandConfig, ExpandError, Expander, FsResolver, Result,
    SourceFile,
};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

const LONG_HELP: &str = r#"
Directives:
  __inline("lib/util.js")  - Replace with the fully expanded content of the file
  __uri('img/logo.png')    - Replace with the public URL of the file, quoted
                             (left as the bare path when the file does not exist)

  Paths are relative to the file containing the directive; a leading '/'
  makes them relative to --root. Directives inside strings and comments
  are ignored.

Examples:
  # Rewrite files in place
  jsexpand js/main.js js/admin.js
  # Expand every .js file under a directory
  jsexpand js/
  # Only some files of a directory
  jsexpand js/ --include 'pages/**/*.js'
  # Fingerprint URLs with a content hash
  jsexpand --use-hash js/
  # Print instead of rewriting
  jsexpand --stdout js/main.js
  # List directives without expanding
  jsexpand --list=json js/
"#;

/// Expand __inline and __uri directives in JavaScript sources.
///
/// Copyright 2026 the jsexpand contributors.
/// Licensed under the EUPL v1.2.
#[derive(Parser, Debug)]
#[command(
    name = "jsexpand",
    version,
    about = "Expand __inline and __uri directives in JavaScript sources.",
    after_long_help = LONG_HELP
)]
struct Cli {
    /// Files or directories to expand. Each file is rewritten in place.
    #[arg(value_name = "INPUTS", required = true)]
    inputs: Vec<PathBuf>,

    /// Project root: base for '/'-prefixed references and for public URLs
    #[arg(short, long, value_name = "DIR", env = "JSEXPAND_ROOT")]
    root: Option<PathBuf>,

    /// Prefix of every public URL produced by __uri
    #[arg(long, value_name = "PREFIX", default_value = "/")]
    url_prefix: String,

    /// Fingerprint __uri URLs with a content hash
    #[arg(long, env = "JSEXPAND_USE_HASH")]
    use_hash: bool,

    /// Glob patterns selecting files inside directory inputs (repeatable)
    #[arg(
        short = 'i',
        long = "include",
        value_name = "GLOB",
        default_value = "**/*.js",
        action = clap::ArgAction::Append
    )]
    include: Vec<String>,

    /// Print expanded content to stdout instead of rewriting files
    #[arg(long, conflicts_with = "list")]
    stdout: bool,

    /// List directives without expanding (optionally with format: plain, detailed, json)
    #[arg(long, value_name = "FORMAT", num_args = 0..=1, default_missing_value = "plain")]
    list: Option<ListFormat>,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum ListFormat {
    /// One directive per line
    Plain,
    /// Detailed information about each directive
    Detailed,
    /// JSON output for scripting
    Json,
}

#[derive(Serialize)]
struct DirectiveInfo {
    file: String,
    directive: &'static str,
    reference: String,
    start: usize,
    end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let result = run(&cli);
    match &result {
        Ok(0) => {}
        Ok(failed) => tracing::warn!(failed, "some files could not be expanded"),
        Err(e) => eprintln!("Error: {e}"),
    }
    std::process::exit(exit_code(&result));
}

/// 0 when every file expanded, 1 otherwise.
fn exit_code(result: &Result<usize>) -> i32 {
    match result {
        Ok(0) => 0,
        _ => 1,
    }
}

/// `RUST_LOG` wins when set; otherwise -q/-v pick the level.
fn init_tracing(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Returns the number of files that failed.
fn run(cli: &Cli) -> Result<usize> {
    let root = match &cli.root {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let resolver = FsResolver::new(&root, cli.url_prefix.as_str())?;
    let config = ExpandConfig {
        use_hash: cli.use_hash,
    };
    let expander = Expander::new(resolver, config)?;

    let include = build_include_set(&cli.include)?;
    let files = collect_inputs(&cli.inputs, &include)?;
    tracing::info!(
        count = files.len(),
        root = %expander.resolver().root().display(),
        "collected inputs"
    );

    if let Some(format) = cli.list {
        list_directives(&expander, &files, format)?;
        return Ok(0);
    }

    let mut failed = 0;
    for path in &files {
        // One file failing never stops the others.
        if let Err(e) = expand_file(&expander, path, cli.stdout) {
            eprintln!("Error: {e}");
            failed += 1;
        }
    }

    tracing::info!(total = files.len(), failed, "processing complete");
    Ok(failed)
}

fn build_include_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Expands directory inputs into the files they contain that match `include`.
/// File inputs are taken as given.
fn collect_inputs(inputs: &[PathBuf], include: &GlobSet) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }

        for entry in WalkDir::new(input).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(input).unwrap_or(entry.path());
            if include.is_match(relative) {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}

fn expand_file<R: AssetResolver>(expander: &Expander<R>, path: &Path, stdout: bool) -> Result<()> {
    let mut file = SourceFile::open(path).map_err(|e| e.in_file(path))?;
    expander.expand(&mut file)?;

    if stdout {
        let mut out = io::stdout().lock();
        out.write_all(file.bytes().unwrap_or_default())?;
        out.flush()?;
    } else {
        file.write_back().map_err(|e| e.in_file(file.path()))?;
        tracing::info!(file = %file.path().display(), "rewritten");
    }
    Ok(())
}

fn list_directives<R: AssetResolver>(
    expander: &Expander<R>,
    files: &[PathBuf],
    format: ListFormat,
) -> Result<()> {
    let infos = directive_infos(expander, files)?;
    print!("{}", render_directives(&infos, format)?);
    Ok(())
}

fn directive_infos<R: AssetResolver>(
    expander: &Expander<R>,
    files: &[PathBuf],
) -> Result<Vec<DirectiveInfo>> {
    let mut infos = Vec::new();

    for path in files {
        let file = SourceFile::open(path)?;
        let text = std::str::from_utf8(file.bytes().unwrap_or_default()).map_err(|_| {
            ExpandError::NotUtf8 {
                path: file.path().to_path_buf(),
            }
        })?;

        for directive in expander.scanner().directives(text) {
            let resolved = expander
                .resolver()
                .resolve(directive.value(), file.directory())
                .filter(|p| expander.resolver().is_file(p));
            infos.push(DirectiveInfo {
                file: file.path().display().to_string(),
                directive: directive.kind.name(),
                reference: directive.value().to_string(),
                start: directive.span.start,
                end: directive.span.end,
                resolved: resolved.map(|p| p.display().to_string()),
            });
        }
    }

    Ok(infos)
}

fn render_directives(infos: &[DirectiveInfo], format: ListFormat) -> Result<String> {
    let mut out = String::new();
    match format {
        ListFormat::Plain => {
            for info in infos {
                out.push_str(&format!("{}: {}({})\n", info.file, info.directive, info.reference));
            }
        }
        ListFormat::Detailed => {
            for info in infos {
                out.push_str(&format!("Directive: {}({})\n", info.directive, info.reference));
                out.push_str(&format!("  File: {}\n", info.file));
                out.push_str(&format!("  Position: {}..{}\n", info.start, info.end));
                match &info.resolved {
                    Some(p) => out.push_str(&format!("  Resolved: {p}\n")),
                    None if info.directive == DirectiveKind::Inline.name() => {
                        out.push_str("  Resolved: no (expansion will fail)\n");
                    }
                    None => out.push_str("  Resolved: no (left as bare path)\n"),
                }
                out.push('\n');
            }
        }
        ListFormat::Json => {
            out.push_str(&serde_json::to_string_pretty(infos)?);
            out.push('\n');
        }
    }
    Ok(out)
}
