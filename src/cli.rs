use crate::compiler::{Compiler, CompilerConfig};
use crate::document::Document;
use crate::error::Diagnostic;
use crate::external_types::ExternalTypes;
use crate::merge::merge_directory;
use crate::parser::AstParser;
use crate::scanner::FileScanner;
use crate::serializer::{self, write_to_file};
use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;

/// OpenAPI from annotations - compile an OpenAPI document from annotated Rust sources
#[derive(Parser, Debug)]
#[command(name = "openapi-from-annotations")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a document from one or more source trees
    Generate(GenerateArgs),
    /// Merge several documents into one
    Merge(MergeArgs),
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Source roots to scan
    #[arg(value_name = "ROOTS", required = true)]
    pub roots: Vec<PathBuf>,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Fail when any error is found while generating the document
    #[arg(long)]
    pub strict: bool,

    /// Add the `includes` property to JSON:API envelopes
    #[arg(long = "jsonapi-includes", value_name = "BOOL", default_value_t = true, action = clap::ArgAction::Set)]
    pub jsonapi_includes: bool,

    /// Vendored package to include (repeatable)
    #[arg(long = "vendor", value_name = "NAME")]
    pub vendors: Vec<String>,

    /// Directory holding vendored sources, scanned as an extra root
    #[arg(long = "vendors-path", value_name = "DIR")]
    pub vendors_path: Option<PathBuf>,

    /// TSV table mapping external types to type/format pairs
    #[arg(long = "external-types", value_name = "TSV")]
    pub external_types: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Path of the main file
    #[arg(long = "main", value_name = "FILE")]
    pub main: PathBuf,

    /// Directory with the files to merge
    #[arg(long = "dir", value_name = "DIR")]
    pub dir: PathBuf,

    /// Path of the result file
    #[arg(long = "output", value_name = "FILE", default_value = "merged-openapi.yaml")]
    pub output: PathBuf,
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

impl From<OutputFormat> for serializer::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Yaml => serializer::OutputFormat::Yaml,
            OutputFormat::Json => serializer::OutputFormat::Json,
        }
    }
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    match &args.command {
        Command::Generate(generate) => {
            for root in &generate.roots {
                if !root.is_dir() {
                    anyhow::bail!("Source root is not a directory: {}", root.display());
                }
            }
            info!("Output format: {:?}", generate.output_format);
            match &generate.output_path {
                Some(output) => info!("Output file: {}", output.display()),
                None => info!("Output: stdout"),
            }
        }
        Command::Merge(merge) => {
            if !merge.main.is_file() {
                anyhow::bail!("Main file does not exist: {}", merge.main.display());
            }
            if !merge.dir.is_dir() {
                anyhow::bail!("Merge directory is not a directory: {}", merge.dir.display());
            }
        }
    }

    Ok(args)
}

/// Run the selected command
pub fn run(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Generate(generate) => run_generate(&generate),
        Command::Merge(merge) => run_merge(&merge),
    }
}

/// Scans, parses and compiles the configured roots.
pub fn compile(args: &GenerateArgs) -> Result<(Document, Vec<Diagnostic>)> {
    let external_types = match &args.external_types {
        Some(path) => ExternalTypes::load(path)?,
        None => ExternalTypes::new(),
    };
    let config = CompilerConfig {
        strict: args.strict,
        jsonapi_includes: args.jsonapi_includes,
        external_types,
    };

    let mut roots = args.roots.clone();
    if let Some(vendors_path) = &args.vendors_path {
        roots.push(vendors_path.clone());
    }

    info!("Scanning {} source roots...", roots.len());
    let scan_result = FileScanner::new(roots)
        .with_vendor_inclusions(args.vendors.clone())
        .scan()?;
    info!("Found {} Rust files", scan_result.rust_files.len());

    let mut sources = Vec::new();
    for result in AstParser::parse_files(&scan_result.rust_files) {
        match result {
            Ok(source) => sources.push(source),
            Err(e) if args.strict => return Err(e),
            Err(e) => debug!("Skipping file due to parse error: {}", e),
        }
    }
    info!("Successfully parsed {} files", sources.len());

    let mut compiler = Compiler::new(config);
    compiler.compile_files(&sources)?;
    Ok(compiler.finish()?)
}

fn run_generate(args: &GenerateArgs) -> Result<()> {
    let (document, diagnostics) = compile(args)?;

    for diagnostic in &diagnostics {
        if diagnostic.is_error() {
            warn!("{}", diagnostic);
        } else {
            debug!("{}", diagnostic);
        }
    }

    let content = serializer::serialize(&document, args.output_format.into())?;
    match &args.output_path {
        Some(output_path) => {
            write_to_file(&content, output_path)?;
            info!("Successfully wrote OpenAPI document to {}", output_path.display());
        }
        None => println!("{}", content),
    }

    info!("Summary:");
    info!("  - Paths: {}", document.paths.len());
    info!("  - Schemas: {}", document.components.schemas.len());
    info!("  - Diagnostics: {}", diagnostics.len());
    Ok(())
}

fn run_merge(args: &MergeArgs) -> Result<()> {
    info!("Merging {} into {}", args.dir.display(), args.main.display());
    let merged = merge_directory(&args.main, &args.dir)?;
    write_to_file(&serializer::serialize_yaml(&merged)?, &args.output)?;
    info!("Successfully wrote merged document to {}", args.output.display());
    Ok(())
}
