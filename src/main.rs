//! OpenAPI from annotations - command-line tool compiling OpenAPI documents
//! from annotated Rust sources.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-annotations generate [OPTIONS] <ROOTS>...
//! openapi-from-annotations merge --main <FILE> --dir <DIR> [--output <FILE>]
//! ```
//!
//! # Examples
//!
//! Generate a YAML document:
//! ```bash
//! openapi-from-annotations generate ./src -o openapi.yaml
//! ```
//!
//! Fail on the first file with errors and skip JSON:API includes:
//! ```bash
//! openapi-from-annotations generate ./src --strict --jsonapi-includes false
//! ```
//!
//! Merge generated documents:
//! ```bash
//! openapi-from-annotations merge --main openapi.yaml --dir ./specs
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_annotations::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI from annotations starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("Done");

    Ok(())
}
