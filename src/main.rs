//! epubcfi
//!
//! Command line front end: parse, format, compare and resolve EPUB CFI
//! references.

use std::cmp::Ordering;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epubcfi::cfi::{self, Expression};
use epubcfi::config::Config;
use epubcfi::resolve::{element_steps, resolve_file};

#[derive(Parser)]
#[command(name = "epubcfi", version)]
#[command(about = "Parse, compare and resolve EPUB CFI references")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the prefix and parsed expression as JSON
    Parse { reference: String },
    /// Print the canonical form of the embedded expression
    Format { reference: String },
    /// Print the absolute start and end paths of a range
    Absolute { reference: String },
    /// Compare the reading positions of two references
    Compare { a: String, b: String },
    /// Resolve the steps after the last redirect against an XML document
    Resolve {
        /// XHTML or package document
        document: PathBuf,
        reference: String,
    },
}

#[derive(Serialize)]
struct Parsed<'a> {
    prefix: &'a str,
    expression: &'a Expression,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    let filter = match &config {
        Ok(config) => config.log_filter.clone(),
        Err(_) => Config::default().log_filter,
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = &config {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
    }

    run(Args::parse().command)
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Parse { reference } => {
            let (prefix, expression) = expression(&reference)?;
            let parsed = Parsed {
                prefix: &prefix,
                expression: &expression,
            };
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
        Command::Format { reference } => {
            let (_, expression) = expression(&reference)?;
            println!("{}", cfi::format(&expression));
        }
        Command::Absolute { reference } => {
            let (_, expression) = expression(&reference)?;
            let Some(range) = expression.as_range() else {
                bail!("{:?} is not a range", reference);
            };
            let (start, end) = cfi::to_absolute(range);
            println!("{}", start);
            println!("{}", end);
        }
        Command::Compare { a, b } => {
            let ordering = cfi::compare_references(&a, &b)
                .with_context(|| format!("cannot compare {:?} and {:?}", a, b))?;
            let symbol = match ordering {
                Ordering::Less => "<",
                Ordering::Equal => "=",
                Ordering::Greater => ">",
            };
            println!("{}", symbol);
        }
        Command::Resolve {
            document,
            reference,
        } => {
            let (_, expression) = expression(&reference)?;
            let segments = expression.position().segments();
            let steps = segments.last().map(Vec::as_slice).unwrap_or_default();

            let resolved = resolve_file(&document, element_steps(steps))
                .with_context(|| format!("failed to resolve in {}", document.display()))?;
            match resolved {
                Some(resolved) => println!("{}", serde_json::to_string_pretty(&resolved)?),
                None => println!("no match"),
            }
        }
    }
    Ok(())
}

/// Prefix and expression of a reference that must carry a CFI
fn expression(reference: &str) -> Result<(String, Expression)> {
    let (prefix, expression) =
        cfi::split(reference).with_context(|| format!("invalid CFI in {:?}", reference))?;
    match expression {
        Some(expression) => Ok((prefix.to_string(), expression)),
        None => bail!("no epubcfi(...) in {:?}", reference),
    }
}
