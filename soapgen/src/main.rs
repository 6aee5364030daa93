use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
};

use structopt::StructOpt;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use soapgen_codegen as codegen;

#[derive(Debug, Error)]
enum Error {
    #[error("Error generating envelopes")]
    CodegenError(#[from] codegen::Error),

    #[error("Error writing output")]
    IoError(#[from] std::io::Error),

    #[error("No operation named {0}")]
    UnknownOperation(String),
}

/// Prints the request and response envelope types of every operation in a WSDL document.
#[derive(StructOpt)]
struct Args {
    /// Write the envelopes to this file instead of stdout
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Fail when a part cannot be placed in its envelope
    #[structopt(long)]
    strict: bool,

    /// Only print the named operation
    #[structopt(long)]
    operation: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[structopt(short, long)]
    verbose: bool,

    /// Path or URL of the WSDL document
    input: String,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "soapgen=debug,soapgen_codegen=debug,soapgen_wsdl=debug"
    } else {
        "soapgen=info,soapgen_codegen=info,soapgen_wsdl=warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[paw::main]
fn main(args: Args) -> Result<(), Error> {
    init_tracing(args.verbose);

    let generated: Vec<_> = codegen::from_url(&args.input, args.strict)?
        .into_iter()
        .filter(|generated| match &args.operation {
            Some(name) => generated.operation.name == *name,
            None => true,
        })
        .collect();

    if let (Some(name), true) = (&args.operation, generated.is_empty()) {
        return Err(Error::UnknownOperation(name.clone()));
    }

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    };

    for generated in &generated {
        writeln!(
            out,
            "# {}/{}/{}",
            generated.service, generated.port, generated.operation.name
        )?;

        if let Some(action) = &generated.operation.action {
            writeln!(out, "# action: {}", action)?;
        }

        writeln!(out, "{}", generated.envelopes.input)?;
        writeln!(out, "{}", generated.envelopes.output)?;
        writeln!(out)?;
    }

    out.flush()?;
    info!(operations = generated.len(), "done");

    Ok(())
}
