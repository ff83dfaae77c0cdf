use std::fs::File;
use std::io::{BufReader, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use cnx_codegen::ast::Unit;
use cnx_codegen::symbol::SymbolTable;
use cnx_codegen::{generate, Options};

/// Run the C-Next code generator over a collected compilation bundle
#[derive(Clone, Debug, Parser)]
struct Args {
    /// bundle produced by the parser/collector front end
    #[arg(short, long)]
    input: PathBuf,
    /// emit C++17 instead of C
    #[arg(long)]
    cpp: bool,
    #[command(subcommand)]
    operation: Operation,
}

#[derive(Clone, Debug, Subcommand)]
enum Operation {
    /// Lower the bundle and print (or write) the target source
    Emit {
        /// output path; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the symbol table the bundle carries
    DumpSymbols,
}

/// On-disk unit: the AST and the symbol table the collector produced.
#[derive(Debug, Serialize, Deserialize)]
struct Bundle {
    unit: Unit,
    symbols: SymbolTable,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let file = File::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    let bundle: Bundle = bincode::deserialize_from(BufReader::new(file))
        .context("parsing the compilation bundle")?;

    match &args.operation {
        Operation::Emit { output } => {
            let result = generate(
                &bundle.unit,
                &bundle.symbols,
                Options {
                    cpp_mode: args.cpp,
                },
            )?;
            match output {
                Some(path) => {
                    let mut out = File::create(path).with_context(|| {
                        format!("creating {}", path.display())
                    })?;
                    out.write_all(result.source.as_bytes())?;
                }
                None => print!("{}", result.source),
            }
            Ok(())
        }
        Operation::DumpSymbols => {
            println!("{:#?}", bundle.symbols);
            Ok(())
        }
    }
}
