/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use anyhow::{Context, Result};
use clap::ArgAction;
use clap::Parser as clap_parser;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use z80asm::assemble;
use z80asm::assembler::Options;
use z80asm::errors::AssemblyError;
use z80asm::file_reader::AsmFileReader;
use z80asm::logging;

/// default location for system-wide include files
const DEFAULT_INCLUDE_DIR: &str = "/usr/share/z80asm/headers/";

#[derive(clap_parser)]
#[clap(version, about = "Z80 assembler with deferred symbol resolution")]
struct Opts {
    /// Be verbose; specify again to be more verbose
    #[clap(short, long, action = ArgAction::Count)]
    verbose: u8,
    /// Write a list file ("-" or no value means stderr)
    #[clap(short = 'l', long = "list", value_name = "FILE",
           num_args = 0..=1, default_missing_value = "-")]
    list: Option<String>,
    /// Write a label file ("-" or no value means stderr)
    #[clap(short = 'L', long = "label", value_name = "FILE",
           num_args = 0..=1, default_missing_value = "-")]
    label: Option<String>,
    /// Input file (may be repeated; plain arguments work too)
    #[clap(short = 'i', long = "input", value_name = "FILE")]
    input: Vec<PathBuf>,
    /// Output file; "-" means stdout
    #[clap(short = 'o', long = "output", value_name = "FILE", default_value = "-")]
    output: String,
    /// Prefix all labels in the label file with this prefix
    #[clap(short = 'p', long = "label-prefix", value_name = "PREFIX", default_value = "")]
    label_prefix: String,
    /// Add a directory to the include path
    #[clap(short = 'I', long = "includepath", value_name = "DIR")]
    includepath: Vec<PathBuf>,
    /// Input files
    #[clap(value_name = "FILES")]
    files: Vec<PathBuf>,
}

fn write_stream(data: &[u8], dest: &str, what: &str) -> Result<(), AssemblyError> {
    let result = if dest == "-" {
        std::io::stderr().write_all(data)
    } else {
        fs::write(dest, data)
    };
    result.map_err(|e| AssemblyError::IoError {
        reason: format!("unable to write {} {}: {}", what, dest, e),
    })
}

fn main() -> Result<ExitCode> {
    let opts: Opts = Opts::parse();

    let mut include_dirs = vec![PathBuf::from(DEFAULT_INCLUDE_DIR)];
    include_dirs.extend(opts.includepath.iter().cloned());

    let options = Options {
        verbose: opts.verbose,
        listing: opts.list.is_some(),
        label_file: opts.label.is_some(),
        label_prefix: opts.label_prefix.clone(),
        include_dirs,
    };

    let mut inputs: Vec<PathBuf> = opts.input.clone();
    inputs.extend(opts.files.iter().cloned());
    if inputs.is_empty() {
        inputs.push(PathBuf::from("-"));
    }

    let reader = AsmFileReader;
    let result = assemble(&inputs, &options, &reader)?;

    if opts.output == "-" {
        std::io::stdout().write_all(&result.binary)?;
    } else {
        fs::write(&opts.output, &result.binary)
            .with_context(|| format!("Unable to write output file {}", opts.output))?;
    }
    if let (Some(listing), Some(dest)) = (&result.listing, &opts.list) {
        write_stream(listing, dest, "list file")?;
    }
    if let (Some(labels), Some(dest)) = (&result.labels, &opts.label) {
        write_stream(labels, dest, "label file")?;
    }

    if result.errors > 0 {
        logging::error_banner(result.errors);
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}
