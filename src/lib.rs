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

pub mod assembler;
pub mod ast;
pub mod errors;
pub mod file_reader;
pub mod logging;
pub mod parser;
pub mod scanner;

use std::path::PathBuf;

use anyhow::Result;
use assembler::{Assembler, AssemblyOutput, Options};
use file_reader::FileReader;

extern crate pest;
extern crate pest_derive;

/// Assemble the input files into one binary image. Diagnostics go to
/// stderr as they occur; the returned output carries the staged binary,
/// the optional listing and label texts, and the error count that decides
/// the exit status.
pub fn assemble<F: FileReader>(
    inputs: &[PathBuf],
    opts: &Options,
    reader: &F,
) -> Result<AssemblyOutput> {
    let mut asm = Assembler::new(reader, opts);
    asm.run(inputs);
    Ok(asm.finish())
}
