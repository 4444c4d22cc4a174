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

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum AssemblyError {
    #[error("{file}:{line}: {reason}")]
    ParseError {
        file: String,
        line: u32,
        reason: String,
    },

    #[error("{file}:{line}: {reason}")]
    SemanticError {
        file: String,
        line: u32,
        reason: String,
    },

    #[error("{file}:{line}: {reason}")]
    ResourceError {
        file: String,
        line: u32,
        reason: String,
    },

    #[error("I/O error: {reason}")]
    IoError { reason: String },
}
