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

//! Pretty-printing messages to the console

use colored::Colorize;

/// Print an assembly diagnostic; the message carries its own
/// `file:line:` prefix.
pub fn error(message: &str) {
    eprintln!("{}", message);
}

/// Print a warning, prefixed with its source position.
pub fn warning_at(file: &str, line: u32, message: &str) {
    let warning = "warning:".yellow().bold();
    eprintln!("{}:{}: {} {}", file, line, warning, message);
}

/// Print the final error banner.
pub fn error_banner(count: u32) {
    let text = if count == 1 {
        "*** 1 error found ***".to_string()
    } else {
        format!("*** {} errors found ***", count)
    };
    eprintln!("{}", text.red().bold());
}
