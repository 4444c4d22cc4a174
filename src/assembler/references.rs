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

use super::SourceLoc;
use crate::ast::Expr;

/// An operand expression captured from the line, with the source text it was
/// read from (for messages and the label file round trip).
#[derive(Debug, Clone)]
pub struct CapturedExpr {
    pub expr: Expr,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// bit index 0-7, OR'd (times 8) into a CB-prefixed opcode
    Bsr,
    /// fill byte replicated `count` times
    Ds,
    /// restart address; `val & 0x38 == val`, encodes as `0xC7 | val`
    Rst,
    /// absolute little-endian word
    AbsWord,
    /// absolute byte
    AbsByte,
    /// signed displacement from the PC following the displacement byte;
    /// `count` holds that PC
    RelByte,
}

/// A deferred patch: where the placeholder bytes sit in the two staged
/// streams, the expression to evaluate once all input is consumed, and the
/// context to evaluate it in.
#[derive(Debug, Clone)]
pub struct Reference {
    pub kind: RefKind,
    /// byte offset in the staged binary
    pub opos: usize,
    /// byte offset in the staged listing
    pub lpos: usize,
    pub expr: Expr,
    pub text: String,
    /// `$` at the line that captured the reference
    pub baseaddr: i32,
    pub loc: SourceLoc,
    /// DS repeat count, RELB following-PC, or BSR base opcode
    pub count: i32,
    /// scope depth at capture; lowered as frames pop so outer labels stay
    /// reachable
    pub level: usize,
    pub done: bool,
    pub value: i32,
}
