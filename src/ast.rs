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

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BinOp {
    Or,
    Xor,
    And,
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
}

// The expression tree stored by deferred references. Evaluation may run long
// after the source line is gone, so label operands keep their spelled name.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(i32),
    // `$`: the address at the start of the current line
    CurrentAddr,
    // `?name`: 1 if the label is currently defined, 0 otherwise
    Defined(String),
    Label(String),
    // Folded prefix chain: `neg` is the parity of `-`, `not` the parity of `~`.
    Unary {
        neg: bool,
        not: bool,
        inner: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    // Both branches are evaluated; selection happens on the condition value.
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        other: Box<Expr>,
    },
}
