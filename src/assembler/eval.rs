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

//! Expression evaluation over the symbol table.
//!
//! Evaluation never fails: a label that cannot be resolved yet taints the
//! result through the `valid` flag and contributes a dummy value, so the
//! caller can decide between writing immediately and deferring. With
//! `report` set (final resolution) unresolved labels become errors.

use super::symbol_table::SymbolTable;
use super::{Diagnostics, SourceLoc};
use crate::ast::{BinOp, Expr};

pub struct EvalCtx {
    /// value of `$`: the PC at the start of the capturing line
    pub baseaddr: i32,
    /// scope depth to start the label walk at
    pub level: usize,
    /// report unresolved labels as errors (final resolution pass)
    pub report: bool,
    pub loc: SourceLoc,
}

pub enum Lookup {
    Value(i32),
    /// defined but not computable (yet)
    Invalid,
    Missing,
}

/// Look a label up, lazily computing a parked EQU expression. The `busy`
/// flag fences mutually recursive definitions: hitting one makes this
/// attempt invalid without recursing forever.
pub fn lookup_label(
    symtab: &mut SymbolTable,
    diag: &mut Diagnostics,
    name: &str,
    level: usize,
) -> Lookup {
    let pending = match symtab.find(name, level) {
        None => return Lookup::Missing,
        Some(def) => {
            if def.busy {
                return Lookup::Invalid;
            }
            match &def.pending {
                Some(p) if !p.done => {
                    def.busy = true;
                    p.clone()
                }
                _ => {
                    return if def.valid {
                        Lookup::Value(def.value)
                    } else {
                        Lookup::Invalid
                    };
                }
            }
        }
    };

    let mut valid = true;
    let ctx = EvalCtx {
        baseaddr: pending.baseaddr,
        level: pending.level,
        report: false,
        loc: pending.loc.clone(),
    };
    let value = eval_expr(&pending.expr, &ctx, symtab, diag, &mut valid);

    let def = symtab
        .find(name, level)
        .expect("label cannot vanish during evaluation");
    def.busy = false;
    if valid {
        def.value = value;
        def.valid = true;
        if let Some(p) = def.pending.as_mut() {
            p.done = true;
        }
        Lookup::Value(value)
    } else {
        Lookup::Invalid
    }
}

pub fn eval_expr(
    expr: &Expr,
    ctx: &EvalCtx,
    symtab: &mut SymbolTable,
    diag: &mut Diagnostics,
    valid: &mut bool,
) -> i32 {
    match expr {
        Expr::Num(v) => *v,
        Expr::CurrentAddr => ctx.baseaddr,
        Expr::Defined(name) => match lookup_label(symtab, diag, name, ctx.level) {
            Lookup::Value(_) => 1,
            _ => 0,
        },
        Expr::Label(name) => match lookup_label(symtab, diag, name, ctx.level) {
            Lookup::Value(v) => v,
            _ => {
                if ctx.report {
                    diag.semantic(&ctx.loc, &format!("Using undefined label {}", name));
                }
                *valid = false;
                0
            }
        },
        Expr::Unary { neg, not, inner } => {
            let mut v = eval_expr(inner, ctx, symtab, diag, valid);
            if *neg {
                v = v.wrapping_neg();
            }
            if *not {
                v = !v;
            }
            v
        }
        Expr::Binary { op, lhs, rhs } => {
            let l = eval_expr(lhs, ctx, symtab, diag, valid);
            if *op == BinOp::Div {
                let mut rhs_valid = true;
                let r = eval_expr(rhs, ctx, symtab, diag, &mut rhs_valid);
                if !rhs_valid {
                    *valid = false;
                }
                if r == 0 {
                    if rhs_valid && ctx.report {
                        diag.semantic(&ctx.loc, "division by zero");
                    }
                    *valid = false;
                    return 0;
                }
                return l.wrapping_div(r);
            }
            let r = eval_expr(rhs, ctx, symtab, diag, valid);
            match op {
                BinOp::Or => l | r,
                BinOp::Xor => l ^ r,
                BinOp::And => l & r,
                BinOp::Eq => (l == r) as i32,
                BinOp::Ne => (l != r) as i32,
                BinOp::Le => (l <= r) as i32,
                BinOp::Ge => (l >= r) as i32,
                BinOp::Lt => (l < r) as i32,
                BinOp::Gt => (l > r) as i32,
                BinOp::Shl => l.wrapping_shl(r as u32),
                BinOp::Shr => l.wrapping_shr(r as u32),
                BinOp::Add => l.wrapping_add(r),
                BinOp::Sub => l.wrapping_sub(r),
                BinOp::Mul => l.wrapping_mul(r),
                BinOp::Div => unreachable!("handled above"),
            }
        }
        // Both branches run through the shared validity flag, matching the
        // parse-both contract for forward references.
        Expr::Ternary { cond, then, other } => {
            let c = eval_expr(cond, ctx, symtab, diag, valid);
            let t = eval_expr(then, ctx, symtab, diag, valid);
            let o = eval_expr(other, ctx, symtab, diag, valid);
            if c != 0 { t } else { o }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::symbol_table::LabelDef;
    use crate::parser::parse_expression;
    use std::rc::Rc;

    fn eval_str(input: &str, symtab: &mut SymbolTable) -> (i32, bool) {
        let (expr, _) = parse_expression(input).unwrap();
        let mut diag = Diagnostics::new(0);
        let ctx = EvalCtx {
            baseaddr: 0x100,
            level: 0,
            report: false,
            loc: SourceLoc {
                file: Rc::from("test"),
                line: 1,
            },
        };
        let mut valid = true;
        let v = eval_expr(&expr, &ctx, symtab, &mut diag, &mut valid);
        (v, valid)
    }

    #[test]
    fn test_arithmetic() {
        let mut t = SymbolTable::default();
        assert_eq!(eval_str("2+3*4", &mut t), (14, true));
        assert_eq!(eval_str("(2+3)*4", &mut t), (20, true));
        assert_eq!(eval_str("7/2", &mut t), (3, true));
        assert_eq!(eval_str("-7/2", &mut t), (-3, true));
        assert_eq!(eval_str("1<<4", &mut t), (16, true));
        assert_eq!(eval_str("-16>>2", &mut t), (-4, true));
        assert_eq!(eval_str("0xF0|0x0F", &mut t), (0xFF, true));
        assert_eq!(eval_str("0xFF&0x0F", &mut t), (0x0F, true));
        assert_eq!(eval_str("5==5", &mut t), (1, true));
        assert_eq!(eval_str("5!=5", &mut t), (0, true));
        assert_eq!(eval_str("3<=4", &mut t), (1, true));
    }

    #[test]
    fn test_unary_fold_matches_reference_behaviour() {
        let mut t = SymbolTable::default();
        // ~ applies after the sign fold: -~5 == ~(-5)
        assert_eq!(eval_str("-~5", &mut t), (!(-5), true));
        assert_eq!(eval_str("~0", &mut t), (-1, true));
    }

    #[test]
    fn test_current_addr() {
        let mut t = SymbolTable::default();
        assert_eq!(eval_str("$", &mut t), (0x100, true));
        assert_eq!(eval_str("$+2", &mut t), (0x102, true));
    }

    #[test]
    fn test_labels_taint_validity() {
        let mut t = SymbolTable::default();
        assert_eq!(eval_str("missing+1", &mut t), (1, false));
        t.define("here", LabelDef::at_address(0x42));
        assert_eq!(eval_str("here+1", &mut t), (0x43, true));
    }

    #[test]
    fn test_defined_check_is_always_valid() {
        let mut t = SymbolTable::default();
        assert_eq!(eval_str("?nothere", &mut t), (0, true));
        t.define("there", LabelDef::at_address(1));
        assert_eq!(eval_str("?there", &mut t), (1, true));
    }

    #[test]
    fn test_ternary_unused_branch_taints() {
        let mut t = SymbolTable::default();
        t.define("yes", LabelDef::at_address(7));
        let (v, valid) = eval_str("1 ? yes : missing", &mut t);
        assert_eq!(v, 7);
        assert!(!valid);
    }

    #[test]
    fn test_division_by_zero_is_invalid() {
        let mut t = SymbolTable::default();
        assert_eq!(eval_str("5/0", &mut t), (0, false));
    }
}
