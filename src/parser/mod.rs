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

pub mod literals;

use crate::ast::{BinOp, Expr};
use literals::{decode_based, decode_char, decode_digits, decode_number};
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

// Derive the parser from our grammar file.
#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct ExprParser;

/// Parse the longest expression at the start of `input`. Returns the tree
/// and the number of bytes consumed; the caller advances its cursor by that
/// amount, which leaves the operand delimiter (`,`, `)`, end of line)
/// unconsumed.
pub fn parse_expression(input: &str) -> Result<(Expr, usize), String> {
    let mut pairs = ExprParser::parse(Rule::ternary, input)
        .map_err(|_| format!("expression expected (not {})", input.trim_end()))?;
    let pair = pairs.next().expect("a matched ternary pair");
    let end = pair.as_span().end();
    let expr = build_ternary(pair)?;
    Ok((expr, end))
}

// ------------- expression tree builders -------------

fn bin(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn build_ternary(pair: Pair<Rule>) -> Result<Expr, String> {
    let mut inner = pair.into_inner();
    let cond = build_or(inner.next().expect("condition"))?;
    match inner.next() {
        None => Ok(cond),
        Some(then_pair) => {
            let then = build_ternary(then_pair)?;
            let other = build_ternary(inner.next().expect("else branch"))?;
            Ok(Expr::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                other: Box::new(other),
            })
        }
    }
}

fn build_or(pair: Pair<Rule>) -> Result<Expr, String> {
    let mut inner = pair.into_inner();
    let lhs = build_xor(inner.next().expect("lhs"))?;
    match inner.next() {
        None => Ok(lhs),
        Some(rhs) => Ok(bin(BinOp::Or, lhs, build_or(rhs)?)),
    }
}

fn build_xor(pair: Pair<Rule>) -> Result<Expr, String> {
    let mut inner = pair.into_inner();
    let lhs = build_and(inner.next().expect("lhs"))?;
    match inner.next() {
        None => Ok(lhs),
        Some(rhs) => Ok(bin(BinOp::Xor, lhs, build_xor(rhs)?)),
    }
}

fn build_and(pair: Pair<Rule>) -> Result<Expr, String> {
    let mut inner = pair.into_inner();
    let lhs = build_eq(inner.next().expect("lhs"))?;
    match inner.next() {
        None => Ok(lhs),
        Some(rhs) => Ok(bin(BinOp::And, lhs, build_and(rhs)?)),
    }
}

fn build_eq(pair: Pair<Rule>) -> Result<Expr, String> {
    let mut inner = pair.into_inner();
    let lhs = build_rel(inner.next().expect("lhs"))?;
    match inner.next() {
        None => Ok(lhs),
        Some(op_pair) => {
            let op = match op_pair.as_str() {
                "==" => BinOp::Eq,
                _ => BinOp::Ne,
            };
            let rhs = build_eq(inner.next().expect("rhs"))?;
            Ok(bin(op, lhs, rhs))
        }
    }
}

fn build_rel(pair: Pair<Rule>) -> Result<Expr, String> {
    let mut inner = pair.into_inner();
    let lhs = build_shift(inner.next().expect("lhs"))?;
    match inner.next() {
        None => Ok(lhs),
        Some(op_pair) => {
            let op = match op_pair.as_str() {
                "<=" => BinOp::Le,
                ">=" => BinOp::Ge,
                "<" => BinOp::Lt,
                _ => BinOp::Gt,
            };
            let rhs = build_rel(inner.next().expect("rhs"))?;
            Ok(bin(op, lhs, rhs))
        }
    }
}

fn build_shift(pair: Pair<Rule>) -> Result<Expr, String> {
    let mut inner = pair.into_inner();
    let mut acc = build_term(inner.next().expect("lhs"))?;
    while let Some(op_pair) = inner.next() {
        let op = match op_pair.as_str() {
            "<<" => BinOp::Shl,
            _ => BinOp::Shr,
        };
        let rhs = build_term(inner.next().expect("rhs"))?;
        acc = bin(op, acc, rhs);
    }
    Ok(acc)
}

fn build_term(pair: Pair<Rule>) -> Result<Expr, String> {
    let mut inner = pair.into_inner();
    let mut acc = build_factor(inner.next().expect("lhs"))?;
    while let Some(op_pair) = inner.next() {
        let op = match op_pair.as_str() {
            "+" => BinOp::Add,
            _ => BinOp::Sub,
        };
        let rhs = build_factor(inner.next().expect("rhs"))?;
        acc = bin(op, acc, rhs);
    }
    Ok(acc)
}

fn build_factor(pair: Pair<Rule>) -> Result<Expr, String> {
    let mut inner = pair.into_inner();
    let mut acc = build_unary(inner.next().expect("lhs"))?;
    while let Some(op_pair) = inner.next() {
        let op = match op_pair.as_str() {
            "*" => BinOp::Mul,
            _ => BinOp::Div,
        };
        let rhs = build_unary(inner.next().expect("rhs"))?;
        acc = bin(op, acc, rhs);
    }
    Ok(acc)
}

fn build_unary(pair: Pair<Rule>) -> Result<Expr, String> {
    let mut neg = false;
    let mut not = false;
    let mut value = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::prefix_op => match p.as_str() {
                "-" => neg = !neg,
                "~" => not = !not,
                _ => {}
            },
            Rule::primary => value = Some(build_primary(p)?),
            _ => unreachable!("unexpected rule in unary: {:?}", p.as_rule()),
        }
    }
    let inner = value.expect("a primary value");
    if neg || not {
        Ok(Expr::Unary {
            neg,
            not,
            inner: Box::new(inner),
        })
    } else {
        Ok(inner)
    }
}

fn build_primary(pair: Pair<Rule>) -> Result<Expr, String> {
    let inner = pair.into_inner().next().expect("a primary alternative");
    match inner.as_rule() {
        Rule::paren => build_ternary(inner.into_inner().next().expect("inner expression")),
        Rule::hex_prefixed => decode_digits(&inner.as_str()[2..], 16).map(Expr::Num),
        Rule::number => decode_number(inner.as_str()).map(Expr::Num),
        Rule::pc_or_hex => {
            let digits = &inner.as_str()[1..];
            if digits.is_empty() {
                Ok(Expr::CurrentAddr)
            } else {
                decode_digits(digits, 16).map(Expr::Num)
            }
        }
        Rule::bin_literal => decode_digits(&inner.as_str()[1..], 2).map(Expr::Num),
        Rule::amp_literal => {
            let s = inner.as_str();
            let base = match s.as_bytes()[1] {
                b'h' | b'H' => 16,
                b'o' | b'O' => 8,
                _ => 2,
            };
            decode_digits(&s[2..], base).map(Expr::Num)
        }
        Rule::based_literal => decode_based(inner.as_str()).map(Expr::Num),
        Rule::char_literal => {
            let s = inner.as_str().as_bytes();
            decode_char(&s[1..s.len() - 1]).map(|(v, _)| Expr::Num(v))
        }
        Rule::defined_check => Ok(Expr::Defined(inner.as_str()[1..].to_string())),
        Rule::label_name => Ok(Expr::Label(inner.as_str().to_string())),
        other => unreachable!("unexpected primary rule: {:?}", other),
    }
}

// ------------- unit tests -------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Expr {
        parse_expression(input).unwrap().0
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse("42"), Expr::Num(42));
        assert_eq!(parse("0x8000"), Expr::Num(0x8000));
        assert_eq!(parse("%1010"), Expr::Num(10));
        assert_eq!(parse("&hFF"), Expr::Num(255));
        assert_eq!(parse("'A'"), Expr::Num(65));
        assert_eq!(parse("'\\n'"), Expr::Num(10));
    }

    #[test]
    fn test_parse_pc() {
        assert_eq!(parse("$"), Expr::CurrentAddr);
        assert_eq!(parse("$8000"), Expr::Num(0x8000));
    }

    #[test]
    fn test_parse_stops_at_delimiter() {
        let (expr, used) = parse_expression("1+2, 3").unwrap();
        assert_eq!(used, 3);
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinOp::Add,
                lhs: Box::new(Expr::Num(1)),
                rhs: Box::new(Expr::Num(2)),
            }
        );

        let (_, used) = parse_expression("5)").unwrap();
        assert_eq!(used, 1);
    }

    #[test]
    fn test_parse_precedence() {
        // 1 + 2 * 3 groups the product first
        assert_eq!(
            parse("1+2*3"),
            Expr::Binary {
                op: BinOp::Add,
                lhs: Box::new(Expr::Num(1)),
                rhs: Box::new(Expr::Binary {
                    op: BinOp::Mul,
                    lhs: Box::new(Expr::Num(2)),
                    rhs: Box::new(Expr::Num(3)),
                }),
            }
        );
    }

    #[test]
    fn test_parse_unary_fold() {
        assert_eq!(
            parse("-~5"),
            Expr::Unary {
                neg: true,
                not: true,
                inner: Box::new(Expr::Num(5)),
            }
        );
        // double minus cancels
        assert_eq!(parse("--5"), Expr::Num(5));
    }

    #[test]
    fn test_parse_ternary() {
        let expr = parse("1 ? 2 : 3");
        assert_eq!(
            expr,
            Expr::Ternary {
                cond: Box::new(Expr::Num(1)),
                then: Box::new(Expr::Num(2)),
                other: Box::new(Expr::Num(3)),
            }
        );
    }

    #[test]
    fn test_parse_defined_and_label() {
        assert_eq!(parse("?flag"), Expr::Defined("flag".to_string()));
        assert_eq!(parse(".loop"), Expr::Label(".loop".to_string()));
        assert_eq!(parse("start"), Expr::Label("start".to_string()));
    }

    #[test]
    fn test_parse_garbage_is_an_error() {
        assert!(parse_expression(")").is_err());
        assert!(parse_expression(",").is_err());
        assert!(parse_expression("''").is_err());
    }
}
