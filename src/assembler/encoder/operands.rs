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

//! Operand recognisers.
//!
//! Each returns a small integer code the instruction encoders fold into
//! opcode arithmetic (8-bit registers are 1-based in b,c,d,e,h,l,(hl),a
//! order), 0 meaning the operand was refused. Index registers leave the
//! `0xDD`/`0xFD` prefix and a displacement expression in the scratch state
//! rather than a distinct code: `ix` answers as `hl`, `(ix+d)` as `(hl)`.

use super::super::Assembler;
use crate::file_reader::FileReader;
use crate::scanner::Scanner;

pub(crate) const ARG_HL: i32 = 2;
pub(crate) const IN_A: i32 = 8;
pub(crate) const PORT_C: i32 = 1;
pub(crate) const EX_DE: i32 = 2;
pub(crate) const EX_AF: i32 = 3;

// first-operand codes of LD
pub(crate) const LD_BC: i32 = 1;
pub(crate) const LD_DE: i32 = 2;
pub(crate) const LD_HL: i32 = 3;
pub(crate) const LD_SP: i32 = 4;
pub(crate) const LD_IX: i32 = 5;
pub(crate) const LD_IY: i32 = 6;
pub(crate) const LD_B: i32 = 7;
pub(crate) const LD_H: i32 = 11;
pub(crate) const LD_L: i32 = 12;
pub(crate) const LD_MHL: i32 = 13;
pub(crate) const LD_A: i32 = 14;
pub(crate) const LD_I: i32 = 15;
pub(crate) const LD_R: i32 = 16;
pub(crate) const LD_MBC: i32 = 17;
pub(crate) const LD_MDE: i32 = 18;
pub(crate) const LD_MIX: i32 = 19;
pub(crate) const LD_MIY: i32 = 20;
pub(crate) const LD_MNN: i32 = 21;

// `ld (nn),x` right-hand codes
pub(crate) const LD_NN_HL: i32 = 5;
pub(crate) const LD_NN_A: i32 = 6;

// `ld a,x` right-hand codes
pub(crate) const A_I: i32 = 9;
pub(crate) const A_R: i32 = 10;
pub(crate) const A_NN: i32 = 11;

// `ld sp,x` codes
pub(crate) const SP_NN: i32 = 0;
pub(crate) const SP_HL: i32 = 1;
pub(crate) const SP_MEM: i32 = 2;

impl<R: FileReader> Assembler<'_, R> {
    pub(crate) fn rd_a(&mut self, cur: &mut Scanner) -> i32 {
        self.indx_req(cur, &["a"])
    }

    pub(crate) fn rd_hl(&mut self, cur: &mut Scanner) -> i32 {
        self.indx_req(cur, &["hl"])
    }

    /// `af` (the `'` of `af'` is accepted and skipped)
    pub(crate) fn rd_af_alt(&mut self, cur: &mut Scanner) -> i32 {
        let i = self.indx_req(cur, &["af"]);
        if i != 0 && cur.peek() == Some(b'\'') {
            cur.advance(1);
        }
        i
    }

    /// long condition; quietly absent for the plain forms
    pub(crate) fn rd_cc(&mut self, cur: &mut Scanner) -> i32 {
        self.indx_opt(cur, &["nz", "z", "nc", "c", "po", "pe", "p", "m"])
    }

    /// the four conditions JR knows
    pub(crate) fn rd_jr_cc(&mut self, cur: &mut Scanner) -> i32 {
        self.indx_opt(cur, &["nz", "z", "nc", "c"])
    }

    /// first argument of EX
    pub(crate) fn rd_ex1(&mut self, cur: &mut Scanner) -> i32 {
        self.indx_req(cur, &["(sp)", "de", "af"])
    }

    /// destination of IN
    pub(crate) fn rd_in_arg(&mut self, cur: &mut Scanner) -> i32 {
        self.indx_req(cur, &["b", "c", "d", "e", "h", "l", "f", "a"])
    }

    /// source of OUT (c),x, including the undocumented 0
    pub(crate) fn rd_out_arg(&mut self, cur: &mut Scanner) -> i32 {
        self.indx_req(cur, &["b", "c", "d", "e", "h", "l", "0", "a"])
    }

    pub(crate) fn rd_c_port(&mut self, cur: &mut Scanner) -> i32 {
        self.indx_req(cur, &["(c)", "(bc)"])
    }

    pub(crate) fn rd_a_hl(&mut self, cur: &mut Scanner) -> i32 {
        self.indx_req(cur, &["a", "hl"])
    }

    /// `a`, `hl`, or an index register standing in for `hl`
    pub(crate) fn rd_a_hlx(&mut self, cur: &mut Scanner) -> i32 {
        let i = self.indx_req(cur, &["a", "hl", "ix", "iy"]);
        match i {
            0 | 1 | 2 => i,
            _ => {
                self.scratch.indexed = if i == 4 { 0xFD } else { 0xDD };
                ARG_HL
            }
        }
    }

    pub(crate) fn rd_rr_(&mut self, cur: &mut Scanner) -> i32 {
        self.indx_req(cur, &["bc", "de", "hl", "sp"])
    }

    /// register pairs for ADD hl|ix|iy: the third slot follows the prefix
    pub(crate) fn rd_rrxx(&mut self, cur: &mut Scanner) -> i32 {
        let list: &[&str] = match self.scratch.indexed {
            0xDD => &["bc", "de", "ix", "sp"],
            0xFD => &["bc", "de", "iy", "sp"],
            _ => &["bc", "de", "hl", "sp"],
        };
        self.indx_req(cur, list)
    }

    pub(crate) fn rd_stack(&mut self, cur: &mut Scanner) -> i32 {
        let i = self.indx_req(cur, &["bc", "de", "hl", "af", "ix", "iy"]);
        if i == 0 || i < 5 {
            return i;
        }
        self.scratch.indexed = if i == 6 { 0xFD } else { 0xDD };
        3
    }

    pub(crate) fn rd_hlx(&mut self, cur: &mut Scanner) -> i32 {
        let i = self.indx_req(cur, &["hl", "ix", "iy"]);
        match i {
            0 | 1 => i,
            _ => {
                self.scratch.indexed = if i == 3 { 0xFD } else { 0xDD };
                1
            }
        }
    }

    /// interrupt mode operand
    pub(crate) fn rd_0_2(&mut self, cur: &mut Scanner) -> i32 {
        self.indx_req(cur, &["0", "", "1", "2"])
    }

    /// bit index of BIT/SET/RES: an expression up to the comma
    pub(crate) fn rd_0_7(&mut self, cur: &mut Scanner) -> bool {
        cur.delspc();
        if cur.rest().is_empty() {
            return false;
        }
        let Some(cap) = self.capture_expr(cur) else {
            return false;
        };
        self.scratch.bitsetres = Some(cap);
        if let Err(msg) = cur.rd_comma() {
            self.error_here(&msg);
            return false;
        }
        true
    }

    /// 8-bit register, indexed memory, or an immediate byte
    pub(crate) fn rd_r(&mut self, cur: &mut Scanner) -> i32 {
        let i = self.indx_opt(
            cur,
            &["ixl", "ixh", "iyl", "iyh", "b", "c", "d", "e", "h", "l", "(hl)", "a", "(ix", "(iy"],
        );
        if i == 0 {
            if !self.rd_byte(cur) {
                self.error_here("Unexpected end of line.");
                return 0;
            }
            return 7;
        }
        if i <= 4 {
            self.scratch.indexed = if i > 2 { 0xFD } else { 0xDD };
            // ixh/iyh take the h slot, ixl/iyl the l slot
            return 5 + (i & 1);
        }
        let i = i - 4;
        if i < 9 {
            return i;
        }
        self.scratch.indexed = if i == 10 { 0xFD } else { 0xDD };
        if !self.rd_index(cur) {
            return 0;
        }
        7
    }

    /// like rd_r but without the immediate fallback
    pub(crate) fn rd_r_(&mut self, cur: &mut Scanner) -> i32 {
        let i = self.indx_req(
            cur,
            &["b", "c", "d", "e", "h", "l", "(hl)", "a", "(ix", "(iy"],
        );
        if i == 0 || i < 9 {
            return i;
        }
        self.scratch.indexed = if i == 10 { 0xFD } else { 0xDD };
        if !self.rd_index(cur) {
            return 0;
        }
        7
    }

    /// INC/DEC operand: negative codes are 8-bit registers, positive ones
    /// register pairs
    pub(crate) fn rd_r_rr(&mut self, cur: &mut Scanner) -> i32 {
        let i = self.indx_req(
            cur,
            &["iy", "ix", "sp", "hl", "de", "bc", "", "b", "c", "d", "e", "h", "l", "(hl)", "a",
              "(ix", "(iy"],
        );
        if i == 0 {
            return 0;
        }
        if i > 15 {
            self.scratch.indexed = if i == 17 { 0xFD } else { 0xDD };
            if !self.rd_index(cur) {
                return 0;
            }
            return -7;
        }
        if i > 2 {
            return 7 - i;
        }
        self.scratch.indexed = if i == 1 { 0xFD } else { 0xDD };
        3
    }

    /// first argument of JP; negative means `(hl)`/`(ix)`/`(iy)`
    pub(crate) fn rd_jp_arg(&mut self, cur: &mut Scanner) -> i32 {
        let i = self.indx_opt(
            cur,
            &["nz", "z", "nc", "c", "po", "pe", "p", "m", "(ix)", "(iy)", "(hl)"],
        );
        if i < 9 {
            return i;
        }
        if i == 11 {
            return -1;
        }
        self.scratch.indexed = if i == 10 { 0xFD } else { 0xDD };
        -1
    }

    /// `(c)` or `(nn)` after IN/OUT
    pub(crate) fn rd_nnc(&mut self, cur: &mut Scanner) -> i32 {
        if self.indx_req(cur, &["("]) == 0 {
            return 0;
        }
        cur.delspc();
        let rest = cur.rest().as_bytes();
        if !rest.is_empty() && rest[0].eq_ignore_ascii_case(&b'c') {
            let mut j = 1;
            while j < rest.len() && (rest[j] == b' ' || rest[j] == b'\t') {
                j += 1;
            }
            if j < rest.len() && rest[j] == b')' {
                cur.advance(j + 1);
                return PORT_C;
            }
        }
        let Some(cap) = self.capture_expr(cur) else {
            return 0;
        };
        if !self.expect_close(cur) {
            return 0;
        }
        self.scratch.readbyte = Some(cap);
        self.scratch.writebyte = false;
        2
    }

    /// first argument of LD
    pub(crate) fn rd_ld(&mut self, cur: &mut Scanner) -> i32 {
        let i = self.indx_req(
            cur,
            &["ixh", "ixl", "iyh", "iyl", "bc", "de", "hl", "sp", "ix", "iy", "b", "c", "d", "e",
              "h", "l", "(hl)", "a", "i", "r", "(bc)", "(de)", "(ix", "(iy", "("],
        );
        if i == 0 {
            return 0;
        }
        if i <= 2 {
            self.scratch.indexed = 0xDD;
            return LD_H + (i == 2) as i32;
        }
        if i <= 4 {
            self.scratch.indexed = 0xFD;
            return LD_H + (i == 4) as i32;
        }
        let i = i - 4;
        if i == LD_IX || i == LD_IY {
            self.scratch.indexed = if i == LD_IX { 0xDD } else { 0xFD };
            return LD_HL;
        }
        if i == LD_MIX || i == LD_MIY {
            self.scratch.indexed = if i == LD_MIX { 0xDD } else { 0xFD };
            if !self.rd_index(cur) {
                return 0;
            }
            return LD_MHL;
        }
        if i == LD_MNN {
            if !self.rd_word(cur) {
                self.error_here("Unexpected end of line.");
                return 0;
            }
            if !self.expect_close(cur) {
                return 0;
            }
        }
        i
    }

    /// source of `ld (hl),x`
    pub(crate) fn rd_ld_hl(&mut self, cur: &mut Scanner) -> i32 {
        let i = self.indx_opt(cur, &["b", "c", "d", "e", "h", "l", "", "a"]);
        if i != 0 {
            return i;
        }
        if !self.rd_byte(cur) {
            self.error_here("Unexpected end of line.");
            return 0;
        }
        7
    }

    /// source of `ld (nn),x`
    pub(crate) fn rd_ld_nn(&mut self, cur: &mut Scanner) -> i32 {
        let i = self.indx_req(cur, &["bc", "de", "", "sp", "hl", "a", "ix", "iy"]);
        if i == 0 || i < 7 {
            return i;
        }
        self.scratch.indexed = if i == 8 { 0xFD } else { 0xDD };
        LD_NN_HL
    }

    /// source of `ld a,x`; negative codes are (bc)/(de)
    pub(crate) fn rd_lda(&mut self, cur: &mut Scanner) -> i32 {
        let i = self.indx_opt(
            cur,
            &["(sp)", "(iy", "(de)", "(bc)", "(ix", "b", "c", "d", "e", "h", "l", "(hl)", "a",
              "i", "r", "("],
        );
        if i == 2 || i == 5 {
            self.scratch.indexed = if i == 2 { 0xFD } else { 0xDD };
            if !self.rd_index(cur) {
                return 0;
            }
            return 7;
        }
        if i == 0 {
            if !self.rd_byte(cur) {
                self.error_here("Unexpected end of line.");
                return 0;
            }
            return 7;
        }
        if i == 16 {
            if !self.rd_word(cur) {
                self.error_here("Unexpected end of line.");
                return 0;
            }
            if !self.expect_close(cur) {
                return 0;
            }
            return A_NN;
        }
        i - 5
    }

    /// source of `ld b..l,x`
    pub(crate) fn rd_ldbcdehla(&mut self, cur: &mut Scanner) -> i32 {
        let i = self.indx_opt(
            cur,
            &["b", "c", "d", "e", "h", "l", "(hl)", "a", "(ix", "(iy", "ixh", "ixl", "iyh", "iyl"],
        );
        if i > 10 {
            let x: u8 = if i > 12 { 0xFD } else { 0xDD };
            if self.scratch.indexed != 0 && self.scratch.indexed != x {
                self.error_here("Syntax error: illegal use of index registers.");
                return 0;
            }
            self.scratch.indexed = x;
            return 6 - (i & 1);
        }
        if i > 8 {
            if self.scratch.indexed != 0 {
                self.error_here("Syntax error: illegal use of index registers.");
                return 0;
            }
            self.scratch.indexed = if i == 10 { 0xFD } else { 0xDD };
            if !self.rd_index(cur) {
                return 0;
            }
            return 7;
        }
        if i != 0 {
            return i;
        }
        if !self.rd_byte(cur) {
            self.error_here("Unexpected end of line.");
            return 0;
        }
        7
    }

    /// `nn` or `(nn)`; -1 on a parse failure
    pub(crate) fn rd_nn_nn(&mut self, cur: &mut Scanner) -> i32 {
        let i = self.indx_opt(cur, &["("]);
        if i != 0 {
            if !self.rd_word(cur) {
                self.error_here("Unexpected end of line.");
                return -1;
            }
            if !self.expect_close(cur) {
                return -1;
            }
            return 1;
        }
        if !self.rd_word(cur) {
            self.error_here("Unexpected end of line.");
            return -1;
        }
        0
    }

    /// source of `ld sp,x`; -1 on a parse failure
    pub(crate) fn rd_sp_arg(&mut self, cur: &mut Scanner) -> i32 {
        let i = self.indx_opt(cur, &["(", "ix", "iy", "hl"]);
        match i {
            0 => {
                if !self.rd_word(cur) {
                    self.error_here("Unexpected end of line.");
                    return -1;
                }
                SP_NN
            }
            1 => {
                if !self.rd_word(cur) {
                    self.error_here("Unexpected end of line.");
                    return -1;
                }
                if !self.expect_close(cur) {
                    return -1;
                }
                SP_MEM
            }
            4 => SP_HL,
            _ => {
                self.scratch.indexed = if i == 3 { 0xFD } else { 0xDD };
                SP_HL
            }
        }
    }
}
