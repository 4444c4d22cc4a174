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

//! Mnemonic dispatch and the byte-emission pipeline.
//!
//! Operand recognisers collect their findings into `Scratch`; `wrtb`
//! consumes it in a fixed order while writing each opcode byte: the index
//! prefix goes out first, a pending immediate folds `0x40` into the opcode
//! (the `(hl)`-to-immediate substitution), a pending bit index turns the
//! non-`CB` byte into a BSR reference, then the index displacement and the
//! immediate operand byte follow as references of their own.

mod arithmetic;
mod bitwise;
mod control_flow;
mod load_store;
mod misc;
pub(crate) mod operands;

use super::Assembler;
use super::references::CapturedExpr;
use crate::file_reader::FileReader;
use crate::parser::parse_expression;
use crate::scanner::Scanner;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Call, Cpdr, Cpir, Djnz, Halt, Indr, Inir, Lddr, Ldir, Otdr, Otir, Outd, Outi, Push,
    Reti, Retn, Rlca, Rrca, DefB, DefW, DefS, DefM,
    Adc, Add, And, Bit, Ccf, Cpd, Cpi, Cpl, Daa, Dec, Equ, Exx, Inc, Ind, Ini, Ldd, Ldi,
    Neg, Nop, Out, Pop, Res, Ret, Rla, Rlc, Rld, Rra, Rrc, Rrd, Rst, Sbc, Scf, Set, Sla,
    Sll, Sli, Sra, Srl, Sub, Xor, Org,
    Cp, Di, Ei, Ex, Im, In, Jp, Jr, Ld, Or, Rl, Rr,
    Include, BinInclude, If, Else, EndIf, End, MacroDef, EndM,
}

/// Keyword table, longest spellings first so prefixes never shadow them.
#[rustfmt::skip]
pub(crate) const MNEMONICS: &[(&str, Mnemonic)] = &[
    ("call", Mnemonic::Call), ("cpdr", Mnemonic::Cpdr), ("cpir", Mnemonic::Cpir),
    ("djnz", Mnemonic::Djnz), ("halt", Mnemonic::Halt), ("indr", Mnemonic::Indr),
    ("inir", Mnemonic::Inir), ("lddr", Mnemonic::Lddr), ("ldir", Mnemonic::Ldir),
    ("otdr", Mnemonic::Otdr), ("otir", Mnemonic::Otir), ("outd", Mnemonic::Outd),
    ("outi", Mnemonic::Outi), ("push", Mnemonic::Push), ("reti", Mnemonic::Reti),
    ("retn", Mnemonic::Retn), ("rlca", Mnemonic::Rlca), ("rrca", Mnemonic::Rrca),
    ("defb", Mnemonic::DefB), ("defw", Mnemonic::DefW), ("defs", Mnemonic::DefS),
    ("defm", Mnemonic::DefM),
    ("adc", Mnemonic::Adc), ("add", Mnemonic::Add), ("and", Mnemonic::And),
    ("bit", Mnemonic::Bit), ("ccf", Mnemonic::Ccf), ("cpd", Mnemonic::Cpd),
    ("cpi", Mnemonic::Cpi), ("cpl", Mnemonic::Cpl), ("daa", Mnemonic::Daa),
    ("dec", Mnemonic::Dec), ("equ", Mnemonic::Equ), ("exx", Mnemonic::Exx),
    ("inc", Mnemonic::Inc), ("ind", Mnemonic::Ind), ("ini", Mnemonic::Ini),
    ("ldd", Mnemonic::Ldd), ("ldi", Mnemonic::Ldi), ("neg", Mnemonic::Neg),
    ("nop", Mnemonic::Nop), ("out", Mnemonic::Out), ("pop", Mnemonic::Pop),
    ("res", Mnemonic::Res), ("ret", Mnemonic::Ret), ("rla", Mnemonic::Rla),
    ("rlc", Mnemonic::Rlc), ("rld", Mnemonic::Rld), ("rra", Mnemonic::Rra),
    ("rrc", Mnemonic::Rrc), ("rrd", Mnemonic::Rrd), ("rst", Mnemonic::Rst),
    ("sbc", Mnemonic::Sbc), ("scf", Mnemonic::Scf), ("set", Mnemonic::Set),
    ("sla", Mnemonic::Sla), ("sll", Mnemonic::Sll), ("sli", Mnemonic::Sli),
    ("sra", Mnemonic::Sra), ("srl", Mnemonic::Srl), ("sub", Mnemonic::Sub),
    ("xor", Mnemonic::Xor), ("org", Mnemonic::Org),
    ("cp", Mnemonic::Cp), ("di", Mnemonic::Di), ("ei", Mnemonic::Ei),
    ("ex", Mnemonic::Ex), ("im", Mnemonic::Im), ("in", Mnemonic::In),
    ("jp", Mnemonic::Jp), ("jr", Mnemonic::Jr), ("ld", Mnemonic::Ld),
    ("or", Mnemonic::Or), ("rl", Mnemonic::Rl), ("rr", Mnemonic::Rr),
    ("db", Mnemonic::DefB), ("dw", Mnemonic::DefW), ("ds", Mnemonic::DefS),
    ("dm", Mnemonic::DefM),
    ("include", Mnemonic::Include), ("bininclude", Mnemonic::BinInclude),
    ("if", Mnemonic::If), ("else", Mnemonic::Else), ("endif", Mnemonic::EndIf),
    ("end", Mnemonic::End), ("macro", Mnemonic::MacroDef), ("endm", Mnemonic::EndM),
];

static MNEMONIC_NAMES: LazyLock<Vec<&'static str>> =
    LazyLock::new(|| MNEMONICS.iter().map(|(n, _)| *n).collect());

/// Per-instruction operand-collection state, reset at every line and
/// consumed by `wrtb`.
#[derive(Default)]
pub struct Scratch {
    /// 0, 0xDD or 0xFD
    pub indexed: u8,
    /// emit the captured `readbyte` as an operand after the opcode
    pub writebyte: bool,
    pub readbyte: Option<CapturedExpr>,
    pub readword: Option<CapturedExpr>,
    /// displacement of an `(ix+d)`/`(iy+d)` operand
    pub indexjmp: Option<CapturedExpr>,
    /// bit index of BIT/SET/RES
    pub bitsetres: Option<CapturedExpr>,
}

impl<R: FileReader> Assembler<'_, R> {
    pub(crate) fn read_command(&mut self, cur: &mut Scanner) -> Option<Mnemonic> {
        match cur.indx(&MNEMONIC_NAMES) {
            Ok(0) | Err(_) => None,
            Ok(i) => Some(MNEMONICS[i - 1].1),
        }
    }

    /// Keyword match where absence is an error.
    pub(crate) fn indx_req(&mut self, cur: &mut Scanner, list: &[&str]) -> i32 {
        match cur.indx(list) {
            Err(msg) => {
                self.error_here(&msg);
                0
            }
            Ok(0) => {
                if cur.done() {
                    self.error_here("Unexpected end of line.");
                } else {
                    self.error_here(&format!("Parse error. Remainder of line={}", cur.rest()));
                }
                0
            }
            Ok(i) => i as i32,
        }
    }

    /// Keyword match where absence just selects another operand form.
    pub(crate) fn indx_opt(&mut self, cur: &mut Scanner, list: &[&str]) -> i32 {
        match cur.indx(list) {
            Err(msg) => {
                self.error_here(&msg);
                0
            }
            Ok(i) => i as i32,
        }
    }

    /// Parse the expression at the cursor into a tree, keeping its text.
    pub(crate) fn capture_expr(&mut self, cur: &mut Scanner) -> Option<CapturedExpr> {
        cur.delspc();
        let rest = cur.rest();
        if rest.is_empty() {
            self.error_here("Error: Expression expected");
            return None;
        }
        match parse_expression(rest) {
            Ok((expr, used)) => {
                let text = rest[..used].to_string();
                cur.advance(used);
                Some(CapturedExpr { expr, text })
            }
            Err(msg) => {
                self.error_here(&msg);
                None
            }
        }
    }

    /// Capture a byte-sized operand; false on an empty rest-of-line.
    pub(crate) fn rd_byte(&mut self, cur: &mut Scanner) -> bool {
        cur.delspc();
        if cur.rest().is_empty() {
            return false;
        }
        match self.capture_expr(cur) {
            Some(cap) => {
                self.scratch.readbyte = Some(cap);
                self.scratch.writebyte = true;
                true
            }
            None => false,
        }
    }

    /// Capture a word-sized operand; false on an empty rest-of-line.
    pub(crate) fn rd_word(&mut self, cur: &mut Scanner) -> bool {
        cur.delspc();
        if cur.rest().is_empty() {
            return false;
        }
        match self.capture_expr(cur) {
            Some(cap) => {
                self.scratch.readword = Some(cap);
                true
            }
            None => false,
        }
    }

    pub(crate) fn expect_close(&mut self, cur: &mut Scanner) -> bool {
        cur.delspc();
        if cur.peek() == Some(b')') {
            cur.advance(1);
            true
        } else {
            self.error_here("Missing closing parenthesis");
            false
        }
    }

    /// Capture the displacement of an `(ix+d)` operand, including the `)`.
    pub(crate) fn rd_index(&mut self, cur: &mut Scanner) -> bool {
        match self.capture_expr(cur) {
            Some(cap) => {
                self.scratch.indexjmp = Some(cap);
                self.expect_close(cur)
            }
            None => false,
        }
    }

    /// Emit one opcode byte, consuming the collected operand state.
    pub(crate) fn wrtb(&mut self, b: i32) {
        if self.scratch.indexed != 0 {
            let prefix = self.scratch.indexed as i32;
            self.scratch.indexed = 0;
            self.write_one_byte(prefix, true);
        }
        let mut b = b;
        if self.scratch.writebyte {
            b ^= 0x40;
        }
        if self.scratch.bitsetres.is_some() && b != 0xCB {
            let cap = self.scratch.bitsetres.take().expect("checked above");
            self.new_reference(cap, super::references::RefKind::Bsr, b);
        } else {
            self.write_one_byte(b, true);
        }
        if let Some(cap) = self.scratch.indexjmp.take() {
            self.new_reference(cap, super::references::RefKind::AbsByte, 1);
        }
        if self.scratch.writebyte {
            self.scratch.writebyte = false;
            if let Some(cap) = self.scratch.readbyte.take() {
                self.new_reference(cap, super::references::RefKind::AbsByte, 1);
            }
        }
    }

    /// Emit the captured word operand as an absolute-word reference.
    pub(crate) fn write_word(&mut self) {
        if let Some(cap) = self.scratch.readword.take() {
            self.new_reference(cap, super::references::RefKind::AbsWord, 1);
        }
    }

    /// Emit the captured byte operand as a PC-relative displacement.
    pub(crate) fn write_rel(&mut self) {
        self.scratch.writebyte = false;
        if let Some(cap) = self.scratch.readbyte.take() {
            let following = (self.addr + 1) & 0xffff;
            self.new_reference(cap, super::references::RefKind::RelByte, following);
        }
    }

    pub(crate) fn op_ed(&mut self, body: i32) {
        self.wrtb(0xED);
        self.wrtb(body);
    }

    pub(crate) fn dispatch(&mut self, cmd: Mnemonic, cur: &mut Scanner) {
        match cmd {
            Mnemonic::Adc => self.op_adc(cur),
            Mnemonic::Add => self.op_add(cur),
            Mnemonic::And => self.op_logic(cur, 0xA0),
            Mnemonic::Bit => self.op_bsr(cur, 0x40),
            Mnemonic::Call => self.op_call(cur),
            Mnemonic::Ccf => self.wrtb(0x3F),
            Mnemonic::Cp => self.op_logic(cur, 0xB8),
            Mnemonic::Cpd => self.op_ed(0xA9),
            Mnemonic::Cpdr => self.op_ed(0xB9),
            Mnemonic::Cpi => self.op_ed(0xA1),
            Mnemonic::Cpir => self.op_ed(0xB1),
            Mnemonic::Cpl => self.wrtb(0x2F),
            Mnemonic::Daa => self.wrtb(0x27),
            Mnemonic::Dec => self.op_dec(cur),
            Mnemonic::Di => self.wrtb(0xF3),
            Mnemonic::Djnz => self.op_djnz(cur),
            Mnemonic::Ei => self.wrtb(0xFB),
            Mnemonic::Equ => self.do_equ(cur),
            Mnemonic::Ex => self.op_ex(cur),
            Mnemonic::Exx => self.wrtb(0xD9),
            Mnemonic::Halt => self.wrtb(0x76),
            Mnemonic::Im => self.op_im(cur),
            Mnemonic::In => self.op_in(cur),
            Mnemonic::Inc => self.op_inc(cur),
            Mnemonic::Ind => self.op_ed(0xAA),
            Mnemonic::Indr => self.op_ed(0xBA),
            Mnemonic::Ini => self.op_ed(0xA2),
            Mnemonic::Inir => self.op_ed(0xB2),
            Mnemonic::Jp => self.op_jp(cur),
            Mnemonic::Jr => self.op_jr(cur),
            Mnemonic::Ld => self.op_ld(cur),
            Mnemonic::Ldd => self.op_ed(0xA8),
            Mnemonic::Lddr => self.op_ed(0xB8),
            Mnemonic::Ldi => self.op_ed(0xA0),
            Mnemonic::Ldir => self.op_ed(0xB0),
            Mnemonic::Neg => self.op_ed(0x44),
            Mnemonic::Nop => self.wrtb(0x00),
            Mnemonic::Or => self.op_logic(cur, 0xB0),
            Mnemonic::Otdr => self.op_ed(0xBB),
            Mnemonic::Otir => self.op_ed(0xB3),
            Mnemonic::Out => self.op_out(cur),
            Mnemonic::Outd => self.op_ed(0xAB),
            Mnemonic::Outi => self.op_ed(0xA3),
            Mnemonic::Pop => self.op_stack(cur, 0xC1),
            Mnemonic::Push => self.op_stack(cur, 0xC5),
            Mnemonic::Res => self.op_bsr(cur, 0x80),
            Mnemonic::Ret => self.op_ret(cur),
            Mnemonic::Reti => self.op_ed(0x4D),
            Mnemonic::Retn => self.op_ed(0x45),
            Mnemonic::Rl => self.op_cb_rot(cur, 0x10),
            Mnemonic::Rla => self.wrtb(0x17),
            Mnemonic::Rlc => self.op_cb_rot(cur, 0x00),
            Mnemonic::Rlca => self.wrtb(0x07),
            Mnemonic::Rld => self.op_ed(0x6F),
            Mnemonic::Rr => self.op_cb_rot(cur, 0x18),
            Mnemonic::Rra => self.wrtb(0x1F),
            Mnemonic::Rrc => self.op_cb_rot(cur, 0x08),
            Mnemonic::Rrca => self.wrtb(0x0F),
            Mnemonic::Rrd => self.op_ed(0x67),
            Mnemonic::Rst => self.op_rst(cur),
            Mnemonic::Sbc => self.op_sbc(cur),
            Mnemonic::Scf => self.wrtb(0x37),
            Mnemonic::Set => self.op_bsr(cur, 0xC0),
            Mnemonic::Sla => self.op_cb_rot(cur, 0x20),
            Mnemonic::Sll | Mnemonic::Sli => self.op_cb_rot(cur, 0x30),
            Mnemonic::Sra => self.op_cb_rot(cur, 0x28),
            Mnemonic::Srl => self.op_cb_rot(cur, 0x38),
            Mnemonic::Sub => self.op_logic(cur, 0x90),
            Mnemonic::Xor => self.op_logic(cur, 0xA8),
            Mnemonic::DefB | Mnemonic::DefM => self.do_defb(cur),
            Mnemonic::DefW => self.do_defw(cur),
            Mnemonic::DefS => self.do_defs(cur),
            Mnemonic::Org => self.do_org(cur),
            Mnemonic::End => self.do_end(),
            Mnemonic::Include => self.do_include(cur),
            Mnemonic::BinInclude => self.do_bininclude(cur),
            Mnemonic::If => self.do_if(cur),
            Mnemonic::Else => self.do_else(),
            Mnemonic::EndIf => self.do_endif(),
            Mnemonic::MacroDef => self.do_macro(cur),
            Mnemonic::EndM => self.semantic_here("ENDM without MACRO."),
        }
    }
}
