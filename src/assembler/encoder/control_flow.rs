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

use super::super::Assembler;
use super::super::references::RefKind;
use crate::file_reader::FileReader;
use crate::scanner::Scanner;

impl<R: FileReader> Assembler<'_, R> {
    /// absolute target of CALL/JP
    fn rd_wrt_addr(&mut self, cur: &mut Scanner) {
        if !self.rd_word(cur) {
            self.error_here("Unexpected end of line.");
            return;
        }
        self.write_word();
    }

    /// relative target of JR/DJNZ
    fn rd_wrt_jr(&mut self, cur: &mut Scanner) {
        if !self.rd_byte(cur) {
            self.error_here("Unexpected end of line.");
            return;
        }
        self.write_rel();
    }

    pub(crate) fn op_call(&mut self, cur: &mut Scanner) {
        let r = self.rd_cc(cur);
        if r == 0 {
            self.wrtb(0xCD);
        } else {
            self.wrtb(0xC4 + 8 * (r - 1));
            if let Err(msg) = cur.rd_comma() {
                self.error_here(&msg);
                return;
            }
        }
        self.rd_wrt_addr(cur);
    }

    pub(crate) fn op_ret(&mut self, cur: &mut Scanner) {
        let r = self.rd_cc(cur);
        if r == 0 {
            self.wrtb(0xC9);
            return;
        }
        self.wrtb(0xC0 + 8 * (r - 1));
    }

    pub(crate) fn op_jp(&mut self, cur: &mut Scanner) {
        let r = self.rd_jp_arg(cur);
        if r < 0 {
            // (hl), (ix), (iy)
            self.wrtb(0xE9);
            return;
        }
        if r == 0 {
            self.wrtb(0xC3);
        } else {
            self.wrtb(0xC2 + 8 * (r - 1));
            if let Err(msg) = cur.rd_comma() {
                self.error_here(&msg);
                return;
            }
        }
        self.rd_wrt_addr(cur);
    }

    pub(crate) fn op_jr(&mut self, cur: &mut Scanner) {
        let r = self.rd_jr_cc(cur);
        if r != 0 {
            if let Err(msg) = cur.rd_comma() {
                self.error_here(&msg);
                return;
            }
        }
        self.wrtb(0x18 + 8 * r);
        self.rd_wrt_jr(cur);
    }

    pub(crate) fn op_djnz(&mut self, cur: &mut Scanner) {
        self.wrtb(0x10);
        self.rd_wrt_jr(cur);
    }

    /// RST takes an expression, so the whole opcode is a deferred patch.
    pub(crate) fn op_rst(&mut self, cur: &mut Scanner) {
        let Some(cap) = self.capture_expr(cur) else {
            return;
        };
        self.new_reference(cap, RefKind::Rst, 1);
    }
}
