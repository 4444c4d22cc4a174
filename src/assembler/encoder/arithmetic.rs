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
use super::operands::ARG_HL;
use crate::file_reader::FileReader;
use crate::scanner::Scanner;

impl<R: FileReader> Assembler<'_, R> {
    /// ADD/SUB/AND/OR/XOR/CP against the accumulator: base opcode plus the
    /// register code. The immediate forms come out of the same base through
    /// the `wrtb` 0x40 fold.
    pub(crate) fn op_logic(&mut self, cur: &mut Scanner, base: i32) {
        let r = self.rd_r(cur);
        if r == 0 {
            return;
        }
        self.wrtb(base + r - 1);
    }

    pub(crate) fn op_adc(&mut self, cur: &mut Scanner) {
        let r = self.rd_a_hl(cur);
        if r == 0 {
            return;
        }
        if r == ARG_HL {
            let rr = self.rd_rr_(cur);
            if rr == 0 {
                return;
            }
            self.wrtb(0xED);
            self.wrtb(0x4A + 0x10 * (rr - 1));
            return;
        }
        let r = self.rd_r(cur);
        if r == 0 {
            return;
        }
        self.wrtb(0x88 + r - 1);
    }

    pub(crate) fn op_sbc(&mut self, cur: &mut Scanner) {
        let r = self.rd_a_hl(cur);
        if r == 0 {
            return;
        }
        if r == ARG_HL {
            let rr = self.rd_rr_(cur);
            if rr == 0 {
                return;
            }
            self.wrtb(0xED);
            self.wrtb(0x42 + 0x10 * (rr - 1));
            return;
        }
        let r = self.rd_r(cur);
        if r == 0 {
            return;
        }
        self.wrtb(0x98 + r - 1);
    }

    pub(crate) fn op_add(&mut self, cur: &mut Scanner) {
        let r = self.rd_a_hlx(cur);
        if r == 0 {
            return;
        }
        if r == ARG_HL {
            let rr = self.rd_rrxx(cur);
            if rr == 0 {
                return;
            }
            self.wrtb(0x09 + 0x10 * (rr - 1));
            return;
        }
        let r = self.rd_r(cur);
        if r == 0 {
            return;
        }
        self.wrtb(0x80 + r - 1);
    }

    pub(crate) fn op_inc(&mut self, cur: &mut Scanner) {
        let r = self.rd_r_rr(cur);
        if r == 0 {
            return;
        }
        if r < 0 {
            self.wrtb(0x04 - 8 * (r + 1));
            return;
        }
        self.wrtb(0x03 + 0x10 * (r - 1));
    }

    pub(crate) fn op_dec(&mut self, cur: &mut Scanner) {
        let r = self.rd_r_rr(cur);
        if r == 0 {
            return;
        }
        if r < 0 {
            self.wrtb(0x05 - 8 * (r + 1));
            return;
        }
        self.wrtb(0x0B + 0x10 * (r - 1));
    }
}
