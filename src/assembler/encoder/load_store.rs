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
use super::operands::*;
use crate::file_reader::FileReader;
use crate::scanner::Scanner;

impl<R: FileReader> Assembler<'_, R> {
    /// The LD matrix: keyed on the left-hand kind, each arm pulls the
    /// right-hand shapes it accepts.
    pub(crate) fn op_ld(&mut self, cur: &mut Scanner) {
        let r = self.rd_ld(cur);
        match r {
            0 => {}
            LD_MBC | LD_MDE => {
                // ld (bc),a / ld (de),a
                if self.rd_a(cur) == 0 {
                    return;
                }
                self.wrtb(0x02 + 0x10 * (r == LD_MDE) as i32);
            }
            LD_MHL => {
                // ld (hl),r or ld (hl),n; the indexed forms ride along via
                // the prefix and displacement left by rd_ld
                let s = self.rd_ld_hl(cur);
                if s == 0 {
                    return;
                }
                self.wrtb(0x70 + s - 1);
            }
            LD_MNN => {
                let s = self.rd_ld_nn(cur);
                if s == 0 {
                    return;
                }
                if s == LD_NN_A || s == LD_NN_HL {
                    self.wrtb(0x22 + 0x10 * (s == LD_NN_A) as i32);
                    self.write_word();
                    return;
                }
                self.wrtb(0xED);
                self.wrtb(0x43 + 0x10 * (s - 1));
                self.write_word();
            }
            LD_A => {
                let s = self.rd_lda(cur);
                if s == 0 {
                    return;
                }
                if s == A_NN {
                    self.wrtb(0x3A);
                    self.write_word();
                    return;
                }
                if s == A_I || s == A_R {
                    self.wrtb(0xED);
                    self.wrtb(0x57 + 8 * (s == A_R) as i32);
                    return;
                }
                if s < 0 {
                    // (bc) and (de)
                    self.wrtb(0x0A - 0x10 * (s + 1));
                    return;
                }
                self.wrtb(0x78 + s - 1);
            }
            LD_B..=LD_L => {
                let s = self.rd_ldbcdehla(cur);
                if s == 0 {
                    return;
                }
                self.wrtb(0x40 + 0x08 * (r - LD_B) + (s - 1));
            }
            LD_BC | LD_DE => {
                let s = self.rd_nn_nn(cur);
                if s < 0 {
                    return;
                }
                if s == 1 {
                    self.wrtb(0xED);
                    self.wrtb(0x4B + 0x10 * (r == LD_DE) as i32);
                    self.write_word();
                    return;
                }
                self.wrtb(0x01 + 0x10 * (r == LD_DE) as i32);
                self.write_word();
            }
            LD_HL => {
                let s = self.rd_nn_nn(cur);
                if s < 0 {
                    return;
                }
                // 0x21 for an immediate, 0x2A for (nn)
                self.wrtb(0x21 + 9 * s);
                self.write_word();
            }
            LD_I | LD_R => {
                if self.rd_a(cur) == 0 {
                    return;
                }
                self.wrtb(0xED);
                self.wrtb(0x47 + 0x08 * (r == LD_R) as i32);
            }
            LD_SP => {
                let s = self.rd_sp_arg(cur);
                match s {
                    SP_HL => self.wrtb(0xF9),
                    SP_NN => {
                        self.wrtb(0x31);
                        self.write_word();
                    }
                    SP_MEM => {
                        self.wrtb(0xED);
                        self.wrtb(0x7B);
                        self.write_word();
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    pub(crate) fn op_ex(&mut self, cur: &mut Scanner) {
        let r = self.rd_ex1(cur);
        match r {
            EX_DE => {
                if self.rd_hl(cur) == 0 {
                    return;
                }
                self.wrtb(0xEB);
            }
            EX_AF => {
                if self.rd_af_alt(cur) == 0 {
                    return;
                }
                self.wrtb(0x08);
            }
            0 => {}
            _ => {
                // ex (sp),hl|ix|iy
                if self.rd_hlx(cur) == 0 {
                    return;
                }
                self.wrtb(0xE3);
            }
        }
    }

    /// PUSH (base 0xC5) and POP (base 0xC1)
    pub(crate) fn op_stack(&mut self, cur: &mut Scanner, base: i32) {
        let r = self.rd_stack(cur);
        if r == 0 {
            return;
        }
        self.wrtb(base + 0x10 * (r - 1));
    }
}
