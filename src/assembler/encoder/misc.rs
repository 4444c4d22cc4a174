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
use super::operands::{IN_A, PORT_C};
use crate::file_reader::FileReader;
use crate::scanner::Scanner;

impl<R: FileReader> Assembler<'_, R> {
    pub(crate) fn op_im(&mut self, cur: &mut Scanner) {
        let r = self.rd_0_2(cur);
        if r == 0 {
            return;
        }
        self.wrtb(0xED);
        self.wrtb(0x46 + 8 * (r - 1));
    }

    pub(crate) fn op_in(&mut self, cur: &mut Scanner) {
        let r = self.rd_in_arg(cur);
        if r == 0 {
            return;
        }
        if r == IN_A {
            let s = self.rd_nnc(cur);
            if s == 0 {
                return;
            }
            if s == PORT_C {
                self.wrtb(0xED);
                self.wrtb(0x40 + 8 * (IN_A - 1));
                return;
            }
            // in a,(nn): the port byte follows the opcode
            let cap = self.scratch.readbyte.take();
            self.wrtb(0xDB);
            if let Some(cap) = cap {
                self.new_reference(cap, RefKind::AbsByte, 1);
            }
            return;
        }
        if self.rd_c_port(cur) == 0 {
            return;
        }
        self.wrtb(0xED);
        self.wrtb(0x40 + 8 * (r - 1));
    }

    pub(crate) fn op_out(&mut self, cur: &mut Scanner) {
        let s = self.rd_nnc(cur);
        if s == 0 {
            return;
        }
        if s == PORT_C {
            let r = self.rd_out_arg(cur);
            if r == 0 {
                return;
            }
            self.wrtb(0xED);
            self.wrtb(0x41 + 8 * (r - 1));
            return;
        }
        if self.rd_a(cur) == 0 {
            return;
        }
        let cap = self.scratch.readbyte.take();
        self.wrtb(0xD3);
        if let Some(cap) = cap {
            self.new_reference(cap, RefKind::AbsByte, 1);
        }
    }
}
