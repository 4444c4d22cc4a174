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
use crate::file_reader::FileReader;
use crate::scanner::Scanner;

impl<R: FileReader> Assembler<'_, R> {
    /// BIT/RES/SET: the bit index is an expression, so the second opcode
    /// byte goes out as a BSR reference carrying `base + register`.
    pub(crate) fn op_bsr(&mut self, cur: &mut Scanner, base: i32) {
        if !self.rd_0_7(cur) {
            return;
        }
        let r = self.rd_r_(cur);
        if r == 0 {
            return;
        }
        self.wrtb(0xCB);
        self.wrtb(base + r - 1);
    }

    /// the CB-prefixed rotate/shift family
    pub(crate) fn op_cb_rot(&mut self, cur: &mut Scanner, base: i32) {
        let r = self.rd_r_(cur);
        if r == 0 {
            return;
        }
        self.wrtb(0xCB);
        self.wrtb(base + r - 1);
    }
}
