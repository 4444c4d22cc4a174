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

use super::eval::{Lookup, lookup_label};
use super::macros::MacroDef;
use super::references::RefKind;
use super::symbol_table::PendingExpr;
use super::{Assembler, MAX_INCLUDE};
use crate::file_reader::FileReader;
use crate::parser::literals::decode_char;
use crate::scanner::Scanner;

impl<R: FileReader> Assembler<'_, R> {
    /// EQU rebinds the label just read on this line. The expression is
    /// parked on the label first and only then evaluated through the normal
    /// lookup path, so the busy fence catches definitions that feed on
    /// themselves; what stays unresolved is retried on later lookups.
    pub(crate) fn do_equ(&mut self, cur: &mut Scanner) {
        let Some(slot) = self.last_label.clone() else {
            self.semantic_here("EQU without label.");
            return;
        };
        let Some(cap) = self.capture_expr(cur) else {
            return;
        };
        let level = self.sp();
        let baseaddr = self.baseaddr;
        let loc = self.cur_loc.clone();
        if let Some(def) = self.symtab.slot_mut(slot.scoped, &slot.name) {
            def.value = 0;
            def.valid = false;
            def.pending = Some(PendingExpr {
                expr: cap.expr,
                text: cap.text,
                level,
                baseaddr,
                loc,
                done: false,
            });
        }
        match lookup_label(&mut self.symtab, &mut self.diag, &slot.name, level) {
            Lookup::Value(value) => self.diag.chat(
                2,
                &format!("Assigned value {} to label {}.", value, slot.name),
            ),
            _ => self.diag.chat(
                2,
                &format!("Scheduled label {} for later computation.", slot.name),
            ),
        }
    }

    pub(crate) fn do_org(&mut self, cur: &mut Scanner) {
        let Some(cap) = self.capture_expr(cur) else {
            return;
        };
        let (value, _) = self.eval_now(&cap, true);
        self.addr = value & 0xffff;
    }

    /// DEFB/DB/DEFM/DM: bytes and quoted strings, comma separated.
    pub(crate) fn do_defb(&mut self, cur: &mut Scanner) {
        loop {
            cur.delspc();
            let Some(first) = cur.peek() else { break };
            if first == b'"' || first == b'\'' {
                self.out.string_marker();
                cur.advance(1);
                loop {
                    match cur.peek() {
                        None => {
                            self.error_here("Error: end of line in quoted string");
                            return;
                        }
                        Some(q) if q == first => break,
                        _ => match decode_char(cur.rest().as_bytes()) {
                            Ok((v, used)) => {
                                self.write_one_byte(v, false);
                                cur.advance(used);
                            }
                            Err(msg) => {
                                self.error_here(&msg);
                                return;
                            }
                        },
                    }
                }
                cur.advance(1);
            } else {
                let Some(cap) = self.capture_expr(cur) else {
                    return;
                };
                self.new_reference(cap, RefKind::AbsByte, 1);
            }
            cur.delspc();
            match cur.peek() {
                None => break,
                Some(b',') => cur.advance(1),
                Some(_) => {
                    self.error_here(&format!(
                        "Error: expected end of line or `,' (not {})",
                        cur.rest()
                    ));
                    return;
                }
            }
        }
    }

    /// DEFW/DW: comma-separated words.
    pub(crate) fn do_defw(&mut self, cur: &mut Scanner) {
        loop {
            cur.delspc();
            if cur.peek().is_none() {
                break;
            }
            let Some(cap) = self.capture_expr(cur) else {
                return;
            };
            self.new_reference(cap, RefKind::AbsWord, 1);
            cur.delspc();
            match cur.peek() {
                None => break,
                Some(b',') => cur.advance(1),
                Some(_) => {
                    self.error_here(&format!(
                        "Error: expected end of line or `,' (not {})",
                        cur.rest()
                    ));
                    return;
                }
            }
        }
    }

    /// DEFS/DS n[,v]: the count must evaluate immediately, the fill value
    /// may be deferred.
    pub(crate) fn do_defs(&mut self, cur: &mut Scanner) {
        let Some(cap) = self.capture_expr(cur) else {
            return;
        };
        let (count, _) = self.eval_now(&cap, true);
        if count < 0 {
            self.semantic_here(&format!(
                "ds should have its first argument >=0 (not {}).",
                count
            ));
            return;
        }
        cur.delspc();
        if cur.peek().is_some() {
            if let Err(msg) = cur.rd_comma() {
                self.error_here(&msg);
                return;
            }
            let Some(fill) = self.capture_expr(cur) else {
                return;
            };
            self.new_reference(fill, RefKind::Ds, count);
            return;
        }
        self.out.zero_fill_marker();
        for _ in 0..count {
            self.write_one_byte(0, false);
        }
    }

    /// END throws the rest of the current frame away (it is still listed).
    pub(crate) fn do_end(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.ended = true;
        }
    }

    pub(crate) fn do_include(&mut self, cur: &mut Scanner) {
        if self.frames.len() >= MAX_INCLUDE {
            self.resource_here("stack overflow (circular include?)");
            return;
        }
        let name = match cur.read_quoted_name() {
            Ok(name) => name,
            Err(msg) => {
                self.error_here(&msg);
                return;
            }
        };
        match self.resolve_text(&name) {
            Some(text) => {
                self.diag.chat(2, &format!("Reading file {}", name));
                self.push_file_frame(&name, &text);
            }
            None => self.resource_here(&format!("Unable to open file {}", name)),
        }
    }

    /// BININCLUDE splices the file's bytes straight into the image.
    pub(crate) fn do_bininclude(&mut self, cur: &mut Scanner) {
        let name = match cur.read_quoted_name() {
            Ok(name) => name,
            Err(msg) => {
                self.error_here(&msg);
                return;
            }
        };
        match self.resolve_binary(&name) {
            Some(data) => {
                self.addr = (self.addr + data.len() as i32) & 0xffff;
                self.out.put_raw(&data);
            }
            None => self.resource_here(&format!("Unable to open binary file {}.", name)),
        }
    }

    pub(crate) fn do_if(&mut self, cur: &mut Scanner) {
        let Some(cap) = self.capture_expr(cur) else {
            return;
        };
        let (value, _) = self.eval_now(&cap, true);
        if value != 0 {
            self.ifcount += 1;
        } else {
            self.noifcount += 1;
        }
    }

    pub(crate) fn do_else(&mut self) {
        if self.ifcount == 0 {
            self.semantic_here("Error: else without if.");
            return;
        }
        self.noifcount = 1;
        self.ifcount -= 1;
    }

    pub(crate) fn do_endif(&mut self) {
        if self.noifcount == 0 && self.ifcount == 0 {
            self.semantic_here("Endif without if.");
            return;
        }
        if self.noifcount > 0 {
            self.noifcount -= 1;
        } else {
            self.ifcount -= 1;
        }
    }

    /// `<name>: MACRO p1, p2, ...`: the label becomes the macro name and
    /// recording starts. A broken header still records, into a definition
    /// that is thrown away at ENDM, so the body lines cause no noise.
    pub(crate) fn do_macro(&mut self, cur: &mut Scanner) {
        let Some(slot) = self.last_label.clone() else {
            self.semantic_here("Macro without label.");
            return;
        };
        if self.defining_macro {
            self.semantic_here("Nested macro definition.");
            return;
        }
        self.symtab.remove(slot.scoped, &slot.name);
        self.last_label = None;

        let mut discard = false;
        if self.macros.iter().any(|m| m.name == slot.name) {
            self.semantic_here("Duplicate macro definition.");
            discard = true;
        }
        let params = match cur.read_macro_args(false) {
            Ok(params) => params,
            Err(msg) => {
                self.error_here(&msg);
                discard = true;
                Vec::new()
            }
        };
        self.defining_macro = true;
        self.macro_discard = discard;
        self.current_macro = Some(MacroDef::new(slot.name, params));
    }
}
