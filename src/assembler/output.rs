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

//! Staged output streams.
//!
//! Machine code and the listing accumulate in memory so that deferred
//! references can be patched in place afterwards; only then is anything
//! handed to the real files. A patch cursor switches byte writes from
//! appending to overwriting. Listing cells have a fixed width (` %02x` per
//! byte, ` 0x%02x...` per fill marker) so a patch rewrites exactly the
//! characters the placeholder produced.

use super::symbol_table::SymbolTable;

pub struct Output {
    bin: Vec<u8>,
    listing: Option<Vec<u8>>,
    /// listing characters emitted for the current line; picks the tab count
    listdepth: usize,
    cursor: Option<(usize, usize)>,
}

impl Output {
    pub fn new(listing: bool) -> Self {
        Self {
            bin: Vec::new(),
            listing: if listing { Some(Vec::new()) } else { None },
            listdepth: 0,
            cursor: None,
        }
    }

    pub fn positions(&self) -> (usize, usize) {
        (self.bin.len(), self.listing.as_ref().map_or(0, |l| l.len()))
    }

    pub fn begin_patch(&mut self, opos: usize, lpos: usize) {
        self.cursor = Some((opos, lpos));
    }

    pub fn end_patch(&mut self) {
        self.cursor = None;
    }

    pub fn patching(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn put_byte(&mut self, b: u8, list: bool) {
        match &mut self.cursor {
            Some((o, l)) => {
                self.bin[*o] = b;
                *o += 1;
                if list {
                    if let Some(ls) = self.listing.as_mut() {
                        let cell = format!(" {:02x}", b);
                        ls[*l..*l + 3].copy_from_slice(cell.as_bytes());
                    }
                    *l += 3;
                }
            }
            None => {
                self.bin.push(b);
                if list {
                    if let Some(ls) = self.listing.as_mut() {
                        ls.extend_from_slice(format!(" {:02x}", b).as_bytes());
                        self.listdepth += 3;
                    }
                }
            }
        }
    }

    /// Splice raw bytes (BININCLUDE); never listed, never patched.
    pub fn put_raw(&mut self, data: &[u8]) {
        self.bin.extend_from_slice(data);
    }

    /// ` 0x%02x...` marker for a deferred fill; 8 characters either way.
    pub fn ds_marker(&mut self, val: i32) {
        let cell = format!(" 0x{:02x}...", val & 0xff);
        match &mut self.cursor {
            Some((_, l)) => {
                if let Some(ls) = self.listing.as_mut() {
                    ls[*l..*l + 8].copy_from_slice(cell.as_bytes());
                }
                *l += 8;
            }
            None => {
                if let Some(ls) = self.listing.as_mut() {
                    ls.extend_from_slice(cell.as_bytes());
                    self.listdepth += 8;
                }
            }
        }
    }

    /// ` 00...` marker for an immediate zero fill.
    pub fn zero_fill_marker(&mut self) {
        if let Some(ls) = self.listing.as_mut() {
            ls.extend_from_slice(b" 00...");
            self.listdepth += 6;
        }
    }

    /// ` ..` marker in front of a quoted string's bytes.
    pub fn string_marker(&mut self) {
        if let Some(ls) = self.listing.as_mut() {
            ls.extend_from_slice(b" ..");
            self.listdepth += 3;
        }
    }

    /// Each listing record starts with the PC as four hex digits.
    pub fn addr_prefix(&mut self, addr: i32) {
        if let Some(ls) = self.listing.as_mut() {
            ls.extend_from_slice(format!("{:04x}", addr & 0xffff).as_bytes());
        }
        self.listdepth = 4;
    }

    /// Close the record: pad with tabs so short byte runs line up, then the
    /// source text.
    pub fn line_text(&mut self, text: &str) {
        if let Some(ls) = self.listing.as_mut() {
            let tabs = if self.listdepth < 8 {
                3
            } else if self.listdepth < 16 {
                2
            } else {
                1
            };
            for _ in 0..tabs {
                ls.push(b'\t');
            }
            ls.extend_from_slice(text.as_bytes());
            ls.push(b'\n');
        }
    }

    /// Lines thrown away after END still show up, just without an address.
    pub fn skipped_line(&mut self, text: &str) {
        if let Some(ls) = self.listing.as_mut() {
            ls.extend_from_slice(b"\t\t\t");
            ls.extend_from_slice(text.as_bytes());
            ls.push(b'\n');
        }
    }

    pub fn file_start(&mut self, name: &str) {
        if let Some(ls) = self.listing.as_mut() {
            ls.extend_from_slice(format!("# File {}\n", name).as_bytes());
        }
    }

    pub fn file_end(&mut self, name: &str) {
        if let Some(ls) = self.listing.as_mut() {
            ls.extend_from_slice(format!("# End of file {}\n", name).as_bytes());
        }
    }

    pub fn final_addr(&mut self, addr: i32) {
        if let Some(ls) = self.listing.as_mut() {
            ls.extend_from_slice(format!("{:04x}\n", addr & 0xffff).as_bytes());
        }
    }

    pub fn into_streams(self) -> (Vec<u8>, Option<Vec<u8>>) {
        (self.bin, self.listing)
    }
}

/// One `<prefix><name>:\tequ 0x%04xh` line per global label, in the order
/// the labels were first stored.
pub fn render_label_file(symtab: &SymbolTable, prefix: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for name in symtab.global_names() {
        if let Some(def) = symtab.global(name) {
            out.extend_from_slice(
                format!("{}{}:\tequ 0x{:04x}h\n", prefix, name, def.value & 0xffff).as_bytes(),
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_rewrites_in_place() {
        let mut out = Output::new(true);
        out.addr_prefix(0);
        out.put_byte(0xCD, true);
        let (opos, lpos) = out.positions();
        out.put_byte(0, true);
        out.put_byte(0, true);

        out.begin_patch(opos, lpos);
        out.put_byte(0x34, true);
        out.put_byte(0x12, true);
        out.end_patch();

        let (bin, listing) = out.into_streams();
        assert_eq!(bin, vec![0xCD, 0x34, 0x12]);
        assert_eq!(listing.unwrap(), b"0000 cd 34 12".to_vec());
    }

    #[test]
    fn test_listing_tab_padding() {
        let mut out = Output::new(true);
        out.addr_prefix(0);
        out.put_byte(0x00, true);
        out.line_text("nop");
        let (_, listing) = out.into_streams();
        // 4 + 3 characters emitted: three tabs of padding
        assert_eq!(listing.unwrap(), b"0000 00\t\t\tnop\n".to_vec());
    }
}
