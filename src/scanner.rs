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

//! Cursor over one logical source line.
//!
//! Keywords match case-insensitively under the word-boundary rule: a match
//! counts only if the next input character is not an identifier character,
//! or the keyword's own last character is not one (which lets punctuation-
//! terminated keywords like `(ix` or `(hl)` match mid-token). A `;` outside
//! a quoted string ends the line.

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

pub struct Scanner<'a> {
    text: &'a str,
    pos: usize,
    /// Operand counter. Keyword matches past the second one consume a `,`
    /// first, which is how commas between operands are recognised.
    pub comma: u32,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            comma: 0,
        }
    }

    pub fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    pub fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    pub fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    /// Skip blanks; landing on `;` ends the line.
    pub fn delspc(&mut self) {
        let bytes = self.text.as_bytes();
        while self.pos < bytes.len() && (bytes[self.pos] == b' ' || bytes[self.pos] == b'\t') {
            self.pos += 1;
        }
        if self.pos < bytes.len() && bytes[self.pos] == b';' {
            self.pos = bytes.len();
        }
    }

    /// Skip blanks and report whether anything is left on the line.
    pub fn done(&mut self) -> bool {
        self.delspc();
        self.pos >= self.text.len()
    }

    /// Consume a `,`, or explain what was found instead.
    pub fn rd_comma(&mut self) -> Result<(), String> {
        self.delspc();
        if self.peek() != Some(b',') {
            return Err(format!(
                "`,' expected. Remainder of line: {}.",
                self.rest()
            ));
        }
        self.pos += 1;
        self.delspc();
        Ok(())
    }

    /// Match one of `list` at the cursor, returning its 1-based index or 0.
    /// From the second operand onwards a separating comma is consumed first.
    pub fn indx(&mut self, list: &[&str]) -> Result<usize, String> {
        self.delspc();
        if self.pos >= self.text.len() {
            return Ok(0);
        }
        if self.comma > 1 {
            self.rd_comma()?;
        }
        let rest = self.rest().as_bytes();
        for (i, entry) in list.iter().enumerate() {
            let e = entry.as_bytes();
            if e.is_empty() || rest.len() < e.len() {
                continue;
            }
            if !rest[..e.len()].eq_ignore_ascii_case(e) {
                continue;
            }
            let boundary = rest.get(e.len()).is_none_or(|&b| !is_ident_char(b))
                || !is_ident_char(e[e.len() - 1]);
            if boundary {
                self.pos += e.len();
                self.comma += 1;
                return Ok(i + 1);
            }
        }
        Ok(0)
    }

    /// Read an identifier (optionally `.`-prefixed) at the cursor.
    pub fn read_ident(&mut self) -> Option<&'a str> {
        self.delspc();
        let bytes = self.text.as_bytes();
        let start = self.pos;
        let mut i = self.pos;
        if i < bytes.len() && bytes[i] == b'.' {
            i += 1;
        }
        if i >= bytes.len() || !(bytes[i].is_ascii_alphabetic() || bytes[i] == b'_') {
            return None;
        }
        while i < bytes.len() && is_ident_char(bytes[i]) {
            i += 1;
        }
        self.pos = i;
        Some(&self.text[start..i])
    }

    /// Try to read a leading `name:` label. Returns `None` when the line
    /// does not start with one.
    pub fn read_label(&mut self) -> Option<Result<String, String>> {
        let rest = self.rest().as_bytes();
        let mut colon = None;
        for (i, &b) in rest.iter().enumerate() {
            match b {
                b':' => {
                    colon = Some(i);
                    break;
                }
                b' ' | b'\t' | b';' => break,
                _ => {}
            }
        }
        let colon = colon?;
        if colon == 0 {
            self.pos += 1;
            return Some(Err("Error: `:' found without a label.".to_string()));
        }
        let name = self.rest()[..colon].to_string();
        self.pos += colon + 1;
        Some(Ok(name))
    }

    /// Read a quoted file name for INCLUDE/BININCLUDE.
    pub fn read_quoted_name(&mut self) -> Result<String, String> {
        self.delspc();
        let bytes = self.text.as_bytes();
        if self.pos >= bytes.len() {
            return Err("include without filename".to_string());
        }
        let quote = bytes[self.pos];
        if quote != b'"' && quote != b'\'' {
            return Err("include filename must be quoted".to_string());
        }
        self.pos += 1;
        let start = self.pos;
        while self.pos < bytes.len() && bytes[self.pos] != quote {
            self.pos += 1;
        }
        if self.pos >= bytes.len() {
            return Err(format!(
                "filename without closing quote ({})",
                quote as char
            ));
        }
        let name = self.text[start..self.pos].to_string();
        self.pos += 1;
        Ok(name)
    }

    /// Read macro arguments: tokens separated by blanks or a single comma.
    /// Consecutive commas yield empty arguments, which only call sites
    /// (`allow_empty`) accept.
    pub fn read_macro_args(&mut self, allow_empty: bool) -> Result<Vec<String>, String> {
        let mut args = Vec::new();
        if self.done() {
            return Ok(args);
        }
        loop {
            self.delspc();
            let bytes = self.text.as_bytes();
            let start = self.pos;
            while self.pos < bytes.len()
                && !matches!(bytes[self.pos], b' ' | b'\t' | b',' | b';')
            {
                self.pos += 1;
            }
            let token = &self.text[start..self.pos];
            if token.is_empty() && !allow_empty {
                return Err("Empty macro argument.".to_string());
            }
            args.push(token.to_string());
            self.delspc();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                }
                Some(_) => {}
                None => break,
            }
        }
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_case_insensitive() {
        for text in ["ld a, 1", "LD a, 1", "Ld a, 1"] {
            let mut cur = Scanner::new(text);
            assert_eq!(cur.indx(&["jp", "ld"]), Ok(2), "for {:?}", text);
        }
    }

    #[test]
    fn test_keyword_word_boundary() {
        // "ld" must not match inside "ldd"
        let mut cur = Scanner::new("ldd");
        assert_eq!(cur.indx(&["ld"]), Ok(0));
        // ...nor before an underscore
        let mut cur = Scanner::new("ld_x");
        assert_eq!(cur.indx(&["ld"]), Ok(0));
        // punctuation-terminated keywords match mid-token
        let mut cur = Scanner::new("(ix+5)");
        assert_eq!(cur.indx(&["(ix"]), Ok(1));
        assert_eq!(cur.rest(), "+5)");
        let mut cur = Scanner::new("(hl),a");
        assert_eq!(cur.indx(&["(hl)"]), Ok(1));
    }

    #[test]
    fn test_comma_between_operands() {
        let mut cur = Scanner::new("a, b");
        cur.comma = 1;
        assert_eq!(cur.indx(&["a"]), Ok(1));
        // second operand needs the comma consumed first
        assert_eq!(cur.indx(&["a", "b"]), Ok(2));
        // a third operand without a comma is refused
        let mut cur = Scanner::new("a, b c");
        cur.comma = 1;
        cur.indx(&["a"]).unwrap();
        cur.indx(&["a", "b"]).unwrap();
        assert!(cur.indx(&["c"]).is_err());
    }

    #[test]
    fn test_comment_ends_line() {
        let mut cur = Scanner::new("   ; just a comment");
        assert!(cur.done());
        let mut cur = Scanner::new("nop ; trailing");
        assert_eq!(cur.indx(&["nop"]), Ok(1));
        assert!(cur.done());
    }

    #[test]
    fn test_read_label() {
        let mut cur = Scanner::new("start: nop");
        assert_eq!(cur.read_label(), Some(Ok("start".to_string())));
        assert_eq!(cur.rest(), " nop");

        let mut cur = Scanner::new("nop");
        assert_eq!(cur.read_label(), None);

        // colon after the first blank is not a label
        let mut cur = Scanner::new("db 'a:'");
        assert_eq!(cur.read_label(), None);
    }

    #[test]
    fn test_read_quoted_name() {
        let mut cur = Scanner::new("  \"lib/defs.inc\" ");
        assert_eq!(cur.read_quoted_name(), Ok("lib/defs.inc".to_string()));
        let mut cur = Scanner::new("'x.bin'");
        assert_eq!(cur.read_quoted_name(), Ok("x.bin".to_string()));
        let mut cur = Scanner::new("\"open");
        assert!(cur.read_quoted_name().is_err());
    }

    #[test]
    fn test_macro_args() {
        let mut cur = Scanner::new("1, two  three");
        assert_eq!(
            cur.read_macro_args(true),
            Ok(vec!["1".to_string(), "two".to_string(), "three".to_string()])
        );
        // empty argument between commas, allowed at call sites only
        let mut cur = Scanner::new("a,,b");
        assert_eq!(
            cur.read_macro_args(true),
            Ok(vec!["a".to_string(), String::new(), "b".to_string()])
        );
        let mut cur = Scanner::new("a,,b");
        assert!(cur.read_macro_args(false).is_err());
        // no arguments at all
        let mut cur = Scanner::new("   ; none");
        assert_eq!(cur.read_macro_args(true), Ok(vec![]));
    }
}
