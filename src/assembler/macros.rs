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

//! Macro definitions.
//!
//! Body lines are recorded verbatim; parameter occurrences are located once
//! at definition time and remembered as byte spans, so expansion is a plain
//! splice of the call-site arguments.

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[derive(Debug, Clone, Copy)]
pub struct Subst {
    pub pos: usize,
    pub len: usize,
    /// parameter index
    pub which: usize,
}

#[derive(Debug, Clone)]
pub struct MacroLine {
    pub text: String,
    pub substs: Vec<Subst>,
}

#[derive(Debug, Clone)]
pub struct MacroDef {
    pub name: String,
    pub params: Vec<String>,
    pub lines: Vec<MacroLine>,
}

impl MacroDef {
    pub fn new(name: String, params: Vec<String>) -> Self {
        Self {
            name,
            params,
            lines: Vec::new(),
        }
    }

    /// Record one body line, marking every parameter occurrence. A match is
    /// byte-exact and must end on an identifier boundary.
    pub fn record_line(&mut self, text: &str) {
        let bytes = text.as_bytes();
        let mut substs = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            let mut matched = false;
            for (which, param) in self.params.iter().enumerate() {
                let p = param.as_bytes();
                if p.is_empty() || i + p.len() > bytes.len() {
                    continue;
                }
                if &bytes[i..i + p.len()] != p {
                    continue;
                }
                if bytes.get(i + p.len()).is_some_and(|&b| is_ident_char(b)) {
                    continue;
                }
                substs.push(Subst {
                    pos: i,
                    len: p.len(),
                    which,
                });
                i += p.len();
                matched = true;
                break;
            }
            if !matched {
                i += 1;
            }
        }
        self.lines.push(MacroLine {
            text: text.to_string(),
            substs,
        });
    }
}

/// Materialise one body line with the call-site arguments spliced in.
pub fn expand_line(line: &MacroLine, args: &[String]) -> String {
    let mut out = String::with_capacity(line.text.len());
    let mut pos = 0;
    for s in &line.substs {
        out.push_str(&line.text[pos..s.pos]);
        out.push_str(&args[s.which]);
        pos = s.pos + s.len;
    }
    out.push_str(&line.text[pos..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def_with(params: &[&str], line: &str) -> MacroDef {
        let mut def = MacroDef::new(
            "m".to_string(),
            params.iter().map(|p| p.to_string()).collect(),
        );
        def.record_line(line);
        def
    }

    fn expand(def: &MacroDef, args: &[&str]) -> String {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        expand_line(&def.lines[0], &args)
    }

    #[test]
    fn test_substitution() {
        let def = def_with(&["val"], "    ld a, val");
        assert_eq!(expand(&def, &["0x12"]), "    ld a, 0x12");
    }

    #[test]
    fn test_boundary_rule() {
        // "n" must not fire inside "nop"
        let def = def_with(&["n"], "    nop");
        assert!(def.lines[0].substs.is_empty());
        // ...but does fire when a non-identifier character follows
        let def = def_with(&["n"], "    db n, n+1");
        assert_eq!(def.lines[0].substs.len(), 2);
    }

    #[test]
    fn test_multiple_params() {
        let def = def_with(&["dst", "src"], "    ld dst, src");
        assert_eq!(expand(&def, &["b", "c"]), "    ld b, c");
    }

    #[test]
    fn test_empty_argument_splice() {
        let def = def_with(&["x"], "    db 1 x");
        assert_eq!(expand(&def, &[""]), "    db 1 ");
    }
}
