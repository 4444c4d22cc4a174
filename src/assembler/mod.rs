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

//! The assembly driver.
//!
//! One pass over a stack of source frames (files and macro expansions).
//! Each line may define a label, then dispatches on its first keyword:
//! either an instruction is encoded, emitting bytes and (for operands that
//! cannot be computed yet) placeholder references, or a directive runs.
//! When every frame has drained, the reference queue is resolved and the
//! placeholders are patched in both staged streams.

pub mod directives;
pub mod encoder;
pub mod eval;
pub mod macros;
pub mod output;
pub mod references;
pub mod symbol_table;

use crate::errors::AssemblyError;
use crate::file_reader::FileReader;
use crate::logging;
use crate::scanner::Scanner;
use encoder::{Mnemonic, Scratch};
use eval::{EvalCtx, eval_expr, lookup_label};
use macros::MacroDef;
use output::{Output, render_label_file};
use references::{CapturedExpr, RefKind, Reference};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use symbol_table::{LabelDef, SymbolTable};

/// bound on the frame stack (includes and macro calls)
pub const MAX_INCLUDE: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct SourceLoc {
    pub file: Rc<str>,
    pub line: u32,
}

/// Prints and counts diagnostics; assembly always continues with the next
/// line, so the count decides the exit status at the very end.
pub struct Diagnostics {
    pub errors: u32,
    pub verbose: u8,
}

impl Diagnostics {
    pub fn new(verbose: u8) -> Self {
        Self { errors: 0, verbose }
    }

    pub fn report(&mut self, err: &AssemblyError) {
        logging::error(&err.to_string());
        self.errors += 1;
    }

    pub fn parse(&mut self, loc: &SourceLoc, reason: &str) {
        self.report(&AssemblyError::ParseError {
            file: loc.file.to_string(),
            line: loc.line,
            reason: reason.to_string(),
        });
    }

    pub fn semantic(&mut self, loc: &SourceLoc, reason: &str) {
        self.report(&AssemblyError::SemanticError {
            file: loc.file.to_string(),
            line: loc.line,
            reason: reason.to_string(),
        });
    }

    pub fn resource(&mut self, loc: &SourceLoc, reason: &str) {
        self.report(&AssemblyError::ResourceError {
            file: loc.file.to_string(),
            line: loc.line,
            reason: reason.to_string(),
        });
    }

    pub fn warning(&self, loc: &SourceLoc, msg: &str) {
        logging::warning_at(&loc.file, loc.line, msg);
    }

    pub fn chat(&self, level: u8, msg: &str) {
        if self.verbose >= level {
            eprintln!("{}", msg);
        }
    }
}

pub struct Options {
    pub verbose: u8,
    pub listing: bool,
    pub label_file: bool,
    pub label_prefix: String,
    /// searched after the current directory, most recently added first
    pub include_dirs: Vec<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            verbose: 0,
            listing: false,
            label_file: false,
            label_prefix: String::new(),
            include_dirs: Vec::new(),
        }
    }
}

pub struct AssemblyOutput {
    pub binary: Vec<u8>,
    pub listing: Option<Vec<u8>>,
    pub labels: Option<Vec<u8>>,
    pub errors: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct LabelSlot {
    pub scoped: bool,
    pub name: String,
}

enum FrameKind {
    File { lines: Vec<String>, cursor: usize },
    Macro { index: usize, cursor: usize, args: Vec<String> },
}

struct Frame {
    name: Rc<str>,
    line: u32,
    ended: bool,
    kind: FrameKind,
}

pub struct Assembler<'a, R: FileReader> {
    reader: &'a R,
    opts: &'a Options,
    pub diag: Diagnostics,
    pub(crate) symtab: SymbolTable,
    pub(crate) refs: Vec<Reference>,
    pub(crate) macros: Vec<MacroDef>,
    frames: Vec<Frame>,
    pub(crate) out: Output,
    /// emission PC, wrapped to 16 bits per byte
    pub(crate) addr: i32,
    /// PC at the start of the current line; the value of `$`
    pub(crate) baseaddr: i32,
    pub(crate) scratch: Scratch,
    pub(crate) cur_loc: SourceLoc,
    pub(crate) last_label: Option<LabelSlot>,
    pub(crate) defining_macro: bool,
    pub(crate) macro_discard: bool,
    pub(crate) current_macro: Option<MacroDef>,
    pub(crate) ifcount: u32,
    pub(crate) noifcount: u32,
}

impl<'a, R: FileReader> Assembler<'a, R> {
    pub fn new(reader: &'a R, opts: &'a Options) -> Self {
        Self {
            reader,
            opts,
            diag: Diagnostics::new(opts.verbose),
            symtab: SymbolTable::default(),
            refs: Vec::new(),
            macros: Vec::new(),
            frames: Vec::new(),
            out: Output::new(opts.listing),
            addr: 0,
            baseaddr: 0,
            scratch: Scratch::default(),
            cur_loc: SourceLoc {
                file: Rc::from(""),
                line: 0,
            },
            last_label: None,
            defining_macro: false,
            macro_discard: false,
            current_macro: None,
            ifcount: 0,
            noifcount: 0,
        }
    }

    /// Assemble every input file into the shared image, then resolve.
    pub fn run(&mut self, inputs: &[PathBuf]) {
        for path in inputs {
            let name = path.display().to_string();
            self.diag.chat(3, &format!("queued inputfile {}", name));
            match self.reader.read_to_string(path) {
                Ok(text) => {
                    self.push_file_frame(&name, &text);
                    self.out.file_start(&name);
                    self.drive();
                }
                Err(_) => {
                    self.cur_loc = SourceLoc {
                        file: Rc::from(name.as_str()),
                        line: 0,
                    };
                    self.resource_here(&format!("Error: unable to open {}. skipping", name));
                }
            }
        }
        if self.ifcount + self.noifcount > 0 {
            self.semantic_here(&format!(
                "Reached EOF at IF level {}",
                self.ifcount + self.noifcount
            ));
        }
        self.out.final_addr(self.addr);
        self.resolve_references();
        self.finalize_labels();
    }

    pub fn finish(self) -> AssemblyOutput {
        let labels = if self.opts.label_file {
            Some(render_label_file(&self.symtab, &self.opts.label_prefix))
        } else {
            None
        };
        let (binary, listing) = self.out.into_streams();
        AssemblyOutput {
            binary,
            listing,
            labels,
            errors: self.diag.errors,
        }
    }

    pub(crate) fn sp(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    pub(crate) fn error_here(&mut self, msg: &str) {
        self.diag.parse(&self.cur_loc, msg);
    }

    pub(crate) fn semantic_here(&mut self, msg: &str) {
        self.diag.semantic(&self.cur_loc, msg);
    }

    pub(crate) fn resource_here(&mut self, msg: &str) {
        self.diag.resource(&self.cur_loc, msg);
    }

    pub(crate) fn push_file_frame(&mut self, name: &str, text: &str) {
        let lines: Vec<String> = text.lines().map(|l| l.replace('\r', " ")).collect();
        self.frames.push(Frame {
            name: Rc::from(name),
            line: 0,
            ended: false,
            kind: FrameKind::File { lines, cursor: 0 },
        });
        self.symtab.push_scope();
    }

    /// Try the name as given, then the include path, most recent first.
    pub(crate) fn resolve_text(&self, name: &str) -> Option<String> {
        if let Ok(text) = self.reader.read_to_string(Path::new(name)) {
            return Some(text);
        }
        for dir in self.opts.include_dirs.iter().rev() {
            if let Ok(text) = self.reader.read_to_string(&dir.join(name)) {
                return Some(text);
            }
        }
        None
    }

    pub(crate) fn resolve_binary(&self, name: &str) -> Option<Vec<u8>> {
        if let Ok(data) = self.reader.read_binary(Path::new(name)) {
            return Some(data);
        }
        for dir in self.opts.include_dirs.iter().rev() {
            if let Ok(data) = self.reader.read_binary(&dir.join(name)) {
                return Some(data);
            }
        }
        None
    }

    fn drive(&mut self) {
        while !self.frames.is_empty() {
            match self.next_line() {
                Some(line) => {
                    self.out.addr_prefix(self.addr);
                    self.process_line(&line);
                    self.out.line_text(&line);
                    if self.frames.last().is_some_and(|f| f.ended) {
                        self.drain_ended_frame();
                        self.pop_frame();
                    }
                }
                None => self.pop_frame(),
            }
        }
    }

    fn next_line(&mut self) -> Option<String> {
        let frame = self.frames.last_mut()?;
        let line = match &mut frame.kind {
            FrameKind::File { lines, cursor } => {
                if *cursor >= lines.len() {
                    return None;
                }
                let line = lines[*cursor].clone();
                *cursor += 1;
                line
            }
            FrameKind::Macro { index, cursor, args } => {
                let def = &self.macros[*index];
                if *cursor >= def.lines.len() {
                    return None;
                }
                let line = macros::expand_line(&def.lines[*cursor], args);
                *cursor += 1;
                line
            }
        };
        frame.line += 1;
        self.cur_loc = SourceLoc {
            file: frame.name.clone(),
            line: frame.line,
        };
        Some(line)
    }

    /// List the lines END threw away, without processing them.
    fn drain_ended_frame(&mut self) {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return;
            };
            let line = match &mut frame.kind {
                FrameKind::File { lines, cursor } => {
                    if *cursor >= lines.len() {
                        return;
                    }
                    let line = lines[*cursor].clone();
                    *cursor += 1;
                    line
                }
                FrameKind::Macro { index, cursor, args } => {
                    let def = &self.macros[*index];
                    if *cursor >= def.lines.len() {
                        return;
                    }
                    let line = macros::expand_line(&def.lines[*cursor], args);
                    *cursor += 1;
                    line
                }
            };
            self.out.skipped_line(&line);
        }
    }

    /// A frame is done: run the pending references once more while its
    /// scope-local labels still exist, lower capture levels pinned to this
    /// depth, then drop the scope and the frame.
    fn pop_frame(&mut self) {
        let sp = self.sp();
        let mut refs = std::mem::take(&mut self.refs);
        for r in refs.iter_mut() {
            if !r.done {
                let mut valid = true;
                let ctx = EvalCtx {
                    baseaddr: r.baseaddr,
                    level: r.level,
                    report: false,
                    loc: r.loc.clone(),
                };
                let value = eval_expr(&r.expr, &ctx, &mut self.symtab, &mut self.diag, &mut valid);
                if valid {
                    r.done = true;
                    r.value = value;
                }
            }
            if r.level == sp {
                r.level = r.level.saturating_sub(1);
            }
        }
        self.refs = refs;

        // last chance for this frame's own deferred EQUs
        for name in self.symtab.scope_label_names() {
            let _ = lookup_label(&mut self.symtab, &mut self.diag, &name, sp);
        }
        self.symtab.pop_scope();

        let frame = self.frames.pop().expect("a frame to pop");
        if matches!(frame.kind, FrameKind::File { .. }) {
            self.out.file_end(&frame.name);
            self.diag
                .chat(2, &format!("finished reading file {}", frame.name));
        }
    }

    fn process_line(&mut self, text: &str) {
        self.baseaddr = self.addr;
        self.last_label = None;
        let mut cur = Scanner::new(text);
        if cur.done() {
            return;
        }
        if self.noifcount == 0 && !self.defining_macro {
            if let Some(result) = cur.read_label() {
                match result {
                    Ok(name) => self.define_line_label(&name),
                    Err(msg) => self.error_here(&msg),
                }
            }
        }
        if cur.done() {
            return;
        }
        self.scratch = Scratch::default();
        let cmd = self.read_command(&mut cur);

        // inside a false IF branch only the three structure keywords count
        if self.noifcount > 0 {
            match cmd {
                Some(Mnemonic::If) => self.noifcount += 1,
                Some(Mnemonic::Else) => {
                    if self.noifcount == 1 {
                        self.noifcount = 0;
                        self.ifcount += 1;
                    }
                }
                Some(Mnemonic::EndIf) => self.noifcount -= 1,
                _ => {}
            }
            return;
        }

        if self.defining_macro {
            match cmd {
                Some(Mnemonic::EndM) => {
                    self.defining_macro = false;
                    if let Some(def) = self.current_macro.take() {
                        if !self.macro_discard {
                            self.macros.push(def);
                        }
                    }
                }
                Some(Mnemonic::MacroDef) => self.semantic_here("Nested macro definition."),
                _ => {
                    if let Some(def) = self.current_macro.as_mut() {
                        def.record_line(text);
                    }
                }
            }
            return;
        }

        match cmd {
            Some(cmd) => self.dispatch(cmd, &mut cur),
            None => self.try_macro_call(&mut cur),
        }
    }

    fn define_line_label(&mut self, name: &str) {
        if self.symtab.exists(name, self.sp()) {
            self.semantic_here(&format!("Duplicate definition of label {}.", name));
            return;
        }
        self.symtab.define(name, LabelDef::at_address(self.addr));
        self.diag.chat(
            1,
            &format!(
                "{:5} (0x{:04x}): Label found: {}",
                self.cur_loc.line,
                self.addr & 0xffff,
                name
            ),
        );
        self.last_label = Some(LabelSlot {
            scoped: name.starts_with('.'),
            name: name.to_string(),
        });
    }

    /// A bareword that is no mnemonic must be a macro call.
    fn try_macro_call(&mut self, cur: &mut Scanner) {
        cur.delspc();
        let remainder = cur.rest().trim_end().to_string();
        let Some(name) = cur.read_ident().map(|n| n.to_string()) else {
            self.error_here(&format!(
                "Syntax error: command or comment expected (was {}).",
                remainder
            ));
            return;
        };
        let Some(index) = self.macros.iter().position(|m| m.name == name) else {
            self.error_here(&format!(
                "Syntax error: command or comment expected (was {}).",
                remainder
            ));
            return;
        };
        if self.frames.len() >= MAX_INCLUDE {
            self.resource_here("stack overflow (circular include?)");
            return;
        }
        let args = match cur.read_macro_args(true) {
            Ok(args) => args,
            Err(msg) => {
                self.error_here(&msg);
                return;
            }
        };
        let expected = self.macros[index].params.len();
        if args.len() != expected {
            self.semantic_here(&format!(
                "Invalid number of arguments for macro (is {}, must be {}).",
                args.len(),
                expected
            ));
            return;
        }
        let name: Rc<str> = Rc::from(self.macros[index].name.as_str());
        self.frames.push(Frame {
            name,
            line: 0,
            ended: false,
            kind: FrameKind::Macro {
                index,
                cursor: 0,
                args,
            },
        });
        self.symtab.push_scope();
    }

    pub(crate) fn write_one_byte(&mut self, b: i32, list: bool) {
        self.out.put_byte((b & 0xff) as u8, list);
        if !self.out.patching() {
            self.addr = (self.addr + 1) & 0xffff;
        }
    }

    /// Evaluate a captured operand. If it resolves now its bytes go out
    /// immediately; otherwise a placeholder is written and the expression
    /// joins the patch queue.
    pub(crate) fn new_reference(&mut self, cap: CapturedExpr, kind: RefKind, count: i32) {
        let loc = self.cur_loc.clone();
        let mut valid = true;
        let ctx = EvalCtx {
            baseaddr: self.baseaddr,
            level: self.sp(),
            report: false,
            loc: loc.clone(),
        };
        let value = eval_expr(&cap.expr, &ctx, &mut self.symtab, &mut self.diag, &mut valid);
        if valid {
            self.wrt_ref(value, kind, count, &loc);
            return;
        }
        self.diag.chat(
            1,
            &format!(
                "{:5} (0x{:04x}): reference set to {}",
                loc.line,
                self.addr & 0xffff,
                cap.text
            ),
        );
        let (opos, lpos) = self.out.positions();
        self.refs.push(Reference {
            kind,
            opos,
            lpos,
            expr: cap.expr,
            text: cap.text,
            baseaddr: self.baseaddr,
            loc: loc.clone(),
            count,
            level: self.sp(),
            done: false,
            value: 0,
        });
        // the placeholder must not trip the range checks
        let dummy = if kind == RefKind::RelByte { count } else { 0 };
        self.wrt_ref(dummy, kind, count, &loc);
    }

    /// Kind-specific byte production, shared between immediate emission and
    /// patching (the output cursor decides which).
    pub(crate) fn wrt_ref(&mut self, val: i32, kind: RefKind, count: i32, loc: &SourceLoc) {
        match kind {
            RefKind::Rst => {
                if val & 0x38 != val {
                    self.diag.semantic(
                        loc,
                        &format!("Error: incorrect RST value {} (0x{:02x}).", val, val),
                    );
                    return;
                }
                self.write_one_byte(val + 0xC7, true);
            }
            RefKind::AbsWord => {
                self.write_one_byte(val & 0xff, true);
                self.write_one_byte((val >> 8) & 0xff, true);
            }
            RefKind::AbsByte => {
                self.write_one_byte(val & 0xff, true);
            }
            RefKind::Ds => {
                self.out.ds_marker(val);
                for _ in 0..count {
                    self.write_one_byte(val & 0xff, false);
                }
            }
            RefKind::Bsr => {
                if val & !7 != 0 {
                    self.diag
                        .semantic(loc, &format!("Error: incorrect BIT/SET/RES value {}.", val));
                    return;
                }
                self.write_one_byte(0x08 * val + count, true);
            }
            RefKind::RelByte => {
                let rel = val - count;
                if !(-128..=127).contains(&rel) {
                    self.diag
                        .warning(loc, &format!("Relative jump out of range ({}).", rel));
                }
                self.write_one_byte(rel & 0xff, true);
            }
        }
    }

    pub(crate) fn eval_now(&mut self, cap: &CapturedExpr, report: bool) -> (i32, bool) {
        let mut valid = true;
        let ctx = EvalCtx {
            baseaddr: self.baseaddr,
            level: self.sp(),
            report,
            loc: self.cur_loc.clone(),
        };
        let value = eval_expr(&cap.expr, &ctx, &mut self.symtab, &mut self.diag, &mut valid);
        (value, valid)
    }

    /// The deferred pass: every queued reference is evaluated (errors now
    /// are final) and its placeholder patched in both streams.
    fn resolve_references(&mut self) {
        let refs = std::mem::take(&mut self.refs);
        for r in refs {
            let value = if r.done {
                r.value
            } else {
                let mut valid = true;
                let ctx = EvalCtx {
                    baseaddr: r.baseaddr,
                    level: r.level,
                    report: true,
                    loc: r.loc.clone(),
                };
                eval_expr(&r.expr, &ctx, &mut self.symtab, &mut self.diag, &mut valid)
            };
            self.out.begin_patch(r.opos, r.lpos);
            self.wrt_ref(value, r.kind, r.count, &r.loc);
            self.out.end_patch();
        }
    }

    /// Force the remaining deferred EQUs; anything still unresolvable is an
    /// error (this is where a definition cycle surfaces).
    fn finalize_labels(&mut self) {
        let names: Vec<String> = self.symtab.global_names().to_vec();
        for name in names {
            if let Some(p) = self.symtab.take_pending_if_undone(&name) {
                let mut valid = true;
                let ctx = EvalCtx {
                    baseaddr: p.baseaddr,
                    level: p.level,
                    report: true,
                    loc: p.loc.clone(),
                };
                let value = eval_expr(&p.expr, &ctx, &mut self.symtab, &mut self.diag, &mut valid);
                self.symtab.store_computed(&name, value, valid);
            }
        }
    }
}
