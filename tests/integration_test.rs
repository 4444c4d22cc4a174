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

use std::path::PathBuf;
use z80asm::assemble;
use z80asm::assembler::{AssemblyOutput, Options};
use z80asm::file_reader::{AsmFileReader, MockFileReader};

fn asm_with(reader: &MockFileReader, opts: &Options) -> AssemblyOutput {
    assemble(&[PathBuf::from("test.asm")], opts, reader).unwrap()
}

fn asm_full(source: &str) -> AssemblyOutput {
    let mut reader = MockFileReader::default();
    reader.add_file("test.asm", source);
    asm_with(&reader, &Options::default())
}

/// Assemble a source that is expected to be error free.
fn asm(source: &str) -> Vec<u8> {
    let result = asm_full(source);
    assert_eq!(result.errors, 0, "unexpected errors for {:?}", source);
    result.binary
}

fn asm_errors(source: &str) -> u32 {
    asm_full(source).errors
}

#[test]
fn test_nop_run() {
    assert_eq!(asm("nop\nnop\nnop\n"), vec![0x00, 0x00, 0x00]);
}

#[test]
fn test_defb_bytes_and_strings() {
    assert_eq!(
        asm("db 0x12, 0x34, \"AB\", 0x56\n"),
        vec![0x12, 0x34, 0x41, 0x42, 0x56]
    );
}

#[test]
fn test_defb_string_escapes() {
    assert_eq!(asm("defm \"a\\n\\101\"\n"), vec![0x61, 10, 0x41]);
    assert_eq!(asm("db 'A'\n"), vec![0x41]);
}

#[test]
fn test_backward_relative_jump() {
    // org 0x8000; start: ld a,0; jr start
    let bytes = asm("org 0x8000\nstart: ld a, 0\njr start\n");
    assert_eq!(bytes, vec![0x3E, 0x00, 0x18, 0xFC]);
}

#[test]
fn test_ld_indexed_immediate() {
    assert_eq!(asm("ld (ix+5), 0xAA\n"), vec![0xDD, 0x36, 0x05, 0xAA]);
}

#[test]
fn test_bit_indexed_negative_displacement() {
    assert_eq!(asm("bit 7, (iy-1)\n"), vec![0xFD, 0xCB, 0xFF, 0x7E]);
}

#[test]
fn test_forward_reference() {
    // the jp target is patched after the whole input is read
    let bytes = asm("jp later\nnop\nlater: halt\n");
    assert_eq!(bytes, vec![0xC3, 0x04, 0x00, 0x00, 0x76]);
}

#[test]
fn test_forward_scope_local_reference() {
    assert_eq!(asm("jr .fwd\n.fwd: nop\n"), vec![0x18, 0x00, 0x00]);
}

#[test]
fn test_equ_forward_chain() {
    let bytes = asm("first: equ second + 1\nsecond: equ 5\ndb first, second\n");
    assert_eq!(bytes, vec![6, 5]);
}

#[test]
fn test_equ_cycle_is_an_error() {
    assert!(asm_errors("one: equ two\ntwo: equ one\n") > 0);
}

#[test]
fn test_defs_fill() {
    assert_eq!(asm("ds 256, 0xFF\n"), vec![0xFF; 256]);
    assert_eq!(asm("defs 4\n"), vec![0x00; 4]);
}

#[test]
fn test_defs_negative_count_rejected() {
    assert!(asm_errors("ds -1\n") > 0);
}

#[test]
fn test_rst() {
    assert_eq!(asm("rst 0x18\nrst 0\n"), vec![0xDF, 0xC7]);
    assert!(asm_errors("rst 0x40\n") > 0);
}

#[test]
fn test_defw_expressions() {
    assert_eq!(
        asm("dw 1+2*3, (1+2)*3, 1 ? 10 : 20, 0 ? 10 : 20\n"),
        vec![7, 0, 9, 0, 10, 0, 20, 0]
    );
}

#[test]
fn test_number_bases_agree() {
    assert_eq!(asm("db 16, 0x10, 10h, %10000, 20o, 10000b\n"), vec![16; 6]);
}

#[test]
fn test_dollar_is_line_start_pc() {
    assert_eq!(asm("org 0x8000\ndw $\n"), vec![0x00, 0x80]);
    // $ followed by hex digits is a literal instead
    assert_eq!(asm("dw $8000\n"), vec![0x00, 0x80]);
}

#[test]
fn test_defined_check() {
    let bytes = asm("flag: equ 1\ndb ?flag, ?nothing\n");
    assert_eq!(bytes, vec![1, 0]);
}

#[test]
fn test_keywords_are_case_insensitive() {
    let lower = asm("nop\nld a, 1\nret\ndjnz $\n");
    let upper = asm("NOP\nLD A, 1\nRET\nDJNZ $\n");
    let mixed = asm("Nop\nLd a, 1\nReT\nDjNz $\n");
    assert_eq!(lower, upper);
    assert_eq!(lower, mixed);
}

#[test]
fn test_labels_are_case_sensitive() {
    assert!(asm_errors("db Value\nvalue: equ 3\n") > 0);
}

#[test]
fn test_ld_matrix_samples() {
    assert_eq!(asm("ld b, c\n"), vec![0x41]);
    assert_eq!(asm("ld (hl), a\n"), vec![0x77]);
    assert_eq!(asm("ld a, (bc)\n"), vec![0x0A]);
    assert_eq!(asm("ld a, (de)\n"), vec![0x1A]);
    assert_eq!(asm("ld (bc), a\n"), vec![0x02]);
    assert_eq!(asm("ld hl, 0x1234\n"), vec![0x21, 0x34, 0x12]);
    assert_eq!(asm("ld hl, (0x1234)\n"), vec![0x2A, 0x34, 0x12]);
    assert_eq!(asm("ld (0x1234), hl\n"), vec![0x22, 0x34, 0x12]);
    assert_eq!(asm("ld (0x1234), a\n"), vec![0x32, 0x34, 0x12]);
    assert_eq!(asm("ld bc, (0x1234)\n"), vec![0xED, 0x4B, 0x34, 0x12]);
    assert_eq!(asm("ld (0x1234), sp\n"), vec![0xED, 0x73, 0x34, 0x12]);
    assert_eq!(asm("ld sp, hl\n"), vec![0xF9]);
    assert_eq!(asm("ld sp, ix\n"), vec![0xDD, 0xF9]);
    assert_eq!(asm("ld a, i\n"), vec![0xED, 0x57]);
    assert_eq!(asm("ld r, a\n"), vec![0xED, 0x4F]);
    assert_eq!(asm("ld ixh, 5\n"), vec![0xDD, 0x26, 0x05]);
    assert_eq!(asm("ld ixl, a\n"), vec![0xDD, 0x6F]);
    assert_eq!(asm("ld a, (ix+3)\n"), vec![0xDD, 0x7E, 0x03]);
    assert_eq!(asm("ld (iy+2), b\n"), vec![0xFD, 0x70, 0x02]);
}

#[test]
fn test_arithmetic_samples() {
    assert_eq!(asm("add a, b\n"), vec![0x80]);
    assert_eq!(asm("add a, 0x12\n"), vec![0xC6, 0x12]);
    assert_eq!(asm("add a, (ix+2)\n"), vec![0xDD, 0x86, 0x02]);
    assert_eq!(asm("add hl, bc\n"), vec![0x09]);
    assert_eq!(asm("add ix, de\n"), vec![0xDD, 0x19]);
    assert_eq!(asm("adc a, c\n"), vec![0x89]);
    assert_eq!(asm("adc hl, sp\n"), vec![0xED, 0x7A]);
    assert_eq!(asm("sbc hl, bc\n"), vec![0xED, 0x42]);
    assert_eq!(asm("sub 5\n"), vec![0xD6, 0x05]);
    assert_eq!(asm("xor a\n"), vec![0xAF]);
    assert_eq!(asm("or (hl)\n"), vec![0xB6]);
    assert_eq!(asm("cp '0'\n"), vec![0xFE, 0x30]);
    assert_eq!(asm("inc b\n"), vec![0x04]);
    assert_eq!(asm("inc sp\n"), vec![0x33]);
    assert_eq!(asm("inc (iy-3)\n"), vec![0xFD, 0x34, 0xFD]);
    assert_eq!(asm("dec a\n"), vec![0x3D]);
    assert_eq!(asm("dec ix\n"), vec![0xDD, 0x2B]);
    assert_eq!(asm("neg\n"), vec![0xED, 0x44]);
}

#[test]
fn test_bit_set_res() {
    assert_eq!(asm("bit 0, a\n"), vec![0xCB, 0x47]);
    assert_eq!(asm("set 3, b\n"), vec![0xCB, 0xD8]);
    assert_eq!(asm("res 7, (hl)\n"), vec![0xCB, 0xBE]);
    // the bit index may be an expression
    assert_eq!(asm("seven: equ 7\nbit seven, a\n"), vec![0xCB, 0x7F]);
    assert!(asm_errors("bit 8, a\n") > 0);
}

#[test]
fn test_cb_rotates() {
    assert_eq!(asm("rlc b\n"), vec![0xCB, 0x00]);
    assert_eq!(asm("rl (hl)\n"), vec![0xCB, 0x16]);
    assert_eq!(asm("rrc c\n"), vec![0xCB, 0x09]);
    assert_eq!(asm("rr d\n"), vec![0xCB, 0x1A]);
    assert_eq!(asm("sla e\n"), vec![0xCB, 0x23]);
    assert_eq!(asm("sra h\n"), vec![0xCB, 0x2C]);
    assert_eq!(asm("sll l\n"), vec![0xCB, 0x35]);
    assert_eq!(asm("srl a\n"), vec![0xCB, 0x3F]);
    assert_eq!(asm("sla (ix+1)\n"), vec![0xDD, 0xCB, 0x01, 0x26]);
}

#[test]
fn test_control_flow() {
    assert_eq!(asm("call 0x1234\n"), vec![0xCD, 0x34, 0x12]);
    assert_eq!(asm("call nz, 0x1234\n"), vec![0xC4, 0x34, 0x12]);
    assert_eq!(asm("ret\n"), vec![0xC9]);
    assert_eq!(asm("ret z\n"), vec![0xC8]);
    assert_eq!(asm("jp 0x1234\n"), vec![0xC3, 0x34, 0x12]);
    assert_eq!(asm("jp c, 5\n"), vec![0xDA, 0x05, 0x00]);
    assert_eq!(asm("jp (hl)\n"), vec![0xE9]);
    assert_eq!(asm("jp (ix)\n"), vec![0xDD, 0xE9]);
    assert_eq!(asm("jr nc, $\n"), vec![0x30, 0xFE]);
    assert_eq!(asm("djnz $\n"), vec![0x10, 0xFE]);
    assert_eq!(asm("reti\n"), vec![0xED, 0x4D]);
    assert_eq!(asm("retn\n"), vec![0xED, 0x45]);
}

#[test]
fn test_relative_jump_overflow_is_a_warning() {
    // out of range: the truncated byte is still written and no error counted
    let result = asm_full("jr 0x200\n");
    assert_eq!(result.errors, 0);
    assert_eq!(result.binary, vec![0x18, 0xFE]);
}

#[test]
fn test_stack_ops() {
    assert_eq!(asm("push bc\n"), vec![0xC5]);
    assert_eq!(asm("push af\n"), vec![0xF5]);
    assert_eq!(asm("pop hl\n"), vec![0xE1]);
    assert_eq!(asm("pop ix\n"), vec![0xDD, 0xE1]);
    assert_eq!(asm("push iy\n"), vec![0xFD, 0xE5]);
}

#[test]
fn test_ex_family() {
    assert_eq!(asm("ex de, hl\n"), vec![0xEB]);
    assert_eq!(asm("ex af, af'\n"), vec![0x08]);
    assert_eq!(asm("ex (sp), hl\n"), vec![0xE3]);
    assert_eq!(asm("ex (sp), iy\n"), vec![0xFD, 0xE3]);
    assert_eq!(asm("exx\n"), vec![0xD9]);
}

#[test]
fn test_in_out() {
    assert_eq!(asm("in a, (0x12)\n"), vec![0xDB, 0x12]);
    assert_eq!(asm("in b, (c)\n"), vec![0xED, 0x40]);
    assert_eq!(asm("in f, (c)\n"), vec![0xED, 0x70]);
    assert_eq!(asm("out (0x12), a\n"), vec![0xD3, 0x12]);
    assert_eq!(asm("out (c), e\n"), vec![0xED, 0x59]);
    assert_eq!(asm("out (c), 0\n"), vec![0xED, 0x71]);
}

#[test]
fn test_block_ops_and_im() {
    assert_eq!(asm("ldi\nldir\nldd\nlddr\n"), vec![
        0xED, 0xA0, 0xED, 0xB0, 0xED, 0xA8, 0xED, 0xB8
    ]);
    assert_eq!(asm("cpi\ncpir\ncpd\ncpdr\n"), vec![
        0xED, 0xA1, 0xED, 0xB1, 0xED, 0xA9, 0xED, 0xB9
    ]);
    assert_eq!(asm("ini\ninir\nind\nindr\n"), vec![
        0xED, 0xA2, 0xED, 0xB2, 0xED, 0xAA, 0xED, 0xBA
    ]);
    assert_eq!(asm("outi\notir\noutd\notdr\n"), vec![
        0xED, 0xA3, 0xED, 0xB3, 0xED, 0xAB, 0xED, 0xBB
    ]);
    assert_eq!(asm("im 0\nim 1\nim 2\n"), vec![
        0xED, 0x46, 0xED, 0x56, 0xED, 0x5E
    ]);
    assert_eq!(asm("rld\nrrd\n"), vec![0xED, 0x6F, 0xED, 0x67]);
}

#[test]
fn test_if_else_endif() {
    assert_eq!(
        asm("if 1\ndb 1\nelse\ndb 2\nendif\nif 0\ndb 3\nelse\ndb 4\nendif\n"),
        vec![1, 4]
    );
    // a skipped branch ignores everything but the structure keywords
    assert_eq!(
        asm("if 0\nif 1\ndb 9\nendif\nnot even parsed\nelse\ndb 5\nendif\n"),
        vec![5]
    );
    assert!(asm_errors("endif\n") > 0);
    assert!(asm_errors("else\n") > 0);
    assert!(asm_errors("if 1\ndb 1\n") > 0);
}

#[test]
fn test_end_discards_remainder() {
    assert_eq!(asm("db 1\nend\ndb 2\n"), vec![1]);
}

#[test]
fn test_duplicate_label_rejected() {
    assert!(asm_errors("here: nop\nhere: nop\n") > 0);
}

#[test]
fn test_undefined_label_reported() {
    assert!(asm_errors("jp nowhere\n") > 0);
}

#[test]
fn test_macro_expansion() {
    let source = "\
store: macro reg, val
    ld reg, val
    endm
    store a, 1
    store b, 2
";
    assert_eq!(asm(source), vec![0x3E, 0x01, 0x06, 0x02]);
}

#[test]
fn test_macro_empty_argument_at_call_site() {
    let source = "\
two: macro x1, y1
    db 7 y1
    endm
    two 5,
";
    assert_eq!(asm(source), vec![7]);
}

#[test]
fn test_macro_wrong_arity_rejected() {
    let source = "\
pair: macro a1, b1
    db a1, b1
    endm
    pair 1
";
    assert!(asm_errors(source) > 0);
}

#[test]
fn test_macro_empty_parameter_rejected() {
    assert!(asm_errors("bad: macro a1,,b1\n    endm\n") > 0);
}

#[test]
fn test_duplicate_macro_rejected() {
    let source = "\
m1: macro p1
    db p1
    endm
m1: macro p1
    db p1
    endm
";
    assert!(asm_errors(source) > 0);
}

#[test]
fn test_macro_calling_macro() {
    let source = "\
inner: macro v1
    db v1
    endm
outer: macro w1
    inner w1
    inner w1+1
    endm
    outer 5
";
    assert_eq!(asm(source), vec![5, 6]);
}

#[test]
fn test_include() {
    let mut reader = MockFileReader::default();
    reader.add_file("test.asm", "include \"defs.inc\"\ndb answer\n");
    reader.add_file("defs.inc", "answer: equ 42\n");
    let result = asm_with(&reader, &Options::default());
    assert_eq!(result.errors, 0);
    assert_eq!(result.binary, vec![42]);
}

#[test]
fn test_include_search_path() {
    let mut reader = MockFileReader::default();
    reader.add_file("test.asm", "include \"defs.inc\"\ndb answer\n");
    reader.add_file("lib/defs.inc", "answer: equ 7\n");
    let opts = Options {
        include_dirs: vec![PathBuf::from("lib")],
        ..Options::default()
    };
    let result = asm_with(&reader, &opts);
    assert_eq!(result.errors, 0);
    assert_eq!(result.binary, vec![7]);
}

#[test]
fn test_missing_include_is_an_error() {
    let mut reader = MockFileReader::default();
    reader.add_file("test.asm", "include \"gone.inc\"\n");
    assert!(asm_with(&reader, &Options::default()).errors > 0);
}

#[test]
fn test_bininclude_splices_raw_bytes() {
    let mut reader = MockFileReader::default();
    reader.add_file("test.asm", "db 0xAA\nbininclude \"blob.bin\"\ndb 0xBB\n");
    reader.add_binary_file("blob.bin", &[1, 2, 3]);
    let result = asm_with(&reader, &Options::default());
    assert_eq!(result.errors, 0);
    assert_eq!(result.binary, vec![0xAA, 1, 2, 3, 0xBB]);
}

#[test]
fn test_scope_local_labels_per_file() {
    let mut reader = MockFileReader::default();
    reader.add_file(
        "test.asm",
        "include \"part.inc\"\n.loop: nop\njr .loop\n",
    );
    reader.add_file("part.inc", ".loop: nop\njr .loop\n");
    let result = asm_with(&reader, &Options::default());
    assert_eq!(result.errors, 0);
    assert_eq!(result.binary, vec![0x00, 0x18, 0xFD, 0x00, 0x18, 0xFD]);
}

#[test]
fn test_multiple_input_files_share_one_image() {
    let mut reader = MockFileReader::default();
    reader.add_file("one.asm", "one: db 1\n");
    reader.add_file("two.asm", "dw one\n");
    let opts = Options::default();
    let result = assemble(
        &[PathBuf::from("one.asm"), PathBuf::from("two.asm")],
        &opts,
        &reader,
    )
    .unwrap();
    assert_eq!(result.errors, 0);
    assert_eq!(result.binary, vec![1, 0, 0]);
}

#[test]
fn test_line_pc_accounting() {
    // addr advances by exactly the bytes each line emits
    let bytes = asm("ld a, 1\nhere: equ 2\ndb here\nlater: dw later\n");
    // ld a,1 = 2 bytes, db = 1 byte, later = 3 -> dw later = 03 00
    assert_eq!(bytes, vec![0x3E, 0x01, 0x02, 0x03, 0x00]);
}

#[test]
fn test_listing_format() {
    let mut reader = MockFileReader::default();
    reader.add_file("test.asm", "nop\n");
    let opts = Options {
        listing: true,
        ..Options::default()
    };
    let result = asm_with(&reader, &opts);
    let listing = String::from_utf8(result.listing.unwrap()).unwrap();
    assert_eq!(
        listing,
        "# File test.asm\n0000 00\t\t\tnop\n# End of file test.asm\n0001\n"
    );
}

#[test]
fn test_listing_patches_forward_references() {
    let mut reader = MockFileReader::default();
    reader.add_file("test.asm", "jp later\nlater: nop\n");
    let opts = Options {
        listing: true,
        ..Options::default()
    };
    let result = asm_with(&reader, &opts);
    assert_eq!(result.errors, 0);
    let listing = String::from_utf8(result.listing.unwrap()).unwrap();
    assert!(listing.contains(" c3 03 00"), "listing was {:?}", listing);
}

#[test]
fn test_label_file_format() {
    let mut reader = MockFileReader::default();
    reader.add_file("test.asm", "start: nop\nvalue: equ 0x1234\n");
    let opts = Options {
        label_file: true,
        ..Options::default()
    };
    let result = asm_with(&reader, &opts);
    let labels = String::from_utf8(result.labels.unwrap()).unwrap();
    assert_eq!(labels, "start:\tequ 0x0000h\nvalue:\tequ 0x1234h\n");
}

#[test]
fn test_label_file_prefix_and_order() {
    let mut reader = MockFileReader::default();
    reader.add_file("test.asm", "zz: equ 1\naa: equ 2\n");
    let opts = Options {
        label_file: true,
        label_prefix: "P_".to_string(),
        ..Options::default()
    };
    let result = asm_with(&reader, &opts);
    let labels = String::from_utf8(result.labels.unwrap()).unwrap();
    // definition order, not alphabetical
    assert_eq!(labels, "P_zz:\tequ 0x0001h\nP_aa:\tequ 0x0002h\n");
}

#[test]
fn test_org_only_moves_the_pc() {
    // bytes stay contiguous in the image; org changes label values only
    let bytes = asm("db 1\norg 0x100\nhere: db 2\ndw here\n");
    assert_eq!(bytes, vec![1, 2, 0x00, 0x01]);
}

#[test]
fn test_disk_reader_with_include_path() {
    use std::fs;
    let dir = tempfile::tempdir().unwrap();
    let inc_dir = dir.path().join("headers");
    fs::create_dir(&inc_dir).unwrap();
    fs::write(inc_dir.join("defs.inc"), "answer: equ 3\n").unwrap();
    let main = dir.path().join("main.asm");
    fs::write(&main, "include \"defs.inc\"\ndb answer\n").unwrap();

    let opts = Options {
        include_dirs: vec![inc_dir],
        ..Options::default()
    };
    let result = assemble(&[main], &opts, &AsmFileReader).unwrap();
    assert_eq!(result.errors, 0);
    assert_eq!(result.binary, vec![3]);
}
