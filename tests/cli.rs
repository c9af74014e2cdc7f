use std::io::Write;
use std::process::{Command, Output, Stdio};

const LOREM_TXT: &[u8] = include_bytes!("lorem.txt");
const LOREM_LZ10: &[u8] = include_bytes!("lorem.lz10");

fn fixture(name: &str) -> String {
    format!("{}/tests/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn lzexpand(args: &[&str], stdin: &[u8]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_lzexpand"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start lzexpand");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin)
        .expect("failed to write stdin");

    child.wait_with_output().expect("lzexpand did not finish")
}

#[test]
fn expand_file_argument() {
    let out = lzexpand(&[&fixture("lorem.lz11")], &[]);

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(out.stdout, LOREM_TXT);
    assert!(out.stderr.is_empty());
}

#[test]
fn expand_stdin() {
    let out = lzexpand(&[], LOREM_LZ10);

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(out.stdout, LOREM_TXT);
}

#[test]
fn plain_input_passes_through() {
    let out = lzexpand(&[&fixture("lorem.txt")], &[]);
    assert!(out.status.success());
    assert_eq!(out.stdout, LOREM_TXT);

    let out = lzexpand(&[], LOREM_TXT);
    assert!(out.status.success());
    assert_eq!(out.stdout, LOREM_TXT);
}

#[test]
fn truncated_input_fails() {
    let out = lzexpand(&[], &LOREM_LZ10[..300]);
    let stderr = String::from_utf8_lossy(&out.stderr);

    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert!(stderr.contains("Input ended at offset 0x"), "{}", stderr);
    assert!(stderr.contains("of 1433 bytes"), "{}", stderr);
}

#[test]
fn missing_file_fails() {
    let out = lzexpand(&[&fixture("no-such-file.lz10")], &[]);

    assert_eq!(out.status.code(), Some(1));
    assert!(!out.stderr.is_empty());
}

#[test]
fn verbose_traces_to_stderr() {
    let out = lzexpand(&["-v", &fixture("lorem.lz11")], &[]);
    let stderr = String::from_utf8_lossy(&out.stderr);

    assert!(out.status.success(), "{}", stderr);
    assert_eq!(out.stdout, LOREM_TXT);
    assert!(stderr.starts_with("# Header\nType 0x11 (Extended), 1433 bytes decompressed"), "{}", stderr);
    assert!(stderr.contains("Literal: "));
    assert!(stderr.contains("# Summary"));

    let out = lzexpand(&["--verbose"], LOREM_LZ10);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("# Summary"));
}

#[test]
fn extra_arguments_are_rejected() {
    let out = lzexpand(&["a", "b"], &[]);

    assert!(!out.status.success());
    assert!(out.stdout.is_empty());
    assert!(!out.stderr.is_empty());
}
