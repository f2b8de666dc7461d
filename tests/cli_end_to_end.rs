#![cfg(unix)]

use std::{
    fs::{self, File},
    io::{Read, Write},
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;
use zip::{CompressionMethod, ZipArchive, ZipWriter, write::SimpleFileOptions};

const CHAPTER: &str = concat!(
    "<html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title>c</title></head><body>",
    "<p><math><semantics><mi>x</mi>",
    "<annotation encoding=\"application/x-tex\">x</annotation>",
    "</semantics></math></p></body></html>"
);

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("write script");
    let mut perms = fs::metadata(&path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod");
    path
}

fn book(dir: &Path) -> PathBuf {
    let path = dir.join("book.epub");
    let mut zip = ZipWriter::new(File::create(&path).expect("create zip"));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, bytes) in [
        ("mimetype", b"application/epub+zip".as_slice()),
        ("OEBPS/ch01.xhtml", CHAPTER.as_bytes()),
    ] {
        zip.start_file(name, options).expect("start file");
        zip.write_all(bytes).expect("write entry");
    }
    zip.finish().expect("finish zip");
    path
}

fn chapter_of(output: &Path) -> String {
    let mut archive = ZipArchive::new(File::open(output).expect("open output")).expect("zip");
    let mut entry = archive.by_name("OEBPS/ch01.xhtml").expect("chapter");
    let mut text = String::new();
    entry.read_to_string(&mut text).expect("read chapter");
    text
}

fn epubmath() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("epubmath"));
    cmd.env_remove("EPUBMATH_CONFIG_FILE")
        .env_remove("RUST_LOG")
        .env("EPUBMATH__LOGGING__LEVEL", "warn");
    cmd
}

#[test]
fn vector_conversion_writes_default_output_path() {
    let dir = TempDir::new().expect("temp dir");
    let input = book(dir.path());
    let vector_cli = script(
        dir.path(),
        "fake-mathml2svg",
        "#!/bin/sh\nprintf '<svg viewBox=\"0 0 1 1\"></svg>'\n",
    );

    epubmath()
        .current_dir(dir.path())
        .arg("convert")
        .arg(&input)
        .arg("--vector-cli")
        .arg(&vector_cli)
        .arg("--concurrency")
        .arg("2")
        .assert()
        .success()
        .stdout(contains("converted 1 math node(s) in 1 of 1 document(s)"));

    let output = dir.path().join("book.vector.epub");
    let chapter = chapter_of(&output);
    assert!(chapter.contains("aria-label=\"x\""));
    assert!(chapter.contains("class=\"epubmath-inline\""));
}

#[test]
fn raster_conversion_uses_both_clis() {
    let dir = TempDir::new().expect("temp dir");
    let input = book(dir.path());
    let output = dir.path().join("converted.epub");
    let vector_cli = script(
        dir.path(),
        "fake-mathml2svg",
        "#!/bin/sh\nprintf '<svg viewBox=\"0 0 1 1\"></svg>'\n",
    );
    let raster_cli = script(dir.path(), "fake-rsvg", "#!/bin/sh\nprintf 'PNG'\n");

    epubmath()
        .arg("convert")
        .arg(&input)
        .arg(&output)
        .args(["--mode", "raster"])
        .arg("--vector-cli")
        .arg(&vector_cli)
        .arg("--raster-cli")
        .arg(&raster_cli)
        .assert()
        .success();

    let chapter = chapter_of(&output);
    assert!(chapter.contains("src=\"data:image/png;base64,UE5H\""));
    assert!(chapter.contains("alt=\"x\""));
}

#[test]
fn missing_renderer_leaves_math_in_place() {
    let dir = TempDir::new().expect("temp dir");
    let input = book(dir.path());
    let output = dir.path().join("converted.epub");

    epubmath()
        .arg("convert")
        .arg(&input)
        .arg(&output)
        .arg("--vector-cli")
        .arg(dir.path().join("does-not-exist"))
        .assert()
        .success()
        .stdout(contains("converted 0 math node(s)"));

    assert_eq!(chapter_of(&output), CHAPTER);
}

#[test]
fn missing_input_exits_with_failure() {
    let dir = TempDir::new().expect("temp dir");

    epubmath()
        .arg("convert")
        .arg(dir.path().join("absent.epub"))
        .assert()
        .failure()
        .code(1)
        .stderr(contains("does not exist"));
}

#[test]
fn invalid_concurrency_is_a_configuration_error() {
    let dir = TempDir::new().expect("temp dir");
    let input = book(dir.path());

    epubmath()
        .arg("convert")
        .arg(&input)
        .args(["--concurrency", "0"])
        .assert()
        .failure()
        .stderr(contains("pipeline.concurrency"));
}
