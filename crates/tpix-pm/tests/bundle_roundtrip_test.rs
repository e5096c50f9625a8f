//! Bundling and extracting a package directory end to end.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;

use flate2::read::GzDecoder;
use tempfile::TempDir;
use walkdir::WalkDir;

use tpix_pm::archive::{create_tar_gz, extract};
use tpix_pm::{ArchiveFormat, ExcludeRules, PackageBuilder};

const MANIFEST: &str = r#"
[package]
name = "roundtrip"
version = "0.1.0"
entrypoint = "lib.typ"
exclude = ["*.pdf"]
"#;

fn write(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Relative path to content for every regular file below `root`
fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            (relative, fs::read(e.path()).unwrap())
        })
        .collect()
}

fn archive_entries(archive: &Path) -> Vec<String> {
    let mut tar = tar::Archive::new(GzDecoder::new(File::open(archive).unwrap()));
    tar.entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_bundle_then_extract_is_byte_identical() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    write(&src, "typst.toml", MANIFEST.as_bytes());
    write(&src, "lib.typ", b"#let greet(name) = [Hello #name]");
    write(&src, "src/util.typ", b"#let id(x) = x");
    write(&src, "assets/logo.bin", &[0u8, 159, 146, 150, 255, 10, 13]);
    write(&src, "manual.pdf", b"%PDF");

    let output = temp.path().join("roundtrip.tar.gz");
    let bundle = PackageBuilder::with_default_excludes(Vec::<String>::new())
        .create_package(&src, &output)
        .unwrap();
    assert!(bundle.entries > 0);

    let dest = temp.path().join("extracted");
    extract(ArchiveFormat::TarGz, &output, &dest).unwrap();

    let mut expected = snapshot(&src);
    expected.remove("manual.pdf");
    assert_eq!(snapshot(&dest), expected);
}

#[test]
fn test_git_directory_is_never_archived() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    write(&src, "typst.toml", MANIFEST.as_bytes());
    write(&src, "lib.typ", b"");
    write(&src, ".git/HEAD", b"ref: refs/heads/main");
    write(&src, ".git/objects/ab/cdef", b"blob");

    let output = temp.path().join("out.tar.gz");
    PackageBuilder::with_default_excludes(Vec::<String>::new())
        .create_package(&src, &output)
        .unwrap();

    let entries = archive_entries(&output);
    assert!(entries.iter().any(|e| e == "lib.typ"));
    assert!(!entries.iter().any(|e| e == ".git" || e.starts_with(".git/")));
}

#[test]
fn test_overlapping_exclusions_apply_once() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    write(&src, "exact.txt", b"exact");
    write(&src, "other.txt", b"other");
    write(&src, "keep.typ", b"keep");

    let rules = ExcludeRules::new(["exact.txt", "*.txt"]);
    assert_eq!(rules.first_match("exact.txt"), Some("exact.txt"));
    assert_eq!(rules.first_match("other.txt"), Some("*.txt"));

    let output = temp.path().join("out.tar.gz");
    let written = create_tar_gz(&src, &rules, &output).unwrap();

    assert_eq!(written, 1);
    assert_eq!(archive_entries(&output), vec!["keep.typ".to_string()]);
}
