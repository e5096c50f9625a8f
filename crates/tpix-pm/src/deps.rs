//! Package imports declared in Typst sources.
//!
//! Finds `#import "@namespace/name:version"` statements outside of `//` and
//! `/* */` comments.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use walkdir::WalkDir;

use crate::{PackageRef, Result};

fn import_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"#import\s+"@([^/"]+)/([^:"]+):([^"]+)""#).unwrap())
}

/// Package imports in one source file, deduplicated, in order of appearance
pub fn extract_from_source(content: &str) -> Vec<PackageRef> {
    let mut imports = Imports::default();
    let mut in_block_comment = false;

    for line in content.lines() {
        let code = strip_comments(line, &mut in_block_comment);
        for captures in import_regex().captures_iter(&code) {
            match PackageRef::parse_parts(&captures[1], &captures[2], &captures[3]) {
                Ok(pkg) => imports.push(pkg),
                Err(e) => log::warn!("Ignoring import {}: {}", &captures[0], e),
            }
        }
    }

    imports.into_vec()
}

/// Package imports of every `.typ` file below `dir`.
///
/// Files are visited in file-name order; the result keeps the first
/// occurrence of each package.
pub fn extract_from_directory(dir: &Path) -> Result<Vec<PackageRef>> {
    let mut imports = Imports::default();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() || !is_typst_source(entry.path()) {
            continue;
        }

        log::trace!("Scanning {}", entry.path().display());
        let content = fs::read_to_string(entry.path())?;
        for pkg in extract_from_source(&content) {
            imports.push(pkg);
        }
    }

    Ok(imports.into_vec())
}

fn is_typst_source(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("typ"))
        .unwrap_or(false)
}

/// Remove comment text from one line, tracking block comments across lines
fn strip_comments(line: &str, in_block_comment: &mut bool) -> String {
    let mut code = String::new();
    let mut rest = line;

    loop {
        if *in_block_comment {
            match rest.find("*/") {
                Some(end) => {
                    rest = &rest[end + 2..];
                    *in_block_comment = false;
                }
                None => return code,
            }
        }

        match (rest.find("/*"), rest.find("//")) {
            (Some(block), Some(line_comment)) if line_comment < block => {
                code.push_str(&rest[..line_comment]);
                return code;
            }
            (Some(block), _) => {
                code.push_str(&rest[..block]);
                code.push(' ');
                rest = &rest[block + 2..];
                *in_block_comment = true;
            }
            (None, Some(line_comment)) => {
                code.push_str(&rest[..line_comment]);
                return code;
            }
            (None, None) => {
                code.push_str(rest);
                return code;
            }
        }
    }
}

#[derive(Default)]
struct Imports {
    seen: HashSet<String>,
    refs: Vec<PackageRef>,
}

impl Imports {
    fn push(&mut self, pkg: PackageRef) {
        if self.seen.insert(pkg.key()) {
            self.refs.push(pkg);
        }
    }

    fn into_vec(self) -> Vec<PackageRef> {
        self.refs
    }
}
