use std::fs;
use std::path::{Path, PathBuf};

/// Library code propagates errors; `.unwrap()` is only tolerated in tests.
#[test]
fn library_sources_do_not_unwrap() {
    let src_root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src");
    let mut offenders = Vec::new();
    for path in rust_files(&src_root) {
        let text = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("read {}: {e}", path.display()));
        let production = text.split("#[cfg(test)]").next().unwrap_or_default();
        for (number, line) in production.lines().enumerate() {
            if line.contains(".unwrap()") {
                offenders.push(format!("{}:{}: {}", path.display(), number + 1, line.trim()));
            }
        }
    }
    assert!(offenders.is_empty(), "unwrap in library code:\n{}", offenders.join("\n"));
}

#[test]
fn manifest_keeps_clippy_unwrap_and_expect_lints() {
    let manifest = fs::read_to_string(Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml"))
        .unwrap_or_else(|e| panic!("package manifest must be readable: {e}"));
    assert!(manifest.contains("[lints.clippy]"));
    assert!(manifest.contains("unwrap_used = \"warn\""));
    assert!(manifest.contains("expect_used = \"warn\""));
}

fn rust_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let entries = fs::read_dir(dir).unwrap_or_else(|e| panic!("read {}: {e}", dir.display()));
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(rust_files(&path));
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            files.push(path);
        }
    }
    files.sort();
    files
}
