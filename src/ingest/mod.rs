//! # Source Ingest (C1)
//!
//! @title Repository Enumeration and Program Directory Detection
//! @author Ramprasad
//!
//! Enumerates Rust source files under a repository root, narrows to the
//! directories that actually look like a Solana/Anchor program when no
//! explicit hint is given, and reads each file once so the rest of the
//! scan holds immutable content for its lifetime.

use crate::error::ScanError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One ingested source file: path, content, precomputed line count, and a
/// content hash used by the Fact Graph's determinism property (§8
/// "Stable IDs") to detect byte-identical re-parses without re-hashing the
/// whole graph.
#[derive(Debug, Clone)]
pub struct IngestedFile {
    pub path: String,
    pub content: String,
    pub line_count: usize,
    pub content_hash: u64,
}

impl IngestedFile {
    fn read(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let line_count = content.lines().count();
        let content_hash = fnv1a_hash(content.as_bytes());
        Ok(Self {
            path: path.to_string_lossy().to_string(),
            content,
            line_count,
            content_hash,
        })
    }
}

/// FNV-1a, chosen over a cryptographic hash because the content hash is
/// used only for change detection within a single machine's scan, not as
/// a security boundary.
pub fn fnv1a_hash(bytes: &[u8]) -> u64 {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Manifest dependency names that mark a crate as a Solana/Anchor program,
/// used to auto-detect program directories when no hint is supplied.
const PROGRAM_MANIFEST_DEPS: &[&str] = &[
    "anchor-lang",
    "anchor-spl",
    "solana-program",
    "solana-sdk",
];

/// Locates `Cargo.toml` manifests under `repo_root` that declare a
/// Solana or Anchor dependency, returning the directory containing each
/// such manifest.
pub fn detect_program_directories(repo_root: &Path) -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    for entry in WalkDir::new(repo_root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name() == "Cargo.toml")
    {
        let path = entry.path();
        if path.to_string_lossy().contains("target") {
            continue;
        }
        let Ok(manifest) = std::fs::read_to_string(path) else {
            continue;
        };
        let Ok(parsed) = manifest.parse::<toml::Value>() else {
            continue;
        };
        if manifest_declares_program_dep(&parsed) {
            if let Some(dir) = path.parent() {
                dirs.push(dir.to_path_buf());
            }
        }
    }

    dirs
}

fn manifest_declares_program_dep(manifest: &toml::Value) -> bool {
    for table_key in ["dependencies", "dev-dependencies", "build-dependencies"] {
        if let Some(table) = manifest.get(table_key).and_then(|v| v.as_table()) {
            if table
                .keys()
                .any(|k| PROGRAM_MANIFEST_DEPS.contains(&k.as_str()))
            {
                return true;
            }
        }
    }
    false
}

/// Enumerates Rust source files for a scan (§4.1).
///
/// `program_dir_hint` restricts enumeration to that directory tree. With
/// no hint, every auto-detected program directory is included; if none
/// are found, the whole repo root is scanned as a fallback so a bare
/// single-file program (no Cargo.toml at all) is still ingested.
///
/// Build outputs (`target/`) and common test-fixture directories are
/// excluded. Every remaining `.rs` file is read once.
pub fn collect_source_files(
    repo_root: &Path,
    program_dir_hint: Option<&Path>,
) -> Result<Vec<IngestedFile>, ScanError> {
    if !repo_root.exists() {
        return Err(ScanError::IngestError {
            path: repo_root.to_string_lossy().to_string(),
            reason: "path does not exist".to_string(),
        });
    }

    let roots: Vec<PathBuf> = match program_dir_hint {
        Some(hint) => vec![hint.to_path_buf()],
        None => {
            let detected = detect_program_directories(repo_root);
            if detected.is_empty() {
                vec![repo_root.to_path_buf()]
            } else {
                detected
            }
        }
    };

    let mut files = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for root in &roots {
        for entry in WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| is_eligible_rust_file(e.path()))
        {
            let path = entry.path();
            let key = path.to_string_lossy().to_string();
            if !seen.insert(key) {
                continue;
            }
            match IngestedFile::read(path) {
                Ok(file) => files.push(file),
                Err(e) => {
                    log::warn!("skipping unreadable file {}: {e}", path.display());
                }
            }
        }
    }

    if files.is_empty() {
        return Err(ScanError::IngestError {
            path: repo_root.to_string_lossy().to_string(),
            reason: "no Rust source files found under any program directory".to_string(),
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn is_eligible_rust_file(path: &Path) -> bool {
    if path.extension().map_or(true, |ext| ext != "rs") {
        return false;
    }
    let path_str = path.to_string_lossy();
    !(path_str.contains("/target/")
        || path_str.contains("\\target\\")
        || path_str.contains("/tests/fixtures/")
        || path_str.contains("/node_modules/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn fnv1a_is_deterministic() {
        assert_eq!(fnv1a_hash(b"hello"), fnv1a_hash(b"hello"));
        assert_ne!(fnv1a_hash(b"hello"), fnv1a_hash(b"world"));
    }

    #[test]
    fn collect_source_files_reads_rs_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let rs_path = dir.path().join("lib.rs");
        let mut f = std::fs::File::create(&rs_path).unwrap();
        writeln!(f, "pub fn noop() {{}}").unwrap();
        std::fs::write(dir.path().join("README.md"), "not rust").unwrap();

        let files = collect_source_files(dir.path(), None).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("lib.rs"));
        assert_eq!(files[0].line_count, 1);
    }

    #[test]
    fn missing_repo_root_is_an_ingest_error() {
        let err = collect_source_files(Path::new("/nonexistent/path/xyz"), None);
        assert!(matches!(err, Err(ScanError::IngestError { .. })));
    }

    #[test]
    fn detects_anchor_program_directory_by_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let program_dir = dir.path().join("programs/vault");
        std::fs::create_dir_all(&program_dir).unwrap();
        std::fs::write(
            program_dir.join("Cargo.toml"),
            "[package]\nname = \"vault\"\n[dependencies]\nanchor-lang = \"0.29\"\n",
        )
        .unwrap();
        std::fs::create_dir_all(program_dir.join("src")).unwrap();
        std::fs::write(program_dir.join("src/lib.rs"), "pub fn noop() {}").unwrap();

        let detected = detect_program_directories(dir.path());
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0], program_dir);
    }
}
