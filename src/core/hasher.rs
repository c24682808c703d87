//! Content hashing with BLAKE3.
//!
//! This module provides `ContentHasher` for computing the digests stored
//! in audit metadata. BLAKE3 is the primary hash; SHA-256 can be enabled
//! for cross-referencing with external threat databases.

use crate::core::types::ContentHash;

use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;
use walkdir::WalkDir;

const BUF_SIZE: usize = 64 * 1024;

/// Configuration for computing content hashes.
///
/// BLAKE3 is always computed. SHA-256 can be enabled for compatibility
/// with external systems that index threats by SHA-256.
///
/// Directories hash to a manifest digest: the sorted relative path and
/// content digest of every file under the tree, so the digest is stable
/// when the tree is relocated and changes when any file inside changes.
///
/// # Examples
///
/// ```rust
/// use fileward::core::ContentHasher;
///
/// // Default: only BLAKE3
/// let hasher = ContentHasher::new();
///
/// // With SHA-256 alongside
/// let hasher = ContentHasher::new().with_sha256(true);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
    /// Whether to compute SHA-256 alongside BLAKE3.
    compute_sha256: bool,
}

impl ContentHasher {
    /// Creates a new `ContentHasher` with default settings (BLAKE3 only).
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables SHA-256 computation.
    pub fn with_sha256(mut self, enabled: bool) -> Self {
        self.compute_sha256 = enabled;
        self
    }

    /// Returns whether SHA-256 computation is enabled.
    pub fn computes_sha256(&self) -> bool {
        self.compute_sha256
    }

    /// Computes hashes from bytes already in memory.
    pub fn hash_bytes(&self, data: &[u8]) -> ContentHash {
        let blake3 = blake3::hash(data).to_hex().to_string();
        let sha256 = self.compute_sha256.then(|| {
            let mut hasher = Sha256::new();
            hasher.update(data);
            format!("{:x}", hasher.finalize())
        });
        ContentHash { blake3, sha256 }
    }

    /// Computes hashes of a file by streaming its contents.
    pub fn hash_file(&self, path: &Path) -> Result<ContentHash, std::io::Error> {
        let file = std::fs::File::open(path)?;
        let mut reader = std::io::BufReader::new(file);
        self.hash_reader(&mut reader)
    }

    /// Computes hashes from a synchronous reader in a single pass.
    pub fn hash_reader<R: Read>(&self, reader: &mut R) -> Result<ContentHash, std::io::Error> {
        let mut blake3_hasher = blake3::Hasher::new();
        let mut sha256_hasher = self.compute_sha256.then(Sha256::new);

        let mut buffer = [0u8; BUF_SIZE];
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            let chunk = &buffer[..bytes_read];
            blake3_hasher.update(chunk);
            if let Some(ref mut h) = sha256_hasher {
                h.update(chunk);
            }
        }

        Ok(ContentHash {
            blake3: blake3_hasher.finalize().to_hex().to_string(),
            sha256: sha256_hasher.map(|h| format!("{:x}", h.finalize())),
        })
    }

    /// Computes a manifest digest over a directory tree.
    ///
    /// Walks the tree in sorted order and feeds each file's relative
    /// path (with `/` separators) and content digest into the manifest.
    /// Empty directories and symlinks contribute nothing, so the digest
    /// depends only on file contents and their positions within the
    /// tree, never on the tree's own location.
    pub fn hash_dir(&self, root: &Path) -> Result<ContentHash, std::io::Error> {
        let mut blake3_hasher = blake3::Hasher::new();
        let mut sha256_hasher = self.compute_sha256.then(Sha256::new);

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or_else(|_| entry.path());
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let file_hash = self.hash_file(entry.path())?;

            blake3_hasher.update(rel.as_bytes());
            blake3_hasher.update(b"\0");
            blake3_hasher.update(file_hash.blake3.as_bytes());
            blake3_hasher.update(b"\n");
            if let Some(ref mut h) = sha256_hasher {
                h.update(rel.as_bytes());
                h.update(b"\0");
                if let Some(ref sha) = file_hash.sha256 {
                    h.update(sha.as_bytes());
                }
                h.update(b"\n");
            }
        }

        Ok(ContentHash {
            blake3: blake3_hasher.finalize().to_hex().to_string(),
            sha256: sha256_hasher.map(|h| format!("{:x}", h.finalize())),
        })
    }

    /// Computes hashes for a path, dispatching on its type.
    pub fn hash_path(&self, path: &Path) -> Result<ContentHash, std::io::Error> {
        let meta = std::fs::metadata(path)?;
        if meta.is_dir() {
            self.hash_dir(path)
        } else {
            self.hash_file(path)
        }
    }
}
