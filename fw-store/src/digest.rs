//! Content digests for change detection
//!
//! MD5 by default for compatibility with existing checksums; BLAKE3 when
//! configured. Neither is used for anything security-relevant.

use fw_core::{DigestAlgorithm, FwResult};
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

const CHUNK_SIZE: usize = 4096;

enum ContentHasher {
    Md5(Md5),
    Blake3(Box<blake3::Hasher>),
}

impl ContentHasher {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Md5 => ContentHasher::Md5(Md5::new()),
            DigestAlgorithm::Blake3 => ContentHasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            ContentHasher::Md5(hasher) => hasher.update(data),
            ContentHasher::Blake3(hasher) => {
                hasher.update(data);
            }
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            ContentHasher::Md5(hasher) => hex::encode(hasher.finalize()),
            ContentHasher::Blake3(hasher) => hasher.finalize().to_hex().to_string(),
        }
    }
}

impl Write for ContentHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Hash everything readable from `reader` in fixed-size chunks.
pub fn hash_reader<R: Read>(reader: R, algorithm: DigestAlgorithm) -> io::Result<String> {
    let mut hasher = ContentHasher::new(algorithm);
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, reader);
    io::copy(&mut reader, &mut hasher)?;
    Ok(hasher.finalize_hex())
}

pub fn hash_file(path: &Path, algorithm: DigestAlgorithm) -> FwResult<String> {
    let file = File::open(path)?;
    Ok(hash_reader(file, algorithm)?)
}

pub fn hash_bytes(data: &[u8], algorithm: DigestAlgorithm) -> String {
    let mut hasher = ContentHasher::new(algorithm);
    hasher.update(data);
    hasher.finalize_hex()
}
