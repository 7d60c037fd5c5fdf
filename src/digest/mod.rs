//! Content digest engine
//!
//! Computes hex-encoded digests of artifact contents. All hashing is
//! streaming: input is consumed in fixed-size chunks so arbitrarily large
//! artifacts never need to fit in memory.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::Digest;

const CHUNK_SIZE: usize = 64 * 1024;

/// Digest errors
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("invalid hash algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Crc32,
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl Algorithm {
    /// Canonical lowercase name, as written in config and stored checksums
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Crc32 => "crc32",
            Algorithm::Md5 => "md5",
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha224 => "sha224",
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha384 => "sha384",
            Algorithm::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "crc32" => Ok(Algorithm::Crc32),
            "md5" => Ok(Algorithm::Md5),
            "sha1" => Ok(Algorithm::Sha1),
            "sha224" => Ok(Algorithm::Sha224),
            "sha256" => Ok(Algorithm::Sha256),
            "sha384" => Ok(Algorithm::Sha384),
            "sha512" => Ok(Algorithm::Sha512),
            other => Err(DigestError::UnknownAlgorithm(other.to_string())),
        }
    }
}

fn digest_stream<D: Digest, R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = D::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn crc32_stream<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:08x}", hasher.finalize()))
}

/// Hash everything the reader yields, returning lowercase hex
pub fn hash_reader<R: Read>(algorithm: Algorithm, reader: R) -> io::Result<String> {
    match algorithm {
        Algorithm::Crc32 => crc32_stream(reader),
        Algorithm::Md5 => digest_stream::<md5::Md5, _>(reader),
        Algorithm::Sha1 => digest_stream::<sha1::Sha1, _>(reader),
        Algorithm::Sha224 => digest_stream::<sha2::Sha224, _>(reader),
        Algorithm::Sha256 => digest_stream::<sha2::Sha256, _>(reader),
        Algorithm::Sha384 => digest_stream::<sha2::Sha384, _>(reader),
        Algorithm::Sha512 => digest_stream::<sha2::Sha512, _>(reader),
    }
}

/// Hash a file's contents, naming the path on failure
pub fn hash_file(algorithm: Algorithm, path: &Path) -> Result<String, DigestError> {
    let file = File::open(path).map_err(|source| DigestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    hash_reader(algorithm, file).map_err(|source| DigestError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;

    const INPUT: &[u8] = b"some string";

    fn hash_bytes(algorithm: Algorithm, bytes: &[u8]) -> String {
        hash_reader(algorithm, Cursor::new(bytes)).unwrap()
    }

    #[test]
    fn test_known_vectors() {
        let cases = [
            (Algorithm::Crc32, "f94d3859"),
            (Algorithm::Md5, "5ac749fbeec93607fc28d666be85e73a"),
            (Algorithm::Sha1, "8b45e4bd1c6acb88bebf6407d16205f567e62a3e"),
            (
                Algorithm::Sha224,
                "21bc225587d8768058837b68fe7e0341e87b972f02fd8fb0c236d1d3",
            ),
            (
                Algorithm::Sha256,
                "61d034473102d7dac305902770471fd50f4c5b26f6831a56dd90b5184b3c30fc",
            ),
            (
                Algorithm::Sha384,
                "f6055a96a105d2fb5941a616964ffda8294fd415730cc4154a602062bc3d00e99d3c6f4a11af8c965a343de4afca3c2b",
            ),
            (
                Algorithm::Sha512,
                "14925e01a7a0cf0801aa95fe52d542b578af58ae7997ada66db3a6eae68a329d50600a5b7b442eabf4ea77ea8ef5fe40acf2ab31d47311b2a232c4f64009aac1",
            ),
        ];

        for (algorithm, expected) in cases {
            assert_eq!(hash_bytes(algorithm, INPUT), expected, "{}", algorithm);
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(
            hash_bytes(Algorithm::Sha256, b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        // crc32 of nothing is zero, padded to the full width
        assert_eq!(hash_bytes(Algorithm::Crc32, b""), "00000000");
    }

    #[test]
    fn test_streaming_matches_one_shot() {
        // Larger than one chunk so the loop runs more than once
        let big = vec![0xabu8; CHUNK_SIZE * 2 + 17];
        let streamed = hash_reader(Algorithm::Sha256, Cursor::new(&big)).unwrap();

        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(&big);
        assert_eq!(streamed, hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("sha256".parse::<Algorithm>().unwrap(), Algorithm::Sha256);
        assert_eq!("crc32".parse::<Algorithm>().unwrap(), Algorithm::Crc32);

        let err = "sha513".parse::<Algorithm>().unwrap_err();
        assert!(err.to_string().contains("sha513"));
    }

    #[test]
    fn test_hash_file_names_missing_path() {
        let err = hash_file(Algorithm::Sha256, Path::new("/nonexistent/input")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/input"));
    }

    #[test]
    fn test_hash_file_reads_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(INPUT).unwrap();

        let sum = hash_file(Algorithm::Sha256, file.path()).unwrap();
        assert_eq!(
            sum,
            "61d034473102d7dac305902770471fd50f4c5b26f6831a56dd90b5184b3c30fc"
        );
    }
}
