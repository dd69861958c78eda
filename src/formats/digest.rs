// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2021 Profian, Inc.

use std::io::Write;
use std::str::FromStr;

use ring::digest::{Context, SHA256, SHA256_OUTPUT_LEN};

use crate::error::Error;

const PREFIX: &str = "sha256:";

#[inline(always)]
fn dehex(byte: u8) -> Result<u8, Invalid> {
    Ok(match byte {
        b'0'..=b'9' => byte - b'0',
        b'a'..=b'f' => byte - b'a' + 10,
        b'A'..=b'F' => byte - b'A' + 10,
        _ => return Err(Invalid::Encoding),
    })
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Invalid {
    Algorithm,
    Encoding,
    Length,
}

impl std::error::Error for Invalid {}
impl std::fmt::Display for Invalid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Invalid::Algorithm => f.write_str("invalid digest algorithm"),
            Invalid::Encoding => f.write_str("invalid digest encoding"),
            Invalid::Length => f.write_str("invalid digest length"),
        }
    }
}

/// A SHA-256 content digest
///
/// Parsed from and displayed as `sha256:HEX`. Parsing accepts upper or lower
/// case hex; display is always lower case, so comparing two `Digest`s is a
/// case-insensitive comparison of their text forms.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Digest([u8; SHA256_OUTPUT_LEN]);

impl Digest {
    pub fn algorithm(&self) -> &str {
        "sha256"
    }

    /// The lower case hex encoding, as used for blob file names
    pub fn hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Hashes a complete buffer
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(data);
        hasher.finish()
    }

    /// Parses a digest, folding the reason for rejection into `Error`
    pub fn parse(s: &str) -> crate::error::Result<Self> {
        s.parse().map_err(|e| match e {
            Invalid::Algorithm => Error::UnsupportedDigest(s.into()),
            reason => Error::InvalidDigest {
                digest: s.into(),
                reason: reason.to_string(),
            },
        })
    }
}

impl FromStr for Digest {
    type Err = Invalid;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix(PREFIX).ok_or(Invalid::Algorithm)?;

        if hex.len() != SHA256_OUTPUT_LEN * 2 {
            return Err(Invalid::Length);
        }

        let mut bytes = [0u8; SHA256_OUTPUT_LEN];
        for (b, pair) in bytes.iter_mut().zip(hex.as_bytes().chunks(2)) {
            *b = dehex(pair[0])? << 4 | dehex(pair[1])?;
        }

        Ok(Self(bytes))
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:", self.algorithm())?;

        for byte in self.0.iter().cloned() {
            write!(f, "{:02x}", byte)?;
        }

        Ok(())
    }
}

/// A writer that computes the digest of everything written into it
pub struct Hasher(Context);

impl std::fmt::Debug for Hasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Hasher(sha256)")
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    pub fn new() -> Self {
        Self(Context::new(&SHA256))
    }

    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data)
    }

    pub fn finish(self) -> Digest {
        let mut bytes = [0u8; SHA256_OUTPUT_LEN];
        bytes.copy_from_slice(self.0.finish().as_ref());
        Digest(bytes)
    }
}

impl Write for Hasher {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{Digest, Hasher, Invalid};
    use crate::error::Error;

    use std::io::Write;

    const HELLO: &str = "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn compute() {
        assert_eq!(Digest::compute(b"hello").to_string(), HELLO);

        let mut hasher = Hasher::new();
        hasher.write_all(b"hel").unwrap();
        hasher.write_all(b"lo").unwrap();
        assert_eq!(hasher.finish().to_string(), HELLO);
    }

    #[test]
    fn parse_is_case_insensitive() {
        let upper = format!("sha256:{}", HELLO[7..].to_uppercase());
        let digest: Digest = upper.parse().unwrap();
        assert_eq!(digest, Digest::compute(b"hello"));
        assert_eq!(digest.to_string(), HELLO);
    }

    #[test]
    fn rejects() {
        assert_eq!("sha512:00".parse::<Digest>(), Err(Invalid::Algorithm));
        assert_eq!("sha256:abc".parse::<Digest>(), Err(Invalid::Length));

        let bad = format!("sha256:{}", "zz".repeat(32));
        assert_eq!(bad.parse::<Digest>(), Err(Invalid::Encoding));

        let traversal = format!("sha256:../../{}", "0".repeat(58));
        assert!(traversal.parse::<Digest>().is_err());

        assert!(matches!(Digest::parse("md5:00"), Err(Error::UnsupportedDigest(..))));
        assert!(matches!(Digest::parse("sha256:00"), Err(Error::InvalidDigest { .. })));
    }
}
