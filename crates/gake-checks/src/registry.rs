use std::fmt;

/// Digest width in bytes (512 bits of BLAKE3 extended output).
pub const DIGEST_LEN: usize = 64;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetDigest([u8; DIGEST_LEN]);

impl AssetDigest {
    /// Digest of exactly `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        let mut h = blake3::Hasher::new();
        h.update(bytes);
        let mut out = [0u8; DIGEST_LEN];
        h.finalize_xof().fill(&mut out);
        Self(out)
    }

    #[inline]
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses 128 hex digits. Meant for `const` registry entries, where a malformed literal
    /// fails the build.
    pub const fn from_hex(hex: &str) -> Self {
        let s = hex.as_bytes();
        assert!(s.len() == DIGEST_LEN * 2, "asset digest must be 128 hex digits");

        let mut out = [0u8; DIGEST_LEN];
        let mut i = 0;
        while i < DIGEST_LEN {
            out[i] = (nibble(s[2 * i]) << 4) | nibble(s[2 * i + 1]);
            i += 1;
        }
        Self(out)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

const fn nibble(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => panic!("invalid hex digit in asset digest"),
    }
}

impl fmt::Display for AssetDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for AssetDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetDigest({self})")
    }
}

/// One required data file. Paths are relative to the configured assets root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub digest: AssetDigest,
    pub size: u64,
    pub path: &'static str,
}

/// Every file Gake ships. Checked exhaustively on each start; order carries no meaning.
pub const ASSET_REGISTRY: &[AssetDescriptor] = &[
    AssetDescriptor {
        digest: AssetDigest::from_hex(
            "db8658077ef08da7fec77407f2275374b3259f1e5175b0bca3ef238caa416dd4\
             e041b861e9eb46734299b23cc5a383f5f48fa3fe9f8ddeed4681887c41610f23",
        ),
        size: 93,
        path: "Textures.png",
    },
    AssetDescriptor {
        digest: AssetDigest::from_hex(
            "2a4c956008e2db116c8a56fd07c76f4fd64a99b48d65d33fcfa5bf4f5a765d57\
             91110a027fcc89440919dc7e98ba1f1ecfc19f627ed5583ed9330c91d4a72559",
        ),
        size: 458,
        path: "Log_Splashes.txt",
    },
];
