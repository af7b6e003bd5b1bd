//! Canonical little-endian codec for hint payloads.
//!
//! The wire format follows arkworks canonical serialization: vectors carry a
//! u64 little-endian count, scalars are 32 bytes little-endian and must be
//! canonical (strictly below the field modulus), digests are 32 raw bytes.
//! Encoders exist so tests and transcript generators share one codec with the
//! parser.

use ark_bn254::Fr;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use super::{Digest, HintError, MultiPath};

/// Cursor over a hint payload.
#[derive(Debug)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], HintError> {
        if self.pos + n > self.bytes.len() {
            return Err(HintError::Truncated);
        }
        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_u64(&mut self) -> Result<u64, HintError> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("8 bytes")))
    }

    /// Fails unless the payload was consumed exactly.
    pub fn finish(self) -> Result<(), HintError> {
        let trailing = self.bytes.len() - self.pos;
        if trailing == 0 {
            Ok(())
        } else {
            Err(HintError::TrailingBytes(trailing))
        }
    }
}

pub fn read_scalar(reader: &mut ByteReader<'_>) -> Result<Fr, HintError> {
    let bytes = reader.take(32)?;
    Fr::deserialize_compressed(bytes).map_err(|_| HintError::NonCanonicalScalar)
}

pub fn read_digest(reader: &mut ByteReader<'_>) -> Result<Digest, HintError> {
    let bytes = reader.take(32)?;
    Ok(bytes.try_into().expect("32 bytes"))
}

fn read_count(reader: &mut ByteReader<'_>) -> Result<usize, HintError> {
    let count = reader.read_u64()?;
    // A count beyond the remaining payload can only be garbage; reject before
    // attempting a huge allocation.
    if count > reader.bytes.len() as u64 {
        return Err(HintError::Truncated);
    }
    Ok(count as usize)
}

pub fn read_scalar_vec(reader: &mut ByteReader<'_>) -> Result<Vec<Fr>, HintError> {
    let count = read_count(reader)?;
    (0..count).map(|_| read_scalar(reader)).collect()
}

pub fn read_scalar_matrix(reader: &mut ByteReader<'_>) -> Result<Vec<Vec<Fr>>, HintError> {
    let count = read_count(reader)?;
    (0..count).map(|_| read_scalar_vec(reader)).collect()
}

pub fn read_digest_vec(reader: &mut ByteReader<'_>) -> Result<Vec<Digest>, HintError> {
    let count = read_count(reader)?;
    (0..count).map(|_| read_digest(reader)).collect()
}

pub fn read_u64_vec(reader: &mut ByteReader<'_>) -> Result<Vec<u64>, HintError> {
    let count = read_count(reader)?;
    (0..count).map(|_| reader.read_u64()).collect()
}

pub fn read_multipath(reader: &mut ByteReader<'_>) -> Result<MultiPath, HintError> {
    let leaf_sibling_hashes = read_digest_vec(reader)?;
    let auth_paths_prefix_lengths = read_u64_vec(reader)?;
    let suffix_count = read_count(reader)?;
    let auth_paths_suffixes = (0..suffix_count)
        .map(|_| read_digest_vec(reader))
        .collect::<Result<Vec<_>, _>>()?;
    let leaf_indexes = read_u64_vec(reader)?;
    Ok(MultiPath {
        leaf_sibling_hashes,
        auth_paths_prefix_lengths,
        auth_paths_suffixes,
        leaf_indexes,
    })
}

// Encoders.

pub fn write_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn write_scalar(out: &mut Vec<u8>, scalar: &Fr) {
    scalar
        .serialize_compressed(&mut *out)
        .expect("vector writes are infallible");
}

pub fn write_scalar_vec(out: &mut Vec<u8>, scalars: &[Fr]) {
    write_u64(out, scalars.len() as u64);
    for scalar in scalars {
        write_scalar(out, scalar);
    }
}

pub fn write_scalar_matrix(out: &mut Vec<u8>, rows: &[Vec<Fr>]) {
    write_u64(out, rows.len() as u64);
    for row in rows {
        write_scalar_vec(out, row);
    }
}

pub fn write_digest_vec(out: &mut Vec<u8>, digests: &[Digest]) {
    write_u64(out, digests.len() as u64);
    for digest in digests {
        out.extend_from_slice(digest);
    }
}

pub fn write_u64_vec(out: &mut Vec<u8>, values: &[u64]) {
    write_u64(out, values.len() as u64);
    for value in values {
        write_u64(out, *value);
    }
}

pub fn write_multipath(out: &mut Vec<u8>, path: &MultiPath) {
    write_digest_vec(out, &path.leaf_sibling_hashes);
    write_u64_vec(out, &path.auth_paths_prefix_lengths);
    write_u64(out, path.auth_paths_suffixes.len() as u64);
    for suffix in &path.auth_paths_suffixes {
        write_digest_vec(out, suffix);
    }
    write_u64_vec(out, &path.leaf_indexes);
}

#[cfg(test)]
mod tests {
    use ark_ff::{BigInteger, PrimeField};
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn multipath_round_trip() {
        let path = MultiPath {
            leaf_sibling_hashes: vec![[1u8; 32], [2u8; 32]],
            auth_paths_prefix_lengths: vec![0, 3],
            auth_paths_suffixes: vec![vec![[3u8; 32], [4u8; 32], [5u8; 32], [6u8; 32]], vec![
                [7u8; 32],
            ]],
            leaf_indexes: vec![11, 42],
        };
        let mut bytes = Vec::new();
        write_multipath(&mut bytes, &path);
        let mut reader = ByteReader::new(&bytes);
        let back = read_multipath(&mut reader).unwrap();
        reader.finish().unwrap();
        assert_eq!(back, path);
    }

    #[test]
    fn scalar_matrix_round_trip() {
        let rows = vec![
            vec![Fr::from(1u64), Fr::from(2u64)],
            vec![],
            vec![Fr::from(u64::MAX)],
        ];
        let mut bytes = Vec::new();
        write_scalar_matrix(&mut bytes, &rows);
        let mut reader = ByteReader::new(&bytes);
        let back = read_scalar_matrix(&mut reader).unwrap();
        reader.finish().unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn non_canonical_scalar_is_rejected() {
        // The modulus itself, little-endian: the smallest non-canonical value.
        let modulus = Fr::MODULUS.to_bytes_le();
        let mut reader = ByteReader::new(&modulus);
        assert_eq!(
            read_scalar(&mut reader).unwrap_err(),
            HintError::NonCanonicalScalar
        );
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let mut bytes = Vec::new();
        write_scalar_vec(&mut bytes, &[Fr::from(5u64)]);
        bytes.pop();
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(
            read_scalar_vec(&mut reader).unwrap_err(),
            HintError::Truncated
        );
    }

    #[test]
    fn oversized_count_is_rejected_without_allocation() {
        let mut bytes = Vec::new();
        write_u64(&mut bytes, u64::MAX);
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(
            read_scalar_vec(&mut reader).unwrap_err(),
            HintError::Truncated
        );
    }

    proptest! {
        #[test]
        fn scalar_round_trip(n in any::<u64>()) {
            let scalar = Fr::from(n);
            let mut bytes = Vec::new();
            write_scalar(&mut bytes, &scalar);
            prop_assert_eq!(bytes.len(), 32);
            let mut reader = ByteReader::new(&bytes);
            prop_assert_eq!(read_scalar(&mut reader).unwrap(), scalar);
        }
    }
}
