//! R1CS collaborator input: the constraint system whose satisfiability the
//! incoming proof attests to.
//!
//! Matrices arrive in compressed sparse row form, with cell values stored as
//! handles into an interned coefficient pool. The pool is decoded once and
//! passed by reference; the verifier itself only needs the matrices' shapes,
//! since their contents are bound by the Spark commitments.

use ark_bn254::Fr;
use serde::{Deserialize, Serialize};

use crate::{
    config::ConfigError,
    proof::deserialize::{read_scalar_vec, ByteReader},
};

/// The R1CS document: three matrices plus the interned coefficient pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct R1cs {
    pub a: SparseMatrix,
    pub b: SparseMatrix,
    pub c: SparseMatrix,
    pub interner: InternerBlob,
}

/// A matrix in compressed sparse row form. `values` holds interner handles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparseMatrix {
    pub row_indices: Vec<u64>,
    pub col_indices: Vec<u64>,
    pub values: Vec<u64>,
}

/// Hex-encoded, canonically serialized scalar pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternerBlob {
    pub values: String,
}

/// The decoded pool: a process-wide immutable array once loaded.
#[derive(Debug, Clone)]
pub struct Interner {
    values: Vec<Fr>,
}

impl Interner {
    pub fn get(&self, handle: u64) -> Result<Fr, ConfigError> {
        self.values
            .get(handle as usize)
            .copied()
            .ok_or_else(|| ConfigError::Mismatch(format!("interner handle {handle} out of range")))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl InternerBlob {
    pub fn decode(&self) -> Result<Interner, ConfigError> {
        let bytes = hex::decode(&self.values)
            .map_err(|e| ConfigError::Mismatch(format!("interner pool is not hex: {e}")))?;
        let mut reader = ByteReader::new(&bytes);
        let values = read_scalar_vec(&mut reader)
            .map_err(|e| ConfigError::Mismatch(format!("interner pool is malformed: {e}")))?;
        reader
            .finish()
            .map_err(|e| ConfigError::Mismatch(format!("interner pool is malformed: {e}")))?;
        Ok(Interner { values })
    }
}

/// One nonzero matrix entry, hydrated from the interner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixCell {
    pub row: usize,
    pub column: usize,
    pub value: Fr,
}

impl SparseMatrix {
    /// Number of nonzero entries.
    #[must_use]
    pub fn num_terms(&self) -> usize {
        self.values.len()
    }

    /// Hydrate the compressed rows into explicit cells.
    pub fn cells(&self, interner: &Interner) -> Result<Vec<MatrixCell>, ConfigError> {
        if self.col_indices.len() != self.values.len() {
            return Err(ConfigError::Mismatch(format!(
                "{} column indices for {} values",
                self.col_indices.len(),
                self.values.len()
            )));
        }
        let mut cells = Vec::with_capacity(self.values.len());
        for (row, window) in self.row_indices.windows(2).enumerate() {
            for j in window[0]..window[1] {
                cells.push(self.cell(row, j, interner)?);
            }
        }
        if let Some(&last_start) = self.row_indices.last() {
            let row = self.row_indices.len() - 1;
            for j in last_start..self.values.len() as u64 {
                cells.push(self.cell(row, j, interner)?);
            }
        }
        if cells.len() != self.values.len() {
            return Err(ConfigError::Mismatch(format!(
                "row offsets cover {} of {} values",
                cells.len(),
                self.values.len()
            )));
        }
        Ok(cells)
    }

    fn cell(&self, row: usize, j: u64, interner: &Interner) -> Result<MatrixCell, ConfigError> {
        let j = j as usize;
        let column = *self.col_indices.get(j).ok_or_else(|| {
            ConfigError::Mismatch(format!("column offset {j} out of range"))
        })?;
        Ok(MatrixCell {
            row,
            column: column as usize,
            value: interner.get(self.values[j])?,
        })
    }
}

/// `ceil(log2(n))` with `n >= 1`, the log-size a term count occupies.
#[must_use]
pub fn log2_terms(count: usize) -> usize {
    count.max(1).next_power_of_two().trailing_zeros() as usize
}
