// ─────────────────────────────────────────────────────────────────────
// SCPN Transport Core — Result Archives
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! `.npz` result archives with `/`-separated entry names (`flux/001`,
//! `pin_powers`, `alpha_x/000/003`, ...).

use ndarray::{Array1, Array2, Array3, ArrayBase, Data, Dimension, Ix1, Ix2, Ix3, OwnedRepr};
use ndarray_npy::{NpzReader, NpzWriter, WritableElement};
use std::fs::File;
use tracing::info;
use transport_types::error::{TransportError, TransportResult};

pub struct OutputWriter {
    writer: NpzWriter<File>,
    path: String,
    n_entries: usize,
}

impl OutputWriter {
    pub fn create(path: &str) -> TransportResult<Self> {
        let file = File::create(path)?;
        Ok(OutputWriter {
            writer: NpzWriter::new(file),
            path: path.to_string(),
            n_entries: 0,
        })
    }

    pub fn write<S, D>(&mut self, name: &str, array: &ArrayBase<S, D>) -> TransportResult<()>
    where
        S: Data,
        S::Elem: WritableElement,
        D: Dimension,
    {
        self.writer
            .add_array(name, array)
            .map_err(|e| TransportError::Output(format!("cannot write '{name}' to '{}': {e}", self.path)))?;
        self.n_entries += 1;
        Ok(())
    }

    pub fn write_slice(&mut self, name: &str, v: &[f64]) -> TransportResult<()> {
        self.write(name, &Array1::from_vec(v.to_vec()))
    }

    pub fn write_usize(&mut self, name: &str, v: usize) -> TransportResult<()> {
        self.write(name, &Array1::from_vec(vec![v as i64]))
    }

    pub fn finish(self) -> TransportResult<()> {
        let (path, n) = (self.path, self.n_entries);
        self.writer
            .finish()
            .map_err(|e| TransportError::Output(format!("cannot finish '{path}': {e}")))?;
        info!(path = %path, entries = n, "archive written");
        Ok(())
    }
}

impl std::fmt::Debug for OutputWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputWriter")
            .field("path", &self.path)
            .field("n_entries", &self.n_entries)
            .finish()
    }
}

/// Zero-padded entry component for group or angle indices.
pub fn entry_index(i: usize) -> String {
    format!("{i:03}")
}

pub struct OutputReader {
    npz: NpzReader<File>,
    path: String,
}

impl OutputReader {
    pub fn open(path: &str) -> TransportResult<Self> {
        let file = File::open(path)?;
        let npz = NpzReader::new(file)
            .map_err(|e| TransportError::Output(format!("cannot open archive '{path}': {e}")))?;
        Ok(OutputReader {
            npz,
            path: path.to_string(),
        })
    }

    /// Entry names with any `.npy` suffix removed.
    pub fn names(&mut self) -> TransportResult<Vec<String>> {
        let names = self
            .npz
            .names()
            .map_err(|e| TransportError::Output(format!("cannot list '{}': {e}", self.path)))?;
        Ok(names
            .into_iter()
            .map(|n| n.strip_suffix(".npy").map(str::to_string).unwrap_or(n))
            .collect())
    }

    pub fn read_array1(&mut self, key: &str) -> TransportResult<Array1<f64>> {
        self.npz
            .by_name::<OwnedRepr<f64>, Ix1>(&format!("{key}.npy"))
            .or_else(|_| self.npz.by_name::<OwnedRepr<f64>, Ix1>(key))
            .map_err(|e| TransportError::Output(format!("cannot read '{key}' from '{}': {e}", self.path)))
    }

    pub fn read_array2(&mut self, key: &str) -> TransportResult<Array2<f64>> {
        self.npz
            .by_name::<OwnedRepr<f64>, Ix2>(&format!("{key}.npy"))
            .or_else(|_| self.npz.by_name::<OwnedRepr<f64>, Ix2>(key))
            .map_err(|e| TransportError::Output(format!("cannot read '{key}' from '{}': {e}", self.path)))
    }

    pub fn read_array3(&mut self, key: &str) -> TransportResult<Array3<f64>> {
        self.npz
            .by_name::<OwnedRepr<f64>, Ix3>(&format!("{key}.npy"))
            .or_else(|_| self.npz.by_name::<OwnedRepr<f64>, Ix3>(key))
            .map_err(|e| TransportError::Output(format!("cannot read '{key}' from '{}': {e}", self.path)))
    }

    pub fn read_usize(&mut self, key: &str) -> TransportResult<usize> {
        let v = self
            .npz
            .by_name::<OwnedRepr<i64>, Ix1>(&format!("{key}.npy"))
            .or_else(|_| self.npz.by_name::<OwnedRepr<i64>, Ix1>(key))
            .map_err(|e| TransportError::Output(format!("cannot read '{key}' from '{}': {e}", self.path)))?;
        v.iter()
            .next()
            .map(|&x| x.max(0) as usize)
            .ok_or_else(|| TransportError::Output(format!("'{key}' in '{}' is empty", self.path)))
    }
}
