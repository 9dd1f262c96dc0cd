//! Pickled model checkpoints.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_pickle::{DeOptions, SerOptions};

use crate::prelude::*;
use crate::trainer::model::FunkSvd;

/// Checkpoint file for the given fold.
/// Neighbor-blending models are kept apart from the plain ones.
#[must_use]
pub fn path(model_dir: &Path, fold: u32, n_neighbors: usize) -> PathBuf {
    if n_neighbors != 0 {
        model_dir.join(format!("optim_funk_svd_{fold}.pkl"))
    } else {
        model_dir.join(format!("funk_svd_{fold}.pkl"))
    }
}

pub fn save(model: &FunkSvd, path: &Path) -> Result {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create `{}`", parent.display()))?;
        }
    }
    let file =
        File::create(path).with_context(|| format!("failed to create `{}`", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_pickle::to_writer(&mut writer, model, SerOptions::new())
        .with_context(|| format!("failed to write the checkpoint to `{}`", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("failed to flush the checkpoint to `{}`", path.display()))
}

pub fn load(path: &Path) -> Result<FunkSvd> {
    let file = File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
    serde_pickle::from_reader(BufReader::new(file), DeOptions::new())
        .with_context(|| format!("failed to read the checkpoint from `{}`", path.display()))
}
