//! Trains the user and item biases and latent factors on a rating set.
//! Implements a stochastic gradient descent for matrix factorization.
//!
//! https://sifter.org/~simon/journal/20061211.html

use std::fs;

use crate::dataset;
use crate::opts::TrainOpts;
use crate::prelude::*;
use crate::trainer::model::FunkSvd;

pub mod checkpoint;
pub mod curve;
pub mod error;
pub mod model;
pub mod rmse;

#[instrument(skip_all, fields(fold = opts.fold))]
pub fn run(opts: TrainOpts) -> Result {
    let train_set =
        dataset::load_ratings(&opts.train_path, opts.model.n_users, opts.model.n_items)?;
    let valid_set =
        dataset::load_ratings(&opts.valid_path, opts.model.n_users, opts.model.n_items)?;
    info!(
        n_train_users = train_set.len(),
        n_valid_users = valid_set.len(),
        "rating sets loaded",
    );

    let checkpoint_path = checkpoint::path(&opts.model_dir, opts.fold, opts.model.n_neighbors);
    let mut model = FunkSvd::new(&opts.model, opts.fold);
    let history = model.fit(&train_set, &valid_set, opts.n_epochs, &checkpoint_path)?;

    fs::create_dir_all(&opts.results_dir)
        .with_context(|| format!("failed to create `{}`", opts.results_dir.display()))?;
    let curve_path = opts.results_dir.join(format!("fold_{}.png", opts.fold));
    curve::render(&history, &curve_path)?;
    info!(
        best_rmse = model.best_rmse,
        curve = %curve_path.display(),
        "finished",
    );
    Ok(())
}
