//! Biased matrix factorization trained by per-rating stochastic gradient
//! descent.
//!
//! https://sifter.org/~simon/journal/20061211.html

use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::{self, ItemId, Ratings, UserId};
use crate::math;
use crate::opts::ModelOpts;
use crate::prelude::*;
use crate::trainer::checkpoint;
use crate::trainer::error::Divergence;
use crate::trainer::rmse::Rmse;

#[derive(Serialize, Deserialize, Clone)]
pub struct FunkSvd {
    pub n_users: usize,
    pub n_items: usize,
    pub n_factors: usize,

    pub learning_rate: f64,
    pub regularization: f64,
    pub n_neighbors: usize,
    pub fold: u32,

    pub global_mean: f64,
    pub user_bias: Vec<f64>,
    pub item_bias: Vec<f64>,
    pub pu: Vec<Vec<f64>>,
    pub qi: Vec<Vec<f64>>,
    pub best_rmse: f64,
}

impl FunkSvd {
    #[must_use]
    pub fn new(opts: &ModelOpts, fold: u32) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            n_users: opts.n_users,
            n_items: opts.n_items,
            n_factors: opts.n_factors,
            learning_rate: opts.learning_rate,
            regularization: opts.regularization,
            n_neighbors: opts.n_neighbors,
            fold,
            global_mean: 0.0,
            user_bias: vec![0.0; opts.n_users],
            item_bias: vec![0.0; opts.n_items],
            pu: random_factors(&mut rng, opts.n_users, opts.n_factors),
            qi: random_factors(&mut rng, opts.n_items, opts.n_factors),
            best_rmse: f64::INFINITY,
        }
    }

    /// Predicted rating for the pair.
    ///
    /// The single scoring path shared by training, evaluation and inference.
    #[must_use]
    pub fn predict_score(&self, user_id: UserId, item_id: ItemId) -> f64 {
        let user_id = user_id as usize;
        let item_id = item_id as usize;
        self.global_mean
            + self.user_bias[user_id]
            + self.item_bias[item_id]
            + math::dot(&self.pu[user_id], &self.qi[item_id])
    }

    /// One regularized SGD step on the pair.
    pub fn update(
        &mut self,
        observed: f64,
        predicted: f64,
        user_id: UserId,
        item_id: ItemId,
    ) -> Result<(), Divergence> {
        let residual = observed - predicted;
        if !residual.is_finite() {
            return Err(Divergence {
                user_id,
                item_id,
                residual,
            });
        }

        let user_id = user_id as usize;
        let item_id = item_id as usize;
        let learning_rate = self.learning_rate;
        let regularization = self.regularization;

        self.user_bias[user_id] +=
            learning_rate * (residual - regularization * self.user_bias[user_id]);
        self.item_bias[item_id] +=
            learning_rate * (residual - regularization * self.item_bias[item_id]);

        // The item update must see the user factors as they were before this step.
        let frozen_pu = self.pu[user_id].clone();
        for (pu, qi) in self.pu[user_id].iter_mut().zip(&self.qi[item_id]) {
            *pu += learning_rate * (residual * qi - regularization * *pu);
        }
        for (qi, frozen_pu) in self.qi[item_id].iter_mut().zip(&frozen_pu) {
            *qi += learning_rate * (residual * frozen_pu - regularization * *qi);
        }
        Ok(())
    }

    /// RMSE over the rating set, `None` for an empty set.
    #[must_use]
    pub fn rmse(&self, ratings: &Ratings) -> Option<f64> {
        let mut rmse = Rmse::default();
        for (user_id, items) in ratings {
            for (item_id, observed) in items {
                rmse.push(observed - self.predict_score(*user_id, *item_id));
            }
        }
        rmse.finalise()
    }

    /// Runs the SGD epochs, checkpointing whenever the validation RMSE
    /// improves, and returns the validation RMSE history with the
    /// pre-training baseline at index 0.
    #[instrument(skip_all, fields(fold = self.fold, n_epochs))]
    pub fn fit(
        &mut self,
        train_set: &Ratings,
        valid_set: &Ratings,
        n_epochs: usize,
        checkpoint_path: &Path,
    ) -> Result<Vec<f64>> {
        self.global_mean =
            dataset::global_mean(train_set).ok_or_else(|| anyhow!("the training set is empty"))?;
        info!(global_mean = self.global_mean, "training set mean");

        let start_instant = Instant::now();
        let baseline_rmse = self
            .rmse(valid_set)
            .ok_or_else(|| anyhow!("the validation set is empty"))?;
        info!(rmse = baseline_rmse, "validation baseline");

        let mut history = Vec::with_capacity(n_epochs + 1);
        history.push(baseline_rmse);

        for epoch in 1..=n_epochs {
            for (user_id, items) in train_set {
                for (item_id, observed) in items {
                    let predicted = self.predict_score(*user_id, *item_id);
                    self.update(*observed, predicted, *user_id, *item_id)?;
                }
            }

            let train_rmse = self
                .rmse(train_set)
                .ok_or_else(|| anyhow!("the training set is empty"))?;
            let valid_rmse = self
                .rmse(valid_set)
                .ok_or_else(|| anyhow!("the validation set is empty"))?;
            history.push(valid_rmse);
            info!(
                epoch,
                train_rmse,
                valid_rmse,
                elapsed = ?start_instant.elapsed(),
                "epoch finished",
            );

            if valid_rmse < self.best_rmse {
                self.best_rmse = valid_rmse;
                checkpoint::save(self, checkpoint_path)?;
                info!(epoch, best_rmse = self.best_rmse, "checkpoint saved");
            }
        }

        Ok(history)
    }
}

/// Uniform `[0, 1)` factor rows.
fn random_factors(rng: &mut impl Rng, n_rows: usize, n_factors: usize) -> Vec<Vec<f64>> {
    (0..n_rows)
        .map(|_| (0..n_factors).map(|_| rng.gen()).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;

    fn model_opts() -> ModelOpts {
        ModelOpts {
            n_users: 2,
            n_items: 2,
            n_factors: 1,
            learning_rate: 0.0005,
            regularization: 0.02,
            n_neighbors: 0,
        }
    }

    fn small_model() -> FunkSvd {
        FunkSvd {
            n_users: 2,
            n_items: 2,
            n_factors: 1,
            learning_rate: 0.0005,
            regularization: 0.02,
            n_neighbors: 0,
            fold: 0,
            global_mean: 3.0,
            user_bias: vec![0.0; 2],
            item_bias: vec![0.0; 2],
            pu: vec![vec![0.5], vec![0.25]],
            qi: vec![vec![0.5], vec![0.25]],
            best_rmse: f64::INFINITY,
        }
    }

    fn ratings(triples: &[(UserId, ItemId, f64)]) -> Ratings {
        let mut ratings = Ratings::default();
        for (user_id, item_id, rating) in triples {
            ratings.entry(*user_id).or_default().insert(*item_id, *rating);
        }
        ratings
    }

    fn scratch_checkpoint(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("funk_trainer_{name}.pkl"));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn new_initialises_factors_in_unit_interval() {
        let model = FunkSvd::new(&model_opts(), 0);
        assert_eq!(model.user_bias, vec![0.0; 2]);
        assert_eq!(model.item_bias, vec![0.0; 2]);
        assert_eq!(model.best_rmse, f64::INFINITY);
        for row in model.pu.iter().chain(&model.qi) {
            assert_eq!(row.len(), 1);
            assert!((0.0..1.0).contains(&row[0]));
        }
    }

    #[test]
    fn update_decreases_squared_residual() -> Result {
        let mut model = small_model();
        let observed = 5.0;
        let predicted = model.predict_score(0, 0);
        model.update(observed, predicted, 0, 0)?;
        let updated = model.predict_score(0, 0);
        assert!((observed - updated).powi(2) < (observed - predicted).powi(2));
        Ok(())
    }

    #[test]
    fn update_does_not_touch_unrelated_pairs() -> Result {
        let mut model = small_model();
        let unrelated = model.predict_score(1, 1);
        let predicted = model.predict_score(0, 0);
        model.update(5.0, predicted, 0, 0)?;
        assert_eq!(model.predict_score(1, 1), unrelated);
        Ok(())
    }

    #[test]
    fn update_rejects_non_finite_residual() {
        let mut model = small_model();
        let error = model.update(f64::INFINITY, 3.0, 0, 0).unwrap_err();
        assert!(!error.residual.is_finite());
        assert_eq!(model.user_bias, vec![0.0; 2]);
    }

    #[test]
    fn rmse_is_zero_for_exact_predictions() {
        let mut model = small_model();
        model.pu = vec![vec![0.0], vec![0.0]];
        model.qi = vec![vec![0.0], vec![0.0]];
        let ratings = ratings(&[(0, 0, 3.0), (1, 1, 3.0)]);
        assert_eq!(model.rmse(&ratings), Some(0.0));
    }

    #[test]
    fn fit_zero_epochs_only_sets_the_global_mean() -> Result {
        let checkpoint_path = scratch_checkpoint("fit_zero_epochs");
        let train_set = ratings(&[(0, 0, 5.0), (0, 1, 1.0), (1, 0, 1.0)]);
        let valid_set = ratings(&[(1, 1, 5.0)]);

        let mut model = FunkSvd::new(&model_opts(), 0);
        let frozen_pu = model.pu.clone();
        let frozen_user_bias = model.user_bias.clone();
        let history = model.fit(&train_set, &valid_set, 0, &checkpoint_path)?;

        assert!((model.global_mean - 7.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(history.len(), 1);
        assert_eq!(model.best_rmse, f64::INFINITY);
        assert_eq!(model.pu, frozen_pu);
        assert_eq!(model.user_bias, frozen_user_bias);
        assert!(!checkpoint_path.exists());
        Ok(())
    }

    #[test]
    fn fit_one_epoch_improves_on_the_sentinel() -> Result {
        let checkpoint_path = scratch_checkpoint("fit_one_epoch");
        let train_set = ratings(&[(0, 0, 5.0), (0, 1, 1.0), (1, 0, 1.0)]);
        let valid_set = ratings(&[(1, 1, 5.0)]);

        let mut model = FunkSvd::new(&model_opts(), 0);
        let history = model.fit(&train_set, &valid_set, 1, &checkpoint_path)?;

        assert!((model.global_mean - 7.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(history.len(), 2);
        assert!(history[1].is_finite());
        assert!(history[1] >= 0.0);
        assert_eq!(model.best_rmse, history[1]);
        assert!(checkpoint_path.exists());
        fs::remove_file(&checkpoint_path)?;
        Ok(())
    }

    #[test]
    fn fit_aborts_on_divergence_without_a_checkpoint() {
        let checkpoint_path = scratch_checkpoint("fit_diverged");
        // The mean is zero, so the residuals start at ±1e200 and the
        // absurd learning rate blows the parameters up within a few epochs.
        let train_set = ratings(&[(0, 0, 1e200), (0, 1, -1e200)]);
        let valid_set = ratings(&[(1, 0, 1e200)]);

        let mut model = FunkSvd::new(
            &ModelOpts {
                learning_rate: 1000.0,
                ..model_opts()
            },
            0,
        );
        let error = model
            .fit(&train_set, &valid_set, 10, &checkpoint_path)
            .unwrap_err();
        assert!(error.downcast_ref::<Divergence>().is_some());
        assert!(!checkpoint_path.exists());
    }
}
