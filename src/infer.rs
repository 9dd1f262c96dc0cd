//! Batch scoring of query items against a trained checkpoint.

use std::fs::{self, File};
use std::io::{BufWriter, Write};

use itertools::Itertools;

use crate::dataset::{self, ItemAttributes, ItemId, Ratings, UserId};
use crate::opts::InferOpts;
use crate::prelude::*;
use crate::trainer::checkpoint;
use crate::trainer::model::FunkSvd;

pub mod neighbors;

#[instrument(skip_all)]
pub fn run(opts: InferOpts) -> Result {
    let model = checkpoint::load(&opts.model_path)?;
    info!(
        n_users = model.n_users,
        n_items = model.n_items,
        n_factors = model.n_factors,
        n_neighbors = model.n_neighbors,
        best_rmse = model.best_rmse,
        "checkpoint loaded",
    );

    let train_set = dataset::load_ratings(&opts.train_path, model.n_users, model.n_items)?;
    let queries = dataset::load_queries(&opts.query_path, model.n_users, model.n_items)?;
    let attributes = match (model.n_neighbors, &opts.attribute_path) {
        (0, _) => None,
        (_, Some(path)) => Some(dataset::load_attributes(path)?),
        (_, None) => {
            return Err(anyhow!("the model blends neighbor scores, pass `--attributes`"));
        }
    };

    if let Some(parent) = opts.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create `{}`", parent.display()))?;
        }
    }
    let file = File::create(&opts.output_path)
        .with_context(|| format!("failed to create `{}`", opts.output_path.display()))?;
    let mut output = BufWriter::new(file);
    for user_id in queries.keys().copied().sorted() {
        let items = &queries[&user_id];
        writeln!(output, "{}|{}", user_id, items.len())?;
        for (item_id, score) in score_user(&model, &train_set, attributes.as_ref(), user_id, items)
        {
            writeln!(output, "{item_id} {score}")?;
        }
    }
    output.flush()?;

    info!(
        n_users = queries.len(),
        output = %opts.output_path.display(),
        "finished",
    );
    Ok(())
}

/// Scores the candidate items for one user, in the query order.
fn score_user(
    model: &FunkSvd,
    train_set: &Ratings,
    attributes: Option<&ItemAttributes>,
    user_id: UserId,
    items: &[ItemId],
) -> Vec<(ItemId, f64)> {
    items
        .iter()
        .map(|&item_id| {
            let mut score = model.predict_score(user_id, item_id);
            if model.n_neighbors != 0 {
                let adjustment = match (attributes, train_set.get(&user_id)) {
                    (Some(attributes), Some(rated)) => {
                        neighbors::adjustment(attributes, rated, item_id, model.n_neighbors)
                    }
                    _ => 0.0,
                };
                score = (score + adjustment) / (model.n_neighbors + 1) as f64;
            }
            (item_id, score)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> FunkSvd {
        FunkSvd {
            n_users: 2,
            n_items: 2,
            n_factors: 1,
            learning_rate: 0.0005,
            regularization: 0.02,
            n_neighbors: 0,
            fold: 0,
            global_mean: 3.0,
            user_bias: vec![0.5, -0.5],
            item_bias: vec![0.25, -0.25],
            pu: vec![vec![0.5], vec![0.25]],
            qi: vec![vec![0.5], vec![0.25]],
            best_rmse: 1.0,
        }
    }

    #[test]
    fn score_user_without_neighbors_is_the_raw_prediction() {
        let model = model();
        let mut train_set = Ratings::default();
        train_set.entry(0).or_default().insert(0, 5.0);

        let scores = score_user(&model, &train_set, None, 0, &[0, 1]);

        assert_eq!(
            scores,
            vec![(0, model.predict_score(0, 0)), (1, model.predict_score(0, 1))],
        );
    }

    #[test]
    fn score_user_blends_the_neighbor_adjustment() {
        let mut model = model();
        model.n_neighbors = 1;
        let mut train_set = Ratings::default();
        train_set.entry(0).or_default().insert(0, 5.0);
        let attributes =
            dataset::read_attributes(std::io::Cursor::new("0|1.0|0.0\n1|1.0|0.0\n")).unwrap();

        let scores = score_user(&model, &train_set, Some(&attributes), 0, &[1]);

        // Item #0 is the only rated neighbor, so its rating is blended in.
        let expected = (model.predict_score(0, 1) + 5.0) / 2.0;
        assert_eq!(scores, vec![(1, expected)]);
    }
}
