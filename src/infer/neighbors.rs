//! Attribute-similarity neighbor adjustment for the blended scores.

use crate::dataset::{ItemAttributes, ItemId};
use crate::math;
use crate::prelude::*;

/// Sums the user's ratings of their `n_neighbors` rated items that are the
/// most attribute-similar to the target item.
///
/// Items without attributes, and pairs whose similarity is undefined (a
/// zero-magnitude attribute vector), are skipped.
#[must_use]
pub fn adjustment(
    attributes: &ItemAttributes,
    rated: &AHashMap<ItemId, f64>,
    target_id: ItemId,
    n_neighbors: usize,
) -> f64 {
    let target = match attributes.get(target_id) {
        Some(target) => target,
        None => return 0.0,
    };
    let mut similarities = rated
        .keys()
        .filter_map(|&item_id| {
            let similarity = math::cosine_similarity(target, attributes.get(item_id)?);
            similarity.is_finite().then(|| (item_id, similarity))
        })
        .collect::<Vec<_>>();
    similarities.sort_unstable_by(|(_, lhs), (_, rhs)| rhs.total_cmp(lhs));
    similarities
        .iter()
        .take(n_neighbors)
        .map(|(item_id, _)| rated[item_id])
        .sum()
}
