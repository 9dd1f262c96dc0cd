use thiserror::Error;

use crate::dataset::{ItemId, UserId};

/// Fatal numerical divergence: a residual went non-finite during a gradient
/// step. Aborts the training run, nothing is checkpointed.
#[derive(Debug, Error)]
#[error("non-finite residual {residual} at user #{user_id}, item #{item_id}")]
pub struct Divergence {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub residual: f64,
}
