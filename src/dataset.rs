//! Sparse rating sets and their line-oriented loaders.
//!
//! A rating set is a block-structured text file: a `userID|count` header
//! line followed by `count` lines of `itemID rating`. Query sets use the
//! same headers with bare item IDs, and item attributes come as
//! `itemID|attr1|attr2|…` lines.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use crate::prelude::*;

pub type UserId = u32;
pub type ItemId = u32;

/// Observed ratings, keyed by user and then by item.
pub type Ratings = AHashMap<UserId, AHashMap<ItemId, f64>>;

/// Candidate items to score, keyed by user. Item order is preserved.
pub type QuerySet = AHashMap<UserId, Vec<ItemId>>;

/// Mean of all observed ratings, or `None` for an empty set.
#[must_use]
pub fn global_mean(ratings: &Ratings) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0_usize;
    for items in ratings.values() {
        for rating in items.values() {
            sum += rating;
            count += 1;
        }
    }
    (count != 0).then(|| sum / count as f64)
}

pub fn load_ratings(path: &Path, n_users: usize, n_items: usize) -> Result<Ratings> {
    let file = File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
    read_ratings(BufReader::new(file), n_users, n_items)
        .with_context(|| format!("failed to read the rating set from `{}`", path.display()))
}

pub fn read_ratings(input: impl BufRead, n_users: usize, n_items: usize) -> Result<Ratings> {
    let mut ratings = Ratings::default();
    let mut lines = input.lines();
    while let Some(line) = lines.next() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (user_id, n_ratings) = parse_header(&line)?;
        validate_user_id(user_id, n_users)?;
        let items = ratings.entry(user_id).or_default();
        for _ in 0..n_ratings {
            let line = lines
                .next()
                .ok_or_else(|| anyhow!("unexpected end of input for user #{user_id}"))??;
            let mut fields = line.split_whitespace();
            let item_id = parse_field(&mut fields, "item ID")?;
            validate_item_id(item_id, n_items)?;
            let rating = parse_field(&mut fields, "rating")?;
            items.insert(item_id, rating);
        }
    }
    Ok(ratings)
}

pub fn load_queries(path: &Path, n_users: usize, n_items: usize) -> Result<QuerySet> {
    let file = File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
    read_queries(BufReader::new(file), n_users, n_items)
        .with_context(|| format!("failed to read the query set from `{}`", path.display()))
}

pub fn read_queries(input: impl BufRead, n_users: usize, n_items: usize) -> Result<QuerySet> {
    let mut queries = QuerySet::default();
    let mut lines = input.lines();
    while let Some(line) = lines.next() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let (user_id, n_items_queried) = parse_header(&line)?;
        validate_user_id(user_id, n_users)?;
        let items = queries.entry(user_id).or_default();
        for _ in 0..n_items_queried {
            let line = lines
                .next()
                .ok_or_else(|| anyhow!("unexpected end of input for user #{user_id}"))??;
            let item_id = ItemId::from_str(line.trim())
                .with_context(|| format!("failed to parse the item ID from `{line}`"))?;
            validate_item_id(item_id, n_items)?;
            items.push(item_id);
        }
    }
    Ok(queries)
}

/// Fixed-size numeric attribute vector per item.
///
/// The dimensionality is taken from the data, all items must agree on it.
pub struct ItemAttributes {
    pub n_dimensions: usize,
    vectors: AHashMap<ItemId, Vec<f64>>,
}

impl ItemAttributes {
    #[must_use]
    pub fn get(&self, item_id: ItemId) -> Option<&[f64]> {
        self.vectors.get(&item_id).map(Vec::as_slice)
    }
}

pub fn load_attributes(path: &Path) -> Result<ItemAttributes> {
    let file = File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
    read_attributes(BufReader::new(file))
        .with_context(|| format!("failed to read the item attributes from `{}`", path.display()))
}

pub fn read_attributes(input: impl BufRead) -> Result<ItemAttributes> {
    let mut vectors: AHashMap<ItemId, Vec<f64>> = AHashMap::default();
    let mut n_dimensions = None;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.trim().split('|');
        let item_id = fields
            .next()
            .map(|field| ItemId::from_str(field))
            .transpose()
            .with_context(|| format!("failed to parse the item ID from `{line}`"))?
            .ok_or_else(|| anyhow!("missing item ID in `{line}`"))?;
        let vector = fields
            .map(|field| match field {
                // Missing attributes come through as the literal `None`.
                "None" => Ok(0.0),
                field => f64::from_str(field)
                    .with_context(|| format!("failed to parse the attribute `{field}`")),
            })
            .collect::<Result<Vec<f64>>>()?;
        match n_dimensions {
            None => {
                n_dimensions = Some(vector.len());
            }
            Some(n_dimensions) if n_dimensions != vector.len() => {
                return Err(anyhow!(
                    "item #{item_id} has {} attributes, expected {n_dimensions}",
                    vector.len(),
                ));
            }
            _ => {}
        }
        vectors.insert(item_id, vector);
    }
    Ok(ItemAttributes {
        n_dimensions: n_dimensions.unwrap_or_default(),
        vectors,
    })
}

fn parse_header(line: &str) -> Result<(UserId, usize)> {
    let (user_id, count) = line
        .trim()
        .split_once('|')
        .ok_or_else(|| anyhow!("`{line}` is not a `userID|count` header"))?;
    let user_id = UserId::from_str(user_id)
        .with_context(|| format!("failed to parse the user ID from `{line}`"))?;
    let count =
        usize::from_str(count).with_context(|| format!("failed to parse the count from `{line}`"))?;
    Ok((user_id, count))
}

fn parse_field<'a, T: FromStr>(
    fields: &mut impl Iterator<Item = &'a str>,
    name: &'static str,
) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    fields
        .next()
        .ok_or_else(|| anyhow!("missing {name}"))?
        .parse()
        .with_context(|| format!("failed to parse the {name}"))
}

fn validate_user_id(user_id: UserId, n_users: usize) -> Result {
    if (user_id as usize) < n_users {
        Ok(())
    } else {
        Err(anyhow!("user #{user_id} is out of range (expected less than {n_users})"))
    }
}

fn validate_item_id(item_id: ItemId, n_items: usize) -> Result {
    if (item_id as usize) < n_items {
        Ok(())
    } else {
        Err(anyhow!("item #{item_id} is out of range (expected less than {n_items})"))
    }
}
