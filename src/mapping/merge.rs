//! Merging several source values into one

use crate::profile::MergeOp;

/// Combine source values with a merge operation
///
/// `values` holds one entry per configured source, `None` where the source's
/// device has no cached data yet. Missing entries are skipped.
///
/// # Returns
/// The merged value, or `None` if no source had a value (the mapping does not
/// fire this tick)
pub fn resolve(op: MergeOp, values: &[Option<f32>]) -> Option<f32> {
    let mut present = values.iter().flatten().copied();
    let first = present.next()?;

    // A lone source is passed through whatever the operation says
    if values.len() == 1 {
        return Some(first);
    }

    let merged = match op {
        MergeOp::First => first,
        MergeOp::Minimum => present.fold(first, f32::min),
        MergeOp::Maximum => present.fold(first, f32::max),
        MergeOp::Sum => present.fold(first, |acc, v| acc + v).clamp(-1.0, 1.0),
        MergeOp::Average => {
            let (sum, count) = present.fold((first, 1u32), |(s, n), v| (s + v, n + 1));
            sum / count as f32
        }
    };

    Some(merged)
}

/// Merge button states (pressed = 1.0); pressed if the merged value is ≥ 0.5
///
/// Under this rule `Maximum`/`Sum` act as OR, `Minimum` as AND and `Average`
/// as a majority vote.
pub fn resolve_pressed(op: MergeOp, states: &[Option<bool>]) -> Option<bool> {
    let values: Vec<Option<f32>> = states
        .iter()
        .map(|s| s.map(crate::input::cache::bool_to_value))
        .collect();
    resolve(op, &values).map(|v| v >= 0.5)
}
