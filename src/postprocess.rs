use ndarray::Array1;
use ordered_float::OrderedFloat;

/// Applies softmax to a 1D array (slice) and returns a new Array1<f32>.
pub fn softmax(slice: &Array1<f32>) -> Array1<f32> {
    let max_val = slice.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exp_vals: Array1<f32> = slice.mapv(|x| (x - max_val).exp());
    let sum_exp: f32 = exp_vals.sum();
    exp_vals.mapv(|v| v / sum_exp)
}

/// Index and value of the largest score.
///
/// The first maximum wins on ties and NaN never wins. Returns `None` when no
/// score is comparable (empty input or all NaN).
pub fn argmax_and_max(scores: &Array1<f32>) -> Option<(usize, f32)> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best, (i, &val)| match best {
            _ if val.is_nan() => best,
            Some((_, max_val)) if val <= max_val => best,
            _ => Some((i, val)),
        })
}

/// The `k` highest scores in descending order, ties kept in index order.
pub fn top_k(scores: &Array1<f32>, k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .collect();
    // Stable sort, so equal scores stay lowest-index first.
    ranked.sort_by_key(|&(_, v)| std::cmp::Reverse(OrderedFloat(v)));
    ranked.truncate(k);
    ranked
}
