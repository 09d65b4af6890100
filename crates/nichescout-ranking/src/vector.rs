/// Cosine similarity `dot(a, b) / (‖a‖ · ‖b‖)`, accumulated in `f64`.
///
/// Returns `None` for empty or dimension-mismatched inputs, zero-norm
/// vectors, and vectors containing non-finite values.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let similarity = (dot / denom).clamp(-1.0, 1.0) as f32;
    Some(similarity)
}
