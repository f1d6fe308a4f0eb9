use crate::VecMathError;

fn check_len(a: &[f32], b: &[f32]) -> Result<(), VecMathError> {
    if a.len() != b.len() {
        return Err(VecMathError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    Ok(())
}

/// Euclidean (L2) distance between two vectors.
pub fn distance(a: &[f32], b: &[f32]) -> Result<f64, VecMathError> {
    check_len(a, b)?;
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    Ok(sum.sqrt())
}

/// L2 norm of a vector.
pub fn norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt()
}

/// Returns true if the vector cannot be compared by direction: zero norm,
/// or any NaN/infinite component.
pub fn is_degenerate(v: &[f32]) -> bool {
    if v.iter().any(|x| !x.is_finite()) {
        return true;
    }
    norm(v) == 0.0
}

/// Cosine similarity in `[-1, 1]`.
///
/// Fails with [`VecMathError::DegenerateVector`] if either vector has zero
/// norm. The result is clamped to absorb rounding error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, VecMathError> {
    check_len(a, b)?;

    let mut dot: f64 = 0.0;
    let mut norm_a: f64 = 0.0;
    let mut norm_b: f64 = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(VecMathError::DegenerateVector);
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0))
}

/// Componentwise arithmetic mean of a non-empty set of same-length vectors.
pub fn mean<V: AsRef<[f32]>>(vectors: &[V]) -> Result<Vec<f32>, VecMathError> {
    let first = vectors.first().ok_or(VecMathError::EmptyInput)?.as_ref();
    let dim = first.len();

    let mut acc = vec![0.0f64; dim];
    for v in vectors {
        let v = v.as_ref();
        if v.len() != dim {
            return Err(VecMathError::DimensionMismatch {
                expected: dim,
                got: v.len(),
            });
        }
        for (sum, &x) in acc.iter_mut().zip(v) {
            *sum += x as f64;
        }
    }

    let n = vectors.len() as f64;
    Ok(acc.into_iter().map(|s| (s / n) as f32).collect())
}
