//! Vector normalization.

use super::EmbeddingError;

/// Scales `v` to unit L2 length.
///
/// # Errors
/// `ZeroVector` when the norm is zero or not finite.
pub fn l2_normalize(mut v: Vec<f32>) -> Result<Vec<f32>, EmbeddingError> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(EmbeddingError::ZeroVector);
    }
    for x in &mut v {
        *x /= norm;
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_has_unit_length() {
        let v = l2_normalize(vec![3.0, 4.0]).unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        let n: f32 = v.iter().map(|x| x * x).sum();
        assert!((n - 1.0).abs() < 1e-5);
    }

    #[test]
    fn zero_and_nan_are_rejected() {
        assert!(matches!(l2_normalize(vec![0.0; 4]), Err(EmbeddingError::ZeroVector)));
        assert!(l2_normalize(vec![f32::NAN, 1.0]).is_err());
    }
}
