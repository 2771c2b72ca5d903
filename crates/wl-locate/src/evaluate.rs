//! Scoring recovered leak magnitudes against the injected truth.

use crate::error::{LocateResult, check_len};

/// Sum of absolute differences between recovered and true magnitudes.
pub fn model_error(recovered: &[f64], truth: &[f64]) -> LocateResult<f64> {
    check_len("recovered magnitudes", truth.len(), recovered.len())?;
    Ok(wl_core::l1_distance(recovered, truth))
}

/// Absolute difference per node.
pub fn per_node_error(recovered: &[f64], truth: &[f64]) -> LocateResult<Vec<f64>> {
    check_len("recovered magnitudes", truth.len(), recovered.len())?;
    Ok(recovered
        .iter()
        .zip(truth)
        .map(|(r, t)| (r - t).abs())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_error() {
        let err = model_error(&[0.0, 3.5, 0.0], &[0.0, 4.0, 1.0]).unwrap();
        assert!((err - 1.5).abs() < 1e-12);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        assert!(model_error(&[0.0], &[0.0, 1.0]).is_err());
    }

    #[test]
    fn per_node_matches_total() {
        let r = [1.0, 2.0, 0.0];
        let t = [0.0, 2.5, 1.0];
        let parts = per_node_error(&r, &t).unwrap();
        assert_eq!(parts, vec![1.0, 0.5, 1.0]);
        assert!((parts.iter().sum::<f64>() - model_error(&r, &t).unwrap()).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn error_is_nonnegative(pairs in prop::collection::vec((0.0..100.0f64, 0.0..100.0f64), 0..32)) {
            let (r, t): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
            prop_assert!(model_error(&r, &t).unwrap() >= 0.0);
        }

        #[test]
        fn identical_vectors_score_zero(x in prop::collection::vec(0.0..100.0f64, 0..32)) {
            prop_assert_eq!(model_error(&x, &x).unwrap(), 0.0);
        }
    }
}
