use ndarray::{ArrayBase, Data, Dimension};

use crate::error::{DdpgError, Result};
use crate::network::NeuralNetwork;

/// Types of numerical issues
#[derive(Debug, Clone, PartialEq)]
pub enum NumericalIssue {
    NaN { count: usize },
    Infinity { count: usize },
}

/// Count NaN and infinite values in any array.
pub fn check_values<S, D>(values: &ArrayBase<S, D>) -> Vec<NumericalIssue>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    let nan_count = values.iter().filter(|v| v.is_nan()).count();
    let inf_count = values.iter().filter(|v| v.is_infinite()).count();

    let mut issues = Vec::new();
    if nan_count > 0 {
        issues.push(NumericalIssue::NaN { count: nan_count });
    }
    if inf_count > 0 {
        issues.push(NumericalIssue::Infinity { count: inf_count });
    }
    issues
}

/// Fail with a `NumericalError` naming `what` if `values` holds NaN or infinity.
pub fn ensure_finite<S, D>(what: &str, values: &ArrayBase<S, D>) -> Result<()>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    let issues = check_values(values);
    if issues.is_empty() {
        return Ok(());
    }
    log::warn!("{} contains non-finite values: {:?}", what, issues);
    Err(DdpgError::NumericalError(format!(
        "{} contains non-finite values: {:?}",
        what, issues
    )))
}

/// Fail unless every entry is exactly 0.0 or 1.0.
pub fn ensure_binary_mask<S, D>(what: &str, values: &ArrayBase<S, D>) -> Result<()>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    match values.iter().find(|&&v| v != 0.0 && v != 1.0) {
        None => Ok(()),
        Some(bad) => Err(DdpgError::invalid_parameter(
            what.to_string(),
            format!("entries must be 0 or 1, found {}", bad),
        )),
    }
}

/// Check every weight and bias of a network.
pub fn ensure_network_finite(what: &str, network: &NeuralNetwork) -> Result<()> {
    for (index, layer) in network.layers.iter().enumerate() {
        ensure_finite(&format!("{} layer {} weights", what, index), &layer.weights)?;
        ensure_finite(&format!("{} layer {} biases", what, index), &layer.biases)?;
    }
    Ok(())
}
