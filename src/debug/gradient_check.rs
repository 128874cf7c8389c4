use ndarray::{Array2, ArrayView2};

use crate::error::Result;
use crate::network::NeuralNetwork;

/// Central finite-difference estimate of d(sum of outputs)/d(inputs), one entry
/// per input element. This is the quantity the critic's action gradient is built
/// from, so it is what the analytical backward pass gets compared against.
pub fn numerical_input_gradient(
    network: &NeuralNetwork,
    inputs: ArrayView2<f32>,
    epsilon: f32,
) -> Result<Array2<f32>> {
    let mut perturbed = inputs.to_owned();
    let mut gradient = Array2::zeros(inputs.dim());

    for i in 0..inputs.nrows() {
        for j in 0..inputs.ncols() {
            let original = perturbed[[i, j]];

            perturbed[[i, j]] = original + epsilon;
            let plus = network.predict(perturbed.view())?.row(i).sum();

            perturbed[[i, j]] = original - epsilon;
            let minus = network.predict(perturbed.view())?.row(i).sum();

            perturbed[[i, j]] = original;
            gradient[[i, j]] = (plus - minus) / (2.0 * epsilon);
        }
    }

    Ok(gradient)
}

/// Largest absolute difference between the analytical input gradient (from
/// `backward_batch` with unit output errors) and the finite-difference estimate.
pub fn input_gradient_error(network: &mut NeuralNetwork, inputs: ArrayView2<f32>, epsilon: f32) -> Result<f32> {
    let outputs = network.forward_batch(inputs)?;
    let analytical = network.backward_batch(Array2::ones(outputs.dim()).view())?.inputs;
    let numerical = numerical_input_gradient(network, inputs, epsilon)?;

    Ok((&analytical - &numerical)
        .iter()
        .fold(0.0f32, |acc, &d| acc.max(d.abs())))
}
