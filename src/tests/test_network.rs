use ndarray::{array, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;

use crate::activations::Activation;
use crate::debug::{input_gradient_error, numerical_input_gradient};
use crate::error::DdpgError;
use crate::layers::WeightInit;
use crate::network::NeuralNetwork;
use crate::optimizer::{Adam, OptimizerKind, OptimizerWrapper, SGD};

fn tanh_network(seed: u64) -> NeuralNetwork {
    let mut rng = StdRng::seed_from_u64(seed);
    NeuralNetwork::new(
        &[3, 8, 2],
        &[Activation::Tanh, Activation::Linear],
        OptimizerWrapper::SGD(SGD::new()),
        &mut rng,
    )
    .unwrap()
}

#[test]
fn test_network_creation() {
    let network = tanh_network(0);
    assert_eq!(network.layers.len(), 2);
    assert_eq!(network.input_size(), 3);
    assert_eq!(network.output_size(), 2);
    assert_eq!(network.parameter_count(), 3 * 8 + 8 + 8 * 2 + 2);
}

#[test]
fn test_network_creation_validates_layout() {
    let mut rng = StdRng::seed_from_u64(0);
    let optimizer = OptimizerKind::Sgd.build();
    assert!(NeuralNetwork::new(&[3], &[], optimizer.clone(), &mut rng).is_err());
    assert!(matches!(
        NeuralNetwork::new(&[3, 4, 1], &[Activation::Relu], optimizer, &mut rng),
        Err(DdpgError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_predict_matches_forward_batch() {
    let mut network = tanh_network(1);
    let inputs = array![[0.1, -0.2, 0.3], [1.0, 0.5, -0.5]];
    let predicted = network.predict(inputs.view()).unwrap();
    let forward = network.forward_batch(inputs.view()).unwrap();
    assert_eq!(predicted, forward);
    assert_eq!(predicted.dim(), (2, 2));
}

#[test]
fn test_predict_rejects_wrong_width() {
    let network = tanh_network(2);
    assert!(matches!(
        network.predict(Array2::zeros((1, 4)).view()),
        Err(DdpgError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_input_gradients_match_finite_differences() {
    let mut network = tanh_network(3);
    let inputs = array![[0.2, -0.4, 0.6], [-1.0, 0.3, 0.1]];
    let error = input_gradient_error(&mut network, inputs.view(), 1e-2).unwrap();
    assert!(error < 1e-2, "input gradient error {}", error);

    let numerical = numerical_input_gradient(&network, inputs.view(), 1e-2).unwrap();
    assert_eq!(numerical.dim(), inputs.dim());
}

#[test]
fn test_backward_without_forward_fails() {
    let network = tanh_network(4);
    assert!(matches!(
        network.backward_batch(Array2::ones((1, 2)).view()),
        Err(DdpgError::TrainingError(_))
    ));
}

#[test]
fn test_train_minibatch_reduces_loss() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut network = NeuralNetwork::new(
        &[2, 16, 1],
        &[Activation::Tanh, Activation::Linear],
        OptimizerKind::default().build(),
        &mut rng,
    )
    .unwrap();
    let inputs = array![[0.0, 1.0], [1.0, 0.0], [0.5, 0.5], [-1.0, 0.2]];
    let targets = array![[1.0], [-1.0], [0.0], [0.5]];

    let first = network.train_minibatch(inputs.view(), targets.view(), 0.01).unwrap();
    let mut last = first;
    for _ in 0..200 {
        last = network.train_minibatch(inputs.view(), targets.view(), 0.01).unwrap();
    }
    assert!(last < first, "loss went from {} to {}", first, last);
    assert!(network.is_finite());
}

#[test]
fn test_train_minibatch_rejects_target_shape() {
    let mut network = tanh_network(6);
    let inputs = Array2::zeros((3, 3));
    let targets = Array2::zeros((3, 1));
    assert!(network.train_minibatch(inputs.view(), targets.view(), 0.1).is_err());
}

#[test]
fn test_soft_update_blends_parameters() {
    let mut rng = StdRng::seed_from_u64(7);
    let zeros = NeuralNetwork::with_inits(
        &[2, 2],
        &[Activation::Linear],
        &[WeightInit::Zeros],
        OptimizerKind::Sgd.build(),
        &mut rng,
    )
    .unwrap();
    let mut target = zeros.clone();
    let mut online = zeros;
    online.layers[0].weights.fill(1.0);
    online.layers[0].biases.fill(-2.0);

    target.soft_update_from(&online, 0.25).unwrap();
    assert!(target.layers[0].weights.iter().all(|w| (w - 0.25).abs() < 1e-7));
    assert!(target.layers[0].biases.iter().all(|b| (b + 0.5).abs() < 1e-7));

    target.soft_update_from(&online, 1.0).unwrap();
    assert_eq!(target.layers[0].weights, online.layers[0].weights);

    let deeper = tanh_network(8);
    assert!(target.soft_update_from(&deeper, 0.5).is_err());
}

#[test]
fn test_save_and_load() {
    let network = tanh_network(9);
    let dir = tempdir().unwrap();
    let path = dir.path().join("network.bin");
    network.save(&path).unwrap();

    let loaded = NeuralNetwork::load(&path).unwrap();
    let inputs = array![[0.3, 0.2, 0.1]];
    assert_eq!(network.predict(inputs.view()).unwrap(), loaded.predict(inputs.view()).unwrap());
}

#[test]
fn test_load_missing_file() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        NeuralNetwork::load(dir.path().join("absent.bin")),
        Err(DdpgError::IoError(_))
    ));
}

fn linear_network(optimizer: OptimizerWrapper) -> NeuralNetwork {
    let mut rng = StdRng::seed_from_u64(10);
    NeuralNetwork::with_inits(&[2, 2], &[Activation::Linear], &[WeightInit::Zeros], optimizer, &mut rng).unwrap()
}

#[test]
fn test_apply_gradients_rejects_non_finite_gradients() {
    let mut network = tanh_network(11);
    let before = network.clone();
    let mut gradients: Vec<_> = network
        .layers
        .iter()
        .map(|l| (Array2::zeros(l.weights.dim()), ndarray::Array1::zeros(l.biases.len())))
        .collect();
    gradients[1].1[0] = f32::NAN;

    assert!(matches!(
        network.apply_gradients(&gradients, 0.1),
        Err(DdpgError::NumericalError(_))
    ));
    for (a, b) in network.layers.iter().zip(&before.layers) {
        assert_eq!(a.weights, b.weights);
        assert_eq!(a.biases, b.biases);
    }
}

#[test]
fn test_apply_gradients_restores_parameters_on_overflow() {
    let mut network = linear_network(OptimizerWrapper::SGD(SGD::new()));
    network.layers[0].weights.fill(f32::MAX);
    let gradients = vec![(Array2::from_elem((2, 2), -f32::MAX), ndarray::Array1::zeros(2))];

    assert!(matches!(
        network.apply_gradients(&gradients, 1.0),
        Err(DdpgError::NumericalError(_))
    ));
    assert!(network.layers[0].weights.iter().all(|&w| w == f32::MAX));
    assert!(network.is_finite());
}

#[test]
fn test_apply_gradients_restores_optimizer_state_on_overflow() {
    let mut network = linear_network(OptimizerWrapper::Adam(Adam::default()));
    network.layers[0].weights.fill(f32::MAX);
    let gradients = vec![(Array2::from_elem((2, 2), -1.0), ndarray::Array1::zeros(2))];

    assert!(network.apply_gradients(&gradients, f32::MAX).is_err());
    assert!(network.is_finite());
    match &network.optimizer {
        OptimizerWrapper::Adam(adam) => assert_eq!(adam.t, 1),
        other => panic!("unexpected optimizer {:?}", other),
    }
}

#[test]
fn test_apply_gradients_reports_bias_shape() {
    let mut network = linear_network(OptimizerWrapper::SGD(SGD::new()));
    let gradients = vec![(Array2::zeros((2, 2)), ndarray::Array1::zeros(3))];
    match network.apply_gradients(&gradients, 0.1) {
        Err(DdpgError::DimensionMismatch { expected, actual }) => {
            assert!(expected.contains("biases"), "{}", expected);
            assert_eq!(actual, "3");
        }
        other => panic!("expected a bias shape mismatch, got {:?}", other),
    }
}

#[test]
fn test_train_minibatch_rejects_overflowing_loss() {
    let mut network = linear_network(OptimizerWrapper::SGD(SGD::new()));
    let inputs = array![[1.0, 1.0]];
    let targets = array![[3e38, -3e38]];
    assert!(matches!(
        network.train_minibatch(inputs.view(), targets.view(), 0.1),
        Err(DdpgError::NumericalError(_))
    ));
    assert!(network.layers[0].weights.iter().all(|&w| w == 0.0));
}
