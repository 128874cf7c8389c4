pub mod gradient_check;
pub mod numerical_check;

pub use gradient_check::{input_gradient_error, numerical_input_gradient};
pub use numerical_check::{check_values, ensure_binary_mask, ensure_finite, ensure_network_finite, NumericalIssue};
