pub mod error;
pub mod intel;
pub mod validation;
