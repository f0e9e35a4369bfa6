//! Gene identifier reconciliation against the reference annotation

mod engine;
mod standardize;

pub use engine::{GeneReconciler, ReconcileStats, Reconciliation, Resolution};
pub use standardize::{standardize_input_names, standardize_reference_names};
