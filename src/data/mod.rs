//! Data structures for count matrices, reference annotations and batches

mod batches;
mod count_matrix;
mod expression;
mod reference;

pub use batches::BatchAssignment;
pub use count_matrix::{CountMatrix, SampleSelector};
pub use expression::ExpressionMatrix;
pub use reference::{ReferenceGene, ReferenceTable};
