//! Input/Output operations for matrices, annotations and batch files

mod concat;
mod csv;

pub use self::concat::{concatenate_counts, sample_name_from_file, ConcatOptions};
pub use self::csv::{
    read_batches, read_count_matrix, read_reference, read_reference_genes, write_count_matrix,
    write_expression_matrix, write_missing_genes, write_reference, write_sample_major,
};
