//! Delimited-file reading and writing for count matrices, annotations and batches

use std::path::Path;

use csv::{ReaderBuilder, Trim, WriterBuilder};
use ndarray::Array2;
use serde::Deserialize;

use crate::data::{BatchAssignment, CountMatrix, ExpressionMatrix, ReferenceGene, ReferenceTable, SampleSelector};
use crate::error::{PreproError, Result};

/// Read a raw count matrix
///
/// Expected format: first column is the gene identifier, first row holds column
/// names. Only columns accepted by `selector` are parsed as counts; any other
/// column (stray metadata, free text) is skipped without being inspected.
pub fn read_count_matrix<P: AsRef<Path>>(
    path: P,
    delimiter: u8,
    selector: &SampleSelector,
) -> Result<CountMatrix> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::All)
        .from_path(path)?;

    let header = reader.headers()?.clone();
    if header.len() < 2 {
        return Err(PreproError::InvalidCountMatrix {
            reason: format!(
                "{}: expected a gene column and at least one sample column (wrong separator?)",
                path.display()
            ),
        });
    }

    let sample_cols: Vec<usize> = (1..header.len())
        .filter(|&j| selector.is_sample(&header[j]))
        .collect();
    let sample_ids: Vec<String> = sample_cols.iter().map(|&j| header[j].to_string()).collect();

    let mut gene_ids: Vec<String> = Vec::new();
    let mut values: Vec<f64> = Vec::new();

    for record in reader.records() {
        let record = record?;
        let gene_id = record.get(0).unwrap_or_default().to_string();

        for &j in &sample_cols {
            let field = record.get(j).unwrap_or_default();
            let value = field.parse::<f64>().map_err(|_| PreproError::InvalidCountMatrix {
                reason: format!(
                    "invalid count '{}' for gene '{}' in column '{}'",
                    field, gene_id, &header[j]
                ),
            })?;
            values.push(value);
        }
        gene_ids.push(gene_id);
    }

    if gene_ids.is_empty() {
        return Err(PreproError::EmptyData {
            reason: format!("no genes found in {}", path.display()),
        });
    }

    let counts = Array2::from_shape_vec((gene_ids.len(), sample_ids.len()), values).map_err(|e| {
        PreproError::InvalidCountMatrix {
            reason: e.to_string(),
        }
    })?;

    CountMatrix::new(counts, gene_ids, sample_ids)
}

/// Write a genes x samples count matrix as comma-separated values
///
/// The index column has an empty header, so the file reads back with
/// [`read_count_matrix`] and with the usual data-frame tools.
pub fn write_count_matrix<P: AsRef<Path>>(path: P, matrix: &CountMatrix) -> Result<()> {
    write_labelled(
        path,
        "",
        matrix.gene_ids(),
        matrix.sample_ids(),
        |i, j| matrix.counts()[[i, j]],
    )
}

/// Write the Missing Gene Report: zero rows of absent reference genes, indexed by `id`
pub fn write_missing_genes<P: AsRef<Path>>(path: P, missing: &CountMatrix) -> Result<()> {
    write_labelled(
        path,
        "id",
        missing.gene_ids(),
        missing.sample_ids(),
        |i, j| missing.counts()[[i, j]],
    )
}

/// Write a genes x samples normalized matrix as comma-separated values
pub fn write_expression_matrix<P: AsRef<Path>>(path: P, matrix: &ExpressionMatrix) -> Result<()> {
    write_labelled(
        path,
        "",
        matrix.gene_ids(),
        matrix.sample_ids(),
        |i, j| matrix.values()[[i, j]],
    )
}

/// Write a normalized matrix in sample x gene orientation with an `id` index column
pub fn write_sample_major<P: AsRef<Path>>(path: P, matrix: &ExpressionMatrix) -> Result<()> {
    write_labelled(
        path,
        "id",
        matrix.sample_ids(),
        matrix.gene_ids(),
        |i, j| matrix.values()[[j, i]],
    )
}

fn write_labelled<P, F>(
    path: P,
    index_name: &str,
    row_ids: &[String],
    col_ids: &[String],
    value: F,
) -> Result<()>
where
    P: AsRef<Path>,
    F: Fn(usize, usize) -> f64,
{
    let mut writer = WriterBuilder::new().from_path(path)?;

    let mut header = Vec::with_capacity(col_ids.len() + 1);
    header.push(index_name.to_string());
    header.extend(col_ids.iter().cloned());
    writer.write_record(&header)?;

    for (i, row_id) in row_ids.iter().enumerate() {
        let mut record = Vec::with_capacity(col_ids.len() + 1);
        record.push(row_id.clone());
        record.extend((0..col_ids.len()).map(|j| value(i, j).to_string()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Annotation row as written by data-frame tools: lengths may carry a `.0`
#[derive(Debug, Deserialize)]
struct RawReferenceRow {
    id: String,
    chr: String,
    name: String,
    biotype: String,
    length: f64,
}

/// Read reference gene annotations (`id,chr,name,biotype,length`)
pub fn read_reference_genes<P: AsRef<Path>>(path: P) -> Result<Vec<ReferenceGene>> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_path(path)?;
    let mut genes = Vec::new();

    for row in reader.deserialize::<RawReferenceRow>() {
        let row = row?;
        if !row.length.is_finite() || row.length < 1.0 {
            return Err(PreproError::InvalidReference {
                reason: format!("gene '{}' has invalid length {}", row.id, row.length),
            });
        }
        genes.push(ReferenceGene {
            id: row.id.trim().to_string(),
            chr: row.chr,
            name: row.name,
            biotype: row.biotype,
            length: row.length.round() as u64,
        });
    }

    Ok(genes)
}

/// Read the filtered reference annotation used as the reconciliation target
pub fn read_reference<P: AsRef<Path>>(path: P) -> Result<ReferenceTable> {
    let genes = read_reference_genes(path.as_ref())?;
    if genes.is_empty() {
        return Err(PreproError::EmptyData {
            reason: format!("no genes in reference {}", path.as_ref().display()),
        });
    }
    ReferenceTable::new(genes)
}

/// Write reference gene annotations with an `id,chr,name,biotype,length` header
pub fn write_reference<P: AsRef<Path>>(path: P, genes: &[ReferenceGene]) -> Result<()> {
    let mut writer = WriterBuilder::new().from_path(path)?;
    for gene in genes {
        writer.serialize(gene)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a batch assignment file
///
/// Expected format: first column is the sample ID, one column named `batch`.
pub fn read_batches<P: AsRef<Path>>(path: P) -> Result<BatchAssignment> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_path(path)?;

    let header = reader.headers()?.clone();
    let batch_col = header
        .iter()
        .position(|h| h == "batch")
        .ok_or_else(|| PreproError::InvalidInput {
            reason: format!("{} has no 'batch' column", path.display()),
        })?;

    let mut sample_ids = Vec::new();
    let mut batches = Vec::new();
    for record in reader.records() {
        let record = record?;
        sample_ids.push(record.get(0).unwrap_or_default().to_string());
        batches.push(record.get(batch_col).unwrap_or_default().to_string());
    }

    if sample_ids.is_empty() {
        return Err(PreproError::EmptyData {
            reason: format!("no samples found in {}", path.display()),
        });
    }

    BatchAssignment::new(sample_ids, batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_count_matrix_skips_metadata_columns() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "gene_id\tSJALL1\tdescription\tSJALL2").unwrap();
        writeln!(file, "TP53\t100\ttumour protein\t200").unwrap();
        writeln!(file, "\"KRAS\"\t50\tGTPase\t75").unwrap();

        let selector = SampleSelector::new("SJ").unwrap();
        let matrix = read_count_matrix(file.path(), b'\t', &selector).unwrap();
        assert_eq!(matrix.n_genes(), 2);
        assert_eq!(matrix.sample_ids(), &["SJALL1".to_string(), "SJALL2".to_string()]);
        assert_eq!(matrix.gene_ids()[1], "KRAS");
        assert_eq!(matrix.counts()[[1, 1]], 75.0);
    }

    #[test]
    fn test_read_count_matrix_rejects_bad_count() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, ",s1").unwrap();
        writeln!(file, "g1,abc").unwrap();

        let selector = SampleSelector::new("s").unwrap();
        let result = read_count_matrix(file.path(), b',', &selector);
        assert!(matches!(result, Err(PreproError::InvalidCountMatrix { .. })));
    }

    #[test]
    fn test_count_matrix_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.csv");
        let matrix = CountMatrix::new(
            ndarray::array![[15.0, 20.0], [0.0, 0.0]],
            vec!["ENSG001".to_string(), "ENSG002".to_string()],
            vec!["s1".to_string(), "s2".to_string()],
        )
        .unwrap();
        write_count_matrix(&path, &matrix).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, ",s1,s2\nENSG001,15,20\nENSG002,0,0\n");
    }

    #[test]
    fn test_missing_gene_report_has_id_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");
        let missing = CountMatrix::zeros(
            vec!["ENSG002".to_string()],
            vec!["s1".to_string(), "s2".to_string()],
        )
        .unwrap();
        write_missing_genes(&path, &missing).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "id,s1,s2\nENSG002,0,0\n");
    }

    #[test]
    fn test_read_reference_accepts_float_lengths() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id,chr,name,biotype,length").unwrap();
        writeln!(file, "ENSG001,1,GENEA,protein_coding,1000.0").unwrap();
        writeln!(file, "ENSG002,X,GENEB,protein_coding,500").unwrap();

        let table = read_reference(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("ENSG001").unwrap().length, 1000);
        assert_eq!(table.get("ENSG002").unwrap().chr, "X");
    }

    #[test]
    fn test_read_batches() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, ",batch").unwrap();
        writeln!(file, "s1,run1").unwrap();
        writeln!(file, "s2,run2").unwrap();

        let batches = read_batches(file.path()).unwrap();
        assert_eq!(batches.sample_ids().len(), 2);
        assert_eq!(batches.n_batches(), 2);
    }
}
