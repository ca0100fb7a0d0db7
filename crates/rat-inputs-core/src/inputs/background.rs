#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackgroundShapeError {
    #[error("The q-values of the data and background must be equal.")]
    QMismatch,
    #[error("row {row} of the {matrix} matrix has {found} columns, expected at least {expected}")]
    ShortRow {
        matrix: &'static str,
        row: usize,
        found: usize,
        expected: usize,
    },
}

/// Joins a background matrix (q, background, error) onto a data matrix
/// (q, reflectivity, error[, resolution]). The result always carries a
/// resolution column, zero-filled when the data has none, followed by the
/// background and its error.
pub fn append_data_background(
    data: &[Vec<f64>],
    background: &[Vec<f64>],
) -> Result<Vec<Vec<f64>>, BackgroundShapeError> {
    if data.len() != background.len() {
        return Err(BackgroundShapeError::QMismatch);
    }
    check_columns("data", data, 3)?;
    check_columns("background", background, 3)?;

    if data
        .iter()
        .zip(background)
        .any(|(data_row, background_row)| data_row[0] != background_row[0])
    {
        return Err(BackgroundShapeError::QMismatch);
    }

    Ok(data
        .iter()
        .zip(background)
        .map(|(data_row, background_row)| {
            let mut row = Vec::with_capacity(6);
            row.extend_from_slice(&data_row[..3]);
            row.push(data_row.get(3).copied().unwrap_or(0.0));
            row.extend_from_slice(&background_row[1..3]);
            row
        })
        .collect())
}

fn check_columns(
    matrix: &'static str,
    rows: &[Vec<f64>],
    expected: usize,
) -> Result<(), BackgroundShapeError> {
    match rows.iter().position(|row| row.len() < expected) {
        Some(row) => Err(BackgroundShapeError::ShortRow {
            matrix,
            row,
            found: rows[row].len(),
            expected,
        }),
        None => Ok(()),
    }
}
