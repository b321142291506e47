// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::Path;

use crate::errors::ExportError;

/// Write a table of monomial names, one CSV record per moment-matrix row
pub fn write_csv(cells: &[Vec<String>], path: &Path) -> Result<(), ExportError> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    for row in cells {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_are_written_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gamma.csv");
        let cells = vec![
            vec!["1".to_string(), "<A_1_0_0>".to_string()],
            vec!["<A_1_0_0>".to_string(), "<A_1_0_0>".to_string()],
        ];
        write_csv(&cells, &path).unwrap();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .unwrap();
        let rows: Vec<Vec<String>> = reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();
        assert_eq!(rows, cells);
    }
}
