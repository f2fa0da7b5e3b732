// Ballot entries kept in an Excel workbook, one entry per row.

use std::path::PathBuf;

use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::night::{io_common::*, *};

pub struct XlsxSource {
    pub path: PathBuf,
    /// The first worksheet is used if not provided.
    pub worksheet: Option<String>,
    /// 1-based index of the first row holding a ballot entry.
    pub first_row: usize,
}

impl BallotSource for XlsxSource {
    fn describe(&self) -> String {
        format!("xlsx:{}", simplify_file_name(&self.path))
    }

    fn read_ballots(&self) -> NightResult<Vec<BallotRow>> {
        let path = self.path.display().to_string();
        let mut workbook: Xlsx<_> =
            open_workbook(&self.path).context(OpeningExcelSnafu { path: &path })?;
        let sheet = self.worksheet.clone().unwrap_or_else(|| "#1".to_string());
        let wrange = match &self.worksheet {
            Some(name) => workbook.worksheet_range(name),
            None => workbook.worksheet_range_at(0),
        }
        .context(EmptyExcelSnafu {
            path: &path,
            sheet: &sheet,
        })?
        .context(OpeningExcelSnafu { path: &path })?;

        let mut res: Vec<BallotRow> = Vec::new();
        let (start, end) = match (wrange.start(), wrange.end()) {
            (Some(start), Some(end)) => (start, end),
            _ => return Ok(res),
        };
        // The range starts at the first non-empty cell. Rows and columns are
        // read by absolute position so that line numbers and columns match A1.
        let empty = DataType::Empty;
        let first = self.first_row.saturating_sub(1) as u32;
        for r in start.0.max(first)..=end.0 {
            let lineno = r as usize + 1;
            let row: Vec<&DataType> = (0..COLUMNS.len() as u32)
                .map(|c| wrange.get_value((r, c)).unwrap_or(&empty))
                .collect();
            debug!("read_ballots: {} row {}: {:?}", path, lineno, row);
            if row.iter().all(|c| **c == DataType::Empty) {
                continue;
            }
            let mut cells: Vec<String> = Vec::new();
            for cell in row {
                cells.push(read_cell(cell, lineno)?);
            }
            res.push(build_row(
                lineno,
                [
                    cells[0].as_str(),
                    cells[1].as_str(),
                    cells[2].as_str(),
                    cells[3].as_str(),
                    cells[4].as_str(),
                ],
            )?);
        }
        Ok(res)
    }
}

// Numbers typed in a spreadsheet come back as floats.
fn read_cell(cell: &DataType, lineno: usize) -> NightResult<String> {
    match cell {
        DataType::String(s) => Ok(s.clone()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 => Ok(format!("{}", *f as i64)),
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Empty => Ok("".to_string()),
        _ => InvalidCellSnafu {
            lineno,
            cell: format!("{:?}", cell),
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_as_text() {
        assert_eq!(read_cell(&DataType::Float(202115.0), 1).unwrap(), "202115");
        assert_eq!(read_cell(&DataType::Int(3), 1).unwrap(), "3");
        assert_eq!(
            read_cell(&DataType::String("Heat".to_string()), 1).unwrap(),
            "Heat"
        );
        assert_eq!(read_cell(&DataType::Empty, 1).unwrap(), "");
        assert!(matches!(
            read_cell(&DataType::Bool(true), 4),
            Err(NightError::InvalidCell { lineno: 4, .. })
        ));
    }

    fn workbook(worksheet: Option<&str>, first_row: usize) -> XlsxSource {
        XlsxSource {
            path: [
                env!("CARGO_MANIFEST_DIR"),
                "tests",
                "data",
                "xlsx_sheets",
                "xlsx_sheets_ballots.xlsx",
            ]
            .iter()
            .collect(),
            worksheet: worksheet.map(|s| s.to_string()),
            first_row,
        }
    }

    #[test]
    fn reads_first_worksheet() {
        // Row 1 is empty, the header is on row 2 and row 4 is blank.
        let source = workbook(None, 3);
        let rows = source.read_ballots().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].week.to_string(), "202115");
        assert_eq!(rows[0].ballot.candidate_id, 1);
        assert_eq!(rows[0].ballot.display_label, "Heat");
        assert_eq!(rows[0].ballot.voter_id, "liam");
        assert_eq!(rows[1].ballot.candidate_id, 2);
        assert_eq!(rows[1].ballot.display_label, "Ronin");
        assert_eq!(rows[1].ballot.preference, 1);
        assert_eq!(source.describe(), "xlsx:xlsx_sheets_ballots.xlsx");

        let named = workbook(Some("Votes"), 3);
        assert_eq!(named.read_ballots().unwrap(), rows);
    }

    #[test]
    fn header_row_is_not_a_ballot() {
        let e = workbook(Some("Votes"), 2).read_ballots().unwrap_err();
        assert!(
            matches!(e, NightError::InvalidField { lineno: 2, ref field, .. } if field == "week"),
            "{:?}",
            e
        );
    }

    #[test]
    fn named_worksheet_reports_absolute_line() {
        // Rows 1 and 2 are empty, the header is on row 3.
        let e = workbook(Some("Bad"), 4).read_ballots().unwrap_err();
        assert!(
            matches!(e, NightError::InvalidField { lineno: 5, ref field, .. } if field == "preference"),
            "{:?}",
            e
        );
    }

    #[test]
    fn unknown_worksheet() {
        assert!(matches!(
            workbook(Some("Week 52"), 2).read_ballots(),
            Err(NightError::EmptyExcel { .. })
        ));
    }

    #[test]
    fn missing_workbook() {
        let source = XlsxSource {
            path: [env!("CARGO_MANIFEST_DIR"), "tests", "data", "missing.xlsx"]
                .iter()
                .collect(),
            worksheet: None,
            first_row: 2,
        };
        assert!(matches!(
            source.read_ballots(),
            Err(NightError::OpeningExcel { .. })
        ));
    }
}
