// Primitives for reading CSV files.

use std::path::PathBuf;

use crate::night::{io_common::*, *};

pub struct CsvSource {
    pub path: PathBuf,
    /// 1-based index of the first row holding a ballot entry.
    pub first_row: usize,
}

impl BallotSource for CsvSource {
    fn describe(&self) -> String {
        format!("csv:{}", simplify_file_name(&self.path))
    }

    fn read_ballots(&self) -> NightResult<Vec<BallotRow>> {
        let path = self.path.display().to_string();
        let contents = fs::read(&self.path)
            .map_err(csv::Error::from)
            .context(CsvOpenSnafu { path: &path })?;
        let lines = LineIndex::new(&contents);
        let mut res: Vec<BallotRow> = Vec::new();

        for (idx, line_r) in get_records(&contents).enumerate() {
            let line = match line_r {
                Ok(line) => line,
                Err(e) => {
                    let lineno = e
                        .position()
                        .map(|p| lines.record_line(p.byte()))
                        .unwrap_or(idx + 1);
                    return Err(e).context(CsvLineParseSnafu { lineno });
                }
            };
            let lineno = line
                .position()
                .map(|p| lines.record_line(p.byte()))
                .unwrap_or(idx + 1);
            // The index starts at 1 to respect most conventions in the excel world
            if lineno < self.first_row {
                continue;
            }
            debug!("read_ballots: {} line {}: {:?}", path, lineno, line);
            let mut cells = [""; 5];
            for (i, cell) in cells.iter_mut().enumerate() {
                *cell = line.get(i).context(LineTooShortSnafu {
                    lineno,
                    expected: COLUMNS.len(),
                })?;
            }
            res.push(build_row(lineno, cells)?);
        }
        Ok(res)
    }
}

fn get_records(contents: &[u8]) -> csv::StringRecordsIntoIter<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(contents)
        .into_records()
}

/// Maps byte offsets of a file to 1-based line numbers.
struct LineIndex<'a> {
    contents: &'a [u8],
    newlines: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(contents: &'a [u8]) -> LineIndex<'a> {
        let newlines = contents
            .iter()
            .enumerate()
            .filter(|(_, b)| **b == b'\n')
            .map(|(i, _)| i)
            .collect();
        LineIndex { contents, newlines }
    }

    // A record is positioned before the blank lines the reader skipped to
    // reach it.
    fn record_line(&self, byte: u64) -> usize {
        let start = (byte as usize).min(self.contents.len());
        let skipped = self.contents[start..]
            .iter()
            .take_while(|b| **b == b'\n' || **b == b'\r')
            .count();
        self.newlines.partition_point(|&i| i < start + skipped) + 1
    }
}
