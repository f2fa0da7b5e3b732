// Ballot entries exported as a JSON array.

use std::path::PathBuf;

use crate::night::{io_common::*, *};

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
struct JsonBallot {
    week: JSValue,
    #[serde(rename = "suggestionId")]
    suggestion_id: JSValue,
    movie: String,
    author: String,
    preference: JSValue,
}

pub struct JsonSource {
    pub path: PathBuf,
}

impl BallotSource for JsonSource {
    fn describe(&self) -> String {
        format!("json:{}", simplify_file_name(&self.path))
    }

    fn read_ballots(&self) -> NightResult<Vec<BallotRow>> {
        let path = self.path.display().to_string();
        let contents = fs::read_to_string(&self.path).context(OpeningJsonSnafu { path: &path })?;
        let entries: Vec<JsonBallot> =
            serde_json::from_str(&contents).context(ParsingJsonSnafu { path: &path })?;
        debug!("read_ballots: {}: {} entries", path, entries.len());

        let mut res: Vec<BallotRow> = Vec::new();
        for (idx, entry) in entries.iter().enumerate() {
            let week = js_to_string(&entry.week);
            let suggestion_id = js_to_string(&entry.suggestion_id);
            let preference = js_to_string(&entry.preference);
            // Entries are counted from 1 in the array, not by line.
            let row = build_row(
                idx + 1,
                [
                    week.as_str(),
                    suggestion_id.as_str(),
                    entry.movie.as_str(),
                    entry.author.as_str(),
                    preference.as_str(),
                ],
            )
            .map_err(|e| match e {
                NightError::InvalidField {
                    lineno,
                    field,
                    value,
                } => NightError::InvalidEntry {
                    entry: lineno,
                    field,
                    value,
                },
                e => e,
            })?;
            res.push(row);
        }
        Ok(res)
    }
}
