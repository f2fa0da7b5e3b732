use std::path::Path;

use crate::night::*;

/// The columns of a ballot entry, in order.
pub const COLUMNS: [&str; 5] = ["week", "suggestion_id", "movie", "author", "preference"];

pub fn simplify_file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Renders a JSON scalar the way it would appear in a CSV cell.
pub fn js_to_string(x: &JSValue) -> String {
    match x {
        JSValue::String(s) => s.clone(),
        JSValue::Number(n) => n.to_string(),
        _ => "".to_string(),
    }
}

/// Builds a ballot row out of the raw cells of one line.
///
/// `lineno` is only used for error reporting.
pub fn build_row(lineno: usize, cells: [&str; 5]) -> NightResult<BallotRow> {
    let [week, suggestion_id, movie, author, preference] = cells;
    let week = week
        .parse::<WeekId>()
        .ok()
        .context(InvalidFieldSnafu {
            lineno,
            field: "week",
            value: week,
        })?;
    let candidate_id = suggestion_id
        .trim()
        .parse::<SuggestionId>()
        .ok()
        .context(InvalidFieldSnafu {
            lineno,
            field: "suggestion_id",
            value: suggestion_id,
        })?;
    let preference = preference
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|p| *p > 0)
        .context(InvalidFieldSnafu {
            lineno,
            field: "preference",
            value: preference,
        })?;
    Ok(BallotRow {
        week,
        ballot: Ballot {
            candidate_id,
            voter_id: author.trim().to_string(),
            preference,
            display_label: movie.trim().to_string(),
        },
    })
}
