use log::{debug, info, warn};

use ballot_tally::*;
use snafu::{prelude::*, Snafu};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::night::config_reader::*;

pub mod io_common;
pub mod io_csv;
pub mod io_json;
pub mod io_xlsx;
pub mod week;

pub use crate::night::week::WeekId;

/// The numeric id a suggestion got when it was added.
pub type SuggestionId = u64;

pub type MovieBallot = Ballot<SuggestionId, String>;

pub type MovieLeaderboard = Leaderboard<SuggestionId, String>;

#[derive(Debug, Snafu)]
pub enum NightError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the summary"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error parsing CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Line {lineno} is too short, expected {expected} columns"))]
    LineTooShort { lineno: usize, expected: usize },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Excel file {path} has no worksheet {sheet}"))]
    EmptyExcel { path: String, sheet: String },
    #[snafu(display("Line {lineno}: could not understand cell {cell}"))]
    InvalidCell { lineno: usize, cell: String },
    #[snafu(display("Line {lineno}: invalid {field} {value:?}"))]
    InvalidField {
        lineno: usize,
        field: String,
        value: String,
    },
    #[snafu(display("Entry {entry}: invalid {field} {value:?}"))]
    InvalidEntry {
        entry: usize,
        field: String,
        value: String,
    },
    #[snafu(display("Invalid configuration value for {field}: {value:?}"))]
    InvalidConfig { field: String, value: String },
    #[snafu(display("Invalid week {value:?}, expected YYYYWW"))]
    InvalidWeek { value: String },
    #[snafu(display("Missing parent directory for {path}"))]
    MissingParentDir { path: String },
    #[snafu(display("Provider not implemented {provider:?}"))]
    UnknownProvider { provider: String },
    #[snafu(display("Unknown extremum scan {value:?}"))]
    UnknownExtremumScan { value: String },
    #[snafu(display("No ballot source: use --input or a configuration file"))]
    NoBallotSource {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type NightResult<T> = Result<T, NightError>;

/// A ballot entry, as read from a source, with the week it was cast for.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BallotRow {
    pub week: WeekId,
    pub ballot: MovieBallot,
}

/// Anything that can supply the ballot entries of one or more weeks.
///
/// No ordering is expected from the entries.
pub trait BallotSource {
    /// Short name for logging.
    fn describe(&self) -> String;

    fn read_ballots(&self) -> NightResult<Vec<BallotRow>>;
}

pub mod config_reader {
    use crate::night::*;

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct OutputSettings {
        pub title: String,
        #[serde(rename = "outputDirectory")]
        pub output_directory: Option<String>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct FileSource {
        pub provider: String,
        #[serde(rename = "filePath")]
        pub file_path: String,
        #[serde(rename = "firstVoteRowIndex")]
        pub first_vote_row_index: Option<JSValue>,
        #[serde(rename = "excelWorksheetName")]
        pub excel_worksheet_name: Option<String>,
    }

    impl FileSource {
        /// 1-based, the row after the header by default.
        pub fn first_vote_row_index(&self) -> NightResult<usize> {
            match &self.first_vote_row_index {
                None => Ok(2),
                x => {
                    let idx = read_js_int(x)?;
                    ensure!(idx >= 1, InvalidConfigSnafu {
                        field: "firstVoteRowIndex",
                        value: idx.to_string(),
                    });
                    Ok(idx)
                }
            }
        }
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct NightRules {
        #[serde(rename = "extremumScan")]
        pub extremum_scan: Option<String>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct NightConfig {
        #[serde(rename = "outputSettings")]
        pub output_settings: OutputSettings,
        #[serde(rename = "ballotSources")]
        pub ballot_sources: Vec<FileSource>,
        pub rules: Option<NightRules>,
        pub week: Option<String>,
    }

    impl NightConfig {
        /// The configuration used when only --input is given.
        pub fn empty() -> NightConfig {
            NightConfig {
                output_settings: OutputSettings {
                    title: "Movie night".to_string(),
                    output_directory: None,
                },
                ballot_sources: Vec::new(),
                rules: None,
                week: None,
            }
        }
    }

    pub fn read_config(path: &str) -> NightResult<NightConfig> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
        debug!("read config: {:?}", contents);
        let config: NightConfig =
            serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
        Ok(config)
    }

    pub fn read_summary(path: &str) -> NightResult<JSValue> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
        debug!("read summary: {:?}", contents);
        let js: JSValue =
            serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
        Ok(js)
    }

    fn read_js_int(x: &Option<JSValue>) -> NightResult<usize> {
        let value = x.as_ref().map(io_common::js_to_string).unwrap_or_default();
        value.parse::<usize>().ok().context(InvalidConfigSnafu {
            field: "firstVoteRowIndex",
            value: value.clone(),
        })
    }
}

fn validate_rules(night_rules: &Option<NightRules>) -> NightResult<TallyRules> {
    let scan = night_rules.as_ref().and_then(|r| r.extremum_scan.clone());
    let extremum_scan = match scan.as_deref() {
        None | Some("bottomAnchored") => ExtremumScan::BottomAnchored,
        Some("independent") => ExtremumScan::Independent,
        Some(x) => {
            return UnknownExtremumScanSnafu { value: x }.fail();
        }
    };
    Ok(TallyRules { extremum_scan })
}

fn extremum_scan_name(scan: ExtremumScan) -> &'static str {
    match scan {
        ExtremumScan::BottomAnchored => "bottomAnchored",
        ExtremumScan::Independent => "independent",
    }
}

fn make_source(root: &Path, cfs: &FileSource) -> NightResult<Box<dyn BallotSource>> {
    let path: PathBuf = root.join(&cfs.file_path);
    let first_row = cfs.first_vote_row_index()?;
    let source: Box<dyn BallotSource> = match cfs.provider.as_str() {
        "csv" => Box::new(io_csv::CsvSource { path, first_row }),
        "json" => Box::new(io_json::JsonSource { path }),
        "xlsx" => Box::new(io_xlsx::XlsxSource {
            path,
            worksheet: cfs.excel_worksheet_name.clone(),
            first_row,
        }),
        x => {
            return UnknownProviderSnafu { provider: x }.fail();
        }
    };
    Ok(source)
}

/// Groups the entries by week, keeping their order within a week.
fn ballots_by_week(rows: Vec<BallotRow>) -> BTreeMap<WeekId, Vec<MovieBallot>> {
    let mut res: BTreeMap<WeekId, Vec<MovieBallot>> = BTreeMap::new();
    for row in rows {
        res.entry(row.week).or_default().push(row.ballot);
    }
    res
}

fn leaderboard_to_json(week: &WeekId, lb: &MovieLeaderboard) -> JSValue {
    let entries: Vec<JSValue> = lb
        .candidates
        .iter()
        .enumerate()
        .map(|(idx, c)| {
            json!({
                "rank": idx + 1,
                "suggestionId": c.candidate_id,
                "movie": c.display_label,
                "votes": c.votes.to_string(),
                "percent": format!("{:.4}", c.percent),
            })
        })
        .collect();
    json!({
        "week": week.to_string(),
        "currentPass": lb.current_pass,
        "totalPasses": lb.total_passes,
        "termination": lb.termination.as_str(),
        "leaderboard": entries,
    })
}

fn build_summary_js(
    config: &NightConfig,
    rules: &TallyRules,
    results: &[(WeekId, MovieLeaderboard)],
) -> JSValue {
    let l: Vec<JSValue> = results
        .iter()
        .map(|(week, lb)| leaderboard_to_json(week, lb))
        .collect();
    json!({
        "config": {
            "title": config.output_settings.title,
            "extremumScan": extremum_scan_name(rules.extremum_scan),
        },
        "results": l,
    })
}

/// Renders the leaderboard of a week as a table.
pub fn render_leaderboard(week: &WeekId, lb: &MovieLeaderboard) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Week {}: pass {} of {} ({})\n",
        week,
        lb.current_pass,
        lb.total_passes,
        lb.termination.as_str()
    ));
    out.push_str(&format!(
        "{:<4}{:<32}{:>6}{:>9}\n",
        "ID", "Movie", "Votes", "Percent"
    ));
    for c in lb.candidates.iter() {
        out.push_str(&format!(
            "{:<4}{:<32.32}{:>6}{:>8.1}%\n",
            c.candidate_id,
            c.display_label,
            c.votes,
            c.percent * 100.0
        ));
    }
    out
}

fn write_summary(out: &str, contents: &str) -> NightResult<()> {
    if out == "stdout" {
        println!("{}", contents);
        return Ok(());
    }
    if let Some(parent) = Path::new(out).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context(WritingOutputSnafu { path: out })?;
        }
    }
    fs::write(out, contents).context(WritingOutputSnafu { path: out })?;
    info!("Summary written to {}", out);
    Ok(())
}

/// Loads the ballots, tallies every requested week and checks the outcome
/// against the reference summary if one is given.
///
/// Returns the summary.
pub fn run_election(args: &Args) -> NightResult<JSValue> {
    let (mut config, root): (NightConfig, PathBuf) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root = Path::new(config_path)
                .parent()
                .context(MissingParentDirSnafu { path: config_path })?
                .to_path_buf();
            (config, root)
        }
        None => (NightConfig::empty(), PathBuf::new()),
    };
    info!("config: {:?}", config);

    // A single input replaces the sources of the configuration.
    let input_root = match &args.input {
        Some(input) => {
            config.ballot_sources = vec![FileSource {
                provider: args.input_type.clone().unwrap_or_else(|| "csv".to_string()),
                file_path: input.clone(),
                first_vote_row_index: None,
                excel_worksheet_name: args.excel_worksheet_name.clone(),
            }];
            PathBuf::new()
        }
        None => root.clone(),
    };
    ensure!(!config.ballot_sources.is_empty(), NoBallotSourceSnafu {});

    let rules = validate_rules(&config.rules)?;

    let week_filter: Option<WeekId> = match args.week.as_ref().or(config.week.as_ref()) {
        Some(w) => Some(w.parse::<WeekId>()?),
        None => None,
    };

    let mut rows: Vec<BallotRow> = Vec::new();
    for cfs in config.ballot_sources.iter() {
        let source = make_source(&input_root, cfs)?;
        info!("Attempting to read ballots from {}", source.describe());
        let mut source_rows = source.read_ballots()?;
        info!("{}: {} entries", source.describe(), source_rows.len());
        rows.append(&mut source_rows);
    }

    let mut by_week = ballots_by_week(rows);
    if let Some(week) = week_filter {
        let ballots = by_week.remove(&week).unwrap_or_default();
        if ballots.is_empty() {
            warn!("No ballot found for week {}", week);
        }
        by_week = BTreeMap::from([(week, ballots)]);
    }

    let mut results: Vec<(WeekId, MovieLeaderboard)> = Vec::new();
    for (week, ballots) in by_week.iter() {
        info!("Week {}: tallying {} entries", week, ballots.len());
        let lb = score_with_rules(ballots, &rules);
        if let Some(leader) = lb.leader() {
            info!(
                "Week {}: {} leads with {} votes after {} passes",
                week, leader.display_label, leader.votes, lb.current_pass
            );
        }
        print!("{}", render_leaderboard(week, &lb));
        results.push((*week, lb));
    }

    let result_js = build_summary_js(&config, &rules, &results);
    let pretty_js_stats =
        serde_json::to_string_pretty(&result_js).context(SerializingJsonSnafu {})?;

    let out_path: Option<String> = match (&args.out, &config.output_settings.output_directory) {
        (Some(out), _) => Some(out.clone()),
        (None, Some(dir)) => Some(root.join(dir).join("summary.json").display().to_string()),
        (None, None) => None,
    };
    if let Some(out) = out_path {
        write_summary(&out, &pretty_js_stats)?;
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(SerializingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
        info!("Summary matches the reference {}", summary_p);
    }

    Ok(result_js)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_args(config: Option<String>, reference: Option<String>) -> Args {
        Args {
            config,
            reference,
            out: None,
            input: None,
            input_type: None,
            week: None,
            excel_worksheet_name: None,
            verbose: false,
        }
    }

    fn test_dir() -> PathBuf {
        [env!("CARGO_MANIFEST_DIR"), "tests", "data"].iter().collect()
    }

    fn run_election_test(test_name: &str, config_lpath: &str, summary_lpath: &str) {
        let test_dir = test_dir();
        info!("Running test {}", test_name);
        let config = test_dir.join(test_name).join(config_lpath);
        let summary = test_dir.join(test_name).join(summary_lpath);
        let res = run_election(&test_args(
            Some(config.display().to_string()),
            Some(summary.display().to_string()),
        ));
        if let Err(e) = res {
            panic!("{} failed: {}", test_name, e);
        }
    }

    fn test_wrapper(test_name: &str) {
        run_election_test(
            test_name,
            format!("{}_config.json", test_name).as_str(),
            format!("{}_expected_summary.json", test_name).as_str(),
        )
    }

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn two_pass() {
        init();
        test_wrapper("two_pass");
    }

    #[test]
    fn json_weeks() {
        init();
        test_wrapper("json_weeks");
    }

    #[test]
    fn reference_mismatch_fails() {
        init();
        let dir = test_dir();
        let res = run_election(&test_args(
            Some(dir.join("json_weeks/json_weeks_config.json").display().to_string()),
            Some(dir.join("two_pass/two_pass_expected_summary.json").display().to_string()),
        ));
        assert!(matches!(res, Err(NightError::Whatever { .. })));
    }

    #[test]
    fn week_filter_with_input_override() {
        init();
        let dir = test_dir();
        let mut args = test_args(None, None);
        args.input = Some(dir.join("json_weeks/json_weeks_ballots.json").display().to_string());
        args.input_type = Some("json".to_string());
        args.week = Some("202116".to_string());
        let js = run_election(&args).unwrap();
        let results = js["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["week"], "202116");
        assert_eq!(results[0]["currentPass"], 2);
        assert_eq!(results[0]["termination"], "ballotsExhausted");
        assert_eq!(js["config"]["title"], "Movie night");
    }

    #[test]
    fn unknown_week_gives_empty_leaderboard() {
        init();
        let dir = test_dir();
        let mut args = test_args(None, None);
        args.input = Some(dir.join("two_pass/two_pass_ballots.csv").display().to_string());
        args.week = Some("202150".to_string());
        let js = run_election(&args).unwrap();
        let results = js["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["currentPass"], 0);
        assert_eq!(results[0]["totalPasses"], 0);
        assert_eq!(results[0]["termination"], "noCandidates");
        assert!(results[0]["leaderboard"].as_array().unwrap().is_empty());
    }

    #[test]
    fn independent_rules_from_config() {
        init();
        let config = NightConfig {
            rules: Some(NightRules {
                extremum_scan: Some("independent".to_string()),
            }),
            ..NightConfig::empty()
        };
        assert_eq!(
            validate_rules(&config.rules).unwrap().extremum_scan,
            ExtremumScan::Independent
        );
        assert_eq!(
            validate_rules(&None).unwrap(),
            TallyRules::DEFAULT_RULES
        );
        let bad = Some(NightRules {
            extremum_scan: Some("random".to_string()),
        });
        assert!(matches!(
            validate_rules(&bad),
            Err(NightError::UnknownExtremumScan { .. })
        ));
    }

    #[test]
    fn missing_source() {
        init();
        assert!(matches!(
            run_election(&test_args(None, None)),
            Err(NightError::NoBallotSource {})
        ));
        let mut args = test_args(None, None);
        args.input = Some("votes.ods".to_string());
        args.input_type = Some("ods".to_string());
        assert!(matches!(
            run_election(&args),
            Err(NightError::UnknownProvider { .. })
        ));
    }

    #[test]
    fn first_vote_row_index_forms() {
        let mut cfs = FileSource {
            provider: "csv".to_string(),
            file_path: "votes.csv".to_string(),
            first_vote_row_index: None,
            excel_worksheet_name: None,
        };
        assert_eq!(cfs.first_vote_row_index().unwrap(), 2);
        cfs.first_vote_row_index = Some(json!(1));
        assert_eq!(cfs.first_vote_row_index().unwrap(), 1);
        cfs.first_vote_row_index = Some(json!("3"));
        assert_eq!(cfs.first_vote_row_index().unwrap(), 3);
        cfs.first_vote_row_index = Some(json!(0));
        assert!(matches!(
            cfs.first_vote_row_index(),
            Err(NightError::InvalidConfig { .. })
        ));
        cfs.first_vote_row_index = Some(json!("second"));
        let e = cfs.first_vote_row_index().unwrap_err();
        assert_eq!(
            e.to_string(),
            "Invalid configuration value for firstVoteRowIndex: \"second\""
        );
    }

    #[test]
    fn groups_by_week_in_order() {
        let w1: WeekId = "202116".parse().unwrap();
        let w2: WeekId = "202115".parse().unwrap();
        let row = |week: WeekId, id: SuggestionId| BallotRow {
            week,
            ballot: Ballot::new(id, "liam", 1, format!("movie {}", id)),
        };
        let grouped = ballots_by_week(vec![row(w1, 3), row(w2, 1), row(w1, 2)]);
        let weeks: Vec<&WeekId> = grouped.keys().collect();
        assert_eq!(weeks, vec![&w2, &w1]);
        let ids: Vec<SuggestionId> = grouped[&w1].iter().map(|b| b.candidate_id).collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn render_table() {
        let week: WeekId = "202115".parse().unwrap();
        let lb = score(&[
            Ballot::new(1, "liam", 1, "Heat".to_string()),
            Ballot::new(1, "noah", 1, "Heat".to_string()),
            Ballot::new(2, "emma", 1, "Ronin".to_string()),
        ]);
        let text = render_leaderboard(&week, &lb);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Week 202115: pass 1 of 2 (majority)");
        assert!(lines[1].starts_with("ID  Movie"));
        assert!(lines[2].starts_with("1   Heat"));
        assert!(lines[2].ends_with("2    66.7%"));
        assert!(lines[3].ends_with("1    33.3%"));
    }
}
