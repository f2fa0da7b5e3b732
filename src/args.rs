use clap::Parser;

/// Tallies the movie night ballots of one or more weeks.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the ballot sources, the title and the rules.
    /// File paths inside it are relative to the directory of this file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference summary in JSON format. If provided, movnight will
    /// check that the tallied summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary will be written in JSON format to the given
    /// location. Setting this option overrides the output directory of the configuration.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, the ballots are read from this file only. Setting this option
    /// overrides the ballot sources of the configuration.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default csv) The type of the input: csv, json or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (YYYYWW or empty) Only tally this week. All the weeks found are tallied otherwise.
    #[clap(short, long, value_parser)]
    pub week: Option<String>,

    /// (default: first worksheet) When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
