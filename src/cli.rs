use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::filter::{FilterDefinition, FilterRecord};
use crate::refilter::DEFAULT_DEBOUNCE;
use crate::view::ViewOptions;

/// Immutable configuration used by the application runtime
#[derive(Debug, Clone)]
pub struct Config {
    pub file: PathBuf,
    pub filters_file: Option<PathBuf>,
    /// Filters given on the command line, in the order they should be added.
    pub filters: Vec<FilterRecord>,
    pub view: ViewOptions,
    pub debounce: Duration,
    pub print: bool,
    pub line_numbers: bool,
    pub log_file: Option<PathBuf>,
}

/// User-facing CLI arguments (kept private to the CLI layer)
#[derive(Parser, Debug)]
#[command(name = "logsift", version, about = "Filter and highlight large text logs")]
struct Args {
    /// Text or log file to open, or `-` for standard input
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Load filters from a saved filter file (JSON)
    #[arg(short = 'F', long = "filters", value_name = "FILE")]
    filters_file: Option<PathBuf>,

    /// Show lines containing TEXT (repeatable)
    #[arg(short = 'i', long = "include", value_name = "TEXT")]
    include: Vec<String>,

    /// Exclude lines containing TEXT (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "TEXT")]
    exclude: Vec<String>,

    /// Show lines matching a regular expression (repeatable)
    #[arg(short = 'r', long = "regex", value_name = "REGEX")]
    regex: Vec<String>,

    /// Match command-line filters case-sensitively
    #[arg(short = 'c', long = "case-sensitive")]
    case_sensitive: bool,

    /// Hide lines that no filter accepts
    #[arg(short = 'o', long = "only-filtered")]
    only_filtered: bool,

    /// Hide empty lines
    #[arg(short = 'e', long = "hide-empty")]
    hide_empty: bool,

    /// Delay before re-filtering after a change, in milliseconds
    #[arg(long = "debounce-ms", value_name = "MS", default_value_t = DEFAULT_DEBOUNCE.as_millis() as u64)]
    debounce_ms: u64,

    /// Print the filtered document to stdout instead of opening the viewer
    #[arg(short = 'p', long = "print")]
    print: bool,

    /// Prefix printed lines with their line number
    #[arg(short = 'n', long = "line-numbers")]
    line_numbers: bool,

    /// Write diagnostics to this file
    #[arg(long = "log-file", value_name = "FILE")]
    log_file: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Config {
        let case_sensitive = self.case_sensitive;
        let texts = self
            .include
            .into_iter()
            .map(|p| FilterDefinition::text(p).case_sensitive(case_sensitive));
        let excludes = self
            .exclude
            .into_iter()
            .map(|p| FilterDefinition::text(p).case_sensitive(case_sensitive).excluding(true));
        let regexes = self
            .regex
            .into_iter()
            .map(|p| FilterDefinition::regex(p).case_sensitive(case_sensitive));

        Config {
            file: self.file,
            filters_file: self.filters_file,
            filters: texts.chain(regexes).chain(excludes).map(FilterRecord::new).collect(),
            view: ViewOptions {
                only_filtered: self.only_filtered,
                hide_empty: self.hide_empty,
            },
            debounce: Duration::from_millis(self.debounce_ms),
            print: self.print,
            line_numbers: self.line_numbers,
            log_file: self.log_file,
        }
    }
}

/// Parse CLI options into an application Config
pub fn parse() -> Config {
    Args::parse().into_config()
}
