use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use spydom_core::{RunConfig, DEFAULT_OUTPUT_DIR};

/// Load every URL in a list in a headless browser and save what the page reveals.
#[derive(Parser, Debug)]
#[command(name = "spydom", version, about)]
pub struct Cli {
    /// File with one target URL per line (`https://` is assumed when no scheme is given)
    #[arg(required_unless_present = "list_tasks")]
    pub targets: Option<PathBuf>,

    /// Number of browser workers
    #[arg(short, long, default_value_t = 10)]
    pub threads: usize,

    /// Time to let each page settle after loading
    #[arg(short, long, default_value = "2s", value_parser = parse_duration)]
    pub wait: Duration,

    /// Output directory
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Maximum load attempts per target
    #[arg(short, long, default_value_t = 3)]
    pub retries: u32,

    /// Deadline for a single page load
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    pub timeout: Duration,

    /// Deadline for a single task run; 0 disables it
    #[arg(long, default_value = "60s", value_parser = parse_duration)]
    pub task_timeout: Duration,

    /// Only run these tasks (comma separated slugs)
    #[arg(short, long, value_delimiter = ',')]
    pub enable: Vec<String>,

    /// Never run these tasks (comma separated slugs)
    #[arg(short, long, value_delimiter = ',')]
    pub disable: Vec<String>,

    /// JavaScript for the jsrunner task
    #[arg(long, conflicts_with = "js_file")]
    pub js: Option<String>,

    /// File with JavaScript for the jsrunner task
    #[arg(long)]
    pub js_file: Option<PathBuf>,

    /// Priority tier of the jsrunner task (0-4)
    #[arg(long, default_value_t = 4)]
    pub js_priority: u8,

    /// Ignore TLS certificate errors
    #[arg(short = 'k', long)]
    pub insecure: bool,

    /// Show the browser window
    #[arg(long)]
    pub visible: bool,

    /// Print the available tasks and exit
    #[arg(short, long)]
    pub list_tasks: bool,

    /// Log debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write the log to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Do not write report.json
    #[arg(long)]
    pub no_report: bool,
}

impl Cli {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            threads: self.threads,
            wait: self.wait,
            output_dir: self.output.clone(),
            retries: self.retries,
            timeout: self.timeout,
            task_timeout: (!self.task_timeout.is_zero()).then_some(self.task_timeout),
            enabled: self.enable.clone(),
            disabled: self.disable.clone(),
            js: self.js.clone(),
            js_file: self.js_file.clone(),
            js_priority: self.js_priority,
            insecure: self.insecure,
            visible: self.visible,
            verbose: self.verbose,
        }
    }
}

/// `500ms`, `2s`, `1m`, or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("`{raw}` is not a duration (expected e.g. 500ms, 2s, 1m)"))?;
    match unit.trim() {
        "ms" => Ok(Duration::from_millis(value)),
        "" | "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        other => Err(format!("unknown duration unit `{other}` (use ms, s or m)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn durations_accept_units_and_bare_seconds() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("3s"), Ok(Duration::from_secs(3)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("7"), Ok(Duration::from_secs(7)));
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("5h").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn defaults_match_run_config() {
        let cli = Cli::try_parse_from(["spydom", "targets.txt"]).unwrap();
        assert_eq!(cli.run_config(), RunConfig::default());
    }

    #[test]
    fn slug_lists_are_comma_separated() {
        let cli = Cli::try_parse_from([
            "spydom",
            "-e",
            "screenshot,title",
            "--disable",
            "title",
            "targets.txt",
        ])
        .unwrap();
        assert_eq!(cli.enable, vec!["screenshot", "title"]);
        assert_eq!(cli.disable, vec!["title"]);
    }

    #[test]
    fn zero_task_timeout_disables_it() {
        let cli = Cli::try_parse_from(["spydom", "--task-timeout", "0", "t.txt"]).unwrap();
        assert_eq!(cli.run_config().task_timeout, None);
    }

    #[test]
    fn targets_file_is_required_unless_listing() {
        assert!(Cli::try_parse_from(["spydom"]).is_err());
        let cli = Cli::try_parse_from(["spydom", "--list-tasks"]).unwrap();
        assert!(cli.list_tasks);
        assert_eq!(cli.targets, None);
    }

    #[test]
    fn inline_script_and_script_file_conflict() {
        let result =
            Cli::try_parse_from(["spydom", "--js", "1", "--js-file", "x.js", "targets.txt"]);
        assert!(result.is_err());
    }
}
