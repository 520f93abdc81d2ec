use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ReportBackend {
    Jsonl,
    Console,
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliOptions {
    /// Input manifest of collected artifacts (JSONL, one {"hostname","path"} per line)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory for dispatch logs and reports
    #[arg(short, long, default_value = "./output")]
    pub output: PathBuf,

    /// Optional path to config file (YAML)
    #[arg(long)]
    pub config_path: Option<PathBuf>,

    /// Number of concurrent processing jobs (overrides config pool size)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Report backend
    #[arg(long, value_enum, default_value_t = ReportBackend::Jsonl)]
    pub report_backend: ReportBackend,

    /// Analysis workspace id (overrides config)
    #[arg(long)]
    pub sketch_id: Option<u64>,

    /// Keep processing remaining artifacts when one backend job fails
    #[arg(long)]
    pub continue_on_error: bool,
}

pub fn parse() -> CliOptions {
    CliOptions::parse()
}

#[cfg(test)]
mod tests {
    use super::CliOptions;
    use clap::Parser;

    #[test]
    fn parses_continue_on_error_flag() {
        let opts = CliOptions::try_parse_from([
            "artifactrelay",
            "--input",
            "manifest.jsonl",
            "--continue-on-error",
        ])
        .expect("parse");
        assert!(opts.continue_on_error);
    }

    #[test]
    fn parses_workers_override() {
        let opts = CliOptions::try_parse_from([
            "artifactrelay",
            "--input",
            "manifest.jsonl",
            "--workers",
            "12",
        ])
        .expect("parse");
        assert_eq!(opts.workers, Some(12));
    }

    #[test]
    fn defaults_report_backend_to_jsonl() {
        let opts = CliOptions::try_parse_from(["artifactrelay", "--input", "manifest.jsonl"])
            .expect("parse");
        assert!(matches!(
            opts.report_backend,
            super::ReportBackend::Jsonl
        ));
        assert_eq!(opts.output, std::path::PathBuf::from("./output"));
    }
}
