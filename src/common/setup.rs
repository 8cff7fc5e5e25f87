use anyhow::{Context, Result, bail};
use clap::{Arg, ArgMatches, Command, ValueEnum, builder::EnumValueParser, value_parser};
use env_logger::{Builder, Env};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;

/// Dataset sizes of the learning curve when none are given.
pub const DEFAULT_SIZES: &str = "10,50,100,500,1000,5000";

/// How the binaries report their results
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
pub enum OutputFormat {
    /// Coloured human-readable lines
    #[serde(rename = "text")]
    Text,

    /// One JSON document
    #[serde(rename = "json")]
    Json,
}

/// These options define the inputs from the user.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExperimentOptions {
    pub network: PathBuf,
    pub sizes: Vec<usize>,
    pub seed: Option<u64>,
    pub output_format: OutputFormat,
    pub print_network: bool,
}

/// Install the `env_logger` backend; `RUST_LOG` overrides the `info` default.
///
/// Call once per process. Every binary reaches it through exactly one of the
/// `parse_*` functions below.
pub fn init_logging() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let file = record.file().unwrap_or("unknown");
            let line = record.line().unwrap_or(0);
            writeln!(
                buf,
                "{} [{}:{}] {}",
                record.level(),
                file,
                line,
                record.args()
            )
        })
        .init();
}

/// Parse a comma separated list of dataset sizes.
pub fn parse_sizes(list: &str) -> Result<Vec<usize>> {
    let sizes = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .with_context(|| format!("'{}' is not a dataset size", s))
        })
        .collect::<Result<Vec<usize>>>()?;
    if sizes.is_empty() {
        bail!("at least one dataset size is required");
    }
    Ok(sizes)
}

fn network_arg() -> Arg {
    Arg::new("network")
        .long("network")
        .value_name("FILE")
        .help("BIF description of the true network")
        .value_parser(value_parser!(PathBuf))
        .required(true)
}

fn seed_arg() -> Arg {
    Arg::new("seed")
        .long("seed")
        .value_name("NUMBER")
        .help("Seed for the random generator (optional)")
        .value_parser(value_parser!(u64))
}

fn output_format_arg() -> Arg {
    Arg::new("output_format")
        .long("output_format")
        .value_parser(EnumValueParser::<OutputFormat>::new())
        .help("Report format: 'text' or 'json'")
        .default_value("text")
}

fn experiment_command() -> Command {
    Command::new("bayeslearn")
        .version("0.1")
        .about("Learning curve of Laplace-smoothed CPT estimates for a discrete Bayesian network.")
        .arg(network_arg())
        .arg(
            Arg::new("sizes")
                .long("sizes")
                .value_name("LIST")
                .help("Comma separated dataset sizes")
                .default_value(DEFAULT_SIZES),
        )
        .arg(seed_arg())
        .arg(output_format_arg())
        .arg(
            Arg::new("print_network")
                .long("print_network")
                .help("Print the parsed network before running")
                .action(clap::ArgAction::SetTrue),
        )
}

fn options_from_matches(matches: &ArgMatches) -> Result<ExperimentOptions> {
    let network = matches
        .get_one::<PathBuf>("network")
        .cloned()
        .context("--network is required")?;
    let sizes = parse_sizes(
        matches
            .get_one::<String>("sizes")
            .map(String::as_str)
            .unwrap_or(DEFAULT_SIZES),
    )?;
    Ok(ExperimentOptions {
        network,
        sizes,
        seed: matches.get_one::<u64>("seed").copied(),
        output_format: matches
            .get_one::<OutputFormat>("output_format")
            .copied()
            .unwrap_or(OutputFormat::Text),
        print_network: matches.get_flag("print_network"),
    })
}

/// Initialise logging and read the experiment options from the command line.
pub fn parse_configuration_options() -> Result<ExperimentOptions> {
    init_logging();
    options_from_matches(&experiment_command().get_matches())
}

/// Options of the `sample` binary.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SampleOptions {
    pub network: PathBuf,
    pub count: usize,
    pub seed: Option<u64>,
}

pub fn parse_sample_options() -> Result<SampleOptions> {
    init_logging();
    let matches = Command::new("sample")
        .about("Draw joint observations from a network as JSON lines.")
        .arg(network_arg())
        .arg(
            Arg::new("count")
                .long("count")
                .value_name("NUMBER")
                .help("Number of observations to draw")
                .value_parser(value_parser!(usize))
                .default_value("10"),
        )
        .arg(seed_arg())
        .get_matches();
    Ok(SampleOptions {
        network: matches
            .get_one::<PathBuf>("network")
            .cloned()
            .context("--network is required")?,
        count: matches.get_one::<usize>("count").copied().unwrap_or(10),
        seed: matches.get_one::<u64>("seed").copied(),
    })
}

/// Path argument of the `print_network` binary.
pub fn parse_network_path() -> Result<PathBuf> {
    init_logging();
    let matches = Command::new("print_network")
        .about("Print the nodes, parents and CPTs of a network.")
        .arg(network_arg())
        .get_matches();
    matches
        .get_one::<PathBuf>("network")
        .cloned()
        .context("--network is required")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sizes() {
        assert_eq!(parse_sizes("10, 50,100").unwrap(), vec![10, 50, 100]);
        assert!(parse_sizes("10,ten").is_err());
        assert!(parse_sizes(" , ").is_err());
    }

    #[test]
    fn test_experiment_defaults() {
        let matches = experiment_command()
            .try_get_matches_from(["bayeslearn", "--network", "asia.bif"])
            .unwrap();
        let options = options_from_matches(&matches).unwrap();
        assert_eq!(options.network, PathBuf::from("asia.bif"));
        assert_eq!(options.sizes, vec![10, 50, 100, 500, 1000, 5000]);
        assert_eq!(options.seed, None);
        assert_eq!(options.output_format, OutputFormat::Text);
        assert!(!options.print_network);
    }

    #[test]
    fn test_experiment_overrides() {
        let matches = experiment_command()
            .try_get_matches_from([
                "bayeslearn",
                "--network",
                "net.bif",
                "--sizes",
                "5,20",
                "--seed",
                "11",
                "--output_format",
                "json",
                "--print_network",
            ])
            .unwrap();
        let options = options_from_matches(&matches).unwrap();
        assert_eq!(options.sizes, vec![5, 20]);
        assert_eq!(options.seed, Some(11));
        assert_eq!(options.output_format, OutputFormat::Json);
        assert!(options.print_network);
    }

    #[test]
    fn test_network_is_required() {
        assert!(experiment_command().try_get_matches_from(["bayeslearn"]).is_err());
    }
}
