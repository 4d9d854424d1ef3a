use std::io;
use std::path::Path;

use anyhow::Context;
use clap::{App, Arg, ArgMatches};

use sales_growth::config::Config;
use sales_growth::sales::aggregate::DuplicateRolePolicy;
use sales_growth::sink::JsonWriterSink;

fn command_usage<'a, 'b>() -> App<'a, 'b> {
    const DEFAULT_CONFIG: &str = "config/sales.toml";

    App::new("sales-growth")
    .about("Computes week-over-week sales growth for brands and products")
    .arg(
        Arg::with_name("config")
            .short("c")
            .long("config")
            .takes_value(true)
            .default_value(DEFAULT_CONFIG)
            .help("Location of the TOML configuration. Defaults are used if the file does not exist.")
    )
    .arg(
        Arg::with_name("brand")
            .short("b")
            .long("brand")
            .takes_value(true)
            .help("Brand sales CSV, overrides input.brand")
    )
    .arg(
        Arg::with_name("product")
            .short("p")
            .long("product")
            .takes_value(true)
            .help("Product sales CSV, overrides input.product")
    )
    .arg(
        Arg::with_name("output")
            .short("o")
            .long("output")
            .takes_value(true)
            .conflicts_with("stdout")
            .help("Where to write the JSON report, overrides output.path")
    )
    .arg(
        Arg::with_name("stdout")
            .long("stdout")
            .takes_value(false)
            .help("Write the JSON report to standard output instead of a file")
    )
    .arg(
        Arg::with_name("pretty")
            .long("pretty")
            .takes_value(false)
            .help("Indent the JSON report, for both the output file and --stdout")
    )
    .arg(
        Arg::with_name("week-key")
            .long("week-key")
            .takes_value(true)
            .possible_values(&["day_month", "full_date"])
            .help("Week grouping: day_month merges the same day/month across years, full_date keeps years apart")
    )
    .arg(
        Arg::with_name("strict")
            .long("strict")
            .takes_value(false)
            .help("Reject a second current or previous row for the same week instead of overwriting")
    )
    .arg(
        Arg::with_name("zero-baseline")
            .long("zero-baseline")
            .takes_value(true)
            .possible_values(&["null", "error"])
            .help("Growth from a zero previous value: null leaves it empty, error aborts the run")
    )
}

/// Applies command line overrides on top of the file configuration.
fn apply_overrides(config: &mut Config, matches: &ArgMatches) -> anyhow::Result<()> {
    if let Some(path) = matches.value_of("brand") {
        config.input.brand = path.into();
    }
    if let Some(path) = matches.value_of("product") {
        config.input.product = path.into();
    }
    if let Some(path) = matches.value_of("output") {
        config.output.path = path.into();
    }
    if matches.is_present("pretty") {
        config.output.pretty = true;
    }
    if let Some(policy) = matches.value_of("week-key") {
        config.aggregation.week_key = policy.parse()?;
    }
    if matches.is_present("strict") {
        config.aggregation.duplicate_roles = DuplicateRolePolicy::Reject;
    }
    if let Some(policy) = matches.value_of("zero-baseline") {
        config.aggregation.zero_baseline = policy.parse()?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let matches = command_usage().get_matches();

    let config_path = Path::new(matches.value_of("config").unwrap_or_default());
    let mut config = Config::load(config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path.display()))?;
    apply_overrides(&mut config, &matches)?;

    if matches.is_present("stdout") {
        let stdout = io::stdout();
        let sink = JsonWriterSink::new(stdout.lock(), config.output.pretty);
        sales_growth::run(&config, sink).context("failed to produce sales growth report")?;
    } else {
        sales_growth::run_to_file(&config).context("failed to produce sales growth report")?;
    }

    Ok(())
}
