mod analyze;
mod cli;
mod config;
mod extract;
mod model;
mod output;
mod parsers;
mod rc_config;
mod result;
mod validate;

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use colored::control;
use tracing_subscriber::EnvFilter;

use analyze::ValidationOptions;
use cli::{Cli, Command, NetworkArgs};
use output::OutputFormat;
use rc_config::RcConfig;
use validate::limiter::ConcurrencyLimiter;
use validate::{LinkChecker, UrlValidator, ValidatorConfig};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let working_dir = std::env::current_dir().unwrap_or_default();
    let rc = RcConfig::load(&working_dir);

    if cli.no_color || rc.no_color.unwrap_or(false) {
        control::set_override(false);
    }

    let code = match &cli.command {
        Some(Command::Completions { shell }) => {
            clap_complete::generate(*shell, &mut Cli::command(), "fedcheck", &mut std::io::stdout());
            0
        }
        Some(Command::CheckUrls { urls, network, json }) => {
            run_check_urls(urls, network, *json || rc.json.unwrap_or(false), &rc)
        }
        None => run_analysis(&cli, &rc),
    };

    process::exit(code);
}

fn run_analysis(cli: &Cli, rc: &RcConfig) -> i32 {
    let Some(ref metadata_path) = cli.metadata else {
        eprintln!("Error: no metadata file given");
        return 2;
    };
    if !metadata_path.is_file() {
        eprintln!("Error: '{}' is not a file", metadata_path.display());
        return 2;
    }

    let federations_path = cli.federations.clone().or_else(|| rc.federations.clone());
    let inputs = match config::load(metadata_path, federations_path.as_deref()) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return 2;
        }
    };

    let validate = cli.validate || rc.validate.unwrap_or(false);
    let cache_path: Option<PathBuf> = if validate {
        cli.cache.clone().or_else(|| rc.cache.clone())
    } else {
        None
    };
    let mut cache = match cache_path.as_deref().map(config::load_cache).transpose() {
        Ok(cache) => cache,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return 2;
        }
    };

    let report = if validate {
        let validator_config = validator_config(&cli.network, rc);
        let limiter = ConcurrencyLimiter::new(max_in_flight(&cli.network, rc, &validator_config));
        let validator = UrlValidator::new(validator_config);
        analyze::analyze_document(
            &inputs.metadata,
            inputs.federations.as_ref(),
            Some(ValidationOptions {
                checker: &validator,
                cache: cache.as_mut(),
                limiter: &limiter,
            }),
        )
    } else {
        analyze::analyze_document(&inputs.metadata, inputs.federations.as_ref(), None)
    };

    if let (Some(path), Some(cache)) = (cache_path.as_deref(), cache.as_ref()) {
        if let Err(e) = config::save_cache(path, cache) {
            tracing::warn!(error = %format!("{:#}", e), "could not save validation cache");
        }
    }

    let format = if cli.json || rc.json.unwrap_or(false) {
        OutputFormat::Json
    } else {
        OutputFormat::Terminal
    };
    let verbose = cli.verbose || rc.verbose.unwrap_or(false);
    let source = inputs.metadata_path.display().to_string();
    output::print_report(&report, &source, verbose, format);

    if let Some(threshold) = cli.fail_under.or(rc.fail_under) {
        if report.global.total_sps == 0 {
            eprintln!("No SPs in metadata; --fail-under not applied");
            return 0;
        }
        let coverage = report.global.sp_privacy_coverage();
        if coverage < threshold {
            eprintln!(
                "SP privacy statement coverage {:.1}% is below {:.1}%",
                coverage, threshold
            );
            return 1;
        }
    }

    0
}

fn run_check_urls(urls: &[String], network: &NetworkArgs, json: bool, rc: &RcConfig) -> i32 {
    let validator_config = validator_config(network, rc);
    let limiter = ConcurrencyLimiter::new(max_in_flight(network, rc, &validator_config));
    let validator = UrlValidator::new(validator_config);

    let results = validator.check_batch(urls, None, &limiter);

    if json {
        output::json::print_url_results(&results);
    } else {
        output::terminal::print_url_results(&results);
    }
    0
}

fn validator_config(network: &NetworkArgs, rc: &RcConfig) -> ValidatorConfig {
    let defaults = ValidatorConfig::default();
    ValidatorConfig {
        workers: network.workers.or(rc.workers).unwrap_or(defaults.workers),
        timeout: network
            .timeout
            .or(rc.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout),
        pacing: network
            .pacing_ms
            .or(rc.pacing_ms)
            .map(Duration::from_millis)
            .unwrap_or(defaults.pacing),
        max_redirects: rc.max_redirects.unwrap_or(defaults.max_redirects),
        retry_protected: network.retry_protected || rc.retry_protected.unwrap_or(false),
        ..defaults
    }
}

fn max_in_flight(network: &NetworkArgs, rc: &RcConfig, config: &ValidatorConfig) -> usize {
    network
        .max_in_flight
        .or(rc.max_in_flight)
        .unwrap_or(config.workers)
}
