//! Calibrate command implementation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use tracing::{debug, info};

use qcal_exp::{CalibrationExperiment, Experiment, OptionValue, Pipeline};
use qcal_store::TemplateLibrary;

use super::common::{load_store, parse_option, print_report, save_store, spinner};
use crate::config::CalibrationConfig;

/// Build an experiment with options applied in order: config shots, the
/// options file, then `name=value` pairs.
pub fn build_experiment(
    config: &CalibrationConfig,
    name: &str,
    qubit: u32,
    options: &[String],
    options_file: Option<&Path>,
) -> Result<Experiment> {
    let mut experiment = Experiment::from_name(name, qubit)?;
    experiment.set_option("shots", OptionValue::Int(i64::from(config.shots)))?;

    if let Some(path) = options_file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read options file: {}", path.display()))?;
        experiment
            .options_mut()
            .apply_yaml(&text)
            .with_context(|| format!("Invalid options file: {}", path.display()))?;
    }
    for option in options {
        let (name, value) = parse_option(option)?;
        experiment.set_option(&name, value)?;
    }
    Ok(experiment)
}

/// Execute the calibrate command.
pub async fn execute(
    config: &CalibrationConfig,
    experiment: &str,
    qubit: u32,
    options: &[String],
    options_file: Option<&Path>,
    dry_run: bool,
) -> Result<()> {
    let exp = build_experiment(config, experiment, qubit, options, options_file)?;
    println!(
        "{} Calibrating {} on qubit {}",
        style("→").cyan().bold(),
        style(exp.name()).green(),
        style(qubit).yellow()
    );

    let mut store = load_store(&config.store)?;
    debug!("Loaded {} records from {}", store.len(), config.store.display());
    if store.is_blacklisted(qubit) {
        anyhow::bail!("Qubit {qubit} is blacklisted (no control channel)");
    }
    let backend = config.simulator_backend(None);
    let library = TemplateLibrary::default();

    let progress = spinner(format!("Running {}...", exp.name()));
    let report = Pipeline::new(&backend, &library)
        .with_commit(!dry_run)
        .run(&exp, &mut store)
        .await;
    progress.finish_and_clear();
    let report = report?;

    print_report(&report);
    if report.committed {
        save_store(&store, &config.store)?;
        info!(
            "Saved {} updates to {}",
            report.updates.len(),
            config.store.display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_options_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "num_amps: 21\nmax_amp: 0.4").unwrap();
        let config = CalibrationConfig {
            shots: 300,
            ..CalibrationConfig::default()
        };

        let exp = build_experiment(
            &config,
            "rough_amp",
            1,
            &["max_amp=0.3".to_string()],
            Some(file.path()),
        )
        .unwrap();
        let opts = exp.options();
        assert_eq!(opts.count("num_amps").unwrap(), 21);
        assert_eq!(opts.float("max_amp").unwrap(), 0.3);
        assert_eq!(exp.execution_options().unwrap().shots, 300);
    }

    #[test]
    fn test_unknown_option_rejected() {
        let config = CalibrationConfig::default();
        let result = build_experiment(&config, "rough_freq", 0, &["betas=3".to_string()], None);
        assert!(result.is_err());
    }
}
