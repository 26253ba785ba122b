//! RB command implementation.

use anyhow::Result;
use console::style;

use qcal_bench::RbMode;
use qcal_exp::{CalibrationExperiment, OptionValue, Pipeline, RandomizedBenchmarking};
use qcal_hal::Backend;
use qcal_store::TemplateLibrary;

use super::common::{load_store, spinner};
use crate::config::CalibrationConfig;

/// Parse `standard` or `polar`.
fn parse_mode(mode: &str) -> Result<RbMode> {
    match mode.to_lowercase().as_str() {
        "standard" | "std" => Ok(RbMode::Standard),
        "polar" => Ok(RbMode::Polar),
        other => anyhow::bail!("Unknown RB mode: '{other}'. Available: standard, polar"),
    }
}

/// Execute the rb command.
pub async fn execute(
    config: &CalibrationConfig,
    mode: &str,
    qubit: u32,
    lengths: Option<Vec<u32>>,
    samples: Option<u32>,
    seed: Option<u64>,
) -> Result<()> {
    let mut exp = RandomizedBenchmarking::new(qubit, parse_mode(mode)?);
    exp.set_option("shots", OptionValue::Int(i64::from(config.shots)))?;
    if let Some(lengths) = lengths {
        exp.set_option(
            "lengths",
            OptionValue::IntList(lengths.into_iter().map(i64::from).collect()),
        )?;
    }
    if let Some(samples) = samples {
        exp.set_option("num_samples", OptionValue::Int(i64::from(samples)))?;
    }
    if let Some(seed) = seed {
        let seed = i64::try_from(seed).map_err(|_| anyhow::anyhow!("Seed too large: {seed}"))?;
        exp.set_option("seed", OptionValue::Int(seed))?;
    }

    println!(
        "{} Running {} on qubit {}",
        style("→").cyan().bold(),
        style(exp.name()).green(),
        style(qubit).yellow()
    );

    let mut store = load_store(&config.store)?;
    let backend = config.simulator_backend(None);
    let library = TemplateLibrary::default();

    let progress = spinner(format!("Running {} on {}...", exp.name(), backend.name()));
    let report = Pipeline::new(&backend, &library)
        .run(&exp, &mut store)
        .await;
    progress.finish_and_clear();
    let report = report?;

    if !report.has_fit() {
        anyhow::bail!("RB decay fit failed for qubit {qubit}");
    }
    let result = exp.benchmark_result(&report.output)?;

    println!(
        "\n{} {} ({} sequences, job {})",
        style("✓").green().bold(),
        style(&result.name).cyan(),
        report.num_programs,
        style(&report.job_id).dim()
    );
    println!(
        "  Fidelity: {} {}",
        style(format!("{:.6}", result.value)).yellow(),
        result.unit
    );
    for (name, value) in &result.metrics {
        println!("  {name}: {value}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode() {
        assert!(parse_mode("standard").is_ok());
        assert!(parse_mode("Polar").is_ok());
        assert!(parse_mode("interleaved").is_err());
    }
}
