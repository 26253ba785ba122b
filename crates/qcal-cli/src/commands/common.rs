//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use qcal_exp::{OptionValue, RunReport};
use qcal_store::CalibrationStore;

/// Load a calibration store written by `qcal init`.
pub fn load_store(path: &Path) -> Result<CalibrationStore> {
    if !path.exists() {
        anyhow::bail!(
            "Store not found: {}. Run `qcal init` first.",
            path.display()
        );
    }
    CalibrationStore::load(path)
        .with_context(|| format!("Failed to load store: {}", path.display()))
}

/// Save a calibration store, creating the parent directory if needed.
pub fn save_store(store: &CalibrationStore, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    store
        .save(path)
        .with_context(|| format!("Failed to save store: {}", path.display()))
}

/// Split a `name=value` option; the value is a YAML scalar or flow list.
pub fn parse_option(text: &str) -> Result<(String, OptionValue)> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Invalid option '{text}', expected name=value"))?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Invalid option '{text}', empty name");
    }
    let value = OptionValue::parse(value.trim())
        .with_context(|| format!("Invalid value for option '{name}'"))?;
    Ok((name.to_string(), value))
}

/// Spinner shown while a job runs.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Print the fitted results and the parameter updates of a run.
pub fn print_report(report: &RunReport) {
    println!(
        "\n{} {} on qubit {} ({} programs, job {})",
        style("✓").green().bold(),
        style(&report.experiment).cyan(),
        report.qubit,
        report.num_programs,
        style(&report.job_id).dim()
    );

    if !report.has_fit() {
        println!(
            "  {} no usable fit, store left unchanged",
            style("!").yellow().bold()
        );
        return;
    }

    println!("\n  Results ({}):", report.output.analysis);
    for record in &report.output.records {
        let stderr = record
            .stderr
            .map(|s| format!(" ± {s:.4e}"))
            .unwrap_or_default();
        let unit = record.unit.as_deref().unwrap_or("");
        println!(
            "    {:<10} {:>14.6e}{} {}",
            style(&record.name).cyan(),
            record.value,
            stderr,
            unit
        );
    }
    if let Some(chisq) = report.output.chisq() {
        println!("    {:<10} {:>14.4}", "χ²ᵣ", chisq);
    }

    if report.updates.is_empty() {
        return;
    }
    let verb = if report.committed {
        "Updated"
    } else {
        "Proposed"
    };
    println!("\n  {verb}:");
    for update in &report.updates {
        let previous = update
            .previous
            .map(|p| format!("{p}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "    {:<16} {} → {}",
            style(update.key.to_string()).cyan(),
            previous,
            style(update.value).yellow()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcal_hal::Capabilities;
    use qcal_store::TemplateLibrary;

    #[test]
    fn test_parse_option_scalar() {
        let (name, value) = parse_option("num_amps=41").unwrap();
        assert_eq!(name, "num_amps");
        assert_eq!(value, OptionValue::Int(41));

        let (_, value) = parse_option("max_amp = 0.3").unwrap();
        assert_eq!(value, OptionValue::Float(0.3));
    }

    #[test]
    fn test_parse_option_list_and_flag() {
        let (_, value) = parse_option("reps=[1, 3, 5]").unwrap();
        assert_eq!(value, OptionValue::IntList(vec![1, 3, 5]));

        let (_, value) = parse_option("use_measure_esp=true").unwrap();
        assert_eq!(value, OptionValue::Bool(true));
    }

    #[test]
    fn test_parse_option_errors() {
        assert!(parse_option("shots").is_err());
        assert!(parse_option("=4").is_err());
    }

    #[test]
    fn test_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        let library = TemplateLibrary::default();
        let store = CalibrationStore::from_backend(&Capabilities::simulator(2), &library);

        save_store(&store, &path).unwrap();
        let loaded = load_store(&path).unwrap();
        assert_eq!(loaded.len(), store.len());
        assert_eq!(loaded.backend(), store.backend());
    }

    #[test]
    fn test_load_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_store(&dir.path().join("none.json")).unwrap_err();
        assert!(err.to_string().contains("qcal init"));
    }
}
