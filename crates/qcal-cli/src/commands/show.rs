//! Show command implementation.

use anyhow::Result;
use console::style;

use qcal_store::{CalibrationStore, ParameterKey, ParameterRow};

use super::common::load_store;
use crate::config::CalibrationConfig;

/// Rows visible for a qubit filter; default-scope rows are always shown.
fn visible_rows(store: &CalibrationStore, qubit: Option<u32>) -> Vec<ParameterRow> {
    store
        .parameters_table()
        .into_iter()
        .filter(|row| match qubit {
            Some(q) => row.key.is_default_scope() || row.key.qubits.contains(&q),
            None => true,
        })
        .collect()
}

/// Execute the show command.
pub fn execute(
    config: &CalibrationConfig,
    qubit: Option<u32>,
    history: Option<&str>,
    schedule: Option<&str>,
) -> Result<()> {
    let store = load_store(&config.store)?;
    println!(
        "{} Store {} ({} records, backend {})",
        style("→").cyan().bold(),
        style(config.store.display()).green(),
        store.len(),
        style(store.backend()).yellow()
    );

    if let Some(name) = history {
        let key = match qubit {
            Some(q) => ParameterKey::qubit(name, q, schedule),
            None => ParameterKey::default_scope(name, schedule),
        };
        let records = store.parameter_history(&key);
        if records.is_empty() {
            anyhow::bail!("No history for {key}");
        }
        println!("\n  History of {}:", style(&key).cyan());
        for record in records {
            let mut source = record.provenance.source.clone();
            if let Some(result) = &record.provenance.result_name {
                source.push_str(&format!(" ({result})"));
            }
            let marker = if record.valid { " " } else { "✗" };
            println!(
                "  {marker} {}  {:>16}  {}",
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.value,
                style(source).dim()
            );
        }
        return Ok(());
    }

    let rows = visible_rows(&store, qubit);
    println!();
    for row in &rows {
        println!(
            "  {:<20} {:>16}  {}  {}",
            style(row.key.to_string()).cyan(),
            row.value,
            row.timestamp.format("%Y-%m-%d %H:%M:%S"),
            style(&row.source).dim()
        );
    }
    if !store.blacklist().is_empty() {
        let blacklisted: Vec<String> = store.blacklist().iter().map(u32::to_string).collect();
        println!(
            "\n  {} blacklisted: {}",
            style("!").yellow().bold(),
            blacklisted.join(", ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcal_hal::Capabilities;
    use qcal_store::TemplateLibrary;

    #[test]
    fn test_qubit_filter_keeps_defaults() {
        let library = TemplateLibrary::default();
        let store = CalibrationStore::from_backend(&Capabilities::simulator(3), &library);

        let all = visible_rows(&store, None);
        let q1 = visible_rows(&store, Some(1));
        assert!(q1.len() < all.len());
        assert!(q1.iter().any(|r| r.key.is_default_scope()));
        assert!(
            q1.iter()
                .filter(|r| !r.key.is_default_scope())
                .all(|r| r.key.qubits == vec![1])
        );
    }
}
