//! Init command implementation.

use std::path::Path;

use anyhow::Result;
use console::style;
use tracing::debug;

use qcal_hal::Backend;
use qcal_store::{CalibrationStore, TemplateLibrary};

use super::common::save_store;
use crate::config::CalibrationConfig;

/// Execute the init command.
pub fn execute(
    config: &CalibrationConfig,
    backend: &str,
    qubits: Option<u32>,
    store_path: &Path,
    force: bool,
) -> Result<()> {
    match backend.to_lowercase().as_str() {
        "sim" | "simulator" => {}
        other => {
            anyhow::bail!("Unknown backend: '{other}'. Available: sim");
        }
    }
    if store_path.exists() && !force {
        anyhow::bail!(
            "Store already exists: {}. Use --force to overwrite.",
            store_path.display()
        );
    }

    let backend_impl = config.simulator_backend(qubits);
    let caps = backend_impl.capabilities();
    println!(
        "{} Initialising store for {} ({} qubits)",
        style("→").cyan().bold(),
        style(&caps.name).yellow(),
        caps.num_qubits
    );

    let library = TemplateLibrary::default();
    let store = CalibrationStore::from_backend(caps, &library);
    debug!("Registered {} default records", store.len());
    save_store(&store, store_path)?;

    println!("  Parameters: {}", store.parameters_table().len());
    for (qubit, channel) in store.control_channels() {
        println!("  q{qubit}: control channel u{channel}");
    }
    if !store.blacklist().is_empty() {
        let blacklisted: Vec<String> = store.blacklist().iter().map(u32::to_string).collect();
        println!(
            "  {} blacklisted: {}",
            style("!").yellow().bold(),
            blacklisted.join(", ")
        );
    }
    println!(
        "\n{} Store written to {}",
        style("✓").green().bold(),
        style(store_path.display()).green()
    );
    Ok(())
}
