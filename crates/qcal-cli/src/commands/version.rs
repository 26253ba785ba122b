//! Version command implementation.

use console::style;

use qcal_exp::EXPERIMENT_NAMES;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - qutrit gate calibration and benchmarking",
        style("qcal").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qcal-store        Versioned parameter store and schedule templates");
    println!("  qcal-analysis     Curve fits and candidate-model selection");
    println!("  qcal-bench        Clifford group and RB sequence synthesis");
    println!("  qcal-exp          Experiments, pipeline and updater");
    println!("  qcal-adapter-sim  Three-level density-matrix simulator");
    println!();
    println!("Experiments: {}", EXPERIMENT_NAMES.join(", "));
    println!("License:     {}", style("Apache-2.0").dim());
}
