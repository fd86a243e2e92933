// src/utils/report.rs

//! Console presentation helpers layered on the `log` facade.
//!
//! Provides consistent headers, steps and summaries for the run phases.

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    log::info!("{}", border);
    log::info!("  {}", title);
    log::info!("{}", border);
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("[STEP {}/{}] {}", step_num, total, message);
}

/// Log a phase outcome
pub fn outcome(phase: &str, ok: bool) {
    if ok {
        log::info!("✓ {} succeeded", phase);
    } else {
        log::error!("✗ {} failed", phase);
    }
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        log::info!("    {}: {}", key, value);
    }
}
