// SPDX-FileCopyrightText: 2026 Commline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `commline status` command implementation.
//!
//! Prints the workspace identity, the config files consulted, and a health
//! summary of the wired adapters. `--json` emits a structured document for
//! scripting.

use std::sync::Arc;

use colored::Colorize;
use serde::Serialize;

use commline_config::model::CommlineConfig;
use commline_core::error::CommlineError;
use commline_core::traits::Adapter;
use commline_core::types::HealthStatus;

use crate::sim::{SimAutomation, SimBackend, SimTelephony, SimTransport};

#[derive(Debug, Serialize)]
struct AdapterStatus {
    name: String,
    kind: String,
    version: String,
    healthy: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    workspace: String,
    log_level: String,
    default_channel: Option<String>,
    config_paths: Vec<String>,
    adapters: Vec<AdapterStatus>,
}

/// Paths the loader consults, in ascending precedence.
fn config_paths() -> Vec<String> {
    let mut paths = vec!["/etc/commline/commline.toml".to_string()];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("commline/commline.toml").display().to_string());
    }
    paths.push("./commline.toml".to_string());
    paths
}

async fn probe(adapter: &dyn Adapter) -> AdapterStatus {
    let healthy = matches!(adapter.health_check().await, Ok(HealthStatus::Healthy));
    AdapterStatus {
        name: adapter.name().to_string(),
        kind: adapter.adapter_type().to_string(),
        version: adapter.version().to_string(),
        healthy,
    }
}

/// Run the `commline status` command.
pub async fn run_status(config: &CommlineConfig, json: bool) -> Result<(), CommlineError> {
    let backend = Arc::new(SimBackend::new());
    let adapters: Vec<Box<dyn Adapter>> = vec![
        Box::new(SimTransport::new(Arc::clone(&backend))),
        Box::new(SimTelephony::new()),
        Box::new(SimAutomation::new(Arc::clone(&backend))),
    ];

    let mut statuses = vec![probe(backend.as_ref()).await];
    for adapter in &adapters {
        statuses.push(probe(adapter.as_ref()).await);
    }

    let report = StatusReport {
        workspace: config.workspace.name.clone(),
        log_level: config.workspace.log_level.clone(),
        default_channel: config.workspace.default_channel.clone(),
        config_paths: config_paths(),
        adapters: statuses,
    };

    if json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| CommlineError::Internal(format!("failed to serialize status: {e}")))?;
        println!("{rendered}");
        return Ok(());
    }

    println!("{} {}", "workspace:".bold(), report.workspace);
    println!("{} {}", "log level:".bold(), report.log_level);
    println!(
        "{} {}",
        "default channel:".bold(),
        report.default_channel.as_deref().unwrap_or("(none)")
    );
    println!("{}", "config paths:".bold());
    for path in &report.config_paths {
        println!("  {path}");
    }
    println!("{}", "adapters:".bold());
    for adapter in &report.adapters {
        let health = if adapter.healthy {
            "healthy".green()
        } else {
            "unhealthy".red()
        };
        println!(
            "  {} ({}, v{}): {health}",
            adapter.name, adapter.kind, adapter.version
        );
    }
    Ok(())
}
