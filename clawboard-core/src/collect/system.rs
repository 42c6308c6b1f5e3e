//! Host resource probes
//!
//! Shells out to `uptime -p`, `df -h` and `free -h` and keeps the columns
//! the dashboard shows. Each probe is independent; one that fails is simply
//! absent from the result.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;

/// Contents of `system.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub uptime: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<DiskInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskInfo {
    pub total: String,
    pub used: String,
    pub available: String,
    pub percent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryInfo {
    pub total: String,
    pub used: String,
    pub available: String,
}

/// Run every probe.
pub fn probe_system(disk_path: &Path) -> SystemInfo {
    let uptime = run("uptime", &["-p"])
        .map(|out| out.trim().to_string())
        .unwrap_or_else(|e| {
            tracing::debug!(error = %e, "uptime probe failed");
            "unknown".to_string()
        });

    let disk_arg = disk_path.to_string_lossy();
    let disk = run("df", &["-h", &disk_arg])
        .map(|out| parse_df(&out))
        .unwrap_or_else(|e| {
            tracing::debug!(error = %e, "disk probe failed");
            None
        });

    let memory = run("free", &["-h"])
        .map(|out| parse_free(&out))
        .unwrap_or_else(|e| {
            tracing::debug!(error = %e, "memory probe failed");
            None
        });

    SystemInfo {
        uptime,
        disk,
        memory,
    }
}

fn run(command: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(command)
        .args(args)
        .output()
        .map_err(|e| Error::Probe {
            command: command.to_string(),
            message: e.to_string(),
        })?;
    if !output.status.success() {
        return Err(Error::Probe {
            command: command.to_string(),
            message: format!("exited with {}", output.status),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Second line of `df -h`: filesystem, size, used, avail, use%, mount
pub fn parse_df(output: &str) -> Option<DiskInfo> {
    let parts: Vec<&str> = output.trim().lines().nth(1)?.split_whitespace().collect();
    if parts.len() < 5 {
        return None;
    }
    Some(DiskInfo {
        total: parts[1].to_string(),
        used: parts[2].to_string(),
        available: parts[3].to_string(),
        percent: parts[4].to_string(),
    })
}

/// Second line of `free -h`. Newer `free` prints an `available` column
/// (7th field); older versions only have `free` (4th field).
pub fn parse_free(output: &str) -> Option<MemoryInfo> {
    let parts: Vec<&str> = output.trim().lines().nth(1)?.split_whitespace().collect();
    if parts.len() < 4 {
        return None;
    }
    let available = parts.get(6).unwrap_or(&parts[3]);
    Some(MemoryInfo {
        total: parts[1].to_string(),
        used: parts[2].to_string(),
        available: available.to_string(),
    })
}
