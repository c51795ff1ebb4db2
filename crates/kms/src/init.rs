// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kms init` command implementation.
//!
//! Wires the provisioning pipeline to the live process table, the shell
//! registry file, the terminal and the local vault location.

use kms_config::KmsConfig;
use kms_config::model::expand_home;
use kms_core::KmsError;
use kms_vault::{EtcShells, InitReport, LocalVault, Pipeline, Request, SystemProbe, TerminalSurface};

use crate::output;

/// Run the `kms init` command.
pub fn run_init(config: &KmsConfig, request: &Request, color: bool) -> Result<(), KmsError> {
    let shells = EtcShells::new(expand_home(&config.trust.shells_path));
    let pipeline = Pipeline::new(config, &SystemProbe, &shells, &LocalVault);
    let report = pipeline.init(request, &mut TerminalSurface::new())?;
    output::print(&report_lines(&report, color));
    Ok(())
}

fn report_lines(report: &InitReport, color: bool) -> Vec<String> {
    let mut lines = output::heading("kms init", color);
    lines.push(output::field("name", &report.vault.name, color));
    lines.push(output::path_field("database", &report.vault.database_path, color));
    lines.push(output::path_field("keyfile", &report.vault.keyfile_path, color));
    lines.push(output::path_field("secure dir", &report.layout.root_dir, color));
    let unlock = if report.trusted {
        "keyfile (process trusted)"
    } else {
        "password + keyfile"
    };
    lines.push(output::field("unlock", unlock, color));
    if let Some(path) = &report.config_written {
        lines.push(output::path_field("config", path, color));
    }
    lines.push(output::done("vault provisioned", color));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use kms_test_utils::{FakeProbe, RecordingGateway, ScriptedSurface, StaticShells, TestHarness};

    #[test]
    fn report_lists_every_artifact() {
        let harness = TestHarness::builder().build().unwrap();
        let probe = FakeProbe::service();
        let shells = StaticShells::default();
        let gateway = RecordingGateway::new();
        let report = Pipeline::new(&harness.config, &probe, &shells, &gateway)
            .init(&Request::default(), &mut ScriptedSurface::new())
            .unwrap();

        let lines = report_lines(&report, false);
        let text = lines.join("\n");
        assert!(text.contains(&report.vault.keyfile_path.display().to_string()));
        assert!(text.contains(&report.layout.root_dir.display().to_string()));
        assert!(text.contains("keyfile (process trusted)"));
        assert!(text.contains("config"));
        assert_eq!(lines.last().map(String::as_str), Some("  [OK] vault provisioned"));
    }
}
