// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kms rotate` command implementation.

use kms_config::KmsConfig;
use kms_config::model::expand_home;
use kms_core::KmsError;
use kms_vault::{EtcShells, LocalVault, Pipeline, Request, SystemProbe, TerminalSurface};

use crate::output;

/// Run the `kms rotate` command.
///
/// A caller started from a shell must authenticate as for `init`. The vault
/// itself is untouched; it keeps unlocking with the same
/// plaintext, now encrypted under a fresh keypair.
pub fn run_rotate(config: &KmsConfig, request: &Request, color: bool) -> Result<(), KmsError> {
    let shells = EtcShells::new(expand_home(&config.trust.shells_path));
    let pipeline = Pipeline::new(config, &SystemProbe, &shells, &LocalVault);
    let vault = pipeline.rotate(request, &mut TerminalSurface::new())?;

    let mut lines = output::heading("kms rotate", color);
    lines.push(output::field("name", &vault.name, color));
    lines.push(output::path_field("keyfile", &vault.keyfile_path, color));
    lines.push(output::done("key material rotated", color));
    output::print(&lines);
    Ok(())
}
