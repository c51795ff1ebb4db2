// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kms paths` command implementation.

use kms_config::KmsConfig;
use kms_vault::Request;
use kms_vault::paths::PathDeriver;
use kms_vault::pipeline::provisioning_credentials;

/// Run the `kms paths` command.
///
/// Prints one `key<TAB>path` pair per line so the output can be scripted.
pub fn run_paths(config: &KmsConfig, request: &Request) {
    for line in layout_lines(config, request) {
        println!("{line}");
    }
}

fn layout_lines(config: &KmsConfig, request: &Request) -> Vec<String> {
    let layout = PathDeriver::from_config(config).derive(&config.encryption.identifier);
    let vault = provisioning_credentials(config, request, &layout);
    [
        ("root", &layout.root_dir),
        ("public_key", &layout.public_key_path),
        ("private_key", &layout.private_key_path),
        ("keyfile", &vault.keyfile_path),
        ("database", &vault.database_path),
    ]
    .iter()
    .map(|(key, path)| format!("{key}\t{}", path.display()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_stable_and_complete() {
        let mut config = KmsConfig::default();
        config.encryption.path = "/secure/.{}".into();
        config.database.path = "/vaults/{}.kdbx".into();

        let first = layout_lines(&config, &Request::default());
        assert_eq!(first, layout_lines(&config, &Request::default()));
        assert_eq!(first.len(), 5);
        assert!(first[0].starts_with("root\t/secure/."));
        assert_eq!(first[4], "database\t/vaults/kms.kdbx");
        assert!(first[3].ends_with("/kms.keyx"));
    }
}
