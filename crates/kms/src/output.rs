// SPDX-FileCopyrightText: 2026 KMS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain and colored report lines for command output.

use std::io::IsTerminal;
use std::path::Path;

use colored::Colorize;

/// Color only when asked to and stdout is a terminal.
pub fn use_color(plain: bool) -> bool {
    !plain && std::io::stdout().is_terminal()
}

/// Title line followed by an underline.
pub fn heading(title: &str, color: bool) -> Vec<String> {
    let title_line = if color {
        format!("  {}", title.bold())
    } else {
        format!("  {title}")
    };
    vec![title_line, format!("  {}", "-".repeat(50))]
}

/// One `label  value` line.
pub fn field(label: &str, value: impl std::fmt::Display, color: bool) -> String {
    if color {
        format!("    {:<12} {}", label.cyan(), value)
    } else {
        format!("    {label:<12} {value}")
    }
}

pub fn path_field(label: &str, path: &Path, color: bool) -> String {
    field(label, path.display(), color)
}

/// Closing status line.
pub fn done(message: &str, color: bool) -> String {
    if color {
        format!("  {} {message}", "✓".green())
    } else {
        format!("  [OK] {message}")
    }
}

pub fn print(lines: &[String]) {
    println!();
    for line in lines {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_have_no_escape_codes() {
        let line = field("keyfile", "/k/kms.keyx", false);
        assert_eq!(line, "    keyfile      /k/kms.keyx");
        assert!(!done("ready", false).contains('\u{1b}'));
    }

    #[test]
    fn heading_is_underlined() {
        let lines = heading("kms init", false);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].trim().len(), 50);
    }
}
