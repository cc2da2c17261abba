//! Display formatting for CLI output

use console::style;
use helmprobe_core::{ChecksumVerification, Manifests, ValueParity};
use std::collections::BTreeSet;

/// One line per rendered object: `apiVersion kind name`, plus whether it was typed
pub fn print_objects(manifests: &Manifests) {
    for object in manifests {
        let typed = match object.typed() {
            Ok(_) => style("typed").green(),
            Err(_) => style("untyped").dim(),
        };
        println!(
            "  {} {} {} ({})",
            object.api_version(),
            style(object.kind()).bold(),
            object.name().unwrap_or("<unnamed>"),
            typed
        );
    }
}

/// Findings of a failed checksum verification, one per line
pub fn print_checksum_findings(verification: &ChecksumVerification) {
    for finding in &verification.findings {
        println!("  {} {}", style("✗").red(), finding);
    }
}

pub fn print_paths(paths: &BTreeSet<String>) {
    for path in paths {
        println!("  {}", path);
    }
}

pub fn print_parity(parity: &ValueParity) {
    if !parity.only_in_templates.is_empty() {
        println!(
            "  {} Used by templates but missing from the schema:",
            style("✗").red()
        );
        for path in &parity.only_in_templates {
            println!("      {}", style(path).yellow());
        }
    }

    if !parity.only_in_schema.is_empty() {
        println!(
            "  {} Declared in the schema but never used by templates:",
            style("✗").red()
        );
        for path in &parity.only_in_schema {
            println!("      {}", style(path).yellow());
        }
    }
}
