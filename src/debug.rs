//! Debug diagram rendering
//!
//! Renders command/prerequisite relationships as a Mermaid flowchart.
//! Node ids are short digests of the names so any name is a valid id.

use crate::config::Program;
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// File the diagram is written to
pub const DIAGRAM_FILE: &str = "diagram.md";

/// Stable node id for a name
pub fn node_key(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    digest[..8].iter().fold(String::with_capacity(16), |mut key, byte| {
        let _ = write!(key, "{:02x}", byte);
        key
    })
}

/// Render the program as a fenced Mermaid block
pub fn to_mermaid(program: &Program) -> String {
    let mut contents = String::from("```mermaid\nflowchart TD\n");

    for command in program.declared_commands() {
        let prereqs: Vec<&str> = command
            .prereqs
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();

        if prereqs.is_empty() {
            let _ = writeln!(contents, "\t{}[{}]", node_key(&command.name), command.name);
            continue;
        }

        for prereq in prereqs {
            let _ = writeln!(
                contents,
                "\t{}[{}]-->{}[{}]",
                node_key(prereq),
                prereq,
                node_key(&command.name),
                command.name
            );
        }
    }

    contents.push_str("```\n");
    contents
}
