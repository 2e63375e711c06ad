// src/inspector.rs

//! Tools for inspecting the resolved wire layout of a codable type.
//! Useful for checking which members an annotation set actually selects.

use crate::registry::TypeDescriptor;

/// The wire layout of one codable type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeReport {
    /// Rust name of the type.
    pub type_name: &'static str,
    /// Included members, in wire order.
    pub members: Vec<MemberReport>,
    /// Declared members left out by the selection policy.
    pub skipped: Vec<&'static str>,
}

/// One included member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberReport {
    /// Member name as declared.
    pub name: &'static str,
    /// Rust name of the declared type.
    pub declared_type: &'static str,
    /// Whether the member is written with a presence marker.
    pub presence_marked: bool,
}

impl TypeReport {
    pub(crate) fn from_descriptor<T>(descriptor: &TypeDescriptor<T>) -> Self {
        Self {
            type_name: descriptor.type_name(),
            members: descriptor
                .members()
                .iter()
                .map(|m| MemberReport {
                    name: m.name(),
                    declared_type: m.declared_type(),
                    presence_marked: !m.is_value_type(),
                })
                .collect(),
            skipped: descriptor.skipped().to_vec(),
        }
    }

    /// Member names in wire order.
    pub fn wire_order(&self) -> Vec<&'static str> {
        self.members.iter().map(|m| m.name).collect()
    }
}

impl std::fmt::Display for TypeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== PACKABLE TYPE REPORT ===")?;
        writeln!(f, "Type:    {}", self.type_name)?;
        writeln!(f, "\n[WIRE ORDER]")?;
        for (i, member) in self.members.iter().enumerate() {
            let connector = if i + 1 == self.members.len() { "└── " } else { "├── " };
            let marker = if member.presence_marked { " (presence)" } else { "" };
            writeln!(f, "{}{}: {}{}", connector, member.name, member.declared_type, marker)?;
        }
        if !self.skipped.is_empty() {
            writeln!(f, "\n[SKIPPED]")?;
            writeln!(f, "{}", self.skipped.join(", "))?;
        }
        Ok(())
    }
}
