//! Impact-based warning threat categories

/// Damage threat category tag carried by impact-based warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ThreatCategory {
    #[default]
    Base,
    Significant,
    Considerable,
    Destructive,
    Catastrophic,
    Unknown,
}

impl ThreatCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatCategory::Base => "Base",
            ThreatCategory::Significant => "Significant",
            ThreatCategory::Considerable => "Considerable",
            ThreatCategory::Destructive => "Destructive",
            ThreatCategory::Catastrophic => "Catastrophic",
            ThreatCategory::Unknown => "Unknown",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "BASE" => ThreatCategory::Base,
            "SIGNIFICANT" => ThreatCategory::Significant,
            "CONSIDERABLE" => ThreatCategory::Considerable,
            "DESTRUCTIVE" => ThreatCategory::Destructive,
            "CATASTROPHIC" => ThreatCategory::Catastrophic,
            _ => ThreatCategory::Unknown,
        }
    }
}

impl std::fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
