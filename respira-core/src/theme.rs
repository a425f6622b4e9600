use serde::Serialize;

use crate::severity::Severity;

/// Presentation tokens for a severity. Consumers render with these and never
/// derive colors themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub primary: &'static str,
    pub secondary: &'static str,
    pub background: &'static str,
    pub text: &'static str,
    pub gradient: &'static str,
}

pub fn theme_for(status: Severity) -> Theme {
    match status {
        Severity::Good => Theme {
            primary: "#4ade80",
            secondary: "#10b981",
            background: "#f0fdf4",
            text: "#166534",
            gradient: "from-green-400 to-emerald-500",
        },
        Severity::Moderate => Theme {
            primary: "#fbbf24",
            secondary: "#f59e0b",
            background: "#fffbeb",
            text: "#92400e",
            gradient: "from-amber-400 to-yellow-500",
        },
        Severity::UnhealthySensitive => Theme {
            primary: "#fb923c",
            secondary: "#f97316",
            background: "#fff7ed",
            text: "#9a3412",
            gradient: "from-orange-400 to-orange-500",
        },
        Severity::Unhealthy => Theme {
            primary: "#f87171",
            secondary: "#ef4444",
            background: "#fef2f2",
            text: "#b91c1c",
            gradient: "from-red-400 to-red-500",
        },
        Severity::VeryUnhealthy => Theme {
            primary: "#c084fc",
            secondary: "#a855f7",
            background: "#faf5ff",
            text: "#7e22ce",
            gradient: "from-purple-400 to-purple-500",
        },
        Severity::Hazardous => Theme {
            primary: "#9f1239",
            secondary: "#881337",
            background: "#fff1f2",
            text: "#9f1239",
            gradient: "from-rose-700 to-rose-800",
        },
        Severity::Unknown => Theme {
            primary: "#9ca3af",
            secondary: "#6b7280",
            background: "#f9fafb",
            text: "#374151",
            gradient: "from-gray-400 to-gray-500",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_severity_has_a_distinct_theme() {
        let themes: Vec<Theme> = Severity::all().iter().map(|s| theme_for(*s)).collect();

        for (i, a) in themes.iter().enumerate() {
            assert!(a.primary.starts_with('#'));
            assert!(!a.gradient.is_empty());
            for b in &themes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn unknown_is_neutral() {
        assert!(theme_for(Severity::Unknown).gradient.contains("gray"));
    }
}
