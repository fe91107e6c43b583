//! Agent roster: the backend personas whose replies are tagged in the chat.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend persona that produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Socratic guide, the default persona
    #[default]
    Tutor,
    /// Builds and adjusts the syllabus
    Planner,
    /// Grades answers and drives mastery updates
    Evaluator,
    /// Steps in when frustration runs high
    Coach,
}

impl AgentRole {
    /// Roster order as shown in the sidebar.
    pub const ALL: [AgentRole; 4] = [
        AgentRole::Tutor,
        AgentRole::Planner,
        AgentRole::Evaluator,
        AgentRole::Coach,
    ];

    /// Parse a wire name. Unknown names yield `None` so callers keep their
    /// current agent instead of inventing one outside the roster.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tutor" => Some(Self::Tutor),
            "planner" => Some(Self::Planner),
            "evaluator" => Some(Self::Evaluator),
            "coach" => Some(Self::Coach),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tutor => "tutor",
            Self::Planner => "planner",
            Self::Evaluator => "evaluator",
            Self::Coach => "coach",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Tutor => "Tutor",
            Self::Planner => "Planner",
            Self::Evaluator => "Evaluator",
            Self::Coach => "Coach",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Tutor => "Socratic Guide",
            Self::Planner => "Curriculum Architect",
            Self::Evaluator => "Mastery Assessor",
            Self::Coach => "Motivational Mentor",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_roles_case_insensitive() {
        assert_eq!(AgentRole::parse("tutor"), Some(AgentRole::Tutor));
        assert_eq!(AgentRole::parse(" Planner "), Some(AgentRole::Planner));
        assert_eq!(AgentRole::parse("EVALUATOR"), Some(AgentRole::Evaluator));
        assert_eq!(AgentRole::parse("coach"), Some(AgentRole::Coach));
    }

    #[test]
    fn test_parse_unknown_role_is_none() {
        assert_eq!(AgentRole::parse("animator"), None);
        assert_eq!(AgentRole::parse(""), None);
    }

    #[test]
    fn test_default_is_tutor() {
        assert_eq!(AgentRole::default(), AgentRole::Tutor);
    }

    #[test]
    fn test_roster_round_trips_through_wire_name() {
        for role in AgentRole::ALL {
            assert_eq!(AgentRole::parse(role.as_str()), Some(role));
            assert_eq!(role.to_string(), role.as_str());
        }
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&AgentRole::Evaluator).unwrap();
        assert_eq!(json, "\"evaluator\"");
    }
}
