use crate::app::*;

use std::fs;

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use club_voting::{identity_eq, VoteRules};

/// The rules section of the club configuration. Every field falls back to
/// the engine default independently.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClubRules {
    #[serde(rename = "totalPoints")]
    pub total_points: Option<u32>,
    #[serde(rename = "maxChoices")]
    pub max_choices: Option<u32>,
    #[serde(rename = "submissionQuota")]
    pub submission_quota: Option<u32>,
}

/// The club configuration file. Everything is optional; a missing file is
/// equivalent to an empty one.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClubConfig {
    #[serde(rename = "clubName")]
    _club_name: Option<String>,
    pub members: Option<Vec<String>>,
    pub admins: Option<Vec<String>>,
    pub rules: Option<ClubRules>,
    #[serde(rename = "topBooks")]
    _top_books: Option<u32>,
    #[serde(rename = "dataDir")]
    _data_dir: Option<String>,
}

impl ClubConfig {
    /// Loads the configuration file, or the defaults when no path is given.
    pub fn load(path: Option<&str>) -> AppResult<ClubConfig> {
        match path {
            None => Ok(ClubConfig::default()),
            Some(p) => {
                let text = fs::read_to_string(p).context(OpeningConfigSnafu {
                    path: p.to_string(),
                })?;
                serde_json::from_str(&text).context(ParsingConfigSnafu {
                    path: p.to_string(),
                })
            }
        }
    }

    pub fn vote_rules(&self) -> VoteRules {
        let defaults = VoteRules::DEFAULT_RULES;
        let rules = self.rules.clone().unwrap_or_default();
        VoteRules {
            total_points: rules.total_points.unwrap_or(defaults.total_points),
            max_choices: rules.max_choices.unwrap_or(defaults.max_choices),
            submission_quota: rules.submission_quota.unwrap_or(defaults.submission_quota),
        }
    }

    /// Administrator capability is granted by the admins list and nothing
    /// else. Without a configuration file there are no administrators.
    pub fn is_admin(&self, name: &str) -> bool {
        self.admins
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .any(|a| identity_eq(a, name))
    }

    pub fn club_name(&self) -> &str {
        self._club_name.as_deref().unwrap_or("Book Club Voting System")
    }

    pub fn top_books(&self) -> usize {
        self._top_books.unwrap_or(6) as usize
    }

    pub fn data_dir(&self) -> &str {
        self._data_dir.as_deref().unwrap_or("data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_a_file() {
        let config = ClubConfig::load(None).unwrap();
        assert_eq!(config.vote_rules(), VoteRules::DEFAULT_RULES);
        assert_eq!(config.data_dir(), "data");
        assert_eq!(config.top_books(), 6);
        assert_eq!(config.club_name(), "Book Club Voting System");
        assert!(!config.is_admin("Phil"));
    }

    #[test]
    fn rules_fall_back_field_by_field() {
        let config: ClubConfig =
            serde_json::from_str(r#"{"rules": {"totalPoints": 50}, "admins": ["Phil"]}"#).unwrap();
        let rules = config.vote_rules();
        assert_eq!(rules.total_points, 50);
        assert_eq!(rules.max_choices, VoteRules::DEFAULT_RULES.max_choices);
        assert_eq!(
            rules.submission_quota,
            VoteRules::DEFAULT_RULES.submission_quota
        );
        // Administrator matching follows the usual identity rules.
        assert!(config.is_admin("phil"));
        assert!(!config.is_admin("Gab"));
    }

    #[test]
    fn a_full_config_parses() {
        let text = r#"{
            "clubName": "Tuesday Readers",
            "members": ["Gab", "Nonna", "Phil", "Silvia", "Kathy", "Val"],
            "admins": ["Phil"],
            "rules": {"totalPoints": 100, "maxChoices": 5, "submissionQuota": 5},
            "topBooks": 6,
            "dataDir": "season-data"
        }"#;
        let config: ClubConfig = serde_json::from_str(text).unwrap();
        assert_eq!(config.club_name(), "Tuesday Readers");
        assert_eq!(config.members.as_deref().unwrap_or(&[]).len(), 6);
        assert_eq!(config.data_dir(), "season-data");
        assert_eq!(config.vote_rules(), VoteRules::DEFAULT_RULES);
    }
}
