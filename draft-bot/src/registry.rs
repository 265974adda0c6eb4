// Registered participants: team identity, want-lists, drafted items.

use serde::{Deserialize, Serialize};

use crate::error::CommandError;

/// Maximum number of entries a want-list may hold.
pub const WANTLIST_MAX_LENGTH: usize = 24;

/// Length of a team abbreviation when abbreviations are enabled.
pub const ABBREVIATION_LENGTH: usize = 3;

/// A registered participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Normalized platform user id.
    pub id: String,
    /// The participant's display name on the platform.
    pub display_name: String,
    /// Team name, unique across all participants.
    pub team_name: String,
    /// Fixed-length team code, unique when present.
    #[serde(default)]
    pub team_abbreviation: Option<String>,
    /// Ranked queue of wanted item ids; priority = position, duplicates
    /// permitted.
    #[serde(default)]
    pub want_list: Vec<String>,
    /// Item ids committed to this participant, in pick order. Append-only.
    #[serde(default)]
    pub drafted_items: Vec<String>,
}

impl Participant {
    pub fn new(
        id: String,
        display_name: String,
        team_name: String,
        team_abbreviation: Option<String>,
    ) -> Self {
        Participant {
            id,
            display_name,
            team_name,
            team_abbreviation,
            want_list: Vec::new(),
            drafted_items: Vec::new(),
        }
    }
}

/// Team identity parsed from a registration argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamSpec {
    pub team_name: String,
    pub abbreviation: Option<String>,
}

/// Parse a raw registration argument into a team identity.
///
/// With abbreviations enabled the last whitespace-separated word is the
/// abbreviation (uppercased; longer words keep their first three characters,
/// shorter ones are rejected) and everything before it is the team name,
/// e.g. "Los Angeles Lanturns LAL". Without abbreviations the whole trimmed
/// argument is the team name.
pub fn parse_team_spec(args: &str, require_abbreviation: bool) -> Result<TeamSpec, CommandError> {
    let args = args.trim();

    if !require_abbreviation {
        if args.is_empty() {
            return Err(CommandError::InvalidTeamSpec(
                "you need to specify a team name".to_string(),
            ));
        }
        return Ok(TeamSpec {
            team_name: args.to_string(),
            abbreviation: None,
        });
    }

    let words: Vec<&str> = args.split_whitespace().collect();
    if words.len() <= 1 {
        return Err(CommandError::InvalidTeamSpec(
            "you need to specify a team name and an abbreviation, \
             e.g. register Pheliadelphia Doggos PHL"
                .to_string(),
        ));
    }

    let last = words[words.len() - 1].to_uppercase();
    if last.chars().count() < ABBREVIATION_LENGTH {
        return Err(CommandError::InvalidTeamSpec(format!(
            "your abbreviation should be {ABBREVIATION_LENGTH} characters"
        )));
    }
    let abbreviation: String = last.chars().take(ABBREVIATION_LENGTH).collect();
    let team_name = words[..words.len() - 1].join(" ");

    Ok(TeamSpec {
        team_name,
        abbreviation: Some(abbreviation),
    })
}

/// All registered participants. Iteration order is registration order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    participants: Vec<Participant>,
}

impl Registry {
    pub fn from_participants(participants: Vec<Participant>) -> Self {
        Registry { participants }
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.participants.iter().any(|p| p.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    /// Ids of all participants, in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.id.clone()).collect()
    }

    /// Case-insensitive team-name uniqueness check.
    pub fn name_in_use(&self, team_name: &str) -> bool {
        self.participants
            .iter()
            .any(|p| p.team_name.eq_ignore_ascii_case(team_name))
    }

    pub fn abbreviation_in_use(&self, abbreviation: &str) -> bool {
        self.participants
            .iter()
            .any(|p| p.team_abbreviation.as_deref() == Some(abbreviation))
    }

    pub fn insert(&mut self, participant: Participant) {
        self.participants.push(participant);
    }

    /// Replace a participant record by id. Unknown ids are ignored.
    pub fn replace(&mut self, participant: Participant) {
        if let Some(existing) = self.get_mut(&participant.id) {
            *existing = participant;
        }
    }
}
