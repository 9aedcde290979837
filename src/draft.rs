use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::team_row::MissingRole;

pub const PICKS_PER_SIDE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Top,
    Jungle,
    Mid,
    Adcarry,
    Support,
}

impl Role {
    /// Canonical order. Feature columns follow it.
    pub const ALL: [Role; PICKS_PER_SIDE] = [
        Role::Top,
        Role::Jungle,
        Role::Mid,
        Role::Adcarry,
        Role::Support,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Top => "TOP",
            Role::Jungle => "JUNGLE",
            Role::Mid => "MID",
            Role::Adcarry => "ADCARRY",
            Role::Support => "SUPPORT",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Role::Top => 0,
            Role::Jungle => 1,
            Role::Mid => 2,
            Role::Adcarry => 3,
            Role::Support => 4,
        }
    }

    pub fn from_name(raw: &str) -> Option<Self> {
        Role::ALL.into_iter().find(|role| role.as_str() == raw)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Blue,
    Red,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Blue, Side::Red];

    /// Trailing feature column value.
    pub fn indicator(self) -> i64 {
        match self {
            Side::Blue => 0,
            Side::Red => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Blue => "blue",
            Side::Red => "red",
        }
    }

    pub fn result_label(self) -> &'static str {
        match self {
            Side::Blue => "blue wins",
            Side::Red => "red wins",
        }
    }

    pub fn from_result_label(label: &str) -> Option<Self> {
        Side::BOTH
            .into_iter()
            .find(|side| side.result_label() == label)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks exactly as submitted: role name to champion, nothing validated yet.
pub type RawPicks = BTreeMap<String, Option<String>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftRequest {
    #[serde(default)]
    pub blue: RawPicks,
    #[serde(default)]
    pub red: RawPicks,
}

impl DraftRequest {
    pub fn picks(&self, side: Side) -> &RawPicks {
        match side {
            Side::Blue => &self.blue,
            Side::Red => &self.red,
        }
    }
}

/// One side's five picks, one champion per role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct TeamComposition {
    pub top: String,
    pub jungle: String,
    pub mid: String,
    pub adcarry: String,
    pub support: String,
}

impl TeamComposition {
    pub fn new(picks: [&str; PICKS_PER_SIDE]) -> Self {
        let [top, jungle, mid, adcarry, support] = picks.map(|champ| champ.to_string());
        Self {
            top,
            jungle,
            mid,
            adcarry,
            support,
        }
    }

    /// Resolves every role from the raw picks; blank champions count as missing.
    pub fn from_picks(picks: &RawPicks) -> Result<Self, MissingRole> {
        let mut resolved: [&str; PICKS_PER_SIDE] = [""; PICKS_PER_SIDE];
        for role in Role::ALL {
            let champ = picks
                .get(role.as_str())
                .and_then(|value| value.as_deref())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .ok_or(MissingRole { role })?;
            resolved[role.index()] = champ;
        }
        Ok(Self::new(resolved))
    }

    pub fn pick(&self, role: Role) -> &str {
        match role {
            Role::Top => &self.top,
            Role::Jungle => &self.jungle,
            Role::Mid => &self.mid,
            Role::Adcarry => &self.adcarry,
            Role::Support => &self.support,
        }
    }

    pub fn picks(&self) -> impl Iterator<Item = (Role, &str)> + '_ {
        Role::ALL.into_iter().map(|role| (role, self.pick(role)))
    }

    pub fn champions(&self) -> impl Iterator<Item = &str> + '_ {
        self.picks().map(|(_, champ)| champ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> RawPicks {
        pairs
            .iter()
            .map(|(role, champ)| (role.to_string(), Some(champ.to_string())))
            .collect()
    }

    #[test]
    fn composition_resolves_in_canonical_order() {
        let picks = raw(&[
            ("SUPPORT", "Bard"),
            ("ADCARRY", "Ziggs"),
            ("MID", "Corki"),
            ("JUNGLE", "Maokai"),
            ("TOP", "Yone"),
        ]);
        let team = TeamComposition::from_picks(&picks).unwrap();
        let order: Vec<_> = team.champions().collect();
        assert_eq!(order, ["Yone", "Maokai", "Corki", "Ziggs", "Bard"]);
    }

    #[test]
    fn blank_champion_is_missing() {
        let mut picks = raw(&[
            ("TOP", "Yone"),
            ("JUNGLE", "Maokai"),
            ("MID", "Corki"),
            ("ADCARRY", "Ziggs"),
        ]);
        picks.insert("SUPPORT".to_string(), Some("   ".to_string()));
        let err = TeamComposition::from_picks(&picks).unwrap_err();
        assert_eq!(err.role, Role::Support);

        picks.insert("SUPPORT".to_string(), None);
        let err = TeamComposition::from_picks(&picks).unwrap_err();
        assert_eq!(err.role, Role::Support);
    }

    #[test]
    fn composition_serializes_with_role_keys() {
        let team = TeamComposition::new(["Jax", "Nocturne", "Tristana", "Sivir", "Alistar"]);
        let json = serde_json::to_string(&team).unwrap();
        assert_eq!(
            json,
            r#"{"TOP":"Jax","JUNGLE":"Nocturne","MID":"Tristana","ADCARRY":"Sivir","SUPPORT":"Alistar"}"#
        );
    }

    #[test]
    fn result_labels_round_trip_to_sides() {
        assert_eq!(Side::from_result_label("blue wins"), Some(Side::Blue));
        assert_eq!(Side::from_result_label("red wins"), Some(Side::Red));
        assert_eq!(Side::from_result_label("draw"), None);
    }
}
