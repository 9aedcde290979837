use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::draft::{PICKS_PER_SIDE, RawPicks, Role, Side, TeamComposition};

/// (champion, role) per role, then the side indicator.
pub const ROW_WIDTH: usize = PICKS_PER_SIDE * 2 + 1;
pub const SIDE_COLUMN: usize = ROW_WIDTH - 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing champion for role {role}")]
pub struct MissingRole {
    pub role: Role,
}

/// A raw categorical value as it appears in a feature row and in encoder vocabularies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Category {
    Int(i64),
    Text(String),
}

impl Category {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Category::Text(text) => Some(text),
            Category::Int(_) => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Int(value) => write!(f, "{value}"),
            Category::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureRow(Vec<Category>);

impl FeatureRow {
    pub fn from_composition(team: &TeamComposition, side: Side) -> Self {
        let mut values = Vec::with_capacity(ROW_WIDTH);
        for (role, champ) in team.picks() {
            values.push(Category::Text(champ.to_string()));
            values.push(Category::Text(role.as_str().to_string()));
        }
        values.push(Category::Int(side.indicator()));
        Self(values)
    }

    pub fn values(&self) -> &[Category] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One side resolved from submitted picks, with the row fed to the encoders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRow {
    pub team: TeamComposition,
    pub row: FeatureRow,
}

/// Builds one side's feature row straight from submitted picks.
pub fn build(picks: &RawPicks, side: Side) -> Result<TeamRow, MissingRole> {
    let team = TeamComposition::from_picks(picks)?;
    let row = FeatureRow::from_composition(&team, side);
    Ok(TeamRow { team, row })
}

pub fn champion_column(role: Role) -> usize {
    role.index() * 2
}

/// Human readable name for a column, used when the artifact does not name it.
pub fn column_label(column: usize) -> String {
    if column == SIDE_COLUMN {
        return "side".to_string();
    }
    let Some(role) = Role::ALL.get(column / 2) else {
        return format!("column {column}");
    };
    if column % 2 == 0 {
        format!("{role} champion")
    } else {
        format!("{role} role")
    }
}
