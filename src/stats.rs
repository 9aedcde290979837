use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::draft::{Role, Side};
use crate::predictor::round_to;
use crate::store::{MatchStore, PredictionRecord, StoreError};

pub const TOP_PER_SIDE: usize = 5;
pub const TOP_OVERALL: usize = 10;
pub const TOP_PER_ROLE: usize = 5;

pub type ChampionCount = (String, usize);

/// Aggregates over every stored prediction, rebuilt on each request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub blue_winrate: f64,
    pub red_winrate: f64,
    pub blue_champs: Vec<ChampionCount>,
    pub red_champs: Vec<ChampionCount>,
    pub most_picked_champions: Vec<ChampionCount>,
    pub most_picked_by_role: ByRole<Vec<ChampionCount>>,
    pub total_predictions: usize,
}

/// One value per role, serialized as an object keyed by role name in canonical order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ByRole<T>([T; 5]);

impl<T> ByRole<T> {
    pub fn get(&self, role: Role) -> &T {
        &self.0[role.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &T)> + '_ {
        Role::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T: Serialize> Serialize for ByRole<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (role, value) in self.iter() {
            map.serialize_entry(role.as_str(), value)?;
        }
        map.end()
    }
}

pub struct StatsAggregator {
    store: Arc<MatchStore>,
}

impl StatsAggregator {
    pub fn new(store: Arc<MatchStore>) -> Self {
        Self { store }
    }

    pub fn compute(&self) -> Result<StatsSnapshot, StoreError> {
        let records = self.store.records()?;
        Ok(summarize(&records))
    }
}

pub fn summarize(records: &[PredictionRecord]) -> StatsSnapshot {
    let total = records.len();
    let wins = |side: Side| records.iter().filter(|r| r.winner == side).count();

    let side_champs = |side: Side| {
        let mut tally = Tally::default();
        for record in records.iter().filter(|r| r.winner == side) {
            let team = match side {
                Side::Blue => &record.blue,
                Side::Red => &record.red,
            };
            tally.extend(team.champions());
        }
        tally.most_common(TOP_PER_SIDE)
    };

    let mut overall = Tally::default();
    let mut by_role: [Tally; 5] = Default::default();
    for record in records {
        for team in [&record.blue, &record.red] {
            overall.extend(team.champions());
            for (role, champ) in team.picks() {
                by_role[role.index()].add(champ);
            }
        }
    }

    StatsSnapshot {
        blue_winrate: win_rate(wins(Side::Blue), total),
        red_winrate: win_rate(wins(Side::Red), total),
        blue_champs: side_champs(Side::Blue),
        red_champs: side_champs(Side::Red),
        most_picked_champions: overall.most_common(TOP_OVERALL),
        most_picked_by_role: ByRole(by_role.map(|tally| tally.most_common(TOP_PER_ROLE))),
        total_predictions: total,
    }
}

/// Percentage with one decimal; 0 when nothing has been recorded.
pub fn win_rate(wins: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(wins as f64 / total as f64 * 100.0, 1)
}

/// Counter that remembers first-seen order so equal counts rank stably.
#[derive(Debug, Default)]
struct Tally {
    counts: Vec<ChampionCount>,
    index: HashMap<String, usize>,
}

impl Tally {
    fn add(&mut self, name: &str) {
        if let Some(&slot) = self.index.get(name) {
            self.counts[slot].1 += 1;
            return;
        }
        self.index.insert(name.to_string(), self.counts.len());
        self.counts.push((name.to_string(), 1));
    }

    fn extend<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for name in names {
            self.add(name);
        }
    }

    fn most_common(self, n: usize) -> Vec<ChampionCount> {
        let mut counts = self.counts;
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(n);
        counts
    }
}
