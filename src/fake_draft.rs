use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::draft::{DraftRequest, RawPicks, Role, Side};
use crate::encoders::EncoderRegistry;

/// Random draft the model can score: every pick comes from its role's vocabulary and
/// no champion appears twice. `None` when a role runs out of unused champions.
pub fn random_draft<R: Rng + ?Sized>(encoders: &EncoderRegistry, rng: &mut R) -> Option<DraftRequest> {
    let mut used = HashSet::new();
    let mut request = DraftRequest::default();
    for side in Side::BOTH {
        let mut picks = RawPicks::new();
        for role in Role::ALL {
            let mut pool = encoders.champions_for(role);
            pool.shuffle(rng);
            let champ = pool.into_iter().find(|champ| !used.contains(*champ))?;
            used.insert(champ.to_string());
            picks.insert(role.as_str().to_string(), Some(champ.to_string()));
        }
        match side {
            Side::Blue => request.blue = picks,
            Side::Red => request.red = picks,
        }
    }
    Some(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoders::ColumnEncoder;
    use crate::team_row::{Category, column_label};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn registry(per_role: usize) -> EncoderRegistry {
        let mut columns = Vec::new();
        for role in Role::ALL {
            let champs = (0..per_role)
                .map(|idx| Category::Text(format!("{role}-{idx}")))
                .collect();
            columns.push(ColumnEncoder::new(column_label(columns.len()), champs));
            columns.push(ColumnEncoder::new(
                column_label(columns.len()),
                vec![Category::Text(role.as_str().to_string())],
            ));
        }
        columns.push(ColumnEncoder::new("side", vec![Category::Int(0), Category::Int(1)]));
        EncoderRegistry::new(columns)
    }

    #[test]
    fn draft_is_complete_and_distinct() {
        let registry = registry(4);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let draft = random_draft(&registry, &mut rng).expect("enough champions");
            assert_eq!(draft.blue.len(), 5);
            assert_eq!(draft.red.len(), 5);
            let all: HashSet<_> = draft.blue.values().chain(draft.red.values()).collect();
            assert_eq!(all.len(), 10);
            assert_eq!(draft.blue["MID"].as_deref().map(|c| c.starts_with("MID-")), Some(true));
        }
    }

    #[test]
    fn single_champion_per_role_cannot_fill_both_sides() {
        let registry = registry(1);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(random_draft(&registry, &mut rng).is_none());
    }
}
