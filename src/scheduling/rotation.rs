use serde::Serialize;

/// Roster used when a track lists fewer than two professors.
pub const PLACEHOLDER_ROSTER: [&str; 3] = ["Default Prof 1", "Default Prof 2", "Default Prof 3"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub group_id: String,
    pub guide: String,
    pub evaluator1: String,
    pub evaluator2: String,
}

/// Rotates the panel across `group_ids`: group `i` gets guide `p[i]`,
/// evaluator1 `p[i+1]` and evaluator2 `p[i+2]` (indices mod P), then nudges
/// each evaluator forward, at most P steps, until it differs from the roles
/// before it. With
/// fewer than three distinct names evaluator2 may still coincide; that is
/// accepted.
pub fn assign_evaluators(professors: &[String], group_ids: &[String]) -> Vec<Assignment> {
    let roster: Vec<String> = if professors.len() < 2 {
        PLACEHOLDER_ROSTER.iter().map(|s| s.to_string()).collect()
    } else {
        professors.to_vec()
    };
    let p = roster.len();

    group_ids
        .iter()
        .enumerate()
        .map(|(i, group_id)| {
            let guide = i % p;
            let mut e1 = (i + 1) % p;
            let mut tried = 0;
            while roster[e1] == roster[guide] && tried < p {
                e1 = (e1 + 1) % p;
                tried += 1;
            }
            let mut e2 = (i + 2) % p;
            tried = 0;
            while (roster[e2] == roster[guide] || roster[e2] == roster[e1]) && tried < p {
                e2 = (e2 + 1) % p;
                tried += 1;
            }
            if roster[e2] == roster[guide] || roster[e2] == roster[e1] {
                tracing::debug!(
                    group_id = %group_id,
                    panel_size = p,
                    "panel too small for distinct roles; evaluator2 repeats"
                );
            }
            Assignment {
                group_id: group_id.clone(),
                guide: roster[guide].clone(),
                evaluator1: roster[e1].clone(),
                evaluator2: roster[e2].clone(),
            }
        })
        .collect()
}
