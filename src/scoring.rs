// Match compatibility scoring.
//
// Two players are compared game by game over the games they share.
// Each shared game earns a base amount plus bonuses for similar skill level
// and similar hours played; the sum is averaged over the requesting player's
// library so that partial overlap scores lower than full overlap.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use crate::db::{CandidateGameRow, Database, LibraryEntry, SkillLevel};

pub const MAX_SCORE: i64 = 100;

const SHARED_GAME_BASE: f64 = 50.0;
const SKILL_WEIGHT: f64 = 30.0;
const SKILL_STEP_PENALTY: f64 = 10.0;
const HOURS_WEIGHT: f64 = 20.0;

/// A prospective match partner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub user_id: i64,
    pub username: String,
    pub match_score: i64,
    pub common_games: Vec<String>,
}

/// One game as played by one player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameProfile {
    pub game_id: i64,
    pub skill: SkillLevel,
    pub hours: i64,
}

impl From<&LibraryEntry> for GameProfile {
    fn from(entry: &LibraryEntry) -> Self {
        GameProfile {
            game_id: entry.game_id,
            skill: SkillLevel::parse(&entry.skill_level),
            hours: entry.hours_played,
        }
    }
}

impl From<&CandidateGameRow> for GameProfile {
    fn from(row: &CandidateGameRow) -> Self {
        GameProfile {
            game_id: row.game_id,
            skill: SkillLevel::parse(&row.skill_level),
            hours: row.hours_played,
        }
    }
}

/// Ratio of the smaller to the larger playtime, 1.0 when both are zero.
pub fn hours_similarity(a: i64, b: i64) -> f64 {
    let (a, b) = (a.max(0), b.max(0));
    let high = a.max(b);
    if high == 0 {
        1.0
    } else {
        a.min(b) as f64 / high as f64
    }
}

/// Points earned by one shared game, in `50.0..=100.0`.
pub fn game_affinity(a: &GameProfile, b: &GameProfile) -> f64 {
    let gap = (a.skill.rank() - b.skill.rank()).abs() as f64;
    let skill = (SKILL_WEIGHT - SKILL_STEP_PENALTY * gap).max(0.0);
    let hours = HOURS_WEIGHT * hours_similarity(a.hours, b.hours);
    SHARED_GAME_BASE + skill + hours
}

/// Score in `0..=100` of `theirs` from the point of view of `mine`.
pub fn compatibility_score(mine: &[GameProfile], theirs: &[GameProfile]) -> i64 {
    if mine.is_empty() {
        return 0;
    }
    let total: f64 = mine
        .iter()
        .filter_map(|m| {
            theirs
                .iter()
                .find(|t| t.game_id == m.game_id)
                .map(|t| game_affinity(m, t))
        })
        .sum();
    ((total / mine.len() as f64).round() as i64).min(MAX_SCORE)
}

/// Group candidate library rows per user, score them, and keep the best
/// `limit` (score descending, then user id ascending).
pub fn rank_candidates(
    mine: &[GameProfile],
    rows: &[CandidateGameRow],
    limit: usize,
) -> Vec<Candidate> {
    let mut per_user: BTreeMap<i64, Vec<&CandidateGameRow>> = BTreeMap::new();
    for row in rows {
        per_user.entry(row.user_id).or_default().push(row);
    }

    let mut candidates: Vec<Candidate> = per_user
        .into_iter()
        .filter_map(|(user_id, games)| {
            let theirs: Vec<GameProfile> = games.iter().map(|r| GameProfile::from(*r)).collect();
            let score = compatibility_score(mine, &theirs);
            if score == 0 {
                return None;
            }
            let common_games = games
                .iter()
                .filter(|r| mine.iter().any(|m| m.game_id == r.game_id))
                .map(|r| r.game_name.clone())
                .collect();
            Some(Candidate {
                user_id,
                username: games[0].username.clone(),
                match_score: score,
                common_games,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.match_score
            .cmp(&a.match_score)
            .then(a.user_id.cmp(&b.user_id))
    });
    candidates.truncate(limit);
    candidates
}

// ── Scorer seam ──────────────────────────────────────────────────────

/// Produces ordered match candidates for a user.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MatchScorer: Send + Sync {
    async fn find_candidates(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<Candidate>, sqlx::Error>;
}

/// Default scorer: game-library overlap against every not-yet-matched player.
pub struct OverlapScorer {
    db: Arc<Database>,
}

impl OverlapScorer {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MatchScorer for OverlapScorer {
    async fn find_candidates(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<Candidate>, sqlx::Error> {
        let library = self.db.list_user_games(user_id).await?;
        if library.is_empty() {
            return Ok(Vec::new());
        }
        let mine: Vec<GameProfile> = library.iter().map(GameProfile::from).collect();
        let rows = self.db.list_candidate_games(user_id).await?;
        Ok(rank_candidates(&mine, &rows, limit))
    }
}
