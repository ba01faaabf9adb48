// Database access layer (SQLite via sqlx).

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{Sqlite, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::QueryBuilder;

// ── Enumerations stored as TEXT ───────────────────────────────────────

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl SkillLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            SkillLevel::Beginner => "beginner",
            SkillLevel::Intermediate => "intermediate",
            SkillLevel::Advanced => "advanced",
            SkillLevel::Expert => "expert",
        }
    }

    /// Unknown values read back as `Beginner`.
    pub fn parse(s: &str) -> Self {
        match s {
            "intermediate" => SkillLevel::Intermediate,
            "advanced" => SkillLevel::Advanced,
            "expert" => SkillLevel::Expert,
            _ => SkillLevel::Beginner,
        }
    }

    /// Ordinal used for skill distance (beginner = 0 .. expert = 3).
    pub fn rank(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Accepted,
    Rejected,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Accepted => "accepted",
            MatchStatus::Rejected => "rejected",
        }
    }
}

// ── Rows ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email_verified: i64,
    pub bio: String,
    pub created_at: String,
}

impl User {
    pub fn is_email_verified(&self) -> bool {
        self.email_verified != 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Game {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub icon_url: Option<String>,
}

/// A game in a user's library, joined with its catalogue entry.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LibraryEntry {
    pub game_id: i64,
    pub name: String,
    pub category: String,
    pub icon_url: Option<String>,
    pub skill_level: String,
    pub hours_played: i64,
}

/// One library row of a prospective match partner.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandidateGameRow {
    pub user_id: i64,
    pub username: String,
    pub game_id: i64,
    pub game_name: String,
    pub skill_level: String,
    pub hours_played: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MatchRecord {
    pub id: i64,
    pub user1_id: i64,
    pub user2_id: i64,
    pub score: i64,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl MatchRecord {
    pub fn partner_of(&self, user_id: i64) -> i64 {
        if self.user1_id == user_id {
            self.user2_id
        } else {
            self.user1_id
        }
    }
}

/// A match seen from one participant's side.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MatchSummary {
    pub id: i64,
    pub partner_id: i64,
    pub partner_username: String,
    pub score: i64,
    pub status: String,
    pub created_at: String,
}

/// Outcome of recording one suggested pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedMatch {
    pub partner_id: i64,
    pub match_id: i64,
    pub created: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub match_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub kind: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlatformStats {
    pub total_users: i64,
    pub total_games: i64,
    pub total_matches: i64,
    pub accepted_matches: i64,
    pub total_messages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlayerSummary {
    pub id: i64,
    pub username: String,
    pub bio: String,
    pub game_count: i64,
}

/// Starter catalogue inserted by [`Database::seed_games`].
const STARTER_GAMES: &[(&str, &str)] = &[
    ("Apex Legends", "Battle Royale"),
    ("Counter-Strike 2", "FPS"),
    ("Fortnite", "Battle Royale"),
    ("League of Legends", "MOBA"),
    ("Minecraft", "Sandbox"),
    ("Overwatch 2", "FPS"),
    ("Rocket League", "Sports"),
    ("Valorant", "FPS"),
];

// ── Query builders ────────────────────────────────────────────────────

/// `%q%` with LIKE wildcards in `q` taken literally (escape char `\`).
fn contains_pattern(q: &str) -> String {
    let mut pattern = String::with_capacity(q.len() + 2);
    pattern.push('%');
    for c in q.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Catalogue search: name containment and/or exact category; no filter lists everything.
pub fn game_search_query<'a>(
    q: Option<&'a str>,
    category: Option<&'a str>,
) -> QueryBuilder<'a, Sqlite> {
    let mut qb = QueryBuilder::new("SELECT id, name, category, icon_url FROM games WHERE 1=1");
    if let Some(q) = q.map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND name LIKE ")
            .push_bind(contains_pattern(q))
            .push(" ESCAPE '\\'");
    }
    if let Some(category) = category.map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND category = ").push_bind(category);
    }
    qb.push(" ORDER BY name");
    qb
}

/// Player search excluding the caller.
pub fn player_search_query<'a>(
    exclude_user_id: i64,
    q: Option<&'a str>,
    game_id: Option<i64>,
    limit: i64,
) -> QueryBuilder<'a, Sqlite> {
    let mut qb = QueryBuilder::new(
        "SELECT u.id, u.username, u.bio, \
         (SELECT COUNT(*) FROM user_games ug WHERE ug.user_id = u.id) AS game_count \
         FROM users u WHERE u.id != ",
    );
    qb.push_bind(exclude_user_id);
    if let Some(q) = q.map(str::trim).filter(|s| !s.is_empty()) {
        qb.push(" AND u.username LIKE ")
            .push_bind(contains_pattern(q))
            .push(" ESCAPE '\\'");
    }
    if let Some(game_id) = game_id {
        qb.push(" AND EXISTS (SELECT 1 FROM user_games ug2 WHERE ug2.user_id = u.id AND ug2.game_id = ")
            .push_bind(game_id)
            .push(")");
    }
    qb.push(" ORDER BY u.username LIMIT ").push_bind(limit);
    qb
}

/// Refresh a pending match for the unordered pair or insert a new one.
/// Returns the id and whether the row was created; `None` when the pair's
/// match is already finalized.
async fn record_pair(
    conn: &mut SqliteConnection,
    user1_id: i64,
    user2_id: i64,
    score: i64,
) -> Result<Option<(i64, bool)>, sqlx::Error> {
    let refreshed = sqlx::query_scalar::<_, i64>(
        "UPDATE matches SET score = ?, updated_at = datetime('now') \
         WHERE status = 'pending' \
           AND min(user1_id, user2_id) = min(?, ?) AND max(user1_id, user2_id) = max(?, ?) \
         RETURNING id",
    )
    .bind(score)
    .bind(user1_id)
    .bind(user2_id)
    .bind(user1_id)
    .bind(user2_id)
    .fetch_optional(&mut *conn)
    .await?;
    if let Some(id) = refreshed {
        return Ok(Some((id, false)));
    }

    let inserted = sqlx::query_scalar::<_, i64>(
        "INSERT INTO matches (user1_id, user2_id, score) VALUES (?, ?, ?) \
         ON CONFLICT DO NOTHING RETURNING id",
    )
    .bind(user1_id)
    .bind(user2_id)
    .bind(score)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(inserted.map(|id| (id, true)))
}

// ── Database ──────────────────────────────────────────────────────────

/// Pool-backed session factory. Every method borrows a connection (or a
/// transaction) for the duration of the call only.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                username TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                email_verified INTEGER NOT NULL DEFAULT 0,
                bio TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                category TEXT NOT NULL,
                icon_url TEXT
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                game_id INTEGER NOT NULL REFERENCES games(id) ON DELETE CASCADE,
                skill_level TEXT NOT NULL DEFAULT 'beginner',
                hours_played INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(user_id, game_id)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS matches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user1_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                user2_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                score INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                CHECK (user1_id != user2_id)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        // One row per unordered pair, whoever searched first
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_matches_pair \
             ON matches (min(user1_id, user2_id), max(user1_id, user2_id))",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                match_id INTEGER NOT NULL REFERENCES matches(id) ON DELETE CASCADE,
                sender_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                kind TEXT NOT NULL,
                content TEXT NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert the starter catalogue; existing names are left alone.
    pub async fn seed_games(&self) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for (name, category) in STARTER_GAMES {
            let result = sqlx::query("INSERT OR IGNORE INTO games (name, category) VALUES (?, ?)")
                .bind(name)
                .bind(category)
                .execute(&mut *tx)
                .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    // ── Users ─────────────────────────────────────────────────────────

    pub async fn create_user(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
        bio: &str,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (email, username, password_hash, bio) VALUES (?, ?, ?, ?) \
             RETURNING id, email, username, password_hash, email_verified, bio, created_at",
        )
        .bind(email)
        .bind(username)
        .bind(password_hash)
        .bind(bio)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, username, password_hash, email_verified, bio, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, username, password_hash, email_verified, bio, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// Apply the provided profile fields; `None` when the user does not exist.
    pub async fn update_user(
        &self,
        id: i64,
        username: Option<&str>,
        bio: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET username = COALESCE(?, username), bio = COALESCE(?, bio) WHERE id = ?",
        )
        .bind(username)
        .bind(bio)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_user(id).await
    }

    pub async fn set_email_verified(&self, id: i64, verified: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET email_verified = ? WHERE id = ?")
            .bind(i64::from(verified))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Games ─────────────────────────────────────────────────────────

    pub async fn create_game(
        &self,
        name: &str,
        category: &str,
        icon_url: Option<&str>,
    ) -> Result<Game, sqlx::Error> {
        sqlx::query_as::<_, Game>(
            "INSERT INTO games (name, category, icon_url) VALUES (?, ?, ?) RETURNING id, name, category, icon_url",
        )
        .bind(name)
        .bind(category)
        .bind(icon_url)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn list_games(&self) -> Result<Vec<Game>, sqlx::Error> {
        sqlx::query_as::<_, Game>("SELECT id, name, category, icon_url FROM games ORDER BY name")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn get_game(&self, id: i64) -> Result<Option<Game>, sqlx::Error> {
        sqlx::query_as::<_, Game>("SELECT id, name, category, icon_url FROM games WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn search_games(
        &self,
        q: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<Game>, sqlx::Error> {
        let mut qb = game_search_query(q, category);
        qb.build_query_as::<Game>().fetch_all(&self.pool).await
    }

    // ── User library ──────────────────────────────────────────────────

    pub async fn list_user_games(&self, user_id: i64) -> Result<Vec<LibraryEntry>, sqlx::Error> {
        sqlx::query_as::<_, LibraryEntry>(
            "SELECT ug.game_id, g.name, g.category, g.icon_url, ug.skill_level, ug.hours_played \
             FROM user_games ug JOIN games g ON g.id = ug.game_id \
             WHERE ug.user_id = ? ORDER BY g.name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_user_game(
        &self,
        user_id: i64,
        game_id: i64,
    ) -> Result<Option<LibraryEntry>, sqlx::Error> {
        sqlx::query_as::<_, LibraryEntry>(
            "SELECT ug.game_id, g.name, g.category, g.icon_url, ug.skill_level, ug.hours_played \
             FROM user_games ug JOIN games g ON g.id = ug.game_id \
             WHERE ug.user_id = ? AND ug.game_id = ?",
        )
        .bind(user_id)
        .bind(game_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn add_user_game(
        &self,
        user_id: i64,
        game_id: i64,
        skill_level: SkillLevel,
        hours_played: i64,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO user_games (user_id, game_id, skill_level, hours_played) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(game_id)
        .bind(skill_level.as_str())
        .bind(hours_played)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update_user_game(
        &self,
        user_id: i64,
        game_id: i64,
        skill_level: Option<SkillLevel>,
        hours_played: Option<i64>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_games SET skill_level = COALESCE(?, skill_level), \
             hours_played = COALESCE(?, hours_played) WHERE user_id = ? AND game_id = ?",
        )
        .bind(skill_level.map(SkillLevel::as_str))
        .bind(hours_played)
        .bind(user_id)
        .bind(game_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_user_game(&self, user_id: i64, game_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_games WHERE user_id = ? AND game_id = ?")
            .bind(user_id)
            .bind(game_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Library rows of every other user sharing at least one game with
    /// `user_id` and not yet matched with them in either direction.
    pub async fn list_candidate_games(
        &self,
        user_id: i64,
    ) -> Result<Vec<CandidateGameRow>, sqlx::Error> {
        sqlx::query_as::<_, CandidateGameRow>(
            r#"
            SELECT ug.user_id, u.username, ug.game_id, g.name AS game_name,
                   ug.skill_level, ug.hours_played
            FROM user_games ug
            JOIN users u ON u.id = ug.user_id
            JOIN games g ON g.id = ug.game_id
            WHERE ug.user_id != ?
              AND ug.user_id IN (
                  SELECT other.user_id FROM user_games other
                  WHERE other.game_id IN (SELECT mine.game_id FROM user_games mine WHERE mine.user_id = ?)
              )
              AND NOT EXISTS (
                  SELECT 1 FROM matches m
                  WHERE (m.user1_id = ? AND m.user2_id = ug.user_id)
                     OR (m.user2_id = ? AND m.user1_id = ug.user_id)
              )
            ORDER BY ug.user_id, g.name
        "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    // ── Matches ───────────────────────────────────────────────────────

    /// Record a pending match for a single pair. `None` when the pair
    /// already has an accepted or rejected match.
    pub async fn create_match_record(
        &self,
        user1_id: i64,
        user2_id: i64,
        score: i64,
    ) -> Result<Option<i64>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        let recorded = record_pair(&mut *conn, user1_id, user2_id, score).await?;
        Ok(recorded.map(|(id, _)| id))
    }

    /// Record one search's suggestions atomically, in input order. Each pair
    /// is `(partner_id, score)`. Newly created matches notify the partner;
    /// pending ones only get their score refreshed; finalized pairs and
    /// self-pairs are skipped.
    pub async fn record_matches(
        &self,
        user_id: i64,
        pairs: &[(i64, i64)],
    ) -> Result<Vec<RecordedMatch>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut recorded = Vec::with_capacity(pairs.len());

        for &(partner_id, score) in pairs {
            if partner_id == user_id {
                continue;
            }
            let Some((match_id, created)) =
                record_pair(&mut *tx, user_id, partner_id, score).await?
            else {
                continue;
            };
            if created {
                sqlx::query("INSERT INTO notifications (user_id, kind, content) VALUES (?, ?, ?)")
                    .bind(partner_id)
                    .bind("new_match")
                    .bind(format!("New match suggestion ({score}% compatible)"))
                    .execute(&mut *tx)
                    .await?;
            }
            recorded.push(RecordedMatch {
                partner_id,
                match_id,
                created,
            });
        }

        tx.commit().await?;
        Ok(recorded)
    }

    pub async fn get_match(&self, id: i64) -> Result<Option<MatchRecord>, sqlx::Error> {
        sqlx::query_as::<_, MatchRecord>(
            "SELECT id, user1_id, user2_id, score, status, created_at, updated_at FROM matches WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Move a pending match the user takes part in to `status`. Returns the
    /// affected-row count; zero means no such pending match for this user.
    /// Accepting notifies the other participant in the same transaction.
    pub async fn decide_match(
        &self,
        match_id: i64,
        user_id: i64,
        status: MatchStatus,
    ) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE matches SET status = ?, updated_at = datetime('now') \
             WHERE id = ? AND (user1_id = ? OR user2_id = ?) AND status = 'pending'",
        )
        .bind(status.as_str())
        .bind(match_id)
        .bind(user_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() > 0 && status == MatchStatus::Accepted {
            let partner_id: i64 = sqlx::query_scalar(
                "SELECT CASE WHEN user1_id = ? THEN user2_id ELSE user1_id END FROM matches WHERE id = ?",
            )
            .bind(user_id)
            .bind(match_id)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query("INSERT INTO notifications (user_id, kind, content) VALUES (?, ?, ?)")
                .bind(partner_id)
                .bind("match_accepted")
                .bind("Your match was accepted")
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    pub async fn list_matches_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<MatchSummary>, sqlx::Error> {
        sqlx::query_as::<_, MatchSummary>(
            r#"
            SELECT m.id,
                   CASE WHEN m.user1_id = ? THEN m.user2_id ELSE m.user1_id END AS partner_id,
                   u.username AS partner_username,
                   m.score, m.status, m.created_at
            FROM matches m
            JOIN users u ON u.id = CASE WHEN m.user1_id = ? THEN m.user2_id ELSE m.user1_id END
            WHERE m.user1_id = ? OR m.user2_id = ?
            ORDER BY m.created_at DESC, m.id DESC
        "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// The match if `user_id` is a participant and it has been accepted.
    pub async fn get_accepted_match(
        &self,
        match_id: i64,
        user_id: i64,
    ) -> Result<Option<MatchRecord>, sqlx::Error> {
        sqlx::query_as::<_, MatchRecord>(
            "SELECT id, user1_id, user2_id, score, status, created_at, updated_at FROM matches \
             WHERE id = ? AND (user1_id = ? OR user2_id = ?) AND status = 'accepted'",
        )
        .bind(match_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    // ── Messages ──────────────────────────────────────────────────────

    /// Store a message and notify the recipient atomically.
    pub async fn create_message(
        &self,
        match_id: i64,
        sender_id: i64,
        recipient_id: i64,
        content: &str,
    ) -> Result<Message, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, Message>(
            "INSERT INTO messages (match_id, sender_id, content) VALUES (?, ?, ?) \
             RETURNING id, match_id, sender_id, content, created_at",
        )
        .bind(match_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO notifications (user_id, kind, content) VALUES (?, ?, ?)")
            .bind(recipient_id)
            .bind("new_message")
            .bind("You have a new message")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    pub async fn list_messages(&self, match_id: i64) -> Result<Vec<Message>, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            "SELECT id, match_id, sender_id, content, created_at FROM messages WHERE match_id = ? ORDER BY id",
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await
    }

    // ── Notifications ─────────────────────────────────────────────────

    pub async fn list_notifications(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(
            "SELECT id, user_id, kind, content, is_read, created_at FROM notifications \
             WHERE user_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn mark_notification_read(&self, id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Stats & search ────────────────────────────────────────────────

    pub async fn platform_stats(&self) -> Result<PlatformStats, sqlx::Error> {
        sqlx::query_as::<_, PlatformStats>(
            r#"
            SELECT (SELECT COUNT(*) FROM users) AS total_users,
                   (SELECT COUNT(*) FROM games) AS total_games,
                   (SELECT COUNT(*) FROM matches) AS total_matches,
                   (SELECT COUNT(*) FROM matches WHERE status = 'accepted') AS accepted_matches,
                   (SELECT COUNT(*) FROM messages) AS total_messages
        "#,
        )
        .fetch_one(&self.pool)
        .await
    }

    pub async fn search_players(
        &self,
        exclude_user_id: i64,
        q: Option<&str>,
        game_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<PlayerSummary>, sqlx::Error> {
        let mut qb = player_search_query(exclude_user_id, q, game_id, limit);
        qb.build_query_as::<PlayerSummary>()
            .fetch_all(&self.pool)
            .await
    }
}
