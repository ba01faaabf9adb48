// Application configuration, loaded from environment variables and CLI flags.

const DEV_JWT_SECRET: &str = "gamematch-dev-secret-change-in-production";

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL (SQLite connection string).
    pub database_url: String,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// HMAC secret used to sign access tokens.
    pub jwt_secret: String,
    /// Access token lifetime.
    pub jwt_expiration_hours: i64,
    /// Insert the starter game catalogue at startup.
    pub seed_games: bool,
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `DATABASE_URL` - SQLite connection string (default: `sqlite:gamematch.db?mode=rwc`)
    /// - `PORT` - HTTP server port (default: 8000)
    /// - `JWT_SECRET` - token signing secret (default: a development secret)
    /// - `JWT_EXPIRATION_HOURS` - token lifetime, 1..=720 (default: 24)
    /// - `SEED_GAMES` - set to `false` or `0` to skip catalogue seeding
    ///
    /// CLI flags:
    /// - `--port <PORT>` - Override the port
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:gamematch.db?mode=rwc".to_string());

        // Port: CLI flag --port takes precedence, then env var, then default
        let port = Self::parse_cli_value(&args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| std::env::var("PORT").ok().and_then(|v| v.parse().ok()))
            .unwrap_or(8000);

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.to_string()
        });

        let jwt_expiration_hours = std::env::var("JWT_EXPIRATION_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(24);

        let seed_games = std::env::var("SEED_GAMES")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);

        Config {
            database_url,
            port,
            jwt_secret,
            jwt_expiration_hours,
            seed_games,
        }
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.jwt_secret.is_empty() {
            return Err("JWT_SECRET must not be empty".to_string());
        }
        if !(1..=720).contains(&self.jwt_expiration_hours) {
            return Err("JWT_EXPIRATION_HOURS must be between 1 and 720".to_string());
        }
        Ok(())
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: "sqlite::memory:".to_string(),
            port: 8000,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expiration_hours: 24,
            seed_games: false,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    !(value.eq_ignore_ascii_case("false") || value == "0")
}
