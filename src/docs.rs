// Plain-text API reference served at /docs.

pub const API_DOCS: &str = r#"# GameMatch API
> Find teammates who play the same games as you, at your level.

## Authentication
Bearer token (JWT from POST /register or POST /login), sent as
`Authorization: Bearer <token>`.

## Service
- GET /              - Status, name, version
- GET /health        - Liveness probe
- GET /docs          - This document
- GET /metrics       - Prometheus metrics

## Accounts
- POST /register     - {email, username, password, bio?} -> token + user
- POST /login        - {email, password} -> token + user
- GET  /profile      - Current user with their games
- PUT  /profile      - {username?, bio?}

## Games
- GET    /games                    - Full catalogue
- GET    /games/search?q=&category= - Filtered catalogue
- GET    /user/games               - Your library
- POST   /user/games               - {game_id, skill_level?, hours_played?}
- PUT    /user/games/{game_id}     - {skill_level?, hours_played?}
- DELETE /user/games/{game_id}     - Remove from library

Skill levels: beginner, intermediate, advanced, expert.

## Matching
- GET  /matches               - Your matches (either side)
- GET  /matches/find?limit=   - Discover and record new candidates
- POST /matches/{id}/accept   - Accept a pending match
- POST /matches/{id}/reject   - Reject a pending match

## Social
- GET  /messages?match_id=         - Conversation of an accepted match
- POST /messages                   - {match_id, content}
- GET  /notifications              - Latest notifications
- POST /notifications/{id}/read    - Mark one as read
- GET  /stats/platform             - Platform counters
- GET  /search/players?q=&game_id=&limit= - Find players

## Errors
Failures return `{"error": "<message>"}` with 400, 401, 404, 409, 429 or 500.
"#;
