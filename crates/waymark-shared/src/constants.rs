/// Application name
pub const APP_NAME: &str = "Waymark";

/// Result cap for the trending and nearby discovery feeds
pub const DISCOVER_LIMIT: usize = 50;

/// Result cap for pin and event text search
pub const SEARCH_LIMIT: u32 = 50;

/// Result cap for user search
pub const USER_SEARCH_LIMIT: u32 = 20;

/// Default radius for nearby discovery, in kilometers
pub const DEFAULT_NEARBY_RADIUS_KM: f64 = 10.0;

/// Kilometers per degree of latitude/longitude in the planar
/// distance approximation
pub const KM_PER_DEGREE: f64 = 111.0;

/// Maximum media blob size in bytes (50 MiB)
pub const MAX_BLOB_SIZE: usize = 50 * 1024 * 1024;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Session token lifetime for registered users, in hours (7 days)
pub const TOKEN_TTL_HOURS: i64 = 168;

/// Session token lifetime for guest accounts, in hours
pub const GUEST_TOKEN_TTL_HOURS: i64 = 24;
