/// Chat service configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. When absent the in-memory store is used.
    pub database_url: Option<String>,
    /// Maximum pooled PostgreSQL connections.
    pub db_pool_size: usize,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Worker id mixed into generated message ids.
    pub worker_id: u16,
    /// Seed the default channels and demo users when running on the in-memory store.
    pub seed_defaults: bool,
    /// Frames queued per connection before further frames are dropped.
    pub outbox_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            db_pool_size: 20,
            port: 4100,
            worker_id: 0,
            seed_defaults: true,
            outbox_capacity: 256,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_pool_size: parsed_var("DB_POOL_SIZE")
                .filter(|&size| size > 0)
                .unwrap_or(defaults.db_pool_size),
            port: parsed_var("PORT").unwrap_or(defaults.port),
            worker_id: parsed_var("WORKER_ID").unwrap_or(defaults.worker_id),
            seed_defaults: std::env::var("SEED_DEFAULTS")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.seed_defaults),
            outbox_capacity: parsed_var("OUTBOX_CAPACITY")
                .filter(|&capacity| capacity > 0)
                .unwrap_or(defaults.outbox_capacity),
        }
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
