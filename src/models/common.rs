use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    /// Read replicas. Queries pick one at random per round trip; replica lag
    /// is tolerated (this library never writes).
    #[serde(default)]
    pub replica_urls: Vec<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    /// Endpoint of the external permission rule source. When absent, a
    /// deployment must inject its own `RuleSource` implementation.
    pub rule_source_url: Option<String>,
    /// Tolerated lag of the externally maintained counter cache, in seconds.
    /// Advisory only: logged at connect time, never enforced.
    #[serde(default = "default_count_staleness_secs")]
    pub count_staleness_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_count_staleness_secs() -> u64 {
    30
}

/// Who is asking. Request-scoped, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallerContext {
    /// Sees everything; rule evaluation is skipped entirely.
    Admin,
    /// A caller authenticated as this address.
    Authenticated(Address),
    /// No identity. The participant shortcut and caller-substitution rule
    /// patterns never apply.
    Anonymous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}
