use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use exlock_core::{CoordinationStore, InMemoryCoordinationStore, StoreError};

/// Storage backend selected on the command line.
///
/// Accepted forms: `memory`, `sqlite:<path>`, `redis://...` / `rediss://...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Sqlite(PathBuf),
    Redis(String),
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "memory" {
            Ok(Backend::Memory)
        } else if let Some(path) = s.strip_prefix("sqlite:") {
            if path.is_empty() {
                return Err("sqlite backend needs a path, e.g. sqlite:exlock.db".to_string());
            }
            Ok(Backend::Sqlite(PathBuf::from(path)))
        } else if s.starts_with("redis://") || s.starts_with("rediss://") {
            Ok(Backend::Redis(s.to_string()))
        } else {
            Err(format!(
                "unknown storage '{}': use memory, sqlite:<path> or redis://host:port",
                s
            ))
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Memory => write!(f, "memory"),
            Backend::Sqlite(path) => write!(f, "sqlite:{}", path.display()),
            Backend::Redis(url) => write!(f, "{}", url),
        }
    }
}

pub async fn open(backend: &Backend) -> Result<Arc<dyn CoordinationStore>, StoreError> {
    match backend {
        Backend::Memory => {
            tracing::warn!("storage backend: in-memory (claims are only visible to this process)");
            Ok(Arc::new(InMemoryCoordinationStore::new()))
        }
        Backend::Sqlite(path) => open_sqlite(path),
        Backend::Redis(url) => open_redis(url).await,
    }
}

/// Delete lapsed claims. Only SQLite keeps expired rows around.
pub async fn purge(backend: &Backend) -> Result<usize, StoreError> {
    match backend {
        Backend::Sqlite(path) => purge_sqlite(path).await,
        Backend::Memory | Backend::Redis(_) => {
            tracing::info!(storage = %backend, "backend expires claims itself; nothing to purge");
            Ok(0)
        }
    }
}

#[cfg(feature = "sqlite")]
fn open_sqlite(path: &std::path::Path) -> Result<Arc<dyn CoordinationStore>, StoreError> {
    tracing::info!("storage backend: SQLite ({})", path.display());
    Ok(Arc::new(exlock_core::SqliteCoordinationStore::open(path)?))
}

#[cfg(not(feature = "sqlite"))]
fn open_sqlite(_path: &std::path::Path) -> Result<Arc<dyn CoordinationStore>, StoreError> {
    Err(not_compiled("sqlite"))
}

#[cfg(feature = "sqlite")]
async fn purge_sqlite(path: &std::path::Path) -> Result<usize, StoreError> {
    exlock_core::SqliteCoordinationStore::open(path)?.evict_expired().await
}

#[cfg(not(feature = "sqlite"))]
async fn purge_sqlite(_path: &std::path::Path) -> Result<usize, StoreError> {
    Err(not_compiled("sqlite"))
}

#[cfg(feature = "redis")]
async fn open_redis(url: &str) -> Result<Arc<dyn CoordinationStore>, StoreError> {
    tracing::info!("storage backend: Redis");
    Ok(Arc::new(exlock_core::RedisCoordinationStore::connect(url).await?))
}

#[cfg(not(feature = "redis"))]
async fn open_redis(_url: &str) -> Result<Arc<dyn CoordinationStore>, StoreError> {
    Err(not_compiled("redis"))
}

#[cfg(any(not(feature = "sqlite"), not(feature = "redis")))]
fn not_compiled(backend: &str) -> StoreError {
    StoreError::Unavailable(format!(
        "{} support not compiled in (enable the `{}` feature)",
        backend, backend
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backends() {
        assert_eq!("memory".parse::<Backend>(), Ok(Backend::Memory));
        assert_eq!(
            "sqlite:/var/lib/exlock.db".parse::<Backend>(),
            Ok(Backend::Sqlite(PathBuf::from("/var/lib/exlock.db")))
        );
        assert_eq!(
            "redis://127.0.0.1:6379/0".parse::<Backend>(),
            Ok(Backend::Redis("redis://127.0.0.1:6379/0".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_unknown_or_empty() {
        assert!("sqlite:".parse::<Backend>().is_err());
        assert!("postgres://db".parse::<Backend>().is_err());
        assert!("".parse::<Backend>().is_err());
    }

    #[test]
    fn test_display_matches_storage_string() {
        for storage in ["memory", "sqlite:claims.db", "redis://cache:6379"] {
            assert_eq!(storage.parse::<Backend>().unwrap().to_string(), storage);
        }
    }

    #[tokio::test]
    async fn test_purge_memory_is_noop() {
        assert_eq!(purge(&Backend::Memory).await.unwrap(), 0);
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_open_and_purge_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Backend::Sqlite(dir.path().join("claims.db"));

        let store = open(&backend).await.unwrap();
        assert!(store
            .conditional_set("lock:a", "t1", std::time::Duration::from_millis(10))
            .await
            .unwrap());
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;

        assert_eq!(purge(&backend).await.unwrap(), 1);
    }
}
