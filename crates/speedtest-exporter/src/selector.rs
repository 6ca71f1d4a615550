//! Server selection.

use crate::types::SelectionPolicy;
use speedtest::{Server, ServerId};
use thiserror::Error;
use tracing::warn;

/// Why no server could be selected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("server list is empty")]
    NoServers,

    #[error("pinned server {id} is not available")]
    PinnedNotFound { id: ServerId },
}

/// Pick the server to test against.
///
/// `servers` must be ordered closest first; it is never re-sorted. A pinned
/// server is matched by exact identifier only, and without fallback a miss
/// is an error rather than a substitute.
pub fn select(policy: &SelectionPolicy, servers: &[Server]) -> Result<Server, SelectError> {
    let closest = servers.first().ok_or(SelectError::NoServers)?;

    match *policy {
        SelectionPolicy::Closest => Ok(closest.clone()),
        SelectionPolicy::Pinned {
            id,
            fallback_allowed,
        } => match servers.iter().find(|s| s.id == id) {
            Some(server) => Ok(server.clone()),
            None if fallback_allowed => {
                warn!(
                    pinned_id = %id,
                    fallback_id = %closest.id,
                    "Pinned server not available, falling back to closest"
                );
                Ok(closest.clone())
            }
            None => Err(SelectError::PinnedNotFound { id }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(id: u64, distance: f64) -> Server {
        Server {
            id: ServerId(id),
            name: format!("server-{id}"),
            sponsor: String::new(),
            country: "Testland".to_string(),
            host: format!("s{id}.example.net:8080"),
            url: format!("http://s{id}.example.net:8080/speedtest/upload.php"),
            lat: 0.0,
            lon: 0.0,
            distance,
        }
    }

    #[test]
    fn test_closest_returns_first() {
        let servers = vec![server(3, 10.0), server(1, 20.0), server(2, 30.0)];
        let selected = select(&SelectionPolicy::Closest, &servers).unwrap();
        assert_eq!(selected.id, ServerId(3));
    }

    #[test]
    fn test_closest_does_not_resort() {
        // Out-of-order input: selection must still take the first element
        let servers = vec![server(9, 500.0), server(8, 1.0)];
        let selected = select(&SelectionPolicy::Closest, &servers).unwrap();
        assert_eq!(selected.id, ServerId(9));
    }

    #[test]
    fn test_pinned_found() {
        let servers = vec![server(1, 1.0), server(42, 2.0), server(7, 3.0)];
        let policy = SelectionPolicy::Pinned {
            id: ServerId(42),
            fallback_allowed: false,
        };
        assert_eq!(select(&policy, &servers).unwrap().id, ServerId(42));
    }

    #[test]
    fn test_pinned_missing_without_fallback_fails() {
        let servers = vec![server(1, 1.0), server(7, 3.0)];
        let policy = SelectionPolicy::Pinned {
            id: ServerId(42),
            fallback_allowed: false,
        };
        assert_eq!(
            select(&policy, &servers),
            Err(SelectError::PinnedNotFound { id: ServerId(42) })
        );
    }

    #[test]
    fn test_pinned_missing_with_fallback_returns_closest() {
        let servers = vec![server(1, 1.0), server(7, 3.0)];
        let policy = SelectionPolicy::Pinned {
            id: ServerId(42),
            fallback_allowed: true,
        };
        assert_eq!(select(&policy, &servers).unwrap().id, ServerId(1));
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(
            select(&SelectionPolicy::Closest, &[]),
            Err(SelectError::NoServers)
        );
        let policy = SelectionPolicy::Pinned {
            id: ServerId(42),
            fallback_allowed: true,
        };
        assert_eq!(select(&policy, &[]), Err(SelectError::NoServers));
    }
}
