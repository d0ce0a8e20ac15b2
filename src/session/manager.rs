use super::*;

/// Keyed cache of live sessions for pooled reuse.
///
/// Maps many callers onto few device connections. The key is derived
/// deterministically from the credential/device tuple, each entry is guarded
/// by its own mutex (the session itself does no locking), and idle entries
/// are evicted by the cache. The manager is an explicit, injectable object:
/// there is no ambient global state, so embedders can hold one manager per
/// deployment or one per test.
pub struct OltConnectionManager {
    cache: Cache<String, Arc<Mutex<OltSession>>>,
}

impl OltConnectionManager {
    /// Manager with the default idle expiry of five minutes.
    pub fn new() -> Self {
        Self::with_idle_expiry(Duration::from_secs(5 * 60))
    }

    /// Manager evicting sessions unused for `idle`.
    pub fn with_idle_expiry(idle: Duration) -> Self {
        // Up to 100 live device connections.
        let cache = Cache::builder()
            .max_capacity(100)
            .time_to_idle(idle)
            .build();
        Self { cache }
    }

    /// Deterministic cache key for a (username, password, device) tuple.
    ///
    /// Hashed so the password never sits in the cache as a key.
    pub fn connection_key(username: &str, password: &str, host: &str, port: u16) -> String {
        let mut hasher = Sha256::new();
        hasher.update(username.as_bytes());
        hasher.update([0]);
        hasher.update(password.as_bytes());
        hasher.update([0]);
        hasher.update(format!("{host}:{port}").as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }

    /// Returns a cached healthy session or connects a new one.
    ///
    /// A cached entry is reused only when it is alive, was opened with the
    /// same credentials, and answers the health probe. Anything less is
    /// closed and recreated.
    pub async fn get(
        &self,
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        options: SessionOptions,
    ) -> Result<Arc<Mutex<OltSession>>, OltError> {
        let key = Self::connection_key(username, password, host, port);

        if let Some(entry) = self.cache.get(&key).await {
            let mut session = entry.lock().await;
            if session.is_alive()
                && session.matches_credentials(username, password)
                && session.is_healthy().await
            {
                debug!("cache hit, reusing session for {}", session.device_addr());
                drop(session);
                return Ok(entry);
            }
            debug!(
                "cached session for {} unusable, recreating",
                session.device_addr()
            );
            session.close().await;
            drop(session);
            self.cache.invalidate(&key).await;
        }

        let session = OltSession::connect(host, port, username, password, options).await?;
        debug!("new session cached for {}", session.device_addr());
        let entry = Arc::new(Mutex::new(session));
        self.cache.insert(key, entry.clone()).await;
        Ok(entry)
    }

    /// Closes and evicts the session for one credential/device tuple.
    /// Idempotent: a missing entry is a no-op.
    pub async fn close(&self, host: &str, port: u16, username: &str, password: &str) {
        let key = Self::connection_key(username, password, host, port);
        if let Some(entry) = self.cache.get(&key).await {
            entry.lock().await.close().await;
        }
        self.cache.invalidate(&key).await;
    }

    /// Closes every cached session and empties the cache.
    pub async fn close_all(&self) {
        for (_, entry) in self.cache.iter() {
            entry.lock().await.close().await;
        }
        self.cache.invalidate_all();
    }

    /// Number of cached entries, for eviction-policy observability.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for OltConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_key_is_deterministic() {
        let a = OltConnectionManager::connection_key("admin", "admin", "10.0.0.1", 23);
        let b = OltConnectionManager::connection_key("admin", "admin", "10.0.0.1", 23);
        assert_eq!(a, b);
    }

    #[test]
    fn connection_key_separates_credentials_and_devices() {
        let base = OltConnectionManager::connection_key("admin", "admin", "10.0.0.1", 23);
        assert_ne!(
            base,
            OltConnectionManager::connection_key("admin", "other", "10.0.0.1", 23)
        );
        assert_ne!(
            base,
            OltConnectionManager::connection_key("other", "admin", "10.0.0.1", 23)
        );
        assert_ne!(
            base,
            OltConnectionManager::connection_key("admin", "admin", "10.0.0.2", 23)
        );
        assert_ne!(
            base,
            OltConnectionManager::connection_key("admin", "admin", "10.0.0.1", 2323)
        );
    }

    #[test]
    fn key_boundaries_are_unambiguous() {
        // "ab" + "c" must not collide with "a" + "bc".
        let a = OltConnectionManager::connection_key("ab", "c", "h", 23);
        let b = OltConnectionManager::connection_key("a", "bc", "h", 23);
        assert_ne!(a, b);
    }
}
