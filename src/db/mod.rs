pub mod user_repository;

use std::thread;
use std::time::Duration;

use tracing::warn;

#[derive(Clone)]
pub struct Database {
    pub db: sled::Db,
}

impl Database {
    /// Open the backing store, retrying a fixed number of times with a
    /// fixed delay before giving up. Startup-only; per-request code never
    /// retries.
    pub fn connect(path: &str, retries: u32, delay: Duration) -> sled::Result<Self> {
        let mut attempts_left = retries;
        loop {
            match sled::open(path) {
                Ok(db) => return Ok(Database { db }),
                Err(err) if attempts_left > 0 => {
                    warn!(
                        error = %err,
                        attempts_left,
                        "failed to open database, retrying"
                    );
                    attempts_left -= 1;
                    thread::sleep(delay);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Throwaway store for tests; removed when dropped.
    #[allow(dead_code)]
    pub fn temporary() -> sled::Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Database { db })
    }
}
