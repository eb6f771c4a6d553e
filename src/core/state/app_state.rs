use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::core::config::BundlerConfig;
use crate::core::error::{BundlerError, BundlerResult};
use crate::core::http::build_http_client;
use crate::core::pipeline::BuildPipeline;

/// Context object owned by whoever drives builds (CLI, bot, service).
///
/// Holds the pipeline (and through it the shared HTTP client) and the set
/// of requesters with a build in flight. Nothing here survives the process.
pub struct AppState {
    pub pipeline: BuildPipeline,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl AppState {
    pub fn new(config: BundlerConfig) -> BundlerResult<Self> {
        config.validate()?;
        let http_client = build_http_client(&config.download)?;
        let config = Arc::new(config);

        info!(
            "Bundler ready (ceiling {} bytes, storage {:?})",
            config.archive.max_archive_bytes, config.archive.storage
        );

        Ok(Self {
            pipeline: BuildPipeline::new(config, http_client),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    /// Claim the build slot for `requester`. A second claim while the first
    /// guard is alive is rejected, not queued.
    pub fn try_begin_build(&self, requester: &str) -> BundlerResult<BuildGuard> {
        let mut in_flight = lock_in_flight(&self.in_flight);

        if !in_flight.insert(requester.to_string()) {
            warn!("Rejected concurrent build for {}", requester);
            return Err(BundlerError::BuildInProgress(requester.to_string()));
        }

        debug!("Build slot taken by {}", requester);
        Ok(BuildGuard {
            requester: requester.to_string(),
            in_flight: self.in_flight.clone(),
        })
    }

    pub fn is_building(&self, requester: &str) -> bool {
        lock_in_flight(&self.in_flight).contains(requester)
    }
}

// A poisoned lock still holds a usable set.
fn lock_in_flight(in_flight: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    match in_flight.lock() {
        Ok(set) => set,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Releases the requester's build slot when dropped, on every exit path.
#[derive(Debug)]
pub struct BuildGuard {
    requester: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl BuildGuard {
    pub fn requester(&self) -> &str {
        &self.requester
    }
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        lock_in_flight(&self.in_flight).remove(&self.requester);
        debug!("Build slot released by {}", self.requester);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_build_for_same_requester_is_rejected() {
        let state = AppState::new(BundlerConfig::default()).unwrap();

        let guard = state.try_begin_build("alice").unwrap();
        assert_eq!(guard.requester(), "alice");
        assert!(state.is_building("alice"));

        let err = state.try_begin_build("alice").unwrap_err();
        assert!(matches!(err, BundlerError::BuildInProgress(ref who) if who == "alice"));

        // Other requesters are independent.
        let _other = state.try_begin_build("bob").unwrap();

        drop(guard);
        assert!(!state.is_building("alice"));
        assert!(state.try_begin_build("alice").is_ok());
    }

    #[test]
    fn guard_is_released_when_a_task_panics() {
        let state = AppState::new(BundlerConfig::default()).unwrap();
        let guard = state.try_begin_build("carol").unwrap();

        let result = std::thread::spawn(move || {
            let _guard = guard;
            panic!("build blew up");
        })
        .join();

        assert!(result.is_err());
        assert!(!state.is_building("carol"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = BundlerConfig::default();
        config.download.max_attempts = 0;
        assert!(matches!(
            AppState::new(config),
            Err(BundlerError::Config(_))
        ));
    }

    #[test]
    fn poisoned_slot_table_still_accepts_builds() {
        let state = AppState::new(BundlerConfig::default()).unwrap();
        let in_flight = state.in_flight.clone();

        let result = std::thread::spawn(move || {
            let _held = in_flight.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(result.is_err());
        assert!(state.in_flight.is_poisoned());

        let guard = state.try_begin_build("dave").unwrap();
        assert!(state.is_building("dave"));
        assert!(matches!(
            state.try_begin_build("dave"),
            Err(BundlerError::BuildInProgress(_))
        ));
        drop(guard);
        assert!(!state.is_building("dave"));
    }
}
