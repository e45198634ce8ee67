use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::provider::{GeminiProvider, VisionProvider};
use super::{AnalysisError, AnalysisResult};
use crate::config::AnalysisConfig;
use crate::store::{PhotoId, PhotoStore};

/// Outcome of one finished analysis attempt, surfaced to the caller
/// for user-facing notices.
#[derive(Debug, Clone)]
pub struct AnalysisEvent {
    pub photo_id: PhotoId,
    pub success: bool,
    pub message: String,
}

struct PendingAnalysis {
    receiver: mpsc::Receiver<Result<AnalysisResult, AnalysisError>>,
}

/// Drives the per-record analysis state machine:
/// Idle -> Analyzing -> Idle with result or error.
///
/// `request` flips the record to analyzing and hands the blocking
/// provider call to a worker thread; `poll` drains finished workers
/// and merges their outcomes back into the store. The store is only
/// ever touched on the caller's thread; workers communicate through
/// channels.
pub struct AnalysisCoordinator {
    provider: Option<Arc<dyn VisionProvider>>,
    pending: HashMap<PhotoId, PendingAnalysis>,
}

impl AnalysisCoordinator {
    pub fn new(provider: Option<Arc<dyn VisionProvider>>) -> Self {
        Self {
            provider,
            pending: HashMap::new(),
        }
    }

    /// Build from configuration. The provider exists only when a
    /// credential is present, so a missing key disables the feature
    /// as a whole rather than erroring per use.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let provider = config.api_key.as_deref().map(|key| {
            Arc::new(GeminiProvider::new(config, key)) as Arc<dyn VisionProvider>
        });
        Self::new(provider)
    }

    /// Whether analysis is offered at all.
    pub fn available(&self) -> bool {
        self.provider.is_some()
    }

    /// Number of requests still in flight.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Start analysis for one record.
    ///
    /// Fails fast with `MissingCredential` before any state transition
    /// when no provider is configured, so the record never flickers
    /// into the analyzing state. Unknown ids and records that are
    /// already analyzing are silent no-ops.
    pub fn request(&mut self, store: &mut PhotoStore, id: PhotoId) -> Result<(), AnalysisError> {
        let provider = match &self.provider {
            Some(p) => Arc::clone(p),
            None => return Err(AnalysisError::MissingCredential),
        };

        let source = match store.get(id) {
            Some(photo) if photo.is_analyzing => return Ok(()),
            Some(photo) => photo.source.clone(),
            None => return Ok(()),
        };

        // Visible to observers before the external call is issued.
        store.set_analyzing(id, true);
        tracing::debug!(photo_id = id.0, provider = provider.provider_name(), "Analysis requested");

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let outcome = provider.analyze_image(&source);
            let _ = tx.send(outcome);
        });

        self.pending.insert(id, PendingAnalysis { receiver: rx });
        Ok(())
    }

    /// Drain finished workers without blocking and merge their
    /// outcomes into the store. A failure clears the analyzing flag
    /// and leaves tags, rating and description untouched; there is no
    /// automatic retry.
    pub fn poll(&mut self, store: &mut PhotoStore) -> Vec<AnalysisEvent> {
        let mut finished = Vec::new();

        for (&id, pending) in &self.pending {
            match pending.receiver.try_recv() {
                Ok(outcome) => finished.push((id, outcome)),
                Err(mpsc::TryRecvError::Empty) => {}
                Err(mpsc::TryRecvError::Disconnected) => {
                    finished.push((
                        id,
                        Err(AnalysisError::Transport(
                            "analysis worker exited unexpectedly".to_string(),
                        )),
                    ));
                }
            }
        }

        let mut events = Vec::new();
        for (id, outcome) in finished {
            self.pending.remove(&id);
            match outcome {
                Ok(result) => {
                    store.apply_analysis_result(id, &result);
                    tracing::info!(photo_id = id.0, tags = result.tags.len(), "Analysis completed");
                    events.push(AnalysisEvent {
                        photo_id: id,
                        success: true,
                        message: format!("Analysis suggested {} tags", result.tags.len()),
                    });
                }
                Err(e) => {
                    store.set_analyzing(id, false);
                    tracing::error!(photo_id = id.0, error = %e, "Analysis failed");
                    events.push(AnalysisEvent {
                        photo_id: id,
                        success: false,
                        message: format!("AI analysis failed: {}", e),
                    });
                }
            }
        }

        events
    }

    /// Block until every outstanding request has resolved, collecting
    /// all events along the way.
    pub fn wait_all(&mut self, store: &mut PhotoStore) -> Vec<AnalysisEvent> {
        let mut events = Vec::new();
        while !self.pending.is_empty() {
            let batch = self.poll(store);
            if batch.is_empty() {
                thread::sleep(Duration::from_millis(50));
            }
            events.extend(batch);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Photo, PhotoMetadata};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    fn photo(path: &str) -> Photo {
        Photo::new(
            PathBuf::from("/pictures").join(path),
            PhotoMetadata {
                filename: path.to_string(),
                path: path.to_string(),
                size_bytes: 0,
                mime_type: "image/jpeg".to_string(),
                modified_at: None,
                dimensions: None,
            },
        )
    }

    fn result(tags: &[&str], rating: u8) -> AnalysisResult {
        AnalysisResult {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            description: "A test photo".to_string(),
            rating_suggestion: rating,
        }
    }

    /// Resolves immediately with a fixed outcome.
    struct FixedProvider {
        outcome: Result<AnalysisResult, AnalysisError>,
    }

    impl VisionProvider for FixedProvider {
        fn analyze_image(&self, _: &Path) -> Result<AnalysisResult, AnalysisError> {
            self.outcome.clone()
        }

        fn provider_name(&self) -> &'static str {
            "fixed"
        }
    }

    /// Blocks until released through a channel, then succeeds.
    struct GatedProvider {
        release: Mutex<mpsc::Receiver<()>>,
        result: AnalysisResult,
    }

    impl VisionProvider for GatedProvider {
        fn analyze_image(&self, _: &Path) -> Result<AnalysisResult, AnalysisError> {
            let _ = self.release.lock().unwrap().recv();
            Ok(self.result.clone())
        }

        fn provider_name(&self) -> &'static str {
            "gated"
        }
    }

    fn coordinator_with(
        outcome: Result<AnalysisResult, AnalysisError>,
    ) -> AnalysisCoordinator {
        AnalysisCoordinator::new(Some(Arc::new(FixedProvider { outcome })))
    }

    #[test]
    fn test_missing_credential_fails_without_flicker() {
        let mut store = PhotoStore::new();
        let p = photo("a.jpg");
        let id = p.id;
        store.append(vec![p]);

        let mut coordinator = AnalysisCoordinator::new(None);
        assert!(!coordinator.available());

        let err = coordinator.request(&mut store, id).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingCredential));
        assert!(!store.get(id).unwrap().is_analyzing);
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[test]
    fn test_unknown_id_is_silent_noop() {
        let mut store = PhotoStore::new();
        let mut coordinator = coordinator_with(Ok(result(&["sunset"], 3)));

        coordinator.request(&mut store, PhotoId::next()).unwrap();
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[test]
    fn test_success_merges_into_store() {
        let mut store = PhotoStore::new();
        let p = photo("a.jpg");
        let id = p.id;
        store.append(vec![p]);
        store.add_tag(id, "sunset");
        store.update_rating(id, 2);

        let mut coordinator = coordinator_with(Ok(result(&["beach", "sunset"], 5)));
        coordinator.request(&mut store, id).unwrap();
        let events = coordinator.wait_all(&mut store);

        assert_eq!(events.len(), 1);
        assert!(events[0].success);

        let merged = store.get(id).unwrap();
        assert_eq!(merged.tags, vec!["sunset".to_string(), "beach".to_string()]);
        assert_eq!(merged.ai_description.as_deref(), Some("A test photo"));
        // User rating survives the suggestion.
        assert_eq!(merged.rating, 2);
        assert!(!merged.is_analyzing);
    }

    #[test]
    fn test_success_rates_unrated_record() {
        let mut store = PhotoStore::new();
        let p = photo("a.jpg");
        let id = p.id;
        store.append(vec![p]);

        let mut coordinator = coordinator_with(Ok(result(&[], 4)));
        coordinator.request(&mut store, id).unwrap();
        coordinator.wait_all(&mut store);

        assert_eq!(store.get(id).unwrap().rating, 4);
    }

    #[test]
    fn test_failure_clears_flag_and_leaves_data() {
        let mut store = PhotoStore::new();
        let p = photo("a.jpg");
        let id = p.id;
        store.append(vec![p]);
        store.add_tag(id, "sunset");
        store.update_rating(id, 3);

        let mut coordinator =
            coordinator_with(Err(AnalysisError::Transport("connection refused".to_string())));
        coordinator.request(&mut store, id).unwrap();
        let events = coordinator.wait_all(&mut store);

        assert_eq!(events.len(), 1);
        assert!(!events[0].success);
        assert!(events[0].message.contains("failed"));

        let untouched = store.get(id).unwrap();
        assert!(!untouched.is_analyzing);
        assert_eq!(untouched.tags, vec!["sunset".to_string()]);
        assert_eq!(untouched.rating, 3);
        assert!(untouched.ai_description.is_none());
    }

    #[test]
    fn test_rerequest_while_analyzing_is_guarded() {
        let mut store = PhotoStore::new();
        let p = photo("a.jpg");
        let id = p.id;
        store.append(vec![p]);

        let (release_tx, release_rx) = mpsc::channel();
        let provider = Arc::new(GatedProvider {
            release: Mutex::new(release_rx),
            result: result(&["sunset"], 3),
        });
        let mut coordinator = AnalysisCoordinator::new(Some(provider));

        coordinator.request(&mut store, id).unwrap();
        assert!(store.get(id).unwrap().is_analyzing);

        // A second invocation while in flight must not spawn another call.
        coordinator.request(&mut store, id).unwrap();
        assert_eq!(coordinator.pending_count(), 1);

        release_tx.send(()).unwrap();
        let events = coordinator.wait_all(&mut store);

        assert_eq!(events.len(), 1);
        assert_eq!(store.get(id).unwrap().tags, vec!["sunset".to_string()]);
    }
}
