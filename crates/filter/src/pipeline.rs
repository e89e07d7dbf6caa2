// Path: crates/filter/src/pipeline.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use hearth_api::filter_runtime::{ContentFilterRuntime, FilterVerdict};
use hearth_types::config::ContentFilterSection;
use hearth_types::event::Event;

use crate::cache::{instructions_hash, FilterCache};

/// C8: the TTL content-filter cache plus batched/concurrency-bounded calls
/// to the remote inference endpoint. Holds no reference to the event store
/// or access controller — the query pipeline (C7) is the only caller.
pub struct ContentFilter {
    runtime: Arc<dyn ContentFilterRuntime>,
    cache: FilterCache,
    enabled: bool,
    filter_kinds: Vec<u64>,
    timeout: Duration,
    batch_threshold: usize,
    semaphore: Semaphore,
}

impl ContentFilter {
    pub fn new(runtime: Arc<dyn ContentFilterRuntime>, config: &ContentFilterSection) -> Self {
        ContentFilter {
            runtime,
            cache: FilterCache::new(
                config.cache_size,
                Duration::from_secs(config.cache_ttl_minutes * 60),
            ),
            enabled: config.enabled,
            filter_kinds: config.filter_kinds.clone(),
            timeout: Duration::from_millis(config.ollama_timeout_ms),
            batch_threshold: config.batch_threshold,
            semaphore: Semaphore::new(config.concurrency_limit.max(1)),
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Drops expired cache entries; called by the background purge task.
    pub fn purge_expired(&self) -> usize {
        self.cache.purge_expired()
    }

    fn is_filterable(&self, event: &Event) -> bool {
        self.enabled && self.filter_kinds.contains(&event.kind)
    }

    fn build_prompt(instructions: &str, content: &str) -> String {
        format!(
            "{instructions}\n\nContent to evaluate:\n{content}\n\nRespond with exactly one word: true or false."
        )
    }

    fn parse_verdict(raw: &str) -> FilterVerdict {
        let normalized = raw.trim().to_lowercase();
        if normalized.contains("true") {
            FilterVerdict::pass("model-pass")
        } else if normalized.contains("false") {
            FilterVerdict::fail("model-fail")
        } else {
            FilterVerdict::fail("unclear-model-response")
        }
    }

    /// The six-step algorithm of spec §4.8: skip non-filterable/disabled,
    /// cache lookup, prompt build, fail-open HTTP call, textual parse, cache
    /// store with eviction.
    pub async fn filter_one(&self, event: &Event, instructions: &str) -> FilterVerdict {
        if !self.is_filterable(event) {
            return FilterVerdict::pass("skipped");
        }

        let key = (event.id, instructions_hash(instructions));
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }

        let _permit = self.semaphore.acquire().await;
        let prompt = Self::build_prompt(instructions, &event.content);
        let verdict = match self.runtime.classify(&prompt, self.timeout).await {
            Ok(raw) => Self::parse_verdict(&raw),
            Err(e) => {
                tracing::warn!(error = %e, event_id = %hex::encode(event.id), "content filter call failed, failing open");
                // Fail-open per spec §4.8 step 4; deliberately not cached.
                return FilterVerdict::pass("api-error");
            }
        };
        self.cache.insert(key, verdict.clone());
        verdict
    }

    /// Partitions `events` into batches of `batch_threshold`; below the
    /// threshold, runs every event through `filter_one` concurrently bounded
    /// by the semaphore. Output order always equals input order, and a
    /// per-event error keeps that event in the output (fail-open, spec
    /// §4.8's `filter_many` rules).
    pub async fn filter_many(
        &self,
        events: &[Event],
        instructions: &str,
    ) -> Vec<(Event, FilterVerdict)> {
        if events.len() < self.batch_threshold {
            return self.filter_concurrent(events, instructions).await;
        }

        let mut results = Vec::with_capacity(events.len());
        for batch in events.chunks(self.batch_threshold) {
            let mut batch_results = Vec::with_capacity(batch.len());
            for event in batch {
                let key = (event.id, instructions_hash(instructions));
                if let Some(cached) = self.cache.get(&key) {
                    batch_results.push((event.clone(), cached));
                } else {
                    // The reference implementation's batch HTTP path is
                    // best-effort and falls back to per-event calls; we go
                    // straight to the per-event path for cache misses.
                    let verdict = self.filter_one(event, instructions).await;
                    batch_results.push((event.clone(), verdict));
                }
            }
            results.extend(batch_results);
        }
        results
    }

    async fn filter_concurrent(
        &self,
        events: &[Event],
        instructions: &str,
    ) -> Vec<(Event, FilterVerdict)> {
        let futures = events
            .iter()
            .map(|event| async move { (event.clone(), self.filter_one(event, instructions).await) });
        futures::future::join_all(futures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hearth_api::error::FilterError;
    use hearth_types::event::Tag;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubRuntime {
        response: Result<String, String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ContentFilterRuntime for StubRuntime {
        async fn classify(&self, _prompt: &str, _timeout: Duration) -> Result<String, FilterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone().map_err(FilterError::Upstream)
        }
    }

    fn sample_config(kinds: Vec<u64>) -> ContentFilterSection {
        ContentFilterSection {
            enabled: true,
            ollama_url: "http://localhost:11434/api/generate".into(),
            ollama_model: "llama3".into(),
            ollama_timeout_ms: 5000,
            cache_size: 1000,
            cache_ttl_minutes: 60,
            filter_kinds: kinds,
            batch_threshold: 2,
            concurrency_limit: 4,
            api_key: None,
        }
    }

    fn sample_event(id: u8, kind: u64, content: &str) -> Event {
        Event {
            id: [id; 32],
            pubkey: [1u8; 32],
            created_at: 1,
            kind,
            tags: vec![Tag::new(["e", "x"])],
            content: content.to_string(),
            sig: [0u8; 64],
        }
    }

    #[tokio::test]
    async fn non_filterable_kind_is_skipped() {
        let runtime = Arc::new(StubRuntime {
            response: Ok("true".into()),
            calls: AtomicUsize::new(0),
        });
        let filter = ContentFilter::new(runtime, &sample_config(vec![1]));
        let event = sample_event(1, 7, "hello");
        let verdict = filter.filter_one(&event, "instructions").await;
        assert_eq!(verdict, FilterVerdict::pass("skipped"));
    }

    #[tokio::test]
    async fn upstream_error_fails_open_and_is_not_cached() {
        let runtime = Arc::new(StubRuntime {
            response: Err("HTTP 500".into()),
            calls: AtomicUsize::new(0),
        });
        let filter = ContentFilter::new(runtime, &sample_config(vec![1]));
        let event = sample_event(1, 1, "hello");
        let verdict = filter.filter_one(&event, "instructions").await;
        assert_eq!(verdict, FilterVerdict::pass("api-error"));
        assert_eq!(filter.cache_len(), 0);
    }

    #[tokio::test]
    async fn true_response_caches_pass() {
        let runtime = Arc::new(StubRuntime {
            response: Ok(" TRUE ".into()),
            calls: AtomicUsize::new(0),
        });
        let filter = ContentFilter::new(runtime.clone(), &sample_config(vec![1]));
        let event = sample_event(1, 1, "hello");
        let verdict = filter.filter_one(&event, "instructions").await;
        assert!(verdict.pass);
        assert_eq!(filter.cache_len(), 1);
        // second call hits the cache, does not re-invoke the runtime
        let _ = filter.filter_one(&event, "instructions").await;
        assert_eq!(runtime.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unclear_response_fails_with_specific_reason() {
        let runtime = Arc::new(StubRuntime {
            response: Ok("maybe?".into()),
            calls: AtomicUsize::new(0),
        });
        let filter = ContentFilter::new(runtime, &sample_config(vec![1]));
        let event = sample_event(1, 1, "hello");
        let verdict = filter.filter_one(&event, "instructions").await;
        assert_eq!(verdict, FilterVerdict::fail("unclear-model-response"));
    }

    #[tokio::test]
    async fn filter_many_preserves_input_order() {
        let runtime = Arc::new(StubRuntime {
            response: Ok("true".into()),
            calls: AtomicUsize::new(0),
        });
        let filter = ContentFilter::new(runtime, &sample_config(vec![1]));
        let events: Vec<Event> = (0..5).map(|i| sample_event(i, 1, "x")).collect();
        let results = filter.filter_many(&events, "instructions").await;
        let ids: Vec<u8> = results.iter().map(|(e, _)| e.id[0]).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }
}
