//! Search Job Application Service
//!
//! Drives one remote search job through submit → poll → fetch → delete.
//! Each call issues exactly one request; the only retry policy is the
//! fixed-interval status poll.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{
    ResultEntry, ResultMode, SearchError, SearchJobHandle, SearchJobRequest, SearchJobStatus,
};
use crate::ports::{ApiRequest, ApiResponse, ApiTransport, ProgressSink};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 300;
pub const DEFAULT_PAGE_LIMIT: u32 = 10_000;

const JOBS_PATH: &str = "/search/jobs";

/// Polling and paging settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchJobConfig {
    /// Wait between status polls
    pub poll_interval: Duration,
    /// Status polls before giving up
    pub max_poll_attempts: u32,
    /// Page size when the caller does not pass a limit
    pub page_limit: u32,
}

impl Default for SearchJobConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// Application service for search jobs
pub struct SearchJobService<T: ApiTransport> {
    transport: Arc<T>,
    config: SearchJobConfig,
}

impl<T: ApiTransport> SearchJobService<T> {
    pub fn new(transport: Arc<T>, config: SearchJobConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &SearchJobConfig {
        &self.config
    }

    /// Create the remote job. No retry on failure.
    pub async fn submit(&self, request: &SearchJobRequest) -> Result<SearchJobHandle, SearchError> {
        let body = serde_json::to_value(request)
            .map_err(|e| SearchError::Submission(format!("Failed to serialize request: {e}")))?;

        let response = self.transport.send(ApiRequest::post(JOBS_PATH, body)).await?;

        if !response.is_success() {
            return Err(SearchError::Submission(format!(
                "API error ({}): {}",
                response.status,
                response.error_message()
            )));
        }

        let id = response
            .body
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SearchError::Submission("Response did not contain a job id".to_string()))?;

        let mut handle = SearchJobHandle::new(id);
        if let Some(link) = response.body.get("link") {
            handle = handle.with_link(link.clone());
        }

        tracing::info!("🔎 Search job {} created", handle);
        Ok(handle)
    }

    /// Single status check
    pub async fn status(&self, handle: &SearchJobHandle) -> Result<SearchJobStatus, SearchError> {
        let response = self.transport.send(ApiRequest::get(job_path(handle))).await?;
        let response = expect_success(response)?;

        serde_json::from_value(response.body)
            .map_err(|e| SearchError::transport(format!("Malformed job status: {e}")))
    }

    /// Poll until the job finishes, is cancelled, or the attempt cap is hit.
    ///
    /// A timed-out job is left on the server; cleanup is up to the caller.
    pub async fn poll_until_done(
        &self,
        handle: &SearchJobHandle,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<SearchJobStatus, SearchError> {
        let max_attempts = self.config.max_poll_attempts;

        for attempt in 1..=max_attempts {
            let status = self.status(handle).await?;

            tracing::debug!(
                "Search job {} poll {}/{}: {} ({} messages, {} records)",
                handle,
                attempt,
                max_attempts,
                status.state,
                status.message_count,
                status.record_count
            );

            if let Some(sink) = progress {
                sink.on_progress(&status);
            }

            if status.state.is_done() {
                tracing::info!(
                    "✅ Search job {} done ({} messages, {} records)",
                    handle,
                    status.message_count,
                    status.record_count
                );
                return Ok(status);
            }

            if status.state.is_cancelled() {
                return Err(SearchError::Cancelled {
                    id: handle.id().to_string(),
                });
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }

        Err(SearchError::Timeout {
            id: handle.id().to_string(),
            attempts: max_attempts,
        })
    }

    /// One page of records. Defaults: offset 0, configured page limit.
    pub async fn fetch_records(
        &self,
        handle: &SearchJobHandle,
        offset: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Vec<ResultEntry>, SearchError> {
        self.fetch(handle, ResultMode::Records, offset, limit).await
    }

    /// One page of messages. Defaults: offset 0, configured page limit.
    pub async fn fetch_messages(
        &self,
        handle: &SearchJobHandle,
        offset: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Vec<ResultEntry>, SearchError> {
        self.fetch(handle, ResultMode::Messages, offset, limit).await
    }

    /// One page in the given mode, returned as the server sent it
    pub async fn fetch(
        &self,
        handle: &SearchJobHandle,
        mode: ResultMode,
        offset: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Vec<ResultEntry>, SearchError> {
        let key = mode.path_segment();
        let request = ApiRequest::get(format!("{}/{}", job_path(handle), key))
            .with_query("offset", offset.unwrap_or(0))
            .with_query("limit", limit.unwrap_or(self.config.page_limit));

        let response = expect_success(self.transport.send(request).await?)?;

        let mut body = response.body;
        let entries = body
            .get_mut(key)
            .map(Value::take)
            .ok_or_else(|| SearchError::transport(format!("Response missing '{}' field", key)))?;

        serde_json::from_value(entries)
            .map_err(|e| SearchError::transport(format!("Malformed {}: {}", key, e)))
    }

    pub async fn delete_job(&self, handle: &SearchJobHandle) -> Result<(), SearchError> {
        let response = self.transport.send(ApiRequest::delete(job_path(handle))).await?;
        expect_success(response)?;
        tracing::debug!("Search job {} deleted", handle);
        Ok(())
    }

    /// Best-effort delete. Failures are logged and returned as `Cleanup`
    /// so callers can drop them without losing their primary error.
    pub async fn cleanup(&self, handle: &SearchJobHandle) -> Result<(), SearchError> {
        self.delete_job(handle).await.map_err(|e| {
            let err = SearchError::Cleanup {
                id: handle.id().to_string(),
                message: e.to_string(),
            };
            tracing::warn!("{}", err);
            err
        })
    }

    /// Submit, poll, fetch the first page of records, then delete the job
    pub async fn execute_search(
        &self,
        request: &SearchJobRequest,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Vec<ResultEntry>, SearchError> {
        self.execute(request, ResultMode::Records, progress).await
    }

    /// Same composition as `execute_search` with a caller-chosen mode.
    ///
    /// Submit and poll failures return before fetch or delete. Once polling
    /// succeeds the job is always deleted, and a failed delete never
    /// replaces a fetch error.
    pub async fn execute(
        &self,
        request: &SearchJobRequest,
        mode: ResultMode,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Vec<ResultEntry>, SearchError> {
        let handle = self.submit(request).await?;
        self.poll_until_done(&handle, progress).await?;

        let result = self.fetch(&handle, mode, None, None).await;

        // Cleanup errors are already logged
        let _ = self.cleanup(&handle).await;

        result
    }
}

fn job_path(handle: &SearchJobHandle) -> String {
    format!("{}/{}", JOBS_PATH, urlencoding::encode(handle.id()))
}

fn expect_success(response: ApiResponse) -> Result<ApiResponse, SearchError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(SearchError::http(response.status, response.error_message()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobState;
    use crate::ports::HttpMethod;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Reply = Result<ApiResponse, SearchError>;

    /// Routes requests by method/path and records everything it receives
    struct ScriptedTransport {
        requests: Mutex<Vec<ApiRequest>>,
        submit: Reply,
        statuses: Mutex<VecDeque<Reply>>,
        fallback_status: Reply,
        fetch: Reply,
        delete: Reply,
    }

    impl ScriptedTransport {
        fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                submit: Ok(ApiResponse::new(
                    202,
                    json!({"id": "4F2A9C", "link": {"rel": "self", "href": "https://api.sumologic.com/api/v1/search/jobs/4F2A9C"}}),
                )),
                statuses: Mutex::new(VecDeque::new()),
                fallback_status: Ok(status_reply("DONE GATHERING RESULTS")),
                fetch: Ok(ApiResponse::new(
                    200,
                    json!({"records": [{"map": {"_sourcehost": "web-1", "_count": "12"}}]}),
                )),
                delete: Ok(ApiResponse::new(200, Value::Null)),
            }
        }

        fn with_states(self, states: &[&str]) -> Self {
            *self.statuses.lock().unwrap() =
                states.iter().map(|s| Ok(status_reply(s))).collect();
            self
        }

        fn with_fallback_status(mut self, reply: Reply) -> Self {
            self.fallback_status = reply;
            self
        }

        fn with_submit(mut self, reply: Reply) -> Self {
            self.submit = reply;
            self
        }

        fn with_fetch(mut self, reply: Reply) -> Self {
            self.fetch = reply;
            self
        }

        fn with_delete(mut self, reply: Reply) -> Self {
            self.delete = reply;
            self
        }

        fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn count(&self, method: HttpMethod, predicate: impl Fn(&str) -> bool) -> usize {
            self.requests()
                .iter()
                .filter(|r| r.method == method && predicate(&r.path))
                .count()
        }

        fn status_calls(&self) -> usize {
            self.count(HttpMethod::Get, |p| p == "/search/jobs/4F2A9C")
        }

        fn delete_calls(&self) -> usize {
            self.count(HttpMethod::Delete, |_| true)
        }
    }

    #[async_trait::async_trait]
    impl ApiTransport for ScriptedTransport {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, SearchError> {
            self.requests.lock().unwrap().push(request.clone());

            match request.method {
                HttpMethod::Post => self.submit.clone(),
                HttpMethod::Delete => self.delete.clone(),
                HttpMethod::Get
                    if request.path.ends_with("/records")
                        || request.path.ends_with("/messages") =>
                {
                    self.fetch.clone()
                }
                HttpMethod::Get => self
                    .statuses
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| self.fallback_status.clone()),
            }
        }
    }

    fn status_reply(state: &str) -> ApiResponse {
        ApiResponse::new(
            200,
            json!({
                "state": state,
                "messageCount": 40,
                "recordCount": 2,
                "pendingErrors": [],
                "pendingWarnings": []
            }),
        )
    }

    fn fast_config() -> SearchJobConfig {
        SearchJobConfig {
            poll_interval: Duration::ZERO,
            ..SearchJobConfig::default()
        }
    }

    fn service(transport: &Arc<ScriptedTransport>) -> SearchJobService<ScriptedTransport> {
        SearchJobService::new(transport.clone(), fast_config())
    }

    fn request() -> SearchJobRequest {
        SearchJobRequest::new("error | count by _sourceHost", "1709251200000", "1709254800000")
    }

    fn handle() -> SearchJobHandle {
        SearchJobHandle::new("4F2A9C")
    }

    #[test]
    fn test_default_config_constants() {
        let config = SearchJobConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(2000));
        assert_eq!(config.max_poll_attempts, 300);
        assert_eq!(config.page_limit, 10_000);
    }

    #[tokio::test]
    async fn test_submit_posts_request_body() {
        let transport = Arc::new(ScriptedTransport::new());
        let handle = service(&transport).submit(&request()).await.unwrap();

        assert_eq!(handle.id(), "4F2A9C");
        assert!(handle.link().is_some());

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(sent.path, "/search/jobs");
        let body = sent.body.as_ref().unwrap();
        assert_eq!(body["from"], "1709251200000");
        assert_eq!(body["timeZone"], "UTC");
        assert_eq!(body["byReceiptTime"], false);
    }

    #[tokio::test]
    async fn test_submit_non_success_is_submission_error() {
        let transport = Arc::new(ScriptedTransport::new().with_submit(Ok(ApiResponse::new(
            400,
            json!({"status": 400, "code": "searchjob.invalid.timestamp.from", "message": "The 'from' field contains an invalid time."}),
        ))));

        let err = service(&transport).submit(&request()).await.unwrap_err();

        assert_eq!(
            err,
            SearchError::Submission(
                "API error (400): The 'from' field contains an invalid time.".to_string()
            )
        );
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_without_id_is_submission_error() {
        let transport = Arc::new(
            ScriptedTransport::new().with_submit(Ok(ApiResponse::new(202, json!({"link": {}})))),
        );

        let err = service(&transport).submit(&request()).await.unwrap_err();
        assert!(matches!(err, SearchError::Submission(_)));
    }

    #[tokio::test]
    async fn test_submit_network_failure_is_not_retried() {
        let transport = Arc::new(
            ScriptedTransport::new().with_submit(Err(SearchError::transport("connection reset"))),
        );

        let err = service(&transport).submit(&request()).await.unwrap_err();
        assert_eq!(err, SearchError::transport("connection reset"));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_poll_returns_after_done_and_reports_every_poll() {
        let transport = Arc::new(ScriptedTransport::new().with_states(&[
            "GATHERING RESULTS",
            "GATHERING RESULTS",
            "DONE GATHERING RESULTS",
        ]));
        let seen = Mutex::new(Vec::new());
        let progress = |status: &SearchJobStatus| seen.lock().unwrap().push(status.state.clone());

        let status = service(&transport)
            .poll_until_done(&handle(), Some(&progress))
            .await
            .unwrap();

        assert!(status.state.is_done());
        assert_eq!(status.record_count, 2);
        assert_eq!(transport.status_calls(), 3);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                JobState::GatheringResults,
                JobState::GatheringResults,
                JobState::DoneGatheringResults
            ]
        );
    }

    #[tokio::test]
    async fn test_poll_stops_on_cancel() {
        let transport = Arc::new(ScriptedTransport::new().with_states(&["CANCELLED"]));

        let err = service(&transport)
            .poll_until_done(&handle(), None)
            .await
            .unwrap_err();

        assert_eq!(err, SearchError::Cancelled { id: "4F2A9C".to_string() });
        assert_eq!(transport.status_calls(), 1);
    }

    #[tokio::test]
    async fn test_poll_times_out_at_attempt_cap() {
        let transport = Arc::new(
            ScriptedTransport::new().with_fallback_status(Ok(status_reply("GATHERING RESULTS"))),
        );

        let err = service(&transport)
            .poll_until_done(&handle(), None)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            SearchError::Timeout {
                id: "4F2A9C".to_string(),
                attempts: 300
            }
        );
        assert_eq!(transport.status_calls(), 300);
        assert_eq!(transport.delete_calls(), 0);
    }

    #[tokio::test]
    async fn test_poll_keeps_going_through_unknown_states() {
        let transport = Arc::new(ScriptedTransport::new().with_states(&[
            "NOT STARTED",
            "FORCE PAUSED",
            "DONE GATHERING RESULTS",
        ]));

        let status = service(&transport)
            .poll_until_done(&handle(), None)
            .await
            .unwrap();

        assert!(status.state.is_done());
        assert_eq!(transport.status_calls(), 3);
    }

    #[tokio::test]
    async fn test_poll_not_found_is_terminal() {
        let transport = Arc::new(ScriptedTransport::new().with_fallback_status(Ok(
            ApiResponse::new(404, json!({"message": "Job ID is invalid."})),
        )));

        let err = service(&transport)
            .poll_until_done(&handle(), None)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(transport.status_calls(), 1);
    }

    #[tokio::test]
    async fn test_poll_interval_is_honored() {
        let transport = Arc::new(ScriptedTransport::new().with_states(&[
            "GATHERING RESULTS",
            "DONE GATHERING RESULTS",
        ]));
        let service = SearchJobService::new(
            transport.clone(),
            SearchJobConfig {
                poll_interval: Duration::from_millis(20),
                ..SearchJobConfig::default()
            },
        );

        let started = std::time::Instant::now();
        service.poll_until_done(&handle(), None).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_fetch_messages_forwards_paging_verbatim() {
        let transport = Arc::new(ScriptedTransport::new().with_fetch(Ok(ApiResponse::new(
            200,
            json!({
                "fields": [{"name": "_raw", "fieldType": "string", "keyField": false}],
                "messages": [
                    {"map": {"_raw": "a"}},
                    {"map": {"_raw": "b"}},
                    {"map": {"_raw": "c"}},
                    {"map": {"_raw": "d"}},
                    {"map": {"_raw": "e"}},
                    {"map": {"_raw": "f"}},
                    {"map": {"_raw": "g"}}
                ]
            }),
        ))));

        let messages = service(&transport)
            .fetch_messages(&handle(), Some(10), Some(5))
            .await
            .unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(sent.path, "/search/jobs/4F2A9C/messages");
        assert_eq!(
            sent.query,
            vec![
                ("offset".to_string(), "10".to_string()),
                ("limit".to_string(), "5".to_string())
            ]
        );
        assert_eq!(messages.len(), 7);
        assert_eq!(messages[6].get("_raw"), Some("g"));
    }

    #[tokio::test]
    async fn test_fetch_records_uses_default_paging() {
        let transport = Arc::new(ScriptedTransport::new());

        let records = service(&transport)
            .fetch_records(&handle(), None, None)
            .await
            .unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(sent.path, "/search/jobs/4F2A9C/records");
        assert_eq!(
            sent.query,
            vec![
                ("offset".to_string(), "0".to_string()),
                ("limit".to_string(), "10000".to_string())
            ]
        );
        assert_eq!(records[0].get("_sourcehost"), Some("web-1"));
    }

    #[tokio::test]
    async fn test_fetch_missing_field_is_transport_error() {
        let transport =
            Arc::new(ScriptedTransport::new().with_fetch(Ok(ApiResponse::new(200, json!({})))));

        let err = service(&transport)
            .fetch_records(&handle(), None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::Transport { status: None, .. }));
    }

    #[tokio::test]
    async fn test_job_id_is_path_encoded() {
        let transport = Arc::new(ScriptedTransport::new());
        service(&transport)
            .delete_job(&SearchJobHandle::new("a/b c"))
            .await
            .unwrap();

        assert_eq!(transport.requests()[0].path, "/search/jobs/a%2Fb%20c");
    }

    #[tokio::test]
    async fn test_cleanup_wraps_delete_failure() {
        let transport = Arc::new(ScriptedTransport::new().with_delete(Ok(ApiResponse::new(
            404,
            json!({"message": "Job ID is invalid."}),
        ))));

        let err = service(&transport).cleanup(&handle()).await.unwrap_err();

        assert_eq!(
            err,
            SearchError::Cleanup {
                id: "4F2A9C".to_string(),
                message: "API error (404): Job ID is invalid.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_execute_search_runs_full_lifecycle() {
        let transport = Arc::new(
            ScriptedTransport::new().with_states(&["GATHERING RESULTS", "DONE GATHERING RESULTS"]),
        );
        let polls = AtomicUsize::new(0);
        let progress = |_: &SearchJobStatus| {
            polls.fetch_add(1, Ordering::SeqCst);
        };

        let records = service(&transport)
            .execute_search(&request(), Some(&progress))
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(polls.load(Ordering::SeqCst), 2);

        let methods: Vec<HttpMethod> = transport.requests().iter().map(|r| r.method).collect();
        assert_eq!(
            methods,
            vec![
                HttpMethod::Post,
                HttpMethod::Get,
                HttpMethod::Get,
                HttpMethod::Get,
                HttpMethod::Delete
            ]
        );
    }

    #[tokio::test]
    async fn test_execute_search_deletes_job_when_fetch_fails() {
        let transport = Arc::new(ScriptedTransport::new().with_fetch(Ok(ApiResponse::new(
            500,
            json!({"message": "internal error"}),
        ))));

        let err = service(&transport)
            .execute_search(&request(), None)
            .await
            .unwrap_err();

        assert_eq!(err, SearchError::http(500, "internal error"));
        assert_eq!(transport.delete_calls(), 1);
    }

    #[tokio::test]
    async fn test_execute_search_keeps_fetch_error_when_delete_fails() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_fetch(Err(SearchError::transport("connection reset")))
                .with_delete(Err(SearchError::transport("connection refused"))),
        );

        let err = service(&transport)
            .execute_search(&request(), None)
            .await
            .unwrap_err();

        assert_eq!(err, SearchError::transport("connection reset"));
        assert_eq!(transport.delete_calls(), 1);
    }

    #[tokio::test]
    async fn test_execute_search_success_survives_delete_failure() {
        let transport = Arc::new(
            ScriptedTransport::new().with_delete(Err(SearchError::transport("connection refused"))),
        );

        let records = service(&transport)
            .execute_search(&request(), None)
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_search_stops_after_poll_failure() {
        let transport = Arc::new(ScriptedTransport::new().with_states(&["CANCELLED"]));

        let err = service(&transport)
            .execute_search(&request(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::Cancelled { .. }));
        assert_eq!(transport.delete_calls(), 0);
        assert_eq!(
            transport.count(HttpMethod::Get, |p| p.ends_with("/records")),
            0
        );
    }

    #[tokio::test]
    async fn test_execute_in_messages_mode() {
        let transport = Arc::new(ScriptedTransport::new().with_fetch(Ok(ApiResponse::new(
            200,
            json!({"messages": [{"map": {"_raw": "boom", "_sourcecategory": "prod/api"}}]}),
        ))));

        let messages = service(&transport)
            .execute(&request(), ResultMode::Messages, None)
            .await
            .unwrap();

        assert_eq!(messages[0].get("_raw"), Some("boom"));
        assert_eq!(
            transport.count(HttpMethod::Get, |p| p.ends_with("/messages")),
            1
        );
    }
}
