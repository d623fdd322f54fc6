//! Background plant analysis.
//!
//! [`AnalysisWorker::launch`] detaches one tokio task per submitted image.
//! The task asks the completion API about the image, parses the JSON answer
//! and writes exactly one terminal state back to the store. Nothing the task
//! does can reach the HTTP caller; every failure, panics included, ends up
//! in the record's `error` column.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{error, info, info_span, warn, Instrument};

use crate::entities::{AnalysisStatus, AnalysisStore, SqliteStore};
use crate::services::completion::VisionClient;
use crate::services::image::jpeg_data_uri;

pub const ANALYSIS_PROMPT: &str = r#"Analyze this plant image and provide the following information in JSON format:
{
    "name": "Korean name of the plant (prioritizing edible crops)",
    "days_between_water": number of days between watering,
    "days_to_maturity": number of days until harvest
}
Only respond with the JSON object, no additional text and no markdown."#;

pub const PANIC_MESSAGE: &str = "analysis worker panicked";
pub const CANCELLED_MESSAGE: &str = "analysis worker was cancelled";

/// The JSON object the model is asked to produce. Keys the model leaves out
/// keep their zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalysisResult {
    pub name: String,
    pub days_between_water: u32,
    pub days_to_maturity: u32,
}

/// Launches analyses in the background.
///
/// Cloning is cheap; every clone shares the store, the client and the
/// optional admission semaphore.
#[derive(Clone)]
pub struct AnalysisWorker {
    store: Arc<SqliteStore>,
    client: Arc<dyn VisionClient>,
    permits: Option<Arc<Semaphore>>,
}

impl std::fmt::Debug for AnalysisWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let limit = self.permits.as_ref().map(|s| s.available_permits());
        write!(f, "AnalysisWorker(available_permits={limit:?})")
    }
}

impl AnalysisWorker {
    /// `max_in_flight == 0` leaves concurrent completion calls unbounded.
    pub fn new(store: Arc<SqliteStore>, client: Arc<dyn VisionClient>, max_in_flight: usize) -> Self {
        let permits = (max_in_flight > 0).then(|| Arc::new(Semaphore::new(max_in_flight)));
        Self { store, client, permits }
    }

    /// Start analysing `encoded_image` for record `id` and return at once.
    ///
    /// The work runs in its own task, watched by a supervising task that
    /// turns a panic into a `failed` record.
    pub fn launch(&self, id: i64, encoded_image: String) {
        let store = Arc::clone(&self.store);
        let client = Arc::clone(&self.client);
        let permits = self.permits.clone();
        let span = info_span!("analysis", analysis_id = id);

        let work = {
            let store = Arc::clone(&store);
            async move {
                // Held until the completion call and the final write are done.
                let _permit = match permits {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                run_analysis(store.as_ref(), client.as_ref(), id, &encoded_image).await
            }
            .instrument(span.clone())
        };

        tokio::spawn(
            async move {
                if let Err(e) = tokio::spawn(work).await {
                    error!(error = %e, "analysis task did not finish");
                    let message = if e.is_panic() { PANIC_MESSAGE } else { CANCELLED_MESSAGE };
                    record_failure(store.as_ref(), id, message).await;
                }
            }
            .instrument(span),
        );
    }
}

/// Analyse one image and persist the outcome. Returns the terminal status
/// that was written.
pub async fn run_analysis<S, C>(store: &S, client: &C, id: i64, encoded_image: &str) -> AnalysisStatus
where
    S: AnalysisStore,
    C: VisionClient + ?Sized,
{
    let image_url = jpeg_data_uri(encoded_image);

    let content = match client.complete(ANALYSIS_PROMPT, &image_url).await {
        Ok(content) => content,
        Err(e) => {
            warn!(error = %e, "completion call failed");
            return record_failure(store, id, &format!("OpenAI API error: {e}")).await;
        }
    };

    let result: AnalysisResult = match serde_json::from_str(&content) {
        Ok(result) => result,
        Err(e) => {
            warn!(content = %content, error = %e, "failed to parse analysis result");
            return record_failure(store, id, &format!("Failed to parse analysis result: {e}"))
                .await;
        }
    };

    if let Err(e) = store
        .update_analysis(
            id,
            &result.name,
            i64::from(result.days_between_water),
            i64::from(result.days_to_maturity),
        )
        .await
    {
        error!(error = %e, "failed to store analysis result");
        return record_failure(store, id, &format!("Failed to update analysis: {e}")).await;
    }

    info!(
        name = %result.name,
        days_between_water = result.days_between_water,
        days_to_maturity = result.days_to_maturity,
        "analysis completed"
    );
    AnalysisStatus::Completed
}

async fn record_failure<S: AnalysisStore>(store: &S, id: i64, message: &str) -> AnalysisStatus {
    if let Err(e) = store
        .update_analysis_status(id, AnalysisStatus::Failed, message)
        .await
    {
        // Nothing left to tell; the record stays pending.
        error!(error = %e, failure = message, "failed to record analysis failure");
    }
    AnalysisStatus::Failed
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::entities::AnalysisRecord;
    use crate::services::completion::CompletionError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tracing_test::traced_test;

    /// Completion client that replays a fixed answer.
    pub(crate) enum ScriptedClient {
        Reply(String),
        Fail(u16, String),
        Panic,
        /// Never answers.
        Hang,
    }

    impl ScriptedClient {
        pub(crate) fn reply(json: &str) -> Self {
            ScriptedClient::Reply(json.to_owned())
        }
    }

    #[async_trait]
    impl VisionClient for ScriptedClient {
        async fn complete(&self, _prompt: &str, image_url: &str) -> Result<String, CompletionError> {
            assert!(image_url.starts_with("data:image/jpeg;base64,"));
            match self {
                ScriptedClient::Reply(content) => Ok(content.clone()),
                ScriptedClient::Fail(status, message) => Err(CompletionError::Api {
                    status: *status,
                    message: message.clone(),
                }),
                ScriptedClient::Panic => panic!("scripted client panic"),
                ScriptedClient::Hang => std::future::pending().await,
            }
        }
    }

    /// Wrap an in-memory store and refuse the `completed` write.
    struct RejectingStore {
        inner: SqliteStore,
        failures: Mutex<Vec<String>>,
    }

    impl AnalysisStore for RejectingStore {
        async fn create_analysis(&self) -> Result<i64, sqlx::Error> {
            self.inner.create_analysis().await
        }

        async fn update_analysis(&self, _: i64, _: &str, _: i64, _: i64) -> Result<(), sqlx::Error> {
            Err(sqlx::Error::PoolTimedOut)
        }

        async fn update_analysis_status(
            &self,
            id: i64,
            status: AnalysisStatus,
            error: &str,
        ) -> Result<(), sqlx::Error> {
            self.failures
                .lock()
                .expect("failures lock")
                .push(error.to_owned());
            self.inner.update_analysis_status(id, status, error).await
        }

        async fn get_analysis(&self, id: i64) -> Result<Option<AnalysisRecord>, sqlx::Error> {
            self.inner.get_analysis(id).await
        }

        async fn fail_pending_analyses(&self, error: &str) -> Result<u64, sqlx::Error> {
            self.inner.fail_pending_analyses(error).await
        }
    }

    /// Poll until the record leaves `pending`, or give up after ~5s.
    pub(crate) async fn wait_terminal(store: &SqliteStore, id: i64) -> AnalysisRecord {
        for _ in 0..500 {
            let record = store.get_analysis(id).await.unwrap().expect("record exists");
            if record.status != AnalysisStatus::Pending {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("analysis {id} never left pending");
    }

    #[tokio::test]
    async fn successful_reply_completes_record() {
        let store = SqliteStore::in_memory().await;
        let id = store.create_analysis().await.unwrap();
        let client = ScriptedClient::reply(
            r#"{"name":"상추","days_between_water":3,"days_to_maturity":30}"#,
        );

        let status = run_analysis(&store, &client, id, "AAAA").await;
        assert_eq!(status, AnalysisStatus::Completed);

        let record = store.get_analysis(id).await.unwrap().unwrap();
        assert_eq!(record.status, AnalysisStatus::Completed);
        assert_eq!(record.name, "상추");
        assert_eq!(record.days_between_water, 3);
        assert_eq!(record.days_to_maturity, 30);
        assert!(record.error.is_empty());
    }

    #[tokio::test]
    async fn api_error_fails_record_with_embedded_message() {
        let store = SqliteStore::in_memory().await;
        let id = store.create_analysis().await.unwrap();
        let client = ScriptedClient::Fail(401, "Incorrect API key provided".to_owned());

        let status = run_analysis(&store, &client, id, "AAAA").await;
        assert_eq!(status, AnalysisStatus::Failed);

        let record = store.get_analysis(id).await.unwrap().unwrap();
        assert_eq!(record.status, AnalysisStatus::Failed);
        assert!(record.error.starts_with("OpenAI API error: "));
        assert!(record.error.contains("Incorrect API key provided"));
    }

    #[tokio::test]
    #[traced_test]
    async fn unparseable_reply_fails_record_and_logs_content() {
        let store = SqliteStore::in_memory().await;
        let id = store.create_analysis().await.unwrap();
        let client = ScriptedClient::reply("```json\n{\"name\": \"상추\"}\n```");

        let status = run_analysis(&store, &client, id, "AAAA").await;
        assert_eq!(status, AnalysisStatus::Failed);

        let record = store.get_analysis(id).await.unwrap().unwrap();
        assert!(record.error.starts_with("Failed to parse analysis result: "));
        assert!(logs_contain("failed to parse analysis result"));
    }

    #[tokio::test]
    async fn missing_keys_complete_with_zero_values() {
        let store = SqliteStore::in_memory().await;
        let id = store.create_analysis().await.unwrap();
        let client = ScriptedClient::reply(r#"{"name":"상추"}"#);

        let status = run_analysis(&store, &client, id, "AAAA").await;
        assert_eq!(status, AnalysisStatus::Completed);

        let record = store.get_analysis(id).await.unwrap().unwrap();
        assert_eq!(record.name, "상추");
        assert_eq!(record.days_between_water, 0);
        assert_eq!(record.days_to_maturity, 0);
        assert!(record.error.is_empty());
    }

    #[tokio::test]
    async fn negative_days_are_a_parse_failure() {
        let store = SqliteStore::in_memory().await;
        let id = store.create_analysis().await.unwrap();
        let client =
            ScriptedClient::reply(r#"{"name":"상추","days_between_water":-1,"days_to_maturity":30}"#);

        assert_eq!(run_analysis(&store, &client, id, "AAAA").await, AnalysisStatus::Failed);
    }

    #[tokio::test]
    async fn failed_result_write_is_recorded_as_failure() {
        let store = RejectingStore {
            inner: SqliteStore::in_memory().await,
            failures: Mutex::new(Vec::new()),
        };
        let id = store.create_analysis().await.unwrap();
        let client = ScriptedClient::reply(
            r#"{"name":"상추","days_between_water":3,"days_to_maturity":30}"#,
        );

        let status = run_analysis(&store, &client, id, "AAAA").await;
        assert_eq!(status, AnalysisStatus::Failed);

        let failures = store.failures.lock().unwrap().clone();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].starts_with("Failed to update analysis: "));
        let record = store.get_analysis(id).await.unwrap().unwrap();
        assert_eq!(record.status, AnalysisStatus::Failed);
    }

    #[tokio::test]
    async fn launched_panic_is_captured_as_failure() {
        let store = Arc::new(SqliteStore::in_memory().await);
        let id = store.create_analysis().await.unwrap();
        let worker = AnalysisWorker::new(Arc::clone(&store), Arc::new(ScriptedClient::Panic), 0);

        worker.launch(id, "AAAA".to_owned());

        let record = wait_terminal(&store, id).await;
        assert_eq!(record.status, AnalysisStatus::Failed);
        assert_eq!(record.error, PANIC_MESSAGE);
    }

    #[tokio::test]
    async fn launch_returns_before_the_work_finishes() {
        let store = Arc::new(SqliteStore::in_memory().await);
        let id = store.create_analysis().await.unwrap();
        let worker = AnalysisWorker::new(Arc::clone(&store), Arc::new(ScriptedClient::Hang), 0);

        worker.launch(id, "AAAA".to_owned());
        tokio::time::sleep(Duration::from_millis(50)).await;

        let record = store.get_analysis(id).await.unwrap().unwrap();
        assert_eq!(record.status, AnalysisStatus::Pending);
    }

    #[tokio::test]
    async fn bounded_worker_still_finishes_every_analysis() {
        let store = Arc::new(SqliteStore::in_memory().await);
        let client = Arc::new(ScriptedClient::reply(
            r#"{"name":"토마토","days_between_water":2,"days_to_maturity":80}"#,
        ));
        let worker = AnalysisWorker::new(Arc::clone(&store), client, 2);

        let mut ids = Vec::new();
        for _ in 0..8 {
            let id = store.create_analysis().await.unwrap();
            worker.launch(id, "AAAA".to_owned());
            ids.push(id);
        }

        for id in ids {
            let record = wait_terminal(&store, id).await;
            assert_eq!(record.status, AnalysisStatus::Completed);
            assert_eq!(record.name, "토마토");
        }
    }
}
