//! Job log retrieval and streaming.
//!
//! [`fetch_logs`] is the one-shot buffer fetch. [`LogStream`] is the
//! long-lived WebSocket consumer: a background task decodes log frames
//! into lines on a bounded channel, and closing (or dropping) the stream
//! tears the connection down immediately. [`stream_logs`] composes the two
//! into "follow this job until it finishes".

use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

use crate::api::JobState;
use crate::client::HyperClient;
use crate::config::WS_LOGS_PATH;
use crate::error::{HyperError, Result};

/// Default cap on lines returned by the initial fetch.
pub const DEFAULT_MAX_INITIAL_LINES: usize = 1000;

/// Capacity of the line channel between the reader task and the consumer.
const LINE_CHANNEL_CAPACITY: usize = 256;

/// Fetches the current log buffer of a job, split into lines.
///
/// With `tail` set, only the last `tail` lines are returned.
///
/// # Errors
///
/// Returns an error if the API call fails.
pub async fn fetch_logs(
    client: &HyperClient,
    job_id: &str,
    tail: Option<usize>,
) -> Result<Vec<String>> {
    let logs = client.jobs().logs(job_id).await?;
    let trimmed = logs.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let lines: Vec<String> = trimmed.lines().map(str::to_string).collect();
    Ok(match tail {
        Some(tail) if lines.len() > tail => lines[lines.len() - tail..].to_vec(),
        _ => lines,
    })
}

/// Decodes one WebSocket text frame into log lines.
///
/// Frames look like `{"event": "log", "log": "..."}`; anything else
/// (other events, unparseable payloads) decodes to no lines.
pub(crate) fn parse_log_event(text: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return Vec::new();
    };
    if value.get("event").and_then(serde_json::Value::as_str) != Some("log") {
        return Vec::new();
    }

    value
        .get("log")
        .and_then(serde_json::Value::as_str)
        .map(|log| {
            log.split('\n')
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// A live WebSocket subscription to one job's log output.
///
/// Lines arrive through [`LogStream::next_line`]; a `None` result means
/// the stream ended (server close or [`LogStream::close`]). Dropping the
/// stream aborts the reader task, which drops the connection, so the
/// socket can never outlive the consumer.
#[derive(Debug)]
pub struct LogStream {
    /// Decoded log lines from the reader task.
    rx: mpsc::Receiver<String>,
    /// Signals the reader task to close the connection.
    shutdown: Option<oneshot::Sender<()>>,
    /// The reader task itself.
    task: JoinHandle<()>,
}

impl LogStream {
    /// Connects to the log stream of a job.
    ///
    /// The job is fetched first to obtain its stream key; a job without
    /// one (not yet scheduled) fails with a precondition error.
    ///
    /// # Errors
    ///
    /// Returns an error if the job fetch or the WebSocket handshake fails.
    pub async fn connect(client: &HyperClient, job_id: &str) -> Result<Self> {
        let job = client.jobs().get(job_id).await?;
        if job.job_key.is_empty() {
            return Err(HyperError::precondition(format!(
                "Job {job_id} has no log stream key yet"
            )));
        }

        let url = format!("{}{WS_LOGS_PATH}/{}", client.ws_url(), job.job_key);
        debug!("Connecting to log stream: {url}");

        let (mut ws, _) = connect_async(&url)
            .await
            .map_err(|e| HyperError::transport(format!("WebSocket connect failed: {e}")))?;

        let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        let _ = ws.close(None).await;
                        break;
                    }
                    message = ws.next() => {
                        match message {
                            Some(Ok(Message::Text(text))) => {
                                for line in parse_log_event(&text) {
                                    // Consumer gone: stop reading.
                                    if tx.send(line).await.is_err() {
                                        let _ = ws.close(None).await;
                                        return;
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                debug!("Log stream error: {e}");
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(Self {
            rx,
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    /// Returns the next log line, or `None` once the stream has ended.
    pub async fn next_line(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Closes the stream, sending a close frame and releasing the
    /// connection. Buffered lines are discarded.
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = (&mut self.task).await;
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        // Backstop for consumers that drop without closing: kill the
        // reader task so the connection cannot leak.
        if !self.task.is_finished() {
            self.task.abort();
        }
    }
}

/// Options for [`stream_logs`].
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// States that stop the stream.
    pub until_states: Vec<JobState>,
    /// How often the job state is re-polled while streaming.
    pub poll_state_interval: Duration,
    /// Fetch the existing buffer before streaming.
    pub fetch_initial: bool,
    /// Fetch the buffer once more after the stream stops.
    pub fetch_final: bool,
    /// Cap on lines returned by the initial and final fetches.
    pub max_initial_lines: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            until_states: vec![
                JobState::Failed,
                JobState::Cancelled,
                JobState::Completed,
                JobState::Terminated,
            ],
            poll_state_interval: Duration::from_secs(2),
            fetch_initial: true,
            fetch_final: true,
            max_initial_lines: DEFAULT_MAX_INITIAL_LINES,
        }
    }
}

/// Streams a job's logs to a callback until the job reaches one of the
/// stop states.
///
/// Waits out the `pending`/`queued` phase first (unbounded; bound it by
/// dropping the returned future if needed), then follows the WebSocket
/// while re-polling the job state every `poll_state_interval`.
///
/// # Errors
///
/// Returns an error if a job fetch or the stream connection fails.
pub async fn stream_logs<F>(
    client: &HyperClient,
    job_id: &str,
    options: &StreamOptions,
    mut on_line: F,
) -> Result<()>
where
    F: FnMut(&str),
{
    let mut job = client.jobs().get(job_id).await?;

    while matches!(job.state, JobState::Pending | JobState::Queued) {
        debug!("Job {job_id} not started yet (state: {})", job.state);
        tokio::time::sleep(options.poll_state_interval).await;
        job = client.jobs().get(job_id).await?;
    }

    // Already finished: there is nothing to follow.
    if options.until_states.contains(&job.state) {
        if options.fetch_final {
            for line in fetch_logs(client, job_id, Some(options.max_initial_lines)).await? {
                on_line(&line);
            }
        }
        return Ok(());
    }

    if options.fetch_initial && job.state == JobState::Running {
        for line in fetch_logs(client, job_id, Some(options.max_initial_lines)).await? {
            on_line(&line);
        }
    }

    let mut stream = LogStream::connect(client, job_id).await?;
    let mut poll = tokio::time::interval(options.poll_state_interval);
    poll.tick().await; // the first tick completes immediately

    loop {
        tokio::select! {
            line = stream.next_line() => {
                match line {
                    Some(line) => on_line(&line),
                    None => break,
                }
            }
            _ = poll.tick() => {
                job = client.jobs().get(job_id).await?;
                if options.until_states.contains(&job.state) {
                    info!("Job {job_id} reached {}; stopping log stream", job.state);
                    break;
                }
            }
        }
    }

    stream.close().await;

    if options.fetch_final {
        // Give the backend a moment to flush the tail of the buffer.
        tokio::time::sleep(Duration::from_millis(500)).await;
        for line in fetch_logs(client, job_id, Some(options.max_initial_lines)).await? {
            on_line(&line);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use futures_util::SinkExt;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_log_event_splits_lines() {
        let lines = parse_log_event(r#"{"event": "log", "log": "hello\nworld\n"}"#);
        assert_eq!(lines, vec!["hello", "world"]);
    }

    #[test]
    fn test_parse_log_event_ignores_other_events() {
        assert!(parse_log_event(r#"{"event": "ping"}"#).is_empty());
        assert!(parse_log_event("not json at all").is_empty());
        assert!(parse_log_event(r#"{"event": "log"}"#).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_logs_tail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/jobs/j1/logs"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"logs": "a\nb\nc\nd\n"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, "ws://unused");
        let all = fetch_logs(&client, "j1", None).await.unwrap();
        assert_eq!(all, vec!["a", "b", "c", "d"]);

        let tail = fetch_logs(&client, "j1", Some(2)).await.unwrap();
        assert_eq!(tail, vec!["c", "d"]);
    }

    #[tokio::test]
    async fn test_fetch_logs_empty_buffer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/jobs/j1/logs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"logs": ""})))
            .mount(&server)
            .await;

        let client = client_for(&server, "ws://unused");
        assert!(fetch_logs(&client, "j1", None).await.unwrap().is_empty());
    }

    fn client_for(server: &MockServer, ws_url: &str) -> HyperClient {
        let settings = Settings {
            api_key: String::from("hyper_api_test"),
            api_url: server.uri(),
            ws_url: ws_url.to_string(),
            timeout: Duration::from_secs(5),
        };
        HyperClient::from_settings(settings, None, false).unwrap()
    }

    async fn mount_job(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/jobs/j1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "job_id": "j1",
                "job_key": "k1",
                "state": "running"
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_log_stream_yields_lines_until_server_close() {
        let server = MockServer::start().await;
        mount_job(&server).await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let ws_server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            ws.send(Message::Text(
                json!({"event": "log", "log": "hello\nworld"}).to_string(),
            ))
            .await
            .unwrap();
            ws.send(Message::Text(json!({"event": "ping"}).to_string()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        });

        let client = client_for(&server, &format!("ws://{addr}"));
        let mut stream = LogStream::connect(&client, "j1").await.unwrap();

        assert_eq!(stream.next_line().await.as_deref(), Some("hello"));
        assert_eq!(stream.next_line().await.as_deref(), Some("world"));
        assert!(stream.next_line().await.is_none());

        ws_server.await.unwrap();
    }

    #[tokio::test]
    async fn test_log_stream_close_releases_connection() {
        let server = MockServer::start().await;
        mount_job(&server).await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let ws_server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            // Wait for the client to close; a clean close yields None/Close.
            while let Some(Ok(message)) = ws.next().await {
                if matches!(message, Message::Close(_)) {
                    break;
                }
            }
        });

        let client = client_for(&server, &format!("ws://{addr}"));
        let stream = LogStream::connect(&client, "j1").await.unwrap();
        stream.close().await;

        ws_server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_requires_job_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/jobs/j2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "job_id": "j2",
                "state": "queued"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, "ws://127.0.0.1:9");
        let err = LogStream::connect(&client, "j2").await.unwrap_err();
        assert!(matches!(err, HyperError::Precondition { .. }));
    }
}
