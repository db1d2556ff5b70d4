//! HTTP client for the remote agent.
//!
//! `open_stream` is the entry point callers use: it picks the endpoint
//! variant, registers the stream with the session controller, and drives the
//! pipeline until a terminal outcome. The request itself is sent lazily from
//! inside the value stream, so connection failures and cancellation during
//! the request go through the same terminal path as everything else.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures::StreamExt;
use reqwest::{Client, Url};
use serde::Serialize;
use ts_protocol::{
    AccumulatedMessage, ConversationContext, NewSession, QuestionRequest, ResponseMode, Session,
    StreamUpdate, TranscriptionRequest, TranscriptionResponse,
};

use crate::collab::{FlowRunner, PreferenceStore};
use crate::error::{StreamError, StreamFailure};
use crate::pipeline::run_pipeline;
use crate::router::ModeRouter;
use crate::session::{ActiveStream, SessionController};
use crate::transport::{decode_response, RecordFormat, ValueStream};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for [`AgentClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Sent as a bearer token when set.
    pub api_key: Option<String>,
    pub connect_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Build an HTTP client with a connect timeout only; streams can run as
/// long as the agent keeps sending.
fn build_http_client(connect_timeout: Duration) -> Result<Client, StreamError> {
    Ok(Client::builder()
        .connect_timeout(connect_timeout)
        .pool_max_idle_per_host(2)
        .build()?)
}

/// Remote agent client.
pub struct AgentClient {
    http: Client,
    api_key: Option<String>,
    sessions: Arc<SessionController>,
    router: ModeRouter,
    flows: Arc<dyn FlowRunner>,
}

impl AgentClient {
    pub fn new(
        options: ClientOptions,
        prefs: Arc<dyn PreferenceStore>,
        flows: Arc<dyn FlowRunner>,
    ) -> Result<Self, StreamError> {
        Ok(Self {
            http: build_http_client(options.connect_timeout)?,
            api_key: options.api_key,
            sessions: Arc::new(SessionController::new()),
            router: ModeRouter::new(prefs),
            flows,
        })
    }

    pub fn sessions(&self) -> &Arc<SessionController> {
        &self.sessions
    }

    pub fn router(&self) -> &ModeRouter {
        &self.router
    }

    /// Create a remote session. Its id is the conversation id for later
    /// requests.
    pub async fn create_session(
        &self,
        agent_url: &str,
        locales: Vec<String>,
    ) -> Result<Session, StreamError> {
        let url = endpoint_url(agent_url, &["sessions"])?;
        let response = post_json(
            &self.http,
            url,
            self.api_key.as_deref(),
            &NewSession { locales },
        )
        .await?;
        Ok(response.json().await?)
    }

    /// Transcribe base64-encoded audio to text.
    pub async fn transcribe(
        &self,
        ctx: &ConversationContext,
        audio_base64: String,
    ) -> Result<String, StreamError> {
        let url = session_url(ctx, "transcriptions")?;
        let response = post_json(
            &self.http,
            url,
            self.api_key.as_deref(),
            &TranscriptionRequest { file: audio_base64 },
        )
        .await?;
        let body: TranscriptionResponse = response.json().await?;
        Ok(body.text)
    }

    /// Lazily send `question` to the `mode` endpoint and decode the reply.
    pub fn question_stream(
        &self,
        ctx: &ConversationContext,
        mode: ResponseMode,
        question: &str,
    ) -> ValueStream {
        let http = self.http.clone();
        let api_key = self.api_key.clone();
        let url = session_url(ctx, mode.endpoint());
        let format = RecordFormat::from(mode);
        let body = QuestionRequest {
            question: question.to_string(),
        };

        Box::pin(stream! {
            let sent = match url {
                Ok(url) => post_json(&http, url, api_key.as_deref(), &body).await,
                Err(e) => Err(e),
            };
            match sent {
                Ok(response) => {
                    let mut values = decode_response(response, format);
                    while let Some(value) = values.next().await {
                        yield value;
                    }
                }
                Err(e) => {
                    yield Err(e);
                }
            }
        })
    }

    /// Ask `question` in the conversation and stream the answer into `sink`.
    ///
    /// Any stream already running for the conversation is cancelled first.
    /// The sink receives exactly one update with `complete == true`.
    pub async fn open_stream<F>(
        &self,
        ctx: &ConversationContext,
        question: &str,
        sink: F,
    ) -> Result<AccumulatedMessage, StreamFailure>
    where
        F: FnMut(&StreamUpdate),
    {
        let mode = self.router.select(ctx);
        let active = ActiveStream::begin(self.sessions.clone(), &ctx.conversation_id);
        tracing::debug!(
            conversation = %ctx.conversation_id,
            agent = %ctx.agent_id,
            ?mode,
            generation = active.handle().generation(),
            "opening stream"
        );

        let values = self.question_stream(ctx, mode, question);
        let result = run_pipeline(values, mode, self.flows.as_ref(), active.token(), sink).await;

        match &result {
            Ok(message) => tracing::debug!(
                conversation = %ctx.conversation_id,
                outcome = ?message.outcome,
                answer_chars = message.answer.len(),
                reasoning_chars = message.reasoning.len(),
                "stream finished"
            ),
            Err(failure) if failure.error.is_remote() => tracing::warn!(
                conversation = %ctx.conversation_id,
                detail = failure.error.remote_detail().unwrap_or(""),
                "agent reported an error"
            ),
            Err(failure) => tracing::warn!(
                conversation = %ctx.conversation_id,
                error = %failure.error,
                "stream failed"
            ),
        }
        result
    }

    /// Interrupt the conversation's stream. Returns false if none was running.
    pub fn stop_stream(&self, conversation_id: &str) -> bool {
        self.sessions.stop(conversation_id)
    }
}

/// Append `segments` to the agent's base URL, each percent-encoded as a
/// single path segment.
fn endpoint_url(agent_url: &str, segments: &[&str]) -> Result<Url, StreamError> {
    let invalid = || StreamError::InvalidUrl(agent_url.to_string());
    let mut url = Url::parse(agent_url).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn session_url(ctx: &ConversationContext, endpoint: &str) -> Result<Url, StreamError> {
    endpoint_url(
        &ctx.agent_url,
        &["sessions", ctx.conversation_id.as_str(), endpoint],
    )
}

async fn post_json<T: Serialize + ?Sized>(
    http: &Client,
    url: Url,
    api_key: Option<&str>,
    body: &T,
) -> Result<reqwest::Response, StreamError> {
    let mut request = http.post(url).json(body);
    if let Some(key) = api_key {
        request = request.bearer_auth(key);
    }
    let response = request.send().await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(StreamError::Status { status, body });
    }

    Ok(response)
}
