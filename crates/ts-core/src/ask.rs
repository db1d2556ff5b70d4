//! One question, one streamed answer.
//!
//! Resolves the agent and conversation, optionally transcribes an audio
//! question, then streams the answer to the terminal. Ctrl-C stops the
//! stream; the partial answer stays printed.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use ts_backend::{AgentClient, ClientOptions, StreamError, StreamFailure};
use ts_protocol::{AccumulatedMessage, ConversationContext, StreamOutcome, StreamUpdate};

use crate::audio::{load_audio, AudioError};
use crate::config::{Config, ConfigError};
use crate::flow::PrintFlows;
use crate::prefs::FilePreferences;
use crate::render::{SharedRenderer, StreamRenderer};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
/// 128 + SIGINT.
pub const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug, Error)]
pub enum AskError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("agent '{0}' does not accept audio")]
    AudioUnsupported(String),

    #[error("no question given")]
    NoQuestion,
}

#[derive(Debug, Default, Clone)]
pub struct AskOptions {
    pub question: Option<String>,
    pub agent: Option<String>,
    /// Existing conversation; a new session is created when unset.
    pub session: Option<String>,
    /// Persist a new reasoning preference for the agent before asking.
    pub reasoning: Option<bool>,
    /// Ask by voice: the file is transcribed and its text asked.
    pub audio: Option<PathBuf>,
}

/// Run the request and return the process exit code.
pub async fn run_ask(config: &Config, opts: AskOptions) -> i32 {
    match ask(config, opts).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[ts] error: {e}");
            EXIT_FAILURE
        }
    }
}

async fn ask(config: &Config, opts: AskOptions) -> Result<i32, AskError> {
    let agent = config.agent(opts.agent.as_deref())?;
    let agent_url = agent
        .url
        .clone()
        .unwrap_or_else(|| config.client.base_url.clone());

    // Validate local input before touching the network.
    let clip = match &opts.audio {
        Some(_) if !agent.audio => return Err(AskError::AudioUnsupported(agent.id)),
        Some(path) => Some(load_audio(path)?),
        None => None,
    };
    if clip.is_none() && opts.question.as_deref().map_or(true, |q| q.trim().is_empty()) {
        return Err(AskError::NoQuestion);
    }

    let prefs = Arc::new(FilePreferences::open_or_empty(config.prefs.resolve_path()));
    let renderer = SharedRenderer::new(StreamRenderer::new(
        io::stdout(),
        io::stderr(),
        io::stderr().is_terminal(),
    ));
    let flows = Arc::new(PrintFlows::new(renderer.clone()));
    let client = AgentClient::new(
        ClientOptions {
            api_key: config.client.resolve_api_key()?,
            connect_timeout: config.client.connect_timeout(),
        },
        prefs,
        flows,
    )?;

    if let Some(enabled) = opts.reasoning {
        if !agent.reasoning && enabled {
            tracing::warn!(agent = %agent.id, "agent has no reasoning mode; preference saved anyway");
        }
        client.router().set_reasoning(&agent.id, enabled);
    }

    let conversation_id = match opts.session {
        Some(id) => id,
        None => {
            let session = client
                .create_session(&agent_url, config.client.locales.clone())
                .await?;
            tracing::debug!(session = %session.id, "created session");
            session.id
        }
    };
    let ctx = ConversationContext::new(conversation_id, &agent.id, agent_url, agent.capabilities());

    let question = match clip {
        Some(clip) => {
            tracing::debug!(file = %clip.filename, media_type = clip.media_type, "transcribing");
            let text = client.transcribe(&ctx, clip.data).await?;
            eprintln!("[ts] heard: {text}");
            text
        }
        None => opts.question.unwrap_or_default(),
    };

    let result = stream_until_done(&client, &ctx, &question, &renderer).await;
    if let Err(failure) = &result {
        renderer.lock().error(&failure.error.to_string());
    }
    Ok(exit_code(&result))
}

/// Stream the answer; the first Ctrl-C stops the conversation's stream.
async fn stream_until_done<W, E>(
    client: &AgentClient,
    ctx: &ConversationContext,
    question: &str,
    renderer: &SharedRenderer<W, E>,
) -> Result<AccumulatedMessage, StreamFailure>
where
    W: io::Write,
    E: io::Write,
{
    let stream = client.open_stream(ctx, question, |u: &StreamUpdate| renderer.lock().render(u));
    tokio::pin!(stream);

    let mut stop_sent = false;
    loop {
        tokio::select! {
            result = &mut stream => return result,
            signal = tokio::signal::ctrl_c(), if !stop_sent => {
                stop_sent = true;
                if let Err(e) = signal {
                    tracing::warn!(error = %e, "cannot listen for ctrl-c");
                    continue;
                }
                tracing::debug!(conversation = %ctx.conversation_id, "ctrl-c, stopping stream");
                client.stop_stream(&ctx.conversation_id);
            }
        }
    }
}

fn exit_code(result: &Result<AccumulatedMessage, StreamFailure>) -> i32 {
    match result {
        Ok(message) if message.outcome == Some(StreamOutcome::Interrupted) => EXIT_INTERRUPTED,
        Ok(_) => EXIT_OK,
        Err(_) => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(outcome: StreamOutcome) -> AccumulatedMessage {
        AccumulatedMessage {
            complete: true,
            outcome: Some(outcome),
            ..AccumulatedMessage::default()
        }
    }

    #[test]
    fn exit_codes() {
        assert_eq!(exit_code(&Ok(message(StreamOutcome::Completed))), EXIT_OK);
        assert_eq!(
            exit_code(&Ok(message(StreamOutcome::Interrupted))),
            EXIT_INTERRUPTED
        );
        let failure = StreamFailure {
            error: StreamError::Remote("Rate limited".to_string()),
            partial: message(StreamOutcome::Failed),
        };
        assert_eq!(exit_code(&Err(failure)), EXIT_FAILURE);
    }

    fn config(toml_str: &str) -> Config {
        toml::from_str(toml_str).unwrap()
    }

    #[tokio::test]
    async fn unknown_agent_fails() {
        let result = ask(
            &Config::default(),
            AskOptions {
                question: Some("hi".to_string()),
                agent: Some("nope".to_string()),
                ..AskOptions::default()
            },
        )
        .await;
        assert!(matches!(
            result,
            Err(AskError::Config(ConfigError::UnknownAgent(_)))
        ));
    }

    #[tokio::test]
    async fn audio_needs_capable_agent() {
        let cfg = config("[[agents]]\nid = \"docs\"\naudio = false\n");
        let result = ask(
            &cfg,
            AskOptions {
                audio: Some(PathBuf::from("/tmp/q.wav")),
                ..AskOptions::default()
            },
        )
        .await;
        assert!(matches!(result, Err(AskError::AudioUnsupported(id)) if id == "docs"));
    }

    #[tokio::test]
    async fn missing_audio_file_fails_before_network() {
        let cfg = config("[[agents]]\nid = \"gemini\"\naudio = true\n");
        let result = ask(
            &cfg,
            AskOptions {
                audio: Some(PathBuf::from("/nonexistent/q.wav")),
                ..AskOptions::default()
            },
        )
        .await;
        assert!(matches!(result, Err(AskError::Audio(AudioError::NotFound(_)))));
    }

    #[tokio::test]
    async fn blank_question_fails() {
        let result = ask(
            &Config::default(),
            AskOptions {
                question: Some("   ".to_string()),
                ..AskOptions::default()
            },
        )
        .await;
        assert!(matches!(result, Err(AskError::NoQuestion)));
        assert_eq!(
            run_ask(&Config::default(), AskOptions::default()).await,
            EXIT_FAILURE
        );
    }
}
