//! HTTP proxy server

mod command;
mod copilot;
mod credentials;
mod error;
mod framing;
pub mod server;

pub use command::{command_handler, COMMAND_MAX_TOKENS};
pub use copilot::{
    complete_cancellable, copilot_handler, handle_copilot, COPILOT_MAX_TOKENS, COPILOT_TEMPERATURE,
};
pub use credentials::{resolve_endpoint, resolve_model};
pub use error::{AssistError, INVALID_BODY_MESSAGE, MISSING_API_KEY_MESSAGE, REQUEST_FAILED_MESSAGE};
pub use framing::{FrameEncoder, STREAM_ERROR_MESSAGE};
pub use server::{build_router, run_server, ProxyState};

/// Deserialize a JSON request body
fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, AssistError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!(error = %e, "Rejecting malformed request body");
        AssistError::InvalidRequest(e.to_string())
    })
}
