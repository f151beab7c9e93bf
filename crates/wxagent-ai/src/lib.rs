//! AI interpretation of weather snapshots for WxAgent
//!
//! Builds prompts from a reduced snapshot, calls an OpenAI-compatible chat
//! API with bounded retries, and validates structured replies.

pub mod alerts;
pub mod client;
pub mod context;
pub mod prompts;
pub mod transport;

pub use alerts::{parse_alerts_reply, validate_alerts, AlertsPayload, Risk, RiskType, Severity};
pub use client::{AiClient, AiResult, AiStatus, AlertsReport, ChatAnswer, Summary};
pub use context::ReducedContext;
pub use transport::{
    ChatMessage, ChatRequest, ChatResponse, ChatTransport, OpenAiTransport, Role, TransportError,
};
pub use wxagent_core::{AiError, AiErrorKind};
