//! Chat platform abstraction.
//!
//! The pipeline consumes a small slice of the chat SDK: channel history,
//! posting and editing messages, and reaction management. [`ChatGateway`]
//! captures exactly that slice so the pipeline stays independent of the
//! concrete SDK and can run against the in-memory [`LocalGateway`] in tests
//! and local development.

pub mod local;

pub use local::LocalGateway;

use async_trait::async_trait;

use crate::models::{ChannelId, GuildId, MessageId, UserId};

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Error type for gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Channel {0} not found")]
    ChannelNotFound(ChannelId),

    #[error("Message {0} not found")]
    MessageNotFound(MessageId),

    #[error("Chat platform error: {0}")]
    Platform(String),
}

/// Rich message content: title, description and named sections.
///
/// Mirrors the embed shape every digest is rendered into before posting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    /// Named sections in display order: (name, content)
    pub fields: Vec<(String, String)>,
}

/// A message read back from a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub author: UserId,
    /// Plain text content; empty for embed-only messages
    pub content: String,
    /// Attachment URLs in post order
    pub attachments: Vec<String>,
    pub embed: Option<Embed>,
    /// Permalink to this message
    pub permalink: String,
}

/// Content for a message the bot posts or edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub content: String,
    pub embed: Option<Embed>,
}

impl OutgoingMessage {
    pub fn from_embed(embed: Embed) -> Self {
        Self {
            content: String::new(),
            embed: Some(embed),
        }
    }
}

/// A reaction added to a message, as delivered by the platform event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub guild: GuildId,
    pub channel: ChannelId,
    pub message: MessageId,
    pub user: UserId,
    pub emoji: String,
}

/// Chat platform operations consumed by the pipeline.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` so they can be shared across the
/// scheduler loop and the refresh handler.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// The bot's own user id, used to ignore self-triggered events.
    fn bot_user(&self) -> UserId;

    /// Recent messages of a channel, newest first, at most `limit` entries.
    async fn channel_history(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> GatewayResult<Vec<ChatMessage>>;

    /// Fetch one message by id.
    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> GatewayResult<ChatMessage>;

    /// Post a new message, returning its id.
    async fn post_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> GatewayResult<MessageId>;

    /// Replace the content of a previously posted message.
    async fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: OutgoingMessage,
    ) -> GatewayResult<()>;

    /// Delete a message.
    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> GatewayResult<()>;

    /// Add the bot's reaction to a message.
    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> GatewayResult<()>;

    /// Remove one user's reaction from a message.
    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        user: UserId,
        emoji: &str,
    ) -> GatewayResult<()>;
}
