//! In-memory chat gateway implementation.
//!
//! Stores channels and messages in memory, providing fast, deterministic and
//! isolated execution for unit and integration tests, and a self-contained
//! mode for local development runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{
    ChatGateway, ChatMessage, GatewayError, GatewayResult, OutgoingMessage, ReactionEvent,
};
use crate::models::{ChannelId, GuildId, MessageId, UserId};

/// In-memory chat gateway.
///
/// Messages are stored per channel in post order; history reads return them
/// newest first like the real platform. Seeding helpers allow tests to set
/// up user-authored homework posts and to inspect bot output.
#[derive(Clone)]
pub struct LocalGateway {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    bot_user: UserId,
    /// Guild each known channel belongs to
    channel_guilds: HashMap<ChannelId, GuildId>,
    /// Messages per channel, oldest first
    messages: HashMap<ChannelId, Vec<ChatMessage>>,
    /// Reactions per message: (user, emoji) in press order
    reactions: HashMap<(ChannelId, MessageId), Vec<(UserId, String)>>,
    next_message_id: u64,
}

impl LocalGateway {
    /// Create an empty gateway with the given bot user id.
    pub fn new(bot_user: UserId) -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData {
                bot_user,
                channel_guilds: HashMap::new(),
                messages: HashMap::new(),
                reactions: HashMap::new(),
                next_message_id: 1,
            })),
        }
    }

    /// Register a channel under a guild. Unknown channels fail lookups.
    pub fn add_channel(&self, guild: GuildId, channel: ChannelId) {
        let mut data = self.data.write();
        data.channel_guilds.insert(channel, guild);
        data.messages.entry(channel).or_default();
    }

    /// Seed a user-authored message, returning its id.
    pub fn seed_message(
        &self,
        channel: ChannelId,
        author: UserId,
        content: impl Into<String>,
        attachments: Vec<String>,
    ) -> MessageId {
        let mut data = self.data.write();
        let id = MessageId::new(data.next_message_id);
        data.next_message_id += 1;
        let permalink = permalink_for(channel, id);
        data.messages.entry(channel).or_default().push(ChatMessage {
            id,
            author,
            content: content.into(),
            attachments,
            embed: None,
            permalink,
        });
        id
    }

    /// Record a user pressing a reaction, returning the event the platform
    /// would deliver for it.
    pub fn press_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        user: UserId,
        emoji: impl Into<String>,
    ) -> GatewayResult<ReactionEvent> {
        let emoji = emoji.into();
        let mut data = self.data.write();
        let guild = *data
            .channel_guilds
            .get(&channel)
            .ok_or(GatewayError::ChannelNotFound(channel))?;
        data.reactions
            .entry((channel, message))
            .or_default()
            .push((user, emoji.clone()));
        Ok(ReactionEvent {
            guild,
            channel,
            message,
            user,
            emoji,
        })
    }

    /// All reactions currently on a message, in press order.
    pub fn reactions(&self, channel: ChannelId, message: MessageId) -> Vec<(UserId, String)> {
        self.data
            .read()
            .reactions
            .get(&(channel, message))
            .cloned()
            .unwrap_or_default()
    }

    /// Number of messages stored in a channel.
    pub fn message_count(&self, channel: ChannelId) -> usize {
        self.data
            .read()
            .messages
            .get(&channel)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Guild a channel is registered under.
    pub fn channel_guild(&self, channel: ChannelId) -> Option<GuildId> {
        self.data.read().channel_guilds.get(&channel).copied()
    }

    /// Remove all messages and reactions, keeping channel registrations.
    pub fn clear_messages(&self) {
        let mut data = self.data.write();
        for messages in data.messages.values_mut() {
            messages.clear();
        }
        data.reactions.clear();
    }
}

fn permalink_for(channel: ChannelId, message: MessageId) -> String {
    format!("local://{}/{}", channel, message)
}

#[async_trait]
impl ChatGateway for LocalGateway {
    fn bot_user(&self) -> UserId {
        self.data.read().bot_user
    }

    async fn channel_history(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> GatewayResult<Vec<ChatMessage>> {
        let data = self.data.read();
        let messages = data
            .messages
            .get(&channel)
            .ok_or(GatewayError::ChannelNotFound(channel))?;
        Ok(messages.iter().rev().take(limit).cloned().collect())
    }

    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> GatewayResult<ChatMessage> {
        let data = self.data.read();
        let messages = data
            .messages
            .get(&channel)
            .ok_or(GatewayError::ChannelNotFound(channel))?;
        messages
            .iter()
            .find(|m| m.id == message)
            .cloned()
            .ok_or(GatewayError::MessageNotFound(message))
    }

    async fn post_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> GatewayResult<MessageId> {
        let mut data = self.data.write();
        if !data.channel_guilds.contains_key(&channel) {
            return Err(GatewayError::ChannelNotFound(channel));
        }
        let id = MessageId::new(data.next_message_id);
        data.next_message_id += 1;
        let author = data.bot_user;
        let permalink = permalink_for(channel, id);
        data.messages.entry(channel).or_default().push(ChatMessage {
            id,
            author,
            content: message.content,
            attachments: Vec::new(),
            embed: message.embed,
            permalink,
        });
        Ok(id)
    }

    async fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: OutgoingMessage,
    ) -> GatewayResult<()> {
        let mut data = self.data.write();
        let messages = data
            .messages
            .get_mut(&channel)
            .ok_or(GatewayError::ChannelNotFound(channel))?;
        let stored = messages
            .iter_mut()
            .find(|m| m.id == message)
            .ok_or(GatewayError::MessageNotFound(message))?;
        stored.content = content.content;
        stored.embed = content.embed;
        Ok(())
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> GatewayResult<()> {
        let mut data = self.data.write();
        let messages = data
            .messages
            .get_mut(&channel)
            .ok_or(GatewayError::ChannelNotFound(channel))?;
        let before = messages.len();
        messages.retain(|m| m.id != message);
        if messages.len() == before {
            return Err(GatewayError::MessageNotFound(message));
        }
        data.reactions.remove(&(channel, message));
        Ok(())
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> GatewayResult<()> {
        let mut data = self.data.write();
        let user = data.bot_user;
        data.reactions
            .entry((channel, message))
            .or_default()
            .push((user, emoji.to_string()));
        Ok(())
    }

    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        user: UserId,
        emoji: &str,
    ) -> GatewayResult<()> {
        let mut data = self.data.write();
        if let Some(reactions) = data.reactions.get_mut(&(channel, message)) {
            if let Some(pos) = reactions
                .iter()
                .position(|(u, e)| *u == user && e == emoji)
            {
                reactions.remove(pos);
            }
        }
        Ok(())
    }
}
