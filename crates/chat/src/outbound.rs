use std::collections::HashSet;
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use illustra_core::domain::request::{RequestStatus, StoredRequest};
use illustra_core::domain::user::{ChatId, UserId};
use illustra_core::flows::IntakeData;
use illustra_core::ports::{IntakeNotifier, NotifyError};

use crate::messages::{self, MessageTemplate};

/// Address of a message the bot has already posted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: i64,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OutboundError {
    #[error("chat {chat_id} rejected the message: {reason}")]
    Rejected { chat_id: ChatId, reason: String },
    #[error("chat transport failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait ChatOutbound: Send + Sync {
    async fn send(
        &self,
        chat_id: ChatId,
        message: MessageTemplate,
    ) -> Result<MessageRef, OutboundError>;

    /// Replaces text and keyboard of an existing message.
    async fn edit(&self, target: MessageRef, message: MessageTemplate) -> Result<(), OutboundError>;

    /// Stops the client-side spinner on a button press, optionally with a short toast.
    async fn answer_action(&self, action_id: &str, text: Option<String>)
        -> Result<(), OutboundError>;
}

#[derive(Default)]
pub struct NoopOutbound;

#[async_trait]
impl ChatOutbound for NoopOutbound {
    async fn send(
        &self,
        chat_id: ChatId,
        _message: MessageTemplate,
    ) -> Result<MessageRef, OutboundError> {
        Ok(MessageRef { chat_id, message_id: 0 })
    }

    async fn edit(&self, _target: MessageRef, _message: MessageTemplate) -> Result<(), OutboundError> {
        Ok(())
    }

    async fn answer_action(
        &self,
        _action_id: &str,
        _text: Option<String>,
    ) -> Result<(), OutboundError> {
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundRecord {
    Sent { target: MessageRef, message: MessageTemplate },
    Edited { target: MessageRef, message: MessageTemplate },
    Answered { action_id: String, text: Option<String> },
}

/// Keeps every outbound call in memory. Chats marked unreachable reject sends.
#[derive(Default)]
pub struct RecordingOutbound {
    records: Mutex<Vec<OutboundRecord>>,
    unreachable: Mutex<HashSet<ChatId>>,
    next_message_id: AtomicI64,
}

impl RecordingOutbound {
    pub async fn set_unreachable(&self, chat_id: ChatId, unreachable: bool) {
        let mut chats = self.unreachable.lock().await;
        if unreachable {
            chats.insert(chat_id);
        } else {
            chats.remove(&chat_id);
        }
    }

    pub async fn records(&self) -> Vec<OutboundRecord> {
        self.records.lock().await.clone()
    }

    /// Messages sent to one chat, oldest first.
    pub async fn sent_to(&self, chat_id: ChatId) -> Vec<MessageTemplate> {
        self.records
            .lock()
            .await
            .iter()
            .filter_map(|record| match record {
                OutboundRecord::Sent { target, message } if target.chat_id == chat_id => {
                    Some(message.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub async fn edits(&self) -> Vec<(MessageRef, MessageTemplate)> {
        self.records
            .lock()
            .await
            .iter()
            .filter_map(|record| match record {
                OutboundRecord::Edited { target, message } => Some((*target, message.clone())),
                _ => None,
            })
            .collect()
    }

    pub async fn answers(&self) -> Vec<(String, Option<String>)> {
        self.records
            .lock()
            .await
            .iter()
            .filter_map(|record| match record {
                OutboundRecord::Answered { action_id, text } => {
                    Some((action_id.clone(), text.clone()))
                }
                _ => None,
            })
            .collect()
    }

    pub async fn clear(&self) {
        self.records.lock().await.clear();
    }
}

#[async_trait]
impl ChatOutbound for RecordingOutbound {
    async fn send(
        &self,
        chat_id: ChatId,
        message: MessageTemplate,
    ) -> Result<MessageRef, OutboundError> {
        if self.unreachable.lock().await.contains(&chat_id) {
            return Err(OutboundError::Rejected { chat_id, reason: "bot was blocked".to_owned() });
        }
        let target =
            MessageRef { chat_id, message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1 };
        self.records.lock().await.push(OutboundRecord::Sent { target, message });
        Ok(target)
    }

    async fn edit(&self, target: MessageRef, message: MessageTemplate) -> Result<(), OutboundError> {
        if self.unreachable.lock().await.contains(&target.chat_id) {
            return Err(OutboundError::Rejected {
                chat_id: target.chat_id,
                reason: "bot was blocked".to_owned(),
            });
        }
        self.records.lock().await.push(OutboundRecord::Edited { target, message });
        Ok(())
    }

    async fn answer_action(
        &self,
        action_id: &str,
        text: Option<String>,
    ) -> Result<(), OutboundError> {
        self.records
            .lock()
            .await
            .push(OutboundRecord::Answered { action_id: action_id.to_owned(), text });
        Ok(())
    }
}

/// [`IntakeNotifier`] that renders alerts as chat messages.
pub struct ChatNotifier {
    outbound: Arc<dyn ChatOutbound>,
}

impl ChatNotifier {
    pub fn new(outbound: Arc<dyn ChatOutbound>) -> Self {
        Self { outbound }
    }
}

#[async_trait]
impl IntakeNotifier for ChatNotifier {
    async fn announce_submission(
        &self,
        destination: ChatId,
        data: &IntakeData,
    ) -> Result<(), NotifyError> {
        let sent = self
            .outbound
            .send(destination, messages::submission_announcement(data))
            .await
            .map_err(|error| NotifyError(error.to_string()))?;
        debug!(
            event_name = "chat.submission.announced",
            chat_id = %destination,
            message_id = sent.message_id,
            "submission alert posted"
        );
        Ok(())
    }

    async fn notify_status_change(
        &self,
        agent: UserId,
        request: &StoredRequest,
        previous: RequestStatus,
    ) -> Result<(), NotifyError> {
        self.outbound
            .send(ChatId::from(agent), messages::agent_status_update(request, previous))
            .await
            .map_err(|error| NotifyError(error.to_string()))?;
        Ok(())
    }
}
