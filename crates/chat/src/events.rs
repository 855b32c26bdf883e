use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use illustra_core::domain::user::{ChatId, UserId};

use crate::commands::{parse_command, BotCommand};
use crate::outbound::{MessageRef, OutboundError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatUser {
    pub id: UserId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl ChatUser {
    pub fn new(id: UserId, first_name: impl Into<String>) -> Self {
        Self { id, first_name: Some(first_name.into()), last_name: None, username: None }
    }

    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// First and last name joined, possibly empty.
    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_owned()
    }

    pub fn greeting_name(&self) -> &str {
        self.first_name.as_deref().filter(|name| !name.is_empty()).unwrap_or("Agent")
    }

    pub fn handle(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandEvent {
    pub chat_id: ChatId,
    pub user: ChatUser,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub chat_id: ChatId,
    pub user: ChatUser,
    /// `None` for stickers, photos and other non-text messages.
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionEvent {
    pub action_id: String,
    pub message: MessageRef,
    pub user: ChatUser,
    pub token: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    Command(CommandEvent),
    Message(MessageEvent),
    Action(ActionEvent),
    Unsupported { kind: String },
}

impl ChatEvent {
    /// Classifies a text message the way the transport delivers it: leading `/` is a command.
    pub fn from_text(chat_id: ChatId, user: ChatUser, text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim_start().starts_with('/') {
            Self::Command(CommandEvent { chat_id, user, text })
        } else {
            Self::Message(MessageEvent { chat_id, user, text: Some(text) })
        }
    }

    pub fn event_type(&self) -> ChatEventType {
        match self {
            Self::Command(_) => ChatEventType::Command,
            Self::Message(_) => ChatEventType::Message,
            Self::Action(_) => ChatEventType::Action,
            Self::Unsupported { .. } => ChatEventType::Unsupported,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Command(event) => Some(event.user.id),
            Self::Message(event) => Some(event.user.id),
            Self::Action(event) => Some(event.user.id),
            Self::Unsupported { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChatEventType {
    Command,
    Message,
    Action,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatEnvelope {
    pub update_id: i64,
    pub event: ChatEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl EventContext {
    pub fn for_update(update_id: i64) -> Self {
        Self { correlation_id: format!("update-{update_id}") }
    }
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Outbound(#[from] OutboundError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> ChatEventType;
    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<ChatEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

#[async_trait]
pub trait CommandService: Send + Sync {
    async fn handle_command(
        &self,
        event: &CommandEvent,
        command: BotCommand,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

pub struct CommandHandler<S> {
    service: Arc<S>,
}

impl<S> CommandHandler<S>
where
    S: CommandService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for CommandHandler<S>
where
    S: CommandService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::Command
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::Command(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        let Some(command) = parse_command(&event.text) else {
            return Ok(HandlerResult::Ignored);
        };

        self.service.handle_command(event, command, ctx).await
    }
}

#[async_trait]
pub trait MessageService: Send + Sync {
    async fn handle_message(
        &self,
        event: &MessageEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

pub struct MessageHandler<S> {
    service: Arc<S>,
}

impl<S> MessageHandler<S>
where
    S: MessageService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for MessageHandler<S>
where
    S: MessageService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::Message
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::Message(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.service.handle_message(event, ctx).await
    }
}

#[async_trait]
pub trait ActionService: Send + Sync {
    async fn handle_action(
        &self,
        event: &ActionEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

pub struct ActionHandler<S> {
    service: Arc<S>,
}

impl<S> ActionHandler<S>
where
    S: ActionService,
{
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for ActionHandler<S>
where
    S: ActionService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::Action
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::Action(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.service.handle_action(event, ctx).await
    }
}
