//! Routes chat events to the access ledger, the intake sessions and the status bridge.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use illustra_core::access::{AccessLedger, LedgerError};
use illustra_core::domain::request::{RequestId, RequestStatus};
use illustra_core::domain::user::{ChatId, UserId};
use illustra_core::errors::ApplicationError;
use illustra_core::flows::{FlowAction, FlowTransitionError, SessionInput};
use illustra_core::intake::{IntakeError, IntakeService, IntakeStep, StatusBridge, StatusChange};
use illustra_core::ports::{RequestSheet, SheetError, DEFAULT_LIST_LIMIT};

use crate::actions::ActionToken;
use crate::commands::{BotCommand, CommandArgError};
use crate::events::{
    ActionEvent, ActionHandler, ActionService, ChatUser, CommandEvent, CommandHandler,
    CommandService, EventContext, EventDispatcher, EventHandlerError, HandlerResult,
    MessageEvent, MessageHandler, MessageService,
};
use crate::messages::{self, MessageTemplate};
use crate::outbound::{ChatOutbound, MessageRef, OutboundError};

#[derive(Debug, Error)]
enum BotError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Outbound(#[from] OutboundError),
}

pub struct IntakeBot {
    ledger: Arc<AccessLedger>,
    intake: Arc<IntakeService>,
    status: Arc<StatusBridge>,
    sheet: Arc<dyn RequestSheet>,
    outbound: Arc<dyn ChatOutbound>,
}

impl IntakeBot {
    pub fn new(
        ledger: Arc<AccessLedger>,
        intake: Arc<IntakeService>,
        status: Arc<StatusBridge>,
        sheet: Arc<dyn RequestSheet>,
        outbound: Arc<dyn ChatOutbound>,
    ) -> Self {
        Self { ledger, intake, status, sheet, outbound }
    }

    async fn reply(&self, chat_id: ChatId, message: MessageTemplate) -> Result<(), BotError> {
        self.outbound.send(chat_id, message).await?;
        Ok(())
    }

    /// Edits `origin` when given, otherwise posts a new message.
    async fn deliver(
        &self,
        chat_id: ChatId,
        origin: Option<MessageRef>,
        message: MessageTemplate,
    ) -> Result<(), OutboundError> {
        match origin {
            Some(target) => self.outbound.edit(target, message).await,
            None => self.outbound.send(chat_id, message).await.map(|_| ()),
        }
    }

    /// Side notification to another user. Failures never undo the change that caused it.
    async fn notify_user(&self, user: UserId, message: MessageTemplate, ctx: &EventContext) {
        if let Err(error) = self.outbound.send(ChatId::from(user), message).await {
            warn!(
                event_name = "chat.notify.failed",
                correlation_id = %ctx.correlation_id,
                user_id = %user,
                error = %error,
                "could not notify user"
            );
        }
    }

    async fn require_admin(&self, event: &CommandEvent) -> Result<bool, BotError> {
        if self.ledger.is_admin(event.user.id).await? {
            return Ok(true);
        }
        self.reply(event.chat_id, messages::admin_only()).await?;
        Ok(false)
    }

    async fn require_authorized(&self, event: &CommandEvent) -> Result<bool, BotError> {
        if self.ledger.is_authorized(event.user.id).await? {
            return Ok(true);
        }
        self.reply(event.chat_id, messages::access_denied()).await?;
        Ok(false)
    }

    async fn route_command(
        &self,
        event: &CommandEvent,
        command: BotCommand,
        ctx: &EventContext,
    ) -> Result<HandlerResult, BotError> {
        let chat = event.chat_id;
        let user = &event.user;

        match command {
            BotCommand::Start => {
                let message = if self.ledger.is_authorized(user.id).await? {
                    messages::welcome(user.greeting_name(), self.ledger.is_admin(user.id).await?)
                } else {
                    messages::unauthorized_greeting(user.greeting_name())
                };
                self.reply(chat, message).await?;
            }
            BotCommand::Help => {
                let is_admin = self.ledger.is_admin(user.id).await?;
                self.reply(chat, messages::help(is_admin)).await?;
            }
            BotCommand::AdminHelp => {
                if self.require_admin(event).await? {
                    self.reply(chat, messages::admin_help()).await?;
                }
            }
            BotCommand::MyId => {
                self.reply(chat, messages::my_id(user.id, &user.display_name(), user.handle()))
                    .await?;
            }
            BotCommand::Request => {
                if self.require_authorized(event).await? {
                    let step = self.intake.start(user.id, &agent_name(user)).await;
                    self.render_step(chat, &step, None).await?;
                }
            }
            BotCommand::Cancel => {
                let message = if self.intake.cancel(user.id).await {
                    messages::request_cancelled()
                } else {
                    messages::no_active_request()
                };
                self.reply(chat, message).await?;
            }
            BotCommand::Status => {
                if self.require_authorized(event).await? {
                    self.agent_status(event, ctx).await?;
                }
            }
            BotCommand::RequestAccess => self.request_access(event, ctx).await?,
            BotCommand::Pending => {
                if self.require_admin(event).await? {
                    let pending = self.ledger.pending_requests().await?;
                    if pending.is_empty() {
                        self.reply(chat, messages::no_pending_requests()).await?;
                    } else {
                        self.reply(chat, messages::pending_requests_header(pending.len())).await?;
                        for request in &pending {
                            self.reply(chat, messages::pending_request_card(request)).await?;
                        }
                    }
                }
            }
            BotCommand::List => {
                if self.require_admin(event).await? {
                    let record = self.ledger.authorizations().await?;
                    self.reply(chat, messages::authorized_users(&record)).await?;
                }
            }
            BotCommand::AddUser(target) => {
                if self.require_admin(event).await? {
                    match target {
                        Ok(target) => self.add_user(event, target, ctx).await?,
                        Err(_) => self.reply(chat, messages::invalid_user_id("adduser")).await?,
                    }
                }
            }
            BotCommand::RemoveUser(target) => {
                if self.require_admin(event).await? {
                    match target {
                        Ok(target) => self.remove_user(event, target, ctx).await?,
                        Err(_) => self.reply(chat, messages::invalid_user_id("removeuser")).await?,
                    }
                }
            }
            BotCommand::AddAdmin(target) => {
                if self.require_admin(event).await? {
                    match target {
                        Ok(target) => self.add_admin(event, target, ctx).await?,
                        Err(_) => self.reply(chat, messages::invalid_user_id("addadmin")).await?,
                    }
                }
            }
            BotCommand::Lists(filter) => {
                if self.require_admin(event).await? {
                    match filter {
                        Ok(filter) => self.list_requests(event, filter, ctx).await?,
                        Err(_) => self.reply(chat, messages::invalid_status()).await?,
                    }
                }
            }
            BotCommand::SetStatus(update) => {
                if self.require_admin(event).await? {
                    match update {
                        Ok((id, status)) => self.set_status_command(event, id, status, ctx).await?,
                        Err(CommandArgError::InvalidStatus(_)) => {
                            self.reply(chat, messages::invalid_status()).await?
                        }
                        Err(_) => self.reply(chat, messages::set_status_usage()).await?,
                    }
                }
            }
            BotCommand::Unknown(name) => {
                debug!(
                    event_name = "chat.command.unknown",
                    correlation_id = %ctx.correlation_id,
                    user_id = %user.id,
                    command = %name,
                    "ignoring unknown command"
                );
                return Ok(HandlerResult::Ignored);
            }
        }

        Ok(HandlerResult::Processed)
    }

    async fn agent_status(&self, event: &CommandEvent, ctx: &EventContext) -> Result<(), BotError> {
        let message = match self.sheet.list_rows_by_agent(event.user.id).await {
            Ok(requests) => messages::status_overview(&requests),
            Err(error) => {
                warn!(
                    event_name = "requests.agent.list_failed",
                    correlation_id = %ctx.correlation_id,
                    user_id = %event.user.id,
                    error = %error,
                    "could not load agent requests"
                );
                messages::status_fetch_failed()
            }
        };
        self.reply(event.chat_id, message).await
    }

    async fn request_access(&self, event: &CommandEvent, ctx: &EventContext) -> Result<(), BotError> {
        let user = &event.user;
        if self.ledger.is_authorized(user.id).await? {
            return self.reply(event.chat_id, messages::already_authorized()).await;
        }

        let added =
            self.ledger.add_pending_request(user.id, &agent_name(user), user.handle()).await?;
        if !added {
            return self.reply(event.chat_id, messages::access_request_already_pending()).await;
        }
        self.reply(event.chat_id, messages::access_request_submitted()).await?;

        let Some(request) = self.ledger.pending_request(user.id).await? else {
            return Ok(());
        };
        let alert = messages::access_request_alert(&request);
        for admin in self.ledger.authorizations().await?.admins {
            self.notify_user(admin, alert.clone(), ctx).await;
        }
        info!(
            event_name = "access.request.announced",
            correlation_id = %ctx.correlation_id,
            user_id = %user.id,
            "access request sent to admins"
        );
        Ok(())
    }

    async fn add_user(
        &self,
        event: &CommandEvent,
        target: UserId,
        ctx: &EventContext,
    ) -> Result<(), BotError> {
        if self.ledger.add_user(target).await? {
            self.reply(event.chat_id, messages::user_added(target)).await?;
            self.notify_user(target, messages::access_granted(), ctx).await;
        } else {
            self.reply(event.chat_id, messages::user_already_authorized(target)).await?;
        }
        Ok(())
    }

    async fn remove_user(
        &self,
        event: &CommandEvent,
        target: UserId,
        ctx: &EventContext,
    ) -> Result<(), BotError> {
        if self.ledger.remove_user(target).await? {
            self.reply(event.chat_id, messages::user_removed(target)).await?;
            self.notify_user(target, messages::access_revoked(), ctx).await;
        } else {
            self.reply(event.chat_id, messages::user_not_found(target)).await?;
        }
        Ok(())
    }

    async fn add_admin(
        &self,
        event: &CommandEvent,
        target: UserId,
        ctx: &EventContext,
    ) -> Result<(), BotError> {
        if self.ledger.add_admin(target).await? {
            self.reply(event.chat_id, messages::admin_added(target)).await?;
            self.notify_user(target, messages::admin_granted(), ctx).await;
        } else {
            self.reply(event.chat_id, messages::already_admin(target)).await?;
        }
        Ok(())
    }

    async fn list_requests(
        &self,
        event: &CommandEvent,
        filter: Option<RequestStatus>,
        ctx: &EventContext,
    ) -> Result<(), BotError> {
        let chat = event.chat_id;
        let requests = match self.sheet.list_rows(filter, DEFAULT_LIST_LIMIT).await {
            Ok(requests) => requests,
            Err(error) => {
                warn!(
                    event_name = "requests.list.failed",
                    correlation_id = %ctx.correlation_id,
                    user_id = %event.user.id,
                    error = %error,
                    "could not list requests"
                );
                return self.reply(chat, messages::lists_failed()).await;
            }
        };

        if requests.is_empty() {
            return self.reply(chat, messages::no_requests(filter)).await;
        }
        self.reply(chat, messages::requests_header(filter, requests.len())).await?;
        for request in &requests {
            self.reply(chat, messages::request_card(request)).await?;
        }
        Ok(())
    }

    async fn set_status_command(
        &self,
        event: &CommandEvent,
        id: RequestId,
        status: RequestStatus,
        ctx: &EventContext,
    ) -> Result<(), BotError> {
        let message = match self.status.set_status(id, status).await {
            Ok(StatusChange::NotFound(id)) => messages::request_not_found(id),
            Ok(StatusChange::Unchanged(request)) => {
                messages::status_unchanged(request.id, request.row.status)
            }
            Ok(StatusChange::Updated { request, previous, .. }) => messages::status_updated(
                request.id,
                &request.row.client_name,
                previous,
                request.row.status,
            ),
            Err(error) => {
                self.log_status_failure(id, &error, event.user.id, ctx);
                messages::status_update_failed()
            }
        };
        self.reply(event.chat_id, message).await
    }

    fn log_status_failure(&self, id: RequestId, error: &SheetError, user: UserId, ctx: &EventContext) {
        warn!(
            event_name = "requests.status.update_failed",
            correlation_id = %ctx.correlation_id,
            user_id = %user,
            request_id = %id,
            error = %error,
            "status update failed"
        );
    }

    /// Renders every action of an accepted transition. Choice-driven prompts replace the
    /// pressed card, except prompts that wait for typed input.
    async fn render_step(
        &self,
        chat_id: ChatId,
        step: &IntakeStep,
        origin: Option<MessageRef>,
    ) -> Result<(), OutboundError> {
        for action in &step.outcome.actions {
            let message = match action {
                FlowAction::SubmitRequest => {
                    let count = step
                        .receipt
                        .as_ref()
                        .map_or(step.data.selected_products.len(), |receipt| receipt.product_count());
                    messages::submission_succeeded(count)
                }
                other => match messages::flow_prompt(other, step.outcome.from, &step.data) {
                    Some(message) => message,
                    None => continue,
                },
            };
            let target = if awaits_typed_input(action) { None } else { origin };
            self.deliver(chat_id, target, message).await?;
        }
        Ok(())
    }

    async fn session_input(
        &self,
        chat_id: ChatId,
        user: &ChatUser,
        input: SessionInput,
        origin: Option<MessageRef>,
        ctx: &EventContext,
    ) -> Result<HandlerResult, OutboundError> {
        match self.intake.handle(user.id, input).await {
            Ok(Some(step)) => {
                self.render_step(chat_id, &step, origin).await?;
                Ok(HandlerResult::Processed)
            }
            Ok(None) => Ok(HandlerResult::Ignored),
            Err(IntakeError::Flow(FlowTransitionError::Validation { failure, .. })) => {
                self.outbound.send(chat_id, messages::validation_failure(failure)).await?;
                Ok(HandlerResult::Processed)
            }
            Err(IntakeError::Flow(error @ FlowTransitionError::InvalidTransition { .. })) => {
                debug!(
                    event_name = "chat.input.stale",
                    correlation_id = %ctx.correlation_id,
                    user_id = %user.id,
                    error = %error,
                    "input does not apply to the current step"
                );
                Ok(HandlerResult::Ignored)
            }
            Err(IntakeError::Dispatch(failure)) => {
                error!(
                    event_name = "intake.submission.failed",
                    correlation_id = %ctx.correlation_id,
                    user_id = %user.id,
                    error = %failure,
                    "submission failed; session kept for retry"
                );
                let interface = ApplicationError::from(failure).into_interface(&ctx.correlation_id);
                self.outbound.send(chat_id, messages::submission_failed(&interface)).await?;
                Ok(HandlerResult::Processed)
            }
        }
    }

    async fn route_admin_action(
        &self,
        event: &ActionEvent,
        token: ActionToken,
        ctx: &EventContext,
    ) -> Result<(), BotError> {
        if !self.ledger.is_admin(event.user.id).await? {
            self.outbound
                .answer_action(&event.action_id, Some(messages::admin_only_action().to_owned()))
                .await?;
            return Ok(());
        }

        match token {
            ActionToken::Approve(target) => {
                let Some(request) = self.ledger.pending_request(target).await? else {
                    return self.answer_missing_request(event).await;
                };
                if !self.ledger.add_user(target).await? {
                    self.ledger.remove_pending_request(target).await?;
                }
                self.outbound.edit(event.message, messages::approved_card(&request)).await?;
                self.outbound.answer_action(&event.action_id, None).await?;
                self.notify_user(target, messages::access_approved_notice(), ctx).await;
                info!(
                    event_name = "access.request.approved",
                    correlation_id = %ctx.correlation_id,
                    user_id = %event.user.id,
                    target_user_id = %target,
                    "access request approved"
                );
            }
            ActionToken::Reject(target) => {
                let Some(request) = self.ledger.pending_request(target).await? else {
                    return self.answer_missing_request(event).await;
                };
                self.ledger.remove_pending_request(target).await?;
                self.outbound.edit(event.message, messages::rejected_card(&request)).await?;
                self.outbound.answer_action(&event.action_id, None).await?;
                self.notify_user(target, messages::access_rejected_notice(), ctx).await;
                info!(
                    event_name = "access.request.rejected",
                    correlation_id = %ctx.correlation_id,
                    user_id = %event.user.id,
                    target_user_id = %target,
                    "access request rejected"
                );
            }
            ActionToken::SetStatus { id, status } => {
                let toast = match self.status.set_status(id, status).await {
                    Ok(StatusChange::Updated { request, .. }) => {
                        self.outbound.edit(event.message, messages::request_card(&request)).await?;
                        format!("Status updated to {status}")
                    }
                    Ok(StatusChange::Unchanged(_)) => format!("Already {status}"),
                    Ok(StatusChange::NotFound(id)) => format!("Request #{id} not found"),
                    Err(error) => {
                        self.log_status_failure(id, &error, event.user.id, ctx);
                        "Error updating status".to_owned()
                    }
                };
                self.outbound.answer_action(&event.action_id, Some(toast)).await?;
            }
            ActionToken::Intake(_) | ActionToken::Unknown(_) => {
                self.outbound.answer_action(&event.action_id, None).await?;
            }
        }
        Ok(())
    }

    async fn answer_missing_request(&self, event: &ActionEvent) -> Result<(), BotError> {
        self.outbound
            .answer_action(&event.action_id, Some(messages::access_request_missing().to_owned()))
            .await?;
        Ok(())
    }

    async fn recover(
        &self,
        chat_id: ChatId,
        error: BotError,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        match error {
            BotError::Outbound(error) => Err(error.into()),
            BotError::Ledger(error) => {
                error!(
                    event_name = "access.ledger.unavailable",
                    correlation_id = %ctx.correlation_id,
                    error = %error,
                    "authorization ledger could not be read or written"
                );
                let interface = ApplicationError::from(error).into_interface(&ctx.correlation_id);
                self.outbound.send(chat_id, messages::service_failure(&interface)).await?;
                Ok(HandlerResult::Processed)
            }
        }
    }
}

fn agent_name(user: &ChatUser) -> String {
    let name = user.display_name();
    if name.is_empty() {
        user.greeting_name().to_owned()
    } else {
        name
    }
}

fn awaits_typed_input(action: &FlowAction) -> bool {
    matches!(
        action,
        FlowAction::PromptCustomAmount | FlowAction::PromptCustomTerm | FlowAction::PromptNotes
    )
}

#[async_trait]
impl CommandService for IntakeBot {
    async fn handle_command(
        &self,
        event: &CommandEvent,
        command: BotCommand,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        info!(
            event_name = "chat.command.received",
            correlation_id = %ctx.correlation_id,
            user_id = %event.user.id,
            command = command.name(),
            "handling command"
        );
        match self.route_command(event, command, ctx).await {
            Ok(result) => Ok(result),
            Err(error) => self.recover(event.chat_id, error, ctx).await,
        }
    }
}

#[async_trait]
impl MessageService for IntakeBot {
    async fn handle_message(
        &self,
        event: &MessageEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let Some(text) = event.text.as_deref() else {
            return Ok(HandlerResult::Ignored);
        };
        let result = self
            .session_input(event.chat_id, &event.user, SessionInput::Text(text.to_owned()), None, ctx)
            .await?;
        if result == HandlerResult::Ignored {
            debug!(
                event_name = "chat.message.ignored",
                correlation_id = %ctx.correlation_id,
                user_id = %event.user.id,
                "free text outside an active step"
            );
        }
        Ok(result)
    }
}

#[async_trait]
impl ActionService for IntakeBot {
    async fn handle_action(
        &self,
        event: &ActionEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let token = ActionToken::parse(&event.token);
        debug!(
            event_name = "chat.action.received",
            correlation_id = %ctx.correlation_id,
            user_id = %event.user.id,
            token = %event.token,
            "handling button press"
        );

        match token {
            ActionToken::Intake(choice) => {
                if !self.intake.has_session(event.user.id).await {
                    self.outbound
                        .answer_action(&event.action_id, Some(messages::session_expired().to_owned()))
                        .await?;
                    return Ok(HandlerResult::Processed);
                }
                self.outbound.answer_action(&event.action_id, None).await?;
                self.session_input(
                    event.message.chat_id,
                    &event.user,
                    SessionInput::Choice(choice),
                    Some(event.message),
                    ctx,
                )
                .await
                .map_err(EventHandlerError::from)
            }
            admin_token if admin_token.is_admin_action() => {
                match self.route_admin_action(event, admin_token, ctx).await {
                    Ok(()) => Ok(HandlerResult::Processed),
                    Err(error) => self.recover(event.message.chat_id, error, ctx).await,
                }
            }
            _ => {
                debug!(
                    event_name = "chat.action.unrecognized",
                    correlation_id = %ctx.correlation_id,
                    user_id = %event.user.id,
                    token = %event.token,
                    "ignoring unrecognized button token"
                );
                self.outbound.answer_action(&event.action_id, None).await?;
                Ok(HandlerResult::Ignored)
            }
        }
    }
}

/// Dispatcher with the bot registered for commands, free text and button presses.
pub fn bot_dispatcher(bot: Arc<IntakeBot>) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(CommandHandler::new(bot.clone()));
    dispatcher.register(MessageHandler::new(bot.clone()));
    dispatcher.register(ActionHandler::new(bot));
    dispatcher
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use illustra_core::access::{AccessLedger, InMemoryLedgerStore};
    use illustra_core::domain::request::{RequestId, RequestRow, RequestStatus};
    use illustra_core::domain::user::{ChatId, UserId};
    use illustra_core::flows::{FlowEngine, IntakeFlow};
    use illustra_core::intake::{IntakeService, StatusBridge, SubmissionDispatcher};
    use illustra_core::ports::RequestSheet;
    use illustra_db::InMemoryRequestSheet;

    use super::{bot_dispatcher, IntakeBot};
    use crate::events::{
        ActionEvent, ChatEnvelope, ChatEvent, ChatUser, DispatchError, EventContext,
        EventDispatcher, EventHandlerError, HandlerResult,
    };
    use crate::outbound::{ChatNotifier, MessageRef, OutboundError, RecordingOutbound};

    const ADMIN: UserId = UserId(1);
    const AGENT: UserId = UserId(20);
    const STRANGER: UserId = UserId(30);
    const OPERATIONS: ChatId = ChatId(-100);

    struct Harness {
        dispatcher: EventDispatcher,
        ledger: Arc<AccessLedger>,
        sheet: Arc<InMemoryRequestSheet>,
        outbound: Arc<RecordingOutbound>,
    }

    impl Harness {
        async fn new(rows: Vec<RequestRow>) -> Self {
            let ledger = Arc::new(
                AccessLedger::open(Arc::new(InMemoryLedgerStore::default()), &[ADMIN])
                    .await
                    .expect("ledger"),
            );
            ledger.add_user(AGENT).await.expect("agent");
            let sheet = Arc::new(InMemoryRequestSheet::with_rows(rows));
            let outbound = Arc::new(RecordingOutbound::default());
            let notifier = Arc::new(ChatNotifier::new(outbound.clone()));
            let intake = Arc::new(IntakeService::new(
                FlowEngine::new(IntakeFlow::with_current_year(2026)),
                SubmissionDispatcher::new(sheet.clone(), notifier.clone(), OPERATIONS),
            ));
            let status = Arc::new(StatusBridge::new(sheet.clone(), notifier));
            let bot = Arc::new(IntakeBot::new(
                ledger.clone(),
                intake,
                status,
                sheet.clone(),
                outbound.clone(),
            ));
            Self { dispatcher: bot_dispatcher(bot), ledger, sheet, outbound }
        }

        async fn text(&self, user: UserId, text: &str) -> HandlerResult {
            let envelope = ChatEnvelope {
                update_id: 1,
                event: ChatEvent::from_text(ChatId::from(user), person(user), text),
            };
            self.dispatcher.dispatch(&envelope, &EventContext::for_update(1)).await.expect("dispatch")
        }

        async fn press(&self, user: UserId, chat: ChatId, token: &str) -> HandlerResult {
            let envelope = ChatEnvelope {
                update_id: 2,
                event: ChatEvent::Action(ActionEvent {
                    action_id: format!("cb-{token}"),
                    message: MessageRef { chat_id: chat, message_id: 99 },
                    user: person(user),
                    token: token.to_owned(),
                }),
            };
            self.dispatcher.dispatch(&envelope, &EventContext::for_update(2)).await.expect("dispatch")
        }

        async fn last_text_to(&self, chat: ChatId) -> String {
            self.outbound.sent_to(chat).await.last().map(|m| m.text.clone()).unwrap_or_default()
        }
    }

    fn person(user: UserId) -> ChatUser {
        ChatUser::new(user, "Sari").with_username("sari")
    }

    fn row(agent: UserId, client: &str, status: RequestStatus) -> RequestRow {
        RequestRow {
            submitted_at: Utc::now(),
            agent_id: agent,
            agent_name: "Sari".to_owned(),
            client_name: client.to_owned(),
            client_dob: "25/11/1990".to_owned(),
            client_gender: "Male".to_owned(),
            smoking: "No".to_owned(),
            product: "IUL (USD)".to_owned(),
            amount: "$500,000".to_owned(),
            term_payment: "10 years".to_owned(),
            notes: "-".to_owned(),
            status,
        }
    }

    #[tokio::test]
    async fn unauthorized_request_is_denied_without_session() {
        let harness = Harness::new(Vec::new()).await;

        harness.text(STRANGER, "/request").await;
        assert!(harness.last_text_to(ChatId::from(STRANGER)).await.contains("Access denied"));

        assert_eq!(harness.text(STRANGER, "Budi").await, HandlerResult::Ignored);
    }

    #[tokio::test]
    async fn start_greets_by_authorization() {
        let harness = Harness::new(Vec::new()).await;

        harness.text(STRANGER, "/start").await;
        assert!(harness.last_text_to(ChatId::from(STRANGER)).await.contains("/requestaccess"));

        harness.text(ADMIN, "/start").await;
        assert!(harness.last_text_to(ChatId::from(ADMIN)).await.contains("Admin Commands"));

        harness.text(AGENT, "/start").await;
        let welcome = harness.last_text_to(ChatId::from(AGENT)).await;
        assert!(welcome.contains("Selamat datang, Sari"));
        assert!(!welcome.contains("Admin Commands"));
    }

    #[tokio::test]
    async fn invalid_date_reprompts_without_advancing() {
        let harness = Harness::new(Vec::new()).await;
        harness.text(AGENT, "/request").await;
        harness.text(AGENT, "Budi").await;

        harness.text(AGENT, "1990-11-25").await;
        assert!(harness.last_text_to(ChatId::from(AGENT)).await.contains("Format tanggal tidak valid"));

        harness.text(AGENT, "25/11/1990").await;
        assert!(harness.last_text_to(ChatId::from(AGENT)).await.contains("Pilih *gender*"));
    }

    #[tokio::test]
    async fn choice_prompts_edit_the_pressed_card() {
        let harness = Harness::new(Vec::new()).await;
        harness.text(AGENT, "/request").await;
        harness.text(AGENT, "Budi").await;
        harness.text(AGENT, "25/11/1990").await;

        harness.press(AGENT, ChatId::from(AGENT), "gender_male").await;

        let edits = harness.outbound.edits().await;
        assert_eq!(edits.len(), 1);
        assert!(edits[0].1.text.contains("Gender: Male"));
        assert!(edits[0].1.has_button("smoking_no"));
    }

    #[tokio::test]
    async fn failed_card_edit_after_choice_surfaces_as_outbound_error() {
        let harness = Harness::new(Vec::new()).await;
        harness.text(AGENT, "/request").await;
        harness.text(AGENT, "Budi").await;
        harness.text(AGENT, "25/11/1990").await;
        harness.outbound.set_unreachable(ChatId::from(AGENT), true).await;

        let envelope = ChatEnvelope {
            update_id: 3,
            event: ChatEvent::Action(ActionEvent {
                action_id: "cb-gender".to_owned(),
                message: MessageRef { chat_id: ChatId::from(AGENT), message_id: 99 },
                user: person(AGENT),
                token: "gender_male".to_owned(),
            }),
        };
        let result = harness.dispatcher.dispatch(&envelope, &EventContext::for_update(3)).await;

        assert!(matches!(
            result,
            Err(DispatchError::Handler(EventHandlerError::Outbound(OutboundError::Rejected { .. })))
        ));
        assert!(harness.outbound.edits().await.is_empty());
    }

    #[tokio::test]
    async fn stale_choice_is_answered_without_side_effects() {
        let harness = Harness::new(Vec::new()).await;

        harness.press(AGENT, ChatId::from(AGENT), "gender_male").await;
        let answers = harness.outbound.answers().await;
        assert_eq!(answers.len(), 1);
        assert!(answers[0].1.as_deref().unwrap_or_default().contains("Session expired"));

        harness.text(AGENT, "/request").await;
        let result = harness.press(AGENT, ChatId::from(AGENT), "confirm_yes").await;
        assert_eq!(result, HandlerResult::Ignored);
        assert!(harness.sheet.rows().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_admin_tokens_are_ignored_even_for_admins() {
        let harness = Harness::new(Vec::new()).await;

        for token in ["approve_abc", "status_3_Done", "bogus"] {
            assert_eq!(harness.press(ADMIN, ChatId::from(ADMIN), token).await, HandlerResult::Ignored);
        }

        let answers = harness.outbound.answers().await;
        assert_eq!(answers.len(), 3);
        assert!(answers.iter().all(|(_, toast)| toast.is_none()));
        assert!(harness.outbound.edits().await.is_empty());
    }

    #[tokio::test]
    async fn cancel_reports_whether_a_session_existed() {
        let harness = Harness::new(Vec::new()).await;

        harness.text(AGENT, "/cancel").await;
        assert!(harness.last_text_to(ChatId::from(AGENT)).await.contains("Tidak ada permintaan aktif"));

        harness.text(AGENT, "/request").await;
        harness.text(AGENT, "/cancel").await;
        assert!(harness.last_text_to(ChatId::from(AGENT)).await.contains("dibatalkan"));
        assert_eq!(harness.text(AGENT, "Budi").await, HandlerResult::Ignored);
    }

    #[tokio::test]
    async fn admin_commands_reject_non_admins() {
        let harness = Harness::new(Vec::new()).await;

        harness.text(AGENT, "/adduser 30").await;

        assert!(harness.last_text_to(ChatId::from(AGENT)).await.contains("Admin only"));
        assert!(!harness.ledger.is_authorized(STRANGER).await.expect("read"));
    }

    #[tokio::test]
    async fn adduser_notifies_target_and_tolerates_unreachable_chat() {
        let harness = Harness::new(Vec::new()).await;
        harness.outbound.set_unreachable(ChatId::from(STRANGER), true).await;

        harness.text(ADMIN, "/adduser 30").await;

        assert!(harness.ledger.is_authorized(STRANGER).await.expect("read"));
        assert!(harness.last_text_to(ChatId::from(ADMIN)).await.contains("User 30 has been authorized"));

        harness.text(ADMIN, "/adduser 30").await;
        assert!(harness.last_text_to(ChatId::from(ADMIN)).await.contains("already authorized"));

        harness.text(ADMIN, "/adduser abc").await;
        assert!(harness.last_text_to(ChatId::from(ADMIN)).await.contains("/adduser 123456789"));
    }

    #[tokio::test]
    async fn access_request_alerts_admins_and_approval_grants_access() {
        let harness = Harness::new(Vec::new()).await;

        harness.text(STRANGER, "/requestaccess").await;
        let alert = harness.last_text_to(ChatId::from(ADMIN)).await;
        assert!(alert.contains("New Access Request"));

        harness.text(STRANGER, "/requestaccess").await;
        assert!(harness.last_text_to(ChatId::from(STRANGER)).await.contains("pending"));

        let denied = harness.press(AGENT, ChatId::from(ADMIN), "approve_30").await;
        assert_eq!(denied, HandlerResult::Processed);
        assert!(!harness.ledger.is_authorized(STRANGER).await.expect("read"));

        harness.press(ADMIN, ChatId::from(ADMIN), "approve_30").await;
        assert!(harness.ledger.is_authorized(STRANGER).await.expect("read"));
        assert!(harness.ledger.pending_requests().await.expect("read").is_empty());
        let edits = harness.outbound.edits().await;
        assert!(edits.last().map(|(_, m)| m.text.contains("APPROVED")).unwrap_or(false));
        assert!(harness.last_text_to(ChatId::from(STRANGER)).await.contains("Access Granted"));

        harness.press(ADMIN, ChatId::from(ADMIN), "reject_30").await;
        let answers = harness.outbound.answers().await;
        assert_eq!(
            answers.last().and_then(|(_, text)| text.clone()).as_deref(),
            Some("Request not found or already processed.")
        );
    }

    #[tokio::test]
    async fn lists_filters_and_setstatus_notifies_agent_once() {
        let harness = Harness::new(vec![
            row(AGENT, "Budi", RequestStatus::Pending),
            row(AGENT, "Citra", RequestStatus::Completed),
        ])
        .await;

        harness.text(ADMIN, "/lists pending").await;
        let sent = harness.outbound.sent_to(ChatId::from(ADMIN)).await;
        assert_eq!(sent.len(), 2);
        assert!(sent[1].has_button("status_1_Processing"));

        harness.text(ADMIN, "/lists done").await;
        assert!(harness.last_text_to(ChatId::from(ADMIN)).await.contains("Invalid status"));

        harness.text(ADMIN, "/setstatus 1 processing").await;
        assert!(harness.last_text_to(ChatId::from(ADMIN)).await.contains("Pending → Processing"));
        assert!(harness.last_text_to(ChatId::from(AGENT)).await.contains("Status Update"));

        harness.text(ADMIN, "/setstatus 1 PROCESSING").await;
        assert!(harness.last_text_to(ChatId::from(ADMIN)).await.contains("already Processing"));

        harness.text(ADMIN, "/setstatus 9 completed").await;
        assert!(harness.last_text_to(ChatId::from(ADMIN)).await.contains("#9 not found"));

        harness.text(ADMIN, "/setstatus 1").await;
        assert!(harness.last_text_to(ChatId::from(ADMIN)).await.contains("Usage"));

        let stored = harness.sheet.get_row(RequestId(1)).await.expect("get").expect("row");
        assert_eq!(stored.row.status, RequestStatus::Processing);
        assert_eq!(harness.outbound.sent_to(ChatId::from(AGENT)).await.len(), 1);
    }

    #[tokio::test]
    async fn status_button_edits_card_in_place() {
        let harness = Harness::new(vec![row(AGENT, "Budi", RequestStatus::Processing)]).await;

        harness.press(ADMIN, ChatId::from(ADMIN), "status_1_Completed").await;

        let edits = harness.outbound.edits().await;
        assert_eq!(edits.len(), 1);
        assert!(edits[0].1.has_button("status_1_Completed"));
        assert!(edits[0].1.text.contains("*Completed*"));
        assert!(harness.outbound.sent_to(ChatId::from(AGENT)).await.is_empty());
    }

    #[tokio::test]
    async fn agent_status_groups_own_requests() {
        let harness = Harness::new(vec![
            row(AGENT, "Budi", RequestStatus::Pending),
            row(ADMIN, "Other", RequestStatus::Pending),
            row(AGENT, "Citra", RequestStatus::Completed),
        ])
        .await;

        harness.text(AGENT, "/status").await;

        let overview = harness.last_text_to(ChatId::from(AGENT)).await;
        assert!(overview.contains("Budi"));
        assert!(overview.contains("Citra"));
        assert!(!overview.contains("Other"));
        assert!(overview.contains("Total: 2 request(s)"));
    }

    #[tokio::test]
    async fn myid_shows_handle_or_placeholder() {
        let harness = Harness::new(Vec::new()).await;

        harness.text(STRANGER, "/myid").await;

        let text = harness.last_text_to(ChatId::from(STRANGER)).await;
        assert!(text.contains("`30`"));
        assert!(text.contains("@sari"));
    }
}
