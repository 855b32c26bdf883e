//! Per-agent intake conversations and what happens when they are confirmed.

pub mod dispatcher;
pub mod sessions;
pub mod status;
#[cfg(test)]
pub(crate) mod testing;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::user::UserId;
use crate::flows::{
    FlowEngine, FlowTransitionError, IntakeData, IntakeFlow, Session, SessionInput, SessionState,
    TransitionOutcome,
};

pub use dispatcher::{rows_for_submission, DispatchError, SubmissionDispatcher, SubmissionReceipt};
pub use sessions::{SessionSlot, SessionStore};
pub use status::{StatusBridge, StatusChange};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntakeError {
    #[error(transparent)]
    Flow(#[from] FlowTransitionError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Result of one accepted input: the transition, the session data as it stood afterwards,
/// and the receipt when the input completed a submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntakeStep {
    pub outcome: TransitionOutcome,
    pub data: IntakeData,
    pub receipt: Option<SubmissionReceipt>,
}

pub struct IntakeService {
    engine: FlowEngine<IntakeFlow>,
    sessions: SessionStore,
    dispatcher: SubmissionDispatcher,
}

impl IntakeService {
    pub fn new(engine: FlowEngine<IntakeFlow>, dispatcher: SubmissionDispatcher) -> Self {
        Self { engine, sessions: SessionStore::default(), dispatcher }
    }

    /// Opens a session, silently replacing any existing one for the agent.
    pub async fn start(&self, agent: UserId, agent_name: &str) -> IntakeStep {
        let mut slot = self.sessions.lock(agent).await;
        let replaced = slot.is_some();
        let (session, outcome) = self.engine.start(agent, agent_name, Utc::now());
        info!(
            event_name = "intake.session.started",
            user_id = %agent,
            replaced,
            "intake session started"
        );
        let data = session.data.clone();
        *slot = Some(session);
        IntakeStep { outcome, data, receipt: None }
    }

    /// Returns whether a session existed.
    pub async fn cancel(&self, agent: UserId) -> bool {
        let cancelled = self.sessions.lock(agent).await.take().is_some();
        if cancelled {
            info!(event_name = "intake.session.cancelled", user_id = %agent, "intake session cancelled");
        }
        cancelled
    }

    pub async fn has_session(&self, agent: UserId) -> bool {
        self.sessions.has_session(agent).await
    }

    pub async fn snapshot(&self, agent: UserId) -> Option<Session> {
        self.sessions.lock(agent).await.clone()
    }

    /// `Ok(None)` when the agent has no live session. A failed submission leaves the
    /// session in place so the agent can confirm again.
    pub async fn handle(
        &self,
        agent: UserId,
        input: SessionInput,
    ) -> Result<Option<IntakeStep>, IntakeError> {
        let mut slot = self.sessions.lock(agent).await;
        let Some(session) = slot.as_mut() else {
            debug!(event_name = "intake.input.ignored", user_id = %agent, "no active session");
            return Ok(None);
        };
        if session.state == SessionState::Idle {
            return Ok(None);
        }

        let outcome = self.engine.apply(session, &input).map_err(|error| {
            debug!(
                event_name = "flow.transition_rejected",
                user_id = %agent,
                state = ?session.state,
                error = %error,
                "input not accepted"
            );
            error
        })?;
        info!(
            event_name = "flow.transition_applied",
            user_id = %agent,
            from = ?outcome.from,
            to = ?outcome.to,
            "intake transition applied"
        );

        let receipt = match outcome.to {
            SessionState::Submitted => Some(self.dispatcher.submit(session).await?),
            _ => None,
        };
        let data = session.data.clone();
        if outcome.to.is_terminal() {
            *slot = None;
        }

        Ok(Some(IntakeStep { outcome, data, receipt }))
    }
}
