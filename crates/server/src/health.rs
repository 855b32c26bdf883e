use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use illustra_core::access::AccessLedger;
use illustra_db::DbPool;
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    ledger: Arc<AccessLedger>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    pub ledger: HealthCheck,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool, ledger: Arc<AccessLedger>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { db_pool, ledger })
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    db_pool: DbPool,
    ledger: Arc<AccessLedger>,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(db_pool, ledger)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let ledger = ledger_check(&state.ledger).await;
    let ready = database.status == "ready" && ledger.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "illustra-server runtime initialized".to_string(),
        },
        database,
        ledger,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

async fn ledger_check(ledger: &AccessLedger) -> HealthCheck {
    match ledger.authorizations().await {
        Ok(record) => HealthCheck {
            status: "ready",
            detail: format!(
                "{} admin(s), {} user(s) authorized",
                record.admins.len(),
                record.users.len()
            ),
        },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("ledger read failed: {error}") }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        extract::State,
        http::{Request, StatusCode},
        Json,
    };
    use illustra_core::access::{AccessLedger, InMemoryLedgerStore};
    use illustra_core::domain::user::UserId;
    use illustra_db::{connect_with_settings, JsonFileLedgerStore};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::health::{health, router, HealthState};

    async fn memory_ledger() -> Arc<AccessLedger> {
        Arc::new(
            AccessLedger::open(Arc::new(InMemoryLedgerStore::default()), &[UserId(1)])
                .await
                .expect("ledger"),
        )
    }

    #[tokio::test]
    async fn health_returns_ready_when_database_and_ledger_are_reachable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");

        let (status, Json(payload)) =
            health(State(HealthState { db_pool: pool.clone(), ledger: memory_ledger().await })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.database.status, "ready");
        assert_eq!(payload.ledger.detail, "1 admin(s), 0 user(s) authorized");

        pool.close().await;
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_database_is_unavailable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        pool.close().await;

        let (status, Json(payload)) =
            health(State(HealthState { db_pool: pool, ledger: memory_ledger().await })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.database.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }

    #[tokio::test]
    async fn ledger_file_corrupted_after_startup_degrades_health() {
        let dir = TempDir::new().expect("tempdir");
        let users = dir.path().join("authorized-users.json");
        let store = JsonFileLedgerStore::new(&users, dir.path().join("pending-requests.json"));
        let ledger = Arc::new(AccessLedger::open(Arc::new(store), &[]).await.expect("ledger"));
        std::fs::write(&users, "[broken").expect("corrupt");
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");

        let response = router(pool, ledger)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(payload["ledger"]["status"], "degraded");
        assert_eq!(payload["database"]["status"], "ready");
    }
}
