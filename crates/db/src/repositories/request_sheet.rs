use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::debug;

use illustra_core::domain::request::{RequestId, RequestRow, RequestStatus, StoredRequest};
use illustra_core::domain::user::UserId;
use illustra_core::ports::{RequestSheet, SheetError};

use crate::DbPool;

const SELECT_COLUMNS: &str = "SELECT id, submitted_at, agent_id, agent_name, client_name, client_dob,
        client_gender, smoking, product, amount, term_payment, notes, status
 FROM illustration_request";

pub struct SqlRequestSheet {
    pool: DbPool,
}

impl SqlRequestSheet {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn database(error: sqlx::Error) -> SheetError {
    SheetError::Database(error.to_string())
}

fn decode(error: impl ToString) -> SheetError {
    SheetError::Decode(error.to_string())
}

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<StoredRequest, SheetError> {
    let id: i64 = row.try_get("id").map_err(decode)?;
    let submitted_at: String = row.try_get("submitted_at").map_err(decode)?;
    let agent_id: i64 = row.try_get("agent_id").map_err(decode)?;
    let status: String = row.try_get("status").map_err(decode)?;

    let submitted_at = DateTime::parse_from_rfc3339(&submitted_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(decode)?;

    Ok(StoredRequest {
        id: RequestId(u32::try_from(id).map_err(decode)?),
        row: RequestRow {
            submitted_at,
            agent_id: UserId(agent_id),
            agent_name: row.try_get("agent_name").map_err(decode)?,
            client_name: row.try_get("client_name").map_err(decode)?,
            client_dob: row.try_get("client_dob").map_err(decode)?,
            client_gender: row.try_get("client_gender").map_err(decode)?,
            smoking: row.try_get("smoking").map_err(decode)?,
            product: row.try_get("product").map_err(decode)?,
            amount: row.try_get("amount").map_err(decode)?,
            term_payment: row.try_get("term_payment").map_err(decode)?,
            notes: row.try_get("notes").map_err(decode)?,
            status: status.parse::<RequestStatus>().map_err(decode)?,
        },
    })
}

#[async_trait]
impl RequestSheet for SqlRequestSheet {
    async fn append_rows(&self, rows: Vec<RequestRow>) -> Result<Vec<RequestId>, SheetError> {
        let mut tx = self.pool.begin().await.map_err(database)?;
        let mut ids = Vec::with_capacity(rows.len());

        for row in &rows {
            let inserted = sqlx::query(
                "INSERT INTO illustration_request (submitted_at, agent_id, agent_name, client_name,
                     client_dob, client_gender, smoking, product, amount, term_payment, notes, status)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(row.submitted_at.to_rfc3339())
            .bind(row.agent_id.as_i64())
            .bind(&row.agent_name)
            .bind(&row.client_name)
            .bind(&row.client_dob)
            .bind(&row.client_gender)
            .bind(&row.smoking)
            .bind(&row.product)
            .bind(&row.amount)
            .bind(&row.term_payment)
            .bind(&row.notes)
            .bind(row.status.as_str())
            .execute(&mut *tx)
            .await
            .map_err(database)?;

            ids.push(RequestId(u32::try_from(inserted.last_insert_rowid()).map_err(decode)?));
        }

        tx.commit().await.map_err(database)?;
        debug!(
            event_name = "sheet.rows.appended",
            count = ids.len(),
            "request rows appended"
        );
        Ok(ids)
    }

    async fn update_status(&self, id: RequestId, status: RequestStatus) -> Result<(), SheetError> {
        let result = sqlx::query("UPDATE illustration_request SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(i64::from(id.0))
            .execute(&self.pool)
            .await
            .map_err(database)?;

        if result.rows_affected() == 0 {
            return Err(SheetError::Unavailable(format!("request {id} does not exist")));
        }
        Ok(())
    }

    async fn get_row(&self, id: RequestId) -> Result<Option<StoredRequest>, SheetError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(i64::from(id.0))
            .fetch_optional(&self.pool)
            .await
            .map_err(database)?;

        row.as_ref().map(row_to_request).transpose()
    }

    async fn list_rows(
        &self,
        status: Option<RequestStatus>,
        limit: usize,
    ) -> Result<Vec<StoredRequest>, SheetError> {
        let status = status.map(RequestStatus::as_str);
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS}
             WHERE (?1 IS NULL OR status = ?1 COLLATE NOCASE)
             ORDER BY id ASC
             LIMIT ?2"
        ))
        .bind(status)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(database)?;

        rows.iter().map(row_to_request).collect()
    }

    async fn list_rows_by_agent(&self, agent: UserId) -> Result<Vec<StoredRequest>, SheetError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} WHERE agent_id = ? ORDER BY id ASC"))
            .bind(agent.as_i64())
            .fetch_all(&self.pool)
            .await
            .map_err(database)?;

        rows.iter().map(row_to_request).collect()
    }
}
