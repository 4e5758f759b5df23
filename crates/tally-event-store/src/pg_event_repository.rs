//! `PostgreSQL` implementation of the `EventRepository` trait.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::debug;
use uuid::Uuid;

use tally_core::error::DomainError;
use tally_core::event::{Event, EventSource, ProcessingState};
use tally_core::repository::{EventFilter, EventRepository, PageRequest};

use crate::infrastructure;

const EVENT_COLUMNS: &str = "event_id, category, topic, event_type, payload, occurred_at, \
     processed, correlation_id, message_id, source, created_at";

/// PostgreSQL-backed event repository.
#[derive(Debug, Clone)]
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    /// Creates a new `PgEventRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn event_from_row(row: &PgRow) -> Result<Event, sqlx::Error> {
    let source: String = row.try_get("source")?;
    let source = source
        .parse::<EventSource>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    let processed: bool = row.try_get("processed")?;

    Ok(Event {
        id: row.try_get("event_id")?,
        category: row.try_get("category")?,
        topic: row.try_get("topic")?,
        event_type: row.try_get("event_type")?,
        payload: row.try_get("payload")?,
        occurred_at: row.try_get("occurred_at")?,
        state: ProcessingState::from(processed),
        correlation_id: row.try_get("correlation_id")?,
        message_id: row.try_get("message_id")?,
        source,
        created_at: row.try_get("created_at")?,
    })
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &EventFilter) {
    builder.push(" WHERE TRUE");
    let text_filters = [
        ("category", &filter.category),
        ("topic", &filter.topic),
        ("event_type", &filter.event_type),
        ("source", &filter.source),
        ("message_id", &filter.message_id),
        ("correlation_id", &filter.correlation_id),
    ];
    for (column, value) in text_filters {
        if let Some(value) = value {
            builder
                .push(format_args!(" AND {column} = "))
                .push_bind(value.clone());
        }
    }
    if let Some(processed) = filter.processed {
        builder.push(" AND processed = ").push_bind(processed);
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn create_event(&self, event: &Event) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO events (event_id, category, topic, event_type, payload, occurred_at, \
             processed, correlation_id, message_id, source, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(event.id)
        .bind(&event.category)
        .bind(&event.topic)
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(event.occurred_at)
        .bind(event.is_processed())
        .bind(&event.correlation_id)
        .bind(&event.message_id)
        .bind(event.source.as_str())
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(infrastructure)?;

        debug!(event_id = %event.id, "event inserted");
        Ok(())
    }

    async fn mark_processed(&self, event_id: Uuid) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE events SET processed = TRUE WHERE event_id = $1 AND processed = FALSE",
        )
        .bind(event_id)
        .execute(&self.pool)
        .await
        .map_err(infrastructure)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM events WHERE event_id = $1)")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await
            .map_err(infrastructure)?;

        if exists {
            Err(DomainError::AlreadyProcessed(event_id))
        } else {
            Err(DomainError::NotFound(event_id))
        }
    }

    async fn get_event(&self, event_id: Uuid) -> Result<Option<Event>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE event_id = $1"
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?;

        row.as_ref()
            .map(event_from_row)
            .transpose()
            .map_err(infrastructure)
    }

    async fn list_events(
        &self,
        filter: &EventFilter,
        page: PageRequest,
    ) -> Result<(Vec<Event>, u64), DomainError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events");
        push_filters(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(infrastructure)?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {EVENT_COLUMNS} FROM events"));
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, event_id DESC LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));

        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;
        let events = rows
            .iter()
            .map(event_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(infrastructure)?;

        Ok((events, u64::try_from(total).unwrap_or(0)))
    }
}
