use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::RawMessage;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

type SeedRow = (&'static str, &'static str, DateTime<Utc>, &'static str);

/// Seed submissions dated relative to `now` so they fall inside the default
/// `--since-days` window.
fn seed_messages(now: DateTime<Utc>) -> Vec<SeedRow> {
    vec![
        (
            "seed-001",
            "New submission from foodie.dev",
            now - Duration::hours(2),
            "Someone just submitted your form on foodie.dev.\n\n\
             Utilidad percibida: 9\n\
             Apps que usas:\n\
             Rappi, Google Maps\n\
             Características atractivas: Menús actualizados, Precios claros\n\
             ¿Descargarías Foodie?: Sí, definitivamente\n\
             Frecuencia de uso estimada: Varias veces por semana\n\
             Sugerencias: Mostrar horarios de apertura\n",
        ),
        (
            "seed-002",
            "New submission from foodie.dev",
            now - Duration::days(3),
            "utilidadPerdida: 6\n\
             appsQueUsas: Uber Eats; Domicilios.com\n\
             descargarFoodie: Tal vez más adelante\n\
             frecuenciaUsoEstimada: Ocasionalmente\n\
             comentariosAdicionales: Me gustaría ver reseñas\n",
        ),
        (
            "seed-003",
            "New submission from foodie.dev",
            now - Duration::days(5),
            "Perceived utility: 4\n\
             Apps you use: Google Maps\n\
             Would you download Foodie? = No, thanks\n\
             Suggestions:\n\
             Add vegetarian filters\n",
        ),
        (
            "seed-004",
            "Weekly newsletter",
            now - Duration::days(6),
            "This week in web development\nRead more on our blog.\n",
        ),
    ]
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let mut inserted = 0usize;
    for (id, subject, received_at, body) in seed_messages(Utc::now()) {
        inserted += insert_message(pool, id, subject, received_at, body).await?;
    }

    Ok(inserted)
}

async fn insert_message(
    pool: &PgPool,
    id: &str,
    subject: &str,
    received_at: DateTime<Utc>,
    body: &str,
) -> anyhow::Result<usize> {
    let result = sqlx::query(
        r#"
        INSERT INTO survey_inbox.messages (id, subject, received_at, body)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(id)
    .bind(subject)
    .bind(received_at)
    .bind(body)
    .execute(pool)
    .await
    .with_context(|| format!("failed to store message {id}"))?;

    Ok(result.rows_affected() as usize)
}

/// Stores decoded messages, skipping ids already in the inbox.
pub async fn store_messages(pool: &PgPool, messages: &[RawMessage]) -> anyhow::Result<usize> {
    let mut inserted = 0usize;

    for message in messages {
        let id = if message.id.is_empty() {
            format!("import-{}", Uuid::new_v4())
        } else {
            message.id.clone()
        };
        inserted += insert_message(
            pool,
            &id,
            &message.subject,
            message.received_at,
            &message.body,
        )
        .await?;
    }

    info!(inserted, offered = messages.len(), "stored inbox messages");
    Ok(inserted)
}

/// Messages received since `since`, oldest first.
pub async fn fetch_messages(pool: &PgPool, since: DateTime<Utc>) -> anyhow::Result<Vec<RawMessage>> {
    let rows = sqlx::query(
        "SELECT id, subject, received_at, body \
         FROM survey_inbox.messages \
         WHERE received_at >= $1 \
         ORDER BY received_at ASC, id ASC",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;

    let mut messages = Vec::with_capacity(rows.len());
    for row in rows {
        messages.push(RawMessage {
            id: row.get("id"),
            subject: row.get("subject"),
            received_at: row.get("received_at"),
            body: row.get("body"),
        });
    }

    Ok(messages)
}
