use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::{ParticipantRecord, PortfolioSummary};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    let participants = vec![
        ("NDIS-1001", 48_000.0, 95.0, 22.0),
        ("NDIS-1002", 12_500.0, 60.0, 8.0),
        ("NDIS-1003", 86_000.0, 210.0, 41.0),
        ("NDIS-1004", 9_800.0, 15.0, 4.5),
        ("NDIS-1005", 31_200.0, 120.0, 17.0),
    ];

    let records: Vec<ParticipantRecord> = participants
        .into_iter()
        .map(
            |(id, total_funding, daily_expenditure, service_hours)| ParticipantRecord {
                participant_id: id.to_string(),
                total_funding,
                daily_expenditure,
                service_hours,
            },
        )
        .collect();

    import_participants(pool, &records).await
}

/// Upserts validated records by `participant_id`. Returns rows written.
pub async fn import_participants(
    pool: &PgPool,
    records: &[ParticipantRecord],
) -> anyhow::Result<usize> {
    let mut tx = pool.begin().await?;
    let mut written = 0usize;

    for record in records {
        let result = sqlx::query(
            r#"
            INSERT INTO portfolio.participants
            (participant_id, total_funding, daily_expenditure, service_hours)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (participant_id) DO UPDATE
            SET total_funding = EXCLUDED.total_funding,
                daily_expenditure = EXCLUDED.daily_expenditure,
                service_hours = EXCLUDED.service_hours,
                updated_at = now()
            "#,
        )
        .bind(&record.participant_id)
        .bind(record.total_funding)
        .bind(record.daily_expenditure)
        .bind(record.service_hours)
        .execute(&mut *tx)
        .await?;

        written += result.rows_affected() as usize;
    }

    tx.commit().await?;
    info!(written, "participants imported");
    Ok(written)
}

pub async fn fetch_participants(pool: &PgPool) -> anyhow::Result<Vec<ParticipantRecord>> {
    let rows = sqlx::query(
        "SELECT participant_id, total_funding, daily_expenditure, service_hours \
         FROM portfolio.participants \
         ORDER BY participant_id",
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        records.push(ParticipantRecord {
            participant_id: row.get("participant_id"),
            total_funding: row.get("total_funding"),
            daily_expenditure: row.get("daily_expenditure"),
            service_hours: row.get("service_hours"),
        });
    }

    Ok(records)
}

pub async fn save_snapshot(pool: &PgPool, summary: &PortfolioSummary) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let recommendations = serde_json::to_value(&summary.recommendations)?;

    sqlx::query(
        r#"
        INSERT INTO portfolio.report_snapshots
        (id, generated_on, total_participants, total_funding,
         average_service_hours, high_risk_participants, recommendations)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(summary.date)
    .bind(i32::try_from(summary.total_participants)?)
    .bind(summary.total_funding)
    .bind(summary.average_service_hours)
    .bind(i32::try_from(summary.high_risk_participants)?)
    .bind(recommendations)
    .execute(pool)
    .await?;

    info!(%id, "report snapshot saved");
    Ok(id)
}
