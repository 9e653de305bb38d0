use anyhow::Context;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::canonical::canonicalize;
use crate::loader;
use crate::models::LeadRecord;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn insert_lead(pool: &PgPool, lead: &LeadRecord, source_key: &str) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO lead_insights.leads
        (id, lead_date, week_start, week_label, dealer, region, location, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(lead.lead_date)
    .bind(lead.week_start)
    .bind(&lead.week_label)
    .bind(&lead.dealer)
    .bind(&lead.region)
    .bind(&lead.location)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Loads a CSV through the same validation as `report --csv` and stores
/// the rows. Rows without a lead reference get a fresh source key, so
/// re-importing them duplicates.
pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let store = loader::load_store(csv_path)
        .with_context(|| format!("failed to load {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for lead in store.records() {
        let source_key = lead
            .source_ref
            .clone()
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_lead(pool, lead, &source_key).await? {
            inserted += 1;
        }
    }

    tracing::info!(inserted, skipped = store.len() - inserted, "csv import finished");
    Ok(inserted)
}

pub async fn fetch_leads(pool: &PgPool) -> anyhow::Result<Vec<LeadRecord>> {
    let rows = sqlx::query(
        "SELECT lead_date, week_start, week_label, dealer, region, location, source_key \
         FROM lead_insights.leads \
         ORDER BY lead_date, source_key",
    )
    .fetch_all(pool)
    .await?;

    let mut leads = Vec::with_capacity(rows.len());
    for (position, row) in rows.into_iter().enumerate() {
        let location: String = row.get("location");
        leads.push(LeadRecord {
            id: position,
            lead_date: row.get("lead_date"),
            week_start: row.get("week_start"),
            week_label: row.get("week_label"),
            dealer: row.get("dealer"),
            region: row.get("region"),
            location_canonical: canonicalize(&location),
            location,
            source_ref: Some(row.get("source_key")),
        });
    }

    Ok(leads)
}
