use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::DatasetRepository;
use crate::models::{Dataset, EquipmentRecord, EquipmentType, SummaryStats};
use crate::types::{AppError, AppResult};

// Keeps each bulk insert well under the Postgres bind-parameter limit
const INSERT_CHUNK_ROWS: usize = 1000;

// Note: runtime query_as (no DATABASE_URL needed at compile time)

#[derive(Debug, sqlx::FromRow)]
struct DatasetRow {
    id: Uuid,
    name: String,
    file_name: String,
    uploaded_at: DateTime<Utc>,
    summary_stats: Json<SummaryStats>,
}

#[derive(Debug, sqlx::FromRow)]
struct EquipmentRow {
    dataset_id: Uuid,
    equipment_name: String,
    equipment_type: String,
    flowrate: f64,
    pressure: f64,
    temperature: f64,
}

impl TryFrom<EquipmentRow> for EquipmentRecord {
    type Error = AppError;

    fn try_from(row: EquipmentRow) -> Result<Self, Self::Error> {
        let equipment_type = row
            .equipment_type
            .parse::<EquipmentType>()
            .map_err(AppError::Persistence)?;

        Ok(EquipmentRecord {
            equipment_name: row.equipment_name,
            equipment_type,
            flowrate: row.flowrate,
            pressure: row.pressure,
            temperature: row.temperature,
        })
    }
}

/// Postgres-backed dataset repository
#[derive(Clone)]
pub struct PgDatasetRepository {
    pool: PgPool,
}

impl PgDatasetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatasetRepository for PgDatasetRepository {
    async fn load_recent(&self, limit: usize) -> AppResult<Vec<Dataset>> {
        let rows = sqlx::query_as::<_, DatasetRow>(
            r#"
            SELECT id, name, file_name, uploaded_at, summary_stats
            FROM datasets
            ORDER BY uploaded_at DESC, seq DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let equipment_rows = sqlx::query_as::<_, EquipmentRow>(
            r#"
            SELECT dataset_id, equipment_name, equipment_type, flowrate, pressure, temperature
            FROM equipments
            WHERE dataset_id = ANY($1)
            ORDER BY dataset_id, position ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut equipments: HashMap<Uuid, Vec<EquipmentRecord>> = HashMap::new();
        for row in equipment_rows {
            let dataset_id = row.dataset_id;
            equipments
                .entry(dataset_id)
                .or_default()
                .push(EquipmentRecord::try_from(row)?);
        }

        Ok(rows
            .into_iter()
            .map(|row| Dataset {
                equipments: equipments.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                file_name: row.file_name,
                uploaded_at: row.uploaded_at,
                summary_stats: row.summary_stats.0,
            })
            .collect())
    }

    async fn prune(&self, keep: usize) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM datasets
            WHERE id NOT IN (
                SELECT id FROM datasets
                ORDER BY uploaded_at DESC, seq DESC
                LIMIT $1
            )
            "#,
        )
        .bind(keep as i64)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn commit(&self, dataset: &Dataset, evicted: &[Uuid]) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO datasets (id, name, file_name, uploaded_at, summary_stats)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(dataset.id)
        .bind(&dataset.name)
        .bind(&dataset.file_name)
        .bind(dataset.uploaded_at)
        .bind(Json(&dataset.summary_stats))
        .execute(&mut *tx)
        .await?;

        for (chunk_index, chunk) in dataset.equipments.chunks(INSERT_CHUNK_ROWS).enumerate() {
            let offset = chunk_index * INSERT_CHUNK_ROWS;
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO equipments \
                 (dataset_id, position, equipment_name, equipment_type, flowrate, pressure, temperature) ",
            );
            builder.push_values(chunk.iter().enumerate(), |mut b, (i, record)| {
                b.push_bind(dataset.id)
                    .push_bind((offset + i) as i32)
                    .push_bind(record.equipment_name.clone())
                    .push_bind(record.equipment_type.as_str())
                    .push_bind(record.flowrate)
                    .push_bind(record.pressure)
                    .push_bind(record.temperature);
            });
            builder.build().execute(&mut *tx).await?;
        }

        if !evicted.is_empty() {
            sqlx::query("DELETE FROM datasets WHERE id = ANY($1)")
                .bind(evicted.to_vec())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            dataset_id = %dataset.id,
            equipments = dataset.equipments.len(),
            evicted = evicted.len(),
            "Dataset committed"
        );
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        super::health_check(&self.pool).await
    }
}
