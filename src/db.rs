use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::GradeError;
use crate::models::{GradeRecord, ScoreEntry, ScoreType};
use crate::store::GradeStore;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<usize> {
    use ScoreType::{Exam, Homework, Quiz};

    let records: Vec<(i32, i32, Vec<(ScoreType, f64)>)> = vec![
        (
            101,
            1,
            vec![(Exam, 80.0), (Quiz, 90.0), (Homework, 100.0), (Homework, 94.0)],
        ),
        (101, 2, vec![(Exam, 60.0), (Quiz, 70.0), (Homework, 50.0)]),
        (
            102,
            1,
            vec![(Exam, 42.0), (Quiz, 55.5), (Quiz, 61.0), (Homework, 38.0)],
        ),
        (102, 3, vec![(Exam, 71.0), (Homework, 88.0)]),
        (
            103,
            2,
            vec![(Exam, 93.0), (Exam, 87.5), (Quiz, 79.0), (Homework, 91.0)],
        ),
        (104, 3, vec![(Quiz, 35.0), (Homework, 47.0)]),
    ];

    let mut upserted = 0usize;
    for (learner_id, class_id, scores) in records {
        let scores: Vec<ScoreEntry> = scores
            .into_iter()
            .map(|(score_type, score)| ScoreEntry { score_type, score })
            .collect();

        sqlx::query(
            r#"
            INSERT INTO learner_grades.grades (id, learner_id, class_id, scores)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (learner_id, class_id) DO UPDATE
            SET scores = EXCLUDED.scores, updated_at = now()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(learner_id)
        .bind(class_id)
        .bind(Json(&scores))
        .execute(pool)
        .await?;
        upserted += 1;
    }

    tracing::debug!(records = upserted, "seeded grade records");
    Ok(upserted)
}

#[derive(Debug, serde::Deserialize)]
pub struct CsvRow {
    pub learner_id: i32,
    pub class_id: i32,
    pub score_type: ScoreType,
    pub score: f64,
}

/// Reads grade rows from a CSV file and folds them into one score list per
/// (learner, class) pair, keeping file order within each pair. Scores must
/// lie in `0..=100`; the first row outside that range aborts the read.
pub fn read_csv(csv_path: &Path) -> anyhow::Result<BTreeMap<(i32, i32), Vec<ScoreEntry>>> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut grouped: BTreeMap<(i32, i32), Vec<ScoreEntry>> = BTreeMap::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("invalid grade row on line {line}"))?;
        if !row.score.is_finite() || !(0.0..=100.0).contains(&row.score) {
            anyhow::bail!(
                "score on line {line} must be between 0 and 100, got {}",
                row.score
            );
        }

        grouped
            .entry((row.learner_id, row.class_id))
            .or_default()
            .push(ScoreEntry {
                score_type: row.score_type,
                score: row.score,
            });
    }

    Ok(grouped)
}

/// Appends the scores in `csv_path` to the matching grade records, creating
/// records that do not exist yet. Returns the number of score entries loaded.
pub async fn import_csv(pool: &PgPool, csv_path: &Path) -> anyhow::Result<usize> {
    let grouped = read_csv(csv_path)?;
    let mut inserted = 0usize;

    let mut tx = pool.begin().await?;
    for ((learner_id, class_id), scores) in grouped {
        sqlx::query(
            r#"
            INSERT INTO learner_grades.grades (id, learner_id, class_id, scores)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (learner_id, class_id) DO UPDATE
            SET scores = learner_grades.grades.scores || EXCLUDED.scores, updated_at = now()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(learner_id)
        .bind(class_id)
        .bind(Json(&scores))
        .execute(&mut *tx)
        .await?;

        inserted += scores.len();
    }
    tx.commit().await?;

    Ok(inserted)
}

fn record_from_row(row: PgRow) -> Result<GradeRecord, sqlx::Error> {
    let scores: Json<Vec<ScoreEntry>> = row.try_get("scores")?;
    Ok(GradeRecord {
        learner_id: row.try_get("learner_id")?,
        class_id: row.try_get("class_id")?,
        scores: scores.0,
    })
}

/// Grade records backed by the `learner_grades.grades` table.
#[derive(Debug, Clone)]
pub struct PgGradeStore {
    pool: PgPool,
}

impl PgGradeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, filter: &str, id: Option<i32>) -> Result<Vec<GradeRecord>, GradeError> {
        let query = format!(
            "SELECT learner_id, class_id, scores FROM learner_grades.grades{filter} \
             ORDER BY learner_id, class_id"
        );

        let mut rows = sqlx::query(&query);
        if let Some(value) = id {
            rows = rows.bind(value);
        }

        let records = rows
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(filter, count = records.len(), "fetched grade records");
        Ok(records)
    }
}

#[async_trait]
impl GradeStore for PgGradeStore {
    async fn records_for_learner(&self, learner_id: i32) -> Result<Vec<GradeRecord>, GradeError> {
        self.fetch(" WHERE learner_id = $1", Some(learner_id)).await
    }

    async fn records_for_class(&self, class_id: i32) -> Result<Vec<GradeRecord>, GradeError> {
        self.fetch(" WHERE class_id = $1", Some(class_id)).await
    }

    async fn all_records(&self) -> Result<Vec<GradeRecord>, GradeError> {
        self.fetch("", None).await
    }
}
