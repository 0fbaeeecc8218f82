//! Job and task rows.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::path::PathBuf;

use super::SqliteStore;
use crate::model::{DownloadJob, DownloadTask, JobId, JobStatus, TaskId, TaskStatus};
use crate::store::{JobStore, JobSummary};

fn parse_id(raw: &str) -> Result<uuid::Uuid> {
    uuid::Uuid::parse_str(raw).with_context(|| format!("bad id in database: {raw}"))
}

fn task_from_row(row: &SqliteRow) -> Result<DownloadTask> {
    let id: String = row.get("id");
    let job_id: String = row.get("job_id");
    let status: String = row.get("status");
    let file_path: Option<String> = row.get("file_path");
    let file_size: Option<i64> = row.get("file_size");
    let warnings_json: String = row.get("warnings_json");
    Ok(DownloadTask {
        id: parse_id(&id)?,
        job_id: parse_id(&job_id)?,
        video_id: row.get("video_id"),
        status: TaskStatus::from_str(&status),
        file_path: file_path.map(PathBuf::from),
        file_size: file_size.map(|n| n.max(0) as u64),
        error_message: row.get("error_message"),
        warnings: serde_json::from_str(&warnings_json).unwrap_or_default(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

impl SqliteStore {
    async fn load_job(&self, row: &SqliteRow) -> Result<DownloadJob> {
        let id: String = row.get("id");
        let status: String = row.get("status");
        let task_rows = sqlx::query(
            r#"
            SELECT id, job_id, video_id, status, file_path, file_size,
                   error_message, warnings_json, created_at, updated_at
            FROM tasks
            WHERE job_id = ?1
            ORDER BY position ASC
            "#,
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await?;
        let tasks = task_rows
            .iter()
            .map(task_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(DownloadJob::restore(
            parse_id(&id)?,
            row.get("config_name"),
            JobStatus::from_str(&status),
            tasks,
            row.get("created_at"),
            row.get("updated_at"),
        ))
    }
}

#[async_trait]
impl JobStore for SqliteStore {
    async fn save_job(&self, job: &DownloadJob) -> Result<()> {
        let job_id = job.id.to_string();
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO jobs (id, config_name, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                config_name = excluded.config_name,
                status = excluded.status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&job_id)
        .bind(&job.config_name)
        .bind(job.status().as_str())
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM tasks WHERE job_id = ?1")
            .bind(&job_id)
            .execute(&mut *tx)
            .await?;

        for (position, task) in job.tasks().iter().enumerate() {
            let warnings_json = serde_json::to_string(&task.warnings)?;
            sqlx::query(
                r#"
                INSERT INTO tasks (
                    id, job_id, position, video_id, status, file_path, file_size,
                    error_message, warnings_json, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(task.id.to_string())
            .bind(&job_id)
            .bind(position as i64)
            .bind(&task.video_id)
            .bind(task.status.as_str())
            .bind(task.file_path.as_ref().map(|p| p.to_string_lossy().to_string()))
            .bind(task.file_size.map(|n| n as i64))
            .bind(task.error_message.as_deref())
            .bind(warnings_json)
            .bind(task.created_at)
            .bind(task.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_job(&self, id: JobId) -> Result<Option<DownloadJob>> {
        let row = sqlx::query(
            r#"
            SELECT id, config_name, status, created_at, updated_at
            FROM jobs
            WHERE id = ?1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.load_job(&row).await?)),
            None => Ok(None),
        }
    }

    async fn find_unfinished_jobs(&self) -> Result<Vec<DownloadJob>> {
        let rows = sqlx::query(
            r#"
            SELECT id, config_name, status, created_at, updated_at
            FROM jobs
            WHERE status IN ('PENDING', 'RUNNING')
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(self.load_job(row).await?);
        }
        Ok(out)
    }

    async fn delete_job(&self, id: JobId) -> Result<bool> {
        let r = sqlx::query("DELETE FROM jobs WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected() > 0)
    }

    async fn delete_task(&self, id: TaskId) -> Result<bool> {
        let r = sqlx::query("DELETE FROM tasks WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected() > 0)
    }

    async fn find_job_id_for_task(&self, task_id: TaskId) -> Result<Option<JobId>> {
        let row = sqlx::query("SELECT job_id FROM tasks WHERE id = ?1")
            .bind(task_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let job_id: String = row.get("job_id");
                Ok(Some(parse_id(&job_id)?))
            }
            None => Ok(None),
        }
    }

    async fn list_jobs(&self) -> Result<Vec<JobSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT j.id, j.config_name, j.status, j.created_at, j.updated_at,
                   COUNT(t.id) AS task_count,
                   COALESCE(SUM(CASE WHEN t.status = 'SUCCEEDED' THEN 1 ELSE 0 END), 0) AS succeeded,
                   COALESCE(SUM(CASE WHEN t.status = 'FAILED' THEN 1 ELSE 0 END), 0) AS failed
            FROM jobs j
            LEFT JOIN tasks t ON t.job_id = j.id
            GROUP BY j.id
            ORDER BY j.created_at DESC, j.rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let status: String = row.get("status");
            let task_count: i64 = row.get("task_count");
            let succeeded: i64 = row.get("succeeded");
            let failed: i64 = row.get("failed");
            out.push(JobSummary {
                id: parse_id(&id)?,
                config_name: row.get("config_name"),
                status: JobStatus::from_str(&status),
                task_count: task_count as usize,
                succeeded: succeeded as usize,
                failed: failed as usize,
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            });
        }
        Ok(out)
    }

    async fn clean_tables(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for table in ["tasks", "jobs", "seen_videos", "channels"] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn reset_sequence(&self) -> Result<()> {
        sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'channels'")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
