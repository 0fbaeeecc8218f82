//! Tracked channels and the per-channel set of already-queued videos.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::SqliteStore;
use crate::model::unix_timestamp;
use crate::store::{Channel, ChannelStore};

fn channel_from_row(row: &SqliteRow) -> Channel {
    Channel {
        id: row.get("id"),
        channel_id: row.get("channel_id"),
        title: row.get("title"),
        config_name: row.get("config_name"),
        added_at: row.get("added_at"),
    }
}

#[async_trait]
impl ChannelStore for SqliteStore {
    async fn add_channel(
        &self,
        channel_id: &str,
        title: Option<&str>,
        config_name: Option<&str>,
    ) -> Result<Channel> {
        sqlx::query(
            r#"
            INSERT INTO channels (channel_id, title, config_name, added_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(channel_id) DO UPDATE SET
                title = COALESCE(excluded.title, channels.title),
                config_name = COALESCE(excluded.config_name, channels.config_name)
            "#,
        )
        .bind(channel_id)
        .bind(title)
        .bind(config_name)
        .bind(unix_timestamp())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            "SELECT id, channel_id, title, config_name, added_at FROM channels WHERE channel_id = ?1",
        )
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?
        .with_context(|| format!("channel {channel_id} missing after insert"))?;
        Ok(channel_from_row(&row))
    }

    async fn remove_channel(&self, channel_id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let r = sqlx::query("DELETE FROM channels WHERE channel_id = ?1")
            .bind(channel_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM seen_videos WHERE channel_id = ?1")
            .bind(channel_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(r.rows_affected() > 0)
    }

    async fn list_channels(&self) -> Result<Vec<Channel>> {
        let rows = sqlx::query(
            "SELECT id, channel_id, title, config_name, added_at FROM channels ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(channel_from_row).collect())
    }

    async fn is_seen(&self, channel_id: &str, video_id: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 AS seen FROM seen_videos WHERE channel_id = ?1 AND video_id = ?2",
        )
        .bind(channel_id)
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn mark_seen(&self, channel_id: &str, video_ids: &[String]) -> Result<()> {
        let now = unix_timestamp();
        let mut tx = self.pool.begin().await?;
        for video_id in video_ids {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO seen_videos (channel_id, video_id, seen_at)
                VALUES (?1, ?2, ?3)
                "#,
            )
            .bind(channel_id)
            .bind(video_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
