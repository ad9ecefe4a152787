use super::DBClient;
use crate::dtos::{CreateVideoDto, UpdateVideoDto};
use crate::models::VideoLesson;
use uuid::Uuid;

const VIDEO_COLUMNS: &str = "id, lesson_id, video_url, duration, thumbnail_url, created_at";

/// Video lesson database operations trait
pub trait VideoExt {
    async fn get_video(&self, lesson_id: Uuid) -> Result<Option<VideoLesson>, sqlx::Error>;

    /// Every uploaded video, newest first
    async fn get_videos(&self) -> Result<Vec<VideoLesson>, sqlx::Error>;

    async fn create_video(&self, video: &CreateVideoDto) -> Result<VideoLesson, sqlx::Error>;

    async fn update_video(
        &self,
        lesson_id: Uuid,
        video: &UpdateVideoDto,
    ) -> Result<Option<VideoLesson>, sqlx::Error>;

    async fn delete_video(&self, lesson_id: Uuid) -> Result<bool, sqlx::Error>;
}

impl VideoExt for DBClient {
    async fn get_video(&self, lesson_id: Uuid) -> Result<Option<VideoLesson>, sqlx::Error> {
        sqlx::query_as::<_, VideoLesson>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM video_lessons WHERE lesson_id = $1"
        ))
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_videos(&self) -> Result<Vec<VideoLesson>, sqlx::Error> {
        sqlx::query_as::<_, VideoLesson>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM video_lessons ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn create_video(&self, video: &CreateVideoDto) -> Result<VideoLesson, sqlx::Error> {
        sqlx::query_as::<_, VideoLesson>(&format!(
            r#"
            INSERT INTO video_lessons (lesson_id, video_url, duration, thumbnail_url)
            VALUES ($1, $2, $3, $4)
            RETURNING {VIDEO_COLUMNS}
            "#
        ))
        .bind(video.lesson_id)
        .bind(&video.video_url)
        .bind(video.duration)
        .bind(video.thumbnail_url.as_deref())
        .fetch_one(&self.pool)
        .await
    }

    async fn update_video(
        &self,
        lesson_id: Uuid,
        video: &UpdateVideoDto,
    ) -> Result<Option<VideoLesson>, sqlx::Error> {
        sqlx::query_as::<_, VideoLesson>(&format!(
            r#"
            UPDATE video_lessons
            SET video_url = COALESCE($1, video_url),
                duration = COALESCE($2, duration),
                thumbnail_url = COALESCE($3, thumbnail_url)
            WHERE lesson_id = $4
            RETURNING {VIDEO_COLUMNS}
            "#
        ))
        .bind(video.video_url.as_deref())
        .bind(video.duration)
        .bind(video.thumbnail_url.as_deref())
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_video(&self, lesson_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM video_lessons WHERE lesson_id = $1")
            .bind(lesson_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
