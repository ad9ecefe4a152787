use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::enrollment::ensure_access;
use super::progress::progress_percentage;
use super::{ServiceError, ServiceResult, is_unique_violation};
use crate::db::{EnrollmentExt, LessonExt, ProgressExt, VideoExt};
use crate::dtos::{CreateVideoDto, SignedUrlDto, VideoStatsDto};
use crate::models::{UserRole, VideoLesson};

/// Attach a video to a lesson; a lesson holds at most one
pub async fn create_video<S: LessonExt + VideoExt>(
    store: &S,
    video: &CreateVideoDto,
) -> ServiceResult<VideoLesson> {
    if store.get_lesson(video.lesson_id).await?.is_none() {
        return Err(ServiceError::NotFound("Lesson not found".to_string()));
    }
    if store.get_video(video.lesson_id).await?.is_some() {
        return Err(ServiceError::AlreadyExists(
            "Video for this lesson already exists".to_string(),
        ));
    }

    store.create_video(video).await.map_err(|e| {
        if is_unique_violation(&e) {
            ServiceError::AlreadyExists("Video for this lesson already exists".to_string())
        } else {
            ServiceError::Database(e)
        }
    })
}

/// Time-limited playback URL, handed out only to users with course access
pub async fn signed_url<S: VideoExt + LessonExt + EnrollmentExt>(
    store: &S,
    user_id: Uuid,
    role: UserRole,
    lesson_id: Uuid,
    expires_in: u64,
    now: DateTime<Utc>,
) -> ServiceResult<SignedUrlDto> {
    let video = store
        .get_video(lesson_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Video not found".to_string()))?;

    if role != UserRole::Admin {
        let lesson = store
            .get_lesson(lesson_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Lesson not found".to_string()))?;
        ensure_access(store, user_id, lesson.course_id, now).await?;
    }

    Ok(SignedUrlDto {
        url: video.video_url,
        expires_in,
    })
}

pub async fn video_stats<S: VideoExt + ProgressExt>(
    store: &S,
    lesson_id: Uuid,
) -> ServiceResult<VideoStatsDto> {
    if store.get_video(lesson_id).await?.is_none() {
        return Err(ServiceError::NotFound("Video not found".to_string()));
    }

    let view_count = store.count_lesson_progress(lesson_id, false).await?;
    let completed_count = store.count_lesson_progress(lesson_id, true).await?;

    Ok(VideoStatsDto {
        lesson_id,
        view_count,
        completed_count,
        completion_rate: progress_percentage(completed_count, view_count),
    })
}
