use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::enrollment::ensure_access;
use super::{ServiceError, ServiceResult};
use crate::db::{AttemptExt, EnrollmentExt, LessonExt, ProgressExt, TestExt};
use crate::dtos::{CourseProgressDto, CourseStatsDto, LearnerStatsDto, LessonProgressDetailDto};
use crate::models::{Lesson, LessonProgress};

/// `completed / total` as a whole percentage, rounded half up; 0 for an empty course
pub fn progress_percentage(completed: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (completed as f64 / total as f64 * 100.0).round() as i64
}

/// Progress of a user through the published lessons of a course
///
/// Only requires an enrollment row: an expired learner can still look at what
/// they completed.
pub async fn get_user_progress<S>(
    store: &S,
    user_id: Uuid,
    course_id: Uuid,
) -> ServiceResult<CourseProgressDto>
where
    S: EnrollmentExt + LessonExt + ProgressExt + TestExt + AttemptExt,
{
    if store.get_enrollment(user_id, course_id).await?.is_none() {
        return Err(ServiceError::AccessDenied(
            "User is not enrolled in this course".to_string(),
        ));
    }

    let lessons = store.get_lessons_by_course(course_id, true).await?;
    let rows: HashMap<Uuid, LessonProgress> = store
        .get_course_progress(user_id, course_id)
        .await?
        .into_iter()
        .map(|row| (row.lesson_id, row))
        .collect();

    let mut details = Vec::with_capacity(lessons.len());
    for lesson in &lessons {
        // None when the lesson has no test or the user never attempted it
        let test_passed = match store.get_test_by_lesson(lesson.id).await? {
            Some(test) => store
                .get_latest_attempt(user_id, test.id)
                .await?
                .map(|attempt| attempt.passed),
            None => None,
        };
        details.push(lesson_detail(lesson, rows.get(&lesson.id), test_passed));
    }

    let total_lessons = lessons.len() as i64;
    let completed_lessons = details.iter().filter(|d| d.completed).count() as i64;

    Ok(CourseProgressDto {
        course_id,
        total_lessons,
        completed_lessons,
        progress_percentage: progress_percentage(completed_lessons, total_lessons),
        lessons: details,
    })
}

fn lesson_detail(
    lesson: &Lesson,
    row: Option<&LessonProgress>,
    test_passed: Option<bool>,
) -> LessonProgressDetailDto {
    LessonProgressDetailDto {
        lesson_id: lesson.id,
        title: lesson.title.clone(),
        order: lesson.order,
        completed: row.is_some_and(|r| r.completed),
        last_watched_at: row.map(|r| r.last_watched_at),
        test_passed,
    }
}

async fn accessible_lesson<S: LessonExt + EnrollmentExt>(
    store: &S,
    user_id: Uuid,
    lesson_id: Uuid,
    now: DateTime<Utc>,
) -> ServiceResult<Lesson> {
    let lesson = store
        .get_lesson(lesson_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Lesson not found".to_string()))?;
    ensure_access(store, user_id, lesson.course_id, now).await?;
    Ok(lesson)
}

/// Mark a lesson completed. Idempotent: completing twice keeps one row.
pub async fn mark_complete<S>(
    store: &S,
    user_id: Uuid,
    lesson_id: Uuid,
    now: DateTime<Utc>,
) -> ServiceResult<LessonProgress>
where
    S: LessonExt + EnrollmentExt + ProgressExt,
{
    accessible_lesson(store, user_id, lesson_id, now).await?;
    Ok(store.mark_lesson_complete(user_id, lesson_id, now).await?)
}

/// Record that the user watched a lesson. Never touches `completed`.
pub async fn update_watch_time<S>(
    store: &S,
    user_id: Uuid,
    lesson_id: Uuid,
    watched_duration: i32,
    now: DateTime<Utc>,
) -> ServiceResult<LessonProgress>
where
    S: LessonExt + EnrollmentExt + ProgressExt,
{
    accessible_lesson(store, user_id, lesson_id, now).await?;
    tracing::debug!(%user_id, %lesson_id, watched_duration, "Watch time reported");
    Ok(store.touch_lesson_progress(user_id, lesson_id, now).await?)
}

pub async fn learner_stats<S>(store: &S, user_id: Uuid) -> ServiceResult<LearnerStatsDto>
where
    S: EnrollmentExt + ProgressExt + AttemptExt,
{
    Ok(LearnerStatsDto {
        enrolled_courses: store.count_enrollments(Some(user_id), None).await?,
        completed_lessons: store.count_completed_lessons(user_id).await?,
        test_attempts: store.count_attempts(user_id, false).await?,
        passed_tests: store.count_attempts(user_id, true).await?,
    })
}

/// Course-wide completion: completed rows over enrollments times published lessons
pub async fn course_stats<S>(store: &S, course_id: Uuid) -> ServiceResult<CourseStatsDto>
where
    S: EnrollmentExt + LessonExt + ProgressExt,
{
    let total_enrollments = store.count_enrollments(None, Some(course_id)).await?;
    let total_lessons = store.get_lessons_by_course(course_id, true).await?.len() as i64;
    let completed = store.count_completed_course_progress(course_id).await?;

    Ok(CourseStatsDto {
        total_enrollments,
        total_lessons,
        completion_rate: progress_percentage(completed, total_enrollments * total_lessons),
    })
}
