use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::enrollment::ensure_access;
use super::{ServiceError, ServiceResult};
use crate::db::{CourseExt, EnrollmentExt, LessonExt};
use crate::dtos::{CreateLessonDto, LessonOrderDto, UpdateLessonDto};
use crate::models::{Lesson, UserRole};

/// Strip scripts and unsafe attributes from author-supplied HTML
pub fn sanitize_content(content: &str) -> String {
    ammonia::clean(content)
}

pub async fn create_lesson<S: CourseExt + LessonExt>(
    store: &S,
    mut lesson: CreateLessonDto,
) -> ServiceResult<Lesson> {
    if store.get_course(lesson.course_id).await?.is_none() {
        return Err(ServiceError::NotFound("Course not found".to_string()));
    }
    lesson.content = lesson.content.as_deref().map(sanitize_content);
    Ok(store.create_lesson(&lesson).await?)
}

pub async fn update_lesson<S: LessonExt>(
    store: &S,
    lesson_id: Uuid,
    mut update: UpdateLessonDto,
) -> ServiceResult<Lesson> {
    update.content = update.content.as_deref().map(sanitize_content);
    store
        .update_lesson(lesson_id, &update)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Lesson not found".to_string()))
}

/// Full lesson, content included, for someone allowed to study it
///
/// Admins always get it. Everyone else needs the lesson to be published and a
/// live enrollment in its course.
pub async fn open_lesson<S: LessonExt + EnrollmentExt>(
    store: &S,
    user_id: Uuid,
    role: UserRole,
    lesson_id: Uuid,
    now: DateTime<Utc>,
) -> ServiceResult<Lesson> {
    let lesson = store
        .get_lesson(lesson_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Lesson not found".to_string()))?;

    if role == UserRole::Admin {
        return Ok(lesson);
    }
    if !lesson.is_published {
        return Err(ServiceError::NotFound("Lesson not found".to_string()));
    }

    ensure_access(store, user_id, lesson.course_id, now).await?;
    Ok(lesson)
}

/// Assign new positions to lessons of one course, all or nothing
pub async fn reorder_lessons<S: CourseExt + LessonExt>(
    store: &S,
    course_id: Uuid,
    orders: &[LessonOrderDto],
) -> ServiceResult<Vec<Lesson>> {
    let mut seen = HashSet::new();
    if let Some(dup) = orders.iter().find(|o| !seen.insert(o.id)) {
        return Err(ServiceError::Validation(format!(
            "Lesson {} is listed more than once",
            dup.id
        )));
    }

    if store.get_course(course_id).await?.is_none() {
        return Err(ServiceError::NotFound("Course not found".to_string()));
    }

    store
        .reorder_lessons(course_id, orders)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => ServiceError::NotFound(
                "One or more lessons do not belong to this course".to_string(),
            ),
            other => ServiceError::Database(other),
        })
}
