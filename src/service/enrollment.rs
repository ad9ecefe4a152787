use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use super::{ServiceError, ServiceResult, is_foreign_key_violation, is_unique_violation};
use crate::db::{CourseExt, EnrollmentExt};
use crate::models::Enrollment;

/// Access rule for a single enrollment row
///
/// No row denies access, a row without expiry grants it for life, and a row
/// with an expiry grants it only strictly before that instant.
pub fn enrollment_grants_access(enrollment: Option<&Enrollment>, now: DateTime<Utc>) -> bool {
    match enrollment {
        None => false,
        Some(enrollment) => match enrollment.expires_at {
            None => true,
            Some(expires_at) => expires_at > now,
        },
    }
}

pub async fn has_access<S: EnrollmentExt>(
    store: &S,
    user_id: Uuid,
    course_id: Uuid,
    now: DateTime<Utc>,
) -> ServiceResult<bool> {
    let enrollment = store.get_enrollment(user_id, course_id).await?;
    Ok(enrollment_grants_access(enrollment.as_ref(), now))
}

/// Like `has_access`, but a denial becomes `AccessDenied`
pub async fn ensure_access<S: EnrollmentExt>(
    store: &S,
    user_id: Uuid,
    course_id: Uuid,
    now: DateTime<Utc>,
) -> ServiceResult<()> {
    if has_access(store, user_id, course_id, now).await? {
        Ok(())
    } else {
        Err(ServiceError::AccessDenied(
            "No access to this course".to_string(),
        ))
    }
}

/// Expiry `days` after `now`, rejecting non-positive or overflowing durations
fn expiry_after(now: DateTime<Utc>, days: i64) -> ServiceResult<DateTime<Utc>> {
    if days <= 0 {
        return Err(ServiceError::Validation(
            "duration_days must be positive".to_string(),
        ));
    }
    TimeDelta::try_days(days)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| ServiceError::Validation("duration_days is too large".to_string()))
}

/// Create or extend an enrollment
///
/// - no enrollment: create one, permanent unless `duration_days` is given
/// - existing and `duration_days` given: expiry becomes `now + duration_days`
///   (measured from now, never added to the remaining time)
/// - existing and no duration: returned unchanged
pub async fn grant_access<S: EnrollmentExt>(
    store: &S,
    user_id: Uuid,
    course_id: Uuid,
    duration_days: Option<i64>,
    now: DateTime<Utc>,
) -> ServiceResult<Enrollment> {
    let expires_at = duration_days.map(|days| expiry_after(now, days)).transpose()?;
    let existing = match store.get_enrollment(user_id, course_id).await? {
        Some(enrollment) => enrollment,
        None => match store
            .try_create_enrollment(user_id, course_id, expires_at)
            .await?
        {
            Some(created) => {
                tracing::info!(%user_id, %course_id, ?expires_at, "Course access granted");
                return Ok(created);
            }
            // a concurrent grant inserted the row first
            None => store
                .get_enrollment(user_id, course_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Enrollment not found".to_string()))?,
        },
    };

    match expires_at {
        None => Ok(existing),
        Some(expires_at) => store
            .set_enrollment_expiry(user_id, course_id, Some(expires_at))
            .await?
            .ok_or_else(|| ServiceError::NotFound("Enrollment not found".to_string())),
    }
}

/// Admin grant for a course that must exist
///
/// A user removed between the caller's check and the insert surfaces as a
/// foreign key violation and is reported as not found.
pub async fn grant_course_access<S: EnrollmentExt + CourseExt>(
    store: &S,
    user_id: Uuid,
    course_id: Uuid,
    duration_days: Option<i64>,
    now: DateTime<Utc>,
) -> ServiceResult<Enrollment> {
    if store.get_course(course_id).await?.is_none() {
        return Err(ServiceError::NotFound("Course not found".to_string()));
    }

    grant_access(store, user_id, course_id, duration_days, now)
        .await
        .map_err(|e| match e {
            ServiceError::Database(db) if is_foreign_key_violation(&db) => {
                ServiceError::NotFound("User or course not found".to_string())
            }
            e => e,
        })
}

/// Admin enrollment: the course must exist and the pair must not be enrolled yet
pub async fn enroll<S: EnrollmentExt + CourseExt>(
    store: &S,
    user_id: Uuid,
    course_id: Uuid,
    expires_at: Option<DateTime<Utc>>,
) -> ServiceResult<Enrollment> {
    if store.get_course(course_id).await?.is_none() {
        return Err(ServiceError::NotFound("Course not found".to_string()));
    }

    if store.get_enrollment(user_id, course_id).await?.is_some() {
        return Err(ServiceError::AlreadyExists(
            "User is already enrolled in this course".to_string(),
        ));
    }

    store
        .create_enrollment(user_id, course_id, expires_at)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::AlreadyExists("User is already enrolled in this course".to_string())
            } else {
                ServiceError::Database(e)
            }
        })
}

pub async fn update_expiry<S: EnrollmentExt>(
    store: &S,
    user_id: Uuid,
    course_id: Uuid,
    expires_at: Option<DateTime<Utc>>,
) -> ServiceResult<Enrollment> {
    store
        .set_enrollment_expiry(user_id, course_id, expires_at)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Enrollment not found".to_string()))
}

pub async fn revoke<S: EnrollmentExt>(
    store: &S,
    user_id: Uuid,
    course_id: Uuid,
) -> ServiceResult<()> {
    if store.delete_enrollment(user_id, course_id).await? {
        Ok(())
    } else {
        Err(ServiceError::NotFound("Enrollment not found".to_string()))
    }
}

/// Enrollments expiring between now and `days` from now
pub async fn expiring<S: EnrollmentExt>(
    store: &S,
    days: i64,
    now: DateTime<Utc>,
) -> ServiceResult<Vec<Enrollment>> {
    let until = expiry_after(now, days)?;
    Ok(store.get_expiring_enrollments(now, until).await?)
}
