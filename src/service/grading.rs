use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::enrollment::has_access;
use super::{ServiceError, ServiceResult};
use crate::db::{AttemptExt, EnrollmentExt, LessonExt, ProgressExt, TestExt};
use crate::models::{Answer, Question, SubmittedAnswer, TestAttempt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grade {
    pub score: i32,
    pub max_score: i32,
    pub passed: bool,
}

/// Reject submissions that reference anything outside the test
///
/// Each entry must name a question of the test, at most once, and every answer
/// id must belong to that question.
pub fn validate_submission(
    questions: &[Question],
    answers: &[Answer],
    submission: &[SubmittedAnswer],
) -> ServiceResult<()> {
    let mut seen = HashSet::new();

    for entry in submission {
        if !questions.iter().any(|q| q.id == entry.question_id) {
            return Err(ServiceError::Validation(format!(
                "Question {} does not belong to this test",
                entry.question_id
            )));
        }
        if !seen.insert(entry.question_id) {
            return Err(ServiceError::Validation(format!(
                "Question {} is answered more than once",
                entry.question_id
            )));
        }
        for answer_id in &entry.answer_ids {
            let owned = answers
                .iter()
                .any(|a| a.id == *answer_id && a.question_id == entry.question_id);
            if !owned {
                return Err(ServiceError::Validation(format!(
                    "Answer {} does not belong to question {}",
                    answer_id, entry.question_id
                )));
            }
        }
    }

    Ok(())
}

/// Score a submission
///
/// A question earns its points only when the submitted answer ids equal the set
/// of correct answer ids (order and repeats ignored). Unanswered questions earn
/// nothing but still count towards `max_score`. A point total that does not fit
/// an `i32` is rejected.
pub fn grade(
    passing_score: i32,
    questions: &[Question],
    answers: &[Answer],
    submission: &[SubmittedAnswer],
) -> ServiceResult<Grade> {
    let too_large = || ServiceError::Validation("Test points total is too large".to_string());
    let mut score: i32 = 0;
    let mut max_score: i32 = 0;

    for question in questions {
        max_score = max_score.checked_add(question.points).ok_or_else(too_large)?;

        let Some(entry) = submission.iter().find(|s| s.question_id == question.id) else {
            continue;
        };

        let correct: BTreeSet<Uuid> = answers
            .iter()
            .filter(|a| a.question_id == question.id && a.is_correct)
            .map(|a| a.id)
            .collect();
        let chosen: BTreeSet<Uuid> = entry.answer_ids.iter().copied().collect();

        if chosen == correct {
            score = score.checked_add(question.points).ok_or_else(too_large)?;
        }
    }

    Ok(Grade {
        score,
        max_score,
        passed: score >= passing_score,
    })
}

/// Grade and store an attempt
///
/// A passing attempt also completes the test's lesson when the user still holds
/// access to its course.
pub async fn submit_attempt<S>(
    store: &S,
    user_id: Uuid,
    test_id: Uuid,
    submission: Vec<SubmittedAnswer>,
    now: DateTime<Utc>,
) -> ServiceResult<TestAttempt>
where
    S: TestExt + AttemptExt + LessonExt + EnrollmentExt + ProgressExt,
{
    let test = store
        .get_test(test_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Test not found".to_string()))?;

    let questions = store.get_questions(test_id).await?;
    let answers = store.get_answers(test_id).await?;

    validate_submission(&questions, &answers, &submission)?;
    let result = grade(test.passing_score, &questions, &answers, &submission)?;

    let attempt = store
        .save_attempt(
            user_id,
            test_id,
            result.score,
            result.max_score,
            result.passed,
            &submission,
        )
        .await?;

    tracing::info!(
        %user_id,
        %test_id,
        score = result.score,
        max_score = result.max_score,
        passed = result.passed,
        "Test attempt graded"
    );

    if result.passed {
        if let Some(lesson) = store.get_lesson(test.lesson_id).await? {
            if has_access(store, user_id, lesson.course_id, now).await? {
                store.mark_lesson_complete(user_id, lesson.id, now).await?;
            }
        }
    }

    Ok(attempt)
}
