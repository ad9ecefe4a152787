use crate::models::{
    Answer, Course, Lesson, LessonType, Payment, Question, QuestionType, SubmittedAnswer, Test,
    User, UserRole,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// DTOs (Data Transfer Objects) define the structure of data exchanged with clients
// They are separate from database models to control exactly what data is exposed

// ============================================================================
// Generic responses
// ============================================================================

/// Generic success response
#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}

/// Success envelope around any payload: `{"status": "success", "data": ...}`
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub status: &'static str,
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn success(data: T) -> Self {
        DataResponse {
            status: "success",
            data,
        }
    }
}

// ============================================================================
// Authentication DTOs
// ============================================================================

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterUserDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[validate(
        length(min = 1, message = "Confirm Password is required"),
        must_match(other = "password", message = "passwords do not match")
    )]
    pub password_confirm: String,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Login success response with JWT token
#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponseDto {
    pub status: String,
    pub access_token: String,
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponseDto {
    pub status: String,
    pub access_token: String,
}

// ============================================================================
// Users
// ============================================================================

/// Generic pagination query parameters
#[derive(Serialize, Deserialize, Validate, Debug)]
pub struct RequestQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<usize>,

    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

/// Filtered user data sent to clients (no password hash)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FilterUserDto {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            email: user.email.to_owned(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role.to_str().to_string(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }

    pub fn filter_users(user: &[User]) -> Vec<FilterUserDto> {
        user.iter().map(FilterUserDto::filter_user).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponseDto {
    pub status: String,
    pub users: Vec<FilterUserDto>,
    pub results: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoleUpdateDto {
    pub role: UserRole,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct ProfileUpdateDto {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserStatsDto {
    pub total_users: i64,
    pub admin_count: i64,
    pub user_count: i64,
    pub recent_users: Vec<FilterUserDto>,
}

// ============================================================================
// Courses
// ============================================================================

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateCourseDto {
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: f64,
    #[validate(range(min = 0.0))]
    pub price_installment: Option<f64>,
    pub is_published: Option<bool>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateCourseDto {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,
    #[validate(range(min = 0.0))]
    pub price_installment: Option<f64>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CoursesQuery {
    pub include_unpublished: Option<bool>,
}

/// Course with its (visible) lessons, without gated lesson content
#[derive(Debug, Serialize)]
pub struct CourseWithLessonsDto {
    #[serde(flatten)]
    pub course: Course,
    pub lessons: Vec<LessonSummaryDto>,
}

// ============================================================================
// Lessons
// ============================================================================

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateLessonDto {
    pub course_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub lesson_type: LessonType,
    pub order: i32,
    pub is_published: Option<bool>,
    pub content: Option<String>,
    #[validate(url)]
    pub video_url: Option<String>,
    #[validate(range(min = 0))]
    pub duration: Option<i32>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateLessonDto {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub lesson_type: Option<LessonType>,
    pub order: Option<i32>,
    pub is_published: Option<bool>,
    pub content: Option<String>,
    #[validate(url)]
    pub video_url: Option<String>,
    #[validate(range(min = 0))]
    pub duration: Option<i32>,
}

/// Lesson metadata visible to anyone who can see the course
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LessonSummaryDto {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub lesson_type: LessonType,
    pub order: i32,
    pub is_published: bool,
    pub duration: Option<i32>,
}

impl From<&Lesson> for LessonSummaryDto {
    fn from(lesson: &Lesson) -> Self {
        LessonSummaryDto {
            id: lesson.id,
            course_id: lesson.course_id,
            title: lesson.title.clone(),
            description: lesson.description.clone(),
            lesson_type: lesson.lesson_type,
            order: lesson.order,
            is_published: lesson.is_published,
            duration: lesson.duration,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LessonOrderDto {
    pub id: Uuid,
    pub order: i32,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct ReorderLessonsDto {
    #[validate(length(min = 1, message = "At least one lesson is required"))]
    pub lessons: Vec<LessonOrderDto>,
}

// ============================================================================
// Video lessons
// ============================================================================

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateVideoDto {
    pub lesson_id: Uuid,
    #[validate(url(message = "Video url is invalid"))]
    pub video_url: String,
    #[validate(range(min = 0))]
    pub duration: i32,
    #[validate(url)]
    pub thumbnail_url: Option<String>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateVideoDto {
    #[validate(url)]
    pub video_url: Option<String>,
    #[validate(range(min = 0))]
    pub duration: Option<i32>,
    #[validate(url)]
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SignedUrlDto {
    pub url: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct VideoStatsDto {
    pub lesson_id: Uuid,
    pub view_count: i64,
    pub completed_count: i64,
    pub completion_rate: i64,
}

// ============================================================================
// Enrollments
// ============================================================================

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateEnrollmentDto {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct EnrollmentsQuery {
    pub user_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEnrollmentDto {
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Validate, Debug, Deserialize)]
pub struct ExpiringQuery {
    #[validate(range(min = 1, max = 365))]
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AccessCheckDto {
    pub has_access: bool,
}

// ============================================================================
// Progress
// ============================================================================

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LessonProgressDetailDto {
    pub lesson_id: Uuid,
    pub title: String,
    pub order: i32,
    pub completed: bool,
    pub last_watched_at: Option<DateTime<Utc>>,
    pub test_passed: Option<bool>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CourseProgressDto {
    pub course_id: Uuid,
    pub total_lessons: i64,
    pub completed_lessons: i64,
    pub progress_percentage: i64,
    pub lessons: Vec<LessonProgressDetailDto>,
}

#[derive(Validate, Debug, Deserialize)]
pub struct WatchTimeDto {
    #[validate(range(min = 0))]
    pub watched_duration: i32,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct LearnerStatsDto {
    pub enrolled_courses: i64,
    pub completed_lessons: i64,
    pub test_attempts: i64,
    pub passed_tests: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CourseStatsDto {
    pub total_enrollments: i64,
    pub total_lessons: i64,
    pub completion_rate: i64,
}

#[derive(Validate, Debug, Deserialize)]
pub struct RecentActivityQuery {
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<i64>,
}

// ============================================================================
// Tests, questions, answers
// ============================================================================

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateTestDto {
    pub lesson_id: Uuid,
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub passing_score: i32,
    #[validate(range(min = 1))]
    pub time_limit: Option<i32>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateTestDto {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub passing_score: Option<i32>,
    #[validate(range(min = 1))]
    pub time_limit: Option<i32>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuestionDto {
    pub test_id: Uuid,
    #[validate(length(min = 1, message = "Question text is required"))]
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub order: Option<i32>,
    #[validate(range(min = 0, max = 10_000))]
    pub points: i32,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateQuestionDto {
    #[validate(length(min = 1))]
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,
    pub order: Option<i32>,
    #[validate(range(min = 0, max = 10_000))]
    pub points: Option<i32>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreateAnswerDto {
    pub question_id: Uuid,
    #[validate(length(min = 1, message = "Answer text is required"))]
    pub text: String,
    pub is_correct: bool,
    pub order: Option<i32>,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateAnswerDto {
    #[validate(length(min = 1))]
    pub text: Option<String>,
    pub is_correct: Option<bool>,
    pub order: Option<i32>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAttemptDto {
    pub test_id: Uuid,
    pub answers: Vec<SubmittedAnswer>,
}

/// Answer as shown to a client. `is_correct` is only present for admins.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AnswerViewDto {
    pub id: Uuid,
    pub text: String,
    pub order: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

impl AnswerViewDto {
    pub fn from_answer(answer: &Answer, reveal: bool) -> Self {
        AnswerViewDto {
            id: answer.id,
            text: answer.text.clone(),
            order: answer.order,
            is_correct: reveal.then_some(answer.is_correct),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct QuestionDetailDto {
    #[serde(flatten)]
    pub question: Question,
    pub answers: Vec<AnswerViewDto>,
}

#[derive(Debug, Serialize, Clone)]
pub struct TestDetailDto {
    #[serde(flatten)]
    pub test: Test,
    pub questions: Vec<QuestionDetailDto>,
}

impl TestDetailDto {
    /// Assemble a test with its questions in `order` and each question's answers.
    pub fn assemble(test: Test, questions: Vec<Question>, answers: &[Answer], reveal: bool) -> Self {
        let questions = questions
            .into_iter()
            .map(|question| {
                let mut own: Vec<&Answer> = answers
                    .iter()
                    .filter(|a| a.question_id == question.id)
                    .collect();
                own.sort_by_key(|a| a.order);
                QuestionDetailDto {
                    answers: own
                        .into_iter()
                        .map(|a| AnswerViewDto::from_answer(a, reveal))
                        .collect(),
                    question,
                }
            })
            .collect();
        TestDetailDto { test, questions }
    }
}

// ============================================================================
// Payments
// ============================================================================

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentDto {
    pub course_id: Uuid,
    #[validate(length(min = 1, max = 64, message = "payment_system is required"))]
    pub payment_system: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentCreatedDto {
    pub payment: Payment,
    pub payment_url: String,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePaymentStatusDto {
    pub status: crate::models::PaymentStatus,
    #[validate(length(min = 1, max = 255))]
    pub transaction_id: Option<String>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct GrantAccessDto {
    pub user_id: Uuid,
    pub course_id: Uuid,
    #[validate(range(min = 1, message = "duration_days must be positive"))]
    pub duration_days: Option<i64>,
}

/// Callback body sent by the payment provider
#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct WebhookDto {
    pub payment_id: Uuid,
    #[validate(length(min = 1, message = "status is required"))]
    pub status: String,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Serialize, Default, Clone, PartialEq)]
pub struct PaymentCountsDto {
    pub total_payments: i64,
    pub completed_payments: i64,
    pub pending_payments: i64,
    pub failed_payments: i64,
    pub total_revenue: f64,
}

#[derive(Debug, Serialize)]
pub struct PaymentStatsDto {
    #[serde(flatten)]
    pub counts: PaymentCountsDto,
    pub recent_payments: Vec<Payment>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payment_requests_use_snake_case_fields() {
        let (user_id, course_id, payment_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let grant: GrantAccessDto = serde_json::from_value(json!({
            "user_id": user_id,
            "course_id": course_id,
            "duration_days": 30
        }))
        .unwrap();
        assert_eq!(grant.duration_days, Some(30));

        let webhook: WebhookDto = serde_json::from_value(json!({
            "payment_id": payment_id,
            "status": "success",
            "transaction_id": "tx-1"
        }))
        .unwrap();
        assert_eq!(webhook.payment_id, payment_id);
        assert_eq!(webhook.transaction_id.as_deref(), Some("tx-1"));
    }

    #[test]
    fn submission_uses_snake_case_fields() {
        let (test_id, question_id, answer_id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let submit: SubmitAttemptDto = serde_json::from_value(json!({
            "test_id": test_id,
            "answers": [{ "question_id": question_id, "answer_ids": [answer_id] }]
        }))
        .unwrap();

        assert_eq!(submit.answers[0].question_id, question_id);
        assert_eq!(submit.answers[0].answer_ids, vec![answer_id]);
    }

    #[test]
    fn question_points_are_capped() {
        let question = CreateQuestionDto {
            test_id: Uuid::new_v4(),
            text: "Which trait enables `?`".to_string(),
            question_type: QuestionType::Single,
            order: None,
            points: 10_001,
        };
        assert!(question.validate().is_err());

        let update = UpdateQuestionDto {
            points: Some(10_000),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
    }
}
