use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

/// User role enumeration for role-based access control (RBAC)
///
/// Stored in PostgreSQL as the `user_role` ENUM. Variants are upper-cased both
/// in the database and on the wire (`"ADMIN"`, `"USER"`).
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin, // Manages courses, payments and access
    User,  // Learner
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::User => "USER",
        }
    }
}

/// User model representing the users table
///
/// `password` holds the argon2 PHC string, never the plain text.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Course for sale. `price_installment` is the optional per-installment price.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub price: f64,
    pub price_installment: Option<f64>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "lesson_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum LessonType {
    Video,
    Text,
    Quiz,
}

/// Lesson belonging to a course
///
/// `order` is unique per course by convention only; the database does not
/// enforce it. `content` and `video_url` are the gated part of a lesson and are
/// only handed out after an access check.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Lesson {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub lesson_type: LessonType,
    pub order: i32,
    pub is_published: bool,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub duration: Option<i32>, // seconds
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Hosted video attached to a lesson (at most one per lesson)
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct VideoLesson {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub video_url: String,
    pub duration: i32,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Enrollment granting a user access to a course
///
/// Composite key (user_id, course_id). `expires_at = None` means lifetime access.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Enrollment {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Per-user state of one lesson, keyed by (user_id, lesson_id)
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct LessonProgress {
    pub user_id: Uuid,
    pub lesson_id: Uuid,
    pub completed: bool,
    pub last_watched_at: DateTime<Utc>,
}

/// Test attached to exactly one lesson
///
/// `passing_score` is an absolute number of points, compared directly with the
/// attempt's raw score.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Test {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub passing_score: i32,
    pub time_limit: Option<i32>, // minutes
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "question_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum QuestionType {
    Single,
    Multiple,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Question {
    pub id: Uuid,
    pub test_id: Uuid,
    pub text: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub order: i32,
    pub points: i32,
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Answer {
    pub id: Uuid,
    pub question_id: Uuid,
    pub text: String,
    pub is_correct: bool,
    pub order: i32,
}

/// One submitted answer set, as stored verbatim in `test_attempts.answers`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SubmittedAnswer {
    pub question_id: Uuid,
    pub answer_ids: Vec<Uuid>,
}

/// Scored submission. Rows are append-only: a retake creates a new attempt.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct TestAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub test_id: Uuid,
    pub score: i32,
    pub max_score: i32,
    pub passed: bool,
    pub answers: Json<Vec<SubmittedAnswer>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn to_str(&self) -> &str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_system: String,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
