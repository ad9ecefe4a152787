use super::DBClient;
use crate::dtos::{
    CreateAnswerDto, CreateQuestionDto, CreateTestDto, UpdateAnswerDto, UpdateQuestionDto,
    UpdateTestDto,
};
use crate::models::{Answer, Question, SubmittedAnswer, Test, TestAttempt};
use sqlx::types::Json;
use uuid::Uuid;

const TEST_COLUMNS: &str =
    "id, lesson_id, title, description, passing_score, time_limit, created_at, updated_at";
const QUESTION_COLUMNS: &str = r#"id, test_id, text, type, "order", points"#;
const ANSWER_COLUMNS: &str = r#"id, question_id, text, is_correct, "order""#;
const ATTEMPT_COLUMNS: &str =
    "id, user_id, test_id, score, max_score, passed, answers, created_at";

/// Test, question and answer database operations trait
pub trait TestExt {
    async fn get_test(&self, test_id: Uuid) -> Result<Option<Test>, sqlx::Error>;

    async fn get_test_by_lesson(&self, lesson_id: Uuid) -> Result<Option<Test>, sqlx::Error>;

    /// Questions of a test ordered by `order`
    async fn get_questions(&self, test_id: Uuid) -> Result<Vec<Question>, sqlx::Error>;

    /// Every answer of every question of a test
    async fn get_answers(&self, test_id: Uuid) -> Result<Vec<Answer>, sqlx::Error>;

    async fn create_test(&self, test: &CreateTestDto) -> Result<Test, sqlx::Error>;

    async fn update_test(
        &self,
        test_id: Uuid,
        test: &UpdateTestDto,
    ) -> Result<Option<Test>, sqlx::Error>;

    async fn delete_test(&self, test_id: Uuid) -> Result<bool, sqlx::Error>;

    async fn create_question(&self, question: &CreateQuestionDto)
    -> Result<Question, sqlx::Error>;

    async fn update_question(
        &self,
        question_id: Uuid,
        question: &UpdateQuestionDto,
    ) -> Result<Option<Question>, sqlx::Error>;

    async fn delete_question(&self, question_id: Uuid) -> Result<bool, sqlx::Error>;

    async fn create_answer(&self, answer: &CreateAnswerDto) -> Result<Answer, sqlx::Error>;

    async fn update_answer(
        &self,
        answer_id: Uuid,
        answer: &UpdateAnswerDto,
    ) -> Result<Option<Answer>, sqlx::Error>;

    async fn delete_answer(&self, answer_id: Uuid) -> Result<bool, sqlx::Error>;
}

/// Test attempt operations. Attempts are only ever inserted, never updated.
pub trait AttemptExt {
    async fn save_attempt(
        &self,
        user_id: Uuid,
        test_id: Uuid,
        score: i32,
        max_score: i32,
        passed: bool,
        answers: &[SubmittedAnswer],
    ) -> Result<TestAttempt, sqlx::Error>;

    /// Attempts for a test, most recent first; `user_id = None` lists everyone's
    async fn get_attempts(
        &self,
        user_id: Option<Uuid>,
        test_id: Uuid,
    ) -> Result<Vec<TestAttempt>, sqlx::Error>;

    async fn get_latest_attempt(
        &self,
        user_id: Uuid,
        test_id: Uuid,
    ) -> Result<Option<TestAttempt>, sqlx::Error>;

    async fn count_attempts(&self, user_id: Uuid, passed_only: bool) -> Result<i64, sqlx::Error>;
}

impl TestExt for DBClient {
    async fn get_test(&self, test_id: Uuid) -> Result<Option<Test>, sqlx::Error> {
        sqlx::query_as::<_, Test>(&format!("SELECT {TEST_COLUMNS} FROM tests WHERE id = $1"))
            .bind(test_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_test_by_lesson(&self, lesson_id: Uuid) -> Result<Option<Test>, sqlx::Error> {
        sqlx::query_as::<_, Test>(&format!(
            "SELECT {TEST_COLUMNS} FROM tests WHERE lesson_id = $1"
        ))
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_questions(&self, test_id: Uuid) -> Result<Vec<Question>, sqlx::Error> {
        sqlx::query_as::<_, Question>(&format!(
            r#"SELECT {QUESTION_COLUMNS} FROM questions WHERE test_id = $1 ORDER BY "order" ASC"#
        ))
        .bind(test_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_answers(&self, test_id: Uuid) -> Result<Vec<Answer>, sqlx::Error> {
        sqlx::query_as::<_, Answer>(
            r#"
            SELECT a.id, a.question_id, a.text, a.is_correct, a."order"
            FROM answers a
            INNER JOIN questions q ON q.id = a.question_id
            WHERE q.test_id = $1
            ORDER BY a."order" ASC
            "#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_test(&self, test: &CreateTestDto) -> Result<Test, sqlx::Error> {
        sqlx::query_as::<_, Test>(&format!(
            r#"
            INSERT INTO tests (lesson_id, title, description, passing_score, time_limit)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TEST_COLUMNS}
            "#
        ))
        .bind(test.lesson_id)
        .bind(&test.title)
        .bind(test.description.as_deref())
        .bind(test.passing_score)
        .bind(test.time_limit)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_test(
        &self,
        test_id: Uuid,
        test: &UpdateTestDto,
    ) -> Result<Option<Test>, sqlx::Error> {
        sqlx::query_as::<_, Test>(&format!(
            r#"
            UPDATE tests
            SET title = COALESCE($1, title),
                description = COALESCE($2, description),
                passing_score = COALESCE($3, passing_score),
                time_limit = COALESCE($4, time_limit),
                updated_at = NOW()
            WHERE id = $5
            RETURNING {TEST_COLUMNS}
            "#
        ))
        .bind(test.title.as_deref())
        .bind(test.description.as_deref())
        .bind(test.passing_score)
        .bind(test.time_limit)
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_test(&self, test_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tests WHERE id = $1")
            .bind(test_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_question(
        &self,
        question: &CreateQuestionDto,
    ) -> Result<Question, sqlx::Error> {
        sqlx::query_as::<_, Question>(&format!(
            r#"
            INSERT INTO questions (test_id, text, type, "order", points)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(question.test_id)
        .bind(&question.text)
        .bind(question.question_type)
        .bind(question.order.unwrap_or(0))
        .bind(question.points)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_question(
        &self,
        question_id: Uuid,
        question: &UpdateQuestionDto,
    ) -> Result<Option<Question>, sqlx::Error> {
        sqlx::query_as::<_, Question>(&format!(
            r#"
            UPDATE questions
            SET text = COALESCE($1, text),
                type = COALESCE($2, type),
                "order" = COALESCE($3, "order"),
                points = COALESCE($4, points)
            WHERE id = $5
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(question.text.as_deref())
        .bind(question.question_type)
        .bind(question.order)
        .bind(question.points)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_question(&self, question_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(question_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_answer(&self, answer: &CreateAnswerDto) -> Result<Answer, sqlx::Error> {
        sqlx::query_as::<_, Answer>(&format!(
            r#"
            INSERT INTO answers (question_id, text, is_correct, "order")
            VALUES ($1, $2, $3, $4)
            RETURNING {ANSWER_COLUMNS}
            "#
        ))
        .bind(answer.question_id)
        .bind(&answer.text)
        .bind(answer.is_correct)
        .bind(answer.order.unwrap_or(0))
        .fetch_one(&self.pool)
        .await
    }

    async fn update_answer(
        &self,
        answer_id: Uuid,
        answer: &UpdateAnswerDto,
    ) -> Result<Option<Answer>, sqlx::Error> {
        sqlx::query_as::<_, Answer>(&format!(
            r#"
            UPDATE answers
            SET text = COALESCE($1, text),
                is_correct = COALESCE($2, is_correct),
                "order" = COALESCE($3, "order")
            WHERE id = $4
            RETURNING {ANSWER_COLUMNS}
            "#
        ))
        .bind(answer.text.as_deref())
        .bind(answer.is_correct)
        .bind(answer.order)
        .bind(answer_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_answer(&self, answer_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM answers WHERE id = $1")
            .bind(answer_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl AttemptExt for DBClient {
    async fn save_attempt(
        &self,
        user_id: Uuid,
        test_id: Uuid,
        score: i32,
        max_score: i32,
        passed: bool,
        answers: &[SubmittedAnswer],
    ) -> Result<TestAttempt, sqlx::Error> {
        sqlx::query_as::<_, TestAttempt>(&format!(
            r#"
            INSERT INTO test_attempts (user_id, test_id, score, max_score, passed, answers)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ATTEMPT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(test_id)
        .bind(score)
        .bind(max_score)
        .bind(passed)
        .bind(Json(answers.to_vec()))
        .fetch_one(&self.pool)
        .await
    }

    async fn get_attempts(
        &self,
        user_id: Option<Uuid>,
        test_id: Uuid,
    ) -> Result<Vec<TestAttempt>, sqlx::Error> {
        sqlx::query_as::<_, TestAttempt>(&format!(
            r#"
            SELECT {ATTEMPT_COLUMNS} FROM test_attempts
            WHERE test_id = $1 AND ($2::uuid IS NULL OR user_id = $2)
            ORDER BY created_at DESC
            "#
        ))
        .bind(test_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn get_latest_attempt(
        &self,
        user_id: Uuid,
        test_id: Uuid,
    ) -> Result<Option<TestAttempt>, sqlx::Error> {
        sqlx::query_as::<_, TestAttempt>(&format!(
            r#"
            SELECT {ATTEMPT_COLUMNS} FROM test_attempts
            WHERE user_id = $1 AND test_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn count_attempts(&self, user_id: Uuid, passed_only: bool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM test_attempts WHERE user_id = $1 AND (NOT $2 OR passed)",
        )
        .bind(user_id)
        .bind(passed_only)
        .fetch_one(&self.pool)
        .await
    }
}
