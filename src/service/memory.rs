//! In-memory repository used by the service tests

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use crate::db::{
    AttemptExt, CourseExt, EnrollmentExt, LessonExt, PaymentExt, ProgressExt, TestExt, VideoExt,
};
use crate::dtos::{
    CreateAnswerDto, CreateCourseDto, CreateLessonDto, CreateQuestionDto, CreateTestDto,
    CreateVideoDto, LessonOrderDto, PaymentCountsDto, UpdateAnswerDto, UpdateCourseDto,
    UpdateLessonDto, UpdateQuestionDto, UpdateTestDto, UpdateVideoDto,
};
use crate::models::{
    Answer, Course, Enrollment, Lesson, LessonProgress, LessonType, Payment, PaymentStatus,
    Question, QuestionType, SubmittedAnswer, Test, TestAttempt, VideoLesson,
};

#[derive(Default)]
struct Tables {
    courses: Vec<Course>,
    lessons: Vec<Lesson>,
    videos: Vec<VideoLesson>,
    enrollments: Vec<Enrollment>,
    progress: Vec<LessonProgress>,
    tests: Vec<Test>,
    questions: Vec<Question>,
    answers: Vec<Answer>,
    attempts: Vec<TestAttempt>,
    payments: Vec<Payment>,
    // interleaving of a concurrent request, applied right after the next read
    insert_after_enrollment_read: Option<Enrollment>,
    status_after_payment_read: Option<PaymentStatus>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub fn enrollment_count(&self) -> usize {
        self.tables().enrollments.len()
    }

    /// The next enrollment lookup misses, then `enrollment` appears as if
    /// another request inserted it in between
    pub fn enroll_after_next_read(&self, enrollment: Enrollment) {
        self.tables().insert_after_enrollment_read = Some(enrollment);
    }

    /// The next payment lookup returns the stored row, then its status moves
    /// to `status` as if another request committed in between
    pub fn change_status_after_next_read(&self, status: PaymentStatus) {
        self.tables().status_after_payment_read = Some(status);
    }

    pub fn seed_course(&self, is_published: bool) -> Course {
        let now = Utc::now();
        let course = Course {
            id: Uuid::new_v4(),
            title: "Rust for backend developers".to_string(),
            description: None,
            thumbnail: None,
            price: 49900.0,
            price_installment: None,
            is_published,
            created_at: now,
            updated_at: now,
        };
        self.tables().courses.push(course.clone());
        course
    }

    pub fn seed_lesson(&self, course_id: Uuid, order: i32, is_published: bool) -> Lesson {
        let now = Utc::now();
        let lesson = Lesson {
            id: Uuid::new_v4(),
            course_id,
            title: format!("Lesson {order}"),
            description: None,
            lesson_type: LessonType::Video,
            order,
            is_published,
            content: Some("<p>body</p>".to_string()),
            video_url: Some(format!("https://cdn.example.com/{order}.mp4")),
            duration: Some(600),
            created_at: now,
            updated_at: now,
        };
        self.tables().lessons.push(lesson.clone());
        lesson
    }

    pub fn seed_test(&self, lesson_id: Uuid, passing_score: i32) -> Test {
        let now = Utc::now();
        let test = Test {
            id: Uuid::new_v4(),
            lesson_id,
            title: "Checkpoint".to_string(),
            description: None,
            passing_score,
            time_limit: None,
            created_at: now,
            updated_at: now,
        };
        self.tables().tests.push(test.clone());
        test
    }

    pub fn seed_question(&self, test_id: Uuid, order: i32, points: i32) -> Question {
        let question = Question {
            id: Uuid::new_v4(),
            test_id,
            text: format!("Question {order}"),
            question_type: QuestionType::Multiple,
            order,
            points,
        };
        self.tables().questions.push(question.clone());
        question
    }

    pub fn seed_answer(&self, question_id: Uuid, order: i32, is_correct: bool) -> Answer {
        let answer = Answer {
            id: Uuid::new_v4(),
            question_id,
            text: format!("Answer {order}"),
            is_correct,
            order,
        };
        self.tables().answers.push(answer.clone());
        answer
    }

    pub fn seed_video(&self, lesson_id: Uuid) -> VideoLesson {
        let video = VideoLesson {
            id: Uuid::new_v4(),
            lesson_id,
            video_url: "https://cdn.example.com/video.mp4".to_string(),
            duration: 600,
            thumbnail_url: None,
            created_at: Utc::now(),
        };
        self.tables().videos.push(video.clone());
        video
    }
}

fn upsert_progress(
    tables: &mut Tables,
    user_id: Uuid,
    lesson_id: Uuid,
    at: DateTime<Utc>,
    complete: bool,
) -> LessonProgress {
    match tables
        .progress
        .iter_mut()
        .find(|p| p.user_id == user_id && p.lesson_id == lesson_id)
    {
        Some(row) => {
            row.completed |= complete;
            row.last_watched_at = at;
            row.clone()
        }
        None => {
            let row = LessonProgress {
                user_id,
                lesson_id,
                completed: complete,
                last_watched_at: at,
            };
            tables.progress.push(row.clone());
            row
        }
    }
}

impl CourseExt for MemoryStore {
    async fn get_course(&self, course_id: Uuid) -> Result<Option<Course>, sqlx::Error> {
        Ok(self.tables().courses.iter().find(|c| c.id == course_id).cloned())
    }

    async fn get_courses(&self, include_unpublished: bool) -> Result<Vec<Course>, sqlx::Error> {
        Ok(self
            .tables()
            .courses
            .iter()
            .filter(|c| include_unpublished || c.is_published)
            .cloned()
            .collect())
    }

    async fn get_user_courses(&self, user_id: Uuid) -> Result<Vec<Course>, sqlx::Error> {
        let tables = self.tables();
        Ok(tables
            .courses
            .iter()
            .filter(|c| {
                tables
                    .enrollments
                    .iter()
                    .any(|e| e.user_id == user_id && e.course_id == c.id)
            })
            .cloned()
            .collect())
    }

    async fn create_course(&self, course: &CreateCourseDto) -> Result<Course, sqlx::Error> {
        let now = Utc::now();
        let course = Course {
            id: Uuid::new_v4(),
            title: course.title.clone(),
            description: course.description.clone(),
            thumbnail: course.thumbnail.clone(),
            price: course.price,
            price_installment: course.price_installment,
            is_published: course.is_published.unwrap_or(false),
            created_at: now,
            updated_at: now,
        };
        self.tables().courses.push(course.clone());
        Ok(course)
    }

    async fn update_course(
        &self,
        course_id: Uuid,
        update: &UpdateCourseDto,
    ) -> Result<Option<Course>, sqlx::Error> {
        let mut tables = self.tables();
        Ok(tables.courses.iter_mut().find(|c| c.id == course_id).map(|c| {
            if let Some(title) = &update.title {
                c.title = title.clone();
            }
            if let Some(price) = update.price {
                c.price = price;
            }
            if let Some(is_published) = update.is_published {
                c.is_published = is_published;
            }
            c.clone()
        }))
    }

    async fn delete_course(&self, course_id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tables = self.tables();
        let before = tables.courses.len();
        tables.courses.retain(|c| c.id != course_id);
        Ok(tables.courses.len() < before)
    }
}

impl LessonExt for MemoryStore {
    async fn get_lesson(&self, lesson_id: Uuid) -> Result<Option<Lesson>, sqlx::Error> {
        Ok(self.tables().lessons.iter().find(|l| l.id == lesson_id).cloned())
    }

    async fn get_lessons_by_course(
        &self,
        course_id: Uuid,
        published_only: bool,
    ) -> Result<Vec<Lesson>, sqlx::Error> {
        let mut lessons: Vec<Lesson> = self
            .tables()
            .lessons
            .iter()
            .filter(|l| l.course_id == course_id && (!published_only || l.is_published))
            .cloned()
            .collect();
        lessons.sort_by_key(|l| l.order);
        Ok(lessons)
    }

    async fn create_lesson(&self, lesson: &CreateLessonDto) -> Result<Lesson, sqlx::Error> {
        let now = Utc::now();
        let lesson = Lesson {
            id: Uuid::new_v4(),
            course_id: lesson.course_id,
            title: lesson.title.clone(),
            description: lesson.description.clone(),
            lesson_type: lesson.lesson_type,
            order: lesson.order,
            is_published: lesson.is_published.unwrap_or(false),
            content: lesson.content.clone(),
            video_url: lesson.video_url.clone(),
            duration: lesson.duration,
            created_at: now,
            updated_at: now,
        };
        self.tables().lessons.push(lesson.clone());
        Ok(lesson)
    }

    async fn update_lesson(
        &self,
        lesson_id: Uuid,
        update: &UpdateLessonDto,
    ) -> Result<Option<Lesson>, sqlx::Error> {
        let mut tables = self.tables();
        Ok(tables.lessons.iter_mut().find(|l| l.id == lesson_id).map(|l| {
            if let Some(title) = &update.title {
                l.title = title.clone();
            }
            if let Some(content) = &update.content {
                l.content = Some(content.clone());
            }
            if let Some(is_published) = update.is_published {
                l.is_published = is_published;
            }
            l.clone()
        }))
    }

    async fn delete_lesson(&self, lesson_id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tables = self.tables();
        let before = tables.lessons.len();
        tables.lessons.retain(|l| l.id != lesson_id);
        Ok(tables.lessons.len() < before)
    }

    async fn reorder_lessons(
        &self,
        course_id: Uuid,
        orders: &[LessonOrderDto],
    ) -> Result<Vec<Lesson>, sqlx::Error> {
        {
            let mut tables = self.tables();
            let all_owned = orders.iter().all(|o| {
                tables
                    .lessons
                    .iter()
                    .any(|l| l.id == o.id && l.course_id == course_id)
            });
            if !all_owned {
                return Err(sqlx::Error::RowNotFound);
            }
            for o in orders {
                if let Some(lesson) = tables.lessons.iter_mut().find(|l| l.id == o.id) {
                    lesson.order = o.order;
                }
            }
        }
        self.get_lessons_by_course(course_id, false).await
    }
}

impl VideoExt for MemoryStore {
    async fn get_video(&self, lesson_id: Uuid) -> Result<Option<VideoLesson>, sqlx::Error> {
        Ok(self
            .tables()
            .videos
            .iter()
            .find(|v| v.lesson_id == lesson_id)
            .cloned())
    }

    async fn get_videos(&self) -> Result<Vec<VideoLesson>, sqlx::Error> {
        Ok(self.tables().videos.clone())
    }

    async fn create_video(&self, video: &CreateVideoDto) -> Result<VideoLesson, sqlx::Error> {
        let video = VideoLesson {
            id: Uuid::new_v4(),
            lesson_id: video.lesson_id,
            video_url: video.video_url.clone(),
            duration: video.duration,
            thumbnail_url: video.thumbnail_url.clone(),
            created_at: Utc::now(),
        };
        self.tables().videos.push(video.clone());
        Ok(video)
    }

    async fn update_video(
        &self,
        lesson_id: Uuid,
        update: &UpdateVideoDto,
    ) -> Result<Option<VideoLesson>, sqlx::Error> {
        let mut tables = self.tables();
        Ok(tables
            .videos
            .iter_mut()
            .find(|v| v.lesson_id == lesson_id)
            .map(|v| {
                if let Some(url) = &update.video_url {
                    v.video_url = url.clone();
                }
                if let Some(duration) = update.duration {
                    v.duration = duration;
                }
                v.clone()
            }))
    }

    async fn delete_video(&self, lesson_id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tables = self.tables();
        let before = tables.videos.len();
        tables.videos.retain(|v| v.lesson_id != lesson_id);
        Ok(tables.videos.len() < before)
    }
}

impl EnrollmentExt for MemoryStore {
    async fn get_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<Enrollment>, sqlx::Error> {
        let mut tables = self.tables();
        let found = tables
            .enrollments
            .iter()
            .find(|e| e.user_id == user_id && e.course_id == course_id)
            .cloned();
        if let Some(concurrent) = tables.insert_after_enrollment_read.take() {
            tables.enrollments.push(concurrent);
        }
        Ok(found)
    }

    async fn get_enrollments(
        &self,
        user_id: Option<Uuid>,
        course_id: Option<Uuid>,
    ) -> Result<Vec<Enrollment>, sqlx::Error> {
        Ok(self
            .tables()
            .enrollments
            .iter()
            .filter(|e| user_id.is_none_or(|u| e.user_id == u))
            .filter(|e| course_id.is_none_or(|c| e.course_id == c))
            .cloned()
            .collect())
    }

    async fn create_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Enrollment, sqlx::Error> {
        let enrollment = Enrollment {
            user_id,
            course_id,
            enrolled_at: Utc::now(),
            expires_at,
        };
        self.tables().enrollments.push(enrollment.clone());
        Ok(enrollment)
    }

    async fn try_create_enrollment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Enrollment>, sqlx::Error> {
        let mut tables = self.tables();
        if tables
            .enrollments
            .iter()
            .any(|e| e.user_id == user_id && e.course_id == course_id)
        {
            return Ok(None);
        }
        let enrollment = Enrollment {
            user_id,
            course_id,
            enrolled_at: Utc::now(),
            expires_at,
        };
        tables.enrollments.push(enrollment.clone());
        Ok(Some(enrollment))
    }

    async fn set_enrollment_expiry(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Enrollment>, sqlx::Error> {
        let mut tables = self.tables();
        Ok(tables
            .enrollments
            .iter_mut()
            .find(|e| e.user_id == user_id && e.course_id == course_id)
            .map(|e| {
                e.expires_at = expires_at;
                e.clone()
            }))
    }

    async fn delete_enrollment(&self, user_id: Uuid, course_id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tables = self.tables();
        let before = tables.enrollments.len();
        tables
            .enrollments
            .retain(|e| !(e.user_id == user_id && e.course_id == course_id));
        Ok(tables.enrollments.len() < before)
    }

    async fn get_expiring_enrollments(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Enrollment>, sqlx::Error> {
        let mut expiring: Vec<Enrollment> = self
            .tables()
            .enrollments
            .iter()
            .filter(|e| e.expires_at.is_some_and(|at| at >= from && at <= until))
            .cloned()
            .collect();
        expiring.sort_by_key(|e| e.expires_at);
        Ok(expiring)
    }

    async fn count_enrollments(
        &self,
        user_id: Option<Uuid>,
        course_id: Option<Uuid>,
    ) -> Result<i64, sqlx::Error> {
        Ok(self.get_enrollments(user_id, course_id).await?.len() as i64)
    }
}

impl ProgressExt for MemoryStore {
    async fn get_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<Option<LessonProgress>, sqlx::Error> {
        Ok(self
            .tables()
            .progress
            .iter()
            .find(|p| p.user_id == user_id && p.lesson_id == lesson_id)
            .cloned())
    }

    async fn get_course_progress(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Vec<LessonProgress>, sqlx::Error> {
        let tables = self.tables();
        Ok(tables
            .progress
            .iter()
            .filter(|p| p.user_id == user_id)
            .filter(|p| {
                tables
                    .lessons
                    .iter()
                    .any(|l| l.id == p.lesson_id && l.course_id == course_id)
            })
            .cloned()
            .collect())
    }

    async fn mark_lesson_complete(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<LessonProgress, sqlx::Error> {
        Ok(upsert_progress(&mut self.tables(), user_id, lesson_id, at, true))
    }

    async fn touch_lesson_progress(
        &self,
        user_id: Uuid,
        lesson_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<LessonProgress, sqlx::Error> {
        Ok(upsert_progress(&mut self.tables(), user_id, lesson_id, at, false))
    }

    async fn get_recent_progress(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LessonProgress>, sqlx::Error> {
        let mut rows: Vec<LessonProgress> = self
            .tables()
            .progress
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.last_watched_at.cmp(&a.last_watched_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn count_completed_lessons(&self, user_id: Uuid) -> Result<i64, sqlx::Error> {
        Ok(self
            .tables()
            .progress
            .iter()
            .filter(|p| p.user_id == user_id && p.completed)
            .count() as i64)
    }

    async fn count_lesson_progress(
        &self,
        lesson_id: Uuid,
        completed_only: bool,
    ) -> Result<i64, sqlx::Error> {
        Ok(self
            .tables()
            .progress
            .iter()
            .filter(|p| p.lesson_id == lesson_id && (!completed_only || p.completed))
            .count() as i64)
    }

    async fn count_completed_course_progress(&self, course_id: Uuid) -> Result<i64, sqlx::Error> {
        let tables = self.tables();
        Ok(tables
            .progress
            .iter()
            .filter(|p| p.completed)
            .filter(|p| {
                tables
                    .lessons
                    .iter()
                    .any(|l| l.id == p.lesson_id && l.course_id == course_id && l.is_published)
            })
            .count() as i64)
    }
}

impl TestExt for MemoryStore {
    async fn get_test(&self, test_id: Uuid) -> Result<Option<Test>, sqlx::Error> {
        Ok(self.tables().tests.iter().find(|t| t.id == test_id).cloned())
    }

    async fn get_test_by_lesson(&self, lesson_id: Uuid) -> Result<Option<Test>, sqlx::Error> {
        Ok(self
            .tables()
            .tests
            .iter()
            .find(|t| t.lesson_id == lesson_id)
            .cloned())
    }

    async fn get_questions(&self, test_id: Uuid) -> Result<Vec<Question>, sqlx::Error> {
        let mut questions: Vec<Question> = self
            .tables()
            .questions
            .iter()
            .filter(|q| q.test_id == test_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.order);
        Ok(questions)
    }

    async fn get_answers(&self, test_id: Uuid) -> Result<Vec<Answer>, sqlx::Error> {
        let tables = self.tables();
        Ok(tables
            .answers
            .iter()
            .filter(|a| {
                tables
                    .questions
                    .iter()
                    .any(|q| q.id == a.question_id && q.test_id == test_id)
            })
            .cloned()
            .collect())
    }

    async fn create_test(&self, test: &CreateTestDto) -> Result<Test, sqlx::Error> {
        let now = Utc::now();
        let test = Test {
            id: Uuid::new_v4(),
            lesson_id: test.lesson_id,
            title: test.title.clone(),
            description: test.description.clone(),
            passing_score: test.passing_score,
            time_limit: test.time_limit,
            created_at: now,
            updated_at: now,
        };
        self.tables().tests.push(test.clone());
        Ok(test)
    }

    async fn update_test(
        &self,
        test_id: Uuid,
        update: &UpdateTestDto,
    ) -> Result<Option<Test>, sqlx::Error> {
        let mut tables = self.tables();
        Ok(tables.tests.iter_mut().find(|t| t.id == test_id).map(|t| {
            if let Some(title) = &update.title {
                t.title = title.clone();
            }
            if let Some(passing_score) = update.passing_score {
                t.passing_score = passing_score;
            }
            t.clone()
        }))
    }

    async fn delete_test(&self, test_id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tables = self.tables();
        let before = tables.tests.len();
        tables.tests.retain(|t| t.id != test_id);
        Ok(tables.tests.len() < before)
    }

    async fn create_question(
        &self,
        question: &CreateQuestionDto,
    ) -> Result<Question, sqlx::Error> {
        let question = Question {
            id: Uuid::new_v4(),
            test_id: question.test_id,
            text: question.text.clone(),
            question_type: question.question_type,
            order: question.order.unwrap_or(0),
            points: question.points,
        };
        self.tables().questions.push(question.clone());
        Ok(question)
    }

    async fn update_question(
        &self,
        question_id: Uuid,
        update: &UpdateQuestionDto,
    ) -> Result<Option<Question>, sqlx::Error> {
        let mut tables = self.tables();
        Ok(tables
            .questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .map(|q| {
                if let Some(points) = update.points {
                    q.points = points;
                }
                q.clone()
            }))
    }

    async fn delete_question(&self, question_id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tables = self.tables();
        let before = tables.questions.len();
        tables.questions.retain(|q| q.id != question_id);
        Ok(tables.questions.len() < before)
    }

    async fn create_answer(&self, answer: &CreateAnswerDto) -> Result<Answer, sqlx::Error> {
        let answer = Answer {
            id: Uuid::new_v4(),
            question_id: answer.question_id,
            text: answer.text.clone(),
            is_correct: answer.is_correct,
            order: answer.order.unwrap_or(0),
        };
        self.tables().answers.push(answer.clone());
        Ok(answer)
    }

    async fn update_answer(
        &self,
        answer_id: Uuid,
        update: &UpdateAnswerDto,
    ) -> Result<Option<Answer>, sqlx::Error> {
        let mut tables = self.tables();
        Ok(tables.answers.iter_mut().find(|a| a.id == answer_id).map(|a| {
            if let Some(is_correct) = update.is_correct {
                a.is_correct = is_correct;
            }
            a.clone()
        }))
    }

    async fn delete_answer(&self, answer_id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tables = self.tables();
        let before = tables.answers.len();
        tables.answers.retain(|a| a.id != answer_id);
        Ok(tables.answers.len() < before)
    }
}

impl AttemptExt for MemoryStore {
    async fn save_attempt(
        &self,
        user_id: Uuid,
        test_id: Uuid,
        score: i32,
        max_score: i32,
        passed: bool,
        answers: &[SubmittedAnswer],
    ) -> Result<TestAttempt, sqlx::Error> {
        let attempt = TestAttempt {
            id: Uuid::new_v4(),
            user_id,
            test_id,
            score,
            max_score,
            passed,
            answers: Json(answers.to_vec()),
            created_at: Utc::now(),
        };
        self.tables().attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn get_attempts(
        &self,
        user_id: Option<Uuid>,
        test_id: Uuid,
    ) -> Result<Vec<TestAttempt>, sqlx::Error> {
        // Newest insert first, then a stable sort keeps that order on equal timestamps
        let mut attempts: Vec<TestAttempt> = self
            .tables()
            .attempts
            .iter()
            .rev()
            .filter(|a| a.test_id == test_id && user_id.is_none_or(|u| a.user_id == u))
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(attempts)
    }

    async fn get_latest_attempt(
        &self,
        user_id: Uuid,
        test_id: Uuid,
    ) -> Result<Option<TestAttempt>, sqlx::Error> {
        Ok(self
            .get_attempts(Some(user_id), test_id)
            .await?
            .into_iter()
            .next())
    }

    async fn count_attempts(&self, user_id: Uuid, passed_only: bool) -> Result<i64, sqlx::Error> {
        Ok(self
            .tables()
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id && (!passed_only || a.passed))
            .count() as i64)
    }
}

impl PaymentExt for MemoryStore {
    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, sqlx::Error> {
        let mut tables = self.tables();
        let status_after = tables.status_after_payment_read.take();
        let payment = tables.payments.iter_mut().find(|p| p.id == payment_id);
        let found = payment.as_deref().cloned();
        if let (Some(payment), Some(status)) = (payment, status_after) {
            payment.status = status;
        }
        Ok(found)
    }

    async fn get_payments(
        &self,
        user_id: Option<Uuid>,
        limit: Option<i64>,
    ) -> Result<Vec<Payment>, sqlx::Error> {
        let mut payments: Vec<Payment> = self
            .tables()
            .payments
            .iter()
            .rev()
            .filter(|p| user_id.is_none_or(|u| p.user_id == u))
            .cloned()
            .collect();
        if let Some(limit) = limit {
            payments.truncate(limit.max(0) as usize);
        }
        Ok(payments)
    }

    async fn create_payment(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        amount: f64,
        currency: &str,
        payment_system: &str,
    ) -> Result<Payment, sqlx::Error> {
        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            amount,
            currency: currency.to_string(),
            status: PaymentStatus::Pending,
            payment_system: payment_system.to_string(),
            transaction_id: None,
            created_at: now,
            updated_at: now,
        };
        self.tables().payments.push(payment.clone());
        Ok(payment)
    }

    async fn update_payment_status(
        &self,
        payment_id: Uuid,
        expected: PaymentStatus,
        status: PaymentStatus,
        transaction_id: Option<&str>,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let mut tables = self.tables();
        Ok(tables
            .payments
            .iter_mut()
            .find(|p| p.id == payment_id && p.status == expected)
            .map(|p| {
                p.status = status;
                if let Some(tx) = transaction_id {
                    p.transaction_id = Some(tx.to_string());
                }
                p.updated_at = Utc::now();
                p.clone()
            }))
    }

    async fn get_payment_counts(&self) -> Result<PaymentCountsDto, sqlx::Error> {
        let tables = self.tables();
        let count = |status: PaymentStatus| {
            tables.payments.iter().filter(|p| p.status == status).count() as i64
        };
        Ok(PaymentCountsDto {
            total_payments: tables.payments.len() as i64,
            completed_payments: count(PaymentStatus::Completed),
            pending_payments: count(PaymentStatus::Pending),
            failed_payments: count(PaymentStatus::Failed),
            total_revenue: tables
                .payments
                .iter()
                .filter(|p| p.status == PaymentStatus::Completed)
                .map(|p| p.amount)
                .sum(),
        })
    }
}
