use sqlx::{Pool, Postgres};

mod user;
pub use user::UserExt;

mod course;
pub use course::CourseExt;

mod lesson;
pub use lesson::LessonExt;

mod video;
pub use video::VideoExt;

mod enrollment;
pub use enrollment::EnrollmentExt;

mod progress;
pub use progress::ProgressExt;

mod test;
pub use test::{AttemptExt, TestExt};

mod payment;
pub use payment::PaymentExt;

#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}
impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}
