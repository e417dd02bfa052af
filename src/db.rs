use sqlx::{Pool, Postgres};

mod user;
pub use user::UserExt;

mod program;
pub use program::ProgramExt;

mod unit;
pub use unit::UnitExt;

mod topic;
pub use topic::TopicExt;

mod content;
pub use content::ContentExt;

mod progress;
pub use progress::ProgressExt;

mod tree;
pub use tree::assemble_tree;

#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}
