use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access tier stored in the "user_role" PostgreSQL ENUM.
///
/// `Free` is the default tier, `Premium` is time-bounded by
/// `User::premium_until`, and `Admin` bypasses every expiry check.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Free,
    Premium,
    Admin,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Free => "free",
            UserRole::Premium => "premium",
            UserRole::Admin => "admin",
        }
    }
}

/// User account row from the "users" table.
///
/// `password` holds the argon2 hash, never plain text. `premium_until`
/// is only meaningful for `Premium` users and may lie in the past,
/// which means the subscription has expired.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub password: String,
    pub role: UserRole,
    pub premium_until: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// Whether this user holds active premium access at `now`.
    ///
    /// Admins are always active. Premium users are active while
    /// `premium_until` lies in the future. Everyone else is not.
    /// Wall-clock dependent, so callers must evaluate it freshly
    /// instead of caching the answer across a long-lived session.
    pub fn premium_active_at(&self, now: DateTime<Utc>) -> bool {
        match self.role {
            UserRole::Admin => true,
            UserRole::Premium => self.premium_until.is_some_and(|until| until > now),
            UserRole::Free => false,
        }
    }

    pub fn is_premium_active(&self) -> bool {
        self.premium_active_at(Utc::now())
    }
}

/// Program pricing tier, stored as the "program_kind" ENUM.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "program_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProgramKind {
    Free,
    Premium,
}

/// Level 1 of the curriculum hierarchy.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ProgramKind,
    #[serde(rename = "order")]
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Program {
    /// The single authorization decision of the system, evaluated
    /// server-side before any gated payload is serialized.
    ///
    /// Free programs are open to everyone, anonymous callers included.
    /// Premium programs require an authenticated user with active
    /// premium access.
    pub fn grants_access_at(&self, user: Option<&User>, now: DateTime<Utc>) -> bool {
        if self.kind == ProgramKind::Free {
            return true;
        }
        match user {
            Some(user) => user.premium_active_at(now),
            None => false,
        }
    }

    pub fn grants_access(&self, user: Option<&User>) -> bool {
        self.grants_access_at(user, Utc::now())
    }
}

/// Level 2 — owned exclusively by one Program.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: Uuid,
    pub program_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    #[serde(rename = "order")]
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Level 3 — owned by one Unit.
///
/// `program_id` duplicates the ancestor reference for flat querying
/// (set-based cascade deletes, whole-program topic fetches). It must
/// equal the parent unit's `program_id`; writes enforce this.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub program_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: String,
    #[serde(rename = "order")]
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Discriminator for the six content kinds, stored as the
/// "content_kind" ENUM.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "content_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Theory,
    Example,
    Exercise,
    Quiz,
    Video,
    Pdf,
}

impl ContentKind {
    /// Parse the client-facing kind string. Returns None for anything
    /// outside the six enumerated kinds; the authoring boundary turns
    /// that into a validation error before the store is touched.
    pub fn parse(s: &str) -> Option<ContentKind> {
        match s {
            "theory" => Some(ContentKind::Theory),
            "example" => Some(ContentKind::Example),
            "exercise" => Some(ContentKind::Exercise),
            "quiz" => Some(ContentKind::Quiz),
            "video" => Some(ContentKind::Video),
            "pdf" => Some(ContentKind::Pdf),
            _ => None,
        }
    }

    pub fn to_str(&self) -> &str {
        match self {
            ContentKind::Theory => "theory",
            ContentKind::Example => "example",
            ContentKind::Exercise => "exercise",
            ContentKind::Quiz => "quiz",
            ContentKind::Video => "video",
            ContentKind::Pdf => "pdf",
        }
    }
}

/// One choice of a multiple-choice question.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct QuestionOption {
    pub label: String,
    pub text: String,
}

/// Multiple-choice question inside a quiz content record.
///
/// `correct_answer` must equal the label of one of `options`; labels
/// are unique within a question. Both rules are enforced when the
/// quiz is authored, so readers may rely on them.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub options: Vec<QuestionOption>,
    #[serde(rename = "correctAnswer")]
    pub correct_answer: String,
}

impl Question {
    pub fn is_correct(&self, label: &str) -> bool {
        self.correct_answer == label
    }
}

/// Kind-specific payload of a content record.
///
/// The store keeps the flat optional columns of the original document
/// shape; the domain type is a tagged union so an inconsistent field
/// combination cannot be represented in memory.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPayload {
    Theory {
        body: String,
    },
    Example {
        body: String,
    },
    Exercise {
        body: String,
    },
    Video {
        #[serde(rename = "videoUrl")]
        video_url: Option<String>,
    },
    Pdf {
        #[serde(rename = "pdfUrl")]
        pdf_url: Option<String>,
    },
    Quiz {
        questions: Vec<Question>,
    },
}

impl ContentPayload {
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentPayload::Theory { .. } => ContentKind::Theory,
            ContentPayload::Example { .. } => ContentKind::Example,
            ContentPayload::Exercise { .. } => ContentKind::Exercise,
            ContentPayload::Video { .. } => ContentKind::Video,
            ContentPayload::Pdf { .. } => ContentKind::Pdf,
            ContentPayload::Quiz { .. } => ContentKind::Quiz,
        }
    }

    pub fn questions(&self) -> Option<&[Question]> {
        match self {
            ContentPayload::Quiz { questions } => Some(questions),
            _ => None,
        }
    }
}

/// Level 4 — leaf learning artifact.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub unit_id: Uuid,
    pub program_id: Uuid,
    pub title: String,
    #[serde(rename = "order")]
    pub sort_order: i32,
    #[serde(flatten)]
    pub payload: ContentPayload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Read-only denormalized tree, assembled on demand and never persisted.

#[derive(Debug, Serialize, Clone)]
pub struct TopicWithContents {
    #[serde(flatten)]
    pub topic: Topic,
    pub contents: Vec<Content>,
}

#[derive(Debug, Serialize, Clone)]
pub struct UnitWithTopics {
    #[serde(flatten)]
    pub unit: Unit,
    pub topics: Vec<TopicWithContents>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ProgramTree {
    #[serde(flatten)]
    pub program: Program,
    pub units: Vec<UnitWithTopics>,
}

/// Per-user completion record, stored under the user's namespace and
/// append-only from the student's perspective.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ContentCompletion {
    pub content_id: Uuid,
    pub topic_id: Uuid,
    pub unit_id: Uuid,
    pub program_id: Uuid,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(role: UserRole, premium_until: Option<DateTime<Utc>>) -> User {
        User {
            id: Uuid::new_v4(),
            email: "student@example.com".to_string(),
            display_name: None,
            photo_url: None,
            password: "hash".to_string(),
            role,
            premium_until,
            created_at: None,
            updated_at: None,
        }
    }

    fn program(kind: ProgramKind) -> Program {
        let now = Utc::now();
        Program {
            id: Uuid::new_v4(),
            title: "Algebra".to_string(),
            slug: "algebra".to_string(),
            description: String::new(),
            kind,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn admin_is_premium_active_regardless_of_expiry() {
        let now = Utc::now();
        let expired = user(UserRole::Admin, Some(now - Duration::days(30)));
        let unset = user(UserRole::Admin, None);
        assert!(expired.premium_active_at(now));
        assert!(unset.premium_active_at(now));
    }

    #[test]
    fn premium_with_future_expiry_is_active() {
        let now = Utc::now();
        let u = user(UserRole::Premium, Some(now + Duration::days(1)));
        assert!(u.premium_active_at(now));
    }

    #[test]
    fn premium_with_past_expiry_is_inactive() {
        let now = Utc::now();
        let u = user(UserRole::Premium, Some(now - Duration::seconds(1)));
        assert!(!u.premium_active_at(now));
    }

    #[test]
    fn premium_without_expiry_is_inactive() {
        let now = Utc::now();
        let u = user(UserRole::Premium, None);
        assert!(!u.premium_active_at(now));
    }

    #[test]
    fn free_role_is_never_premium_active() {
        let now = Utc::now();
        let u = user(UserRole::Free, Some(now + Duration::days(365)));
        assert!(!u.premium_active_at(now));
    }

    #[test]
    fn free_program_open_to_everyone() {
        let now = Utc::now();
        let p = program(ProgramKind::Free);
        let free_user = user(UserRole::Free, None);
        assert!(p.grants_access_at(None, now));
        assert!(p.grants_access_at(Some(&free_user), now));
    }

    #[test]
    fn premium_program_rejects_anonymous() {
        let now = Utc::now();
        let p = program(ProgramKind::Premium);
        assert!(!p.grants_access_at(None, now));
    }

    #[test]
    fn premium_program_follows_premium_state() {
        let now = Utc::now();
        let p = program(ProgramKind::Premium);
        let active = user(UserRole::Premium, Some(now + Duration::days(7)));
        let expired = user(UserRole::Premium, Some(now - Duration::days(7)));
        let admin = user(UserRole::Admin, None);
        assert!(p.grants_access_at(Some(&active), now));
        assert!(!p.grants_access_at(Some(&expired), now));
        assert!(p.grants_access_at(Some(&admin), now));
    }

    #[test]
    fn content_kind_parses_only_the_six_kinds() {
        for kind in ["theory", "example", "exercise", "quiz", "video", "pdf"] {
            assert!(ContentKind::parse(kind).is_some(), "{kind}");
        }
        assert!(ContentKind::parse("essay").is_none());
        assert!(ContentKind::parse("Quiz").is_none());
    }
}
