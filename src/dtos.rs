use crate::models::{
    Content, ContentCompletion, ContentKind, ContentPayload, Program, ProgramTree, Question, Topic,
    Unit, User, UserRole,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// DTOs keep the wire format (camelCase, filtered fields) separate from
// the database models.

// ============================================================================
// Authentication & user DTOs
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
    #[serde(rename = "confirmPassword")]
    pub password_confirm: String,

    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
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

/// Client-safe user projection; never carries the password hash.
#[derive(Debug, Serialize, Deserialize)]
pub struct FilterUserDto {
    pub id: String,
    pub email: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "photoUrl")]
    pub photo_url: Option<String>,
    pub role: String,
    #[serde(rename = "premiumUntil")]
    pub premium_until: Option<DateTime<Utc>>,
    #[serde(rename = "premiumActive")]
    pub premium_active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            email: user.email.to_owned(),
            display_name: user.display_name.to_owned(),
            photo_url: user.photo_url.to_owned(),
            role: user.role.to_str().to_string(),
            premium_until: user.premium_until,
            premium_active: user.is_premium_active(),
            created_at: user.created_at,
        }
    }

    pub fn filter_users(users: &[User]) -> Vec<FilterUserDto> {
        users.iter().map(FilterUserDto::filter_user).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserData {
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub status: String,
    pub data: UserData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserListResponseDto {
    pub status: String,
    pub users: Vec<FilterUserDto>,
    pub results: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponseDto {
    pub status: String,
    pub access_token: String,
    pub user: FilterUserDto,
}

/// Admin grant: role change with the premium expiry that makes a
/// `premium` role meaningful.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoleUpdateDto {
    pub role: UserRole,
    #[serde(rename = "premiumUntil")]
    pub premium_until: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize)]
pub struct Response {
    pub status: &'static str,
    pub message: String,
}

#[derive(Serialize, Deserialize, Validate, Debug)]
pub struct RequestQueryDto {
    #[validate(range(min = 1))]
    pub page: Option<usize>,

    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

// ============================================================================
// Program DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ProgramCreateDto {
    #[validate(length(min = 1, message = "Title is required."))]
    pub title: String,

    #[validate(length(min = 1, message = "Slug is required."))]
    pub slug: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "type")]
    pub kind: crate::models::ProgramKind,

    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct ProgramUpdateDto {
    #[validate(length(min = 1, message = "Title is required."))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Slug is required."))]
    pub slug: Option<String>,

    pub description: Option<String>,

    #[serde(rename = "type")]
    pub kind: Option<crate::models::ProgramKind>,

    pub order: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ProgramResponseDto {
    pub status: String,
    pub data: Program,
}

#[derive(Debug, Serialize)]
pub struct ProgramListResponseDto {
    pub status: String,
    pub data: Vec<Program>,
    pub results: usize,
}

/// One program in the dashboard listing. Premium programs the caller
/// cannot access come back locked, with the curriculum stripped before
/// serialization.
#[derive(Debug, Serialize)]
pub struct ProgramTreeDto {
    #[serde(flatten)]
    pub program: Program,
    pub locked: bool,
    pub units: Vec<crate::models::UnitWithTopics>,
}

impl ProgramTreeDto {
    pub fn unlocked(tree: ProgramTree) -> Self {
        ProgramTreeDto {
            program: tree.program,
            locked: false,
            units: tree.units,
        }
    }

    pub fn locked(program: Program) -> Self {
        ProgramTreeDto {
            program,
            locked: true,
            units: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProgramTreeResponseDto {
    pub status: String,
    pub data: ProgramTreeDto,
}

#[derive(Debug, Serialize)]
pub struct ProgramTreesResponseDto {
    pub status: String,
    pub data: Vec<ProgramTreeDto>,
}

// ============================================================================
// Unit & Topic DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UnitCreateDto {
    #[serde(rename = "programId")]
    pub program_id: Uuid,

    #[validate(length(min = 1, message = "Title is required."))]
    pub title: String,

    #[validate(length(min = 1, message = "Slug is required."))]
    pub slug: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UnitUpdateDto {
    #[validate(length(min = 1, message = "Title is required."))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Slug is required."))]
    pub slug: Option<String>,

    pub description: Option<String>,

    pub order: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct UnitResponseDto {
    pub status: String,
    pub data: Unit,
}

#[derive(Debug, Serialize)]
pub struct UnitListResponseDto {
    pub status: String,
    pub data: Vec<Unit>,
    pub results: usize,
}

#[derive(Debug, Deserialize)]
pub struct UnitsQueryDto {
    #[serde(rename = "programId")]
    pub program_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TopicCreateDto {
    #[serde(rename = "unitId")]
    pub unit_id: Uuid,

    #[serde(rename = "programId")]
    pub program_id: Uuid,

    #[validate(length(min = 1, message = "Title is required."))]
    pub title: String,

    #[validate(length(min = 1, message = "Slug is required."))]
    pub slug: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct TopicUpdateDto {
    #[validate(length(min = 1, message = "Title is required."))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Slug is required."))]
    pub slug: Option<String>,

    pub description: Option<String>,

    pub order: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct TopicResponseDto {
    pub status: String,
    pub data: Topic,
}

#[derive(Debug, Serialize)]
pub struct TopicListResponseDto {
    pub status: String,
    pub data: Vec<Topic>,
    pub results: usize,
}

#[derive(Debug, Deserialize)]
pub struct TopicsQueryDto {
    #[serde(rename = "unitId")]
    pub unit_id: Uuid,
}

// ============================================================================
// Content DTOs (polymorphic)
// ============================================================================

/// Authoring input for a content record: flat optional fields plus a
/// kind string, exactly as the admin form submits them. `into_payload`
/// is the validation gate that turns this into the tagged union.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ContentCreateDto {
    #[serde(rename = "topicId")]
    pub topic_id: Uuid,

    #[serde(rename = "unitId")]
    pub unit_id: Uuid,

    #[serde(rename = "programId")]
    pub program_id: Uuid,

    #[validate(length(min = 1, message = "Title is required."))]
    pub title: String,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub order: i32,

    pub body: Option<String>,

    #[serde(rename = "videoUrl")]
    pub video_url: Option<String>,

    #[serde(rename = "pdfUrl")]
    pub pdf_url: Option<String>,

    pub questions: Option<Vec<Question>>,
}

impl ContentCreateDto {
    pub fn into_payload(self) -> Result<(String, i32, Uuid, Uuid, Uuid, ContentPayload), String> {
        let kind = ContentKind::parse(&self.kind)
            .ok_or_else(|| format!("'{}' is not a valid content type", self.kind))?;
        let payload = build_payload(kind, self.body, self.video_url, self.pdf_url, self.questions)?;
        Ok((
            self.title,
            self.order,
            self.topic_id,
            self.unit_id,
            self.program_id,
            payload,
        ))
    }
}

/// Partial content update. Present fields are merged over the stored
/// record's flat projection, then the merged whole is re-validated as
/// if it were being created — so a kind change must come with a
/// consistent payload.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct ContentUpdateDto {
    #[validate(length(min = 1, message = "Title is required."))]
    pub title: Option<String>,

    #[serde(rename = "type")]
    pub kind: Option<String>,

    pub order: Option<i32>,

    pub body: Option<String>,

    #[serde(rename = "videoUrl")]
    pub video_url: Option<String>,

    #[serde(rename = "pdfUrl")]
    pub pdf_url: Option<String>,

    pub questions: Option<Vec<Question>>,
}

impl ContentUpdateDto {
    /// Merge this partial update over an existing payload and produce
    /// the new one, re-running the full validation gate.
    pub fn merged_payload(&self, existing: &ContentPayload) -> Result<ContentPayload, String> {
        let kind = match &self.kind {
            Some(raw) => ContentKind::parse(raw)
                .ok_or_else(|| format!("'{raw}' is not a valid content type"))?,
            None => existing.kind(),
        };

        // Flat projection of the stored payload, then field-wise merge.
        let (mut body, mut video_url, mut pdf_url, mut questions) = match existing.clone() {
            ContentPayload::Theory { body } => (Some(body), None, None, None),
            ContentPayload::Example { body } => (Some(body), None, None, None),
            ContentPayload::Exercise { body } => (Some(body), None, None, None),
            ContentPayload::Video { video_url } => (None, video_url, None, None),
            ContentPayload::Pdf { pdf_url } => (None, None, pdf_url, None),
            ContentPayload::Quiz { questions } => (None, None, None, Some(questions)),
        };

        // A kind switch drops payload fields that belonged to the old
        // kind instead of reporting them as inconsistent input.
        if kind != existing.kind() {
            body = None;
            video_url = None;
            pdf_url = None;
            questions = None;
        }

        if self.body.is_some() {
            body = self.body.clone();
        }
        if self.video_url.is_some() {
            video_url = self.video_url.clone();
        }
        if self.pdf_url.is_some() {
            pdf_url = self.pdf_url.clone();
        }
        if self.questions.is_some() {
            questions = self.questions.clone();
        }

        build_payload(kind, body, video_url, pdf_url, questions)
    }
}

/// Validation gate for the polymorphic record: exactly the fields of
/// the selected kind may be populated, and quiz questions must be
/// internally consistent.
pub fn build_payload(
    kind: ContentKind,
    body: Option<String>,
    video_url: Option<String>,
    pdf_url: Option<String>,
    questions: Option<Vec<Question>>,
) -> Result<ContentPayload, String> {
    let reject_foreign = |field: &str, present: bool| {
        if present {
            Err(format!(
                "field '{field}' is not allowed for content type '{}'",
                kind.to_str()
            ))
        } else {
            Ok(())
        }
    };

    match kind {
        ContentKind::Theory | ContentKind::Example | ContentKind::Exercise => {
            reject_foreign("videoUrl", video_url.is_some())?;
            reject_foreign("pdfUrl", pdf_url.is_some())?;
            reject_foreign("questions", questions.is_some())?;
            let body = body.filter(|b| !b.trim().is_empty()).ok_or_else(|| {
                format!("content type '{}' requires a body", kind.to_str())
            })?;
            Ok(match kind {
                ContentKind::Theory => ContentPayload::Theory { body },
                ContentKind::Example => ContentPayload::Example { body },
                _ => ContentPayload::Exercise { body },
            })
        }
        ContentKind::Video => {
            reject_foreign("body", body.is_some())?;
            reject_foreign("pdfUrl", pdf_url.is_some())?;
            reject_foreign("questions", questions.is_some())?;
            // The URL may be filled in later.
            Ok(ContentPayload::Video { video_url })
        }
        ContentKind::Pdf => {
            reject_foreign("body", body.is_some())?;
            reject_foreign("videoUrl", video_url.is_some())?;
            reject_foreign("questions", questions.is_some())?;
            Ok(ContentPayload::Pdf { pdf_url })
        }
        ContentKind::Quiz => {
            reject_foreign("body", body.is_some())?;
            reject_foreign("videoUrl", video_url.is_some())?;
            reject_foreign("pdfUrl", pdf_url.is_some())?;
            let questions =
                questions.ok_or_else(|| "a quiz requires at least one question".to_string())?;
            validate_questions(&questions)?;
            Ok(ContentPayload::Quiz { questions })
        }
    }
}

/// Write-time integrity rules for quiz questions.
pub fn validate_questions(questions: &[Question]) -> Result<(), String> {
    if questions.is_empty() {
        return Err("a quiz requires at least one question".to_string());
    }

    for (i, q) in questions.iter().enumerate() {
        if q.text.trim().is_empty() {
            return Err(format!("question {} has no text", i + 1));
        }
        if q.options.is_empty() {
            return Err(format!("question {} has no options", i + 1));
        }
        let mut seen = std::collections::HashSet::new();
        for opt in &q.options {
            if opt.label.trim().is_empty() {
                return Err(format!("question {} has an option without a label", i + 1));
            }
            if !seen.insert(opt.label.as_str()) {
                return Err(format!(
                    "question {} repeats the option label '{}'",
                    i + 1,
                    opt.label
                ));
            }
        }
        if !q.options.iter().any(|opt| opt.label == q.correct_answer) {
            return Err(format!(
                "question {}: correct answer '{}' does not match any option label",
                i + 1,
                q.correct_answer
            ));
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
pub struct ContentResponseDto {
    pub status: String,
    pub data: Content,
}

#[derive(Debug, Serialize)]
pub struct ContentListResponseDto {
    pub status: String,
    pub data: Vec<Content>,
    pub results: usize,
}

#[derive(Debug, Deserialize)]
pub struct ContentsQueryDto {
    #[serde(rename = "topicId")]
    pub topic_id: Uuid,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub location: String,
}

// ============================================================================
// Progress & quiz attempt DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CompletionInputDto {
    #[serde(rename = "contentId")]
    pub content_id: Uuid,

    #[serde(rename = "topicId")]
    pub topic_id: Uuid,

    #[serde(rename = "unitId")]
    pub unit_id: Uuid,

    #[serde(rename = "programId")]
    pub program_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CompletionListResponseDto {
    pub status: String,
    pub data: Vec<ContentCompletion>,
    pub results: usize,
}

/// One ordered answer label per question of the quiz.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuizAttemptDto {
    pub answers: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct QuizAttemptResponseDto {
    pub status: String,
    pub correct: usize,
    pub total: usize,
    pub percent: u32,
    #[serde(rename = "completionRecorded")]
    pub completion_recorded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionOption;

    fn quiz_question(correct: &str, labels: &[&str]) -> Question {
        Question {
            id: "q1".to_string(),
            text: "Pick one".to_string(),
            options: labels
                .iter()
                .map(|l| QuestionOption {
                    label: l.to_string(),
                    text: format!("Option {l}"),
                })
                .collect(),
            correct_answer: correct.to_string(),
        }
    }

    #[test]
    fn video_without_url_is_creatable() {
        let payload = build_payload(ContentKind::Video, None, None, None, None).unwrap();
        assert_eq!(payload, ContentPayload::Video { video_url: None });
    }

    #[test]
    fn theory_requires_a_body() {
        assert!(build_payload(ContentKind::Theory, None, None, None, None).is_err());
        assert!(build_payload(ContentKind::Theory, Some("  ".to_string()), None, None, None).is_err());
        let payload =
            build_payload(ContentKind::Theory, Some("# Intro".to_string()), None, None, None)
                .unwrap();
        assert_eq!(payload.kind(), ContentKind::Theory);
    }

    #[test]
    fn foreign_fields_are_rejected() {
        let err = build_payload(
            ContentKind::Theory,
            Some("body".to_string()),
            Some("https://youtu.be/x".to_string()),
            None,
            None,
        )
        .unwrap_err();
        assert!(err.contains("videoUrl"));

        let err = build_payload(
            ContentKind::Video,
            Some("body".to_string()),
            None,
            None,
            None,
        )
        .unwrap_err();
        assert!(err.contains("body"));
    }

    #[test]
    fn invalid_kind_is_a_validation_error() {
        let dto = ContentCreateDto {
            topic_id: Uuid::new_v4(),
            unit_id: Uuid::new_v4(),
            program_id: Uuid::new_v4(),
            title: "Broken".to_string(),
            kind: "podcast".to_string(),
            order: 0,
            body: None,
            video_url: None,
            pdf_url: None,
            questions: None,
        };
        let err = dto.into_payload().unwrap_err();
        assert!(err.contains("podcast"));
    }

    #[test]
    fn quiz_requires_questions() {
        assert!(build_payload(ContentKind::Quiz, None, None, None, None).is_err());
        assert!(build_payload(ContentKind::Quiz, None, None, None, Some(vec![])).is_err());
    }

    #[test]
    fn quiz_correct_answer_must_match_an_option_label() {
        let bad = vec![quiz_question("D", &["A", "B", "C"])];
        let err = validate_questions(&bad).unwrap_err();
        assert!(err.contains("'D'"));

        let good = vec![quiz_question("B", &["A", "B", "C"])];
        assert!(validate_questions(&good).is_ok());
    }

    #[test]
    fn quiz_labels_must_be_unique() {
        let dup = vec![quiz_question("A", &["A", "A"])];
        assert!(validate_questions(&dup).is_err());
    }

    #[test]
    fn update_merge_keeps_kind_and_replaces_fields() {
        let existing = ContentPayload::Theory {
            body: "old".to_string(),
        };
        let update = ContentUpdateDto {
            body: Some("new".to_string()),
            ..Default::default()
        };
        let merged = update.merged_payload(&existing).unwrap();
        assert_eq!(
            merged,
            ContentPayload::Theory {
                body: "new".to_string()
            }
        );
    }

    #[test]
    fn update_can_switch_kind_with_a_consistent_payload() {
        let existing = ContentPayload::Theory {
            body: "old".to_string(),
        };
        let update = ContentUpdateDto {
            kind: Some("video".to_string()),
            video_url: Some("https://youtu.be/x".to_string()),
            ..Default::default()
        };
        let merged = update.merged_payload(&existing).unwrap();
        assert_eq!(
            merged,
            ContentPayload::Video {
                video_url: Some("https://youtu.be/x".to_string())
            }
        );
    }

    #[test]
    fn update_switching_to_text_kind_still_requires_a_body() {
        let existing = ContentPayload::Video { video_url: None };
        let update = ContentUpdateDto {
            kind: Some("theory".to_string()),
            ..Default::default()
        };
        assert!(update.merged_payload(&existing).is_err());
    }
}
