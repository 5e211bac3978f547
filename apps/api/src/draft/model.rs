//! In-memory draft model — the user-editable resume state the form layer
//! mutates on every keystroke, plus the payload shape sent to the save
//! operation.
//!
//! Dates inside list entries are carried as `YYYY-MM-DD` strings (the form
//! representation) and parsed at save time. The photo is either a reference
//! to previously stored binary data or a freshly selected local payload.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::resume::{EducationRow, ProjectRow, ResumeRow, WorkExperienceRow};

/// One resume-in-progress. `id` is absent until the first successful save
/// and stable for the draft's lifetime afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeDraft {
    pub id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub job_title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub summary: Option<String>,
    pub color_hex: Option<String>,
    pub border_style: Option<String>,
    pub work_experiences: Vec<WorkExperienceDraft>,
    pub educations: Vec<EducationDraft>,
    pub projects: Vec<ProjectDraft>,
    pub skills: Vec<String>,
    pub photo: Option<Photo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkExperienceDraft {
    pub position: Option<String>,
    pub company: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationDraft {
    pub degree: Option<String>,
    pub college: Option<String>,
    pub school: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tech_stack: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub project_url: Option<String>,
}

/// The draft's photo attachment.
///
/// `Stored` references binary data already uploaded; `Local` is a newly
/// selected payload awaiting upload. Two photos are compared by identity
/// metadata (file name, byte size, modification time) or by URL — never by
/// content, which is not cheaply computable on the editing side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Photo {
    Stored {
        url: String,
    },
    Local {
        file_name: String,
        size_bytes: u64,
        modified_ms: i64,
        content_type: String,
        #[serde(with = "base64_bytes")]
        data: Bytes,
    },
}

/// Instruction for the stored photo carried by a save payload.
/// An omitted patch (`None` on [`SavePayload::photo`]) means "unchanged" —
/// the field is dropped entirely so unchanged binary data is never re-sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PhotoPatch {
    Remove,
    Stored {
        url: String,
    },
    Upload {
        file_name: String,
        content_type: String,
        size_bytes: u64,
        modified_ms: i64,
        #[serde(with = "base64_bytes")]
        data: Bytes,
    },
}

/// What the save operation receives: the draft's fields plus the photo patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavePayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub job_title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub summary: Option<String>,
    pub color_hex: Option<String>,
    pub border_style: Option<String>,
    pub work_experiences: Vec<WorkExperienceDraft>,
    pub educations: Vec<EducationDraft>,
    pub projects: Vec<ProjectDraft>,
    pub skills: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<PhotoPatch>,
}

impl SavePayload {
    /// Builds the outgoing payload for a debounced draft. When the draft's
    /// photo is identity-equivalent to the snapshot's, the photo field is
    /// dropped so unchanged binary data is not re-uploaded.
    pub fn from_draft(draft: &ResumeDraft, snapshot: &ResumeDraft) -> Self {
        let photo = if super::diff::same_photo(draft.photo.as_ref(), snapshot.photo.as_ref()) {
            None
        } else {
            Some(match &draft.photo {
                None => PhotoPatch::Remove,
                Some(Photo::Stored { url }) => PhotoPatch::Stored { url: url.clone() },
                Some(Photo::Local {
                    file_name,
                    size_bytes,
                    modified_ms,
                    content_type,
                    data,
                }) => PhotoPatch::Upload {
                    file_name: file_name.clone(),
                    content_type: content_type.clone(),
                    size_bytes: *size_bytes,
                    modified_ms: *modified_ms,
                    data: data.clone(),
                },
            })
        };

        SavePayload {
            title: draft.title.clone(),
            description: draft.description.clone(),
            first_name: draft.first_name.clone(),
            last_name: draft.last_name.clone(),
            job_title: draft.job_title.clone(),
            email: draft.email.clone(),
            phone: draft.phone.clone(),
            city: draft.city.clone(),
            country: draft.country.clone(),
            linkedin: draft.linkedin.clone(),
            github: draft.github.clone(),
            summary: draft.summary.clone(),
            color_hex: draft.color_hex.clone(),
            border_style: draft.border_style.clone(),
            work_experiences: draft.work_experiences.clone(),
            educations: draft.educations.clone(),
            projects: draft.projects.clone(),
            skills: draft.skills.clone(),
            photo,
        }
    }
}

impl ResumeDraft {
    /// Maps persisted rows back into the editable draft shape.
    /// Mirror of the save direction: dates become `YYYY-MM-DD` strings and
    /// the stored photo URL becomes a `Photo::Stored` reference.
    pub fn from_rows(
        resume: &ResumeRow,
        work_experiences: &[WorkExperienceRow],
        educations: &[EducationRow],
        projects: &[ProjectRow],
    ) -> Self {
        ResumeDraft {
            id: Some(resume.id),
            title: resume.title.clone(),
            description: resume.description.clone(),
            first_name: resume.first_name.clone(),
            last_name: resume.last_name.clone(),
            job_title: resume.job_title.clone(),
            email: resume.email.clone(),
            phone: resume.phone.clone(),
            city: resume.city.clone(),
            country: resume.country.clone(),
            linkedin: resume.linkedin.clone(),
            github: resume.github.clone(),
            summary: resume.summary.clone(),
            color_hex: resume.color_hex.clone(),
            border_style: resume.border_style.clone(),
            work_experiences: work_experiences
                .iter()
                .map(|row| WorkExperienceDraft {
                    position: row.position.clone(),
                    company: row.company.clone(),
                    start_date: row.start_date.map(|d| d.to_string()),
                    end_date: row.end_date.map(|d| d.to_string()),
                    description: row.description.clone(),
                })
                .collect(),
            educations: educations
                .iter()
                .map(|row| EducationDraft {
                    degree: row.degree.clone(),
                    college: row.college.clone(),
                    school: row.school.clone(),
                    start_date: row.start_date.map(|d| d.to_string()),
                    end_date: row.end_date.map(|d| d.to_string()),
                })
                .collect(),
            projects: projects
                .iter()
                .map(|row| ProjectDraft {
                    title: row.title.clone(),
                    description: row.description.clone(),
                    tech_stack: row.tech_stack.clone(),
                    start_date: row.start_date.map(|d| d.to_string()),
                    end_date: row.end_date.map(|d| d.to_string()),
                    project_url: row.project_url.clone(),
                })
                .collect(),
            skills: resume.skills.clone(),
            photo: resume
                .photo_url
                .clone()
                .map(|url| Photo::Stored { url }),
        }
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
