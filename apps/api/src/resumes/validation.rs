//! Save-payload validation and normalization: whitespace trimming, date
//! format checks, and photo upload limits. Runs before any storage side
//! effect so a rejected payload never leaves a half-applied save behind.

use chrono::NaiveDate;

use crate::draft::model::{PhotoPatch, SavePayload};
use crate::errors::AppError;

pub const MAX_PHOTO_BYTES: usize = 4 * 1024 * 1024;

/// Trims every free-text field; values that trim to empty become absent.
pub fn normalize_payload(mut payload: SavePayload) -> SavePayload {
    for field in [
        &mut payload.title,
        &mut payload.description,
        &mut payload.first_name,
        &mut payload.last_name,
        &mut payload.job_title,
        &mut payload.email,
        &mut payload.phone,
        &mut payload.city,
        &mut payload.country,
        &mut payload.linkedin,
        &mut payload.github,
        &mut payload.summary,
        &mut payload.color_hex,
        &mut payload.border_style,
    ] {
        trim_in_place(field);
    }

    for exp in &mut payload.work_experiences {
        trim_in_place(&mut exp.position);
        trim_in_place(&mut exp.company);
        trim_in_place(&mut exp.start_date);
        trim_in_place(&mut exp.end_date);
        trim_in_place(&mut exp.description);
    }
    for edu in &mut payload.educations {
        trim_in_place(&mut edu.degree);
        trim_in_place(&mut edu.college);
        trim_in_place(&mut edu.school);
        trim_in_place(&mut edu.start_date);
        trim_in_place(&mut edu.end_date);
    }
    for project in &mut payload.projects {
        trim_in_place(&mut project.title);
        trim_in_place(&mut project.description);
        trim_in_place(&mut project.tech_stack);
        trim_in_place(&mut project.start_date);
        trim_in_place(&mut project.end_date);
        trim_in_place(&mut project.project_url);
    }

    payload.skills = payload
        .skills
        .into_iter()
        .map(|skill| skill.trim().to_string())
        .filter(|skill| !skill.is_empty())
        .collect();

    payload
}

/// Checks every date field and the photo patch. Called after
/// [`normalize_payload`].
pub fn validate_payload(payload: &SavePayload) -> Result<(), AppError> {
    for exp in &payload.work_experiences {
        check_date(exp.start_date.as_deref(), "work experience start date")?;
        check_date(exp.end_date.as_deref(), "work experience end date")?;
    }
    for edu in &payload.educations {
        check_date(edu.start_date.as_deref(), "education start date")?;
        check_date(edu.end_date.as_deref(), "education end date")?;
    }
    for project in &payload.projects {
        check_date(project.start_date.as_deref(), "project start date")?;
        check_date(project.end_date.as_deref(), "project end date")?;
    }

    if let Some(PhotoPatch::Upload {
        content_type,
        size_bytes,
        data,
        ..
    }) = &payload.photo
    {
        validate_photo_upload(content_type, *size_bytes, data.len())?;
    }

    Ok(())
}

/// Photo uploads must be images of at most [`MAX_PHOTO_BYTES`], and the
/// declared size must match the payload actually sent.
pub fn validate_photo_upload(
    content_type: &str,
    declared_size: u64,
    actual_size: usize,
) -> Result<(), AppError> {
    if !content_type.starts_with("image/") {
        return Err(AppError::Validation("Photo must be an image file".to_string()));
    }
    if actual_size > MAX_PHOTO_BYTES {
        return Err(AppError::Validation(
            "Photo must be less than 4MB".to_string(),
        ));
    }
    if declared_size != actual_size as u64 {
        return Err(AppError::Validation(
            "Photo size does not match the uploaded data".to_string(),
        ));
    }
    Ok(())
}

/// Parses an optional `YYYY-MM-DD` draft date. Empty and absent are both
/// treated as no date.
pub fn parse_date_opt(value: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match value {
        None => Ok(None),
        Some(raw) if raw.is_empty() => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Invalid date '{raw}', expected YYYY-MM-DD"))),
    }
}

fn check_date(value: Option<&str>, field: &str) -> Result<(), AppError> {
    parse_date_opt(value)
        .map(|_| ())
        .map_err(|_| AppError::Validation(format!("Invalid {field}, expected YYYY-MM-DD")))
}

fn trim_in_place(field: &mut Option<String>) {
    if let Some(value) = field.take() {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            *field = Some(trimmed.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::model::WorkExperienceDraft;
    use bytes::Bytes;

    #[test]
    fn test_normalize_trims_and_drops_empty_strings() {
        let payload = SavePayload {
            first_name: Some("  Ada  ".to_string()),
            last_name: Some("   ".to_string()),
            skills: vec!["  Rust ".to_string(), "".to_string()],
            ..Default::default()
        };
        let normalized = normalize_payload(payload);
        assert_eq!(normalized.first_name.as_deref(), Some("Ada"));
        assert!(normalized.last_name.is_none());
        assert_eq!(normalized.skills, vec!["Rust".to_string()]);
    }

    #[test]
    fn test_malformed_date_is_rejected() {
        let payload = SavePayload {
            work_experiences: vec![WorkExperienceDraft {
                start_date: Some("March 2021".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(matches!(
            validate_payload(&payload),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_valid_dates_pass() {
        let payload = SavePayload {
            work_experiences: vec![WorkExperienceDraft {
                start_date: Some("2021-03-01".to_string()),
                end_date: None,
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(validate_payload(&payload).is_ok());
    }

    #[test]
    fn test_non_image_photo_is_rejected() {
        let err = validate_photo_upload("application/pdf", 3, 3).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_oversized_photo_is_rejected() {
        let size = MAX_PHOTO_BYTES + 1;
        let err = validate_photo_upload("image/png", size as u64, size).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        assert!(validate_photo_upload("image/png", 10, 9).is_err());
    }

    #[test]
    fn test_photo_patch_inside_payload_is_checked() {
        let payload = SavePayload {
            photo: Some(PhotoPatch::Upload {
                file_name: "cv.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                size_bytes: 4,
                modified_ms: 0,
                data: Bytes::from_static(b"%PDF"),
            }),
            ..Default::default()
        };
        assert!(validate_payload(&payload).is_err());
    }

    #[test]
    fn test_parse_date_opt_handles_all_shapes() {
        assert_eq!(parse_date_opt(None).unwrap(), None);
        assert_eq!(parse_date_opt(Some("")).unwrap(), None);
        assert_eq!(
            parse_date_opt(Some("2024-02-29")).unwrap(),
            Some(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert!(parse_date_opt(Some("2023-02-29")).is_err());
    }
}
