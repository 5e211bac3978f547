//! Resume persistence — the save operation the auto-saver drives, plus
//! list / get / delete.
//!
//! Flow on save: normalize + validate → permission check → photo patch
//! (S3) → upsert resume row + replace child rows in one transaction.
//! The photo patch runs before the transaction so a failed row write never
//! leaves the stored URL pointing at a deleted object; an uploaded object
//! orphaned by a later row failure is only unreferenced garbage.

use aws_sdk_s3::primitives::ByteStream;
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::billing::permissions::{can_create_resume, can_use_customization};
use crate::billing::subscription::get_user_subscription_level;
use crate::config::Config;
use crate::draft::model::{PhotoPatch, SavePayload};
use crate::errors::AppError;
use crate::models::resume::{EducationRow, ProjectRow, ResumeRow, WorkExperienceRow};
use crate::resumes::validation::{normalize_payload, parse_date_opt, validate_payload};

/// A resume row together with its ordered child rows.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResumeDetail {
    pub resume: ResumeRow,
    pub work_experiences: Vec<WorkExperienceRow>,
    pub educations: Vec<EducationRow>,
    pub projects: Vec<ProjectRow>,
}

// ────────────────────────────────────────────────────────────────────────────
// Save
// ────────────────────────────────────────────────────────────────────────────

/// Persists a draft payload, creating a new resume when `resume_id` is
/// absent, and returns the persisted identifier.
pub async fn save_resume(
    pool: &PgPool,
    s3: &aws_sdk_s3::Client,
    config: &Config,
    user_id: &str,
    resume_id: Option<Uuid>,
    payload: SavePayload,
) -> Result<Uuid, AppError> {
    let payload = normalize_payload(payload);
    validate_payload(&payload)?;

    let level = get_user_subscription_level(
        pool,
        &config.stripe_price_id_premium,
        &config.stripe_price_id_premium_plus,
        user_id,
    )
    .await?;

    let existing = match resume_id {
        Some(id) => Some(fetch_owned_resume(pool, user_id, id).await?),
        None => None,
    };

    if existing.is_none() {
        let count = count_resumes(pool, user_id).await?;
        if !can_create_resume(level, count as usize) {
            return Err(AppError::Forbidden(
                "Maximum resume count reached for this subscription level".to_string(),
            ));
        }
    }

    let id = existing
        .as_ref()
        .map(|row| row.id)
        .unwrap_or_else(Uuid::new_v4);

    // Photo patch (S3) before any row write.
    let previous_url = existing.as_ref().and_then(|row| row.photo_url.clone());
    let photo_url = apply_photo_patch(s3, config, id, previous_url, payload.photo.as_ref()).await?;

    // Styling fields are premium+ only; everyone else keeps the stored values.
    let (color_hex, border_style) = if can_use_customization(level) {
        (payload.color_hex.clone(), payload.border_style.clone())
    } else {
        if payload.color_hex.is_some() || payload.border_style.is_some() {
            debug!("Ignoring customization fields for user {user_id} (level {level:?})");
        }
        match &existing {
            Some(row) => (row.color_hex.clone(), row.border_style.clone()),
            None => (None, None),
        }
    };

    let mut tx = pool.begin().await?;

    if existing.is_some() {
        sqlx::query(
            r#"
            UPDATE resumes SET
                title = $1, description = $2, photo_url = $3, color_hex = $4,
                border_style = $5, summary = $6, first_name = $7, last_name = $8,
                job_title = $9, email = $10, phone = $11, city = $12, country = $13,
                linkedin = $14, github = $15, skills = $16, updated_at = NOW()
            WHERE id = $17 AND user_id = $18
            "#,
        )
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(&photo_url)
        .bind(&color_hex)
        .bind(&border_style)
        .bind(&payload.summary)
        .bind(&payload.first_name)
        .bind(&payload.last_name)
        .bind(&payload.job_title)
        .bind(&payload.email)
        .bind(&payload.phone)
        .bind(&payload.city)
        .bind(&payload.country)
        .bind(&payload.linkedin)
        .bind(&payload.github)
        .bind(&payload.skills)
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    } else {
        sqlx::query(
            r#"
            INSERT INTO resumes
                (id, user_id, title, description, photo_url, color_hex, border_style,
                 summary, first_name, last_name, job_title, email, phone, city, country,
                 linkedin, github, skills)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(&photo_url)
        .bind(&color_hex)
        .bind(&border_style)
        .bind(&payload.summary)
        .bind(&payload.first_name)
        .bind(&payload.last_name)
        .bind(&payload.job_title)
        .bind(&payload.email)
        .bind(&payload.phone)
        .bind(&payload.city)
        .bind(&payload.country)
        .bind(&payload.linkedin)
        .bind(&payload.github)
        .bind(&payload.skills)
        .execute(&mut *tx)
        .await?;
    }

    // Child rows are replaced wholesale, preserving list order.
    sqlx::query("DELETE FROM work_experiences WHERE resume_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    for (index, exp) in payload.work_experiences.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO work_experiences
                (id, resume_id, position, company, start_date, end_date, description, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(&exp.position)
        .bind(&exp.company)
        .bind(parse_date_opt(exp.start_date.as_deref())?)
        .bind(parse_date_opt(exp.end_date.as_deref())?)
        .bind(&exp.description)
        .bind(index as i32)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("DELETE FROM educations WHERE resume_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    for (index, edu) in payload.educations.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO educations
                (id, resume_id, degree, college, school, start_date, end_date, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(&edu.degree)
        .bind(&edu.college)
        .bind(&edu.school)
        .bind(parse_date_opt(edu.start_date.as_deref())?)
        .bind(parse_date_opt(edu.end_date.as_deref())?)
        .bind(index as i32)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("DELETE FROM projects WHERE resume_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    for (index, project) in payload.projects.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO projects
                (id, resume_id, title, description, tech_stack, start_date, end_date,
                 project_url, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(id)
        .bind(&project.title)
        .bind(&project.description)
        .bind(&project.tech_stack)
        .bind(parse_date_opt(project.start_date.as_deref())?)
        .bind(parse_date_opt(project.end_date.as_deref())?)
        .bind(&project.project_url)
        .bind(index as i32)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    info!("Saved resume {id} for user {user_id}");
    Ok(id)
}

/// Applies a photo patch and returns the photo URL to store. `None` patch
/// means unchanged.
async fn apply_photo_patch(
    s3: &aws_sdk_s3::Client,
    config: &Config,
    resume_id: Uuid,
    previous_url: Option<String>,
    patch: Option<&PhotoPatch>,
) -> Result<Option<String>, AppError> {
    match patch {
        None => Ok(previous_url),
        Some(PhotoPatch::Stored { url }) => Ok(Some(url.clone())),
        Some(PhotoPatch::Remove) => {
            if let Some(url) = &previous_url {
                delete_photo_object(s3, config, url).await;
            }
            Ok(None)
        }
        Some(PhotoPatch::Upload {
            file_name,
            content_type,
            data,
            ..
        }) => {
            if let Some(url) = &previous_url {
                delete_photo_object(s3, config, url).await;
            }

            let extension = content_type.strip_prefix("image/").unwrap_or("bin");
            let key = format!("photos/{resume_id}/{}.{extension}", Uuid::new_v4());
            s3.put_object()
                .bucket(&config.s3_bucket)
                .key(&key)
                .body(ByteStream::from(data.to_vec()))
                .content_type(content_type)
                .send()
                .await
                .map_err(|e| AppError::S3(format!("Photo upload failed: {e}")))?;

            info!(
                "Uploaded photo '{}' to s3://{}/{} for resume {}",
                file_name, config.s3_bucket, key, resume_id
            );
            Ok(Some(photo_public_url(config, &key)))
        }
    }
}

/// Public URL for a stored photo object.
fn photo_public_url(config: &Config, key: &str) -> String {
    format!(
        "{}/{}/{}",
        config.s3_endpoint.trim_end_matches('/'),
        config.s3_bucket,
        key
    )
}

/// Best-effort deletion of a stored photo object. A failure here only leaks
/// an orphaned object, so it is logged and swallowed.
async fn delete_photo_object(s3: &aws_sdk_s3::Client, config: &Config, url: &str) {
    let marker = format!("/{}/", config.s3_bucket);
    let Some((_, key)) = url.split_once(&marker) else {
        warn!("Stored photo URL '{url}' does not reference bucket {}", config.s3_bucket);
        return;
    };
    if let Err(err) = s3
        .delete_object()
        .bucket(&config.s3_bucket)
        .key(key)
        .send()
        .await
    {
        warn!("Failed to delete photo object {key}: {err}");
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Read / delete
// ────────────────────────────────────────────────────────────────────────────

pub async fn count_resumes(pool: &PgPool, user_id: &str) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resumes WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// All of a user's resumes with child rows, most recently updated first.
pub async fn list_resumes(pool: &PgPool, user_id: &str) -> Result<Vec<ResumeDetail>, AppError> {
    let resumes: Vec<ResumeRow> =
        sqlx::query_as("SELECT * FROM resumes WHERE user_id = $1 ORDER BY updated_at DESC")
            .bind(user_id)
            .fetch_all(pool)
            .await?;

    let ids: Vec<Uuid> = resumes.iter().map(|row| row.id).collect();

    let work_experiences: Vec<WorkExperienceRow> = sqlx::query_as(
        "SELECT * FROM work_experiences WHERE resume_id = ANY($1) ORDER BY sort_order",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;
    let educations: Vec<EducationRow> =
        sqlx::query_as("SELECT * FROM educations WHERE resume_id = ANY($1) ORDER BY sort_order")
            .bind(&ids)
            .fetch_all(pool)
            .await?;
    let projects: Vec<ProjectRow> =
        sqlx::query_as("SELECT * FROM projects WHERE resume_id = ANY($1) ORDER BY sort_order")
            .bind(&ids)
            .fetch_all(pool)
            .await?;

    Ok(resumes
        .into_iter()
        .map(|resume| {
            let id = resume.id;
            ResumeDetail {
                resume,
                work_experiences: work_experiences
                    .iter()
                    .filter(|row| row.resume_id == id)
                    .cloned()
                    .collect(),
                educations: educations
                    .iter()
                    .filter(|row| row.resume_id == id)
                    .cloned()
                    .collect(),
                projects: projects
                    .iter()
                    .filter(|row| row.resume_id == id)
                    .cloned()
                    .collect(),
            }
        })
        .collect())
}

pub async fn get_resume(
    pool: &PgPool,
    user_id: &str,
    resume_id: Uuid,
) -> Result<ResumeDetail, AppError> {
    let resume = fetch_owned_resume(pool, user_id, resume_id).await?;

    let work_experiences: Vec<WorkExperienceRow> = sqlx::query_as(
        "SELECT * FROM work_experiences WHERE resume_id = $1 ORDER BY sort_order",
    )
    .bind(resume_id)
    .fetch_all(pool)
    .await?;
    let educations: Vec<EducationRow> =
        sqlx::query_as("SELECT * FROM educations WHERE resume_id = $1 ORDER BY sort_order")
            .bind(resume_id)
            .fetch_all(pool)
            .await?;
    let projects: Vec<ProjectRow> =
        sqlx::query_as("SELECT * FROM projects WHERE resume_id = $1 ORDER BY sort_order")
            .bind(resume_id)
            .fetch_all(pool)
            .await?;

    Ok(ResumeDetail {
        resume,
        work_experiences,
        educations,
        projects,
    })
}

/// Deletes a resume, its child rows, and its stored photo.
pub async fn delete_resume(
    pool: &PgPool,
    s3: &aws_sdk_s3::Client,
    config: &Config,
    user_id: &str,
    resume_id: Uuid,
) -> Result<(), AppError> {
    let resume = fetch_owned_resume(pool, user_id, resume_id).await?;

    if let Some(url) = &resume.photo_url {
        delete_photo_object(s3, config, url).await;
    }

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM work_experiences WHERE resume_id = $1")
        .bind(resume_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM educations WHERE resume_id = $1")
        .bind(resume_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM projects WHERE resume_id = $1")
        .bind(resume_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM resumes WHERE id = $1 AND user_id = $2")
        .bind(resume_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!("Deleted resume {resume_id} for user {user_id}");
    Ok(())
}

async fn fetch_owned_resume(
    pool: &PgPool,
    user_id: &str,
    resume_id: Uuid,
) -> Result<ResumeRow, AppError> {
    let resume: Option<ResumeRow> =
        sqlx::query_as("SELECT * FROM resumes WHERE id = $1 AND user_id = $2")
            .bind(resume_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    resume.ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))
}
