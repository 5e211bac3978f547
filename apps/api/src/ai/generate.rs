//! AI drafting: builds prompts from the user's resume data, calls the LLM,
//! and parses the labeled-line output back into draft entries.
//!
//! The model is instructed to answer in a fixed `Label: value` format;
//! fields that fail to parse (including dates not matching `YYYY-MM-DD`)
//! are simply omitted rather than guessed.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::ai::prompts::{PROJECT_SYSTEM, SUMMARY_SYSTEM, WORK_EXPERIENCE_SYSTEM};
use crate::draft::model::{EducationDraft, ProjectDraft, WorkExperienceDraft};
use crate::errors::AppError;
use crate::llm_client::LlmClient;

/// Every labeled line any of the prompts can produce. Block values (the
/// multi-line `Description:`) run until the next known label.
const FIELD_LABELS: &[&str] = &[
    "Job title:",
    "Company:",
    "Start date:",
    "End date:",
    "Description:",
    "Title:",
    "Tech stack:",
    "Project URL:",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SummaryInput {
    pub job_title: Option<String>,
    pub work_experiences: Vec<WorkExperienceDraft>,
    pub educations: Vec<EducationDraft>,
    pub projects: Vec<ProjectDraft>,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkExperienceInput {
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectInput {
    pub description: String,
}

pub async fn generate_summary(llm: &LlmClient, input: &SummaryInput) -> Result<String, AppError> {
    let user_message = build_summary_message(input);
    let text = llm
        .complete(SUMMARY_SYSTEM, &user_message)
        .await
        .map_err(|e| AppError::Llm(format!("Summary generation failed: {e}")))?;
    Ok(strip_summary_preamble(&text).to_string())
}

pub async fn generate_work_experience(
    llm: &LlmClient,
    input: &WorkExperienceInput,
) -> Result<WorkExperienceDraft, AppError> {
    let description = input.description.trim();
    if description.chars().count() < 20 {
        return Err(AppError::Validation(
            "Description must be at least 20 characters long".to_string(),
        ));
    }

    let user_message = format!(
        "Please provide a work experience entry from this description:\n{description}"
    );
    let text = llm
        .complete(WORK_EXPERIENCE_SYSTEM, &user_message)
        .await
        .map_err(|e| AppError::Llm(format!("Work experience generation failed: {e}")))?;
    Ok(parse_work_experience(&text))
}

pub async fn generate_project(
    llm: &LlmClient,
    input: &ProjectInput,
) -> Result<ProjectDraft, AppError> {
    let description = input.description.trim();
    if description.chars().count() < 10 {
        return Err(AppError::Validation(
            "Description must be at least 10 characters long".to_string(),
        ));
    }

    let user_message = format!(
        "Please generate a project entry based on this description:\n\n\"{description}\""
    );
    let text = llm
        .complete(PROJECT_SYSTEM, &user_message)
        .await
        .map_err(|e| AppError::Llm(format!("Project generation failed: {e}")))?;
    Ok(parse_project(&text))
}

// ────────────────────────────────────────────────────────────────────────────
// Prompt assembly
// ────────────────────────────────────────────────────────────────────────────

fn build_summary_message(input: &SummaryInput) -> String {
    let mut message = String::from("Please generate a professional resume summary from this data:\n\n");

    message.push_str(&format!(
        "Job title: {}\n\n",
        input.job_title.as_deref().unwrap_or("N/A")
    ));

    message.push_str("Work experience:\n");
    if input.work_experiences.is_empty() {
        message.push_str("N/A\n");
    }
    for exp in &input.work_experiences {
        message.push_str(&format!(
            "- Position: {} at {} from {} to {}\n  Description: {}\n\n",
            exp.position.as_deref().unwrap_or("N/A"),
            exp.company.as_deref().unwrap_or("N/A"),
            exp.start_date.as_deref().unwrap_or("N/A"),
            exp.end_date.as_deref().unwrap_or("Present"),
            exp.description.as_deref().unwrap_or("N/A"),
        ));
    }

    message.push_str("\nEducation:\n");
    if input.educations.is_empty() {
        message.push_str("N/A\n");
    }
    for edu in &input.educations {
        message.push_str(&format!(
            "- Degree: {} from {} from {} to {}\n\n",
            edu.degree.as_deref().unwrap_or("N/A"),
            edu.college
                .as_deref()
                .or(edu.school.as_deref())
                .unwrap_or("N/A"),
            edu.start_date.as_deref().unwrap_or("N/A"),
            edu.end_date.as_deref().unwrap_or("Present"),
        ));
    }

    message.push_str("\nProjects:\n");
    if input.projects.is_empty() {
        message.push_str("N/A\n");
    }
    for project in &input.projects {
        message.push_str(&format!(
            "- Title: {}\n  Description: {}\n  Tech stack: {}\n  Duration: {} to {}\n  Link: {}\n\n",
            project.title.as_deref().unwrap_or("N/A"),
            project.description.as_deref().unwrap_or("N/A"),
            project.tech_stack.as_deref().unwrap_or("N/A"),
            project.start_date.as_deref().unwrap_or("N/A"),
            project.end_date.as_deref().unwrap_or("Present"),
            project.project_url.as_deref().unwrap_or("N/A"),
        ));
    }

    message.push_str("\nSkills:\n");
    if input.skills.is_empty() {
        message.push_str("N/A");
    } else {
        message.push_str(&input.skills.join(", "));
    }

    message
}

// ────────────────────────────────────────────────────────────────────────────
// Output parsing
// ────────────────────────────────────────────────────────────────────────────

/// Models often preface the summary with "Here is a professional summary:".
/// Strip that first-line preamble; everything else is returned trimmed.
pub fn strip_summary_preamble(text: &str) -> &str {
    let trimmed = text.trim();
    let first_line_end = trimmed.find('\n').unwrap_or(trimmed.len());
    let first_line = &trimmed[..first_line_end];

    if starts_with_ci(first_line, "here") {
        if let Some(pos) = find_ci(first_line, "summary:") {
            return trimmed[pos + "summary:".len()..].trim();
        }
    }
    trimmed
}

pub fn parse_work_experience(text: &str) -> WorkExperienceDraft {
    WorkExperienceDraft {
        position: field_value(text, "Job title:"),
        company: field_value(text, "Company:"),
        start_date: field_value(text, "Start date:").filter(|d| is_iso_date(d)),
        end_date: field_value(text, "End date:").filter(|d| is_iso_date(d)),
        description: block_value(text, "Description:"),
    }
}

pub fn parse_project(text: &str) -> ProjectDraft {
    ProjectDraft {
        title: field_value(text, "Title:"),
        description: block_value(text, "Description:"),
        tech_stack: field_value(text, "Tech stack:"),
        start_date: field_value(text, "Start date:").filter(|d| is_iso_date(d)),
        end_date: field_value(text, "End date:").filter(|d| is_iso_date(d)),
        project_url: field_value(text, "Project URL:"),
    }
}

/// Single-line field: the remainder of the first line starting with `label`.
fn field_value(text: &str, label: &str) -> Option<String> {
    text.lines()
        .find_map(|line| line.trim_start().strip_prefix(label))
        .map(|rest| rest.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Multi-line field: everything after the `label` line up to the next known
/// label line.
fn block_value(text: &str, label: &str) -> Option<String> {
    let mut lines = text.lines();
    let mut collected: Vec<&str> = Vec::new();

    for line in lines.by_ref() {
        if let Some(rest) = line.trim_start().strip_prefix(label) {
            let rest = rest.trim();
            if !rest.is_empty() {
                collected.push(rest);
            }
            break;
        }
    }

    for line in lines {
        let trimmed = line.trim_start();
        if FIELD_LABELS.iter().any(|l| trimmed.starts_with(l)) {
            break;
        }
        collected.push(line);
    }

    // Drop trailing blank lines picked up before the end of the text.
    while collected.last().is_some_and(|l| l.trim().is_empty()) {
        collected.pop();
    }

    if collected.is_empty() {
        None
    } else {
        Some(collected.join("\n").trim().to_string())
    }
}

fn is_iso_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

fn starts_with_ci(haystack: &str, prefix: &str) -> bool {
    haystack.len() >= prefix.len()
        && haystack.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// ASCII case-insensitive substring search. Returns a byte offset that is
/// always a char boundary because the needle is ASCII.
fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_summary_preamble_removes_here_line() {
        let raw = "Here is a professional summary: Seasoned engineer with 8 years of experience.";
        assert_eq!(
            strip_summary_preamble(raw),
            "Seasoned engineer with 8 years of experience."
        );
    }

    #[test]
    fn test_strip_summary_preamble_case_insensitive() {
        let raw = "here's your SUMMARY: Data-driven analyst.";
        assert_eq!(strip_summary_preamble(raw), "Data-driven analyst.");
    }

    #[test]
    fn test_strip_summary_preamble_keeps_clean_output() {
        let raw = "  Seasoned engineer with 8 years of experience.  ";
        assert_eq!(
            strip_summary_preamble(raw),
            "Seasoned engineer with 8 years of experience."
        );
    }

    #[test]
    fn test_strip_summary_preamble_ignores_summary_in_body() {
        // "summary:" appearing past the first line must not truncate anything.
        let raw = "Hereditary traits aside, a strong engineer.\nCareer summary: 8 years.";
        assert_eq!(strip_summary_preamble(raw), raw.trim());
    }

    #[test]
    fn test_parse_work_experience_full_response() {
        let text = "\
Job title: Senior Backend Engineer
Company: Initech
Start date: 2021-03-01
End date: 2023-11-30
Description: - Built the billing pipeline
- Cut deploy times by 40%";

        let parsed = parse_work_experience(text);
        assert_eq!(parsed.position.as_deref(), Some("Senior Backend Engineer"));
        assert_eq!(parsed.company.as_deref(), Some("Initech"));
        assert_eq!(parsed.start_date.as_deref(), Some("2021-03-01"));
        assert_eq!(parsed.end_date.as_deref(), Some("2023-11-30"));
        assert_eq!(
            parsed.description.as_deref(),
            Some("- Built the billing pipeline\n- Cut deploy times by 40%")
        );
    }

    #[test]
    fn test_parse_work_experience_omits_missing_and_bad_dates() {
        let text = "\
Job title: Engineer
Start date: March 2021
Description: Did things";

        let parsed = parse_work_experience(text);
        assert_eq!(parsed.position.as_deref(), Some("Engineer"));
        assert!(parsed.company.is_none());
        // Non-ISO date is dropped rather than adopted.
        assert!(parsed.start_date.is_none());
        assert!(parsed.end_date.is_none());
    }

    #[test]
    fn test_parse_project_description_stops_at_next_label() {
        let text = "\
Title: Flight Tracker
Description: Real-time tracker for small aircraft.
Built with live radar feeds.
Tech stack: Rust, Postgres
Project URL: https://example.com/tracker";

        let parsed = parse_project(text);
        assert_eq!(parsed.title.as_deref(), Some("Flight Tracker"));
        assert_eq!(
            parsed.description.as_deref(),
            Some("Real-time tracker for small aircraft.\nBuilt with live radar feeds.")
        );
        assert_eq!(parsed.tech_stack.as_deref(), Some("Rust, Postgres"));
        assert_eq!(
            parsed.project_url.as_deref(),
            Some("https://example.com/tracker")
        );
    }

    #[test]
    fn test_parse_project_empty_response_yields_empty_entry() {
        let parsed = parse_project("I cannot help with that.");
        assert_eq!(parsed, ProjectDraft::default());
    }

    #[test]
    fn test_summary_message_includes_data_and_fallbacks() {
        let input = SummaryInput {
            job_title: Some("Platform Engineer".to_string()),
            skills: vec!["Rust".to_string(), "Postgres".to_string()],
            ..Default::default()
        };
        let message = build_summary_message(&input);
        assert!(message.contains("Job title: Platform Engineer"));
        assert!(message.contains("Rust, Postgres"));
        // Empty sections fall back to N/A.
        assert!(message.contains("Work experience:\nN/A"));
    }
}
