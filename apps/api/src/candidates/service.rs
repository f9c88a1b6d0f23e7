//! Candidate lifecycle: validation first, then persistence and résumé storage.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::candidates::file_store::{FileStore, ResumeFile};
use crate::candidates::models::{
    CandidateList, CandidatePatch, CreateCandidateRequest, EducationInput, NewCandidate,
    NewEducation, NewWorkExperience, PageRequest, Pagination, UpdateCandidateRequest,
    UploadedFile, WorkExperienceInput,
};
use crate::candidates::repository::CandidateRepository;
use crate::candidates::validation::{self, ValidationError, ValidationKind};
use crate::errors::AppError;
use crate::models::candidate::{CandidateAggregate, ResumeRef};

const MIN_NAME_LENGTH: usize = 2;

#[derive(Clone)]
pub struct CandidateService {
    repository: Arc<dyn CandidateRepository>,
    files: FileStore,
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Candidate {id} not found"))
}

impl CandidateService {
    pub fn new(repository: Arc<dyn CandidateRepository>, files: FileStore) -> Self {
        CandidateService { repository, files }
    }

    pub async fn create(
        &self,
        request: CreateCandidateRequest,
    ) -> Result<CandidateAggregate, AppError> {
        let candidate = new_candidate(request)?;
        let aggregate = self.repository.insert(candidate).await?;
        info!("Created candidate {}", aggregate.candidate.id);
        Ok(aggregate)
    }

    pub async fn list(&self, request: PageRequest) -> Result<CandidateList, AppError> {
        let page = self
            .repository
            .page(request.offset(), request.limit())
            .await?;
        Ok(CandidateList {
            candidates: page.candidates,
            pagination: Pagination::new(request, page.total),
        })
    }

    pub async fn get_by_id(&self, id: i32) -> Result<CandidateAggregate, AppError> {
        self.repository
            .find(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Applies only the supplied fields. Supplied child collections replace
    /// the stored ones; an empty list clears them.
    pub async fn update(
        &self,
        id: i32,
        request: UpdateCandidateRequest,
    ) -> Result<CandidateAggregate, AppError> {
        let patch = candidate_patch(request)?;
        let aggregate = self
            .repository
            .update(id, patch)
            .await?
            .ok_or_else(|| not_found(id))?;
        info!("Updated candidate {id}");
        Ok(aggregate)
    }

    /// Removes the candidate with its children and returns the last state it
    /// had. A stored résumé is removed best-effort afterwards.
    pub async fn delete(&self, id: i32) -> Result<CandidateAggregate, AppError> {
        let snapshot = self
            .repository
            .delete(id)
            .await?
            .ok_or_else(|| not_found(id))?;
        if let Some(resume) = &snapshot.candidate.resume {
            self.files.delete(&resume.file_path).await;
        }
        info!("Deleted candidate {id}");
        Ok(snapshot)
    }

    pub async fn attach_resume(&self, id: i32, file: UploadedFile) -> Result<ResumeRef, AppError> {
        let existing = self.get_by_id(id).await?;
        validation::valid_file(Some(&file))?;

        let stored = self.files.save(&file, id).await?;

        // The file is already on disk; drop it again if the record cannot
        // point at it.
        match self.repository.set_resume(id, stored.clone()).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                self.files.delete(&stored.file_path).await;
                return Err(not_found(id));
            }
            Err(err) => {
                self.files.delete(&stored.file_path).await;
                return Err(err.into());
            }
        }

        if let Some(previous) = existing.candidate.resume {
            if previous.file_path != stored.file_path {
                self.files.delete(&previous.file_path).await;
            }
        }

        info!("Attached résumé {} to candidate {id}", stored.file_name);
        Ok(stored)
    }

    /// Returns the stored bytes under the MIME type and file name recorded
    /// on the candidate.
    pub async fn fetch_resume(&self, id: i32) -> Result<ResumeFile, AppError> {
        let aggregate = self.get_by_id(id).await?;
        let resume = aggregate
            .candidate
            .resume
            .ok_or(AppError::ResumeMissing(id))?;

        let file = self.files.read(&resume.file_path).await.map_err(|e| {
            warn!("Résumé for candidate {id} is recorded but unreadable");
            AppError::from(e)
        })?;

        Ok(ResumeFile {
            mime_type: resume.mime_type,
            file_name: resume.file_name,
            ..file
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Input normalization
// ────────────────────────────────────────────────────────────────────────────

fn person_name(value: Option<String>, label: &str) -> Result<String, ValidationError> {
    validation::require_non_empty(value.as_deref(), label)?;
    let value = value.unwrap_or_default();
    validation::min_length(&value, MIN_NAME_LENGTH, label)?;
    Ok(value.trim().to_string())
}

fn email_address(value: Option<String>) -> Result<String, ValidationError> {
    validation::valid_email(value.as_deref())?;
    Ok(value.unwrap_or_default())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(value: Option<String>, label: &str) -> Result<String, ValidationError> {
    validation::require_non_empty(value.as_deref(), label)?;
    Ok(value.unwrap_or_default())
}

/// Checks both endpoints and their order, then parses them.
fn date_span(
    start: Option<String>,
    end: Option<String>,
) -> Result<(Option<NaiveDate>, Option<NaiveDate>), ValidationError> {
    validation::valid_date_range(start.as_deref(), end.as_deref())?;
    validation::valid_date(start.as_deref(), "Start date")?;
    validation::valid_date(end.as_deref(), "End date")?;
    let parse = |value: Option<String>| {
        non_blank(value).and_then(|v| validation::parse_calendar_date(&v))
    };
    Ok((parse(start), parse(end)))
}

fn new_education(entry: EducationInput) -> Result<NewEducation, ValidationError> {
    let section = |err: ValidationError| err.within("Education");
    let institution = required(entry.institution, "Institution").map_err(section)?;
    let degree = required(entry.degree, "Degree").map_err(section)?;
    let (start_date, end_date) = date_span(entry.start_date, entry.end_date).map_err(section)?;
    Ok(NewEducation {
        institution,
        degree,
        field_of_study: non_blank(entry.field_of_study),
        start_date,
        end_date,
        is_current: entry.is_current.unwrap_or(false),
    })
}

fn new_work_experience(entry: WorkExperienceInput) -> Result<NewWorkExperience, ValidationError> {
    let section = |err: ValidationError| err.within("Work experience");
    let company = required(entry.company, "Company").map_err(section)?;
    let position = required(entry.position, "Position").map_err(section)?;
    let (start_date, end_date) = date_span(entry.start_date, entry.end_date).map_err(section)?;
    Ok(NewWorkExperience {
        company,
        position,
        description: non_blank(entry.description),
        start_date,
        end_date,
        is_current: entry.is_current.unwrap_or(false),
    })
}

fn education_list(entries: Vec<EducationInput>) -> Result<Vec<NewEducation>, ValidationError> {
    entries.into_iter().map(new_education).collect()
}

fn work_experience_list(
    entries: Vec<WorkExperienceInput>,
) -> Result<Vec<NewWorkExperience>, ValidationError> {
    entries.into_iter().map(new_work_experience).collect()
}

fn new_candidate(request: CreateCandidateRequest) -> Result<NewCandidate, ValidationError> {
    let first_name = person_name(request.first_name, "First name")?;
    let last_name = person_name(request.last_name, "Last name")?;
    let email = email_address(request.email)?;
    let education = education_list(request.education.unwrap_or_default())?;
    let work_experience = work_experience_list(request.work_experience.unwrap_or_default())?;

    Ok(NewCandidate {
        first_name,
        last_name,
        email,
        phone: non_blank(request.phone),
        address: non_blank(request.address),
        education,
        work_experience,
    })
}

/// A child collection sent as `null` is rejected; only a list (possibly
/// empty) replaces the stored one.
fn child_list<T>(value: Option<Vec<T>>, label: &str) -> Result<Vec<T>, ValidationError> {
    value.ok_or_else(|| {
        ValidationError::new(ValidationKind::MissingField, format!("{label} must be a list"))
    })
}

fn candidate_patch(request: UpdateCandidateRequest) -> Result<CandidatePatch, ValidationError> {
    Ok(CandidatePatch {
        first_name: request
            .first_name
            .map(|v| person_name(v, "First name"))
            .transpose()?,
        last_name: request
            .last_name
            .map(|v| person_name(v, "Last name"))
            .transpose()?,
        email: request.email.map(email_address).transpose()?,
        phone: request.phone.map(non_blank),
        address: request.address.map(non_blank),
        education: request
            .education
            .map(|v| child_list(v, "Education").and_then(education_list))
            .transpose()?,
        work_experience: request
            .work_experience
            .map(|v| child_list(v, "Work experience").and_then(work_experience_list))
            .transpose()?,
    })
}
