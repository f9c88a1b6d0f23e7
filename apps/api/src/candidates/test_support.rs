use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;

use crate::candidates::file_store::FileStore;
use crate::candidates::models::{
    CandidatePatch, CreateCandidateRequest, EducationInput, NewCandidate, NewEducation,
    NewWorkExperience, WorkExperienceInput,
};
use crate::candidates::repository::{
    CandidatePage, CandidateRepository, RepositoryError,
};
use crate::candidates::service::CandidateService;
use crate::models::candidate::{
    Candidate, CandidateAggregate, Education, ResumeRef, WorkExperience,
};

#[derive(Default)]
struct MemoryState {
    next_id: i32,
    candidates: BTreeMap<i32, Candidate>,
    education: Vec<Education>,
    work_experience: Vec<WorkExperience>,
}

impl MemoryState {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn email_taken(&self, email: &str, except: Option<i32>) -> bool {
        self.candidates
            .values()
            .any(|c| c.email == email && Some(c.id) != except)
    }

    fn aggregate(&self, candidate: &Candidate) -> CandidateAggregate {
        CandidateAggregate {
            candidate: candidate.clone(),
            education: self
                .education
                .iter()
                .filter(|e| e.candidate_id == candidate.id)
                .cloned()
                .collect(),
            work_experience: self
                .work_experience
                .iter()
                .filter(|w| w.candidate_id == candidate.id)
                .cloned()
                .collect(),
        }
    }

    fn push_education(&mut self, candidate_id: i32, entries: Vec<NewEducation>) {
        for entry in entries {
            let id = self.next_id();
            self.education.push(Education {
                id,
                candidate_id,
                institution: entry.institution,
                degree: entry.degree,
                field_of_study: entry.field_of_study,
                start_date: entry.start_date,
                end_date: entry.end_date,
                is_current: entry.is_current,
            });
        }
    }

    fn push_work_experience(&mut self, candidate_id: i32, entries: Vec<NewWorkExperience>) {
        for entry in entries {
            let id = self.next_id();
            self.work_experience.push(WorkExperience {
                id,
                candidate_id,
                company: entry.company,
                position: entry.position,
                description: entry.description,
                start_date: entry.start_date,
                end_date: entry.end_date,
                is_current: entry.is_current,
            });
        }
    }
}

/// In-process repository with the same uniqueness and cascade rules as the
/// PostgreSQL schema.
#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<MemoryState>,
}

impl MemoryRepository {
    /// Child rows currently stored for `candidate_id`, regardless of whether
    /// the candidate itself still exists.
    pub fn child_rows(&self, candidate_id: i32) -> (usize, usize) {
        let state = self.state.lock().expect("memory repository lock");
        (
            state
                .education
                .iter()
                .filter(|e| e.candidate_id == candidate_id)
                .count(),
            state
                .work_experience
                .iter()
                .filter(|w| w.candidate_id == candidate_id)
                .count(),
        )
    }
}

#[async_trait]
impl CandidateRepository for MemoryRepository {
    async fn insert(&self, candidate: NewCandidate) -> Result<CandidateAggregate, RepositoryError> {
        let mut state = self.state.lock().expect("memory repository lock");
        if state.email_taken(&candidate.email, None) {
            return Err(RepositoryError::DuplicateEmail(candidate.email));
        }
        let id = state.next_id();
        let now = Utc::now();
        let record = Candidate {
            id,
            first_name: candidate.first_name,
            last_name: candidate.last_name,
            email: candidate.email,
            phone: candidate.phone,
            address: candidate.address,
            resume: None,
            created_at: now,
            updated_at: now,
        };
        state.candidates.insert(id, record.clone());
        state.push_education(id, candidate.education);
        state.push_work_experience(id, candidate.work_experience);
        Ok(state.aggregate(&record))
    }

    async fn page(&self, offset: i64, limit: i64) -> Result<CandidatePage, RepositoryError> {
        let state = self.state.lock().expect("memory repository lock");
        let mut all: Vec<&Candidate> = state.candidates.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let candidates = all
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|c| state.aggregate(c))
            .collect();
        Ok(CandidatePage {
            candidates,
            total: state.candidates.len() as i64,
        })
    }

    async fn find(&self, id: i32) -> Result<Option<CandidateAggregate>, RepositoryError> {
        let state = self.state.lock().expect("memory repository lock");
        Ok(state.candidates.get(&id).map(|c| state.aggregate(c)))
    }

    async fn update(
        &self,
        id: i32,
        patch: CandidatePatch,
    ) -> Result<Option<CandidateAggregate>, RepositoryError> {
        let mut state = self.state.lock().expect("memory repository lock");
        let Some(mut record) = state.candidates.get(&id).cloned() else {
            return Ok(None);
        };
        if let Some(email) = patch.email {
            if state.email_taken(&email, Some(id)) {
                return Err(RepositoryError::DuplicateEmail(email));
            }
            record.email = email;
        }
        if let Some(first_name) = patch.first_name {
            record.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            record.last_name = last_name;
        }
        if let Some(phone) = patch.phone {
            record.phone = phone;
        }
        if let Some(address) = patch.address {
            record.address = address;
        }
        record.updated_at = Utc::now();

        if let Some(entries) = patch.education {
            state.education.retain(|e| e.candidate_id != id);
            state.push_education(id, entries);
        }
        if let Some(entries) = patch.work_experience {
            state.work_experience.retain(|w| w.candidate_id != id);
            state.push_work_experience(id, entries);
        }
        state.candidates.insert(id, record.clone());
        Ok(Some(state.aggregate(&record)))
    }

    async fn delete(&self, id: i32) -> Result<Option<CandidateAggregate>, RepositoryError> {
        let mut state = self.state.lock().expect("memory repository lock");
        let Some(record) = state.candidates.get(&id).cloned() else {
            return Ok(None);
        };
        let snapshot = state.aggregate(&record);
        state.candidates.remove(&id);
        state.education.retain(|e| e.candidate_id != id);
        state.work_experience.retain(|w| w.candidate_id != id);
        Ok(Some(snapshot))
    }

    async fn set_resume(
        &self,
        id: i32,
        resume: ResumeRef,
    ) -> Result<Option<CandidateAggregate>, RepositoryError> {
        let mut state = self.state.lock().expect("memory repository lock");
        let Some(record) = state.candidates.get_mut(&id) else {
            return Ok(None);
        };
        record.resume = Some(resume);
        record.updated_at = Utc::now();
        let record = record.clone();
        Ok(Some(state.aggregate(&record)))
    }
}

/// Repository whose every call fails like an unreachable database.
pub struct UnavailableRepository;

fn unavailable() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl CandidateRepository for UnavailableRepository {
    async fn insert(&self, _: NewCandidate) -> Result<CandidateAggregate, RepositoryError> {
        Err(unavailable())
    }

    async fn page(&self, _: i64, _: i64) -> Result<CandidatePage, RepositoryError> {
        Err(unavailable())
    }

    async fn find(&self, _: i32) -> Result<Option<CandidateAggregate>, RepositoryError> {
        Err(unavailable())
    }

    async fn update(
        &self,
        _: i32,
        _: CandidatePatch,
    ) -> Result<Option<CandidateAggregate>, RepositoryError> {
        Err(unavailable())
    }

    async fn delete(&self, _: i32) -> Result<Option<CandidateAggregate>, RepositoryError> {
        Err(unavailable())
    }

    async fn set_resume(
        &self,
        _: i32,
        _: ResumeRef,
    ) -> Result<Option<CandidateAggregate>, RepositoryError> {
        Err(unavailable())
    }
}

/// Service over a fresh [`MemoryRepository`] with résumés stored under a
/// temporary directory. Keep the `TempDir` alive for the whole test.
pub fn memory_service() -> (CandidateService, Arc<MemoryRepository>, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let repository = Arc::new(MemoryRepository::default());
    let service = CandidateService::new(repository.clone(), FileStore::new(dir.path().join("cvs")));
    (service, repository, dir)
}

pub fn create_request(email: &str) -> CreateCandidateRequest {
    CreateCandidateRequest {
        first_name: Some("Jane".to_string()),
        last_name: Some("Smith".to_string()),
        email: Some(email.to_string()),
        ..Default::default()
    }
}

pub fn education(start: Option<&str>, end: Option<&str>) -> EducationInput {
    EducationInput {
        institution: Some("University Test".to_string()),
        degree: Some("Bachelor".to_string()),
        field_of_study: Some("Computer Science".to_string()),
        start_date: start.map(str::to_string),
        end_date: end.map(str::to_string),
        is_current: None,
    }
}

pub fn work(start: Option<&str>, end: Option<&str>) -> WorkExperienceInput {
    WorkExperienceInput {
        company: Some("Tech Corp".to_string()),
        position: Some("Developer".to_string()),
        description: Some("Software development".to_string()),
        start_date: start.map(str::to_string),
        end_date: end.map(str::to_string),
        is_current: Some(true),
    }
}
