use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::candidate::CandidateAggregate;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Hard cap on `pageSize`; larger requests are clamped.
pub const MAX_PAGE_SIZE: u32 = 100;

// ────────────────────────────────────────────────────────────────────────────
// Inbound payloads
// ────────────────────────────────────────────────────────────────────────────
//
// Every field is optional at the serde level so that a missing required
// field surfaces as a validation error instead of a deserialization failure.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationInput {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_current: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperienceInput {
    pub company: Option<String>,
    pub position: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_current: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCandidateRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub education: Option<Vec<EducationInput>>,
    pub work_experience: Option<Vec<WorkExperienceInput>>,
}

/// Partial update. `None` leaves a field unchanged; `Some(None)` is a key
/// sent as JSON `null`. That clears `phone` and `address` and fails
/// validation for every other field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCandidateRequest {
    #[serde(default, deserialize_with = "present")]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub education: Option<Option<Vec<EducationInput>>>,
    #[serde(default, deserialize_with = "present")]
    pub work_experience: Option<Option<Vec<WorkExperienceInput>>>,
}

/// Distinguishes an explicit `null` from an absent key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A résumé received from the transport layer, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Validated values handed to the repository
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct NewEducation {
    pub institution: String,
    pub degree: String,
    pub field_of_study: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkExperience {
    pub company: String,
    pub position: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCandidate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub education: Vec<NewEducation>,
    pub work_experience: Vec<NewWorkExperience>,
}

/// Validated partial update. Child collections, when present, replace the
/// stored collection wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub education: Option<Vec<NewEducation>>,
    pub work_experience: Option<Vec<NewWorkExperience>>,
}

// ────────────────────────────────────────────────────────────────────────────
// Listing
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Builds a page request from raw query values. Absent, non-numeric and
    /// non-positive values fall back to the defaults.
    pub fn from_query(page: Option<&str>, page_size: Option<&str>) -> Self {
        PageRequest {
            page: parse_positive(page).unwrap_or(DEFAULT_PAGE),
            page_size: parse_positive(page_size)
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .min(MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }
}

fn parse_positive(value: Option<&str>) -> Option<u32> {
    value?.trim().parse::<u32>().ok().filter(|n| *n > 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: i64) -> Self {
        let size = i64::from(request.page_size.max(1));
        Pagination {
            page: request.page,
            page_size: request.page_size,
            total,
            total_pages: (total + size - 1) / size,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateList {
    pub candidates: Vec<CandidateAggregate>,
    pub pagination: Pagination,
}
