use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Raw `candidates` row. The three résumé columns are nullable independently
/// at the SQL level; [`Candidate`] collapses them into a single option.
#[derive(Debug, Clone, FromRow)]
pub struct CandidateRow {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub cv_file_name: Option<String>,
    pub cv_file_path: Option<String>,
    pub cv_mime_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reference to a stored résumé artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRef {
    #[serde(rename = "cvFileName")]
    pub file_name: String,
    #[serde(rename = "cvFilePath")]
    pub file_path: String,
    #[serde(rename = "cvMimeType")]
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(flatten)]
    pub resume: Option<ResumeRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CandidateRow> for Candidate {
    fn from(row: CandidateRow) -> Self {
        let resume = match (row.cv_file_name, row.cv_file_path, row.cv_mime_type) {
            (Some(file_name), Some(file_path), Some(mime_type)) => Some(ResumeRef {
                file_name,
                file_path,
                mime_type,
            }),
            _ => None,
        };
        Candidate {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            resume,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub id: i32,
    pub candidate_id: i32,
    pub institution: String,
    pub degree: String,
    pub field_of_study: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    pub id: i32,
    pub candidate_id: i32,
    pub company: String,
    pub position: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_current: bool,
}

/// A candidate together with the education and work history it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateAggregate {
    pub candidate: Candidate,
    pub education: Vec<Education>,
    pub work_experience: Vec<WorkExperience>,
}
