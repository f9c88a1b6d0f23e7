use crate::candidates::service::CandidateService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Candidate lifecycle over the configured repository and résumé store.
    pub candidates: CandidateService,
    /// Outside production, error responses keep internal messages and a
    /// `details` field.
    pub expose_error_details: bool,
}
