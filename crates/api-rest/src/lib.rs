//! # API REST
//!
//! REST surface for the TMC organ request lifecycle and matching engine.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, error→status mapping)
//!
//! Identity is request-scoped: each call may carry an `x-actor-id` header
//! which the engine uses for audit entries only. No session state lives here.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use api_shared::{
    AdvanceTransplantReq, ApplicationRes, AuthorizedMatchRes, CreateRequestReq, ErrorRes,
    HealthRes, HealthService, LifecycleEventRes, ListApplicationsRes, OrganRequestRes, OutcomeDto,
    RejectApplicationReq, SlaBreachReq, SlaStatusRes, SubmitApplicationReq, SurgeryDetailsDto,
    TransplantRes,
};
use tmc_core::{
    EngineError, MatchEngine, NewOrganRequest, OrganFunction, SurvivalStatus, TransplantOutcome,
    TransplantStatus, UrgencyLevel,
};

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: MatchEngine,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        create_request,
        get_request,
        get_sla_status,
        validate_eligibility,
        record_sla_breach,
        cancel_request,
        submit_application,
        list_applications,
        reject_application,
        authorize_match,
        advance_transplant,
        record_outcome,
        get_transplant,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        CreateRequestReq,
        OrganRequestRes,
        LifecycleEventRes,
        SlaStatusRes,
        SlaBreachReq,
        SubmitApplicationReq,
        ApplicationRes,
        ListApplicationsRes,
        RejectApplicationReq,
        SurgeryDetailsDto,
        AuthorizedMatchRes,
        AdvanceTransplantReq,
        OutcomeDto,
        TransplantRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router around an engine instance.
pub fn build_router(engine: MatchEngine) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/requests", post(create_request))
        .route("/requests/:id", get(get_request))
        .route("/requests/:id/sla", get(get_sla_status))
        .route("/requests/:id/validate-eligibility", post(validate_eligibility))
        .route("/requests/:id/sla-breach", post(record_sla_breach))
        .route("/requests/:id/cancel", post(cancel_request))
        .route("/requests/:id/applications", post(submit_application))
        .route("/requests/:id/applications", get(list_applications))
        .route("/applications/:id/reject", post(reject_application))
        .route("/applications/:id/authorize", post(authorize_match))
        .route("/transplants/:id", get(get_transplant))
        .route("/transplants/:id/advance", post(advance_transplant))
        .route("/transplants/:id/outcome", post(record_outcome))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(AppState { engine })
}

type ApiError = (StatusCode, Json<ErrorRes>);
type ApiResult<T> = Result<Json<T>, ApiError>;

/// Maps engine error kinds onto HTTP statuses.
///
/// Validation → 400, NotFound → 404, Conflict → 409, InvalidState → 422.
fn error_response(err: EngineError) -> ApiError {
    let (status, kind) = match &err {
        EngineError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
        EngineError::NotFound { .. } => (StatusCode::NOT_FOUND, "not-found"),
        EngineError::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
        EngineError::InvalidState { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "invalid-state"),
    };
    (
        status,
        Json(ErrorRes {
            error: kind.into(),
            message: err.to_string(),
        }),
    )
}

/// Caller-supplied actor id for audit logging, never stored as session state.
fn actor(headers: &HeaderMap) -> String {
    headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.trim().to_owned())
        .unwrap_or_else(|| "anonymous".into())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint used by monitoring and load balancers.
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/requests",
    request_body = CreateRequestReq,
    responses(
        (status = 200, description = "Organ request created", body = OrganRequestRes),
        (status = 400, description = "Incomplete patient snapshot", body = ErrorRes)
    )
)]
/// Create a new organ request.
///
/// Starts the SLA window at creation time. Urgency and the owning hospital
/// are immutable afterwards.
async fn create_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateRequestReq>,
) -> ApiResult<OrganRequestRes> {
    let urgency: UrgencyLevel = req
        .urgency
        .parse()
        .map_err(EngineError::Validation)
        .map_err(error_response)?;
    let request = state
        .engine
        .lifecycle()
        .create_request(
            &actor(&headers),
            NewOrganRequest {
                hospital_id: req.hospital_id,
                patient_name: req.patient_name,
                patient_age: req.patient_age,
                blood_type: req.blood_type,
                organ_type: req.organ_type,
                urgency,
                medical_condition: req.medical_condition,
            },
        )
        .map_err(error_response)?;
    Ok(Json((&request).into()))
}

#[utoipa::path(
    get,
    path = "/requests/{id}",
    params(("id" = String, Path, description = "Organ request id")),
    responses(
        (status = 200, description = "Organ request", body = OrganRequestRes),
        (status = 404, description = "Unknown request", body = ErrorRes)
    )
)]
/// Fetch one organ request with its full lifecycle log.
async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrganRequestRes> {
    let request = state.engine.request(id).map_err(error_response)?;
    Ok(Json((&request).into()))
}

#[utoipa::path(
    get,
    path = "/requests/{id}/sla",
    params(("id" = String, Path, description = "Organ request id")),
    responses(
        (status = 200, description = "SLA position, computed on read", body = SlaStatusRes),
        (status = 404, description = "Unknown request", body = ErrorRes)
    )
)]
/// Current SLA position of a request (deadline, remaining time, breach flag).
async fn get_sla_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<SlaStatusRes> {
    let status = state
        .engine
        .sla_status(id, chrono::Utc::now())
        .map_err(error_response)?;
    Ok(Json((&status).into()))
}

#[utoipa::path(
    post,
    path = "/requests/{id}/validate-eligibility",
    params(("id" = String, Path, description = "Organ request id")),
    responses(
        (status = 200, description = "Request validated (idempotent)", body = OrganRequestRes),
        (status = 400, description = "Incomplete patient data", body = ErrorRes),
        (status = 404, description = "Unknown request", body = ErrorRes),
        (status = 422, description = "Request already past validation", body = ErrorRes)
    )
)]
/// Validate patient data completeness and move the request to
/// `eligibility-validated`. Re-validating is a successful no-op.
async fn validate_eligibility(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<OrganRequestRes> {
    let request = state
        .engine
        .lifecycle()
        .validate_eligibility(&actor(&headers), id)
        .map_err(error_response)?;
    Ok(Json((&request).into()))
}

#[utoipa::path(
    post,
    path = "/requests/{id}/sla-breach",
    request_body = SlaBreachReq,
    params(("id" = String, Path, description = "Organ request id")),
    responses(
        (status = 200, description = "Breach acknowledged", body = OrganRequestRes),
        (status = 400, description = "Blank delay reason", body = ErrorRes),
        (status = 404, description = "Unknown request", body = ErrorRes),
        (status = 409, description = "Breach already recorded", body = ErrorRes)
    )
)]
/// Acknowledge an SLA breach with its mandatory delay reason (once only).
async fn record_sla_breach(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<SlaBreachReq>,
) -> ApiResult<OrganRequestRes> {
    let request = state
        .engine
        .lifecycle()
        .record_sla_breach(&actor(&headers), id, &req.reason)
        .map_err(error_response)?;
    Ok(Json((&request).into()))
}

#[utoipa::path(
    post,
    path = "/requests/{id}/cancel",
    params(("id" = String, Path, description = "Organ request id")),
    responses(
        (status = 200, description = "Request cancelled", body = OrganRequestRes),
        (status = 404, description = "Unknown request", body = ErrorRes),
        (status = 409, description = "Request already terminal", body = ErrorRes)
    )
)]
/// Cancel a request from any non-terminal state, rejecting pending
/// applications and releasing a locked donor.
async fn cancel_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<OrganRequestRes> {
    let request = state
        .engine
        .lifecycle()
        .cancel(&actor(&headers), id)
        .map_err(error_response)?;
    Ok(Json((&request).into()))
}

#[utoipa::path(
    post,
    path = "/requests/{id}/applications",
    request_body = SubmitApplicationReq,
    params(("id" = String, Path, description = "Organ request id")),
    responses(
        (status = 200, description = "Application submitted", body = ApplicationRes),
        (status = 400, description = "Bad score or ineligible candidate", body = ErrorRes),
        (status = 404, description = "Unknown request", body = ErrorRes),
        (status = 409, description = "Intake closed for this request", body = ErrorRes)
    )
)]
/// Submit a candidate application against a request.
async fn submit_application(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitApplicationReq>,
) -> ApiResult<ApplicationRes> {
    let application = state
        .engine
        .registry()
        .submit(&actor(&headers), id, &req.candidate_id, req.compatibility_score)
        .map_err(error_response)?;
    Ok(Json((&application).into()))
}

#[utoipa::path(
    get,
    path = "/requests/{id}/applications",
    params(("id" = String, Path, description = "Organ request id")),
    responses(
        (status = 200, description = "Applications in submission order", body = ListApplicationsRes),
        (status = 404, description = "Unknown request", body = ErrorRes)
    )
)]
/// List a request's applications, submission time ascending (never by score).
async fn list_applications(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ListApplicationsRes> {
    let applications = state.engine.registry().list_for(id).map_err(error_response)?;
    Ok(Json(ListApplicationsRes {
        applications: applications.iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/applications/{id}/reject",
    request_body = RejectApplicationReq,
    params(("id" = String, Path, description = "Application id")),
    responses(
        (status = 200, description = "Application rejected", body = ApplicationRes),
        (status = 404, description = "Unknown application", body = ErrorRes),
        (status = 409, description = "Application already decided", body = ErrorRes)
    )
)]
/// Reject a still-pending application.
async fn reject_application(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<RejectApplicationReq>,
) -> ApiResult<ApplicationRes> {
    let application = state
        .engine
        .registry()
        .reject(&actor(&headers), id, req.reason)
        .map_err(error_response)?;
    Ok(Json((&application).into()))
}

#[utoipa::path(
    post,
    path = "/applications/{id}/authorize",
    request_body = SurgeryDetailsDto,
    params(("id" = String, Path, description = "Application id")),
    responses(
        (status = 200, description = "Match authorized", body = AuthorizedMatchRes),
        (status = 400, description = "Incomplete surgery details", body = ErrorRes),
        (status = 404, description = "Unknown application", body = ErrorRes),
        (status = 409, description = "Application or request already decided", body = ErrorRes)
    )
)]
/// Authorize a match: accept this application, auto-reject its siblings,
/// lock the donor and create the transplant record. Exactly-once per request.
async fn authorize_match(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<SurgeryDetailsDto>,
) -> ApiResult<AuthorizedMatchRes> {
    let authorized = state
        .engine
        .authorizer()
        .authorize(&actor(&headers), id, req.into())
        .map_err(error_response)?;
    Ok(Json((&authorized).into()))
}

#[utoipa::path(
    get,
    path = "/transplants/{id}",
    params(("id" = String, Path, description = "Transplant id")),
    responses(
        (status = 200, description = "Transplant record", body = TransplantRes),
        (status = 404, description = "Unknown transplant", body = ErrorRes)
    )
)]
/// Fetch one transplant record.
async fn get_transplant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<TransplantRes> {
    let transplant = state.engine.transplant(id).map_err(error_response)?;
    Ok(Json((&transplant).into()))
}

#[utoipa::path(
    post,
    path = "/transplants/{id}/advance",
    request_body = AdvanceTransplantReq,
    params(("id" = String, Path, description = "Transplant id")),
    responses(
        (status = 200, description = "Transplant advanced", body = TransplantRes),
        (status = 400, description = "Unknown target status", body = ErrorRes),
        (status = 404, description = "Unknown transplant", body = ErrorRes),
        (status = 422, description = "Target is not the immediate successor", body = ErrorRes)
    )
)]
/// Advance a transplant to its immediate successor status (surgery start).
/// Completion goes through the outcome endpoint instead.
async fn advance_transplant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<AdvanceTransplantReq>,
) -> ApiResult<TransplantRes> {
    let target: TransplantStatus = req
        .target
        .parse()
        .map_err(EngineError::Validation)
        .map_err(error_response)?;
    let transplant = state
        .engine
        .outcomes()
        .advance(&actor(&headers), id, target)
        .map_err(error_response)?;
    Ok(Json((&transplant).into()))
}

#[utoipa::path(
    post,
    path = "/transplants/{id}/outcome",
    request_body = OutcomeDto,
    params(("id" = String, Path, description = "Transplant id")),
    responses(
        (status = 200, description = "Outcome recorded, transplant completed", body = TransplantRes),
        (status = 400, description = "Malformed outcome", body = ErrorRes),
        (status = 404, description = "Unknown transplant", body = ErrorRes),
        (status = 409, description = "Outcome already recorded", body = ErrorRes),
        (status = 422, description = "Surgery start not yet logged", body = ErrorRes)
    )
)]
/// Record the terminal outcome, completing the transplant and its request.
async fn record_outcome(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<OutcomeDto>,
) -> ApiResult<TransplantRes> {
    let survival_status: SurvivalStatus = req
        .survival_status
        .parse()
        .map_err(EngineError::Validation)
        .map_err(error_response)?;
    let organ_function: OrganFunction = req
        .organ_function
        .parse()
        .map_err(EngineError::Validation)
        .map_err(error_response)?;
    let outcome = TransplantOutcome {
        success: req.success,
        survival_status,
        organ_function,
        complications: req.complications.into_iter().collect(),
        follow_up_required: req.follow_up_required,
        notes: req.notes,
    };
    let transplant = state
        .engine
        .outcomes()
        .record_outcome(&actor(&headers), id, outcome)
        .map_err(error_response)?;
    Ok(Json((&transplant).into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let (status, _) = error_response(EngineError::Validation("x".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = error_response(EngineError::NotFound {
            entity: tmc_core::EntityKind::Request,
            id: "abc".into(),
        });
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = error_response(EngineError::Conflict {
            entity: tmc_core::EntityKind::Application,
            id: "abc".into(),
            status: "accepted".into(),
            operation: "reject",
        });
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error, "conflict");

        let (status, _) = error_response(EngineError::InvalidState {
            entity: tmc_core::EntityKind::Transplant,
            id: "abc".into(),
            from: "scheduled".into(),
            attempted: "completed".into(),
        });
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_actor_header_fallback() {
        let mut headers = HeaderMap::new();
        assert_eq!(actor(&headers), "anonymous");
        headers.insert("x-actor-id", "coordinator-7".parse().unwrap());
        assert_eq!(actor(&headers), "coordinator-7");
    }
}
