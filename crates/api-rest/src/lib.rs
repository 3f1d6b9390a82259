//! # API REST
//!
//! REST API for the CDS engines.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! Every request is independent: the triage endpoint takes the full answer history and replays
//! it, so no session lives on the server. Uses `api-shared` for wire types.

#![warn(rust_2018_idioms)]

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{
    AssessReq, CategoryDefinition, CombineReq, ConditionInfo, EligibilityRes, HealthRes,
    HealthService, ListConditionsRes, ListMethodsRes, ListSymptomsRes, MethodInfo, MethodResult,
    QuestionBody, RecommendationBody, SymptomInfo, TriageReq, TriageRes,
};
use cds_core::{eligibility, CdsError, CoreConfig, TriageSession};

/// Application state shared across REST API handlers.
#[derive(Clone)]
struct AppState {
    cfg: Arc<CoreConfig>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_methods,
        list_conditions,
        combine,
        assess,
        list_symptoms,
        triage,
    ),
    components(schemas(
        HealthRes,
        MethodInfo,
        CategoryDefinition,
        ListMethodsRes,
        ConditionInfo,
        ListConditionsRes,
        CombineReq,
        AssessReq,
        MethodResult,
        EligibilityRes,
        SymptomInfo,
        ListSymptomsRes,
        TriageReq,
        QuestionBody,
        RecommendationBody,
        TriageRes,
    ))
)]
struct ApiDoc;

/// Build the REST router with Swagger UI and permissive CORS.
pub fn router(cfg: Arc<CoreConfig>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/eligibility/methods", get(list_methods))
        .route("/eligibility/conditions", get(list_conditions))
        .route("/eligibility/combine", post(combine))
        .route("/eligibility/assess", post(assess))
        .route("/triage/symptoms", get(list_symptoms))
        .route("/triage", post(triage))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(AppState { cfg })
}

/// Map a core error onto a status code and a fixed message.
///
/// Validation failures become `400`. Table errors are logged and become `500`.
fn reject(context: &str, e: CdsError) -> (StatusCode, &'static str) {
    match e {
        CdsError::InvalidInput(_)
        | CdsError::UnknownMethod(_)
        | CdsError::UnknownSymptom(_)
        | CdsError::InvalidCategory(_) => {
            tracing::warn!("{} rejected: {}", context, e);
            (StatusCode::BAD_REQUEST, "Invalid input")
        }
        CdsError::AnswerMismatch { .. } => {
            tracing::warn!("{} rejected: {}", context, e);
            (StatusCode::BAD_REQUEST, "Answer does not match question")
        }
        CdsError::SessionComplete => (StatusCode::BAD_REQUEST, "Triage already complete"),
        CdsError::TableSchema(_) | CdsError::InvalidYaml(_) => {
            tracing::error!("{} error: {:?}", context, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/eligibility/methods",
    responses(
        (status = 200, description = "Contraceptive methods and category definitions", body = ListMethodsRes)
    )
)]
#[axum::debug_handler]
async fn list_methods(State(_state): State<AppState>) -> Json<ListMethodsRes> {
    Json(ListMethodsRes::catalogue())
}

#[utoipa::path(
    get,
    path = "/eligibility/conditions",
    responses(
        (status = 200, description = "Every condition key in the eligibility table", body = ListConditionsRes)
    )
)]
/// List the eligibility table
///
/// Returns every condition key with its description and the categories it assigns.
#[axum::debug_handler]
async fn list_conditions(State(state): State<AppState>) -> Json<ListConditionsRes> {
    Json(ListConditionsRes::from(state.cfg.eligibility_table()))
}

#[utoipa::path(
    post,
    path = "/eligibility/combine",
    request_body = CombineReq,
    responses(
        (status = 200, description = "Combined category per method", body = EligibilityRes)
    )
)]
/// Combine a set of condition keys
///
/// Each method takes the highest category any selected condition assigns it. Keys missing
/// from the table contribute nothing.
#[axum::debug_handler]
async fn combine(
    State(state): State<AppState>,
    Json(req): Json<CombineReq>,
) -> Json<EligibilityRes> {
    let table = state.cfg.eligibility_table();
    let categories = table.combine(&req.conditions);
    Json(EligibilityRes::build(table, &req.conditions, &categories))
}

#[utoipa::path(
    post,
    path = "/eligibility/assess",
    request_body = AssessReq,
    responses(
        (status = 200, description = "Derived condition keys and combined categories", body = EligibilityRes),
        (status = 400, description = "Profile answer out of bounds"),
        (status = 422, description = "Malformed profile")
    )
)]
/// Assess a risk-profile form
///
/// Derives condition keys from the form answers, then combines them as `/eligibility/combine`
/// does.
///
/// # Errors
/// Returns `400 Bad Request` if a numeric answer is outside the form's bounds.
#[axum::debug_handler]
async fn assess(
    State(state): State<AppState>,
    Json(req): Json<AssessReq>,
) -> Result<Json<EligibilityRes>, (StatusCode, &'static str)> {
    let table = state.cfg.eligibility_table();
    match eligibility::assess(table, &req.profile) {
        Ok((keys, categories)) => Ok(Json(EligibilityRes::build(table, &keys, &categories))),
        Err(e) => Err(reject("Assess profile", e)),
    }
}

#[utoipa::path(
    get,
    path = "/triage/symptoms",
    responses(
        (status = 200, description = "Presenting symptoms offered by the first triage question", body = ListSymptomsRes)
    )
)]
#[axum::debug_handler]
async fn list_symptoms(State(_state): State<AppState>) -> Json<ListSymptomsRes> {
    Json(ListSymptomsRes::all())
}

#[utoipa::path(
    post,
    path = "/triage",
    request_body = TriageReq,
    responses(
        (status = 200, description = "Next question, or the recommendation once reached", body = TriageRes),
        (status = 400, description = "An answer is out of range, of the wrong kind, or follows a recommendation"),
        (status = 422, description = "Malformed answers")
    )
)]
/// Advance a triage traversal
///
/// Replays `answers` from the first question. The response carries the next question while
/// the traversal is open and the recommendation once it ends.
///
/// # Errors
/// Returns `400 Bad Request` if any answer fails validation.
#[axum::debug_handler]
async fn triage(
    State(_state): State<AppState>,
    Json(req): Json<TriageReq>,
) -> Result<Json<TriageRes>, (StatusCode, &'static str)> {
    match TriageSession::replay(req.answers) {
        Ok(session) => Ok(Json(TriageRes::from(&session))),
        Err(e) => Err(reject("Triage", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(CoreConfig::new().expect("embedded table loads")))
    }

    async fn send(method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn category_for(res: &Value, code: &str) -> u64 {
        res["results"]
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["method"] == code)
            .unwrap()["category"]
            .as_u64()
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = send(Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn methods_and_conditions_are_listed() {
        let (status, body) = send(Method::GET, "/eligibility/methods", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["methods"].as_array().unwrap().len(), 6);

        let (status, body) = send(Method::GET, "/eligibility/conditions", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["conditions"].as_array().unwrap().len(), 43);
    }

    #[tokio::test]
    async fn combine_takes_the_maximum_per_method() {
        let (status, body) = send(
            Method::POST,
            "/eligibility/combine",
            Some(json!({ "conditions": ["BMI_GE_35", "BREASTFEEDING_0_TO_6_WEEKS", "NOT_A_KEY"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(category_for(&body, "CHC"), 4);
        assert_eq!(category_for(&body, "POP"), 4);
        assert_eq!(category_for(&body, "DMPA"), 2);
        assert_eq!(category_for(&body, "Cu-IUD"), 1);
        assert!(!body["notice"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn assess_derives_keys_from_profile() {
        let (status, body) = send(
            Method::POST,
            "/eligibility/assess",
            Some(json!({ "profile": { "age": 38, "bmi": 36.0, "hypertension": "severe" } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let keys: Vec<&str> = body["condition_keys"]
            .as_array()
            .unwrap()
            .iter()
            .map(|k| k.as_str().unwrap())
            .collect();
        assert!(keys.contains(&"BMI_GE_35"));
        assert_eq!(category_for(&body, "CHC"), 4);
    }

    #[tokio::test]
    async fn assess_rejects_out_of_range_bmi() {
        let (status, _) = send(
            Method::POST,
            "/eligibility/assess",
            Some(json!({ "profile": { "age": 30, "bmi": 200.0 } })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn assess_rejects_unknown_profile_fields() {
        let (status, _) = send(
            Method::POST,
            "/eligibility/assess",
            Some(json!({ "profile": { "age": 30, "bmi": 22.0, "height": 170 } })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn empty_triage_asks_for_symptoms() {
        let (status, body) = send(Method::POST, "/triage", Some(json!({ "answers": [] }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "question");
        assert_eq!(body["question"]["node"], "symptoms");
        assert_eq!(body["question"]["options"].as_array().unwrap().len(), 11);
    }

    #[tokio::test]
    async fn triage_replays_to_recommendation() {
        let answers = json!({ "answers": [
            { "kind": "symptoms", "value": ["change_in_bowel_habit"] },
            { "kind": "yes_no", "value": true },
            { "kind": "decimal", "value": 10.0 },
            { "kind": "yes_no", "value": false },
            { "kind": "integer", "value": 30 },
            { "kind": "yes_no", "value": false }
        ]});
        let (status, body) = send(Method::POST, "/triage", Some(answers)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "recommendation");
        assert_eq!(body["recommendation"]["code"], "colon_capsule");
        assert!(body["question"].is_null());
    }

    #[tokio::test]
    async fn triage_rejects_wrong_answer_kind() {
        let answers = json!({ "answers": [{ "kind": "yes_no", "value": true }] });
        let (status, _) = send(Method::POST, "/triage", Some(answers)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn triage_rejects_answers_after_recommendation() {
        let answers = json!({ "answers": [
            { "kind": "symptoms", "value": ["rectal_mass"] },
            { "kind": "yes_no", "value": true },
            { "kind": "yes_no", "value": true }
        ]});
        let (status, _) = send(Method::POST, "/triage", Some(answers)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let (status, body) = send(Method::GET, "/api-docs/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/triage"].is_object());
    }
}
