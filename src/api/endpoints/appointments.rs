//! Appointment endpoints: specialist suggestions, slots, booking and the
//! confirmation turn written back to the chat.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{blocking, ApiContext};
use crate::appointment::BookingRequest;
use crate::models::{Appointment, Slot, Specialist, PRIMARY_CARE};

#[derive(Deserialize)]
pub struct SpecialistsRequest {
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub ai_response: Option<String>,
}

#[derive(Serialize)]
pub struct SpecialistsResponse {
    pub success: bool,
    pub specialist_types: Vec<String>,
    pub specialists: Vec<Specialist>,
    pub reason: String,
}

/// `POST /api/appointments/get-specialists`
pub async fn specialists(
    State(ctx): State<ApiContext>,
    Json(req): Json<SpecialistsRequest>,
) -> Json<SpecialistsResponse> {
    let resolution = ctx
        .resolver
        .resolve(&req.condition, req.ai_response.as_deref());
    Json(SpecialistsResponse {
        success: true,
        specialist_types: resolution.specialist_types,
        specialists: resolution.specialists,
        reason: resolution.reason,
    })
}

#[derive(Serialize)]
pub struct SpecialistListResponse {
    pub success: bool,
    pub specialists: Vec<Specialist>,
}

/// `GET /api/appointments/specialist-types`
pub async fn specialist_types(State(ctx): State<ApiContext>) -> Json<SpecialistListResponse> {
    Json(SpecialistListResponse {
        success: true,
        specialists: ctx.resolver.specialist_types(),
    })
}

#[derive(Deserialize)]
pub struct SlotsRequest {
    #[serde(default)]
    pub specialist_type: Option<String>,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    pub success: bool,
    pub specialist_type: String,
    pub slots: Vec<Slot>,
}

/// `POST /api/appointments/get-slots`. Defaults to primary care.
pub async fn slots(
    State(ctx): State<ApiContext>,
    Json(req): Json<SlotsRequest>,
) -> Result<Json<SlotsResponse>, ApiError> {
    let specialist_type = req
        .specialist_type
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| PRIMARY_CARE.to_string());
    let now = chrono::Local::now().naive_local();
    let slots = ctx.resolver.slots(&specialist_type, now)?;
    Ok(Json(SlotsResponse {
        success: true,
        specialist_type,
        slots,
    }))
}

#[derive(Serialize)]
pub struct BookResponse {
    pub success: bool,
    pub appointment: Appointment,
    pub message: String,
}

/// `POST /api/appointments/book`
pub async fn book(
    State(ctx): State<ApiContext>,
    Json(req): Json<BookingRequest>,
) -> Result<Json<BookResponse>, ApiError> {
    let resolver = ctx.resolver.clone();
    let booking = blocking(move || resolver.book(req)).await?;
    Ok(Json(BookResponse {
        success: true,
        appointment: booking.appointment,
        message: booking.message,
    }))
}

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub session_id: String,
    pub message: String,
    pub appointment_id: String,
    #[serde(default)]
    pub reasoning: Option<String>,
}

#[derive(Serialize)]
pub struct ConfirmResponse {
    pub success: bool,
    pub message: &'static str,
    pub message_count: usize,
}

/// `POST /api/appointments/confirm`. Records the confirmation as a
/// `system` turn in the chat.
pub async fn confirm(
    State(ctx): State<ApiContext>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<ConfirmResponse>, ApiError> {
    let session = ctx
        .orchestrator
        .confirm_appointment(
            &req.session_id,
            &req.message,
            &req.appointment_id,
            req.reasoning.as_deref(),
        )
        .await?;
    Ok(Json(ConfirmResponse {
        success: true,
        message: "Confirmation saved",
        message_count: session.turns.len(),
    }))
}

#[derive(Serialize)]
pub struct AppointmentListResponse {
    pub success: bool,
    pub appointments: Vec<Appointment>,
}

/// `GET /api/appointments`
pub async fn list(
    State(ctx): State<ApiContext>,
) -> Result<Json<AppointmentListResponse>, ApiError> {
    let resolver = ctx.resolver.clone();
    let appointments = blocking(move || resolver.list()).await?;
    Ok(Json(AppointmentListResponse {
        success: true,
        appointments,
    }))
}
