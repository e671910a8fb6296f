use std::fmt;

use serde::{Deserialize, Serialize};
use crate::schema::{appointment_bookings, appointments, patients, treatment_centers};
use chrono::{DateTime, Utc};
use diesel::{deserialize::{self, FromSql}, pg::{Pg, PgValue}, serialize::{self, Output, ToSql}, sql_types::Text, Insertable, Queryable, Selectable};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = patients)]
pub struct Patient {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable fields of a patient, as accepted on create and update.
#[derive(Debug, Clone, Deserialize)]
pub struct PatientDetails {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = patients)]
pub struct NewPatient<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = treatment_centers)]
pub struct TreatmentCenter {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreatmentCenterDetails {
    pub name: String,
    pub address: String,
    pub phone: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = treatment_centers)]
pub struct NewTreatmentCenter<'a> {
    pub id: Uuid,
    pub name: &'a str,
    pub address: &'a str,
    pub phone: &'a str,
}

/// A bookable slot at a treatment center.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = appointments)]
pub struct Appointment {
    pub id: Uuid,
    pub treatment_center_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = appointments)]
pub struct NewAppointment {
    pub id: Uuid,
    pub treatment_center_id: Uuid,
    pub start_time: DateTime<Utc>,
}

/// Confirmation state of a booking. Rendered as `awaiting confirmation` or
/// `confirmed` on the wire, stored as the `appointment_status` postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = crate::schema::sql_types::AppointmentStatus)]
pub enum AppointmentStatus {
    #[serde(rename = "awaiting confirmation")]
    AwaitingConfirmation,
    #[serde(rename = "confirmed")]
    Confirmed,
}

impl AppointmentStatus {
    /// The only legal transition is awaiting confirmation -> confirmed.
    pub fn can_become(self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (AppointmentStatus::AwaitingConfirmation, AppointmentStatus::Confirmed)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::AwaitingConfirmation => f.write_str("awaiting confirmation"),
            AppointmentStatus::Confirmed => f.write_str("confirmed"),
        }
    }
}

impl ToSql<crate::schema::sql_types::AppointmentStatus, Pg> for AppointmentStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        let s = match *self {
            AppointmentStatus::AwaitingConfirmation => "awaiting_confirmation",
            AppointmentStatus::Confirmed => "confirmed",
        };
        <str as ToSql<Text, Pg>>::to_sql(s, out)
    }
}

impl FromSql<crate::schema::sql_types::AppointmentStatus, Pg> for AppointmentStatus {
    fn from_sql(bytes: PgValue) -> deserialize::Result<Self> {
        match <String as FromSql<Text, Pg>>::from_sql(bytes)?.as_str() {
            "awaiting_confirmation" => Ok(AppointmentStatus::AwaitingConfirmation),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            s => Err(format!("Unrecognized appointment status: {}", s).into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = appointment_bookings)]
pub struct AppointmentBooking {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = appointment_bookings)]
pub struct NewAppointmentBooking {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub status: AppointmentStatus,
}

// Request/Response models for API
#[derive(Debug, Deserialize, Clone)]
pub struct CreateAppointmentRequest {
    pub treatment_center_id: Uuid,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RescheduleAppointmentRequest {
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct BookedAppointmentsQuery {
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PatientResponse {
    pub patient: Patient,
}

#[derive(Debug, Serialize)]
pub struct PatientsResponse {
    pub patients: Vec<Patient>,
}

#[derive(Debug, Serialize)]
pub struct TreatmentCenterResponse {
    pub treatment_center: TreatmentCenter,
}

#[derive(Debug, Serialize)]
pub struct TreatmentCentersResponse {
    pub treatment_centers: Vec<TreatmentCenter>,
}

#[derive(Debug, Serialize)]
pub struct AppointmentResponse {
    pub appointment: Appointment,
}

#[derive(Debug, Serialize)]
pub struct AppointmentsResponse {
    pub appointments: Vec<Appointment>,
}

#[derive(Debug, Serialize)]
pub struct AppointmentBookingResponse {
    pub appointment_booking: AppointmentBooking,
}

#[derive(Debug, Serialize)]
pub struct ErrorMessage {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorMessage,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: ErrorMessage { message: message.into() } }
    }
}
