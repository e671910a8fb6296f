use actix_web::{error, http::StatusCode, web, HttpResponse, Responder, ResponseError};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::booking::BookingService;
use crate::error::DomainError;
use crate::models::{self, ErrorResponse};
use crate::store::Store;

impl ResponseError for DomainError {
    fn status_code(&self) -> StatusCode {
        match self {
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Conflict(_) | DomainError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            DomainError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.to_string()))
    }
}

fn parse_id(raw: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(raw).map_err(|_| DomainError::InvalidArgument(format!("invalid id: {}", raw)))
}

fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, DomainError> {
    raw.map(|d| {
        NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .map_err(|_| DomainError::InvalidArgument(format!("date should be YYYY-MM-DD, got {}", d)))
    })
    .transpose()
}

/// Registers every route on `cfg`. The app must also provide
/// `web::Data<BookingService<S>>`.
pub fn configure<S: Store>(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        let detail = err.to_string();
        let response = match err {
            error::JsonPayloadError::ContentType => {
                HttpResponse::UnsupportedMediaType().json(ErrorResponse::new("Unsupported Media Type"))
            }
            error::JsonPayloadError::Deserialize(ref err) => {
                HttpResponse::BadRequest().json(ErrorResponse::new(err.to_string()))
            }
            _ => HttpResponse::BadRequest().json(ErrorResponse::new(detail)),
        };
        error::InternalError::from_response(err, response).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(ErrorResponse::new(err.to_string()));
        error::InternalError::from_response(err, response).into()
    }))
    .route("/", web::get().to(index))
    .service(
        web::scope("/v1")
            .service(
                web::resource("/patients")
                    .route(web::get().to(list_patients::<S>))
                    .route(web::post().to(create_patient::<S>)),
            )
            .service(
                web::resource("/patients/{patient_id}")
                    .route(web::get().to(get_patient::<S>))
                    .route(web::put().to(update_patient::<S>))
                    .route(web::delete().to(delete_patient::<S>)),
            )
            .service(
                web::resource("/treatment_centers")
                    .route(web::get().to(list_treatment_centers::<S>))
                    .route(web::post().to(create_treatment_center::<S>)),
            )
            .service(
                web::resource("/treatment_centers/{treatment_center_id}")
                    .route(web::get().to(get_treatment_center::<S>))
                    .route(web::put().to(update_treatment_center::<S>))
                    .route(web::delete().to(delete_treatment_center::<S>)),
            )
            .service(
                web::resource("/treatment_centers/{treatment_center_id}/appointments")
                    .route(web::get().to(list_center_appointments::<S>)),
            )
            .service(
                web::resource("/treatment_centers/{treatment_center_id}/bookings")
                    .route(web::get().to(list_booked_appointments::<S>)),
            )
            .service(
                web::resource("/appointments")
                    .route(web::get().to(list_available_appointments::<S>))
                    .route(web::post().to(create_appointment::<S>)),
            )
            // before /appointments/{appointment_id} so "all" is not read as an id
            .service(web::resource("/appointments/all").route(web::get().to(list_appointments::<S>)))
            .service(
                web::resource("/appointments/{appointment_id}")
                    .route(web::get().to(get_appointment::<S>))
                    .route(web::put().to(reschedule_appointment::<S>))
                    .route(web::delete().to(delete_appointment::<S>)),
            )
            .service(
                web::resource("/appointments/{appointment_id}/bookings")
                    .route(web::post().to(book_appointment::<S>)),
            )
            .service(web::resource("/bookings/{booking_id}").route(web::get().to(get_booking::<S>)))
            .service(
                web::resource("/bookings/{booking_id}/confirm").route(web::post().to(confirm_booking::<S>)),
            ),
    );
}

async fn index() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "component": "covidvax",
    }))
}

async fn list_patients<S: Store>(service: web::Data<BookingService<S>>) -> actix_web::Result<impl Responder> {
    let patients = web::block(move || service.list_patients()).await??;
    Ok(HttpResponse::Ok().json(models::PatientsResponse { patients }))
}

async fn get_patient<S: Store>(
    service: web::Data<BookingService<S>>,
    path: web::Path<String>
) -> actix_web::Result<impl Responder> {
    let id = parse_id(&path)?;
    let patient = web::block(move || service.get_patient(id)).await??;
    Ok(HttpResponse::Ok().json(models::PatientResponse { patient }))
}

async fn create_patient<S: Store>(
    service: web::Data<BookingService<S>>,
    form: web::Json<models::PatientDetails>
) -> actix_web::Result<impl Responder> {
    let patient = web::block(move || service.create_patient(&form)).await??;
    Ok(HttpResponse::Created().json(models::PatientResponse { patient }))
}

async fn update_patient<S: Store>(
    service: web::Data<BookingService<S>>,
    path: web::Path<String>,
    form: web::Json<models::PatientDetails>
) -> actix_web::Result<impl Responder> {
    let id = parse_id(&path)?;
    let patient = web::block(move || service.update_patient(id, &form)).await??;
    Ok(HttpResponse::Ok().json(models::PatientResponse { patient }))
}

async fn delete_patient<S: Store>(
    service: web::Data<BookingService<S>>,
    path: web::Path<String>
) -> actix_web::Result<impl Responder> {
    let id = parse_id(&path)?;
    web::block(move || service.delete_patient(id)).await??;
    Ok(HttpResponse::NoContent().finish())
}

async fn list_treatment_centers<S: Store>(
    service: web::Data<BookingService<S>>
) -> actix_web::Result<impl Responder> {
    let treatment_centers = web::block(move || service.list_treatment_centers()).await??;
    Ok(HttpResponse::Ok().json(models::TreatmentCentersResponse { treatment_centers }))
}

async fn get_treatment_center<S: Store>(
    service: web::Data<BookingService<S>>,
    path: web::Path<String>
) -> actix_web::Result<impl Responder> {
    let id = parse_id(&path)?;
    let treatment_center = web::block(move || service.get_treatment_center(id)).await??;
    Ok(HttpResponse::Ok().json(models::TreatmentCenterResponse { treatment_center }))
}

async fn create_treatment_center<S: Store>(
    service: web::Data<BookingService<S>>,
    form: web::Json<models::TreatmentCenterDetails>
) -> actix_web::Result<impl Responder> {
    let treatment_center = web::block(move || service.create_treatment_center(&form)).await??;
    Ok(HttpResponse::Created().json(models::TreatmentCenterResponse { treatment_center }))
}

async fn update_treatment_center<S: Store>(
    service: web::Data<BookingService<S>>,
    path: web::Path<String>,
    form: web::Json<models::TreatmentCenterDetails>
) -> actix_web::Result<impl Responder> {
    let id = parse_id(&path)?;
    let treatment_center = web::block(move || service.update_treatment_center(id, &form)).await??;
    Ok(HttpResponse::Ok().json(models::TreatmentCenterResponse { treatment_center }))
}

async fn delete_treatment_center<S: Store>(
    service: web::Data<BookingService<S>>,
    path: web::Path<String>
) -> actix_web::Result<impl Responder> {
    let id = parse_id(&path)?;
    web::block(move || service.delete_treatment_center(id)).await??;
    Ok(HttpResponse::NoContent().finish())
}

async fn list_center_appointments<S: Store>(
    service: web::Data<BookingService<S>>,
    path: web::Path<String>
) -> actix_web::Result<impl Responder> {
    let id = parse_id(&path)?;
    let appointments = web::block(move || service.list_center_appointments(id)).await??;
    Ok(HttpResponse::Ok().json(models::AppointmentsResponse { appointments }))
}

async fn list_booked_appointments<S: Store>(
    service: web::Data<BookingService<S>>,
    path: web::Path<String>,
    query: web::Query<models::BookedAppointmentsQuery>
) -> actix_web::Result<impl Responder> {
    let id = parse_id(&path)?;
    let date = parse_date(query.date.as_deref())?;
    let appointments = web::block(move || service.list_booked_appointments(id, date)).await??;
    Ok(HttpResponse::Ok().json(models::AppointmentsResponse { appointments }))
}

async fn list_available_appointments<S: Store>(
    service: web::Data<BookingService<S>>
) -> actix_web::Result<impl Responder> {
    let appointments = web::block(move || service.list_available_appointments()).await??;
    Ok(HttpResponse::Ok().json(models::AppointmentsResponse { appointments }))
}

async fn list_appointments<S: Store>(service: web::Data<BookingService<S>>) -> actix_web::Result<impl Responder> {
    let appointments = web::block(move || service.list_appointments()).await??;
    Ok(HttpResponse::Ok().json(models::AppointmentsResponse { appointments }))
}

async fn get_appointment<S: Store>(
    service: web::Data<BookingService<S>>,
    path: web::Path<String>
) -> actix_web::Result<impl Responder> {
    let id = parse_id(&path)?;
    let appointment = web::block(move || service.get_appointment(id)).await??;
    Ok(HttpResponse::Ok().json(models::AppointmentResponse { appointment }))
}

async fn create_appointment<S: Store>(
    service: web::Data<BookingService<S>>,
    form: web::Json<models::CreateAppointmentRequest>
) -> actix_web::Result<impl Responder> {
    let form = form.into_inner();
    let appointment =
        web::block(move || service.create_appointment(form.treatment_center_id, form.start_time)).await??;
    Ok(HttpResponse::Created().json(models::AppointmentResponse { appointment }))
}

async fn reschedule_appointment<S: Store>(
    service: web::Data<BookingService<S>>,
    path: web::Path<String>,
    form: web::Json<models::RescheduleAppointmentRequest>
) -> actix_web::Result<impl Responder> {
    let id = parse_id(&path)?;
    let start_time = form.start_time;
    let appointment = web::block(move || service.reschedule_appointment(id, start_time)).await??;
    Ok(HttpResponse::Ok().json(models::AppointmentResponse { appointment }))
}

async fn delete_appointment<S: Store>(
    service: web::Data<BookingService<S>>,
    path: web::Path<String>
) -> actix_web::Result<impl Responder> {
    let id = parse_id(&path)?;
    web::block(move || service.delete_appointment(id)).await??;
    Ok(HttpResponse::NoContent().finish())
}

async fn book_appointment<S: Store>(
    service: web::Data<BookingService<S>>,
    path: web::Path<String>,
    form: web::Json<models::BookAppointmentRequest>
) -> actix_web::Result<impl Responder> {
    let appointment_id = parse_id(&path)?;
    let patient_id = form.patient_id;
    let appointment_booking = web::block(move || service.create_booking(appointment_id, patient_id)).await??;
    Ok(HttpResponse::Created().json(models::AppointmentBookingResponse { appointment_booking }))
}

async fn get_booking<S: Store>(
    service: web::Data<BookingService<S>>,
    path: web::Path<String>
) -> actix_web::Result<impl Responder> {
    let id = parse_id(&path)?;
    let appointment_booking = web::block(move || service.get_booking(id)).await??;
    Ok(HttpResponse::Ok().json(models::AppointmentBookingResponse { appointment_booking }))
}

async fn confirm_booking<S: Store>(
    service: web::Data<BookingService<S>>,
    path: web::Path<String>
) -> actix_web::Result<impl Responder> {
    let id = parse_id(&path)?;
    let appointment_booking = web::block(move || service.confirm_booking(id)).await??;
    Ok(HttpResponse::Ok().json(models::AppointmentBookingResponse { appointment_booking }))
}
