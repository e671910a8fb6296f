use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use regex::Regex;
use uuid::Uuid;

use crate::error::{translate, Action, DomainError};
use crate::models::{
    Appointment, AppointmentBooking, AppointmentStatus, NewAppointment, NewAppointmentBooking, NewPatient,
    NewTreatmentCenter, Patient, PatientDetails, TreatmentCenter, TreatmentCenterDetails,
};
use crate::store::Store;

type Result<T> = std::result::Result<T, DomainError>;

const PATIENT: &str = "patient";
const TREATMENT_CENTER: &str = "treatment center";
const APPOINTMENT: &str = "appointment";
const BOOKING: &str = "appointment booking";

/// Availability and booking rules on top of an injected [`Store`].
///
/// Holds no mutable state of its own. Every guarantee under concurrency,
/// one booking per appointment in particular, comes from the store's
/// constraints.
pub struct BookingService<S> {
    store: S,
}

impl<S: Store> BookingService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn fail(&self, entity: &str, action: Action, err: S::Error) -> DomainError {
        translate(self.store.classify_failure(&err), action, entity, &err)
    }

    fn affected(rows: usize, entity: &str) -> Result<()> {
        if rows == 0 {
            return Err(DomainError::NotFound(entity.to_string()));
        }
        Ok(())
    }

    // Patients

    pub fn list_patients(&self) -> Result<Vec<Patient>> {
        self.store.all_patients().map_err(|e| self.fail(PATIENT, Action::Read, e))
    }

    pub fn get_patient(&self, id: Uuid) -> Result<Patient> {
        self.store.find_patient(id).map_err(|e| self.fail(PATIENT, Action::Read, e))
    }

    pub fn create_patient(&self, details: &PatientDetails) -> Result<Patient> {
        validate_patient(details)?;

        let new_patient = NewPatient {
            id: Uuid::new_v4(),
            email: details.email.trim(),
            first_name: details.first_name.trim(),
            last_name: details.last_name.trim(),
        };
        self.store.insert_patient(&new_patient).map_err(|e| self.fail(PATIENT, Action::Write, e))?;

        self.get_patient(new_patient.id)
    }

    pub fn update_patient(&self, id: Uuid, details: &PatientDetails) -> Result<Patient> {
        validate_patient(details)?;

        let details = PatientDetails {
            email: details.email.trim().to_string(),
            first_name: details.first_name.trim().to_string(),
            last_name: details.last_name.trim().to_string(),
        };
        let rows = self.store.update_patient(id, &details).map_err(|e| self.fail(PATIENT, Action::Write, e))?;
        Self::affected(rows, PATIENT)?;

        self.get_patient(id)
    }

    pub fn delete_patient(&self, id: Uuid) -> Result<()> {
        let rows = self.store.delete_patient(id).map_err(|e| self.fail(PATIENT, Action::Delete, e))?;
        Self::affected(rows, PATIENT)
    }

    // Treatment centers

    pub fn list_treatment_centers(&self) -> Result<Vec<TreatmentCenter>> {
        self.store.all_treatment_centers().map_err(|e| self.fail(TREATMENT_CENTER, Action::Read, e))
    }

    pub fn get_treatment_center(&self, id: Uuid) -> Result<TreatmentCenter> {
        self.store.find_treatment_center(id).map_err(|e| self.fail(TREATMENT_CENTER, Action::Read, e))
    }

    pub fn create_treatment_center(&self, details: &TreatmentCenterDetails) -> Result<TreatmentCenter> {
        validate_treatment_center(details)?;

        let center = NewTreatmentCenter {
            id: Uuid::new_v4(),
            name: details.name.trim(),
            address: details.address.trim(),
            phone: details.phone.trim(),
        };
        self.store
            .insert_treatment_center(&center)
            .map_err(|e| self.fail(TREATMENT_CENTER, Action::Write, e))?;

        self.get_treatment_center(center.id)
    }

    pub fn update_treatment_center(&self, id: Uuid, details: &TreatmentCenterDetails) -> Result<TreatmentCenter> {
        validate_treatment_center(details)?;

        let details = TreatmentCenterDetails {
            name: details.name.trim().to_string(),
            address: details.address.trim().to_string(),
            phone: details.phone.trim().to_string(),
        };
        let rows = self
            .store
            .update_treatment_center(id, &details)
            .map_err(|e| self.fail(TREATMENT_CENTER, Action::Write, e))?;
        Self::affected(rows, TREATMENT_CENTER)?;

        self.get_treatment_center(id)
    }

    pub fn delete_treatment_center(&self, id: Uuid) -> Result<()> {
        let rows = self
            .store
            .delete_treatment_center(id)
            .map_err(|e| self.fail(TREATMENT_CENTER, Action::Delete, e))?;
        Self::affected(rows, TREATMENT_CENTER)
    }

    // Appointments

    pub fn list_available_appointments(&self) -> Result<Vec<Appointment>> {
        self.store.available_appointments().map_err(|e| self.fail(APPOINTMENT, Action::Read, e))
    }

    pub fn list_appointments(&self) -> Result<Vec<Appointment>> {
        self.store.all_appointments().map_err(|e| self.fail(APPOINTMENT, Action::Read, e))
    }

    pub fn list_center_appointments(&self, center_id: Uuid) -> Result<Vec<Appointment>> {
        self.store
            .appointments_by_treatment_center(center_id)
            .map_err(|e| self.fail(APPOINTMENT, Action::Read, e))
    }

    /// Booked appointments of a center whose start falls on `date` in UTC.
    /// `None` means today (UTC) at call time.
    pub fn list_booked_appointments(&self, center_id: Uuid, date: Option<NaiveDate>) -> Result<Vec<Appointment>> {
        let day = date.unwrap_or_else(|| Utc::now().date_naive());
        self.store
            .booked_appointments_for_day(center_id, day)
            .map_err(|e| self.fail(APPOINTMENT, Action::Read, e))
    }

    pub fn get_appointment(&self, id: Uuid) -> Result<Appointment> {
        self.store.find_appointment(id).map_err(|e| self.fail(APPOINTMENT, Action::Read, e))
    }

    pub fn create_appointment(&self, center_id: Uuid, start_time: DateTime<Utc>) -> Result<Appointment> {
        let appointment = NewAppointment {
            id: Uuid::new_v4(),
            treatment_center_id: center_id,
            start_time: to_stored_precision(start_time),
        };
        self.store
            .insert_appointment(&appointment)
            .map_err(|e| match self.fail(APPOINTMENT, Action::Write, e) {
                DomainError::NotFound(_) => DomainError::NotFound(TREATMENT_CENTER.to_string()),
                other => other,
            })?;

        self.get_appointment(appointment.id)
    }

    pub fn reschedule_appointment(&self, id: Uuid, start_time: DateTime<Utc>) -> Result<Appointment> {
        let rows = self
            .store
            .reschedule_appointment(id, to_stored_precision(start_time))
            .map_err(|e| self.fail(APPOINTMENT, Action::Write, e))?;
        Self::affected(rows, APPOINTMENT)?;

        self.get_appointment(id)
    }

    pub fn delete_appointment(&self, id: Uuid) -> Result<()> {
        let rows = self.store.delete_appointment(id).map_err(|e| self.fail(APPOINTMENT, Action::Delete, e))?;
        Self::affected(rows, APPOINTMENT)
    }

    // Bookings

    /// Claims `appointment_id` for `patient_id`.
    ///
    /// Neither id is checked up front. The insert either wins the unique
    /// index on `appointment_id` or fails with `Conflict`; a missing
    /// appointment or patient surfaces as `NotFound`.
    pub fn create_booking(&self, appointment_id: Uuid, patient_id: Uuid) -> Result<AppointmentBooking> {
        let booking = NewAppointmentBooking {
            id: Uuid::new_v4(),
            appointment_id,
            patient_id,
            status: AppointmentStatus::AwaitingConfirmation,
        };

        self.store.insert_booking(&booking).map_err(|e| match self.fail(BOOKING, Action::Write, e) {
            DomainError::Conflict(_) => DomainError::Conflict("appointment is already booked".to_string()),
            DomainError::NotFound(_) => DomainError::NotFound(format!("{} or {}", APPOINTMENT, PATIENT)),
            other => other,
        })?;
        log::info!("booking {} created for appointment {} by patient {}", booking.id, appointment_id, patient_id);

        self.get_booking(booking.id)
    }

    pub fn get_booking(&self, id: Uuid) -> Result<AppointmentBooking> {
        self.store.find_booking(id).map_err(|e| self.fail(BOOKING, Action::Read, e))
    }

    pub fn confirm_booking(&self, id: Uuid) -> Result<AppointmentBooking> {
        let from = AppointmentStatus::AwaitingConfirmation;
        let to = AppointmentStatus::Confirmed;

        let rows = self.store.transition_booking(id, from, to).map_err(|e| self.fail(BOOKING, Action::Write, e))?;
        if rows == 0 {
            // Either the booking does not exist or it already left `from`.
            let current = self.get_booking(id)?;
            if !current.status.can_become(to) {
                return Err(DomainError::Conflict(format!("{} is already {}", BOOKING, current.status)));
            }
            return Err(DomainError::Conflict(format!("{} changed concurrently", BOOKING)));
        }
        log::info!("booking {} confirmed", id);

        self.get_booking(id)
    }
}

// timestamptz keeps microseconds
fn to_stored_precision(t: DateTime<Utc>) -> DateTime<Utc> {
    t.trunc_subsecs(6)
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"))
}

// Widths of the VARCHAR columns in the migration.
const MAX_TEXT_LEN: usize = 255;
const MAX_PHONE_LEN: usize = 64;

fn require(field: &str, value: &str, max_len: usize) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::InvalidArgument(format!("{} is required", field)));
    }
    if value.chars().count() > max_len {
        return Err(DomainError::InvalidArgument(format!("{} must be at most {} characters", field, max_len)));
    }
    Ok(())
}

fn validate_patient(details: &PatientDetails) -> Result<()> {
    require("email", &details.email, MAX_TEXT_LEN)?;
    require("first_name", &details.first_name, MAX_TEXT_LEN)?;
    require("last_name", &details.last_name, MAX_TEXT_LEN)?;
    if !email_pattern().is_match(details.email.trim()) {
        return Err(DomainError::InvalidArgument("email is not a valid address".to_string()));
    }
    Ok(())
}

fn validate_treatment_center(details: &TreatmentCenterDetails) -> Result<()> {
    require("name", &details.name, MAX_TEXT_LEN)?;
    require("address", &details.address, MAX_TEXT_LEN)?;
    require("phone", &details.phone, MAX_PHONE_LEN)
}
