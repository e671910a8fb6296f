// In-process Store used by the unit tests of the service and the HTTP layer.
// Enforces the same unique and ON DELETE RESTRICT constraints as the migration.

use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::actions::utc_day_bounds;
use crate::error::StoreFailure;
use crate::models::{
    Appointment, AppointmentBooking, AppointmentStatus, NewAppointment, NewAppointmentBooking, NewPatient,
    NewTreatmentCenter, Patient, PatientDetails, TreatmentCenter, TreatmentCenterDetails,
};
use crate::store::Store;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("duplicate key on {0}")]
    Duplicate(&'static str),
    #[error("no row in {0}")]
    Missing(&'static str),
    #[error("foreign key violation on {0}")]
    Reference(&'static str),
    #[error("store is unavailable")]
    Unavailable,
}

#[derive(Default)]
struct Tables {
    patients: Vec<Patient>,
    treatment_centers: Vec<TreatmentCenter>,
    appointments: Vec<Appointment>,
    bookings: Vec<AppointmentBooking>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Every call fails with a non-classified error.
    pub fn broken() -> Self {
        Self { unavailable: true, ..Self::default() }
    }

    fn with<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T, MemoryError>) -> Result<T, MemoryError> {
        if self.unavailable {
            return Err(MemoryError::Unavailable);
        }
        let mut tables = self.tables.lock().map_err(|_| MemoryError::Unavailable)?;
        f(&mut tables)
    }
}

impl Store for MemoryStore {
    type Error = MemoryError;

    fn classify_failure(&self, err: &MemoryError) -> StoreFailure {
        match err {
            MemoryError::Duplicate(_) => StoreFailure::UniqueViolation,
            MemoryError::Missing(_) => StoreFailure::MissingRow,
            MemoryError::Reference(_) => StoreFailure::ReferenceViolation,
            MemoryError::Unavailable => StoreFailure::Other,
        }
    }

    fn insert_patient(&self, patient: &NewPatient) -> Result<(), MemoryError> {
        self.with(|t| {
            if t.patients.iter().any(|p| p.id == patient.id) {
                return Err(MemoryError::Duplicate("patients"));
            }
            let now = Utc::now();
            t.patients.push(Patient {
                id: patient.id,
                email: patient.email.to_string(),
                first_name: patient.first_name.to_string(),
                last_name: patient.last_name.to_string(),
                created_at: now,
                updated_at: now,
            });
            Ok(())
        })
    }

    fn update_patient(&self, id: Uuid, details: &PatientDetails) -> Result<usize, MemoryError> {
        self.with(|t| {
            let mut updated = 0;
            for p in t.patients.iter_mut().filter(|p| p.id == id) {
                p.email = details.email.clone();
                p.first_name = details.first_name.clone();
                p.last_name = details.last_name.clone();
                p.updated_at = Utc::now();
                updated += 1;
            }
            Ok(updated)
        })
    }

    fn delete_patient(&self, id: Uuid) -> Result<usize, MemoryError> {
        self.with(|t| {
            if t.bookings.iter().any(|b| b.patient_id == id) {
                return Err(MemoryError::Reference("appointment_bookings"));
            }
            let before = t.patients.len();
            t.patients.retain(|p| p.id != id);
            Ok(before - t.patients.len())
        })
    }

    fn find_patient(&self, id: Uuid) -> Result<Patient, MemoryError> {
        self.with(|t| t.patients.iter().find(|p| p.id == id).cloned().ok_or(MemoryError::Missing("patients")))
    }

    fn all_patients(&self) -> Result<Vec<Patient>, MemoryError> {
        self.with(|t| Ok(t.patients.clone()))
    }

    fn insert_treatment_center(&self, center: &NewTreatmentCenter) -> Result<(), MemoryError> {
        self.with(|t| {
            if t.treatment_centers.iter().any(|c| c.id == center.id) {
                return Err(MemoryError::Duplicate("treatment_centers"));
            }
            let now = Utc::now();
            t.treatment_centers.push(TreatmentCenter {
                id: center.id,
                name: center.name.to_string(),
                address: center.address.to_string(),
                phone: center.phone.to_string(),
                created_at: now,
                updated_at: now,
            });
            Ok(())
        })
    }

    fn update_treatment_center(&self, id: Uuid, details: &TreatmentCenterDetails) -> Result<usize, MemoryError> {
        self.with(|t| {
            let mut updated = 0;
            for c in t.treatment_centers.iter_mut().filter(|c| c.id == id) {
                c.name = details.name.clone();
                c.address = details.address.clone();
                c.phone = details.phone.clone();
                c.updated_at = Utc::now();
                updated += 1;
            }
            Ok(updated)
        })
    }

    fn delete_treatment_center(&self, id: Uuid) -> Result<usize, MemoryError> {
        self.with(|t| {
            if t.appointments.iter().any(|a| a.treatment_center_id == id) {
                return Err(MemoryError::Reference("appointments"));
            }
            let before = t.treatment_centers.len();
            t.treatment_centers.retain(|c| c.id != id);
            Ok(before - t.treatment_centers.len())
        })
    }

    fn find_treatment_center(&self, id: Uuid) -> Result<TreatmentCenter, MemoryError> {
        self.with(|t| {
            t.treatment_centers.iter().find(|c| c.id == id).cloned().ok_or(MemoryError::Missing("treatment_centers"))
        })
    }

    fn all_treatment_centers(&self) -> Result<Vec<TreatmentCenter>, MemoryError> {
        self.with(|t| Ok(t.treatment_centers.clone()))
    }

    fn insert_appointment(&self, appointment: &NewAppointment) -> Result<(), MemoryError> {
        self.with(|t| {
            if t.appointments.iter().any(|a| a.id == appointment.id) {
                return Err(MemoryError::Duplicate("appointments"));
            }
            if !t.treatment_centers.iter().any(|c| c.id == appointment.treatment_center_id) {
                return Err(MemoryError::Reference("appointments"));
            }
            let now = Utc::now();
            t.appointments.push(Appointment {
                id: appointment.id,
                treatment_center_id: appointment.treatment_center_id,
                start_time: appointment.start_time,
                created_at: now,
                updated_at: now,
            });
            Ok(())
        })
    }

    fn reschedule_appointment(&self, id: Uuid, start_time: DateTime<Utc>) -> Result<usize, MemoryError> {
        self.with(|t| {
            let mut updated = 0;
            for a in t.appointments.iter_mut().filter(|a| a.id == id) {
                a.start_time = start_time;
                a.updated_at = Utc::now();
                updated += 1;
            }
            Ok(updated)
        })
    }

    fn delete_appointment(&self, id: Uuid) -> Result<usize, MemoryError> {
        self.with(|t| {
            if t.bookings.iter().any(|b| b.appointment_id == id) {
                return Err(MemoryError::Reference("appointment_bookings"));
            }
            let before = t.appointments.len();
            t.appointments.retain(|a| a.id != id);
            Ok(before - t.appointments.len())
        })
    }

    fn find_appointment(&self, id: Uuid) -> Result<Appointment, MemoryError> {
        self.with(|t| t.appointments.iter().find(|a| a.id == id).cloned().ok_or(MemoryError::Missing("appointments")))
    }

    fn all_appointments(&self) -> Result<Vec<Appointment>, MemoryError> {
        self.with(|t| Ok(t.appointments.clone()))
    }

    fn appointments_by_treatment_center(&self, center_id: Uuid) -> Result<Vec<Appointment>, MemoryError> {
        self.with(|t| Ok(t.appointments.iter().filter(|a| a.treatment_center_id == center_id).cloned().collect()))
    }

    fn available_appointments(&self) -> Result<Vec<Appointment>, MemoryError> {
        self.with(|t| {
            Ok(t.appointments
                .iter()
                .filter(|a| !t.bookings.iter().any(|b| b.appointment_id == a.id))
                .cloned()
                .collect())
        })
    }

    fn booked_appointments_for_day(&self, center_id: Uuid, day: NaiveDate) -> Result<Vec<Appointment>, MemoryError> {
        let (start, end) = utc_day_bounds(day);
        self.with(|t| {
            Ok(t.appointments
                .iter()
                .filter(|a| a.treatment_center_id == center_id)
                .filter(|a| a.start_time >= start && a.start_time < end)
                .filter(|a| t.bookings.iter().any(|b| b.appointment_id == a.id))
                .cloned()
                .collect())
        })
    }

    fn insert_booking(&self, booking: &NewAppointmentBooking) -> Result<(), MemoryError> {
        self.with(|t| {
            if t.bookings.iter().any(|b| b.id == booking.id || b.appointment_id == booking.appointment_id) {
                return Err(MemoryError::Duplicate("appointment_bookings"));
            }
            if !t.appointments.iter().any(|a| a.id == booking.appointment_id)
                || !t.patients.iter().any(|p| p.id == booking.patient_id)
            {
                return Err(MemoryError::Reference("appointment_bookings"));
            }
            let now = Utc::now();
            t.bookings.push(AppointmentBooking {
                id: booking.id,
                appointment_id: booking.appointment_id,
                patient_id: booking.patient_id,
                status: booking.status,
                created_at: now,
                updated_at: now,
            });
            Ok(())
        })
    }

    fn find_booking(&self, id: Uuid) -> Result<AppointmentBooking, MemoryError> {
        self.with(|t| t.bookings.iter().find(|b| b.id == id).cloned().ok_or(MemoryError::Missing("appointment_bookings")))
    }

    fn transition_booking(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus
    ) -> Result<usize, MemoryError> {
        self.with(|t| {
            let mut updated = 0;
            for b in t.bookings.iter_mut().filter(|b| b.id == id && b.status == from) {
                b.status = to;
                b.updated_at = Utc::now();
                updated += 1;
            }
            Ok(updated)
        })
    }
}
