use chrono::{DateTime, NaiveDate, Utc};
use diesel::{
    prelude::*,
    r2d2::{ConnectionManager, Pool, PooledConnection},
    result::{DatabaseErrorKind, Error as DieselError},
};
use thiserror::Error;
use uuid::Uuid;

use crate::actions;
use crate::error::StoreFailure;
use crate::models::{
    Appointment, AppointmentBooking, AppointmentStatus, NewAppointment, NewAppointmentBooking, NewPatient,
    NewTreatmentCenter, Patient, PatientDetails, TreatmentCenter, TreatmentCenterDetails,
};

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

pub fn initialize_db_pool(database_url: &str, max_size: u32) -> Result<DbPool, r2d2::Error> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder().max_size(max_size).build(manager)
}

/// Persistence capability the booking service is written against.
///
/// Point reads fail with an error that [`Store::classify_failure`] reports as
/// `MissingRow`. Updates and deletes return the number of affected rows.
/// Implementations must enforce, atomically per write:
/// unique ids, one booking per `appointment_id`, and restricting foreign keys.
pub trait Store: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn classify_failure(&self, err: &Self::Error) -> StoreFailure;

    fn insert_patient(&self, patient: &NewPatient) -> Result<(), Self::Error>;
    fn update_patient(&self, id: Uuid, details: &PatientDetails) -> Result<usize, Self::Error>;
    fn delete_patient(&self, id: Uuid) -> Result<usize, Self::Error>;
    fn find_patient(&self, id: Uuid) -> Result<Patient, Self::Error>;
    fn all_patients(&self) -> Result<Vec<Patient>, Self::Error>;

    fn insert_treatment_center(&self, center: &NewTreatmentCenter) -> Result<(), Self::Error>;
    fn update_treatment_center(&self, id: Uuid, details: &TreatmentCenterDetails) -> Result<usize, Self::Error>;
    fn delete_treatment_center(&self, id: Uuid) -> Result<usize, Self::Error>;
    fn find_treatment_center(&self, id: Uuid) -> Result<TreatmentCenter, Self::Error>;
    fn all_treatment_centers(&self) -> Result<Vec<TreatmentCenter>, Self::Error>;

    fn insert_appointment(&self, appointment: &NewAppointment) -> Result<(), Self::Error>;
    fn reschedule_appointment(&self, id: Uuid, start_time: DateTime<Utc>) -> Result<usize, Self::Error>;
    fn delete_appointment(&self, id: Uuid) -> Result<usize, Self::Error>;
    fn find_appointment(&self, id: Uuid) -> Result<Appointment, Self::Error>;
    fn all_appointments(&self) -> Result<Vec<Appointment>, Self::Error>;
    fn appointments_by_treatment_center(&self, center_id: Uuid) -> Result<Vec<Appointment>, Self::Error>;
    fn available_appointments(&self) -> Result<Vec<Appointment>, Self::Error>;
    fn booked_appointments_for_day(&self, center_id: Uuid, day: NaiveDate) -> Result<Vec<Appointment>, Self::Error>;

    fn insert_booking(&self, booking: &NewAppointmentBooking) -> Result<(), Self::Error>;
    fn find_booking(&self, id: Uuid) -> Result<AppointmentBooking, Self::Error>;
    fn transition_booking(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus
    ) -> Result<usize, Self::Error>;
}

#[derive(Debug, Error)]
pub enum PgStoreError {
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("query failed: {0}")]
    Query(#[from] DieselError),
}

/// PostgreSQL store backed by an r2d2 pool of diesel connections.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>, PgStoreError> {
        Ok(self.pool.get()?)
    }

    fn run<T>(&self, query: impl FnOnce(&mut PgConnection) -> QueryResult<T>) -> Result<T, PgStoreError> {
        let mut conn = self.conn()?;
        Ok(query(&mut conn)?)
    }
}

impl Store for PgStore {
    type Error = PgStoreError;

    fn classify_failure(&self, err: &PgStoreError) -> StoreFailure {
        match err {
            PgStoreError::Query(DieselError::NotFound) => StoreFailure::MissingRow,
            PgStoreError::Query(DieselError::DatabaseError(kind, info)) => {
                let failure = match kind {
                    DatabaseErrorKind::UniqueViolation => StoreFailure::UniqueViolation,
                    DatabaseErrorKind::ForeignKeyViolation => StoreFailure::ReferenceViolation,
                    _ => StoreFailure::Other,
                };
                if failure != StoreFailure::Other {
                    log::debug!(
                        "constraint {:?} violated on {:?}: {}",
                        info.constraint_name(),
                        info.table_name(),
                        info.message()
                    );
                }
                failure
            }
            _ => StoreFailure::Other,
        }
    }

    fn insert_patient(&self, patient: &NewPatient) -> Result<(), PgStoreError> {
        self.run(|conn| actions::insert_patient(conn, patient))
    }

    fn update_patient(&self, id: Uuid, details: &PatientDetails) -> Result<usize, PgStoreError> {
        self.run(|conn| actions::update_patient(conn, id, details))
    }

    fn delete_patient(&self, id: Uuid) -> Result<usize, PgStoreError> {
        self.run(|conn| actions::delete_patient(conn, id))
    }

    fn find_patient(&self, id: Uuid) -> Result<Patient, PgStoreError> {
        self.run(|conn| actions::find_patient(conn, id))
    }

    fn all_patients(&self) -> Result<Vec<Patient>, PgStoreError> {
        self.run(actions::all_patients)
    }

    fn insert_treatment_center(&self, center: &NewTreatmentCenter) -> Result<(), PgStoreError> {
        self.run(|conn| actions::insert_treatment_center(conn, center))
    }

    fn update_treatment_center(&self, id: Uuid, details: &TreatmentCenterDetails) -> Result<usize, PgStoreError> {
        self.run(|conn| actions::update_treatment_center(conn, id, details))
    }

    fn delete_treatment_center(&self, id: Uuid) -> Result<usize, PgStoreError> {
        self.run(|conn| actions::delete_treatment_center(conn, id))
    }

    fn find_treatment_center(&self, id: Uuid) -> Result<TreatmentCenter, PgStoreError> {
        self.run(|conn| actions::find_treatment_center(conn, id))
    }

    fn all_treatment_centers(&self) -> Result<Vec<TreatmentCenter>, PgStoreError> {
        self.run(actions::all_treatment_centers)
    }

    fn insert_appointment(&self, appointment: &NewAppointment) -> Result<(), PgStoreError> {
        self.run(|conn| actions::insert_appointment(conn, appointment))
    }

    fn reschedule_appointment(&self, id: Uuid, start_time: DateTime<Utc>) -> Result<usize, PgStoreError> {
        self.run(|conn| actions::reschedule_appointment(conn, id, start_time))
    }

    fn delete_appointment(&self, id: Uuid) -> Result<usize, PgStoreError> {
        self.run(|conn| actions::delete_appointment(conn, id))
    }

    fn find_appointment(&self, id: Uuid) -> Result<Appointment, PgStoreError> {
        self.run(|conn| actions::find_appointment(conn, id))
    }

    fn all_appointments(&self) -> Result<Vec<Appointment>, PgStoreError> {
        self.run(actions::all_appointments)
    }

    fn appointments_by_treatment_center(&self, center_id: Uuid) -> Result<Vec<Appointment>, PgStoreError> {
        self.run(|conn| actions::appointments_by_treatment_center(conn, center_id))
    }

    fn available_appointments(&self) -> Result<Vec<Appointment>, PgStoreError> {
        self.run(actions::available_appointments)
    }

    fn booked_appointments_for_day(&self, center_id: Uuid, day: NaiveDate) -> Result<Vec<Appointment>, PgStoreError> {
        self.run(|conn| actions::booked_appointments_for_day(conn, center_id, day))
    }

    fn insert_booking(&self, booking: &NewAppointmentBooking) -> Result<(), PgStoreError> {
        self.run(|conn| actions::insert_booking(conn, booking))
    }

    fn find_booking(&self, id: Uuid) -> Result<AppointmentBooking, PgStoreError> {
        self.run(|conn| actions::find_booking(conn, id))
    }

    fn transition_booking(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus
    ) -> Result<usize, PgStoreError> {
        self.run(|conn| actions::transition_booking(conn, id, from, to))
    }
}
