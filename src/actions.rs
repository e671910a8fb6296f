use diesel::prelude::*;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;
use crate::models::{self, AppointmentStatus};

pub fn insert_patient(conn: &mut PgConnection, new_patient: &models::NewPatient) -> QueryResult<()> {
    use crate::schema::patients::dsl::patients;

    diesel::insert_into(patients).values(new_patient).execute(conn)?;
    Ok(())
}

pub fn update_patient(conn: &mut PgConnection, patient_id: Uuid, details: &models::PatientDetails) -> QueryResult<usize> {
    use crate::schema::patients::dsl::{patients, email, first_name, last_name, updated_at};

    diesel::update(patients.find(patient_id))
        .set((
            email.eq(&details.email),
            first_name.eq(&details.first_name),
            last_name.eq(&details.last_name),
            updated_at.eq(Utc::now()),
        ))
        .execute(conn)
}

pub fn delete_patient(conn: &mut PgConnection, patient_id: Uuid) -> QueryResult<usize> {
    use crate::schema::patients::dsl::patients;

    diesel::delete(patients.find(patient_id)).execute(conn)
}

pub fn find_patient(conn: &mut PgConnection, patient_id: Uuid) -> QueryResult<models::Patient> {
    use crate::schema::patients::dsl::patients;

    patients
        .find(patient_id)
        .select(models::Patient::as_select())
        .first(conn)
}

pub fn all_patients(conn: &mut PgConnection) -> QueryResult<Vec<models::Patient>> {
    use crate::schema::patients::dsl::patients;

    patients.select(models::Patient::as_select()).load(conn)
}

pub fn insert_treatment_center(conn: &mut PgConnection, center: &models::NewTreatmentCenter) -> QueryResult<()> {
    use crate::schema::treatment_centers::dsl::treatment_centers;

    diesel::insert_into(treatment_centers).values(center).execute(conn)?;
    Ok(())
}

pub fn update_treatment_center(
    conn: &mut PgConnection,
    center_id: Uuid,
    details: &models::TreatmentCenterDetails
) -> QueryResult<usize> {
    use crate::schema::treatment_centers::dsl::{treatment_centers, name, address, phone, updated_at};

    diesel::update(treatment_centers.find(center_id))
        .set((
            name.eq(&details.name),
            address.eq(&details.address),
            phone.eq(&details.phone),
            updated_at.eq(Utc::now()),
        ))
        .execute(conn)
}

pub fn delete_treatment_center(conn: &mut PgConnection, center_id: Uuid) -> QueryResult<usize> {
    use crate::schema::treatment_centers::dsl::treatment_centers;

    diesel::delete(treatment_centers.find(center_id)).execute(conn)
}

pub fn find_treatment_center(conn: &mut PgConnection, center_id: Uuid) -> QueryResult<models::TreatmentCenter> {
    use crate::schema::treatment_centers::dsl::treatment_centers;

    treatment_centers
        .find(center_id)
        .select(models::TreatmentCenter::as_select())
        .first(conn)
}

pub fn all_treatment_centers(conn: &mut PgConnection) -> QueryResult<Vec<models::TreatmentCenter>> {
    use crate::schema::treatment_centers::dsl::treatment_centers;

    treatment_centers.select(models::TreatmentCenter::as_select()).load(conn)
}

pub fn insert_appointment(conn: &mut PgConnection, appointment: &models::NewAppointment) -> QueryResult<()> {
    use crate::schema::appointments::dsl::appointments;

    diesel::insert_into(appointments).values(appointment).execute(conn)?;
    Ok(())
}

pub fn reschedule_appointment(
    conn: &mut PgConnection,
    appointment_id: Uuid,
    new_start: DateTime<Utc>
) -> QueryResult<usize> {
    use crate::schema::appointments::dsl::{appointments, start_time, updated_at};

    diesel::update(appointments.find(appointment_id))
        .set((start_time.eq(new_start), updated_at.eq(Utc::now())))
        .execute(conn)
}

pub fn delete_appointment(conn: &mut PgConnection, appointment_id: Uuid) -> QueryResult<usize> {
    use crate::schema::appointments::dsl::appointments;

    diesel::delete(appointments.find(appointment_id)).execute(conn)
}

pub fn find_appointment(conn: &mut PgConnection, appointment_id: Uuid) -> QueryResult<models::Appointment> {
    use crate::schema::appointments::dsl::appointments;

    appointments
        .find(appointment_id)
        .select(models::Appointment::as_select())
        .first(conn)
}

pub fn all_appointments(conn: &mut PgConnection) -> QueryResult<Vec<models::Appointment>> {
    use crate::schema::appointments::dsl::appointments;

    appointments.select(models::Appointment::as_select()).load(conn)
}

pub fn appointments_by_treatment_center(
    conn: &mut PgConnection,
    center_id: Uuid
) -> QueryResult<Vec<models::Appointment>> {
    use crate::schema::appointments::dsl::{appointments, treatment_center_id};

    appointments
        .filter(treatment_center_id.eq(center_id))
        .select(models::Appointment::as_select())
        .load(conn)
}

// Slots with no booking row: appointments LEFT JOIN appointment_bookings
// WHERE appointment_bookings.appointment_id IS NULL
pub fn available_appointments(conn: &mut PgConnection) -> QueryResult<Vec<models::Appointment>> {
    use crate::schema::{appointment_bookings, appointments};

    appointments::table
        .left_join(appointment_bookings::table)
        .filter(appointment_bookings::appointment_id.nullable().is_null())
        .select(models::Appointment::as_select())
        .load(conn)
}

pub fn booked_appointments_for_day(
    conn: &mut PgConnection,
    center_id: Uuid,
    day: NaiveDate
) -> QueryResult<Vec<models::Appointment>> {
    use crate::schema::{appointment_bookings, appointments};

    let (day_start, day_end) = utc_day_bounds(day);

    appointments::table
        .left_join(appointment_bookings::table)
        .filter(appointment_bookings::appointment_id.nullable().is_not_null())
        .filter(appointments::treatment_center_id.eq(center_id))
        .filter(appointments::start_time.ge(day_start))
        .filter(appointments::start_time.lt(day_end))
        .select(models::Appointment::as_select())
        .load(conn)
}

// Half-open [00:00Z, next day 00:00Z), same as truncating start_time to the day in UTC
pub fn utc_day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(chrono::NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

pub fn insert_booking(conn: &mut PgConnection, booking: &models::NewAppointmentBooking) -> QueryResult<()> {
    use crate::schema::appointment_bookings::dsl::appointment_bookings;

    diesel::insert_into(appointment_bookings).values(booking).execute(conn)?;
    Ok(())
}

pub fn find_booking(conn: &mut PgConnection, booking_id: Uuid) -> QueryResult<models::AppointmentBooking> {
    use crate::schema::appointment_bookings::dsl::appointment_bookings;

    appointment_bookings
        .find(booking_id)
        .select(models::AppointmentBooking::as_select())
        .first(conn)
}

// Conditional on the current status so that concurrent confirmations cannot both apply
pub fn transition_booking(
    conn: &mut PgConnection,
    booking_id: Uuid,
    from: AppointmentStatus,
    to: AppointmentStatus
) -> QueryResult<usize> {
    use crate::schema::appointment_bookings::dsl::{appointment_bookings, status, updated_at};

    diesel::update(appointment_bookings.find(booking_id))
        .filter(status.eq(from))
        .set((status.eq(to), updated_at.eq(Utc::now())))
        .execute(conn)
}
