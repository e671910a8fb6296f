use std::error::Error;
use std::sync::Mutex;

use covidvax::booking::BookingService;
use covidvax::models::{PatientDetails, TreatmentCenterDetails};
use covidvax::store::{initialize_db_pool, DbPool, PgStore};
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::testcontainers::{runners::SyncRunner, Container};
use uuid::Uuid;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

// Tests sharing one TEST_DATABASE_URL must not migrate it concurrently.
static MIGRATE: Mutex<()> = Mutex::new(());

pub struct TestDb {
    pub pool: DbPool,
    pub service: BookingService<PgStore>,
    // dropping the container removes it
    _node: Option<Container<Postgres>>,
}

/// Database for one test: `TEST_DATABASE_URL` when set, otherwise a throwaway
/// postgres container. `None` when neither is available.
pub fn database() -> Option<TestDb> {
    let (url, node) = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => (url, None),
        Err(_) => match start_postgres() {
            Ok((url, node)) => (url, Some(node)),
            Err(e) => {
                eprintln!("TEST_DATABASE_URL not set and no postgres container ({}), skipping store integration test", e);
                return None;
            }
        },
    };

    let pool = initialize_db_pool(&url, 16).expect("test database should be reachable");
    {
        let _guard = MIGRATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut pooled = pool.get().expect("test database connection");
        let conn: &mut PgConnection = &mut pooled;
        conn.run_pending_migrations(MIGRATIONS).expect("migrations should apply");
    }

    Some(TestDb {
        service: BookingService::new(PgStore::new(pool.clone())),
        pool,
        _node: node,
    })
}

fn start_postgres() -> Result<(String, Container<Postgres>), Box<dyn Error>> {
    let node = Postgres::default().start()?;
    let url = format!(
        "postgres://postgres:postgres@{}:{}/postgres",
        node.get_host()?,
        node.get_host_port_ipv4(5432)?
    );
    Ok((url, node))
}

pub fn patient_details() -> PatientDetails {
    PatientDetails {
        email: format!("patient.{}@some.com", Uuid::new_v4().simple()),
        first_name: "Patient".to_string(),
        last_name: "One".to_string(),
    }
}

pub fn center_details() -> TreatmentCenterDetails {
    TreatmentCenterDetails {
        name: format!("Center {}", Uuid::new_v4().simple()),
        address: "somewhere".to_string(),
        phone: "0422420033".to_string(),
    }
}
