use super::storage::{Backend, Statement, Storage, StorageError};

/// Creates every table and index if absent. Safe to run on each startup.
pub async fn create(db: &dyn Storage) -> Result<(), StorageError> {
    let statements = match db.backend() {
        Backend::Sqlite => SQLITE,
        Backend::Postgres => POSTGRES,
        Backend::MySql => MYSQL,
    };

    for sql in statements {
        db.execute(&Statement::new(*sql)).await?;
    }

    tracing::info!(backend = %db.backend(), "schema ready");
    Ok(())
}

// ── SQLite ──

const SQLITE: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'admin',
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS locations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        address TEXT,
        city TEXT,
        state TEXT,
        zip_code TEXT,
        phone TEXT,
        email TEXT,
        latitude REAL,
        longitude REAL,
        is_active INTEGER NOT NULL DEFAULT 1,
        operating_hours TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS services (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        service_key TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        category TEXT NOT NULL,
        description TEXT,
        duration INTEGER NOT NULL,
        price REAL NOT NULL,
        durations TEXT,
        prices TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS classes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        course_key TEXT UNIQUE,
        title TEXT NOT NULL,
        description TEXT,
        instructor TEXT NOT NULL,
        class_date TEXT NOT NULL,
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        location_id INTEGER NOT NULL REFERENCES locations(id),
        max_participants INTEGER NOT NULL DEFAULT 20,
        current_participants INTEGER NOT NULL DEFAULT 0,
        price REAL NOT NULL,
        category TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        CHECK (current_participants >= 0 AND current_participants <= max_participants)
    )",
    "CREATE TABLE IF NOT EXISTS bookings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        client_first_name TEXT NOT NULL,
        client_last_name TEXT NOT NULL,
        client_email TEXT NOT NULL,
        client_phone TEXT NOT NULL,
        service_id INTEGER NOT NULL REFERENCES services(id),
        location_id INTEGER NOT NULL REFERENCES locations(id),
        appointment_date TEXT NOT NULL,
        appointment_time TEXT NOT NULL,
        duration INTEGER NOT NULL,
        price REAL NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        payment_status TEXT NOT NULL DEFAULT 'pending',
        notes TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS class_enrollments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        class_id INTEGER NOT NULL REFERENCES classes(id),
        scheduled_date TEXT,
        participant_first_name TEXT NOT NULL,
        participant_last_name TEXT NOT NULL,
        participant_email TEXT NOT NULL,
        participant_phone TEXT NOT NULL,
        payment_status TEXT NOT NULL DEFAULT 'pending',
        status TEXT NOT NULL DEFAULT 'pending',
        total_amount REAL NOT NULL DEFAULT 0,
        enrollment_date TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_bookings_date ON bookings(appointment_date)",
    "CREATE INDEX IF NOT EXISTS idx_bookings_status ON bookings(status)",
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_bookings_live_slot
        ON bookings(location_id, appointment_date, appointment_time)
        WHERE status <> 'cancelled'",
    "CREATE INDEX IF NOT EXISTS idx_classes_date ON classes(class_date)",
    "CREATE INDEX IF NOT EXISTS idx_classes_category ON classes(category)",
    "CREATE INDEX IF NOT EXISTS idx_services_category ON services(category)",
    "CREATE INDEX IF NOT EXISTS idx_enrollments_class ON class_enrollments(class_id)",
    "CREATE INDEX IF NOT EXISTS idx_enrollments_payment ON class_enrollments(payment_status)",
];

// ── PostgreSQL ──

const POSTGRES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        email VARCHAR(255) NOT NULL UNIQUE,
        password_hash VARCHAR(255) NOT NULL,
        first_name VARCHAR(100) NOT NULL,
        last_name VARCHAR(100) NOT NULL,
        role VARCHAR(20) NOT NULL DEFAULT 'admin',
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS locations (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(100) NOT NULL,
        address VARCHAR(255),
        city VARCHAR(100),
        state VARCHAR(10),
        zip_code VARCHAR(10),
        phone VARCHAR(20),
        email VARCHAR(255),
        latitude DOUBLE PRECISION,
        longitude DOUBLE PRECISION,
        is_active INTEGER NOT NULL DEFAULT 1,
        operating_hours TEXT,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS services (
        id BIGSERIAL PRIMARY KEY,
        service_key VARCHAR(50) NOT NULL UNIQUE,
        name VARCHAR(100) NOT NULL,
        category VARCHAR(50) NOT NULL,
        description TEXT,
        duration INTEGER NOT NULL,
        price DOUBLE PRECISION NOT NULL,
        durations TEXT,
        prices TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS classes (
        id BIGSERIAL PRIMARY KEY,
        course_key VARCHAR(50) UNIQUE,
        title VARCHAR(150) NOT NULL,
        description TEXT,
        instructor VARCHAR(100) NOT NULL,
        class_date VARCHAR(10) NOT NULL,
        start_time VARCHAR(5) NOT NULL,
        end_time VARCHAR(5) NOT NULL,
        location_id BIGINT NOT NULL REFERENCES locations(id),
        max_participants INTEGER NOT NULL DEFAULT 20,
        current_participants INTEGER NOT NULL DEFAULT 0,
        price DOUBLE PRECISION NOT NULL,
        category VARCHAR(50),
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        CHECK (current_participants >= 0 AND current_participants <= max_participants)
    )",
    "CREATE TABLE IF NOT EXISTS bookings (
        id BIGSERIAL PRIMARY KEY,
        client_first_name VARCHAR(100) NOT NULL,
        client_last_name VARCHAR(100) NOT NULL,
        client_email VARCHAR(255) NOT NULL,
        client_phone VARCHAR(20) NOT NULL,
        service_id BIGINT NOT NULL REFERENCES services(id),
        location_id BIGINT NOT NULL REFERENCES locations(id),
        appointment_date VARCHAR(10) NOT NULL,
        appointment_time VARCHAR(5) NOT NULL,
        duration INTEGER NOT NULL,
        price DOUBLE PRECISION NOT NULL,
        status VARCHAR(20) NOT NULL DEFAULT 'pending',
        payment_status VARCHAR(20) NOT NULL DEFAULT 'pending',
        notes TEXT,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS class_enrollments (
        id BIGSERIAL PRIMARY KEY,
        class_id BIGINT NOT NULL REFERENCES classes(id),
        scheduled_date VARCHAR(10),
        participant_first_name VARCHAR(100) NOT NULL,
        participant_last_name VARCHAR(100) NOT NULL,
        participant_email VARCHAR(255) NOT NULL,
        participant_phone VARCHAR(20) NOT NULL,
        payment_status VARCHAR(20) NOT NULL DEFAULT 'pending',
        status VARCHAR(20) NOT NULL DEFAULT 'pending',
        total_amount DOUBLE PRECISION NOT NULL DEFAULT 0,
        enrollment_date TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_bookings_date ON bookings(appointment_date)",
    "CREATE INDEX IF NOT EXISTS idx_bookings_status ON bookings(status)",
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_bookings_live_slot
        ON bookings(location_id, appointment_date, appointment_time)
        WHERE status <> 'cancelled'",
    "CREATE INDEX IF NOT EXISTS idx_classes_date ON classes(class_date)",
    "CREATE INDEX IF NOT EXISTS idx_classes_category ON classes(category)",
    "CREATE INDEX IF NOT EXISTS idx_services_category ON services(category)",
    "CREATE INDEX IF NOT EXISTS idx_enrollments_class ON class_enrollments(class_id)",
    "CREATE INDEX IF NOT EXISTS idx_enrollments_payment ON class_enrollments(payment_status)",
];

// ── MySQL ──

// No CREATE INDEX IF NOT EXISTS and no partial indexes: indexes live inside the
// table definitions, and the live-slot rule uses a generated column that is NULL
// for cancelled rows (NULLs never collide in a unique index).
const MYSQL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id BIGINT AUTO_INCREMENT PRIMARY KEY,
        email VARCHAR(255) NOT NULL UNIQUE,
        password_hash VARCHAR(255) NOT NULL,
        first_name VARCHAR(100) NOT NULL,
        last_name VARCHAR(100) NOT NULL,
        role VARCHAR(20) NOT NULL DEFAULT 'admin',
        created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS locations (
        id BIGINT AUTO_INCREMENT PRIMARY KEY,
        name VARCHAR(100) NOT NULL,
        address VARCHAR(255),
        city VARCHAR(100),
        state VARCHAR(10),
        zip_code VARCHAR(10),
        phone VARCHAR(20),
        email VARCHAR(255),
        latitude DOUBLE,
        longitude DOUBLE,
        is_active INT NOT NULL DEFAULT 1,
        operating_hours TEXT,
        created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS services (
        id BIGINT AUTO_INCREMENT PRIMARY KEY,
        service_key VARCHAR(50) NOT NULL UNIQUE,
        name VARCHAR(100) NOT NULL,
        category VARCHAR(50) NOT NULL,
        description TEXT,
        duration INT NOT NULL,
        price DOUBLE NOT NULL,
        durations TEXT,
        prices TEXT,
        is_active INT NOT NULL DEFAULT 1,
        created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        INDEX idx_services_category (category)
    )",
    "CREATE TABLE IF NOT EXISTS classes (
        id BIGINT AUTO_INCREMENT PRIMARY KEY,
        course_key VARCHAR(50) UNIQUE,
        title VARCHAR(150) NOT NULL,
        description TEXT,
        instructor VARCHAR(100) NOT NULL,
        class_date VARCHAR(10) NOT NULL,
        start_time VARCHAR(5) NOT NULL,
        end_time VARCHAR(5) NOT NULL,
        location_id BIGINT NOT NULL,
        max_participants INT NOT NULL DEFAULT 20,
        current_participants INT NOT NULL DEFAULT 0,
        price DOUBLE NOT NULL,
        category VARCHAR(50),
        is_active INT NOT NULL DEFAULT 1,
        created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        INDEX idx_classes_date (class_date),
        INDEX idx_classes_category (category),
        CONSTRAINT fk_classes_location FOREIGN KEY (location_id) REFERENCES locations(id),
        CONSTRAINT chk_classes_capacity
            CHECK (current_participants >= 0 AND current_participants <= max_participants)
    )",
    "CREATE TABLE IF NOT EXISTS bookings (
        id BIGINT AUTO_INCREMENT PRIMARY KEY,
        client_first_name VARCHAR(100) NOT NULL,
        client_last_name VARCHAR(100) NOT NULL,
        client_email VARCHAR(255) NOT NULL,
        client_phone VARCHAR(20) NOT NULL,
        service_id BIGINT NOT NULL,
        location_id BIGINT NOT NULL,
        appointment_date VARCHAR(10) NOT NULL,
        appointment_time VARCHAR(5) NOT NULL,
        duration INT NOT NULL,
        price DOUBLE NOT NULL,
        status VARCHAR(20) NOT NULL DEFAULT 'pending',
        payment_status VARCHAR(20) NOT NULL DEFAULT 'pending',
        notes TEXT,
        created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        live_slot VARCHAR(64) GENERATED ALWAYS AS (
            CASE WHEN status <> 'cancelled'
                THEN CONCAT(location_id, '|', appointment_date, '|', appointment_time)
            END
        ) STORED,
        INDEX idx_bookings_date (appointment_date),
        INDEX idx_bookings_status (status),
        UNIQUE KEY uq_bookings_live_slot (live_slot),
        CONSTRAINT fk_bookings_service FOREIGN KEY (service_id) REFERENCES services(id),
        CONSTRAINT fk_bookings_location FOREIGN KEY (location_id) REFERENCES locations(id)
    )",
    "CREATE TABLE IF NOT EXISTS class_enrollments (
        id BIGINT AUTO_INCREMENT PRIMARY KEY,
        class_id BIGINT NOT NULL,
        scheduled_date VARCHAR(10),
        participant_first_name VARCHAR(100) NOT NULL,
        participant_last_name VARCHAR(100) NOT NULL,
        participant_email VARCHAR(255) NOT NULL,
        participant_phone VARCHAR(20) NOT NULL,
        payment_status VARCHAR(20) NOT NULL DEFAULT 'pending',
        status VARCHAR(20) NOT NULL DEFAULT 'pending',
        total_amount DOUBLE NOT NULL DEFAULT 0,
        enrollment_date DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        INDEX idx_enrollments_class (class_id),
        INDEX idx_enrollments_payment (payment_status),
        CONSTRAINT fk_enrollments_class FOREIGN KEY (class_id) REFERENCES classes(id)
    )",
];
