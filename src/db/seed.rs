use anyhow::Context;

use super::queries;
use super::storage::Storage;
use crate::config::AppConfig;
use crate::models::{NewClass, NewLocation, NewService, OperatingHours};
use crate::services::auth;

const OFFICE_PHONE: &str = "(555) 123-4567";

/// Inserts the admin account and the catalogue the site ships with. Every row
/// is looked up by its natural key first, so running this again is a no-op.
pub async fn run(db: &dyn Storage, config: &AppConfig) -> anyhow::Result<()> {
    seed_admin(db, config).await?;
    seed_locations(db).await?;
    seed_services(db).await?;
    seed_classes(db).await?;
    Ok(())
}

async fn seed_admin(db: &dyn Storage, config: &AppConfig) -> anyhow::Result<()> {
    if queries::get_user_by_email(db, &config.admin_email).await?.is_some() {
        tracing::info!(email = %config.admin_email, "admin user exists, skipping");
        return Ok(());
    }

    let (password, generated) = match &config.admin_password {
        Some(password) => (password.clone(), false),
        None => (uuid::Uuid::new_v4().simple().to_string(), true),
    };
    let hash = auth::hash_password(&password, config.bcrypt_cost)
        .await
        .context("failed to hash admin password")?;
    queries::create_user(db, &config.admin_email, &hash, "Admin", "User", "admin").await?;

    if generated {
        tracing::warn!(
            email = %config.admin_email,
            password = %password,
            "created admin user with a generated password; it will not be shown again"
        );
    } else {
        tracing::info!(email = %config.admin_email, "created admin user");
    }
    Ok(())
}

async fn seed_locations(db: &dyn Storage) -> anyhow::Result<()> {
    let offices = [
        ("Bethlehem Office", "610 West Broad St", "Bethlehem", "18018"),
        ("Hershey Office", "24 Northeast Dr", "Hershey", "17033"),
    ];

    for (name, address, city, zip) in offices {
        if queries::get_location_by_name(db, name).await?.is_some() {
            tracing::info!(location = name, "location exists, skipping");
            continue;
        }
        let location = NewLocation {
            name: name.to_string(),
            address: address.to_string(),
            city: city.to_string(),
            state: "PA".to_string(),
            zip_code: zip.to_string(),
            phone: Some(OFFICE_PHONE.to_string()),
            email: None,
            latitude: None,
            longitude: None,
            operating_hours: Some(OperatingHours::standard_week()),
            is_active: Some(true),
        };
        let created = queries::create_location(db, &location).await?;
        tracing::info!(location = name, id = created.id, "created location");
    }
    Ok(())
}

struct ServiceSeed {
    key: &'static str,
    name: &'static str,
    category: &'static str,
    description: &'static str,
    durations: &'static [i64],
    prices: &'static [f64],
}

const SERVICES: &[ServiceSeed] = &[
    ServiceSeed {
        key: "swedish",
        name: "Swedish Massage",
        category: "massage",
        description: "Relaxing full-body massage using long, flowing strokes.",
        durations: &[30, 60, 90],
        prices: &[55.0, 90.0, 125.0],
    },
    ServiceSeed {
        key: "deep-tissue",
        name: "Deep Tissue Massage",
        category: "massage",
        description: "Firm pressure targeting deeper muscle layers and chronic tension.",
        durations: &[30, 60, 90],
        prices: &[60.0, 100.0, 140.0],
    },
    ServiceSeed {
        key: "prenatal",
        name: "Prenatal Massage",
        category: "massage",
        description: "Gentle, supported massage for expecting mothers.",
        durations: &[45, 60, 75],
        prices: &[75.0, 95.0, 115.0],
    },
    ServiceSeed {
        key: "sports",
        name: "Sports Massage",
        category: "massage",
        description: "Focused work for athletes, recovery and range of motion.",
        durations: &[60],
        prices: &[85.0],
    },
    ServiceSeed {
        key: "hot-stone",
        name: "Hot Stone Massage",
        category: "massage",
        description: "Heated basalt stones melt away tension.",
        durations: &[90],
        prices: &[120.0],
    },
    ServiceSeed {
        key: "cupping",
        name: "Cupping Therapy",
        category: "therapy",
        description: "Suction cups lift tissue to improve circulation.",
        durations: &[45],
        prices: &[70.0],
    },
];

async fn seed_services(db: &dyn Storage) -> anyhow::Result<()> {
    for seed in SERVICES {
        if queries::get_service_by_key(db, seed.key).await?.is_some() {
            tracing::info!(service = seed.key, "service exists, skipping");
            continue;
        }
        // The first tier is the headline duration and price.
        let service = NewService {
            service_key: Some(seed.key.to_string()),
            name: seed.name.to_string(),
            category: seed.category.to_string(),
            description: Some(seed.description.to_string()),
            duration: seed.durations[0],
            price: seed.prices[0],
            durations: Some(seed.durations.to_vec()),
            prices: Some(seed.prices.to_vec()),
            is_active: Some(true),
        };
        let created = queries::create_service(db, &service).await?;
        tracing::info!(service = seed.key, id = created.id, "created service");
    }
    Ok(())
}

async fn seed_classes(db: &dyn Storage) -> anyhow::Result<()> {
    let Some(home) = queries::get_location_by_name(db, "Bethlehem Office").await? else {
        tracing::warn!("Bethlehem Office missing, skipping class seed");
        return Ok(());
    };

    let classes = [
        NewClass {
            course_key: Some("cpr-first-aid".to_string()),
            title: "CPR/First Aid/AED Certification".to_string(),
            description: Some(
                "American Heart Association certification covering adult, child and infant CPR, \
                 first aid and AED use."
                    .to_string(),
            ),
            instructor: "Tiffany Young-Poindexter".to_string(),
            class_date: "2024-01-15".to_string(),
            start_time: "09:00".to_string(),
            end_time: "17:00".to_string(),
            location_id: home.id,
            max_participants: Some(15),
            price: 75.0,
            category: Some("cpr".to_string()),
            is_active: Some(true),
        },
        NewClass {
            course_key: Some("cupping-ce".to_string()),
            title: "Massage CE: Cupping Therapy".to_string(),
            description: Some(
                "Continuing education for licensed therapists: cupping techniques and contraindications."
                    .to_string(),
            ),
            instructor: "Tiffany Young-Poindexter".to_string(),
            class_date: "2024-01-22".to_string(),
            start_time: "10:00".to_string(),
            end_time: "16:00".to_string(),
            location_id: home.id,
            max_participants: Some(12),
            price: 120.0,
            category: Some("massage_ce".to_string()),
            is_active: Some(true),
        },
    ];

    for class in &classes {
        let key = class.course_key.as_deref().unwrap_or_default();
        if queries::get_class_by_key(db, key).await?.is_some() {
            tracing::info!(class = key, "class exists, skipping");
            continue;
        }
        let created = queries::create_class(db, class).await?;
        tracing::info!(class = key, id = created.id, "created class");
    }
    Ok(())
}
