//! Offline catalogue for `--demo` runs.

use crate::backend::types::LISTINGS_TABLE;
use crate::backend::MemoryBackend;
use crate::session::{Identity, Provider};
use serde_json::{json, Value};
use tracing::info;

pub const DEMO_OWNER: &str = "demo-owner";

/// A listing row as the backend stores it; text fields not given are derived from the title
pub fn listing_row(
    id: &str,
    title: &str,
    price: f64,
    bedrooms: i32,
    bathrooms: i32,
    category: &str,
    created_at: &str,
) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": format!("{title} for sale"),
        "price": price,
        "bedrooms": bedrooms,
        "bathrooms": bathrooms,
        "area": 1200.0,
        "location": "Springfield",
        "image_url": format!("https://images.example.com/{id}.jpg"),
        "property_type": category,
        "created_at": created_at,
        "user_id": DEMO_OWNER,
    })
}

pub fn sample_listings() -> Vec<Value> {
    let mut rows = vec![
        listing_row("demo-1", "Craftsman bungalow", 425_000.0, 3, 2, "House", "2024-05-02T14:30:00Z"),
        listing_row("demo-2", "Downtown studio", 189_000.0, 1, 1, "Apartment", "2024-05-10T09:15:00Z"),
        listing_row("demo-3", "Clifftop villa", 1_450_000.0, 5, 4, "Villa", "2024-04-21T18:00:00Z"),
        listing_row("demo-4", "Pine ridge cabin", 239_500.0, 2, 1, "Cabin", "2024-05-14T07:45:00Z"),
        listing_row("demo-5", "Warehouse loft", 512_000.0, 2, 2, "Loft", "2024-03-30T12:00:00Z"),
    ];

    let details = [
        ("Portland, OR", 1650.0, "Restored porch, original built-ins and a detached garage."),
        ("Chicago, IL", 480.0, "Walk to the river; doorman building with a gym."),
        ("Malibu, CA", 5200.0, "Ocean views from every room and an infinity pool."),
        ("Asheville, NC", 900.0, "Wood stove, wraparound deck, trailhead at the door."),
        ("Brooklyn, NY", 1400.0, "Exposed brick, 14 ft ceilings and a shared roof deck."),
    ];
    for (row, (location, area, description)) in rows.iter_mut().zip(details) {
        row["location"] = location.into();
        row["area"] = area.into();
        row["description"] = description.into();
    }
    rows
}

pub async fn seeded_backend() -> MemoryBackend {
    let backend = MemoryBackend::new();
    let rows = sample_listings();
    info!("Seeding demo catalogue with {} listings", rows.len());
    backend.seed(LISTINGS_TABLE, rows).await;
    backend
}

pub fn demo_identity() -> Identity {
    let mut identity = Identity::new("demo-user", "demo@example.com");
    identity.provider = Some(Provider::Google);
    identity.metadata.full_name = Some("Demo User".to_string());
    identity
}
