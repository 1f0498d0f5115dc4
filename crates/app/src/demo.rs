//! Sample rows and the demo account for the in-process service.

use chrono::{Duration, Utc};
use rrr_core::roles::ActorRole;
use rrr_core::types::{ActorId, EntityId};
use rrr_db::models::actor::{Actor, SignUp};
use rrr_db::models::care_home::{CareHome, CareHomeFields};
use rrr_db::models::food_post::{FoodPost, FoodPostFields};
use rrr_db::models::listing::{ListingFields, ReuseListing};
use rrr_db::models::RecordHeader;
use rrr_db::repositories::{InMemoryService, PersistenceError};
use rrr_sync::{Account, SyncError};

pub const DEMO_EMAIL: &str = "demo@rrr.local";
const DEMO_PASSWORD: &str = "demo-password";
const NEIGHBOUR: &str = "demo-neighbour";

fn header(id: &str, hours_ago: i64) -> RecordHeader {
    let at = Utc::now() - Duration::hours(hours_ago);
    RecordHeader {
        id: EntityId::from(id),
        owner_id: ActorId::from(NEIGHBOUR),
        created_at: at,
        updated_at: at,
    }
}

/// A valid listing the demo user can post.
pub fn sample_listing() -> ListingFields {
    ListingFields {
        name: "Study lamp".into(),
        category: "Furniture".into(),
        condition: "Good".into(),
        is_free: true,
        location: "Sector 5".into(),
        ..Default::default()
    }
}

/// Fill the in-process service with a neighbour's listings, a care home
/// and two food posts, one of them already expired.
pub async fn seed(service: &InMemoryService) -> Result<(), PersistenceError> {
    let listings = [
        ("demo-chair", "Chair", "Furniture", "Good", None, 30),
        ("demo-phone", "Phone", "Electronics", "Like New", Some(5000), 20),
        ("demo-books", "School books", "Books", "Fair", None, 10),
    ];
    for (id, name, category, condition, price, hours_ago) in listings {
        service
            .seed(&ReuseListing {
                header: header(id, hours_ago),
                fields: ListingFields {
                    name: name.into(),
                    category: category.into(),
                    condition: condition.into(),
                    is_free: price.is_none(),
                    price,
                    location: "Sector 9".into(),
                    ..Default::default()
                },
            })
            .await?;
    }

    service
        .seed(&CareHome {
            header: header("demo-home", 48),
            fields: CareHomeFields {
                organization_name: "Sunrise Elders Home".into(),
                facility_type: "Old Age Home".into(),
                address: "14 Lake Road".into(),
                contact_person: "Meera Iyer".into(),
                phone: "+91 98765 43210".into(),
                needs: "Blankets and dry rations".into(),
                ..Default::default()
            },
        })
        .await?;

    let now = Utc::now();
    for (id, event, expires_at, hours_ago) in [
        ("demo-wedding", "Wedding reception", now + Duration::hours(3), 2),
        ("demo-lunch", "Office lunch", now - Duration::hours(1), 6),
    ] {
        service
            .seed(&FoodPost {
                header: header(id, hours_ago),
                fields: FoodPostFields {
                    event_name: event.into(),
                    food_type: "Veg".into(),
                    quantity: "40 plates".into(),
                    expires_at: Some(expires_at),
                    pickup_address: "Community Hall".into(),
                    contact_phone: "+91 98765 43210".into(),
                    ..Default::default()
                },
            })
            .await?;
    }

    tracing::info!("Seeded demo data");
    Ok(())
}

/// Register the demo account on a fresh service, which also signs it in.
pub async fn sign_in(account: &Account) -> Result<Actor, SyncError> {
    let form = SignUp {
        email: DEMO_EMAIL.into(),
        password: DEMO_PASSWORD.into(),
        confirm_password: DEMO_PASSWORD.into(),
        full_name: "Demo User".into(),
        role: ActorRole::General,
        phone: String::new(),
        organization_name: String::new(),
    };
    account.register(&form).await
}
