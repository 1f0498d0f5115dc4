//! One-line text rendering of entities for the terminal.

use rrr_core::types::Timestamp;
use rrr_db::models::care_home::CareHome;
use rrr_db::models::food_post::FoodPost;
use rrr_db::models::listing::ReuseListing;
use rrr_db::models::{Entity, EntityRecord};
use rrr_events::Notice;
use rrr_sync::ViewState;

pub trait Summary {
    fn summary(&self) -> String;
}

impl Summary for ReuseListing {
    fn summary(&self) -> String {
        let f = &self.fields;
        let price = match (f.is_free, f.price) {
            (true, _) | (false, None) => "Free".to_string(),
            (false, Some(p)) => format!("Rs {p}"),
        };
        format!(
            "{}  {} [{}, {}] {} @ {}",
            self.id(),
            f.name,
            f.category,
            f.condition,
            price,
            f.location
        )
    }
}

impl Summary for CareHome {
    fn summary(&self) -> String {
        let f = &self.fields;
        let needs = if f.needs.is_empty() { "-" } else { &f.needs };
        format!(
            "{}  {} [{}] needs: {} @ {}",
            self.id(),
            f.organization_name,
            f.facility_type,
            needs,
            f.address
        )
    }
}

impl Summary for FoodPost {
    fn summary(&self) -> String {
        let f = &self.fields;
        let until = f
            .expires_at
            .map(|at| format!(" until {}", short_time(at)))
            .unwrap_or_default();
        format!(
            "{}  {} [{}] {}{} @ {}",
            self.id(),
            f.event_name,
            f.food_type,
            f.quantity,
            until,
            f.pickup_address
        )
    }
}

impl Summary for EntityRecord {
    fn summary(&self) -> String {
        format!(
            "{}  {}: {} ({})",
            self.header().id,
            self.kind().label(),
            self.title(),
            short_time(self.header().created_at)
        )
    }
}

/// Lines for a rendered query view.
pub fn view<E: Summary>(view: &ViewState<E>) -> Vec<String> {
    match view {
        ViewState::Items(items) => items.iter().map(Summary::summary).collect(),
        ViewState::NoResults => vec!["No results.".to_string()],
    }
}

pub fn notice(notice: &Notice) -> String {
    let marker = if notice.is_blocking() { "error" } else { "warning" };
    format!("{marker}: {}", notice.text())
}

fn short_time(at: Timestamp) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}
