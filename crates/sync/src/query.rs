//! Free-text search plus categorical filters over a collection.
//!
//! An entity matches a [`Query`] when the search text is empty or occurs
//! (case-insensitively) in one of its searchable fields, AND every active
//! filter accepts it. Results are produced lazily by [`Query::apply`] and
//! wrapped in a [`ViewState`] so an empty result is an explicit state.

use std::collections::BTreeMap;

use rrr_core::search::{any_field_contains, is_filter_all, normalize_search, PRICE_FREE, PRICE_PAID};
use rrr_core::types::Timestamp;
use rrr_db::models::{Entity, Facet};

/// One filter dimension's selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// The "all" sentinel; accepts everything.
    All,
    /// The entity's facet value must equal this exactly.
    Exact(String),
    /// Price type: entities flagged free.
    Free,
    /// Price type: entities not flagged free.
    Paid,
}

impl FilterValue {
    /// Interpret a raw selection for `facet`.
    pub fn parse(facet: Facet, raw: &str) -> Self {
        if is_filter_all(raw) {
            return Self::All;
        }
        if facet == Facet::PriceType {
            let value = raw.trim();
            if value.eq_ignore_ascii_case(PRICE_FREE) {
                return Self::Free;
            }
            if value.eq_ignore_ascii_case(PRICE_PAID) {
                return Self::Paid;
            }
        }
        Self::Exact(raw.to_string())
    }

    pub fn accepts<E: Entity>(&self, entity: &E, facet: Facet) -> bool {
        match self {
            Self::All => true,
            Self::Free => entity.is_free(),
            Self::Paid => !entity.is_free(),
            Self::Exact(value) => entity.facet(facet) == Some(value.as_str()),
        }
    }
}

/// Transient search/filter state; recompute the view whenever it changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    search_text: String,
    needle: Option<String>,
    filters: BTreeMap<Facet, FilterValue>,
    hide_expired_at: Option<Timestamp>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: &str) -> Self {
        self.set_search(text);
        self
    }

    pub fn filter(mut self, facet: Facet, raw: &str) -> Self {
        self.set_filter(facet, raw);
        self
    }

    /// Hide entities whose expiry is at or before `now`.
    pub fn hide_expired_at(mut self, now: Timestamp) -> Self {
        self.hide_expired_at = Some(now);
        self
    }

    pub fn set_search(&mut self, text: &str) {
        self.search_text = text.to_string();
        self.needle = normalize_search(text);
    }

    pub fn set_filter(&mut self, facet: Facet, raw: &str) {
        self.filters.insert(facet, FilterValue::parse(facet, raw));
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }

    pub fn set_hide_expired(&mut self, now: Option<Timestamp>) {
        self.hide_expired_at = now;
    }

    /// The search box contents as typed.
    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn filters(&self) -> impl Iterator<Item = (Facet, &FilterValue)> + '_ {
        self.filters.iter().map(|(facet, value)| (*facet, value))
    }

    pub fn matches_search<E: Entity>(&self, entity: &E) -> bool {
        match &self.needle {
            None => true,
            Some(needle) => any_field_contains(entity.search_fields(), needle),
        }
    }

    pub fn matches_filters<E: Entity>(&self, entity: &E) -> bool {
        let unexpired = match (self.hide_expired_at, entity.expires_at()) {
            (Some(now), Some(at)) => at > now,
            _ => true,
        };
        unexpired
            && self
                .filters
                .iter()
                .all(|(facet, value)| value.accepts(entity, *facet))
    }

    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        self.matches_search(entity) && self.matches_filters(entity)
    }

    /// Lazily yield the matching entities of `source`, in source order.
    pub fn apply<'q, 'a: 'q, E, I>(&'q self, source: I) -> impl Iterator<Item = &'a E> + 'q
    where
        E: Entity + 'a,
        I: IntoIterator<Item = &'a E>,
        I::IntoIter: 'q,
    {
        source.into_iter().filter(move |e| self.matches(*e))
    }
}

/// What a list view renders.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Items(Vec<T>),
    /// Nothing matched; render an explicit "no results" message.
    NoResults,
}

impl<T> ViewState<T> {
    pub fn items(&self) -> &[T] {
        match self {
            Self::Items(items) => items,
            Self::NoResults => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::NoResults)
    }
}

impl<T> FromIterator<T> for ViewState<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let items: Vec<T> = iter.into_iter().collect();
        if items.is_empty() {
            Self::NoResults
        } else {
            Self::Items(items)
        }
    }
}
