//! Client-side event search: case-insensitive substring match over title,
//! description and location, applied to the snapshot before any rendering.
//! The store is never consulted.

use crate::event::Event;

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    terms: Vec<String>,
}

impl SearchQuery {
    /// Every term must match somewhere; a term matches when any of the
    /// three text fields contains it.
    pub fn parse(terms: &[String]) -> Self {
        Self {
            terms: terms
                .iter()
                .map(|term| term.trim().to_lowercase())
                .filter(|term| !term.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.terms.iter().all(|term| {
            event.title.to_lowercase().contains(term)
                || event
                    .description
                    .as_deref()
                    .is_some_and(|text| text.to_lowercase().contains(term))
                || event
                    .location
                    .as_deref()
                    .is_some_and(|text| text.to_lowercase().contains(term))
        })
    }

    pub fn filter(&self, events: &[Event]) -> Vec<Event> {
        if self.is_empty() {
            return events.to_vec();
        }
        events
            .iter()
            .filter(|event| self.matches(event))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::SearchQuery;
    use crate::event::Event;

    fn event(title: &str, location: Option<&str>, description: Option<&str>) -> Event {
        let day = NaiveDate::from_ymd_opt(2026, 3, 10).expect("valid date");
        let mut e = Event::draft(
            day.and_hms_opt(10, 0, 0).expect("start"),
            day.and_hms_opt(11, 0, 0).expect("end"),
        );
        e.id = "x".to_string();
        e.title = title.to_string();
        e.location = location.map(str::to_string);
        e.description = description.map(str::to_string);
        e
    }

    #[test]
    fn empty_query_keeps_everything() {
        let events = vec![event("Viewing", None, None)];
        let query = SearchQuery::parse(&[]);
        assert!(query.is_empty());
        assert_eq!(query.filter(&events).len(), 1);
    }

    #[test]
    fn matches_any_field_case_insensitively() {
        let e = event(
            "Property Viewing",
            Some("123 Main St"),
            Some("Meeting with potential buyers"),
        );

        for term in ["viewing", "MAIN", "Buyers"] {
            let query = SearchQuery::parse(&[term.to_string()]);
            assert!(query.matches(&e), "term {term} should match");
        }

        let miss = SearchQuery::parse(&["inspection".to_string()]);
        assert!(!miss.matches(&e));
    }

    #[test]
    fn all_terms_must_match() {
        let e = event("Investor Meeting", Some("Office"), None);

        let both = SearchQuery::parse(&["investor".to_string(), "office".to_string()]);
        assert!(both.matches(&e));

        let one_misses = SearchQuery::parse(&["investor".to_string(), "kitchen".to_string()]);
        assert!(!one_misses.matches(&e));
    }

    #[test]
    fn missing_optional_fields_do_not_match() {
        let e = event("Standup", None, None);
        let query = SearchQuery::parse(&["office".to_string()]);
        assert!(!query.matches(&e));
    }
}
