//! List ordering, search and pagination over snapshots
//!
//! Everything here is computed on demand from the controller's snapshots
//! and borrows from them; nothing is stored.

use chrono::{NaiveDateTime, NaiveTime};

use crate::error::CommandError;
use crate::models::{Event, Member, PrayerRequest, Visitor};

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Members whose name, role label or status contains `query`, ignoring case
///
/// An empty query matches everyone.
pub fn search_members<'a>(members: &'a [Member], query: &str) -> Vec<&'a Member> {
    let query = query.trim().to_lowercase();
    members
        .iter()
        .filter(|m| {
            query.is_empty()
                || m.name.to_lowercase().contains(&query)
                || m.role.to_lowercase().contains(&query)
                || m.status.label().to_lowercase().contains(&query)
        })
        .collect()
}

/// Visitors, most recent first visit first
pub fn visitors_by_recency(visitors: &[Visitor]) -> Vec<&Visitor> {
    let mut sorted: Vec<&Visitor> = visitors.iter().collect();
    sorted.sort_by(|a, b| b.first_visit_date.cmp(&a.first_visit_date));
    sorted
}

/// Events in chronological order of date and time
pub fn events_by_start(events: &[Event]) -> Vec<&Event> {
    let mut sorted: Vec<&Event> = events.iter().collect();
    sorted.sort_by_key(|e| e.starts_at());
    sorted
}

/// Events starting at or after the beginning of `now`'s day, soonest first
pub fn upcoming_events(events: &[Event], now: NaiveDateTime) -> Vec<&Event> {
    let start_of_day = now.date().and_time(NaiveTime::MIN);
    let mut upcoming: Vec<&Event> = events
        .iter()
        .filter(|e| e.starts_at() >= start_of_day)
        .collect();
    upcoming.sort_by_key(|e| e.starts_at());
    upcoming
}

/// Prayer requests, newest first
pub fn prayer_requests_by_date(requests: &[PrayerRequest]) -> Vec<&PrayerRequest> {
    let mut sorted: Vec<&PrayerRequest> = requests.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}

/// One page of a list
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually shown
    pub number: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }
}

/// Cut `items` into pages of `page_size` and return page `number`
///
/// The page number is clamped into range; an empty list is one empty page.
pub fn paginate<T>(items: Vec<T>, number: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let number = number.clamp(1, total_pages);

    let items = items
        .into_iter()
        .skip((number - 1) * page_size)
        .take(page_size)
        .collect();

    Page {
        items,
        number,
        total_pages,
        total_items,
    }
}

/// WhatsApp link for a Brazilian phone number
pub fn contact_link(phone: &str) -> Result<String, CommandError> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(CommandError::invalid("Nenhum telefone cadastrado."));
    }
    Ok(format!("https://wa.me/55{}", digits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemberStatus, RecordId};
    use chrono::NaiveDate;

    fn member(id: &str, name: &str, role: &str, status: MemberStatus) -> Member {
        Member {
            id: RecordId::from(id),
            name: name.to_string(),
            role: role.to_string(),
            status,
            phone: String::new(),
            birth_date: None,
        }
    }

    fn event(id: &str, date: NaiveDate, hour: u32) -> Event {
        Event {
            id: RecordId::from(id),
            name: format!("Evento {}", id),
            date,
            time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            description: String::new(),
            image_data_url: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_search_members() {
        let members = vec![
            member("1", "Ana Souza", "Membro", MemberStatus::Active),
            member("2", "Carlos", "Diácono", MemberStatus::Inactive),
            member("3", "Beatriz", "Membro", MemberStatus::Active),
        ];

        let found = search_members(&members, "ANA");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Ana Souza");

        assert_eq!(search_members(&members, "diácono").len(), 1);
        assert_eq!(search_members(&members, "inativo").len(), 1);
        // "ativo" is contained in "inativo" too
        assert_eq!(search_members(&members, "ativo").len(), 3);
        assert_eq!(search_members(&members, "  ").len(), 3);
    }

    #[test]
    fn test_upcoming_events_from_start_of_today() {
        let events = vec![
            event("tomorrow", day(11), 9),
            event("yesterday", day(9), 20),
            event("today", day(10), 8),
        ];
        // Later in the day than today's event: it still counts
        let now = day(10).and_hms_opt(15, 0, 0).unwrap();

        let upcoming: Vec<&str> = upcoming_events(&events, now)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(upcoming, vec!["today", "tomorrow"]);
    }

    #[test]
    fn test_events_sorted_by_date_and_time() {
        let events = vec![event("b", day(1), 19), event("a", day(1), 9), event("c", day(2), 7)];
        let ids: Vec<&str> = events_by_start(&events).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_visitors_newest_first() {
        let visitor = |id: &str, d: u32| Visitor {
            id: RecordId::from(id),
            name: id.to_string(),
            first_visit_date: day(d),
            phone: String::new(),
            notes: String::new(),
        };
        let visitors = vec![visitor("old", 1), visitor("new", 20), visitor("mid", 10)];
        let ids: Vec<&str> = visitors_by_recency(&visitors)
            .iter()
            .map(|v| v.id.as_str())
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_paginate_clamps_page_number() {
        let items: Vec<u32> = (1..=23).collect();

        let page = paginate(items.clone(), 3, 10);
        assert_eq!(page.items, vec![21, 22, 23]);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_previous());
        assert!(!page.has_next());

        let page = paginate(items.clone(), 0, 10);
        assert_eq!(page.number, 1);
        assert_eq!(page.items.len(), 10);

        let page = paginate(items, 99, 10);
        assert_eq!(page.number, 3);
    }

    #[test]
    fn test_paginate_empty() {
        let page = paginate(Vec::<u32>::new(), 2, 10);
        assert_eq!(page.number, 1);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_contact_link() {
        assert_eq!(
            contact_link("(11) 98765-4321").unwrap(),
            "https://wa.me/5511987654321"
        );
        assert!(contact_link("").is_err());
    }
}
