//! Edition ordering and default selection.
//!
//! Order, computed fresh on every reconciliation:
//! 1. not sold out before sold out
//! 2. earlier enrollment deadline first, no deadline last
//! 3. earlier start date first, no start date last
//!
//! The sort is stable, so full ties keep upstream order.

use std::cmp::Ordering;

use crate::domain::catalog::Edition;
use crate::domain::foundation::{EditionId, Timestamp};

/// Compares two editions by display priority.
pub fn compare_editions(a: &Edition, b: &Edition) -> Ordering {
    a.is_sold_out()
        .cmp(&b.is_sold_out())
        .then_with(|| missing_last(&a.enrollment_deadline, &b.enrollment_deadline))
        .then_with(|| missing_last(&a.starts_at, &b.starts_at))
}

fn missing_last(a: &Option<Timestamp>, b: &Option<Timestamp>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Returns the editions in display order.
pub fn order_editions(editions: &[Edition]) -> Vec<Edition> {
    let mut ordered = editions.to_vec();
    ordered.sort_by(compare_editions);
    ordered
}

/// First edition that is not sold out and open for enrollment; otherwise the
/// first edition overall; `None` only for an empty list.
pub fn default_selection(ordered: &[Edition], now: &Timestamp) -> Option<EditionId> {
    ordered
        .iter()
        .find(|e| !e.is_sold_out() && e.is_enrollment_open(now))
        .or_else(|| ordered.first())
        .map(|e| e.id.clone())
}

/// Carries a previous selection over to a new edition list.
///
/// Keeps the previous choice while an edition with that identity still
/// exists, falls back to the default when it was removed, clears when the
/// list is empty.
pub fn reconcile_selection(
    previous: Option<&EditionId>,
    ordered: &[Edition],
    now: &Timestamp,
) -> Option<EditionId> {
    if ordered.is_empty() {
        return None;
    }
    match previous {
        Some(id) if ordered.iter().any(|e| &e.id == id) => Some(id.clone()),
        _ => default_selection(ordered, now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edition(id: &str) -> Edition {
        Edition::new(EditionId::new(id).unwrap())
    }

    fn ids(editions: &[Edition]) -> Vec<&str> {
        editions.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn sold_out_sorts_after_everything_else() {
        let now = Timestamp::now();
        let mut sold = edition("sold");
        sold.sold_out = true;
        sold.enrollment_deadline = Some(now.plus_days(1));
        let mut open = edition("open");
        open.enrollment_deadline = Some(now.plus_days(30));

        assert_eq!(ids(&order_editions(&[sold, open])), vec!["open", "sold"]);
    }

    #[test]
    fn missing_deadline_sorts_last() {
        let now = Timestamp::now();
        let none = edition("none");
        let mut late = edition("late");
        late.enrollment_deadline = Some(now.plus_days(90));
        let mut early = edition("early");
        early.enrollment_deadline = Some(now.plus_days(2));

        assert_eq!(
            ids(&order_editions(&[none, late, early])),
            vec!["early", "late", "none"]
        );
    }

    #[test]
    fn start_date_breaks_deadline_ties() {
        let now = Timestamp::now();
        let deadline = Some(now.plus_days(5));
        let mut later = edition("later");
        later.enrollment_deadline = deadline;
        later.starts_at = Some(now.plus_days(20));
        let mut sooner = edition("sooner");
        sooner.enrollment_deadline = deadline;
        sooner.starts_at = Some(now.plus_days(10));

        assert_eq!(ids(&order_editions(&[later, sooner])), vec!["sooner", "later"]);
    }

    #[test]
    fn full_ties_keep_upstream_order() {
        let list = [edition("x"), edition("y"), edition("z")];
        assert_eq!(ids(&order_editions(&list)), vec!["x", "y", "z"]);
    }

    #[test]
    fn default_skips_closed_enrollment() {
        let now = Timestamp::now();
        let mut closed = edition("closed");
        closed.enrollment_open = Some(false);
        closed.enrollment_deadline = Some(now.plus_days(1));
        let mut open = edition("open");
        open.enrollment_deadline = Some(now.plus_days(10));

        let ordered = order_editions(&[closed, open]);
        assert_eq!(default_selection(&ordered, &now).unwrap().as_str(), "open");
    }

    #[test]
    fn default_falls_back_to_first_overall() {
        let now = Timestamp::now();
        let mut a = edition("a");
        a.sold_out = true;
        let mut b = edition("b");
        b.sold_out = true;
        let ordered = order_editions(&[a, b]);
        assert_eq!(default_selection(&ordered, &now).unwrap().as_str(), "a");
        assert_eq!(default_selection(&[], &now), None);
    }

    #[test]
    fn reconcile_keeps_existing_and_replaces_removed() {
        let now = Timestamp::now();
        let ordered = order_editions(&[edition("a"), edition("b")]);
        let b = EditionId::new("b").unwrap();
        let gone = EditionId::new("gone").unwrap();

        assert_eq!(reconcile_selection(Some(&b), &ordered, &now), Some(b.clone()));
        assert_eq!(
            reconcile_selection(Some(&gone), &ordered, &now).unwrap().as_str(),
            "a"
        );
        assert_eq!(reconcile_selection(Some(&b), &[], &now), None);
    }
}
