//! Display ordering for group lists.
//!
//! Every screen that lists groups fetches "groups I created" and "groups I
//! joined" separately, so the same group can arrive twice. [`order_groups`]
//! collapses duplicates and puts the featured selection on top.

use std::collections::HashSet;

use crate::models::Group;

/// Keep the first occurrence of each group id, preserving input order.
pub fn dedupe_groups(groups: impl IntoIterator<Item = Group>) -> Vec<Group> {
    let mut seen = HashSet::new();
    groups
        .into_iter()
        .filter(|group| seen.insert(group.id.clone()))
        .collect()
}

/// Order groups for display.
///
/// Groups whose id is in `featured_ids` come first, in featured-list order.
/// Featured ids with no matching group are skipped. The remaining groups follow
/// by member count (descending), ties broken by creation time (newest first).
pub fn order_groups(
    groups: impl IntoIterator<Item = Group>,
    featured_ids: &[String],
) -> Vec<Group> {
    let mut rest = dedupe_groups(groups);
    let mut ordered = Vec::with_capacity(rest.len());

    for id in featured_ids {
        if let Some(pos) = rest.iter().position(|group| &group.id == id) {
            ordered.push(rest.remove(pos));
        }
    }

    rest.sort_by(|a, b| {
        b.member_count
            .cmp(&a.member_count)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    ordered.extend(rest);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn group(id: &str, member_count: i64, created_at: DateTime<Utc>) -> Group {
        Group {
            id: id.to_string(),
            title: format!("Group {id}"),
            image_url: None,
            is_public: false,
            member_count,
            created_at,
            creator_id: "owner".to_string(),
        }
    }

    fn ids(groups: &[Group]) -> Vec<&str> {
        groups.iter().map(|g| g.id.as_str()).collect()
    }

    fn featured(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_featured_first() {
        let groups = vec![group("A", 3, at(0)), group("B", 10, at(0))];
        let ordered = order_groups(groups, &featured(&["B"]));
        assert_eq!(ids(&ordered), vec!["B", "A"]);
    }

    #[test]
    fn test_featured_beats_member_count() {
        let groups = vec![group("A", 3, at(0)), group("B", 10, at(0))];
        let ordered = order_groups(groups, &featured(&["A"]));
        assert_eq!(ids(&ordered), vec!["A", "B"]);
    }

    #[test]
    fn test_tie_broken_by_recency() {
        let groups = vec![group("A", 5, at(1)), group("B", 5, at(2))];
        let ordered = order_groups(groups, &[]);
        assert_eq!(ids(&ordered), vec!["B", "A"]);
    }

    #[test]
    fn test_featured_list_order_is_kept() {
        let groups = vec![
            group("A", 1, at(0)),
            group("B", 2, at(0)),
            group("C", 3, at(0)),
            group("D", 4, at(0)),
        ];
        let ordered = order_groups(groups, &featured(&["C", "A"]));
        assert_eq!(ids(&ordered), vec!["C", "A", "D", "B"]);
    }

    #[test]
    fn test_stale_featured_ids_are_skipped() {
        let groups = vec![group("A", 1, at(0)), group("B", 2, at(0))];
        let featured_ids = featured(&["gone", "A"]);
        let ordered = order_groups(groups, &featured_ids);

        assert_eq!(ids(&ordered), vec!["A", "B"]);
        // The caller's list is untouched
        assert_eq!(featured_ids, vec!["gone", "A"]);
    }

    #[test]
    fn test_duplicates_appear_once() {
        let created = vec![group("A", 2, at(0)), group("B", 1, at(0))];
        let joined = vec![group("A", 2, at(0)), group("C", 7, at(0))];
        let ordered = order_groups(created.into_iter().chain(joined), &featured(&["A"]));
        assert_eq!(ids(&ordered), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let mut renamed = group("A", 9, at(9));
        renamed.title = "second copy".to_string();
        let deduped = dedupe_groups(vec![group("A", 1, at(0)), renamed]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].title, "Group A");
    }

    #[test]
    fn test_empty_input() {
        assert!(order_groups(Vec::new(), &featured(&["A"])).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let make = || {
            vec![
                group("A", 5, at(3)),
                group("B", 5, at(3)),
                group("C", 8, at(1)),
            ]
        };
        let first = order_groups(make(), &[]);
        let second = order_groups(make(), &[]);
        assert_eq!(first, second);
        assert_eq!(ids(&first)[0], "C");
    }
}
