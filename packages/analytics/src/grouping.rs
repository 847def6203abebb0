//! Single-pass grouping of reports by location label.

use std::collections::{BTreeMap, HashMap};

use residue_map_report_models::{LocationAggregate, RawReport};

/// A location group under construction.
struct Group {
    aggregate: LocationAggregate,
    /// Categories in order of first appearance, for stable tie-breaks.
    category_order: Vec<String>,
}

impl Group {
    fn new(first: &RawReport) -> Self {
        Self {
            aggregate: LocationAggregate {
                location_label: first.location_label.clone(),
                lat: first.lat,
                lon: first.lon,
                total_reports: 0,
                category_distribution: BTreeMap::new(),
                dominant_category: String::new(),
                member_reports: Vec::new(),
            },
            category_order: Vec::new(),
        }
    }

    fn push(&mut self, report: &RawReport) {
        let count = self
            .aggregate
            .category_distribution
            .entry(report.category.clone())
            .or_insert(0);
        if *count == 0 {
            self.category_order.push(report.category.clone());
        }
        *count += 1;
        self.aggregate.total_reports += 1;
        self.aggregate.member_reports.push(report.clone());
    }

    fn finish(mut self) -> LocationAggregate {
        self.aggregate.dominant_category =
            dominant_category(&self.category_order, &self.aggregate.category_distribution)
                .unwrap_or_default();
        self.aggregate
    }
}

/// Groups `reports` by location label.
///
/// Locations are returned in order of first appearance and member reports
/// keep arrival order. Each location's coordinate is taken from its first
/// report.
#[must_use]
pub fn group_by_location(reports: &[RawReport]) -> Vec<LocationAggregate> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for report in reports {
        let i = *index
            .entry(report.location_label.as_str())
            .or_insert_with(|| {
                groups.push(Group::new(report));
                groups.len() - 1
            });
        groups[i].push(report);
    }

    groups.into_iter().map(Group::finish).collect()
}

/// Returns the category with the highest count.
///
/// `order` lists candidate categories in the order they were first seen;
/// on a tie the earliest one wins. Returns `None` if `order` is empty.
#[must_use]
pub fn dominant_category(order: &[String], distribution: &BTreeMap<String, u64>) -> Option<String> {
    let mut best: Option<(&String, u64)> = None;
    for category in order {
        let count = distribution.get(category).copied().unwrap_or(0);
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((category, count));
        }
    }
    best.map(|(category, _)| category.clone())
}
