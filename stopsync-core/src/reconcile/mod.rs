//! Cross-dataset matching of agency stops against map elements.
//!
//! Every stop is compared with every map element (no spatial or locality
//! pre-filter). An element matches a stop when its `name` attribute equals
//! the stop's display value exactly. Locality is carried through to the
//! output but is not part of the comparison.

use log::debug;

use crate::{MapElement, MapSnapshot, OrphanPolicy, StopDataset, StopRecord};

/// One unit of reconciled output.
///
/// A *matched* group carries the agency identifier of a stop together with
/// the elements whose name equals the stop's display value (possibly none).
/// An *orphan* group has no agency identifier and carries exactly one element
/// that did not match.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchedGroup {
    /// Stop display value, or the element name for orphans.
    pub name: String,
    /// Agency identifier; `None` for orphans.
    pub stop_id: Option<String>,
    /// Locality key of the stop the group was produced for.
    pub locality: String,
    /// Associated map elements in map order.
    pub elements: Vec<MapElement>,
}

impl MatchedGroup {
    fn candidate(locality: &str, stop: &StopRecord) -> Self {
        Self {
            name: stop.value.clone(),
            stop_id: Some(stop.id.clone()),
            locality: locality.to_owned(),
            elements: Vec::new(),
        }
    }

    fn orphan(locality: &str, element: &MapElement) -> Self {
        Self {
            name: element.name().to_owned(),
            stop_id: None,
            locality: locality.to_owned(),
            elements: vec![element.clone()],
        }
    }

    /// Whether the group represents a map element without an agency stop.
    #[must_use]
    pub const fn is_orphan(&self) -> bool {
        self.stop_id.is_none()
    }
}

/// Output of [`reconcile`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reconciliation {
    /// Groups in emission order.
    pub groups: Vec<MatchedGroup>,
    /// Number of (stop, element) comparisons performed.
    pub comparisons: usize,
}

impl Reconciliation {
    /// Groups that originate from an agency stop.
    pub fn matched(&self) -> impl Iterator<Item = &MatchedGroup> {
        self.groups.iter().filter(|group| !group.is_orphan())
    }

    /// Groups that carry a single unmatched element.
    pub fn orphans(&self) -> impl Iterator<Item = &MatchedGroup> {
        self.groups.iter().filter(|group| group.is_orphan())
    }
}

/// Whether `element` represents `stop`.
#[must_use]
pub fn element_matches(element: &MapElement, stop: &StopRecord) -> bool {
    element.name() == stop.value
}

/// Pair every stop in `stops` with the map elements that share its name.
///
/// Candidates are visited in locality order, then stop order; elements in
/// snapshot order. With [`OrphanPolicy::PerComparison`] each failed
/// comparison emits an orphan group before the candidate itself is emitted,
/// so an element that matches nothing appears once per stop. With
/// [`OrphanPolicy::Deduplicated`] all candidates are emitted first, followed
/// by one orphan per element that matched no stop at all, labelled with the
/// locality of the first stop.
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use stopsync_core::{
///     reconcile, CitySnapshot, MapElement, MapSnapshot, OrphanPolicy, StopDataset, StopRecord,
/// };
///
/// let stops = StopDataset::from_snapshots([CitySnapshot::new(
///     "Stralsund",
///     Utc::now(),
///     vec![StopRecord::new("1", "Markt", "")],
/// )]);
/// let map = MapSnapshot::from_elements([MapElement::node(7, 54.3, 13.1).with_name("Markt")]);
///
/// let result = reconcile(&stops, &map, OrphanPolicy::PerComparison);
/// assert_eq!(result.groups.len(), 1);
/// assert_eq!(result.groups[0].elements.len(), 1);
/// ```
#[must_use]
pub fn reconcile(stops: &StopDataset, map: &MapSnapshot, policy: OrphanPolicy) -> Reconciliation {
    let result = match policy {
        OrphanPolicy::PerComparison => reconcile_per_comparison(stops, map),
        OrphanPolicy::Deduplicated => reconcile_deduplicated(stops, map),
    };
    debug!(
        "reconciled {} stops against {} map elements in {} comparisons",
        stops.stop_count(),
        map.elements.len(),
        result.comparisons
    );
    result
}

fn reconcile_per_comparison(stops: &StopDataset, map: &MapSnapshot) -> Reconciliation {
    let mut result = Reconciliation::default();
    for city in stops {
        for stop in &city.stops {
            let mut candidate = MatchedGroup::candidate(&city.locality, stop);
            for element in &map.elements {
                if element_matches(element, stop) {
                    candidate.elements.push(element.clone());
                } else {
                    result
                        .groups
                        .push(MatchedGroup::orphan(&city.locality, element));
                }
                result.comparisons += 1;
            }
            result.groups.push(candidate);
        }
    }
    result
}

fn reconcile_deduplicated(stops: &StopDataset, map: &MapSnapshot) -> Reconciliation {
    let mut result = Reconciliation::default();
    let mut matched_any = vec![false; map.elements.len()];
    let mut first_locality: Option<&str> = None;
    for city in stops {
        for stop in &city.stops {
            first_locality.get_or_insert(city.locality.as_str());
            let mut candidate = MatchedGroup::candidate(&city.locality, stop);
            for (element, seen) in map.elements.iter().zip(matched_any.iter_mut()) {
                if element_matches(element, stop) {
                    candidate.elements.push(element.clone());
                    *seen = true;
                }
                result.comparisons += 1;
            }
            result.groups.push(candidate);
        }
    }
    if let Some(locality) = first_locality {
        let orphans = map
            .elements
            .iter()
            .zip(&matched_any)
            .filter(|(_, seen)| !**seen)
            .map(|(element, _)| MatchedGroup::orphan(locality, element));
        result.groups.extend(orphans);
    }
    result
}

#[cfg(test)]
mod tests;
