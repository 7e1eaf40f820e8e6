//! Travel path ordering
//!
//! Orders a set of visits so the head travels less: a nearest-neighbour
//! tour from the start followed by 2-opt segment reversal. The start is
//! fixed; the end is either fixed or free.

use log::debug;

use crate::model::Location;

/// Default bound on 2-opt improvement passes
pub const DEFAULT_MAX_PASSES: usize = 32;

/// Improvements smaller than this are treated as noise
const EPSILON: f64 = 1e-9;

/// Length of the open path `start -> points... -> end` on the XY plane
pub fn path_length(start: &Location, points: &[Location], end: Option<&Location>) -> f64 {
    let mut length = 0.0;
    let mut current = start;
    for point in points {
        length += current.distance_xy(point);
        current = point;
    }
    if let Some(end) = end {
        length += current.distance_xy(end);
    }
    length
}

/// Average of every resolvable location, `None` when none resolve
pub fn centroid<T, F>(items: &[T], mut locate: F) -> Option<Location>
where
    F: FnMut(&T) -> Option<Location>,
{
    let mut sum = Location::ORIGIN;
    let mut count = 0usize;
    for location in items.iter().filter_map(&mut locate) {
        sum = sum.add(&location);
        count += 1;
    }
    (count > 0).then(|| sum.scale(1.0 / count as f64))
}

/// Visit order for `points`, as indices into the slice
///
/// Never longer than the input order; when no strict improvement is found
/// the identity order is returned.
pub fn solve(start: &Location, points: &[Location], end: Option<&Location>, max_passes: usize) -> Vec<usize> {
    let identity: Vec<usize> = (0..points.len()).collect();
    if points.len() < 2 {
        return identity;
    }

    let mut order = nearest_neighbour(start, points);
    two_opt(start, points, end, &mut order, max_passes);

    let before = ordered_length(start, points, &identity, end);
    let after = ordered_length(start, points, &order, end);
    if after + EPSILON < before {
        order
    } else {
        identity
    }
}

fn ordered_length(start: &Location, points: &[Location], order: &[usize], end: Option<&Location>) -> f64 {
    let ordered: Vec<Location> = order.iter().map(|&i| points[i]).collect();
    path_length(start, &ordered, end)
}

/// Greedy tour; ties go to the lower index
fn nearest_neighbour(start: &Location, points: &[Location]) -> Vec<usize> {
    let mut remaining: Vec<usize> = (0..points.len()).collect();
    let mut order = Vec::with_capacity(points.len());
    let mut current = *start;

    while !remaining.is_empty() {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (slot, &index) in remaining.iter().enumerate() {
            let distance = current.distance_xy(&points[index]);
            if distance < best_distance {
                best = slot;
                best_distance = distance;
            }
        }
        let index = remaining.remove(best);
        current = points[index];
        order.push(index);
    }
    order
}

/// Reverse segments while that shortens the path
///
/// Reversing `order[i..=j]` only changes the two edges at its ends, so each
/// candidate move is scored from those alone.
fn two_opt(start: &Location, points: &[Location], end: Option<&Location>, order: &mut [usize], max_passes: usize) {
    let n = order.len();
    for _ in 0..max_passes {
        let mut improved = false;
        for i in 0..n {
            for j in (i + 1)..n {
                let prev = if i == 0 { *start } else { points[order[i - 1]] };
                let first = points[order[i]];
                let last = points[order[j]];
                let next = if j + 1 < n {
                    Some(points[order[j + 1]])
                } else {
                    end.copied()
                };

                let tail_before = next.map_or(0.0, |nx| last.distance_xy(&nx));
                let tail_after = next.map_or(0.0, |nx| first.distance_xy(&nx));
                let before = prev.distance_xy(&first) + tail_before;
                let after = prev.distance_xy(&last) + tail_after;

                if after + EPSILON < before {
                    order[i..=j].reverse();
                    improved = true;
                }
            }
        }
        if !improved {
            break;
        }
    }
}

/// Reorders items to shorten head travel
#[derive(Debug, Clone, Copy)]
pub struct PathOptimizer {
    enabled: bool,
    max_passes: usize,
}

impl Default for PathOptimizer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PathOptimizer {
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    pub const fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Reorder `items` for travel from `start`, ending at `end` if given
    ///
    /// The input order is returned unchanged when optimization is disabled,
    /// the start is unknown, there are fewer than two items, or any item's
    /// location cannot be resolved.
    pub fn optimize<T, F>(
        &self,
        label: &str,
        items: Vec<T>,
        mut locate: F,
        start: Option<&Location>,
        end: Option<&Location>,
    ) -> Vec<T>
    where
        F: FnMut(&T) -> Option<Location>,
    {
        if !self.enabled || items.len() < 2 {
            return items;
        }
        let Some(start) = start else {
            debug!("{}: head location unknown, keeping planned order", label);
            return items;
        };
        let Some(points) = items.iter().map(&mut locate).collect::<Option<Vec<_>>>() else {
            debug!("{}: unresolvable location, keeping planned order", label);
            return items;
        };

        let order = solve(start, &points, end, self.max_passes);
        let before = path_length(start, &points, end);
        let ordered: Vec<Location> = order.iter().map(|&i| points[i]).collect();
        let after = path_length(start, &ordered, end);
        debug!(
            "{}: optimized {} items, travel {:.1}mm -> {:.1}mm",
            label,
            items.len(),
            before,
            after
        );

        let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
        order.iter().filter_map(|&i| slots[i].take()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn xy(x: f64, y: f64) -> Location {
        Location::xy(x, y)
    }

    #[test]
    fn test_path_length() {
        let points = [xy(3.0, 4.0), xy(3.0, 0.0)];
        assert!((path_length(&Location::ORIGIN, &points, None) - 9.0).abs() < 1e-9);
        assert!((path_length(&Location::ORIGIN, &points, Some(&Location::ORIGIN)) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_centroid() {
        let items = [Some(xy(0.0, 0.0)), None, Some(xy(2.0, 4.0))];
        let c = centroid(&items, |l| *l).unwrap();
        assert!(c.approx_eq(&xy(1.0, 2.0), 1e-9));

        let none: [Option<Location>; 2] = [None, None];
        assert!(centroid(&none, |l| *l).is_none());
    }

    #[test]
    fn test_reorders_zigzag() {
        let points = vec![xy(30.0, 0.0), xy(10.0, 0.0), xy(20.0, 0.0)];
        let order = solve(&Location::ORIGIN, &points, None, DEFAULT_MAX_PASSES);
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_keeps_input_when_already_optimal() {
        let points = vec![xy(10.0, 0.0), xy(20.0, 0.0), xy(30.0, 0.0)];
        let order = solve(&Location::ORIGIN, &points, None, DEFAULT_MAX_PASSES);
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_fixed_end_changes_order() {
        let points = vec![xy(10.0, 0.0), xy(10.0, 10.0)];
        let end = xy(0.0, 10.0);
        let order = solve(&Location::ORIGIN, &points, Some(&end), DEFAULT_MAX_PASSES);
        assert_eq!(order, vec![0, 1]);

        let end = xy(10.0, -10.0);
        let order = solve(&Location::ORIGIN, &points, Some(&end), DEFAULT_MAX_PASSES);
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn test_disabled_and_unresolvable_keep_order() {
        let items = vec![Some(xy(30.0, 0.0)), Some(xy(10.0, 0.0))];
        let start = Location::ORIGIN;

        assert!(!PathOptimizer::new(false).is_enabled());
        assert!(PathOptimizer::default().is_enabled());
        let disabled = PathOptimizer::new(false).optimize("test", items.clone(), |l| *l, Some(&start), None);
        assert_eq!(disabled, items);

        let mut partial = items.clone();
        partial.push(None);
        let kept = PathOptimizer::new(true).optimize("test", partial.clone(), |l| *l, Some(&start), None);
        assert_eq!(kept, partial);

        let unknown_start = PathOptimizer::new(true).optimize("test", items.clone(), |l| *l, None, None);
        assert_eq!(unknown_start, items);

        let optimized = PathOptimizer::new(true).optimize("test", items.clone(), |l| *l, Some(&start), None);
        assert_eq!(optimized, vec![items[1], items[0]]);
    }

    #[test]
    fn test_zero_passes_still_orders_greedily() {
        let items = vec![xy(30.0, 0.0), xy(10.0, 0.0)];
        let optimizer = PathOptimizer::new(true).with_max_passes(0);
        let ordered = optimizer.optimize("test", items.clone(), |l| Some(*l), Some(&Location::ORIGIN), None);
        assert_eq!(ordered, vec![items[1], items[0]]);
    }

    fn points_strategy() -> impl Strategy<Value = Vec<Location>> {
        proptest::collection::vec((-100.0f64..100.0, -100.0f64..100.0), 0..9)
            .prop_map(|v| v.into_iter().map(|(x, y)| xy(x, y)).collect())
    }

    proptest! {
        #[test]
        fn test_order_is_permutation(points in points_strategy(), free_end in any::<bool>()) {
            let end = xy(50.0, 50.0);
            let end = if free_end { None } else { Some(&end) };
            let mut order = solve(&Location::ORIGIN, &points, end, DEFAULT_MAX_PASSES);
            order.sort_unstable();
            prop_assert_eq!(order, (0..points.len()).collect::<Vec<_>>());
        }

        #[test]
        fn test_never_longer_than_input(points in points_strategy(), free_end in any::<bool>()) {
            let end = xy(-20.0, 80.0);
            let end = if free_end { None } else { Some(&end) };
            let order = solve(&Location::ORIGIN, &points, end, DEFAULT_MAX_PASSES);
            let identity: Vec<usize> = (0..points.len()).collect();
            let before = ordered_length(&Location::ORIGIN, &points, &identity, end);
            let after = ordered_length(&Location::ORIGIN, &points, &order, end);
            prop_assert!(after <= before + 1e-9);
            if order != identity {
                prop_assert!(after < before);
            }
        }
    }
}
