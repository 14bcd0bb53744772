//! Deterministic selection of the nearest candidates.
//!
//! Candidates are sorted by distance with a total order, exact ties broken
//! by a stable identity key. Starting from the closest, every following
//! candidate is kept while its distance exceeds the previous one by less
//! than `epsilon`; the first larger gap ends the band. The result never
//! depends on the order in which the spatial index returned candidates.
//! Candidates whose distance is NaN are discarded.

/// A candidate with its projected distance from the point being linked
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked<T> {
    pub item: T,
    pub distance: f64,
}

/// Candidates with a comparable distance, sorted ascending by `(distance, key)`
pub fn rank<T, K, D, F>(
    candidates: impl IntoIterator<Item = T>,
    distance: D,
    key: F,
) -> Vec<Ranked<T>>
where
    D: Fn(&T) -> f64,
    F: Fn(&T) -> K,
    K: Ord,
{
    let mut ranked: Vec<Ranked<T>> = candidates
        .into_iter()
        .map(|item| {
            let distance = distance(&item);
            Ranked { item, distance }
        })
        .filter(|ranked| !ranked.distance.is_nan())
        .collect();
    ranked.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| key(&a.item).cmp(&key(&b.item)))
    });
    ranked
}

/// Leading run of `sorted` in which consecutive distances differ by less than `epsilon`
pub fn epsilon_band<T>(sorted: Vec<Ranked<T>>, epsilon: f64) -> Vec<Ranked<T>> {
    let mut band: Vec<Ranked<T>> = Vec::new();
    for candidate in sorted {
        if let Some(previous) = band.last() {
            if candidate.distance - previous.distance >= epsilon {
                break;
            }
        }
        band.push(candidate);
    }
    band
}

/// The tied-nearest candidates, closest first
pub fn select_closest<T, K, D, F>(
    candidates: impl IntoIterator<Item = T>,
    distance: D,
    key: F,
    epsilon: f64,
) -> Vec<Ranked<T>>
where
    D: Fn(&T) -> f64,
    F: Fn(&T) -> K,
    K: Ord,
{
    epsilon_band(rank(candidates, distance, key), epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_candidates_within_epsilon_of_each_other() {
        // Point at (0, 1), edges at 0.0002, 0.0002000000001 and 0.0003 degrees
        let candidates = vec![("c", 0.0003), ("b", 0.000_200_000_000_1), ("a", 0.0002)];
        let selected = select_closest(candidates, |c| c.1, |c| c.0, 0.000_000_99);

        let names: Vec<&str> = selected.iter().map(|r| r.item.0).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(selected[0].distance < selected[1].distance);
    }

    #[test]
    fn band_follows_a_chain_of_small_gaps() {
        let candidates = vec![1.0, 1.4, 1.8, 2.2, 3.0];
        let selected = select_closest(candidates, |d| *d, |d| d.to_bits(), 0.5);
        assert_eq!(selected.len(), 4);
    }

    #[test]
    fn order_does_not_depend_on_input_order() {
        let forward = vec![(3_u32, 0.5), (1, 0.5), (2, 0.5), (4, 0.7)];
        let mut backward = forward.clone();
        backward.reverse();

        let a = select_closest(forward, |c| c.1, |c| c.0, 1e-9);
        let b = select_closest(backward, |c| c.1, |c| c.0, 1e-9);
        assert_eq!(a, b);
        assert_eq!(a.iter().map(|r| r.item.0).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn empty_input_selects_nothing() {
        let selected = select_closest(Vec::<(u32, f64)>::new(), |c| c.1, |c| c.0, 1.0);
        assert!(selected.is_empty());
    }

    #[test]
    fn nan_distances_are_never_selected() {
        let candidates = vec![(1_u32, f64::NAN), (2, 0.1)];
        let selected = select_closest(candidates, |c| c.1, |c| c.0, 1.0);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].item.0, 2);
    }

    #[test]
    fn negative_nan_does_not_lead_the_band() {
        let candidates = vec![(1_u32, -f64::NAN), (2, 0.1), (3, 0.1), (4, f64::NAN)];
        let selected = select_closest(candidates, |c| c.1, |c| c.0, 1e-6);
        assert_eq!(selected.iter().map(|r| r.item.0).collect::<Vec<_>>(), vec![2, 3]);
        assert!(selected.iter().all(|r| r.distance.is_finite()));
    }
}
