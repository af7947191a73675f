use rand::seq::SliceRandom;
use rand::Rng;

use super::zone::{Zone, ZoneType};
use crate::domain::agent::Position;

/// A zone picked for an agent and the point to move it to
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub zone_id: String,
    pub center: Position,
}

/// Picks a free zone of `zone_type` uniformly at random
///
/// `occupants` must hold the positions of every agent except the one being
/// placed. A zone is free when none of them lies inside it.
///
/// # Returns
/// The chosen zone and its centre, or `None` when every matching zone is taken
/// (or there are no zones of that type at all).
///
/// # Example
/// ```
/// use gameboard_api::domain::agent::Position;
/// use gameboard_api::domain::zone::{allocate, default_zones, ZoneType};
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let zones = default_zones();
/// let taken = vec![Position::new(60.0, 60.0)];
///
/// let allocation = allocate(ZoneType::Arrival, &zones, &taken, &mut rng).unwrap();
/// assert_ne!(allocation.zone_id, "finish-zone-1");
/// ```
pub fn allocate<R: Rng + ?Sized>(
    zone_type: ZoneType,
    zones: &[Zone],
    occupants: &[Position],
    rng: &mut R,
) -> Option<Allocation> {
    let free: Vec<&Zone> = zones
        .iter()
        .filter(|zone| zone.zone_type == zone_type)
        .filter(|zone| !occupants.iter().any(|p| zone.contains(p)))
        .collect();

    free.choose(rng).map(|zone| Allocation {
        zone_id: zone.id.clone(),
        center: zone.center(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::zone::default_zones;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn single(zone_type: ZoneType) -> Vec<Zone> {
        vec![Zone::new("only", 0.0, 0.0, 100.0, 100.0, zone_type)]
    }

    #[test]
    fn returns_center_of_free_zone() {
        let mut rng = StdRng::seed_from_u64(1);

        let allocation = allocate(ZoneType::Arrival, &single(ZoneType::Arrival), &[], &mut rng);

        assert_eq!(
            allocation,
            Some(Allocation {
                zone_id: "only".to_string(),
                center: Position::new(50.0, 50.0),
            })
        );
    }

    #[test]
    fn occupied_zone_is_skipped() {
        let mut rng = StdRng::seed_from_u64(1);
        let zones = single(ZoneType::Arrival);

        let allocation = allocate(ZoneType::Arrival, &zones, &[Position::new(10.0, 10.0)], &mut rng);

        assert!(allocation.is_none());
    }

    #[test]
    fn occupant_on_far_edge_does_not_block() {
        let mut rng = StdRng::seed_from_u64(1);
        let zones = single(ZoneType::Arrival);

        let allocation = allocate(ZoneType::Arrival, &zones, &[Position::new(100.0, 0.0)], &mut rng);

        assert!(allocation.is_some());
    }

    #[test]
    fn filters_by_zone_type() {
        let mut rng = StdRng::seed_from_u64(1);

        assert!(allocate(ZoneType::DropOff, &default_zones(), &[], &mut rng).is_none());
        assert!(allocate(ZoneType::DropOff, &single(ZoneType::DropOff), &[], &mut rng).is_some());
    }

    #[test]
    fn same_seed_same_choice() {
        let zones = default_zones();
        let occupants = vec![Position::new(60.0, 60.0), Position::new(360.0, 60.0)];

        let first = allocate(ZoneType::Arrival, &zones, &occupants, &mut StdRng::seed_from_u64(42));
        let second = allocate(ZoneType::Arrival, &zones, &occupants, &mut StdRng::seed_from_u64(42));

        assert_eq!(first, second);
        let chosen = first.unwrap();
        assert_ne!(chosen.zone_id, "finish-zone-1");
        assert_ne!(chosen.zone_id, "finish-zone-3");
    }

    #[test]
    fn every_free_zone_is_reachable() {
        let zones = default_zones();
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = std::collections::HashSet::new();

        for _ in 0..500 {
            if let Some(a) = allocate(ZoneType::Arrival, &zones, &[], &mut rng) {
                seen.insert(a.zone_id);
            }
        }

        assert_eq!(seen.len(), zones.len());
    }
}
