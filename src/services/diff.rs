//! Previous-vs-current comparison for one park's ride list.

use std::collections::{HashMap, HashSet};

use crate::models::{RideStatus, StatusTransition};

/// Compare a freshly parsed ride list against the previous one and produce
/// the list to store plus the status transitions between the two.
///
/// Rules:
/// - a transition is emitted only when a ride exists on both sides with a
///   different status; the first sighting of a ride never notifies
/// - rides that vanished from the feed are dropped without a transition
/// - `is_favorited` is set from the favorites set, not carried over from the
///   previous entry, so a toggle takes effect on the very next cycle
/// - transition order follows the order of `current`
pub fn diff(
    previous: &[RideStatus],
    current: Vec<RideStatus>,
    favorite_rides: &HashSet<String>,
) -> (Vec<RideStatus>, Vec<StatusTransition>) {
    let previous_by_id: HashMap<&str, &RideStatus> =
        previous.iter().map(|r| (r.id.as_str(), r)).collect();

    let mut transitions = Vec::new();
    let mut annotated = current;

    for ride in &mut annotated {
        ride.is_favorited = favorite_rides.contains(&ride.id);

        if let Some(prev) = previous_by_id.get(ride.id.as_str()) {
            if prev.status != ride.status {
                transitions.push(StatusTransition {
                    park_id: ride.park_id.clone(),
                    ride_id: ride.id.clone(),
                    ride_name: ride.name.clone(),
                    old_status: Some(prev.status),
                    new_status: ride.status,
                });
            }
        }
    }

    (annotated, transitions)
}
