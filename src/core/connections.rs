/// An invitation edge between two profiles
pub trait Connection {
    fn sender(&self) -> Option<i64>;
    fn receiver(&self) -> Option<i64>;
    fn is_accepted(&self) -> bool;
}

/// Profiles connected to `profile_id` through accepted invitations, in
/// either direction
pub fn connected_profiles<C: Connection>(profile_id: i64, invitations: &[C]) -> Vec<i64> {
    let mut connected: Vec<i64> = invitations
        .iter()
        .filter(|inv| inv.is_accepted())
        .filter_map(|inv| match (inv.sender(), inv.receiver()) {
            (Some(sender), Some(receiver)) if sender == profile_id => Some(receiver),
            (Some(sender), Some(receiver)) if receiver == profile_id => Some(sender),
            _ => None,
        })
        .collect();

    connected.sort_unstable();
    connected.dedup();
    connected
}

/// Whether two profiles share an accepted invitation
pub fn are_connected<C: Connection>(profile_id: i64, other_id: i64, invitations: &[C]) -> bool {
    connected_profiles(profile_id, invitations).contains(&other_id)
}
