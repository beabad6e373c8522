//! Derivation of per-port hardware state from the VLAN table.

use crate::regs::{PORTS, VLANS};
use crate::state::{QMode, SwitchState, TagMode};

/// Rebuilds every port's derived fields (`mask`, `qmode`, and `pvid` for
/// untagged memberships) from the VLAN slots.
///
/// Total, not incremental: derived state is zeroed first, so the result
/// depends only on the VLAN table and the function can run any number of
/// times. Slots are scanned in ascending order; when a port is an untagged
/// member of several VLANs, the highest slot's vid wins as PVID.
pub fn reconcile(state: &mut SwitchState) {
    for port in state.ports.iter_mut() {
        port.mask = 0;
        port.qmode = QMode::Disabled;
    }

    for vno in 0..VLANS {
        let vlan = state.vlans[vno];
        if vlan.mask == 0 {
            continue;
        }

        for pno in 0..PORTS {
            if vlan.mask & (1 << pno) == 0 {
                continue;
            }

            if vlan.port_mode.get(pno) != TagMode::Tagged {
                state.ports[pno].pvid = vlan.vid;
            }

            if vlan.port_based {
                state.ports[pno].mask |= vlan.mask;
            } else {
                // Any 802.1Q membership forces strict tag checking on the
                // port, whatever else it belongs to.
                state.ports[pno].qmode = QMode::Secure;
            }
        }
    }

    // A port never forwards to itself.
    for (pno, port) in state.ports.iter_mut().enumerate() {
        port.mask &= !(1 << pno);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::VlanEntry;

    fn vlan(vid: u16, mask: u16, port_based: bool) -> VlanEntry {
        let mut entry = VlanEntry {
            vid,
            mask,
            port_based,
            ..VlanEntry::default()
        };
        for pno in 0..PORTS {
            if mask & (1 << pno) != 0 {
                entry.port_mode.set(pno, TagMode::Untagged);
            } else {
                entry.port_mode.set(pno, TagMode::Discard);
            }
        }
        entry
    }

    #[test]
    fn higher_slot_wins_pvid() {
        let mut state = SwitchState::default();
        state.vlans[2] = vlan(100, 0b0011, false);
        state.vlans[5] = vlan(200, 0b0001, false);

        reconcile(&mut state);

        assert_eq!(state.ports[0].pvid, 200);
        assert_eq!(state.ports[1].pvid, 100);
    }

    #[test]
    fn tagged_membership_leaves_pvid_alone() {
        let mut state = SwitchState::default();
        let mut entry = vlan(300, 0b0011, false);
        entry.port_mode.set(1, TagMode::Tagged);
        state.vlans[3] = entry;

        reconcile(&mut state);

        assert_eq!(state.ports[0].pvid, 300);
        assert_eq!(state.ports[1].pvid, 0);
    }

    #[test]
    fn port_based_slots_accumulate_masks_without_self() {
        let mut state = SwitchState::default();
        state.vlans[1] = vlan(1, 0b0111, true);
        state.vlans[2] = vlan(2, 0b1100, true);

        reconcile(&mut state);

        assert_eq!(state.ports[0].mask, 0b0110);
        assert_eq!(state.ports[1].mask, 0b0101);
        // Port 2 is in both domains; its mask is the union minus itself.
        assert_eq!(state.ports[2].mask, 0b1011);
        assert_eq!(state.ports[3].mask, 0b0100);
        for pno in 0..PORTS {
            assert_eq!(state.ports[pno].qmode, QMode::Disabled);
        }
    }

    #[test]
    fn dot1q_membership_forces_secure_mode() {
        let mut state = SwitchState::default();
        state.vlans[1] = vlan(10, 0b0011, false);

        reconcile(&mut state);

        assert_eq!(state.ports[0].qmode, QMode::Secure);
        assert_eq!(state.ports[1].qmode, QMode::Secure);
        assert_eq!(state.ports[2].qmode, QMode::Disabled);
        assert_eq!(state.ports[0].mask, 0);
    }

    #[test]
    fn rerun_is_idempotent_and_total() {
        let mut state = SwitchState::default();
        state.vlans[1] = vlan(10, 0b0011, true);
        reconcile(&mut state);
        let first = state.clone();

        // Dropping the VLAN must also drop everything derived from it.
        reconcile(&mut state);
        assert_eq!(state, first);

        state.vlans[1] = VlanEntry::default();
        reconcile(&mut state);
        assert_eq!(state.ports[0].mask, 0);
        assert_eq!(state.ports[0].qmode, QMode::Disabled);
    }
}
