//! Property tests for the VLAN reconciliation pass.

use mvsw6171::regs::{PORTS, VLANS};
use mvsw6171::{reconcile, QMode, SwitchState, TagMode, VlanEntry};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
struct SlotSpec {
    vid: u16,
    mask: u16,
    tagged: u16,
    port_based: bool,
}

fn arb_slot() -> impl Strategy<Value = SlotSpec> {
    (
        0u16..0x1000,
        0u16..(1 << PORTS),
        0u16..(1 << PORTS),
        any::<bool>(),
    )
        .prop_map(|(vid, mask, tagged, port_based)| SlotSpec {
            vid,
            mask,
            tagged,
            port_based,
        })
}

fn build_state(slots: &[SlotSpec]) -> SwitchState {
    let mut state = SwitchState::default();
    for (vno, slot) in slots.iter().enumerate().take(VLANS) {
        let mut entry = VlanEntry {
            vid: slot.vid,
            mask: slot.mask,
            port_based: slot.port_based,
            ..VlanEntry::default()
        };
        for pno in 0..PORTS {
            let mode = if slot.mask & (1 << pno) == 0 {
                TagMode::Discard
            } else if slot.tagged & (1 << pno) != 0 {
                TagMode::Tagged
            } else {
                TagMode::Untagged
            };
            entry.port_mode.set(pno, mode);
        }
        state.vlans[vno] = entry;
    }
    state
}

proptest! {
    #[test]
    fn no_port_includes_itself(slots in proptest::collection::vec(arb_slot(), VLANS)) {
        let mut state = build_state(&slots);
        reconcile(&mut state);
        for pno in 0..PORTS {
            prop_assert_eq!(state.ports[pno].mask & (1 << pno), 0);
        }
    }

    #[test]
    fn reconcile_is_idempotent(slots in proptest::collection::vec(arb_slot(), VLANS)) {
        let mut state = build_state(&slots);
        reconcile(&mut state);
        let once = state.clone();
        reconcile(&mut state);
        prop_assert_eq!(state, once);
    }

    #[test]
    fn qmode_is_secure_exactly_on_dot1q_members(
        slots in proptest::collection::vec(arb_slot(), VLANS),
    ) {
        let mut state = build_state(&slots);
        reconcile(&mut state);

        for pno in 0..PORTS {
            let dot1q_member = state
                .vlans
                .iter()
                .any(|v| v.mask != 0 && !v.port_based && v.mask & (1 << pno) != 0);
            let expected = if dot1q_member { QMode::Secure } else { QMode::Disabled };
            prop_assert_eq!(state.ports[pno].qmode, expected);
        }
    }

    #[test]
    fn port_masks_union_port_based_domains(
        slots in proptest::collection::vec(arb_slot(), VLANS),
    ) {
        let mut state = build_state(&slots);
        reconcile(&mut state);

        for pno in 0..PORTS {
            let mut expected = 0u16;
            for vlan in state.vlans.iter() {
                if vlan.port_based && vlan.mask & (1 << pno) != 0 {
                    expected |= vlan.mask;
                }
            }
            expected &= !(1 << pno);
            prop_assert_eq!(state.ports[pno].mask, expected);
        }
    }

    #[test]
    fn pvid_comes_from_the_highest_untagged_slot(
        slots in proptest::collection::vec(arb_slot(), VLANS),
    ) {
        let mut state = build_state(&slots);
        reconcile(&mut state);

        for pno in 0..PORTS {
            let winner = state
                .vlans
                .iter()
                .rev()
                .find(|v| {
                    v.mask & (1 << pno) != 0 && v.port_mode.get(pno) != TagMode::Tagged
                })
                .map(|v| v.vid);
            if let Some(vid) = winner {
                prop_assert_eq!(state.ports[pno].pvid, vid);
            } else {
                prop_assert_eq!(state.ports[pno].pvid, 0);
            }
        }
    }
}
