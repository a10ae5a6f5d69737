//! Property-based tests for the account index invariants.
//!
//! Operations are shaped like the ones the reload path produces: each key
//! file path maps to one address at a time, updates arrive as a delete
//! followed by a re-add. Under any interleaving the index must stay sorted
//! and duplicate-free, and the address map must mirror the sorted sequence
//! exactly.

use std::collections::BTreeSet;
use std::path::PathBuf;

use keydex::{Account, AccountIndex, Address};
use proptest::prelude::*;

/// A small pool of key file paths; path i holds a key for address i % 3,
/// so some addresses are shared across several files.
fn account_for(slot: usize) -> Account {
    let mut bytes = [0u8; 20];
    bytes[0] = (slot % 3) as u8 + 1;
    Account::new(Address::new(bytes), format!("/keys/UTC--{slot:02}"))
}

#[derive(Debug, Clone)]
enum Op {
    Add(usize),
    Delete(usize),
    DeleteByPath(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..8usize).prop_map(Op::Add),
        (0..8usize).prop_map(Op::Delete),
        (0..8usize).prop_map(Op::DeleteByPath),
    ]
}

fn check_invariants(index: &AccountIndex, present: &BTreeSet<usize>) {
    let all = index.accounts();

    // Strictly sorted by URL, hence no duplicate URLs.
    for pair in all.windows(2) {
        assert!(pair[0].url < pair[1].url, "order violated: {pair:?}");
    }

    // Contents match the model exactly.
    let expected: Vec<Account> = present.iter().map(|&slot| account_for(slot)).collect();
    assert_eq!(all, expected);

    // The address map mirrors the sorted sequence.
    for account in &all {
        assert!(index.has_address(&account.address));
    }
    for slot in 0..8 {
        let account = account_for(slot);
        let shares_address = present
            .iter()
            .any(|&p| account_for(p).address == account.address);
        assert_eq!(index.has_address(&account.address), shares_address);
    }
}

proptest! {
    #[test]
    fn index_invariants_hold_under_any_interleaving(
        ops in prop::collection::vec(op_strategy(), 1..60)
    ) {
        let mut index = AccountIndex::new();
        let mut present: BTreeSet<usize> = BTreeSet::new();

        for op in ops {
            match op {
                Op::Add(slot) => {
                    index.add(account_for(slot));
                    present.insert(slot);
                }
                Op::Delete(slot) => {
                    index.delete(&account_for(slot));
                    present.remove(&slot);
                }
                Op::DeleteByPath(slot) => {
                    index.delete_by_path(&PathBuf::from(format!("/keys/UTC--{slot:02}")));
                    present.remove(&slot);
                }
            }
            check_invariants(&index, &present);
        }
    }

    #[test]
    fn add_twice_is_identity(slots in prop::collection::vec(0..8usize, 1..20)) {
        let mut index = AccountIndex::new();
        for &slot in &slots {
            index.add(account_for(slot));
        }
        let before = index.accounts();
        for &slot in &slots {
            index.add(account_for(slot));
        }
        prop_assert_eq!(index.accounts(), before);
    }
}
