//! Property/fuzz-style checks for dock tree operations.
//!
//! Random operation streams run against the public `DockTree` API; after
//! every step the tree must report no error-level invariant issues and every
//! attached node's owner must be the unique container listing it.

use std::collections::BTreeMap;

use dockspace_core::{
    Alignment, DockTree, Dockable, DockableKey, DockableKind, Factory, Membership, Orientation,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0xA076_1D64_78BD_642F,
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(0x5851_F42D_4C95_7F2D)
            .wrapping_add(0x1405_7B7E_F767_814F);
        self.state >> 11
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            return None;
        }
        Some(items[(self.next_u64() % items.len() as u64) as usize])
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next_u64() % (bound as u64 + 1)) as usize
    }
}

fn docks(tree: &DockTree) -> Vec<DockableKey> {
    tree.walk()
        .into_iter()
        .filter(|&key| tree.get(key).is_some_and(Dockable::is_dock))
        .collect()
}

fn attached_non_root(tree: &DockTree) -> Vec<DockableKey> {
    tree.walk()
        .into_iter()
        .filter(|&key| key != tree.root())
        .collect()
}

fn fresh(factory: &Factory, rng: &mut Lcg, serial: usize) -> Dockable {
    match rng.next_u64() % 5 {
        0 => factory.create_tool(format!("tool-{serial}"), "Tool", None),
        1 => factory.create_document(format!("doc-{serial}"), "Doc", None),
        2 => factory.create_tool_dock(format!("tools-{serial}"), Alignment::Left),
        3 => factory.create_proportional_dock(format!("split-{serial}"), Orientation::Vertical),
        _ => factory.create_proportional_dock_splitter(""),
    }
}

fn assert_ownership(tree: &DockTree) -> Result<(), TestCaseError> {
    let report = tree.invariant_report();
    prop_assert!(!report.has_errors(), "issues: {:?}", report.issues);

    let mut listed: BTreeMap<DockableKey, usize> = BTreeMap::new();
    for key in tree.walk() {
        for child in tree.children(key) {
            *listed.entry(child).or_default() += 1;
            prop_assert_eq!(tree.get(child).and_then(Dockable::owner), Some(key));
        }
    }
    prop_assert!(listed.values().all(|&count| count == 1));
    for key in attached_non_root(tree) {
        prop_assert!(tree.membership(key).is_some());
    }
    Ok(())
}

fn run_stream(seed: u64, steps: usize) -> Result<(), TestCaseError> {
    let factory = Factory::new();
    let mut rng = Lcg::new(seed);
    let mut tree = factory.create_layout("Root");
    let mut serial = 0usize;

    for _ in 0..steps {
        let hash_before = tree.state_hash();
        let outcome = match rng.next_u64() % 9 {
            0 | 1 => {
                serial += 1;
                let Some(container) = rng.pick(&docks(&tree)) else {
                    continue;
                };
                let len = tree.dock(container).map_or(0, |dock| dock.visible().len());
                let index = rng.below(len + 1);
                tree.insert(fresh(&factory, &mut rng, serial))
                    .and_then(|key| tree.insert_dockable(container, index, key).map(|()| key))
                    .map(|_| ())
            }
            2 => {
                let Some(key) = rng.pick(&attached_non_root(&tree)) else {
                    continue;
                };
                match tree.membership(key) {
                    Some((owner, Membership::Visible(_))) => tree.remove_dockable(owner, key),
                    _ => tree.detach(key),
                }
            }
            3 => {
                let (Some(key), Some(target)) = (
                    rng.pick(&attached_non_root(&tree)),
                    rng.pick(&docks(&tree)),
                ) else {
                    continue;
                };
                let len = tree.dock(target).map_or(0, |dock| dock.visible().len());
                let index = rng.below(len);
                tree.move_dockable(key, target, index)
            }
            4 => {
                let Some(key) = rng.pick(&attached_non_root(&tree)) else {
                    continue;
                };
                tree.close(key).map(|_| ())
            }
            5 => {
                let Some(key) = rng.pick(&attached_non_root(&tree)) else {
                    continue;
                };
                tree.activate_path(key)
            }
            6 => {
                let Some(key) = rng.pick(&attached_non_root(&tree)) else {
                    continue;
                };
                tree.pin_dockable(key).map(|_| ())
            }
            7 => {
                let Some(key) = rng.pick(&attached_non_root(&tree)) else {
                    continue;
                };
                tree.hide_dockable(key)
            }
            _ => {
                let Some(dock) = rng.pick(&docks(&tree)) else {
                    continue;
                };
                let members = tree
                    .dock(dock)
                    .map(|state| state.visible().to_vec())
                    .unwrap_or_default();
                let target = rng.pick(&members);
                tree.set_focused_dockable(dock, target)
            }
        };
        if outcome.is_err() {
            // Refused operations other than plain inserts must not mutate.
            let detached = tree.detached();
            if detached.is_empty() {
                prop_assert_eq!(tree.state_hash(), hash_before);
            }
        }
        for key in tree.detached() {
            if tree.get(key).and_then(Dockable::owner).is_none() {
                let _ = tree.discard(key);
            }
        }
        assert_ownership(&tree)?;
    }
    Ok(())
}

#[test]
fn seed_corpus_keeps_ownership() {
    for seed in [0_u64, 1, 7, 42, 1337, 0xDEAD_BEEF] {
        run_stream(seed, 200).expect("ownership invariant");
    }
}

#[test]
fn detached_subtree_is_discarded_whole() {
    let factory = Factory::new();
    let mut tree = factory.create_layout("Root");
    let root = tree.root();
    let dock = tree
        .attach(root, factory.create_tool_dock("LeftDock", Alignment::Left))
        .expect("dock");
    let tool = tree
        .attach(dock, Dockable::new("t", DockableKind::Tool { content: None }))
        .expect("tool");
    tree.remove_dockable(root, dock).expect("remove");
    assert_eq!(tree.detached(), vec![dock, tool]);
    assert_eq!(tree.discard(dock).expect("discard"), vec![dock, tool]);
    assert!(tree.validate().is_ok());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn random_streams_keep_ownership(seed in any::<u64>(), steps in 1usize..120) {
        run_stream(seed, steps)?;
    }
}
