//! Permission resolution against a realistic org layout:
//!
//!   D (department)
//!   ├── A
//!   │   └── A1
//!   └── B
//!   X (unrelated department)
//!   └── X1

use std::collections::BTreeSet;

use teampulse_backend::db::enums::TeamRole;
use teampulse_backend::error::AppError;
use teampulse_backend::services::permissions::{ResolvedPermissions, TeamNode};

const D: i32 = 1;
const A: i32 = 2;
const B: i32 = 3;
const A1: i32 = 4;
const X: i32 = 5;
const X1: i32 = 6;

fn org() -> Vec<TeamNode> {
    vec![
        TeamNode { team_id: D, parent_id: None },
        TeamNode { team_id: A, parent_id: Some(D) },
        TeamNode { team_id: B, parent_id: Some(D) },
        TeamNode { team_id: A1, parent_id: Some(A) },
        TeamNode { team_id: X, parent_id: None },
        TeamNode { team_id: X1, parent_id: Some(X) },
    ]
}

#[test]
fn department_admin_reaches_the_whole_subtree_and_nothing_else() {
    let resolved =
        ResolvedPermissions::resolve(&org(), &[(D, TeamRole::TeamAdmin)], false).unwrap();

    let readable: BTreeSet<i32> = resolved.readable_team_ids().into_iter().collect();
    assert_eq!(readable, BTreeSet::from([D, A, B, A1]));

    let writable: BTreeSet<i32> = resolved.writable_team_ids().into_iter().collect();
    assert_eq!(writable, BTreeSet::from([D, A, B, A1]));

    assert!(!resolved.can_read(X));
    assert!(!resolved.can_read(X1));
}

#[test]
fn member_override_inside_an_admin_department_demotes_that_branch() {
    let grants = [(D, TeamRole::TeamAdmin), (A, TeamRole::Member)];
    let resolved = ResolvedPermissions::resolve(&org(), &grants, false).unwrap();

    // The overridden team and its child are read-only.
    assert!(resolved.can_read(A) && !resolved.can_write(A));
    assert!(resolved.can_read(A1) && !resolved.can_write(A1));
    // The sibling still inherits admin from the department.
    assert!(resolved.can_write(B));
    // The department itself keeps its explicit role.
    assert!(resolved.can_write(D));
}

#[test]
fn leaf_and_department_listings_partition_the_subtree() {
    let resolved =
        ResolvedPermissions::resolve(&org(), &[(D, TeamRole::Member)], false).unwrap();

    let leaves: BTreeSet<i32> = resolved.listable_team_ids().into_iter().collect();
    let departments: BTreeSet<i32> = resolved.listable_department_ids().into_iter().collect();

    assert_eq!(leaves, BTreeSet::from([B, A1]));
    assert_eq!(departments, BTreeSet::from([D, A]));
    assert!(leaves.is_disjoint(&departments));
    assert_eq!(resolved.listable_department_team_ids(D), vec![B, A1]);
}

#[test]
fn superadmin_covers_every_team_with_no_grants_at_all() {
    let resolved = ResolvedPermissions::resolve(&org(), &[], true).unwrap();
    let everything = BTreeSet::from([D, A, B, A1, X, X1]);

    assert_eq!(
        resolved.readable_team_ids().into_iter().collect::<BTreeSet<i32>>(),
        everything
    );
    assert_eq!(
        resolved.writable_team_ids().into_iter().collect::<BTreeSet<i32>>(),
        everything
    );
    assert!(resolved.can_write(X1));
}

#[test]
fn parent_cycle_fails_resolution_instead_of_guessing() {
    // The granted team hangs under a 2 <-> 3 parent loop.
    let broken = vec![
        TeamNode { team_id: 1, parent_id: Some(2) },
        TeamNode { team_id: 2, parent_id: Some(3) },
        TeamNode { team_id: 3, parent_id: Some(2) },
    ];
    let result = ResolvedPermissions::resolve(&broken, &[(1, TeamRole::Member)], false);
    assert!(matches!(result, Err(AppError::Structure(_))));
}

#[test]
fn resolving_twice_gives_identical_trees() {
    let grants = [(A, TeamRole::TeamAdmin), (X1, TeamRole::Member)];
    let first = ResolvedPermissions::resolve(&org(), &grants, false).unwrap();
    let second = ResolvedPermissions::resolve(&org(), &grants, false).unwrap();
    assert_eq!(first.tree, second.tree);
    assert_eq!(first.readable_team_ids(), second.readable_team_ids());
}
