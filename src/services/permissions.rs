//! Hierarchical team permission resolution.
//!
//! Roles are stored only as explicit (user, team) grants. Everything else is
//! derived by walking the team forest in memory: a grant on a department
//! reaches every descendant, and ancestors of granted teams are included so
//! department pickers can show partially-granted branches. An explicit role
//! on a team always beats anything inherited from above; inheritance only
//! fills gaps and flows strictly downward.

use std::collections::{BTreeMap, BTreeSet};

use diesel::PgConnection;

use crate::db::enums::TeamRole;
use crate::db::models::user::User;
use crate::db::repositories::teams::TeamsRepo;
use crate::error::{AppError, AppResult};

/// One row of the team forest as loaded from storage.
#[derive(Debug, Clone, Copy)]
pub struct TeamNode {
    pub team_id: i32,
    pub parent_id: Option<i32>,
}

/// The resolved subtree for one user: roles after inheritance, plus the
/// parent/children adjacency restricted to the teams that were reachable
/// from the user's grants (or the whole forest for superadmins).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamTreeResult {
    pub team_roles: BTreeMap<i32, Option<TeamRole>>,
    pub team_parents: BTreeMap<i32, i32>,
    pub team_children: BTreeMap<i32, BTreeSet<i32>>,
}

/// Walks up the parent chain until an ancestor with a role is found.
///
/// A team's own explicit role short-circuits the walk. Revisiting a team
/// within one walk means the parent graph has a cycle, which is a fatal
/// configuration error: returning a partial answer here would silently
/// grant or deny the wrong teams.
pub fn find_role_from_parents(
    team_roles: &BTreeMap<i32, Option<TeamRole>>,
    team_parents: &BTreeMap<i32, i32>,
    team_id: i32,
) -> AppResult<Option<TeamRole>> {
    if let Some(Some(role)) = team_roles.get(&team_id) {
        return Ok(Some(*role));
    }

    let mut current = team_id;
    let mut visited = BTreeSet::new();

    loop {
        visited.insert(current);

        current = match team_parents.get(&current) {
            Some(parent) => *parent,
            None => return Ok(None), // at the top of the tree
        };

        if visited.contains(&current) {
            return Err(AppError::structure(format!(
                "cycle in team tree; revisited team {} while resolving team {}",
                current, team_id
            )));
        }

        if let Some(Some(role)) = team_roles.get(&current) {
            return Ok(Some(*role));
        }
    }
}

/// A user's resolved team permissions, valid for one (teams, grants)
/// snapshot. Resolving twice against unchanged inputs yields an identical
/// result.
#[derive(Debug, Clone)]
pub struct ResolvedPermissions {
    pub is_superadmin: bool,
    pub tree: TeamTreeResult,
    all_team_ids: Vec<i32>,
}

impl ResolvedPermissions {
    /// Resolves the tree for one user from the full forest and the user's
    /// explicit grants. Grant role text is validated up front; an unknown
    /// role aborts resolution.
    pub fn resolve(
        nodes: &[TeamNode],
        grants: &[(i32, TeamRole)],
        is_superadmin: bool,
    ) -> AppResult<Self> {
        let parent_of: BTreeMap<i32, Option<i32>> = nodes
            .iter()
            .map(|n| (n.team_id, n.parent_id))
            .collect();

        let mut children_of: BTreeMap<i32, BTreeSet<i32>> = BTreeMap::new();
        for node in nodes {
            if let Some(parent) = node.parent_id {
                children_of.entry(parent).or_default().insert(node.team_id);
            }
        }

        let included: BTreeSet<i32> = if is_superadmin {
            parent_of.keys().copied().collect()
        } else {
            let granted: Vec<i32> = grants
                .iter()
                .map(|(team_id, _)| *team_id)
                .filter(|team_id| parent_of.contains_key(team_id))
                .collect();

            let mut reached: BTreeSet<i32> = granted.iter().copied().collect();

            // Upward: ancestors, needed for department pickers.
            for &start in &granted {
                let mut current = start;
                while let Some(Some(parent)) = parent_of.get(&current) {
                    if !reached.insert(*parent) {
                        break;
                    }
                    current = *parent;
                }
            }

            // Downward: a grant on a department implies its whole subtree.
            let mut frontier: Vec<i32> = granted;
            while let Some(team_id) = frontier.pop() {
                if let Some(children) = children_of.get(&team_id) {
                    for &child in children {
                        if reached.insert(child) {
                            frontier.push(child);
                        }
                    }
                }
            }

            reached
        };

        let explicit_roles: BTreeMap<i32, TeamRole> = grants.iter().copied().collect();

        let mut team_roles: BTreeMap<i32, Option<TeamRole>> = BTreeMap::new();
        let mut team_parents: BTreeMap<i32, i32> = BTreeMap::new();
        let mut team_children: BTreeMap<i32, BTreeSet<i32>> = BTreeMap::new();

        for &team_id in &included {
            team_roles.insert(team_id, explicit_roles.get(&team_id).copied());
            if let Some(Some(parent)) = parent_of.get(&team_id) {
                if included.contains(parent) {
                    team_parents.insert(team_id, *parent);
                    team_children.entry(*parent).or_default().insert(team_id);
                }
            }
        }

        // Inheritance pass: fill gaps from the nearest ancestor with a role.
        let mut resolved_roles = team_roles.clone();
        for (&team_id, role) in &team_roles {
            if role.is_none() {
                let inherited = find_role_from_parents(&team_roles, &team_parents, team_id)?;
                resolved_roles.insert(team_id, inherited);
            }
        }

        Ok(Self {
            is_superadmin,
            tree: TeamTreeResult {
                team_roles: resolved_roles,
                team_parents,
                team_children,
            },
            all_team_ids: parent_of.keys().copied().collect(),
        })
    }

    /// Teams whose data the user may read.
    pub fn readable_team_ids(&self) -> Vec<i32> {
        if self.is_superadmin {
            return self.all_team_ids.clone();
        }
        self.tree
            .team_roles
            .iter()
            .filter(|(_, role)| role.is_some())
            .map(|(&team_id, _)| team_id)
            .collect()
    }

    /// Teams the user may modify; the member role is read-only.
    pub fn writable_team_ids(&self) -> Vec<i32> {
        if self.is_superadmin {
            return self.all_team_ids.clone();
        }
        self.tree
            .team_roles
            .iter()
            .filter(|(_, role)| **role == Some(TeamRole::TeamAdmin))
            .map(|(&team_id, _)| team_id)
            .collect()
    }

    /// Leaf teams the user can see. Departments are grouping nodes, not
    /// operational units, so they are excluded here.
    pub fn listable_team_ids(&self) -> Vec<i32> {
        self.tree
            .team_roles
            .iter()
            .filter(|(team_id, role)| {
                !self.tree.team_children.contains_key(team_id)
                    && (self.is_superadmin || role.is_some())
            })
            .map(|(&team_id, _)| team_id)
            .collect()
    }

    /// Every department (team with children) in the resolved subtree.
    pub fn listable_department_ids(&self) -> Vec<i32> {
        self.tree.team_children.keys().copied().collect()
    }

    /// Leaf descendants of one department the user can see.
    pub fn listable_department_team_ids(&self, department_id: i32) -> Vec<i32> {
        let mut result = Vec::new();

        let mut frontier: Vec<i32> = match self.tree.team_children.get(&department_id) {
            Some(children) => children.iter().copied().collect(),
            None => return result,
        };

        while let Some(team_id) = frontier.pop() {
            if let Some(children) = self.tree.team_children.get(&team_id) {
                frontier.extend(children.iter().copied());
            } else if self.is_superadmin
                || self
                    .tree
                    .team_roles
                    .get(&team_id)
                    .map(|role| role.is_some())
                    .unwrap_or(false)
            {
                result.push(team_id);
            }
        }

        result.sort_unstable();
        result
    }

    pub fn can_read(&self, team_id: i32) -> bool {
        self.is_superadmin
            || self
                .tree
                .team_roles
                .get(&team_id)
                .map(|role| role.is_some())
                .unwrap_or(false)
    }

    pub fn can_write(&self, team_id: i32) -> bool {
        self.is_superadmin
            || self.tree.team_roles.get(&team_id).copied().flatten() == Some(TeamRole::TeamAdmin)
    }
}

pub struct PermissionsService;

impl PermissionsService {
    /// Loads the forest and the user's grants, then resolves in memory.
    pub fn for_user(conn: &mut PgConnection, user: &User) -> AppResult<ResolvedPermissions> {
        let nodes: Vec<TeamNode> = TeamsRepo::load_all_nodes(conn)?
            .into_iter()
            .map(|(team_id, parent_id)| TeamNode { team_id, parent_id })
            .collect();

        let grants = TeamsRepo::load_user_grants(conn, user.id)?
            .into_iter()
            .map(|(team_id, role)| Ok((team_id, TeamRole::parse(&role)?)))
            .collect::<AppResult<Vec<_>>>()?;

        ResolvedPermissions::resolve(&nodes, &grants, user.is_superadmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(team_id: i32, parent_id: Option<i32>) -> TeamNode {
        TeamNode { team_id, parent_id }
    }

    // Forest used by most tests:
    //
    //   10 (department D)
    //   ├── 11 (team A)
    //   │   └── 13 (team A1)
    //   └── 12 (team B)
    //   20 (unrelated root)
    //   └── 21
    fn forest() -> Vec<TeamNode> {
        vec![
            node(10, None),
            node(11, Some(10)),
            node(12, Some(10)),
            node(13, Some(11)),
            node(20, None),
            node(21, Some(20)),
        ]
    }

    #[test]
    fn find_role_returns_nearest_ancestor_role() {
        let roles = BTreeMap::from([(42, Some(TeamRole::Member)), (2, None), (1, None)]);
        let parents = BTreeMap::from([(1, 2), (2, 42)]);
        assert_eq!(
            find_role_from_parents(&roles, &parents, 1).unwrap(),
            Some(TeamRole::Member)
        );
    }

    #[test]
    fn find_role_returns_none_at_root() {
        let roles = BTreeMap::from([(1, None), (2, None)]);
        let parents = BTreeMap::from([(1, 2)]);
        assert_eq!(find_role_from_parents(&roles, &parents, 1).unwrap(), None);
    }

    #[test]
    fn own_explicit_role_short_circuits_the_walk() {
        let roles = BTreeMap::from([(1, Some(TeamRole::Member)), (2, Some(TeamRole::TeamAdmin))]);
        let parents = BTreeMap::from([(1, 2)]);
        assert_eq!(
            find_role_from_parents(&roles, &parents, 1).unwrap(),
            Some(TeamRole::Member)
        );
    }

    #[test]
    fn cyclic_parent_graph_is_a_structural_error() {
        let roles = BTreeMap::from([(1, None), (2, None), (3, None)]);
        let parents = BTreeMap::from([(1, 2), (2, 3), (3, 1)]);
        let err = find_role_from_parents(&roles, &parents, 1).unwrap_err();
        assert!(matches!(err, AppError::Structure(_)));
    }

    #[test]
    fn department_grant_reaches_whole_subtree() {
        let grants = vec![(10, TeamRole::Member)];
        let resolved = ResolvedPermissions::resolve(&forest(), &grants, false).unwrap();

        let readable: BTreeSet<i32> = resolved.readable_team_ids().into_iter().collect();
        assert!(readable.is_superset(&BTreeSet::from([10, 11, 12, 13])));
        // The unrelated root is not reachable from the grant.
        assert!(!readable.contains(&20));
        assert!(!readable.contains(&21));

        let mut listable = resolved.listable_team_ids();
        listable.sort_unstable();
        assert_eq!(listable, vec![12, 13]); // leaves only
    }

    #[test]
    fn explicit_child_role_overrides_inherited_department_role() {
        let grants = vec![(10, TeamRole::TeamAdmin), (11, TeamRole::Member)];
        let resolved = ResolvedPermissions::resolve(&forest(), &grants, false).unwrap();

        // Override wins on the team itself.
        assert_eq!(
            resolved.tree.team_roles.get(&11).copied().flatten(),
            Some(TeamRole::Member)
        );
        // The override's children inherit the override, not the ancestor.
        assert_eq!(
            resolved.tree.team_roles.get(&13).copied().flatten(),
            Some(TeamRole::Member)
        );
        // The sibling still inherits from the department.
        assert_eq!(
            resolved.tree.team_roles.get(&12).copied().flatten(),
            Some(TeamRole::TeamAdmin)
        );
        // The child override does not promote upward.
        assert_eq!(
            resolved.tree.team_roles.get(&10).copied().flatten(),
            Some(TeamRole::TeamAdmin)
        );
    }

    #[test]
    fn member_role_does_not_grant_write() {
        let grants = vec![(10, TeamRole::Member)];
        let resolved = ResolvedPermissions::resolve(&forest(), &grants, false).unwrap();
        assert!(resolved.writable_team_ids().is_empty());
        assert!(resolved.can_read(13));
        assert!(!resolved.can_write(13));
    }

    #[test]
    fn ancestors_are_visible_but_carry_no_role() {
        // Grant deep in the tree; the ancestors appear in the result so a
        // department picker can render them, but grant no access upward.
        let grants = vec![(13, TeamRole::Member)];
        let resolved = ResolvedPermissions::resolve(&forest(), &grants, false).unwrap();

        assert!(resolved.tree.team_roles.contains_key(&10));
        assert!(resolved.tree.team_roles.contains_key(&11));
        assert_eq!(resolved.tree.team_roles.get(&10).copied().flatten(), None);
        assert_eq!(resolved.tree.team_roles.get(&11).copied().flatten(), None);
        assert_eq!(resolved.readable_team_ids(), vec![13]);
    }

    #[test]
    fn listable_sets_partition_on_children() {
        let grants = vec![(10, TeamRole::Member)];
        let resolved = ResolvedPermissions::resolve(&forest(), &grants, false).unwrap();

        let departments: BTreeSet<i32> =
            resolved.listable_department_ids().into_iter().collect();
        let leaves: BTreeSet<i32> = resolved.listable_team_ids().into_iter().collect();

        assert!(departments.iter().all(|d| !leaves.contains(d)));
        assert_eq!(departments, BTreeSet::from([10, 11]));
    }

    #[test]
    fn department_team_ids_collect_leaf_descendants() {
        let grants = vec![(10, TeamRole::Member)];
        let resolved = ResolvedPermissions::resolve(&forest(), &grants, false).unwrap();
        assert_eq!(resolved.listable_department_team_ids(10), vec![12, 13]);
        assert_eq!(resolved.listable_department_team_ids(11), vec![13]);
        // A leaf is not a department.
        assert!(resolved.listable_department_team_ids(12).is_empty());
    }

    #[test]
    fn superadmin_sees_everything_without_grants() {
        let resolved = ResolvedPermissions::resolve(&forest(), &[], true).unwrap();

        let all: BTreeSet<i32> = BTreeSet::from([10, 11, 12, 13, 20, 21]);
        assert_eq!(
            resolved.readable_team_ids().into_iter().collect::<BTreeSet<i32>>(),
            all
        );
        assert_eq!(
            resolved.writable_team_ids().into_iter().collect::<BTreeSet<i32>>(),
            all
        );

        let mut listable = resolved.listable_team_ids();
        listable.sort_unstable();
        assert_eq!(listable, vec![12, 13, 21]);
    }

    #[test]
    fn resolution_is_deterministic() {
        let grants = vec![(10, TeamRole::TeamAdmin), (21, TeamRole::Member)];
        let first = ResolvedPermissions::resolve(&forest(), &grants, false).unwrap();
        let second = ResolvedPermissions::resolve(&forest(), &grants, false).unwrap();
        assert_eq!(first.tree, second.tree);
    }

    #[test]
    fn cycle_in_resolved_subtree_aborts_resolution() {
        // Team 1 hangs under a 2 <-> 3 loop; walking up from any roleless
        // loop member revisits a team.
        let nodes = vec![node(1, Some(2)), node(2, Some(3)), node(3, Some(2))];
        let grants = vec![(1, TeamRole::Member)];
        let result = ResolvedPermissions::resolve(&nodes, &grants, false);
        assert!(matches!(result, Err(AppError::Structure(_))));
    }

    #[test]
    fn grant_on_unknown_team_is_ignored() {
        let grants = vec![(99, TeamRole::Member)];
        let resolved = ResolvedPermissions::resolve(&forest(), &grants, false).unwrap();
        assert!(resolved.readable_team_ids().is_empty());
    }
}
