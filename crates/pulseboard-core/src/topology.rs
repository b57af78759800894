//! Dashboard topology: the grouping tree the aggregator walks.
//!
//! Owned and edited elsewhere; this crate only reads snapshots of it.

use serde::{Deserialize, Serialize};

use crate::ids::{CheckId, DashboardId, GroupId};

/// A named set of checks within one dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
  pub group_id:  GroupId,
  pub name:      String,
  pub check_ids: Vec<CheckId>,
}

impl Group {
  pub fn contains(&self, check_id: CheckId) -> bool {
    self.check_ids.contains(&check_id)
  }
}

/// The aggregation topology of one dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topology {
  pub dashboard_id:        DashboardId,
  pub groups:              Vec<Group>,
  pub ungrouped_check_ids: Vec<CheckId>,
}

impl Topology {
  pub fn new(dashboard_id: DashboardId) -> Self {
    Self { dashboard_id, groups: Vec::new(), ungrouped_check_ids: Vec::new() }
  }

  /// Every check referenced by the dashboard, grouped or not, without
  /// duplicates, in first-seen order.
  pub fn all_check_ids(&self) -> Vec<CheckId> {
    let mut ids = Vec::new();
    let grouped = self.groups.iter().flat_map(|g| g.check_ids.iter());
    for &id in grouped.chain(self.ungrouped_check_ids.iter()) {
      if !ids.contains(&id) {
        ids.push(id);
      }
    }
    ids
  }

  pub fn contains_check(&self, check_id: CheckId) -> bool {
    self.ungrouped_check_ids.contains(&check_id)
      || self.groups.iter().any(|g| g.contains(check_id))
  }

  /// Groups that list `check_id`. A check may belong to several.
  pub fn groups_containing(
    &self,
    check_id: CheckId,
  ) -> impl Iterator<Item = &Group> + '_ {
    self.groups.iter().filter(move |g| g.contains(check_id))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn topology() -> Topology {
    Topology {
      dashboard_id:        DashboardId(1),
      groups:              vec![
        Group { group_id: GroupId(10), name: "api".into(), check_ids: vec![CheckId(1), CheckId(2)] },
        Group { group_id: GroupId(11), name: "edge".into(), check_ids: vec![CheckId(2), CheckId(3)] },
      ],
      ungrouped_check_ids: vec![CheckId(4), CheckId(1)],
    }
  }

  #[test]
  fn all_check_ids_deduplicates() {
    assert_eq!(
      topology().all_check_ids(),
      vec![CheckId(1), CheckId(2), CheckId(3), CheckId(4)]
    );
  }

  #[test]
  fn finds_every_group_of_a_check() {
    let t = topology();
    let groups: Vec<_> = t.groups_containing(CheckId(2)).map(|g| g.group_id).collect();
    assert_eq!(groups, vec![GroupId(10), GroupId(11)]);
    assert!(t.contains_check(CheckId(4)));
    assert!(!t.contains_check(CheckId(99)));
  }
}
