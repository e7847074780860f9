//! Resource definitions and per-milestone consumption
//!
//! The ledger is the only owner of consumption amounts. Removing a resource
//! prunes it from every milestone, so a consumption entry always refers to a
//! live resource.

use std::collections::BTreeMap;

use super::id::{NodeId, ResourceId};
use super::milestone::{clamp_amount, Resource};

/// Amount per resource, as returned by cost queries
pub type Cost = BTreeMap<ResourceId, f64>;

/// Adds `other` into `total` elementwise
pub fn add_cost(total: &mut Cost, other: &Cost) {
    for (id, amount) in other {
        *total.entry(*id).or_insert(0.0) += amount;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceLedger {
    resources: BTreeMap<ResourceId, Resource>,
    consumption: BTreeMap<NodeId, BTreeMap<ResourceId, f64>>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource under the given ID, replacing any previous one
    pub fn insert_resource(&mut self, id: ResourceId, resource: Resource) {
        self.resources.insert(id, resource);
    }

    /// Removes a resource and prunes it from every consumption map
    pub fn remove_resource(&mut self, id: ResourceId) -> Option<Resource> {
        let removed = self.resources.remove(&id)?;
        for amounts in self.consumption.values_mut() {
            amounts.remove(&id);
        }
        Some(removed)
    }

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(&id)
    }

    pub fn resource_mut(&mut self, id: ResourceId) -> Option<&mut Resource> {
        self.resources.get_mut(&id)
    }

    /// All resources, ordered by ID
    pub fn resources(&self) -> &BTreeMap<ResourceId, Resource> {
        &self.resources
    }

    pub fn contains_resource(&self, id: ResourceId) -> bool {
        self.resources.contains_key(&id)
    }

    /// Sets how much of a resource a milestone uses. Amounts are clamped to
    /// >= 0 and a zero amount drops the entry.
    ///
    /// Returns the stored amount, or `None` if the resource is unknown.
    pub fn set_consumption(&mut self, node: NodeId, resource: ResourceId, amount: f64) -> Option<f64> {
        if !self.resources.contains_key(&resource) {
            return None;
        }

        let amount = clamp_amount(amount);
        let amounts = self.consumption.entry(node).or_default();
        if amount > 0.0 {
            amounts.insert(resource, amount);
        } else {
            amounts.remove(&resource);
            if amounts.is_empty() {
                self.consumption.remove(&node);
            }
        }
        Some(amount)
    }

    /// How much of a resource a milestone uses
    pub fn consumption(&self, node: NodeId, resource: ResourceId) -> f64 {
        self.consumption
            .get(&node)
            .and_then(|amounts| amounts.get(&resource))
            .copied()
            .unwrap_or(0.0)
    }

    /// Drops every consumption entry of a deleted milestone
    pub fn forget_node(&mut self, node: NodeId) {
        self.consumption.remove(&node);
    }

    /// A milestone's own consumption, zero-filled for every current resource
    pub fn cost(&self, node: NodeId) -> Cost {
        self.resources
            .keys()
            .map(|id| (*id, self.consumption(node, *id)))
            .collect()
    }

    /// Elementwise sum of `cost` over the given milestones
    pub fn cost_of<'a>(&self, nodes: impl IntoIterator<Item = &'a NodeId>) -> Cost {
        let mut total = self.cost_zero();
        for node in nodes {
            add_cost(&mut total, &self.cost(*node));
        }
        total
    }

    /// Zero for every current resource
    pub fn cost_zero(&self) -> Cost {
        self.resources.keys().map(|id| (*id, 0.0)).collect()
    }

    /// Milestones with positive consumption of the resource
    pub fn consumers(&self, resource: ResourceId) -> impl Iterator<Item = (NodeId, f64)> + '_ {
        self.consumption.iter().filter_map(move |(node, amounts)| {
            amounts
                .get(&resource)
                .filter(|amount| **amount > 0.0)
                .map(|amount| (*node, *amount))
        })
    }

    /// Stored consumption of a milestone (positive entries only)
    pub fn consumption_map(&self, node: NodeId) -> BTreeMap<ResourceId, f64> {
        self.consumption.get(&node).cloned().unwrap_or_default()
    }
}
