//! Milestone, resource and edge models
//!
//! Milestones are the deliverables of a project. They carry an optional date
//! window and a critical flag; their resource consumption is owned by the
//! [`ResourceLedger`](super::ResourceLedger) and their edges by the
//! [`GraphStore`](super::GraphStore).

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use super::id::{NodeId, ResourceId};

/// Which of a milestone's two dates a command refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateField {
    Start,
    End,
}

impl DateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateField::Start => "start",
            DateField::End => "end",
        }
    }
}

/// A project milestone (graph node)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Milestone {
    /// Human-readable name, never empty
    pub name: String,

    /// Planned start date
    pub start: Option<NaiveDate>,

    /// Planned end date
    pub end: Option<NaiveDate>,

    /// Critical milestones win concurrency slots at equal start times
    pub critical: bool,

    /// Fields owned by other collaborators (e.g. screen position), kept verbatim
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Milestone {
    /// Creates an undated, non-critical milestone
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the requested date
    pub fn date(&self, field: DateField) -> Option<NaiveDate> {
        match field {
            DateField::Start => self.start,
            DateField::End => self.end,
        }
    }

    /// Sets the requested date
    pub fn set_date(&mut self, field: DateField, date: Option<NaiveDate>) {
        match field {
            DateField::Start => self.start = date,
            DateField::End => self.end = date,
        }
    }

    /// Returns true if both dates are set
    pub fn has_dates(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

/// A shared resource consumed by milestones
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Resource {
    /// Display name
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    /// Total capacity available to the project
    #[serde(default, deserialize_with = "non_negative")]
    pub amount: f64,

    /// Maximum number of milestones using the resource at once (0 = unlimited)
    #[serde(default, deserialize_with = "slot_count")]
    pub concurrency: u32,
}

impl Resource {
    pub fn new(name: impl Into<String>, amount: f64, concurrency: u32) -> Self {
        Self {
            name: name.into(),
            amount: clamp_amount(amount),
            concurrency,
        }
    }

    /// Returns true if the resource has a positive capacity
    pub fn has_capacity(&self) -> bool {
        self.amount > 0.0
    }

    /// Returns true if the concurrency-slot check applies to this resource.
    /// Either limit makes the resource subject to conflict checks.
    pub fn has_slot_limit(&self) -> bool {
        self.concurrency > 0
    }
}

/// A directed dependency: `from` must happen before `to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

/// Clamps a user-entered amount to a finite, non-negative value
pub fn clamp_amount(amount: f64) -> f64 {
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_negative<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(clamp_amount(
        Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0),
    ))
}

fn slot_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = clamp_amount(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0));
    Ok(raw.floor().min(u32::MAX as f64) as u32)
}

/// Deserializes a consumption map, clamping every amount
pub(crate) fn consumption_map<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<ResourceId, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<ResourceId, Option<f64>>> =
        Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(id, amount)| (id, clamp_amount(amount.unwrap_or(0.0))))
        .collect())
}
