use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Display name used when a deal's owner id is missing or not in the directory.
pub const UNKNOWN_REP: &str = "Unknown";

/// Label for lost deals that carry no loss reason.
pub const NO_LOSS_REASON: &str = "No reason given";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    NewLead,
    InProgress,
    SdrCallScheduled,
    Mql,
    Sql,
    SalesWon,
    SalesLost,
    LostBeforeMql,
}

impl Stage {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::NewLead,
            Self::InProgress,
            Self::SdrCallScheduled,
            Self::Mql,
            Self::Sql,
            Self::SalesWon,
            Self::SalesLost,
            Self::LostBeforeMql,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NewLead => "New Lead",
            Self::InProgress => "In Progress",
            Self::SdrCallScheduled => "SDR Call Scheduled",
            Self::Mql => "MQL",
            Self::Sql => "Kwalka (SQL)",
            Self::SalesWon => "Sales Won",
            Self::SalesLost => "Sales Lost",
            Self::LostBeforeMql => "Lost Before MQL",
        }
    }

    pub const fn is_lost(self) -> bool {
        matches!(self, Self::SalesLost | Self::LostBeforeMql)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the pipeline table: the CRM stage id and the property holding
/// the timestamp at which a deal entered that stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageField {
    pub stage: Stage,
    pub stage_id: String,
    pub entered_property: String,
}

/// Immutable mapping between CRM stage ids, stage-entry properties and stages.
#[derive(Debug, Clone)]
pub struct StageTable {
    fields: Vec<StageField>,
}

impl StageTable {
    pub fn new(fields: Vec<StageField>) -> Self {
        Self { fields }
    }

    /// Stage ids of the SDR pipeline.
    pub fn sdr_pipeline() -> Self {
        const STAGE_IDS: [(Stage, &str); 8] = [
            (Stage::NewLead, "344689645"),
            (Stage::InProgress, "346880461"),
            (Stage::SdrCallScheduled, "344689648"),
            (Stage::Mql, "344689652"),
            (Stage::Sql, "344689650"),
            (Stage::SalesWon, "3981279427"),
            (Stage::SalesLost, "3938055393"),
            (Stage::LostBeforeMql, "344689651"),
        ];

        let fields = STAGE_IDS
            .iter()
            .map(|(stage, id)| StageField {
                stage: *stage,
                stage_id: (*id).to_string(),
                entered_property: format!("hs_v2_date_entered_{id}"),
            })
            .collect();
        Self::new(fields)
    }

    pub fn fields(&self) -> &[StageField] {
        &self.fields
    }

    pub fn stage_for_id(&self, stage_id: &str) -> Option<Stage> {
        self.fields
            .iter()
            .find(|field| field.stage_id == stage_id)
            .map(|field| field.stage)
    }

    pub fn entered_properties(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .map(|field| field.entered_property.as_str())
    }
}

impl Default for StageTable {
    fn default() -> Self {
        Self::sdr_pipeline()
    }
}

/// Current pipeline position of a deal. Ids missing from the stage table are
/// kept verbatim so they still show up in reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentStage {
    Known(Stage),
    Other(String),
}

impl CurrentStage {
    pub fn label(&self) -> &str {
        match self {
            Self::Known(stage) => stage.label(),
            Self::Other(raw) => raw,
        }
    }
}

/// A pipeline deal as delivered by the CRM collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deal {
    pub id: String,
    pub name: String,
    pub current_stage: CurrentStage,
    pub owner_id: Option<String>,
    /// Raw stage-entry timestamps; only stages the deal actually entered.
    pub entered: BTreeMap<Stage, String>,
    pub lost_reason: Option<String>,
    pub lost_description: Option<String>,
}

impl Deal {
    pub fn entered_at(&self, stage: Stage) -> Option<&str> {
        self.entered.get(&stage).map(String::as_str)
    }
}

/// Rep id to display-name lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepDirectory {
    names: HashMap<String, String>,
}

impl RepDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.names.insert(id.into(), name.into());
    }

    pub fn resolve(&self, owner_id: Option<&str>) -> &str {
        owner_id
            .and_then(|id| self.names.get(id))
            .map(String::as_str)
            .unwrap_or(UNKNOWN_REP)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RepDirectory
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let names = iter
            .into_iter()
            .map(|(id, name)| (id.into(), name.into()))
            .collect();
        Self { names }
    }
}

/// Rep display names that never appear in any report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepExclusions {
    names: BTreeSet<String>,
}

impl RepExclusions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn contains(&self, rep: &str) -> bool {
        self.names.contains(rep)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for RepExclusions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}
