//! Tightening decisions and their rationale
//!
//! IMPORTANT: rationale codes are part of the decision report format.
//! NEVER rename a code string; add new variants instead.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::options::TighteningMode;

/// Logical address of an attribute: `Module.Entity.Attribute`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttributeId {
    pub module: String,
    pub entity: String,
    pub attribute: String,
}

impl AttributeId {
    pub fn new(module: impl Into<String>, entity: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            entity: entity.into(),
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.module, self.entity, self.attribute)
    }
}

/// Logical address of an index: `Module.Entity.Index`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexId {
    pub module: String,
    pub entity: String,
    pub index: String,
}

impl IndexId {
    pub fn new(module: impl Into<String>, entity: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            entity: entity.into(),
            index: index.into(),
        }
    }
}

impl fmt::Display for IndexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.module, self.entity, self.index)
    }
}

/// Why a decision came out the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rationale {
    // Nullability
    /// Attribute is part of the primary key
    #[serde(rename = "PK")]
    PrimaryKey,

    /// Designer declared the attribute as required
    LogicalMandatory,

    /// No NULL was observed
    DataNoNulls,

    /// NULLs were observed
    DataHasNulls { null_rows: u64 },

    /// NULLs were observed but fit the configured budget
    WithinNullBudget { null_rows: u64, total_rows: u64 },

    /// NULLs were observed beyond the configured budget
    NullBudgetExceeded { null_rows: u64, total_rows: u64 },

    /// Evidence came from a sample and the mode requires a full scan
    SampledEvidenceInsufficient,

    /// The probe did not run or produced nothing
    ProfileMissing,

    /// The table had no rows to observe
    EmptyTable,

    /// Attribute is inactive and will not be emitted
    AttributeInactive,

    // Uniqueness
    /// Index was not flagged as a unique candidate
    NotUniqueCandidate,

    /// No duplicate value group was observed
    DataNoDuplicates,

    /// Duplicate value groups were observed
    DataHasDuplicates { duplicate_groups: u64 },

    /// Platform auto-index kept because the toggle is on
    PlatformAutoIndexIncluded,

    // Relationships
    /// The logical model declares the reference
    ReferenceDeclared,

    /// No orphan row was observed
    DataNoOrphans,

    /// Orphan rows were observed
    DataHasOrphans { orphan_rows: u64 },

    /// Delete rule is configured as ignore
    DeleteRuleIgnore,

    /// Explicitly suppressed by an override
    OverrideSuppressed,

    /// Explicitly forced by an override
    OverrideForced,
}

impl Rationale {
    /// Stable string identifier
    pub fn code(&self) -> &'static str {
        match self {
            Self::PrimaryKey => "PK",
            Self::LogicalMandatory => "LOGICAL_MANDATORY",
            Self::DataNoNulls => "DATA_NO_NULLS",
            Self::DataHasNulls { .. } => "DATA_HAS_NULLS",
            Self::WithinNullBudget { .. } => "WITHIN_NULL_BUDGET",
            Self::NullBudgetExceeded { .. } => "NULL_BUDGET_EXCEEDED",
            Self::SampledEvidenceInsufficient => "SAMPLED_EVIDENCE_INSUFFICIENT",
            Self::ProfileMissing => "PROFILE_MISSING",
            Self::EmptyTable => "EMPTY_TABLE",
            Self::AttributeInactive => "ATTRIBUTE_INACTIVE",
            Self::NotUniqueCandidate => "NOT_UNIQUE_CANDIDATE",
            Self::DataNoDuplicates => "DATA_NO_DUPLICATES",
            Self::DataHasDuplicates { .. } => "DATA_HAS_DUPLICATES",
            Self::PlatformAutoIndexIncluded => "PLATFORM_AUTO_INDEX_INCLUDED",
            Self::ReferenceDeclared => "REFERENCE_DECLARED",
            Self::DataNoOrphans => "DATA_NO_ORPHANS",
            Self::DataHasOrphans { .. } => "DATA_HAS_ORPHANS",
            Self::DeleteRuleIgnore => "DELETE_RULE_IGNORE",
            Self::OverrideSuppressed => "OVERRIDE_SUPPRESSED",
            Self::OverrideForced => "OVERRIDE_FORCED",
        }
    }
}

impl fmt::Display for Rationale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataHasNulls { null_rows } => write!(f, "{}({})", self.code(), null_rows),
            Self::WithinNullBudget { null_rows, total_rows }
            | Self::NullBudgetExceeded { null_rows, total_rows } => {
                write!(f, "{}({}/{})", self.code(), null_rows, total_rows)
            }
            Self::DataHasDuplicates { duplicate_groups } => write!(f, "{}({})", self.code(), duplicate_groups),
            Self::DataHasOrphans { orphan_rows } => write!(f, "{}({})", self.code(), orphan_rows),
            _ => f.write_str(self.code()),
        }
    }
}

/// Nullability verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nullability {
    EnforceNotNull,
    AllowNull,
}

/// Uniqueness verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Uniqueness {
    EnforceUnique,
    NotUnique,
}

/// Relationship verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    Create,
    DoNotCreate,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDecision {
    pub attribute: AttributeId,
    pub verdict: Nullability,
    pub rationale: Vec<Rationale>,
}

impl ColumnDecision {
    pub fn enforces_not_null(&self) -> bool {
        self.verdict == Nullability::EnforceNotNull
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexDecision {
    pub index: IndexId,
    pub verdict: Uniqueness,
    pub rationale: Vec<Rationale>,
}

impl IndexDecision {
    pub fn enforces_unique(&self) -> bool {
        self.verdict == Uniqueness::EnforceUnique
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipDecision {
    /// Referencing attribute
    pub attribute: AttributeId,

    /// Referenced entity as `Module.Entity`
    pub target: String,

    pub verdict: Relationship,
    pub rationale: Vec<Rationale>,
}

impl RelationshipDecision {
    pub fn creates(&self) -> bool {
        self.verdict == Relationship::Create
    }
}

/// Enforced vs relaxed counts for one decision kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCounts {
    pub enforced: usize,
    pub relaxed: usize,
}

/// Totals across a decision set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionSummary {
    pub columns: DecisionCounts,
    pub indexes: DecisionCounts,
    pub relationships: DecisionCounts,
}

/// Every tightening decision of one engine run
///
/// Maps are ordered so two sets built from the same inputs compare and
/// serialize identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionSet {
    /// Mode the decisions were derived under
    pub mode: TighteningMode,

    #[serde(with = "keyed_values")]
    pub columns: BTreeMap<AttributeId, ColumnDecision>,

    #[serde(with = "keyed_values")]
    pub indexes: BTreeMap<IndexId, IndexDecision>,

    #[serde(with = "keyed_values")]
    pub relationships: BTreeMap<AttributeId, RelationshipDecision>,
}

impl DecisionSet {
    pub fn new(mode: TighteningMode) -> Self {
        Self {
            mode,
            columns: BTreeMap::new(),
            indexes: BTreeMap::new(),
            relationships: BTreeMap::new(),
        }
    }

    pub fn column(&self, attribute: &AttributeId) -> Option<&ColumnDecision> {
        self.columns.get(attribute)
    }

    pub fn index(&self, index: &IndexId) -> Option<&IndexDecision> {
        self.indexes.get(index)
    }

    pub fn relationship(&self, attribute: &AttributeId) -> Option<&RelationshipDecision> {
        self.relationships.get(attribute)
    }

    /// Decisions whose rationale list is empty; always empty for engine output
    pub fn unexplained(&self) -> Vec<String> {
        let columns = self
            .columns
            .values()
            .filter(|d| d.rationale.is_empty())
            .map(|d| d.attribute.to_string());
        let indexes = self
            .indexes
            .values()
            .filter(|d| d.rationale.is_empty())
            .map(|d| d.index.to_string());
        let relationships = self
            .relationships
            .values()
            .filter(|d| d.rationale.is_empty())
            .map(|d| d.attribute.to_string());

        columns.chain(indexes).chain(relationships).collect()
    }

    pub fn summary(&self) -> DecisionSummary {
        let mut summary = DecisionSummary::default();

        for decision in self.columns.values() {
            tally(&mut summary.columns, decision.enforces_not_null());
        }
        for decision in self.indexes.values() {
            tally(&mut summary.indexes, decision.enforces_unique());
        }
        for decision in self.relationships.values() {
            tally(&mut summary.relationships, decision.creates());
        }

        summary
    }

    /// Rationale codes touching one entity, deduplicated in first-seen order
    pub fn rationale_digest(&self, module: &str, entity: &str) -> Vec<&'static str> {
        let mut codes: Vec<&'static str> = Vec::new();

        let column_codes = self
            .columns
            .values()
            .filter(|d| d.attribute.module == module && d.attribute.entity == entity)
            .flat_map(|d| d.rationale.iter());
        let index_codes = self
            .indexes
            .values()
            .filter(|d| d.index.module == module && d.index.entity == entity)
            .flat_map(|d| d.rationale.iter());
        let relationship_codes = self
            .relationships
            .values()
            .filter(|d| d.attribute.module == module && d.attribute.entity == entity)
            .flat_map(|d| d.rationale.iter());

        for rationale in column_codes.chain(index_codes).chain(relationship_codes) {
            if !codes.contains(&rationale.code()) {
                codes.push(rationale.code());
            }
        }

        codes
    }
}

/// A decision that carries its own map key
pub trait Keyed {
    type Key: Ord + Clone;

    fn key(&self) -> &Self::Key;
}

impl Keyed for ColumnDecision {
    type Key = AttributeId;

    fn key(&self) -> &AttributeId {
        &self.attribute
    }
}

impl Keyed for IndexDecision {
    type Key = IndexId;

    fn key(&self) -> &IndexId {
        &self.index
    }
}

impl Keyed for RelationshipDecision {
    type Key = AttributeId;

    fn key(&self) -> &AttributeId {
        &self.attribute
    }
}

/// Serializes a keyed map as the sequence of its values
mod keyed_values {
    use super::Keyed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S, V>(map: &BTreeMap<V::Key, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Keyed + Serialize,
    {
        serializer.collect_seq(map.values())
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<BTreeMap<V::Key, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Keyed + Deserialize<'de>,
    {
        let values = Vec::<V>::deserialize(deserializer)?;
        Ok(values.into_iter().map(|v| (v.key().clone(), v)).collect())
    }
}

fn tally(counts: &mut DecisionCounts, enforced: bool) {
    if enforced {
        counts.enforced += 1;
    } else {
        counts.relaxed += 1;
    }
}
