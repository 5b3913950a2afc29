//! Decision engine: tightening verdicts from the model and observed data
//!
//! `DecisionEngine::decide` is a pure function of its three inputs. It does
//! no I/O and cannot fail; options are validated before they get here.

use schemasmith_core::model::{Attribute, AttributeReference, Entity, Index, LogicalSchemaModel, Module};
use schemasmith_core::{
    AttributeId, ColumnDecision, ColumnProfile, DecisionSet, DeleteRule, ForeignKeyOverride, IndexDecision,
    IndexId, Nullability, ProfileSnapshot, Rationale, Relationship, RelationshipDecision, TighteningMode,
    TighteningOptions, Uniqueness,
};

/// Derives a `DecisionSet` from a model, a snapshot and options
pub struct DecisionEngine;

impl DecisionEngine {
    /// Decide every column, index and relationship of the model
    ///
    /// Platform auto-indexes get no decision unless the options include them.
    pub fn decide(
        model: &LogicalSchemaModel,
        snapshot: &ProfileSnapshot,
        options: &TighteningOptions,
    ) -> DecisionSet {
        let mut decisions = DecisionSet::new(options.mode);

        for (module, entity) in model.entities() {
            for attribute in &entity.attributes {
                let column = decide_column(module, entity, attribute, snapshot, options);
                decisions.columns.insert(column.attribute.clone(), column);

                if let Some(reference) = &attribute.reference {
                    let relationship = decide_relationship(module, entity, attribute, reference, snapshot, options);
                    decisions.relationships.insert(relationship.attribute.clone(), relationship);
                }
            }

            for index in &entity.indexes {
                if let Some(decision) = decide_index(module, entity, index, snapshot, options) {
                    decisions.indexes.insert(decision.index.clone(), decision);
                }
            }
        }

        let summary = decisions.summary();
        tracing::info!(
            mode = %options.mode,
            columns_enforced = summary.columns.enforced,
            columns_relaxed = summary.columns.relaxed,
            unique_enforced = summary.indexes.enforced,
            foreign_keys_created = summary.relationships.enforced,
            foreign_keys_suppressed = summary.relationships.relaxed,
            "tightening decisions derived"
        );

        decisions
    }
}

fn attribute_id(module: &Module, entity: &Entity, attribute: &Attribute) -> AttributeId {
    AttributeId::new(&module.name, &entity.logical_name, &attribute.logical_name)
}

fn decide_column(
    module: &Module,
    entity: &Entity,
    attribute: &Attribute,
    snapshot: &ProfileSnapshot,
    options: &TighteningOptions,
) -> ColumnDecision {
    let id = attribute_id(module, entity, attribute);

    if !attribute.is_active {
        return ColumnDecision {
            attribute: id,
            verdict: Nullability::AllowNull,
            rationale: vec![Rationale::AttributeInactive],
        };
    }

    if attribute.is_identifier {
        return ColumnDecision {
            attribute: id,
            verdict: Nullability::EnforceNotNull,
            rationale: vec![Rationale::PrimaryKey],
        };
    }

    let mut rationale = Vec::new();
    if attribute.is_mandatory {
        rationale.push(Rationale::LogicalMandatory);
    }

    let (schema, table) = entity.profile_table();
    let verdict = match snapshot
        .column(schema, table, attribute.profile_column())
        .filter(|p| !p.missing)
    {
        Some(profile) => evaluate_nulls(profile, options, &mut rationale),
        None => {
            rationale.push(Rationale::ProfileMissing);
            Nullability::AllowNull
        }
    };

    if verdict == Nullability::AllowNull && attribute.is_mandatory {
        tracing::debug!(attribute = %id, ?rationale, "mandatory attribute left nullable");
    }

    ColumnDecision {
        attribute: id,
        verdict,
        rationale,
    }
}

fn evaluate_nulls(profile: &ColumnProfile, options: &TighteningOptions, rationale: &mut Vec<Rationale>) -> Nullability {
    if profile.row_count == 0 {
        rationale.push(Rationale::EmptyTable);
        if options.mode == TighteningMode::Cautious {
            return Nullability::AllowNull;
        }
        rationale.push(Rationale::DataNoNulls);
        return Nullability::EnforceNotNull;
    }

    let null_rows = profile.null_count;
    let total_rows = profile.row_count;

    match options.mode {
        TighteningMode::Cautious | TighteningMode::EvidenceGated => {
            if null_rows > 0 {
                rationale.push(Rationale::DataHasNulls { null_rows });
                Nullability::AllowNull
            } else if options.mode == TighteningMode::Cautious && !profile.sampling.is_exhaustive() {
                rationale.push(Rationale::SampledEvidenceInsufficient);
                Nullability::AllowNull
            } else {
                rationale.push(Rationale::DataNoNulls);
                Nullability::EnforceNotNull
            }
        }
        TighteningMode::Aggressive => {
            if null_rows == 0 {
                rationale.push(Rationale::DataNoNulls);
                Nullability::EnforceNotNull
            } else if options.null_budget.admits(null_rows, total_rows) {
                rationale.push(Rationale::WithinNullBudget { null_rows, total_rows });
                Nullability::EnforceNotNull
            } else {
                rationale.push(Rationale::NullBudgetExceeded { null_rows, total_rows });
                Nullability::AllowNull
            }
        }
    }
}

fn decide_index(
    module: &Module,
    entity: &Entity,
    index: &Index,
    snapshot: &ProfileSnapshot,
    options: &TighteningOptions,
) -> Option<IndexDecision> {
    if index.is_platform_auto && !options.include_platform_auto_indexes {
        return None;
    }

    let id = IndexId::new(&module.name, &entity.logical_name, &index.name);
    let mut rationale = Vec::new();

    if index.is_platform_auto {
        rationale.push(Rationale::PlatformAutoIndexIncluded);
    }

    let verdict = if !index.is_unique {
        rationale.push(Rationale::NotUniqueCandidate);
        Uniqueness::NotUnique
    } else {
        let columns: Vec<&str> = index
            .attributes
            .iter()
            .map(|name| entity.attribute(name).map_or(name.as_str(), Attribute::profile_column))
            .collect();
        let (schema, table) = entity.profile_table();

        match snapshot
            .unique_candidate(schema, table, &columns)
            .filter(|p| !p.missing)
        {
            None => {
                rationale.push(Rationale::ProfileMissing);
                Uniqueness::NotUnique
            }
            Some(profile) if profile.duplicate_groups > 0 => {
                tracing::debug!(index = %id, duplicate_groups = profile.duplicate_groups, "unique candidate has duplicates");
                rationale.push(Rationale::DataHasDuplicates {
                    duplicate_groups: profile.duplicate_groups,
                });
                Uniqueness::NotUnique
            }
            Some(profile) if options.mode == TighteningMode::Cautious && !profile.sampling.is_exhaustive() => {
                rationale.push(Rationale::SampledEvidenceInsufficient);
                Uniqueness::NotUnique
            }
            Some(_) => {
                rationale.push(Rationale::DataNoDuplicates);
                Uniqueness::EnforceUnique
            }
        }
    };

    Some(IndexDecision {
        index: id,
        verdict,
        rationale,
    })
}

fn decide_relationship(
    module: &Module,
    entity: &Entity,
    attribute: &Attribute,
    reference: &AttributeReference,
    snapshot: &ProfileSnapshot,
    options: &TighteningOptions,
) -> RelationshipDecision {
    let id = attribute_id(module, entity, attribute);
    let target = reference.target.to_string();

    let (verdict, rationale) = if reference.delete_rule == DeleteRule::Ignore {
        (Relationship::DoNotCreate, vec![Rationale::DeleteRuleIgnore])
    } else if !attribute.is_active {
        (Relationship::DoNotCreate, vec![Rationale::AttributeInactive])
    } else {
        let (schema, table) = entity.profile_table();
        let profile = snapshot
            .foreign_key(schema, table, attribute.profile_column())
            .filter(|p| !p.missing);

        match options.foreign_key_override(&id.to_string()) {
            Some(ForeignKeyOverride::Suppress) => (
                Relationship::DoNotCreate,
                vec![Rationale::ReferenceDeclared, Rationale::OverrideSuppressed],
            ),
            Some(ForeignKeyOverride::Create) => {
                let mut rationale = vec![Rationale::ReferenceDeclared, Rationale::OverrideForced];
                if let Some(profile) = profile.filter(|p| p.orphan_rows > 0) {
                    rationale.push(Rationale::DataHasOrphans {
                        orphan_rows: profile.orphan_rows,
                    });
                }
                (Relationship::Create, rationale)
            }
            None => match profile {
                None => (
                    Relationship::Create,
                    vec![Rationale::ReferenceDeclared, Rationale::ProfileMissing],
                ),
                Some(profile) if profile.orphan_rows > 0 => {
                    tracing::debug!(attribute = %id, orphan_rows = profile.orphan_rows, "relationship suppressed by orphans");
                    (
                        Relationship::DoNotCreate,
                        vec![
                            Rationale::ReferenceDeclared,
                            Rationale::DataHasOrphans {
                                orphan_rows: profile.orphan_rows,
                            },
                        ],
                    )
                }
                Some(_) => (
                    Relationship::Create,
                    vec![Rationale::ReferenceDeclared, Rationale::DataNoOrphans],
                ),
            },
        }
    };

    RelationshipDecision {
        attribute: id,
        target,
        verdict,
        rationale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use schemasmith_core::model::PhysicalTable;
    use schemasmith_core::{
        ColumnKey, DataType, EntityRef, ForeignKeyProfile, SamplingStrategy, UniqueProfile,
    };

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn model() -> LogicalSchemaModel {
        LogicalSchemaModel::new(vec![Module::new("Sales")
            .with_entity(
                Entity::new("Customer")
                    .with_attribute(Attribute::new("Id", DataType::LongInteger).identifier().auto_number()),
            )
            .with_entity(
                Entity::new("Order")
                    .with_physical(PhysicalTable::new("OSUSR", "ORDER"))
                    .with_attribute(Attribute::new("Id", DataType::LongInteger).identifier())
                    .with_attribute(Attribute::new("Code", DataType::Text { length: Some(20) }).mandatory())
                    .with_attribute(Attribute::new("Note", DataType::Text { length: None }))
                    .with_attribute(Attribute::new("Legacy", DataType::Integer).inactive())
                    .with_attribute(
                        Attribute::new("CustomerId", DataType::LongInteger)
                            .with_reference(EntityRef::new("Sales", "Customer"), DeleteRule::Protect),
                    )
                    .with_attribute(
                        Attribute::new("ParentId", DataType::LongInteger)
                            .with_reference(EntityRef::new("Sales", "Order"), DeleteRule::Ignore),
                    )
                    .with_index(Index::new("IX_Code", vec!["Code".into()]).unique())
                    .with_index(Index::new("IX_Note", vec!["Note".into()]))
                    .with_index(Index::new("OSIDX_CustomerId", vec!["CustomerId".into()]).platform_auto()),
            )])
    }

    fn column(name: &str, rows: u64, nulls: u64, sampling: SamplingStrategy) -> ColumnProfile {
        ColumnProfile {
            key: ColumnKey::new("OSUSR", "ORDER", name),
            row_count: rows,
            null_count: nulls,
            sampling,
            observed_at: at(),
            missing: false,
        }
    }

    fn unique(duplicates: u64) -> UniqueProfile {
        UniqueProfile {
            schema: "OSUSR".into(),
            table: "ORDER".into(),
            columns: vec!["Code".into()],
            duplicate_groups: duplicates,
            sampling: SamplingStrategy::FullScan,
            observed_at: at(),
            missing: false,
        }
    }

    fn orphans(column: &str, orphan_rows: u64) -> ForeignKeyProfile {
        ForeignKeyProfile {
            key: ColumnKey::new("OSUSR", "ORDER", column),
            orphan_rows,
            sampling: SamplingStrategy::FullScan,
            observed_at: at(),
            missing: false,
        }
    }

    fn order(attribute: &str) -> AttributeId {
        AttributeId::new("Sales", "Order", attribute)
    }

    #[test]
    fn primary_key_is_enforced_with_pk_rationale() {
        let snapshot = ProfileSnapshot::new(at()).with_column(column("Id", 100, 0, SamplingStrategy::FullScan));
        let set = DecisionEngine::decide(&model(), &snapshot, &TighteningOptions::new(TighteningMode::Cautious));

        let decision = set.column(&order("Id")).unwrap();
        assert!(decision.enforces_not_null());
        assert!(decision.rationale.contains(&Rationale::PrimaryKey));
    }

    #[test]
    fn zero_nulls_tighten_under_evidence_gated() {
        let snapshot = ProfileSnapshot::new(at())
            .with_column(column("Code", 100, 0, SamplingStrategy::Sampled { sample_rows: 100 }));
        let set = DecisionEngine::decide(&model(), &snapshot, &TighteningOptions::new(TighteningMode::EvidenceGated));

        let decision = set.column(&order("Code")).unwrap();
        assert!(decision.enforces_not_null());
        assert_eq!(decision.rationale, vec![Rationale::LogicalMandatory, Rationale::DataNoNulls]);
    }

    #[test]
    fn cautious_requires_exhaustive_evidence() {
        let sampled = ProfileSnapshot::new(at())
            .with_column(column("Code", 100, 0, SamplingStrategy::Sampled { sample_rows: 100 }));
        let full = ProfileSnapshot::new(at()).with_column(column("Code", 100, 0, SamplingStrategy::FullScan));
        let options = TighteningOptions::new(TighteningMode::Cautious);

        let set = DecisionEngine::decide(&model(), &sampled, &options);
        let decision = set.column(&order("Code")).unwrap();
        assert!(!decision.enforces_not_null());
        assert!(decision.rationale.contains(&Rationale::SampledEvidenceInsufficient));

        let set = DecisionEngine::decide(&model(), &full, &options);
        assert!(set.column(&order("Code")).unwrap().enforces_not_null());
    }

    #[test]
    fn missing_probe_never_tightens() {
        let mut profile = column("Code", 100, 0, SamplingStrategy::FullScan);
        profile.missing = true;
        let snapshot = ProfileSnapshot::new(at()).with_column(profile);

        for mode in [TighteningMode::Cautious, TighteningMode::EvidenceGated, TighteningMode::Aggressive] {
            let set = DecisionEngine::decide(&model(), &snapshot, &TighteningOptions::new(mode));
            let decision = set.column(&order("Code")).unwrap();
            assert!(!decision.enforces_not_null(), "mode {}", mode);
            assert!(decision.rationale.contains(&Rationale::ProfileMissing));
        }
    }

    #[test]
    fn aggressive_respects_null_budget() {
        let snapshot = ProfileSnapshot::new(at())
            .with_column(column("Note", 1000, 5, SamplingStrategy::Sampled { sample_rows: 1000 }));

        let within = TighteningOptions::new(TighteningMode::Aggressive).with_null_budget(0.01).unwrap();
        let set = DecisionEngine::decide(&model(), &snapshot, &within);
        let decision = set.column(&order("Note")).unwrap();
        assert!(decision.enforces_not_null());
        assert_eq!(
            decision.rationale,
            vec![Rationale::WithinNullBudget { null_rows: 5, total_rows: 1000 }]
        );

        let exceeded = TighteningOptions::new(TighteningMode::Aggressive).with_null_budget(0.001).unwrap();
        let set = DecisionEngine::decide(&model(), &snapshot, &exceeded);
        let decision = set.column(&order("Note")).unwrap();
        assert!(!decision.enforces_not_null());
        assert_eq!(
            decision.rationale,
            vec![Rationale::NullBudgetExceeded { null_rows: 5, total_rows: 1000 }]
        );
    }

    #[test]
    fn observed_nulls_block_non_aggressive_modes() {
        let snapshot = ProfileSnapshot::new(at()).with_column(column("Note", 10, 1, SamplingStrategy::FullScan));
        let set = DecisionEngine::decide(&model(), &snapshot, &TighteningOptions::new(TighteningMode::EvidenceGated));

        assert_eq!(
            set.column(&order("Note")).unwrap().rationale,
            vec![Rationale::DataHasNulls { null_rows: 1 }]
        );
    }

    #[test]
    fn empty_tables_are_vacuous_evidence_for_cautious() {
        let snapshot = ProfileSnapshot::new(at()).with_column(column("Note", 0, 0, SamplingStrategy::FullScan));

        let set = DecisionEngine::decide(&model(), &snapshot, &TighteningOptions::new(TighteningMode::Cautious));
        assert!(!set.column(&order("Note")).unwrap().enforces_not_null());

        let set = DecisionEngine::decide(&model(), &snapshot, &TighteningOptions::new(TighteningMode::EvidenceGated));
        assert_eq!(
            set.column(&order("Note")).unwrap().rationale,
            vec![Rationale::EmptyTable, Rationale::DataNoNulls]
        );
    }

    #[test]
    fn inactive_attributes_are_explained() {
        let set = DecisionEngine::decide(&model(), &ProfileSnapshot::new(at()), &TighteningOptions::default());
        assert_eq!(set.column(&order("Legacy")).unwrap().rationale, vec![Rationale::AttributeInactive]);
    }

    #[test]
    fn duplicates_block_uniqueness_with_count() {
        let snapshot = ProfileSnapshot::new(at()).with_unique_candidate(unique(3));
        let set = DecisionEngine::decide(&model(), &snapshot, &TighteningOptions::default());

        let decision = set.index(&IndexId::new("Sales", "Order", "IX_Code")).unwrap();
        assert!(!decision.enforces_unique());
        assert!(decision.rationale.contains(&Rationale::DataHasDuplicates { duplicate_groups: 3 }));
    }

    #[test]
    fn clean_unique_candidate_is_enforced() {
        let snapshot = ProfileSnapshot::new(at()).with_unique_candidate(unique(0));
        let set = DecisionEngine::decide(&model(), &snapshot, &TighteningOptions::default());

        let decision = set.index(&IndexId::new("Sales", "Order", "IX_Code")).unwrap();
        assert!(decision.enforces_unique());
        assert_eq!(
            set.index(&IndexId::new("Sales", "Order", "IX_Note")).unwrap().rationale,
            vec![Rationale::NotUniqueCandidate]
        );
    }

    #[test]
    fn platform_auto_indexes_are_excluded_by_default() {
        let auto = IndexId::new("Sales", "Order", "OSIDX_CustomerId");

        let set = DecisionEngine::decide(&model(), &ProfileSnapshot::new(at()), &TighteningOptions::default());
        assert!(set.index(&auto).is_none());

        let included = TighteningOptions::default().with_platform_auto_indexes(true);
        let set = DecisionEngine::decide(&model(), &ProfileSnapshot::new(at()), &included);
        assert_eq!(
            set.index(&auto).unwrap().rationale,
            vec![Rationale::PlatformAutoIndexIncluded, Rationale::NotUniqueCandidate]
        );
    }

    #[test]
    fn ignored_delete_rule_never_creates() {
        let snapshot = ProfileSnapshot::new(at()).with_foreign_key(orphans("ParentId", 0));

        for mode in [TighteningMode::Cautious, TighteningMode::EvidenceGated, TighteningMode::Aggressive] {
            let options = TighteningOptions::new(mode).with_foreign_key_override("Sales.Order.ParentId", ForeignKeyOverride::Create);
            let set = DecisionEngine::decide(&model(), &snapshot, &options);
            let decision = set.relationship(&order("ParentId")).unwrap();
            assert!(!decision.creates());
            assert_eq!(decision.rationale, vec![Rationale::DeleteRuleIgnore]);
        }
    }

    #[test]
    fn orphans_suppress_unless_overridden() {
        let snapshot = ProfileSnapshot::new(at()).with_foreign_key(orphans("CustomerId", 4));

        let set = DecisionEngine::decide(&model(), &snapshot, &TighteningOptions::default());
        let decision = set.relationship(&order("CustomerId")).unwrap();
        assert!(!decision.creates());
        assert!(decision.rationale.contains(&Rationale::DataHasOrphans { orphan_rows: 4 }));

        let forced = TighteningOptions::default().with_foreign_key_override("Sales.Order.CustomerId", ForeignKeyOverride::Create);
        let set = DecisionEngine::decide(&model(), &snapshot, &forced);
        let decision = set.relationship(&order("CustomerId")).unwrap();
        assert!(decision.creates());
        assert!(decision.rationale.contains(&Rationale::OverrideForced));
        assert_eq!(decision.target, "Sales.Customer");
    }

    #[test]
    fn override_can_suppress_a_clean_relationship() {
        let snapshot = ProfileSnapshot::new(at()).with_foreign_key(orphans("CustomerId", 0));
        let options = TighteningOptions::default().with_foreign_key_override("Sales.Order.CustomerId", ForeignKeyOverride::Suppress);

        let set = DecisionEngine::decide(&model(), &snapshot, &options);
        let decision = set.relationship(&order("CustomerId")).unwrap();
        assert!(!decision.creates());
        assert!(decision.rationale.contains(&Rationale::OverrideSuppressed));
    }

    #[test]
    fn every_decision_is_explained() {
        let snapshot = ProfileSnapshot::new(at());
        for mode in [TighteningMode::Cautious, TighteningMode::EvidenceGated, TighteningMode::Aggressive] {
            let options = TighteningOptions::new(mode).with_platform_auto_indexes(true);
            let set = DecisionEngine::decide(&model(), &snapshot, &options);
            assert!(set.unexplained().is_empty());
            assert_eq!(set.columns.len(), 7);
            assert_eq!(set.indexes.len(), 3);
            assert_eq!(set.relationships.len(), 2);
        }
    }

    #[test]
    fn decisions_are_pure() {
        let snapshot = ProfileSnapshot::new(at())
            .with_column(column("Code", 10, 0, SamplingStrategy::FullScan))
            .with_unique_candidate(unique(1))
            .with_foreign_key(orphans("CustomerId", 0));
        let options = TighteningOptions::new(TighteningMode::Aggressive).with_null_budget(0.2).unwrap();

        let first = DecisionEngine::decide(&model(), &snapshot, &options);
        let second = DecisionEngine::decide(&model(), &snapshot, &options);
        assert_eq!(first, second);
        assert_eq!(serde_json::to_string(&first).unwrap(), serde_json::to_string(&second).unwrap());
    }
}
