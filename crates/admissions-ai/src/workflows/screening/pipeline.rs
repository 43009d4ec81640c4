use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::info;

use super::criteria::{run_cascade, CascadePlan, FilterWarning};
use super::domain::StudentProfile;
use super::ranking::{
    order_by_prestige, sort_and_truncate, sort_by_key, SortCriterion, SortOrder, SHORTLIST_LIMIT,
};
use super::scoring::TierThresholds;
use super::tiering::{ScoredProgram, Tier, TierPartition, TieringFilter};
use crate::workflows::catalog::bands::ScoreBandTable;
use crate::workflows::catalog::domain::ProgramId;
use crate::workflows::catalog::taxonomy::CategoryTaxonomy;
use crate::workflows::catalog::ProgramCatalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Tiered,
    Filtered,
    Shortlisted,
    Finalized,
}

impl Stage {
    pub const fn label(self) -> &'static str {
        match self {
            Stage::Tiered => "1단계 탐색",
            Stage::Filtered => "2단계 탐색",
            Stage::Shortlisted => "정렬",
            Stage::Finalized => "최종 선택",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TieredStage {
    pub profile: StudentProfile,
    pub seed: Option<BTreeSet<String>>,
    pub partition: TierPartition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilteredStage {
    pub plan: CascadePlan,
    pub partition: TierPartition,
    pub warnings: Vec<FilterWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShortlistStage {
    pub sorts: TierSorts,
    pub partition: TierPartition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinalSelection {
    pub partition: TierPartition,
}

/// How one tier is ordered before truncation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortSpec {
    Typed {
        criterion: SortCriterion,
        #[serde(default)]
        order: SortOrder,
    },
    /// Label-based form; unknown labels leave the tier unchanged.
    Keyed {
        key: String,
        #[serde(default)]
        option: Option<String>,
    },
}

impl SortSpec {
    pub fn apply(&self, programs: &[ScoredProgram]) -> Vec<ScoredProgram> {
        match self {
            SortSpec::Typed { criterion, order } => sort_and_truncate(programs, *criterion, *order),
            SortSpec::Keyed { key, option } => sort_by_key(programs, key, option.as_deref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TierSorts {
    #[serde(default)]
    pub reach: Option<SortSpec>,
    #[serde(default, rename = "match")]
    pub matched: Option<SortSpec>,
    #[serde(default)]
    pub safe: Option<SortSpec>,
}

impl TierSorts {
    pub fn uniform(spec: SortSpec) -> Self {
        Self {
            reach: Some(spec.clone()),
            matched: Some(spec.clone()),
            safe: Some(spec),
        }
    }

    fn for_tier(&self, tier: Tier) -> Option<&SortSpec> {
        match tier {
            Tier::Reach => self.reach.as_ref(),
            Tier::Match => self.matched.as_ref(),
            Tier::Safe => self.safe.as_ref(),
        }
    }
}

/// Programs the consultant keeps per tier; `None` keeps the whole tier.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectionRequest {
    #[serde(default)]
    pub reach: Option<Vec<ProgramId>>,
    #[serde(default, rename = "match")]
    pub matched: Option<Vec<ProgramId>>,
    #[serde(default)]
    pub safe: Option<Vec<ProgramId>>,
}

impl SelectionRequest {
    fn for_tier(&self, tier: Tier) -> Option<&[ProgramId]> {
        match tier {
            Tier::Reach => self.reach.as_deref(),
            Tier::Match => self.matched.as_deref(),
            Tier::Safe => self.safe.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("program {id:?} is not part of the current {tier:?} tier")]
    UnknownProgram { tier: Tier, id: ProgramId },
}

/// One screening session as a chain of immutable stages.
///
/// Each transition returns a new pipeline; stages after the one being
/// replaced are dropped, so any step can be re-run from an earlier stage.
#[derive(Debug, Clone)]
pub struct ScreeningPipeline {
    catalog: Arc<ProgramCatalog>,
    tiered: Arc<TieredStage>,
    filtered: Option<Arc<FilteredStage>>,
    shortlist: Option<Arc<ShortlistStage>>,
    selection: Option<Arc<FinalSelection>>,
}

impl ScreeningPipeline {
    pub fn start(
        catalog: Arc<ProgramCatalog>,
        taxonomy: &CategoryTaxonomy,
        profile: StudentProfile,
        bands: Option<&ScoreBandTable>,
    ) -> Self {
        let thresholds = TierThresholds::for_profile(&profile);
        let seed = bands.map(|table| {
            table.seed(
                profile.school_type.band_group(),
                &[thresholds.high, thresholds.adjusted, thresholds.low],
            )
        });

        let partition = TieringFilter::new(taxonomy).partition(&catalog, &profile, seed.as_ref());

        Self {
            catalog,
            tiered: Arc::new(TieredStage {
                profile,
                seed,
                partition,
            }),
            filtered: None,
            shortlist: None,
            selection: None,
        }
    }

    /// Narrow the tiered result with the cascading criteria.
    pub fn filter(&self, plan: CascadePlan, taxonomy: &CategoryTaxonomy) -> Self {
        let outcome = run_cascade(
            &self.tiered.partition,
            &plan,
            self.catalog.capabilities(),
            taxonomy,
        );
        info!(
            remaining = outcome.partition.len(),
            warnings = outcome.warnings.len(),
            "applied criteria filters"
        );

        Self {
            catalog: Arc::clone(&self.catalog),
            tiered: Arc::clone(&self.tiered),
            filtered: Some(Arc::new(FilteredStage {
                plan,
                partition: outcome.partition,
                warnings: outcome.warnings,
            })),
            shortlist: None,
            selection: None,
        }
    }

    /// Order and truncate each tier of the filtered result (or the tiered
    /// result when no criteria were applied).
    pub fn shortlist(&self, sorts: TierSorts) -> Self {
        let source = self
            .filtered
            .as_ref()
            .map(|stage| &stage.partition)
            .unwrap_or(&self.tiered.partition);

        let partition = source.map_tiers(|tier, programs| match sorts.for_tier(tier) {
            Some(spec) => spec.apply(programs),
            None => programs.iter().take(SHORTLIST_LIMIT).cloned().collect(),
        });

        Self {
            catalog: Arc::clone(&self.catalog),
            tiered: Arc::clone(&self.tiered),
            filtered: self.filtered.clone(),
            shortlist: Some(Arc::new(ShortlistStage { sorts, partition })),
            selection: None,
        }
    }

    /// Keep the chosen programs of the latest stage, ordered by institution.
    pub fn select(&self, request: &SelectionRequest) -> Result<Self, PipelineError> {
        let source = self.pre_selection_partition();
        let mut failure = None;

        let partition = source.map_tiers(|tier, programs| {
            let chosen = match request.for_tier(tier) {
                None => programs.to_vec(),
                Some(ids) => {
                    let available: HashSet<ProgramId> =
                        programs.iter().map(|program| program.record.id).collect();
                    if let Some(unknown) = ids.iter().find(|id| !available.contains(id)) {
                        failure.get_or_insert(PipelineError::UnknownProgram { tier, id: *unknown });
                    }
                    let wanted: HashSet<ProgramId> = ids.iter().copied().collect();
                    programs
                        .iter()
                        .filter(|program| wanted.contains(&program.record.id))
                        .cloned()
                        .collect()
                }
            };
            order_by_prestige(&chosen)
        });

        if let Some(error) = failure {
            return Err(error);
        }

        Ok(Self {
            catalog: Arc::clone(&self.catalog),
            tiered: Arc::clone(&self.tiered),
            filtered: self.filtered.clone(),
            shortlist: self.shortlist.clone(),
            selection: Some(Arc::new(FinalSelection { partition })),
        })
    }

    pub fn stage(&self) -> Stage {
        if self.selection.is_some() {
            Stage::Finalized
        } else if self.shortlist.is_some() {
            Stage::Shortlisted
        } else if self.filtered.is_some() {
            Stage::Filtered
        } else {
            Stage::Tiered
        }
    }

    pub fn profile(&self) -> &StudentProfile {
        &self.tiered.profile
    }

    pub fn catalog(&self) -> &Arc<ProgramCatalog> {
        &self.catalog
    }

    pub fn tiered(&self) -> &TieredStage {
        &self.tiered
    }

    pub fn filtered(&self) -> Option<&FilteredStage> {
        self.filtered.as_deref()
    }

    pub fn shortlisted(&self) -> Option<&ShortlistStage> {
        self.shortlist.as_deref()
    }

    pub fn selection(&self) -> Option<&FinalSelection> {
        self.selection.as_deref()
    }

    /// Partition produced by the most recent stage.
    pub fn current_partition(&self) -> &TierPartition {
        self.selection
            .as_ref()
            .map(|stage| &stage.partition)
            .unwrap_or_else(|| self.pre_selection_partition())
    }

    pub fn warnings(&self) -> &[FilterWarning] {
        self.filtered
            .as_ref()
            .map(|stage| stage.warnings.as_slice())
            .unwrap_or(&[])
    }

    fn pre_selection_partition(&self) -> &TierPartition {
        if let Some(stage) = &self.shortlist {
            &stage.partition
        } else if let Some(stage) = &self.filtered {
            &stage.partition
        } else {
            &self.tiered.partition
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::catalog::domain::{AdmissionTrack, ProgramRecord, YesNo};
    use crate::workflows::catalog::schema::SchemaCapabilities;
    use crate::workflows::screening::criteria::{
        CriteriaFilter, CriterionKey, FilterCriteria, TierCriteria,
    };
    use crate::workflows::screening::domain::SchoolType;
    use crate::workflows::screening::ranking::SortMetric;

    fn catalog() -> Arc<ProgramCatalog> {
        let rows = [
            ("한양대학교", 1.40, 30.0),
            ("서울대학교", 1.42, 10.0),
            ("국민대학교", 1.45, 70.0),
            ("서강대학교", 1.12, 40.0),
            ("건국대학교", 1.90, 90.0),
        ];
        let records = rows
            .iter()
            .enumerate()
            .map(|(id, (university, entry, fill))| {
                let mut record =
                    ProgramRecord::new(id as u32, university, AdmissionTrack::SubjectGrade, "경영학과");
                record.entry.p70.0[2] = Some(*entry);
                record.fill.rate.0[2] = Some(*fill);
                record.fill.average_3y = Some(*fill);
                record.competition.rising = Some(YesNo::No);
                record
            })
            .collect();
        Arc::new(ProgramCatalog::from_records(records, SchemaCapabilities::complete()))
    }

    fn pipeline() -> ScreeningPipeline {
        let profile = StudentProfile::new(1.5, SchoolType::General).with_factors(0.7, 1.3);
        ScreeningPipeline::start(catalog(), CategoryTaxonomy::standard(), profile, None)
    }

    fn fill_plan(min: f64) -> CascadePlan {
        CascadePlan {
            filters: vec![CriteriaFilter::FillRate],
            criteria: TierCriteria::uniform(
                FilterCriteria::default()
                    .with_number(CriterionKey::FillRate, min)
                    .with_number(CriterionKey::FillRateAverage3y, min),
            ),
            ..CascadePlan::default()
        }
    }

    #[test]
    fn stages_advance_and_earlier_stages_stay_untouched() {
        let tiered = pipeline();
        assert_eq!(tiered.stage(), Stage::Tiered);
        assert_eq!(tiered.current_partition().matched.len(), 3);

        let filtered = tiered.filter(fill_plan(20.0), CategoryTaxonomy::standard());
        assert_eq!(filtered.stage(), Stage::Filtered);
        assert_eq!(filtered.current_partition().matched.len(), 2);
        assert_eq!(tiered.current_partition().matched.len(), 3);

        let shortlisted = filtered.shortlist(TierSorts::uniform(SortSpec::Typed {
            criterion: SortCriterion::Metric(SortMetric::FillRate2024),
            order: SortOrder::Descending,
        }));
        let names: Vec<&str> = shortlisted
            .current_partition()
            .matched
            .iter()
            .map(|program| program.record.university.as_str())
            .collect();
        assert_eq!(names, vec!["국민대학교", "한양대학교"]);

        let finalized = shortlisted
            .select(&SelectionRequest::default())
            .expect("selection succeeds");
        assert_eq!(finalized.stage(), Stage::Finalized);
        let names: Vec<&str> = finalized
            .current_partition()
            .matched
            .iter()
            .map(|program| program.record.university.as_str())
            .collect();
        assert_eq!(names, vec!["한양대학교", "국민대학교"]);
    }

    #[test]
    fn rerunning_an_earlier_stage_drops_later_ones() {
        let finalized = pipeline()
            .filter(fill_plan(20.0), CategoryTaxonomy::standard())
            .shortlist(TierSorts::default())
            .select(&SelectionRequest::default())
            .expect("selection succeeds");

        let refiltered = finalized.filter(fill_plan(50.0), CategoryTaxonomy::standard());
        assert_eq!(refiltered.stage(), Stage::Filtered);
        assert!(refiltered.shortlisted().is_none());
        assert_eq!(refiltered.current_partition().matched.len(), 1);
    }

    #[test]
    fn selection_rejects_programs_outside_the_tier() {
        let tiered = pipeline();
        let request = SelectionRequest {
            matched: Some(vec![ProgramId(0), ProgramId(4)]),
            ..SelectionRequest::default()
        };
        let error = tiered.select(&request).expect_err("program 4 is safe tier");
        assert_eq!(
            error,
            PipelineError::UnknownProgram {
                tier: Tier::Match,
                id: ProgramId(4)
            }
        );
    }
}
