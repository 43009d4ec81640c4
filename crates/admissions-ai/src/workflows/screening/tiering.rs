use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

use super::domain::{Gender, SchoolType, SearchScope, StudentProfile};
use super::scoring::TierThresholds;
use crate::workflows::catalog::domain::ProgramRecord;
use crate::workflows::catalog::taxonomy::CategoryTaxonomy;
use crate::workflows::catalog::ProgramCatalog;

/// Entry-score values at or below zero (including the `-9999` export
/// placeholder) mean "not published" rather than a real cutoff.
fn published(value: Option<f64>) -> Option<f64> {
    value.filter(|score| score.is_finite() && *score > 0.0)
}

/// 70th-percentile cutoff when published, otherwise the 50th-percentile one.
pub fn resolve_entry_score(record: &ProgramRecord) -> Option<f64> {
    published(record.entry.p70.latest()).or_else(|| published(record.entry.p50.latest()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Reach,
    Match,
    Safe,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Reach, Tier::Match, Tier::Safe];

    pub const fn label(self) -> &'static str {
        match self {
            Tier::Reach => "상향",
            Tier::Match => "적정",
            Tier::Safe => "안정",
        }
    }

    /// First tier whose range contains `entry_score`, checked reach → match → safe.
    pub fn classify(entry_score: f64, thresholds: &TierThresholds) -> Option<Tier> {
        if thresholds.high <= entry_score && entry_score < thresholds.match_lower {
            Some(Tier::Reach)
        } else if thresholds.match_lower <= entry_score && entry_score < thresholds.safe_lower {
            Some(Tier::Match)
        } else if thresholds.safe_lower <= entry_score && entry_score <= thresholds.low {
            Some(Tier::Safe)
        } else {
            None
        }
    }
}

/// A catalog record paired with the entry score it was tiered on.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredProgram {
    pub record: Arc<ProgramRecord>,
    pub entry_score: f64,
}

impl ScoredProgram {
    pub fn new(record: Arc<ProgramRecord>, entry_score: f64) -> Self {
        Self {
            record,
            entry_score,
        }
    }
}

/// Disjoint reach/match/safe split of the eligible programs.
#[derive(Debug, Clone, PartialEq)]
pub struct TierPartition {
    pub thresholds: TierThresholds,
    pub reach: Vec<ScoredProgram>,
    pub matched: Vec<ScoredProgram>,
    pub safe: Vec<ScoredProgram>,
}

impl TierPartition {
    pub fn empty(thresholds: TierThresholds) -> Self {
        Self {
            thresholds,
            reach: Vec::new(),
            matched: Vec::new(),
            safe: Vec::new(),
        }
    }

    pub fn tier(&self, tier: Tier) -> &[ScoredProgram] {
        match tier {
            Tier::Reach => &self.reach,
            Tier::Match => &self.matched,
            Tier::Safe => &self.safe,
        }
    }

    fn tier_mut(&mut self, tier: Tier) -> &mut Vec<ScoredProgram> {
        match tier {
            Tier::Reach => &mut self.reach,
            Tier::Match => &mut self.matched,
            Tier::Safe => &mut self.safe,
        }
    }

    pub fn len(&self) -> usize {
        self.reach.len() + self.matched.len() + self.safe.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tier, &[ScoredProgram])> {
        Tier::ALL.into_iter().map(move |tier| (tier, self.tier(tier)))
    }

    /// Apply `f` to every tier, producing a new partition with the same thresholds.
    pub fn map_tiers<F>(&self, mut f: F) -> TierPartition
    where
        F: FnMut(Tier, &[ScoredProgram]) -> Vec<ScoredProgram>,
    {
        let mut next = TierPartition::empty(self.thresholds);
        for tier in Tier::ALL {
            *next.tier_mut(tier) = f(tier, self.tier(tier));
        }
        next
    }
}

/// Splits a catalog into tiers for one student profile.
pub struct TieringFilter<'a> {
    taxonomy: &'a CategoryTaxonomy,
}

impl<'a> TieringFilter<'a> {
    pub fn new(taxonomy: &'a CategoryTaxonomy) -> Self {
        Self { taxonomy }
    }

    /// `seed` optionally restricts candidates to a set of institutions.
    pub fn partition(
        &self,
        catalog: &ProgramCatalog,
        profile: &StudentProfile,
        seed: Option<&BTreeSet<String>>,
    ) -> TierPartition {
        let thresholds = TierThresholds::for_profile(profile);
        let mut partition = TierPartition::empty(thresholds);
        let scope = ScopeMatcher::new(profile, self.taxonomy);

        let mut ineligible = 0usize;
        let mut unscored = 0usize;
        let mut out_of_range = 0usize;
        let mut above_min_test = 0usize;

        for record in catalog.records() {
            if !is_eligible(record, profile, &scope, seed) {
                ineligible += 1;
                continue;
            }

            let Some(entry_score) = resolve_entry_score(record) else {
                unscored += 1;
                continue;
            };

            let Some(tier) = Tier::classify(entry_score, &thresholds) else {
                out_of_range += 1;
                continue;
            };

            if !passes_min_test(record, profile.max_min_test_code) {
                above_min_test += 1;
                continue;
            }

            partition
                .tier_mut(tier)
                .push(ScoredProgram::new(Arc::clone(record), entry_score));
        }

        debug!(
            ineligible,
            unscored, out_of_range, above_min_test, "programs excluded from tiering"
        );
        info!(
            adjusted = thresholds.adjusted,
            reach = partition.reach.len(),
            matched = partition.matched.len(),
            safe = partition.safe.len(),
            "partitioned programs into tiers"
        );

        partition
    }
}

fn passes_min_test(record: &ProgramRecord, max_code: Option<u8>) -> bool {
    match (max_code, record.eligibility.min_test_code) {
        (Some(max), Some(code)) => code <= max,
        _ => true,
    }
}

fn is_eligible(
    record: &ProgramRecord,
    profile: &StudentProfile,
    scope: &ScopeMatcher,
    seed: Option<&BTreeSet<String>>,
) -> bool {
    if !profile.tracks.is_empty() && !profile.tracks.contains(&record.track) {
        return false;
    }
    if !scope.matches(record) {
        return false;
    }
    if profile.gender == Gender::Male && record.university.contains("여자") {
        return false;
    }
    if !profile.include_womens_universities && record.is_womens_university() {
        return false;
    }
    let school_eligible = match profile.school_type {
        SchoolType::Science => record.eligibility.science_high_school,
        SchoolType::NationalAutonomous => record.eligibility.boarding_high_school,
        SchoolType::ForeignLanguage => record.eligibility.foreign_language_high_school,
        _ => true,
    };
    if !school_eligible {
        return false;
    }
    if matches!(record.quota_current, Some(quota) if quota <= 0.0) {
        return false;
    }
    seed.map_or(true, |institutions| institutions.contains(&record.university))
}

enum ScopeMatcher {
    Any,
    Main(Vec<String>),
    Mid(Vec<String>),
    Detail(Vec<String>),
}

impl ScopeMatcher {
    fn new(profile: &StudentProfile, taxonomy: &CategoryTaxonomy) -> Self {
        let broad = || {
            let categories: Vec<String> = profile
                .categories
                .iter()
                .map(|category| category.trim().to_string())
                .filter(|category| !category.is_empty())
                .collect();
            if categories.is_empty() {
                ScopeMatcher::Any
            } else {
                ScopeMatcher::Main(categories)
            }
        };

        match profile.scope {
            SearchScope::Broad => broad(),
            SearchScope::Mid => {
                let mids: Vec<String> = profile
                    .detail_interests
                    .iter()
                    .filter_map(|detail| taxonomy.mid_category(detail))
                    .map(str::to_string)
                    .collect();
                if mids.is_empty() {
                    broad()
                } else {
                    ScopeMatcher::Mid(mids)
                }
            }
            SearchScope::Detail => {
                let needles: Vec<String> = profile
                    .detail_interests
                    .iter()
                    .map(|detail| detail.trim().to_lowercase())
                    .filter(|detail| !detail.is_empty())
                    .collect();
                if needles.is_empty() {
                    broad()
                } else {
                    ScopeMatcher::Detail(needles)
                }
            }
        }
    }

    fn matches(&self, record: &ProgramRecord) -> bool {
        match self {
            ScopeMatcher::Any => true,
            ScopeMatcher::Main(categories) => record
                .main_category
                .as_deref()
                .is_some_and(|main| categories.iter().any(|category| category == main)),
            ScopeMatcher::Mid(mids) => record
                .mid_category
                .as_deref()
                .is_some_and(|mid| mids.iter().any(|candidate| candidate == mid)),
            ScopeMatcher::Detail(needles) => {
                record.detail_category.as_deref().is_some_and(|detail| {
                    let detail = detail.to_lowercase();
                    needles.iter().any(|needle| detail.contains(needle.as_str()))
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::catalog::domain::AdmissionTrack;
    use crate::workflows::catalog::schema::SchemaCapabilities;

    fn program(id: u32, university: &str, p70: Option<f64>, p50: Option<f64>) -> ProgramRecord {
        let mut record = ProgramRecord::new(id, university, AdmissionTrack::SubjectGrade, "경영학과");
        record.main_category = Some("인문".to_string());
        record.entry.p70.0[2] = p70;
        record.entry.p50.0[2] = p50;
        record
    }

    fn profile() -> StudentProfile {
        StudentProfile::new(1.5, SchoolType::General)
            .with_factors(0.7, 1.3)
            .with_tracks([AdmissionTrack::SubjectGrade])
    }

    #[test]
    fn entry_score_prefers_p70_and_skips_placeholders() {
        assert_eq!(resolve_entry_score(&program(0, "A", Some(1.4), Some(1.2))), Some(1.4));
        assert_eq!(resolve_entry_score(&program(0, "A", Some(0.0), Some(1.2))), Some(1.2));
        assert_eq!(resolve_entry_score(&program(0, "A", Some(-9999.0), Some(1.2))), Some(1.2));
        assert_eq!(resolve_entry_score(&program(0, "A", None, Some(-9999.0))), None);
        assert_eq!(resolve_entry_score(&program(0, "A", None, None)), None);
    }

    #[test]
    fn classify_follows_half_open_ranges() {
        let thresholds = TierThresholds::for_profile(&profile());
        assert_eq!(Tier::classify(1.10, &thresholds), Some(Tier::Reach));
        assert_eq!(Tier::classify(1.40, &thresholds), Some(Tier::Match));
        assert_eq!(Tier::classify(1.90, &thresholds), Some(Tier::Safe));
        assert_eq!(Tier::classify(1.00, &thresholds), None);
        assert_eq!(Tier::classify(2.50, &thresholds), None);
        assert_eq!(Tier::classify(thresholds.low, &thresholds), Some(Tier::Safe));
        assert_eq!(
            Tier::classify(thresholds.match_lower, &thresholds),
            Some(Tier::Match)
        );
    }

    #[test]
    fn partition_drops_unscored_and_ineligible_programs() {
        let mut womens = program(3, "숙명여자대학교", Some(1.4), None);
        womens.main_category = Some("인문".to_string());
        let mut no_quota = program(4, "건국대학교", Some(1.4), None);
        no_quota.quota_current = Some(0.0);
        let mut essay = program(5, "홍익대학교", Some(1.4), None);
        essay.track = AdmissionTrack::Essay;

        let catalog = ProgramCatalog::from_records(
            vec![
                program(0, "서강대학교", Some(1.10), None),
                program(1, "한양대학교", None, Some(1.40)),
                program(2, "국민대학교", Some(0.0), None),
                womens,
                no_quota,
                essay,
            ],
            SchemaCapabilities::complete(),
        );

        let taxonomy = CategoryTaxonomy::standard();
        let partition = TieringFilter::new(taxonomy).partition(&catalog, &profile(), None);

        assert_eq!(partition.reach.len(), 1);
        assert_eq!(partition.matched.len(), 1);
        assert_eq!(partition.matched[0].entry_score, 1.40);
        assert!(partition.safe.is_empty());
    }

    #[test]
    fn unmatched_track_yields_empty_tiers() {
        let catalog = ProgramCatalog::from_records(
            vec![program(0, "서강대학교", Some(1.40), None)],
            SchemaCapabilities::complete(),
        );
        let essay_only = profile().with_tracks([AdmissionTrack::Essay]);
        let partition =
            TieringFilter::new(CategoryTaxonomy::standard()).partition(&catalog, &essay_only, None);
        assert!(partition.is_empty());
    }

    #[test]
    fn min_test_filter_keeps_programs_without_code() {
        let mut strict = program(0, "연세대학교", Some(1.40), None);
        strict.eligibility.min_test_code = Some(5);
        let mut lenient = program(1, "고려대학교", Some(1.40), None);
        lenient.eligibility.min_test_code = Some(2);
        let unknown = program(2, "성균관대학교", Some(1.40), None);

        let catalog = ProgramCatalog::from_records(
            vec![strict, lenient, unknown],
            SchemaCapabilities::complete(),
        );
        let mut student = profile();
        student.max_min_test_code = Some(3);

        let partition =
            TieringFilter::new(CategoryTaxonomy::standard()).partition(&catalog, &student, None);
        let names: Vec<&str> = partition
            .matched
            .iter()
            .map(|scored| scored.record.university.as_str())
            .collect();
        assert_eq!(names, vec!["고려대학교", "성균관대학교"]);
    }

    #[test]
    fn mid_scope_maps_detail_interests_through_taxonomy() {
        let mut economics = program(0, "서강대학교", Some(1.40), None);
        economics.mid_category = Some("상경계열".to_string());
        let mut physics = program(1, "한양대학교", Some(1.40), None);
        physics.mid_category = Some("자연계열".to_string());

        let catalog =
            ProgramCatalog::from_records(vec![economics, physics], SchemaCapabilities::complete());
        let mut student = profile();
        student.scope = SearchScope::Mid;
        student.detail_interests = vec!["경제".to_string()];

        let partition =
            TieringFilter::new(CategoryTaxonomy::standard()).partition(&catalog, &student, None);
        assert_eq!(partition.matched.len(), 1);
        assert_eq!(partition.matched[0].record.university, "서강대학교");
    }

    #[test]
    fn seed_and_school_type_restrict_candidates() {
        let mut eligible = program(0, "KAIST", Some(1.40), None);
        eligible.eligibility.science_high_school = true;
        let not_flagged = program(1, "POSTECH", Some(1.40), None);
        let catalog = ProgramCatalog::from_records(
            vec![eligible, not_flagged],
            SchemaCapabilities::complete(),
        );

        // 과학고 0.7 multiplier: raw 2.0 → adjusted 1.4
        let mut student = StudentProfile::new(2.0, SchoolType::Science)
            .with_tracks([AdmissionTrack::SubjectGrade]);
        student.categories = vec!["인문".to_string()];
        let filter = TieringFilter::new(CategoryTaxonomy::standard());

        let partition = filter.partition(&catalog, &student, None);
        assert_eq!(partition.len(), 1);

        let seed: BTreeSet<String> = ["서울대학교".to_string()].into_iter().collect();
        assert!(filter.partition(&catalog, &student, Some(&seed)).is_empty());
    }
}
