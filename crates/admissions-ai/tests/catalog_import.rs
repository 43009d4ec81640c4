use std::sync::Arc;

use admissions_ai::workflows::catalog::domain::{AdmissionTrack, YesNo};
use admissions_ai::workflows::catalog::schema::Column;
use admissions_ai::workflows::catalog::taxonomy::CategoryTaxonomy;
use admissions_ai::workflows::catalog::{CatalogCache, CatalogImportError, CatalogImporter};

#[test]
fn importer_reads_english_aliases_and_records_capabilities() {
    let csv = "university,admission_track,unit,main_category,entry_score_70_2024,fill_rate_2024,fill_rate_average_3y,newly_established\n\
Sogang University,subject_grade,Computer Science,자연,1.8,45%,40,yes\n\
Sogang University,essay,Economics,인문,-,,,\n";

    let catalog = CatalogImporter::from_reader(csv.as_bytes()).expect("catalog imports");

    assert_eq!(catalog.len(), 2);
    let first = &catalog.records()[0];
    assert_eq!(first.track, AdmissionTrack::SubjectGrade);
    assert_eq!(first.entry.p70.latest(), Some(1.8));
    assert_eq!(first.fill.rate.latest(), Some(45.0));
    assert_eq!(first.eligibility.newly_established, Some(YesNo::Yes));

    let second = &catalog.records()[1];
    assert_eq!(second.entry.p70.latest(), None);
    assert_eq!(second.eligibility.newly_established, None);

    let capabilities = catalog.capabilities();
    assert!(capabilities.has(Column::FillRateAverage3y));
    assert!(!capabilities.has(Column::CompetitionIntensity));
}

#[test]
fn importer_requires_identity_columns() {
    let csv = "대학명,모집단위\n한양대학교,기계공학부\n";

    match CatalogImporter::from_reader(csv.as_bytes()) {
        Err(CatalogImportError::MissingColumn(Column::AdmissionTrack)) => {}
        other => panic!("expected missing admission track column, got {other:?}"),
    }
}

#[test]
fn cache_returns_same_snapshot_for_identical_bytes() {
    let cache = CatalogCache::new();
    let csv = "대학명,전형구분,모집단위\n한양대학교,교과,기계공학부\n";

    let first = cache.load_bytes(csv.as_bytes()).expect("first load");
    let second = cache.load_bytes(csv.as_bytes()).expect("cached load");
    let changed = cache
        .load_bytes(format!("{csv}건국대학교,종합,화학과\n").as_bytes())
        .expect("changed load");

    assert!(Arc::ptr_eq(&first, &second));
    assert!(!Arc::ptr_eq(&first, &changed));
    assert_eq!(cache.len(), 1);

    let again = cache.load_bytes(csv.as_bytes()).expect("reload after eviction");
    assert!(!Arc::ptr_eq(&first, &again));
    assert_eq!(again.fingerprint(), first.fingerprint());
}

#[test]
fn taxonomy_loads_from_csv_pairs() {
    let detail = "계열상세명,계열구분\n기계공학,기계\n경영학,경영·경제\n";
    let mid = "계열구분,계열\n기계,공학\n경영·경제,사회\n";

    let taxonomy =
        CategoryTaxonomy::from_readers(detail.as_bytes(), mid.as_bytes()).expect("taxonomy loads");

    assert_eq!(taxonomy.mid_category("기계공학"), Some("기계"));
    assert_eq!(taxonomy.main_category_of_detail("경영학"), Some("사회"));
    assert_eq!(taxonomy.mid_category("천문학"), None);
}
