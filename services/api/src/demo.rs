use crate::infra::{
    load_datasets, parse_school_type, parse_track, InMemorySessionRepository, OfflineNarrator,
};
use admissions_ai::config::AppConfig;
use admissions_ai::error::AppError;
use admissions_ai::workflows::catalog::domain::AdmissionTrack;
use admissions_ai::workflows::catalog::CatalogImporter;
use admissions_ai::workflows::report::format_value;
use admissions_ai::workflows::screening::{
    ReportRequest, ReportResponse, SchoolType, ScreeningDatasets, ScreeningService,
    SelectionRequest, SortCriterion, SortMetric, SortOrder, SortSpec, StudentProfile, Tier,
    TierPartition, TierSorts,
};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

/// Small admissions export used by the demo and the service tests.
pub(crate) const SAMPLE_CATALOG: &str = "대학명,전형구분,모집단위,계열,계열구분,계열상세명,2025년_모집인원,2024년_경쟁률,2024년_입결50%,2024년_입결70%,2024년_충원율(%),3개년_경쟁률_평균,3개년_충원율_평균,신설,2025년_수능최저코드\n\
성균관대학교,종합,경영학과,인문,경영·경제,경영학,30,11.2,1.42,1.48,85,10.5,80,NO,0\n\
한양대학교,종합,정책학과,인문,사회과학,행정학,18,9.4,1.55,1.62,60,9.0,55,NO,0\n\
중앙대학교,교과,경제학부,인문,경영·경제,경제학,22,6.8,1.70,1.78,120,7.1,110,NO,3\n\
경희대학교,종합,컴퓨터공학부,자연,공학,컴퓨터공학,25,14.0,1.85,1.95,45,12.6,40,NO,0\n\
한국외국어대학교,교과,영어통번역학부,인문,어문,영어학,20,7.9,1.90,2.02,95,8.3,90,NO,2\n\
건국대학교,종합,미래에너지공학과,자연,공학,에너지공학,15,10.1,2.05,2.15,35,0,0,YES,0\n\
동국대학교,논술,국어국문학과,인문,어문,국문학,9,38.5,2.20,2.28,10,35.2,12,NO,4\n\
홍익대학교,교과,전자전기공학부,자연,공학,전자공학,28,5.6,2.25,2.36,150,6.0,140,NO,3\n\
국민대학교,종합,소프트웨어학부,자연,공학,소프트웨어,24,12.3,2.35,2.44,70,11.8,65,NO,0\n\
숭실대학교,교과,경영학부,인문,경영·경제,경영학,26,6.1,2.40,2.52,110,6.4,105,NO,2\n";

#[derive(Args, Debug)]
pub(crate) struct ScreenArgs {
    /// Program catalog CSV (defaults to APP_CATALOG_PATH)
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Student's internal-grade average (1.0 to 9.0)
    #[arg(long)]
    pub(crate) score: f64,
    /// High-school type, e.g. 일반고, 외고, 과학고
    #[arg(long, default_value = "일반고", value_parser = parse_school_type)]
    pub(crate) school_type: SchoolType,
    /// Admission track to consider (repeatable: 종합, 교과, 논술)
    #[arg(long = "track", value_parser = parse_track)]
    pub(crate) tracks: Vec<AdmissionTrack>,
    /// Main category to consider (repeatable: 인문, 자연)
    #[arg(long = "category")]
    pub(crate) categories: Vec<String>,
    /// Highest acceptable minimum-test code
    #[arg(long)]
    pub(crate) max_min_test: Option<u8>,
    /// Keep women's universities in the candidate set
    #[arg(long)]
    pub(crate) include_womens_universities: bool,
    /// Multiplier for the reach boundary
    #[arg(long)]
    pub(crate) high_factor: Option<f64>,
    /// Multiplier for the safe boundary
    #[arg(long)]
    pub(crate) low_factor: Option<f64>,
    /// Sort label applied to every tier before truncation, e.g. 2024년_경쟁률
    #[arg(long)]
    pub(crate) sort: Option<String>,
    /// Print the JSON response instead of the Markdown report
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Student's internal-grade average used for the walkthrough
    #[arg(long, default_value_t = 2.0)]
    pub(crate) score: f64,
    /// High-school type used for the walkthrough
    #[arg(long, default_value = "일반고", value_parser = parse_school_type)]
    pub(crate) school_type: SchoolType,
    /// Print only the stage summaries, not the final report
    #[arg(long)]
    pub(crate) skip_report: bool,
}

impl ScreenArgs {
    fn profile(&self) -> StudentProfile {
        let mut profile = StudentProfile::new(self.score, self.school_type.clone())
            .with_tracks(self.tracks.iter().cloned())
            .with_categories(self.categories.iter().cloned());
        profile.max_min_test_code = self.max_min_test;
        profile.include_womens_universities = self.include_womens_universities;
        let high = self.high_factor.unwrap_or(profile.high_factor);
        let low = self.low_factor.unwrap_or(profile.low_factor);
        profile.with_factors(high, low)
    }

    fn sorts(&self) -> Option<TierSorts> {
        self.sort.as_ref().map(|key| {
            TierSorts::uniform(SortSpec::Keyed {
                key: key.clone(),
                option: None,
            })
        })
    }
}

pub(crate) fn run_screen(args: ScreenArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(catalog) = &args.catalog {
        config.data.catalog_path = catalog.clone();
    }

    let datasets = Arc::new(load_datasets(&config.data)?);
    let service = offline_service(datasets);

    let request = ReportRequest {
        profile: args.profile(),
        plan: None,
        sorts: args.sorts(),
        selection: None,
    };
    let response = service.report(&request)?;

    if args.json {
        match serde_json::to_string_pretty(&response) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => eprintln!("failed to render JSON response: {err}"),
        }
    } else {
        render_response(&response);
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let catalog = Arc::new(CatalogImporter::from_reader(SAMPLE_CATALOG.as_bytes())?);
    let datasets = Arc::new(ScreeningDatasets::new(catalog));
    let service = offline_service(datasets);

    println!("Admissions screening demo ({} programs)", SAMPLE_CATALOG.lines().count() - 1);

    let profile = StudentProfile::new(args.score, args.school_type);
    let session = service.start(profile)?;
    println!(
        "\nSession {} -> {}",
        session.id,
        session.pipeline.stage().label()
    );
    render_partition(session.pipeline.current_partition());

    let by_competition = SortSpec::Typed {
        criterion: SortCriterion::Metric(SortMetric::Competition2024),
        order: SortOrder::Ascending,
    };
    let session = service.shortlist(&session.id, TierSorts::uniform(by_competition))?;
    println!(
        "\nShortlisted by 2024 competition ratio -> {}",
        session.pipeline.stage().label()
    );
    render_partition(session.pipeline.current_partition());

    let session = service.select(&session.id, &SelectionRequest::default())?;
    println!("\nFinal selection -> {}", session.pipeline.stage().label());
    render_partition(session.pipeline.current_partition());

    for warning in session.pipeline.warnings() {
        println!("  ! {}: {}", warning.filter, warning.message);
    }

    if args.skip_report {
        return Ok(());
    }

    let report = service.session_report(&session.id)?;
    println!("\n{}", report.markdown);
    for warning in &report.warnings {
        eprintln!("report warning: {warning}");
    }
    Ok(())
}

fn offline_service(
    datasets: Arc<ScreeningDatasets>,
) -> ScreeningService<InMemorySessionRepository, OfflineNarrator> {
    ScreeningService::new(
        Arc::new(InMemorySessionRepository::default()),
        Arc::new(OfflineNarrator),
        datasets,
    )
}

fn render_response(response: &ReportResponse) {
    println!(
        "Stage: {} | reach {} / match {} / safe {}",
        response.stage.label(),
        response.tiers.reach.len(),
        response.tiers.matched.len(),
        response.tiers.safe.len()
    );
    for warning in &response.report.warnings {
        eprintln!("report warning: {warning}");
    }
    println!("\n{}", response.report.markdown);
}

fn render_partition(partition: &TierPartition) {
    let thresholds = &partition.thresholds;
    println!(
        "  thresholds: reach >= {:.2}, match >= {:.2}, safe {:.2}..={:.2}",
        thresholds.high, thresholds.match_lower, thresholds.safe_lower, thresholds.low
    );
    for tier in Tier::ALL {
        let programs = partition.tier(tier);
        println!("  {} ({})", tier.label(), programs.len());
        for program in programs {
            let record = &program.record;
            println!(
                "    - {} {} {} | 입결 {:.2} | 경쟁률 {}",
                record.university,
                record.track,
                record.unit,
                program.entry_score,
                format_value(record.competition.ratio.latest())
            );
        }
    }
}
