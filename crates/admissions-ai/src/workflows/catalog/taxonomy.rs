use super::normalizer::normalize_text;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

static STANDARD_TAXONOMY: OnceLock<CategoryTaxonomy> = OnceLock::new();

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("failed to read category table: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid category table: {0}")]
    Csv(#[from] csv::Error),
}

/// Three-level major taxonomy: detail category → mid category → main category.
///
/// Lookups are total over the loaded table and return `None` for anything
/// else. A taxonomy is read once and shared read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTaxonomy {
    detail_to_mid: HashMap<String, String>,
    mid_to_main: HashMap<String, String>,
}

impl CategoryTaxonomy {
    pub fn standard() -> &'static CategoryTaxonomy {
        STANDARD_TAXONOMY.get_or_init(|| {
            const DETAIL_TO_MID: &[(&str, &str)] = &[
                // 인문·사회
                ("경영", "상경계열"),
                ("경제", "상경계열"),
                ("무역", "상경계열"),
                ("국제", "상경계열"),
                ("데이터", "상경계열"),
                ("행정", "사회계열"),
                ("정치외교", "사회계열"),
                ("심리", "사회계열"),
                ("사회학", "사회계열"),
                ("사회복지", "사회계열"),
                ("법학", "사회계열"),
                ("국어국문", "인문계열"),
                ("영어영문", "인문계열"),
                ("독일독어", "인문계열"),
                ("중국어", "인문계열"),
                ("일본어", "인문계열"),
                ("스페인어", "인문계열"),
                ("프랑스어", "인문계열"),
                ("기타언어", "인문계열"),
                ("언어학", "인문계열"),
                ("철학", "인문계열"),
                ("역사(사학)", "인문계열"),
                ("지리", "인문계열"),
                ("언론미디어", "인문계열"),
                ("종교", "인문계열"),
                ("AI(인문)", "인문계열"),
                ("디자인", "인문계열"),
                ("첨단", "인문계열"),
                ("스포츠", "인문계열"),
                ("자유전공", "인문계열"),
                ("아동유아", "교육계열"),
                ("교육", "교육계열"),
                // 자연·공학
                ("보건", "보건계열"),
                ("간호", "보건계열"),
                ("헬스케어", "보건계열"),
                ("물리", "자연계열"),
                ("수학", "자연계열"),
                ("식품", "자연계열"),
                ("에너지", "자연계열"),
                ("화학", "자연계열"),
                ("생활과학", "자연계열"),
                ("지구과학", "자연계열"),
                ("통계", "자연계열"),
                ("생명", "공학(생명)계열"),
                ("화생공", "공학(화공신소재)계열"),
                ("건축", "공학(건축환경)계열"),
                ("건설", "공학(건축환경)계열"),
                ("환경", "공학(건축환경)계열"),
                ("산업공학", "공학(기계전기전자)계열"),
                ("전기전자", "공학(기계전기전자)계열"),
                ("기계", "공학(기계전기전자)계열"),
                ("반도체", "공학(기계전기전자)계열"),
                ("컴공", "공학(IT컴퓨터)계열"),
                ("스마트팜", "공학(IT컴퓨터)계열"),
                // 의약
                ("의학", "의약계열"),
                ("치대", "의약계열"),
                ("한의예", "의약계열"),
                ("약학", "의약계열"),
                ("수의학", "의약계열"),
                ("신약개발", "의약계열"),
            ];

            const MID_TO_MAIN: &[(&str, &str)] = &[
                ("상경계열", "인문"),
                ("사회계열", "인문"),
                ("인문계열", "인문"),
                ("교육계열", "인문"),
                ("보건계열", "자연"),
                ("자연계열", "자연"),
                ("공학(생명)계열", "자연"),
                ("공학(화공신소재)계열", "자연"),
                ("공학(기계전기전자)계열", "자연"),
                ("공학(건축환경)계열", "자연"),
                ("공학(IT컴퓨터)계열", "자연"),
                ("의약계열", "자연"),
            ];

            CategoryTaxonomy::from_pairs(
                DETAIL_TO_MID.iter().copied(),
                MID_TO_MAIN.iter().copied(),
            )
        })
    }

    pub fn from_pairs<'a, D, M>(detail_to_mid: D, mid_to_main: M) -> Self
    where
        D: IntoIterator<Item = (&'a str, &'a str)>,
        M: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self {
            detail_to_mid: collect_pairs(detail_to_mid),
            mid_to_main: collect_pairs(mid_to_main),
        }
    }

    pub fn from_paths<P: AsRef<Path>>(
        detail_to_mid: P,
        mid_to_main: P,
    ) -> Result<Self, TaxonomyError> {
        let detail = std::fs::File::open(detail_to_mid)?;
        let mid = std::fs::File::open(mid_to_main)?;
        Self::from_readers(detail, mid)
    }

    /// Load from two CSV tables with a header row: `detail,mid` and `mid,main`.
    pub fn from_readers<D: Read, M: Read>(
        detail_to_mid: D,
        mid_to_main: M,
    ) -> Result<Self, TaxonomyError> {
        Ok(Self {
            detail_to_mid: read_pairs(detail_to_mid)?,
            mid_to_main: read_pairs(mid_to_main)?,
        })
    }

    pub fn mid_category(&self, detail: &str) -> Option<&str> {
        self.detail_to_mid
            .get(&normalize_text(detail))
            .map(String::as_str)
    }

    pub fn main_category(&self, mid: &str) -> Option<&str> {
        self.mid_to_main.get(&normalize_text(mid)).map(String::as_str)
    }

    /// Main category for a detail interest, going through the mid level.
    pub fn main_category_of_detail(&self, detail: &str) -> Option<&str> {
        self.mid_category(detail)
            .and_then(|mid| self.main_category(mid))
    }

    /// Every detail category that shares a mid category with a detail
    /// containing one of `keywords`.
    pub fn related_details<S: AsRef<str>>(&self, keywords: &[S]) -> BTreeSet<&str> {
        let keywords: Vec<String> = keywords
            .iter()
            .map(|keyword| normalize_text(keyword.as_ref()))
            .filter(|keyword| !keyword.is_empty())
            .collect();
        let mids: HashSet<&str> = self
            .detail_to_mid
            .iter()
            .filter(|(detail, _)| {
                keywords
                    .iter()
                    .any(|keyword| detail.contains(keyword.as_str()))
            })
            .map(|(_, mid)| mid.as_str())
            .collect();
        self.detail_to_mid
            .iter()
            .filter(|(_, mid)| mids.contains(mid.as_str()))
            .map(|(detail, _)| detail.as_str())
            .collect()
    }
}

fn collect_pairs<'a, I>(pairs: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(from, to)| (normalize_text(from), normalize_text(to)))
        .collect()
}

fn read_pairs<R: Read>(reader: R) -> Result<HashMap<String, String>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut pairs = HashMap::new();
    for record in csv_reader.records() {
        let record = record?;
        match (record.get(0), record.get(1)) {
            (Some(from), Some(to)) if !from.is_empty() && !to.is_empty() => {
                pairs.insert(normalize_text(from), normalize_text(to));
            }
            _ => continue,
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn standard_table_maps_through_both_levels() {
        let taxonomy = CategoryTaxonomy::standard();
        assert_eq!(taxonomy.mid_category("경영"), Some("상경계열"));
        assert_eq!(taxonomy.main_category("상경계열"), Some("인문"));
        assert_eq!(taxonomy.mid_category("컴공"), Some("공학(IT컴퓨터)계열"));
        assert_eq!(taxonomy.main_category_of_detail("컴공"), Some("자연"));
    }

    #[test]
    fn unknown_keys_yield_none() {
        let taxonomy = CategoryTaxonomy::standard();
        assert_eq!(taxonomy.mid_category("천문우주"), None);
        assert_eq!(taxonomy.main_category("예체능계열"), None);
        assert_eq!(taxonomy.main_category_of_detail(""), None);
    }

    #[test]
    fn related_details_expand_to_the_whole_mid_category() {
        let taxonomy = CategoryTaxonomy::standard();
        let related = taxonomy.related_details(&["경영"]);
        assert!(related.contains("경제"));
        assert!(related.contains("무역"));
        assert!(!related.contains("행정"));

        let both = taxonomy.related_details(&["컴", " 기계 "]);
        assert!(both.contains("스마트팜"));
        assert!(both.contains("반도체"));
        assert!(taxonomy.related_details(&["천문"]).is_empty());
        assert!(taxonomy.related_details::<&str>(&[]).is_empty());
    }

    #[test]
    fn csv_tables_skip_incomplete_rows() {
        let detail = "detail,mid\n경영,상경계열\n물리,\n";
        let mid = "mid,main\n상경계열,인문\n";
        let taxonomy =
            CategoryTaxonomy::from_readers(Cursor::new(detail), Cursor::new(mid)).expect("loads");
        assert_eq!(taxonomy.mid_category(" 경영 "), Some("상경계열"));
        assert_eq!(taxonomy.mid_category("물리"), None);
        assert_eq!(taxonomy.main_category_of_detail("경영"), Some("인문"));
    }
}
