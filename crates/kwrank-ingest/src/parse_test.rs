use chrono::NaiveDate;

use super::*;

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| (*c).to_string()).collect()
}

fn header() -> Vec<String> {
    row(&[
        COL_MONTH,
        COL_COUNTRY,
        COL_GENRE,
        COL_TERM,
        COL_RANK,
        COL_POP_GENRE,
        COL_POP_OVERALL,
        COL_POP_SCALE,
    ])
}

fn preamble() -> Vec<Vec<String>> {
    vec![
        row(&["Data extract produced by 93070_144880 on 10/13/2025 17:50"]),
        row(&[]),
        row(&["Month = 2025-09"]),
        row(&[]),
        row(&["userLocale = en_US"]),
        row(&[]),
    ]
}

fn export(data: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let mut rows = preamble();
    rows.push(header());
    rows.extend(data);
    rows
}

// -----------------------------------------------------------------------
// parse_metadata
// -----------------------------------------------------------------------

#[test]
fn metadata_reads_all_preamble_fields() {
    let meta = parse_metadata(&export(vec![])).expect("metadata");
    assert_eq!(meta.external_report_id, "93070_144880");
    assert_eq!(
        meta.generated_at,
        NaiveDate::from_ymd_opt(2025, 10, 13)
            .and_then(|d| d.and_hms_opt(17, 50, 0))
            .expect("valid date")
    );
    assert_eq!(meta.data_month, "2025-09");
    assert_eq!(meta.user_locale, "en_US");
    assert_eq!(meta.month_locale_key(), "2025-09_en_US");
}

#[test]
fn metadata_does_not_depend_on_row_positions() {
    let rows = vec![
        row(&["userLocale = fr_FR"]),
        row(&["Month = 2025-08"]),
        row(&["", "Data extract produced by abc on 1/2/2025 9:05"]),
        header(),
    ];
    let meta = parse_metadata(&rows).expect("metadata");
    assert_eq!(meta.external_report_id, "abc");
    assert_eq!(meta.data_month, "2025-08");
    assert_eq!(meta.user_locale, "fr_FR");
}

#[test]
fn metadata_missing_locale_is_an_error() {
    let rows = vec![
        row(&["Data extract produced by 1 on 10/13/2025 17:50"]),
        row(&["Month = 2025-09"]),
        header(),
    ];
    let err = parse_metadata(&rows).expect_err("should fail");
    assert!(matches!(err, IngestError::Metadata(msg) if msg.contains("userLocale")));
}

#[test]
fn metadata_invalid_timestamp_is_an_error() {
    let rows = vec![
        row(&["Data extract produced by 1 on 13/45/2025 17:50"]),
        row(&["Month = 2025-09"]),
        row(&["userLocale = en_US"]),
        header(),
    ];
    let err = parse_metadata(&rows).expect_err("should fail");
    assert!(matches!(err, IngestError::Metadata(msg) if msg.contains("timestamp")));
}

#[test]
fn metadata_is_not_read_from_data_rows() {
    let rows = vec![
        row(&["Data extract produced by 1 on 10/13/2025 17:50"]),
        header(),
        row(&["Month = 2025-09"]),
        row(&["userLocale = en_US"]),
    ];
    assert!(parse_metadata(&rows).is_err());
}

// -----------------------------------------------------------------------
// parse_keywords
// -----------------------------------------------------------------------

#[test]
fn keywords_are_scored_and_filtered_by_country() {
    let rows = export(vec![
        row(&["2025-09", "United States", "Games", "puzzle", "5", "80", "90", "5"]),
        row(&["2025-09", "Canada", "Games", "hockey", "1", "90", "95", "5"]),
        row(&["2025-09", "United States", "Games", "chess", "30", "55", "65", "3"]),
    ]);

    let parsed = parse_keywords(&rows, Some("United States")).expect("parse");
    assert_eq!(parsed.rows_read, 3);
    assert_eq!(parsed.rows_skipped, 1);
    assert_eq!(parsed.keywords.len(), 2);

    let puzzle = &parsed.keywords[0];
    assert_eq!(puzzle.search_term, "puzzle");
    assert_eq!(puzzle.total_score, 11);
    let chess = &parsed.keywords[1];
    assert_eq!((chess.score_rank, chess.score_genre, chess.score_overall), (1, 1, 3));
}

#[test]
fn no_filter_keeps_every_country() {
    let rows = export(vec![
        row(&["2025-09", "United States", "Games", "puzzle", "5", "80", "90", "5"]),
        row(&["2025-09", "Canada", "Games", "hockey", "1", "90", "95", "5"]),
    ]);
    let parsed = parse_keywords(&rows, None).expect("parse");
    assert_eq!(parsed.keywords.len(), 2);
    assert_eq!(parsed.rows_skipped, 0);
}

#[test]
fn filter_excluding_everything_yields_no_keywords() {
    let rows = export(vec![row(&[
        "2025-09", "Canada", "Games", "hockey", "1", "90", "95", "5",
    ])]);
    let parsed = parse_keywords(&rows, Some("United States")).expect("parse");
    assert!(parsed.keywords.is_empty());
    assert_eq!(parsed.rows_skipped, 1);
}

#[test]
fn empty_search_terms_are_skipped() {
    let rows = export(vec![
        row(&["2025-09", "United States", "Games", "", "5", "80", "90", "5"]),
        row(&[]),
    ]);
    let parsed = parse_keywords(&rows, None).expect("parse");
    assert!(parsed.keywords.is_empty());
    assert_eq!(parsed.rows_skipped, 2);
}

#[test]
fn blank_genre_or_country_rows_are_kept() {
    let rows = export(vec![
        row(&["2025-09", "United States", "", "puzzle", "5", "80", "90", "5"]),
        row(&["2025-09", "", "Games", "chess", "30", "55", "65", "5"]),
    ]);
    let parsed = parse_keywords(&rows, None).expect("parse");
    assert_eq!(parsed.rows_skipped, 0);
    assert_eq!(parsed.keywords.len(), 2);
    assert_eq!(parsed.keywords[0].genre, "");
    assert_eq!(parsed.keywords[1].country, "");
}

#[test]
fn missing_or_invalid_numbers_use_defaults() {
    let rows = export(vec![
        row(&["2025-09", "United States", "Games", "blank", "", "", "", ""]),
        row(&["2025-09", "United States", "Games", "junk", "n/a", "high", "9.5", "x"]),
        row(&["2025-09", "United States", "Games", "short"]),
    ]);
    let parsed = parse_keywords(&rows, None).expect("parse");
    assert_eq!(parsed.keywords.len(), 3);
    for kw in &parsed.keywords {
        assert_eq!(kw.rank_in_genre, UNRANKED, "{}", kw.search_term);
        assert_eq!(kw.popularity_genre, 0);
        assert_eq!(kw.popularity_overall, 0);
        assert_eq!(kw.popularity_scale, 0);
        assert_eq!(kw.total_score, 0);
    }
}

#[test]
fn integral_floats_are_accepted() {
    let rows = export(vec![row(&[
        "2025-09",
        "United States",
        "Games",
        "puzzle",
        "12.0",
        "70.0",
        "88",
        "4.0",
    ])]);
    let parsed = parse_keywords(&rows, None).expect("parse");
    let kw = &parsed.keywords[0];
    assert_eq!(kw.rank_in_genre, 12);
    assert_eq!(kw.popularity_genre, 70);
    assert_eq!(kw.popularity_scale, 4);
    assert_eq!(kw.total_score, 2 + 2 + 5);
}

#[test]
fn missing_header_is_a_schema_error() {
    let err = parse_keywords(&preamble(), None).expect_err("should fail");
    assert!(matches!(err, IngestError::Schema(_)));
}

#[test]
fn missing_required_column_is_a_schema_error() {
    let mut rows = preamble();
    rows.push(row(&[COL_MONTH, COL_COUNTRY, COL_GENRE, COL_TERM, COL_RANK]));
    let err = parse_keywords(&rows, None).expect_err("should fail");
    assert!(
        matches!(err, IngestError::Schema(msg) if msg.contains(COL_POP_GENRE)),
        "error should name the missing column"
    );
}

#[test]
fn columns_are_resolved_by_name_not_position() {
    let mut rows = preamble();
    rows.push(row(&[
        COL_MONTH,
        COL_TERM,
        COL_POP_SCALE,
        COL_GENRE,
        COL_POP_OVERALL,
        COL_RANK,
        COL_COUNTRY,
        COL_POP_GENRE,
        "Extra",
    ]));
    rows.push(row(&[
        "2025-09", "puzzle", "5", "Games", "90", "5", "United States", "80", "ignored",
    ]));
    let parsed = parse_keywords(&rows, Some("United States")).expect("parse");
    let kw = &parsed.keywords[0];
    assert_eq!(kw.search_term, "puzzle");
    assert_eq!(kw.genre, "Games");
    assert_eq!(kw.total_score, 11);
}

// -----------------------------------------------------------------------
// parse_metric
// -----------------------------------------------------------------------

#[test]
fn metric_parsing() {
    assert_eq!(parse_metric("42"), Some(42));
    assert_eq!(parse_metric(" 7 "), Some(7));
    assert_eq!(parse_metric("3.0"), Some(3));
    assert_eq!(parse_metric("3.5"), None);
    assert_eq!(parse_metric(""), None);
    assert_eq!(parse_metric("NaN"), None);
    assert_eq!(parse_metric("abc"), None);
}
