//! End-to-end scenarios exercising the reader facade and serializer
//! together, beyond the per-module unit tests.

use csv_engine::{Configuration, Facade, InjectionOptions, Mode, Serializer, SliceCharSource, Trim};

fn rows(input: &'static str, config: Configuration) -> Vec<Vec<String>> {
    let mut f = Facade::new(SliceCharSource::new(input), config);
    let mut out = Vec::new();
    while f.read().unwrap() {
        let mut row = Vec::new();
        for i in 0..f.count() {
            row.push(f.field(i).unwrap().to_string());
        }
        out.push(row);
    }
    out
}

#[test]
fn simple_rows_with_crlf_and_lf() {
    let config = Configuration::builder().build().unwrap();
    let got = rows("a,b,c\r\n1,2,3\n", config);
    assert_eq!(got, vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]);
}

#[test]
fn quoted_fields_with_embedded_newline_count_one_logical_row() {
    let config = Configuration::builder().build().unwrap();
    let mut f = Facade::new(SliceCharSource::new("\"a,b\",\"c\"\"d\",\"e\nf\"\n"), config);
    assert!(f.read().unwrap());
    assert_eq!(f.field(0).unwrap(), "a,b");
    assert_eq!(f.field(1).unwrap(), "c\"d");
    assert_eq!(f.field(2).unwrap(), "e\nf");
    assert_eq!(f.position().row, 1);
    assert_eq!(f.position().raw_row, 2);
}

#[test]
fn comment_lines_are_skipped() {
    let config = Configuration::builder().allow_comments(true).comment('#').build().unwrap();
    let got = rows("#comment\r\na,b\r\n", config);
    assert_eq!(got, vec![vec!["a", "b"]]);
}

#[test]
fn trim_inside_and_outside_quotes() {
    let config = Configuration::builder().trim(Trim::TRIM | Trim::INSIDE_QUOTES).build().unwrap();
    let got = rows("  \"a\"  ,b", config);
    assert_eq!(got, vec![vec!["a", "b"]]);
}

#[test]
fn semicolon_delimiter_is_auto_detected() {
    let config = Configuration::builder()
        .detect_delimiter(true)
        .detect_delimiter_candidates(vec![",".into(), ";".into(), "\t".into()])
        .build()
        .unwrap();
    let got = rows("h1;h2;h3\n1;2;3\n", config);
    assert_eq!(got, vec![vec!["h1", "h2", "h3"], vec!["1", "2", "3"]]);
}

#[test]
fn header_and_named_field_access() {
    let config = Configuration::builder().build().unwrap();
    let mut f = Facade::new(SliceCharSource::new("name,age\nalice,30\nbob,40\n"), config);
    assert!(f.read_header().unwrap());
    assert!(f.read().unwrap());
    assert_eq!(f.field_by_name("name", 0).unwrap(), "alice");
    assert!(f.read().unwrap());
    assert_eq!(f.field_by_name("age", 0).unwrap(), "40");
}

#[test]
fn serializer_round_trips_through_the_reader() {
    let write_config = Configuration::builder().build().unwrap();
    let mut w = Serializer::new(Vec::new(), write_config);
    w.write_field("a,b").unwrap();
    w.write_field("c\"d").unwrap();
    w.write_field("plain").unwrap();
    w.next_record().unwrap();
    let encoded = String::from_utf8(w.into_inner().unwrap()).unwrap();
    assert_eq!(encoded, "\"a,b\",\"c\"\"d\",plain\n");

    let read_config = Configuration::builder().build().unwrap();
    let got = rows(Box::leak(encoded.into_boxed_str()), read_config);
    assert_eq!(got, vec![vec!["a,b", "c\"d", "plain"]]);
}

#[test]
fn escape_mode_serializer_round_trips_through_the_reader() {
    let write_config = Configuration::builder().mode(Mode::Escape).escape('\\').build().unwrap();
    let mut w = Serializer::new(Vec::new(), write_config);
    w.write_field("a,b").unwrap();
    w.write_field("c").unwrap();
    w.next_record().unwrap();
    let encoded = String::from_utf8(w.into_inner().unwrap()).unwrap();

    let read_config = Configuration::builder().mode(Mode::Escape).escape('\\').build().unwrap();
    let got = rows(Box::leak(encoded.into_boxed_str()), read_config);
    assert_eq!(got, vec![vec!["a,b", "c"]]);
}

#[test]
fn injection_escape_prevents_formula_prefix_surviving_a_round_trip() {
    let write_config =
        Configuration::builder().injection_options(InjectionOptions::Escape).build().unwrap();
    let mut w = Serializer::new(Vec::new(), write_config);
    w.write_field("=SUM(A1)").unwrap();
    w.next_record().unwrap();
    let encoded = String::from_utf8(w.into_inner().unwrap()).unwrap();
    assert_eq!(encoded, "\"'=SUM(A1)\"\n");

    let read_config = Configuration::builder().build().unwrap();
    let got = rows(Box::leak(encoded.into_boxed_str()), read_config);
    assert_eq!(got, vec![vec!["'=SUM(A1)"]]);
}
