pub mod common;

use std::{
    error::Error,
    fs::{self, File},
    io::Cursor,
};

use common::MockSource;
use csv_codec::{
    core::{
        dialect::{Dialect, DialectBuilder, LineBreak, QuotePolicy},
        item::{Record, Value},
    },
    error::CsvResult,
    item::csv::{
        csv_reader::CsvRecordReaderBuilder,
        csv_writer::{Alignment, ColumnLayout, CsvRecordWriterBuilder},
    },
};
use rand::distr::{Alphanumeric, SampleString};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn write_records(
    dialect: Dialect,
    policy: QuotePolicy,
    records: &[Vec<Value>],
) -> CsvResult<Vec<u8>> {
    let writer = CsvRecordWriterBuilder::new()
        .dialect(dialect)
        .quote_policy(policy)
        .from_writer(vec![])?;
    writer.write_all(records)?;
    writer.into_inner()
}

fn read_records(dialect: Dialect, data: &[u8]) -> CsvResult<Vec<Record>> {
    CsvRecordReaderBuilder::new()
        .dialect(dialect)
        .from_reader(data)?
        .read_all()
}

/// What a value reads back as: nulls come back as empty strings.
fn expected(records: &[Vec<Value>]) -> Vec<Record> {
    records
        .iter()
        .map(|record| {
            record
                .iter()
                .map(|value| Some(value.as_str().to_string()))
                .collect()
        })
        .collect()
}

/// A random value sprinkled with separators, quotes and linebreaks.
fn random_value() -> Value {
    let value: String = Alphanumeric
        .sample_string(&mut rand::rng(), 12)
        .chars()
        .map(|c| match c {
            'a' => ',',
            'b' => '"',
            'c' => '\n',
            'd' => ' ',
            other => other,
        })
        .collect();
    Value::from(value)
}

#[test]
fn random_records_should_survive_a_round_trip() -> Result<(), Box<dyn Error>> {
    init_logger();

    let records: Vec<Vec<Value>> = (0..50)
        .map(|index| {
            let mut record: Vec<Value> = (0..4).map(|_| random_value()).collect();
            if index % 7 == 0 {
                record[index % 4] = Value::Null;
            }
            record
        })
        .collect();

    let data = write_records(Dialect::default(), QuotePolicy::IfNeeded, &records)?;
    let read = read_records(Dialect::default(), &data)?;

    assert_eq!(read, expected(&records));
    Ok(())
}

#[test]
fn two_readers_should_agree() -> Result<(), Box<dyn Error>> {
    let data = "id,comment\n1,\"multi\nline\"\n2,\"with \"\"quotes\"\"\"\n\n3,plain\r\n";

    let first = read_records(Dialect::default(), data.as_bytes())?;
    let second = read_records(Dialect::default(), data.as_bytes())?;

    assert_eq!(first.len(), 4);
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn every_quote_policy_should_read_back() -> Result<(), Box<dyn Error>> {
    let special = vec![vec![
        Value::from(""),
        Value::from("alnum42"),
        Value::from("a,b"),
        Value::from("say \"hi\""),
        Value::from("l1\nl2"),
        Value::Null,
        Value::from(3.5),
    ]];
    let plain = vec![vec![
        Value::from(""),
        Value::from("alnum42"),
        Value::Null,
        Value::from(7),
        Value::from(true),
    ]];

    for policy in [
        QuotePolicy::Always,
        QuotePolicy::StringsOnly,
        QuotePolicy::IfNeeded,
    ] {
        let data = write_records(Dialect::default(), policy, &special)?;
        assert_eq!(
            read_records(Dialect::default(), &data)?,
            expected(&special),
            "policy {policy:?}"
        );
    }

    for policy in [
        QuotePolicy::Always,
        QuotePolicy::StringsOnly,
        QuotePolicy::IfNeeded,
        QuotePolicy::Never,
    ] {
        let data = write_records(Dialect::default(), policy, &plain)?;
        assert_eq!(
            read_records(Dialect::default(), &data)?,
            expected(&plain),
            "policy {policy:?}"
        );
    }
    Ok(())
}

#[test]
fn custom_dialect_should_read_back() -> Result<(), Box<dyn Error>> {
    let dialect = DialectBuilder::new()
        .separator('\t')
        .quote(Some('\''))
        .escape(Some('\\'))
        .build()?;
    let records = vec![
        vec![Value::from("it's"), Value::from("back\\slash"), Value::from("tab\there")],
        vec![Value::from("'quoted'"), Value::from(""), Value::from("x\ny")],
    ];

    let data = write_records(dialect.clone(), QuotePolicy::IfNeeded, &records)?;
    assert_eq!(read_records(dialect, &data)?, expected(&records));
    Ok(())
}

#[test]
fn lone_empty_records_should_not_vanish() -> Result<(), Box<dyn Error>> {
    let records = vec![
        vec![Value::from("first")],
        vec![Value::Null],
        vec![Value::from("")],
        vec![Value::from("last")],
    ];

    let data = write_records(Dialect::default(), QuotePolicy::IfNeeded, &records)?;
    assert_eq!(read_records(Dialect::default(), &data)?, expected(&records));
    Ok(())
}

#[test]
fn should_match_the_csv_crate() -> Result<(), Box<dyn Error>> {
    let inputs = [
        ("a,b,c\n1,2,3\n", b','),
        ("a,b,\n\"x,y\",\"say \"\"hi\"\"\",z\n", b','),
        ("name;value\r\n\"semi;colon\";1\r\nplain;\"\"\r\n", b';'),
        ("h1,h2\n\"multi\nline\",v\n\nlast,row", b','),
    ];

    for (input, delimiter) in inputs {
        let mut oracle = csv_oracle::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .from_reader(input.as_bytes());
        let oracle_records = oracle
            .records()
            .map(|record| record.map(|record| record.iter().map(String::from).collect::<Vec<_>>()))
            .collect::<Result<Vec<_>, _>>()?;

        let records: Vec<Vec<String>> = CsvRecordReaderBuilder::new()
            .separator(delimiter as char)
            .from_reader(input.as_bytes())?
            .read_all()?
            .into_iter()
            .map(|record| record.into_iter().map(Option::unwrap_or_default).collect())
            .collect();

        assert_eq!(records, oracle_records, "input {input:?}");
    }
    Ok(())
}

#[test]
fn csv_crate_should_read_what_we_write() -> Result<(), Box<dyn Error>> {
    let records = vec![
        vec![Value::from("id"), Value::from("description")],
        vec![Value::from(1), Value::from("comma, \"quote\"\nand linebreak")],
        vec![Value::from(2), Value::Null],
    ];
    let data = write_records(Dialect::default(), QuotePolicy::IfNeeded, &records)?;

    let mut oracle = csv_oracle::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(data.as_slice());
    let oracle_records = oracle
        .records()
        .map(|record| {
            record.map(|record| record.iter().map(|s| Some(s.to_string())).collect::<Record>())
        })
        .collect::<Result<Vec<Record>, _>>()?;

    assert_eq!(oracle_records, expected(&records));
    Ok(())
}

#[test]
fn fill_missing_columns_should_pad_with_nulls() -> Result<(), Box<dyn Error>> {
    let dialect = DialectBuilder::new().fill_missing_columns(true).build()?;
    let records = read_records(dialect, b"c1,c2,c3\nv1,v2\n")?;

    assert_eq!(
        records[1],
        vec![Some("v1".to_string()), Some("v2".to_string()), None]
    );
    Ok(())
}

#[test]
fn utf8_bom_should_be_transparent() -> Result<(), Box<dyn Error>> {
    let with_bom = read_records(Dialect::default(), b"\xEF\xBB\xBFa,b\nc,d\n")?;
    let without_bom = read_records(Dialect::default(), b"a,b\nc,d\n")?;

    assert_eq!(with_bom, without_bom);
    assert_eq!(with_bom[0][0].as_deref(), Some("a"));
    Ok(())
}

#[test]
fn utf16_with_bom_should_read_back() -> Result<(), Box<dyn Error>> {
    for encoding in [encoding_rs::UTF_16LE, encoding_rs::UTF_16BE] {
        let dialect = DialectBuilder::new().encoding(encoding).build()?;
        let writer = CsvRecordWriterBuilder::new()
            .dialect(dialect.clone())
            .write_bom(true)
            .from_writer(vec![])?;
        writer.write(&[Value::from("größe"), Value::from("日本")])?;
        let data = writer.into_inner()?;

        let records = read_records(dialect, &data)?;
        assert_eq!(
            records,
            vec![vec![Some("größe".to_string()), Some("日本".to_string())]]
        );
    }
    Ok(())
}

#[test]
fn latin1_should_read_back() -> Result<(), Box<dyn Error>> {
    let dialect = DialectBuilder::new().encoding_label("ISO-8859-1").build()?;
    let records = vec![vec![Value::from("café"), Value::from("naïve")]];

    let data = write_records(dialect.clone(), QuotePolicy::IfNeeded, &records)?;
    assert_eq!(data, b"caf\xE9,na\xEFve\n");
    assert_eq!(read_records(dialect, &data)?, expected(&records));
    Ok(())
}

#[test]
fn latin1_text_looking_like_a_bom_should_read_back() -> Result<(), Box<dyn Error>> {
    let dialect = DialectBuilder::new().encoding_label("latin1").build()?;

    for (first, bytes) in [("ÿþ", b"\xFF\xFE,y\n"), ("þÿ", b"\xFE\xFF,y\n")] {
        let records = vec![vec![Value::from(first), Value::from("y")]];
        let data = write_records(dialect.clone(), QuotePolicy::IfNeeded, &records)?;
        assert_eq!(data, bytes);
        assert_eq!(read_records(dialect.clone(), &data)?, expected(&records));
    }
    Ok(())
}

#[test]
fn leading_bom_character_should_read_back() -> Result<(), Box<dyn Error>> {
    let records = vec![
        vec![Value::from("\u{FEFF}x"), Value::from("y")],
        vec![Value::from("\u{FEFF}z"), Value::from("w")],
    ];

    for policy in [QuotePolicy::IfNeeded, QuotePolicy::StringsOnly] {
        let data = write_records(Dialect::default(), policy, &records)?;
        assert_eq!(data[0], b'"');
        assert_eq!(read_records(Dialect::default(), &data)?, expected(&records));
    }

    let writer = CsvRecordWriterBuilder::new()
        .write_bom(true)
        .from_writer(vec![])?;
    writer.write_all(&records)?;
    let data = writer.into_inner()?;
    assert_eq!(read_records(Dialect::default(), &data)?, expected(&records));
    Ok(())
}

#[test]
fn byte_by_byte_source_should_decode_split_characters() -> Result<(), Box<dyn Error>> {
    let mut bytes = "é,\"日本\"\nü,ß\n".as_bytes().to_vec().into_iter();
    let mut source = MockSource::default();
    source.expect_read().returning(move |buf| match bytes.next() {
        Some(byte) => {
            buf[0] = byte;
            Ok(1)
        }
        None => Ok(0),
    });

    let reader = CsvRecordReaderBuilder::new().from_reader(source)?;
    let records = reader.read_all()?;

    assert_eq!(
        records,
        vec![
            vec![Some("é".to_string()), Some("日本".to_string())],
            vec![Some("ü".to_string()), Some("ß".to_string())],
        ]
    );
    assert_eq!(reader.chars_read(), 11);
    Ok(())
}

#[test]
fn records_should_be_written_to_and_read_from_files() -> Result<(), Box<dyn Error>> {
    init_logger();

    let dir = tempfile::tempdir()?;
    let file_name = Alphanumeric.sample_string(&mut rand::rng(), 16);
    let path = dir.path().join(format!("{}.csv", file_name));

    let writer = CsvRecordWriterBuilder::new()
        .headers(&["year", "make", "model"])
        .line_break(LineBreak::CrLf)
        .from_path(&path)?;
    writer.write(&[Value::from(1948), Value::from("Porsche"), Value::from("356")])?;
    writer.write(&[Value::from(1967), Value::from("Ford"), Value::from("Mustang, fastback")])?;
    writer.flush()?;
    drop(writer);

    assert_eq!(
        fs::read_to_string(&path)?,
        "year,make,model\r\n1948,Porsche,356\r\n1967,Ford,\"Mustang, fastback\"\r\n"
    );

    let reader = CsvRecordReaderBuilder::new()
        .has_headers(true)
        .from_path(&path)?;
    let headers = reader.headers()?.unwrap_or_default();
    assert_eq!(headers.len(), 3);
    assert_eq!(headers[2].as_deref(), Some("model"));

    let records = reader.records().collect::<CsvResult<Vec<_>>>()?;
    assert_eq!(records.len(), 2);
    assert_eq!(records[1][2].as_deref(), Some("Mustang, fastback"));
    assert!(reader.is_closed());
    Ok(())
}

#[test]
fn missing_file_should_be_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = CsvRecordReaderBuilder::new().from_path(dir.path().join("missing.csv"));
    assert!(matches!(result, Err(csv_codec::CsvError::Io(_))));
}

#[test]
fn count_lines_should_skip_blank_lines() -> Result<(), Box<dyn Error>> {
    let reader = CsvRecordReaderBuilder::new()
        .from_reader(Cursor::new("a,b\n\n\"c\nd\",e\n\nf,g\n"))?;

    assert_eq!(reader.count_lines()?, 3);
    assert_eq!(reader.line(), 7);
    Ok(())
}

#[test]
fn padded_output_should_read_back_when_trimmed() -> Result<(), Box<dyn Error>> {
    let layout = ColumnLayout::new()
        .column(8, Alignment::Left)
        .column(6, Alignment::Right);
    let writer = CsvRecordWriterBuilder::new()
        .column_layout(layout)
        .from_writer(vec![])?;
    writer.write(&[Value::from("name"), Value::from("qty")])?;
    writer.write(&[Value::from("a, b"), Value::from(12)])?;
    let data = writer.into_inner()?;

    assert_eq!(
        String::from_utf8(data.clone())?,
        "name    ,   qty\n\"a, b\"  ,    12\n"
    );

    let dialect = DialectBuilder::new().trim_values(true).build()?;
    let records = read_records(dialect, &data)?;
    assert_eq!(records[1], vec![Some("a, b".to_string()), Some("12".to_string())]);
    Ok(())
}

#[test]
fn json_dialect_should_drive_reader_and_writer() -> Result<(), Box<dyn Error>> {
    let dialect = Dialect::from_json(
        r#"{ "separator": "|", "trim_values": true, "fill_missing_columns": true }"#,
    )?;

    let file = tempfile::NamedTempFile::new()?;
    let writer = CsvRecordWriterBuilder::new()
        .dialect(dialect.clone())
        .from_writer(File::create(file.path())?)?;
    writer.write(&[Value::from("a|b"), Value::from("c")])?;
    writer.flush()?;

    let reader = CsvRecordReaderBuilder::new()
        .dialect(dialect)
        .from_path(file.path())?;
    assert_eq!(
        reader.read()?,
        Some(vec![Some("a|b".to_string()), Some("c".to_string())])
    );
    Ok(())
}
