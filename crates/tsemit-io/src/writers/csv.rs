//! CSV formatter, column-oriented.
//!
//! Layout per statement: a `name,tags,<columns>` header taken from the first
//! series seen, then one line per row. Statements are separated by a blank
//! line. The formatter remembers which statement it is in across calls, so
//! chunked frames of one statement share a single header. Error frames get
//! their own `error` block; data after one starts a new header.

use std::io::Write;

use tsemit_core::response::{ResponseDocument, ResultFrame};
use tsemit_core::types::{Scalar, Tags};

use super::Formatter;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct CsvFormatter {
    /// Statement whose data header is the most recent block written. Cleared
    /// by an error block, so the next data frame writes a fresh header.
    headed: Option<usize>,
    wrote_any: bool,
}

impl CsvFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    fn builder() -> csv::WriterBuilder {
        let mut b = csv::WriterBuilder::new();
        b.flexible(true).has_headers(false);
        b
    }

    /// Close the current CSV block with a blank line and start a new one.
    fn separate(&self, wtr: csv::Writer<Vec<u8>>) -> Result<csv::Writer<Vec<u8>>> {
        if !self.wrote_any {
            return Ok(wtr);
        }
        let mut buf = into_buf(wtr)?;
        buf.push(b'\n');
        Ok(Self::builder().from_writer(buf))
    }

    fn write_error(
        &mut self,
        wtr: csv::Writer<Vec<u8>>,
        err: &str,
    ) -> Result<csv::Writer<Vec<u8>>> {
        let mut wtr = self.separate(wtr)?;
        wtr.write_record(["error"])?;
        wtr.write_record([err])?;
        self.headed = None;
        self.wrote_any = true;
        Ok(wtr)
    }

    fn write_frame(
        &mut self,
        mut wtr: csv::Writer<Vec<u8>>,
        result: &ResultFrame,
    ) -> Result<csv::Writer<Vec<u8>>> {
        if let Some(first) = result.series.first() {
            if self.headed != Some(result.statement_id) {
                wtr = self.separate(wtr)?;
                self.headed = Some(result.statement_id);
                self.wrote_any = true;

                let mut header = Vec::with_capacity(first.columns.len() + 2);
                header.push("name");
                header.push("tags");
                header.extend(first.columns.iter().map(String::as_str));
                wtr.write_record(&header)?;
            }
        }

        for table in &result.series {
            let tags = tags_key(&table.tags);
            for values in &table.values {
                let mut record = Vec::with_capacity(values.len() + 2);
                record.push(table.name.clone());
                record.push(tags.clone());
                record.extend(values.iter().map(cell));
                wtr.write_record(&record)?;
            }
        }

        if let Some(err) = &result.err {
            wtr = self.write_error(wtr, err)?;
        }
        Ok(wtr)
    }
}

impl Formatter for CsvFormatter {
    fn content_type(&self) -> &'static str {
        "text/csv"
    }

    fn write_response(&mut self, w: &mut dyn Write, resp: &ResponseDocument) -> Result<usize> {
        let mut wtr = Self::builder().from_writer(Vec::new());

        if let Some(err) = &resp.err {
            wtr = self.write_error(wtr, err)?;
        } else {
            for result in &resp.results {
                wtr = self.write_frame(wtr, result)?;
            }
        }

        let buf = into_buf(wtr)?;
        w.write_all(&buf)?;
        Ok(buf.len())
    }
}

fn into_buf(wtr: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    wtr.into_inner()
        .map_err(|e| Error::Io(std::io::Error::new(e.error().kind(), e.to_string())))
}

fn cell(v: &Scalar) -> String {
    match v {
        // timestamps go out as integer nanoseconds
        Scalar::Time(_) => v.unix_nanos().map(|n| n.to_string()).unwrap_or_default(),
        other => other.to_string(),
    }
}

/// `k1=v1,k2=v2` with keys sorted; `,`, `=` and spaces escaped.
fn tags_key(tags: &Tags) -> String {
    tags.iter()
        .map(|(k, v)| format!("{}={}", escape_tag(k), escape_tag(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn escape_tag(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, ',' | '=' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tsemit_core::response::SeriesTable;

    fn table(name: &str, host: Option<&str>, rows: Vec<Vec<Scalar>>) -> SeriesTable {
        let mut tags = Tags::new();
        if let Some(h) = host {
            tags.insert("host".into(), h.into());
        }
        let mut t = SeriesTable::new(name, tags, vec!["time".into(), "value".into()]);
        t.values = rows;
        t
    }

    fn ts(secs: i64) -> Scalar {
        Scalar::Time(Utc.timestamp_opt(secs, 0).unwrap())
    }

    fn render(f: &mut CsvFormatter, doc: &ResponseDocument) -> String {
        let mut out = Vec::new();
        f.write_response(&mut out, doc).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn writes_header_then_rows() {
        let mut frame = ResultFrame::new(0, vec![]);
        frame.series.push(table("cpu", Some("server01"), vec![
            vec![ts(0), Scalar::F64(2.0)],
            vec![ts(10), Scalar::F64(5.5)],
        ]));
        frame.series.push(table("cpu", None, vec![vec![ts(20), Scalar::Null]]));
        let text = render(&mut CsvFormatter::new(), &ResponseDocument::single(frame));
        assert_eq!(
            text,
            "name,tags,time,value\n\
             cpu,host=server01,0,2\n\
             cpu,host=server01,10000000000,5.5\n\
             cpu,,20000000000,\n"
        );
    }

    #[test]
    fn chunks_of_one_statement_share_a_header() {
        let mut f = CsvFormatter::new();
        let chunk = |id: usize, secs: i64| {
            let mut frame = ResultFrame::new(id, vec![]);
            frame.series.push(table("cpu", None, vec![vec![ts(secs), Scalar::I64(1)]]));
            ResponseDocument::single(frame)
        };
        let mut text = render(&mut f, &chunk(0, 0));
        text += &render(&mut f, &chunk(0, 1));
        text += &render(&mut f, &chunk(1, 2));
        assert_eq!(
            text,
            "name,tags,time,value\n\
             cpu,,0,1\n\
             cpu,,1000000000,1\n\
             \n\
             name,tags,time,value\n\
             cpu,,2000000000,1\n"
        );
    }

    #[test]
    fn empty_statements_are_skipped_and_errors_reported() {
        let mut f = CsvFormatter::new();
        let doc = ResponseDocument {
            results: vec![
                ResultFrame::new(0, vec![]),
                ResultFrame::error(1, vec![], "measurement not found"),
            ],
            err: None,
        };
        assert_eq!(render(&mut f, &doc), "error\nmeasurement not found\n");

        let failed = ResponseDocument::failed("bad query");
        assert_eq!(render(&mut CsvFormatter::new(), &failed), "error\nbad query\n");
    }

    fn data(id: usize, values: &[i64]) -> ResponseDocument {
        let mut t = SeriesTable::new("cpu", Tags::new(), vec!["value".into()]);
        t.values = values.iter().map(|v| vec![Scalar::I64(*v)]).collect();
        let mut frame = ResultFrame::new(id, vec![]);
        frame.series.push(t);
        ResponseDocument::single(frame)
    }

    fn failed(id: usize, err: &str) -> ResponseDocument {
        ResponseDocument::single(ResultFrame::error(id, vec![], err))
    }

    #[test]
    fn error_before_data_keeps_the_data_header() {
        let mut f = CsvFormatter::new();
        let mut text = render(&mut f, &failed(0, "bad point"));
        text += &render(&mut f, &data(0, &[1, 2]));
        assert_eq!(
            text,
            "error\n\
             bad point\n\
             \n\
             name,tags,value\n\
             cpu,,1\n\
             cpu,,2\n"
        );
    }

    #[test]
    fn error_between_chunks_is_written_and_reheads() {
        let mut f = CsvFormatter::new();
        let mut text = render(&mut f, &data(0, &[1, 2]));
        text += &render(&mut f, &failed(0, "bad point"));
        text += &render(&mut f, &data(0, &[3, 4]));
        assert_eq!(
            text,
            "name,tags,value\n\
             cpu,,1\n\
             cpu,,2\n\
             \n\
             error\n\
             bad point\n\
             \n\
             name,tags,value\n\
             cpu,,3\n\
             cpu,,4\n"
        );
    }

    #[test]
    fn tag_values_are_escaped() {
        let mut tags = Tags::new();
        tags.insert("region".into(), "us west".into());
        tags.insert("az".into(), "a=b".into());
        assert_eq!(tags_key(&tags), "az=a\\=b,region=us\\ west");
    }

    #[test]
    fn quoted_cells_when_needed() {
        let mut t = SeriesTable::new("databases", Tags::new(), vec!["name".into()]);
        t.values.push(vec![Scalar::from("a,b")]);
        let mut frame = ResultFrame::new(0, vec![]);
        frame.series.push(t);
        let text = render(&mut CsvFormatter::new(), &ResponseDocument::single(frame));
        assert_eq!(text, "name,tags,name\ndatabases,,\"a,b\"\n");
    }
}
