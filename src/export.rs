//! CSV export of the monthly report.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::errors::StoreError;
use crate::metrics::ReportRow;

pub fn write_report<W: Write>(rows: &[ReportRow], out: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["period", "leads", "revenue", "conversion%"])?;
    for row in rows {
        writer.write_record([
            row.period.clone(),
            row.leads.to_string(),
            format!("{:.2}", row.revenue),
            row.conversion.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_report(rows: &[ReportRow], path: &Path) -> Result<(), StoreError> {
    let file = File::create(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_report(rows, file).map_err(|err| match err.into_kind() {
        csv::ErrorKind::Io(source) => StoreError::Io {
            path: path.to_path_buf(),
            source,
        },
        other => StoreError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::other(format!("csv: {other:?}")),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_has_header_and_formatted_rows() {
        let rows = vec![
            ReportRow {
                period: "2026-01".into(),
                leads: 4,
                revenue: 1500.5,
                conversion: 25,
            },
            ReportRow {
                period: "2026-02".into(),
                leads: 1,
                revenue: 0.0,
                conversion: 0,
            },
        ];
        let mut buf = Vec::new();
        write_report(&rows, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("period,leads,revenue,conversion%"));
        assert_eq!(lines.next(), Some("2026-01,4,1500.50,25"));
        assert_eq!(lines.next(), Some("2026-02,1,0.00,0"));
    }

    #[test]
    fn empty_report_is_just_the_header() {
        let mut buf = Vec::new();
        write_report(&[], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "period,leads,revenue,conversion%\n");
    }
}
