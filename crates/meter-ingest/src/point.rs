use std::collections::BTreeMap;
use std::fmt::Write as _;

/// One timestamped (series, field, value) record for the time-series sink.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub field: String,
    pub value: f64,
    pub timestamp_nanos: i64,
}

impl Point {
    /// Identity of the series this point belongs to. Together with the timestamp it
    /// identifies the point; writing the same pair twice is a no-op in the sink.
    pub fn series_key(&self) -> String {
        let mut key = escape_measurement(&self.measurement);
        for (k, v) in self.tags.iter().filter(|(_, v)| !v.is_empty()) {
            let _ = write!(key, ",{}={}", escape_key(k), escape_key(v));
        }
        let _ = write!(key, " {}", escape_key(&self.field));
        key
    }

    /// InfluxDB line protocol with nanosecond precision.
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape_measurement(&self.measurement);
        for (k, v) in self.tags.iter().filter(|(_, v)| !v.is_empty()) {
            let _ = write!(line, ",{}={}", escape_key(k), escape_key(v));
        }
        let _ = write!(
            line,
            " {}={} {}",
            escape_key(&self.field),
            format_float(self.value),
            self.timestamp_nanos
        );
        line
    }
}

fn escape_measurement(s: &str) -> String {
    s.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_key(s: &str) -> String {
    s.replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

fn format_float(v: f64) -> String {
    // Debug keeps a decimal point on whole numbers, so the field stays a float column.
    format!("{v:?}")
}
