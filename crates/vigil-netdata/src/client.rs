use crate::resample::{Frequency, Row};
use crate::time::TimeRef;
use chrono::{TimeZone, Utc};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;
use vigil_core::{VigilError, VigilResult};

/// Deadline for every request to a node: connect, send and read.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest upstream error body quoted back in an error message.
const MAX_ERROR_BODY: usize = 200;

/// Most charts [`NetdataClient::anomaly_rates`] queries in one call.
pub const MAX_ANOMALY_CHARTS: usize = 50;

/// Which alarms `/api/v1/alarms` should return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AlarmFilter {
    /// The node's default: alarms that are currently raised.
    #[default]
    Raised,
    /// Every configured alarm, whatever its state.
    All,
    /// Only alarms in warning or critical state.
    Active,
}

impl AlarmFilter {
    pub fn from_flags(all: bool, active: bool) -> Self {
        if all {
            AlarmFilter::All
        } else if active {
            AlarmFilter::Active
        } else {
            AlarmFilter::Raised
        }
    }

    fn query(self) -> Option<&'static str> {
        match self {
            AlarmFilter::Raised => None,
            AlarmFilter::All => Some("all"),
            AlarmFilter::Active => Some("active"),
        }
    }
}

/// Body format requested from `/api/v1/data`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DataFormat {
    #[default]
    Json,
    Csv,
}

impl DataFormat {
    /// `json` or `csv`, any case; empty means JSON.
    pub fn parse(input: &str) -> VigilResult<Self> {
        match input.trim().to_lowercase().as_str() {
            "" | "json" => Ok(DataFormat::Json),
            "csv" => Ok(DataFormat::Csv),
            other => Err(VigilError::Validation(format!(
                "unsupported data format '{other}', expected 'json' or 'csv'"
            ))),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            DataFormat::Json => "json",
            DataFormat::Csv => "csv",
        }
    }
}

/// A time-windowed sample of one chart.
#[derive(Debug, Clone)]
pub struct DataQuery {
    pub chart: String,
    pub after: TimeRef,
    pub before: TimeRef,
    /// Target point count; the node aggregates server-side to roughly this.
    pub points: u32,
    /// Extra node options such as `anomaly-bit`, `|`-separated.
    pub options: Option<String>,
    pub format: DataFormat,
    /// Client-side resampling applied after the node's own aggregation.
    pub resample: Option<Frequency>,
}

impl DataQuery {
    /// The last minute of `chart` at 60 points.
    pub fn new(chart: impl Into<String>) -> Self {
        Self {
            chart: chart.into(),
            after: TimeRef::Relative(-60),
            before: TimeRef::Now,
            points: 60,
            options: None,
            format: DataFormat::Json,
            resample: None,
        }
    }

    fn options_param(&self) -> String {
        // Epoch seconds keep the time column parseable in every format.
        match self.options.as_deref().map(str::trim) {
            Some(extra) if !extra.is_empty() => format!("seconds|{extra}"),
            _ => "seconds".to_string(),
        }
    }
}

/// Client for a Netdata node's `/api/v1` endpoints.
///
/// Each call is a single GET bounded by the client timeout, with no retries.
/// Every failure (transport, timeout, non-2xx, unparseable body) is a
/// [`VigilError::DataSource`].
#[derive(Debug, Clone)]
pub struct NetdataClient {
    http: reqwest::Client,
}

impl NetdataClient {
    pub fn new() -> VigilResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> VigilResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| VigilError::DataSource(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Node identity and capacity summary.
    pub async fn info(&self, base_url: &str) -> VigilResult<Value> {
        let r = self.get_json(base_url, "info", &[]).await?;

        let mirrored_hosts: Vec<Value> = r
            .get("mirrored_hosts_status")
            .and_then(Value::as_array)
            .map(|hosts| {
                hosts
                    .iter()
                    .map(|h| {
                        json!({
                            "hostname": field(h, "hostname"),
                            "hops": field(h, "hops"),
                            "reachable": field(h, "reachable"),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let hostname = r
            .get("mirrored_hosts")
            .and_then(|h| h.get(0))
            .cloned()
            .unwrap_or_else(placeholder);

        Ok(json!({
            "netdata_version": field(&r, "version"),
            "hostname": hostname,
            "operating_system": field(&r, "os_name"),
            "operating_system_version": field(&r, "os_id"),
            "cores_total": field(&r, "cores_total"),
            "total_disk_space": field(&r, "total_disk_space"),
            "ram_total": field(&r, "ram_total"),
            "mirrored_hosts": mirrored_hosts,
            "alarms": field(&r, "alarms"),
            "charts_count": field(&r, "charts-count"),
            "metrics_count": field(&r, "metrics-count"),
            "collectors": field(&r, "collectors"),
        }))
    }

    /// Available charts as `{id, name, title}`, sorted by id.
    ///
    /// `search` keeps charts whose id, name, title or any dimension name
    /// contains it, ignoring case.
    pub async fn charts(
        &self,
        base_url: &str,
        search: Option<&str>,
        include_dimensions: bool,
    ) -> VigilResult<Value> {
        let r = self.get_json(base_url, "charts", &[]).await?;
        let charts = r
            .get("charts")
            .and_then(Value::as_object)
            .ok_or_else(|| missing(base_url, "charts", "charts"))?;

        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut out = Vec::new();
        for (id, chart) in charts {
            let dimensions = dimension_names(chart);
            if let Some(needle) = &needle {
                let text = |key: &str| {
                    chart
                        .get(key)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_lowercase()
                };
                let hit = id.to_lowercase().contains(needle)
                    || text("name").contains(needle)
                    || text("title").contains(needle)
                    || dimensions.iter().any(|d| d.to_lowercase().contains(needle));
                if !hit {
                    continue;
                }
            }

            let mut entry = json!({
                "id": id,
                "name": field(chart, "name"),
                "title": field(chart, "title"),
            });
            if include_dimensions {
                entry["dimensions"] = json!(dimensions);
            }
            out.push(entry);
        }

        out.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));
        Ok(Value::Array(out))
    }

    /// Metadata for one chart.
    pub async fn chart_info(&self, base_url: &str, chart: &str) -> VigilResult<Value> {
        let r = self
            .get_json(base_url, "chart", &[("chart", chart.to_string())])
            .await?;

        if r.get("id").is_none() {
            return Err(VigilError::DataSource(format!("chart not found: {chart}")));
        }

        let alarms: Vec<String> = r
            .get("alarms")
            .and_then(Value::as_object)
            .map(|a| a.keys().cloned().collect())
            .unwrap_or_default();

        Ok(json!({
            "id": field(&r, "id"),
            "title": field(&r, "title"),
            "units": field(&r, "units"),
            "family": field(&r, "family"),
            "context": field(&r, "context"),
            "chart_type": field(&r, "chart_type"),
            "update_every": field(&r, "update_every"),
            "dimensions": dimension_names(&r),
            "alarms": alarms,
        }))
    }

    /// Sampled values of one chart over a time window.
    ///
    /// Returns `{chart, labels, data}` with rows in ascending time order and
    /// the time column rendered as RFC 3339 UTC.
    pub async fn chart_data(&self, base_url: &str, query: &DataQuery) -> VigilResult<Value> {
        let params = [
            ("chart", query.chart.clone()),
            ("after", query.after.as_query_value().to_string()),
            ("before", query.before.as_query_value().to_string()),
            ("points", query.points.to_string()),
            ("format", query.format.as_str().to_string()),
            ("options", query.options_param()),
        ];

        let (labels, mut rows) = match query.format {
            DataFormat::Json => {
                let r = self.get_json(base_url, "data", &params).await?;
                parse_json_rows(&r).ok_or_else(|| missing(base_url, "data", "labels/data"))?
            }
            DataFormat::Csv => {
                let body = self.get_text(base_url, "data", &params).await?;
                parse_csv_rows(&body).ok_or_else(|| missing(base_url, "data", "CSV header"))?
            }
        };

        rows.sort_by_key(|r| r.time);
        if let Some(freq) = query.resample {
            rows = freq.resample(&rows);
        }

        let data: Vec<Value> = rows
            .iter()
            .map(|row| {
                let mut cells = vec![render_time(row.time)];
                cells.extend(row.values.iter().map(|v| json!(v)));
                Value::Array(cells)
            })
            .collect();

        Ok(json!({
            "chart": query.chart,
            "labels": labels,
            "data": data,
        }))
    }

    /// Mean anomaly rate (percent) of each matching chart over a window,
    /// highest first.
    ///
    /// Charts are selected like [`charts`](Self::charts) and each is sampled
    /// once with the `anomaly-bit` option, one request after another. At most
    /// [`MAX_ANOMALY_CHARTS`] charts are queried.
    pub async fn anomaly_rates(
        &self,
        base_url: &str,
        search: Option<&str>,
        after: TimeRef,
        before: TimeRef,
    ) -> VigilResult<Value> {
        let listed = self.charts(base_url, search, false).await?;
        let ids: Vec<String> = listed
            .as_array()
            .map(|charts| {
                charts
                    .iter()
                    .filter_map(|c| c["id"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let mut rates: Vec<(String, Option<f64>)> = Vec::new();
        for id in ids.iter().take(MAX_ANOMALY_CHARTS) {
            let mut query = DataQuery::new(id.as_str());
            query.after = after;
            query.before = before;
            query.points = 1;
            query.options = Some("anomaly-bit".to_string());
            let sample = self.chart_data(base_url, &query).await?;
            rates.push((id.clone(), mean_of_values(&sample)));
        }

        rates.sort_by(|a, b| match (a.1, b.1) {
            (Some(x), Some(y)) => y.total_cmp(&x).then_with(|| a.0.cmp(&b.0)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        let entries: Vec<Value> = rates
            .into_iter()
            .map(|(chart, rate)| {
                json!({
                    "chart": chart,
                    "anomaly_rate": rate.map_or_else(placeholder, Value::from),
                })
            })
            .collect();

        Ok(json!({
            "after": after.as_query_value(),
            "before": before.as_query_value(),
            "charts_matched": ids.len(),
            "charts_checked": entries.len(),
            "anomaly_rates": entries,
        }))
    }

    /// Alarms keyed by alarm id.
    pub async fn alarms(&self, base_url: &str, filter: AlarmFilter) -> VigilResult<Value> {
        // The node reads `?all` / `?active` as bare flags.
        let path = match filter.query() {
            Some(flag) => format!("alarms?{flag}"),
            None => "alarms".to_string(),
        };
        let r = self.get_json(base_url, &path, &[]).await?;

        let mut out = Map::new();
        if let Some(alarms) = r.get("alarms").and_then(Value::as_object) {
            for (id, alarm) in alarms {
                out.insert(
                    id.clone(),
                    json!({
                        "name": field(alarm, "name"),
                        "chart": field(alarm, "chart"),
                        "status": field(alarm, "status"),
                        "value": field(alarm, "value"),
                        "units": field(alarm, "units"),
                        "info": field(alarm, "info"),
                    }),
                );
            }
        }
        Ok(Value::Object(out))
    }

    /// Latest value of every dimension of every chart.
    ///
    /// `search` keeps charts whose id contains it, ignoring case.
    pub async fn current_metrics(&self, base_url: &str, search: Option<&str>) -> VigilResult<Value> {
        let r = self
            .get_json(base_url, "allmetrics", &[("format", "json".to_string())])
            .await?;
        let charts = r
            .as_object()
            .ok_or_else(|| missing(base_url, "allmetrics", "chart map"))?;

        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut out = Map::new();
        for (id, chart) in charts {
            if let Some(needle) = &needle {
                if !id.to_lowercase().contains(needle) {
                    continue;
                }
            }

            let mut dims = Map::new();
            if let Some(dimensions) = chart.get("dimensions").and_then(Value::as_object) {
                for (dim_id, dim) in dimensions {
                    let name = dim
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or(dim_id)
                        .to_string();
                    dims.insert(name, field(dim, "value"));
                }
            }

            out.insert(
                id.clone(),
                json!({
                    "units": field(chart, "units"),
                    "dimensions": dims,
                }),
            );
        }
        Ok(Value::Object(out))
    }

    async fn get_text(
        &self,
        base_url: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> VigilResult<String> {
        let url = format!("{}/api/v1/{path}", base_url.trim_end_matches('/'));
        debug!(url = %url, "Netdata request");

        let mut request = self.http.get(&url);
        if !query.is_empty() {
            request = request.query(query);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| VigilError::DataSource(describe_transport_error(&url, &e)))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| VigilError::DataSource(format!("failed to read body from {url}: {e}")))?;

        if !status.is_success() {
            let snippet: String = body.trim().chars().take(MAX_ERROR_BODY).collect();
            return Err(VigilError::DataSource(format!(
                "{url} returned {status}: {snippet}"
            )));
        }
        Ok(body)
    }

    async fn get_json(
        &self,
        base_url: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> VigilResult<Value> {
        let body = self.get_text(base_url, path, query).await?;
        serde_json::from_str(&body).map_err(|e| {
            VigilError::DataSource(format!("malformed JSON from {base_url} /api/v1/{path}: {e}"))
        })
    }
}

fn describe_transport_error(url: &str, err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request to {url} timed out")
    } else if err.is_connect() {
        format!("could not connect to {url}: {err}")
    } else {
        format!("request to {url} failed: {err}")
    }
}

fn placeholder() -> Value {
    Value::String(String::new())
}

/// `value[key]`, or an empty-string placeholder when missing or null.
fn field(value: &Value, key: &str) -> Value {
    value
        .get(key)
        .filter(|v| !v.is_null())
        .cloned()
        .unwrap_or_else(placeholder)
}

fn missing(base_url: &str, path: &str, what: &str) -> VigilError {
    VigilError::DataSource(format!(
        "unexpected response from {base_url} /api/v1/{path}: no {what}"
    ))
}

/// Dimension display names of a chart object, in key order.
fn dimension_names(chart: &Value) -> Vec<String> {
    chart
        .get("dimensions")
        .and_then(Value::as_object)
        .map(|dims| {
            dims.iter()
                .map(|(id, d)| {
                    d.get("name")
                        .and_then(Value::as_str)
                        .unwrap_or(id)
                        .to_string()
                })
                .collect()
        })
        .unwrap_or_default()
}

fn render_time(epoch: i64) -> Value {
    match Utc.timestamp_opt(epoch, 0).single() {
        Some(dt) => Value::String(dt.to_rfc3339()),
        None => Value::from(epoch),
    }
}

/// Mean of every numeric cell after the time column of a `chart_data` result.
fn mean_of_values(sample: &Value) -> Option<f64> {
    let values: Vec<f64> = sample["data"]
        .as_array()?
        .iter()
        .filter_map(Value::as_array)
        .flat_map(|row| row.iter().skip(1).filter_map(Value::as_f64))
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn parse_json_rows(r: &Value) -> Option<(Vec<String>, Vec<Row>)> {
    let labels: Vec<String> = r
        .get("labels")?
        .as_array()?
        .iter()
        .map(|l| l.as_str().unwrap_or_default().to_string())
        .collect();

    let rows = r
        .get("data")?
        .as_array()?
        .iter()
        .filter_map(|row| {
            let cells = row.as_array()?;
            let (time, values) = cells.split_first()?;
            Some(Row {
                time: time.as_i64().or_else(|| time.as_f64().map(|t| t as i64))?,
                values: values.iter().map(Value::as_f64).collect(),
            })
        })
        .collect();

    Some((labels, rows))
}

fn parse_csv_rows(body: &str) -> Option<(Vec<String>, Vec<Row>)> {
    let mut lines = body.lines().map(str::trim).filter(|l| !l.is_empty());
    let labels: Vec<String> = lines
        .next()?
        .split(',')
        .map(|l| l.trim().trim_matches('"').to_string())
        .collect();

    let rows = lines
        .filter_map(|line| {
            let mut cells = line.split(',').map(|c| c.trim().trim_matches('"'));
            let time = cells.next()?.parse::<f64>().ok()? as i64;
            Some(Row {
                time,
                values: cells.map(|c| c.parse::<f64>().ok()).collect(),
            })
        })
        .collect();

    Some((labels, rows))
}
