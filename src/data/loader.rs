use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{
    ClusterSummary, ClusterSummaryRow, FanDataset, FanRecord, AGE, APP_VISITS, CHANNEL, CLUSTER,
    EVENT_PARTICIPATION, FAN_ID, FAN_METRICS, LOCALITY, NEWSLETTER_CLICK_RATE, SOCIAL_INTERACTIONS,
    TOTAL_PURCHASES, TOTAL_SPEND,
};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load the fan table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – one row per fan, header row with the export's column names
/// * `.json`    – `[{ "fan_id": ..., "edad": ..., ... }, ...]`
/// * `.parquet` – one column per field
///
/// Loading is strict: a missing column, an empty, unparsable or non-finite
/// number or a duplicated `fan_id` rejects the whole file.
pub fn load_fans(path: &Path) -> Result<FanDataset> {
    let ext = extension(path);
    let fans = match ext.as_str() {
        "csv" => load_fans_csv(path)?,
        "json" => load_fans_json(path)?,
        "parquet" | "pq" => load_fans_parquet(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };
    check_finite(&fans)?;
    check_unique_ids(&fans)?;
    Ok(FanDataset::from_fans(fans))
}

/// Load the per-cluster summary table (`.csv` only).
///
/// The `cluster_marketing` column is the key; every other column is a metric
/// and every metric cell must be a number.
pub fn load_summary(path: &Path) -> Result<ClusterSummary> {
    match extension(path).as_str() {
        "csv" => load_summary_csv(path),
        other => bail!("Unsupported summary file extension: .{other}"),
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// `NaN` and `inf` parse as floats in every format; reject them here.
fn check_finite(fans: &[FanRecord]) -> Result<()> {
    for (row, fan) in fans.iter().enumerate() {
        for metric in FAN_METRICS {
            if let Some(v) = fan.numeric(metric).filter(|v| !v.is_finite()) {
                bail!("Row {}, column '{metric}': '{v}' is not a finite number", row + 1);
            }
        }
    }
    Ok(())
}

fn check_unique_ids(fans: &[FanRecord]) -> Result<()> {
    let mut seen = HashSet::with_capacity(fans.len());
    for (row, fan) in fans.iter().enumerate() {
        if !seen.insert(fan.fan_id.as_str()) {
            bail!("Row {}: duplicate fan_id '{}'", row + 1, fan.fan_id);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV loaders
// ---------------------------------------------------------------------------

fn load_fans_csv(path: &Path) -> Result<Vec<FanRecord>> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .context("opening CSV")?;
    read_fans_csv(reader)
}

/// Row numbers in messages are 1-based data rows (the header is not counted).
fn read_fans_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<FanRecord>> {
    reader
        .deserialize::<FanRecord>()
        .enumerate()
        .map(|(i, result)| result.with_context(|| format!("CSV row {}", i + 1)))
        .collect()
}

fn load_summary_csv(path: &Path) -> Result<ClusterSummary> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .context("opening summary CSV")?;
    read_summary_csv(reader)
}

fn read_summary_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<ClusterSummary> {
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let key_idx = headers
        .iter()
        .position(|h| h == CLUSTER)
        .with_context(|| format!("summary CSV missing '{CLUSTER}' column"))?;

    let metric_names: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != key_idx)
        .map(|(_, h)| h.clone())
        .collect();

    let mut rows: Vec<ClusterSummaryRow> = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let row_no = row_no + 1;
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let cluster = record.get(key_idx).unwrap_or("").to_string();
        if cluster.is_empty() {
            bail!("CSV row {row_no}: empty '{CLUSTER}'");
        }
        if rows.iter().any(|r| r.cluster == cluster) {
            bail!("CSV row {row_no}: duplicate cluster '{cluster}'");
        }

        let mut values = BTreeMap::new();
        for (col_idx, cell) in record.iter().enumerate() {
            if col_idx == key_idx {
                continue;
            }
            let col_name = &headers[col_idx];
            let v = cell
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .with_context(|| {
                    format!("CSV row {row_no}, column '{col_name}': '{cell}' is not a finite number")
                })?;
            values.insert(col_name.clone(), v);
        }

        rows.push(ClusterSummaryRow { cluster, values });
    }

    Ok(ClusterSummary { metric_names, rows })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "fan_id": "F0001", "edad": 31, "localidad": "Sevilla", "canal": "app",
///     "visitas_app": 12, "interacciones_redes": 40, "clickrate_newsletter": 0.21,
///     "compras_total": 3, "participacion_eventos": 1, "gasto_total": 180.5,
///     "cluster_marketing": 2 },
///   ...
/// ]
/// ```
///
/// Identifiers and cluster labels may be written as numbers.
fn load_fans_json(path: &Path) -> Result<Vec<FanRecord>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_fans_json(&text)
}

fn parse_fans_json(text: &str) -> Result<Vec<FanRecord>> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let records = match root {
        JsonValue::Array(records) => records,
        _ => bail!("Expected top-level JSON array"),
    };

    records
        .into_iter()
        .enumerate()
        .map(|(i, mut rec)| {
            let obj = rec
                .as_object_mut()
                .with_context(|| format!("Row {} is not a JSON object", i + 1))?;
            for key in [FAN_ID, CLUSTER] {
                if let Some(v) = obj.get_mut(key).filter(|v| v.is_number()) {
                    *v = JsonValue::String(v.to_string());
                }
            }
            serde_json::from_value(rec).with_context(|| format!("Row {}", i + 1))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one column per fan field.
///
/// Numeric columns may be any integer or float type; text columns may be
/// strings or integers (integer cluster ids are common). Works with files
/// written by both **Pandas** (`df.to_parquet()`) and **Polars**
/// (`df.write_parquet()`).
fn load_fans_parquet(path: &Path) -> Result<Vec<FanRecord>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut fans = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        if log::log_enabled!(log::Level::Trace) {
            if let Ok(preview) = arrow::util::pretty::pretty_format_batches(&[batch.slice(0, batch.num_rows().min(5))]) {
                log::trace!("parquet batch preview:\n{preview}");
            }
        }
        let offset = fans.len();
        fans.extend(fans_from_batch(&batch, offset)?);
    }
    Ok(fans)
}

fn fans_from_batch(batch: &RecordBatch, row_offset: usize) -> Result<Vec<FanRecord>> {
    let fan_id = text_column(batch, FAN_ID, row_offset)?;
    let locality = text_column(batch, LOCALITY, row_offset)?;
    let channel = text_column(batch, CHANNEL, row_offset)?;
    let cluster = text_column(batch, CLUSTER, row_offset)?;
    let age = numeric_column(batch, AGE, row_offset)?;
    let app_visits = numeric_column(batch, APP_VISITS, row_offset)?;
    let social = numeric_column(batch, SOCIAL_INTERACTIONS, row_offset)?;
    let click_rate = numeric_column(batch, NEWSLETTER_CLICK_RATE, row_offset)?;
    let purchases = numeric_column(batch, TOTAL_PURCHASES, row_offset)?;
    let events = numeric_column(batch, EVENT_PARTICIPATION, row_offset)?;
    let spend = numeric_column(batch, TOTAL_SPEND, row_offset)?;

    Ok((0..batch.num_rows())
        .map(|row| FanRecord {
            fan_id: fan_id[row].clone(),
            age: age[row],
            locality: locality[row].clone(),
            channel: channel[row].clone(),
            app_visits: app_visits[row],
            social_interactions: social[row],
            newsletter_click_rate: click_rate[row],
            total_purchases: purchases[row],
            event_participation: events[row],
            total_spend: spend[row],
            cluster: cluster[row].clone(),
        })
        .collect())
}

// -- Parquet / Arrow helpers --

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))?;
    Ok(batch.column(idx))
}

fn reject_nulls(array: &dyn Array, name: &str, row_offset: usize) -> Result<()> {
    if let Some(row) = (0..array.len()).find(|&r| array.is_null(r)) {
        bail!("Row {}: null or non-numeric '{name}'", row_offset + row + 1);
    }
    Ok(())
}

/// A column cast to `Float64`. Text that does not parse becomes null and is
/// rejected.
fn numeric_column(batch: &RecordBatch, name: &str, row_offset: usize) -> Result<Vec<f64>> {
    let col = column(batch, name)?;
    let casted = cast(col, &DataType::Float64)
        .with_context(|| format!("column '{name}' of type {:?} is not numeric", col.data_type()))?;
    reject_nulls(&casted, name, row_offset)?;
    Ok(casted.as_primitive::<Float64Type>().values().to_vec())
}

fn text_column(batch: &RecordBatch, name: &str, row_offset: usize) -> Result<Vec<String>> {
    let col = column(batch, name)?;
    let casted = cast(col, &DataType::Utf8)
        .with_context(|| format!("column '{name}' of type {:?} is not text", col.data_type()))?;
    reject_nulls(&casted, name, row_offset)?;
    Ok(casted
        .as_string::<i32>()
        .iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}
