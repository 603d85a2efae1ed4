use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

const FANS_CSV: &str = "fans_con_score_y_cluster.csv";
const FANS_PARQUET: &str = "fans_con_score_y_cluster.parquet";
const SUMMARY_CSV: &str = "resumen_clusters.csv";

#[derive(Debug, Clone, Serialize)]
struct FanRow {
    fan_id: String,
    edad: f64,
    localidad: String,
    canal: String,
    visitas_app: f64,
    interacciones_redes: f64,
    clickrate_newsletter: f64,
    compras_total: f64,
    participacion_eventos: f64,
    gasto_total: f64,
    cluster_marketing: String,
}

#[derive(Debug, Serialize)]
struct SummaryRow {
    cluster_marketing: String,
    fans: f64,
    visitas_app_medias: f64,
    interacciones_medias: f64,
    clickrate_medio: f64,
    compras_medias: f64,
    eventos_medios: f64,
    gasto_medio: f64,
}

/// Cluster profile: mean age, app visits, social interactions, click rate,
/// purchases, events, spend per purchase.
struct Profile {
    cluster: &'static str,
    share: usize,
    age: f64,
    visits: f64,
    social: f64,
    click_rate: f64,
    purchases: f64,
    events: f64,
    ticket: f64,
}

const PROFILES: [Profile; 4] = [
    Profile { cluster: "0", share: 40, age: 24.0, visits: 30.0, social: 120.0, click_rate: 0.10, purchases: 2.0, events: 0.5, ticket: 25.0 },
    Profile { cluster: "1", share: 25, age: 41.0, visits: 12.0, social: 15.0, click_rate: 0.35, purchases: 6.0, events: 2.0, ticket: 60.0 },
    Profile { cluster: "2", share: 20, age: 33.0, visits: 3.0, social: 5.0, click_rate: 0.05, purchases: 0.5, events: 0.1, ticket: 20.0 },
    Profile { cluster: "3", share: 15, age: 52.0, visits: 20.0, social: 40.0, click_rate: 0.55, purchases: 10.0, events: 5.0, ticket: 90.0 },
];

const LOCALITIES: [&str; 5] = ["Madrid", "Barcelona", "Sevilla", "Valencia", "Bilbao"];
const CHANNELS: [&str; 3] = ["app", "web", "tienda"];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// Non-negative count around `mean`.
    fn count(&mut self, mean: f64) -> f64 {
        self.gauss(mean, mean * 0.4).round().max(0.0)
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

fn generate_fans(rng: &mut SimpleRng, total: usize) -> Vec<FanRow> {
    let mut fans = Vec::with_capacity(total);
    for profile in &PROFILES {
        for _ in 0..total * profile.share / 100 {
            let purchases = rng.count(profile.purchases);
            let spend = (purchases * rng.gauss(profile.ticket, profile.ticket * 0.2)).max(0.0);
            fans.push(FanRow {
                fan_id: format!("F{:04}", fans.len() + 1),
                edad: rng.gauss(profile.age, 6.0).round().clamp(16.0, 90.0),
                localidad: rng.pick(&LOCALITIES).to_string(),
                canal: rng.pick(&CHANNELS).to_string(),
                visitas_app: rng.count(profile.visits),
                interacciones_redes: rng.count(profile.social),
                clickrate_newsletter: rng.gauss(profile.click_rate, 0.05).clamp(0.0, 1.0),
                compras_total: purchases,
                participacion_eventos: rng.count(profile.events),
                gasto_total: (spend * 100.0).round() / 100.0,
                cluster_marketing: profile.cluster.to_string(),
            });
        }
    }
    fans
}

fn summarize(fans: &[FanRow]) -> Vec<SummaryRow> {
    PROFILES
        .iter()
        .map(|p| {
            let members: Vec<&FanRow> = fans.iter().filter(|f| f.cluster_marketing == p.cluster).collect();
            let n = members.len().max(1) as f64;
            let avg = |get: fn(&FanRow) -> f64| members.iter().map(|f| get(f)).sum::<f64>() / n;
            SummaryRow {
                cluster_marketing: p.cluster.to_string(),
                fans: members.len() as f64,
                visitas_app_medias: avg(|f| f.visitas_app),
                interacciones_medias: avg(|f| f.interacciones_redes),
                clickrate_medio: avg(|f| f.clickrate_newsletter),
                compras_medias: avg(|f| f.compras_total),
                eventos_medios: avg(|f| f.participacion_eventos),
                gasto_medio: avg(|f| f.gasto_total),
            }
        })
        .collect()
}

fn write_csv<T: Serialize>(path: &str, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &str, fans: &[FanRow]) -> Result<()> {
    let text = |get: fn(&FanRow) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(fans.iter().map(get).collect::<Vec<_>>()))
    };
    let num = |get: fn(&FanRow) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(fans.iter().map(get).collect::<Vec<_>>()))
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("fan_id", DataType::Utf8, false),
        Field::new("edad", DataType::Float64, false),
        Field::new("localidad", DataType::Utf8, false),
        Field::new("canal", DataType::Utf8, false),
        Field::new("visitas_app", DataType::Float64, false),
        Field::new("interacciones_redes", DataType::Float64, false),
        Field::new("clickrate_newsletter", DataType::Float64, false),
        Field::new("compras_total", DataType::Float64, false),
        Field::new("participacion_eventos", DataType::Float64, false),
        Field::new("gasto_total", DataType::Float64, false),
        Field::new("cluster_marketing", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            text(|f| &f.fan_id),
            num(|f| f.edad),
            text(|f| &f.localidad),
            text(|f| &f.canal),
            num(|f| f.visitas_app),
            num(|f| f.interacciones_redes),
            num(|f| f.clickrate_newsletter),
            num(|f| f.compras_total),
            num(|f| f.participacion_eventos),
            num(|f| f.gasto_total),
            text(|f| &f.cluster_marketing),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let fans = generate_fans(&mut rng, 500);
    let summary = summarize(&fans);

    write_csv(FANS_CSV, &fans)?;
    write_csv(SUMMARY_CSV, &summary)?;
    write_parquet(FANS_PARQUET, &fans)?;

    println!(
        "Wrote {} fans in {} clusters to {FANS_CSV}, {FANS_PARQUET} and {SUMMARY_CSV}",
        fans.len(),
        summary.len()
    );
    Ok(())
}
