use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

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

    /// Integer in `lo..=hi`.
    fn range(&mut self, lo: i64, hi: i64) -> i64 {
        lo + (self.next_u64() % (hi - lo + 1) as u64) as i64
    }

    /// Index into `weights`, drawn proportionally.
    fn weighted(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        let mut pick = self.next_f64() * total;
        for (i, w) in weights.iter().enumerate() {
            if pick < *w {
                return i;
            }
            pick -= w;
        }
        weights.len() - 1
    }
}

enum Series {
    Int(Vec<i64>),
    Text(Vec<Option<String>>),
}

impl Series {
    fn cell(&self, row: usize) -> String {
        match self {
            Series::Int(v) => v[row].to_string(),
            Series::Text(v) => v[row].clone().unwrap_or_default(),
        }
    }

    fn to_arrow(&self) -> (DataType, ArrayRef) {
        match self {
            Series::Int(v) => (DataType::Int64, Arc::new(Int64Array::from(v.clone()))),
            Series::Text(v) => (
                DataType::Utf8,
                Arc::new(StringArray::from(
                    v.iter().map(|s| s.as_deref()).collect::<Vec<_>>(),
                )),
            ),
        }
    }
}

const LEVELS: [&str; 3] = ["Low", "Medium", "High"];

/// Low/Medium/High label with its rank.
fn level(rng: &mut SimpleRng, weights: &[f64]) -> (usize, Option<String>) {
    let i = rng.weighted(weights);
    (i, Some(LEVELS[i].to_string()))
}

fn yes_no(rng: &mut SimpleRng, yes: f64) -> Option<String> {
    Some(if rng.next_f64() < yes { "Yes" } else { "No" }.to_string())
}

fn generate(rows: usize, rng: &mut SimpleRng) -> Vec<(&'static str, Series)> {
    let mut hours = Vec::with_capacity(rows);
    let mut attendance = Vec::with_capacity(rows);
    let mut involvement = Vec::with_capacity(rows);
    let mut resources = Vec::with_capacity(rows);
    let mut extracurricular = Vec::with_capacity(rows);
    let mut sleep = Vec::with_capacity(rows);
    let mut previous = Vec::with_capacity(rows);
    let mut motivation = Vec::with_capacity(rows);
    let mut internet = Vec::with_capacity(rows);
    let mut tutoring = Vec::with_capacity(rows);
    let mut income = Vec::with_capacity(rows);
    let mut teacher = Vec::with_capacity(rows);
    let mut school = Vec::with_capacity(rows);
    let mut peers = Vec::with_capacity(rows);
    let mut activity = Vec::with_capacity(rows);
    let mut disabilities = Vec::with_capacity(rows);
    let mut education = Vec::with_capacity(rows);
    let mut distance = Vec::with_capacity(rows);
    let mut gender = Vec::with_capacity(rows);
    let mut score = Vec::with_capacity(rows);

    for _ in 0..rows {
        let h = rng.gauss(20.0, 6.0).round().clamp(1.0, 44.0) as i64;
        let a = rng.range(60, 100);
        let (inv, inv_label) = level(rng, &[0.2, 0.5, 0.3]);
        let (res, res_label) = level(rng, &[0.2, 0.5, 0.3]);
        let (mot, mot_label) = level(rng, &[0.3, 0.5, 0.2]);
        let (_, inc_label) = level(rng, &[0.4, 0.4, 0.2]);
        let (tq, tq_label) = level(rng, &[0.1, 0.6, 0.3]);
        let tut = rng.range(0, 8);
        let prev = rng.range(50, 100);
        let peer = rng.weighted(&[0.2, 0.4, 0.4]);

        let noise = rng.gauss(0.0, 2.0);
        let exam = 40.0
            + 0.3 * h as f64
            + 0.2 * a as f64
            + 0.05 * prev as f64
            + 0.5 * tut as f64
            + 1.0 * (inv + res + mot + tq) as f64
            + (peer as f64 - 1.0)
            + noise;

        hours.push(h);
        attendance.push(a);
        involvement.push(inv_label);
        resources.push(res_label);
        extracurricular.push(yes_no(rng, 0.6));
        sleep.push(rng.range(4, 10));
        previous.push(prev);
        motivation.push(mot_label);
        internet.push(yes_no(rng, 0.92));
        tutoring.push(tut);
        income.push(inc_label);
        // A few students without a recorded teacher quality.
        teacher.push(if rng.next_f64() < 0.02 { None } else { tq_label });
        school.push(Some(
            if rng.next_f64() < 0.7 { "Public" } else { "Private" }.to_string(),
        ));
        peers.push(Some(["Negative", "Neutral", "Positive"][peer].to_string()));
        activity.push(rng.range(0, 6));
        disabilities.push(yes_no(rng, 0.1));
        let edu = rng.weighted(&[0.5, 0.3, 0.2]);
        education.push(Some(
            ["High School", "College", "Postgraduate"][edu].to_string(),
        ));
        let dist = rng.weighted(&[0.6, 0.3, 0.1]);
        distance.push(Some(["Near", "Moderate", "Far"][dist].to_string()));
        gender.push(Some(
            if rng.next_f64() < 0.58 { "Male" } else { "Female" }.to_string(),
        ));
        score.push(exam.round().clamp(55.0, 100.0) as i64);
    }

    vec![
        ("Hours_Studied", Series::Int(hours)),
        ("Attendance", Series::Int(attendance)),
        ("Parental_Involvement", Series::Text(involvement)),
        ("Access_to_Resources", Series::Text(resources)),
        ("Extracurricular_Activities", Series::Text(extracurricular)),
        ("Sleep_Hours", Series::Int(sleep)),
        ("Previous_Scores", Series::Int(previous)),
        ("Motivation_Level", Series::Text(motivation)),
        ("Internet_Access", Series::Text(internet)),
        ("Tutoring_Sessions", Series::Int(tutoring)),
        ("Family_Income", Series::Text(income)),
        ("Teacher_Quality", Series::Text(teacher)),
        ("School_Type", Series::Text(school)),
        ("Peer_Influence", Series::Text(peers)),
        ("Physical_Activity", Series::Int(activity)),
        ("Learning_Disabilities", Series::Text(disabilities)),
        ("Parental_Education_Level", Series::Text(education)),
        ("Distance_from_Home", Series::Text(distance)),
        ("Gender", Series::Text(gender)),
        ("Exam_Score", Series::Int(score)),
    ]
}

fn write_csv(path: &str, columns: &[(&str, Series)], rows: usize) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    writer.write_record(columns.iter().map(|(name, _)| *name))?;
    for row in 0..rows {
        writer.write_record(columns.iter().map(|(_, series)| series.cell(row)))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &str, columns: &[(&str, Series)]) -> Result<()> {
    let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) = columns
        .iter()
        .map(|(name, series)| {
            let (data_type, array) = series.to_arrow();
            (Field::new(*name, data_type, true), array)
        })
        .unzip();
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let rows: usize = match args.next() {
        Some(n) => n.parse().context("ROWS must be a whole number")?,
        None => 500,
    };
    let stem = args
        .next()
        .unwrap_or_else(|| "StudentPerformanceFactors".to_string());

    let mut rng = SimpleRng::new(42);
    let columns = generate(rows, &mut rng);

    let csv_path = format!("{stem}.csv");
    let parquet_path = format!("{stem}.parquet");
    write_csv(&csv_path, &columns, rows)?;
    write_parquet(&parquet_path, &columns)?;

    println!(
        "Wrote {rows} students ({} columns) to {csv_path} and {parquet_path}",
        columns.len()
    );
    Ok(())
}
