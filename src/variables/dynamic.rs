//! Dynamic variable generation
//!
//! Every call produces a fresh value; nothing is cached between resolution
//! passes.

use chrono::Utc;
use fake::faker::internet::en::{SafeEmail, Username};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::Fake;
use rand::Rng;
use uuid::Uuid;

use crate::models::{DynamicGenerator, DynamicVariable, GeneratorConstraints};

const DEFAULT_STRING_LENGTH: usize = 16;
const DEFAULT_HEX_LENGTH: usize = 32;

/// Generate a value for a dynamic variable, applying prefix and suffix
pub fn generate(variable: &DynamicVariable) -> String {
    let c = &variable.constraints;
    let value = generate_raw(variable.generator, c);
    format!(
        "{}{}{}",
        c.prefix.as_deref().unwrap_or(""),
        value,
        c.suffix.as_deref().unwrap_or("")
    )
}

fn generate_raw(generator: DynamicGenerator, c: &GeneratorConstraints) -> String {
    match generator {
        DynamicGenerator::Uuid => Uuid::new_v4().to_string(),
        DynamicGenerator::UuidV7 => Uuid::now_v7().to_string(),

        DynamicGenerator::RandomEmail => SafeEmail().fake::<String>(),
        DynamicGenerator::RandomName => Name().fake::<String>(),
        DynamicGenerator::RandomFirstName => FirstName().fake::<String>(),
        DynamicGenerator::RandomLastName => LastName().fake::<String>(),
        DynamicGenerator::RandomUsername => Username().fake::<String>(),

        DynamicGenerator::RandomInt => {
            let min = c.min.map(|v| v as i64).unwrap_or(0);
            let max = c.max.map(|v| v as i64).unwrap_or(i32::MAX as i64);
            let (min, max) = ordered(min, max);
            rand::rng().random_range(min..=max).to_string()
        }
        DynamicGenerator::RandomFloat => format!("{:.6}", random_float(c.min, c.max)),
        DynamicGenerator::RandomString => {
            random_alphanumeric(c.length.unwrap_or(DEFAULT_STRING_LENGTH))
        }
        DynamicGenerator::RandomHex => random_hex(c.length.unwrap_or(DEFAULT_HEX_LENGTH)),
        DynamicGenerator::RandomBool => rand::rng().random_bool(0.5).to_string(),

        DynamicGenerator::Timestamp => Utc::now().timestamp().to_string(),
        DynamicGenerator::TimestampMs => Utc::now().timestamp_millis().to_string(),
        DynamicGenerator::IsoDateTime => match c.format.as_deref() {
            Some(format) => format_now(format),
            None => Utc::now().to_rfc3339(),
        },
        DynamicGenerator::Date => format_now(c.format.as_deref().unwrap_or("%Y-%m-%d")),

        DynamicGenerator::Pick => {
            if c.options.is_empty() {
                String::new()
            } else {
                let idx = rand::rng().random_range(0..c.options.len());
                c.options[idx].clone()
            }
        }
    }
}

/// Format the current time; an invalid format string yields an empty value
fn format_now(format: &str) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    if write!(out, "{}", Utc::now().format(format)).is_err() {
        tracing::warn!(format, "invalid date format for dynamic variable");
        out.clear();
    }
    out
}

/// Uniform float in `[min, max)`; non-finite bounds fall back to `0.0..1.0`
fn random_float(min: Option<f64>, max: Option<f64>) -> f64 {
    let bound = |v: Option<f64>, default: f64| v.filter(|v| v.is_finite()).unwrap_or(default);
    let (min, max) = ordered(bound(min, 0.0), bound(max, 1.0));
    let span = max - min;
    let value = if span.is_finite() {
        min + rand::rng().random::<f64>() * span
    } else {
        // span overflows; interpolate without forming it
        let t = rand::rng().random::<f64>();
        min * (1.0 - t) + max * t
    };
    value.clamp(min, max)
}

fn ordered<T: PartialOrd>(a: T, b: T) -> (T, T) {
    if a <= b { (a, b) } else { (b, a) }
}

fn random_alphanumeric(len: usize) -> String {
    use rand::distr::Alphanumeric;
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn random_hex(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len / 2 + 1).map(|_| rng.random()).collect();
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..len].to_string()
}
