//! Provider-supplied locality records.
//!
//! The provider is loose with shapes: the locality list may be absent, a
//! single object, or an array; the suburb name arrives under either
//! `location` or `suburb`; coordinates may be numbers or numeric strings.
//! Everything here normalizes those shapes into `Vec<Locality>` with
//! `Option<f64>` coordinates.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One locality within a postcode/state, as returned by the provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Locality {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub postcode: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    suburb: Option<String>,
}

impl Locality {
    /// The locality's name, whichever field the provider used.
    #[must_use]
    pub fn suburb_name(&self) -> &str {
        self.location
            .as_deref()
            .or(self.suburb.as_deref())
            .unwrap_or_default()
    }

    /// Build a locality carrying its name in the `suburb` field.
    #[must_use]
    pub fn named(name: &str, state: &str) -> Self {
        Self {
            state: state.to_string(),
            suburb: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// Build a locality carrying its name in the aliased `location` field.
    #[must_use]
    pub fn located(name: &str, state: &str) -> Self {
        Self {
            state: state.to_string(),
            location: Some(name.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }
}

/// The provider's response envelope.
#[derive(Debug, Default, Deserialize)]
pub struct ProviderPayload {
    #[serde(default)]
    localities: Option<LocalityEnvelope>,
}

#[derive(Debug, Deserialize)]
struct LocalityEnvelope {
    #[serde(default)]
    locality: Option<OneOrMany>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Locality>),
    One(Box<Locality>),
}

impl ProviderPayload {
    /// Flatten the absent/null/single/array shapes into a plain list.
    #[must_use]
    pub fn into_localities(self) -> Vec<Locality> {
        match self.localities.and_then(|envelope| envelope.locality) {
            Some(OneOrMany::Many(localities)) => localities,
            Some(OneOrMany::One(locality)) => vec![*locality],
            None => Vec::new(),
        }
    }
}

/// Accept numbers and numeric strings; anything else becomes `None`.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_f64))
}

fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Accept strings and bare numbers for the postcode field.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|value| match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }))
}
