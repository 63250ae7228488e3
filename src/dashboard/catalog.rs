//! Display shapes for the equipment and antenna catalogs.
//!
//! Catalog documents were entered by hand over several dashboard versions,
//! so field names vary between English and Spanish and numbers are sometimes
//! stored as strings. The mappers reuse the normalizer's alias machinery.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::records::fields::Sources;

/// Shown when a catalog document carries no usable name.
pub const UNNAMED: &str = "(sin nombre)";

const NAME: &[&str] = &["name", "Name", "nombre", "Nombre", "title", "titulo"];
const DESCRIPTION: &[&str] = &["description", "Description", "descripcion", "Descripcion"];
const PRICE: &[&str] = &["price", "Price", "precio", "Precio"];
const STOCK: &[&str] = &["stock", "Stock", "quantity", "cantidad", "existencias"];
const IMAGE: &[&str] = &["imageUrl", "image", "imagen", "img", "foto"];
const BRAND: &[&str] = &["brand", "Brand", "marca", "Marca"];
const MODEL: &[&str] = &["model", "Model", "modelo", "Modelo"];
const CATEGORY: &[&str] = &["category", "type", "categoria", "tipo"];
const FREQUENCY: &[&str] = &["frequency", "Frequency", "frecuencia", "Frecuencia", "band", "banda"];
const GAIN: &[&str] = &["gain", "gainDbi", "Gain", "ganancia", "Ganancia"];
const RANGE: &[&str] = &["range", "rangeKm", "Range", "alcance", "Alcance", "cobertura"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentView {
    pub id: String,
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AntennaView {
    pub id: String,
    pub name: String,
    pub model: Option<String>,
    pub frequency: Option<String>,
    pub gain_dbi: Option<f64>,
    pub range_km: Option<f64>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub description: Option<String>,
}

/// Map a stored equipment document. Non-object bodies yield `None`.
#[must_use]
pub fn equipment_view(id: &str, doc: &Value) -> Option<EquipmentView> {
    let sources = Sources::new(doc.as_object()?);
    Some(EquipmentView {
        id: id.to_string(),
        name: display_name(&sources),
        brand: sources.first_text(BRAND),
        model: sources.first_text(MODEL),
        category: sources.first_text(CATEGORY),
        description: sources.first_text(DESCRIPTION),
        price: sources.first_number(PRICE),
        stock: whole_number(&sources, STOCK),
        image_url: sources.first_text(IMAGE),
    })
}

/// Map a stored antenna document. Non-object bodies yield `None`.
#[must_use]
pub fn antenna_view(id: &str, doc: &Value) -> Option<AntennaView> {
    let sources = Sources::new(doc.as_object()?);
    Some(AntennaView {
        id: id.to_string(),
        name: display_name(&sources),
        model: sources.first_text(MODEL),
        frequency: sources.first_text(FREQUENCY),
        gain_dbi: sources.first_number(GAIN),
        range_km: sources.first_number(RANGE),
        price: sources.first_number(PRICE),
        stock: whole_number(&sources, STOCK),
        description: sources.first_text(DESCRIPTION),
    })
}

fn display_name(sources: &Sources<'_>) -> String {
    sources
        .first_text(NAME)
        .unwrap_or_else(|| UNNAMED.to_string())
}

#[allow(clippy::cast_possible_truncation)]
fn whole_number(sources: &Sources<'_>, aliases: &'static [&'static str]) -> Option<i64> {
    sources
        .first_number(aliases)
        .filter(|n| n.abs() < 9.0e15)
        .map(|n| n.trunc() as i64)
}
