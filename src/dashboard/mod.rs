//! Dashboard data mapping for catalog collections.

pub mod catalog;

pub use catalog::{AntennaView, EquipmentView, antenna_view, equipment_view};
