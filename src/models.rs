use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::Config;
use crate::service::EquipmentService;
use crate::session::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub service: EquipmentService,
    pub sessions: SessionRegistry,
}

/// Equipment categories accepted in the `Type` column.
///
/// Variant order is the order used for distribution maps and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum EquipmentType {
    Pump,
    Compressor,
    Valve,
    HeatExchanger,
    Reactor,
    Condenser,
}

impl EquipmentType {
    pub const ALL: [EquipmentType; 6] = [
        EquipmentType::Pump,
        EquipmentType::Compressor,
        EquipmentType::Valve,
        EquipmentType::HeatExchanger,
        EquipmentType::Reactor,
        EquipmentType::Condenser,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EquipmentType::Pump => "Pump",
            EquipmentType::Compressor => "Compressor",
            EquipmentType::Valve => "Valve",
            EquipmentType::HeatExchanger => "HeatExchanger",
            EquipmentType::Reactor => "Reactor",
            EquipmentType::Condenser => "Condenser",
        }
    }
}

impl fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Matches case-insensitively, ignoring spaces, underscores and dashes
/// ("heat exchanger" -> `HeatExchanger`).
impl FromStr for EquipmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "pump" => Ok(EquipmentType::Pump),
            "compressor" => Ok(EquipmentType::Compressor),
            "valve" => Ok(EquipmentType::Valve),
            "heatexchanger" => Ok(EquipmentType::HeatExchanger),
            "reactor" => Ok(EquipmentType::Reactor),
            "condenser" => Ok(EquipmentType::Condenser),
            _ => Err(format!("unknown equipment type \"{}\"", s)),
        }
    }
}

/// Numeric columns summarized per dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parameter {
    Flowrate,
    Pressure,
    Temperature,
}

impl Parameter {
    pub const ALL: [Parameter; 3] = [Parameter::Flowrate, Parameter::Pressure, Parameter::Temperature];

    pub fn label(&self) -> &'static str {
        match self {
            Parameter::Flowrate => "Flowrate",
            Parameter::Pressure => "Pressure",
            Parameter::Temperature => "Temperature",
        }
    }

    pub fn value_of(&self, record: &EquipmentRecord) -> f64 {
        match self {
            Parameter::Flowrate => record.flowrate,
            Parameter::Pressure => record.pressure,
            Parameter::Temperature => record.temperature,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EquipmentRecord {
    pub equipment_name: String,
    pub equipment_type: EquipmentType,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParameterStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation (divides by N).
    pub std: f64,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SummaryStats {
    pub total_count: usize,
    pub equipment_type_distribution: BTreeMap<EquipmentType, usize>,
    pub parameter_stats: BTreeMap<Parameter, ParameterStats>,
}

/// One uploaded CSV: its records in upload order plus the statistics
/// computed when it was ingested.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Dataset {
    pub id: uuid::Uuid,
    pub name: String,
    pub file_name: String,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
    pub equipments: Vec<EquipmentRecord>,
    pub summary_stats: SummaryStats,
}

/// History listing entry (a dataset without its records)
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DatasetSummary {
    pub id: uuid::Uuid,
    pub name: String,
    pub file_name: String,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
    pub summary_stats: SummaryStats,
}

impl From<&Dataset> for DatasetSummary {
    fn from(dataset: &Dataset) -> Self {
        Self {
            id: dataset.id,
            name: dataset.name.clone(),
            file_name: dataset.file_name.clone(),
            uploaded_at: dataset.uploaded_at,
            summary_stats: dataset.summary_stats.clone(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub storage: String,
    pub datasets: usize,
}
