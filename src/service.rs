//! Query surface used by the HTTP layer
//!
//! Every operation that depends on "the current dataset" takes the caller's
//! [`Session`] explicitly; operations that move the pointer take it mutably.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::data_registry::DatasetStore;
use crate::models::{Dataset, DatasetSummary, EquipmentRecord, EquipmentType, SummaryStats};
use crate::parser::parse_equipment_csv;
use crate::report::ReportRenderer;
use crate::session::Session;
use crate::types::{AppError, AppResult};

pub const DEFAULT_DATASET_NAME: &str = "Uploaded Dataset";

/// A rendered report ready to be sent to the client
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub dataset_id: Uuid,
    pub file_name: String,
    pub content_type: mime::Mime,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct EquipmentService {
    store: DatasetStore,
    renderer: Arc<dyn ReportRenderer>,
    default_name: String,
}

impl EquipmentService {
    pub fn new(store: DatasetStore, renderer: Arc<dyn ReportRenderer>) -> Self {
        Self {
            store,
            renderer,
            default_name: DEFAULT_DATASET_NAME.to_string(),
        }
    }

    pub fn with_default_name(mut self, name: impl Into<String>) -> Self {
        self.default_name = name.into();
        self
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    /// Parse, ingest and make the new dataset current for `session`.
    ///
    /// Nothing is stored when the file is rejected.
    pub async fn upload(
        &self,
        session: &mut Session,
        file_name: &str,
        content: &[u8],
        name: Option<&str>,
    ) -> AppResult<Arc<Dataset>> {
        if !file_name.to_ascii_lowercase().ends_with(".csv") {
            return Err(AppError::InvalidRequest("File must be a CSV".to_string()));
        }

        let records = parse_equipment_csv(content).map_err(|err| {
            warn!(file_name, error = %err, "Rejected upload");
            err
        })?;

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(self.default_name.as_str());

        let dataset = self.store.ingest(name, file_name, records).await?;
        session.point_to(dataset.id);

        info!(dataset_id = %dataset.id, file_name, "Upload completed");
        Ok(dataset)
    }

    /// Records of the current dataset; empty when there is none.
    pub async fn current_records(&self, session: &Session) -> Vec<EquipmentRecord> {
        self.store
            .get_current(session)
            .await
            .map(|d| d.equipments.clone())
            .unwrap_or_default()
    }

    pub async fn current_summary(&self, session: &Session) -> AppResult<SummaryStats> {
        self.store
            .get_current(session)
            .await
            .map(|d| d.summary_stats.clone())
            .ok_or(AppError::NoActiveDataset)
    }

    pub async fn type_distribution(
        &self,
        session: &Session,
    ) -> AppResult<BTreeMap<EquipmentType, usize>> {
        Ok(self.current_summary(session).await?.equipment_type_distribution)
    }

    pub async fn history(&self) -> Vec<DatasetSummary> {
        self.store.list_history().await
    }

    pub async fn dataset(&self, id: Uuid) -> AppResult<Arc<Dataset>> {
        self.store.get(id).await
    }

    /// Make a historical dataset current for `session`.
    pub async fn select(&self, session: &mut Session, id: Uuid) -> AppResult<Arc<Dataset>> {
        self.store.set_current(session, id).await
    }

    pub fn render_report(&self, dataset: &Dataset) -> AppResult<RenderedReport> {
        Ok(RenderedReport {
            dataset_id: dataset.id,
            file_name: self.renderer.file_name(dataset),
            content_type: self.renderer.content_type(),
            bytes: self.renderer.render(dataset)?,
        })
    }

    pub async fn current_report(&self, session: &Session) -> AppResult<RenderedReport> {
        let dataset = self
            .store
            .get_current(session)
            .await
            .ok_or(AppError::NoActiveDataset)?;
        self.render_report(&dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_registry::HISTORY_LIMIT;
    use crate::models::Parameter;
    use crate::report::PdfReportRenderer;

    const TWO_PUMPS: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                             Pump-1,Pump,100,5,80\n\
                             Pump-2,pump,120,5.5,82\n";

    const MIXED: &str = "Equipment Name,Type,Flowrate,Pressure,Temperature\n\
                         C-1,Compressor,95,8.4,95\n\
                         V-1,Valve,60,4.1,105\n\
                         V-2,Valve,62,4.3,101\n";

    fn service() -> EquipmentService {
        EquipmentService::new(DatasetStore::in_memory(), Arc::new(PdfReportRenderer::new()))
    }

    #[tokio::test]
    async fn test_upload_sets_current() {
        let service = service();
        let mut session = Session::new();

        let dataset = service
            .upload(&mut session, "pumps.csv", TWO_PUMPS.as_bytes(), Some("Pumps"))
            .await
            .unwrap();

        assert_eq!(session.current_id(), Some(dataset.id));
        assert_eq!(dataset.name, "Pumps");

        let summary = service.current_summary(&session).await.unwrap();
        assert_eq!(summary.total_count, 2);
        assert_eq!(summary.parameter_stats[&Parameter::Flowrate].std, 10.0);

        let records = service.current_records(&session).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].equipment_name, "Pump-2");

        let distribution = service.type_distribution(&session).await.unwrap();
        assert_eq!(distribution, BTreeMap::from([(EquipmentType::Pump, 2)]));
    }

    #[tokio::test]
    async fn test_default_name() {
        let service = service().with_default_name("Untitled");
        let mut session = Session::new();
        let dataset = service
            .upload(&mut session, "a.CSV", TWO_PUMPS.as_bytes(), Some("   "))
            .await
            .unwrap();
        assert_eq!(dataset.name, "Untitled");
    }

    #[tokio::test]
    async fn test_no_active_dataset() {
        let service = service();
        let session = Session::new();

        assert!(service.current_records(&session).await.is_empty());
        assert!(matches!(
            service.current_summary(&session).await,
            Err(AppError::NoActiveDataset)
        ));
        assert!(matches!(
            service.type_distribution(&session).await,
            Err(AppError::NoActiveDataset)
        ));
        assert!(matches!(
            service.current_report(&session).await,
            Err(AppError::NoActiveDataset)
        ));
    }

    #[tokio::test]
    async fn test_empty_dataset_is_not_missing_dataset() {
        let service = service();
        let mut session = Session::new();
        service
            .upload(
                &mut session,
                "empty.csv",
                b"Equipment Name,Type,Flowrate,Pressure,Temperature\n",
                None,
            )
            .await
            .unwrap();

        assert_eq!(
            service.current_summary(&session).await.unwrap(),
            SummaryStats::default()
        );
    }

    #[tokio::test]
    async fn test_malformed_upload_persists_nothing() {
        let service = service();
        let mut session = Session::new();
        service
            .upload(&mut session, "ok.csv", TWO_PUMPS.as_bytes(), None)
            .await
            .unwrap();
        let before = service.history().await.len();
        let current = session.current_id();

        let missing_pressure = "Equipment Name,Type,Flowrate,Temperature\nPump-1,Pump,100,80\n";
        let result = service
            .upload(&mut session, "bad.csv", missing_pressure.as_bytes(), None)
            .await;

        assert!(matches!(result, Err(AppError::MalformedInput { row: 1, .. })));
        assert_eq!(service.history().await.len(), before);
        assert_eq!(session.current_id(), current);
    }

    #[tokio::test]
    async fn test_non_csv_file_is_rejected() {
        let service = service();
        let mut session = Session::new();
        let result = service
            .upload(&mut session, "pumps.xlsx", TWO_PUMPS.as_bytes(), None)
            .await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
        assert!(service.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_select_historical_dataset_restores_its_summary() {
        let service = service();
        let mut session = Session::new();

        let pumps = service
            .upload(&mut session, "pumps.csv", TWO_PUMPS.as_bytes(), None)
            .await
            .unwrap();
        let mixed = service
            .upload(&mut session, "mixed.csv", MIXED.as_bytes(), None)
            .await
            .unwrap();
        assert_eq!(session.current_id(), Some(mixed.id));

        let selected = service.select(&mut session, pumps.id).await.unwrap();
        assert_eq!(selected.id, pumps.id);
        assert_eq!(session.current_id(), Some(pumps.id));
        assert_eq!(
            service.current_summary(&session).await.unwrap(),
            pumps.summary_stats
        );
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let service = service();
        let mut alice = Session::new();
        let bob = Session::new();

        service
            .upload(&mut alice, "pumps.csv", TWO_PUMPS.as_bytes(), None)
            .await
            .unwrap();

        assert!(service.current_summary(&alice).await.is_ok());
        assert!(service.current_summary(&bob).await.is_err());
        assert_eq!(service.history().await.len(), 1);
    }

    #[tokio::test]
    async fn test_sixth_upload_evicts_first() {
        let service = service();
        let mut session = Session::new();
        let first = service
            .upload(&mut session, "first.csv", TWO_PUMPS.as_bytes(), None)
            .await
            .unwrap();
        for _ in 0..HISTORY_LIMIT {
            service
                .upload(&mut session, "next.csv", MIXED.as_bytes(), None)
                .await
                .unwrap();
        }

        assert_eq!(service.history().await.len(), HISTORY_LIMIT);
        assert!(matches!(
            service.dataset(first.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.select(&mut session, first.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_current_report() {
        let service = service();
        let mut session = Session::new();
        let dataset = service
            .upload(&mut session, "pumps.csv", TWO_PUMPS.as_bytes(), None)
            .await
            .unwrap();

        let report = service.current_report(&session).await.unwrap();
        assert_eq!(report.dataset_id, dataset.id);
        assert_eq!(report.content_type, mime::APPLICATION_PDF);
        assert_eq!(report.file_name, format!("equipment_report_{}.pdf", dataset.id));
        assert!(report.bytes.starts_with(b"%PDF"));
    }
}
