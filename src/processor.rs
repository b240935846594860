//! One-pass request pipeline: inference, recovery, mapping, commit.

use log::{debug, error, info};
use serde::{Serialize, Serializer};

use crate::error::{LedgerError, Result};
use crate::llm::prompts::instruction_for;
use crate::llm::VisionModel;
use crate::mapping::{CellWrite, FieldMapping};
use crate::parsing::TrailingMinus;
use crate::reports::ReportValues;
use crate::schema::{DayIdentifier, ExtractionResult, ReportImage, ReportType};
use crate::workbook::WorkbookStore;

/// The last pipeline stage a request completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    InferenceRequested,
    ResponseRecovered,
    ValuesResolved,
    SheetLocated,
    CellsWritten,
    Committed,
}

#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub report: ReportType,
    pub day: DayIdentifier,
    pub images: Vec<ReportImage>,
    /// Stop after the values are resolved; the workbook is never opened.
    pub dry_run: bool,
}

impl ReportRequest {
    pub fn new(report: ReportType, day: DayIdentifier, primary: ReportImage) -> Self {
        Self {
            report,
            day,
            images: vec![primary],
            dry_run: false,
        }
    }

    pub fn with_image(mut self, image: ReportImage) -> Self {
        self.images.push(image);
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.images.is_empty() {
            return Err(LedgerError::InputValidation(format!(
                "A {} request needs an image",
                self.report
            )));
        }
        let max = self.report.max_images();
        if self.images.len() > max {
            return Err(LedgerError::InputValidation(format!(
                "A {} request accepts at most {} image(s), got {}",
                self.report,
                max,
                self.images.len()
            )));
        }
        if let Some(empty) = self.images.iter().find(|img| img.bytes.is_empty()) {
            return Err(LedgerError::InputValidation(format!(
                "Image '{}' is empty",
                empty.name
            )));
        }
        Ok(())
    }
}

/// What happened to one request. Extraction and persistence succeed or fail
/// independently: `extraction` is filled in even when the commit fails.
#[derive(Debug, Serialize)]
pub struct ProcessingOutcome {
    /// `None` only for requests rejected before they could be built.
    pub report: Option<ReportType>,
    pub day: Option<DayIdentifier>,
    pub success: bool,
    pub stage: Stage,
    pub extraction: Option<ExtractionResult>,
    pub raw_responses: Vec<String>,
    pub sheet: Option<String>,
    pub writes: Vec<CellWrite>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<LedgerError>,
}

impl ProcessingOutcome {
    fn received(request: &ReportRequest) -> Self {
        Self {
            report: Some(request.report),
            day: Some(request.day),
            success: false,
            stage: Stage::Received,
            extraction: None,
            raw_responses: Vec::new(),
            sheet: None,
            writes: Vec::new(),
            error: None,
        }
    }

    /// A failed outcome for input that never became a [`ReportRequest`]:
    /// an unknown report type, a bad day number or an unreadable image.
    pub fn rejected(
        report: Option<ReportType>,
        day: Option<DayIdentifier>,
        error: LedgerError,
    ) -> Self {
        Self {
            report,
            day,
            success: false,
            stage: Stage::Received,
            extraction: None,
            raw_responses: Vec::new(),
            sheet: None,
            writes: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

fn serialize_error<S: Serializer>(
    error: &Option<LedgerError>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct ErrorView {
        kind: crate::error::ErrorKind,
        message: String,
    }

    error
        .as_ref()
        .map(|e| ErrorView {
            kind: e.kind(),
            message: e.to_string(),
        })
        .serialize(serializer)
}

/// Dispatches report requests through the model and into the workbook.
pub struct ReportProcessor<M> {
    model: M,
    store: WorkbookStore,
    policy: TrailingMinus,
    serialize_writes: bool,
}

impl<M: VisionModel> ReportProcessor<M> {
    pub fn new(model: M, store: WorkbookStore) -> Self {
        Self {
            model,
            store,
            policy: TrailingMinus::default(),
            serialize_writes: true,
        }
    }

    pub fn with_trailing_minus(mut self, policy: TrailingMinus) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_serialized_writes(mut self, enabled: bool) -> Self {
        self.serialize_writes = enabled;
        self
    }

    pub fn store(&self) -> &WorkbookStore {
        &self.store
    }

    /// Runs one request to completion. Never panics on bad input; every
    /// failure is reported through [`ProcessingOutcome::error`].
    pub async fn process(&self, request: ReportRequest) -> ProcessingOutcome {
        let mut outcome = ProcessingOutcome::received(&request);

        match self.run(&request, &mut outcome).await {
            Ok(()) => {
                outcome.success = true;
                info!(
                    "{} request for day {} finished at {:?} ({} cell(s) written)",
                    request.report,
                    request.day,
                    outcome.stage,
                    outcome.writes.len()
                );
            }
            Err(e) => {
                error!(
                    "{} request for day {} failed after {:?}: {}",
                    request.report, request.day, outcome.stage, e
                );
                outcome.error = Some(e);
            }
        }

        outcome
    }

    /// Runs requests one after another, in order, against the same store.
    pub async fn process_all(&self, requests: Vec<ReportRequest>) -> Vec<ProcessingOutcome> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            outcomes.push(self.process(request).await);
        }
        outcomes
    }

    async fn run(&self, request: &ReportRequest, outcome: &mut ProcessingOutcome) -> Result<()> {
        request.validate()?;

        let instruction = instruction_for(request.report, request.images.len());
        for image in &request.images {
            let text = self.model.describe(instruction, image).await?;
            debug!("Raw response for {}: {}", image.name, text);
            outcome.raw_responses.push(text);
        }
        outcome.stage = Stage::InferenceRequested;

        let values = ReportValues::decode(request.report, &outcome.raw_responses, self.policy);
        let extraction = values.to_extraction();
        outcome.extraction = Some(extraction.clone());
        outcome.stage = Stage::ResponseRecovered;

        // Recovered values that map to no cell leave the workbook closed.
        let writes = FieldMapping::for_report(request.report).plan(&extraction)?;
        if writes.is_empty() {
            return Err(LedgerError::ExtractionNotFound {
                report: request.report,
                raw_response: outcome.raw_responses.join("\n---\n"),
            });
        }
        outcome.stage = Stage::ValuesResolved;

        if request.dry_run {
            return Ok(());
        }

        let _guard = if self.serialize_writes {
            Some(self.store.lock().await)
        } else {
            None
        };

        let mut workbook = self.store.load().await?;
        {
            let mut sheet = workbook.sheet_for_day(request.day)?;
            outcome.sheet = Some(sheet.name().to_string());
            outcome.stage = Stage::SheetLocated;
            sheet.apply(&writes);
        }
        outcome.writes = writes;
        outcome.stage = Stage::CellsWritten;

        self.store.save(workbook).await?;
        outcome.stage = Stage::Committed;
        Ok(())
    }
}

#[cfg(feature = "gemini")]
impl ReportProcessor<crate::llm::GeminiClient> {
    /// Builds a Gemini-backed processor from configuration.
    pub fn from_config(config: &crate::config::LedgerConfig) -> Result<Self> {
        let client = crate::llm::GeminiClient::new(config.api_key.clone())?
            .with_model(config.model.clone());
        let store = WorkbookStore::new(config.workbook_path.clone())
            .with_backup(config.backup_on_save);
        Ok(Self::new(client, store)
            .with_trailing_minus(config.trailing_minus)
            .with_serialized_writes(config.serialize_writes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(bytes: &[u8]) -> ReportImage {
        ReportImage::new("page.jpg", "image/jpeg", bytes.to_vec())
    }

    fn day(n: u32) -> DayIdentifier {
        DayIdentifier::new(n).unwrap()
    }

    #[test]
    fn test_request_validation() {
        let ok = ReportRequest::new(ReportType::Day1, day(3), image(b"x"));
        assert!(ok.validate().is_ok());

        let too_many = ok.clone().with_image(image(b"y"));
        assert!(matches!(
            too_many.validate(),
            Err(LedgerError::InputValidation(_))
        ));

        let lotto_end = ReportRequest::new(ReportType::HandwrittenLottoEnd, day(3), image(b"x"))
            .with_image(image(b"y"));
        assert!(lotto_end.validate().is_ok());

        let empty = ReportRequest::new(ReportType::Batch, day(3), image(b""));
        assert!(empty.validate().is_err());

        let mut none = ReportRequest::new(ReportType::Batch, day(3), image(b"x"));
        none.images.clear();
        assert!(none.validate().is_err());
    }

    #[test]
    fn test_stages_are_ordered() {
        assert!(Stage::Received < Stage::InferenceRequested);
        assert!(Stage::ValuesResolved < Stage::SheetLocated);
        assert!(Stage::CellsWritten < Stage::Committed);
    }

    #[test]
    fn test_rejected_outcome_serializes_without_request() {
        let outcome = ProcessingOutcome::rejected(
            None,
            Some(day(4)),
            LedgerError::InputValidation("Unknown report type 'weekly'".to_string()),
        );
        assert!(!outcome.is_success());
        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json["report"].is_null());
        assert_eq!(json["day"], 4);
        assert_eq!(json["stage"], "received");
        assert_eq!(json["error"]["kind"], "input_validation");
    }
}
