//! Session event log.
//!
//! Every acquisition, publish, discard and export is recorded as a
//! `DeskEvent`. Variants are added over time — never removed or reordered.

use crate::{
    analysis::Provenance,
    types::{AnalysisId, RequestId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeskEvent {
    AcquisitionStarted {
        request_id: RequestId,
        source:     String,
    },
    AcquisitionFellBack {
        request_id: RequestId,
        reason:     String,
    },
    AnalysisPublished {
        request_id:       RequestId,
        analysis_id:      AnalysisId,
        provenance:       Provenance,
        total:            usize,
        suspicious_count: usize,
    },
    AcquisitionSuperseded {
        request_id: RequestId,
        latest:     RequestId,
    },
    BatchRejected {
        request_id: RequestId,
        reason:     String,
    },
    UploadRejected {
        file_name: String,
    },
    ExportProduced {
        analysis_id: AnalysisId,
        rows:        usize,
    },
}

impl DeskEvent {
    /// Stable name for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::AcquisitionStarted { .. }    => "acquisition_started",
            Self::AcquisitionFellBack { .. }   => "acquisition_fell_back",
            Self::AnalysisPublished { .. }     => "analysis_published",
            Self::AcquisitionSuperseded { .. } => "acquisition_superseded",
            Self::BatchRejected { .. }         => "batch_rejected",
            Self::UploadRejected { .. }        => "upload_rejected",
            Self::ExportProduced { .. }        => "export_produced",
        }
    }
}
