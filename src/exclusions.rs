//! Exclusion ledger.
//!
//! Every stage that drops records hands its exclusions here; the ledger
//! concatenates them in stage order, preserving the order records were
//! rejected within each stage. Nothing is deduplicated — a record can only
//! reach one stage's exclusion stream because later stages never see it.

use tracing::info;

use crate::records::ExclusionRecord;

/// Merges the cleaning-stage and feature-stage exclusion streams into the
/// single audit sequence written to the exclusion log.
pub fn merge_exclusions(
    cleaning: Vec<ExclusionRecord>,
    feature_engineering: Vec<ExclusionRecord>,
) -> Vec<ExclusionRecord> {
    let mut merged = cleaning;
    merged.extend(feature_engineering);

    if merged.is_empty() {
        info!("No excluded records");
    } else {
        info!(count = merged.len(), "Exclusion ledger assembled");
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{PipelineStage, RawTripRecord};

    fn exclusion(pickup: &str, reason: &str, stage: PipelineStage) -> ExclusionRecord {
        let mut record = ExclusionRecord::from_raw(
            &RawTripRecord {
                pickup_datetime: pickup.to_string(),
                ..Default::default()
            },
            reason,
        );
        record.stage = stage;
        record
    }

    #[test]
    fn test_stage_order_then_record_order() {
        let cleaning = vec![
            exclusion("a", "temporal-order", PipelineStage::Cleaning),
            exclusion("b", "duplicate-detection", PipelineStage::Cleaning),
        ];
        let features = vec![exclusion(
            "c",
            "non-positive-duration",
            PipelineStage::FeatureEngineering,
        )];

        let merged = merge_exclusions(cleaning, features);
        let order: Vec<&str> = merged.iter().map(|e| e.pickup_datetime.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
        assert_eq!(merged[2].stage, PipelineStage::FeatureEngineering);
    }

    #[test]
    fn test_empty_streams() {
        assert!(merge_exclusions(Vec::new(), Vec::new()).is_empty());
    }
}
