//! Report output.

use std::fs::File;
use std::io::{BufReader, BufWriter};

use serde::{Deserialize, Serialize};

use metcore::annotate::candidate::RankedAnnotation;
use metcore::data::taxonomy::TaxonMatch;

use crate::error::MetannotError;

/// Network placement of one feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureComponent {
    pub feature_id: u32,
    /// Component id in the similarity network, -1 for singletons.
    pub component_id: i32,
}

/// Everything the pipeline produces for one sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleReport {
    pub sample_name: String,
    pub polarity: String,
    /// Resolved taxon of the sample organism, when a match was found.
    pub organism: Option<TaxonMatch>,
    pub components: Vec<FeatureComponent>,
    /// Ranked annotation records, task order by feature, rank 1 first.
    pub annotations: Vec<RankedAnnotation>,
}

pub fn save_report(path: &str, report: &SampleReport) -> Result<(), MetannotError> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

pub fn load_report(path: &str) -> Result<SampleReport, MetannotError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use metcore::annotate::candidate::EvidenceSource;

    #[test]
    fn test_report_roundtrip() {
        let report = SampleReport {
            sample_name: "VGF151_E05".to_string(),
            polarity: "pos".to_string(),
            organism: None,
            components: vec![FeatureComponent { feature_id: 1, component_id: -1 }],
            annotations: vec![RankedAnnotation {
                feature_id: 1,
                reference_structure_id: Some("WQZGKKKJIJFFOK".to_string()),
                combined_score: 0.875,
                evidence_source: EvidenceSource::Isdb,
                rank: 1,
            }],
        };
        let path = std::env::temp_dir()
            .join(format!("metannot-report-{}.json", std::process::id()));

        save_report(path.to_str().unwrap(), &report).unwrap();
        let loaded = load_report(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.sample_name, report.sample_name);
        assert_eq!(loaded.annotations.len(), 1);
        assert_eq!(loaded.annotations[0].evidence_source, EvidenceSource::Isdb);

        // the evidence source serializes under its conventional name
        let text = serde_json::to_string(&loaded.annotations[0]).unwrap();
        assert!(text.contains("\"ISDB\""));
    }
}
