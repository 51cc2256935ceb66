//! Versioned rewrite rules applied to submission payloads.

use log::debug;
use pandora_workbook::{EnumSubmissionTransformConfig, SpecDrugResponseConfig};

use crate::clinvar::{SpecClinvarSubmission, SpecCondition, SpecSubmissionCandidate};

/// A rule that rewrites selected submissions before they are sent.
pub trait SubmissionTransform {
    /// Stable rule identifier, e.g. `drug_response.v1`.
    fn version(&self) -> &str;

    fn applies_to(&self, candidate: &SpecSubmissionCandidate) -> bool;

    fn apply(&self, candidate: &SpecSubmissionCandidate, payload: &mut SpecClinvarSubmission);
}

/// Drug-response indications submit a fixed description and condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDrugResponseRule {
    config: SpecDrugResponseConfig,
}

impl SpecDrugResponseRule {
    pub const VERSION: &'static str = "drug_response.v1";

    pub fn new(config: SpecDrugResponseConfig) -> Self {
        Self { config }
    }
}

impl SubmissionTransform for SpecDrugResponseRule {
    fn version(&self) -> &str {
        Self::VERSION
    }

    /// Matches the configured code exactly or any of its versions (`R444.1`).
    fn applies_to(&self, candidate: &SpecSubmissionCandidate) -> bool {
        let code = self.config.code.as_str();
        candidate.indication_codes().into_iter().any(|c| {
            c == code
                || c.strip_prefix(code)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    fn apply(&self, candidate: &SpecSubmissionCandidate, payload: &mut SpecClinvarSubmission) {
        payload.clinical_significance.clinical_significance_description =
            Some(self.config.classification_description.clone());
        payload.condition_set.condition = vec![SpecCondition {
            name: Some(self.config.condition_name.clone()),
        }];
        if let Some(comment) = &self.config.comment {
            payload.clinical_significance.comment = Some(comment.clone());
        }
    }
}

/// Instantiate configured rules in order.
pub fn derive_submission_transforms(
    configs: &[EnumSubmissionTransformConfig],
) -> Vec<Box<dyn SubmissionTransform>> {
    configs
        .iter()
        .map(|config| match config {
            EnumSubmissionTransformConfig::DrugResponseV1(inner) => {
                Box::new(SpecDrugResponseRule::new(inner.clone())) as Box<dyn SubmissionTransform>
            }
        })
        .collect()
}

/// Apply every matching rule, in order.
pub fn apply_submission_transforms(
    transforms: &[Box<dyn SubmissionTransform>],
    candidate: &SpecSubmissionCandidate,
    payload: &mut SpecClinvarSubmission,
) {
    for transform in transforms {
        if transform.applies_to(candidate) {
            debug!("Applying {} to {}", transform.version(), candidate.local_id);
            transform.apply(candidate, payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinvar::derive_clinvar_submission;

    fn rule_config() -> SpecDrugResponseConfig {
        SpecDrugResponseConfig {
            code: "R444".to_string(),
            classification_description: "drug response".to_string(),
            condition_name: "Platinum-based chemotherapy response".to_string(),
            comment: None,
        }
    }

    fn candidate(r_code: &str) -> SpecSubmissionCandidate {
        SpecSubmissionCandidate {
            local_id: "uid_a".to_string(),
            r_code: Some(r_code.to_string()),
            germline_classification: Some("Pathogenic".to_string()),
            comment_on_classification: Some("PVS1".to_string()),
            preferred_condition_name: Some("Breast cancer".to_string()),
            ref_genome: Some("GRCh38.p13".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn drug_response_rule_matches_code_versions_only() {
        let rule = SpecDrugResponseRule::new(rule_config());
        assert_eq!(rule.version(), "drug_response.v1");
        assert!(rule.applies_to(&candidate("R444")));
        assert!(rule.applies_to(&candidate("R208.1;R444.1")));
        assert!(!rule.applies_to(&candidate("R4440")));
        assert!(!rule.applies_to(&candidate("R208.1")));
    }

    #[test]
    fn configured_transforms_rewrite_matching_payloads() {
        let l_transforms = derive_submission_transforms(&[
            EnumSubmissionTransformConfig::DrugResponseV1(rule_config()),
        ]);
        let ref_genomes = vec!["GRCh38.p13".to_string()];

        let matched = candidate("R444.1");
        let mut payload = derive_clinvar_submission(&matched, &ref_genomes).unwrap();
        apply_submission_transforms(&l_transforms, &matched, &mut payload);
        assert_eq!(
            payload.clinical_significance.clinical_significance_description.as_deref(),
            Some("drug response")
        );
        assert_eq!(
            payload.condition_set.condition[0].name.as_deref(),
            Some("Platinum-based chemotherapy response")
        );
        assert_eq!(payload.clinical_significance.comment.as_deref(), Some("PVS1"));

        let other = candidate("R208.1");
        let mut payload = derive_clinvar_submission(&other, &ref_genomes).unwrap();
        apply_submission_transforms(&l_transforms, &other, &mut payload);
        assert_eq!(
            payload.clinical_significance.clinical_significance_description.as_deref(),
            Some("Pathogenic")
        );
    }
}
