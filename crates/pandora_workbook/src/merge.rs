//! Join included variants, summary and interpretations into storable rows.

use crate::spec::{
    SpecAcgsConfig, SpecIncludedVariant, SpecInterpretationRecord, SpecMergedVariantRecord,
    SpecSummaryRecord,
};
use crate::util::relabel_classification;

/// Cross join included × summary, then left join interpretations on HGVSc.
///
/// A variant matched by several interpretation sheets yields one row per
/// match; an unmatched variant yields one row without interpretation.
/// Classification labels are remapped to submission casing.
pub fn merge_records(
    included: &[SpecIncludedVariant],
    summary: &SpecSummaryRecord,
    interpretations: &[SpecInterpretationRecord],
    acgs: &SpecAcgsConfig,
) -> Vec<SpecMergedVariantRecord> {
    let mut l_merged = Vec::with_capacity(included.len());
    for variant in included {
        let l_matches: Vec<&SpecInterpretationRecord> = match variant.hgvsc.as_deref() {
            Some(hgvsc) => interpretations
                .iter()
                .filter(|interp| interp.hgvsc.as_deref() == Some(hgvsc))
                .collect(),
            None => Vec::new(),
        };

        if l_matches.is_empty() {
            l_merged.push(SpecMergedVariantRecord {
                variant: variant.clone(),
                summary: summary.clone(),
                interpretation: None,
            });
            continue;
        }

        for interp in l_matches {
            let mut interp = interp.clone();
            interp.germline_classification = interp
                .germline_classification
                .as_deref()
                .map(|label| relabel_classification(label, acgs));
            l_merged.push(SpecMergedVariantRecord {
                variant: variant.clone(),
                summary: summary.clone(),
                interpretation: Some(interp),
            });
        }
    }
    l_merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::derive_default_acgs;

    fn variant(hgvsc: Option<&str>, local_id: &str) -> SpecIncludedVariant {
        SpecIncludedVariant {
            hgvsc: hgvsc.map(str::to_string),
            local_id: local_id.to_string(),
            linking_id: local_id.to_string(),
            ..Default::default()
        }
    }

    fn interpretation(hgvsc: &str, classification: &str) -> SpecInterpretationRecord {
        SpecInterpretationRecord {
            hgvsc: Some(hgvsc.to_string()),
            germline_classification: Some(classification.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_left_join_and_relabel() {
        let acgs = derive_default_acgs();
        let summary = SpecSummaryRecord {
            r_code: "R141".to_string(),
            ..Default::default()
        };
        let l_included = vec![
            variant(Some("c.1A>G"), "uid_a"),
            variant(Some("c.2C>T"), "uid_b"),
            variant(None, "uid_c"),
        ];
        let l_interps = vec![interpretation("c.1A>G", "Uncertain Significance")];

        let l_merged = merge_records(&l_included, &summary, &l_interps, &acgs);
        assert_eq!(l_merged.len(), 3);
        assert_eq!(
            l_merged[0].germline_classification(),
            Some("Uncertain significance")
        );
        assert_eq!(l_merged[1].interpretation, None);
        assert_eq!(l_merged[2].interpretation, None);
        assert!(l_merged.iter().all(|row| row.summary.r_code == "R141"));
        assert_eq!(l_merged[1].variant.local_id, "uid_b");
    }

    #[test]
    fn test_merge_fans_out_on_repeated_hgvsc() {
        let acgs = derive_default_acgs();
        let l_included = vec![variant(Some("c.1A>G"), "uid_a")];
        let l_interps = vec![
            interpretation("c.1A>G", "Benign"),
            interpretation("c.1A>G", "Likely Benign"),
        ];
        let l_merged = merge_records(&l_included, &SpecSummaryRecord::default(), &l_interps, &acgs);
        assert_eq!(l_merged.len(), 2);
        assert_eq!(l_merged[1].germline_classification(), Some("Likely benign"));
    }
}
