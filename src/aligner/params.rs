use serde::{Deserialize, Serialize};

use super::ReadsLayout;
use crate::repertoire::{GeneFeature, GeneRecord, GeneType};
use crate::runtime::Error;

pub const PRESETS: [&str; 3] = ["default", "rna-seq", "amplicon"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneAlignerParameters {
    pub gene_feature_to_align: GeneFeature,
    pub seed_length: usize,
    pub min_score: f32,
    pub relative_min_score: f32,
    pub max_hits: usize,
}

impl GeneAlignerParameters {
    fn new(gene_feature_to_align: GeneFeature, seed_length: usize, min_score: f32) -> Self {
        GeneAlignerParameters {
            gene_feature_to_align,
            seed_length,
            min_score,
            relative_min_score: 0.9,
            max_hits: 5,
        }
    }
}

/// Parameters of the aligner. Mutated only while calibrating, frozen
/// (behind an `Arc`) for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentParameters {
    pub v_parameters: GeneAlignerParameters,
    pub d_parameters: Option<GeneAlignerParameters>,
    pub j_parameters: GeneAlignerParameters,
    pub c_parameters: Option<GeneAlignerParameters>,
    pub reads_layout: ReadsLayout,
    pub merge_reads: bool,
    pub min_merge_overlap: usize,
    pub save_original_reads: bool,
    pub allow_partial_alignments: bool,
}

impl Default for AlignmentParameters {
    fn default() -> Self {
        AlignmentParameters {
            v_parameters: GeneAlignerParameters::new(
                GeneFeature::VTranscriptWithout5UTRWithP,
                12,
                150.0,
            ),
            d_parameters: Some(GeneAlignerParameters::new(GeneFeature::DRegion, 6, 30.0)),
            j_parameters: GeneAlignerParameters::new(GeneFeature::JRegion, 8, 60.0),
            c_parameters: Some(GeneAlignerParameters::new(GeneFeature::CExon1, 10, 100.0)),
            reads_layout: ReadsLayout::Opposite,
            merge_reads: true,
            min_merge_overlap: 12,
            save_original_reads: false,
            allow_partial_alignments: false,
        }
    }
}

impl AlignmentParameters {
    pub fn preset(name: &str) -> Result<Self, Error> {
        let mut params = AlignmentParameters::default();
        match name {
            "default" => {}
            "rna-seq" => {
                params.allow_partial_alignments = true;
            }
            "amplicon" => {
                params.v_parameters.gene_feature_to_align = GeneFeature::VRegion;
                params.c_parameters = None;
                params.reads_layout = ReadsLayout::Collinear;
            }
            _ => {
                return Err(Error::configuration(format!(
                    "Unknown aligner parameters: {}. Available presets: {}",
                    name,
                    PRESETS.join(", ")
                )))
            }
        }
        Ok(params)
    }

    pub fn gene_parameters(&self, gene_type: GeneType) -> Option<&GeneAlignerParameters> {
        match gene_type {
            GeneType::Variable => Some(&self.v_parameters),
            GeneType::Diversity => self.d_parameters.as_ref(),
            GeneType::Joining => Some(&self.j_parameters),
            GeneType::Constant => self.c_parameters.as_ref(),
        }
    }

    pub fn gene_parameters_mut(&mut self, gene_type: GeneType) -> Option<&mut GeneAlignerParameters> {
        match gene_type {
            GeneType::Variable => Some(&mut self.v_parameters),
            GeneType::Diversity => self.d_parameters.as_mut(),
            GeneType::Joining => Some(&mut self.j_parameters),
            GeneType::Constant => self.c_parameters.as_mut(),
        }
    }

    /// Gene types the aligner is configured for, in V, D, J, C order
    pub fn gene_types(&self) -> Vec<GeneType> {
        GeneType::ALL
            .into_iter()
            .filter(|gt| self.gene_parameters(*gt).is_some())
            .collect()
    }

    pub fn feature_to_align(&self, gene_type: GeneType) -> Option<GeneFeature> {
        self.gene_parameters(gene_type)
            .map(|p| p.gene_feature_to_align)
    }

    pub fn extract_feature_to_align<'a>(&self, gene: &'a GeneRecord) -> Option<&'a [u8]> {
        self.feature_to_align(gene.gene_type)
            .and_then(|f| gene.extract_feature(f))
    }

    pub fn contains_required_feature(&self, gene: &GeneRecord) -> bool {
        self.extract_feature_to_align(gene).is_some()
    }

    /// Apply a `-O key=value` override
    pub fn apply_override(&mut self, key: &str, value: &str) -> Result<(), Error> {
        let bad_value = |key: &str, value: &str| {
            Error::configuration(format!("Failed to override {}: bad value '{}'", key, value))
        };

        match key {
            "saveOriginalReads" => {
                self.save_original_reads = value.parse().map_err(|_| bad_value(key, value))?;
                return Ok(());
            }
            "allowPartialAlignments" => {
                self.allow_partial_alignments =
                    value.parse().map_err(|_| bad_value(key, value))?;
                return Ok(());
            }
            "mergeMinOverlap" => {
                self.min_merge_overlap = value.parse().map_err(|_| bad_value(key, value))?;
                return Ok(());
            }
            "readsLayout" => {
                self.reads_layout = value.parse().map_err(|_| bad_value(key, value))?;
                return Ok(());
            }
            "dParameters" | "cParameters" if value == "null" => {
                if key == "dParameters" {
                    self.d_parameters = None;
                } else {
                    self.c_parameters = None;
                }
                return Ok(());
            }
            _ => {}
        }

        let (section, field) = key
            .split_once('.')
            .ok_or_else(|| Error::configuration(format!("Unknown parameter: {}", key)))?;
        let gene_type = section
            .strip_suffix("Parameters")
            .and_then(|p| p.chars().next())
            .filter(|_| section.len() == "vParameters".len())
            .and_then(GeneType::from_letter)
            .ok_or_else(|| Error::configuration(format!("Unknown parameter: {}", key)))?;
        let params = self.gene_parameters_mut(gene_type).ok_or_else(|| {
            Error::configuration(format!(
                "Cannot override {}: {} genes are not aligned",
                key, gene_type
            ))
        })?;

        match field {
            "geneFeatureToAlign" => {
                let feature: GeneFeature = value.parse().map_err(|_| bad_value(key, value))?;
                if feature.gene_type() != gene_type {
                    return Err(bad_value(key, value));
                }
                params.gene_feature_to_align = feature;
            }
            "seedLength" => {
                params.seed_length = value.parse().map_err(|_| bad_value(key, value))?;
                if params.seed_length == 0 || params.seed_length > 32 {
                    return Err(bad_value(key, value));
                }
            }
            "minScore" => params.min_score = value.parse().map_err(|_| bad_value(key, value))?,
            "relativeMinScore" => {
                params.relative_min_score = value.parse().map_err(|_| bad_value(key, value))?
            }
            "maxHits" => params.max_hits = value.parse().map_err(|_| bad_value(key, value))?,
            _ => return Err(Error::configuration(format!("Unknown parameter: {}", key))),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert!(AlignmentParameters::preset("default").is_ok());
        let amplicon = AlignmentParameters::preset("amplicon").unwrap();
        assert_eq!(amplicon.feature_to_align(GeneType::Variable), Some(GeneFeature::VRegion));
        assert_eq!(amplicon.feature_to_align(GeneType::Constant), None);
        assert!(matches!(
            AlignmentParameters::preset("fast"),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let mut params = AlignmentParameters::default();
        params
            .apply_override("vParameters.geneFeatureToAlign", "VRegion")
            .unwrap();
        params.apply_override("jParameters.seedLength", "7").unwrap();
        params.apply_override("saveOriginalReads", "true").unwrap();
        params.apply_override("dParameters", "null").unwrap();
        assert_eq!(params.v_parameters.gene_feature_to_align, GeneFeature::VRegion);
        assert_eq!(params.j_parameters.seed_length, 7);
        assert!(params.save_original_reads);
        assert_eq!(
            params.gene_types(),
            vec![GeneType::Variable, GeneType::Joining, GeneType::Constant]
        );

        assert!(params.apply_override("dParameters.maxHits", "3").is_err());
        assert!(params
            .apply_override("vParameters.geneFeatureToAlign", "JRegion")
            .is_err());
        assert!(params.apply_override("xParameters.maxHits", "3").is_err());
        assert!(params.apply_override("noSuchKey", "1").is_err());
    }
}
