use rustc_hash::FxHashMap;

use super::{Chains, GeneFeature, GeneType};

/// A gene admitted to alignment together with its extracted target feature
#[derive(Debug, Clone)]
pub struct AlignableGene {
    pub name: String,
    pub gene_type: GeneType,
    pub functional: bool,
    pub chains: Chains,
    pub feature: GeneFeature,
    pub sequence: Vec<u8>,
}

/// The subset of a library that survived calibration. Shared read-only by
/// all workers of a run.
#[derive(Debug, Clone, Default)]
pub struct CalibratedRepertoire {
    genes: FxHashMap<GeneType, Vec<AlignableGene>>,
    by_name: FxHashMap<(GeneType, String), usize>,
    /// Functional genes dropped because the feature to align was unusable
    pub excluded_functional: u64,
    pub excluded_non_functional: u64,
}

impl CalibratedRepertoire {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_gene(&mut self, gene: AlignableGene) {
        let list = self.genes.entry(gene.gene_type).or_default();
        self.by_name
            .insert((gene.gene_type, gene.name.clone()), list.len());
        list.push(gene);
    }

    pub fn genes(&self, gene_type: GeneType) -> &[AlignableGene] {
        self.genes
            .get(&gene_type)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn gene(&self, gene_type: GeneType, name: &str) -> Option<&AlignableGene> {
        self.by_name
            .get(&(gene_type, name.to_string()))
            .map(|&idx| &self.genes[&gene_type][idx])
    }

    pub fn len(&self) -> usize {
        self.genes.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
