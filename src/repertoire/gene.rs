use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::chains::Chains;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GeneType {
    Variable,
    Diversity,
    Joining,
    Constant,
}

impl GeneType {
    pub const ALL: [GeneType; 4] = [
        GeneType::Variable,
        GeneType::Diversity,
        GeneType::Joining,
        GeneType::Constant,
    ];

    pub fn letter(&self) -> char {
        match self {
            GeneType::Variable => 'V',
            GeneType::Diversity => 'D',
            GeneType::Joining => 'J',
            GeneType::Constant => 'C',
        }
    }

    pub fn from_letter(c: char) -> Option<GeneType> {
        match c.to_ascii_uppercase() {
            'V' => Some(GeneType::Variable),
            'D' => Some(GeneType::Diversity),
            'J' => Some(GeneType::Joining),
            'C' => Some(GeneType::Constant),
            _ => None,
        }
    }
}

impl fmt::Display for GeneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Named sub-regions of a reference gene that can be used as alignment targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GeneFeature {
    VTranscriptWithout5UTRWithP,
    VTranscriptWithout5UTR,
    VRegion,
    VRegionWithP,
    DRegion,
    JRegion,
    JRegionWithP,
    CExon1,
    CRegion,
}

impl GeneFeature {
    pub fn encode(&self) -> &'static str {
        match self {
            GeneFeature::VTranscriptWithout5UTRWithP => "VTranscriptWithout5UTRWithP",
            GeneFeature::VTranscriptWithout5UTR => "VTranscriptWithout5UTR",
            GeneFeature::VRegion => "VRegion",
            GeneFeature::VRegionWithP => "VRegionWithP",
            GeneFeature::DRegion => "DRegion",
            GeneFeature::JRegion => "JRegion",
            GeneFeature::JRegionWithP => "JRegionWithP",
            GeneFeature::CExon1 => "CExon1",
            GeneFeature::CRegion => "CRegion",
        }
    }

    pub fn gene_type(&self) -> GeneType {
        match self {
            GeneFeature::VTranscriptWithout5UTRWithP
            | GeneFeature::VTranscriptWithout5UTR
            | GeneFeature::VRegion
            | GeneFeature::VRegionWithP => GeneType::Variable,
            GeneFeature::DRegion => GeneType::Diversity,
            GeneFeature::JRegion | GeneFeature::JRegionWithP => GeneType::Joining,
            GeneFeature::CExon1 | GeneFeature::CRegion => GeneType::Constant,
        }
    }

    /// Features extended with palindromic P-segments, i.e. containing
    /// reverse complemented stretches of the germline.
    pub fn has_reversed_regions(&self) -> bool {
        matches!(
            self,
            GeneFeature::VTranscriptWithout5UTRWithP
                | GeneFeature::VRegionWithP
                | GeneFeature::JRegionWithP
        )
    }
}

impl fmt::Display for GeneFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl FromStr for GeneFeature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let all = [
            GeneFeature::VTranscriptWithout5UTRWithP,
            GeneFeature::VTranscriptWithout5UTR,
            GeneFeature::VRegion,
            GeneFeature::VRegionWithP,
            GeneFeature::DRegion,
            GeneFeature::JRegion,
            GeneFeature::JRegionWithP,
            GeneFeature::CExon1,
            GeneFeature::CRegion,
        ];
        all.into_iter()
            .find(|f| f.encode().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown gene feature: {}", s))
    }
}

/// Reference gene segment as stored in a library file.
/// Features are half-open ranges into `sequence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub gene_type: GeneType,
    #[serde(default = "default_functional")]
    pub functional: bool,
    /// Explicit chains; derived from the gene name when empty
    #[serde(default)]
    pub chains: Vec<String>,
    pub sequence: String,
    #[serde(default)]
    pub features: BTreeMap<GeneFeature, (usize, usize)>,
}

fn default_functional() -> bool {
    true
}

impl GeneRecord {
    pub fn is_available(&self, feature: GeneFeature) -> bool {
        match self.features.get(&feature) {
            Some(&(from, to)) => from <= to && to <= self.sequence.len(),
            None => false,
        }
    }

    /// Sequence of `feature`, or None if the gene cannot supply it
    pub fn extract_feature(&self, feature: GeneFeature) -> Option<&[u8]> {
        if !self.is_available(feature) {
            return None;
        }
        let (from, to) = self.features[&feature];
        Some(&self.sequence.as_bytes()[from..to])
    }

    pub fn chains(&self) -> Chains {
        if self.chains.is_empty() {
            Chains::of_gene_name(&self.name)
        } else {
            Chains::from_names(self.chains.iter().map(|s| s.as_str()))
        }
    }
}
