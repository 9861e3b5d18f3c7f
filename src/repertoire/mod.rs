mod calibrated;
mod chains;
mod gene;
mod library;

pub use calibrated::{AlignableGene, CalibratedRepertoire};
pub use chains::{Chains, KNOWN_CHAINS};
pub use gene::{GeneFeature, GeneRecord, GeneType};
pub use library::{GeneLibrary, GeneRepertoire};
