use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use super::{Chains, GeneRecord};
use crate::runtime::Error;

/// Source of reference genes for a run
pub trait GeneRepertoire {
    fn genes_matching(&self, chains: &Chains) -> Vec<&GeneRecord>;
}

/// A V/D/J/C gene library, as stored in a JSON library file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneLibrary {
    pub name: String,
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub citations: Vec<String>,
    pub genes: Vec<GeneRecord>,
}

impl GeneLibrary {
    pub fn new(name: impl Into<String>, genes: Vec<GeneRecord>) -> Self {
        GeneLibrary {
            name: name.into(),
            species: None,
            warnings: Vec::new(),
            citations: Vec::new(),
            genes,
        }
    }

    /// Load a library from a `.json` or compressed `.json.gz` file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|_| Error::file_not_found(path))?;
        let (reader, compression) = niffler::get_reader(Box::new(file))
            .map_err(|e| Error::file_not_valid(path, Some(e.to_string())))?;
        debug!(
            "Opened library {} with compression {:?}",
            path.display(),
            compression
        );

        let library: GeneLibrary = serde_json::from_reader(BufReader::new(reader))
            .map_err(|e| Error::file_not_valid(path, Some(e.to_string())))?;
        Ok(library)
    }
}

impl GeneRepertoire for GeneLibrary {
    fn genes_matching(&self, chains: &Chains) -> Vec<&GeneRecord> {
        self.genes
            .iter()
            .filter(|g| g.chains().intersects(chains))
            .collect()
    }
}
