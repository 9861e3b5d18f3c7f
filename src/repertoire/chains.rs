use std::collections::BTreeSet;
use std::fmt;

use std::sync::LazyLock;

use regex::Regex;

use crate::runtime::Error;

pub const KNOWN_CHAINS: [&str; 7] = ["IGH", "IGK", "IGL", "TRA", "TRB", "TRG", "TRD"];

static CHAIN_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(IG[HKL]|TR[ABGD])").unwrap());
static EXTRA_TRD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/DV\d").unwrap());

/// A set of receptor chains, used both as a gene property and as a filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chains(BTreeSet<String>);

impl Chains {
    pub fn all() -> Self {
        Chains(KNOWN_CHAINS.iter().map(|c| c.to_string()).collect())
    }

    pub fn empty() -> Self {
        Chains(BTreeSet::new())
    }

    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Chains(names.into_iter().map(|c| c.trim().to_uppercase()).collect())
    }

    /// Chains a gene belongs to, judged from its name.
    /// TRAV genes also usable as TRDV (e.g. `TRAV29/DV5*01`) belong to both.
    pub fn of_gene_name(name: &str) -> Self {
        let mut chains = BTreeSet::new();
        if let Some(m) = CHAIN_PREFIX.find(name) {
            chains.insert(m.as_str().to_string());
            if EXTRA_TRD.is_match(name) {
                chains.insert("TRD".to_string());
            }
        }
        Chains(chains)
    }

    /// Parse a chain filter expression: `ALL`, `TCR`, `BCR`/`IG`, or a comma
    /// separated list of chain names and groups.
    pub fn parse(expr: &str) -> Result<Self, Error> {
        let mut chains = BTreeSet::new();
        for part in expr.split(',') {
            let part = part.trim().to_uppercase();
            match part.as_str() {
                "" => {
                    return Err(Error::configuration(format!(
                        "Empty chain name in chain filter '{}'",
                        expr
                    )))
                }
                "ALL" => chains.extend(KNOWN_CHAINS.iter().map(|c| c.to_string())),
                "TCR" => chains.extend(["TRA", "TRB", "TRG", "TRD"].map(String::from)),
                "BCR" | "IG" => chains.extend(["IGH", "IGK", "IGL"].map(String::from)),
                chain if KNOWN_CHAINS.contains(&chain) => {
                    chains.insert(part);
                }
                _ => {
                    return Err(Error::configuration(format!(
                        "Unknown chain '{}' in chain filter '{}'. Available chains: {}",
                        part,
                        expr,
                        KNOWN_CHAINS.join(", ")
                    )))
                }
            }
        }
        Ok(Chains(chains))
    }

    pub fn intersects(&self, other: &Chains) -> bool {
        self.0.iter().any(|c| other.0.contains(c))
    }

    pub fn contains(&self, chain: &str) -> bool {
        self.0.contains(chain)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }
}

impl fmt::Display for Chains {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        write!(f, "{}", names.join(","))
    }
}
