use log::{debug, info, warn};

use super::constants::{V_ABSENT_FRACTION, V_ALTERNATIVE_FRACTION};
use crate::aligner::AlignmentParameters;
use crate::common::sequence::contains_wildcards;
use crate::repertoire::{
    AlignableGene, CalibratedRepertoire, Chains, GeneFeature, GeneRecord, GeneRepertoire, GeneType,
};
use crate::runtime::Error;

/// Feature to fall back to when most V genes cannot supply `current`
pub fn correcting_v_feature(current: GeneFeature) -> GeneFeature {
    if current.has_reversed_regions() {
        GeneFeature::VRegionWithP
    } else {
        GeneFeature::VRegion
    }
}

/// Replace the V feature to align if the selected genes are structurally
/// incompatible with it. Returns the new feature if a correction was made.
fn correct_v_feature(
    genes: &[&GeneRecord],
    params: &mut AlignmentParameters,
) -> Option<GeneFeature> {
    let current = params.v_parameters.gene_feature_to_align;
    let correcting = correcting_v_feature(current);
    if correcting == current {
        return None;
    }

    let mut total_v = 0usize;
    let mut v_absent = 0usize;
    let mut v_alt = 0usize;
    for gene in genes.iter().filter(|g| g.gene_type == GeneType::Variable) {
        total_v += 1;
        if !gene.is_available(current) {
            v_absent += 1;
            if gene.is_available(correcting) {
                v_alt += 1;
            }
        }
    }
    debug!(
        "V genes: {} selected, {} without {}, {} of those with {}",
        total_v, v_absent, current, v_alt, correcting
    );

    if total_v > 0
        && v_absent as f64 > V_ABSENT_FRACTION * total_v as f64
        && v_alt as f64 >= V_ALTERNATIVE_FRACTION * v_absent as f64
    {
        warn!(
            "Forcing V feature to align to {}: {} of {} V genes lack {}",
            correcting, v_absent, total_v, current
        );
        params.v_parameters.gene_feature_to_align = correcting;
        Some(correcting)
    } else {
        None
    }
}

fn excluded_functional_summary(excluded: u64) -> Option<String> {
    (excluded > 0).then(|| {
        format!(
            "WARNING: {} functional genes were excluded, re-run with --verbose option to see the list of excluded genes and exclusion reason.",
            excluded
        )
    })
}

/// Select the genes of `library` that take part in alignment for the given
/// chain filter, correcting the V feature to align first if needed.
pub fn calibrate<R: GeneRepertoire + ?Sized>(
    library: &R,
    chains: &Chains,
    params: &mut AlignmentParameters,
    verbose: bool,
) -> Result<CalibratedRepertoire, Error> {
    let selected = library.genes_matching(chains);
    info!("{} genes match chains {}", selected.len(), chains);

    correct_v_feature(&selected, params);

    let mut repertoire = CalibratedRepertoire::new();
    for gene in selected {
        let Some(feature) = params.feature_to_align(gene.gene_type) else {
            continue;
        };

        let reason = match gene.extract_feature(feature) {
            None => format!("absent {}", feature),
            Some(seq) if contains_wildcards(seq) => format!("wildcard symbols in {}", feature),
            Some(seq) => {
                repertoire.add_gene(AlignableGene {
                    name: gene.name.clone(),
                    gene_type: gene.gene_type,
                    functional: gene.functional,
                    chains: gene.chains(),
                    feature,
                    sequence: seq.to_ascii_uppercase(),
                });
                continue;
            }
        };

        if gene.functional {
            repertoire.excluded_functional += 1;
            if verbose {
                warn!("WARNING: Functional gene {} excluded due to {}", gene.name, reason);
            }
        } else {
            repertoire.excluded_non_functional += 1;
            debug!("Non-functional gene {} excluded due to {}", gene.name, reason);
        }
    }

    if let Some(summary) = excluded_functional_summary(repertoire.excluded_functional) {
        warn!("{}", summary);
    }
    if verbose && repertoire.excluded_non_functional > 0 {
        warn!(
            "WARNING: {} non-functional genes excluded.",
            repertoire.excluded_non_functional
        );
    }

    if repertoire.genes(GeneType::Variable).is_empty() {
        return Err(Error::calibration("No V genes to align."));
    }
    if repertoire.genes(GeneType::Joining).is_empty() {
        return Err(Error::calibration("No J genes to align."));
    }
    Ok(repertoire)
}
