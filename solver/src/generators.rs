#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::sync::Arc;

use model::base_types::BlockIdx;
use model::config::{Config, CrewGeneratorWeights, VehicleGeneratorWeights};
use model::cover_set::CoverSet;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;
use solution::crew_duty::CrewDuty;
use solution::dual_prices::DualPrices;
use solution::vehicle_task::VehicleTask;

use crate::columns::Priced;
use crate::crew_labeling::CrewLabeling;
use crate::crew_local_search::CrewLocalSearch;
use crate::crew_network::CrewNetwork;
use crate::vehicle_labeling::VehicleLabeling;
use crate::vehicle_local_search::VehicleLocalSearch;

/// A pricing heuristic or exact pricer for vehicle tasks. Instances run concurrently on shared
/// read-only data, the seed makes randomized generators reproducible.
pub trait VehicleColumnGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    fn generate(
        &self,
        duals: &DualPrices,
        known: &HashSet<CoverSet>,
        seed: u64,
    ) -> Result<Vec<Priced<VehicleTask>>, String>;
}

pub trait CrewColumnGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    fn generate(&self, duals: &DualPrices, seed: u64) -> Result<Vec<Priced<CrewDuty>>, String>;
}

impl VehicleColumnGenerator for VehicleLabeling {
    fn name(&self) -> &'static str {
        "vehicle labeling"
    }

    fn generate(
        &self,
        duals: &DualPrices,
        known: &HashSet<CoverSet>,
        _seed: u64,
    ) -> Result<Vec<Priced<VehicleTask>>, String> {
        Ok(self.generate_excluding(duals, known))
    }
}

/// Single-route annealing as a vehicle generator.
pub struct SingleRouteGenerator(pub Arc<VehicleLocalSearch>);

/// Whole-schedule annealing as a vehicle generator.
pub struct GlobalRouteGenerator(pub Arc<VehicleLocalSearch>);

impl VehicleColumnGenerator for SingleRouteGenerator {
    fn name(&self) -> &'static str {
        "vehicle local search (single)"
    }

    fn generate(
        &self,
        duals: &DualPrices,
        known: &HashSet<CoverSet>,
        seed: u64,
    ) -> Result<Vec<Priced<VehicleTask>>, String> {
        let mut columns = self.0.generate_single(duals, seed)?;
        columns.retain(|c| !known.contains(c.column.trips()));
        Ok(columns)
    }
}

impl VehicleColumnGenerator for GlobalRouteGenerator {
    fn name(&self) -> &'static str {
        "vehicle local search (global)"
    }

    fn generate(
        &self,
        duals: &DualPrices,
        known: &HashSet<CoverSet>,
        seed: u64,
    ) -> Result<Vec<Priced<VehicleTask>>, String> {
        let mut columns = self.0.generate_global(duals, seed)?;
        columns.retain(|c| !known.contains(c.column.trips()));
        Ok(columns)
    }
}

impl CrewColumnGenerator for CrewLabeling {
    fn name(&self) -> &'static str {
        "crew labeling"
    }

    fn generate(&self, duals: &DualPrices, _seed: u64) -> Result<Vec<Priced<CrewDuty>>, String> {
        Ok(self.generate_crew_columns(duals))
    }
}

impl CrewColumnGenerator for CrewLocalSearch {
    fn name(&self) -> &'static str {
        "crew local search"
    }

    fn generate(&self, duals: &DualPrices, seed: u64) -> Result<Vec<Priced<CrewDuty>>, String> {
        self.generate_crew_columns(duals, seed)
    }
}

/////////////////////////////////////////////////////////////////////
////////////////////////////// GeneratorMix /////////////////////////
/////////////////////////////////////////////////////////////////////

/// Generators with selection weights. Every pricing iteration draws one generator per instance.
pub struct GeneratorMix<G: ?Sized> {
    generators: Vec<Arc<G>>,
    weights: WeightedIndex<f64>,
}

// static functions
impl<G: ?Sized> GeneratorMix<G> {
    /// Generators with weight zero are dropped. Fails if no generator is left.
    pub fn new(weighted: Vec<(Arc<G>, f64)>) -> Result<GeneratorMix<G>, String> {
        let (generators, weights): (Vec<Arc<G>>, Vec<f64>) =
            weighted.into_iter().filter(|(_, w)| *w > 0.0).unzip();
        let weights = WeightedIndex::new(weights)
            .map_err(|err| format!("invalid generator weights: {}", err))?;
        Ok(GeneratorMix {
            generators,
            weights,
        })
    }
}

// methods
impl<G: ?Sized> GeneratorMix<G> {
    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Generator and seed for each of `instances` parallel runs.
    pub fn draw(&self, instances: usize, rng: &mut StdRng) -> Vec<(Arc<G>, u64)> {
        (0..instances.max(1))
            .map(|_| {
                let generator = self.generators[self.weights.sample(rng)].clone();
                (generator, rng.gen::<u64>())
            })
            .collect()
    }
}

/// Vehicle generators of a master: the labeling and the two annealing variants.
pub fn vehicle_generators(
    labeling: Arc<VehicleLabeling>,
    local_search: Arc<VehicleLocalSearch>,
    weights: &VehicleGeneratorWeights,
) -> Result<GeneratorMix<dyn VehicleColumnGenerator>, String> {
    let single: Arc<dyn VehicleColumnGenerator> =
        Arc::new(SingleRouteGenerator(local_search.clone()));
    let global: Arc<dyn VehicleColumnGenerator> = Arc::new(GlobalRouteGenerator(local_search));
    GeneratorMix::new(vec![
        (labeling as Arc<dyn VehicleColumnGenerator>, weights.labeling),
        (single, weights.local_search_single),
        (global, weights.local_search_global),
    ])
}

/// Crew generators over the network of the currently active blocks.
pub fn crew_generators(
    network: Arc<CrewNetwork>,
    config: Arc<Config>,
    weights: &CrewGeneratorWeights,
) -> Result<GeneratorMix<dyn CrewColumnGenerator>, String> {
    let labeling: Arc<dyn CrewColumnGenerator> =
        Arc::new(CrewLabeling::new(network.clone(), config.clone()));
    let local_search: Arc<dyn CrewColumnGenerator> =
        Arc::new(CrewLocalSearch::new(network, config));
    GeneratorMix::new(vec![
        (labeling, weights.labeling),
        (local_search, weights.local_search),
    ])
}

/// Runs the drawn vehicle generators in parallel and merges their columns: cheapest first, each
/// trip set once.
pub fn generate_vehicle_batch(
    mix: &GeneratorMix<dyn VehicleColumnGenerator>,
    duals: &DualPrices,
    known: &HashSet<CoverSet>,
    instances: usize,
    rng: &mut StdRng,
) -> Result<Vec<Priced<VehicleTask>>, String> {
    let draws = mix.draw(instances, rng);
    let batches: Vec<Vec<Priced<VehicleTask>>> = draws
        .par_iter()
        .map(|(generator, seed)| {
            generator
                .generate(duals, known, *seed)
                .map_err(|err| format!("{}: {}", generator.name(), err))
        })
        .collect::<Result<_, _>>()?;

    let mut columns: Vec<Priced<VehicleTask>> = batches.into_iter().flatten().collect();
    columns.sort_by(|a, b| a.reduced_cost.total_cmp(&b.reduced_cost));
    let mut seen = HashSet::new();
    columns.retain(|c| seen.insert(c.column.trips().clone()));
    Ok(columns)
}

/// Crew counterpart of [`generate_vehicle_batch`], duties are merged by their block set.
pub fn generate_crew_batch(
    mix: &GeneratorMix<dyn CrewColumnGenerator>,
    duals: &DualPrices,
    instances: usize,
    rng: &mut StdRng,
) -> Result<Vec<Priced<CrewDuty>>, String> {
    let draws = mix.draw(instances, rng);
    let batches: Vec<Vec<Priced<CrewDuty>>> = draws
        .par_iter()
        .map(|(generator, seed)| {
            generator
                .generate(duals, *seed)
                .map_err(|err| format!("{}: {}", generator.name(), err))
        })
        .collect::<Result<_, _>>()?;

    let mut columns: Vec<Priced<CrewDuty>> = batches.into_iter().flatten().collect();
    columns.sort_by(|a, b| a.reduced_cost.total_cmp(&b.reduced_cost));
    let mut seen: HashSet<Vec<BlockIdx>> = HashSet::new();
    columns.retain(|c| {
        let mut blocks = c.column.blocks().to_vec();
        blocks.sort();
        seen.insert(blocks)
    });
    Ok(columns)
}
