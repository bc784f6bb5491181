
use std::collections::HashMap;
use std::sync::Arc;

use model::base_types::BlockIdx;
use model::config::CrewRules;
use model::instance::Instance;
use solution::block::{Block, BlockRegistry};
use solution::crew_duty::{DutyElement, DutyElementKind};
use time::Duration;

/// What the crew does between two blocks at the same location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkKind {
    Idle,
    Break { net: Duration },
    /// Sign off, go home and sign on again. `rest` excludes sign on and sign off.
    LongIdle {
        sign_off: Duration,
        rest: Duration,
        sign_on: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockLink {
    pub from: usize, // node positions
    pub to: usize,
    pub kind: LinkKind,
}

/// Adjacency of the blocks of the active vehicle tasks. Nodes are the blocks sorted by start
/// time, a duty starts with a sign-on and ends with a sign-off at a crew base.
pub struct CrewNetwork {
    instance: Arc<Instance>,
    nodes: Vec<(BlockIdx, Block)>,
    links: Vec<BlockLink>,
    outgoing: Vec<Vec<usize>>,
    between: HashMap<(usize, usize), usize>,
    positions: HashMap<BlockIdx, usize>,
}

// static functions
impl CrewNetwork {
    pub fn new(
        instance: Arc<Instance>,
        rules: &CrewRules,
        registry: &BlockRegistry,
        active: impl IntoIterator<Item = BlockIdx>,
    ) -> CrewNetwork {
        let mut nodes: Vec<(BlockIdx, Block)> = active
            .into_iter()
            .map(|idx| (idx, registry.get(idx).clone()))
            .collect();
        nodes.sort_by_key(|(idx, block)| (block.start_time(), block.end_time(), *idx));
        nodes.dedup_by_key(|(idx, _)| *idx);

        let mut links = Vec::new();
        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut between = HashMap::new();
        for (i, (_, first)) in nodes.iter().enumerate() {
            for (j, (_, second)) in nodes.iter().enumerate().skip(i + 1) {
                if let Some(kind) = CrewNetwork::classify(&instance, rules, first, second) {
                    outgoing[i].push(links.len());
                    between.insert((i, j), links.len());
                    links.push(BlockLink {
                        from: i,
                        to: j,
                        kind,
                    });
                }
            }
        }
        let positions = nodes
            .iter()
            .enumerate()
            .map(|(position, (idx, _))| (*idx, position))
            .collect();

        CrewNetwork {
            instance,
            nodes,
            links,
            outgoing,
            between,
            positions,
        }
    }

    /// A crew stays at the location where the first block ends. Breaks take precedence over
    /// plain idles, a long idle is only possible at a crew base.
    pub fn classify(
        instance: &Instance,
        rules: &CrewRules,
        first: &Block,
        second: &Block,
    ) -> Option<LinkKind> {
        if first.end_location() != second.start_location() || first.end_time() > second.start_time()
        {
            return None;
        }
        let location = instance.location(first.end_location());
        let idle = second.start_time() - first.end_time();

        if location.break_allowed {
            let net = idle - location.bruto_netto;
            if net >= rules.min_break && net <= rules.max_break {
                return Some(LinkKind::Break { net });
            }
        }
        if idle >= rules.min_short_idle && idle <= rules.max_short_idle {
            return Some(LinkKind::Idle);
        }
        if location.crew_base {
            let rest = idle - location.sign_off_time - location.sign_on_time;
            if rest >= rules.min_long_idle && rest <= rules.max_long_idle {
                return Some(LinkKind::LongIdle {
                    sign_off: location.sign_off_time,
                    rest,
                    sign_on: location.sign_on_time,
                });
            }
        }
        None
    }
}

// methods
impl CrewNetwork {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn block(&self, position: usize) -> (BlockIdx, &Block) {
        let (idx, block) = &self.nodes[position];
        (*idx, block)
    }

    pub fn position(&self, block: BlockIdx) -> Option<usize> {
        self.positions.get(&block).copied()
    }

    pub fn link(&self, idx: usize) -> &BlockLink {
        &self.links[idx]
    }

    pub fn outgoing(&self, position: usize) -> impl Iterator<Item = &BlockLink> + '_ {
        self.outgoing[position].iter().map(|idx| &self.links[*idx])
    }

    pub fn link_between(&self, from: usize, to: usize) -> Option<&BlockLink> {
        self.between.get(&(from, to)).map(|idx| &self.links[*idx])
    }

    /// Sign-on time if a duty may start with this block.
    pub fn sign_on(&self, position: usize) -> Option<Duration> {
        let location = self.instance.location(self.nodes[position].1.start_location());
        location.crew_base.then_some(location.sign_on_time)
    }

    /// Sign-off time if a duty may end with this block.
    pub fn sign_off(&self, position: usize) -> Option<Duration> {
        let location = self.instance.location(self.nodes[position].1.end_location());
        location.crew_base.then_some(location.sign_off_time)
    }

    /// Elements of a duty driving the blocks at the given positions, together with the number
    /// of duty ends that are not at a crew base (they get no sign-on or sign-off).
    /// None if two consecutive blocks are not linked.
    pub fn duty_elements(&self, positions: &[usize]) -> Option<(Vec<DutyElement>, usize)> {
        let (first, last) = match (positions.first(), positions.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return None,
        };
        let mut missing_bases = 0;
        let mut elements = Vec::with_capacity(2 * positions.len() + 1);

        let first_block = &self.nodes[first].1;
        match self.sign_on(first) {
            Some(sign_on) => elements.push(DutyElement::stationary(
                DutyElementKind::SignOn,
                first_block.start_location(),
                first_block.start_time() - sign_on,
                first_block.start_time(),
            )),
            None => missing_bases += 1,
        }
        for (i, position) in positions.iter().enumerate() {
            let (idx, block) = self.block(*position);
            if i > 0 {
                let link = self.link_between(positions[i - 1], *position)?;
                self.push_link(&mut elements, link);
            }
            elements.push(DutyElement::for_block(idx, block));
        }
        let last_block = &self.nodes[last].1;
        match self.sign_off(last) {
            Some(sign_off) => elements.push(DutyElement::stationary(
                DutyElementKind::SignOff,
                last_block.end_location(),
                last_block.end_time(),
                last_block.end_time() + sign_off,
            )),
            None => missing_bases += 1,
        }
        Some((elements, missing_bases))
    }

    fn push_link(&self, elements: &mut Vec<DutyElement>, link: &BlockLink) {
        let from = &self.nodes[link.from].1;
        let to = &self.nodes[link.to].1;
        let location = from.end_location();
        let (start, end) = (from.end_time(), to.start_time());
        match link.kind {
            LinkKind::Idle => {
                if end > start {
                    elements.push(DutyElement::stationary(
                        DutyElementKind::Idle,
                        location,
                        start,
                        end,
                    ));
                }
            }
            LinkKind::Break { net } => elements.push(DutyElement::stationary(
                DutyElementKind::Break { net },
                location,
                start,
                end,
            )),
            LinkKind::LongIdle {
                sign_off,
                rest,
                sign_on,
            } => {
                let home = start + sign_off;
                let back = home + rest;
                elements.push(DutyElement::stationary(
                    DutyElementKind::SignOff,
                    location,
                    start,
                    home,
                ));
                elements.push(DutyElement::stationary(
                    DutyElementKind::LongIdle,
                    location,
                    home,
                    back,
                ));
                elements.push(DutyElement::stationary(
                    DutyElementKind::SignOn,
                    location,
                    back,
                    back + sign_on,
                ));
            }
        }
    }
}
