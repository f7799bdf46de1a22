use crate::config::PlannerConfig;
use crate::discovery::{DiscoveryReport, PairDiscovery};
use crate::errors::PlanError;
use crate::graph::{GraphBuilder, TerminalGraph};
use crate::grouping::{Group, GroupPartitioner};
use crate::network::{RouteNetwork, Terminal};
use std::time::Instant;
use tracing::info;

/// Everything one planning run produced.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    /// Terminals at their snapped locations, in input order.
    pub terminals: Vec<Terminal>,
    pub report: DiscoveryReport,
    pub graph: TerminalGraph,
    pub groups: Vec<Group>,
}

pub struct Planner<'a> {
    network: &'a RouteNetwork,
    config: &'a PlannerConfig,
}

impl<'a> Planner<'a> {
    pub fn new(network: &'a RouteNetwork, config: &'a PlannerConfig) -> Result<Self, PlanError> {
        config.validate()?;
        Ok(Self { network, config })
    }

    pub fn snap(&self, terminals: &[Terminal]) -> Vec<Terminal> {
        self.network.snap_all(terminals, self.config.snap)
    }

    /// Snaps the terminals and discovers paths between them. Returns the
    /// snapped terminals alongside the report.
    pub fn discover(&self, terminals: &[Terminal]) -> (Vec<Terminal>, DiscoveryReport) {
        let snapped = self.snap(terminals);
        let start = Instant::now();
        let report = PairDiscovery::new(self.network, &snapped, self.config).run();
        info!(
            terminals = snapped.len(),
            routes = self.network.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "discovered paths"
        );
        (snapped, report)
    }

    /// Snap, discover, build the terminal graph, then partition it.
    pub fn plan(&self, terminals: &[Terminal]) -> Result<PlanOutcome, PlanError> {
        let (snapped, report) = self.discover(terminals);

        let builder = GraphBuilder::new(&snapped, self.config.tolerance);
        let graph = builder.build(report.discovered())?;
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built terminal graph"
        );

        let partitioner = GroupPartitioner::new(self.config.group_size, self.config.minimize)?;
        let groups = partitioner.partition(&graph);
        let short = groups
            .iter()
            .filter(|g| g.check_size(self.config.group_size).is_err())
            .count();
        info!(groups = groups.len(), short, "partitioned terminals");

        Ok(PlanOutcome {
            terminals: snapped,
            report,
            graph,
            groups,
        })
    }
}
