use crate::config::{DiscoveryMode, PlannerConfig};
use crate::discovery::PairFailureReason;
use crate::errors::WalkFailure;
use crate::graph::EdgeMetric;
use crate::network::{RouteNetwork, SnapMode, Terminal};
use crate::planner::Planner;
use geo::{LineString, coord, line_string, point};

/// Trunk along y = 0 split at every spur, with a 5 m spur up to a terminal at
/// each split. Spur spacing is uneven so that no two seeds tie.
const SPURS: [f64; 5] = [0.0, 10.0, 22.0, 33.0, 48.0];

fn comb() -> (RouteNetwork, Vec<Terminal>) {
    let mut routes: Vec<LineString<f64>> = SPURS
        .windows(2)
        .map(|w| line_string![(x: w[0], y: 0.0), (x: w[1], y: 0.0)])
        .collect();
    let mut terminals = Vec::new();
    for (i, &x) in SPURS.iter().enumerate() {
        routes.push(line_string![(x: x, y: 5.0), (x: x, y: 0.0)]);
        terminals.push(Terminal::new(format!("t{i}"), point! { x: x, y: 5.0 }));
    }
    (RouteNetwork::new(routes), terminals)
}

fn fine_steps() -> PlannerConfig {
    PlannerConfig {
        step_size: 1.0,
        reach_distance: 1.0,
        max_walking_distance: 200.0,
        group_size: 2,
        snap: SnapMode::None,
        parallel: false,
        ..Default::default()
    }
}

fn member_names(groups: &[crate::grouping::Group]) -> Vec<Vec<&str>> {
    groups
        .iter()
        .map(|g| g.members.iter().map(String::as_str).collect())
        .collect()
}

#[test]
fn test_l_shaped_network_end_to_end() {
    let network = RouteNetwork::new(vec![
        line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
        line_string![(x: 10.0, y: 0.0), (x: 10.0, y: 10.0)],
    ]);
    let terminals = vec![
        Terminal::new("A", point! { x: 0.0, y: 0.0 }),
        Terminal::new("B", point! { x: 10.0, y: 10.0 }),
    ];
    let config = PlannerConfig {
        snap: SnapMode::Endpoint,
        ..fine_steps()
    };

    let outcome = Planner::new(&network, &config)
        .unwrap()
        .plan(&terminals)
        .unwrap();

    let edge = outcome.graph.edge("A", "B").unwrap();
    assert!((edge.length - 20.0).abs() < 1e-6);
    assert_eq!(edge.path.0.len(), 3);
    assert!((edge.path.0[1].x - 10.0).abs() < 1e-6);
    assert!(edge.path.0[1].y.abs() < 1e-6);
    assert_eq!(edge.path.0[0], coord! { x: 0.0, y: 0.0 });

    assert_eq!(member_names(&outcome.groups), vec![vec!["A", "B"]]);
}

#[test]
fn test_stepping_plan_groups_neighbours() {
    let (network, mut terminals) = comb();
    terminals.insert(0, Terminal::new("island", point! { x: 20.0, y: -30.0 }));
    let config = fine_steps();

    let outcome = Planner::new(&network, &config)
        .unwrap()
        .plan(&terminals)
        .unwrap();

    // every comb pair walks, every walk from the island dead-ends immediately
    assert_eq!(outcome.report.attempted, 15);
    assert_eq!(outcome.report.paths.len(), 10);
    assert_eq!(outcome.report.failures.len(), 5);
    assert!(outcome.report.failures.iter().all(|f| {
        f.source == "island"
            && matches!(
                f.reason,
                PairFailureReason::NoPath(err) if err.reason == WalkFailure::DeadEnd
            )
    }));

    assert_eq!(outcome.graph.edge_count(), 10);
    for (a, b, expected) in [("t0", "t1", 20.0), ("t0", "t2", 32.0), ("t1", "t4", 48.0)] {
        let length = outcome.graph.edge(a, b).unwrap().length;
        assert!((length - expected).abs() < 1e-6, "{a}-{b}: {length}");
    }

    assert_eq!(
        member_names(&outcome.groups),
        vec![
            vec!["island"],
            vec!["t4", "t3"],
            vec!["t2", "t1"],
            vec!["t0"]
        ]
    );
}

#[test]
fn test_segment_plan_matches_stepping_lengths() {
    let (network, terminals) = comb();
    let stepping = fine_steps();
    let segments = PlannerConfig {
        discovery: DiscoveryMode::Segments,
        ..fine_steps()
    };

    let by_steps = Planner::new(&network, &stepping)
        .unwrap()
        .plan(&terminals)
        .unwrap();
    let by_segments = Planner::new(&network, &segments)
        .unwrap()
        .plan(&terminals)
        .unwrap();

    assert!(by_segments.report.failures.is_empty());
    assert_eq!(by_segments.graph.edge_count(), 10);
    for (a, b, step_edge) in by_steps.graph.edges() {
        let segment_edge = by_segments
            .graph
            .edge_between(a, b)
            .unwrap_or_else(|| panic!("missing segment edge {a}-{b}"));
        assert!((segment_edge.length - step_edge.length).abs() < 1e-6);
    }
    assert_eq!(
        member_names(&by_segments.groups),
        member_names(&by_steps.groups)
    );
}

#[test]
fn test_single_group_over_straight_distances() {
    let (network, terminals) = comb();
    let config = PlannerConfig {
        minimize: EdgeMetric::StraightDistance,
        group_size: 5,
        ..fine_steps()
    };

    let outcome = Planner::new(&network, &config)
        .unwrap()
        .plan(&terminals)
        .unwrap();

    assert_eq!(outcome.groups.len(), 1);
    let group = &outcome.groups[0];
    assert_eq!(group.len(), 5);
    assert!(group.check_size(5).is_ok());
    assert!(group.edges.iter().all(|e| e.weight == e.data.straight_distance));
    // the cheapest tree links neighbouring spurs
    assert!((group.total_weight() - 48.0).abs() < 1e-6);
}
