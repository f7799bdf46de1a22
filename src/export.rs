use crate::discovery::DiscoveryReport;
use crate::graph::{EdgeData, TerminalGraph};
use crate::grouping::Group;
use crate::network::Terminal;
use ahash::AHashMap;
use anyhow::Context;
use geo::LineString;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

fn feature(geometry: Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geometry)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn edge_properties(from: &str, to: &str, data: &EdgeData) -> JsonObject {
    let mut properties = JsonObject::new();
    properties.insert("from".to_string(), from.into());
    properties.insert("to".to_string(), to.into());
    properties.insert("length".to_string(), data.length.into());
    properties.insert("straight_distance".to_string(), data.straight_distance.into());
    properties.insert("vertices".to_string(), data.vertices.into());
    properties
}

fn line(path: &LineString<f64>) -> Value {
    Value::from(path)
}

/// One LineString feature per discovered path.
pub fn paths_collection(report: &DiscoveryReport) -> FeatureCollection {
    let features = report
        .paths
        .iter()
        .map(|found| {
            let mut properties = JsonObject::new();
            properties.insert("source".to_string(), found.source.clone().into());
            properties.insert("target".to_string(), found.target.clone().into());
            properties.insert("length".to_string(), found.path.length.into());
            properties.insert("vertices".to_string(), found.path.vertex_count().into());
            feature(line(&found.path.points), properties)
        })
        .collect();
    collection(features)
}

/// One LineString feature per stored graph edge.
pub fn graph_collection(graph: &TerminalGraph) -> FeatureCollection {
    let features = graph
        .edges()
        .into_iter()
        .map(|(a, b, data)| {
            feature(
                line(&data.path),
                edge_properties(graph.name(a), graph.name(b), data),
            )
        })
        .collect();
    collection(features)
}

/// Group edges as LineStrings and group members as Points, both tagged with the
/// group's position in `groups`.
pub fn groups_collection(groups: &[Group], terminals: &[Terminal]) -> FeatureCollection {
    let locations: AHashMap<&str, &Terminal> =
        terminals.iter().map(|t| (t.name.as_str(), t)).collect();
    let mut features = Vec::new();

    for (group_idx, group) in groups.iter().enumerate() {
        for edge in &group.edges {
            let mut properties = edge_properties(&edge.from, &edge.to, &edge.data);
            properties.insert("group".to_string(), group_idx.into());
            properties.insert("weight".to_string(), edge.weight.into());
            features.push(feature(line(&edge.data.path), properties));
        }

        for (member_idx, member) in group.members.iter().enumerate() {
            let Some(terminal) = locations.get(member.as_str()) else {
                continue;
            };
            let mut properties = JsonObject::new();
            properties.insert("group".to_string(), group_idx.into());
            properties.insert("terminal".to_string(), member.clone().into());
            properties.insert("seed".to_string(), (member_idx == 0).into());
            features.push(feature(
                Value::Point(vec![terminal.location.x(), terminal.location.y()]),
                properties,
            ));
        }
    }

    collection(features)
}

pub fn write_collection(path: &Path, collection: FeatureCollection) -> anyhow::Result<()> {
    let count = collection.features.len();
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), &GeoJson::FeatureCollection(collection))
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(features = count, path = %path.display(), "wrote GeoJSON");
    Ok(())
}

/// Writes `paths.geojson` into `dir`.
pub fn write_paths(dir: &Path, report: &DiscoveryReport) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    let path = dir.join("paths.geojson");
    write_collection(&path, paths_collection(report))?;
    Ok(path)
}

/// Writes `paths.geojson`, `graph.geojson` and `groups.geojson` into `dir`.
pub fn write_plan(
    dir: &Path,
    report: &DiscoveryReport,
    graph: &TerminalGraph,
    groups: &[Group],
    terminals: &[Terminal],
) -> anyhow::Result<Vec<PathBuf>> {
    let paths = write_paths(dir, report)?;

    let graph_path = dir.join("graph.geojson");
    write_collection(&graph_path, graph_collection(graph))?;

    let groups_path = dir.join("groups.geojson");
    write_collection(&groups_path, groups_collection(groups, terminals))?;

    Ok(vec![paths, graph_path, groups_path])
}
