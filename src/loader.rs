use crate::network::{RouteNetwork, Terminal};
use anyhow::{Context, bail};
use geo::{LineString, Point};
use geo_types::Geometry;
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, GeoJson};
use std::path::Path;
use tracing::{info, warn};

pub fn read_feature_collection(path: &Path) -> anyhow::Result<FeatureCollection> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_feature_collection(&contents)
        .with_context(|| format!("invalid GeoJSON in {}", path.display()))
}

pub fn parse_feature_collection(contents: &str) -> anyhow::Result<FeatureCollection> {
    let geojson: GeoJson = contents.parse()?;
    Ok(FeatureCollection::try_from(geojson)?)
}

fn terminal_name(feature: &Feature, id_property: &str, position: usize) -> String {
    let value = feature
        .property(id_property)
        .cloned()
        .or_else(|| {
            feature.id.as_ref().map(|id| match id {
                Id::String(s) => s.clone().into(),
                Id::Number(n) => n.clone().into(),
            })
        });

    match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => {
            warn!(position, id_property, "terminal has no usable id, naming it by position");
            format!("terminal_{}", position)
        }
    }
}

/// Terminals from Point features, named by `id_property`.
pub fn terminals_from_features(
    collection: FeatureCollection,
    id_property: &str,
) -> anyhow::Result<Vec<Terminal>> {
    let mut terminals = Vec::with_capacity(collection.features.len());

    for (position, feature) in collection.features.into_iter().enumerate() {
        let name = terminal_name(&feature, id_property, position);
        let Some(geometry) = feature.geometry else {
            bail!("terminal '{}' has no geometry", name);
        };
        let geometry = Geometry::<f64>::try_from(geometry)
            .with_context(|| format!("terminal '{}' has unreadable geometry", name))?;
        let location: Point<f64> = match geometry {
            Geometry::Point(point) => point,
            _ => bail!("terminal '{}' must be a Point", name),
        };
        terminals.push(Terminal::new(name, location));
    }

    Ok(terminals)
}

/// Route polylines from LineString and MultiLineString features. Other
/// geometry types are skipped.
pub fn routes_from_features(collection: FeatureCollection) -> anyhow::Result<Vec<LineString<f64>>> {
    let mut routes = Vec::new();
    let mut skipped = 0usize;

    for (position, feature) in collection.features.into_iter().enumerate() {
        let Some(geometry) = feature.geometry else {
            skipped += 1;
            continue;
        };
        let geometry = Geometry::<f64>::try_from(geometry)
            .with_context(|| format!("route feature {} has unreadable geometry", position))?;
        match geometry {
            Geometry::LineString(line) => routes.push(line),
            Geometry::MultiLineString(lines) => routes.extend(lines.0),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(skipped, "ignored route features that are not line strings");
    }
    Ok(routes)
}

pub fn load_terminals(path: &Path, id_property: &str) -> anyhow::Result<Vec<Terminal>> {
    let terminals = terminals_from_features(read_feature_collection(path)?, id_property)
        .with_context(|| format!("failed to load terminals from {}", path.display()))?;
    info!(count = terminals.len(), path = %path.display(), "loaded terminals");
    Ok(terminals)
}

pub fn load_routes(path: &Path) -> anyhow::Result<RouteNetwork> {
    let routes = routes_from_features(read_feature_collection(path)?)
        .with_context(|| format!("failed to load routes from {}", path.display()))?;
    let network = RouteNetwork::new(routes);
    info!(count = network.len(), path = %path.display(), "loaded route network");
    Ok(network)
}
