//! Surface queries and distances between successive query points.

use crate::engine::{DisplayEngine, QueryHit};
use glam::DVec3;

/// Straight-line distances from the previous query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deltas {
    pub xy: f64,
    pub xyz: f64,
}

/// Append-only log of queried points; cleared only by a reset.
#[derive(Debug, Clone, Default)]
pub struct QueryLog {
    points: Vec<DVec3>,
}

impl QueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a point and returns the distances from the one before it.
    pub fn push(&mut self, point: DVec3) -> Option<Deltas> {
        let prev = self.points.last().copied();
        self.points.push(point);

        prev.map(|prev| Deltas {
            xy: prev.truncate().distance(point.truncate()),
            xyz: prev.distance(point),
        })
    }

    pub fn points(&self) -> &[DVec3] {
        &self.points
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

/// Full report of one surface query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryReport {
    pub hit: QueryHit,
    pub deltas: Option<Deltas>,
    /// Distance along the surface without and with z-exaggeration.
    pub along_surface: Option<(f64, f64)>,
}

impl QueryReport {
    /// Report lines in `label: value` form, labels padded to 30 columns.
    pub fn lines(&self) -> Vec<String> {
        let h = &self.hit;
        let mut out = vec![
            format!("{:<30}: {:.3}", "Easting", h.x),
            format!("{:<30}: {:.3}", "Northing", h.y),
            format!("{:<30}: {:.3}", "Elevation", h.z),
            format!("{:<30}: {}", "Surface map elevation", h.elevation),
            format!("{:<30}: {}", "Surface map color", h.color),
        ];
        if let Some(d) = self.deltas {
            out.push(format!("{:<30}: {:.3}", "XY distance from previous", d.xy));
            out.push(format!("{:<30}: {:.3}", "XYZ distance from previous", d.xyz));
        }
        if let Some((flat, exag)) = self.along_surface {
            out.push(format!("{:<30}: {:.3}", "Distance along surface", flat));
            out.push(format!("{:<30}: {:.3}", "Distance along exag. surface", exag));
        }
        out
    }
}

/// Queries the surface under a screen position and logs the result.
pub fn query_surface<E: DisplayEngine>(
    engine: &mut E,
    log: &mut QueryLog,
    x: i32,
    y: i32,
) -> Option<QueryReport> {
    let Some(hit) = engine.query_map(x, y) else {
        tracing::info!(x, y, "no point on surface");
        return None;
    };

    let point = DVec3::new(hit.x, hit.y, hit.z);
    let prev = log.points().last().copied();
    let deltas = log.push(point);

    let along_surface = prev.map(|prev| {
        let (from, to) = ([point.x, point.y], [prev.x, prev.y]);
        (
            engine.distance_along_surface(hit.id, from, to, false),
            engine.distance_along_surface(hit.id, from, to, true),
        )
    });

    let report = QueryReport { hit, deltas, along_surface };
    for line in report.lines() {
        tracing::info!("{line}");
    }
    Some(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RecordingEngine;

    fn hit(x: f64, y: f64, z: f64) -> QueryHit {
        QueryHit {
            x,
            y,
            z,
            elevation: format!("{z}"),
            color: "0:0:0".into(),
            id: 1,
        }
    }

    #[test]
    fn test_successive_distances() {
        let mut log = QueryLog::new();
        assert_eq!(log.push(DVec3::ZERO), None);
        let d = log.push(DVec3::new(3.0, 4.0, 0.0)).unwrap();
        assert_eq!(d, Deltas { xy: 5.0, xyz: 5.0 });

        let d = log.push(DVec3::new(3.0, 4.0, 12.0)).unwrap();
        assert_eq!(d.xy, 0.0);
        assert_eq!(d.xyz, 12.0);
    }

    #[test]
    fn test_query_surface_reports_surface_distances() {
        let mut engine = RecordingEngine::new()
            .with_query_hit(hit(0.0, 0.0, 0.0))
            .with_query_hit(hit(3.0, 4.0, 0.0));
        engine.set_z_exag(2.0);
        let mut log = QueryLog::new();

        let first = query_surface(&mut engine, &mut log, 10, 10).unwrap();
        assert_eq!(first.along_surface, None);

        let second = query_surface(&mut engine, &mut log, 20, 20).unwrap();
        assert_eq!(second.along_surface, Some((5.0, 10.0)));
        let lines = second.lines();
        assert_eq!(lines[5], format!("{:<30}: 5.000", "XY distance from previous"));
        assert_eq!(lines.len(), 9);

        assert!(query_surface(&mut engine, &mut log, 0, 0).is_none());
        assert_eq!(log.points().len(), 2);
    }
}
