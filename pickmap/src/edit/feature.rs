use geo_types::{Coord, LineString, Point, Polygon};

use crate::Position;

/// Drawn shape. Coordinates are longitudes and latitudes.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    LineString(LineString),
    Polygon(Polygon),
}

/// Single drawn shape, as kept in the edit source.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    geometry: Geometry,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self { geometry }
    }

    pub fn point(position: Position) -> Self {
        Self::new(Geometry::Point(position))
    }

    pub fn line_string(vertices: &[Position]) -> Self {
        Self::new(Geometry::LineString(LineString::from(
            vertices.iter().map(|p| p.0).collect::<Vec<_>>(),
        )))
    }

    /// Polygon with a single ring, closed automatically.
    pub fn polygon(vertices: &[Position]) -> Self {
        Self::new(Geometry::Polygon(Polygon::new(
            LineString::from(vertices.iter().map(|p| p.0).collect::<Vec<_>>()),
            Vec::new(),
        )))
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Editable vertices. The closing vertex of a polygon's ring is not included, as it is the same
    /// as the first one.
    pub fn vertices(&self) -> Vec<Position> {
        match &self.geometry {
            Geometry::Point(point) => vec![*point],
            Geometry::LineString(line) => line.points().collect(),
            Geometry::Polygon(polygon) => {
                let ring = polygon.exterior();
                let count = ring.0.len().saturating_sub(usize::from(ring.is_closed()));
                ring.points().take(count).collect()
            }
        }
    }

    /// Pairs of vertex indices connected with an edge.
    pub fn segments(&self) -> Vec<(usize, usize)> {
        let count = self.vertices().len();
        match &self.geometry {
            Geometry::Point(_) => Vec::new(),
            Geometry::LineString(_) => (1..count).map(|i| (i - 1, i)).collect(),
            Geometry::Polygon(_) if count >= 2 => {
                (1..count).map(|i| (i - 1, i)).chain([(count - 1, 0)]).collect()
            }
            Geometry::Polygon(_) => Vec::new(),
        }
    }

    pub fn move_vertex(&mut self, index: usize, position: Position) {
        let mut vertices = self.vertices();
        if let Some(vertex) = vertices.get_mut(index) {
            *vertex = position;
            self.replace_vertices(&vertices);
        }
    }

    /// Put a new vertex at `index`, moving the following ones further.
    pub fn insert_vertex(&mut self, index: usize, position: Position) {
        if matches!(self.geometry, Geometry::Point(_)) {
            return;
        }

        let mut vertices = self.vertices();
        vertices.insert(index.min(vertices.len()), position);
        self.replace_vertices(&vertices);
    }

    fn replace_vertices(&mut self, vertices: &[Position]) {
        *self = match &self.geometry {
            Geometry::Point(_) => match vertices.first() {
                Some(position) => Self::point(*position),
                None => return,
            },
            Geometry::LineString(_) => Self::line_string(vertices),
            Geometry::Polygon(_) => Self::polygon(vertices),
        };
    }

    /// Coordinates written as nested JSON arrays, as they are shown to the user:
    /// `[x,y]` for a point, `[[x,y],...]` for a line and `[[[x,y],...]]` for a polygon.
    pub fn coordinates_text(&self) -> String {
        match &self.geometry {
            Geometry::Point(point) => coord_text(point.0),
            Geometry::LineString(line) => coords_text(&line.0),
            Geometry::Polygon(polygon) => format!("[{}]", coords_text(&polygon.exterior().0)),
        }
    }
}

/// Number as it would be written by JavaScript, e.g. `119` rather than `119.0`.
pub(crate) fn number_text(value: f64) -> String {
    if value == 0. {
        // Negative zero as well.
        "0".to_owned()
    } else {
        value.to_string()
    }
}

fn coord_text(coord: Coord) -> String {
    format!("[{},{}]", number_text(coord.x), number_text(coord.y))
}

fn coords_text(coords: &[Coord]) -> String {
    let coords: Vec<String> = coords.iter().copied().map(coord_text).collect();
    format!("[{}]", coords.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lon_lat;

    #[test]
    fn point_coordinates() {
        let feature = Feature::point(lon_lat(119., 23.));
        assert_eq!(feature.coordinates_text(), "[119,23]");
        assert_eq!(
            Feature::point(lon_lat(119.1234, -0.)).coordinates_text(),
            "[119.1234,0]"
        );
    }

    #[test]
    fn line_coordinates() {
        let feature = Feature::line_string(&[lon_lat(1., 2.), lon_lat(3.5, 4.)]);
        assert_eq!(feature.coordinates_text(), "[[1,2],[3.5,4]]");
        assert_eq!(feature.segments(), [(0, 1)]);
    }

    #[test]
    fn polygon_ring_is_closed() {
        let feature = Feature::polygon(&[lon_lat(0., 0.), lon_lat(1., 0.), lon_lat(1., 1.)]);

        assert_eq!(feature.coordinates_text(), "[[[0,0],[1,0],[1,1],[0,0]]]");
        assert_eq!(feature.vertices().len(), 3);
        assert_eq!(feature.segments(), [(0, 1), (1, 2), (2, 0)]);
    }

    #[test]
    fn moving_first_vertex_of_polygon_moves_closing_one_too() {
        let mut feature = Feature::polygon(&[lon_lat(0., 0.), lon_lat(1., 0.), lon_lat(1., 1.)]);
        feature.move_vertex(0, lon_lat(-1., -1.));

        assert_eq!(feature.coordinates_text(), "[[[-1,-1],[1,0],[1,1],[-1,-1]]]");
    }

    #[test]
    fn vertex_is_inserted_into_line() {
        let mut feature = Feature::line_string(&[lon_lat(0., 0.), lon_lat(2., 0.)]);
        feature.insert_vertex(1, lon_lat(1., 1.));

        assert_eq!(feature.coordinates_text(), "[[0,0],[1,1],[2,0]]");
    }

    #[test]
    fn point_has_no_place_for_more_vertices() {
        let mut feature = Feature::point(lon_lat(0., 0.));
        feature.insert_vertex(1, lon_lat(1., 1.));
        feature.move_vertex(5, lon_lat(1., 1.));
        assert_eq!(feature, Feature::point(lon_lat(0., 0.)));
    }
}
