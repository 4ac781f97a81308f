use egui::{Color32, Painter, Pos2, Shape, Stroke};

use crate::edit::{Feature, Geometry};
use crate::projector::Projector;

/// Visual style of the edited shape and of the sketch being drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub fill: Color32,
    pub stroke: Stroke,
    /// Radius of points and vertex handles.
    pub point_radius: f32,
    pub point_fill: Color32,
}

impl Default for Style {
    fn default() -> Self {
        let yellow = Color32::from_rgb(0xff, 0xcc, 0x33);
        Self {
            fill: Color32::from_white_alpha(51),
            stroke: Stroke::new(3., yellow),
            point_radius: 7.,
            point_fill: yellow,
        }
    }
}

impl Style {
    pub fn paint_feature(&self, painter: &Painter, feature: &Feature, projector: &Projector) {
        let screen: Vec<Pos2> = feature
            .vertices()
            .into_iter()
            .map(|vertex| projector.project(vertex))
            .collect();

        match feature.geometry() {
            Geometry::Point(_) => self.paint_vertices(painter, &screen),
            Geometry::LineString(_) => self.paint_line(painter, screen),
            Geometry::Polygon(_) => self.paint_polygon(painter, screen),
        }
    }

    /// Shape which is being drawn. The pointer is the last of the vertices.
    pub fn paint_sketch(&self, painter: &Painter, vertices: &[Pos2], closed: bool) {
        if closed && vertices.len() > 2 {
            self.paint_polygon(painter, vertices.to_vec());
        } else {
            self.paint_line(painter, vertices.to_vec());
        }
        self.paint_vertices(painter, vertices);
    }

    fn paint_vertices(&self, painter: &Painter, vertices: &[Pos2]) {
        for vertex in vertices {
            painter.circle_filled(*vertex, self.point_radius, self.point_fill);
        }
    }

    fn paint_line(&self, painter: &Painter, vertices: Vec<Pos2>) {
        if vertices.len() > 1 {
            painter.add(Shape::line(vertices, self.stroke));
        }
    }

    fn paint_polygon(&self, painter: &Painter, vertices: Vec<Pos2>) {
        // egui fills convex shapes only, concave polygons get an approximate fill.
        painter.add(Shape::convex_polygon(vertices.clone(), self.fill, Stroke::NONE));
        painter.add(Shape::closed_line(vertices, self.stroke));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_style_is_translucent_white_with_yellow_outline() {
        let style = Style::default();
        assert_eq!(style.fill, Color32::from_white_alpha(51));
        assert_eq!(style.stroke.width, 3.);
        assert_eq!(style.stroke.color, Color32::from_rgb(255, 204, 51));
        assert_eq!(style.point_radius, 7.);
    }
}
