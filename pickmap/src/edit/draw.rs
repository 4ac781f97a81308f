use std::fmt;
use std::str::FromStr;

use egui::Pos2;

use super::feature::Feature;
use super::{EditSource, Gesture, Viewport};
use crate::Position;

/// Clicking that close (in pixels) to the last, or to the first vertex of a polygon, finishes the
/// drawing.
const FINISH_TOLERANCE: f32 = 12.;

/// Kind of shape the user draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum DrawMode {
    #[default]
    Point,
    LineString,
    Polygon,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown draw mode '{0}'")]
pub struct UnknownDrawMode(pub String);

impl FromStr for DrawMode {
    type Err = UnknownDrawMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Point" => Ok(Self::Point),
            "LineString" => Ok(Self::LineString),
            "Polygon" => Ok(Self::Polygon),
            other => Err(UnknownDrawMode(other.to_owned())),
        }
    }
}

impl fmt::Display for DrawMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Point => "Point",
            Self::LineString => "LineString",
            Self::Polygon => "Polygon",
        })
    }
}

impl DrawMode {
    /// Read the `type` parameter of a query string like `?type=Polygon`. Missing or unknown value
    /// means [`DrawMode::Point`].
    pub fn from_query(query: &str) -> Self {
        let query = query.trim_start_matches('?');
        let Some((_, value)) =
            url::form_urlencoded::parse(query.as_bytes()).find(|(key, _)| key == "type")
        else {
            return Self::default();
        };

        value.parse().unwrap_or_else(|err| {
            log::debug!("{err}, drawing points.");
            Self::default()
        })
    }

    /// Number of vertices needed to finish the shape.
    fn min_vertices(self) -> usize {
        match self {
            Self::Point => 1,
            Self::LineString => 2,
            Self::Polygon => 3,
        }
    }

    fn feature(self, vertices: &[Position]) -> Option<Feature> {
        match self {
            Self::Point => vertices.first().copied().map(Feature::point),
            Self::LineString => Some(Feature::line_string(vertices)),
            Self::Polygon => Some(Feature::polygon(vertices)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
enum DrawState {
    #[default]
    Idle,
    Drawing {
        vertices: Vec<Position>,
        /// Where the next vertex would go.
        pointer: Option<Position>,
    },
}

/// Draw interaction. Starting a new shape clears the edit source, so that there is only one shape
/// at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct Draw {
    mode: DrawMode,
    state: DrawState,
}

impl Draw {
    pub fn new(mode: DrawMode) -> Self {
        Self {
            mode,
            state: DrawState::Idle,
        }
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, DrawState::Drawing { .. })
    }

    /// Vertices of the unfinished shape, followed by the pointer position if known.
    pub fn sketch(&self) -> Option<Vec<Position>> {
        match &self.state {
            DrawState::Idle => None,
            DrawState::Drawing { vertices, pointer } => {
                Some(vertices.iter().copied().chain(*pointer).collect())
            }
        }
    }

    /// React to the gesture. `position` is the pointer's position, already snapped. Returns the
    /// finished feature, which is also put in the `source`.
    pub fn handle(
        &mut self,
        gesture: Gesture,
        position: Option<Position>,
        source: &mut EditSource,
        viewport: &dyn Viewport,
    ) -> Option<Feature> {
        match (gesture, position) {
            (Gesture::Click(screen), Some(position)) => {
                self.click(screen, position, source, viewport)
            }
            (Gesture::DoubleClick(_), _) => self.finish(source),
            (Gesture::Hover(_), position) => {
                if let DrawState::Drawing { pointer, .. } = &mut self.state {
                    *pointer = position;
                }
                None
            }
            (Gesture::Cancel, _) => {
                if self.is_drawing() {
                    log::debug!("{} drawing aborted.", self.mode);
                }
                self.state = DrawState::Idle;
                None
            }
            _ => None,
        }
    }

    fn click(
        &mut self,
        screen: Pos2,
        position: Position,
        source: &mut EditSource,
        viewport: &dyn Viewport,
    ) -> Option<Feature> {
        let DrawState::Drawing { vertices, .. } = &mut self.state else {
            log::debug!("{} drawing started.", self.mode);
            source.clear();
            self.state = DrawState::Drawing {
                vertices: vec![position],
                pointer: None,
            };
            return if self.mode == DrawMode::Point {
                self.finish(source)
            } else {
                None
            };
        };

        let near = |vertex: Option<&Position>| {
            vertex.is_some_and(|vertex| {
                viewport.project(*vertex).distance(screen) <= FINISH_TOLERANCE
            })
        };

        let closes =
            near(vertices.last()) || (self.mode == DrawMode::Polygon && near(vertices.first()));

        if closes {
            if vertices.len() >= self.mode.min_vertices() {
                return self.finish(source);
            }
            // Too few vertices to finish, and a duplicate is not wanted.
            return None;
        }

        vertices.push(position);
        None
    }

    fn finish(&mut self, source: &mut EditSource) -> Option<Feature> {
        let DrawState::Drawing { vertices, .. } = &self.state else {
            return None;
        };

        if vertices.len() < self.mode.min_vertices() {
            return None;
        }

        let feature = self.mode.feature(vertices)?;
        log::debug!("{} drawn: {}", self.mode, feature.coordinates_text());

        self.state = DrawState::Idle;
        source.set(feature.clone());
        Some(feature)
    }
}
