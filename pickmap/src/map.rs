use egui::{Context, Response, Sense, Ui, UiBuilder, Vec2, Widget};
use geo_types::Coord;

use crate::Position;
use crate::projector::Projector;
use crate::tile_grid::Extent;
use crate::tiles::{Tiles, draw_tiles};
use crate::zoom::{InvalidZoom, Zoom};

/// How much of the inertial movement is lost each frame.
const INERTIA_DECAY: f32 = 0.05;

/// Plugins allow drawing custom shapes on the map and reacting to the pointer. After implementing
/// this trait for your type, you can add it to the map with [`Map::with_plugin`].
pub trait Plugin {
    /// Function called at each frame. Returns `true` if the plugin took the pointer gesture for
    /// itself, in which case the map is not dragged.
    fn run(self: Box<Self>, ui: &mut Ui, response: &Response, projector: &Projector) -> bool;
}

/// The actual map widget. Instances are to be created on each frame, as all necessary state is
/// stored in [`Tiles`] and [`MapMemory`].
///
/// # Examples
///
/// ```
/// # use pickmap::{Map, Tiles, MapMemory, lon_lat};
///
/// fn update(ui: &mut egui::Ui, tiles: &mut dyn Tiles, map_memory: &mut MapMemory) {
///     ui.add(Map::new(tiles, map_memory, lon_lat(119., 23.)));
/// }
/// ```
pub struct Map<'a, 'b, 'c> {
    tiles: &'b mut dyn Tiles,
    memory: &'a mut MapMemory,
    home: Position,
    plugins: Vec<Box<dyn Plugin + 'c>>,
}

impl<'a, 'b, 'c> Map<'a, 'b, 'c> {
    /// `home` is where the map is centered until it gets dragged.
    pub fn new(tiles: &'b mut dyn Tiles, memory: &'a mut MapMemory, home: Position) -> Self {
        Self {
            tiles,
            memory,
            home,
            plugins: Vec::default(),
        }
    }

    /// Add plugin to the drawing pipeline.
    pub fn with_plugin(mut self, plugin: impl Plugin + 'c) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    fn projector(&self, rect: egui::Rect) -> Projector {
        Projector::new(
            rect,
            self.tiles.projection(),
            self.tiles.tile_grid(),
            self.memory.center_mode.position(self.home),
            self.memory.zoom(),
        )
    }
}

impl Widget for Map<'_, '_, '_> {
    fn ui(self, ui: &mut Ui) -> Response {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());

        let extent = self.tiles.tile_grid().extent();
        let projector = self.projector(rect);
        self.memory
            .center_mode
            .update_inertia(ui.ctx(), &projector, extent);

        let projector = self.projector(rect);
        let painter = ui.painter().with_clip_rect(rect);
        draw_tiles(&painter, &projector, self.tiles);

        let mut plugin_ui = ui.new_child(UiBuilder::new().max_rect(rect));
        plugin_ui.set_clip_rect(rect);

        let mut gesture_taken = false;
        for plugin in self.plugins {
            gesture_taken |= plugin.run(&mut plugin_ui, &response, &projector);
        }

        if !gesture_taken {
            self.memory
                .center_mode
                .handle_drag(&response, &projector, self.home, extent);
        }

        self.memory.handle_zoom(ui, &response, &projector, extent);

        response
    }
}

/// Position at the map's center. Initially, the map stays at the `home` position given to
/// [`Map::new`]. If user drags the map, it becomes "detached" and stays this way until
/// [`MapMemory::go_home`] is called.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) enum Center {
    #[default]
    Home,

    /// Centered at the exact position.
    Exact(Position),

    /// Map is moving due to inertia, and will slow down and stop after a short while.
    Inertia {
        position: Position,
        direction: Vec2,
        amount: f32,
    },
}

impl Center {
    /// Returns exact position if map is detached, `None` otherwise.
    fn detached(&self) -> Option<Position> {
        match self {
            Center::Home => None,
            Center::Exact(position) | Center::Inertia { position, .. } => Some(*position),
        }
    }

    /// Get the real position at the map's center.
    pub fn position(&self, home: Position) -> Position {
        self.detached().unwrap_or(home)
    }

    fn handle_drag(
        &mut self,
        response: &Response,
        projector: &Projector,
        home: Position,
        extent: Extent,
    ) {
        if response.dragged_by(egui::PointerButton::Primary) {
            let delta = response.drag_delta();
            *self = Center::Exact(shifted(self.position(home), delta, projector, extent));
        } else if response.drag_stopped() {
            let velocity = response.ctx.input(|input| input.pointer.velocity());
            if let Center::Exact(position) = self
                && velocity.length() > 0.
            {
                *self = Center::Inertia {
                    position: *position,
                    direction: velocity * response.ctx.input(|input| input.stable_dt),
                    amount: 1.,
                };
            }
        }
    }

    fn update_inertia(&mut self, ctx: &Context, projector: &Projector, extent: Extent) {
        if let Center::Inertia {
            position,
            direction,
            amount,
        } = self
        {
            *self = if *amount <= 0. {
                Center::Exact(*position)
            } else {
                Center::Inertia {
                    position: shifted(*position, *direction * *amount, projector, extent),
                    direction: *direction,
                    amount: *amount - INERTIA_DECAY,
                }
            };

            // Map is moving due to inertia, therefore we need to recalculate in the next frame.
            log::trace!("Requesting repaint due to non-zero inertia.");
            ctx.request_repaint();
        }
    }
}

/// Move the position by `delta` pixels on the screen, as when dragging, but do not let it leave
/// the `extent`.
fn shifted(position: Position, delta: Vec2, projector: &Projector, extent: Extent) -> Position {
    let projection = projector.projection();
    let point = projection.project(position);
    let resolution = projector.resolution();

    projection.unproject(clamp_to(
        Coord {
            x: point.x - f64::from(delta.x) * resolution,
            y: point.y + f64::from(delta.y) * resolution,
        },
        extent,
    ))
}

fn clamp_to(point: Coord, extent: Extent) -> Coord {
    Coord {
        x: point.x.clamp(extent.min_x, extent.max_x),
        y: point.y.clamp(extent.min_y, extent.max_y),
    }
}

/// State of the map widget which must persist between frames.
#[derive(Debug, Default, Clone)]
pub struct MapMemory {
    pub(crate) center_mode: Center,
    zoom: Zoom,
}

impl MapMemory {
    /// Try to zoom in, returning `Err(InvalidZoom)` if already at maximum.
    pub fn zoom_in(&mut self) -> Result<(), InvalidZoom> {
        self.zoom.zoom_in()
    }

    /// Try to zoom out, returning `Err(InvalidZoom)` if already at minimum.
    pub fn zoom_out(&mut self) -> Result<(), InvalidZoom> {
        self.zoom.zoom_out()
    }

    /// Set exact zoom level.
    pub fn set_zoom(&mut self, zoom: f64) -> Result<(), InvalidZoom> {
        self.zoom = Zoom::try_from(zoom)?;
        Ok(())
    }

    /// Returns the current zoom level.
    pub fn zoom(&self) -> f64 {
        self.zoom.into()
    }

    /// Returns exact position if map is detached (i.e. not staying at home), `None` otherwise.
    pub fn detached(&self) -> Option<Position> {
        self.center_mode.detached()
    }

    /// Center exactly at the given position.
    pub fn center_at(&mut self, position: Position) {
        self.center_mode = Center::Exact(position);
    }

    /// Go back to the home position.
    pub fn go_home(&mut self) {
        self.center_mode = Center::Home;
    }

    /// Zoom with mouse wheel or pinch, keeping the place under the pointer still.
    fn handle_zoom(&mut self, ui: &Ui, response: &Response, projector: &Projector, extent: Extent) {
        if !response.hovered() {
            return;
        }

        let (zoom_delta, scroll) =
            ui.input(|input| (input.zoom_delta(), input.smooth_scroll_delta.y));

        // Shift by 1 because of the values given by zoom_delta(). Multiply by 2, because then it
        // felt right with both mouse wheel, and a phone.
        let change = if !(0.99..=1.01).contains(&zoom_delta) {
            f64::from(zoom_delta - 1.) * 2.
        } else if scroll != 0. {
            f64::from(scroll) / 200.
        } else {
            return;
        };

        let anchor = response.hover_pos().unwrap_or(projector.clip_rect().center());
        let anchored = projector.screen_to_map(anchor);

        self.zoom.zoom_by(change);

        // Put the anchored point back under the pointer.
        let resolution = projector.resolution() * 2f64.powf(projector.zoom() - self.zoom());
        let offset = anchor - projector.clip_rect().center();
        let center = Coord {
            x: anchored.x - f64::from(offset.x) * resolution,
            y: anchored.y + f64::from(offset.y) * resolution,
        };

        self.center_mode =
            Center::Exact(projector.projection().unproject(clamp_to(center, extent)));
        ui.ctx().request_repaint();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lon_lat;
    use crate::projection::Projection;
    use crate::tile_grid::TileGrid;
    use approx::assert_relative_eq;
    use egui::{Pos2, Rect};

    fn projector(center: Position) -> Projector {
        Projector::new(
            Rect::from_min_size(Pos2::ZERO, Vec2::new(512., 256.)),
            Projection::Epsg4326,
            &TileGrid::wmts(Extent::world_degrees(), 0),
            center,
            1.,
        )
    }

    #[test]
    fn memory_starts_at_home() {
        let mut memory = MapMemory::default();
        assert_eq!(memory.detached(), None);
        assert_eq!(memory.zoom(), 4.5);

        memory.center_at(lon_lat(10., 20.));
        assert_eq!(memory.detached(), Some(lon_lat(10., 20.)));

        memory.go_home();
        assert_eq!(memory.center_mode.position(lon_lat(1., 2.)), lon_lat(1., 2.));
    }

    #[test]
    fn dragging_moves_the_map_opposite_to_the_pointer() {
        let projector = projector(lon_lat(0., 0.));

        // 0.703125 degree per pixel at zoom 1.
        let moved = shifted(
            lon_lat(0., 0.),
            Vec2::new(128., -64.),
            &projector,
            Extent::world_degrees(),
        );

        assert_relative_eq!(moved.x(), -90.);
        assert_relative_eq!(moved.y(), -45.);
    }

    #[test]
    fn dragging_stops_at_the_edge_of_the_grid() {
        let projector = projector(lon_lat(170., 80.));

        let moved = shifted(
            lon_lat(170., 80.),
            Vec2::new(-100., 100.),
            &projector,
            Extent::world_degrees(),
        );

        assert_relative_eq!(moved.x(), 180.);
        assert_relative_eq!(moved.y(), 90.);
    }

    #[test]
    fn inertia_fades_out() {
        let ctx = Context::default();
        let projector = projector(lon_lat(0., 0.));
        let mut center = Center::Inertia {
            position: lon_lat(0., 0.),
            direction: Vec2::new(1., 0.),
            amount: 0.1,
        };

        for _ in 0..10 {
            center.update_inertia(&ctx, &projector, Extent::world_degrees());
        }

        assert!(matches!(center, Center::Exact(_)));
        assert!(center.position(lon_lat(0., 0.)).x() < 0.);
    }
}
