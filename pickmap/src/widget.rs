use egui::{Context, Response, Ui};
use futures::channel::mpsc::{TryRecvError, UnboundedReceiver};

use crate::basemap::{Basemap, BasemapDescriptor};
use crate::bridge::{HostBridge, HostChannel, HostEvent};
use crate::config::{Config, ConfigError, ConfigLoader};
use crate::controls::{MousePosition, ScaleLine};
use crate::dialog::{DialogAction, PickDialog};
use crate::download::HttpOptions;
use crate::edit::{DrawMode, EditLayer, EditSession};
use crate::http_tiles::HttpTiles;
use crate::io::Runtime;
use crate::map::{Map, MapMemory};
use crate::sources::Attribution;
use crate::style::Style;
use crate::tiles::Tiles;
use crate::{Position, lon_lat};

/// Everything which is rebuilt when the basemap changes.
struct MapInstance {
    descriptor: BasemapDescriptor,
    tiles: HttpTiles,
    session: EditSession,
}

/// Complete picking widget: basemap loaded from the configuration, single editable shape, the
/// confirmation dialog and the bridge to the host. It must persist between frames.
pub struct PickWidget {
    egui_ctx: Context,
    runtime: Runtime,
    http_options: HttpOptions,
    /// Query string of the page, e.g. `?type=Polygon`.
    query: String,
    bridge: HostBridge,
    inbox: Option<UnboundedReceiver<HostEvent>>,
    loader: Option<ConfigLoader>,
    map: Option<MapInstance>,
    memory: MapMemory,
    home: Position,
    dialog: PickDialog,
    style: Style,
}

impl PickWidget {
    pub fn new(egui_ctx: Context, channel: impl HostChannel + 'static) -> Self {
        Self {
            egui_ctx,
            runtime: Runtime::new(),
            http_options: HttpOptions::default(),
            query: String::new(),
            bridge: HostBridge::new(channel),
            inbox: None,
            loader: None,
            map: None,
            memory: MapMemory::default(),
            home: lon_lat(119., 23.),
            dialog: PickDialog::default(),
            style: Style::default(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.set_query(query);
        self
    }

    /// Events coming from the host, polled every frame.
    pub fn with_inbox(mut self, inbox: UnboundedReceiver<HostEvent>) -> Self {
        self.inbox = Some(inbox);
        self
    }

    pub fn with_http_options(mut self, http_options: HttpOptions) -> Self {
        self.http_options = http_options;
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Start loading the configuration. URLs are downloaded in the background, anything else is
    /// read from the filesystem (native only). Failure leaves the map uninitialized.
    pub fn load_config(&mut self, location: &str) {
        if location.starts_with("http://") || location.starts_with("https://") {
            log::info!("Loading configuration from {location}.");
            self.loader = Some(ConfigLoader::spawn(
                location.to_owned(),
                self.http_options.clone(),
                &self.runtime,
                self.egui_ctx.clone(),
            ));
            return;
        }

        #[cfg(not(target_arch = "wasm32"))]
        self.config_loaded(Config::from_path(location));

        #[cfg(target_arch = "wasm32")]
        log::warn!("Configuration can only be downloaded, '{location}' is not an URL.");
    }

    pub fn is_loading(&self) -> bool {
        self.loader.is_some()
    }

    fn config_loaded(&mut self, result: Result<Config, ConfigError>) {
        match result {
            Ok(config) => self.apply_config(config),
            Err(err) => log::warn!("Could not load the configuration: {err}"),
        }
    }

    /// Set up the bridge and the view, and build the map.
    pub fn apply_config(&mut self, config: Config) {
        self.bridge.apply_options(&config.bridge);

        let [lon, lat] = config.view.center;
        self.home = lon_lat(lon, lat);
        if let Err(err) = self.memory.set_zoom(config.view.zoom) {
            log::warn!("Ignoring configured zoom: {err}");
        }

        self.init_map(config.base_layer);
    }

    /// Build the map with the given basemap. Previous map, together with its shape, is replaced.
    pub fn init_map(&mut self, descriptor: BasemapDescriptor) {
        log::info!("Initializing map with {descriptor:?}.");

        let tiles = HttpTiles::with_options(
            Basemap::new(&descriptor),
            self.http_options.clone(),
            &self.runtime,
            self.egui_ctx.clone(),
        );

        self.dialog.close();
        self.map = Some(MapInstance {
            descriptor,
            tiles,
            session: EditSession::new(self.draw_mode()),
        });
    }

    pub fn is_initialized(&self) -> bool {
        self.map.is_some()
    }

    pub fn basemap(&self) -> Option<&BasemapDescriptor> {
        self.map.as_ref().map(|map| &map.descriptor)
    }

    pub fn attribution(&self) -> Option<Attribution> {
        self.map.as_ref().map(|map| map.tiles.attribution())
    }

    /// Change the query. Draw is replaced if the mode changes, the shape stays.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        let mode = self.draw_mode();

        if let Some(map) = &mut self.map
            && map.session.draw_mode() != Some(mode)
        {
            map.session.set_draw_mode(mode);
        }
    }

    /// Draw mode, as read from the current query.
    pub fn draw_mode(&self) -> DrawMode {
        DrawMode::from_query(&self.query)
    }

    pub fn bridge_mut(&mut self) -> &mut HostBridge {
        &mut self.bridge
    }

    pub fn map_memory_mut(&mut self) -> &mut MapMemory {
        &mut self.memory
    }

    pub fn is_dialog_open(&self) -> bool {
        self.dialog.is_open()
    }

    pub fn handle_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::Message(text) => {
                if let Some(descriptor) = self.bridge.receive(&text) {
                    self.init_map(descriptor);
                }
            }
            HostEvent::Submit => self.submit(),
        }
    }

    /// Close the dialog and post its value to the host. Value is put together according to the
    /// draw mode of this moment.
    pub fn submit(&mut self) {
        let Some(value) = self.dialog.submit(self.draw_mode()) else {
            log::debug!("Nothing to submit.");
            return;
        };

        self.lock_edits();

        if let Err(err) = self.bridge.post_pick_result(value) {
            log::error!("Could not post the result: {err}");
        }
    }

    pub fn cancel(&mut self) {
        self.dialog.close();
        self.lock_edits();
    }

    /// Handle everything which came in the background.
    fn poll(&mut self) {
        if let Some(result) = self.loader.as_mut().and_then(ConfigLoader::poll) {
            if let Some(loader) = self.loader.take() {
                log::debug!("Finished loading {}.", loader.url());
            }
            self.config_loaded(result);
        }

        while let Some(event) = self.next_host_event() {
            self.handle_host_event(event);
        }
    }

    fn next_host_event(&mut self) -> Option<HostEvent> {
        let inbox = self.inbox.as_mut()?;
        match inbox.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Closed) => {
                log::debug!("Host channel closed.");
                self.inbox = None;
                None
            }
            Err(TryRecvError::Empty) => None,
        }
    }

    /// Open the dialog for shapes which were just drawn or modified.
    fn process_edit_events(&mut self) {
        let mode = self.draw_mode();
        let Some(map) = &mut self.map else {
            return;
        };

        for event in map.session.take_events() {
            self.dialog.open(event.feature(), mode);
        }
        self.lock_edits();
    }

    /// Drawing and modifying are blocked while the dialog is open.
    fn lock_edits(&mut self) {
        let open = self.dialog.is_open();
        if let Some(map) = &mut self.map {
            map.session.set_enabled(!open);
        }
    }

    /// Show the map and the dialog. Returns the map's response, if it is initialized.
    pub fn show(&mut self, ui: &mut Ui) -> Option<Response> {
        self.poll();
        self.lock_edits();

        let response = match &mut self.map {
            Some(map) => {
                let layer = EditLayer::new(&mut map.session, &self.style);
                Some(ui.add(
                    Map::new(&mut map.tiles, &mut self.memory, self.home)
                        .with_plugin(layer)
                        .with_plugin(ScaleLine)
                        .with_plugin(MousePosition),
                ))
            }
            None => {
                ui.centered_and_justified(|ui| ui.spinner());
                None
            }
        };

        self.process_edit_events();

        match self.dialog.show(ui.ctx()) {
            Some(DialogAction::Submit) => self.submit(),
            Some(DialogAction::Cancel) => self.cancel(),
            None => {}
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use egui::pos2;
    use futures::channel::mpsc::unbounded;
    use hypermocker::StatusCode;

    use super::*;
    use crate::bridge::PickValue;
    use crate::bridge::tests::RecordingChannel;
    use crate::edit::Gesture;
    use crate::edit::tests::Identity;

    fn widget(query: &str) -> (PickWidget, RecordingChannel) {
        let channel = RecordingChannel::default();
        let widget = PickWidget::new(Context::default(), channel.clone()).with_query(query);
        (widget, channel)
    }

    fn click(widget: &mut PickWidget, x: f32, y: f32) {
        if let Some(map) = &mut widget.map {
            map.session.handle(Gesture::Click(pos2(x, y)), &Identity);
        }
        widget.process_edit_events();
    }

    #[test]
    fn picked_point_is_posted_to_host() {
        let (mut widget, channel) = widget("?type=Point");
        widget.init_map(BasemapDescriptor::Osm);

        click(&mut widget, 119., 23.);
        assert!(widget.is_dialog_open());

        widget.submit();

        assert!(!widget.is_dialog_open());
        assert_eq!(
            channel.messages(),
            [r#"{"type":"pickresult","value":{"lon":"119","lat":"23"}}"#]
        );
    }

    #[test]
    fn draw_mode_is_read_again_on_submit() {
        let (mut widget, channel) = widget("?type=LineString");
        widget.init_map(BasemapDescriptor::Osm);

        click(&mut widget, 0., 0.);
        click(&mut widget, 50., 0.);
        click(&mut widget, 50., 0.);
        assert!(widget.is_dialog_open());

        widget.set_query("?type=Point");
        widget.submit();

        assert_eq!(
            channel.messages(),
            [r#"{"type":"pickresult","value":{"lon":"0","lat":"0"}}"#]
        );
    }

    #[test]
    fn changing_query_replaces_draw() {
        let (mut widget, _) = widget("");
        widget.init_map(BasemapDescriptor::Osm);
        assert_eq!(widget.draw_mode(), DrawMode::Point);

        widget.set_query("?type=Polygon");

        let session = widget.map.as_ref().map(|map| &map.session);
        assert_eq!(
            session.and_then(EditSession::draw_mode),
            Some(DrawMode::Polygon)
        );
    }

    #[test]
    fn drawing_is_ignored_while_dialog_is_open() {
        let (mut widget, _) = widget("?type=Point");
        widget.init_map(BasemapDescriptor::Osm);
        click(&mut widget, 1., 2.);
        assert!(widget.is_dialog_open());

        click(&mut widget, 5., 6.);
        assert_eq!(
            widget.dialog.form().map(|form| form.value(DrawMode::Point)),
            Some(PickValue::Point {
                lon: "1".to_owned(),
                lat: "2".to_owned()
            })
        );

        widget.cancel();
        click(&mut widget, 50., 60.);
        assert_eq!(
            widget.dialog.form().map(|form| form.value(DrawMode::Point)),
            Some(PickValue::Point {
                lon: "50".to_owned(),
                lat: "60".to_owned()
            })
        );
    }

    #[test]
    fn submit_without_dialog_posts_nothing() {
        let (mut widget, channel) = widget("");
        widget.handle_host_event(HostEvent::Submit);
        assert!(channel.messages().is_empty());
    }

    #[test]
    fn unknown_message_changes_nothing() {
        let (mut widget, _) = widget("");
        widget.init_map(BasemapDescriptor::Osm);
        widget.bridge_mut().set_listen(true);

        widget.handle_host_event(HostEvent::Message(r#"{"type":"unknown"}"#.to_owned()));

        assert_eq!(widget.basemap(), Some(&BasemapDescriptor::Osm));
    }

    #[test]
    fn initmap_replaces_basemap_when_listening() {
        let (mut widget, _) = widget("");
        widget.init_map(BasemapDescriptor::Osm);
        let message = concat!(
            r#"{"type":"initmap","value":"#,
            r#"{"type":"XYZ","url":"https://tiles.example/{z}/{x}/{y}.png"}}"#
        );

        widget.handle_host_event(HostEvent::Message(message.to_owned()));
        assert_eq!(widget.basemap(), Some(&BasemapDescriptor::Osm));

        widget.bridge_mut().set_listen(true);
        widget.handle_host_event(HostEvent::Message(message.to_owned()));
        assert!(matches!(
            widget.basemap(),
            Some(BasemapDescriptor::Xyz { .. })
        ));
    }

    #[test]
    fn initmap_with_unreachable_matrix_ids_is_survived() {
        let (mut widget, _) = widget("");
        widget.init_map(BasemapDescriptor::Osm);
        widget.bridge_mut().set_listen(true);

        widget.handle_host_event(HostEvent::Message(
            r#"{"type":"initmap","value":{"type":"WMTS","url":"u","matrixIdOffset":4294967295}}"#
                .to_owned(),
        ));

        let Some(BasemapDescriptor::Wmts(wmts)) = widget.basemap() else {
            panic!("expected WMTS basemap");
        };
        assert_eq!(wmts.matrix_id_offset, 4_294_967_295);
        assert!(widget.is_initialized());
    }

    #[test]
    fn host_events_are_read_from_inbox() {
        let (inbox_tx, inbox_rx) = unbounded();
        let (widget, channel) = widget("?type=Point");
        let mut widget = widget.with_inbox(inbox_rx);
        widget.init_map(BasemapDescriptor::Osm);
        click(&mut widget, 3., 4.);

        inbox_tx.unbounded_send(HostEvent::Submit).unwrap();
        widget.poll();

        assert_eq!(channel.messages().len(), 1);
    }

    #[test]
    fn configuration_sets_the_view() {
        let (mut widget, _) = widget("");
        let text = "{baseLayer: {}, view: {center: [21, 52], zoom: 10}, bridge: {listen: true}}";
        let config: Config = text.parse().unwrap();

        widget.apply_config(config);

        assert!(widget.is_initialized());
        assert_eq!(widget.home, lon_lat(21., 52.));
        assert_eq!(widget.memory.zoom(), 10.);
        assert!(widget.bridge_mut().is_listening());
    }

    #[tokio::test]
    async fn missing_configuration_leaves_map_uninitialized() {
        let _ = env_logger::try_init();

        let server = hypermocker::Server::bind().await;
        server
            .anticipate("/config.hjson")
            .await
            .respond_with_status(StatusCode::NOT_FOUND)
            .await;

        let (mut widget, _) = widget("");
        widget.load_config(&format!("http://localhost:{}/config.hjson", server.port()));
        assert!(widget.is_loading());

        while widget.is_loading() {
            widget.poll();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(!widget.is_initialized());
    }

    #[test]
    fn unreadable_configuration_file_is_not_fatal() {
        let (mut widget, _) = widget("");
        widget.load_config("/definitely/not/here/config.hjson");
        assert!(!widget.is_loading());
        assert!(!widget.is_initialized());
    }
}
