//! In-memory reference host driven by `tickbridged`.
//!
//! The sandbox stands in for a real simulation: a set of named code windows,
//! a console, a camera, a small farm grid and an unlock list. It exposes its
//! state to the bridge only through [`SandboxHost::registry`]; nothing outside
//! the host thread touches it.

use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::registry::{HandlerError, HandlerRegistry, RegistryError};

const SAVE_FILE_NAME: &str = "save.json";
const DEFAULT_LEVEL: &str = "default";
const MIN_ZOOM: f32 = 0.1;
const MAX_ZOOM: f32 = 10.0;
const FARM_SIZE: usize = 3;

/// Camera placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
    /// Zoom factor, kept within 0.1 and 10.
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Camera {
    fn parse(data: &str) -> Result<Self, HandlerError> {
        if data.trim().eq_ignore_ascii_case("reset") {
            return Ok(Self::default());
        }
        let numbers = data
            .split_whitespace()
            .map(|part| {
                part.parse::<f32>()
                    .map_err(|_| HandlerError::new(format!("Invalid camera value '{part}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        match numbers.as_slice() {
            [x, y] => Ok(Self {
                x: *x,
                y: *y,
                ..Self::default()
            }),
            [x, y, zoom] => Ok(Self {
                x: *x,
                y: *y,
                zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            }),
            _ => Err(HandlerError::new(
                "camera requires x y [zoom] coordinates or 'reset'",
            )),
        }
    }
}

/// A named code buffer on the workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeWindow {
    /// Source text.
    pub code: String,
    /// Workspace position.
    pub position: (f32, f32),
}

/// Execution state of the sandbox program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "window", rename_all = "snake_case")]
pub enum Execution {
    /// Nothing runs.
    Idle,
    /// A window runs freely.
    Running(String),
    /// A window runs one step per request.
    Stepping(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Snapshot {
    windows: BTreeMap<String, CodeWindow>,
    farm: Vec<Vec<Option<String>>>,
    unlocks: Vec<String>,
}

/// Reference host state.
#[derive(Debug, Clone)]
pub struct SandboxHost {
    saves_dir: Utf8PathBuf,
    level: String,
    windows: BTreeMap<String, CodeWindow>,
    output: Vec<String>,
    camera: Camera,
    ui_hidden: bool,
    execution: Execution,
    farm: Vec<Vec<Option<String>>>,
    unlocks: Vec<String>,
    exit_requested: bool,
}

impl SandboxHost {
    /// Creates a sandbox with a single empty `main` window.
    pub fn new(saves_dir: impl Into<Utf8PathBuf>) -> Self {
        let mut windows = BTreeMap::new();
        windows.insert("main".to_owned(), CodeWindow::default());
        Self {
            saves_dir: saves_dir.into(),
            level: DEFAULT_LEVEL.to_owned(),
            windows,
            output: Vec::new(),
            camera: Camera::default(),
            ui_hidden: false,
            execution: Execution::Idle,
            farm: vec![vec![None; FARM_SIZE]; FARM_SIZE],
            unlocks: vec!["speed".to_owned()],
            exit_requested: false,
        }
    }

    /// True once `exitgame` has been processed.
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Current camera.
    pub fn camera(&self) -> Camera {
        self.camera
    }

    /// Whether the UI is hidden.
    pub fn ui_hidden(&self) -> bool {
        self.ui_hidden
    }

    /// Current execution state.
    pub fn execution(&self) -> &Execution {
        &self.execution
    }

    /// Console lines written so far.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Advances the simulation by one step.
    ///
    /// A running window plants its name in the next empty farm tile; a
    /// stepping window waits for the next `stepbystep` request.
    pub fn advance(&mut self) {
        let Execution::Running(window) = &self.execution else {
            return;
        };
        let crop = window.clone();
        if let Some(tile) = self.farm.iter_mut().flatten().find(|tile| tile.is_none()) {
            *tile = Some(crop);
        }
    }

    fn window_mut(&mut self, name: &str) -> Result<&mut CodeWindow, HandlerError> {
        self.windows
            .get_mut(name)
            .ok_or_else(|| HandlerError::new(format!("Window '{name}' not found")))
    }

    fn window(&self, name: &str) -> Result<&CodeWindow, HandlerError> {
        self.windows
            .get(name)
            .ok_or_else(|| HandlerError::new(format!("Window '{name}' not found")))
    }

    fn print(&mut self, line: impl Into<String>) {
        self.output.push(line.into());
    }

    fn level_file(&self, level: &str) -> Utf8PathBuf {
        self.saves_dir.join(level).join(SAVE_FILE_NAME)
    }

    fn run_start(&mut self, window: &str) -> Result<(), HandlerError> {
        self.window(window)?;
        self.execution = Execution::Running(window.to_owned());
        self.print(format!("Running {window}"));
        Ok(())
    }

    fn step(&mut self, window: &str) -> Result<(), HandlerError> {
        self.window(window)?;
        if self.execution == Execution::Stepping(window.to_owned()) {
            self.execution = Execution::Running(window.to_owned());
            self.advance();
        }
        self.execution = Execution::Stepping(window.to_owned());
        self.print(format!("Stepping {window}"));
        Ok(())
    }

    fn set_code(&mut self, data: &str) -> Result<(), HandlerError> {
        let (name, code) = data
            .split_once('|')
            .ok_or_else(|| HandlerError::new("setcode requires window_name and code"))?;
        self.window_mut(name)?.code = code.to_owned();
        Ok(())
    }

    fn create_file(&mut self, name: &str) -> Result<(), HandlerError> {
        if self.windows.contains_key(name) {
            return Err(HandlerError::new(format!("Window '{name}' already exists")));
        }
        self.windows.insert(name.to_owned(), CodeWindow::default());
        Ok(())
    }

    fn delete_file(&mut self, name: &str) -> Result<(), HandlerError> {
        self.windows
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| HandlerError::new(format!("Window '{name}' not found")))
    }

    fn move_window(&mut self, data: &str) -> Result<(), HandlerError> {
        let mut parts = data.split_whitespace();
        let (Some(name), Some(x), Some(y)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(HandlerError::new("movewindow requires window_name x y"));
        };
        let parse = |value: &str| {
            value
                .parse::<f32>()
                .map_err(|_| HandlerError::new(format!("Invalid coordinate '{value}'")))
        };
        let position = (parse(x)?, parse(y)?);
        self.window_mut(name)?.position = position;
        Ok(())
    }

    fn hide_ui(&mut self, data: &str) -> Result<(), HandlerError> {
        self.ui_hidden = match data.to_ascii_lowercase().as_str() {
            "true" => true,
            "false" => false,
            _ => return Err(HandlerError::new("hideui requires true or false")),
        };
        Ok(())
    }

    fn save_game(&mut self) -> Result<(), HandlerError> {
        let path = self.level_file(&self.level);
        let snapshot = Snapshot {
            windows: self.windows.clone(),
            farm: self.farm.clone(),
            unlocks: self.unlocks.clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|error| HandlerError::new(format!("Failed to encode save: {error}")))?;
        write_file(&path, &json)?;
        self.print(format!("Saved {}", self.level));
        Ok(())
    }

    fn load_level(&mut self, level: &str) -> Result<(), HandlerError> {
        let path = self.level_file(level);
        let json = fs::read_to_string(&path)
            .map_err(|_| HandlerError::new(format!("Level '{level}' not found")))?;
        let snapshot: Snapshot = serde_json::from_str(&json)
            .map_err(|error| HandlerError::new(format!("Corrupt save {path}: {error}")))?;
        self.windows = snapshot.windows;
        self.farm = snapshot.farm;
        self.unlocks = snapshot.unlocks;
        self.level = level.to_owned();
        self.execution = Execution::Idle;
        self.print(format!("Loaded {level}"));
        Ok(())
    }

    fn window_names(&self) -> Result<String, HandlerError> {
        to_json(&self.windows.keys().collect::<Vec<_>>())
    }

    fn window_position(&self, name: &str) -> Result<String, HandlerError> {
        let (x, y) = self.window(name)?.position;
        to_json(&serde_json::json!({ "x": x, "y": y }))
    }

    /// Handler registry exposing the sandbox to the bridge.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateVerb`] if two handlers share a verb.
    pub fn registry() -> Result<HandlerRegistry<Self>, RegistryError> {
        let registry = HandlerRegistry::builder()
            .command("runstart", |host: &mut Self, data| host.run_start(data))?
            .command("stop", |host: &mut Self, _| {
                host.execution = Execution::Idle;
                Ok(())
            })?
            .command("camera", |host: &mut Self, data| {
                host.camera = Camera::parse(data)?;
                Ok(())
            })?
            .command("hideui", |host: &mut Self, data| host.hide_ui(data))?
            .command("setcode", |host: &mut Self, data| host.set_code(data))?
            .command("createfile", |host: &mut Self, data| host.create_file(data))?
            .command("deletefile", |host: &mut Self, data| host.delete_file(data))?
            .command("savegame", |host: &mut Self, _| host.save_game())?
            .command("loadlevel", |host: &mut Self, data| host.load_level(data))?
            .command("exitgame", |host: &mut Self, _| {
                host.exit_requested = true;
                Ok(())
            })?
            .command("clearoutput", |host: &mut Self, _| {
                host.output.clear();
                Ok(())
            })?
            .command("stepbystep", |host: &mut Self, data| host.step(data))?
            .command("movewindow", |host: &mut Self, data| host.move_window(data))?
            .query("getwindows", |host: &mut Self, _| host.window_names())?
            .query("getcode", |host: &mut Self, data| {
                host.window(data).map(|window| window.code.clone())
            })?
            .query("getoutput", |host: &mut Self, _| Ok(host.output.join("\n")))?
            .query("getfarm", |host: &mut Self, _| to_json(&host.farm))?
            .query("getunlocks", |host: &mut Self, _| to_json(&host.unlocks))?
            .query("getwindowposition", |host: &mut Self, data| {
                host.window_position(data)
            })?
            .build();
        Ok(registry)
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, HandlerError> {
    serde_json::to_string(value)
        .map_err(|error| HandlerError::new(format!("Failed to encode result: {error}")))
}

fn write_file(path: &Utf8Path, contents: &str) -> Result<(), HandlerError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|error| HandlerError::new(format!("Failed to create {parent}: {error}")))?;
    }
    fs::write(path, contents)
        .map_err(|error| HandlerError::new(format!("Failed to write {path}: {error}")))
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;

    struct Sandbox {
        host: SandboxHost,
        registry: HandlerRegistry<SandboxHost>,
        _saves: TempDir,
    }

    impl Sandbox {
        fn command(&mut self, verb: &str, payload: &str) -> Result<(), HandlerError> {
            let handler = self.registry.command(verb).expect("command handler");
            handler(&mut self.host, payload)
        }

        fn query(&mut self, verb: &str, payload: &str) -> Result<String, HandlerError> {
            let handler = self.registry.query(verb).expect("query handler");
            handler(&mut self.host, payload)
        }
    }

    #[fixture]
    fn sandbox() -> Sandbox {
        let saves = TempDir::new().expect("saves dir");
        let saves_dir =
            Utf8PathBuf::from_path_buf(saves.path().to_path_buf()).expect("utf8 temp path");
        Sandbox {
            host: SandboxHost::new(saves_dir),
            registry: SandboxHost::registry().expect("registry"),
            _saves: saves,
        }
    }

    #[rstest]
    fn registry_covers_every_bridge_verb(sandbox: Sandbox) {
        assert_eq!(sandbox.registry.command_verbs().len(), 13);
        assert_eq!(sandbox.registry.query_verbs().len(), 6);
    }

    #[rstest]
    #[case("reset", Camera::default())]
    #[case("4 -2", Camera { x: 4.0, y: -2.0, zoom: 1.0 })]
    #[case("1 2 50", Camera { x: 1.0, y: 2.0, zoom: 10.0 })]
    #[case("1 2 0", Camera { x: 1.0, y: 2.0, zoom: 0.1 })]
    fn camera_accepts_coordinates_and_reset(
        mut sandbox: Sandbox,
        #[case] data: &str,
        #[case] expected: Camera,
    ) {
        sandbox.command("camera", "9 9 2").expect("move camera");
        sandbox.command("camera", data).expect("camera command");
        assert_eq!(sandbox.host.camera(), expected);
    }

    #[rstest]
    fn camera_rejects_garbage(mut sandbox: Sandbox) {
        let error = sandbox.command("camera", "left up").expect_err("bad camera");
        assert_eq!(error.message(), "Invalid camera value 'left'");
    }

    #[rstest]
    fn code_round_trips_through_windows(mut sandbox: Sandbox) {
        sandbox.command("createfile", "helper").expect("create window");
        sandbox
            .command("setcode", "helper|move(North)|harvest()")
            .expect("set code");
        assert_eq!(
            sandbox.query("getcode", "helper").expect("get code"),
            "move(North)|harvest()"
        );
        assert_eq!(
            sandbox.query("getwindows", "").expect("get windows"),
            r#"["helper","main"]"#
        );
    }

    #[rstest]
    fn missing_window_fails_on_host(mut sandbox: Sandbox) {
        let error = sandbox
            .command("runstart", "missingWindow")
            .expect_err("missing window");
        assert_eq!(error.message(), "Window 'missingWindow' not found");
        assert_eq!(
            sandbox.query("getcode", "missingWindow").expect_err("missing").message(),
            "Window 'missingWindow' not found"
        );
    }

    #[rstest]
    fn movewindow_updates_position(mut sandbox: Sandbox) {
        sandbox.command("movewindow", "main 40 -8").expect("move window");
        assert_eq!(
            sandbox
                .query("getwindowposition", "main")
                .expect("window position"),
            r#"{"x":40.0,"y":-8.0}"#
        );
    }

    #[rstest]
    fn running_window_plants_crops(mut sandbox: Sandbox) {
        sandbox.command("runstart", "main").expect("run main");
        sandbox.host.advance();
        sandbox.host.advance();
        let farm = sandbox.query("getfarm", "").expect("farm");
        assert!(farm.starts_with(r#"[["main","main",null]"#), "{farm}");
        sandbox.command("stop", "").expect("stop");
        assert_eq!(sandbox.host.execution(), &Execution::Idle);
    }

    #[rstest]
    fn save_then_load_restores_windows(mut sandbox: Sandbox) {
        sandbox.command("setcode", "main|do_a_flip()").expect("set code");
        sandbox.command("savegame", "").expect("save");
        sandbox.command("setcode", "main|changed").expect("set code");

        sandbox.command("loadlevel", "default").expect("load");
        assert_eq!(
            sandbox.query("getcode", "main").expect("get code"),
            "do_a_flip()"
        );
        assert_eq!(
            sandbox.query("getoutput", "").expect("output"),
            "Saved default\nLoaded default"
        );
    }

    #[rstest]
    fn unknown_level_fails(mut sandbox: Sandbox) {
        let error = sandbox.command("loadlevel", "moon").expect_err("missing level");
        assert_eq!(error.message(), "Level 'moon' not found");
    }

    #[rstest]
    #[case("TRUE", true)]
    #[case("false", false)]
    fn hideui_parses_booleans(mut sandbox: Sandbox, #[case] data: &str, #[case] hidden: bool) {
        sandbox.command("hideui", data).expect("hide ui");
        assert_eq!(sandbox.host.ui_hidden(), hidden);
    }

    #[rstest]
    fn exitgame_and_clearoutput(mut sandbox: Sandbox) {
        sandbox.command("runstart", "main").expect("run");
        sandbox.command("clearoutput", "").expect("clear");
        assert!(sandbox.host.output().is_empty());
        sandbox.command("exitgame", "").expect("exit");
        assert!(sandbox.host.exit_requested());
    }
}
