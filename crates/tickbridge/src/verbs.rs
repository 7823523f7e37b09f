//! Wire-side verb catalogue.
//!
//! The catalogue decides, on the connection thread, how a request is served:
//! queued as a command, queued as a query, or answered directly. It also
//! validates arity and shapes the payload the host handler will see, so a
//! malformed request never reaches the queue.

use std::collections::HashMap;

use thiserror::Error;

use crate::wire::{Request, WireError};

/// Requests answered on the connection thread without touching host state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectVerb {
    /// Liveness check answered with `PONG`.
    Ping,
    /// Lists saved levels from the saves directory.
    Levels,
}

/// How a verb is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbKind {
    /// Queued and acknowledged immediately.
    Command,
    /// Queued; the connection blocks for the host's answer.
    Query,
    /// Answered on the connection thread.
    Direct(DirectVerb),
}

/// How request arguments become the queued payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// Arguments are ignored; the payload is empty.
    Empty,
    /// The first argument, which is required.
    First,
    /// Everything after the verb, which must be non-empty.
    Remainder,
    /// Both the first argument and the remainder, joined by `separator`.
    Pair { separator: char },
}

/// Catalogue entry for one verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerbSpec {
    name: String,
    kind: VerbKind,
    shape: PayloadShape,
    usage: String,
}

impl VerbSpec {
    /// Creates an entry. The name is stored lower-cased.
    pub fn new(
        name: impl AsRef<str>,
        kind: VerbKind,
        shape: PayloadShape,
        usage: impl Into<String>,
    ) -> Self {
        Self {
            name: name.as_ref().to_lowercase(),
            kind,
            shape,
            usage: usage.into(),
        }
    }

    /// Command entry.
    pub fn command(name: &str, shape: PayloadShape, usage: &str) -> Self {
        Self::new(name, VerbKind::Command, shape, usage)
    }

    /// Query entry.
    pub fn query(name: &str, shape: PayloadShape, usage: &str) -> Self {
        Self::new(name, VerbKind::Query, shape, usage)
    }

    /// Lower-cased verb name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How the verb is served.
    pub fn kind(&self) -> VerbKind {
        self.kind
    }

    /// Payload shape.
    pub fn shape(&self) -> PayloadShape {
        self.shape
    }

    /// Message returned when arguments are missing.
    pub fn usage(&self) -> &str {
        &self.usage
    }

    /// Builds the queued payload from a request.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::MissingArguments`] carrying the usage message
    /// when the request lacks a required argument.
    pub fn payload(&self, request: &Request) -> Result<String, WireError> {
        let missing = || WireError::missing_arguments(&self.name, &self.usage);
        match self.shape {
            PayloadShape::Empty => Ok(String::new()),
            PayloadShape::First => request.first().map(str::to_owned).ok_or_else(missing),
            PayloadShape::Remainder => request.remainder().ok_or_else(missing),
            PayloadShape::Pair { separator } => match (request.first(), request.rest()) {
                (Some(first), Some(rest)) => Ok(format!("{first}{separator}{rest}")),
                _ => Err(missing()),
            },
        }
    }
}

/// Errors raised while extending a catalogue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// The verb is already present.
    #[error("verb '{verb}' is already in the catalogue")]
    DuplicateVerb { verb: String },
}

/// Lookup table from verb name to [`VerbSpec`].
#[derive(Debug, Clone, Default)]
pub struct VerbCatalog {
    verbs: HashMap<String, VerbSpec>,
}

impl VerbCatalog {
    /// Creates an empty catalogue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalogue of the built-in remote-control verbs.
    pub fn builtin() -> Self {
        use PayloadShape::{Empty, First, Pair, Remainder};

        let entries = [
            VerbSpec::command("runstart", First, "runstart requires a window name"),
            VerbSpec::command("stop", Empty, ""),
            VerbSpec::command(
                "camera",
                Remainder,
                "camera requires x y [zoom] coordinates or 'reset'",
            ),
            VerbSpec::command("hideui", First, "hideui requires true or false"),
            VerbSpec::command(
                "setcode",
                Pair { separator: '|' },
                "setcode requires window_name and code",
            ),
            VerbSpec::command("createfile", First, "createfile requires window_name"),
            VerbSpec::command("deletefile", First, "deletefile requires window_name"),
            VerbSpec::command("savegame", Empty, ""),
            VerbSpec::command("loadlevel", First, "loadlevel requires level_name"),
            VerbSpec::command("exitgame", Empty, ""),
            VerbSpec::command("clearoutput", Empty, ""),
            VerbSpec::command("stepbystep", First, "stepbystep requires window_name"),
            VerbSpec::command(
                "movewindow",
                Pair { separator: ' ' },
                "movewindow requires window_name x y",
            ),
            VerbSpec::query("getwindows", Empty, ""),
            VerbSpec::query("getcode", First, "getcode requires window_name"),
            VerbSpec::query("getoutput", Empty, ""),
            VerbSpec::query("getfarm", Empty, ""),
            VerbSpec::query("getunlocks", Empty, ""),
            VerbSpec::query(
                "getwindowposition",
                First,
                "getwindowposition requires window_name",
            ),
            VerbSpec::new("ping", VerbKind::Direct(DirectVerb::Ping), Empty, ""),
            VerbSpec::new("getlevels", VerbKind::Direct(DirectVerb::Levels), Empty, ""),
        ];

        Self {
            verbs: entries
                .into_iter()
                .map(|spec| (spec.name.clone(), spec))
                .collect(),
        }
    }

    /// Adds a verb.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateVerb`] when the name is taken.
    pub fn with_verb(mut self, spec: VerbSpec) -> Result<Self, CatalogError> {
        if self.verbs.contains_key(spec.name()) {
            return Err(CatalogError::DuplicateVerb {
                verb: spec.name.clone(),
            });
        }
        self.verbs.insert(spec.name.clone(), spec);
        Ok(self)
    }

    /// Looks up a verb case-insensitively.
    pub fn lookup(&self, verb: &str) -> Option<&VerbSpec> {
        self.verbs.get(&verb.to_lowercase())
    }

    /// Resolves a request to its catalogue entry.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnknownVerb`] when the verb is not catalogued.
    pub fn resolve(&self, request: &Request) -> Result<&VerbSpec, WireError> {
        self.lookup(request.verb())
            .ok_or_else(|| WireError::unknown_verb(request.verb()))
    }

    /// Iterates over catalogued verbs of the given kind.
    pub fn verbs_of(&self, kind: VerbKind) -> impl Iterator<Item = &VerbSpec> {
        self.verbs.values().filter(move |spec| spec.kind == kind)
    }

    /// Number of catalogued verbs.
    pub fn len(&self) -> usize {
        self.verbs.len()
    }

    /// Returns true when the catalogue is empty.
    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn catalog() -> VerbCatalog {
        VerbCatalog::builtin()
    }

    fn payload_for(catalog: &VerbCatalog, line: &str) -> Result<String, WireError> {
        let request = Request::parse(line)?;
        catalog.resolve(&request)?.payload(&request)
    }

    #[rstest]
    fn builtin_catalogue_partitions_verbs(catalog: VerbCatalog) {
        assert_eq!(catalog.verbs_of(VerbKind::Command).count(), 13);
        assert_eq!(catalog.verbs_of(VerbKind::Query).count(), 6);
        assert_eq!(catalog.len(), 21);
    }

    #[rstest]
    #[case("stop", "")]
    #[case("stop now please", "")]
    #[case("runstart main", "main")]
    #[case("runstart main extra words", "main")]
    #[case("camera reset", "reset")]
    #[case("camera 10 -4 2.5", "10 -4 2.5")]
    #[case("setcode main print('hi there')", "main|print('hi there')")]
    #[case("movewindow main 40 80", "main 40 80")]
    #[case("GETCODE main", "main")]
    fn shapes_payloads(catalog: VerbCatalog, #[case] line: &str, #[case] expected: &str) {
        assert_eq!(payload_for(&catalog, line).expect("payload"), expected);
    }

    #[rstest]
    #[case("runstart", "runstart requires a window name")]
    #[case("camera", "camera requires x y [zoom] coordinates or 'reset'")]
    #[case("setcode main", "setcode requires window_name and code")]
    #[case("movewindow main", "movewindow requires window_name x y")]
    #[case("getwindowposition", "getwindowposition requires window_name")]
    fn missing_arguments_report_usage(
        catalog: VerbCatalog,
        #[case] line: &str,
        #[case] usage: &str,
    ) {
        let error = payload_for(&catalog, line).expect_err("missing arguments");
        assert_eq!(error.to_string(), usage);
    }

    #[rstest]
    fn unknown_verb_is_rejected(catalog: VerbCatalog) {
        let error = payload_for(&catalog, "teleport 1 2").expect_err("unknown verb");
        assert_eq!(error.to_string(), "Unknown command 'teleport'");
    }

    #[rstest]
    fn extension_rejects_duplicates(catalog: VerbCatalog) {
        let extended = catalog
            .with_verb(VerbSpec::query("getclock", PayloadShape::Empty, ""))
            .expect("new verb");
        assert!(extended.lookup("GetClock").is_some());

        let error = extended
            .with_verb(VerbSpec::command("STOP", PayloadShape::Empty, ""))
            .expect_err("duplicate verb");
        assert_eq!(
            error,
            CatalogError::DuplicateVerb {
                verb: "stop".to_owned()
            }
        );
    }
}
