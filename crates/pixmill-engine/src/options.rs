//! Filter commands and their options.
//!
//! Callers describe an operation with a command name and an optional
//! JSON object of options. [`FilterOptions::from_json`] resolves that
//! once per invocation: a string `channels` value is normalized to the
//! structured form, the caller's object is deep-merged over the defaults
//! (nested objects merge key by key, everything else is replaced), and
//! the result is deserialized into a typed [`FilterOptions`]. Nothing
//! downstream inspects option shapes at runtime.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::channels::ChannelMask;
use crate::region::RegionSpec;
use crate::sink::Reducer;
use crate::types::FilterError;

/// Named operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Soft blur (radius < 2) or Gaussian blur.
    Blur,
    /// Sharpen; `more` selects the stronger kernel.
    Sharpen,
    /// Laplacian edge detection.
    Edges,
    /// Emboss; `more` selects the stronger kernel.
    Emboss,
    /// Scale channels by `factor` and shift by `bias`.
    Brightness,
    /// 3×3 box average.
    Mean,
    /// Luminance color matrix.
    Grayscale,
    /// Sepia color matrix.
    Sepia,
    /// Caller-supplied color matrix.
    Color,
    /// Caller-supplied convolution kernel.
    Matrix,
    /// Contrast curve driven by `level`.
    Contrast,
    /// Invert color channels.
    Negate,
    /// Random noise of amplitude `level`.
    Noise,
    /// Resample to `width` × `height`.
    Resize,
    /// Store the target's encoded state in its backup slot.
    Save,
    /// Reload the backup slot, if any.
    Restore,
    /// Color histogram over the region, handed to the reducer.
    Sample,
    /// Re-encode the target as PNG.
    Png,
    /// Re-encode the target as JPEG with quality `factor`.
    Jpeg,
}

impl Command {
    /// Every command, in declaration order.
    pub const ALL: [Self; 19] = [
        Self::Blur,
        Self::Sharpen,
        Self::Edges,
        Self::Emboss,
        Self::Brightness,
        Self::Mean,
        Self::Grayscale,
        Self::Sepia,
        Self::Color,
        Self::Matrix,
        Self::Contrast,
        Self::Negate,
        Self::Noise,
        Self::Resize,
        Self::Save,
        Self::Restore,
        Self::Sample,
        Self::Png,
        Self::Jpeg,
    ];

    /// Lowercase command name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Blur => "blur",
            Self::Sharpen => "sharpen",
            Self::Edges => "edges",
            Self::Emboss => "emboss",
            Self::Brightness => "brightness",
            Self::Mean => "mean",
            Self::Grayscale => "grayscale",
            Self::Sepia => "sepia",
            Self::Color => "color",
            Self::Matrix => "matrix",
            Self::Contrast => "contrast",
            Self::Negate => "negate",
            Self::Noise => "noise",
            Self::Resize => "resize",
            Self::Save => "save",
            Self::Restore => "restore",
            Self::Sample => "sample",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| FilterError::InvalidConfig(format!("unknown command `{s}`")))
    }
}

/// Fully resolved options for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterOptions {
    /// The operation to run.
    pub command: Command,

    /// Convolution kernel or color matrix, rows outer.
    pub matrix: Vec<Vec<f64>>,

    /// Linear factor applied to every computed channel value.
    /// Reinterpreted as encode quality in `[0, 1]` by `jpeg`.
    pub factor: f64,

    /// Offset added after `factor`.
    pub bias: f64,

    /// Selects the stronger variant of `sharpen` and `emboss`.
    pub more: bool,

    /// Blur radius in pixels.
    pub radius: f64,

    /// Strength for `contrast` and `noise`.
    pub level: f64,

    /// Region of interest.
    pub region: RegionSpec,

    /// Channels the operation may modify.
    pub channels: ChannelMask,

    /// Target width for `resize`.
    pub width: Option<u32>,

    /// Target height for `resize`.
    pub height: Option<u32>,

    /// Time budget of one slice before yielding.
    #[serde(with = "crate::clock::duration_millis")]
    pub interval: Duration,

    /// Process the whole region without yielding.
    pub sync: bool,

    /// Seed for `noise`; unseeded runs derive one per job.
    pub seed: Option<u64>,
}

impl FilterOptions {
    /// Default slice budget.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);
    /// Default `level`.
    pub const DEFAULT_LEVEL: f64 = 50.0;
    /// Default `radius`.
    pub const DEFAULT_RADIUS: f64 = 1.0;

    /// The identity-pass kernel used when no matrix is supplied.
    #[must_use]
    pub fn identity_matrix() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 0.0],
        ]
    }

    /// Defaults for `command`.
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            command,
            matrix: Self::identity_matrix(),
            factor: 1.0,
            bias: 0.0,
            more: false,
            radius: Self::DEFAULT_RADIUS,
            level: Self::DEFAULT_LEVEL,
            region: RegionSpec::default(),
            channels: ChannelMask::ALL,
            width: None,
            height: None,
            interval: Self::DEFAULT_INTERVAL,
            sync: false,
            seed: None,
        }
    }

    /// Resolve caller JSON over the defaults.
    ///
    /// `command` names the operation; when `None` the options object
    /// must carry a `command` field instead. When both are present the
    /// explicit argument wins.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidConfig`] if `options` is not an
    /// object, no command is given, the command is unknown, or a field
    /// has the wrong shape.
    pub fn from_json(command: Option<&str>, options: Option<&Value>) -> Result<Self, FilterError> {
        let mut caller = match options {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                return Err(FilterError::InvalidConfig(format!(
                    "options must be an object, got {other}"
                )));
            }
        };

        if let Some(name) = command {
            caller.insert("command".to_owned(), Value::String(name.to_owned()));
        }
        let name = match caller.get("command") {
            Some(Value::String(name)) => name.parse::<Command>()?,
            Some(other) => {
                return Err(FilterError::InvalidConfig(format!(
                    "command must be a string, got {other}"
                )));
            }
            None => return Err(FilterError::InvalidConfig("no command given".to_owned())),
        };

        if let Some(Value::String(notation)) = caller.get("channels") {
            let mask = ChannelMask::parse(notation);
            let structured = serde_json::to_value(mask)
                .map_err(|e| FilterError::InvalidConfig(e.to_string()))?;
            caller.insert("channels".to_owned(), structured);
        }

        let mut merged = serde_json::to_value(Self::new(name))
            .map_err(|e| FilterError::InvalidConfig(e.to_string()))?;
        deep_merge(&mut merged, Value::Object(caller));

        serde_json::from_value(merged).map_err(|e| FilterError::InvalidConfig(e.to_string()))
    }
}

/// Merge `overlay` into `base`: objects merge recursively, every other
/// value (including arrays) replaces what was there.
fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => deep_merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// One submission: resolved options plus an optional result reducer.
pub struct FilterRequest {
    /// Resolved options.
    pub options: FilterOptions,
    /// Called with the final output before `complete` is emitted.
    pub reducer: Option<Reducer>,
}

impl FilterRequest {
    /// A request with default options.
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self::from(FilterOptions::new(command))
    }

    /// Command name plus optional JSON options.
    ///
    /// # Errors
    ///
    /// See [`FilterOptions::from_json`].
    pub fn parse(command: &str, options: Option<&Value>) -> Result<Self, FilterError> {
        FilterOptions::from_json(Some(command), options).map(Self::from)
    }

    /// A single JSON object carrying its own `command`.
    ///
    /// # Errors
    ///
    /// See [`FilterOptions::from_json`].
    pub fn from_value(options: &Value) -> Result<Self, FilterError> {
        FilterOptions::from_json(None, Some(options)).map(Self::from)
    }

    /// Attach a reducer.
    #[must_use]
    pub fn with_reducer(
        mut self,
        reducer: impl FnOnce(&dyn crate::surface::Surface, &crate::sink::FilterOutput) + 'static,
    ) -> Self {
        self.reducer = Some(Box::new(reducer));
        self
    }

    /// The command this request runs.
    #[must_use]
    pub const fn command(&self) -> Command {
        self.options.command
    }
}

impl From<FilterOptions> for FilterRequest {
    fn from(options: FilterOptions) -> Self {
        Self {
            options,
            reducer: None,
        }
    }
}

impl From<Command> for FilterRequest {
    fn from(command: Command) -> Self {
        Self::new(command)
    }
}

impl fmt::Debug for FilterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRequest")
            .field("options", &self.options)
            .field("reducer", &self.reducer.is_some())
            .finish()
    }
}
