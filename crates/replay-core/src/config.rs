//! User configuration management
//!
//! Handles saving and loading viewer preferences: backend address, playback
//! defaults, render mode, window geometry and logging.

use crate::logging::LogConfig;
use crate::playback::DEFAULT_FPS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default backend address
pub const DEFAULT_API_BASE: &str = "http://localhost:5000";

/// Default mesh colour (emerald)
pub const DEFAULT_MESH_COLOR: &str = "#10b981";

const MAX_RECENT_SESSIONS: usize = 10;

/// How the mesh is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Shaded triangles
    #[default]
    Solid,
    /// Triangle edges only
    Wireframe,
    /// One point per vertex, no topology needed
    Points,
}

impl RenderMode {
    /// All modes in cycling order
    pub const ALL: [RenderMode; 3] = [Self::Solid, Self::Wireframe, Self::Points];

    /// The mode after this one
    pub fn next(self) -> Self {
        match self {
            Self::Solid => Self::Wireframe,
            Self::Wireframe => Self::Points,
            Self::Points => Self::Solid,
        }
    }

    /// Whether the mode draws faces or edges from the topology
    pub fn needs_topology(self) -> bool {
        !matches!(self, Self::Points)
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solid => write!(f, "solid"),
            Self::Wireframe => write!(f, "wireframe"),
            Self::Points => write!(f, "points"),
        }
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "solid" | "mesh" => Ok(Self::Solid),
            "wireframe" => Ok(Self::Wireframe),
            "points" => Ok(Self::Points),
            other => Err(format!("unknown render mode: {}", other)),
        }
    }
}

/// User configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    /// Backend base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Playback frame rate
    #[serde(default = "default_fps")]
    pub default_fps: u32,
    /// Wrap playback at the end
    #[serde(default = "default_true")]
    pub loop_playback: bool,
    /// Start playing as soon as frames arrive
    #[serde(default)]
    pub autoplay: bool,
    /// Mesh drawing mode
    #[serde(default)]
    pub render_mode: RenderMode,
    /// Mesh colour as `#rrggbb`
    #[serde(default = "default_mesh_color")]
    pub mesh_color: String,
    /// Connect timeout for backend requests, none by default
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    /// Recently opened session files
    #[serde(default)]
    pub recent_sessions: Vec<String>,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,

    // === Window Geometry ===
    /// Window width in pixels
    #[serde(default)]
    pub window_width: Option<u32>,
    /// Window height in pixels
    #[serde(default)]
    pub window_height: Option<u32>,
    /// Window X position
    #[serde(default)]
    pub window_x: Option<i32>,
    /// Window Y position
    #[serde(default)]
    pub window_y: Option<i32>,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_fps() -> u32 {
    DEFAULT_FPS
}

fn default_true() -> bool {
    true
}

fn default_mesh_color() -> String {
    DEFAULT_MESH_COLOR.to_string()
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            default_fps: DEFAULT_FPS,
            loop_playback: true,
            autoplay: false,
            render_mode: RenderMode::default(),
            mesh_color: default_mesh_color(),
            connect_timeout_secs: None,
            recent_sessions: Vec::new(),
            log: LogConfig::default(),
            window_width: None,
            window_height: None,
            window_x: None,
            window_y: None,
        }
    }
}

impl UserConfig {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("MotionReplay");
            p.push("config.json");
            p
        })
    }

    /// Load configuration from disk, falling back to defaults
    pub fn load() -> Self {
        Self::config_path()
            .filter(|path| path.exists())
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Load from a specific file, falling back to defaults on any error
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), std::io::Error> {
        match Self::config_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    /// Save to a specific file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
    }

    /// Add a session file to the front of the recent list
    pub fn add_recent_session(&mut self, path: &str) {
        self.recent_sessions.retain(|p| p != path);
        self.recent_sessions.insert(0, path.to_string());
        self.recent_sessions.truncate(MAX_RECENT_SESSIONS);
    }

    /// Mesh colour as RGB in `[0, 1]`
    ///
    /// Falls back to the default colour when the stored value does not parse.
    pub fn mesh_rgb(&self) -> [f32; 3] {
        parse_hex_color(&self.mesh_color)
            .or_else(|| parse_hex_color(DEFAULT_MESH_COLOR))
            .unwrap_or([0.0, 0.7, 0.5])
    }
}

/// Parse `#rrggbb` into `[r, g, b]` in `[0, 1]`
pub fn parse_hex_color(hex: &str) -> Option<[f32; 3]> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| {
        u8::from_str_radix(&digits[i..i + 2], 16)
            .ok()
            .map(|v| f32::from(v) / 255.0)
    };
    Some([channel(0)?, channel(2)?, channel(4)?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = UserConfig {
            default_fps: 30,
            render_mode: RenderMode::Wireframe,
            ..Default::default()
        };
        config.add_recent_session("/tmp/a.json");
        config.save_to(&path).unwrap();

        let loaded = UserConfig::load_from(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "autoplay": true }"#).unwrap();

        let config = UserConfig::load_from(&path);
        assert!(config.autoplay);
        assert!(config.loop_playback);
        assert_eq!(config.default_fps, DEFAULT_FPS);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn test_recent_sessions_dedup_and_cap() {
        let mut config = UserConfig::default();
        for i in 0..12 {
            config.add_recent_session(&format!("s{}.json", i));
        }
        config.add_recent_session("s5.json");
        assert_eq!(config.recent_sessions.len(), MAX_RECENT_SESSIONS);
        assert_eq!(config.recent_sessions[0], "s5.json");
        assert_eq!(
            config
                .recent_sessions
                .iter()
                .filter(|s| *s == "s5.json")
                .count(),
            1
        );
    }

    #[test]
    fn test_mesh_rgb() {
        let config = UserConfig::default();
        let rgb = config.mesh_rgb();
        assert!((rgb[0] - 16.0 / 255.0).abs() < 1e-6);
        assert!((rgb[1] - 185.0 / 255.0).abs() < 1e-6);

        let bad = UserConfig {
            mesh_color: "green".into(),
            ..Default::default()
        };
        assert_eq!(bad.mesh_rgb(), rgb);
    }

    #[test]
    fn test_render_mode_cycle_and_parse() {
        assert_eq!(RenderMode::Points.next(), RenderMode::Solid);
        assert_eq!("Wireframe".parse::<RenderMode>(), Ok(RenderMode::Wireframe));
        assert!("shaded".parse::<RenderMode>().is_err());
    }
}
