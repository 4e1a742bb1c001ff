use clap::Parser;
use std::path::PathBuf;

/// `nviz-canvas` - replays a layer tree against the 3D canvas bookkeeping.
///
/// Reads a JSON scene description, loads it through a dry-run display engine
/// and prints the equivalent `nviz_cmd` batch command on stdout.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// JSON scene description: layer tree, vector feature counts and constants.
    #[arg(env = "NVIZ_SCENE")]
    pub scene: PathBuf,

    /// JSON preferences file; built-in defaults are used for missing keys.
    #[arg(long, env = "NVIZ_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Canvas width in pixels.
    #[arg(long, default_value_t = 640)]
    pub width: u32,

    /// Canvas height in pixels.
    #[arg(long, default_value_t = 480)]
    pub height: u32,

    /// How long to wait for the display engine to come up.
    #[arg(long, env = "NVIZ_STARTUP_TIMEOUT_MS", default_value_t = 5000)]
    pub startup_timeout_ms: u64,

    /// Emit logs as JSON lines.
    #[arg(long, env = "NVIZ_JSON_LOGS")]
    pub json_logs: bool,

    /// Also save the rendered image to this path.
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Print every engine call to stderr.
    #[arg(long)]
    pub journal: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_overrides() {
        let config = Config::try_parse_from(["nviz-canvas", "scene.json", "--width", "800"]).unwrap();
        assert_eq!(config.scene, PathBuf::from("scene.json"));
        assert_eq!(config.width, 800);
        assert_eq!(config.height, 480);
        assert!(config.image.is_none());
    }
}
