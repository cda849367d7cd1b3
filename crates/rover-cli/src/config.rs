//! Mission configuration file – reads/writes `rover.toml`.

use std::fs;
use std::path::Path;

use rover_runtime::MissionConfig;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_PATH: &str = "rover.toml";

/// Load the config from `path`.  Returns `None` if the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<MissionConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: MissionConfig =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `ROVER_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ROVER_WORLD_SIZE` | `perception.world_size` |
/// | `ROVER_THROTTLE_SET` | `navigation.throttle_set` |
/// | `ROVER_MAX_VEL` | `navigation.max_vel` |
///
/// Values that fail to parse are ignored.
pub fn apply_env_overrides(cfg: &mut MissionConfig) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

fn apply_overrides(cfg: &mut MissionConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("ROVER_WORLD_SIZE")
        && let Ok(size) = v.parse::<usize>()
    {
        cfg.perception.world_size = size;
    }
    if let Some(v) = lookup("ROVER_THROTTLE_SET")
        && let Ok(throttle) = v.parse::<f32>()
    {
        cfg.navigation.throttle_set = throttle;
    }
    if let Some(v) = lookup("ROVER_MAX_VEL")
        && let Ok(max_vel) = v.parse::<f32>()
    {
        cfg.navigation.max_vel = max_vel;
    }
}

/// Save the config to `path`, creating parent directories if necessary.
pub fn save_to(cfg: &MissionConfig, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}
