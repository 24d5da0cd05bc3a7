// Defaults shared by configuration, retry policy and controller

// === Error recovery ===
pub const DEFAULT_MAX_AUTO_RETRIES: u32 = 3;
/// First automatic retry waits this long; later ones double it
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1_000;
/// Upper bound for the exponential backoff
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 10_000;

// === Playback ===
pub const DEFAULT_VOLUME: f64 = 1.0;
pub const DEFAULT_PLAYBACK_SPEED: f64 = 1.0;
pub const MIN_VOLUME: f64 = 0.0;
pub const MAX_VOLUME: f64 = 1.0;

// === Messages ===
pub const GENERIC_PLAYBACK_ERROR: &str = "Playback failed";
pub const RETRIES_EXHAUSTED_MESSAGE: &str =
    "Failed to recover playback after multiple attempts. Please try again later.";

// === Config ===
pub const CONFIG_DIR_NAME: &str = "playback-core";
pub const CONFIG_FILE_NAME: &str = "config.toml";
