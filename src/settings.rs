//! Viewer settings and preferences
//!
//! Persisted in LocalStorage on the web; plain defaults elsewhere.

use serde::{Deserialize, Serialize};

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Pop-burst particle budget uploaded to the GPU
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 64,
            QualityPreset::Medium => 160,
            QualityPreset::High => 256,
        }
    }

    /// How many cloud billboards the flyover shader evaluates
    pub fn max_clouds(&self) -> usize {
        match self {
            QualityPreset::Low => 16,
            QualityPreset::Medium => 40,
            QualityPreset::High => 60,
        }
    }

    /// Raymarch step budget for the terrain heightfield
    pub fn raymarch_steps(&self) -> u32 {
        match self {
            QualityPreset::Low => 64,
            QualityPreset::Medium => 112,
            QualityPreset::High => 160,
        }
    }
}

/// Viewer preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Pop and cannon sound effects
    pub sound_enabled: bool,
    /// Graphics quality preset
    pub quality: QualityPreset,
    /// Minimize motion (skips the cinematic on load)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            quality: QualityPreset::Medium,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// LocalStorage key
    const STORAGE_KEY: &'static str = "castle_vignettes_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(settings) = serde_json::from_str(&json) {
                    log::info!("Loaded settings from LocalStorage");
                    return settings;
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_roundtrip() {
        for preset in [QualityPreset::Low, QualityPreset::Medium, QualityPreset::High] {
            assert_eq!(QualityPreset::from_str(preset.as_str()), Some(preset));
        }
        assert_eq!(QualityPreset::from_str("ultra"), None);
    }

    #[test]
    fn test_settings_json_roundtrip() {
        let settings = Settings {
            sound_enabled: false,
            quality: QualityPreset::High,
            reduced_motion: true,
        };
        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sound_enabled, settings.sound_enabled);
        assert_eq!(back.quality, settings.quality);
        assert_eq!(back.reduced_motion, settings.reduced_motion);
    }
}
