use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tokio::fs;

// CONFIGURATION STRUCTS

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CandleConfig {
    pub range: String,    // e.g. "1d", "5d"
    pub interval: String, // e.g. "1m", "15m", "4h"
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignalConfig {
    // Relative change between adjacent closes that triggers a marker.
    // buy_threshold is positive, sell_threshold negative.
    pub buy_threshold: f64,
    pub sell_threshold: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MoversConfig {
    pub universe: Vec<String>,
    pub range: String,
    pub interval: String,
    pub top_n: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProviderConfig {
    // Upper bound for any single upstream call. A slow provider degrades
    // one source, never the whole analysis.
    pub timeout_secs: u64,
    // How many of the latest closes are serialized into the AI prompt.
    pub recent_closes: usize,
    pub max_tokens: u32,
    pub temperature: f64,
    pub rsi_period: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub candles: CandleConfig,
    pub signals: SignalConfig,
    pub movers: MoversConfig,
    pub providers: ProviderConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            candles: CandleConfig {
                range: "5d".to_string(),
                interval: "15m".to_string(),
            },
            signals: SignalConfig {
                buy_threshold: 0.005,
                sell_threshold: -0.005,
            },
            movers: MoversConfig {
                universe: [
                    "AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "META", "TSLA", "NFLX",
                    "BABA", "ADBE", "AMD", "INTC", "JPM", "BAC", "V", "MA", "DIS",
                    "NKE", "KO", "PEP", "CSCO", "CRM", "ORCL", "UBER", "SHOP", "SQ",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                range: "1d".to_string(),
                interval: "1m".to_string(),
                top_n: 10,
            },
            providers: ProviderConfig {
                timeout_secs: 10,
                recent_closes: 30,
                max_tokens: 150,
                temperature: 0.7,
                rsi_period: 14,
            },
        }
    }
}

impl AppConfig {
    /// Loads `config.json` from storage, materializing the defaults on first
    /// run so the file is there to edit.
    pub async fn load_or_default(storage: &AsyncStorageManager) -> anyhow::Result<Self> {
        match storage.load("config").await {
            Ok(config) => Ok(config),
            Err(_) => {
                let config = Self::default();
                storage.save("config", &config).await?;
                Ok(config)
            }
        }
    }
}

// STORAGE MANAGER

pub struct AsyncStorageManager {
    // Absolute path to the storage directory (e.g. ".../target/debug/storage")
    pub base_dir: PathBuf,
}

impl AsyncStorageManager {
    /// Creates a new manager instance. The storage path is resolved relative
    /// to the directory of the running binary.
    pub async fn new_relative<P: AsRef<Path>>(relative_path: P) -> anyhow::Result<Self> {
        let exe_path = std::env::current_exe()?;

        let base_dir = exe_path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Could not find binary directory"))?
            .join(relative_path);

        // Create the directory up front so save/load never have to check.
        if !base_dir.exists() {
            fs::create_dir_all(&base_dir).await?;
        }

        Ok(Self { base_dir })
    }

    /// Takes any struct that implements `Serialize` and saves it to a JSON
    /// file. Writes to a .tmp file first and renames, so a crash mid-write
    /// leaves the original file intact.
    pub async fn save<T: Serialize>(&self, filename: &str, data: &T) -> anyhow::Result<()> {
        let file_name = format!("{}.json", filename);
        let final_path = self.base_dir.join(&file_name);
        let tmp_path = self.base_dir.join(format!("{}.tmp", file_name));

        let json_bytes = serde_json::to_vec_pretty(data)?;

        tokio::fs::write(&tmp_path, json_bytes).await?;
        tokio::fs::rename(tmp_path, final_path).await?;

        Ok(())
    }

    /// Reads a JSON file and deserializes it into the target type.
    pub async fn load<T: DeserializeOwned>(&self, filename: &str) -> anyhow::Result<T> {
        let path = self.base_dir.join(format!("{}.json", filename));

        // Raw bytes, not a String: serde_json scans the bytes anyway.
        let content = fs::read(path).await?;

        let data = serde_json::from_slice(&content)?;
        Ok(data)
    }
}
