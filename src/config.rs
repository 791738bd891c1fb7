//! Compiler configuration (ambient; §4.9)
//!
//! Deserializable from TOML via `serde` + `toml`, the same pairing the
//! teacher uses for its lint configuration (`lint.rs`'s `LintConfig::from_toml`),
//! with a builder API mirroring `config.rs`'s `CompilerConfig::with_builtin`.

use serde::Deserialize;

fn default_max_array_size() -> u32 {
    65536
}

fn default_require_main() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompilerConfig {
    #[serde(default = "default_max_array_size")]
    pub max_array_size: u32,
    #[serde(default = "default_require_main")]
    pub require_main: bool,
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_array_size(mut self, size: u32) -> Self {
        self.max_array_size = size;
        self
    }

    pub fn with_require_main(mut self, require_main: bool) -> Self {
        self.require_main = require_main;
        self
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            max_array_size: default_max_array_size(),
            require_main: default_require_main(),
        }
    }
}
