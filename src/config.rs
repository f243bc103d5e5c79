// SPDX-License-Identifier: GPL-3.0-or-later

/// Halfmove clock value at which a position counts as drawn by the move rule.
pub const DEFAULT_HALFMOVE_LIMIT: u32 = 50;

/// Runtime settings, parsed from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Draw by the move rule once the halfmove clock reaches this value.
    pub halfmove_limit: u32,
    /// Read and write castling rights in Shredder-FEN and accept
    /// king-takes-rook castling moves.
    pub chess960: bool,
    /// `tracing-subscriber` filter directive.
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            halfmove_limit: std::env::var("POSCORE_HALFMOVE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&v: &u32| v > 0)
                .unwrap_or(defaults.halfmove_limit),
            chess960: std::env::var("POSCORE_CHESS960")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.chess960),
            log_filter: std::env::var("RUST_LOG").unwrap_or(defaults.log_filter),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            halfmove_limit: DEFAULT_HALFMOVE_LIMIT,
            chess960: false,
            log_filter: "poscore=info".to_string(),
        }
    }
}

fn parse_flag(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.halfmove_limit, 50);
        assert!(!config.chess960);
        assert_eq!(config.log_filter, "poscore=info");
    }

    #[test]
    fn flags() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" ON "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("nope"));
    }
}
