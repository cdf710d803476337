use clap::Parser;
use std::path::PathBuf;

use crate::config::{parse_root_spec, Config};

#[derive(Parser, Debug)]
#[command(name = "audiotree")]
#[command(version)]
#[command(about = "Serve directory trees over HTTP with listings, playlists and zip downloads", long_about = None)]
#[command(after_help = "Examples:\n  \
  audiotree music=/srv/music                  serve /srv/music at /music/\n  \
  audiotree -p 9000 a=/data/a b=/data/b       serve two trees on port 9000\n  \
  audiotree --zip music=/srv/music            also offer directories as zip downloads\n  \
  audiotree -c /etc/audiotree                 read roots from /etc/audiotree.toml")]
pub struct Cli {
    /// Trees to serve, as NAME=PATH
    #[arg(value_name = "NAME=PATH", value_parser = parse_root_spec)]
    pub roots: Vec<(String, PathBuf)>,

    /// Configuration file (extension optional)
    #[arg(short = 'c', long = "config", value_name = "FILE", default_value = "config")]
    pub config: String,

    /// Port to listen on
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Public base URL used in playlists
    #[arg(short = 'b', long = "base-url", env = "AUDIOTREE_BASE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    /// Offer directories as zip downloads (spooled to disk on the server)
    #[arg(long = "zip")]
    pub zip: bool,
}

impl Cli {
    /// Apply command-line overrides on top of loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(base_url) = &self.base_url {
            config.http.base_url = Some(base_url.clone());
        }
        if self.zip {
            config.archive.enabled = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roots_and_options() {
        let cli = Cli::try_parse_from([
            "audiotree",
            "-p",
            "9000",
            "music=/srv/music",
            "books=/srv/books",
        ])
        .unwrap();
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.config, "config");
        assert!(!cli.zip);
        assert_eq!(
            cli.roots,
            vec![
                ("music".to_string(), PathBuf::from("/srv/music")),
                ("books".to_string(), PathBuf::from("/srv/books")),
            ]
        );
    }

    #[test]
    fn test_rejects_malformed_root() {
        assert!(Cli::try_parse_from(["audiotree", "no-equals-sign"]).is_err());
        assert!(Cli::try_parse_from(["audiotree", "=/srv/music"]).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let cli = Cli::try_parse_from([
            "audiotree",
            "--port",
            "8123",
            "--base-url",
            "https://music.example.org/",
            "--zip",
        ])
        .unwrap();
        let mut config = Config::with_defaults();
        assert!(!config.archive.enabled);
        cli.apply(&mut config);
        assert_eq!(config.server.port, 8123);
        assert!(config.archive.enabled);
        assert_eq!(
            config.http.base_url.as_deref(),
            Some("https://music.example.org/")
        );
    }
}
