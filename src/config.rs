use std::path::PathBuf;

use cgmath::Deg;
use clap::Parser;

use crate::sgraph::raycast::RaycastConfig;

/// Command line options of the viewer
#[derive(Parser, Debug, Clone)]
#[command(name = "sgraph-viewer", version, about = "Scene graph viewer with a rasterizer and a raycaster")]
pub struct Config {
    /// Scene description file
    #[arg(value_name = "SCENE", default_value = "scenes/spheres.txt")]
    pub scene: PathBuf,

    /// Print the scene tree and exit
    #[arg(long)]
    pub text: bool,

    /// Raycast the scene into this image without opening a window
    #[arg(long, value_name = "OUT", conflicts_with = "text")]
    pub raycast: Option<PathBuf>,

    /// Window and raycast image width
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Window and raycast image height
    #[arg(long, default_value_t = 800)]
    pub height: u32,

    /// Maximum reflection depth of the raycaster
    #[arg(long, default_value_t = 5)]
    pub bounces: u32,

    /// Spin the whole scene about +Y, in radians per second
    #[arg(long, default_value_t = 0.0)]
    pub spin: f32,

    /// Image written when a raycast is requested from the window (S key)
    #[arg(long, short = 'o', value_name = "PATH", default_value = "output.ppm")]
    pub output: PathBuf,
}

impl Config {
    /// Raycaster settings for an image of the configured size
    pub fn raycast_config(&self, fovy: Deg<f32>) -> RaycastConfig {
        RaycastConfig {
            width: self.width,
            height: self.height,
            max_bounces: self.bounces,
            fovy,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::parse_from(["sgraph-viewer"]);
        assert_eq!(config.scene, PathBuf::from("scenes/spheres.txt"));
        assert!(!config.text);
        assert!(config.raycast.is_none());
        assert_eq!((config.width, config.height), (800, 800));
        assert_eq!(config.bounces, 5);
        assert_eq!(config.spin, 0.0);
        assert_eq!(config.output, PathBuf::from("output.ppm"));
    }

    #[test]
    fn headless_raycast_options() {
        let config = Config::parse_from([
            "sgraph-viewer",
            "scenes/boxes.txt",
            "--raycast",
            "out.png",
            "--width",
            "320",
            "--height",
            "200",
            "--bounces",
            "2",
        ]);
        assert_eq!(config.raycast, Some(PathBuf::from("out.png")));
        let raycast = config.raycast_config(Deg(45.0));
        assert_eq!((raycast.width, raycast.height), (320, 200));
        assert_eq!(raycast.max_bounces, 2);
        assert_eq!(raycast.fovy, Deg(45.0));
    }

    #[test]
    fn text_and_raycast_conflict() {
        let result = Config::try_parse_from(["sgraph-viewer", "--text", "--raycast", "a.ppm"]);
        assert!(result.is_err());
    }
}
