use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;

// Copies the bundled `scenes` folder (scene files, meshes, textures) next to the build output
fn main() -> Result<()> {
    // This tells cargo to rerun this script if something in /scenes/ changes.
    println!("cargo:rerun-if-changed=scenes/*");

    let out_dir = env::var("OUT_DIR")?;
    let mut copy_options = CopyOptions::new();
    copy_options.overwrite = true;
    let paths_to_copy = vec!["scenes/"];
    copy_items(&paths_to_copy, out_dir, &copy_options)?;

    Ok(())
}
