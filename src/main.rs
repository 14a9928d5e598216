use clap::Parser;
use sgraph_viewer::{config::Config, print_tree, render_headless, run};

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Config::parse();

    if config.text {
        return print_tree(&config);
    }
    if let Some(output) = config.raycast.clone() {
        return render_headless(&config, &output);
    }
    pollster::block_on(run(config))
}
