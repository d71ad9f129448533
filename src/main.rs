//! Graph Studio
//!
//! Opens a window plotting each expression given on the command line as a surface.

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::PathBuf;

    use anyhow::{Context, anyhow};
    use clap::Parser;
    use graph_studio::prelude::*;

    /// Interactive 3D surface plotter for z = f(x, y)
    #[derive(Parser, Clone, Debug)]
    #[command(name = "graph-studio")]
    #[command(about = "Plot z = f(x, y) surfaces with an orbit camera")]
    pub struct Cli {
        /// Expressions in x and y, e.g. "sin(x) * cos(y)"
        #[arg(default_value = "sin(sqrt(x^2 + y^2))")]
        pub expressions: Vec<String>,

        /// JSON configuration file
        #[arg(short, long)]
        pub config: Option<PathBuf>,

        /// Samples per axis, overriding the configuration
        #[arg(short, long)]
        pub resolution: Option<usize>,

        /// Log filter handed to the logger
        #[arg(long, default_value = "info,wgpu=error,naga=warn,graph_studio=debug")]
        pub log: String,
    }

    pub fn run() -> anyhow::Result<()> {
        let cli = Cli::parse();

        let mut config = match &cli.config {
            Some(path) => StudioConfig::load(path).map_err(|report| anyhow!("{report:?}"))?,
            None => StudioConfig::default(),
        };
        if let Some(n) = cli.resolution {
            config.surface.x_count = n;
            config.surface.y_count = n;
            config.validate().map_err(|report| anyhow!("{report:?}"))?;
        }

        let mut studio = Studio::new(&config.surface);
        for expr in &cli.expressions {
            studio
                .submit(expr)
                .with_context(|| format!("invalid expression {expr:?}"))?;
        }

        run_studio(studio, config, &cli.log);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    cli::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {}
