use anyhow::Result;
use clap::Parser;

use formwork_cli::{
    cli::{Cli, Commands},
    commands::{self, render::RenderOptions},
    config, logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config first: it supplies the default log level and format
    let config = config::load(cli.config.as_deref()).await?;
    logging::init(cli.verbose, cli.log_level, &config.logging);
    tracing::debug!(
        locale = %config.render.locale,
        max_depth = config.render.max_depth,
        "configuration loaded"
    );

    match cli.command {
        Commands::Render {
            schema,
            data,
            format,
            locale,
            catalog,
            strict,
        } => {
            let options = RenderOptions {
                schema,
                data,
                format,
                locale,
                catalog,
                strict,
            };
            commands::render::execute(config, options).await?
        }

        Commands::Components { namespace, json } => {
            commands::components::execute(config, namespace, json).await?
        }

        Commands::Check { schema } => commands::check::execute(config, &schema).await?,
    }

    Ok(())
}
