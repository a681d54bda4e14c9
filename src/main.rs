use aurora_fetch::utils::error::FetchError;
use aurora_fetch::utils::{logger, validation::Validate};
use aurora_fetch::{CliConfig, FetchConfig, FetchOptions, HostResolver, StaticResolver};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = config.validate() {
        fail(&e);
    }

    let (options, file_resolver) = match load_file_config(config.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => fail(&e),
    };

    let options = match config.apply_to(options) {
        Ok(options) => options,
        Err(e) => fail(&e),
    };

    let resolver = match config.effective_resolver(&options, file_resolver) {
        Ok(resolver) => resolver,
        Err(e) => fail(&e),
    };

    if let Err(e) = run(&config, &options, resolver.as_ref()).await {
        fail(&e);
    }

    Ok(())
}

fn load_file_config(path: Option<&str>) -> aurora_fetch::Result<(FetchOptions, Option<StaticResolver>)> {
    let Some(path) = path else {
        return Ok((FetchOptions::default(), None));
    };

    tracing::info!("Loading configuration from: {}", path);
    let file_config = FetchConfig::from_file(path)?;
    file_config.validate()?;
    Ok((file_config.to_options()?, file_config.resolver()?))
}

async fn run(
    config: &CliConfig,
    options: &FetchOptions,
    resolver: Option<&StaticResolver>,
) -> aurora_fetch::Result<()> {
    let resolver = resolver.map(|r| r as &dyn HostResolver);

    match &config.output {
        Some(path) => {
            let data = match resolver {
                Some(r) => aurora_fetch::get_data_resolved(&config.url, r, options).await?,
                None => aurora_fetch::get_data(&config.url, options).await?,
            };
            tokio::fs::write(path, &data).await?;
            tracing::info!("Saved {} bytes to {}", data.len(), path);
        }
        None => {
            let text = match resolver {
                Some(r) => aurora_fetch::get_string_resolved(&config.url, r, options).await?,
                None => aurora_fetch::get_string(&config.url, options).await?,
            };
            println!("{}", text);
        }
    }

    Ok(())
}

fn fail(e: &FetchError) -> ! {
    tracing::error!(
        "Fetch failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    std::process::exit(e.severity().exit_code());
}
