//! sft-pull - pull today's submissions from the SFT portal and report on them.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    #[cfg(feature = "cli")]
    {
        if let Err(e) = sft_pull::cli::run().await {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
    #[cfg(not(feature = "cli"))]
    {
        eprintln!("CLI support not compiled in");
        std::process::exit(1);
    }
}
