use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = festa_api::Args::parse();
	festa_api::run(args).await
}
