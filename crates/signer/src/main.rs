use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use log::{info, warn};
use tuus_imago_signer::{configure, Credentials, LEGACY_SIGN_PATH, SIGN_PATH};

#[derive(Parser, Debug)]
#[command(author, version, about = "Upload-signature service for tuus-imago", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:8888")]
    bind: String,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenvy::dotenv();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let args = Args::parse();

    let credentials = Credentials::from_env();
    if !credentials.is_complete() {
        warn!("Signing credentials are incomplete; sign requests will fail with 500");
    }

    info!("Starting signer on {} ({} and {})", args.bind, SIGN_PATH, LEGACY_SIGN_PATH);

    let data = web::Data::new(credentials);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(&args.bind)?
    .run()
    .await
}
