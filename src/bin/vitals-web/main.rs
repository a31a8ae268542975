use std::path::PathBuf;

use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, HttpServer, get, web};
use anyhow::{Context, Result, anyhow};
use clap::Parser;

use vitals::gpu::Resolver;
use vitals::info::SystemInfo;

use crate::app::State;

mod app;

/// Serve a page describing the CPU, memory, disk and GPU of this machine.
#[derive(Debug, clap::Parser)]
struct Args {
    /// Address to listen on.
    #[clap(long, short, default_value = "0.0.0.0:8080")]
    bind: String,
    /// Directory containing `index.html` and `systeminfo.html`.
    #[clap(long, short, default_value = "templates")]
    templates: PathBuf,
}

fn internal_error(what: &str, error: anyhow::Error) -> HttpResponse {
    tracing::error!("{what}: {error:#}");
    HttpResponse::InternalServerError().body("Error")
}

/// Collects a fresh snapshot on the blocking pool. Every call re-runs the GPU command.
async fn snapshot() -> Result<SystemInfo> {
    web::block(|| SystemInfo::collect(&Resolver::new()))
        .await
        .map_err(|error| anyhow!("collection did not finish: {error}"))?
}

#[get("/")]
async fn index(state: web::Data<State>) -> HttpResponse {
    match state.render_index() {
        Ok(content) => HttpResponse::Ok().content_type(ContentType::html()).body(content),
        Err(error) => internal_error("could not render index.html", error),
    }
}

#[get("/systeminfo")]
async fn system_info(state: web::Data<State>) -> HttpResponse {
    let info = match snapshot().await {
        Ok(info) => info,
        Err(error) => return internal_error("could not collect system information", error),
    };
    match state.render_system_info(&info) {
        Ok(content) => HttpResponse::Ok().content_type(ContentType::html()).body(content),
        Err(error) => internal_error("could not render systeminfo.html", error),
    }
}

#[get("/systeminfo.json")]
async fn system_info_json() -> HttpResponse {
    let json = snapshot()
        .await
        .and_then(|info| serde_json::to_string_pretty(&info).map_err(anyhow::Error::from));
    match json {
        Ok(json) => HttpResponse::Ok().content_type(ContentType::json()).body(json),
        Err(error) => internal_error("could not collect system information", error),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    vitals::init_logging("info");
    let args = Args::parse();

    let state = web::Data::new(State::load(&args.templates)?);

    let bind = &args.bind;
    tracing::info!("serving on {bind}");
    HttpServer::new(move || {
        actix_web::App::new()
            .app_data(state.clone())
            .service(index)
            .service(system_info)
            .service(system_info_json)
    })
    .bind(bind)
    .context(format!("could not bind to {bind:?}"))?
    .run()
    .await?;
    Ok(())
}
