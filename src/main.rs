//! Azure Functions custom handler serving the contacts relay.

// std
use std::{env, net::SocketAddr};
// crates.io
use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use color_eyre::{Result, eyre::WrapErr};
use contacts_relay::{config::Config, relay::ContactsRelay};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 3_000;

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
		.with(fmt::layer().with_target(true).compact())
		.init();

	let config = Config::from_env().wrap_err("failed to load configuration")?;

	tracing::info!(?config, "Configuration loaded.");

	let relay = config.build_relay().wrap_err("failed to build the contacts relay")?;
	let port = match env::var("FUNCTIONS_CUSTOMHANDLER_PORT") {
		Ok(raw) => raw.trim().parse::<u16>().wrap_err("FUNCTIONS_CUSTOMHANDLER_PORT is not a port")?,
		Err(_) => DEFAULT_PORT,
	};
	let app = Router::new()
		.route("/api/APICallingSmokeball", get(contacts).post(contacts))
		.route("/APICallingSmokeball", get(contacts).post(contacts))
		.route("/healthz", get(healthz))
		.with_state(relay);
	let addr = SocketAddr::from(([127, 0, 0, 1], port));
	let listener = TcpListener::bind(addr).await.wrap_err_with(|| format!("failed to bind {addr}"))?;

	tracing::info!(%addr, "Contacts relay listening.");

	axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

	Ok(())
}

async fn contacts(State(relay): State<ContactsRelay>) -> (StatusCode, Json<Value>) {
	let response = relay.respond().await;
	let status =
		StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

	(status, Json(response.body))
}

async fn healthz() -> Json<Value> {
	Json(json!({ "status": "ok" }))
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::warn!(error = %e, "Failed to listen for the shutdown signal.");
	}

	tracing::info!("Shutting down.");
}
