//! Serverless contacts relay for a refresh-token protected CRM API.
//!
//! Concurrent function instances share one refresh token. The [`flows::TokenManager`] serves the
//! cached access token while it is valid and serializes refreshes through a distributed lease so
//! only one instance talks to the token endpoint per expiry cycle. The
//! [`contacts::ContactsClient`] pages through the upstream contacts API and the
//! [`relay::ContactsRelay`] ties both together behind the HTTP surface.

#![deny(clippy::all, missing_docs)]

pub mod auth;
pub mod blob;
pub mod config;
pub mod contacts;
pub mod error;
pub mod flows;
pub mod http;
pub mod lock;
pub mod oauth;
pub mod obs;
pub mod relay;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError, StatusCode};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
