//! Service layer for Chirpy.
//!
//! [`Chirpy`] combines the document store (`chirpy-store`) with credential
//! hashing and session tokens (`chirpy-auth`) into the operations an HTTP
//! layer calls: create/get/list messages, sign up, log in, update an
//! account, and check a session. Routing, CORS, static files, and the word
//! filter live outside this crate.
//!
//! ```rust,no_run
//! use chirpy_service::{Chirpy, ServiceConfig};
//!
//! # async fn example() -> chirpy_service::ServiceResult<()> {
//! let config = ServiceConfig::load("chirpy.toml")?;
//! let chirpy = Chirpy::from_config(&config).await?;
//!
//! let profile = chirpy.create_account("walt@breakingbad.com", "04234").await?;
//! let session = chirpy.authenticate("walt@breakingbad.com", "04234", 0).await?;
//! assert_eq!(chirpy.verify_session(&session.token)?, profile.id);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod service;

pub use config::ServiceConfig;
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use service::{Chirpy, Profile, SessionToken};

pub use chirpy_store::{MAX_MESSAGE_LEN, Message};
