//! # cardcode
//!
//! A Rust library for turning key/value records into scannable codes.
//!
//! `cardcode` flattens an ordered list of records into text and renders it as a
//! QR code (Model 2, versions 1 to 40) or a CODE128 barcode. In card mode the
//! records are packed into a compact URL-safe token and the QR code carries a
//! link; opening that link decodes the token back into an info card.
//!
//! ## Features
//!
//! - Ordered, non-unique records with add, update and remove.
//! - Card tokens: records ⇄ URL-safe base64 of a JSON pair list.
//! - QR encoding in numeric, alphanumeric or byte mode with four error
//!   correction levels; CODE128 with automatic A/B/C set switching.
//! - A generation controller where stale results never overwrite newer ones.
//! - Rendering to PNG, SVG or terminal text, with optional barcode labels.
//! - Messenger share links carrying the payload.
//!
//! ## Example
//!
//! Build a card and the URL a QR code would carry:
//!
//! ```rust
//! use cardcode::{card::render_card, records::Record, token};
//!
//! let records = vec![Record::new("Ism", "Ali"), Record::new("Telefon", "+998901234567")];
//! let t = token::encode(&records);
//! let url = token::card_url("https://cardcode.app/", "card", &t);
//!
//! let decoded = token::decode_url(&url, "card").unwrap();
//! let card = render_card(&decoded);
//! assert_eq!(card.title, "Ali");
//! assert_eq!(card.contact.unwrap().href, "tel:+998901234567");
//! ```
//!
//! Generate an image through the controller:
//!
//! ```rust
//! use std::sync::Arc;
//! use cardcode::config::Config;
//! use cardcode::generator::{Code128Generator, QrGenerator};
//! use cardcode::orchestrator::{Controller, InputSnapshot, Phase};
//! use cardcode::records::Record;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut controller = Controller::new(
//!     Config::default(),
//!     Arc::new(QrGenerator),
//!     Arc::new(Code128Generator::new()),
//! );
//! let view = controller
//!     .update(InputSnapshot {
//!         records: vec![Record::new("Name", "Ali")],
//!         ..InputSnapshot::default()
//!     })
//!     .await;
//! assert_eq!(view.phase, Phase::Fulfilled);
//! assert_eq!(view.image.unwrap().image.dimensions(), (260, 260));
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`records`], [`projector`]: the record list and its text projection.
//! - [`token`], [`card`]: card tokens and the decoded card layout.
//! - [`share`]: Telegram and WhatsApp share links for a payload.
//! - [`resolver`], [`orchestrator`]: what to generate and when to publish it.
//! - [`generator`], [`qrcode`], [`code128`], [`render`], [`font`]: the encoders
//!   and rasterizers.
//! - [`config`], [`error`]: settings and error types.

pub mod card;
pub mod code128;
pub mod config;
pub mod error;
pub mod font;
pub mod generator;
pub mod orchestrator;
pub mod projector;
pub mod qrcode;
pub mod records;
pub mod render;
pub mod resolver;
pub mod share;
pub mod token;

pub use error::{ConfigError, GenerateError, TokenError};
