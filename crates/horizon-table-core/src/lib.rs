//! Core systems for Horizon Table.
//!
//! This crate provides the observation primitives the table binding layer is
//! built on:
//!
//! - **Signal/Slot System**: Type-safe synchronous notification with RAII
//!   subscriptions
//! - **Property System**: Change-detecting properties
//! - **Key-Value Objects**: Read, write and observe named values on models
//!   and views through one trait
//! - **Keypaths**: Validated dotted paths across nested objects, with chain
//!   observation
//! - **Observable Collections**: Ordered object lists announcing inserts,
//!   removals and moves
//!
//! # Keypath Example
//!
//! ```
//! use horizon_table_core::{KeyPath, ObjectRef, Record, Value};
//!
//! let address = Record::shared().with_value("city", "Oslo");
//! let person: ObjectRef = Record::shared().with_value("address", Value::object(address));
//!
//! let city = KeyPath::parse("address.city").unwrap();
//! assert_eq!(city.get(&person), Ok(Value::from("Oslo")));
//!
//! let _observation = city.observe(&person, |value| {
//!     println!("city is now {:?}", value);
//! });
//! city.set(&person, Value::from("Bergen")).unwrap();
//! ```

mod collection;
mod error;
mod event;
pub mod keypath;
pub mod logging;
pub mod object;
pub mod property;
pub mod signal;
mod value;

pub use collection::{CollectionSignals, ObservableList};
pub use error::{KeyPathError, Result};
pub use event::ControlEvent;
pub use keypath::{KeyPath, Observation};
pub use object::{AccessorObject, KeyValueObject, ObjectRef, Record};
pub use property::{ObservedProperty, Property};
pub use signal::{ConnectionId, Signal, SignalEmitter, Subscription};
pub use value::{ObjectId, Value};
